//! Error types for the object pool

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Pool exhausted - no resource became available within {0:?}")]
    Timeout(std::time::Duration),

    #[error("Prototype of type `{found}` cannot produce resources of type `{expected}`")]
    IncompatiblePrototype {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Resource was checked out from a different pool")]
    ForeignResource,

    #[error("Metrics export failed: {0}")]
    MetricsExport(String),
}

pub type PoolResult<T> = Result<T, PoolError>;
