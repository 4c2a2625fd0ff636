//! # EsoxSolutions.GatedPool
//!
//! Thread-safe object pool for Rust where a counting gate bounds how many
//! resources can be lent out at once.
//!
//! ## Features
//!
//! - Eager pools over a fixed set of resources
//! - Lazy pools that create resources on demand up to a cap, from a factory
//!   or by cloning a prototype
//! - Blocking checkout with optional timeout, non-blocking and async variants
//! - Automatic return of resources via RAII (Drop trait)
//! - Prepare-for-reuse hook run on every checkin
//! - Detection of checkins into the wrong pool
//! - Health monitoring and metrics, with Prometheus export
//!
//! ## Quick Start
//!
//! ```rust
//! use esox_gatedpool::{EagerObjectPool, PoolConfiguration};
//! use std::time::Duration;
//!
//! let pool = EagerObjectPool::new(vec![1, 2, 3], PoolConfiguration::default());
//! {
//!     let obj = pool.checkout_resource(Some(Duration::from_secs(2))).unwrap();
//!     println!("Got: {}", *obj);
//!     // Object automatically returned when `obj` goes out of scope
//! }
//! assert_eq!(pool.available_count(), 3);
//! ```

mod pool;
mod lazy;
mod store;
mod gate;
mod context;
mod config;
mod metrics;
mod health;
mod errors;

pub use pool::{EagerObjectPool, PooledObject};
pub use lazy::LazyObjectPool;
pub use store::PrepareForReuse;
pub use gate::CountingGate;
pub use context::SerialContext;
pub use config::PoolConfiguration;
pub use metrics::PoolMetrics;
#[cfg(feature = "metrics")]
pub use metrics::MetricsExporter;
pub use health::HealthStatus;
pub use errors::{PoolError, PoolResult};
