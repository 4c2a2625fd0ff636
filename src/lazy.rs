//! Pool that creates its resources on demand up to a fixed cap

use crate::config::PoolConfiguration;
use crate::errors::{PoolError, PoolResult};
use crate::health::HealthStatus;
use crate::metrics::PoolMetrics;
use crate::pool::{PoolCore, PooledObject};
use crate::store::BackingStore;

use std::any::{self, Any};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Lazy object pool - creates resources only when no idle one is left
///
/// At most `max_resources` resources are ever created. Once the cap is
/// reached, checkouts wait for checkins and reuse what is already there.
///
/// # Examples
///
/// ```
/// use esox_gatedpool::{LazyObjectPool, PoolConfiguration};
///
/// let pool = LazyObjectPool::new(2, || String::from("conn"), PoolConfiguration::default());
/// assert_eq!(pool.created_count(), 0);
///
/// {
///     let conn = pool.checkout().unwrap();
///     assert_eq!(*conn, "conn");
/// }
///
/// let _again = pool.checkout().unwrap();
/// assert_eq!(pool.created_count(), 1);
/// ```
pub struct LazyObjectPool<T: Send + Sync + 'static> {
    core: Arc<PoolCore<T>>,
}

impl<T: Send + Sync + 'static> LazyObjectPool<T> {
    /// Create a pool that builds resources with `factory`
    pub fn new<F>(max_resources: usize, factory: F, config: PoolConfiguration<T>) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        if max_resources == 0 {
            tracing::warn!("lazy pool created with zero capacity, every checkout will time out");
        }

        let store = BackingStore::new(config.reuse_hook);
        Self {
            core: Arc::new(PoolCore::new(store, max_resources, Some(Arc::new(factory)), config)),
        }
    }

    /// Create a pool that clones `prototype` for every new resource.
    ///
    /// Fails if the prototype is not of the pool's resource type.
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_gatedpool::{LazyObjectPool, PoolConfiguration, PoolError};
    ///
    /// let pool = LazyObjectPool::<Vec<u8>>::with_prototype(4, vec![0u8; 16], PoolConfiguration::default());
    /// assert!(pool.is_ok());
    ///
    /// let wrong = LazyObjectPool::<Vec<u8>>::with_prototype(4, "not a buffer", PoolConfiguration::default());
    /// assert!(matches!(wrong, Err(PoolError::IncompatiblePrototype { .. })));
    /// ```
    pub fn with_prototype<P>(
        max_resources: usize,
        prototype: P,
        config: PoolConfiguration<T>,
    ) -> PoolResult<Self>
    where
        T: Clone,
        P: Any,
    {
        let boxed: Box<dyn Any> = Box::new(prototype);
        let prototype = boxed.downcast::<T>().map_err(|_| {
            tracing::warn!(
                expected = any::type_name::<T>(),
                found = any::type_name::<P>(),
                "prototype does not match the pool resource type"
            );
            PoolError::IncompatiblePrototype {
                expected: any::type_name::<T>(),
                found: any::type_name::<P>(),
            }
        })?;

        Ok(Self::new(max_resources, move || T::clone(&prototype), config))
    }

    /// Wait up to `timeout` for a resource; `None` waits forever.
    ///
    /// Returns `None` if the pool stayed exhausted for the whole window.
    pub fn checkout_resource(&self, timeout: Option<Duration>) -> Option<PooledObject<T>> {
        self.core.checkout_resource(timeout)
    }

    /// Checkout using the configured default timeout
    pub fn checkout(&self) -> Option<PooledObject<T>> {
        self.core.checkout_resource(self.core.default_timeout())
    }

    /// Checkout only if a resource is idle or can be created right now
    pub fn try_checkout(&self) -> Option<PooledObject<T>> {
        self.core.try_checkout()
    }

    /// Checkout asynchronously, bounded by the configured timeout
    pub async fn checkout_async(&self) -> PoolResult<PooledObject<T>> {
        self.core.checkout_async().await
    }

    /// Return a resource; dropping the guard does the same
    pub fn checkin(&self, object: PooledObject<T>) -> PoolResult<()> {
        self.core.checkin(object)
    }

    /// Return a resource without waiting for the store to be updated
    pub fn checkin_detached(&self, object: PooledObject<T>) -> PoolResult<()> {
        self.core.checkin_detached(object)
    }

    /// Pre-create up to `count` resources, bounded by the remaining budget.
    ///
    /// Returns how many were created.
    pub fn warmup(&self, count: usize) -> usize {
        self.core.warmup(count)
    }

    /// Pre-create resources on a blocking worker
    pub async fn warmup_async(self: &Arc<Self>, count: usize) -> usize {
        let pool = Arc::clone(self);
        match tokio::task::spawn_blocking(move || pool.warmup(count)).await {
            Ok(created) => created,
            Err(err) => {
                tracing::error!(error = %err, "warmup task failed");
                0
            }
        }
    }

    /// Inspect a cloned snapshot of the idle resources, hence `T: Clone`; see
    /// [`EagerObjectPool::process_pool`](crate::EagerObjectPool::process_pool)
    pub fn process_pool<F>(&self, callback: F)
    where
        T: Clone,
        F: FnOnce(&[T]),
    {
        self.core.process_pool(callback)
    }

    pub fn available_count(&self) -> usize {
        self.core.available_count()
    }

    pub fn checked_out_count(&self) -> usize {
        self.core.checked_out_count()
    }

    /// Resources created so far; never decreases
    pub fn created_count(&self) -> usize {
        self.core.created_count()
    }

    pub fn capacity(&self) -> usize {
        self.core.capacity()
    }

    pub fn get_health_status(&self) -> HealthStatus {
        self.core.get_health_status()
    }

    pub fn get_metrics(&self) -> PoolMetrics {
        self.core.get_metrics()
    }

    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.core.export_metrics()
    }

    #[cfg(feature = "metrics")]
    pub fn export_metrics_prometheus(
        &self,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> PoolResult<String> {
        self.core.export_metrics_prometheus(pool_name, tags)
    }
}
