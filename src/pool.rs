//! Core pool machinery and the eagerly populated pool

use crate::config::PoolConfiguration;
use crate::context::SerialContext;
use crate::errors::{PoolError, PoolResult};
use crate::gate::{CountingGate, Permit};
use crate::health::HealthStatus;
use crate::metrics::{MetricsTracker, PoolMetrics};
use crate::store::BackingStore;

#[cfg(feature = "metrics")]
use crate::metrics::MetricsExporter;

use dashmap::DashMap;
use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

static NEXT_POOL_ID: AtomicUsize = AtomicUsize::new(0);

pub(crate) type Factory<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// A checked-out resource that returns to its pool when dropped
pub struct PooledObject<T: Send + Sync + 'static> {
    value: Option<T>,
    slot: usize,
    pool: Arc<PoolCore<T>>,
}

impl<T: Send + Sync + 'static> PooledObject<T> {
    fn new(value: T, slot: usize, pool: Arc<PoolCore<T>>) -> Self {
        Self {
            value: Some(value),
            slot,
            pool,
        }
    }

    /// Stable identifier of the pooled instance, unique within its pool
    pub fn slot(&self) -> usize {
        self.slot
    }
}

impl<T: Send + Sync + 'static> Deref for PooledObject<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.value.as_ref().expect("Value already taken")
    }
}

impl<T: Send + Sync + 'static> DerefMut for PooledObject<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.value.as_mut().expect("Value already taken")
    }
}

impl<T: Send + Sync + fmt::Debug + 'static> fmt::Debug for PooledObject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledObject")
            .field("slot", &self.slot)
            .field("value", &self.value)
            .finish()
    }
}

impl<T: Send + Sync + 'static> Drop for PooledObject<T> {
    fn drop(&mut self) {
        if let Some(value) = self.value.take() {
            self.pool.return_resource(self.slot, value);
        }
    }
}

pub(crate) struct PoolState<T> {
    store: BackingStore<T>,
    created: usize,
}

/// Shared machinery behind both pool flavours.
///
/// The gate is always acquired before the store is touched, and never while
/// the serial context is held.
pub(crate) struct PoolCore<T: Send + Sync + 'static> {
    id: usize,
    context: SerialContext<PoolState<T>>,
    gate: Arc<CountingGate>,
    outstanding: DashMap<usize, Instant>,
    config: PoolConfiguration<T>,
    metrics: Arc<MetricsTracker>,
    factory: Option<Factory<T>>,
    capacity: usize,
}

impl<T: Send + Sync + 'static> PoolCore<T> {
    pub fn new(
        store: BackingStore<T>,
        capacity: usize,
        factory: Option<Factory<T>>,
        config: PoolConfiguration<T>,
    ) -> Self {
        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        let seeded = store.len();

        tracing::debug!(pool = id, capacity, seeded, lazy = factory.is_some(), "creating object pool");

        Self {
            id,
            context: SerialContext::new(PoolState { store, created: seeded }),
            gate: Arc::new(CountingGate::new(capacity)),
            outstanding: DashMap::new(),
            config,
            metrics: Arc::new(MetricsTracker::new(seeded)),
            factory,
            capacity,
        }
    }

    pub fn checkout_resource(self: &Arc<Self>, timeout: Option<Duration>) -> Option<PooledObject<T>> {
        let Some(permit) = self.gate.acquire_permit(timeout) else {
            self.metrics.record_exhausted();
            tracing::warn!(pool = self.id, ?timeout, "checkout timed out, pool exhausted");
            return None;
        };
        Some(self.take_permitted(permit))
    }

    pub fn try_checkout(self: &Arc<Self>) -> Option<PooledObject<T>> {
        let Some(permit) = self.gate.try_acquire_permit() else {
            self.metrics.record_exhausted();
            tracing::trace!(pool = self.id, "no permit free for immediate checkout");
            return None;
        };
        Some(self.take_permitted(permit))
    }

    pub async fn checkout_async(self: &Arc<Self>) -> PoolResult<PooledObject<T>> {
        let interval = self.config.async_poll_interval;

        // Permit and store are taken without an await in between, so a
        // cancelled future never strands a permit.
        let poll = async {
            loop {
                if let Some(permit) = self.gate.try_acquire_permit() {
                    return self.take_permitted(permit);
                }
                tokio::time::sleep(interval).await;
            }
        };

        match self.config.checkout_timeout {
            Some(timeout) => tokio::time::timeout(timeout, poll).await.map_err(|_| {
                self.metrics.record_exhausted();
                tracing::warn!(pool = self.id, ?timeout, "async checkout timed out, pool exhausted");
                PoolError::Timeout(timeout)
            }),
            None => Ok(poll.await),
        }
    }

    /// Turn a granted permit into a resource. If the factory panics the
    /// permit goes back to the gate and the creation budget is untouched.
    fn take_permitted(self: &Arc<Self>, permit: Permit<'_>) -> PooledObject<T> {
        let taken = self.context.run_sync_exclusive(|state| {
            if state.store.is_empty()
                && state.created < self.capacity
                && let Some(factory) = &self.factory
            {
                let resource = factory();
                let slot = state.created;
                state.created += 1;
                return Some((slot, resource, true));
            }
            state.store.checkout().map(|(slot, resource)| (slot, resource, false))
        });

        let Some((slot, resource, created)) = taken else {
            tracing::error!(pool = self.id, "permit granted but no resource can be produced");
            panic!("object pool invariant violated: permit granted with an empty store and no creation budget");
        };

        permit.keep();

        if created {
            self.metrics.record_created(1);
            tracing::trace!(pool = self.id, slot, "created resource on demand");
        }

        self.outstanding.insert(slot, Instant::now());
        self.metrics.record_checkout();
        tracing::trace!(pool = self.id, slot, "checked out resource");

        PooledObject::new(resource, slot, Arc::clone(self))
    }

    pub fn checkin(&self, object: PooledObject<T>) -> PoolResult<()> {
        self.ensure_owned(&object)?;
        drop(object);
        Ok(())
    }

    pub fn checkin_detached(&self, mut object: PooledObject<T>) -> PoolResult<()> {
        self.ensure_owned(&object)?;

        if let Some(resource) = object.value.take() {
            let slot = object.slot;
            self.release_slot(slot);

            let gate = Arc::clone(&self.gate);
            let metrics = Arc::clone(&self.metrics);
            self.context.run_async_exclusive(move |state| {
                let _permit = gate.adopt_permit();
                state.store.checkin(slot, resource);
                metrics.record_checkin();
            });
        }
        Ok(())
    }

    fn ensure_owned(&self, object: &PooledObject<T>) -> PoolResult<()> {
        if object.pool.id != self.id {
            tracing::warn!(
                pool = self.id,
                owner = object.pool.id,
                slot = object.slot,
                "rejected checkin of a resource from another pool"
            );
            return Err(PoolError::ForeignResource);
        }
        Ok(())
    }

    fn return_resource(&self, slot: usize, resource: T) {
        self.release_slot(slot);
        let _permit = self.gate.adopt_permit();
        self.context.run_sync_exclusive(|state| state.store.checkin(slot, resource));
        self.metrics.record_checkin();
    }

    fn release_slot(&self, slot: usize) {
        if self.outstanding.remove(&slot).is_none() {
            tracing::error!(pool = self.id, slot, "checkin of a slot that is not checked out");
            panic!("object pool invariant violated: slot {slot} returned while not checked out");
        }
        tracing::trace!(pool = self.id, slot, "checked in resource");
    }

    /// Pre-create resources into the store without touching the gate
    pub fn warmup(&self, count: usize) -> usize {
        let Some(factory) = &self.factory else {
            return 0;
        };

        let created = self.context.run_sync_exclusive(|state| {
            let budget = count.min(self.capacity - state.created);
            for _ in 0..budget {
                let slot = state.created;
                state.created += 1;
                state.store.seed(slot, factory());
            }
            budget
        });

        self.metrics.record_created(created);
        tracing::debug!(pool = self.id, created, "warmed up pool");
        created
    }

    pub fn process_pool<F>(&self, callback: F)
    where
        T: Clone,
        F: FnOnce(&[T]),
    {
        let snapshot = self.context.run_sync(|state| state.store.snapshot());
        callback(&snapshot);
    }

    pub fn available_count(&self) -> usize {
        self.context.run_sync(|state| state.store.len())
    }

    pub fn checked_out_count(&self) -> usize {
        self.outstanding.len()
    }

    pub fn created_count(&self) -> usize {
        self.context.run_sync(|state| state.created)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.config.checkout_timeout
    }

    pub fn get_health_status(&self) -> HealthStatus {
        let oldest = self
            .outstanding
            .iter()
            .map(|entry| entry.value().elapsed())
            .max();

        HealthStatus::new(
            self.available_count(),
            self.checked_out_count(),
            self.capacity,
            oldest,
            self.config.long_checkout_threshold,
        )
    }

    pub fn get_metrics(&self) -> PoolMetrics {
        self.metrics
            .get_metrics(self.checked_out_count(), self.available_count(), self.capacity)
    }

    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.get_metrics().export()
    }

    #[cfg(feature = "metrics")]
    pub fn export_metrics_prometheus(
        &self,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> PoolResult<String> {
        MetricsExporter::export_prometheus(&self.get_metrics(), pool_name, tags)
    }
}

/// Thread-safe pool over a fixed set of resources handed over at construction
///
/// # Examples
///
/// ```
/// use esox_gatedpool::{EagerObjectPool, PoolConfiguration};
/// use std::time::Duration;
///
/// let pool = EagerObjectPool::new(vec!["a", "b"], PoolConfiguration::default());
///
/// let first = pool.checkout().unwrap();
/// let second = pool.checkout().unwrap();
/// assert!(pool.checkout_resource(Some(Duration::from_millis(10))).is_none());
///
/// pool.checkin(first).unwrap();
/// assert_eq!(*pool.try_checkout().unwrap(), "a");
/// drop(second);
/// ```
pub struct EagerObjectPool<T: Send + Sync + 'static> {
    core: Arc<PoolCore<T>>,
}

impl<T: Send + Sync + 'static> EagerObjectPool<T> {
    /// Create a pool owning `resources`; capacity equals their count
    pub fn new(resources: Vec<T>, config: PoolConfiguration<T>) -> Self {
        let capacity = resources.len();
        let store = BackingStore::with_resources(resources, config.reuse_hook);
        Self {
            core: Arc::new(PoolCore::new(store, capacity, None, config)),
        }
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

    /// Checkout only if a resource is free right now
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

    /// Inspect a snapshot of the idle resources.
    ///
    /// Requires `T: Clone`: the idle resources are cloned under a shared
    /// lock and `callback` runs on the copy after the lock is released. The
    /// snapshot may be stale by the time `callback` runs; use it for
    /// diagnostics only.
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PrepareForReuse;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn test_eager_pool_basic() {
        let pool = EagerObjectPool::new(vec![1, 2, 3], PoolConfiguration::default());

        {
            let obj = pool.checkout().unwrap();
            assert_eq!(*obj, 1);
            assert_eq!(pool.checked_out_count(), 1);
        }

        assert_eq!(pool.available_count(), 3);
        assert_eq!(pool.checked_out_count(), 0);
    }

    #[test]
    fn test_checkout_is_fifo() {
        let pool = EagerObjectPool::new(vec![1, 2, 3], PoolConfiguration::default());

        let first = pool.try_checkout().unwrap();
        pool.checkin(first).unwrap();

        let order: Vec<i32> = (0..3).map(|_| *pool.try_checkout().unwrap()).collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn test_timeout_returns_none_without_consuming_permit() {
        let config = PoolConfiguration::new().with_timeout(Duration::from_millis(30));
        let pool = EagerObjectPool::new(vec![7], config);

        let held = pool.checkout().unwrap();
        assert!(pool.checkout().is_none());
        assert!(pool.checkout().is_none());
        assert_eq!(pool.get_metrics().exhausted_events, 2);

        drop(held);
        assert_eq!(*pool.checkout().unwrap(), 7);
    }

    #[test]
    fn test_blocked_checkout_resumes_after_checkin() {
        let pool = Arc::new(EagerObjectPool::new(vec![1], PoolConfiguration::default()));
        let held = pool.checkout().unwrap();

        let waiter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || *pool.checkout_resource(None).unwrap())
        };

        thread::sleep(Duration::from_millis(50));
        pool.checkin(held).unwrap();

        assert_eq!(waiter.join().unwrap(), 1);
    }

    #[test]
    fn test_foreign_checkin_is_rejected() {
        let a = EagerObjectPool::new(vec![1], PoolConfiguration::default());
        let b = EagerObjectPool::new(vec![2], PoolConfiguration::default());

        let from_a = a.try_checkout().unwrap();
        assert_eq!(b.checkin(from_a), Err(PoolError::ForeignResource));

        // The rejected guard still went home.
        assert_eq!(a.available_count(), 1);
        assert_eq!(b.available_count(), 1);
    }

    #[test]
    fn test_detached_checkin() {
        let pool = EagerObjectPool::new(vec![5], PoolConfiguration::default());

        let obj = pool.try_checkout().unwrap();
        pool.checkin_detached(obj).unwrap();
        assert_eq!(pool.checked_out_count(), 0);

        let again = pool.checkout_resource(Some(Duration::from_secs(5))).unwrap();
        assert_eq!(*again, 5);
        assert_eq!(pool.get_metrics().total_checked_in, 1);
    }

    #[test]
    fn test_panicking_reuse_hook_does_not_strand_permit() {
        fn reset(value: &mut i32) {
            if *value < 0 {
                panic!("cannot reset negative value");
            }
            *value = 0;
        }

        let config = PoolConfiguration::<i32>::new().with_reuse_hook(reset);
        let pool = EagerObjectPool::new(vec![1], config);

        let mut obj = pool.try_checkout().unwrap();
        *obj = -1;
        pool.checkin_detached(obj).unwrap();

        let mut again = pool.checkout_resource(Some(Duration::from_secs(5))).unwrap();
        assert_eq!(*again, -1);

        *again = -2;
        drop(again);
        assert_eq!(pool.available_count(), 1);
        assert_eq!(pool.checked_out_count(), 0);

        let last = pool.try_checkout().unwrap();
        assert_eq!(*last, -2);
    }

    #[test]
    fn test_prepare_for_reuse_runs_once_per_checkin() {
        static RESETS: AtomicUsize = AtomicUsize::new(0);

        #[derive(Clone)]
        struct Conn {
            dirty: bool,
        }

        impl PrepareForReuse for Conn {
            fn prepare_for_reuse(&mut self) {
                RESETS.fetch_add(1, Ordering::SeqCst);
                self.dirty = false;
            }
        }

        let config = PoolConfiguration::<Conn>::new().with_prepare_for_reuse();
        let pool = EagerObjectPool::new(vec![Conn { dirty: false }], config);

        for _ in 0..3 {
            let mut conn = pool.try_checkout().unwrap();
            assert!(!conn.dirty);
            conn.dirty = true;
        }

        assert_eq!(RESETS.load(Ordering::SeqCst), 3);
        pool.process_pool(|idle| assert!(idle.iter().all(|c| !c.dirty)));
    }

    #[test]
    fn test_process_pool_sees_idle_snapshot() {
        let pool = EagerObjectPool::new(vec![1, 2, 3], PoolConfiguration::default());
        let _held = pool.try_checkout().unwrap();

        let mut seen = Vec::new();
        pool.process_pool(|idle| seen.extend_from_slice(idle));
        assert_eq!(seen, vec![2, 3]);
    }

    #[test]
    fn test_health_tracks_long_checkouts() {
        let config = PoolConfiguration::new().with_long_checkout_warning(Duration::from_millis(10));
        let pool = EagerObjectPool::new(vec![1, 2, 3, 4], config);

        let _held = pool.try_checkout().unwrap();
        thread::sleep(Duration::from_millis(30));

        let health = pool.get_health_status();
        assert!(!health.is_healthy());
        assert_eq!(health.checked_out_objects, 1);
        assert!(health.oldest_checkout.unwrap() >= Duration::from_millis(30));
    }

    #[test]
    fn test_empty_pool_always_exhausted() {
        let pool = EagerObjectPool::<u8>::new(Vec::new(), PoolConfiguration::default());
        assert_eq!(pool.capacity(), 0);
        assert!(pool.try_checkout().is_none());
    }

    #[tokio::test]
    async fn test_async_checkout() {
        let pool = EagerObjectPool::new(vec![1, 2, 3], PoolConfiguration::default());

        let obj = pool.checkout_async().await.unwrap();
        assert!([1, 2, 3].contains(&*obj));
    }

    #[tokio::test]
    async fn test_async_checkout_timeout() {
        let config = PoolConfiguration::new().with_timeout(Duration::from_millis(50));
        let pool = EagerObjectPool::new(vec![1], config);

        let _held = pool.checkout_async().await.unwrap();
        let result = pool.checkout_async().await;

        assert_eq!(result.unwrap_err(), PoolError::Timeout(Duration::from_millis(50)));
        assert_eq!(pool.available_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_async_checkout_keeps_permits() {
        let pool = EagerObjectPool::new(vec![1], PoolConfiguration::default());
        let held = pool.try_checkout().unwrap();

        let pending = tokio::time::timeout(Duration::from_millis(30), pool.checkout_async()).await;
        assert!(pending.is_err());

        drop(held);
        let obj = pool.try_checkout();
        assert!(obj.is_some());
        assert_eq!(pool.available_count(), 0);
        assert_eq!(pool.checked_out_count(), 1);
    }
}
