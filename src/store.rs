//! FIFO backing store for pooled resources

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};

/// Reset capability a resource may offer before it is handed out again.
///
/// Enable it on a pool with
/// [`PoolConfiguration::with_prepare_for_reuse`](crate::PoolConfiguration::with_prepare_for_reuse).
///
/// # Examples
///
/// ```
/// use esox_gatedpool::{EagerObjectPool, PoolConfiguration, PrepareForReuse};
///
/// struct Buffer(Vec<u8>);
///
/// impl PrepareForReuse for Buffer {
///     fn prepare_for_reuse(&mut self) {
///         self.0.clear();
///     }
/// }
///
/// let config = PoolConfiguration::<Buffer>::new().with_prepare_for_reuse();
/// let pool = EagerObjectPool::new(vec![Buffer(Vec::new())], config);
///
/// {
///     let mut buffer = pool.try_checkout().unwrap();
///     buffer.0.extend_from_slice(b"dirty");
/// }
///
/// assert!(pool.try_checkout().unwrap().0.is_empty());
/// ```
pub trait PrepareForReuse {
    /// Reset internal state so the next borrower sees a clean resource
    fn prepare_for_reuse(&mut self);
}

/// Ordered store of idle resources, each tagged with its slot id.
///
/// Not synchronized; the owning pool serializes every access.
pub(crate) struct BackingStore<T> {
    items: VecDeque<(usize, T)>,
    reuse_hook: Option<fn(&mut T)>,
}

impl<T> BackingStore<T> {
    pub fn new(reuse_hook: Option<fn(&mut T)>) -> Self {
        Self {
            items: VecDeque::new(),
            reuse_hook,
        }
    }

    /// Seed the store without running the reuse hook
    pub fn with_resources(resources: Vec<T>, reuse_hook: Option<fn(&mut T)>) -> Self {
        Self {
            items: resources.into_iter().enumerate().collect(),
            reuse_hook,
        }
    }

    /// Remove the oldest idle resource
    pub fn checkout(&mut self) -> Option<(usize, T)> {
        self.items.pop_front()
    }

    /// Reset the resource and append it behind every other idle resource.
    ///
    /// A panicking hook is logged and the resource is stored anyway, so the
    /// number of idle resources always matches the free permits.
    pub fn checkin(&mut self, slot: usize, mut resource: T) {
        if let Some(hook) = self.reuse_hook
            && panic::catch_unwind(AssertUnwindSafe(|| hook(&mut resource))).is_err()
        {
            tracing::error!(slot, "reuse hook panicked, keeping resource as is");
        }
        self.items.push_back((slot, resource));
    }

    /// Append a freshly created resource; new resources need no reset
    pub fn seed(&mut self, slot: usize, resource: T) {
        self.items.push_back((slot, resource));
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

impl<T: Clone> BackingStore<T> {
    pub fn snapshot(&self) -> Vec<T> {
        self.items.iter().map(|(_, resource)| resource.clone()).collect()
    }
}
