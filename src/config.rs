//! Pool configuration options

use crate::store::PrepareForReuse;
use std::time::Duration;

/// Configuration for object pool behavior
///
/// # Examples
///
/// ```
/// use esox_gatedpool::PoolConfiguration;
/// use std::time::Duration;
///
/// let config = PoolConfiguration::<i32>::new()
///     .with_timeout(Duration::from_secs(2))
///     .with_long_checkout_warning(Duration::from_secs(60));
///
/// assert_eq!(config.checkout_timeout, Some(Duration::from_secs(2)));
/// assert!(config.reuse_hook.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfiguration<T> {
    /// Default wait for `checkout` and `checkout_async`; `None` waits forever
    pub checkout_timeout: Option<Duration>,

    /// How often `checkout_async` re-polls the gate while waiting
    pub async_poll_interval: Duration,

    /// Reset applied to every resource on its way back into the pool
    pub reuse_hook: Option<fn(&mut T)>,

    /// Checkouts held longer than this are reported by the health status
    pub long_checkout_threshold: Option<Duration>,
}

impl<T> Default for PoolConfiguration<T> {
    fn default() -> Self {
        Self {
            checkout_timeout: None,
            async_poll_interval: Duration::from_millis(10),
            reuse_hook: None,
            long_checkout_threshold: None,
        }
    }
}

impl<T> PoolConfiguration<T> {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default checkout timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.checkout_timeout = Some(timeout);
        self
    }

    /// Set the async polling interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.async_poll_interval = interval;
        self
    }

    /// Run `hook` on each resource as it is checked in
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_gatedpool::{EagerObjectPool, PoolConfiguration};
    ///
    /// let config = PoolConfiguration::<String>::new().with_reuse_hook(|s| s.clear());
    /// let pool = EagerObjectPool::new(vec![String::new()], config);
    ///
    /// pool.try_checkout().unwrap().push_str("scratch");
    /// assert_eq!(*pool.try_checkout().unwrap(), "");
    /// ```
    pub fn with_reuse_hook(mut self, hook: fn(&mut T)) -> Self {
        self.reuse_hook = Some(hook);
        self
    }

    /// Warn in the health status about checkouts held longer than `threshold`
    pub fn with_long_checkout_warning(mut self, threshold: Duration) -> Self {
        self.long_checkout_threshold = Some(threshold);
        self
    }
}

impl<T: PrepareForReuse> PoolConfiguration<T> {
    /// Use the resource's own [`PrepareForReuse`] implementation as reuse hook
    pub fn with_prepare_for_reuse(mut self) -> Self {
        self.reuse_hook = Some(T::prepare_for_reuse);
        self
    }
}
