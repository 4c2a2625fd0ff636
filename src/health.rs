//! Health monitoring for object pools

use std::time::Duration;

/// Health status of an object pool
///
/// # Examples
///
/// ```
/// use esox_gatedpool::{EagerObjectPool, PoolConfiguration};
///
/// let pool = EagerObjectPool::new(vec![1, 2, 3], PoolConfiguration::default());
///
/// let health = pool.get_health_status();
/// assert!(health.is_healthy());
/// assert_eq!(health.available_objects, 3);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "metrics", derive(serde::Serialize))]
pub struct HealthStatus {
    /// Whether the pool is healthy
    pub is_healthy: bool,

    /// Number of warnings detected
    pub warning_count: usize,

    /// Current pool utilization (0.0 to 1.0)
    pub utilization: f64,

    /// Idle resources in the store
    pub available_objects: usize,

    /// Resources currently lent out
    pub checked_out_objects: usize,

    /// Total capacity
    pub total_capacity: usize,

    /// Age of the longest outstanding checkout
    pub oldest_checkout: Option<Duration>,

    /// Warning messages
    pub warnings: Vec<String>,
}

impl HealthStatus {
    /// Create a new health status
    pub fn new(
        available: usize,
        checked_out: usize,
        capacity: usize,
        oldest_checkout: Option<Duration>,
        long_checkout_threshold: Option<Duration>,
    ) -> Self {
        let utilization = if capacity > 0 {
            checked_out as f64 / capacity as f64
        } else {
            0.0
        };

        let mut warnings = Vec::new();
        let mut is_healthy = true;

        if utilization > 0.9 {
            warnings.push(format!("High utilization: {:.1}%", utilization * 100.0));
            is_healthy = false;
        }

        // Lazy pools start empty, so only flag an empty store once everything is lent.
        if available == 0 && capacity > 0 && checked_out >= capacity {
            warnings.push("Pool is empty".to_string());
        }

        if let (Some(age), Some(threshold)) = (oldest_checkout, long_checkout_threshold)
            && age > threshold
        {
            warnings.push(format!("Resource checked out for {:.1}s", age.as_secs_f64()));
            is_healthy = false;
        }

        Self {
            is_healthy,
            warning_count: warnings.len(),
            utilization,
            available_objects: available,
            checked_out_objects: checked_out,
            total_capacity: capacity,
            oldest_checkout,
            warnings,
        }
    }

    /// Check if the pool is healthy
    pub fn is_healthy(&self) -> bool {
        self.is_healthy
    }
}
