//! Metrics collection and export for object pools

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "metrics")]
use crate::errors::{PoolError, PoolResult};

/// Metrics data for a pool
///
/// # Examples
///
/// ```
/// use esox_gatedpool::{EagerObjectPool, PoolConfiguration};
///
/// let pool = EagerObjectPool::new(vec![1, 2, 3], PoolConfiguration::default());
///
/// {
///     let _obj = pool.try_checkout().unwrap();
///     let metrics = pool.get_metrics();
///     assert_eq!(metrics.total_checked_out, 1);
///     assert_eq!(metrics.checked_out, 1);
///     assert_eq!(metrics.available_objects, 2);
/// }
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "metrics", derive(serde::Serialize))]
pub struct PoolMetrics {
    /// Successful checkouts since creation
    pub total_checked_out: usize,

    /// Checkins since creation
    pub total_checked_in: usize,

    /// Checkouts that gave up because no permit arrived in time
    pub exhausted_events: usize,

    /// Resources ever created by the pool (eager pools count their seed)
    pub resources_created: usize,

    /// Resources currently lent out
    pub checked_out: usize,

    /// Resources currently idle in the store
    pub available_objects: usize,

    /// Checked-out share of capacity (0.0 to 1.0)
    pub utilization: f64,

    /// Maximum number of resources that can be lent out at once
    pub max_capacity: usize,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("total_checked_out".to_string(), self.total_checked_out.to_string());
        metrics.insert("total_checked_in".to_string(), self.total_checked_in.to_string());
        metrics.insert("exhausted_events".to_string(), self.exhausted_events.to_string());
        metrics.insert("resources_created".to_string(), self.resources_created.to_string());
        metrics.insert("checked_out".to_string(), self.checked_out.to_string());
        metrics.insert("available_objects".to_string(), self.available_objects.to_string());
        metrics.insert("utilization".to_string(), format!("{:.2}", self.utilization));
        metrics.insert("max_capacity".to_string(), self.max_capacity.to_string());
        metrics
    }
}

/// Metrics exporter for Prometheus format
#[cfg(feature = "metrics")]
pub struct MetricsExporter;

#[cfg(feature = "metrics")]
impl MetricsExporter {
    /// Export metrics in Prometheus exposition format
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_gatedpool::{EagerObjectPool, PoolConfiguration};
    /// use std::collections::HashMap;
    ///
    /// let pool = EagerObjectPool::new(vec![1, 2, 3], PoolConfiguration::default());
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "api".to_string());
    ///
    /// let output = pool.export_metrics_prometheus("my_pool", Some(&tags)).unwrap();
    /// assert!(output.contains("objectpool_objects_checked_out"));
    /// assert!(output.contains("service=\"api\""));
    /// ```
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> PoolResult<String> {
        use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Opts, Registry, TextEncoder};

        let mut labels = tags.cloned().unwrap_or_default();
        labels.insert("pool".to_string(), pool_name.to_string());
        let opts = |name: &str, help: &str| Opts::new(name, help).const_labels(labels.clone());

        let registry = Registry::new();

        for (name, help, value) in [
            ("objectpool_objects_checked_out", "Resources currently lent out", metrics.checked_out),
            ("objectpool_objects_available", "Resources currently idle in the pool", metrics.available_objects),
            ("objectpool_capacity", "Maximum resources lent out at once", metrics.max_capacity),
        ] {
            let gauge = IntGauge::with_opts(opts(name, help)).map_err(Self::export_error)?;
            gauge.set(value as i64);
            registry.register(Box::new(gauge)).map_err(Self::export_error)?;
        }

        let utilization = Gauge::with_opts(opts("objectpool_utilization", "Pool utilization ratio"))
            .map_err(Self::export_error)?;
        utilization.set(metrics.utilization);
        registry.register(Box::new(utilization)).map_err(Self::export_error)?;

        for (name, help, value) in [
            ("objectpool_checkouts_total", "Total successful checkouts", metrics.total_checked_out),
            ("objectpool_checkins_total", "Total checkins", metrics.total_checked_in),
            ("objectpool_exhausted_total", "Checkouts that timed out", metrics.exhausted_events),
            ("objectpool_created_total", "Resources created", metrics.resources_created),
        ] {
            let counter = IntCounter::with_opts(opts(name, help)).map_err(Self::export_error)?;
            counter.inc_by(value as u64);
            registry.register(Box::new(counter)).map_err(Self::export_error)?;
        }

        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .map_err(Self::export_error)?;

        String::from_utf8(buffer).map_err(|e| PoolError::MetricsExport(e.to_string()))
    }

    fn export_error(err: prometheus::Error) -> PoolError {
        PoolError::MetricsExport(err.to_string())
    }
}

/// Internal metrics tracker
pub(crate) struct MetricsTracker {
    pub total_checked_out: AtomicUsize,
    pub total_checked_in: AtomicUsize,
    pub exhausted_events: AtomicUsize,
    pub resources_created: AtomicUsize,
}

impl MetricsTracker {
    pub fn new(seeded: usize) -> Self {
        Self {
            total_checked_out: AtomicUsize::new(0),
            total_checked_in: AtomicUsize::new(0),
            exhausted_events: AtomicUsize::new(0),
            resources_created: AtomicUsize::new(seeded),
        }
    }

    pub fn record_checkout(&self) {
        self.total_checked_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_checkin(&self) {
        self.total_checked_in.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_exhausted(&self) {
        self.exhausted_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_created(&self, count: usize) {
        self.resources_created.fetch_add(count, Ordering::Relaxed);
    }

    pub fn get_metrics(&self, checked_out: usize, available: usize, capacity: usize) -> PoolMetrics {
        let utilization = if capacity > 0 {
            checked_out as f64 / capacity as f64
        } else {
            0.0
        };

        PoolMetrics {
            total_checked_out: self.total_checked_out.load(Ordering::Relaxed),
            total_checked_in: self.total_checked_in.load(Ordering::Relaxed),
            exhausted_events: self.exhausted_events.load(Ordering::Relaxed),
            resources_created: self.resources_created.load(Ordering::Relaxed),
            checked_out,
            available_objects: available,
            utilization,
            max_capacity: capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_snapshot() {
        let tracker = MetricsTracker::new(3);
        tracker.record_checkout();
        tracker.record_checkout();
        tracker.record_checkin();
        tracker.record_exhausted();

        let metrics = tracker.get_metrics(1, 2, 4);
        assert_eq!(metrics.total_checked_out, 2);
        assert_eq!(metrics.total_checked_in, 1);
        assert_eq!(metrics.exhausted_events, 1);
        assert_eq!(metrics.resources_created, 3);
        assert_eq!(metrics.utilization, 0.25);

        let exported = metrics.export();
        assert_eq!(exported["utilization"], "0.25");
        assert_eq!(exported["max_capacity"], "4");
    }

    #[test]
    fn test_zero_capacity_utilization() {
        let metrics = MetricsTracker::new(0).get_metrics(0, 0, 0);
        assert_eq!(metrics.utilization, 0.0);
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_prometheus_export() {
        let metrics = MetricsTracker::new(2).get_metrics(1, 1, 2);
        let output = MetricsExporter::export_prometheus(&metrics, "workers", None).unwrap();

        assert!(output.contains("# TYPE objectpool_checkouts_total counter"));
        assert!(output.contains("objectpool_objects_checked_out{pool=\"workers\"} 1"));
        assert!(output.contains("objectpool_created_total{pool=\"workers\"} 2"));
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_prometheus_rejects_bad_label() {
        let metrics = MetricsTracker::new(0).get_metrics(0, 0, 1);
        let mut tags = HashMap::new();
        tags.insert("bad label".to_string(), "x".to_string());

        let result = MetricsExporter::export_prometheus(&metrics, "workers", Some(&tags));
        assert!(matches!(result, Err(PoolError::MetricsExport(_))));
    }
}
