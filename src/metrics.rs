//! Metrics collection and export for resource pools

#[cfg(feature = "serde")]
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Snapshot of a pool's counters and gauges
///
/// # Examples
///
/// ```
/// use esox_browserpool::PoolMetrics;
///
/// let metrics = PoolMetrics::default();
/// let exported = metrics.export();
/// assert_eq!(exported["total_acquired"], "0");
/// assert_eq!(exported["utilization"], "0.00");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct PoolMetrics {
    /// Successful acquisitions
    pub total_acquired: usize,

    /// Resources returned to the pool
    pub total_released: usize,

    /// Resources launched by the factory
    pub created: usize,

    /// Resources torn down
    pub destroyed: usize,

    /// Failed create hook calls
    pub create_failures: usize,

    /// Idle resources rejected by validation, for any reason
    pub validation_failures: usize,

    /// Subset of validation failures caused by the use budget
    pub retired_by_uses: usize,

    /// Teardowns that reported an error
    pub teardown_failures: usize,

    /// Acquisitions that gave up waiting
    pub timeouts: usize,

    /// Live resources
    pub size: usize,

    /// Idle resources
    pub idle: usize,

    /// Checked-out resources
    pub in_use: usize,

    /// Callers queued for a resource
    pub waiting: usize,

    /// Maximum pool size
    pub max_size: usize,

    /// In-use ratio (0.0 to 1.0)
    pub utilization: f64,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("total_acquired".to_string(), self.total_acquired.to_string());
        metrics.insert("total_released".to_string(), self.total_released.to_string());
        metrics.insert("created".to_string(), self.created.to_string());
        metrics.insert("destroyed".to_string(), self.destroyed.to_string());
        metrics.insert("create_failures".to_string(), self.create_failures.to_string());
        metrics.insert("validation_failures".to_string(), self.validation_failures.to_string());
        metrics.insert("retired_by_uses".to_string(), self.retired_by_uses.to_string());
        metrics.insert("teardown_failures".to_string(), self.teardown_failures.to_string());
        metrics.insert("timeouts".to_string(), self.timeouts.to_string());
        metrics.insert("size".to_string(), self.size.to_string());
        metrics.insert("idle".to_string(), self.idle.to_string());
        metrics.insert("in_use".to_string(), self.in_use.to_string());
        metrics.insert("waiting".to_string(), self.waiting.to_string());
        metrics.insert("max_size".to_string(), self.max_size.to_string());
        metrics.insert("utilization".to_string(), format!("{:.2}", self.utilization));
        metrics
    }
}

/// Metrics exporter for Prometheus format
pub struct MetricsExporter;

impl MetricsExporter {
    /// Export metrics in Prometheus exposition format
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_browserpool::{MetricsExporter, PoolMetrics};
    /// use std::collections::HashMap;
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("service".to_string(), "renderer".to_string());
    ///
    /// let output = MetricsExporter::export_prometheus(&PoolMetrics::default(), "chrome", Some(&tags));
    /// assert!(output.contains("browserpool_resources_in_use{pool=\"chrome\",service=\"renderer\"} 0"));
    /// ```
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        let mut output = String::new();
        let labels = Self::format_labels(pool_name, tags);

        let gauges: [(&str, &str, String); 5] = [
            ("browserpool_resources", "Live resources", metrics.size.to_string()),
            ("browserpool_resources_idle", "Idle resources", metrics.idle.to_string()),
            ("browserpool_resources_in_use", "Checked-out resources", metrics.in_use.to_string()),
            ("browserpool_waiting", "Callers waiting for a resource", metrics.waiting.to_string()),
            ("browserpool_utilization", "Pool utilization ratio", format!("{:.2}", metrics.utilization)),
        ];
        for (name, help, value) in gauges {
            Self::push_metric(&mut output, name, help, "gauge", &labels, &value);
        }

        let counters = [
            ("browserpool_acquired_total", "Total acquisitions", metrics.total_acquired),
            ("browserpool_released_total", "Total releases", metrics.total_released),
            ("browserpool_created_total", "Resources created", metrics.created),
            ("browserpool_destroyed_total", "Resources destroyed", metrics.destroyed),
            ("browserpool_create_failures_total", "Failed resource creations", metrics.create_failures),
            ("browserpool_validation_failures_total", "Validation failures", metrics.validation_failures),
            ("browserpool_retired_by_uses_total", "Resources retired for reaching max uses", metrics.retired_by_uses),
            ("browserpool_teardown_failures_total", "Failed resource teardowns", metrics.teardown_failures),
            ("browserpool_timeouts_total", "Acquisitions that timed out", metrics.timeouts),
        ];
        for (name, help, value) in counters {
            Self::push_metric(&mut output, name, help, "counter", &labels, &value.to_string());
        }

        output
    }

    fn push_metric(output: &mut String, name: &str, help: &str, kind: &str, labels: &str, value: &str) {
        output.push_str(&format!("# HELP {} {}\n", name, help));
        output.push_str(&format!("# TYPE {} {}\n", name, kind));
        output.push_str(&format!("{}{{{}}} {}\n", name, labels, value));
    }

    fn format_labels(pool_name: &str, tags: Option<&HashMap<String, String>>) -> String {
        let mut labels = vec![format!("pool=\"{}\"", pool_name)];

        if let Some(tags) = tags {
            let mut sorted: Vec<_> = tags.iter().collect();
            sorted.sort();
            for (key, value) in sorted {
                labels.push(format!("{}=\"{}\"", key, value));
            }
        }

        labels.join(",")
    }
}

/// Internal metrics tracker
#[derive(Debug, Default)]
pub(crate) struct MetricsTracker {
    pub total_acquired: AtomicUsize,
    pub total_released: AtomicUsize,
    pub created: AtomicUsize,
    pub destroyed: AtomicUsize,
    pub create_failures: AtomicUsize,
    pub validation_failures: AtomicUsize,
    pub retired_by_uses: AtomicUsize,
    pub teardown_failures: AtomicUsize,
    pub timeouts: AtomicUsize,
}

/// Point-in-time pool occupancy fed into a snapshot
#[derive(Debug, Clone, Copy)]
pub(crate) struct Occupancy {
    pub size: usize,
    pub idle: usize,
    pub in_use: usize,
    pub waiting: usize,
    pub max_size: usize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, occupancy: Occupancy) -> PoolMetrics {
        let utilization = if occupancy.max_size > 0 {
            occupancy.in_use as f64 / occupancy.max_size as f64
        } else {
            0.0
        };

        PoolMetrics {
            total_acquired: self.total_acquired.load(Ordering::Relaxed),
            total_released: self.total_released.load(Ordering::Relaxed),
            created: self.created.load(Ordering::Relaxed),
            destroyed: self.destroyed.load(Ordering::Relaxed),
            create_failures: self.create_failures.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            retired_by_uses: self.retired_by_uses.load(Ordering::Relaxed),
            teardown_failures: self.teardown_failures.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            size: occupancy.size,
            idle: occupancy.idle,
            in_use: occupancy.in_use,
            waiting: occupancy.waiting,
            max_size: occupancy.max_size,
            utilization,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_utilization() {
        let tracker = MetricsTracker::new();
        MetricsTracker::increment(&tracker.total_acquired);
        MetricsTracker::increment(&tracker.total_acquired);

        let metrics = tracker.snapshot(Occupancy {
            size: 3,
            idle: 1,
            in_use: 2,
            waiting: 0,
            max_size: 4,
        });

        assert_eq!(metrics.total_acquired, 2);
        assert_eq!(metrics.utilization, 0.5);
        assert_eq!(metrics.export()["in_use"], "2");
    }

    #[test]
    fn test_prometheus_output() {
        let metrics = PoolMetrics {
            retired_by_uses: 3,
            max_size: 2,
            ..Default::default()
        };

        let output = MetricsExporter::export_prometheus(&metrics, "chrome", None);
        assert!(output.contains("# TYPE browserpool_retired_by_uses_total counter"));
        assert!(output.contains("browserpool_retired_by_uses_total{pool=\"chrome\"} 3"));
        assert!(output.contains("# TYPE browserpool_resources_idle gauge"));
    }
}
