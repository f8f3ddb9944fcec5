//! Metrics collection and export for connection pools

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Snapshot of pool metrics
///
/// # Examples
///
/// ```
/// use connpool::PoolMetrics;
///
/// let metrics = PoolMetrics {
///     total_acquired: 10,
///     total_released: 9,
///     total_created: 4,
///     total_reaped: 0,
///     total_replaced: 1,
///     connect_failures: 0,
///     exhausted_events: 0,
///     checked_out: 1,
///     idle_connections: 3,
///     live_connections: 4,
///     max_size: 5,
///     utilization: 0.2,
/// };
///
/// let exported = metrics.export();
/// assert_eq!(exported["total_acquired"], "10");
/// ```
#[derive(Debug, Clone)]
pub struct PoolMetrics {
    /// Total connections handed out to callers
    pub total_acquired: usize,

    /// Total connections returned by callers
    pub total_released: usize,

    /// Total connections created by the factory
    pub total_created: usize,

    /// Stale connections discarded without replacement
    pub total_reaped: usize,

    /// Stale connections swapped one-for-one
    pub total_replaced: usize,

    /// Factory failures while creating connections
    pub connect_failures: usize,

    /// Acquires that failed after both wait windows
    pub exhausted_events: usize,

    /// Connections currently checked out
    pub checked_out: usize,

    /// Connections currently idle
    pub idle_connections: usize,

    /// Total open connections
    pub live_connections: usize,

    /// Configured maximum pool size
    pub max_size: usize,

    /// Utilization ratio (0.0 to 1.0)
    pub utilization: f64,
}

impl PoolMetrics {
    /// Export metrics as a string map
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("total_acquired".to_string(), self.total_acquired.to_string());
        metrics.insert("total_released".to_string(), self.total_released.to_string());
        metrics.insert("total_created".to_string(), self.total_created.to_string());
        metrics.insert("total_reaped".to_string(), self.total_reaped.to_string());
        metrics.insert("total_replaced".to_string(), self.total_replaced.to_string());
        metrics.insert("connect_failures".to_string(), self.connect_failures.to_string());
        metrics.insert("exhausted_events".to_string(), self.exhausted_events.to_string());
        metrics.insert("checked_out".to_string(), self.checked_out.to_string());
        metrics.insert("idle_connections".to_string(), self.idle_connections.to_string());
        metrics.insert("live_connections".to_string(), self.live_connections.to_string());
        metrics.insert("max_size".to_string(), self.max_size.to_string());
        metrics.insert("utilization".to_string(), format!("{:.2}", self.utilization));
        metrics
    }
}

/// Metrics exporter for Prometheus format
pub struct MetricsExporter;

impl MetricsExporter {
    /// Export metrics in Prometheus exposition format
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        let mut output = String::new();
        let labels = Self::format_labels(pool_name, tags);

        // Gauge metrics
        output.push_str("# HELP connpool_connections_live Total open connections\n");
        output.push_str("# TYPE connpool_connections_live gauge\n");
        output.push_str(&format!(
            "connpool_connections_live{{{}}} {}\n",
            labels, metrics.live_connections
        ));

        output.push_str("# HELP connpool_connections_idle Connections idle in the pool\n");
        output.push_str("# TYPE connpool_connections_idle gauge\n");
        output.push_str(&format!(
            "connpool_connections_idle{{{}}} {}\n",
            labels, metrics.idle_connections
        ));

        output.push_str("# HELP connpool_connections_checked_out Connections checked out\n");
        output.push_str("# TYPE connpool_connections_checked_out gauge\n");
        output.push_str(&format!(
            "connpool_connections_checked_out{{{}}} {}\n",
            labels, metrics.checked_out
        ));

        output.push_str("# HELP connpool_utilization Pool utilization ratio\n");
        output.push_str("# TYPE connpool_utilization gauge\n");
        output.push_str(&format!(
            "connpool_utilization{{{}}} {:.2}\n",
            labels, metrics.utilization
        ));

        // Counter metrics
        output.push_str("# HELP connpool_acquired_total Total connections handed out\n");
        output.push_str("# TYPE connpool_acquired_total counter\n");
        output.push_str(&format!(
            "connpool_acquired_total{{{}}} {}\n",
            labels, metrics.total_acquired
        ));

        output.push_str("# HELP connpool_released_total Total connections returned\n");
        output.push_str("# TYPE connpool_released_total counter\n");
        output.push_str(&format!(
            "connpool_released_total{{{}}} {}\n",
            labels, metrics.total_released
        ));

        output.push_str("# HELP connpool_created_total Total connections created\n");
        output.push_str("# TYPE connpool_created_total counter\n");
        output.push_str(&format!(
            "connpool_created_total{{{}}} {}\n",
            labels, metrics.total_created
        ));

        output.push_str("# HELP connpool_reaped_total Stale connections discarded\n");
        output.push_str("# TYPE connpool_reaped_total counter\n");
        output.push_str(&format!(
            "connpool_reaped_total{{{}}} {}\n",
            labels, metrics.total_reaped
        ));

        output.push_str("# HELP connpool_replaced_total Stale connections replaced\n");
        output.push_str("# TYPE connpool_replaced_total counter\n");
        output.push_str(&format!(
            "connpool_replaced_total{{{}}} {}\n",
            labels, metrics.total_replaced
        ));

        output.push_str("# HELP connpool_connect_failures_total Factory failures\n");
        output.push_str("# TYPE connpool_connect_failures_total counter\n");
        output.push_str(&format!(
            "connpool_connect_failures_total{{{}}} {}\n",
            labels, metrics.connect_failures
        ));

        output.push_str("# HELP connpool_exhausted_total Acquires that timed out\n");
        output.push_str("# TYPE connpool_exhausted_total counter\n");
        output.push_str(&format!(
            "connpool_exhausted_total{{{}}} {}\n",
            labels, metrics.exhausted_events
        ));

        output
    }

    fn format_labels(pool_name: &str, tags: Option<&HashMap<String, String>>) -> String {
        let mut labels = vec![format!("pool=\"{}\"", pool_name)];

        if let Some(tags) = tags {
            for (key, value) in tags {
                labels.push(format!("{}=\"{}\"", key, value));
            }
        }

        labels.join(",")
    }
}

/// Internal metrics tracker
pub(crate) struct MetricsTracker {
    pub total_acquired: AtomicUsize,
    pub total_released: AtomicUsize,
    pub total_created: AtomicUsize,
    pub total_reaped: AtomicUsize,
    pub total_replaced: AtomicUsize,
    pub connect_failures: AtomicUsize,
    pub exhausted_events: AtomicUsize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self {
            total_acquired: AtomicUsize::new(0),
            total_released: AtomicUsize::new(0),
            total_created: AtomicUsize::new(0),
            total_reaped: AtomicUsize::new(0),
            total_replaced: AtomicUsize::new(0),
            connect_failures: AtomicUsize::new(0),
            exhausted_events: AtomicUsize::new(0),
        }
    }

    pub fn snapshot(
        &self,
        checked_out: usize,
        idle: usize,
        live: usize,
        max_size: usize,
    ) -> PoolMetrics {
        let utilization = if max_size > 0 {
            checked_out as f64 / max_size as f64
        } else {
            0.0
        };

        PoolMetrics {
            total_acquired: self.total_acquired.load(Ordering::Relaxed),
            total_released: self.total_released.load(Ordering::Relaxed),
            total_created: self.total_created.load(Ordering::Relaxed),
            total_reaped: self.total_reaped.load(Ordering::Relaxed),
            total_replaced: self.total_replaced.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
            exhausted_events: self.exhausted_events.load(Ordering::Relaxed),
            checked_out,
            idle_connections: idle,
            live_connections: live,
            max_size,
            utilization,
        }
    }
}
