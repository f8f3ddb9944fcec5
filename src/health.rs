//! Health monitoring for connection pools
//!
//! One monitor thread runs per pool instance. Each cycle it samples a single
//! idle connection, pushes it back if the backing resource is still alive,
//! and otherwise replaces or discards it depending on how far the pool sits
//! above its minimum size.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::RecvTimeoutError;
use tracing::{debug, error, warn};

use crate::connection::{ConnectionFactory, PooledConnection};
use crate::pool::PoolShared;

/// How long a cycle waits for an idle connection before skipping
const IDLE_POP_WAIT: Duration = Duration::from_millis(20);

/// Lifecycle state of a pool instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Constructed, eager creation not yet run
    Starting,

    /// Serving acquires; monitor cycling
    Running,

    /// Shutdown requested; idle connections being closed
    Draining,

    /// Error latch set; the pool will never serve again
    Errored,

    /// All reachable connections closed
    Stopped,
}

/// Point-in-time health snapshot of a pool
///
/// # Examples
///
/// ```
/// use connpool::HealthStatus;
///
/// let health = HealthStatus::new(3, 0, 3, 5, false);
/// assert!(health.is_healthy());
/// assert_eq!(health.idle_connections, 3);
/// ```
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Whether the pool is healthy
    pub is_healthy: bool,

    /// Current utilization (checked out / max, 0.0 to 1.0)
    pub utilization: f64,

    /// Connections waiting in the idle buffer
    pub idle_connections: usize,

    /// Connections currently checked out
    pub checked_out: usize,

    /// Total open connections
    pub live_connections: usize,

    /// Configured maximum
    pub max_size: usize,

    /// Warning messages
    pub warnings: Vec<String>,
}

impl HealthStatus {
    /// Build a snapshot from the pool's counters
    pub fn new(
        idle: usize,
        checked_out: usize,
        live: usize,
        max_size: usize,
        errored: bool,
    ) -> Self {
        let utilization = if max_size > 0 {
            checked_out as f64 / max_size as f64
        } else {
            0.0
        };

        let mut warnings = Vec::new();
        let mut is_healthy = true;

        if errored {
            warnings.push("pool has latched an error".to_string());
            is_healthy = false;
        }

        if utilization > 0.9 {
            warnings.push(format!("high utilization: {:.1}%", utilization * 100.0));
            is_healthy = false;
        }

        if idle == 0 && max_size > 0 {
            warnings.push("no idle connections".to_string());
        }

        Self {
            is_healthy,
            utilization,
            idle_connections: idle,
            checked_out,
            live_connections: live,
            max_size,
            warnings,
        }
    }

    /// Check if the pool is healthy
    pub fn is_healthy(&self) -> bool {
        self.is_healthy
    }
}

pub(crate) fn spawn_monitor<F: ConnectionFactory>(shared: Arc<PoolShared<F>>) -> JoinHandle<()> {
    thread::spawn(move || run_monitor(shared))
}

fn run_monitor<F: ConnectionFactory>(shared: Arc<PoolShared<F>>) {
    debug!("health monitor started");

    loop {
        thread::sleep(shared.config.check_interval);
        if !shared.is_running() || shared.is_errored() {
            break;
        }

        // Sample one idle connection; everything may be checked out, in
        // which case this cycle has nothing to look at.
        let (mut conn, id) = match shared.idle_rx.recv_timeout(IDLE_POP_WAIT) {
            Ok(pair) => pair,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        if conn.is_open() {
            shared.push_idle(conn, id);
            continue;
        }

        conn.close();

        if shared.idle_rx.len() > shared.config.min_size {
            // Above the floor: shrink instead of replacing.
            shared.live_count.fetch_sub(1, Ordering::Relaxed);
            shared.metrics.total_reaped.fetch_add(1, Ordering::Relaxed);
            warn!(id, "discarded stale connection");
            continue;
        }

        match shared.create_connection() {
            Ok((fresh, fresh_id)) => {
                // One-for-one swap; the live count is unchanged.
                shared.push_idle(fresh, fresh_id);
                shared.metrics.total_replaced.fetch_add(1, Ordering::Relaxed);
                debug!(stale = id, replacement = fresh_id, "replaced stale connection");
            }
            Err(err) => {
                shared.live_count.fetch_sub(1, Ordering::Relaxed);
                error!(error = %err, "could not replace stale connection; latching pool error");
                shared.latch_error();
                break;
            }
        }
    }

    shared.drain_idle();
    debug!("health monitor stopped");
}
