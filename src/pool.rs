//! Core connection pool implementation

use crate::config::{ConnectionParameters, PoolConfig};
use crate::connection::{ConnectionFactory, PooledConnection};
use crate::errors::{PoolError, PoolResult};
use crate::health::{self, HealthStatus, PoolState};
use crate::metrics::{MetricsExporter, MetricsTracker, PoolMetrics};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// A checked-out connection that returns itself to the pool when dropped
pub struct PooledConn<C> {
    conn: Option<C>,
    id: usize,
    return_fn: Arc<dyn Fn(C, usize) + Send + Sync>,
}

impl<C> PooledConn<C> {
    fn new(conn: C, id: usize, return_fn: Arc<dyn Fn(C, usize) + Send + Sync>) -> Self {
        Self {
            conn: Some(conn),
            id,
            return_fn,
        }
    }

    #[cfg(test)]
    pub(crate) fn id(&self) -> usize {
        self.id
    }
}

impl<C> fmt::Debug for PooledConn<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConn").field("id", &self.id).finish()
    }
}

impl<C> Deref for PooledConn<C> {
    type Target = C;

    fn deref(&self) -> &Self::Target {
        self.conn.as_ref().expect("connection already returned")
    }
}

impl<C> DerefMut for PooledConn<C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().expect("connection already returned")
    }
}

impl<C> Drop for PooledConn<C> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            (self.return_fn)(conn, self.id);
        }
    }
}

/// State shared between callers and the health monitor. One per pool
/// instance; never process-wide.
pub(crate) struct PoolShared<F: ConnectionFactory> {
    pub(crate) config: PoolConfig,
    pub(crate) params: ConnectionParameters,
    factory: F,
    idle_tx: Sender<(F::Connection, usize)>,
    pub(crate) idle_rx: Receiver<(F::Connection, usize)>,
    pub(crate) live_count: AtomicUsize,
    errored: AtomicBool,
    state: Mutex<PoolState>,
    active: DashMap<usize, ()>,
    next_id: AtomicUsize,
    pub(crate) metrics: MetricsTracker,
}

impl<F: ConnectionFactory> PoolShared<F> {
    pub(crate) fn state(&self) -> PoolState {
        *self.state.lock()
    }

    pub(crate) fn set_state(&self, state: PoolState) {
        *self.state.lock() = state;
    }

    pub(crate) fn is_running(&self) -> bool {
        *self.state.lock() == PoolState::Running
    }

    pub(crate) fn is_errored(&self) -> bool {
        self.errored.load(Ordering::Relaxed)
    }

    /// One-way transition: the latch never reverts for the life of the pool.
    pub(crate) fn latch_error(&self) {
        self.errored.store(true, Ordering::Relaxed);
        let mut state = self.state.lock();
        if *state != PoolState::Stopped {
            *state = PoolState::Errored;
        }
    }

    /// Create and open a fresh connection through the factory
    pub(crate) fn create_connection(&self) -> PoolResult<(F::Connection, usize)> {
        match self.factory.create(&self.params) {
            Ok(conn) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                self.metrics.total_created.fetch_add(1, Ordering::Relaxed);
                Ok((conn, id))
            }
            Err(err) => {
                self.metrics.connect_failures.fetch_add(1, Ordering::Relaxed);
                Err(err)
            }
        }
    }

    /// Reserve one live slot below `max_size`; the caller owes a connection
    /// or a `release_slot`.
    fn try_reserve_slot(&self) -> bool {
        let max = self.config.max_size;
        self.live_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                (n < max).then_some(n + 1)
            })
            .is_ok()
    }

    fn release_slot(&self) {
        self.live_count.fetch_sub(1, Ordering::Relaxed);
    }

    /// Return a connection to the idle buffer. The channel capacity equals
    /// `max_size`, so with the live-count invariant intact this never fills.
    pub(crate) fn push_idle(&self, conn: F::Connection, id: usize) {
        if let Err(err) = self.idle_tx.try_send((conn, id)) {
            let (mut conn, id) = err.into_inner();
            warn!(id, "idle buffer rejected connection; closing it");
            conn.close();
            self.release_slot();
        }
    }

    /// Close everything currently reachable in the idle buffer
    pub(crate) fn drain_idle(&self) {
        while let Ok((mut conn, id)) = self.idle_rx.try_recv() {
            conn.close();
            self.release_slot();
            debug!(id, "closed idle connection");
        }
    }

    fn checkout(self: &Arc<Self>, conn: F::Connection, id: usize) -> PooledConn<F::Connection> {
        self.active.insert(id, ());
        self.metrics.total_acquired.fetch_add(1, Ordering::Relaxed);
        let shared = Arc::clone(self);
        PooledConn::new(conn, id, Arc::new(move |conn, id| shared.release(conn, id)))
    }

    fn release(&self, mut conn: F::Connection, id: usize) {
        self.active.remove(&id);
        self.metrics.total_released.fetch_add(1, Ordering::Relaxed);

        // The state lock serializes this push against shutdown's final
        // drain, so a late release cannot strand a connection in idle.
        let state = self.state.lock();
        if *state == PoolState::Running {
            if let Err(err) = self.idle_tx.try_send((conn, id)) {
                let (mut conn, id) = err.into_inner();
                warn!(id, "idle buffer rejected released connection");
                conn.close();
                self.release_slot();
            }
            return;
        }
        drop(state);

        // Pool is draining or stopped: the holder's release path is where
        // an outstanding connection gets closed.
        conn.close();
        self.release_slot();
        debug!(id, "closed connection released after shutdown");
    }

    fn ensure_acquirable(&self) -> PoolResult<()> {
        if self.is_errored() {
            return Err(PoolError::Errored);
        }
        if !self.is_running() {
            return Err(PoolError::Shutdown);
        }
        Ok(())
    }
}

/// Bounded pool of reusable connections
///
/// Idle connections are lent out under mutual exclusion and the pool grows
/// lazily up to `max_size`. A background monitor thread replaces or
/// discards connections whose backing resource silently died; see
/// [`HealthStatus`] for the observable side.
pub struct Pool<F: ConnectionFactory> {
    shared: Arc<PoolShared<F>>,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl<F: ConnectionFactory> Pool<F> {
    /// Create a pool without opening any connections yet
    ///
    /// Parameter and configuration problems surface here as
    /// [`PoolError::Construction`]; nothing network-facing happens until
    /// [`start`](Pool::start).
    pub fn new(
        params: ConnectionParameters,
        factory: F,
        config: PoolConfig,
    ) -> PoolResult<Self> {
        config.validate()?;
        params.validate()?;

        let (idle_tx, idle_rx) = channel::bounded(config.max_size);
        let shared = Arc::new(PoolShared {
            config,
            params,
            factory,
            idle_tx,
            idle_rx,
            live_count: AtomicUsize::new(0),
            errored: AtomicBool::new(false),
            state: Mutex::new(PoolState::Starting),
            active: DashMap::new(),
            next_id: AtomicUsize::new(0),
            metrics: MetricsTracker::new(),
        });

        Ok(Self {
            shared,
            monitor: Mutex::new(None),
        })
    }

    /// Eagerly create `min_size` connections, then spawn the health monitor
    ///
    /// Initialization is synchronous: a factory failure here is reported to
    /// the caller directly, latches the pool as errored, and closes anything
    /// already created. No partial pool is ever exposed.
    pub fn start(&self) -> PoolResult<()> {
        // Held across check, creation, and transition: a second concurrent
        // starter blocks here and then observes Running or Errored.
        let mut state = self.shared.state.lock();
        match *state {
            PoolState::Starting => {}
            PoolState::Running => return Ok(()),
            PoolState::Errored => return Err(PoolError::Errored),
            _ => return Err(PoolError::Shutdown),
        }

        for _ in 0..self.shared.config.min_size {
            match self.shared.create_connection() {
                Ok((conn, id)) => {
                    self.shared.live_count.fetch_add(1, Ordering::Relaxed);
                    self.shared.push_idle(conn, id);
                }
                Err(err) => {
                    error!(error = %err, "eager connection creation failed");
                    // Latch inline; latch_error would re-take the lock.
                    self.shared.errored.store(true, Ordering::Relaxed);
                    *state = PoolState::Errored;
                    self.shared.drain_idle();
                    return Err(err);
                }
            }
        }

        *state = PoolState::Running;
        drop(state);
        info!(
            min_size = self.shared.config.min_size,
            max_size = self.shared.config.max_size,
            host = %self.shared.params.host,
            "connection pool started"
        );

        let shared = Arc::clone(&self.shared);
        *self.monitor.lock() = Some(health::spawn_monitor(shared));
        Ok(())
    }

    /// One non-blocking attempt: pop an idle connection or grow lazily.
    /// `Ok(None)` means the pool is at capacity with nothing idle.
    pub fn try_acquire(&self) -> PoolResult<Option<PooledConn<F::Connection>>> {
        self.shared.ensure_acquirable()?;

        if let Ok((conn, id)) = self.shared.idle_rx.try_recv() {
            return Ok(Some(self.shared.checkout(conn, id)));
        }

        if self.shared.try_reserve_slot() {
            match self.shared.create_connection() {
                Ok((conn, id)) => {
                    debug!(id, live = self.live_count(), "grew pool with new connection");
                    return Ok(Some(self.shared.checkout(conn, id)));
                }
                Err(err) => {
                    self.shared.release_slot();
                    return Err(err);
                }
            }
        }

        Ok(None)
    }

    /// Acquire a connection, waiting up to the configured acquire window
    /// and then the fallback window
    pub fn acquire(&self) -> PoolResult<PooledConn<F::Connection>> {
        self.acquire_timeout(self.shared.config.acquire_timeout)
    }

    /// Acquire with an explicit first wait window
    ///
    /// When the pool is at capacity this blocks up to `first_window` for a
    /// release, then retries once and blocks up to the fallback window
    /// before failing with [`PoolError::Exhausted`].
    pub fn acquire_timeout(
        &self,
        first_window: Duration,
    ) -> PoolResult<PooledConn<F::Connection>> {
        if let Some(conn) = self.try_acquire()? {
            return Ok(conn);
        }

        match self.shared.idle_rx.recv_timeout(first_window) {
            Ok((conn, id)) => return Ok(self.shared.checkout(conn, id)),
            Err(RecvTimeoutError::Disconnected) => return Err(PoolError::Errored),
            Err(RecvTimeoutError::Timeout) => {}
        }

        // The monitor may have discarded a stale connection while we
        // waited, freeing a slot for lazy growth.
        if let Some(conn) = self.try_acquire()? {
            return Ok(conn);
        }

        let fallback = self.shared.config.exhausted_timeout;
        match self.shared.idle_rx.recv_timeout(fallback) {
            Ok((conn, id)) => Ok(self.shared.checkout(conn, id)),
            Err(RecvTimeoutError::Disconnected) => Err(PoolError::Errored),
            Err(RecvTimeoutError::Timeout) => {
                self.shared
                    .metrics
                    .exhausted_events
                    .fetch_add(1, Ordering::Relaxed);
                warn!("pool exhausted; both wait windows elapsed");
                Err(PoolError::Exhausted(first_window + fallback))
            }
        }
    }

    /// Acquire a connection asynchronously with the same two-window
    /// semantics as [`acquire`](Pool::acquire)
    pub async fn acquire_async(&self) -> PoolResult<PooledConn<F::Connection>> {
        let first_window = self.shared.config.acquire_timeout;
        match self.acquire_poll(first_window).await {
            Ok(conn) => Ok(conn),
            Err(PoolError::Exhausted(_)) => {
                let fallback = self.shared.config.exhausted_timeout;
                self.acquire_poll(fallback).await.map_err(|err| match err {
                    PoolError::Exhausted(_) => {
                        self.shared
                            .metrics
                            .exhausted_events
                            .fetch_add(1, Ordering::Relaxed);
                        PoolError::Exhausted(first_window + fallback)
                    }
                    other => other,
                })
            }
            Err(err) => Err(err),
        }
    }

    async fn acquire_poll(&self, window: Duration) -> PoolResult<PooledConn<F::Connection>> {
        tokio::time::timeout(window, async {
            loop {
                match self.try_acquire()? {
                    Some(conn) => return Ok(conn),
                    None => tokio::time::sleep(Duration::from_millis(10)).await,
                }
            }
        })
        .await
        .map_err(|_| PoolError::Exhausted(window))?
    }

    /// Run `f` with a pooled connection; the connection is released on
    /// every exit path, including a panic inside `f`
    pub fn with_connection<R>(
        &self,
        f: impl FnOnce(&mut F::Connection) -> R,
    ) -> PoolResult<R> {
        let mut conn = self.acquire()?;
        Ok(f(&mut conn))
    }

    /// Async variant of [`with_connection`](Pool::with_connection)
    pub async fn with_connection_async<R>(
        &self,
        f: impl FnOnce(&mut F::Connection) -> R,
    ) -> PoolResult<R> {
        let mut conn = self.acquire_async().await?;
        Ok(f(&mut conn))
    }

    /// Stop the monitor and close every connection reachable through the
    /// idle buffer
    ///
    /// Connections still checked out are closed by their guards' release
    /// path once dropped; they are never forcibly reclaimed.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.state.lock();
            if matches!(*state, PoolState::Starting | PoolState::Running) {
                *state = PoolState::Draining;
            }
        }

        if let Some(handle) = self.monitor.lock().take() {
            let _ = handle.join();
        }

        let state = self.shared.state.lock();
        self.shared.drain_idle();
        drop(state);
        self.shared.set_state(PoolState::Stopped);
        info!(outstanding = self.checked_out_count(), "connection pool stopped");
    }

    /// Total connections currently open, idle or checked out
    pub fn live_count(&self) -> usize {
        self.shared.live_count.load(Ordering::Relaxed)
    }

    /// Connections waiting in the idle buffer
    pub fn idle_count(&self) -> usize {
        self.shared.idle_rx.len()
    }

    /// Connections currently checked out by callers
    pub fn checked_out_count(&self) -> usize {
        self.shared.active.len()
    }

    /// Whether the error latch has been set
    pub fn is_errored(&self) -> bool {
        self.shared.is_errored()
    }

    /// Current lifecycle state
    pub fn state(&self) -> PoolState {
        self.shared.state()
    }

    /// Point-in-time health snapshot
    pub fn health_status(&self) -> HealthStatus {
        HealthStatus::new(
            self.idle_count(),
            self.checked_out_count(),
            self.live_count(),
            self.shared.config.max_size,
            self.is_errored(),
        )
    }

    /// Snapshot of the pool metrics
    pub fn metrics(&self) -> PoolMetrics {
        self.shared.metrics.snapshot(
            self.checked_out_count(),
            self.idle_count(),
            self.live_count(),
            self.shared.config.max_size,
        )
    }

    /// Export metrics as a string map
    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.metrics().export()
    }

    /// Export metrics in Prometheus exposition format
    pub fn export_metrics_prometheus(
        &self,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        MetricsExporter::export_prometheus(&self.metrics(), pool_name, tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockFactory, test_params};
    use std::collections::HashSet;
    use std::panic::{self, AssertUnwindSafe};
    use std::thread;
    use std::time::Instant;

    // Long check interval keeps the monitor out of the way of tests that
    // assert on idle counts.
    fn quiet_config(min: usize, max: usize) -> PoolConfig {
        PoolConfig::new()
            .with_min_size(min)
            .with_max_size(max)
            .with_check_interval(Duration::from_millis(500))
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = PoolConfig::new().with_min_size(0);
        let result = Pool::new(test_params(), MockFactory::new(), config);
        assert!(matches!(result, Err(PoolError::Construction(_))));

        let config = PoolConfig::new().with_min_size(6).with_max_size(5);
        let result = Pool::new(test_params(), MockFactory::new(), config);
        assert!(matches!(result, Err(PoolError::Construction(_))));
    }

    #[test]
    fn test_new_rejects_invalid_params() {
        let params = ConnectionParameters::new("", 3306, "app", "pw", "db");
        let result = Pool::new(params, MockFactory::new(), quiet_config(1, 2));
        assert!(matches!(result, Err(PoolError::Construction(_))));
    }

    #[test]
    fn test_start_creates_exactly_min_idle_connections() {
        let factory = MockFactory::new();
        let pool = Pool::new(test_params(), factory.clone(), quiet_config(3, 5)).unwrap();
        pool.start().unwrap();

        assert_eq!(pool.state(), PoolState::Running);
        assert_eq!(pool.idle_count(), 3);
        assert_eq!(pool.live_count(), 3);
        assert_eq!(pool.checked_out_count(), 0);
        assert_eq!(factory.created_count(), 3);

        pool.shutdown();
    }

    #[test]
    fn test_pooled_conn_debug_omits_the_connection() {
        let pool = Pool::new(test_params(), MockFactory::new(), quiet_config(1, 2)).unwrap();
        pool.start().unwrap();

        let conn = pool.acquire().unwrap();
        let rendered = format!("{conn:?}");
        assert!(rendered.contains("PooledConn"));
        assert!(rendered.contains("id"));

        drop(conn);
        pool.shutdown();
    }

    #[test]
    fn test_concurrent_start_creates_min_exactly_once() {
        let factory = MockFactory::new();
        let pool = Pool::new(test_params(), factory.clone(), quiet_config(3, 5)).unwrap();

        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| pool.start().unwrap());
            }
        });

        assert_eq!(pool.state(), PoolState::Running);
        assert_eq!(factory.created_count(), 3);
        assert_eq!(pool.live_count(), 3);
        assert_eq!(pool.idle_count(), 3);

        pool.shutdown();
        assert_eq!(pool.live_count(), 0);
    }

    #[test]
    fn test_start_twice_is_a_no_op() {
        let factory = MockFactory::new();
        let pool = Pool::new(test_params(), factory.clone(), quiet_config(2, 4)).unwrap();
        pool.start().unwrap();
        pool.start().unwrap();

        assert_eq!(factory.created_count(), 2);
        pool.shutdown();
    }

    #[test]
    fn test_acquire_release_round_trip() {
        let pool = Pool::new(test_params(), MockFactory::new(), quiet_config(3, 5)).unwrap();
        pool.start().unwrap();

        {
            let conn = pool.acquire().unwrap();
            assert!(conn.is_open());
            assert_eq!(pool.idle_count(), 2);
            assert_eq!(pool.checked_out_count(), 1);
        }

        assert_eq!(pool.idle_count(), 3);
        assert_eq!(pool.checked_out_count(), 0);

        pool.shutdown();
        assert_eq!(pool.live_count(), 0);
        assert_eq!(pool.state(), PoolState::Stopped);
    }

    #[test]
    fn test_lazy_growth_stops_at_max() {
        let factory = MockFactory::new();
        let pool = Pool::new(test_params(), factory.clone(), quiet_config(1, 3)).unwrap();
        pool.start().unwrap();

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        let c = pool.acquire().unwrap();

        assert_eq!(pool.live_count(), 3);
        assert_eq!(factory.created_count(), 3);
        assert!(pool.try_acquire().unwrap().is_none());

        drop((a, b, c));
        assert_eq!(pool.idle_count(), 3);

        pool.shutdown();
    }

    #[test]
    fn test_exhausted_only_after_both_windows() {
        let config = quiet_config(1, 1)
            .with_acquire_timeout(Duration::from_millis(30))
            .with_exhausted_timeout(Duration::from_millis(50));
        let pool = Pool::new(test_params(), MockFactory::new(), config).unwrap();
        pool.start().unwrap();

        let _held = pool.acquire().unwrap();

        let started = Instant::now();
        let err = pool.acquire().unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, PoolError::Exhausted(d) if d == Duration::from_millis(80)));
        assert!(elapsed >= Duration::from_millis(80));
        assert_eq!(pool.metrics().exhausted_events, 1);

        pool.shutdown();
    }

    #[test]
    fn test_start_failure_latches_the_pool() {
        let factory = MockFactory::failing_after(1);
        let pool = Pool::new(test_params(), factory.clone(), quiet_config(3, 5)).unwrap();

        let err = pool.start().unwrap_err();
        assert!(matches!(err, PoolError::Connect(_)));
        assert!(pool.is_errored());
        assert_eq!(pool.live_count(), 0);
        assert!(matches!(pool.acquire(), Err(PoolError::Errored)));
        assert!(matches!(pool.acquire(), Err(PoolError::Errored)));
    }

    #[test]
    fn test_connect_error_surfaces_during_lazy_growth() {
        let factory = MockFactory::failing_after(1);
        let pool = Pool::new(test_params(), factory.clone(), quiet_config(1, 2)).unwrap();
        pool.start().unwrap();

        let _held = pool.acquire().unwrap();
        let err = pool.acquire().unwrap_err();

        assert!(matches!(err, PoolError::Connect(_)));
        assert_eq!(pool.live_count(), 1);
        assert_eq!(pool.metrics().connect_failures, 1);

        pool.shutdown();
    }

    #[test]
    fn test_no_double_handout_under_concurrency() {
        let config = quiet_config(2, 5)
            .with_acquire_timeout(Duration::from_millis(200))
            .with_exhausted_timeout(Duration::from_secs(5));
        let pool = Pool::new(test_params(), MockFactory::new(), config).unwrap();
        pool.start().unwrap();

        let concurrent = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let held: Mutex<HashSet<usize>> = Mutex::new(HashSet::new());

        thread::scope(|s| {
            for _ in 0..50 {
                s.spawn(|| {
                    for _ in 0..5 {
                        let conn = pool.acquire().unwrap();
                        assert!(held.lock().insert(conn.id()), "connection handed out twice");

                        let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        assert!(pool.live_count() <= 5);

                        thread::sleep(Duration::from_millis(1));

                        concurrent.fetch_sub(1, Ordering::SeqCst);
                        assert!(held.lock().remove(&conn.id()));
                        drop(conn);
                    }
                });
            }
        });

        assert!(peak.load(Ordering::SeqCst) <= 5);
        assert_eq!(pool.checked_out_count(), 0);
        assert!(pool.live_count() <= 5);

        pool.shutdown();
        assert_eq!(pool.live_count(), 0);
    }

    #[test]
    fn test_with_connection_yields_result() {
        let pool = Pool::new(test_params(), MockFactory::new(), quiet_config(3, 5)).unwrap();
        pool.start().unwrap();

        let result = pool
            .with_connection(|conn| {
                assert!(conn.is_open());
                42
            })
            .unwrap();

        assert_eq!(result, 42);
        assert_eq!(pool.idle_count(), 3);

        pool.shutdown();
    }

    #[test]
    fn test_with_connection_releases_on_panic() {
        let pool = Pool::new(test_params(), MockFactory::new(), quiet_config(3, 5)).unwrap();
        pool.start().unwrap();

        let caught = panic::catch_unwind(AssertUnwindSafe(|| {
            let _ = pool.with_connection(|_| panic!("query blew up"));
        }));
        assert!(caught.is_err());

        assert_eq!(pool.idle_count(), 3);
        assert_eq!(pool.checked_out_count(), 0);

        pool.shutdown();
    }

    #[test]
    fn test_acquire_after_shutdown_fails() {
        let pool = Pool::new(test_params(), MockFactory::new(), quiet_config(2, 4)).unwrap();
        pool.start().unwrap();
        pool.shutdown();

        assert!(matches!(pool.acquire(), Err(PoolError::Shutdown)));
    }

    #[test]
    fn test_release_after_shutdown_closes_connection() {
        let factory = MockFactory::new();
        let pool = Pool::new(test_params(), factory.clone(), quiet_config(1, 1)).unwrap();
        pool.start().unwrap();

        let conn = pool.acquire().unwrap();
        pool.shutdown();
        assert_eq!(pool.live_count(), 1);

        drop(conn);
        assert_eq!(pool.live_count(), 0);
        assert!(!factory.handle(0).load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_acquire_async() {
        let pool = Pool::new(test_params(), MockFactory::new(), quiet_config(2, 4)).unwrap();
        pool.start().unwrap();

        {
            let conn = pool.acquire_async().await.unwrap();
            assert!(conn.is_open());
        }

        assert_eq!(pool.idle_count(), 2);
        pool.shutdown();
    }

    #[tokio::test]
    async fn test_acquire_async_exhausts_after_both_windows() {
        let config = quiet_config(1, 1)
            .with_acquire_timeout(Duration::from_millis(30))
            .with_exhausted_timeout(Duration::from_millis(50));
        let pool = Pool::new(test_params(), MockFactory::new(), config).unwrap();
        pool.start().unwrap();

        let _held = pool.acquire().unwrap();
        let err = pool.acquire_async().await.unwrap_err();
        assert!(matches!(err, PoolError::Exhausted(_)));

        pool.shutdown();
    }

    #[tokio::test]
    async fn test_with_connection_async() {
        let pool = Pool::new(test_params(), MockFactory::new(), quiet_config(2, 4)).unwrap();
        pool.start().unwrap();

        let result = pool.with_connection_async(|conn| conn.is_open()).await.unwrap();
        assert!(result);

        pool.shutdown();
    }
}
