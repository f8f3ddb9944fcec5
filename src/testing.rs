//! Test doubles shared by the module tests

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::config::ConnectionParameters;
use crate::connection::{ConnectionFactory, PooledConnection};
use crate::errors::{PoolError, PoolResult};

pub(crate) fn test_params() -> ConnectionParameters {
    ConnectionParameters::new("localhost", 3306, "app", "secret", "testdb")
}

/// In-memory connection whose open flag can be flipped externally to
/// simulate a silently dropped backing connection.
pub(crate) struct MockConnection {
    open: Arc<AtomicBool>,
}

impl PooledConnection for MockConnection {
    fn open(&mut self) -> PoolResult<()> {
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) {
        self.open.store(false, Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

struct MockFactoryState {
    attempts: AtomicUsize,
    created: AtomicUsize,
    failing: AtomicBool,
    fail_after: AtomicUsize,
    handles: Mutex<Vec<Arc<AtomicBool>>>,
}

/// Factory with failure injection; clones share the same state so a test
/// can keep poking at it after handing it to the pool.
#[derive(Clone)]
pub(crate) struct MockFactory {
    state: Arc<MockFactoryState>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self {
            state: Arc::new(MockFactoryState {
                attempts: AtomicUsize::new(0),
                created: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
                fail_after: AtomicUsize::new(usize::MAX),
                handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Succeed for the first `n` creations, fail afterwards
    pub fn failing_after(n: usize) -> Self {
        let factory = Self::new();
        factory.state.fail_after.store(n, Ordering::SeqCst);
        factory
    }

    /// Fail every creation from this point on
    pub fn fail_from_now_on(&self) {
        self.state.failing.store(true, Ordering::SeqCst);
    }

    /// Open flag of the `index`-th successfully created connection
    pub fn handle(&self, index: usize) -> Arc<AtomicBool> {
        Arc::clone(&self.state.handles.lock()[index])
    }

    pub fn created_count(&self) -> usize {
        self.state.created.load(Ordering::SeqCst)
    }
}

impl ConnectionFactory for MockFactory {
    type Connection = MockConnection;

    fn create(&self, _params: &ConnectionParameters) -> PoolResult<MockConnection> {
        let attempt = self.state.attempts.fetch_add(1, Ordering::SeqCst);
        if self.state.failing.load(Ordering::SeqCst)
            || attempt >= self.state.fail_after.load(Ordering::SeqCst)
        {
            return Err(PoolError::Connect("mock connect refused".to_string()));
        }

        let flag = Arc::new(AtomicBool::new(false));
        self.state.handles.lock().push(Arc::clone(&flag));
        self.state.created.fetch_add(1, Ordering::SeqCst);

        let mut conn = MockConnection { open: flag };
        conn.open()?;
        Ok(conn)
    }
}
