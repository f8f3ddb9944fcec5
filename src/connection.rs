//! Capability contracts the pool requires from the pooled resource

use crate::config::ConnectionParameters;
use crate::errors::PoolResult;

/// A stateful connection the pool can lend out, close, and probe
///
/// The pool never interprets the connection beyond these three operations;
/// query execution, wire protocol, and result handling belong entirely to
/// the implementor.
pub trait PooledConnection: Send + 'static {
    /// Establish the underlying connection. Called once per instance by the
    /// factory; fails with [`crate::PoolError::Connect`] when the backing
    /// resource cannot be reached.
    fn open(&mut self) -> PoolResult<()>;

    /// Release underlying resources. Safe to call on an already-closed
    /// connection.
    fn close(&mut self);

    /// Liveness probe. Must not fail for a closed connection; a `false`
    /// here is what the health monitor acts on.
    fn is_open(&self) -> bool;
}

/// Builds opened connections from connection parameters
///
/// `create` must return a connection that is already open; the pool hands
/// its result straight to callers and to the idle buffer.
pub trait ConnectionFactory: Send + Sync + 'static {
    type Connection: PooledConnection;

    fn create(&self, params: &ConnectionParameters) -> PoolResult<Self::Connection>;
}
