//! # connpool
//!
//! Bounded, self-healing connection pool for stateful resources such as
//! database clients.
//!
//! ## Features
//!
//! - Eager creation of a minimum number of connections, lazy growth to a
//!   maximum, never more than `max_size` live connections
//! - Automatic return of connections via RAII (Drop trait)
//! - Bounded acquire waits with a fallback window before giving up
//! - Background health monitor that replaces or discards connections whose
//!   backing resource silently died
//! - One-way error latch: an unrecoverable failure fails all later acquires
//!   fast instead of limping along
//! - Async acquire with timeout
//! - Health snapshots and Prometheus metrics export
//!
//! ## Quick Start
//!
//! ```rust
//! use connpool::{
//!     ConnectionFactory, ConnectionParameters, Pool, PoolConfig, PoolResult,
//!     PooledConnection,
//! };
//! use std::time::Duration;
//!
//! struct MemConn {
//!     open: bool,
//! }
//!
//! impl PooledConnection for MemConn {
//!     fn open(&mut self) -> PoolResult<()> {
//!         self.open = true;
//!         Ok(())
//!     }
//!
//!     fn close(&mut self) {
//!         self.open = false;
//!     }
//!
//!     fn is_open(&self) -> bool {
//!         self.open
//!     }
//! }
//!
//! struct MemFactory;
//!
//! impl ConnectionFactory for MemFactory {
//!     type Connection = MemConn;
//!
//!     fn create(&self, _params: &ConnectionParameters) -> PoolResult<MemConn> {
//!         let mut conn = MemConn { open: false };
//!         conn.open()?;
//!         Ok(conn)
//!     }
//! }
//!
//! # fn main() -> PoolResult<()> {
//! let params = ConnectionParameters::new("db.internal", 3306, "app", "secret", "inventory");
//! let config = PoolConfig::new()
//!     .with_min_size(2)
//!     .with_max_size(4)
//!     .with_check_interval(Duration::from_millis(10));
//!
//! let pool = Pool::new(params, MemFactory, config)?;
//! pool.start()?;
//!
//! {
//!     let conn = pool.acquire()?;
//!     assert!(conn.is_open());
//!     // Connection automatically returned when `conn` goes out of scope
//! }
//!
//! pool.shutdown();
//! # Ok(())
//! # }
//! ```

mod config;
mod connection;
mod errors;
mod health;
mod metrics;
mod pool;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ConnectionParameters, PoolConfig};
pub use connection::{ConnectionFactory, PooledConnection};
pub use errors::{PoolError, PoolResult};
pub use health::{HealthStatus, PoolState};
pub use metrics::{MetricsExporter, PoolMetrics};
pub use pool::{Pool, PooledConn};
