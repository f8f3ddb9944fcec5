//! Error types for the connection pool

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum PoolError {
    #[error("invalid connection parameters: {0}")]
    Construction(String),

    #[error("failed to open backing connection: {0}")]
    Connect(String),

    #[error("pool has failed and can no longer serve connections")]
    Errored,

    #[error("no connection became available within {0:?}")]
    Exhausted(std::time::Duration),

    #[error("pool is not running")]
    Shutdown,
}

pub type PoolResult<T> = Result<T, PoolError>;
