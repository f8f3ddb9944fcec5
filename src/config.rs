//! Pool configuration and connection parameters

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::errors::{PoolError, PoolResult};

/// Configuration for pool sizing and timing behavior
///
/// # Examples
///
/// ```
/// use connpool::PoolConfig;
/// use std::time::Duration;
///
/// let config = PoolConfig::new()
///     .with_min_size(2)
///     .with_max_size(10)
///     .with_acquire_timeout(Duration::from_secs(5));
///
/// assert_eq!(config.min_size, 2);
/// assert_eq!(config.max_size, 10);
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of connections created eagerly at startup; the pool shrinks
    /// back toward this floor when idle connections go stale
    pub min_size: usize,

    /// Maximum number of live connections, idle or checked out
    pub max_size: usize,

    /// First bounded wait window when the pool is at capacity
    pub acquire_timeout: Duration,

    /// Fallback wait window entered after the first one expires
    pub exhausted_timeout: Duration,

    /// Interval between health monitor cycles
    pub check_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_size: 3,
            max_size: 5,
            acquire_timeout: Duration::from_secs(3),
            exhausted_timeout: Duration::from_secs(60),
            check_interval: Duration::from_secs(1),
        }
    }
}

impl PoolConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum pool size
    pub fn with_min_size(mut self, size: usize) -> Self {
        self.min_size = size;
        self
    }

    /// Set the maximum pool size
    pub fn with_max_size(mut self, size: usize) -> Self {
        self.max_size = size;
        self
    }

    /// Set the first acquire wait window
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Set the fallback wait window used once the first one expires
    pub fn with_exhausted_timeout(mut self, timeout: Duration) -> Self {
        self.exhausted_timeout = timeout;
        self
    }

    /// Set the health monitor cycle interval
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub(crate) fn validate(&self) -> PoolResult<()> {
        if self.min_size == 0 || self.max_size == 0 {
            return Err(PoolError::Construction(
                "pool sizes must be greater than zero".to_string(),
            ));
        }
        if self.min_size > self.max_size {
            return Err(PoolError::Construction(format!(
                "min_size {} exceeds max_size {}",
                self.min_size, self.max_size
            )));
        }
        Ok(())
    }
}

/// Parameters needed to open a backing connection
///
/// Immutable once constructed. The credential is sensitive and is redacted
/// from `Debug` output.
///
/// # Examples
///
/// ```
/// use connpool::ConnectionParameters;
///
/// let params = ConnectionParameters::new("db.internal", 3306, "app", "secret", "inventory")
///     .with_extra("charset", "utf8mb4");
///
/// assert_eq!(params.extra("charset"), Some("utf8mb4"));
/// assert!(!format!("{:?}", params).contains("secret"));
/// ```
#[derive(Clone)]
pub struct ConnectionParameters {
    pub host: String,
    pub port: u16,
    pub user: String,
    credential: String,
    pub resource_id: String,
    extras: HashMap<String, String>,
}

impl ConnectionParameters {
    /// Create parameters from the required fields
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        credential: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            credential: credential.into(),
            resource_id: resource_id.into(),
            extras: HashMap::new(),
        }
    }

    /// Attach an optional extra parameter (driver options, charset, ...)
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    /// The sensitive credential; callers must not log this
    pub fn credential(&self) -> &str {
        &self.credential
    }

    /// Look up an extra parameter by key
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extras.get(key).map(String::as_str)
    }

    pub(crate) fn validate(&self) -> PoolResult<()> {
        for (field, value) in [
            ("host", &self.host),
            ("user", &self.user),
            ("resource_id", &self.resource_id),
        ] {
            if value.is_empty() {
                return Err(PoolError::Construction(format!("missing {field}")));
            }
        }
        if self.port == 0 {
            return Err(PoolError::Construction("port must be non-zero".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParameters")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("credential", &"<redacted>")
            .field("resource_id", &self.resource_id)
            .field("extras", &self.extras)
            .finish()
    }
}
