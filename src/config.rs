//! Pool configuration options

use crate::errors::ConfigError;
use crate::eviction::EvictionPolicy;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for pool behavior
///
/// # Examples
///
/// ```
/// use esox_browserpool::PoolConfiguration;
/// use std::time::Duration;
///
/// let config = PoolConfiguration::new()
///     .with_max_uses(50)
///     .with_max_pool_size(4)
///     .with_min_idle(1)
///     .with_timeout(Duration::from_secs(10));
///
/// assert_eq!(config.max_uses, 50);
/// assert_eq!(config.max_pool_size, 4);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PoolConfiguration {
    /// Maximum acquisitions per resource before it is retired (0 = unlimited)
    pub max_uses: usize,

    /// Maximum number of live resources (idle, in use or being created)
    pub max_pool_size: usize,

    /// Number of idle resources the maintenance task keeps ready
    pub min_idle: usize,

    /// How long `acquire` waits before giving up
    pub acquire_timeout: Option<Duration>,

    /// Maximum number of callers allowed to queue for a resource
    pub max_waiting: Option<usize>,

    /// How often the maintenance task runs
    pub eviction_interval: Option<Duration>,

    /// Idle resources unused for longer than this are evicted
    pub idle_timeout: Option<Duration>,

    /// Resources older than this are evicted
    pub time_to_live: Option<Duration>,

    /// Run the factory health check on idle resources during maintenance
    pub test_while_idle: bool,

    /// Hand out the longest-idle resource first (false = most recently released)
    pub fifo: bool,
}

impl Default for PoolConfiguration {
    fn default() -> Self {
        Self {
            max_uses: 0,
            max_pool_size: 10,
            min_idle: 0,
            acquire_timeout: Some(Duration::from_secs(30)),
            max_waiting: None,
            eviction_interval: None,
            idle_timeout: None,
            time_to_live: None,
            test_while_idle: false,
            fifo: true,
        }
    }
}

impl PoolConfiguration {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Retire a resource once it has been acquired `uses` times.
    ///
    /// Zero means resources are never retired for usage.
    pub fn with_max_uses(mut self, uses: usize) -> Self {
        self.max_uses = uses;
        self
    }

    /// Set the maximum pool size
    pub fn with_max_pool_size(mut self, size: usize) -> Self {
        self.max_pool_size = size;
        self
    }

    /// Set the number of idle resources kept ready
    pub fn with_min_idle(mut self, count: usize) -> Self {
        self.min_idle = count;
        self
    }

    /// Set the acquire timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    /// Wait for a resource indefinitely
    pub fn without_timeout(mut self) -> Self {
        self.acquire_timeout = None;
        self
    }

    /// Limit the number of queued callers
    pub fn with_max_waiting(mut self, count: usize) -> Self {
        self.max_waiting = Some(count);
        self
    }

    /// Run maintenance every `interval`
    pub fn with_eviction_interval(mut self, interval: Duration) -> Self {
        self.eviction_interval = Some(interval);
        self
    }

    /// Set idle timeout for resources
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Set time-to-live for resources
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.time_to_live = Some(ttl);
        self
    }

    /// Health-check idle resources during maintenance
    pub fn with_test_while_idle(mut self, enabled: bool) -> Self {
        self.test_while_idle = enabled;
        self
    }

    /// Choose FIFO or LIFO hand-out order for idle resources
    pub fn with_fifo(mut self, fifo: bool) -> Self {
        self.fifo = fifo;
        self
    }

    /// Check the configuration for values the pool cannot run with
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_browserpool::{ConfigError, PoolConfiguration};
    ///
    /// let config = PoolConfiguration::new()
    ///     .with_max_pool_size(2)
    ///     .with_min_idle(3);
    ///
    /// assert_eq!(
    ///     config.validate(),
    ///     Err(ConfigError::MinIdleExceedsMax { min_idle: 3, max_pool_size: 2 })
    /// );
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_pool_size == 0 {
            return Err(ConfigError::ZeroPoolSize);
        }
        if self.min_idle > self.max_pool_size {
            return Err(ConfigError::MinIdleExceedsMax {
                min_idle: self.min_idle,
                max_pool_size: self.max_pool_size,
            });
        }
        if self.acquire_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::ZeroAcquireTimeout);
        }
        if self.eviction_interval == Some(Duration::ZERO) {
            return Err(ConfigError::ZeroEvictionInterval);
        }
        Ok(())
    }

    /// Eviction policy implied by `time_to_live` and `idle_timeout`
    pub fn eviction_policy(&self) -> EvictionPolicy {
        match (self.time_to_live, self.idle_timeout) {
            (Some(ttl), Some(idle_timeout)) => EvictionPolicy::Combined { ttl, idle_timeout },
            (Some(ttl), None) => EvictionPolicy::TimeToLive(ttl),
            (None, Some(idle)) => EvictionPolicy::IdleTimeout(idle),
            (None, None) => EvictionPolicy::None,
        }
    }
}
