//! Error types for the resource pool

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by pool acquisition.
///
/// `E` is the factory's own error type; creation failures carry it
/// through unchanged.
#[derive(Error, Debug)]
pub enum PoolError<E> {
    #[error("Failed to create resource: {0}")]
    Create(#[source] E),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Pool exhausted - {0} callers already waiting")]
    Exhausted(usize),

    #[error("Pool is closed")]
    Closed,

    #[error("Operation was cancelled")]
    Cancelled,
}

impl<E> PoolError<E> {
    /// Whether this error came from the factory's create hook
    pub fn is_create(&self) -> bool {
        matches!(self, PoolError::Create(_))
    }

    /// Whether the acquisition gave up waiting
    pub fn is_timeout(&self) -> bool {
        matches!(self, PoolError::Timeout(_))
    }
}

/// Rejected pool configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_pool_size must be at least 1")]
    ZeroPoolSize,

    #[error("min_idle ({min_idle}) exceeds max_pool_size ({max_pool_size})")]
    MinIdleExceedsMax { min_idle: usize, max_pool_size: usize },

    #[error("acquire_timeout must be non-zero")]
    ZeroAcquireTimeout,

    #[error("eviction_interval must be non-zero")]
    ZeroEvictionInterval,
}

pub type PoolResult<T, E> = Result<T, PoolError<E>>;
