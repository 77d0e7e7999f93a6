//! Eviction policies for idle resources

use std::time::{Duration, Instant};

/// Age-based eviction policy for pooled resources
///
/// Derived from [`PoolConfiguration`](crate::PoolConfiguration)'s
/// `time_to_live` and `idle_timeout`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// No eviction
    #[default]
    None,

    /// Time-to-live: resources expire after a fixed duration
    TimeToLive(Duration),

    /// Idle timeout: resources expire after sitting unused
    IdleTimeout(Duration),

    /// Combined: TTL or idle timeout
    Combined {
        ttl: Duration,
        idle_timeout: Duration,
    },
}

impl EvictionPolicy {
    pub(crate) fn is_expired(&self, metadata: &ResourceMetadata) -> bool {
        match self {
            EvictionPolicy::None => false,
            EvictionPolicy::TimeToLive(ttl) => metadata.created_at.elapsed() > *ttl,
            EvictionPolicy::IdleTimeout(timeout) => metadata.last_used.elapsed() > *timeout,
            EvictionPolicy::Combined { ttl, idle_timeout } => {
                metadata.created_at.elapsed() > *ttl || metadata.last_used.elapsed() > *idle_timeout
            }
        }
    }
}

/// Lifecycle timestamps kept alongside each resource
#[derive(Debug, Clone)]
pub(crate) struct ResourceMetadata {
    pub created_at: Instant,
    pub last_used: Instant,
}

impl ResourceMetadata {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            created_at: now,
            last_used: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_used = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aged(created: Duration, idle: Duration) -> ResourceMetadata {
        let now = Instant::now();
        ResourceMetadata {
            created_at: now - created,
            last_used: now - idle,
        }
    }

    #[test]
    fn test_none_never_expires() {
        let meta = aged(Duration::from_millis(500), Duration::from_millis(500));
        assert!(!EvictionPolicy::None.is_expired(&meta));
    }

    #[test]
    fn test_ttl_and_idle() {
        let meta = aged(Duration::from_millis(200), Duration::from_millis(1));

        assert!(EvictionPolicy::TimeToLive(Duration::from_millis(100)).is_expired(&meta));
        assert!(!EvictionPolicy::IdleTimeout(Duration::from_secs(60)).is_expired(&meta));
        assert!(
            EvictionPolicy::Combined {
                ttl: Duration::from_millis(100),
                idle_timeout: Duration::from_secs(60),
            }
            .is_expired(&meta)
        );
    }

    #[test]
    fn test_touch_resets_idle_clock() {
        let mut meta = aged(Duration::from_millis(200), Duration::from_millis(200));
        let policy = EvictionPolicy::IdleTimeout(Duration::from_millis(100));
        assert!(policy.is_expired(&meta));

        meta.touch();
        assert!(!policy.is_expired(&meta));
    }
}
