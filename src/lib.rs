//! # Esox BrowserPool
//!
//! Async pool for expensive, long-lived resources such as headless browser
//! processes. Resources are recycled across concurrent callers, health
//! checked before reuse and retired after a fixed number of uses.
//!
//! ## Features
//!
//! - Async create/destroy/validate hooks via [`ResourceFactory`]
//! - Per-resource use counter with `max_uses` retirement
//! - Scoped use that always releases, whatever the callback does
//! - Bounded size, acquire timeout and waiter limit
//! - Idle eviction, TTL and `min_idle` maintenance
//! - Drain/clear for graceful shutdown
//! - Health reporting and metrics with Prometheus export
//!
//! ## Quick Start
//!
//! ```rust
//! use esox_browserpool::{async_trait, Pool, PoolConfiguration, PoolError, ResourceFactory};
//!
//! struct Browser {
//!     pid: u32,
//! }
//!
//! struct Launcher {
//!     executable: String,
//! }
//!
//! #[async_trait]
//! impl ResourceFactory for Launcher {
//!     type Resource = Browser;
//!     type Error = std::io::Error;
//!
//!     async fn create(&self) -> Result<Browser, std::io::Error> {
//!         // spawn `self.executable` here
//!         Ok(Browser { pid: 4242 })
//!     }
//!
//!     async fn destroy(&self, _browser: Browser) -> Result<(), std::io::Error> {
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), PoolError<std::io::Error>> {
//! let launcher = Launcher { executable: "chromium".to_string() };
//! let config = PoolConfiguration::new()
//!     .with_max_pool_size(4)
//!     .with_max_uses(50);
//! let pool = Pool::new(launcher, config).expect("valid configuration");
//!
//! let pid = pool
//!     .with_resource(|browser| Box::pin(async move { Ok::<_, PoolError<std::io::Error>>(browser.pid) }))
//!     .await?;
//! assert_eq!(pid, 4242);
//!
//! pool.drain().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod errors;
mod eviction;
mod factory;
mod health;
mod metrics;
mod pool;

#[cfg(test)]
mod testing;

pub use async_trait::async_trait;
pub use config::PoolConfiguration;
pub use errors::{ConfigError, PoolError, PoolResult};
pub use eviction::EvictionPolicy;
pub use factory::ResourceFactory;
pub use health::HealthStatus;
pub use metrics::{MetricsExporter, PoolMetrics};
pub use pool::{Pool, PooledResource};
