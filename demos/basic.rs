//! Basic usage examples for the browser pool

use esox_browserpool::{async_trait, Pool, PoolConfiguration, PoolError, ResourceFactory};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Stand-in for a headless browser process
struct Browser {
    pid: usize,
    pages_rendered: usize,
}

#[derive(Debug, thiserror::Error)]
#[error("browser error: {0}")]
struct BrowserError(String);

struct Launcher {
    next_pid: AtomicUsize,
}

#[async_trait]
impl ResourceFactory for Launcher {
    type Resource = Browser;
    type Error = BrowserError;

    async fn create(&self) -> Result<Browser, BrowserError> {
        let pid = self.next_pid.fetch_add(1, Ordering::Relaxed) + 1000;
        println!("   launched browser pid={pid}");
        Ok(Browser {
            pid,
            pages_rendered: 0,
        })
    }

    async fn destroy(&self, browser: Browser) -> Result<(), BrowserError> {
        println!(
            "   closed browser pid={} after {} pages",
            browser.pid, browser.pages_rendered
        );
        Ok(())
    }
}

fn launcher() -> Launcher {
    Launcher {
        next_pid: AtomicUsize::new(0),
    }
}

#[tokio::main]
async fn main() -> Result<(), PoolError<BrowserError>> {
    println!("=== esox_browserpool - Basic Examples ===\n");

    // Example 1: Scoped use
    scoped_use().await?;

    // Example 2: Retirement after max uses
    max_use_retirement().await?;

    // Example 3: Metrics and health
    metrics_and_health().await?;

    Ok(())
}

async fn scoped_use() -> Result<(), PoolError<BrowserError>> {
    println!("1. Scoped Use:");
    let pool = Pool::new(launcher(), PoolConfiguration::default()).expect("valid configuration");

    let pid = pool
        .with_resource(|browser| {
            Box::pin(async move {
                browser.pages_rendered += 1;
                Ok::<_, PoolError<BrowserError>>(browser.pid)
            })
        })
        .await?;

    println!("   rendered a page on pid={pid}");
    println!("   idle after release: {}\n", pool.idle_count());
    pool.drain().await;
    Ok(())
}

async fn max_use_retirement() -> Result<(), PoolError<BrowserError>> {
    println!("2. Max Use Retirement:");
    let config = PoolConfiguration::new()
        .with_max_pool_size(1)
        .with_max_uses(2);
    let pool = Pool::new(launcher(), config).expect("valid configuration");

    for round in 1..=4 {
        let mut browser = pool.acquire().await?;
        browser.pages_rendered += 1;
        println!(
            "   round {round}: pid={} use_count={}",
            browser.pid,
            browser.use_count()
        );
        pool.release(browser);
    }

    pool.drain().await;
    println!();
    Ok(())
}

async fn metrics_and_health() -> Result<(), PoolError<BrowserError>> {
    println!("3. Metrics and Health:");
    let pool = Pool::new(launcher(), PoolConfiguration::new().with_max_pool_size(4))
        .expect("valid configuration");
    pool.warmup(2).await?;

    {
        let _first = pool.acquire().await?;
        let _second = pool.acquire().await?;

        let health = pool.get_health_status();
        println!("   Health: {}", if health.is_healthy { "Healthy" } else { "Unhealthy" });
        println!("   Utilization: {:.1}%", health.utilization * 100.0);
        println!(
            "   In use: {}, Idle: {}",
            health.in_use_resources, health.idle_resources
        );
    }

    println!("\n   Prometheus:");
    print!("{}", pool.export_metrics_prometheus("demo", None));

    pool.drain().await;
    Ok(())
}
