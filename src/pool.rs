//! Core resource pool implementation

use crate::config::PoolConfiguration;
use crate::errors::{ConfigError, PoolError, PoolResult};
use crate::eviction::{EvictionPolicy, ResourceMetadata};
use crate::factory::{FactoryBinding, ResourceFactory, Teardown, Validity};
use crate::health::HealthStatus;
use crate::metrics::{MetricsExporter, MetricsTracker, Occupancy, PoolMetrics};

use dashmap::DashSet;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore, TryAcquireError, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace, warn};

/// A resource paired with the bookkeeping the pool keeps for it
pub(crate) struct Pooled<T> {
    id: usize,
    resource: T,
    use_count: usize,
    metadata: ResourceMetadata,
}

impl<T> Pooled<T> {
    fn new(id: usize, resource: T) -> Self {
        Self {
            id,
            resource,
            use_count: 0,
            metadata: ResourceMetadata::new(),
        }
    }
}

/// A checked-out resource.
///
/// Goes back to the pool on [`Pool::release`] or when dropped. The use
/// counter is maintained by the pool and is read-only here.
#[must_use = "dropping a PooledResource releases it immediately"]
pub struct PooledResource<F: ResourceFactory> {
    pooled: Option<Pooled<F::Resource>>,
    permit: Option<OwnedSemaphorePermit>,
    pool: Arc<PoolInner<F>>,
}

impl<F: ResourceFactory> PooledResource<F> {
    /// Pool-assigned identity of the underlying resource
    pub fn id(&self) -> usize {
        self.entry().id
    }

    /// Number of times this resource has been acquired, this one included
    pub fn use_count(&self) -> usize {
        self.entry().use_count
    }

    fn entry(&self) -> &Pooled<F::Resource> {
        self.pooled.as_ref().expect("resource already released")
    }
}

impl<F: ResourceFactory> Deref for PooledResource<F> {
    type Target = F::Resource;

    fn deref(&self) -> &Self::Target {
        &self.entry().resource
    }
}

impl<F: ResourceFactory> DerefMut for PooledResource<F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self
            .pooled
            .as_mut()
            .expect("resource already released")
            .resource
    }
}

impl<F: ResourceFactory> Drop for PooledResource<F> {
    fn drop(&mut self) {
        if let Some(pooled) = self.pooled.take() {
            self.pool.release(pooled);
        }
        // Free the slot only once the resource is idle again
        drop(self.permit.take());
    }
}

impl<F: ResourceFactory> fmt::Debug for PooledResource<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("PooledResource");
        if let Some(pooled) = &self.pooled {
            debug.field("id", &pooled.id).field("use_count", &pooled.use_count);
        }
        debug.finish()
    }
}

/// Decrements the waiter count when a queued acquire finishes or is dropped
struct WaitingGuard<'a>(&'a AtomicUsize);

impl<'a> WaitingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Keeps `drain` waiting while work on a resource is still outstanding:
/// a checkout whose result has not reached the pool's bookkeeping yet,
/// or a teardown started after the pool closed.
struct Pending<F: ResourceFactory>(Arc<PoolInner<F>>);

impl<F: ResourceFactory> Drop for Pending<F> {
    fn drop(&mut self) {
        self.0.pending.fetch_sub(1, Ordering::AcqRel);
        self.0.released.notify_waiters();
    }
}

type Checkout<F> = Result<
    (
        Pooled<<F as ResourceFactory>::Resource>,
        OwnedSemaphorePermit,
        Pending<F>,
    ),
    <F as ResourceFactory>::Error,
>;

/// Receiving end of a detached checkout.
///
/// Dropping it before the result was taken puts a delivered resource back
/// into the idle set.
struct Handoff<F: ResourceFactory> {
    rx: oneshot::Receiver<Checkout<F>>,
    inner: Arc<PoolInner<F>>,
}

impl<F: ResourceFactory> Drop for Handoff<F> {
    fn drop(&mut self) {
        self.rx.close();
        if let Ok(Ok((pooled, permit, pending))) = self.rx.try_recv() {
            debug!(id = pooled.id, "acquire cancelled after checkout, keeping resource idle");
            self.inner.restore(pooled);
            drop(permit);
            drop(pending);
        }
    }
}

/// Shared pool state.
///
/// The semaphore holds one permit per slot. A permit is held by every
/// checked-out resource and by every in-flight checkout or creation;
/// idle resources hold none.
struct PoolInner<F: ResourceFactory> {
    binding: FactoryBinding<F>,
    config: PoolConfiguration,
    eviction: EvictionPolicy,
    idle: Mutex<VecDeque<Pooled<F::Resource>>>,
    in_use: DashSet<usize>,
    semaphore: Arc<Semaphore>,
    size: AtomicUsize,
    waiting: AtomicUsize,
    pending: AtomicUsize,
    next_id: AtomicUsize,
    closed: AtomicBool,
    released: Notify,
    metrics: MetricsTracker,
}

impl<F: ResourceFactory> PoolInner<F> {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    fn track(self: &Arc<Self>) -> Pending<F> {
        self.pending.fetch_add(1, Ordering::AcqRel);
        Pending(Arc::clone(self))
    }

    /// Nothing checked out and no checkout or teardown still running
    fn is_settled(&self) -> bool {
        self.in_use.is_empty() && self.pending.load(Ordering::Acquire) == 0
    }

    fn pop_idle(&self) -> Option<Pooled<F::Resource>> {
        let mut idle = self.idle.lock();
        if self.config.fifo {
            idle.pop_front()
        } else {
            idle.pop_back()
        }
    }

    /// Whether one more idle resource fits next to the slots already taken.
    /// Call while holding the permit the new resource is created under.
    fn has_room_for_idle(&self) -> bool {
        self.idle_count() <= self.semaphore.available_permits()
    }

    /// Put a resource back into circulation, or tear it down if the pool has closed.
    ///
    /// Leaves `last_used` alone; only a real release counts as use.
    fn restore(self: &Arc<Self>, pooled: Pooled<F::Resource>) {
        {
            let mut idle = self.idle.lock();
            if !self.is_closed() {
                idle.push_back(pooled);
                return;
            }
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let pending = self.track();
                let inner = Arc::clone(self);
                handle.spawn(async move {
                    inner.retire(pooled, "pool closed").await;
                    drop(pending);
                });
            }
            Err(_) => {
                debug!(id = pooled.id, "no runtime to tear down resource, dropping it");
                self.size.fetch_sub(1, Ordering::AcqRel);
                MetricsTracker::increment(&self.metrics.destroyed);
            }
        }
    }

    fn release(self: &Arc<Self>, mut pooled: Pooled<F::Resource>) {
        trace!(id = pooled.id, use_count = pooled.use_count, "resource released");
        // The id must leave `in_use` before the resource is visible in the
        // idle set, and `drain` must not see a gap between the two.
        let pending = self.track();
        self.in_use.remove(&pooled.id);
        pooled.metadata.touch();
        self.restore(pooled);
        MetricsTracker::increment(&self.metrics.total_released);
        drop(pending);
    }

    /// Find a valid idle resource, retiring rejects, or create a fresh one.
    async fn checkout(self: &Arc<Self>) -> Result<Pooled<F::Resource>, F::Error> {
        while let Some(pooled) = self.pop_idle() {
            if self.eviction.is_expired(&pooled.metadata) {
                self.retire(pooled, "expired").await;
                continue;
            }

            let verdict = self
                .binding
                .validate(&pooled.resource, pooled.use_count)
                .await;
            if verdict.is_valid() {
                return Ok(pooled);
            }
            self.record_rejection(verdict);
            self.retire(pooled, verdict.as_str()).await;
        }

        self.create().await
    }

    fn record_rejection(&self, verdict: Validity) {
        MetricsTracker::increment(&self.metrics.validation_failures);
        if verdict == Validity::UsesExhausted {
            MetricsTracker::increment(&self.metrics.retired_by_uses);
        }
    }

    async fn create(&self) -> Result<Pooled<F::Resource>, F::Error> {
        match self.binding.create().await {
            Ok(resource) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                self.size.fetch_add(1, Ordering::AcqRel);
                MetricsTracker::increment(&self.metrics.created);
                debug!(id, "resource created");
                Ok(Pooled::new(id, resource))
            }
            Err(error) => {
                MetricsTracker::increment(&self.metrics.create_failures);
                warn!(%error, "resource creation failed");
                Err(error)
            }
        }
    }

    async fn retire(&self, pooled: Pooled<F::Resource>, reason: &'static str) {
        let Pooled {
            id,
            resource,
            use_count,
            ..
        } = pooled;

        let status = self.binding.destroy(resource).await;
        self.size.fetch_sub(1, Ordering::AcqRel);
        MetricsTracker::increment(&self.metrics.destroyed);

        match status {
            Teardown::Clean => debug!(id, use_count, reason, "resource destroyed"),
            Teardown::Failed(error) => {
                MetricsTracker::increment(&self.metrics.teardown_failures);
                warn!(id, use_count, reason, %error, "resource teardown failed");
            }
        }
    }

    /// One maintenance pass: evict aged resources, optionally health-check
    /// the rest, then top up to `min_idle`.
    async fn evict(self: &Arc<Self>) {
        let expired = {
            let mut idle = self.idle.lock();
            let (expired, kept): (VecDeque<_>, VecDeque<_>) = idle
                .drain(..)
                .partition(|pooled| self.eviction.is_expired(&pooled.metadata));
            *idle = kept;
            expired
        };

        if !expired.is_empty() {
            debug!(count = expired.len(), "evicting idle resources");
        }
        for pooled in expired {
            self.retire(pooled, "expired").await;
        }

        if self.config.test_while_idle {
            self.test_idle().await;
        }

        self.ensure_minimum().await;
    }

    async fn test_idle(self: &Arc<Self>) {
        let rounds = self.idle_count();
        for _ in 0..rounds {
            let Ok(permit) = Arc::clone(&self.semaphore).try_acquire_owned() else {
                break;
            };
            let next = self.idle.lock().pop_front();
            let Some(pooled) = next else {
                break;
            };

            let verdict = self
                .binding
                .validate(&pooled.resource, pooled.use_count)
                .await;
            if verdict.is_valid() {
                self.restore(pooled);
            } else {
                self.record_rejection(verdict);
                self.retire(pooled, verdict.as_str()).await;
            }
            drop(permit);
        }
    }

    async fn ensure_minimum(self: &Arc<Self>) {
        while !self.is_closed() && self.idle_count() < self.config.min_idle {
            let Ok(permit) = Arc::clone(&self.semaphore).try_acquire_owned() else {
                break;
            };
            if !self.has_room_for_idle() {
                break;
            }
            match self.create().await {
                Ok(pooled) => self.restore(pooled),
                Err(_) => break,
            }
            drop(permit);
        }
    }
}

/// Bounded async pool of factory-created resources.
///
/// Every successful acquisition bumps the resource's use counter; idle
/// resources are validated before hand-out and retired once they fail
/// their health check or reach `max_uses`.
///
/// # Examples
///
/// ```
/// use esox_browserpool::{async_trait, Pool, PoolConfiguration, ResourceFactory};
///
/// struct Counter;
///
/// #[async_trait]
/// impl ResourceFactory for Counter {
///     type Resource = String;
///     type Error = std::io::Error;
///
///     async fn create(&self) -> Result<String, std::io::Error> {
///         Ok("tab".to_string())
///     }
///
///     async fn destroy(&self, _tab: String) -> Result<(), std::io::Error> {
///         Ok(())
///     }
/// }
///
/// # #[tokio::main]
/// # async fn main() {
/// let pool = Pool::new(Counter, PoolConfiguration::new().with_max_uses(2)).unwrap();
///
/// let first = pool.acquire().await.unwrap();
/// let id = first.id();
/// pool.release(first);
///
/// let second = pool.acquire().await.unwrap();
/// assert_eq!(second.id(), id);
/// assert_eq!(second.use_count(), 2);
/// pool.release(second);
///
/// // Budget spent: a fresh resource replaces the old one
/// let third = pool.acquire().await.unwrap();
/// assert_ne!(third.id(), id);
/// assert_eq!(third.use_count(), 1);
/// # }
/// ```
pub struct Pool<F: ResourceFactory> {
    inner: Arc<PoolInner<F>>,
}

impl<F: ResourceFactory> Clone for Pool<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: ResourceFactory> fmt::Debug for Pool<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("size", &self.size())
            .field("idle", &self.idle_count())
            .field("in_use", &self.in_use_count())
            .field("max_size", &self.max_size())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<F: ResourceFactory> Pool<F> {
    /// Create a pool around `factory`.
    ///
    /// When called inside a Tokio runtime and the configuration asks for
    /// `min_idle` or an `eviction_interval`, a maintenance task is spawned.
    pub fn new(factory: F, config: PoolConfiguration) -> Result<Self, ConfigError> {
        config.validate()?;

        let inner = Arc::new(PoolInner {
            binding: FactoryBinding::new(factory, config.max_uses),
            eviction: config.eviction_policy(),
            idle: Mutex::new(VecDeque::with_capacity(config.max_pool_size)),
            in_use: DashSet::new(),
            semaphore: Arc::new(Semaphore::new(config.max_pool_size)),
            size: AtomicUsize::new(0),
            waiting: AtomicUsize::new(0),
            pending: AtomicUsize::new(0),
            next_id: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            released: Notify::new(),
            metrics: MetricsTracker::new(),
            config,
        });

        let pool = Self { inner };
        pool.start_maintenance();
        Ok(pool)
    }

    /// Acquire a resource, waiting at most the configured acquire timeout
    pub async fn acquire(&self) -> PoolResult<PooledResource<F>, F::Error> {
        match self.inner.config.acquire_timeout {
            Some(timeout) => self.acquire_timeout(timeout).await,
            None => self.acquire_untimed().await,
        }
    }

    /// Acquire a resource, waiting at most `timeout`.
    ///
    /// A timed-out call leaves no counter incremented. Validation or
    /// creation already started on its behalf still completes, and the
    /// resource lands in the idle set.
    pub async fn acquire_timeout(
        &self,
        timeout: Duration,
    ) -> PoolResult<PooledResource<F>, F::Error> {
        match tokio::time::timeout(timeout, self.acquire_untimed()).await {
            Ok(result) => result,
            Err(_) => {
                MetricsTracker::increment(&self.inner.metrics.timeouts);
                debug!(?timeout, "acquire timed out");
                Err(PoolError::Timeout(timeout))
            }
        }
    }

    async fn acquire_untimed(&self) -> PoolResult<PooledResource<F>, F::Error> {
        let inner = &self.inner;
        let permit = self.reserve_slot().await?;

        // Checkout runs detached so that a dropped acquire cannot strand a
        // resource mid-validation or mid-creation.
        let pending = inner.track();
        let (tx, rx) = oneshot::channel();
        let mut handoff = Handoff {
            rx,
            inner: Arc::clone(inner),
        };
        let task_inner = Arc::clone(inner);
        tokio::spawn(async move {
            let outcome = task_inner
                .checkout()
                .await
                .map(|pooled| (pooled, permit, pending));
            if let Err(Ok((pooled, permit, pending))) = tx.send(outcome) {
                debug!(id = pooled.id, "acquirer went away, keeping resource idle");
                task_inner.restore(pooled);
                drop(permit);
                drop(pending);
            }
        });

        let (mut pooled, permit, pending) = (&mut handoff.rx)
            .await
            .map_err(|_| PoolError::Cancelled)?
            .map_err(PoolError::Create)?;

        if inner.is_closed() {
            debug!(id = pooled.id, "pool closed during checkout");
            inner.restore(pooled);
            drop(permit);
            drop(pending);
            return Err(PoolError::Closed);
        }

        pooled.use_count += 1;
        pooled.metadata.touch();
        inner.in_use.insert(pooled.id);
        drop(pending);
        MetricsTracker::increment(&inner.metrics.total_acquired);
        trace!(id = pooled.id, use_count = pooled.use_count, "resource acquired");

        Ok(PooledResource {
            pooled: Some(pooled),
            permit: Some(permit),
            pool: Arc::clone(inner),
        })
    }

    async fn reserve_slot(&self) -> PoolResult<OwnedSemaphorePermit, F::Error> {
        let inner = &self.inner;
        if inner.is_closed() {
            return Err(PoolError::Closed);
        }

        match Arc::clone(&inner.semaphore).try_acquire_owned() {
            Ok(permit) => return Ok(permit),
            Err(TryAcquireError::Closed) => return Err(PoolError::Closed),
            Err(TryAcquireError::NoPermits) => {}
        }

        if let Some(limit) = inner.config.max_waiting
            && inner.waiting.load(Ordering::Acquire) >= limit
        {
            return Err(PoolError::Exhausted(limit));
        }

        let _waiting = WaitingGuard::enter(&inner.waiting);
        Arc::clone(&inner.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)
    }

    /// Return a checked-out resource to the idle set.
    ///
    /// No validation happens here; the next acquire of this resource
    /// validates it.
    pub fn release(&self, resource: PooledResource<F>) {
        if !Arc::ptr_eq(&self.inner, &resource.pool) {
            warn!(id = resource.id(), "released resource belongs to another pool");
        }
        drop(resource);
    }

    /// Tear down a checked-out resource instead of returning it
    pub async fn destroy(&self, mut resource: PooledResource<F>) {
        let Some(pooled) = resource.pooled.take() else {
            return;
        };
        let permit = resource.permit.take();
        let inner = Arc::clone(&resource.pool);

        let teardown = tokio::spawn(async move {
            let id = pooled.id;
            inner.retire(pooled, "destroyed by caller").await;
            inner.in_use.remove(&id);
            inner.released.notify_waiters();
            drop(permit);
        });
        if teardown.await.is_err() {
            warn!("resource teardown task did not complete");
        }
    }

    /// Acquire a resource, run `callback` with it, and release it.
    ///
    /// The resource is released exactly once whether the callback
    /// succeeds or fails; the callback's own result is returned as is.
    /// Acquire failures convert into the callback's error type.
    ///
    /// # Examples
    ///
    /// ```
    /// use esox_browserpool::{async_trait, Pool, PoolConfiguration, PoolError, ResourceFactory};
    ///
    /// struct Page;
    ///
    /// #[async_trait]
    /// impl ResourceFactory for Page {
    ///     type Resource = Vec<String>;
    ///     type Error = std::io::Error;
    ///
    ///     async fn create(&self) -> Result<Vec<String>, std::io::Error> {
    ///         Ok(Vec::new())
    ///     }
    ///
    ///     async fn destroy(&self, _history: Vec<String>) -> Result<(), std::io::Error> {
    ///         Ok(())
    ///     }
    /// }
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), PoolError<std::io::Error>> {
    /// let pool = Pool::new(Page, PoolConfiguration::default()).unwrap();
    ///
    /// let visited = pool
    ///     .with_resource(|history| {
    ///         Box::pin(async move {
    ///             history.push("https://example.com".to_string());
    ///             Ok::<_, PoolError<std::io::Error>>(history.len())
    ///         })
    ///     })
    ///     .await?;
    ///
    /// assert_eq!(visited, 1);
    /// assert_eq!(pool.idle_count(), 1);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn with_resource<C, R, E>(&self, callback: C) -> Result<R, E>
    where
        C: for<'a> FnOnce(&'a mut F::Resource) -> BoxFuture<'a, Result<R, E>> + Send,
        R: Send,
        E: From<PoolError<F::Error>> + Send,
    {
        let mut resource = self.acquire().await?;
        let outcome = callback(&mut *resource).await;
        self.release(resource);
        outcome
    }

    /// Pre-create up to `count` idle resources, returning how many were made
    pub async fn warmup(&self, count: usize) -> PoolResult<usize, F::Error> {
        let inner = &self.inner;
        let mut created = 0;

        while created < count {
            if inner.is_closed() {
                return Err(PoolError::Closed);
            }
            let Ok(permit) = Arc::clone(&inner.semaphore).try_acquire_owned() else {
                break;
            };
            if !inner.has_room_for_idle() {
                break;
            }
            let pooled = inner.create().await.map_err(PoolError::Create)?;
            inner.restore(pooled);
            drop(permit);
            created += 1;
        }

        debug!(created, requested = count, "pool warmed up");
        Ok(created)
    }

    /// Stop handing out resources, wait for checked-out ones to come back,
    /// then tear everything down.
    ///
    /// Acquisitions still validating or creating when the pool closes fail
    /// with [`PoolError::Closed`]; their resources are torn down before
    /// this returns.
    pub async fn drain(&self) {
        let inner = &self.inner;
        {
            let _idle = inner.idle.lock();
            inner.closed.store(true, Ordering::Release);
        }
        inner.semaphore.close();
        debug!(
            in_use = inner.in_use.len(),
            pending = inner.pending.load(Ordering::Acquire),
            "draining pool"
        );

        loop {
            let returned = inner.released.notified();
            if inner.is_settled() {
                break;
            }
            returned.await;
        }

        self.clear().await;
    }

    /// Tear down every idle resource
    pub async fn clear(&self) {
        let idle: Vec<_> = self.inner.idle.lock().drain(..).collect();
        let teardowns = idle.into_iter().map(|pooled| {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move { inner.retire(pooled, "cleared").await })
        });

        for result in futures::future::join_all(teardowns).await {
            if result.is_err() {
                warn!("resource teardown task did not complete");
            }
        }
    }

    /// Live resources: idle plus checked out
    pub fn size(&self) -> usize {
        self.inner.size.load(Ordering::Acquire)
    }

    pub fn idle_count(&self) -> usize {
        self.inner.idle_count()
    }

    pub fn in_use_count(&self) -> usize {
        self.inner.in_use.len()
    }

    /// Callers currently queued for a resource
    pub fn waiting_count(&self) -> usize {
        self.inner.waiting.load(Ordering::Acquire)
    }

    pub fn max_size(&self) -> usize {
        self.inner.config.max_pool_size
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    pub fn config(&self) -> &PoolConfiguration {
        &self.inner.config
    }

    /// Get health status
    pub fn get_health_status(&self) -> HealthStatus {
        HealthStatus::new(
            self.idle_count(),
            self.in_use_count(),
            self.size(),
            self.max_size(),
            self.waiting_count(),
            self.is_closed(),
        )
    }

    /// Get pool metrics
    pub fn get_metrics(&self) -> PoolMetrics {
        self.inner.metrics.snapshot(Occupancy {
            size: self.size(),
            idle: self.idle_count(),
            in_use: self.in_use_count(),
            waiting: self.waiting_count(),
            max_size: self.max_size(),
        })
    }

    /// Export metrics
    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.get_metrics().export()
    }

    /// Export metrics in Prometheus format
    pub fn export_metrics_prometheus(
        &self,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> String {
        MetricsExporter::export_prometheus(&self.get_metrics(), pool_name, tags)
    }

    fn start_maintenance(&self) {
        let config = &self.inner.config;
        if config.eviction_interval.is_none() && config.min_idle == 0 {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("no tokio runtime, pool maintenance disabled");
            return;
        };

        let weak = Arc::downgrade(&self.inner);
        let interval = config.eviction_interval;
        handle.spawn(async move {
            let Some(period) = interval else {
                if let Some(inner) = weak.upgrade() {
                    inner.ensure_minimum().await;
                }
                return;
            };

            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                if inner.is_closed() {
                    break;
                }
                inner.evict().await;
            }
            debug!("pool maintenance stopped");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockError, MockFactory};

    fn pool_with(config: PoolConfiguration) -> (Pool<MockFactory>, Arc<crate::testing::MockState>) {
        let (factory, state) = MockFactory::new();
        (Pool::new(factory, config).unwrap(), state)
    }

    #[tokio::test]
    async fn test_acquire_counts_uses() {
        let (pool, state) = pool_with(PoolConfiguration::default());

        for expected in 1..=5 {
            let resource = pool.acquire().await.unwrap();
            assert_eq!(resource.use_count(), expected);
            assert_eq!(resource.serial, 0);
            pool.release(resource);
        }

        assert_eq!(state.created.load(Ordering::SeqCst), 1);
        assert_eq!(pool.get_metrics().total_acquired, 5);
        assert_eq!(pool.get_metrics().total_released, 5);
    }

    #[tokio::test]
    async fn test_drop_releases() {
        let (pool, _state) = pool_with(PoolConfiguration::default());

        {
            let _resource = pool.acquire().await.unwrap();
            assert_eq!(pool.in_use_count(), 1);
        }

        assert_eq!(pool.in_use_count(), 0);
        assert_eq!(pool.idle_count(), 1);
    }

    #[tokio::test]
    async fn test_timed_out_acquire_keeps_late_resource() {
        let (pool, state) = pool_with(PoolConfiguration::default());
        state.create_delay_ms.store(100, Ordering::SeqCst);

        let result = pool.acquire_timeout(Duration::from_millis(20)).await;
        assert!(matches!(result, Err(PoolError::Timeout(_))));
        assert_eq!(pool.get_metrics().timeouts, 1);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(pool.idle_count(), 1);
        assert_eq!(pool.get_metrics().total_acquired, 0);

        state.create_delay_ms.store(0, Ordering::SeqCst);
        let resource = pool.acquire().await.unwrap();
        assert_eq!(resource.use_count(), 1);
        assert_eq!(state.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_max_waiting() {
        let (pool, _state) = pool_with(
            PoolConfiguration::new()
                .with_max_pool_size(1)
                .with_max_waiting(0),
        );

        let _held = pool.acquire().await.unwrap();
        let result = pool.acquire().await;
        assert!(matches!(result, Err(PoolError::Exhausted(0))));
    }

    #[tokio::test]
    async fn test_waiter_count_drops_on_timeout() {
        let (pool, _state) = pool_with(PoolConfiguration::new().with_max_pool_size(1));

        let _held = pool.acquire().await.unwrap();
        let result = pool.acquire_timeout(Duration::from_millis(20)).await;
        assert!(result.is_err());
        assert_eq!(pool.waiting_count(), 0);
    }

    #[tokio::test]
    async fn test_warmup_respects_capacity() {
        let (pool, state) = pool_with(PoolConfiguration::new().with_max_pool_size(3));

        let held = pool.acquire().await.unwrap();
        let created = pool.warmup(5).await.unwrap();

        assert_eq!(created, 2);
        assert_eq!(pool.size(), 3);
        assert_eq!(state.created.load(Ordering::SeqCst), 3);
        pool.release(held);
    }

    #[tokio::test]
    async fn test_warmup_propagates_create_failure() {
        let (pool, state) = pool_with(PoolConfiguration::default());
        state.fail_create.store(true, Ordering::SeqCst);

        let result = pool.warmup(2).await;
        assert!(matches!(result, Err(PoolError::Create(MockError("launch failed")))));
        assert_eq!(pool.size(), 0);
    }

    #[tokio::test]
    async fn test_lifo_hands_out_most_recent() {
        let (pool, _state) = pool_with(PoolConfiguration::new().with_fifo(false));

        let first = pool.acquire().await.unwrap();
        let second = pool.acquire().await.unwrap();
        let second_id = second.id();
        pool.release(first);
        pool.release(second);

        let next = pool.acquire().await.unwrap();
        assert_eq!(next.id(), second_id);
    }

    #[tokio::test]
    async fn test_destroy_retires_checked_out_resource() {
        let (pool, state) = pool_with(PoolConfiguration::default());

        let resource = pool.acquire().await.unwrap();
        pool.destroy(resource).await;

        assert_eq!(state.destroyed.load(Ordering::SeqCst), 1);
        assert_eq!(pool.size(), 0);
        assert_eq!(pool.in_use_count(), 0);
        assert_eq!(pool.idle_count(), 0);
    }

    #[tokio::test]
    async fn test_ttl_expiry_at_checkout() {
        let (pool, state) = pool_with(PoolConfiguration::new().with_ttl(Duration::from_millis(20)));

        let resource = pool.acquire().await.unwrap();
        let first = resource.id();
        pool.release(resource);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let resource = pool.acquire().await.unwrap();
        assert_ne!(resource.id(), first);
        assert_eq!(state.destroyed.load(Ordering::SeqCst), 1);
        // Expiry is not a validation failure
        assert_eq!(pool.get_metrics().validation_failures, 0);
    }

    #[tokio::test]
    async fn test_cancelled_acquire_returns_delivered_resource() {
        let (pool, state) = pool_with(PoolConfiguration::default());

        let mut acquire = Box::pin(pool.acquire());
        assert!(futures::poll!(&mut acquire).is_pending());
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        drop(acquire);

        assert_eq!(state.created.load(Ordering::SeqCst), 1);
        assert_eq!(pool.size(), 1);
        assert_eq!(pool.idle_count(), 1);
        assert_eq!(pool.in_use_count(), 0);
        assert_eq!(pool.get_metrics().total_acquired, 0);

        let resource = pool.acquire().await.unwrap();
        assert_eq!(resource.use_count(), 1);
        pool.release(resource);

        pool.drain().await;
        assert_eq!(pool.size(), 0);
        assert_eq!(state.destroyed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_idle_health_check_does_not_reset_idle_clock() {
        let (pool, state) = pool_with(
            PoolConfiguration::new()
                .with_idle_timeout(Duration::from_millis(100))
                .with_eviction_interval(Duration::from_millis(20))
                .with_test_while_idle(true),
        );

        let resource = pool.acquire().await.unwrap();
        pool.release(resource);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(state.health_checks.load(Ordering::SeqCst) >= 1);
        assert_eq!(state.destroyed.load(Ordering::SeqCst), 1);
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(pool.size(), 0);
    }

    #[tokio::test]
    async fn test_drain_waits_for_in_flight_creation() {
        let (pool, state) = pool_with(PoolConfiguration::default());
        state.create_delay_ms.store(100, Ordering::SeqCst);

        let acquiring = tokio::spawn({
            let pool = pool.clone();
            async move { pool.acquire().await.map(|resource| resource.id()) }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        pool.drain().await;
        assert_eq!(state.created.load(Ordering::SeqCst), 1);
        assert_eq!(state.destroyed.load(Ordering::SeqCst), 1);
        assert_eq!(pool.size(), 0);

        let result = acquiring.await.unwrap();
        assert!(matches!(result, Err(PoolError::Closed)));
        assert_eq!(pool.get_metrics().total_acquired, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_in_use_tracks_every_holder() {
        let (pool, _state) = pool_with(PoolConfiguration::new().with_max_pool_size(2));

        let workers = (0..8).map(|_| {
            let pool = pool.clone();
            tokio::spawn(async move {
                for _ in 0..50 {
                    let resource = pool.acquire().await.unwrap();
                    assert!(pool.in_use_count() >= 1);
                    tokio::task::yield_now().await;
                    assert!(pool.in_use_count() >= 1);
                    pool.release(resource);
                }
            })
        });
        for result in futures::future::join_all(workers).await {
            result.unwrap();
        }

        assert_eq!(pool.in_use_count(), 0);
        assert_eq!(pool.get_metrics().total_acquired, 400);
        assert!(pool.size() <= 2);
    }

    #[tokio::test]
    async fn test_health_reflects_closed_pool() {
        let (pool, _state) = pool_with(PoolConfiguration::default());
        assert!(pool.get_health_status().is_healthy());

        pool.drain().await;
        assert!(!pool.get_health_status().is_healthy());
    }
}
