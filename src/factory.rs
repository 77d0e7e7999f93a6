//! Resource factory hooks and the retirement policy layered over them

use async_trait::async_trait;

/// Creates, tears down and health-checks the resources a pool manages.
///
/// Launch parameters for the underlying resource belong to the
/// implementing type; the pool never inspects them.
///
/// # Examples
///
/// ```
/// use esox_browserpool::{async_trait, ResourceFactory};
///
/// struct Browser {
///     connected: bool,
/// }
///
/// struct Launcher {
///     headless: bool,
/// }
///
/// #[async_trait]
/// impl ResourceFactory for Launcher {
///     type Resource = Browser;
///     type Error = std::io::Error;
///
///     async fn create(&self) -> Result<Browser, std::io::Error> {
///         Ok(Browser { connected: self.headless })
///     }
///
///     async fn destroy(&self, _browser: Browser) -> Result<(), std::io::Error> {
///         Ok(())
///     }
///
///     async fn validate(&self, browser: &Browser) -> Result<bool, std::io::Error> {
///         Ok(browser.connected)
///     }
/// }
/// ```
#[async_trait]
pub trait ResourceFactory: Send + Sync + 'static {
    /// The pooled resource
    type Resource: Send + Sync + 'static;

    /// Error produced by any of the hooks
    type Error: std::error::Error + Send + Sync + 'static;

    /// Launch a new resource
    async fn create(&self) -> Result<Self::Resource, Self::Error>;

    /// Release the resource's underlying system handles.
    ///
    /// Failures are logged by the pool and never reach a caller.
    async fn destroy(&self, resource: Self::Resource) -> Result<(), Self::Error>;

    /// Report whether an idle resource is still fit for reuse.
    ///
    /// An error counts as unfit.
    async fn validate(&self, _resource: &Self::Resource) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// Outcome of validating an idle resource before hand-out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Validity {
    /// Healthy and within its use budget
    Valid,

    /// The health check returned false
    Unhealthy,

    /// The health check itself failed
    CheckFailed,

    /// Healthy, but acquired `max_uses` times already
    UsesExhausted,
}

impl Validity {
    pub fn is_valid(self) -> bool {
        self == Validity::Valid
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Validity::Valid => "valid",
            Validity::Unhealthy => "unhealthy",
            Validity::CheckFailed => "health check failed",
            Validity::UsesExhausted => "use budget exhausted",
        }
    }
}

/// Status of a teardown; recorded, never raised
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Teardown {
    Clean,
    Failed(String),
}

/// Factory hooks combined with the per-resource use budget
pub(crate) struct FactoryBinding<F> {
    factory: F,
    max_uses: usize,
}

impl<F: ResourceFactory> FactoryBinding<F> {
    pub fn new(factory: F, max_uses: usize) -> Self {
        Self { factory, max_uses }
    }

    pub async fn create(&self) -> Result<F::Resource, F::Error> {
        self.factory.create().await
    }

    pub async fn destroy(&self, resource: F::Resource) -> Teardown {
        match self.factory.destroy(resource).await {
            Ok(()) => Teardown::Clean,
            Err(error) => Teardown::Failed(error.to_string()),
        }
    }

    /// Health first; the use budget is only consulted for healthy resources.
    pub async fn validate(&self, resource: &F::Resource, use_count: usize) -> Validity {
        match self.factory.validate(resource).await {
            Ok(true) if self.within_budget(use_count) => Validity::Valid,
            Ok(true) => Validity::UsesExhausted,
            Ok(false) => Validity::Unhealthy,
            Err(error) => {
                tracing::warn!(%error, use_count, "resource health check failed");
                Validity::CheckFailed
            }
        }
    }

    pub fn within_budget(&self, use_count: usize) -> bool {
        self.max_uses == 0 || use_count < self.max_uses
    }
}
