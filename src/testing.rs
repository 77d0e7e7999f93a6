//! Mock factory shared by the unit tests

use crate::factory::ResourceFactory;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct MockError(pub &'static str);

#[derive(Debug)]
pub struct MockResource {
    pub serial: usize,
}

#[derive(Debug, Default)]
pub struct MockState {
    pub created: AtomicUsize,
    pub destroyed: AtomicUsize,
    pub health_checks: AtomicUsize,
    pub fail_create: AtomicBool,
    pub fail_destroy: AtomicBool,
    pub unhealthy: AtomicBool,
    pub health_error: AtomicBool,
    pub create_delay_ms: AtomicU64,
}

pub struct MockFactory {
    state: Arc<MockState>,
}

impl MockFactory {
    pub fn new() -> (Self, Arc<MockState>) {
        let state = Arc::new(MockState::default());
        (
            Self {
                state: Arc::clone(&state),
            },
            state,
        )
    }
}

#[async_trait]
impl ResourceFactory for MockFactory {
    type Resource = MockResource;
    type Error = MockError;

    async fn create(&self) -> Result<MockResource, MockError> {
        let delay = self.state.create_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.state.fail_create.load(Ordering::SeqCst) {
            return Err(MockError("launch failed"));
        }
        let serial = self.state.created.fetch_add(1, Ordering::SeqCst);
        Ok(MockResource { serial })
    }

    async fn destroy(&self, _resource: MockResource) -> Result<(), MockError> {
        self.state.destroyed.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_destroy.load(Ordering::SeqCst) {
            return Err(MockError("close failed"));
        }
        Ok(())
    }

    async fn validate(&self, _resource: &MockResource) -> Result<bool, MockError> {
        self.state.health_checks.fetch_add(1, Ordering::SeqCst);
        if self.state.health_error.load(Ordering::SeqCst) {
            return Err(MockError("probe failed"));
        }
        Ok(!self.state.unhealthy.load(Ordering::SeqCst))
    }
}
