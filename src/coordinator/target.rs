use crate::{coordinator::messages::{PageReport, StatusNotice, TargetRequest}, error::Result};
use async_trait::async_trait;
use std::sync::Arc;

/// The execution context holding the live page.
///
/// Two channels with different guarantees: [`request`](Self::request) is a
/// round trip the caller waits on, [`notify`](Self::notify) hands a status
/// notice off without waiting and may fail silently from the sender's view.
#[async_trait]
pub trait TargetContext: Send + Sync {
    /// Human readable name for logs
    fn label(&self) -> String;

    async fn request(&self, request: TargetRequest) -> Result<PageReport>;

    fn notify(&self, notice: StatusNotice) -> Result<()>;
}

/// Finds the context an extraction should run against
#[async_trait]
pub trait TargetLocator: Send + Sync {
    /// The foreground page, if any
    async fn active_target(&self) -> Option<Arc<dyn TargetContext>>;
}

/// Locator that always answers with the same target (or none)
#[derive(Clone, Default)]
pub struct SingleTarget {
    target: Option<Arc<dyn TargetContext>>,
}

impl SingleTarget {
    pub fn new(target: Arc<dyn TargetContext>) -> Self {
        Self { target: Some(target) }
    }

    /// A locator with no page behind it
    pub fn none() -> Self {
        Self { target: None }
    }
}

#[async_trait]
impl TargetLocator for SingleTarget {
    async fn active_target(&self) -> Option<Arc<dyn TargetContext>> {
        self.target.clone()
    }
}
