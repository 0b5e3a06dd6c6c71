use crate::{
    coordinator::page::{Badge, PageHost},
    dom::PageSnapshot,
    error::{Result, ScrapeError},
};
use async_trait::async_trait;
use headless_chrome::Tab;
use std::sync::Arc;

const CAPTURE_JS: &str = include_str!("capture_snapshot.js");
const BADGE_JS: &str = include_str!("status_badge.js");

/// A live Chrome tab acting as a [`PageHost`].
///
/// CDP calls block, so each one runs on the blocking pool.
pub struct TabHost {
    tab: Arc<Tab>,
}

impl TabHost {
    pub fn new(tab: Arc<Tab>) -> Self {
        Self { tab }
    }

    async fn evaluate(&self, script: String) -> Result<Option<serde_json::Value>> {
        let tab = self.tab.clone();
        let remote_object = tokio::task::spawn_blocking(move || tab.evaluate(&script, false))
            .await
            .map_err(|e| ScrapeError::EvaluationFailed(format!("Evaluation task failed: {}", e)))?
            .map_err(|e| ScrapeError::EvaluationFailed(e.to_string()))?;

        Ok(remote_object.value)
    }

    async fn render_badge(&self, state: Option<&str>, message: &str) -> Result<()> {
        let state = serde_json::to_string(&state).map_err(|e| ScrapeError::EvaluationFailed(e.to_string()))?;
        let message = serde_json::to_string(message).map_err(|e| ScrapeError::EvaluationFailed(e.to_string()))?;

        self.evaluate(format!("({})({}, {})", BADGE_JS, state, message)).await?;
        Ok(())
    }
}

#[async_trait]
impl PageHost for TabHost {
    fn label(&self) -> String {
        self.tab.get_url()
    }

    async fn snapshot(&self) -> Result<PageSnapshot> {
        let value = self
            .evaluate(CAPTURE_JS.to_string())
            .await
            .map_err(|e| ScrapeError::SnapshotFailed(e.to_string()))?
            .ok_or_else(|| ScrapeError::SnapshotFailed("No value returned from capture script".to_string()))?;

        // The script returns a JSON string
        let json = value
            .as_str()
            .ok_or_else(|| ScrapeError::SnapshotFailed("Capture script returned a non-string value".to_string()))?;

        PageSnapshot::from_json(json)
    }

    async fn show_badge(&self, badge: Badge) -> Result<()> {
        self.render_badge(Some(badge.css_class()), badge.label()).await
    }

    async fn clear_badge(&self) -> Result<()> {
        self.render_badge(None, "").await
    }
}
