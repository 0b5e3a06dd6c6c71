use crate::error::{Result, ScrapeError};
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The rendered document of a page at one instant, plus where it was loaded from.
///
/// Only elements present when the snapshot was taken are visible to the
/// extractor; lazily rendered rows that were not in the DOM yet are simply absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    /// Location of the page (`window.location.href`)
    pub url: String,

    /// Serialized document (`document.documentElement.outerHTML`)
    pub html: String,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }

    /// Load a saved page from disk
    pub fn from_file(url: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let html = std::fs::read_to_string(path).map_err(|e| {
            ScrapeError::SnapshotFailed(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Ok(Self::new(url, html))
    }

    /// Decode the JSON string produced by the capture script
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| ScrapeError::SnapshotFailed(format!("Failed to parse snapshot JSON: {}", e)))
    }

    /// Parse the document
    pub fn parse(&self) -> Html {
        Html::parse_document(&self.html)
    }
}
