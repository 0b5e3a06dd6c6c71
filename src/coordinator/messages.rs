//! Typed messages exchanged between the caller, the coordinator and the page.

use crate::{error::{ErrorKind, ScrapeError}, record::{Record, View}, store::SyncSummary};
use serde::{Deserialize, Serialize};

/// Caller → coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    ExtractData,
    DeleteItem {
        view: View,
        #[serde(default)]
        id: Option<String>,
    },
}

/// Coordinator → caller, exactly one per request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub success: bool,

    #[serde(default)]
    pub view: Option<View>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl Response {
    pub fn synced(view: View, summary: SyncSummary) -> Self {
        Self {
            success: true,
            view: Some(view),
            count: Some(summary.count),
            last_sync: Some(summary.last_sync),
            error: None,
            error_kind: None,
        }
    }

    /// Failed extraction; count and lastSync are reported as zero
    pub fn extraction_failed(view: Option<View>, error: &ScrapeError) -> Self {
        Self {
            success: false,
            view,
            count: Some(0),
            last_sync: Some(0),
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
        }
    }

    /// Failed delete; only the error is reported
    pub fn failed(error: &ScrapeError) -> Self {
        Self {
            success: false,
            view: None,
            count: None,
            last_sync: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
        }
    }
}

/// Coordinator → page, answered with a [`PageReport`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetRequest {
    ExtractData,
}

/// Page → coordinator: the detected view and the raw records found on it
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageReport {
    pub view: Option<View>,

    #[serde(default)]
    pub data: Vec<Record>,
}

/// Coordinator → page, fire-and-forget; drives the on-page status badge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusNotice {
    StartExtraction,
    ExtractionSuccess,
    ExtractionFailed,
}

/// Coordinator → observers after a successful merge or delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "DATA_SYNCED", rename_all = "camelCase")]
pub struct DataSynced {
    pub view: View,
    pub count: usize,
    pub last_sync: i64,
}

impl DataSynced {
    pub fn new(view: View, summary: SyncSummary) -> Self {
        Self {
            view,
            count: summary.count,
            last_sync: summary.last_sync,
        }
    }
}
