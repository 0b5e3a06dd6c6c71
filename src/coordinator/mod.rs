//! Extraction coordinator: drives one attempt from request to terminal reply.

pub mod messages;
pub mod page;
pub mod target;

pub use messages::{DataSynced, PageReport, Request, Response, StatusNotice, TargetRequest};
pub use page::{Badge, BadgeEvent, PageAgent, PageChannel, PageHost, StaticPage, StatusIndicator};
pub use target::{SingleTarget, TargetContext, TargetLocator};

use crate::{
    error::{Result, ScrapeError},
    record::View,
    store::{MergeStore, SyncSummary},
};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};

/// Terminal state of one extraction attempt
#[derive(Debug)]
pub enum Outcome {
    MergeSucceeded { view: View, summary: SyncSummary },
    MergeFailed { view: View, error: ScrapeError },
    /// The page was recognized but had no records on it
    NoData { view: View },
    NoView,
    TransportFailed { error: ScrapeError },
}

impl Outcome {
    /// Notice the target should see for this outcome
    pub fn notice(&self) -> StatusNotice {
        match self {
            Outcome::MergeSucceeded { .. } => StatusNotice::ExtractionSuccess,
            _ => StatusNotice::ExtractionFailed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::MergeSucceeded { .. })
    }

    pub fn into_response(self) -> Response {
        match self {
            Outcome::MergeSucceeded { view, summary } => Response::synced(view, summary),
            Outcome::MergeFailed { view, error } => Response::extraction_failed(Some(view), &error),
            Outcome::NoData { .. } | Outcome::NoView => {
                Response::extraction_failed(None, &ScrapeError::NoSupportedView)
            }
            Outcome::TransportFailed { error } => Response::extraction_failed(None, &error),
        }
    }
}

/// Answers caller requests against the active target and the merge store
pub struct Coordinator {
    locator: Arc<dyn TargetLocator>,
    store: Arc<MergeStore>,
    events: broadcast::Sender<DataSynced>,
}

impl Coordinator {
    pub fn new(locator: Arc<dyn TargetLocator>, store: Arc<MergeStore>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            locator,
            store,
            events,
        }
    }

    pub fn store(&self) -> &Arc<MergeStore> {
        &self.store
    }

    /// Receive a [`DataSynced`] event after every successful merge or delete
    pub fn subscribe(&self) -> broadcast::Receiver<DataSynced> {
        self.events.subscribe()
    }

    /// Answer one request; always exactly one response
    pub async fn handle(&self, request: Request) -> Response {
        match request {
            Request::ExtractData => self.extract().await,
            Request::DeleteItem { view, id } => self.delete_item(view, id).await,
        }
    }

    /// Run one extraction attempt against the active target
    pub async fn extract(&self) -> Response {
        let outcome = self.attempt().await;
        if outcome.is_success() {
            log::info!("Extraction finished: {:?}", outcome);
        } else {
            log::warn!("Extraction failed: {:?}", outcome);
        }
        outcome.into_response()
    }

    /// Run one extraction attempt and return its terminal state
    pub async fn attempt(&self) -> Outcome {
        let Some(target) = self.locator.active_target().await else {
            log::debug!("No target for extraction");
            return Outcome::TransportFailed {
                error: ScrapeError::NoTarget,
            };
        };
        let label = target.label();

        log::debug!("Requesting extraction from {}", label);
        notify(target.as_ref(), StatusNotice::StartExtraction);

        let outcome = match target.request(TargetRequest::ExtractData).await {
            Err(error) => Outcome::TransportFailed { error },
            Ok(PageReport { view: None, .. }) => Outcome::NoView,
            Ok(PageReport { view: Some(view), data }) if data.is_empty() => Outcome::NoData { view },
            Ok(PageReport { view: Some(view), data }) => {
                log::debug!("{} reported {} raw {} record(s)", label, data.len(), view);
                match self.store.merge_data(view, data).await {
                    Ok(summary) => Outcome::MergeSucceeded { view, summary },
                    Err(error) => Outcome::MergeFailed { view, error },
                }
            }
        };

        notify(target.as_ref(), outcome.notice());
        if let Outcome::MergeSucceeded { view, summary } = &outcome {
            self.broadcast(*view, *summary);
        }
        outcome
    }

    /// Remove a record from the stored view
    pub async fn delete_item(&self, view: View, id: Option<String>) -> Response {
        match self.store.delete_item(view, id.as_deref()).await {
            Ok(summary) => {
                self.broadcast(view, summary);
                Response::synced(view, summary)
            }
            Err(error) => {
                log::warn!("Delete in {} failed: {}", view, error);
                Response::failed(&error)
            }
        }
    }

    fn broadcast(&self, view: View, summary: SyncSummary) {
        // no subscribers is fine
        let _ = self.events.send(DataSynced::new(view, summary));
    }

    /// Serve requests from a channel, one task per request
    pub fn spawn(self: Arc<Self>) -> CoordinatorHandle {
        let (tx, mut rx) = mpsc::channel::<(Request, oneshot::Sender<Response>)>(16);

        tokio::spawn(async move {
            while let Some((request, reply)) = rx.recv().await {
                let coordinator = self.clone();
                tokio::spawn(async move {
                    let response = coordinator.handle(request).await;
                    let _ = reply.send(response);
                });
            }
            log::debug!("Coordinator stopped");
        });

        CoordinatorHandle { tx }
    }
}

/// Best-effort; the badge is cosmetic
fn notify(target: &dyn TargetContext, notice: StatusNotice) {
    if let Err(e) = target.notify(notice) {
        log::debug!("Ignoring undeliverable {:?} for {}: {}", notice, target.label(), e);
    }
}

/// Caller side of a spawned [`Coordinator`]
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<(Request, oneshot::Sender<Response>)>,
}

impl CoordinatorHandle {
    pub async fn send(&self, request: Request) -> Result<Response> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send((request, reply))
            .await
            .map_err(|_| ScrapeError::Transport("Coordinator is not running".to_string()))?;

        response
            .await
            .map_err(|_| ScrapeError::Transport("Coordinator dropped the request".to_string()))
    }
}
