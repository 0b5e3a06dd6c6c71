//! Page side of the extraction round trip.
//!
//! A [`PageAgent`] runs as its own task next to a [`PageHost`] (the thing
//! that can snapshot the DOM and draw a status badge). The coordinator talks
//! to it only through the [`PageChannel`] returned by [`PageAgent::spawn`].

use crate::{
    coordinator::{
        messages::{PageReport, StatusNotice, TargetRequest},
        target::TargetContext,
    },
    dom::PageSnapshot,
    error::{Result, ScrapeError},
    extract::Extractor,
};
use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use tokio::sync::{Mutex, RwLock, mpsc, oneshot};
use tokio::time::{Instant, sleep_until};

/// How long a terminal badge stays visible
pub const DEFAULT_DISMISS_AFTER: Duration = Duration::from_millis(1500);

const NO_RECEIVER: &str = "Could not establish connection. Receiving end does not exist.";
const PORT_CLOSED: &str = "The message port closed before a response was received.";

/// Status badge shown on the page during an extraction attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    Extracting,
    Success,
    Failed,
}

impl Badge {
    pub fn label(&self) -> &'static str {
        match self {
            Badge::Extracting => "Extracting...",
            Badge::Success => "✓ Success",
            Badge::Failed => "✕ Failed",
        }
    }

    /// CSS class used by the injected badge
    pub fn css_class(&self) -> &'static str {
        match self {
            Badge::Extracting => "extracting",
            Badge::Success => "success",
            Badge::Failed => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Badge::Extracting)
    }
}

impl From<StatusNotice> for Badge {
    fn from(notice: StatusNotice) -> Self {
        match notice {
            StatusNotice::StartExtraction => Badge::Extracting,
            StatusNotice::ExtractionSuccess => Badge::Success,
            StatusNotice::ExtractionFailed => Badge::Failed,
        }
    }
}

/// Badge state: hidden, or showing a badge with an optional dismiss deadline
#[derive(Debug)]
pub struct StatusIndicator {
    current: Option<Badge>,
    dismiss_at: Option<Instant>,
    dismiss_after: Duration,
}

impl StatusIndicator {
    pub fn new(dismiss_after: Duration) -> Self {
        Self {
            current: None,
            dismiss_at: None,
            dismiss_after,
        }
    }

    /// Show the badge for `notice`; terminal badges arm the dismiss timer
    pub fn apply(&mut self, notice: StatusNotice, now: Instant) -> Badge {
        let badge = Badge::from(notice);
        self.current = Some(badge);
        self.dismiss_at = badge.is_terminal().then(|| now + self.dismiss_after);
        badge
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.dismiss_at
    }

    pub fn dismiss(&mut self) {
        self.current = None;
        self.dismiss_at = None;
    }

    pub fn current(&self) -> Option<Badge> {
        self.current
    }
}

/// Everything the page agent needs from the live page
#[async_trait]
pub trait PageHost: Send + Sync + 'static {
    fn label(&self) -> String;

    /// Capture the DOM as it is right now
    async fn snapshot(&self) -> Result<PageSnapshot>;

    async fn show_badge(&self, badge: Badge) -> Result<()>;

    async fn clear_badge(&self) -> Result<()>;
}

struct Envelope {
    request: TargetRequest,
    reply: oneshot::Sender<Result<PageReport>>,
}

/// Answers extraction requests and drives the status badge for one page
pub struct PageAgent<H: PageHost> {
    host: Arc<H>,
    extractor: Arc<Extractor>,
    dismiss_after: Duration,
}

impl<H: PageHost> PageAgent<H> {
    pub fn new(host: Arc<H>, extractor: Arc<Extractor>) -> Self {
        Self {
            host,
            extractor,
            dismiss_after: DEFAULT_DISMISS_AFTER,
        }
    }

    /// Builder method: set how long terminal badges stay up
    pub fn with_dismiss_after(mut self, dismiss_after: Duration) -> Self {
        self.dismiss_after = dismiss_after;
        self
    }

    /// Start the agent task and return the channel that reaches it.
    ///
    /// The task ends once every clone of the channel is dropped.
    pub fn spawn(self) -> PageChannel {
        let label = self.host.label();
        let (requests, request_rx) = mpsc::channel(8);
        let (notices, notice_rx) = mpsc::unbounded_channel();

        tokio::spawn(self.run(request_rx, notice_rx));

        PageChannel {
            label,
            requests,
            notices,
        }
    }

    async fn run(
        self,
        mut requests: mpsc::Receiver<Envelope>,
        mut notices: mpsc::UnboundedReceiver<StatusNotice>,
    ) {
        let mut indicator = StatusIndicator::new(self.dismiss_after);

        loop {
            let deadline = indicator.deadline();

            tokio::select! {
                biased;

                Some(notice) = notices.recv() => {
                    let badge = indicator.apply(notice, Instant::now());
                    if let Err(e) = self.host.show_badge(badge).await {
                        log::debug!("Failed to show badge on {}: {}", self.host.label(), e);
                    }
                }
                Some(envelope) = requests.recv() => {
                    let reply = self.answer(envelope.request).await;
                    // the requester may have given up; nothing to do then
                    let _ = envelope.reply.send(reply);
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    indicator.dismiss();
                    if let Err(e) = self.host.clear_badge().await {
                        log::debug!("Failed to clear badge on {}: {}", self.host.label(), e);
                    }
                }
                else => break,
            }
        }

        log::debug!("Page agent for {} stopped", self.host.label());
    }

    async fn answer(&self, request: TargetRequest) -> Result<PageReport> {
        match request {
            TargetRequest::ExtractData => {
                let snapshot = self.host.snapshot().await?;
                Ok(self.extractor.scan(&snapshot))
            }
        }
    }
}

/// Coordinator-side handle of a running [`PageAgent`]
#[derive(Clone)]
pub struct PageChannel {
    label: String,
    requests: mpsc::Sender<Envelope>,
    notices: mpsc::UnboundedSender<StatusNotice>,
}

impl PageChannel {
    /// The agent task has stopped and no request can reach it anymore
    pub fn is_closed(&self) -> bool {
        self.requests.is_closed()
    }
}

#[async_trait]
impl TargetContext for PageChannel {
    fn label(&self) -> String {
        self.label.clone()
    }

    async fn request(&self, request: TargetRequest) -> Result<PageReport> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Envelope { request, reply })
            .await
            .map_err(|_| ScrapeError::Transport(NO_RECEIVER.to_string()))?;

        response
            .await
            .map_err(|_| ScrapeError::Transport(PORT_CLOSED.to_string()))?
    }

    fn notify(&self, notice: StatusNotice) -> Result<()> {
        self.notices
            .send(notice)
            .map_err(|_| ScrapeError::Transport(NO_RECEIVER.to_string()))
    }
}

/// What happened to the badge of a [`StaticPage`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeEvent {
    Shown(Badge),
    Cleared,
}

/// Host over a saved snapshot instead of a live browser tab
pub struct StaticPage {
    label: String,
    snapshot: RwLock<PageSnapshot>,
    badges: Mutex<Vec<BadgeEvent>>,
}

impl StaticPage {
    pub fn new(snapshot: PageSnapshot) -> Self {
        Self {
            label: snapshot.url.clone(),
            snapshot: RwLock::new(snapshot),
            badges: Mutex::new(Vec::new()),
        }
    }

    /// Swap in a different page, as if the user navigated
    pub async fn navigate(&self, snapshot: PageSnapshot) {
        *self.snapshot.write().await = snapshot;
    }

    /// Every badge change so far, oldest first
    pub async fn badge_history(&self) -> Vec<BadgeEvent> {
        self.badges.lock().await.clone()
    }
}

#[async_trait]
impl PageHost for StaticPage {
    fn label(&self) -> String {
        self.label.clone()
    }

    async fn snapshot(&self) -> Result<PageSnapshot> {
        Ok(self.snapshot.read().await.clone())
    }

    async fn show_badge(&self, badge: Badge) -> Result<()> {
        log::info!("[{}] {}", self.label, badge.label());
        self.badges.lock().await.push(BadgeEvent::Shown(badge));
        Ok(())
    }

    async fn clear_badge(&self) -> Result<()> {
        self.badges.lock().await.push(BadgeEvent::Cleared);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{extract::SelectorTable, record::View};

    const CONTACTS: &str = include_str!("../../tests/fixtures/contacts.html");

    fn extractor() -> Arc<Extractor> {
        Arc::new(Extractor::new(SelectorTable::default()).unwrap())
    }

    fn contacts_page() -> Arc<StaticPage> {
        Arc::new(StaticPage::new(PageSnapshot::new(
            "https://acme.activehosted.com/app/contacts",
            CONTACTS,
        )))
    }

    #[test]
    fn test_indicator_transitions() {
        let now = Instant::now();
        let mut indicator = StatusIndicator::new(Duration::from_millis(1500));

        assert_eq!(indicator.apply(StatusNotice::StartExtraction, now), Badge::Extracting);
        assert_eq!(indicator.deadline(), None);

        assert_eq!(indicator.apply(StatusNotice::ExtractionFailed, now), Badge::Failed);
        assert_eq!(indicator.deadline(), Some(now + Duration::from_millis(1500)));

        indicator.dismiss();
        assert_eq!(indicator.current(), None);
        assert_eq!(indicator.deadline(), None);
    }

    #[test]
    fn test_restart_disarms_timer() {
        let now = Instant::now();
        let mut indicator = StatusIndicator::new(Duration::from_secs(1));
        indicator.apply(StatusNotice::ExtractionSuccess, now);
        indicator.apply(StatusNotice::StartExtraction, now);
        assert_eq!(indicator.deadline(), None);
        assert_eq!(indicator.current(), Some(Badge::Extracting));
    }

    #[test]
    fn test_badge_labels() {
        assert_eq!(Badge::Extracting.label(), "Extracting...");
        assert_eq!(Badge::Success.label(), "✓ Success");
        assert_eq!(Badge::Failed.css_class(), "error");
    }

    #[tokio::test]
    async fn test_agent_answers_extract() {
        let channel = PageAgent::new(contacts_page(), extractor()).spawn();
        let report = channel.request(TargetRequest::ExtractData).await.unwrap();

        assert_eq!(report.view, Some(View::Contacts));
        assert_eq!(report.data.len(), 3);
    }

    struct CrashingPage;

    #[async_trait]
    impl PageHost for CrashingPage {
        fn label(&self) -> String {
            "crashing".to_string()
        }

        async fn snapshot(&self) -> Result<PageSnapshot> {
            panic!("renderer gone");
        }

        async fn show_badge(&self, _badge: Badge) -> Result<()> {
            Ok(())
        }

        async fn clear_badge(&self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_channel_closed_after_agent_dies() {
        let channel = PageAgent::new(Arc::new(CrashingPage), extractor()).spawn();
        assert!(!channel.is_closed());

        let err = channel.request(TargetRequest::ExtractData).await.unwrap_err();
        assert_eq!(err.to_string(), PORT_CLOSED);
        assert!(channel.is_closed());

        let err = channel.request(TargetRequest::ExtractData).await.unwrap_err();
        assert_eq!(err.to_string(), NO_RECEIVER);
    }

    #[tokio::test]
    async fn test_agent_follows_navigation() {
        let page = contacts_page();
        let channel = PageAgent::new(page.clone(), extractor()).spawn();

        page.navigate(PageSnapshot::new("https://acme.activehosted.com/app/reports", "<html></html>")).await;
        let report = channel.request(TargetRequest::ExtractData).await.unwrap();
        assert_eq!(report.view, None);
        assert!(report.data.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_badge_auto_dismisses() {
        let page = contacts_page();
        let channel = PageAgent::new(page.clone(), extractor()).spawn();

        channel.notify(StatusNotice::StartExtraction).unwrap();
        channel.notify(StatusNotice::ExtractionSuccess).unwrap();

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(
            page.badge_history().await,
            vec![BadgeEvent::Shown(Badge::Extracting), BadgeEvent::Shown(Badge::Success)]
        );

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(page.badge_history().await.last(), Some(&BadgeEvent::Cleared));
    }

    #[tokio::test]
    async fn test_failed_snapshot_reaches_requester() {
        struct BrokenPage;

        #[async_trait]
        impl PageHost for BrokenPage {
            fn label(&self) -> String {
                "broken".to_string()
            }

            async fn snapshot(&self) -> Result<PageSnapshot> {
                Err(ScrapeError::SnapshotFailed("tab crashed".to_string()))
            }

            async fn show_badge(&self, _badge: Badge) -> Result<()> {
                Err(ScrapeError::EvaluationFailed("no document".to_string()))
            }

            async fn clear_badge(&self) -> Result<()> {
                Ok(())
            }
        }

        let channel = PageAgent::new(Arc::new(BrokenPage), extractor()).spawn();
        assert!(channel.notify(StatusNotice::StartExtraction).is_ok());

        let err = channel.request(TargetRequest::ExtractData).await.unwrap_err();
        assert!(matches!(err, ScrapeError::SnapshotFailed(_)));
    }
}
