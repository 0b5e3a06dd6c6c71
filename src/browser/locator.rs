use crate::{
    browser::{session::BrowserSession, tab::TabHost},
    coordinator::{
        page::{DEFAULT_DISMISS_AFTER, PageAgent, PageChannel},
        target::{TargetContext, TargetLocator},
    },
    extract::Extractor,
};
use async_trait::async_trait;
use std::{collections::{HashMap, HashSet}, sync::Arc, time::Duration};
use tokio::sync::Mutex;

/// Resolves the foreground tab of a browser session to a running page agent.
///
/// One agent is started per tab and reused for later attempts, so the badge
/// timer of a previous attempt keeps running on the same page. Agents of tabs
/// that have gone away are dropped on the next lookup.
pub struct BrowserLocator {
    session: Arc<BrowserSession>,
    extractor: Arc<Extractor>,
    dismiss_after: Duration,
    agents: Mutex<HashMap<String, PageChannel>>,
}

impl BrowserLocator {
    pub fn new(session: Arc<BrowserSession>, extractor: Arc<Extractor>) -> Self {
        Self {
            session,
            extractor,
            dismiss_after: DEFAULT_DISMISS_AFTER,
            agents: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_dismiss_after(mut self, dismiss_after: Duration) -> Self {
        self.dismiss_after = dismiss_after;
        self
    }
}

/// Drop agents whose tab is no longer open or whose task has stopped
fn retain_open(agents: &mut HashMap<String, PageChannel>, open: &HashSet<String>) {
    agents.retain(|target_id, channel| {
        let keep = open.contains(target_id) && !channel.is_closed();
        if !keep {
            log::debug!("Dropping page agent for {}", channel.label());
        }
        keep
    });
}

#[async_trait]
impl TargetLocator for BrowserLocator {
    async fn active_target(&self) -> Option<Arc<dyn TargetContext>> {
        let session = self.session.clone();
        let lookup = tokio::task::spawn_blocking(move || -> crate::Result<_> {
            let open: HashSet<String> = session.get_tabs()?.iter().map(|tab| tab.get_target_id().clone()).collect();
            Ok((session.active_tab()?, open))
        });

        let (tab, open) = match lookup.await {
            Ok(Ok((Some(tab), open))) => (tab, open),
            Ok(Ok((None, _))) => return None,
            Ok(Err(e)) => {
                log::warn!("Failed to find the active tab: {}", e);
                return None;
            }
            Err(e) => {
                log::warn!("Active tab lookup did not finish: {}", e);
                return None;
            }
        };

        let target_id = tab.get_target_id().clone();
        let mut agents = self.agents.lock().await;
        retain_open(&mut agents, &open);

        let channel = agents.entry(target_id).or_insert_with(|| {
            log::debug!("Starting page agent for {}", tab.get_url());
            PageAgent::new(Arc::new(TabHost::new(tab)), self.extractor.clone())
                .with_dismiss_after(self.dismiss_after)
                .spawn()
        });

        let target: Arc<dyn TargetContext> = Arc::new(channel.clone());
        Some(target)
    }
}
