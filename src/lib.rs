//! # crm-scrape
//!
//! Extract contacts, deals and tasks from the rendered pages of a CRM web app,
//! deduplicate them and keep a locally persisted, synced copy.
//!
//! ## Features
//!
//! - **Declarative selectors**: where every field lives is plain, versioned data ([`SelectorTable`])
//! - **View detection**: the page URL decides whether a page holds contacts, deals or tasks
//! - **Deduplication**: natural ids, or a hash of title/relatedTo/due when a row has none
//! - **Merge store**: whole-view replace with atomic persistence and a monotonic `lastSync`
//! - **Coordinator**: one request, exactly one response, with a status badge on the page
//! - **Live browser**: attach to (or launch) Chrome and extract from the foreground tab
//!
//! ## CLI
//!
//! ```bash
//! # Extract from the foreground tab of a running Chrome
//! crm-scrape extract --ws-endpoint ws://127.0.0.1:9222/devtools/browser/<id>
//!
//! # Extract from a saved page
//! crm-scrape extract-html --url https://acme.activehosted.com/app/deals --html deals.html
//!
//! # Review and export what was stored
//! crm-scrape show --view deals --search acme
//! crm-scrape export --all --format csv --out export/
//! ```
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use crm_scrape::{
//!     Coordinator, Extractor, MemoryStore, MergeStore, PageAgent, PageSnapshot, Request, SelectorTable,
//!     SingleTarget, StaticPage,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> crm_scrape::Result<()> {
//! let extractor = Arc::new(Extractor::new(SelectorTable::default())?);
//! let page = Arc::new(StaticPage::new(PageSnapshot::from_file(
//!     "https://acme.activehosted.com/app/contacts",
//!     "contacts.html",
//! )?));
//! let channel = PageAgent::new(page, extractor).spawn();
//!
//! let coordinator = Coordinator::new(
//!     Arc::new(SingleTarget::new(Arc::new(channel))),
//!     Arc::new(MergeStore::new(Arc::new(MemoryStore::new()))),
//! );
//!
//! let response = coordinator.handle(Request::ExtractData).await;
//! println!("{:?} records synced", response.count);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`extract`]: selector tables, view detection and field extraction
//! - [`store`]: key-value persistence, deduplication and the merge store
//! - [`coordinator`]: request handling, page agents and the typed message set
//! - [`browser`]: Chrome sessions as target contexts (requires `browser` feature)
//! - [`export`]: JSON/CSV export and review helpers
//! - [`error`]: Error types and result aliases

#[cfg(feature = "browser")]
pub mod browser;
pub mod config;
pub mod coordinator;
pub mod dom;
pub mod error;
pub mod export;
pub mod extract;
pub mod record;
pub mod store;

#[cfg(feature = "browser")]
pub use browser::{BrowserLocator, BrowserSession, ConnectionOptions, LaunchOptions, TabHost};
pub use config::SyncConfig;
pub use coordinator::{
    Coordinator, CoordinatorHandle, DataSynced, Outcome, PageAgent, PageChannel, PageHost, PageReport, Request,
    Response, SingleTarget, StaticPage, StatusNotice, TargetContext, TargetLocator,
};
pub use dom::PageSnapshot;
pub use error::{ErrorKind, Result, ScrapeError};
pub use extract::{Extractor, SelectorTable};
pub use record::{FieldValue, Record, View};
pub use store::{Dataset, FileStore, KvStore, MemoryStore, MergeStore, SyncSummary};
