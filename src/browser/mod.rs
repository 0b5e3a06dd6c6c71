//! Live Chrome target context
//!
//! - session: launch or attach to a browser and find its foreground tab
//! - tab: a tab as a page host (DOM snapshot and status badge via injected scripts)
//! - locator: maps the foreground tab to a page agent for the coordinator

pub mod config;
pub mod locator;
pub mod session;
pub mod tab;

pub use config::{ConnectionOptions, LaunchOptions};
pub use locator::BrowserLocator;
pub use session::BrowserSession;
pub use tab::TabHost;
