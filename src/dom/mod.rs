//! Page snapshot and DOM reading module
//!
//! This module provides the read side of scraping a rendered page:
//! - PageSnapshot: URL plus serialized document captured from the target context
//! - element helpers: trimmed text and attribute lookup over parsed elements

pub mod element;
pub mod snapshot;

pub use element::{attribute, element_text};
pub use snapshot::PageSnapshot;

use crate::error::{Result, ScrapeError};
use scraper::Selector;

/// Compile a CSS selector, keeping the offending text in the error
pub fn compile_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScrapeError::InvalidSelector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}
