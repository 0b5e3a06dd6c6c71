use crate::{extract::selectors::SelectorTable, record::View};

/// Classify a page URL.
///
/// Views are tried in priority order (contacts, deals, tasks) and the first
/// whose URL pattern appears in `url` wins. `None` means the page is not a
/// supported view.
pub fn detect_view(url: &str, table: &SelectorTable) -> Option<View> {
    View::ALL.into_iter().find(|view| {
        table
            .view(*view)
            .url_patterns
            .iter()
            .any(|pattern| url.contains(pattern.as_str()))
    })
}
