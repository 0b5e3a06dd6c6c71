//! Live Chrome runs. Ignored by default, run with: cargo test -- --ignored

use crm_scrape::browser::{BrowserLocator, BrowserSession, LaunchOptions};
use crm_scrape::{Coordinator, Extractor, MemoryStore, MergeStore, SelectorTable, TargetLocator, View};
use std::sync::Arc;

fn data_url(html: &str) -> String {
    format!("data:text/html,{}", urlencoding::encode(html))
}

fn fixture_table() -> SelectorTable {
    // data: URLs carry no CRM path, so detect views by a marker in the URL instead
    let mut table = SelectorTable::default();
    table.contacts.url_patterns = vec!["crm-contacts".to_string()];
    table
}

#[tokio::test(flavor = "multi_thread")]
#[ignore]
async fn test_extract_contacts_from_live_tab() {
    let url = format!("{}#crm-contacts", data_url(include_str!("fixtures/contacts.html")));

    let session = Arc::new(
        tokio::task::spawn_blocking(move || {
            let session = BrowserSession::launch(LaunchOptions::new().headless(true))?;
            session.navigate(&url)?;
            Ok::<_, crm_scrape::ScrapeError>(session)
        })
        .await
        .unwrap()
        .expect("Failed to launch browser"),
    );

    let extractor = Arc::new(Extractor::new(fixture_table()).unwrap());
    let locator = Arc::new(BrowserLocator::new(session, extractor));
    assert!(locator.active_target().await.is_some());

    let coordinator = Coordinator::new(locator, Arc::new(MergeStore::new(Arc::new(MemoryStore::new()))));
    let response = coordinator.extract().await;

    assert!(response.success, "{:?}", response);
    assert_eq!(response.view, Some(View::Contacts));
    assert_eq!(response.count, Some(2));
}

#[tokio::test(flavor = "multi_thread")]
#[ignore]
async fn test_unsupported_live_page() {
    let url = data_url("<html><body><p>Nothing to see</p></body></html>");

    let session = Arc::new(
        tokio::task::spawn_blocking(move || {
            let session = BrowserSession::launch(LaunchOptions::new().headless(true))?;
            session.navigate(&url)?;
            Ok::<_, crm_scrape::ScrapeError>(session)
        })
        .await
        .unwrap()
        .expect("Failed to launch browser"),
    );

    let extractor = Arc::new(Extractor::new(SelectorTable::default()).unwrap());
    let coordinator = Coordinator::new(
        Arc::new(BrowserLocator::new(session, extractor)),
        Arc::new(MergeStore::new(Arc::new(MemoryStore::new()))),
    );

    let response = coordinator.extract().await;
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("No supported view detected"));
}
