use crm_scrape::export;
use crm_scrape::{FileStore, KvStore, MergeStore, Record, SyncConfig, View};
use std::sync::Arc;
use tempfile::tempdir;

fn deal(id: &str, title: &str) -> Record {
    Record::new(Some(id.to_string())).with_field("title", title)
}

#[tokio::test]
async fn test_missing_document_reads_empty() {
    let dir = tempdir().unwrap();
    let store = MergeStore::new(Arc::new(FileStore::new(dir.path())));

    let dataset = store.read().await.unwrap();
    assert!(dataset.contacts.is_empty());
    assert_eq!(dataset.last_sync, 0);
}

#[tokio::test]
async fn test_dataset_survives_reopen() {
    let dir = tempdir().unwrap();
    let config = SyncConfig::new().data_dir(dir.path().join("nested"));

    let summary = config
        .open_store()
        .merge_data(View::Deals, vec![deal("1", "Deal A"), deal("1", "Deal A (stale)")])
        .await
        .unwrap();
    assert_eq!(summary.count, 1);

    let reopened = config.open_store().read().await.unwrap();
    assert_eq!(reopened.deals, vec![deal("1", "Deal A")]);
    assert_eq!(reopened.last_sync, summary.last_sync);
}

#[tokio::test]
async fn test_persisted_layout_and_no_leftover_temp_files() {
    let dir = tempdir().unwrap();
    let kv = FileStore::new(dir.path());
    let store = MergeStore::new(Arc::new(kv.clone()));
    store.merge_data(View::Contacts, vec![Record::new(Some("7".into())).with_field("name", "Ada")]).await.unwrap();
    store.delete_item(View::Contacts, Some("7")).await.unwrap();

    let raw = std::fs::read_to_string(kv.path_for("activecampaign_data")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["contacts"], serde_json::json!([]));
    assert!(value["lastSync"].as_i64().unwrap() > 0);

    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(entries, vec!["activecampaign_data.json".to_string()]);
}

#[tokio::test]
async fn test_overwrite_replaces_whole_document() {
    let dir = tempdir().unwrap();
    let kv = FileStore::new(dir.path());

    kv.set("doc", b"{\"a\": 1, \"padding\": \"long long long\"}".to_vec()).await.unwrap();
    kv.set("doc", b"{}".to_vec()).await.unwrap();
    assert_eq!(kv.get("doc").await.unwrap(), Some(b"{}".to_vec()));
}

#[tokio::test]
async fn test_csv_bundle_written_per_view() {
    let dir = tempdir().unwrap();
    let store = MergeStore::new(Arc::new(FileStore::new(dir.path().join("data"))));
    store.merge_data(View::Deals, vec![deal("1", "Acme, Inc.")]).await.unwrap();

    let out = dir.path().join("export");
    let written = export::write_csv_bundle(&store.read().await.unwrap(), &out).await.unwrap();

    assert_eq!(written, vec![out.join("deals.csv")]);
    let csv = std::fs::read_to_string(out.join("deals.csv")).unwrap();
    assert_eq!(csv, "id,title\n1,\"Acme, Inc.\"");
}
