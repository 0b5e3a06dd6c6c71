use crate::{
    error::{Result, ScrapeError},
    record::{Record, View},
    store::{
        dedupe::{dedupe, identity_key},
        kv::KvStore,
    },
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Document name the ActiveCampaign dataset is stored under
pub const DEFAULT_STORAGE_KEY: &str = "activecampaign_data";

/// Everything that is persisted: one record list per view plus the last sync time
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default)]
    pub contacts: Vec<Record>,

    #[serde(default)]
    pub deals: Vec<Record>,

    #[serde(default)]
    pub tasks: Vec<Record>,

    /// Milliseconds since the epoch of the last merge or delete, 0 if never
    #[serde(default)]
    pub last_sync: i64,
}

impl Dataset {
    pub fn records(&self, view: View) -> &[Record] {
        match view {
            View::Contacts => &self.contacts,
            View::Deals => &self.deals,
            View::Tasks => &self.tasks,
        }
    }

    /// Replace a view's list wholesale
    pub fn replace(&mut self, view: View, records: Vec<Record>) {
        match view {
            View::Contacts => self.contacts = records,
            View::Deals => self.deals = records,
            View::Tasks => self.tasks = records,
        }
    }

    pub fn count(&self, view: View) -> usize {
        self.records(view).len()
    }
}

/// Result of a merge or delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub count: usize,
    pub last_sync: i64,
}

fn system_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// The single writer of the persisted [`Dataset`].
///
/// Every mutation is read, modify, write of the whole document. Mutations are
/// serialized by an internal lock so two operations on different views cannot
/// drop each other's update. A mutation only counts as committed once the
/// underlying `set` succeeded.
pub struct MergeStore {
    kv: Arc<dyn KvStore>,
    key: String,
    write_lock: Mutex<()>,
    clock: fn() -> i64,
}

impl MergeStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            kv,
            key: DEFAULT_STORAGE_KEY.to_string(),
            write_lock: Mutex::new(()),
            clock: system_millis,
        }
    }

    /// Builder method: store under another key
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Builder method: replace the wall clock
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current dataset; an absent document reads as empty
    pub async fn read(&self) -> Result<Dataset> {
        match self.kv.get(&self.key).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| ScrapeError::storage("failed to decode stored dataset", e)),
            None => Ok(Dataset::default()),
        }
    }

    /// Replace `view` with the deduplicated `items`
    pub async fn merge_data(&self, view: View, items: Vec<Record>) -> Result<SyncSummary> {
        let _guard = self.write_lock.lock().await;

        let mut dataset = self.read().await?;
        let deduped = dedupe(items);
        let count = deduped.len();

        dataset.replace(view, deduped);
        dataset.last_sync = self.next_sync(dataset.last_sync);
        self.write(&dataset).await?;

        log::info!("Merged {} {} record(s)", count, view);
        Ok(SyncSummary {
            count,
            last_sync: dataset.last_sync,
        })
    }

    /// Remove every record of `view` whose identity key equals `id`.
    ///
    /// An unmatched id, or no id at all, leaves the list as it is and still
    /// succeeds and refreshes `lastSync`.
    pub async fn delete_item(&self, view: View, id: Option<&str>) -> Result<SyncSummary> {
        let _guard = self.write_lock.lock().await;

        let mut dataset = self.read().await?;
        let before = dataset.count(view);

        if let Some(id) = id {
            let kept: Vec<Record> = dataset
                .records(view)
                .iter()
                .filter(|record| identity_key(record).as_deref() != Some(id))
                .cloned()
                .collect();
            dataset.replace(view, kept);
        }

        let count = dataset.count(view);
        if count == before {
            log::info!("Delete in {} matched no record (id: {:?})", view, id);
        }

        dataset.last_sync = self.next_sync(dataset.last_sync);
        self.write(&dataset).await?;

        Ok(SyncSummary {
            count,
            last_sync: dataset.last_sync,
        })
    }

    async fn write(&self, dataset: &Dataset) -> Result<()> {
        let payload =
            serde_json::to_vec(dataset).map_err(|e| ScrapeError::storage("failed to encode dataset", e))?;
        self.kv.set(&self.key, payload).await
    }

    /// Never moves backwards, even if the clock does
    fn next_sync(&self, previous: i64) -> i64 {
        (self.clock)().max(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::kv::MemoryStore;
    use async_trait::async_trait;

    fn store() -> MergeStore {
        MergeStore::new(Arc::new(MemoryStore::new()))
    }

    fn contact(id: &str, name: &str) -> Record {
        Record::new(Some(id.to_string())).with_field("name", name)
    }

    struct FailingWrites(MemoryStore);

    #[async_trait]
    impl KvStore for FailingWrites {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            self.0.get(key).await
        }

        async fn set(&self, _key: &str, _value: Vec<u8>) -> Result<()> {
            Err(ScrapeError::Storage("quota exceeded".to_string()))
        }
    }

    #[tokio::test]
    async fn test_read_empty() {
        let dataset = store().read().await.unwrap();
        assert_eq!(dataset, Dataset::default());
        assert_eq!(dataset.last_sync, 0);
    }

    #[tokio::test]
    async fn test_merge_replaces_only_target_view() {
        let store = store();
        store
            .merge_data(View::Deals, vec![Record::new(Some("9".into())).with_field("title", "Deal")])
            .await
            .unwrap();
        let deals_before = store.read().await.unwrap().deals;

        let summary = store
            .merge_data(
                View::Contacts,
                vec![contact("1", "Ada"), contact("1", "Ada (stale)"), contact("2", "Grace")],
            )
            .await
            .unwrap();

        assert_eq!(summary.count, 2);
        let dataset = store.read().await.unwrap();
        assert_eq!(dataset.contacts, vec![contact("1", "Ada"), contact("2", "Grace")]);
        assert_eq!(dataset.deals, deals_before);
        assert!(dataset.tasks.is_empty());
        assert_eq!(dataset.last_sync, summary.last_sync);
    }

    #[tokio::test]
    async fn test_merge_replaces_previous_list() {
        let store = store();
        store.merge_data(View::Contacts, vec![contact("1", "Ada")]).await.unwrap();
        store.merge_data(View::Contacts, vec![contact("2", "Grace")]).await.unwrap();

        let dataset = store.read().await.unwrap();
        assert_eq!(dataset.contacts, vec![contact("2", "Grace")]);
    }

    #[tokio::test]
    async fn test_failed_write_is_not_committed() {
        let store = MergeStore::new(Arc::new(FailingWrites(MemoryStore::new())));
        let err = store.merge_data(View::Contacts, vec![contact("1", "Ada")]).await.unwrap_err();

        assert!(matches!(err, ScrapeError::Storage(_)));
        assert!(store.read().await.unwrap().contacts.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_document_is_storage_failure() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(DEFAULT_STORAGE_KEY, b"{not json".to_vec()).await.unwrap();

        let err = MergeStore::new(kv).read().await.unwrap_err();
        assert!(matches!(err, ScrapeError::Storage(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_only_matching() {
        let store = store();
        store
            .merge_data(View::Contacts, vec![contact("1", "Ada"), contact("2", "Grace")])
            .await
            .unwrap();

        let summary = store.delete_item(View::Contacts, Some("1")).await.unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(store.read().await.unwrap().contacts, vec![contact("2", "Grace")]);
    }

    #[tokio::test]
    async fn test_delete_unmatched_id_succeeds_unchanged() {
        let store = store();
        store.merge_data(View::Contacts, vec![contact("1", "Ada")]).await.unwrap();
        let before = store.read().await.unwrap();

        let summary = store.delete_item(View::Contacts, Some("404")).await.unwrap();
        let after = store.read().await.unwrap();

        assert_eq!(summary.count, 1);
        assert_eq!(after.contacts, before.contacts);
        assert!(after.last_sync >= before.last_sync);
    }

    #[tokio::test]
    async fn test_delete_without_id_is_noop_removal() {
        let store = store();
        store.merge_data(View::Tasks, vec![contact("t1", "x")]).await.unwrap();

        let summary = store.delete_item(View::Tasks, None).await.unwrap();
        assert_eq!(summary.count, 1);
    }

    #[tokio::test]
    async fn test_last_sync_never_decreases() {
        fn frozen_clock() -> i64 {
            1_000
        }
        fn earlier_clock() -> i64 {
            500
        }

        let kv: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let first = MergeStore::new(kv.clone()).with_clock(frozen_clock);
        let a = first.merge_data(View::Contacts, vec![contact("1", "Ada")]).await.unwrap();
        assert_eq!(a.last_sync, 1_000);

        let skewed = MergeStore::new(kv).with_clock(earlier_clock);
        let b = skewed.delete_item(View::Contacts, Some("1")).await.unwrap();
        assert_eq!(b.last_sync, 1_000);
    }

    /// Yields inside every read so concurrent read-modify-write cycles interleave
    struct YieldingReads(MemoryStore);

    #[async_trait]
    impl KvStore for YieldingReads {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            tokio::task::yield_now().await;
            self.0.get(key).await
        }

        async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
            self.0.set(key, value).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_merges_keep_both_views() {
        let store = Arc::new(MergeStore::new(Arc::new(YieldingReads(MemoryStore::new()))));
        let contacts = {
            let store = store.clone();
            tokio::spawn(async move { store.merge_data(View::Contacts, vec![contact("1", "Ada")]).await })
        };
        let deals = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .merge_data(View::Deals, vec![Record::new(Some("9".into())).with_field("title", "Deal")])
                    .await
            })
        };
        contacts.await.unwrap().unwrap();
        deals.await.unwrap().unwrap();

        let dataset = store.read().await.unwrap();
        assert_eq!(dataset.contacts.len(), 1);
        assert_eq!(dataset.deals.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_delete_and_merge_keep_both_changes() {
        let store = Arc::new(MergeStore::new(Arc::new(YieldingReads(MemoryStore::new()))));
        store
            .merge_data(View::Contacts, vec![contact("1", "Ada"), contact("2", "Grace")])
            .await
            .unwrap();

        let delete = {
            let store = store.clone();
            tokio::spawn(async move { store.delete_item(View::Contacts, Some("1")).await })
        };
        let merge = {
            let store = store.clone();
            tokio::spawn(async move { store.merge_data(View::Tasks, vec![contact("t1", "Call")]).await })
        };
        delete.await.unwrap().unwrap();
        merge.await.unwrap().unwrap();

        let dataset = store.read().await.unwrap();
        assert_eq!(dataset.contacts, vec![contact("2", "Grace")]);
        assert_eq!(dataset.tasks.len(), 1);
    }

    #[tokio::test]
    async fn test_custom_key() {
        let kv = Arc::new(MemoryStore::new());
        let store = MergeStore::new(kv.clone()).with_key("other");
        store.merge_data(View::Contacts, vec![contact("1", "Ada")]).await.unwrap();

        assert!(kv.get("other").await.unwrap().is_some());
        assert!(kv.get(DEFAULT_STORAGE_KEY).await.unwrap().is_none());
    }

    #[test]
    fn test_dataset_layout() {
        let json = serde_json::to_value(Dataset::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"contacts": [], "deals": [], "tasks": [], "lastSync": 0})
        );

        let partial: Dataset = serde_json::from_str(r#"{"deals": [{"id": "1", "title": "A"}]}"#).unwrap();
        assert_eq!(partial.deals.len(), 1);
        assert!(partial.contacts.is_empty());
        assert_eq!(partial.last_sync, 0);
    }
}
