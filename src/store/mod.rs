//! Persistence module
//!
//! - kv: the opaque key-value byte store the dataset lives in
//! - dedupe: identity keys and first-occurrence-wins deduplication
//! - merge: the Merge Store, the only writer of the persisted dataset

pub mod dedupe;
pub mod kv;
pub mod merge;

pub use dedupe::{dedupe, fallback_key, identity_key};
pub use kv::{FileStore, KvStore, MemoryStore};
pub use merge::{Dataset, MergeStore, SyncSummary};
