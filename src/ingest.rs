//! # Ingest Deduplicator ([`Deduplicator`]) - First-time-seen filter for raw records.
//!
//! The golden-copy files are full snapshots: most records in any download have been
//! seen before. The ingest stage therefore content-addresses every record by its seed
//! (identifier + revision date) and stores a canonical copy in the raw-record index on
//! first sight. Only records whose create actually lands are forwarded to the bus, so
//! re-ingesting a byte-identical file produces zero downstream work.

use std::sync::Arc;

use crate::error::Result;
use crate::model::SourceRecord;
use crate::store::DocumentStore;

/// Filters raw records down to the never-before-seen ones.
pub struct Deduplicator {
    store: Arc<dyn DocumentStore>,
}

impl Deduplicator {
    /// Creates a deduplicator over the raw-record indexes in `store`.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Stores the record if its seed is new and reports whether it was. The record
    /// kind names the raw index (`lei`, `rr`, `repex`).
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::PipelineError`] when the store is unreachable or the
    /// record cannot be serialized.
    pub async fn first_seen(&self, record: &SourceRecord) -> Result<bool> {
        let doc = serde_json::to_value(record)?;
        self.store
            .create(record.kind(), &record.record_id(), &doc)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn lei_record() -> SourceRecord {
        serde_json::from_str(include_str!("../tests/data/records/lei_new.json"))
            .expect("fixture should deserialize")
    }

    #[tokio::test]
    async fn test_first_sight_stores_and_reports_new() {
        let store = Arc::new(MemoryStore::new());
        let dedup = Deduplicator::new(store.clone());
        let record = lei_record();
        assert!(dedup.first_seen(&record).await.unwrap());
        assert_eq!(store.len("lei"), 1);
    }

    #[tokio::test]
    async fn test_reingest_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let dedup = Deduplicator::new(store.clone());
        let record = lei_record();
        assert!(dedup.first_seen(&record).await.unwrap());
        assert!(!dedup.first_seen(&record).await.unwrap());
        assert!(!dedup.first_seen(&record).await.unwrap());
        assert_eq!(store.len("lei"), 1);
    }

    #[tokio::test]
    async fn test_revision_is_a_new_record() {
        let store = Arc::new(MemoryStore::new());
        let dedup = Deduplicator::new(store.clone());
        assert!(dedup.first_seen(&lei_record()).await.unwrap());
        let revision: SourceRecord =
            serde_json::from_str(include_str!("../tests/data/records/lei_revision.json"))
                .expect("fixture should deserialize");
        // Same LEI, later LastUpdateDate: a different seed, so a new document.
        assert!(dedup.first_seen(&revision).await.unwrap());
        assert_eq!(store.len("lei"), 2);
    }
}
