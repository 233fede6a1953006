//! # Index Cache ([`IndexCache`]) - Write-through cache over the auxiliary indexes.
//!
//! The reconciliation engine touches the `latest`, `references`, `updates` and
//! `exceptions` indexes for every record it processes. Going to the document store for
//! each touch would dominate the run, so the engine works against this in-memory
//! write-through façade instead:
//!
//! - [`IndexCache::load`] hydrates all four indexes at stage start (`updates` must be
//!   fully resident — the finish drain walks it — and the others are hydrated the same
//!   way for read-your-writes lookups without await points);
//! - mutations update the in-memory maps immediately and queue a pending write;
//! - pending writes drain through the store's bulk API, automatically once a per-index
//!   buffer passes the watermark, and unconditionally in the final
//!   [`IndexCache::flush`].
//!
//! The cache guarantees read-your-writes within a run and at-least-once write-back at
//! the end of it. It is a plain value owned by the stage's single consumer task and is
//! not concurrency-safe.

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::Result;
use crate::model::index::{
    ExceptionEntry, IndexedDoc, LatestEntry, ReferencesEntry, UpdatesEntry,
};
use crate::store::{BulkAction, DocumentStore, index_names};

/// Batch buffers auto-flush once they hold more than this many pending writes.
pub const BATCH_WATERMARK: usize = 485;

#[derive(Clone, Debug, PartialEq)]
enum PendingWrite<T> {
    Create(T),
    Index(T),
    Delete,
}

#[derive(Debug)]
struct CachedIndex<T> {
    name: &'static str,
    entries: HashMap<String, T>,
    batch: HashMap<String, PendingWrite<T>>,
}

impl<T> CachedIndex<T>
where
    T: Clone + Serialize + DeserializeOwned + IndexedDoc,
{
    fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: HashMap::new(),
            batch: HashMap::new(),
        }
    }

    async fn load(&mut self, store: &dyn DocumentStore) -> Result<()> {
        for doc in store.scan(self.name).await? {
            match serde_json::from_value::<T>(doc) {
                Ok(entry) => {
                    self.entries.insert(entry.doc_id(), entry);
                }
                Err(err) => {
                    warn!(index = self.name, error = %err, "skipping undecodable index document");
                }
            }
        }
        debug!(index = self.name, entries = self.entries.len(), "cache hydrated");
        Ok(())
    }

    fn get(&self, id: &str) -> Option<&T> {
        self.entries.get(id)
    }

    fn save(&mut self, entry: T, overwrite: bool) {
        let id = entry.doc_id();
        let write = if overwrite {
            PendingWrite::Index(entry.clone())
        } else {
            PendingWrite::Create(entry.clone())
        };
        self.entries.insert(id.clone(), entry);
        self.batch.insert(id, write);
    }

    fn delete(&mut self, id: &str) {
        self.entries.remove(id);
        // A delete supersedes any write queued for the same id; the store-side delete
        // still goes out because the document may predate this run.
        self.batch.insert(id.to_owned(), PendingWrite::Delete);
    }

    fn over_watermark(&self, watermark: usize) -> bool {
        self.batch.len() > watermark
    }

    async fn flush(&mut self, store: &dyn DocumentStore) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }
        let actions: Vec<BulkAction> = self
            .batch
            .drain()
            .map(|(id, write)| match write {
                PendingWrite::Create(entry) => BulkAction::Create {
                    id,
                    doc: serde_json::to_value(entry).expect("index entries serialize"),
                },
                PendingWrite::Index(entry) => BulkAction::Index {
                    id,
                    doc: serde_json::to_value(entry).expect("index entries serialize"),
                },
                PendingWrite::Delete => BulkAction::Delete { id },
            })
            .collect();
        let outcomes = store.bulk(self.name, actions).await?;
        debug!(index = self.name, written = outcomes.len(), "cache batch flushed");
        Ok(())
    }
}

/// The write-through cache over the four auxiliary indexes.
#[derive(Debug)]
pub struct IndexCache {
    latest: CachedIndex<LatestEntry>,
    references: CachedIndex<ReferencesEntry>,
    exceptions: CachedIndex<ExceptionEntry>,
    updates: CachedIndex<UpdatesEntry>,
    watermark: usize,
}

impl IndexCache {
    /// Creates an empty cache with the default batch watermark.
    #[must_use]
    pub fn new() -> Self {
        Self::with_watermark(BATCH_WATERMARK)
    }

    /// Creates an empty cache with an explicit batch watermark.
    #[must_use]
    pub fn with_watermark(watermark: usize) -> Self {
        Self {
            latest: CachedIndex::new(index_names::LATEST),
            references: CachedIndex::new(index_names::REFERENCES),
            exceptions: CachedIndex::new(index_names::EXCEPTIONS),
            updates: CachedIndex::new(index_names::UPDATES),
            watermark,
        }
    }

    /// Hydrates all four indexes from the store.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::PipelineError`] when a scan fails; individual
    /// undecodable documents are logged and skipped instead.
    pub async fn load(&mut self, store: &dyn DocumentStore) -> Result<()> {
        self.latest.load(store).await?;
        self.references.load(store).await?;
        self.exceptions.load(store).await?;
        self.updates.load(store).await?;
        Ok(())
    }

    /// The newest statement entry for a domain key.
    #[must_use]
    pub fn latest_lookup(&self, key: &str) -> Option<&LatestEntry> {
        self.latest.get(key)
    }

    /// Records the newest statement for a domain key, overwriting any prior entry.
    pub fn latest_save(&mut self, key: &str, statement_id: &str, reason: Option<String>) {
        self.latest.save(
            LatestEntry {
                latest_id: key.to_owned(),
                statement_id: statement_id.to_owned(),
                reason,
            },
            true,
        );
    }

    /// The ownership statements known to reference an entity statement.
    #[must_use]
    pub fn references_lookup(&self, statement_id: &str) -> Option<&ReferencesEntry> {
        self.references.get(statement_id)
    }

    /// Records that ownership statement `referencing_id` (tracked under `domain_key`)
    /// references entity statement `referenced_id`.
    pub fn references_update(&mut self, referenced_id: &str, referencing_id: &str, domain_key: &str) {
        let mut entry = self
            .references
            .get(referenced_id)
            .cloned()
            .unwrap_or_else(|| ReferencesEntry {
                statement_id: referenced_id.to_owned(),
                references_id: HashMap::new(),
            });
        entry
            .references_id
            .insert(referencing_id.to_owned(), domain_key.to_owned());
        self.references.save(entry, true);
    }

    /// The pending fix-up queued for an ownership statement, if any.
    #[must_use]
    pub fn updates_lookup(&self, referencing_id: &str) -> Option<&UpdatesEntry> {
        self.updates.get(referencing_id)
    }

    /// Queues (or merges into an existing) fix-up for ownership statement
    /// `referencing_id`: its reference to `old_id` must be rewritten to `new_id`.
    pub fn updates_merge(&mut self, referencing_id: &str, domain_key: &str, old_id: &str, new_id: &str) {
        let mut entry = self
            .updates
            .get(referencing_id)
            .cloned()
            .unwrap_or_else(|| UpdatesEntry {
                referencing_id: referencing_id.to_owned(),
                latest_id: domain_key.to_owned(),
                updates: HashMap::new(),
            });
        entry.updates.insert(old_id.to_owned(), new_id.to_owned());
        self.updates.save(entry, true);
    }

    /// Drops the pending fix-up for an ownership statement.
    pub fn updates_delete(&mut self, referencing_id: &str) {
        self.updates.delete(referencing_id);
    }

    /// Snapshot of every pending fix-up, for the finish drain.
    #[must_use]
    pub fn updates_entries(&self) -> Vec<UpdatesEntry> {
        self.updates.entries.values().cloned().collect()
    }

    /// The active exception for an `"{LEI}_{ExceptionCategory}"` key.
    #[must_use]
    pub fn exception_lookup(&self, key: &str) -> Option<&ExceptionEntry> {
        self.exceptions.get(key)
    }

    /// Records the active exception for its key.
    pub fn exception_save(&mut self, entry: ExceptionEntry) {
        self.exceptions.save(entry, true);
    }

    /// Clears the active exception for a key.
    pub fn exception_delete(&mut self, key: &str) {
        self.exceptions.delete(key);
    }

    /// Flushes any index whose batch buffer has passed the watermark.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::PipelineError`] when a bulk write fails.
    pub async fn maybe_flush(&mut self, store: &dyn DocumentStore) -> Result<()> {
        if self.latest.over_watermark(self.watermark) {
            self.latest.flush(store).await?;
        }
        if self.references.over_watermark(self.watermark) {
            self.references.flush(store).await?;
        }
        if self.exceptions.over_watermark(self.watermark) {
            self.exceptions.flush(store).await?;
        }
        if self.updates.over_watermark(self.watermark) {
            self.updates.flush(store).await?;
        }
        Ok(())
    }

    /// Drains every batch buffer regardless of size. Runs strictly after the last
    /// source record of a run.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::PipelineError`] when a bulk write fails.
    pub async fn flush(&mut self, store: &dyn DocumentStore) -> Result<()> {
        self.latest.flush(store).await?;
        self.references.flush(store).await?;
        self.exceptions.flush(store).await?;
        self.updates.flush(store).await?;
        Ok(())
    }
}

impl Default for IndexCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_read_your_writes_before_flush() {
        let mut cache = IndexCache::new();
        cache.latest_save("LEI1", "stmt-1", None);
        let entry = cache.latest_lookup("LEI1").expect("entry should be readable");
        assert_eq!(entry.statement_id, "stmt-1");
    }

    #[tokio::test]
    async fn test_flush_writes_back_and_reload_round_trips() {
        let store = MemoryStore::new();
        let mut cache = IndexCache::new();
        cache.latest_save("LEI1", "stmt-1", None);
        cache.references_update("stmt-1", "ooc-1", "a_b_IS_DIRECTLY_CONSOLIDATED_BY");
        cache.updates_merge("ooc-1", "a_b_IS_DIRECTLY_CONSOLIDATED_BY", "stmt-0", "stmt-1");
        cache.flush(&store).await.unwrap();

        let mut reloaded = IndexCache::new();
        reloaded.load(&store).await.unwrap();
        assert_eq!(
            reloaded.latest_lookup("LEI1").map(|entry| entry.statement_id.as_str()),
            Some("stmt-1")
        );
        let refs = reloaded.references_lookup("stmt-1").expect("references entry");
        assert_eq!(
            refs.references_id.get("ooc-1").map(String::as_str),
            Some("a_b_IS_DIRECTLY_CONSOLIDATED_BY")
        );
        assert_eq!(reloaded.updates_entries().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_supersedes_pending_write() {
        let store = MemoryStore::new();
        let mut cache = IndexCache::new();
        cache.updates_merge("ooc-1", "key", "old", "new");
        cache.updates_delete("ooc-1");
        assert!(cache.updates_lookup("ooc-1").is_none());
        cache.flush(&store).await.unwrap();
        assert!(store.is_empty(index_names::UPDATES));
    }

    #[tokio::test]
    async fn test_updates_merge_accumulates_rewrites() {
        let mut cache = IndexCache::new();
        cache.updates_merge("ooc-1", "key", "old-a", "new-a");
        cache.updates_merge("ooc-1", "key", "old-b", "new-b");
        let entry = cache.updates_lookup("ooc-1").expect("entry");
        assert_eq!(entry.updates.len(), 2);
        assert_eq!(entry.latest_id, "key");
    }

    #[tokio::test]
    async fn test_watermark_triggers_partial_flush() {
        let store = MemoryStore::new();
        let mut cache = IndexCache::with_watermark(2);
        for i in 0..4 {
            cache.latest_save(&format!("LEI{i}"), "stmt", None);
        }
        cache.maybe_flush(&store).await.unwrap();
        assert_eq!(store.len(index_names::LATEST), 4);
        // Below the watermark nothing moves until the final flush.
        cache.latest_save("LEI-extra", "stmt", None);
        cache.maybe_flush(&store).await.unwrap();
        assert_eq!(store.len(index_names::LATEST), 4);
        cache.flush(&store).await.unwrap();
        assert_eq!(store.len(index_names::LATEST), 5);
    }
}
