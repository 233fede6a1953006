//! # Document Store ([`DocumentStore`]) - The pipeline's index backend.
//!
//! The pipeline keeps three families of indexes in one document store:
//!
//! - **raw-record indexes** (`lei`, `rr`, `repex`) — canonical copies of every source
//!   record the ingest stage has seen, keyed by the record seed;
//! - **statement indexes** (`entity`, `person`, `ownership`) — every published BODS
//!   statement, keyed by statement ID;
//! - **auxiliary indexes** (`latest`, `references`, `updates`, `exceptions`, `runs`) —
//!   the reconciliation state that makes replay deterministic.
//!
//! [`DocumentStore`] is the narrow seam the engine and stage drivers depend on:
//! per-document get/put/delete, bulk writes with per-action outcomes, and a full-index
//! scan. Document IDs are deterministic, so writes are idempotent with respect to IDs.
//! The production implementation is [`crate::elastic::ElasticStore`]; tests use
//! [`MemoryStore`].

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Names of the indexes the pipeline reads and writes.
pub mod index_names {
    /// Raw LEI records.
    pub const LEI: &str = "lei";
    /// Raw relationship records.
    pub const RR: &str = "rr";
    /// Raw reporting exceptions.
    pub const REPEX: &str = "repex";
    /// Published entity statements.
    pub const ENTITY: &str = "entity";
    /// Published person statements.
    pub const PERSON: &str = "person";
    /// Published ownership-or-control statements.
    pub const OWNERSHIP: &str = "ownership";
    /// Newest statement per domain key.
    pub const LATEST: &str = "latest";
    /// Ownership statements referencing each entity statement.
    pub const REFERENCES: &str = "references";
    /// Pending cross-statement fix-ups.
    pub const UPDATES: &str = "updates";
    /// Active reporting exceptions.
    pub const EXCEPTIONS: &str = "exceptions";
    /// Completed stage runs.
    pub const RUNS: &str = "runs";
}

/// A single action in a bulk write.
#[derive(Clone, Debug, PartialEq)]
pub enum BulkAction {
    /// Create the document, failing (not overwriting) if the ID exists.
    Create {
        /// The document ID.
        id: String,
        /// The document body.
        doc: Value,
    },
    /// Create or overwrite the document.
    Index {
        /// The document ID.
        id: String,
        /// The document body.
        doc: Value,
    },
    /// Delete the document; deleting an absent ID is not an error.
    Delete {
        /// The document ID.
        id: String,
    },
}

impl BulkAction {
    /// The document ID this action applies to.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            BulkAction::Create { id, .. }
            | BulkAction::Index { id, .. }
            | BulkAction::Delete { id } => id,
        }
    }
}

/// The per-action outcome of a bulk write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkOutcome {
    /// The document ID the action applied to.
    pub id: String,
    /// Whether the action took effect. A `Create` against an existing ID reports
    /// `false`; that is how the batched sink recognizes already-seen documents.
    pub applied: bool,
}

/// The narrow interface to the document store backing all pipeline indexes.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetches a document by ID, `None` when absent.
    async fn get(&self, index: &str, id: &str) -> Result<Option<Value>>;

    /// Creates a document, returning `false` without modifying anything when the ID
    /// already exists.
    async fn create(&self, index: &str, id: &str, doc: &Value) -> Result<bool>;

    /// Creates or overwrites a document.
    async fn put(&self, index: &str, id: &str, doc: &Value) -> Result<()>;

    /// Deletes a document; absent IDs are ignored.
    async fn delete(&self, index: &str, id: &str) -> Result<()>;

    /// Applies a batch of actions, returning one outcome per action in order.
    async fn bulk(&self, index: &str, actions: Vec<BulkAction>) -> Result<Vec<BulkOutcome>>;

    /// Streams every document in an index.
    async fn scan(&self, index: &str) -> Result<Vec<Value>>;
}

/// An in-memory [`DocumentStore`] for tests and local runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    indexes: Mutex<HashMap<String, HashMap<String, Value>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of documents currently held in an index.
    #[must_use]
    pub fn len(&self, index: &str) -> usize {
        self.indexes
            .lock()
            .expect("store mutex poisoned")
            .get(index)
            .map_or(0, HashMap::len)
    }

    /// Whether an index holds no documents.
    #[must_use]
    pub fn is_empty(&self, index: &str) -> bool {
        self.len(index) == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, index: &str, id: &str) -> Result<Option<Value>> {
        let indexes = self.indexes.lock().expect("store mutex poisoned");
        Ok(indexes.get(index).and_then(|docs| docs.get(id)).cloned())
    }

    async fn create(&self, index: &str, id: &str, doc: &Value) -> Result<bool> {
        let mut indexes = self.indexes.lock().expect("store mutex poisoned");
        let docs = indexes.entry(index.to_owned()).or_default();
        if docs.contains_key(id) {
            return Ok(false);
        }
        docs.insert(id.to_owned(), doc.clone());
        Ok(true)
    }

    async fn put(&self, index: &str, id: &str, doc: &Value) -> Result<()> {
        let mut indexes = self.indexes.lock().expect("store mutex poisoned");
        indexes
            .entry(index.to_owned())
            .or_default()
            .insert(id.to_owned(), doc.clone());
        Ok(())
    }

    async fn delete(&self, index: &str, id: &str) -> Result<()> {
        let mut indexes = self.indexes.lock().expect("store mutex poisoned");
        if let Some(docs) = indexes.get_mut(index) {
            docs.remove(id);
        }
        Ok(())
    }

    async fn bulk(&self, index: &str, actions: Vec<BulkAction>) -> Result<Vec<BulkOutcome>> {
        let mut indexes = self.indexes.lock().expect("store mutex poisoned");
        let docs = indexes.entry(index.to_owned()).or_default();
        let mut outcomes = Vec::with_capacity(actions.len());
        for action in actions {
            let applied = match &action {
                BulkAction::Create { id, doc } => {
                    if docs.contains_key(id) {
                        false
                    } else {
                        docs.insert(id.clone(), doc.clone());
                        true
                    }
                }
                BulkAction::Index { id, doc } => {
                    docs.insert(id.clone(), doc.clone());
                    true
                }
                BulkAction::Delete { id } => docs.remove(id).is_some(),
            };
            outcomes.push(BulkOutcome {
                id: action.id().to_owned(),
                applied,
            });
        }
        Ok(outcomes)
    }

    async fn scan(&self, index: &str) -> Result<Vec<Value>> {
        let indexes = self.indexes.lock().expect("store mutex poisoned");
        Ok(indexes
            .get(index)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }
}
