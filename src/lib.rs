//! # GLEIF → BODS Pipeline Library
//!
//! This library transforms the Global Legal Entity Identifier Foundation (GLEIF)
//! golden-copy datasets — LEI records, relationship records and reporting exceptions —
//! into Beneficial Ownership Data Standard (BODS) statements, and keeps previously
//! published statements reconciled as the source data moves: revisions supersede,
//! retirements and deletions void, and reporting exceptions hand over to real
//! relationships.
//!
//! ## Architecture
//!
//! Two stages compose a run:
//!
//! - **Ingest**: raw records are content-addressed by seed, stored once in the
//!   raw-record indexes, and first-sightings forwarded to the inter-stage bus.
//! - **Transform**: records come off the bus and through the reconciliation engine,
//!   which emits zero or more statements per record (including synthesized voiding
//!   statements) and maintains the auxiliary indexes (`latest`, `references`,
//!   `updates`, `exceptions`) that make replay deterministic.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use gleif_bods::cache::IndexCache;
//! use gleif_bods::model::SourceRecord;
//! use gleif_bods::reconcile::Reconciler;
//! use gleif_bods::store::MemoryStore;
//!
//! # async fn run() -> Result<(), gleif_bods::error::PipelineError> {
//! let store = Arc::new(MemoryStore::new());
//! let mut cache = IndexCache::new();
//! cache.load(store.as_ref()).await?;
//! let mut engine = Reconciler::new(cache, true);
//!
//! let record: SourceRecord = serde_json::from_str(r#"{
//!     "recordType": "repex",
//!     "LEI": "213800WAVVOPS85N2205",
//!     "ExceptionCategory": "DIRECT_ACCOUNTING_CONSOLIDATION_PARENT",
//!     "ExceptionReason": "NATURAL_PERSONS",
//!     "ContentDate": "2023-05-01T00:00:00Z"
//! }"#)?;
//! let statements = engine.process_record(store.as_ref(), &record).await?;
//! assert_eq!(statements.len(), 2);
//! let rewrites = engine.finish(store.as_ref()).await?;
//! assert!(rewrites.is_empty());
//! # Ok(()) }
//! ```
//!
//! ## Modules
//!
//! - [`crate::annotations`]: Canned commentary annotations.
//! - [`crate::bus`]: Inter-stage record bus.
//! - [`crate::cache`]: Write-through cache over the auxiliary indexes.
//! - [`crate::config`]: Environment-driven settings.
//! - [`crate::elastic`]: Document store client.
//! - [`crate::error`]: Error types and handling.
//! - [`crate::identifier`]: Deterministic statement IDs and date conventions.
//! - [`crate::ingest`]: First-time-seen filter for raw records.
//! - [`crate::jurisdiction`]: ISO 3166 jurisdiction name resolution.
//! - [`crate::links`]: Golden-copy published-file URL resolution.
//! - [`crate::model`]: Source records, statements and index documents.
//! - [`crate::pipeline`]: Stage drivers, sources and the batched statement sink.
//! - [`crate::reconcile`]: The update-reconciliation engine.
//! - [`crate::store`]: The document store seam.
//! - [`crate::transform`]: Pure source-record-to-statements transformation.
//! - [`crate::value`]: Canonical string conversions for the value enums.
//! - [`crate::voiding`]: Synthesized replacement ("void") statements.

pub mod annotations;
pub mod bus;
pub mod cache;
pub mod config;
pub mod elastic;
pub mod error;
pub mod identifier;
pub mod ingest;
pub mod jurisdiction;
pub mod links;
pub mod model;
pub mod pipeline;
pub mod reconcile;
pub mod store;
pub mod transform;
#[cfg(test)]
pub mod test_utils;
pub mod value;
pub mod voiding;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
