//! Model definitions for the auxiliary index documents.
//!
//! Four durable indexes let the reconciliation engine replay deterministically across
//! runs: `latest` (domain key → newest statement ID), `references` (entity statement →
//! the ownership statements referencing it), `updates` (pending cross-statement
//! fix-ups) and `exceptions` (the most recently active reporting exception per LEI and
//! category). A fifth index, `runs`, records completed stage runs and bounds the
//! incremental window of the next one.
//!
//! Documents are stored under snake_case keys, one document per domain key; each type
//! knows its own document ID.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A document that knows the ID it is stored under.
pub trait IndexedDoc {
    /// The document ID in its index.
    fn doc_id(&self) -> String;
}

/// The newest statement published for a domain key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestEntry {
    /// The domain key (an LEI, a relationship key, or an exception series key).
    pub latest_id: String,
    /// The statement ID most recently emitted for the key.
    pub statement_id: String,
    /// Why the series ended, when the newest statement is a void (`RETIRED`,
    /// `DELETED`); `None` for live series.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl LatestEntry {
    /// A live entry with no termination reason.
    #[must_use]
    pub fn new(latest_id: impl Into<String>, statement_id: impl Into<String>) -> Self {
        Self {
            latest_id: latest_id.into(),
            statement_id: statement_id.into(),
            reason: None,
        }
    }
}

impl IndexedDoc for LatestEntry {
    fn doc_id(&self) -> String {
        self.latest_id.clone()
    }
}

/// The ownership statements referencing an entity statement.
///
/// `references_id` maps each referencing ownership statement's ID to that statement's
/// own domain key, so a superseded entity statement can queue fix-ups for every
/// ownership statement pointing at it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencesEntry {
    /// The referenced entity statement's ID.
    pub statement_id: String,
    /// Referencing ownership statement ID → that statement's domain key.
    pub references_id: HashMap<String, String>,
}

impl IndexedDoc for ReferencesEntry {
    fn doc_id(&self) -> String {
        self.statement_id.clone()
    }
}

/// A pending fix-up: an ownership statement whose referenced entity statements were
/// superseded after it was emitted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatesEntry {
    /// The current statement ID of the ownership statement to rewrite.
    pub referencing_id: String,
    /// The ownership statement's own domain key.
    pub latest_id: String,
    /// Old entity statement ID → the ID that superseded it.
    pub updates: HashMap<String, String>,
}

impl IndexedDoc for UpdatesEntry {
    fn doc_id(&self) -> String {
        self.referencing_id.clone()
    }
}

/// The most recently active reporting exception for an LEI and category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionEntry {
    /// The key `"{LEI}_{ExceptionCategory}"`.
    pub latest_id: String,
    /// The exception's ownership statement ID.
    pub statement_id: String,
    /// The exception's entity or person statement ID.
    pub other_id: String,
    /// The declared exception reason.
    pub reason: String,
    /// The free-text exception reference, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// `entityStatement` or `personStatement`, whichever the exception produced.
    pub entity_type: String,
}

impl IndexedDoc for ExceptionEntry {
    fn doc_id(&self) -> String {
        self.latest_id.clone()
    }
}

/// One completed stage run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    /// The stage that ran (`ingest` or `transform`).
    pub stage_name: String,
    /// When the run started, RFC 3339.
    pub start_timestamp: String,
    /// When the run finished, RFC 3339.
    pub end_timestamp: String,
}

impl IndexedDoc for RunRecord {
    fn doc_id(&self) -> String {
        format!("{}_{}", self.stage_name, self.start_timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_entry_skips_absent_reason() {
        let entry = LatestEntry::new("213800BJPX8V9HVY1Y11", "e2d096a9");
        let json = serde_json::to_value(&entry).expect("serialize");
        assert!(json.get("reason").is_none());
        assert_eq!(entry.doc_id(), "213800BJPX8V9HVY1Y11");
    }

    #[test]
    fn test_updates_entry_doc_id_is_referencing_id() {
        let entry = UpdatesEntry {
            referencing_id: String::from("ooc-1"),
            latest_id: String::from("a_b_IS_DIRECTLY_CONSOLIDATED_BY"),
            updates: HashMap::from([(String::from("old"), String::from("new"))]),
        };
        assert_eq!(entry.doc_id(), "ooc-1");
        let json = serde_json::to_string(&entry).expect("serialize");
        let back: UpdatesEntry = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, entry);
    }

    #[test]
    fn test_run_record_doc_id() {
        let run = RunRecord {
            stage_name: String::from("transform"),
            start_timestamp: String::from("2023-05-02T09:00:00+01:00"),
            end_timestamp: String::from("2023-05-02T09:05:00+01:00"),
        };
        assert_eq!(run.doc_id(), "transform_2023-05-02T09:00:00+01:00");
    }
}
