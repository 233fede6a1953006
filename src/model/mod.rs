//! Model definitions for the pipeline's data.
//!
//! This module contains submodules that define the data structures flowing through the
//! two pipeline stages, enabling strongly-typed serialization on the inter-stage bus and
//! in the document store.
//!
//! The submodules include:
//! - `enums`: Enumerations for the closed value sets of the golden-copy files.
//! - `source`: GLEIF golden-copy source records (LEI, relationship, reporting exception).
//! - `statement`: The emitted BODS statements and their building blocks.
//! - `index`: Auxiliary index documents (`latest`, `references`, `updates`,
//!   `exceptions`) and run records.
//!
//! These modules collectively describe everything the pipeline reads, writes or emits.

pub mod enums;
pub mod index;
pub mod source;
pub mod statement;

// Types re-exported for convenience

pub use index::{ExceptionEntry, IndexedDoc, LatestEntry, ReferencesEntry, RunRecord, UpdatesEntry};
pub use source::{LeiRecord, RelationshipRecord, ReportingException, SourceRecord};
pub use statement::{EntityStatement, OwnershipStatement, PersonStatement, Statement};
