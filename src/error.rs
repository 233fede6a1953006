//! # Error Handling ([`PipelineError`]) - Error types for pipeline operations.
//!
//! This module defines the error types used throughout the [`gleif-bods`](crate) pipeline,
//! ensuring a consistent error handling experience across the ingest and transform stages.
//!
//! ## The [`PipelineError`] Type
//!
//! The primary error type is [`PipelineError`]. It serves as a unified wrapper around the
//! issues a pipeline run can encounter:
//!
//! - **Backend Issues:** Problems reaching the statement store or the inter-stage bus —
//!   connection failures, timeouts, or other [`reqwest`] network errors, including retry
//!   policies being exhausted in the [`reqwest-middleware`](https://docs.rs/reqwest-middleware/) stack.
//! - **Store Errors:** Non-success HTTP status codes returned by the document store
//!   (e.g. 404 Not Found for an absent document, 409 Conflict on a duplicate create).
//! - **Malformed Records:** A source record that fails to decode or lacks the keys the
//!   transformer requires. These are logged and skipped; they never abort a run.
//! - **Index Inconsistencies:** Auxiliary index state that violates an engine invariant,
//!   for example a `references` entry pointing at an absent `latest` document. These are
//!   logged with the triggering key and skipped.
//!
//! [`PipelineError`] implements [`std::error::Error`] and [`std::fmt::Display`], allowing it
//! to be integrated into other error handling systems (e.g. `anyhow`, `eyre`).
//!
//! ## Inspecting and Handling Errors
//!
//! [`PipelineError`] provides helper methods like [`is_transient`](PipelineError::is_transient),
//! [`is_malformed`](PipelineError::is_malformed), [`is_inconsistency`](PipelineError::is_inconsistency)
//! and [`status`](PipelineError::status) to categorize errors without matching against the
//! internal variants directly. The stage driver uses these to decide between retrying,
//! skipping and aborting:
//!
//! ```rust
//! use gleif_bods::error::PipelineError;
//!
//! fn handle_error(err: &PipelineError) {
//!     if err.is_transient() {
//!         eprintln!("backend unavailable, will retry: {err}");
//!     } else if err.is_malformed() || err.is_inconsistency() {
//!         eprintln!("skipping record: {err}");
//!     } else {
//!         eprintln!("fatal: {err}");
//!     }
//! }
//! ```

use std::error;
use std::fmt;

/// Type alias for the result type used throughout the pipeline.
/// This is a convenience type alias for `std::result::Result<T, PipelineError>`.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur while running a pipeline stage.
#[derive(Debug)]
pub enum PipelineError {
    /// Error from reqwest directly
    ReqwestError(reqwest::Error),

    /// Error from `reqwest_middleware`
    ReqwestMiddlewareError(reqwest_middleware::Error),

    /// Error when a URL is invalid
    UrlParseError(url::ParseError),

    /// Error from `serde_json`
    SerdeError(serde_json::Error),

    /// Error from `std::io`
    IoError(std::io::Error),

    /// Non-success response from the document store
    StoreError(StoreResponse),

    /// A source record that cannot be processed
    MalformedRecord {
        /// The record kind (`lei`, `rr`, `repex`), if known.
        kind: Option<String>,
        /// What was missing or unparsable.
        detail: String,
    },

    /// Auxiliary index state violating an engine invariant
    IndexInconsistency {
        /// The index in which the inconsistency was observed.
        index: &'static str,
        /// The offending key.
        key: String,
        /// The violated expectation.
        detail: String,
    },
}

/// Status and body of a non-success document store response.
#[derive(Debug, Clone)]
pub struct StoreResponse {
    /// The HTTP status code of the response.
    pub status: reqwest::StatusCode,
    /// The content of the response as a string.
    pub content: String,
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (module, e) = match self {
            PipelineError::ReqwestError(e) => ("reqwest", e.to_string()),
            PipelineError::ReqwestMiddlewareError(e) => ("reqwest-middleware", e.to_string()),
            PipelineError::UrlParseError(e) => ("url", e.to_string()),
            PipelineError::SerdeError(e) => ("serde", e.to_string()),
            PipelineError::IoError(e) => ("IO", e.to_string()),
            PipelineError::StoreError(e) => ("store", format!("status code {}", e.status)),
            PipelineError::MalformedRecord { kind, detail } => (
                "record",
                match kind {
                    Some(kind) => format!("malformed {kind} record: {detail}"),
                    None => format!("malformed record: {detail}"),
                },
            ),
            PipelineError::IndexInconsistency { index, key, detail } => {
                ("index", format!("{index}[{key}]: {detail}"))
            }
        };
        write!(f, "error in {module}: {e}")
    }
}

impl error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            PipelineError::ReqwestError(e) => Some(e),
            PipelineError::ReqwestMiddlewareError(e) => Some(e),
            PipelineError::UrlParseError(e) => Some(e),
            PipelineError::SerdeError(e) => Some(e),
            PipelineError::IoError(e) => Some(e),
            PipelineError::StoreError(_)
            | PipelineError::MalformedRecord { .. }
            | PipelineError::IndexInconsistency { .. } => None,
        }
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(e: reqwest::Error) -> Self {
        PipelineError::ReqwestError(e)
    }
}

impl From<reqwest_middleware::Error> for PipelineError {
    fn from(e: reqwest_middleware::Error) -> Self {
        PipelineError::ReqwestMiddlewareError(e)
    }
}

impl From<url::ParseError> for PipelineError {
    fn from(e: url::ParseError) -> Self {
        PipelineError::UrlParseError(e)
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        PipelineError::SerdeError(e)
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(e: std::io::Error) -> Self {
        PipelineError::IoError(e)
    }
}

impl PipelineError {
    /// Builds a malformed-record error for a record of known kind.
    #[must_use]
    pub fn malformed(kind: &str, detail: impl Into<String>) -> Self {
        PipelineError::MalformedRecord {
            kind: Some(kind.to_owned()),
            detail: detail.into(),
        }
    }

    /// Builds an index-inconsistency error.
    #[must_use]
    pub fn inconsistency(
        index: &'static str,
        key: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        PipelineError::IndexInconsistency {
            index,
            key: key.into(),
            detail: detail.into(),
        }
    }

    /// Returns true if this error is a backend problem worth retrying —
    /// a connection failure, a timeout, or a 5xx from the store.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            PipelineError::ReqwestError(inner) => inner.is_timeout() || inner.is_connect(),
            PipelineError::ReqwestMiddlewareError(inner) => {
                inner.is_timeout() || inner.is_connect()
            }
            PipelineError::StoreError(resp) => resp.status.is_server_error(),
            _ => false,
        }
    }

    /// Returns true if this error describes an unprocessable source record.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            PipelineError::MalformedRecord { .. } | PipelineError::SerdeError(_)
        )
    }

    /// Returns true if this error describes a violated index invariant.
    #[must_use]
    pub fn is_inconsistency(&self) -> bool {
        matches!(self, PipelineError::IndexInconsistency { .. })
    }

    /// Returns true if this error is a timeout error.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            PipelineError::ReqwestError(inner) => inner.is_timeout(),
            PipelineError::ReqwestMiddlewareError(inner) => inner.is_timeout(),
            _ => false,
        }
    }

    /// Returns true if this error is a connection error.
    #[must_use]
    pub fn is_connect(&self) -> bool {
        match self {
            PipelineError::ReqwestError(inner) => inner.is_connect(),
            PipelineError::ReqwestMiddlewareError(inner) => inner.is_connect(),
            _ => false,
        }
    }

    /// Returns the HTTP status code associated with this error, if available.
    #[must_use]
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            PipelineError::ReqwestError(inner) => inner.status(),
            PipelineError::ReqwestMiddlewareError(inner) => inner.status(),
            PipelineError::StoreError(resp) => Some(resp.status),
            _ => None,
        }
    }
}
