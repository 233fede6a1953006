//! # Statement Annotations ([`annotations`](crate::annotations)) - Canned commentary.
//!
//! Every published statement carries zero or more "commenting" annotations explaining
//! where the claim came from or why a statement series was retired. The set of
//! descriptions is fixed; the reconciliation engine picks which to attach per statement.

use serde::{Deserialize, Serialize};

use crate::identifier::today_iso;

/// The annotation author recorded on every annotation.
pub const CREATED_BY_NAME: &str = "Open Ownership";
/// The annotation author's URI.
pub const CREATED_BY_URI: &str = "https://www.openownership.org";

/// A single commenting annotation attached to a BODS statement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    /// The annotation motivation; always `commenting` in this pipeline.
    pub motivation: String,
    /// The human-readable commentary.
    pub description: String,
    /// JSON pointer into the statement the commentary refers to.
    pub statement_pointer_target: String,
    /// The date the annotation was created (today, Europe/London).
    pub creation_date: String,
    /// The annotation author.
    pub created_by: CreatedBy,
}

/// The author of an annotation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedBy {
    /// Display name of the author.
    pub name: String,
    /// URI identifying the author.
    pub uri: String,
}

fn annotation(description: String, pointer: &str) -> Annotation {
    Annotation {
        motivation: "commenting".to_owned(),
        description,
        statement_pointer_target: pointer.to_owned(),
        creation_date: today_iso(),
        created_by: CreatedBy {
            name: CREATED_BY_NAME.to_owned(),
            uri: CREATED_BY_URI.to_owned(),
        },
    }
}

/// Registration-status annotation for entity statements built from a LEI record.
#[must_use]
pub fn lei_status(lei: &str, registration_status: &str) -> Annotation {
    annotation(
        format!("GLEIF data for this entity - LEI: {lei}; Registration Status: {registration_status}"),
        "/",
    )
}

/// Subject/interested-party annotation for ownership statements built from a
/// relationship record.
#[must_use]
pub fn rr_status(subject: &str, interested: &str) -> Annotation {
    annotation(
        format!("Describes GLEIF relationship: {subject} is subject, {interested} is interested party"),
        "/",
    )
}

/// Annotation for statements voided because the relationship was deleted.
#[must_use]
pub fn rr_deleted() -> Annotation {
    annotation("GLEIF relationship deleted on this statementDate.".to_owned(), "/")
}

/// Annotation for statements voided because the registration was retired.
#[must_use]
pub fn retired() -> Annotation {
    annotation(
        "GLEIF RegistrationStatus set to RETIRED on this statementDate.".to_owned(),
        "/",
    )
}

/// Interest-type annotation carried by every reporting-exception ownership statement.
#[must_use]
pub fn repex_interest() -> Annotation {
    annotation("The nature of this interest is unknown".to_owned(), "/interests/0/type")
}

/// Reason annotation carried by every statement built from a reporting exception.
#[must_use]
pub fn repex_reason(reason: &str, lei: &str) -> Annotation {
    annotation(
        format!("This statement was created due to a {reason} GLEIF Reporting Exception for {lei}"),
        "/",
    )
}

/// Annotation for statements voided because the reporting exception changed.
#[must_use]
pub fn repex_changed(reason: &str, lei: &str) -> Annotation {
    annotation(
        format!("Statement retired due to change in a {reason} GLEIF Reporting Exception for {lei}"),
        "/",
    )
}

/// Annotation for statements voided because the reporting exception was replaced by a
/// real relationship record.
#[must_use]
pub fn repex_replaced(reason: &str, lei: &str) -> Annotation {
    annotation(
        format!("Statement series retired due to replacement of a {reason} GLEIF Reporting Exception for {lei}"),
        "/",
    )
}

/// Annotation for statements voided because the reporting exception was deleted.
#[must_use]
pub fn repex_deleted(reason: &str, lei: &str) -> Annotation {
    annotation(
        format!("Statement series retired due to deletion of a {reason} GLEIF Reporting Exception for {lei}"),
        "/",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_shape() {
        let ann = lei_status("5493001KJTIIGC8Y1R12", "ISSUED");
        assert_eq!(ann.motivation, "commenting");
        assert_eq!(ann.statement_pointer_target, "/");
        assert_eq!(ann.created_by.name, CREATED_BY_NAME);
        assert_eq!(
            ann.description,
            "GLEIF data for this entity - LEI: 5493001KJTIIGC8Y1R12; Registration Status: ISSUED"
        );
    }

    #[test]
    fn test_interest_pointer() {
        assert_eq!(repex_interest().statement_pointer_target, "/interests/0/type");
    }

    #[test]
    fn test_serialized_keys_are_camel_case() {
        let value = serde_json::to_value(retired()).expect("annotation should serialize");
        assert!(value.get("statementPointerTarget").is_some());
        assert!(value.get("creationDate").is_some());
        assert!(value.get("createdBy").is_some());
    }
}
