//! Enum definitions for GLEIF golden-copy records.
//!
//! This module contains enumerations used to deserialize and represent the closed value
//! sets carried by the golden-copy files. They match the string values on the wire and
//! provide a strongly-typed interface for the transformer and the reconciliation engine.
//!
//! The enums are categorized based on their usage in:
//! - Level 1 (Who is Who): registration statuses and corroboration levels of LEI records.
//! - Level 2 (Who Owns Whom): relationship types, statuses and period types.
//! - Reporting exceptions: exception categories and reasons.
//!
//! For the canonical string conversions (`as_str`, `Display`, `FromStr`), see
//! [`crate::value`].

use serde::{Deserialize, Serialize};

// -- Enums used by Level 1 (who is who) and Level 2 (who owns whom) --

/// The status of a legal entity's LEI registration, or of a relationship data report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationStatus {
    /// An application that has been submitted and which is being processed and validated.
    PendingValidation,
    /// An LEI Registration that has been validated and issued.
    Issued,
    /// A registration that has been determined to be a duplicate of another; assigned to the non-surviving registration.
    Duplicate,
    /// A registration that has not been renewed by the `NextRenewalDate` and is not known by public sources to be inactive.
    Lapsed,
    /// A registration for an entity that has been merged into another legal entity. (Deprecated as of `LEI-CDF 3.0`)
    Merged,
    /// A registration or relationship data report for an entity that has been affected by certain legal entity events.
    Retired,
    /// A registration or relationship data report that was determined to be erroneous or invalid after it was issued.
    Annulled,
    /// A registration that was abandoned prior to issuance of an LEI.
    Cancelled,
    /// A registration or relationship data report that has been transferred to a different LOU as the managing LOU.
    Transferred,
    /// A registration or relationship data report that has been requested to be transferred to another LOU.
    PendingTransfer,
    /// A registration or relationship data report that is about to be transferred to a different LOU.
    PendingArchival,
    /// A relationship data report that has been validated and published.
    Published,
}

/// The level of validation of the reference data provided by the registrant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CorroborationLevel {
    /// The validation of the reference data provided by the registrant has not yet occurred.
    Pending,
    /// The information associated with this record has significant reliance on the information that a submitter provided.
    EntitySuppliedOnly,
    /// The information supplied by the registrant can be partially corroborated by public authoritative sources.
    PartiallyCorroborated,
    /// There is sufficient information contained in authoritative public sources to corroborate the record.
    FullyCorroborated,
}

/// The type of a relationship between two legal entities.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    /// The `StartNode` "child" entity has its accounts fully consolidated by the closest fully consolidating `EndNode` "parent" entity.
    IsDirectlyConsolidatedBy,
    /// The `StartNode` "child" entity has its accounts fully consolidated by the most distant fully consolidating `EndNode` "parent" entity.
    IsUltimatelyConsolidatedBy,
    /// `StartNode` is an international branch of the legal entity designated by `EndNode`.
    IsInternationalBranchOf,
    /// `StartNode` is a fund managed by a main management entity responsible for its constitution and operation.
    #[serde(rename = "IS_FUND-MANAGED_BY")]
    IsFundManagedBy,
    /// `StartNode` is a sub-fund to an umbrella fund.
    IsSubfundOf,
    /// `StartNode` is a Feeder Fund that is (almost) exclusively invested in a single Master Fund.
    IsFeederTo,
}

/// The particular type of period attached to a relationship.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipPeriodType {
    /// The period covers the accounting period of the most recent validation documents for this relationship.
    AccountingPeriod,
    /// The period indicates the duration of validity of the relationship itself.
    RelationshipPeriod,
    /// The period indicates the validity of a regulatory filing or other document demonstrating the relationship.
    DocumentFilingPeriod,
}

/// The status of the relationship itself, as distinct from its registration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum RelationshipStatus {
    /// The relationship detailed in this record is still valid.
    Active,
    /// It has been determined that the relationship ended.
    Inactive,
    /// The relationship status is not applicable.
    Null,
}

// -- Enums used by reporting exceptions --

/// The category of parent a reporting exception declines to report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExceptionCategory {
    /// The exception concerns the closest fully consolidating parent.
    DirectAccountingConsolidationParent,
    /// The exception concerns the most distant fully consolidating parent.
    UltimateAccountingConsolidationParent,
}

/// The declared reason why a parent is not reported.
///
/// The last five variants are deprecated synonyms that the golden copy still carries;
/// they behave like [`ExceptionReason::NonPublic`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExceptionReason {
    /// The parent legal entity does not consent to obtain an LEI.
    NoLei,
    /// An unknown natural person or persons controls the entity.
    NaturalPersons,
    /// The controlling entities are not obliged to provide consolidated accounts.
    NonConsolidating,
    /// The relationship information is non-public.
    NonPublic,
    /// Deprecated synonym of `NON_PUBLIC`.
    BindingLegalCommitments,
    /// Deprecated synonym of `NON_PUBLIC`.
    LegalObstacles,
    /// Deprecated synonym of `NON_PUBLIC`.
    DisclosureDetrimental,
    /// Deprecated synonym of `NON_PUBLIC`.
    DetrimentNotExcluded,
    /// Deprecated synonym of `NON_PUBLIC`.
    ConsentNotObtained,
    /// There is no known person(s) controlling the entity.
    NoKnownPerson,
}

impl ExceptionReason {
    /// Returns true for `NON_PUBLIC` and its deprecated synonyms, which share one
    /// transformation path.
    #[must_use]
    pub const fn is_non_public(self) -> bool {
        matches!(
            self,
            ExceptionReason::NonPublic
                | ExceptionReason::BindingLegalCommitments
                | ExceptionReason::LegalObstacles
                | ExceptionReason::DisclosureDetrimental
                | ExceptionReason::DetrimentNotExcluded
                | ExceptionReason::ConsentNotObtained
        )
    }
}
