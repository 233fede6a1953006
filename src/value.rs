//! # GLEIF Field Value Enums ([`value`](crate::value)) - Canonical string conversions.
//!
//! The golden-copy value sets are modeled as enums in [`crate::model::enums`]; this module
//! supplies their canonical string representations. The reconciliation engine builds
//! domain keys, statement seeds and annotations out of these strings, so they must match
//! the wire values byte-for-byte (a key built from a differently-cased value would orphan
//! every previously published statement).
//!
//! ## Key Features
//!
//! - **Type Safety:** Only valid, known values for the golden-copy fields are used, caught at compile-time.
//! - **String Conversion:**
//!     - A `const fn as_str()` method to retrieve the canonical string representation.
//!     - Implementation of [`std::fmt::Display`] for easy use in formatted strings (keys, seeds, log lines).
//! - **String-like Usage:**
//!     - Implementation of [`AsRef<str>`] to allow enum instances to be used where `&str` is expected.
//! - **Parsing from Strings:**
//!     - Implementation of [`std::str::FromStr`] to parse the wire representation back into the enum.
//!
//! # Examples
//!
//! ```rust
//! use gleif_bods::value::{ExceptionCategory, RegistrationStatus, RelationshipType};
//! use std::str::FromStr;
//!
//! assert_eq!(RegistrationStatus::Retired.as_str(), "RETIRED");
//! assert_eq!(RelationshipType::IsFundManagedBy.to_string(), "IS_FUND-MANAGED_BY");
//!
//! let category = ExceptionCategory::from_str("DIRECT_ACCOUNTING_CONSOLIDATION_PARENT").unwrap();
//! assert_eq!(category, ExceptionCategory::DirectAccountingConsolidationParent);
//! ```

use crate::error::PipelineError;
use std::{fmt, str::FromStr};

// Re-exporting the enums for external use
pub use crate::model::enums::{
    ExceptionCategory, ExceptionReason, RegistrationStatus, RelationshipType,
};

fn unknown_value(enum_name: &str, value: &str) -> PipelineError {
    PipelineError::MalformedRecord {
        kind: None,
        detail: format!("unknown {enum_name} value: {value}"),
    }
}

impl RegistrationStatus {
    /// Returns the canonical string representation on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::PendingValidation => "PENDING_VALIDATION",
            RegistrationStatus::Issued => "ISSUED",
            RegistrationStatus::Duplicate => "DUPLICATE",
            RegistrationStatus::Lapsed => "LAPSED",
            RegistrationStatus::Merged => "MERGED",
            RegistrationStatus::Retired => "RETIRED",
            RegistrationStatus::Annulled => "ANNULLED",
            RegistrationStatus::Cancelled => "CANCELLED",
            RegistrationStatus::Transferred => "TRANSFERRED",
            RegistrationStatus::PendingTransfer => "PENDING_TRANSFER",
            RegistrationStatus::PendingArchival => "PENDING_ARCHIVAL",
            RegistrationStatus::Published => "PUBLISHED",
        }
    }
}

// Enables ergonomic formatting in keys and log lines, ensuring the canonical wire value is always used.
impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Allows passing RegistrationStatus directly to APIs expecting `&str` without allocating a new String.
impl AsRef<str> for RegistrationStatus {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for RegistrationStatus {
    type Err = PipelineError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING_VALIDATION" => Ok(RegistrationStatus::PendingValidation),
            "ISSUED" => Ok(RegistrationStatus::Issued),
            "DUPLICATE" => Ok(RegistrationStatus::Duplicate),
            "LAPSED" => Ok(RegistrationStatus::Lapsed),
            "MERGED" => Ok(RegistrationStatus::Merged),
            "RETIRED" => Ok(RegistrationStatus::Retired),
            "ANNULLED" => Ok(RegistrationStatus::Annulled),
            "CANCELLED" => Ok(RegistrationStatus::Cancelled),
            "TRANSFERRED" => Ok(RegistrationStatus::Transferred),
            "PENDING_TRANSFER" => Ok(RegistrationStatus::PendingTransfer),
            "PENDING_ARCHIVAL" => Ok(RegistrationStatus::PendingArchival),
            "PUBLISHED" => Ok(RegistrationStatus::Published),
            _ => Err(unknown_value("RegistrationStatus", s)),
        }
    }
}

impl RelationshipType {
    /// Returns the canonical string representation on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::IsDirectlyConsolidatedBy => "IS_DIRECTLY_CONSOLIDATED_BY",
            RelationshipType::IsUltimatelyConsolidatedBy => "IS_ULTIMATELY_CONSOLIDATED_BY",
            RelationshipType::IsInternationalBranchOf => "IS_INTERNATIONAL_BRANCH_OF",
            RelationshipType::IsFundManagedBy => "IS_FUND-MANAGED_BY",
            RelationshipType::IsSubfundOf => "IS_SUBFUND_OF",
            RelationshipType::IsFeederTo => "IS_FEEDER_TO",
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for RelationshipType {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for RelationshipType {
    type Err = PipelineError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IS_DIRECTLY_CONSOLIDATED_BY" => Ok(RelationshipType::IsDirectlyConsolidatedBy),
            "IS_ULTIMATELY_CONSOLIDATED_BY" => Ok(RelationshipType::IsUltimatelyConsolidatedBy),
            "IS_INTERNATIONAL_BRANCH_OF" => Ok(RelationshipType::IsInternationalBranchOf),
            "IS_FUND-MANAGED_BY" => Ok(RelationshipType::IsFundManagedBy),
            "IS_SUBFUND_OF" => Ok(RelationshipType::IsSubfundOf),
            "IS_FEEDER_TO" => Ok(RelationshipType::IsFeederTo),
            _ => Err(unknown_value("RelationshipType", s)),
        }
    }
}

impl ExceptionCategory {
    /// Returns the canonical string representation on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ExceptionCategory::DirectAccountingConsolidationParent => {
                "DIRECT_ACCOUNTING_CONSOLIDATION_PARENT"
            }
            ExceptionCategory::UltimateAccountingConsolidationParent => {
                "ULTIMATE_ACCOUNTING_CONSOLIDATION_PARENT"
            }
        }
    }
}

impl fmt::Display for ExceptionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for ExceptionCategory {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for ExceptionCategory {
    type Err = PipelineError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DIRECT_ACCOUNTING_CONSOLIDATION_PARENT" => {
                Ok(ExceptionCategory::DirectAccountingConsolidationParent)
            }
            "ULTIMATE_ACCOUNTING_CONSOLIDATION_PARENT" => {
                Ok(ExceptionCategory::UltimateAccountingConsolidationParent)
            }
            _ => Err(unknown_value("ExceptionCategory", s)),
        }
    }
}

impl ExceptionReason {
    /// Returns the canonical string representation on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ExceptionReason::NoLei => "NO_LEI",
            ExceptionReason::NaturalPersons => "NATURAL_PERSONS",
            ExceptionReason::NonConsolidating => "NON_CONSOLIDATING",
            ExceptionReason::NonPublic => "NON_PUBLIC",
            ExceptionReason::BindingLegalCommitments => "BINDING_LEGAL_COMMITMENTS",
            ExceptionReason::LegalObstacles => "LEGAL_OBSTACLES",
            ExceptionReason::DisclosureDetrimental => "DISCLOSURE_DETRIMENTAL",
            ExceptionReason::DetrimentNotExcluded => "DETRIMENT_NOT_EXCLUDED",
            ExceptionReason::ConsentNotObtained => "CONSENT_NOT_OBTAINED",
            ExceptionReason::NoKnownPerson => "NO_KNOWN_PERSON",
        }
    }
}

impl fmt::Display for ExceptionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for ExceptionReason {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for ExceptionReason {
    type Err = PipelineError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NO_LEI" => Ok(ExceptionReason::NoLei),
            "NATURAL_PERSONS" => Ok(ExceptionReason::NaturalPersons),
            "NON_CONSOLIDATING" => Ok(ExceptionReason::NonConsolidating),
            "NON_PUBLIC" => Ok(ExceptionReason::NonPublic),
            "BINDING_LEGAL_COMMITMENTS" => Ok(ExceptionReason::BindingLegalCommitments),
            "LEGAL_OBSTACLES" => Ok(ExceptionReason::LegalObstacles),
            "DISCLOSURE_DETRIMENTAL" => Ok(ExceptionReason::DisclosureDetrimental),
            "DETRIMENT_NOT_EXCLUDED" => Ok(ExceptionReason::DetrimentNotExcluded),
            "CONSENT_NOT_OBTAINED" => Ok(ExceptionReason::ConsentNotObtained),
            "NO_KNOWN_PERSON" => Ok(ExceptionReason::NoKnownPerson),
            _ => Err(unknown_value("ExceptionReason", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str_round_trips_from_str() {
        for status in [
            RegistrationStatus::Issued,
            RegistrationStatus::Retired,
            RegistrationStatus::Published,
            RegistrationStatus::PendingArchival,
        ] {
            assert_eq!(RegistrationStatus::from_str(status.as_str()).unwrap(), status);
        }
        for rel in [
            RelationshipType::IsDirectlyConsolidatedBy,
            RelationshipType::IsFundManagedBy,
        ] {
            assert_eq!(RelationshipType::from_str(rel.as_str()).unwrap(), rel);
        }
        for reason in [ExceptionReason::NoLei, ExceptionReason::ConsentNotObtained] {
            assert_eq!(ExceptionReason::from_str(reason.as_str()).unwrap(), reason);
        }
    }

    #[test]
    fn test_unknown_value_is_error() {
        assert!(RegistrationStatus::from_str("UNKNOWN").is_err());
        assert!(ExceptionCategory::from_str("").is_err());
    }

    #[test]
    fn test_display_matches_serde() {
        let json = serde_json::to_string(&ExceptionCategory::UltimateAccountingConsolidationParent)
            .expect("serialize");
        assert_eq!(
            json.trim_matches('"'),
            ExceptionCategory::UltimateAccountingConsolidationParent.as_str()
        );
    }
}
