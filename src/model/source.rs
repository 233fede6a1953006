//! Model definitions for GLEIF golden-copy source records.
//!
//! This module contains the data structures carried on the inter-stage bus: LEI records
//! (LEI-CDF v3.1), relationship records (RR-CDF v2.1) and reporting exceptions (v2.1),
//! already tokenized from the concatenated XML files into JSON with the CDF field names.
//!
//! The three kinds travel as a [`SourceRecord`], tagged with a `recordType` discriminant
//! so consumers never have to sniff structural features to tell them apart.
//!
//! Each record knows its *seed* — the string its statement identifiers are derived
//! from — and the domain keys under which the auxiliary indexes track it.

use serde::{Deserialize, Serialize};

use crate::identifier::reference_digest;
use crate::model::enums::{
    CorroborationLevel, ExceptionCategory, ExceptionReason, RegistrationStatus,
    RelationshipPeriodType, RelationshipStatus, RelationshipType,
};

/// A single LEI record from the golden copy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LeiRecord {
    /// A Legal Entity Identifier (LEI) code, in the format specified by ISO 17442.
    #[serde(rename = "LEI")]
    pub lei: String,
    /// The entity details.
    pub entity: LeiEntity,
    /// The registration of this LEI with the managing LOU.
    pub registration: Registration,
}

/// The entity details of a LEI record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LeiEntity {
    /// The legal name of the legal entity.
    pub legal_name: String,
    /// The jurisdiction of legal formation, as an ISO 3166-1 alpha-2 code optionally
    /// extended with an ISO 3166-2 subdivision.
    pub legal_jurisdiction: String,
    /// The address of the legal entity as recorded in its legal jurisdiction.
    pub legal_address: SourceAddress,
    /// The address of the headquarters of the legal entity.
    pub headquarters_address: SourceAddress,
    /// The official authority in the entity's jurisdiction and its local identifier
    /// for the entity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_authority: Option<RegistrationAuthority>,
    /// The date on which the legal entity was first established.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_creation_date: Option<String>,
}

/// An address as carried by the golden copy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SourceAddress {
    /// The mandatory first address line element.
    pub first_address_line: String,
    /// The mandatory name of the city.
    pub city: String,
    /// The 2-character ISO 3166-1 country code of the country.
    pub country: String,
    /// The (optional) postal code of this address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

/// The registration authority reference of an entity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegistrationAuthority {
    /// The reference code of the registration authority, from the GLEIF RA list.
    #[serde(rename = "RegistrationAuthorityID", skip_serializing_if = "Option::is_none")]
    pub registration_authority_id: Option<String>,
    /// The identifier of the entity at the indicated registration authority.
    #[serde(rename = "RegistrationAuthorityEntityID", skip_serializing_if = "Option::is_none")]
    pub registration_authority_entity_id: Option<String>,
}

/// Registration details shared by LEI and relationship records.
///
/// `LastUpdateDate` is kept as the verbatim wire string: it feeds the statement seeds,
/// and any reformatting would change every derived statement identifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Registration {
    /// Date/time the record was most recently updated, verbatim.
    pub last_update_date: String,
    /// The status of the registration.
    pub registration_status: RegistrationStatus,
    /// The level of validation of the reference data provided by the registrant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_sources: Option<CorroborationLevel>,
}

/// A single relationship record from the golden copy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RelationshipRecord {
    /// The details of the relationship.
    pub relationship: Relationship,
    /// The registration of this relationship report.
    pub registration: Registration,
    /// Golden-copy extension data, carrying deletion markers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<Extension>,
}

/// Details of a relationship between two nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Relationship {
    /// The start node ("child") of the relationship.
    pub start_node: RelationshipNode,
    /// The end node ("parent") of the relationship.
    pub end_node: RelationshipNode,
    /// The type of the relationship.
    pub relationship_type: RelationshipType,
    /// The periods during which the relationship is/was valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_periods: Option<Vec<RelationshipPeriod>>,
    /// The status of the relationship.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship_status: Option<RelationshipStatus>,
}

/// A node in a relationship (start or end).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RelationshipNode {
    /// The unique identifier of the node (an LEI).
    #[serde(rename = "NodeID")]
    pub node_id: String,
    /// The type of the node identifier.
    #[serde(rename = "NodeIDType", skip_serializing_if = "Option::is_none")]
    pub node_id_type: Option<String>,
}

/// A period during which a relationship is/was valid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RelationshipPeriod {
    /// The start date of the period.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    /// The end date of the period, if available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    /// The type of the period.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_type: Option<RelationshipPeriodType>,
}

/// Golden-copy extension container.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Extension {
    /// Present when the record was deleted from the golden copy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deletion: Option<Deletion>,
}

/// A deletion marker from the golden copy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Deletion {
    /// The date/time the record was deleted, verbatim.
    pub deleted_at: String,
}

/// A single reporting exception from the golden copy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReportingException {
    /// The LEI to which this exception applies.
    #[serde(rename = "LEI")]
    pub lei: String,
    /// The category of parent the exception declines to report.
    pub exception_category: ExceptionCategory,
    /// The declared reason for the exception.
    pub exception_reason: ExceptionReason,
    /// An optional free-text reference for the exception.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_reference: Option<String>,
    /// The content date of the golden-copy file the exception arrived in, stamped on
    /// the record by the ingest stage.
    pub content_date: String,
    /// Golden-copy extension data, carrying deletion markers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<Extension>,
}

/// A source record of any kind, tagged with its discriminant on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "recordType")]
pub enum SourceRecord {
    /// A LEI record (`lei`).
    #[serde(rename = "lei")]
    Lei(LeiRecord),
    /// A relationship record (`rr`).
    #[serde(rename = "rr")]
    Relationship(RelationshipRecord),
    /// A reporting exception (`repex`).
    #[serde(rename = "repex")]
    Exception(ReportingException),
}

impl LeiRecord {
    /// The seed encoding this record's identity and revision.
    #[must_use]
    pub fn seed(&self) -> String {
        format!("{}_{}", self.lei, self.registration.last_update_date)
    }
}

impl RelationshipRecord {
    /// The seed encoding this record's identity and revision.
    #[must_use]
    pub fn seed(&self) -> String {
        format!(
            "{}_{}",
            self.relationship_key(),
            self.registration.last_update_date
        )
    }

    /// The domain key tracking this relationship in the `latest` index,
    /// independent of revision.
    #[must_use]
    pub fn relationship_key(&self) -> String {
        format!(
            "{}_{}_{}",
            self.relationship.start_node.node_id,
            self.relationship.end_node.node_id,
            self.relationship.relationship_type.as_str()
        )
    }

    /// The deletion timestamp, when the golden copy marks this record deleted.
    #[must_use]
    pub fn deleted_at(&self) -> Option<&str> {
        self.extension
            .as_ref()
            .and_then(|extension| extension.deletion.as_ref())
            .map(|deletion| deletion.deleted_at.as_str())
    }
}

impl ReportingException {
    /// The seed encoding this record's identity and content date. Free-text references
    /// are digested so the seed stays bounded.
    #[must_use]
    pub fn seed(&self) -> String {
        let reference = match &self.exception_reference {
            Some(reference) => reference_digest(reference),
            None => String::from("None"),
        };
        format!(
            "{}_{}_{}_{}_{}",
            self.lei,
            self.exception_category.as_str(),
            self.exception_reason.as_str(),
            reference,
            self.content_date
        )
    }

    /// The key tracking the most recently active exception of this category for
    /// this LEI in the `exceptions` index.
    #[must_use]
    pub fn exception_key(&self) -> String {
        format!("{}_{}", self.lei, self.exception_category.as_str())
    }

    /// The `latest` domain key for the entity/person statement series.
    #[must_use]
    pub fn latest_entity_key(&self) -> String {
        format!(
            "{}_{}_{}_entity",
            self.lei,
            self.exception_category.as_str(),
            self.exception_reason.as_str()
        )
    }

    /// The `latest` domain key for the ownership statement series.
    #[must_use]
    pub fn latest_ownership_key(&self) -> String {
        format!(
            "{}_{}_{}_ownership",
            self.lei,
            self.exception_category.as_str(),
            self.exception_reason.as_str()
        )
    }

    /// The deletion timestamp, when the golden copy marks this record deleted.
    #[must_use]
    pub fn deleted_at(&self) -> Option<&str> {
        self.extension
            .as_ref()
            .and_then(|extension| extension.deletion.as_ref())
            .map(|deletion| deletion.deleted_at.as_str())
    }
}

impl SourceRecord {
    /// The record kind as it appears in index names and log lines.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            SourceRecord::Lei(_) => "lei",
            SourceRecord::Relationship(_) => "rr",
            SourceRecord::Exception(_) => "repex",
        }
    }

    /// The content-addressed identity of this record: its seed. Two byte-identical
    /// golden-copy records share a seed, which is what makes ingest idempotent.
    #[must_use]
    pub fn record_id(&self) -> String {
        match self {
            SourceRecord::Lei(record) => record.seed(),
            SourceRecord::Relationship(record) => record.seed(),
            SourceRecord::Exception(record) => record.seed(),
        }
    }
}
