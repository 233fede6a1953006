//! Model definitions for the emitted BODS statements.
//!
//! This module contains the subset of the Beneficial Ownership Data Standard (v0.2)
//! vocabulary the pipeline publishes: entity statements, person statements and
//! ownership-or-control statements, together with their shared building blocks
//! (identifiers, addresses, interests, publication details).
//!
//! Statements of the three kinds travel together as a [`Statement`]; the JSON shape is
//! discriminated by the fields each kind requires, matching the wire format consumed
//! downstream (no envelope, camelCase keys).

use serde::{Deserialize, Serialize};

use crate::annotations::Annotation;

/// BODS version stamped on every statement's publication details.
pub const BODS_VERSION: &str = "0.2";
/// Publisher name for statements carrying full publication details.
pub const PUBLISHER_NAME: &str = "OpenOwnership Register";
/// Publisher URL for statements carrying full publication details.
pub const PUBLISHER_URL: &str = "https://register.openownership.org";
/// License URL for statements carrying full publication details.
pub const PUBLISHER_LICENSE: &str = "https://register.openownership.org/terms-and-conditions";
/// Publisher name for synthesized voiding statements.
pub const VOID_PUBLISHER_NAME: &str = "GLEIF";

/// Publication details attached to every statement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationDetails {
    /// The date the statement was published.
    pub publication_date: String,
    /// The BODS schema version the statement conforms to.
    pub bods_version: String,
    /// The license under which the statement is published.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    /// The publisher of the statement.
    pub publisher: Publisher,
}

/// The publisher recorded in publication details.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publisher {
    /// Display name of the publisher.
    pub name: String,
    /// URL of the publisher.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl PublicationDetails {
    /// Full publication details for statements built by the transformer.
    #[must_use]
    pub fn published(publication_date: String) -> Self {
        Self {
            publication_date,
            bods_version: BODS_VERSION.to_owned(),
            license: Some(PUBLISHER_LICENSE.to_owned()),
            publisher: Publisher {
                name: PUBLISHER_NAME.to_owned(),
                url: Some(PUBLISHER_URL.to_owned()),
            },
        }
    }

    /// Reduced publication details for synthesized voiding statements.
    #[must_use]
    pub fn voided(publication_date: String) -> Self {
        Self {
            publication_date,
            bods_version: BODS_VERSION.to_owned(),
            license: None,
            publisher: Publisher {
                name: VOID_PUBLISHER_NAME.to_owned(),
                url: None,
            },
        }
    }
}

/// The source block recording where a statement's claim came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Source type labels, e.g. `officialRegister` plus `verified` when fully corroborated.
    #[serde(rename = "type")]
    pub source_type: Vec<String>,
    /// Free-text description of the source.
    pub description: String,
}

impl Source {
    /// The official-register source block, with `verified` appended when the source
    /// record was fully corroborated.
    #[must_use]
    pub fn official_register(verified: bool) -> Self {
        let mut source_type = vec![String::from("officialRegister")];
        if verified {
            source_type.push(String::from("verified"));
        }
        Self {
            source_type,
            description: String::from("GLEIF"),
        }
    }
}

/// An identifier attached to an entity statement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identifier {
    /// The identifier value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The identifier scheme code, e.g. `XI-LEI`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    /// The human-readable scheme name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme_name: Option<String>,
}

/// The jurisdiction an entity is incorporated in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jurisdiction {
    /// Human-readable jurisdiction name.
    pub name: String,
    /// The source jurisdiction code.
    pub code: String,
}

/// An address attached to an entity statement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// The address role (`registered` or `business`).
    #[serde(rename = "type")]
    pub address_type: String,
    /// The formatted address line.
    pub address: String,
    /// The postal code, if the source carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_code: Option<String>,
    /// The 2-character country code.
    pub country: String,
}

/// Reason and description for an unspecified entity or person.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnspecifiedDetails {
    /// The machine-readable reason, e.g. `interested-party-exempt-from-disclosure`.
    pub reason: String,
    /// Human-readable explanation.
    pub description: String,
}

/// A BODS entity statement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityStatement {
    /// The deterministic statement identifier.
    #[serde(rename = "statementID")]
    pub statement_id: String,
    /// Always `entityStatement`.
    pub statement_type: String,
    /// The date of the claim, from the source record.
    pub statement_date: String,
    /// `registeredEntity` or `unknownEntity`.
    pub entity_type: String,
    /// The legal name, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The jurisdiction of incorporation, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incorporated_in_jurisdiction: Option<Jurisdiction>,
    /// Identifiers for the entity, led by the XI-LEI identifier.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifiers: Vec<Identifier>,
    /// The founding date, when the source carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub founding_date: Option<String>,
    /// Registered and business addresses.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<Address>,
    /// Why the entity is unspecified, for exception-derived statements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unspecified_entity_details: Option<UnspecifiedDetails>,
    /// Component marker; only stamped on voiding statements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_component: Option<bool>,
    /// The single statement this one supersedes, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaces_statements: Option<Vec<String>>,
    /// Commentary annotations.
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    /// Publication details.
    pub publication_details: PublicationDetails,
    /// The source of the claim; absent on voiding statements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
}

/// A BODS person statement. Only unknown persons occur in this pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonStatement {
    /// The deterministic statement identifier.
    #[serde(rename = "statementID")]
    pub statement_id: String,
    /// Always `personStatement`.
    pub statement_type: String,
    /// The date of the claim, from the source record.
    pub statement_date: String,
    /// Always `unknownPerson`.
    pub person_type: String,
    /// Why the person is unspecified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unspecified_person_details: Option<UnspecifiedDetails>,
    /// Component marker; only stamped on voiding statements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_component: Option<bool>,
    /// The single statement this one supersedes, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaces_statements: Option<Vec<String>>,
    /// Commentary annotations.
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    /// Publication details.
    pub publication_details: PublicationDetails,
    /// The source of the claim; absent on voiding statements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
}

/// The subject of an ownership-or-control statement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    /// The statement ID of the entity statement describing the subject. Voiding
    /// statements blank this out.
    pub described_by_entity_statement: String,
}

/// The interested party of an ownership-or-control statement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InterestedParty {
    /// Described by an entity statement with the given ID.
    DescribedByEntityStatement(String),
    /// Described by a person statement with the given ID.
    DescribedByPersonStatement(String),
    /// Not described by any statement; carries the reason.
    Unspecified {
        /// The machine-readable reason the party is unspecified.
        reason: String,
    },
}

/// A single interest held by the interested party over the subject.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interest {
    /// The interest type; always `other-influence-or-control` here.
    #[serde(rename = "type")]
    pub interest_type: String,
    /// `direct`, `indirect` or `unknown`.
    pub interest_level: String,
    /// Whether the interest amounts to beneficial ownership or control.
    pub beneficial_ownership_or_control: bool,
    /// The start date of the interest; relationship-derived interests always carry
    /// this field, possibly empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    /// Free-text detail, recording the source relationship type or exception category.
    pub details: String,
}

/// A BODS ownership-or-control statement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipStatement {
    /// The deterministic statement identifier.
    #[serde(rename = "statementID")]
    pub statement_id: String,
    /// Always `ownershipOrControlStatement`.
    pub statement_type: String,
    /// The date of the claim, from the source record.
    pub statement_date: String,
    /// The subject of the statement.
    pub subject: Subject,
    /// The interested party of the statement.
    pub interested_party: InterestedParty,
    /// The interests held.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interests: Vec<Interest>,
    /// Component marker; only stamped on voiding statements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_component: Option<bool>,
    /// The single statement this one supersedes, when any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replaces_statements: Option<Vec<String>>,
    /// Commentary annotations.
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    /// Publication details.
    pub publication_details: PublicationDetails,
    /// The source of the claim; absent on voiding statements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
}

/// Scheme code of the LEI identifier on entity statements.
pub const LEI_SCHEME: &str = "XI-LEI";

impl EntityStatement {
    /// The LEI carried in this statement's identifier list, if any.
    #[must_use]
    pub fn lei(&self) -> Option<&str> {
        self.identifiers
            .iter()
            .find(|identifier| identifier.scheme.as_deref() == Some(LEI_SCHEME))
            .and_then(|identifier| identifier.id.as_deref())
    }
}

/// A statement of any kind, as emitted downstream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Statement {
    /// An entity statement.
    Entity(EntityStatement),
    /// A person statement.
    Person(PersonStatement),
    /// An ownership-or-control statement.
    Ownership(OwnershipStatement),
}

impl Statement {
    /// The statement identifier.
    #[must_use]
    pub fn statement_id(&self) -> &str {
        match self {
            Statement::Entity(s) => &s.statement_id,
            Statement::Person(s) => &s.statement_id,
            Statement::Ownership(s) => &s.statement_id,
        }
    }

    /// The `statementType` value.
    #[must_use]
    pub fn statement_type(&self) -> &str {
        match self {
            Statement::Entity(s) => &s.statement_type,
            Statement::Person(s) => &s.statement_type,
            Statement::Ownership(s) => &s.statement_type,
        }
    }

    /// The statement store index this statement is mirrored into.
    #[must_use]
    pub const fn store_index(&self) -> &'static str {
        match self {
            Statement::Entity(_) => "entity",
            Statement::Person(_) => "person",
            Statement::Ownership(_) => "ownership",
        }
    }

    /// Records that this statement supersedes `prior_id`.
    pub fn set_replaces(&mut self, prior_id: &str) {
        let replaces = Some(vec![prior_id.to_owned()]);
        match self {
            Statement::Entity(s) => s.replaces_statements = replaces,
            Statement::Person(s) => s.replaces_statements = replaces,
            Statement::Ownership(s) => s.replaces_statements = replaces,
        }
    }

    /// The single prior statement this one supersedes, when any.
    #[must_use]
    pub fn replaces(&self) -> Option<&str> {
        let replaces = match self {
            Statement::Entity(s) => &s.replaces_statements,
            Statement::Person(s) => &s.replaces_statements,
            Statement::Ownership(s) => &s.replaces_statements,
        };
        replaces
            .as_ref()
            .and_then(|ids| ids.first())
            .map(String::as_str)
    }
}
