//! # Transformer ([`transform`](crate::transform)) - Source records to BODS statements.
//!
//! The transformer is a pure function from a source record (plus an optional
//! LEI → latest-statement-ID mapping) to a finite sequence of BODS statements:
//!
//! - a LEI record becomes one entity statement;
//! - a relationship record becomes one ownership-or-control statement;
//! - a reporting exception becomes an unknown entity *or* person statement followed by
//!   an ownership-or-control statement, the split dictated by the exception reason.
//!
//! It never consults the indexes and never fails: unknown jurisdictions fall back to
//! their raw code, absent periods to an empty start date. Everything stateful —
//! supersession, voiding, reference bookkeeping — happens afterwards in
//! [`crate::reconcile`].

use std::collections::HashMap;

use crate::annotations;
use crate::identifier::{statement_date, statement_id, today_iso};
use crate::jurisdiction::jurisdiction_name;
use crate::model::enums::{
    CorroborationLevel, ExceptionCategory, ExceptionReason, RelationshipPeriodType,
};
use crate::model::source::{LeiRecord, RelationshipRecord, ReportingException, SourceAddress, SourceRecord};
use crate::model::statement::{
    Address, EntityStatement, Identifier, Interest, InterestedParty, Jurisdiction, LEI_SCHEME,
    OwnershipStatement, PersonStatement, PublicationDetails, Source, Statement, Subject,
    UnspecifiedDetails,
};

/// LEI → latest entity statement ID, assembled by the engine for the record at hand.
pub type LeiMapping = HashMap<String, String>;

/// Human-readable scheme name of the LEI identifier.
const LEI_SCHEME_NAME: &str = "Global Legal Entity Identifier Index";
/// Reason code on unspecified entity/person details.
const EXEMPT_REASON: &str = "interested-party-exempt-from-disclosure";

/// Transforms one source record into its statement sequence.
#[must_use]
pub fn transform(record: &SourceRecord, mapping: &LeiMapping) -> Vec<Statement> {
    match record {
        SourceRecord::Lei(lei) => vec![Statement::Entity(transform_lei(lei))],
        SourceRecord::Relationship(rr) => {
            vec![Statement::Ownership(transform_rr(rr, mapping))]
        }
        SourceRecord::Exception(repex) => transform_repex(repex, mapping),
    }
}

/// The entity statement ID describing an LEI: the latest published one when the
/// mapping knows it, otherwise a tombstone reference derived from the LEI alone.
#[must_use]
pub fn described_statement_id(lei: &str, mapping: &LeiMapping) -> String {
    mapping
        .get(lei)
        .cloned()
        .unwrap_or_else(|| statement_id(lei, "entityStatement"))
}

fn format_address(address_type: &str, address: &SourceAddress) -> Address {
    Address {
        address_type: address_type.to_owned(),
        address: format!("{}, {}", address.first_address_line, address.city),
        post_code: address.postal_code.clone(),
        country: address.country.clone(),
    }
}

fn verified(validation_sources: Option<CorroborationLevel>) -> bool {
    validation_sources == Some(CorroborationLevel::FullyCorroborated)
}

/// Transforms LEI-CDF v3.1 data to a BODS entity statement.
#[must_use]
pub fn transform_lei(record: &LeiRecord) -> EntityStatement {
    let mut identifiers = vec![Identifier {
        id: Some(record.lei.clone()),
        scheme: Some(LEI_SCHEME.to_owned()),
        scheme_name: Some(LEI_SCHEME_NAME.to_owned()),
    }];
    if let Some(authority) = &record.entity.registration_authority {
        let local = Identifier {
            id: authority.registration_authority_entity_id.clone(),
            scheme: None,
            scheme_name: authority.registration_authority_id.clone(),
        };
        if local.id.is_some() || local.scheme_name.is_some() {
            identifiers.push(local);
        }
    }
    let code = &record.entity.legal_jurisdiction;
    EntityStatement {
        statement_id: statement_id(&record.seed(), "entityStatement"),
        statement_type: String::from("entityStatement"),
        statement_date: statement_date(&record.registration.last_update_date),
        entity_type: String::from("registeredEntity"),
        name: Some(record.entity.legal_name.clone()),
        incorporated_in_jurisdiction: Some(Jurisdiction {
            name: jurisdiction_name(code),
            code: code.clone(),
        }),
        identifiers,
        founding_date: record.entity.entity_creation_date.clone(),
        addresses: vec![
            format_address("registered", &record.entity.legal_address),
            format_address("business", &record.entity.headquarters_address),
        ],
        unspecified_entity_details: None,
        is_component: None,
        replaces_statements: None,
        annotations: vec![annotations::lei_status(
            &record.lei,
            record.registration.registration_status.as_str(),
        )],
        publication_details: PublicationDetails::published(today_iso()),
        source: Some(Source::official_register(verified(
            record.registration.validation_sources,
        ))),
    }
}

/// Picks `interests[0].startDate` from the relationship periods: the first
/// `RELATIONSHIP_PERIOD` start date wins, then the first start date of any other
/// period, then empty.
fn interest_start_date(record: &RelationshipRecord) -> String {
    let Some(periods) = &record.relationship.relationship_periods else {
        return String::new();
    };
    let relationship_start = periods.iter().find_map(|period| {
        (period.period_type == Some(RelationshipPeriodType::RelationshipPeriod))
            .then(|| period.start_date.clone())
            .flatten()
    });
    relationship_start
        .or_else(|| periods.iter().find_map(|period| period.start_date.clone()))
        .unwrap_or_default()
}

/// Transforms RR-CDF v2.1 data to a BODS ownership-or-control statement.
#[must_use]
pub fn transform_rr(record: &RelationshipRecord, mapping: &LeiMapping) -> OwnershipStatement {
    let start = &record.relationship.start_node.node_id;
    let end = &record.relationship.end_node.node_id;
    OwnershipStatement {
        statement_id: statement_id(&record.seed(), "ownershipOrControlStatement"),
        statement_type: String::from("ownershipOrControlStatement"),
        statement_date: statement_date(&record.registration.last_update_date),
        subject: Subject {
            described_by_entity_statement: described_statement_id(start, mapping),
        },
        interested_party: InterestedParty::DescribedByEntityStatement(described_statement_id(
            end, mapping,
        )),
        interests: vec![Interest {
            interest_type: String::from("other-influence-or-control"),
            interest_level: String::from("unknown"),
            beneficial_ownership_or_control: false,
            start_date: Some(interest_start_date(record)),
            details: format!(
                "LEI RelationshipType: {}",
                record.relationship.relationship_type.as_str()
            ),
        }],
        is_component: None,
        replaces_statements: None,
        annotations: vec![annotations::rr_status(start, end)],
        publication_details: PublicationDetails::published(today_iso()),
        source: Some(Source::official_register(verified(
            record.registration.validation_sources,
        ))),
    }
}

/// How a reporting exception reason maps onto statements.
struct ReasonDispatch {
    /// Emit a person statement instead of an entity statement.
    person: bool,
    /// The interested party of the ownership statement references the emitted
    /// statement; `false` leaves it unspecified with the raw reason.
    described: bool,
    /// The unspecified-details description.
    description: &'static str,
}

fn dispatch_reason(reason: ExceptionReason) -> ReasonDispatch {
    match reason {
        ExceptionReason::NoLei => ReasonDispatch {
            person: false,
            described: false,
            description: "From LEI ExemptionReason `NO_LEI`. This parent legal entity does not consent to obtain an LEI or to authorize its “child entity” to obtain an LEI on its behalf.",
        },
        ExceptionReason::NaturalPersons => ReasonDispatch {
            person: true,
            described: true,
            description: "From LEI ExemptionReason `NATURAL_PERSONS`. An unknown natural person or persons controls an entity.",
        },
        ExceptionReason::NonConsolidating => ReasonDispatch {
            person: false,
            described: true,
            description: "From LEI ExemptionReason `NON_CONSOLIDATING`. The legal entity or entities are not obliged to provide consolidated accounts in relation to the entity they control.",
        },
        ExceptionReason::NoKnownPerson => ReasonDispatch {
            person: true,
            described: true,
            description: "From LEI ExemptionReason `NO_KNOWN_PERSON`. There is no known person(s) controlling the entity.",
        },
        _ => ReasonDispatch {
            person: false,
            described: true,
            description: "From LEI ExemptionReason `NON_PUBLIC` or related deprecated values. The legal entity’s relationship information with an entity it controls is non-public. There are therefore obstacles to releasing this information.",
        },
    }
}

fn repex_unspecified_details(record: &ReportingException, description: &str) -> UnspecifiedDetails {
    let description = match &record.exception_reference {
        Some(reference) => format!("{description} ExemptionReference provided: {reference}"),
        None => description.to_owned(),
    };
    UnspecifiedDetails {
        reason: EXEMPT_REASON.to_owned(),
        description,
    }
}

fn transform_repex_entity(record: &ReportingException, dispatch: &ReasonDispatch) -> Statement {
    let annotations = vec![annotations::repex_reason(
        record.exception_reason.as_str(),
        &record.lei,
    )];
    let publication_details = PublicationDetails::published(today_iso());
    let source = Some(Source::official_register(false));
    let details = repex_unspecified_details(record, dispatch.description);
    if dispatch.person {
        Statement::Person(PersonStatement {
            statement_id: statement_id(&record.seed(), "personStatement"),
            statement_type: String::from("personStatement"),
            statement_date: statement_date(&record.content_date),
            person_type: String::from("unknownPerson"),
            unspecified_person_details: Some(details),
            is_component: None,
            replaces_statements: None,
            annotations,
            publication_details,
            source,
        })
    } else {
        Statement::Entity(EntityStatement {
            statement_id: statement_id(&record.seed(), "entityStatement"),
            statement_type: String::from("entityStatement"),
            statement_date: statement_date(&record.content_date),
            entity_type: String::from("unknownEntity"),
            name: None,
            incorporated_in_jurisdiction: None,
            identifiers: vec![],
            founding_date: None,
            addresses: vec![],
            unspecified_entity_details: Some(details),
            is_component: None,
            replaces_statements: None,
            annotations,
            publication_details,
            source,
        })
    }
}

fn transform_repex_ooc(
    record: &ReportingException,
    mapping: &LeiMapping,
    dispatch: &ReasonDispatch,
    other_id: &str,
) -> OwnershipStatement {
    let interested_party = if !dispatch.described {
        InterestedParty::Unspecified {
            reason: record.exception_reason.as_str().to_owned(),
        }
    } else if dispatch.person {
        InterestedParty::DescribedByPersonStatement(other_id.to_owned())
    } else {
        InterestedParty::DescribedByEntityStatement(other_id.to_owned())
    };
    let interest_level = match record.exception_category {
        ExceptionCategory::UltimateAccountingConsolidationParent => "indirect",
        ExceptionCategory::DirectAccountingConsolidationParent => "direct",
    };
    OwnershipStatement {
        statement_id: statement_id(&record.seed(), "ownershipOrControlStatement"),
        statement_type: String::from("ownershipOrControlStatement"),
        statement_date: statement_date(&record.content_date),
        subject: Subject {
            described_by_entity_statement: described_statement_id(&record.lei, mapping),
        },
        interested_party,
        interests: vec![Interest {
            interest_type: String::from("other-influence-or-control"),
            interest_level: interest_level.to_owned(),
            beneficial_ownership_or_control: false,
            start_date: None,
            details: String::from("A controlling interest."),
        }],
        is_component: None,
        replaces_statements: None,
        annotations: vec![
            annotations::repex_interest(),
            annotations::repex_reason(record.exception_reason.as_str(), &record.lei),
        ],
        publication_details: PublicationDetails::published(today_iso()),
        source: Some(Source::official_register(false)),
    }
}

/// Transforms a reporting exception to its statement pair.
#[must_use]
pub fn transform_repex(record: &ReportingException, mapping: &LeiMapping) -> Vec<Statement> {
    let dispatch = dispatch_reason(record.exception_reason);
    let other = transform_repex_entity(record, &dispatch);
    let ooc = transform_repex_ooc(record, mapping, &dispatch, other.statement_id());
    vec![other, Statement::Ownership(ooc)]
}
