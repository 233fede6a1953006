//! # Voiding Builder ([`VoidingBuilder`]) - Synthesized replacement statements.
//!
//! When a source record is retired, deleted, or superseded by a different kind of
//! claim, the previously published statement cannot be edited — published statements
//! are immutable. Instead a fresh "void" statement is synthesized: it carries no new
//! substantive claim, lists the prior statement in `replacesStatements`, and bears an
//! annotation naming the cause.
//!
//! The builder owns two intra-run sets, `already_voided` and `already_replaced`, keyed
//! by prior statement ID. Every void and every `replacesStatements` attachment flows
//! through them, so one run produces at most one void and at most one successor per
//! prior statement, no matter how many source records touch the same series.

use std::collections::HashSet;

use crate::annotations;
use crate::identifier::{statement_date, statement_id, today_iso};
use crate::model::statement::{
    EntityStatement, InterestedParty, OwnershipStatement, PersonStatement, PublicationDetails,
    Statement, Subject,
};

/// Why a statement series is being voided.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum VoidCause {
    /// The LEI or relationship registration was retired.
    Retired,
    /// The reporting exception was deleted from the golden copy.
    ExceptionDeleted,
    /// The reporting exception's reason changed.
    ExceptionChanged,
    /// The reporting exception was replaced by a real relationship.
    ExceptionReplaced,
    /// The relationship record was deleted from the golden copy.
    RelationshipDeleted,
}

fn void_entity_statement(
    cause: VoidCause,
    prior_id: &str,
    status: &str,
    update_date: &str,
    statement_type: &str,
    lei: &str,
    unknown: bool,
) -> Statement {
    let id = statement_id(prior_id, "voided");
    let annotations = match cause {
        VoidCause::Retired => vec![annotations::lei_status(lei, status)],
        VoidCause::ExceptionDeleted => vec![annotations::repex_deleted(status, lei)],
        VoidCause::ExceptionChanged => vec![annotations::repex_changed(status, lei)],
        VoidCause::ExceptionReplaced => vec![annotations::repex_replaced(status, lei)],
        VoidCause::RelationshipDeleted => vec![],
    };
    let statement_date = statement_date(update_date);
    let publication_details = PublicationDetails::voided(today_iso());
    let replaces = Some(vec![prior_id.to_owned()]);
    if statement_type == "personStatement" {
        Statement::Person(PersonStatement {
            statement_id: id,
            statement_type: statement_type.to_owned(),
            statement_date,
            person_type: String::from("unknownPerson"),
            unspecified_person_details: None,
            is_component: Some(false),
            replaces_statements: replaces,
            annotations,
            publication_details,
            source: None,
        })
    } else {
        Statement::Entity(EntityStatement {
            statement_id: id,
            statement_type: statement_type.to_owned(),
            statement_date,
            entity_type: String::from(if unknown { "unknownEntity" } else { "registeredEntity" }),
            name: None,
            incorporated_in_jurisdiction: None,
            identifiers: vec![],
            founding_date: None,
            addresses: vec![],
            unspecified_entity_details: None,
            is_component: Some(false),
            replaces_statements: replaces,
            annotations,
            publication_details,
            source: None,
        })
    }
}

fn void_ooc_statement(
    cause: VoidCause,
    prior_id: &str,
    status: &str,
    update_date: &str,
    lei: &str,
    interested_lei: &str,
) -> Statement {
    let annotations = match cause {
        VoidCause::RelationshipDeleted => vec![
            annotations::rr_deleted(),
            annotations::rr_status(lei, interested_lei),
        ],
        VoidCause::Retired => vec![
            annotations::retired(),
            annotations::rr_status(lei, interested_lei),
        ],
        _ => vec![annotations::repex_deleted(status, lei)],
    };
    Statement::Ownership(OwnershipStatement {
        statement_id: statement_id(prior_id, "voided_ownershipOrControlStatement"),
        statement_type: String::from("ownershipOrControlStatement"),
        statement_date: statement_date(update_date),
        subject: Subject {
            described_by_entity_statement: String::new(),
        },
        interested_party: InterestedParty::DescribedByEntityStatement(String::new()),
        interests: vec![],
        is_component: Some(false),
        replaces_statements: Some(vec![prior_id.to_owned()]),
        annotations,
        publication_details: PublicationDetails::voided(today_iso()),
        source: None,
    })
}

/// Builds void statements while enforcing at-most-one-void per prior statement ID
/// within a run.
#[derive(Debug, Default)]
pub struct VoidingBuilder {
    already_voided: HashSet<String>,
    already_replaced: HashSet<String>,
}

impl VoidingBuilder {
    /// Creates a builder with empty dedup sets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn claim_void(&mut self, prior_id: &str) -> bool {
        if self.already_voided.contains(prior_id) || self.already_replaced.contains(prior_id) {
            return false;
        }
        self.already_voided.insert(prior_id.to_owned());
        true
    }

    /// Voids an entity statement whose LEI registration was retired.
    pub fn void_entity_retired(
        &mut self,
        prior_id: &str,
        update_date: &str,
        lei: &str,
        status: &str,
    ) -> Option<Statement> {
        self.claim_void(prior_id).then(|| {
            void_entity_statement(
                VoidCause::Retired,
                prior_id,
                status,
                update_date,
                "entityStatement",
                lei,
                false,
            )
        })
    }

    /// Voids the entity statement of a deleted reporting exception.
    pub fn void_entity_deletion(
        &mut self,
        prior_id: &str,
        update_date: &str,
        lei: &str,
        reason: &str,
    ) -> Option<Statement> {
        self.claim_void(prior_id).then(|| {
            void_entity_statement(
                VoidCause::ExceptionDeleted,
                prior_id,
                reason,
                update_date,
                "entityStatement",
                lei,
                true,
            )
        })
    }

    /// Voids the entity/person statement of a reporting exception whose reason changed.
    pub fn void_entity_changed(
        &mut self,
        prior_id: &str,
        update_date: &str,
        statement_type: &str,
        lei: &str,
        old_reason: &str,
    ) -> Option<Statement> {
        self.claim_void(prior_id).then(|| {
            void_entity_statement(
                VoidCause::ExceptionChanged,
                prior_id,
                old_reason,
                update_date,
                statement_type,
                lei,
                true,
            )
        })
    }

    /// Voids the entity/person statement of a reporting exception replaced by a real
    /// relationship record.
    pub fn void_entity_replaced(
        &mut self,
        prior_id: &str,
        update_date: &str,
        statement_type: &str,
        lei: &str,
        reason: &str,
    ) -> Option<Statement> {
        self.claim_void(prior_id).then(|| {
            void_entity_statement(
                VoidCause::ExceptionReplaced,
                prior_id,
                reason,
                update_date,
                statement_type,
                lei,
                true,
            )
        })
    }

    /// Voids an ownership statement whose relationship record was deleted.
    pub fn void_ooc_relationship_deletion(
        &mut self,
        prior_id: &str,
        update_date: &str,
        start: &str,
        end: &str,
    ) -> Option<Statement> {
        self.claim_void(prior_id).then(|| {
            void_ooc_statement(VoidCause::RelationshipDeleted, prior_id, "", update_date, start, end)
        })
    }

    /// Voids an ownership statement whose relationship registration was retired.
    pub fn void_ooc_relationship_retired(
        &mut self,
        prior_id: &str,
        update_date: &str,
        start: &str,
        end: &str,
    ) -> Option<Statement> {
        self.claim_void(prior_id).then(|| {
            void_ooc_statement(VoidCause::Retired, prior_id, "", update_date, start, end)
        })
    }

    /// Voids the ownership statement of a deleted reporting exception.
    pub fn void_ooc_exception_deletion(
        &mut self,
        prior_id: &str,
        update_date: &str,
        lei: &str,
        reason: &str,
    ) -> Option<Statement> {
        self.claim_void(prior_id).then(|| {
            void_ooc_statement(VoidCause::ExceptionDeleted, prior_id, reason, update_date, lei, "")
        })
    }

    /// Attaches `replacesStatements=[prior_id]` to a statement, unless `prior_id`
    /// already has a successor or a void this run. Returns whether it was attached.
    pub fn add_replaces(&mut self, statement: &mut Statement, prior_id: &str) -> bool {
        if self.already_replaced.contains(prior_id) || self.already_voided.contains(prior_id) {
            return false;
        }
        self.already_replaced.insert(prior_id.to_owned());
        statement.set_replaces(prior_id);
        true
    }
}
