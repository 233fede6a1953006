//! # Reconciliation Engine ([`Reconciler`]) - The update state machine.
//!
//! For every source record pulled off the bus, the engine decides whether the record is
//! a first emission, a modification of an already-published statement, a deletion, or a
//! reporting-exception change that replaces a previously issued claim — and emits the
//! statement sequence that keeps the published corpus consistent.
//!
//! Each record flows through four phases:
//!
//! 1. **Setup** — assemble the LEI → latest-statement mapping relevant to the record,
//!    and fetch prior exception state when the record is (or competes with) a
//!    reporting exception.
//! 2. **Transform** — run the pure transformer ([`crate::transform`]).
//! 3. **Dispatch** — per statement, look up the domain key in `latest`, attach
//!    `replacesStatements`, swap in void statements for retirements and deletions,
//!    queue cross-statement fix-ups in `updates`, and maintain `references` and
//!    `exceptions`.
//! 4. **Finish** — at end of input, drain the pending `updates`: re-read each affected
//!    ownership statement from the store, rewrite its entity references, re-derive its
//!    ID, and emit it as a replacement. Then flush the cache.
//!
//! The engine is a plain value over an injected [`IndexCache`] and store handle; all of
//! its state mutation happens on the stage's single consumer task.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::cache::IndexCache;
use crate::error::{PipelineError, Result};
use crate::identifier::{statement_id, today_iso};
use crate::model::enums::{ExceptionCategory, RegistrationStatus, RelationshipType};
use crate::model::index::ExceptionEntry;
use crate::model::source::{LeiRecord, RelationshipRecord, ReportingException, SourceRecord};
use crate::model::statement::{InterestedParty, OwnershipStatement, Statement};
use crate::store::{DocumentStore, index_names};
use crate::transform::{self, LeiMapping};
use crate::voiding::VoidingBuilder;

/// The exception category a consolidation relationship competes with.
fn category_for(rel_type: RelationshipType) -> Option<ExceptionCategory> {
    match rel_type {
        RelationshipType::IsDirectlyConsolidatedBy => {
            Some(ExceptionCategory::DirectAccountingConsolidationParent)
        }
        RelationshipType::IsUltimatelyConsolidatedBy => {
            Some(ExceptionCategory::UltimateAccountingConsolidationParent)
        }
        _ => None,
    }
}

/// The relationship type a reporting exception stands in for.
fn rel_type_for(category: ExceptionCategory) -> RelationshipType {
    match category {
        ExceptionCategory::DirectAccountingConsolidationParent => {
            RelationshipType::IsDirectlyConsolidatedBy
        }
        ExceptionCategory::UltimateAccountingConsolidationParent => {
            RelationshipType::IsUltimatelyConsolidatedBy
        }
    }
}

/// The update-reconciliation engine.
pub struct Reconciler {
    cache: IndexCache,
    voids: VoidingBuilder,
    incremental: bool,
}

impl Reconciler {
    /// Creates an engine over a hydrated cache. With `incremental` unset (a first
    /// snapshot load) the replace/void logic is skipped and only the auxiliary
    /// indexes are seeded.
    #[must_use]
    pub fn new(cache: IndexCache, incremental: bool) -> Self {
        Self {
            cache,
            voids: VoidingBuilder::new(),
            incremental,
        }
    }

    /// Phase 0: the LEI → latest entity statement mapping relevant to a record.
    fn mapping_for(&self, record: &SourceRecord) -> LeiMapping {
        let leis: Vec<&str> = match record {
            SourceRecord::Lei(lei) => vec![&lei.lei],
            SourceRecord::Relationship(rr) => vec![
                &rr.relationship.start_node.node_id,
                &rr.relationship.end_node.node_id,
            ],
            SourceRecord::Exception(repex) => vec![&repex.lei],
        };
        let mut mapping = LeiMapping::new();
        for lei in leis {
            if let Some(latest) = self.cache.latest_lookup(lei) {
                mapping.insert(lei.to_owned(), latest.statement_id.clone());
            }
        }
        mapping
    }

    /// Processes one source record, returning the statements to emit in order.
    ///
    /// # Errors
    ///
    /// Returns a malformed-record or index-inconsistency error for the record at hand;
    /// such errors are skippable and leave the engine consistent.
    pub async fn process_record(
        &mut self,
        store: &dyn DocumentStore,
        record: &SourceRecord,
    ) -> Result<Vec<Statement>> {
        let mapping = self.mapping_for(record);
        let old_exception = match record {
            SourceRecord::Exception(repex) => {
                self.cache.exception_lookup(&repex.exception_key()).cloned()
            }
            _ => None,
        };

        let mut out = Vec::new();
        let mut entity_voided = false;
        let mut other_id: Option<String> = None;
        let mut entity_type: Option<String> = None;
        let mut ooc_id: Option<String> = None;

        for mut statement in transform::transform(record, &mapping) {
            if matches!(statement, Statement::Ownership(_)) {
                match record {
                    SourceRecord::Relationship(rr) => {
                        let (processed, void) = self.process_ooc_rr(rr, statement, entity_voided);
                        statement = processed;
                        if let Some(void) = void {
                            out.push(void);
                        }
                    }
                    SourceRecord::Exception(repex) => {
                        statement =
                            self.process_ooc_repex(repex, statement, old_exception.as_ref());
                    }
                    SourceRecord::Lei(_) => {}
                }
                ooc_id = Some(statement.statement_id().to_owned());
            } else {
                entity_type = Some(statement.statement_type().to_owned());
                match record {
                    SourceRecord::Lei(lei) => {
                        statement = self.process_entity_lei(lei, statement);
                    }
                    SourceRecord::Exception(repex) => {
                        let (processed, void) =
                            self.process_entity_repex(repex, statement, old_exception.as_ref());
                        statement = processed;
                        if let Some(void) = void {
                            out.push(void);
                            entity_voided = true;
                        }
                    }
                    SourceRecord::Relationship(_) => {}
                }
                other_id = Some(statement.statement_id().to_owned());
            }
            out.push(statement);
        }

        if let SourceRecord::Exception(repex) = record {
            match (ooc_id, other_id, entity_type) {
                (Some(statement_id), Some(other_id), Some(entity_type)) => {
                    self.cache.exception_save(ExceptionEntry {
                        latest_id: repex.exception_key(),
                        statement_id,
                        other_id,
                        reason: repex.exception_reason.as_str().to_owned(),
                        reference: repex.exception_reference.clone(),
                        entity_type,
                    });
                }
                _ => {
                    return Err(PipelineError::malformed(
                        record.kind(),
                        "reporting exception produced an incomplete statement pair",
                    ));
                }
            }
        }

        self.cache.maybe_flush(store).await?;
        Ok(out)
    }

    /// Dispatch for an entity statement built from a LEI record.
    fn process_entity_lei(&mut self, record: &LeiRecord, mut statement: Statement) -> Statement {
        let lei = &record.lei;
        let prior = self
            .cache
            .latest_lookup(lei)
            .map(|latest| latest.statement_id.clone());
        if self.incremental {
            if let Some(prior) = &prior {
                if record.registration.registration_status == RegistrationStatus::Retired {
                    if let Some(void) = self.voids.void_entity_retired(
                        prior,
                        &record.registration.last_update_date,
                        lei,
                        record.registration.registration_status.as_str(),
                    ) {
                        statement = void;
                    }
                } else {
                    self.voids.add_replaces(&mut statement, prior);
                }
            }
            // Every ownership statement referencing the superseded entity statement
            // needs its reference rewritten once this run's input is drained.
            if let Some(prior) = &prior {
                if let Some(references) = self.cache.references_lookup(prior).cloned() {
                    for (referencing_id, domain_key) in &references.references_id {
                        self.cache.updates_merge(
                            referencing_id,
                            domain_key,
                            prior,
                            statement.statement_id(),
                        );
                    }
                }
            }
        }
        self.cache.latest_save(lei, statement.statement_id(), None);
        statement
    }

    /// Dispatch for an entity/person statement built from a reporting exception.
    fn process_entity_repex(
        &mut self,
        record: &ReportingException,
        mut statement: Statement,
        old_exception: Option<&ExceptionEntry>,
    ) -> (Statement, Option<Statement>) {
        let mut void_statement = None;
        if let Some(deleted_at) = record.deleted_at() {
            let prior = self
                .cache
                .latest_lookup(&record.latest_entity_key())
                .map(|latest| latest.statement_id.clone());
            match prior {
                Some(prior) => {
                    if let Some(void) = self.voids.void_entity_deletion(
                        &prior,
                        deleted_at,
                        &record.lei,
                        record.exception_reason.as_str(),
                    ) {
                        statement = void;
                    }
                }
                None => {
                    warn!(
                        key = %record.latest_entity_key(),
                        "deletion for a reporting exception with no published statement"
                    );
                }
            }
        } else if let Some(old) = old_exception {
            if old.reason != record.exception_reason.as_str() {
                void_statement = self.voids.void_entity_changed(
                    &old.other_id,
                    &today_iso(),
                    &old.entity_type,
                    &record.lei,
                    &old.reason,
                );
            }
        }
        self.cache
            .latest_save(&record.latest_entity_key(), statement.statement_id(), None);
        (statement, void_statement)
    }

    /// The entity statement IDs an ownership statement references: the subject always,
    /// the interested party only while the relationship report is published.
    fn referenced_ids(record: &RelationshipRecord, statement: &Statement) -> Vec<String> {
        let Statement::Ownership(ooc) = statement else {
            return vec![];
        };
        let mut out = vec![ooc.subject.described_by_entity_statement.clone()];
        if record.registration.registration_status == RegistrationStatus::Published {
            if let InterestedParty::DescribedByEntityStatement(id) = &ooc.interested_party {
                out.push(id.clone());
            }
        }
        out
    }

    /// Dispatch for an ownership statement built from a relationship record.
    fn process_ooc_rr(
        &mut self,
        record: &RelationshipRecord,
        mut statement: Statement,
        entity_voided: bool,
    ) -> (Statement, Option<Statement>) {
        let key = record.relationship_key();
        let start = record.relationship.start_node.node_id.clone();
        let end = record.relationship.end_node.node_id.clone();

        for referenced_id in Self::referenced_ids(record, &statement) {
            self.cache
                .references_update(&referenced_id, statement.statement_id(), &key);
        }

        if self.incremental {
            if let Some(prior) = self
                .cache
                .latest_lookup(&key)
                .map(|latest| latest.statement_id.clone())
            {
                if let Some(deleted_at) = record.deleted_at() {
                    if let Some(void) =
                        self.voids
                            .void_ooc_relationship_deletion(&prior, deleted_at, &start, &end)
                    {
                        statement = void;
                    }
                } else if record.registration.registration_status == RegistrationStatus::Retired {
                    if let Some(void) = self.voids.void_ooc_relationship_retired(
                        &prior,
                        &record.registration.last_update_date,
                        &start,
                        &end,
                    ) {
                        statement = void;
                    }
                } else {
                    self.voids.add_replaces(&mut statement, &prior);
                }
                // The newer relationship supersedes any entity-driven fix-up queued
                // against the prior ownership statement.
                self.cache.updates_delete(&prior);
            }
        }

        let mut void_statement = None;
        if let Some(category) = category_for(record.relationship.relationship_type) {
            let exception_key = format!("{start}_{}", category.as_str());
            if let Some(exception) = self.cache.exception_lookup(&exception_key).cloned() {
                if !entity_voided {
                    void_statement = self.voids.void_entity_replaced(
                        &exception.other_id,
                        &today_iso(),
                        &exception.entity_type,
                        &start,
                        &exception.reason,
                    );
                    self.cache.exception_delete(&exception_key);
                }
            }
        }

        self.cache.latest_save(&key, statement.statement_id(), None);
        (statement, void_statement)
    }

    /// Dispatch for an ownership statement built from a reporting exception.
    fn process_ooc_repex(
        &mut self,
        record: &ReportingException,
        mut statement: Statement,
        old_exception: Option<&ExceptionEntry>,
    ) -> Statement {
        // Exception ownership statements reference the child entity's statement the
        // same way relationship ones do; tracked under a synthetic relationship key
        // (there is no end node) so LEI revisions can queue their fix-ups.
        if let Statement::Ownership(ooc) = &statement {
            let synthetic_key = format!(
                "{}_None_{}",
                record.lei,
                rel_type_for(record.exception_category).as_str()
            );
            self.cache.references_update(
                &ooc.subject.described_by_entity_statement,
                &ooc.statement_id,
                &synthetic_key,
            );
        }
        if let Some(deleted_at) = record.deleted_at() {
            let prior = self
                .cache
                .latest_lookup(&record.latest_ownership_key())
                .map(|latest| latest.statement_id.clone());
            match prior {
                Some(prior) => {
                    if let Some(void) = self.voids.void_ooc_exception_deletion(
                        &prior,
                        deleted_at,
                        &record.lei,
                        record.exception_reason.as_str(),
                    ) {
                        statement = void;
                    }
                }
                None => {
                    warn!(
                        key = %record.latest_ownership_key(),
                        "deletion for a reporting exception with no published statement"
                    );
                }
            }
        } else if let Some(old) = old_exception {
            if old.reason != record.exception_reason.as_str() {
                self.voids.add_replaces(&mut statement, &old.statement_id);
            } else if old
                .reference
                .as_ref()
                .is_some_and(|old_reference| {
                    record.exception_reference.as_ref() != Some(old_reference)
                })
            {
                self.voids.add_replaces(&mut statement, &old.statement_id);
                // A reference-only change keeps the exception series; when the fresh
                // ID collides with the paired entity/person statement's ID, hash once
                // more to keep the pair distinct.
                if statement.statement_id() == old.other_id {
                    let rehashed = statement_id(statement.statement_id(), "ownership");
                    if let Statement::Ownership(ooc) = &mut statement {
                        ooc.statement_id = rehashed;
                    }
                }
            }
        }
        self.cache
            .latest_save(&record.latest_ownership_key(), statement.statement_id(), None);
        statement
    }

    /// Rewrites an ownership statement's entity references per the queued fix-up and
    /// re-derives its ID. Returns the pre-rewrite statement ID.
    fn fix_statement_reference(
        statement: &mut OwnershipStatement,
        updates: &HashMap<String, String>,
        domain_key: &str,
    ) -> String {
        for (old_id, new_id) in updates {
            if statement.subject.described_by_entity_statement == *old_id {
                statement.subject.described_by_entity_statement = new_id.clone();
            }
            if let InterestedParty::DescribedByEntityStatement(id) = &mut statement.interested_party
            {
                if *id == *old_id {
                    *id = new_id.clone();
                }
            }
        }
        let old_statement_id = statement.statement_id.clone();
        let interested = match &statement.interested_party {
            InterestedParty::DescribedByEntityStatement(id)
            | InterestedParty::DescribedByPersonStatement(id) => id.as_str(),
            InterestedParty::Unspecified { .. } => "",
        };
        statement.statement_id = statement_id(
            &format!(
                "{domain_key}_{}_{interested}",
                statement.subject.described_by_entity_statement
            ),
            "ownershipOrControlStatement",
        );
        old_statement_id
    }

    /// Phase 3: drains the pending `updates` index at end of input and flushes the
    /// cache. Returns the rewritten ownership statements to emit.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineError`] when the store cannot be read or written. A fix-up
    /// whose ownership statement is missing from the store is logged and dropped.
    pub async fn finish(&mut self, store: &dyn DocumentStore) -> Result<Vec<Statement>> {
        let mut out = Vec::new();
        let mut done = Vec::new();
        for entry in self.cache.updates_entries() {
            let Some(doc) = store.get(index_names::OWNERSHIP, &entry.referencing_id).await? else {
                let err = PipelineError::inconsistency(
                    index_names::UPDATES,
                    entry.referencing_id.clone(),
                    "pending fix-up references an ownership statement absent from the store",
                );
                warn!(error = %err, "dropping unresolvable fix-up");
                done.push(entry.referencing_id);
                continue;
            };
            let mut statement: OwnershipStatement = serde_json::from_value(doc)?;
            let old_statement_id =
                Self::fix_statement_reference(&mut statement, &entry.updates, &entry.latest_id);
            let mut statement = Statement::Ownership(statement);
            self.voids.add_replaces(&mut statement, &old_statement_id);
            self.cache
                .latest_save(&entry.latest_id, statement.statement_id(), None);
            done.push(old_statement_id);
            out.push(statement);
        }
        for statement_id in &done {
            self.cache.updates_delete(statement_id);
        }
        info!(rewritten = out.len(), "finish drain complete");
        self.cache.flush(store).await?;
        Ok(out)
    }

    /// The number of pending fix-ups currently queued.
    #[must_use]
    pub fn pending_updates(&self) -> usize {
        self.cache.updates_entries().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::enums::{ExceptionReason, RelationshipStatus};
    use crate::model::source::{
        Deletion, Extension, LeiEntity, Registration, Relationship, RelationshipNode,
        SourceAddress,
    };
    use crate::store::MemoryStore;

    const LEI_A: &str = "213800BJPX8V9HVY1Y11";
    const LEI_B: &str = "5493001KJTIIGC8Y1R12";

    fn lei_record(lei: &str, last_update: &str, status: RegistrationStatus) -> SourceRecord {
        SourceRecord::Lei(LeiRecord {
            lei: lei.to_owned(),
            entity: LeiEntity {
                legal_name: String::from("EXAMPLE HOLDINGS PLC"),
                legal_jurisdiction: String::from("GB"),
                legal_address: address(),
                headquarters_address: address(),
                registration_authority: None,
                entity_creation_date: None,
            },
            registration: Registration {
                last_update_date: last_update.to_owned(),
                registration_status: status,
                validation_sources: None,
            },
        })
    }

    fn address() -> SourceAddress {
        SourceAddress {
            first_address_line: String::from("1 Poultry"),
            city: String::from("London"),
            country: String::from("GB"),
            postal_code: None,
        }
    }

    fn rr_record(last_update: &str, status: RegistrationStatus) -> SourceRecord {
        SourceRecord::Relationship(RelationshipRecord {
            relationship: Relationship {
                start_node: RelationshipNode {
                    node_id: LEI_A.to_owned(),
                    node_id_type: Some(String::from("LEI")),
                },
                end_node: RelationshipNode {
                    node_id: LEI_B.to_owned(),
                    node_id_type: Some(String::from("LEI")),
                },
                relationship_type: RelationshipType::IsDirectlyConsolidatedBy,
                relationship_periods: None,
                relationship_status: Some(RelationshipStatus::Active),
            },
            registration: Registration {
                last_update_date: last_update.to_owned(),
                registration_status: status,
                validation_sources: None,
            },
            extension: None,
        })
    }

    fn repex_record(reason: ExceptionReason, content_date: &str) -> SourceRecord {
        SourceRecord::Exception(ReportingException {
            lei: LEI_A.to_owned(),
            exception_category: ExceptionCategory::DirectAccountingConsolidationParent,
            exception_reason: reason,
            exception_reference: None,
            content_date: content_date.to_owned(),
            extension: None,
        })
    }

    fn engine() -> Reconciler {
        Reconciler::new(IndexCache::new(), true)
    }

    #[tokio::test]
    async fn test_new_lei_first_emission() {
        let store = MemoryStore::new();
        let mut engine = engine();
        let record = lei_record(LEI_A, "2023-04-25T13:18:00Z", RegistrationStatus::Issued);
        let statements = engine.process_record(&store, &record).await.unwrap();
        assert_eq!(statements.len(), 1);
        assert_eq!(
            statements[0].statement_id(),
            "e2d096a9-23d5-ab26-0943-44c62c6a6a98"
        );
        assert!(statements[0].replaces().is_none());
        assert_eq!(
            engine
                .cache
                .latest_lookup(LEI_A)
                .map(|latest| latest.statement_id.as_str()),
            Some("e2d096a9-23d5-ab26-0943-44c62c6a6a98")
        );
    }

    #[tokio::test]
    async fn test_lei_revision_replaces_prior() {
        let store = MemoryStore::new();
        let mut engine = engine();
        let first = lei_record(LEI_A, "2023-04-25T13:18:00Z", RegistrationStatus::Issued);
        let prior_id = engine.process_record(&store, &first).await.unwrap()[0]
            .statement_id()
            .to_owned();
        let second = lei_record(LEI_A, "2023-06-18T15:41:20.212Z", RegistrationStatus::Issued);
        let statements = engine.process_record(&store, &second).await.unwrap();
        assert_eq!(statements.len(), 1);
        assert_ne!(statements[0].statement_id(), prior_id);
        assert_eq!(statements[0].replaces(), Some(prior_id.as_str()));
        assert_eq!(
            engine
                .cache
                .latest_lookup(LEI_A)
                .map(|latest| latest.statement_id.as_str()),
            Some(statements[0].statement_id())
        );
    }

    #[tokio::test]
    async fn test_retired_lei_is_voided() {
        let store = MemoryStore::new();
        let mut engine = engine();
        let first = lei_record(LEI_A, "2023-04-25T13:18:00Z", RegistrationStatus::Issued);
        let prior_id = engine.process_record(&store, &first).await.unwrap()[0]
            .statement_id()
            .to_owned();
        let retired = lei_record(LEI_A, "2023-07-01T00:00:00Z", RegistrationStatus::Retired);
        let statements = engine.process_record(&store, &retired).await.unwrap();
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].replaces(), Some(prior_id.as_str()));
        assert_eq!(statements[0].statement_id(), statement_id(&prior_id, "voided"));
        let Statement::Entity(void) = &statements[0] else {
            panic!("void should be an entity statement");
        };
        assert_eq!(void.statement_date, "2023-07-01");
    }

    #[tokio::test]
    async fn test_rr_between_known_leis_updates_references() {
        let store = MemoryStore::new();
        let mut engine = engine();
        let subject_id = engine
            .process_record(
                &store,
                &lei_record(LEI_A, "2023-04-25T13:18:00Z", RegistrationStatus::Issued),
            )
            .await
            .unwrap()[0]
            .statement_id()
            .to_owned();
        let interested_id = engine
            .process_record(
                &store,
                &lei_record(LEI_B, "2023-04-26T09:00:00Z", RegistrationStatus::Issued),
            )
            .await
            .unwrap()[0]
            .statement_id()
            .to_owned();

        let rr = rr_record("2023-05-02T09:10:11Z", RegistrationStatus::Published);
        let statements = engine.process_record(&store, &rr).await.unwrap();
        assert_eq!(statements.len(), 1);
        let Statement::Ownership(ooc) = &statements[0] else {
            panic!("expected an ownership statement");
        };
        assert_eq!(ooc.subject.described_by_entity_statement, subject_id);
        assert_eq!(
            ooc.interested_party,
            InterestedParty::DescribedByEntityStatement(interested_id.clone())
        );
        // Both endpoints now know the referencing ownership statement.
        let key = format!("{LEI_A}_{LEI_B}_IS_DIRECTLY_CONSOLIDATED_BY");
        for referenced in [&subject_id, &interested_id] {
            let entry = engine
                .cache
                .references_lookup(referenced)
                .expect("references entry");
            assert_eq!(
                entry.references_id.get(&ooc.statement_id).map(String::as_str),
                Some(key.as_str())
            );
        }
    }

    #[tokio::test]
    async fn test_lei_update_queues_and_finish_rewrites_dependent_ooc() {
        let store = MemoryStore::new();
        let mut engine = engine();
        engine
            .process_record(
                &store,
                &lei_record(LEI_A, "2023-04-25T13:18:00Z", RegistrationStatus::Issued),
            )
            .await
            .unwrap();
        engine
            .process_record(
                &store,
                &lei_record(LEI_B, "2023-04-26T09:00:00Z", RegistrationStatus::Issued),
            )
            .await
            .unwrap();
        let rr = rr_record("2023-05-02T09:10:11Z", RegistrationStatus::Published);
        let ooc = engine.process_record(&store, &rr).await.unwrap().remove(0);
        // The transform stage mirrors emitted statements into the store.
        store
            .put(
                index_names::OWNERSHIP,
                ooc.statement_id(),
                &serde_json::to_value(&ooc).unwrap(),
            )
            .await
            .unwrap();

        let revision = lei_record(LEI_A, "2023-06-18T15:41:20.212Z", RegistrationStatus::Issued);
        let revised = engine.process_record(&store, &revision).await.unwrap().remove(0);
        assert_eq!(engine.pending_updates(), 1);

        let rewritten = engine.finish(&store).await.unwrap();
        assert_eq!(rewritten.len(), 1);
        let Statement::Ownership(fixed) = &rewritten[0] else {
            panic!("expected an ownership statement");
        };
        assert_eq!(
            fixed.subject.described_by_entity_statement,
            revised.statement_id()
        );
        assert_eq!(rewritten[0].replaces(), Some(ooc.statement_id()));
        assert_ne!(fixed.statement_id, ooc.statement_id());
        assert_eq!(engine.pending_updates(), 0);
        // The rewritten statement becomes the newest for the relationship key.
        let key = format!("{LEI_A}_{LEI_B}_IS_DIRECTLY_CONSOLIDATED_BY");
        assert_eq!(
            engine
                .cache
                .latest_lookup(&key)
                .map(|latest| latest.statement_id.as_str()),
            Some(fixed.statement_id.as_str())
        );
    }

    #[tokio::test]
    async fn test_repex_change_voids_old_series() {
        let store = MemoryStore::new();
        let mut engine = engine();
        let first = repex_record(ExceptionReason::NonConsolidating, "2023-05-01T00:00:00Z");
        let statements = engine.process_record(&store, &first).await.unwrap();
        assert_eq!(statements.len(), 2);
        let old_entity_id = statements[0].statement_id().to_owned();

        let changed = repex_record(ExceptionReason::NaturalPersons, "2023-06-01T00:00:00Z");
        let statements = engine.process_record(&store, &changed).await.unwrap();
        // Void first, then the fresh person + ownership pair.
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[0].replaces(), Some(old_entity_id.as_str()));
        assert!(
            statements[0]
                .statement_id()
                .eq(&statement_id(&old_entity_id, "voided"))
        );
        assert!(matches!(statements[1], Statement::Person(_)));
        let exception = engine
            .cache
            .exception_lookup(&format!("{LEI_A}_DIRECT_ACCOUNTING_CONSOLIDATION_PARENT"))
            .expect("exception entry");
        assert_eq!(exception.reason, "NATURAL_PERSONS");
        assert_eq!(exception.entity_type, "personStatement");
    }

    #[tokio::test]
    async fn test_repex_replaced_by_real_relationship() {
        let store = MemoryStore::new();
        let mut engine = engine();
        let repex = repex_record(ExceptionReason::NonConsolidating, "2023-05-01T00:00:00Z");
        let repex_statements = engine.process_record(&store, &repex).await.unwrap();
        let exception_entity_id = repex_statements[0].statement_id().to_owned();

        let rr = rr_record("2023-06-02T10:00:00Z", RegistrationStatus::Published);
        let statements = engine.process_record(&store, &rr).await.unwrap();
        assert_eq!(statements.len(), 2);
        // The exception's entity statement is voided immediately before the new
        // ownership statement.
        assert_eq!(statements[0].replaces(), Some(exception_entity_id.as_str()));
        assert!(matches!(statements[0], Statement::Entity(_)));
        assert!(matches!(statements[1], Statement::Ownership(_)));
        assert!(
            engine
                .cache
                .exception_lookup(&format!("{LEI_A}_DIRECT_ACCOUNTING_CONSOLIDATION_PARENT"))
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_rr_deletion_voids_with_deletion_date() {
        let store = MemoryStore::new();
        let mut engine = engine();
        let rr = rr_record("2023-05-02T09:10:11Z", RegistrationStatus::Published);
        let prior_id = engine.process_record(&store, &rr).await.unwrap()[0]
            .statement_id()
            .to_owned();

        let SourceRecord::Relationship(mut deleted) =
            rr_record("2023-07-01T00:00:00Z", RegistrationStatus::Published)
        else {
            panic!("fixture should be a relationship record");
        };
        deleted.extension = Some(Extension {
            deletion: Some(Deletion {
                deleted_at: String::from("2023-07-04T08:00:00Z"),
            }),
        });
        let statements = engine
            .process_record(&store, &SourceRecord::Relationship(deleted))
            .await
            .unwrap();
        assert_eq!(statements.len(), 1);
        let Statement::Ownership(void) = &statements[0] else {
            panic!("void should be an ownership statement");
        };
        assert_eq!(void.statement_date, "2023-07-04");
        assert_eq!(statements[0].replaces(), Some(prior_id.as_str()));
        assert_eq!(void.subject.described_by_entity_statement, "");
    }

    #[tokio::test]
    async fn test_snapshot_mode_skips_supersession() {
        let store = MemoryStore::new();
        let mut engine = Reconciler::new(IndexCache::new(), false);
        engine
            .process_record(
                &store,
                &lei_record(LEI_A, "2023-04-25T13:18:00Z", RegistrationStatus::Issued),
            )
            .await
            .unwrap();
        let statements = engine
            .process_record(
                &store,
                &lei_record(LEI_A, "2023-06-18T15:41:20.212Z", RegistrationStatus::Issued),
            )
            .await
            .unwrap();
        // Snapshot loads only seed the indexes; no replaces chains are built.
        assert!(statements[0].replaces().is_none());
        assert_eq!(engine.pending_updates(), 0);
    }

    #[tokio::test]
    async fn test_determinism_across_independent_runs() {
        let records = vec![
            lei_record(LEI_A, "2023-04-25T13:18:00Z", RegistrationStatus::Issued),
            lei_record(LEI_B, "2023-04-26T09:00:00Z", RegistrationStatus::Issued),
            rr_record("2023-05-02T09:10:11Z", RegistrationStatus::Published),
            repex_record(ExceptionReason::NoKnownPerson, "2023-05-03T00:00:00Z"),
        ];
        let mut ids_by_run = Vec::new();
        for _ in 0..2 {
            let store = MemoryStore::new();
            let mut engine = engine();
            let mut ids = Vec::new();
            for record in &records {
                for statement in engine.process_record(&store, record).await.unwrap() {
                    ids.push(statement.statement_id().to_owned());
                }
            }
            for statement in engine.finish(&store).await.unwrap() {
                ids.push(statement.statement_id().to_owned());
            }
            ids_by_run.push(ids);
        }
        assert_eq!(ids_by_run[0], ids_by_run[1]);
    }
}
