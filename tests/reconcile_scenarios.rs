//! End-to-end reconciliation scenarios over the in-memory store and bus.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use gleif_bods::bus::{MemoryBus, RecordBus};
use gleif_bods::cache::IndexCache;
use gleif_bods::identifier::statement_id;
use gleif_bods::model::{SourceRecord, Statement};
use gleif_bods::pipeline::{BusSource, IngestStage, TransformStage};
use gleif_bods::reconcile::Reconciler;
use gleif_bods::store::{DocumentStore, MemoryStore, index_names};
use serde_json::json;

const LEI_A: &str = "213800BJPX8V9HVY1Y11";
const LEI_B: &str = "5493001KJTIIGC8Y1R12";

fn lei_record(lei: &str, last_update: &str, status: &str) -> SourceRecord {
    serde_json::from_value(json!({
        "recordType": "lei",
        "LEI": lei,
        "Entity": {
            "LegalName": "EXAMPLE HOLDINGS PLC",
            "LegalJurisdiction": "GB",
            "LegalAddress": {"FirstAddressLine": "1 Poultry", "City": "London", "Country": "GB"},
            "HeadquartersAddress": {"FirstAddressLine": "1 Poultry", "City": "London", "Country": "GB"}
        },
        "Registration": {
            "LastUpdateDate": last_update,
            "RegistrationStatus": status,
            "ValidationSources": "FULLY_CORROBORATED"
        }
    }))
    .expect("record should deserialize")
}

fn rr_record(start: &str, end: &str, last_update: &str, status: &str) -> SourceRecord {
    serde_json::from_value(json!({
        "recordType": "rr",
        "Relationship": {
            "StartNode": {"NodeID": start, "NodeIDType": "LEI"},
            "EndNode": {"NodeID": end, "NodeIDType": "LEI"},
            "RelationshipType": "IS_DIRECTLY_CONSOLIDATED_BY",
            "RelationshipStatus": "ACTIVE"
        },
        "Registration": {
            "LastUpdateDate": last_update,
            "RegistrationStatus": status,
            "ValidationSources": "FULLY_CORROBORATED"
        }
    }))
    .expect("record should deserialize")
}

fn repex_record(lei: &str, reason: &str, content_date: &str) -> SourceRecord {
    serde_json::from_value(json!({
        "recordType": "repex",
        "LEI": lei,
        "ExceptionCategory": "DIRECT_ACCOUNTING_CONSOLIDATION_PARENT",
        "ExceptionReason": reason,
        "ContentDate": content_date
    }))
    .expect("record should deserialize")
}

fn deleted_repex(lei: &str, reason: &str, content_date: &str, deleted_at: &str) -> SourceRecord {
    serde_json::from_value(json!({
        "recordType": "repex",
        "LEI": lei,
        "ExceptionCategory": "DIRECT_ACCOUNTING_CONSOLIDATION_PARENT",
        "ExceptionReason": reason,
        "ContentDate": content_date,
        "Extension": {"Deletion": {"DeletedAt": deleted_at}}
    }))
    .expect("record should deserialize")
}

/// Runs the engine over the given records, mirrors emissions into the store the way
/// the stage sink does, drains the finish phase, and returns everything emitted.
async fn run_transform(
    store: &Arc<MemoryStore>,
    records: Vec<SourceRecord>,
) -> Vec<Statement> {
    let mut cache = IndexCache::new();
    cache.load(store.as_ref()).await.expect("cache load");
    let mut engine = Reconciler::new(cache, true);
    let mut emitted = Vec::new();
    for record in &records {
        emitted.extend(
            engine
                .process_record(store.as_ref(), record)
                .await
                .expect("record should process"),
        );
    }
    // Mirror emitted statements into the store the way the stage sink does, so the
    // finish drain can re-read them.
    for statement in &emitted {
        store
            .create(
                statement.store_index(),
                statement.statement_id(),
                &serde_json::to_value(statement).expect("statement serializes"),
            )
            .await
            .expect("statement stored");
    }
    emitted.extend(engine.finish(store.as_ref()).await.expect("finish drain"));
    emitted
}

#[tokio::test]
async fn test_lei_update_with_dependent_ooc_rewrites_on_finish() {
    let store = Arc::new(MemoryStore::new());
    // Seed: two entities and the relationship between them.
    let first = run_transform(
        &store,
        vec![
            lei_record(LEI_A, "2023-04-25T13:18:00Z", "ISSUED"),
            lei_record(LEI_B, "2023-04-26T09:00:00Z", "ISSUED"),
            rr_record(LEI_A, LEI_B, "2023-05-02T09:10:11Z", "PUBLISHED"),
        ],
    )
    .await;
    assert_eq!(first.len(), 3);
    let original_ooc = first[2].clone();

    // A later revision of the subject LEI queues a fix-up that finish() resolves.
    let second = run_transform(
        &store,
        vec![lei_record(LEI_A, "2023-06-18T15:41:20.212Z", "ISSUED")],
    )
    .await;
    assert_eq!(second.len(), 2);
    let revised_entity = &second[0];
    assert_eq!(revised_entity.replaces(), Some(first[0].statement_id()));
    let Statement::Ownership(rewritten) = &second[1] else {
        panic!("finish should emit a rewritten ownership statement");
    };
    assert_eq!(
        rewritten.subject.described_by_entity_statement,
        revised_entity.statement_id()
    );
    assert_eq!(second[1].replaces(), Some(original_ooc.statement_id()));

    // After the drain the updates index is empty, in memory and in the store.
    let pending = store.scan(index_names::UPDATES).await.expect("scan updates");
    assert!(pending.is_empty(), "updates index should be drained: {pending:?}");
}

#[tokio::test]
async fn test_replaces_chain_has_one_successor_per_predecessor() {
    let store = Arc::new(MemoryStore::new());
    let emitted = run_transform(
        &store,
        vec![
            lei_record(LEI_A, "2023-04-25T13:18:00Z", "ISSUED"),
            lei_record(LEI_B, "2023-04-26T09:00:00Z", "ISSUED"),
            rr_record(LEI_A, LEI_B, "2023-05-02T09:10:11Z", "PUBLISHED"),
            lei_record(LEI_A, "2023-06-18T15:41:20.212Z", "ISSUED"),
            lei_record(LEI_A, "2023-07-01T08:00:00Z", "RETIRED"),
            repex_record(LEI_B, "NON_CONSOLIDATING", "2023-07-02T00:00:00Z"),
            repex_record(LEI_B, "NATURAL_PERSONS", "2023-08-01T00:00:00Z"),
        ],
    )
    .await;

    let emitted_ids: Vec<&str> = emitted.iter().map(Statement::statement_id).collect();
    let mut replaced: HashMap<&str, &str> = HashMap::new();
    for statement in &emitted {
        if let Some(prior) = statement.replaces() {
            let duplicate = replaced.insert(prior, statement.statement_id());
            assert!(
                duplicate.is_none(),
                "{prior} was superseded twice, by {} and {}",
                duplicate.unwrap(),
                statement.statement_id()
            );
            // Every replaced statement was emitted earlier in the run (this scenario
            // starts from an empty store).
            let prior_pos = emitted_ids.iter().position(|id| *id == prior);
            let own_pos = emitted_ids
                .iter()
                .position(|id| *id == statement.statement_id());
            assert!(
                prior_pos.is_some() && prior_pos < own_pos,
                "{prior} should have been emitted before its successor"
            );
        }
    }

    // At most one void per prior ID: void statement IDs are derived from the prior,
    // so distinct replaced targets also mean distinct voids.
    let mut seen = HashSet::new();
    for statement in &emitted {
        assert!(seen.insert(statement.statement_id().to_owned()), "duplicate emission");
    }
}

#[tokio::test]
async fn test_repex_deletion_voids_both_series() {
    let store = Arc::new(MemoryStore::new());
    let first = run_transform(
        &store,
        vec![repex_record(LEI_A, "NO_KNOWN_PERSON", "2023-05-01T00:00:00Z")],
    )
    .await;
    assert_eq!(first.len(), 2);
    let person_id = first[0].statement_id().to_owned();
    let ooc_id = first[1].statement_id().to_owned();

    let second = run_transform(
        &store,
        vec![deleted_repex(
            LEI_A,
            "NO_KNOWN_PERSON",
            "2023-06-01T00:00:00Z",
            "2023-06-02T12:00:00Z",
        )],
    )
    .await;
    assert_eq!(second.len(), 2);
    // Deletion voids replace both halves of the pair, dated by the deletion.
    assert_eq!(second[0].replaces(), Some(person_id.as_str()));
    assert_eq!(second[0].statement_id(), statement_id(&person_id, "voided"));
    assert_eq!(second[1].replaces(), Some(ooc_id.as_str()));
    assert_eq!(
        second[1].statement_id(),
        statement_id(&ooc_id, "voided_ownershipOrControlStatement")
    );
    let Statement::Ownership(void_ooc) = &second[1] else {
        panic!("second statement should be an ownership void");
    };
    assert_eq!(void_ooc.statement_date, "2023-06-02");
}

#[tokio::test]
async fn test_two_stage_replay_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let records = vec![
        lei_record(LEI_A, "2023-04-25T13:18:00Z", "ISSUED"),
        lei_record(LEI_B, "2023-04-26T09:00:00Z", "ISSUED"),
        rr_record(LEI_A, LEI_B, "2023-05-02T09:10:11Z", "PUBLISHED"),
        repex_record("213800WAVVOPS85N2205", "NO_LEI", "2023-05-03T00:00:00Z"),
    ];

    let mut new_statements_per_run = Vec::new();
    for _ in 0..2 {
        // Ingest: byte-identical records dedup against the raw indexes, so the second
        // pass forwards nothing to the bus.
        let bus = Arc::new(MemoryBus::new());
        let forwarded = {
            let dedup = gleif_bods::ingest::Deduplicator::new(store.clone());
            let mut count = 0;
            for record in &records {
                if dedup.first_seen(record).await.expect("dedup") {
                    bus.put(record).await.expect("bus put");
                    count += 1;
                }
            }
            count
        };
        bus.close().await;

        let mut cache = IndexCache::new();
        cache.load(store.as_ref()).await.expect("cache load");
        let engine = Reconciler::new(cache, true);
        let report = TransformStage::new(
            store.clone(),
            Box::new(BusSource::new("gleif", bus)),
            engine,
        )
        .run()
        .await
        .expect("transform stage");
        new_statements_per_run.push((forwarded, report.new));
    }

    let (first_forwarded, first_new) = new_statements_per_run[0];
    assert_eq!(first_forwarded, 4);
    assert_eq!(first_new, 5, "three records plus the repex pair");
    let (second_forwarded, second_new) = new_statements_per_run[1];
    assert_eq!(second_forwarded, 0);
    assert_eq!(second_new, 0);
}

#[tokio::test]
async fn test_ingest_stage_reports_and_run_records() {
    let store = Arc::new(MemoryStore::new());
    let bus = Arc::new(MemoryBus::new());
    struct VecSource(Vec<SourceRecord>);
    #[async_trait::async_trait]
    impl gleif_bods::pipeline::RecordSource for VecSource {
        fn name(&self) -> &str {
            "vec"
        }
        async fn next(&mut self) -> gleif_bods::error::Result<Option<SourceRecord>> {
            Ok(self.0.pop())
        }
    }
    let records = vec![
        lei_record(LEI_A, "2023-04-25T13:18:00Z", "ISSUED"),
        lei_record(LEI_A, "2023-04-25T13:18:00Z", "ISSUED"),
    ];
    let report = IngestStage::new(store.clone(), bus.clone(), vec![Box::new(VecSource(records))])
        .run()
        .await
        .expect("ingest stage");
    assert_eq!(report.processed, 2);
    assert_eq!(report.new, 1);
    let runs = store.scan(index_names::RUNS).await.expect("scan runs");
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0]["stage_name"], "ingest");
}

#[tokio::test]
async fn test_seed_recovers_lei_and_update_date() {
    let record = lei_record(LEI_A, "2023-04-25T13:18:00Z", "ISSUED");
    let seed = record.record_id();
    let (lei, update_date) = seed.split_once('_').expect("seed should split");
    assert_eq!(lei, LEI_A);
    assert_eq!(update_date, "2023-04-25T13:18:00Z");
    // The statement ID derived from that seed is the published one.
    assert_eq!(
        statement_id(&seed, "entityStatement"),
        "e2d096a9-23d5-ab26-0943-44c62c6a6a98"
    );
}
