//! # Stage Driver ([`pipeline`](crate::pipeline)) - Composing sources, engine and sinks.
//!
//! A pipeline run is two stages:
//!
//! - the **ingest stage** streams raw records from its sources through the
//!   [`Deduplicator`](crate::ingest::Deduplicator) and forwards first-sightings to the
//!   bus;
//! - the **transform stage** pulls records off the bus, runs each through the
//!   [`Reconciler`](crate::reconcile::Reconciler), and feeds emitted statements into a
//!   batched new-if-absent sink over the statement store. At end of input it flushes
//!   the sink (so the finish drain can re-read same-run statements), drains the
//!   engine's pending fix-ups, and flushes everything again.
//!
//! Both stages record a [`RunRecord`] when they complete; the presence of a prior
//! completed transform run is what switches the engine from snapshot seeding to
//! incremental reconciliation. Per-record failures of the skippable kinds (malformed
//! records, index inconsistencies) are logged and counted, never fatal.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::bus::RecordBus;
use crate::error::Result;
use crate::identifier::now_iso;
use crate::ingest::Deduplicator;
use crate::model::index::{IndexedDoc, RunRecord};
use crate::model::{SourceRecord, Statement};
use crate::reconcile::Reconciler;
use crate::store::{BulkAction, DocumentStore, index_names};

/// Output batches flush once they hold more than this many statements.
const SINK_WATERMARK: usize = 485;

/// A stream of source records feeding a stage.
#[async_trait]
pub trait RecordSource: Send {
    /// The source name, used in log lines.
    fn name(&self) -> &str;

    /// The next record, or `None` at end of input. Undecodable items are skipped by
    /// the source itself.
    async fn next(&mut self) -> Result<Option<SourceRecord>>;
}

/// A [`RecordSource`] reading tagged JSON lines from a file.
pub struct JsonLinesSource {
    name: String,
    lines: std::io::Lines<BufReader<File>>,
}

impl JsonLinesSource {
    /// Opens a JSON-lines file of tagged source records.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::PipelineError`] when the file cannot be opened.
    pub fn open(name: &str, path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            name: name.to_owned(),
            lines: BufReader::new(file).lines(),
        })
    }
}

#[async_trait]
impl RecordSource for JsonLinesSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn next(&mut self) -> Result<Option<SourceRecord>> {
        for line in self.lines.by_ref() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(record) => return Ok(Some(record)),
                Err(err) => {
                    warn!(source = %self.name, error = %err, "skipping undecodable record");
                }
            }
        }
        Ok(None)
    }
}

/// A [`RecordSource`] pulling from the inter-stage bus.
pub struct BusSource {
    name: String,
    bus: Arc<dyn RecordBus>,
}

impl BusSource {
    /// Wraps a bus as a stage source.
    #[must_use]
    pub fn new(name: &str, bus: Arc<dyn RecordBus>) -> Self {
        Self {
            name: name.to_owned(),
            bus,
        }
    }
}

#[async_trait]
impl RecordSource for BusSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn next(&mut self) -> Result<Option<SourceRecord>> {
        self.bus.next().await
    }
}

/// Batched new-if-absent sink over the statement store.
///
/// Statements accumulate per statement index and go out through the bulk API as
/// `create` actions; an ID that already exists simply doesn't land, which is what
/// makes replayed runs produce zero new statements.
pub struct StatementSink {
    store: Arc<dyn DocumentStore>,
    batches: [(&'static str, Vec<BulkAction>); 3],
    processed: usize,
    new: usize,
}

impl StatementSink {
    /// Creates a sink writing to the statement indexes of `store`.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            batches: [
                (index_names::ENTITY, Vec::new()),
                (index_names::PERSON, Vec::new()),
                (index_names::OWNERSHIP, Vec::new()),
            ],
            processed: 0,
            new: 0,
        }
    }

    /// Queues a statement, flushing its index batch past the watermark.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::PipelineError`] when a flush fails.
    pub async fn add(&mut self, statement: &Statement) -> Result<()> {
        self.processed += 1;
        let index = statement.store_index();
        let action = BulkAction::Create {
            id: statement.statement_id().to_owned(),
            doc: serde_json::to_value(statement)?,
        };
        let queued = {
            let batch = &mut self
                .batches
                .iter_mut()
                .find(|(name, _)| *name == index)
                .expect("statement indexes are fixed")
                .1;
            batch.push(action);
            batch.len()
        };
        if queued > SINK_WATERMARK {
            self.flush_index(index).await?;
        }
        Ok(())
    }

    async fn flush_index(&mut self, index: &'static str) -> Result<()> {
        let batch = &mut self
            .batches
            .iter_mut()
            .find(|(name, _)| *name == index)
            .expect("statement indexes are fixed")
            .1;
        if batch.is_empty() {
            return Ok(());
        }
        let actions = std::mem::take(batch);
        let outcomes = self.store.bulk(index, actions).await?;
        self.new += outcomes.iter().filter(|outcome| outcome.applied).count();
        Ok(())
    }

    /// Drains all batches.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::PipelineError`] when a bulk write fails.
    pub async fn flush(&mut self) -> Result<()> {
        for index in [index_names::ENTITY, index_names::PERSON, index_names::OWNERSHIP] {
            self.flush_index(index).await?;
        }
        Ok(())
    }

    /// Statements queued so far this run.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.processed
    }

    /// Statements that actually landed as new documents.
    #[must_use]
    pub fn new_statements(&self) -> usize {
        self.new
    }
}

/// The newest completed run of a stage, if any.
///
/// # Errors
///
/// Returns a [`crate::error::PipelineError`] when the runs index cannot be scanned.
pub async fn last_run(store: &dyn DocumentStore, stage_name: &str) -> Result<Option<RunRecord>> {
    let mut newest: Option<RunRecord> = None;
    for doc in store.scan(index_names::RUNS).await? {
        let Ok(run) = serde_json::from_value::<RunRecord>(doc) else {
            continue;
        };
        if run.stage_name == stage_name
            && newest
                .as_ref()
                .is_none_or(|best| run.start_timestamp > best.start_timestamp)
        {
            newest = Some(run);
        }
    }
    Ok(newest)
}

async fn record_run(store: &dyn DocumentStore, stage_name: &str, started: String) -> Result<()> {
    let run = RunRecord {
        stage_name: stage_name.to_owned(),
        start_timestamp: started,
        end_timestamp: now_iso(),
    };
    store
        .put(index_names::RUNS, &run.doc_id(), &serde_json::to_value(&run)?)
        .await
}

/// Counters reported at the end of a stage run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StageReport {
    /// Records read from the sources.
    pub processed: usize,
    /// Records (ingest) or statements (transform) that were new this run.
    pub new: usize,
    /// Records skipped over malformed content or index inconsistencies.
    pub skipped: usize,
}

/// The ingest stage: deduplicate raw records and forward first-sightings to the bus.
pub struct IngestStage {
    store: Arc<dyn DocumentStore>,
    bus: Arc<dyn RecordBus>,
    sources: Vec<Box<dyn RecordSource>>,
}

impl IngestStage {
    /// Composes an ingest stage.
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        bus: Arc<dyn RecordBus>,
        sources: Vec<Box<dyn RecordSource>>,
    ) -> Self {
        Self { store, bus, sources }
    }

    /// Runs the stage to completion and records the run.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::PipelineError`] on backend failure; malformed records are skipped
    /// and counted instead.
    pub async fn run(mut self) -> Result<StageReport> {
        let started = now_iso();
        let dedup = Deduplicator::new(self.store.clone());
        let mut report = StageReport::default();
        for source in &mut self.sources {
            info!(source = source.name(), "processing ingest source");
            while let Some(record) = source.next().await? {
                report.processed += 1;
                match dedup.first_seen(&record).await {
                    Ok(true) => {
                        self.bus.put(&record).await?;
                        report.new += 1;
                    }
                    Ok(false) => {}
                    Err(err) if err.is_malformed() => {
                        warn!(error = %err, "skipping malformed record");
                        report.skipped += 1;
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        record_run(self.store.as_ref(), "ingest", started).await?;
        info!(
            processed = report.processed,
            new = report.new,
            skipped = report.skipped,
            "ingest stage finished"
        );
        Ok(report)
    }
}

/// The transform stage: reconcile records off the bus into BODS statements.
pub struct TransformStage {
    store: Arc<dyn DocumentStore>,
    source: Box<dyn RecordSource>,
    engine: Reconciler,
}

impl TransformStage {
    /// Composes a transform stage around a hydrated engine.
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        source: Box<dyn RecordSource>,
        engine: Reconciler,
    ) -> Self {
        Self { store, source, engine }
    }

    /// Runs the stage to completion: streams records through the engine, drains the
    /// finish phase, flushes all batches, and records the run.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::error::PipelineError`] on backend failure; malformed records and index
    /// inconsistencies are skipped and counted instead.
    pub async fn run(mut self) -> Result<StageReport> {
        let started = now_iso();
        let mut sink = StatementSink::new(self.store.clone());
        let mut report = StageReport::default();
        while let Some(record) = self.source.next().await? {
            report.processed += 1;
            match self.engine.process_record(self.store.as_ref(), &record).await {
                Ok(statements) => {
                    for statement in &statements {
                        sink.add(statement).await?;
                    }
                }
                Err(err) if err.is_malformed() || err.is_inconsistency() => {
                    warn!(kind = record.kind(), error = %err, "skipping record");
                    report.skipped += 1;
                }
                Err(err) => return Err(err),
            }
        }
        // Same-run ownership statements must be visible before the finish drain
        // re-reads them from the store.
        sink.flush().await?;
        for statement in self.engine.finish(self.store.as_ref()).await? {
            sink.add(&statement).await?;
        }
        sink.flush().await?;
        report.new = sink.new_statements();
        record_run(self.store.as_ref(), "transform", started).await?;
        info!(
            processed = report.processed,
            new = report.new,
            skipped = report.skipped,
            "transform stage finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MemoryBus;
    use crate::cache::IndexCache;
    use crate::store::MemoryStore;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lei_line() -> String {
        let value: serde_json::Value =
            serde_json::from_str(include_str!("../tests/data/records/lei_new.json"))
                .expect("fixture should deserialize");
        value.to_string()
    }

    #[tokio::test]
    async fn test_ingest_forwards_only_first_sightings() {
        let store = Arc::new(MemoryStore::new());
        let bus = Arc::new(MemoryBus::new());
        let file = tempfile_with_lines(&[lei_line(), lei_line()]);
        let source = JsonLinesSource::open("lei", file.path()).expect("open source");
        let report = IngestStage::new(store.clone(), bus.clone(), vec![Box::new(source)])
            .run()
            .await
            .unwrap();
        assert_eq!(report.processed, 2);
        assert_eq!(report.new, 1);
        bus.close().await;
        assert!(bus.next().await.unwrap().is_some());
        assert!(bus.next().await.unwrap().is_none());
        file.close().expect("close temp file");
    }

    #[tokio::test]
    async fn test_transform_stage_end_to_end() {
        let store = Arc::new(MemoryStore::new());
        let bus = Arc::new(MemoryBus::new());
        let record: SourceRecord = serde_json::from_str(&lei_line()).unwrap();
        bus.put(&record).await.unwrap();
        bus.close().await;

        let engine = Reconciler::new(IndexCache::new(), true);
        let stage = TransformStage::new(
            store.clone(),
            Box::new(BusSource::new("gleif", bus)),
            engine,
        );
        let report = stage.run().await.unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.new, 1);
        assert_eq!(store.len(index_names::ENTITY), 1);
        assert_eq!(store.len(index_names::LATEST), 1);
        let run = last_run(store.as_ref(), "transform").await.unwrap();
        assert!(run.is_some());
    }

    #[tokio::test]
    async fn test_replay_produces_zero_new_statements() {
        let store = Arc::new(MemoryStore::new());
        for _ in 0..2 {
            let bus = Arc::new(MemoryBus::new());
            let record: SourceRecord = serde_json::from_str(&lei_line()).unwrap();
            bus.put(&record).await.unwrap();
            bus.close().await;
            let mut cache = IndexCache::new();
            cache.load(store.as_ref()).await.unwrap();
            let engine = Reconciler::new(cache, true);
            TransformStage::new(store.clone(), Box::new(BusSource::new("gleif", bus)), engine)
                .run()
                .await
                .unwrap();
        }
        // The identical record maps to the identical statement ID, so the second run
        // creates nothing.
        assert_eq!(store.len(index_names::ENTITY), 1);
    }

    fn tempfile_with_lines(lines: &[String]) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("create temp file");
        for line in lines {
            writeln!(file, "{line}").expect("write temp line");
        }
        file
    }
}
