//! Pipeline entry point.
//!
//! Runs the ingest stage, the transform stage, or both back-to-back over an in-process
//! bus, against the document store configured in the environment:
//!
//! ```text
//! gleif-bods [ingest|transform|all]
//! ```
//!
//! The ingest stage reads tagged JSON-lines files (`lei.jsonl`, `rr.jsonl`,
//! `repex.jsonl`) from the configured data directory. A standalone `transform` run is
//! only useful for draining pending fix-ups, since the in-process bus starts empty.

use std::sync::Arc;

use tracing::info;

use gleif_bods::bus::{MemoryBus, RecordBus};
use gleif_bods::cache::IndexCache;
use gleif_bods::config::PipelineConfig;
use gleif_bods::elastic::ElasticStore;
use gleif_bods::pipeline::{BusSource, IngestStage, JsonLinesSource, TransformStage, last_run};
use gleif_bods::reconcile::Reconciler;
use gleif_bods::store::index_names;

const ALL_INDEXES: [&str; 11] = [
    index_names::LEI,
    index_names::RR,
    index_names::REPEX,
    index_names::ENTITY,
    index_names::PERSON,
    index_names::OWNERSHIP,
    index_names::LATEST,
    index_names::REFERENCES,
    index_names::UPDATES,
    index_names::EXCEPTIONS,
    index_names::RUNS,
];

async fn run_ingest(
    config: &PipelineConfig,
    store: Arc<ElasticStore>,
    bus: Arc<MemoryBus>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut sources: Vec<Box<dyn gleif_bods::pipeline::RecordSource>> = Vec::new();
    for kind in ["lei", "rr", "repex"] {
        let path = config.data_dir.join(format!("{kind}.jsonl"));
        if path.is_file() {
            sources.push(Box::new(JsonLinesSource::open(kind, &path)?));
        } else {
            info!(kind, path = %path.display(), "no source file, skipping");
        }
    }
    let report = IngestStage::new(store, bus, sources).run().await?;
    info!(new = report.new, processed = report.processed, "ingest done");
    Ok(())
}

async fn run_transform(
    store: Arc<ElasticStore>,
    bus: Arc<MemoryBus>,
) -> Result<(), Box<dyn std::error::Error>> {
    let incremental = last_run(store.as_ref(), "transform").await?.is_some();
    let mut cache = IndexCache::new();
    cache.load(store.as_ref()).await?;
    let engine = Reconciler::new(cache, incremental);
    let report = TransformStage::new(store, Box::new(BusSource::new("gleif", bus)), engine)
        .run()
        .await?;
    info!(
        new = report.new,
        processed = report.processed,
        skipped = report.skipped,
        "transform done"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let stage = std::env::args().nth(1).unwrap_or_else(|| String::from("all"));
    let config = PipelineConfig::from_env();
    let store = Arc::new(ElasticStore::new(&config)?);
    for index in ALL_INDEXES {
        store.ensure_index(index).await?;
    }
    let bus = Arc::new(MemoryBus::new());

    match stage.as_str() {
        "ingest" => {
            run_ingest(&config, store, bus.clone()).await?;
            bus.close().await;
        }
        "transform" => {
            bus.close().await;
            run_transform(store, bus).await?;
        }
        "all" => {
            run_ingest(&config, store.clone(), bus.clone()).await?;
            bus.close().await;
            run_transform(store, bus).await?;
        }
        other => {
            eprintln!("unknown stage `{other}`; expected ingest, transform or all");
            std::process::exit(2);
        }
    }
    Ok(())
}
