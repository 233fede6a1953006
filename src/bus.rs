//! # Inter-Stage Bus ([`RecordBus`]) - Record hand-off between stages.
//!
//! The ingest stage pushes newly-seen source records onto a bus; the transform stage
//! pulls them off. On the wire a record is one JSON line carrying its `recordType`
//! discriminant, so any broker that preserves per-partition ordering can stand behind
//! the trait. Lines that fail to decode are logged and skipped — a poisoned record
//! must never stall the stream.
//!
//! [`MemoryBus`] is the in-process implementation used by tests and single-machine
//! runs; a hosted stream broker can implement the same trait without the stages
//! noticing.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::warn;

use crate::error::{PipelineError, Result};
use crate::model::SourceRecord;

/// The record hand-off seam between the ingest and transform stages.
#[async_trait]
pub trait RecordBus: Send + Sync {
    /// Enqueues one record.
    async fn put(&self, record: &SourceRecord) -> Result<()>;

    /// Dequeues the next record, skipping undecodable lines; `None` once the bus is
    /// closed and drained.
    async fn next(&self) -> Result<Option<SourceRecord>>;

    /// Closes the producing side; readers drain what is queued and then see `None`.
    async fn close(&self);
}

/// An in-process [`RecordBus`] carrying JSON lines over an unbounded channel.
#[derive(Debug)]
pub struct MemoryBus {
    tx: Mutex<Option<UnboundedSender<String>>>,
    rx: Mutex<UnboundedReceiver<String>>,
}

impl MemoryBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(rx),
        }
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordBus for MemoryBus {
    async fn put(&self, record: &SourceRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;
        let closed = || {
            PipelineError::IoError(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "bus is closed",
            ))
        };
        let tx = self.tx.lock().await;
        let tx = tx.as_ref().ok_or_else(closed)?;
        tx.send(line).map_err(|_| closed())
    }

    async fn next(&self) -> Result<Option<SourceRecord>> {
        let mut rx = self.rx.lock().await;
        loop {
            let Some(line) = rx.recv().await else {
                return Ok(None);
            };
            match serde_json::from_str(&line) {
                Ok(record) => return Ok(Some(record)),
                Err(err) => {
                    warn!(error = %err, "skipping undecodable bus record");
                }
            }
        }
    }

    async fn close(&self) {
        self.tx.lock().await.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lei_record() -> SourceRecord {
        serde_json::from_str(include_str!("../tests/data/records/lei_new.json"))
            .expect("fixture should deserialize")
    }

    #[tokio::test]
    async fn test_put_then_next_round_trips() {
        let bus = MemoryBus::new();
        let record = lei_record();
        bus.put(&record).await.unwrap();
        bus.close().await;
        assert_eq!(bus.next().await.unwrap(), Some(record));
        assert_eq!(bus.next().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_undecodable_lines_are_skipped() {
        let bus = MemoryBus::new();
        {
            let tx = bus.tx.lock().await;
            tx.as_ref().unwrap().send(String::from("{not json")).unwrap();
        }
        bus.put(&lei_record()).await.unwrap();
        bus.close().await;
        // The poisoned line is dropped, the valid record still arrives.
        assert!(bus.next().await.unwrap().is_some());
        assert_eq!(bus.next().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_after_close_errors() {
        let bus = MemoryBus::new();
        bus.close().await;
        assert!(bus.put(&lei_record()).await.is_err());
    }
}
