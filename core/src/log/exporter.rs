// vigil/src/log/exporter.rs

//! Asynchronous export of the record log.
//!
//! The engine itself is synchronous. Exporters run wherever the host wants
//! them (usually a tokio task) and pull records through an [`ExporterDirector`].

use super::record::Record;
use super::record_log::RecordLog;
use crate::core::shared::Shared;
use crate::error::{VigilError, VigilResult};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{event, instrument, Level};

#[async_trait]
pub trait Exporter: Send + Sync {
  fn id(&self) -> &str;

  /// Receives records in position order. An error stops export for this
  /// exporter; the same record is offered again on the next run.
  async fn export(&self, record: &Record) -> anyhow::Result<()>;
}

struct ExporterSlot {
  exporter: Arc<dyn Exporter>,
  last_exported: u64,
}

/// Feeds every exporter the records it has not seen yet.
pub struct ExporterDirector {
  log: RecordLog,
  slots: Vec<ExporterSlot>,
}

impl ExporterDirector {
  pub fn new(log: RecordLog) -> Self {
    Self { log, slots: Vec::new() }
  }

  pub fn with_exporter(mut self, exporter: Arc<dyn Exporter>) -> Self {
    self.add_exporter(exporter);
    self
  }

  pub fn add_exporter(&mut self, exporter: Arc<dyn Exporter>) {
    event!(Level::DEBUG, exporter = %exporter.id(), "Exporter added.");
    self.slots.push(ExporterSlot {
      exporter,
      last_exported: 0,
    });
  }

  /// Last position acknowledged by `exporter_id`.
  pub fn position(&self, exporter_id: &str) -> Option<u64> {
    self
      .slots
      .iter()
      .find(|slot| slot.exporter.id() == exporter_id)
      .map(|slot| slot.last_exported)
  }

  /// Exports all pending records to all exporters. Returns the number of
  /// records delivered in total.
  #[instrument(name = "ExporterDirector::export_pending", skip_all, fields(exporters = self.slots.len()), err(Display))]
  pub async fn export_pending(&mut self) -> VigilResult<usize> {
    let mut delivered = 0;
    for slot in &mut self.slots {
      // Snapshot first; the log lock must not be held across an await.
      let pending = self.log.records_from(slot.last_exported + 1);
      for record in pending {
        slot
          .exporter
          .export(&record)
          .await
          .map_err(|source| VigilError::ExporterFailure {
            exporter: slot.exporter.id().to_string(),
            position: record.position,
            source,
          })?;
        slot.last_exported = record.position;
        delivered += 1;
      }
    }
    event!(Level::DEBUG, delivered, "Export run finished.");
    Ok(delivered)
  }
}

/// Exporter keeping every record in memory.
#[derive(Debug, Clone)]
pub struct RecordingExporter {
  id: String,
  records: Shared<Vec<Record>>,
}

impl RecordingExporter {
  pub fn new(id: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      records: Shared::default(),
    }
  }

  pub fn records(&self) -> Vec<Record> {
    self.records.read().clone()
  }
}

#[async_trait]
impl Exporter for RecordingExporter {
  fn id(&self) -> &str {
    &self.id
  }

  async fn export(&self, record: &Record) -> anyhow::Result<()> {
    self.records.write().push(record.clone());
    Ok(())
  }
}
