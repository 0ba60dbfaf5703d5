// vigil/src/log/record_log.rs

use super::record::{
  ElementCommand, ElementIntent, Record, RecordType, RecordValue, Rejection, SubscriptionIntent,
};
use crate::core::shared::Shared;
use crate::error::VigilResult;
use crate::subscription::ConditionalSubscription;
use tracing::{event, Level};

/// Append-only record log.
///
/// Cloning yields another handle to the same log, so exporters and observers
/// can read while the engine appends. Positions start at 1 and never repeat.
#[derive(Debug, Clone, Default)]
pub struct RecordLog {
  records: Shared<Vec<Record>>,
}

impl RecordLog {
  pub fn new() -> Self {
    Self::default()
  }

  /// Position the next appended record will get.
  pub fn next_position(&self) -> u64 {
    self.records.read().len() as u64 + 1
  }

  pub fn len(&self) -> usize {
    self.records.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.read().is_empty()
  }

  pub(crate) fn append(
    &self,
    key: Option<u64>,
    record_type: RecordType,
    value: RecordValue,
    rejection: Option<Rejection>,
  ) -> u64 {
    let mut records = self.records.write();
    let position = records.len() as u64 + 1;
    event!(Level::TRACE, position, ?record_type, "Appending record.");
    records.push(Record {
      position,
      key,
      record_type,
      value,
      rejection,
    });
    position
  }

  /// Snapshot of every record.
  pub fn records(&self) -> Vec<Record> {
    self.records.read().clone()
  }

  /// Snapshot of the records at `position` and after.
  pub fn records_from(&self, position: u64) -> Vec<Record> {
    let start = position.saturating_sub(1) as usize;
    self.records.map_read(|records| records.get(start..).unwrap_or(&[])).to_vec()
  }

  pub fn record_at(&self, position: u64) -> Option<Record> {
    let idx = position.checked_sub(1)? as usize;
    self.records.read().get(idx).cloned()
  }

  /// Conditional subscription records with `intent`, in log order.
  pub fn subscriptions(&self, intent: SubscriptionIntent) -> Vec<ConditionalSubscription> {
    self
      .records
      .read()
      .iter()
      .filter_map(|r| r.subscription())
      .filter(|(i, _)| *i == intent)
      .map(|(_, s)| s.clone())
      .collect()
  }

  /// Number of TRIGGERED records for `catch_event_id`.
  pub fn triggered_count(&self, catch_event_id: &str) -> usize {
    self
      .subscriptions(SubscriptionIntent::Triggered)
      .iter()
      .filter(|s| s.catch_event_id == catch_event_id)
      .count()
  }

  /// Lifecycle intents recorded for `element_id`, in log order.
  pub fn element_intents(&self, element_id: &str) -> Vec<ElementIntent> {
    self
      .records
      .read()
      .iter()
      .filter_map(|r| r.element())
      .filter(|(_, e)| e.element_id == element_id)
      .map(|(intent, _)| intent)
      .collect()
  }

  pub fn element_commands(&self) -> Vec<ElementCommand> {
    self
      .records
      .read()
      .iter()
      .filter_map(|r| r.element_command().cloned())
      .collect()
  }

  pub fn rejections(&self) -> Vec<Record> {
    self.records.read().iter().filter(|r| r.is_rejection()).cloned().collect()
  }

  /// The whole log as JSON. Equal logs give equal bytes.
  pub fn to_json_bytes(&self) -> VigilResult<Vec<u8>> {
    Ok(serde_json::to_vec(&*self.records.read())?)
  }
}
