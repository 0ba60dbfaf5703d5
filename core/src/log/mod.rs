// vigil/src/log/mod.rs

//! The append-only record log and its exporters.

pub mod exporter;
pub mod record;
pub mod record_log;

pub use exporter::{Exporter, ExporterDirector, RecordingExporter};
pub use record::{
  DeploymentIntent, ElementCommand, ElementIntent, ElementKind, ElementRecord, EvaluationIntent, EvaluationRecord,
  Record, RecordType, RecordValue, Rejection, StartedInstance, SubscriptionIntent, VariableIntent, VariableRecord,
};
pub use record_log::RecordLog;
