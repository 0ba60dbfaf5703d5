// vigil/examples/boundary_conditions.rs

use std::sync::Arc;
use tracing::info;
use vigil::{
  ActivateElement, ConditionalCatchPoint, ElementCommand, Engine, EngineConfig, ExporterDirector, RecordingExporter,
  ScopeKind, VigilError,
};

#[tokio::main]
async fn main() -> Result<(), VigilError> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
  info!("--- Boundary Conditions Example ---");

  let mut engine = Engine::new(EngineConfig::from_env()?)?;
  let recording = Arc::new(RecordingExporter::new("stdout"));
  let mut director = ExporterDirector::new(engine.log()).with_exporter(recording.clone());

  // A shipping subprocess that is cancelled once the order is void, with a
  // packing task inside that sends a reminder whenever it runs late.
  let root = engine.activate_element(ActivateElement::root("order_fulfilment").input("void", false))?;
  let shipping = engine.activate_element(
    ActivateElement::new(root, "shipping", ScopeKind::SubProcess)
      .catch_point(ConditionalCatchPoint::boundary("order_voided", "void = true")),
  )?;
  let packing = engine.activate_element(
    ActivateElement::new(shipping, "packing", ScopeKind::Activity).catch_point(
      ConditionalCatchPoint::boundary("packing_late", "minutes_waiting > 30")
        .non_interrupting()
        .with_variable_names(["minutes_waiting"]),
    ),
  )?;

  for minutes in [10, 45, 60] {
    let summary = engine.set_variable(packing, "minutes_waiting", minutes)?;
    info!(minutes, triggered = summary.triggered().len(), "Packing progress reported.");
  }

  // Voiding the order interrupts the subprocess and everything inside it.
  engine.set_variable(root, "void", true)?;
  info!(
    shipping_alive = engine.scopes().contains(shipping),
    packing_alive = engine.scopes().contains(packing),
    "Order voided."
  );

  for command in engine.log().element_commands() {
    if let ElementCommand::ActivateFlow { source_element_id, .. } = command {
      info!(%source_element_id, "Host should take the outgoing flow.");
    }
  }

  let exported = director.export_pending().await?;
  info!(exported, recorded = recording.records().len(), "Records exported.");
  Ok(())
}
