// vigil/examples/conditional_start.rs

use std::sync::Arc;
use tracing::{info, warn};
use vigil::{
  CollectingFailureSink, ConditionalCatchPoint, ConditionalStartCommand, ConditionalStartEvent, Engine, EngineConfig,
  ProcessModel, VigilError,
};

fn main() -> Result<(), VigilError> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();
  info!("--- Conditional Start Example ---");

  let failures = Arc::new(CollectingFailureSink::new());
  let mut engine = Engine::new(EngineConfig::default())?.with_failure_sink(failures.clone());

  engine.deploy(
    ProcessModel::new("fraud_review")
      .conditional_start(ConditionalStartEvent::new("large_payment", "amount >= 10000"))
      .event_subprocess(
        ConditionalCatchPoint::event_subprocess_start("escalate", "escalation", "risk_score > 80").non_interrupting(),
      ),
  )?;

  for amount in [500, 25000] {
    let started = engine.evaluate_conditional_start(ConditionalStartCommand::new().variable("amount", amount))?;
    info!(amount, started = started.len(), "Payment evaluated.");

    for instance in started {
      let summary = engine.set_variable(instance, "risk_score", 93)?;
      info!(%instance, escalations = summary.triggered().len(), "Risk score recorded.");
    }
  }

  // Conditions that cannot be evaluated count as false and are reported.
  engine.evaluate_conditional_start(ConditionalStartCommand::new().variable("currency", "EUR"))?;
  for failure in failures.failures() {
    warn!(element_id = %failure.element_id, error = %failure.error, "Condition could not be evaluated.");
  }

  Ok(())
}
