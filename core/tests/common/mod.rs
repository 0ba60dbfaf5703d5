// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use serde_json::Value;
use std::sync::Arc;
use tracing::Level;
use vigil::{
  ActivateElement, CollectingFailureSink, ConditionalCatchPoint, ElementCommand, Engine, EngineConfig,
  ProcessInstanceKey, ScopeKey, ScopeKind, Variables,
};

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Engine fixtures ---

/// An engine whose evaluation failures are collected for assertions.
pub fn engine_with_sink(config: EngineConfig) -> (Engine, Arc<CollectingFailureSink>) {
  let sink = Arc::new(CollectingFailureSink::new());
  let engine = Engine::new(config).unwrap().with_failure_sink(sink.clone());
  (engine, sink)
}

/// Starts an ad-hoc process instance (no deployed definition).
pub fn start_root(engine: &mut Engine) -> ProcessInstanceKey {
  engine
    .activate_element(ActivateElement::root("process"))
    .expect("root activation should succeed")
}

/// Activates an activity below `flow_scope` owning the given catch points.
pub fn activate_task(
  engine: &mut Engine,
  flow_scope: ScopeKey,
  element_id: &str,
  catch_points: Vec<ConditionalCatchPoint>,
) -> ScopeKey {
  activate_scope(engine, flow_scope, element_id, ScopeKind::Activity, catch_points)
}

pub fn activate_scope(
  engine: &mut Engine,
  flow_scope: ScopeKey,
  element_id: &str,
  kind: ScopeKind,
  catch_points: Vec<ConditionalCatchPoint>,
) -> ScopeKey {
  let activation = catch_points
    .into_iter()
    .fold(ActivateElement::new(flow_scope, element_id, kind), |activation, point| {
      activation.catch_point(point)
    });
  engine
    .activate_element(activation)
    .unwrap_or_else(|e| panic!("activation of '{}' failed: {}", element_id, e))
}

pub fn vars(pairs: &[(&str, Value)]) -> Variables {
  pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

/// Source element ids of every ACTIVATE_FLOW command, in log order.
pub fn activated_flows(engine: &Engine) -> Vec<String> {
  engine
    .log()
    .element_commands()
    .into_iter()
    .filter_map(|command| match command {
      ElementCommand::ActivateFlow { source_element_id, .. } => Some(source_element_id),
      _ => None,
    })
    .collect()
}

/// Element ids of every TERMINATE_ELEMENT command, in log order.
pub fn terminated_by_command(engine: &Engine) -> Vec<String> {
  engine
    .log()
    .element_commands()
    .into_iter()
    .filter_map(|command| match command {
      ElementCommand::TerminateElement { element_id, .. } => Some(element_id),
      _ => None,
    })
    .collect()
}
