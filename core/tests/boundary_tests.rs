// tests/boundary_tests.rs
mod common;

use common::*;
use vigil::{
  CandidateOutcome, ConditionalCatchPoint, ElementIntent, EngineConfig, ScopeKind, SubscriptionIntent,
};

#[test]
fn non_interrupting_boundary_triggers_on_every_satisfying_write() {
  setup_tracing();
  let (mut engine, _sink) = engine_with_sink(EngineConfig::default());
  let root = start_root(&mut engine);
  let task = activate_task(
    &mut engine,
    root,
    "A",
    vec![ConditionalCatchPoint::boundary("boundary", "x > 10").non_interrupting()],
  );

  engine.set_variable(task, "x", 11).unwrap();
  engine.set_variable(task, "x", 12).unwrap();
  engine.complete_element(task, Default::default()).unwrap();

  let log = engine.log();
  assert_eq!(log.triggered_count("boundary"), 2);
  assert!(log
    .subscriptions(SubscriptionIntent::Triggered)
    .iter()
    .all(|s| s.catch_event_id == "boundary"));
  assert_eq!(
    log.element_intents("A"),
    vec![
      ElementIntent::ElementActivating,
      ElementIntent::ElementActivated,
      ElementIntent::ElementCompleting,
      ElementIntent::ElementCompleted,
    ]
  );
  assert_eq!(activated_flows(&engine), vec!["boundary", "boundary"]);
  assert!(engine.subscriptions().is_empty());
}

#[test]
fn interrupting_boundary_on_subprocess_preempts_inner_boundary() {
  setup_tracing();
  let (mut engine, _sink) = engine_with_sink(EngineConfig::default());
  let root = start_root(&mut engine);
  let sub = activate_scope(
    &mut engine,
    root,
    "S",
    ScopeKind::SubProcess,
    vec![ConditionalCatchPoint::boundary("outer", "x > 10")],
  );
  let task = activate_task(
    &mut engine,
    sub,
    "T",
    vec![ConditionalCatchPoint::boundary("inner", "x > 10")],
  );

  let summary = engine.set_variable(sub, "x", 11).unwrap();

  assert_eq!(summary.candidates.len(), 2);
  assert_eq!(summary.candidates[0].1, CandidateOutcome::Triggered);
  assert_eq!(summary.candidates[1].1, CandidateOutcome::Stale);

  let log = engine.log();
  assert_eq!(log.triggered_count("outer"), 1);
  assert_eq!(log.triggered_count("inner"), 0);
  assert_eq!(log.element_intents("T").last(), Some(&ElementIntent::ElementTerminated));
  assert_eq!(log.element_intents("S").last(), Some(&ElementIntent::ElementTerminated));
  assert!(!engine.scopes().contains(sub));
  assert!(!engine.scopes().contains(task));
  assert_eq!(terminated_by_command(&engine), vec!["S"]);
  assert_eq!(activated_flows(&engine), vec!["outer"]);
  assert!(engine.subscriptions().is_empty());
}

#[test]
fn interrupting_boundary_terminates_children_before_the_activity() {
  setup_tracing();
  let (mut engine, _sink) = engine_with_sink(EngineConfig::default());
  let root = start_root(&mut engine);
  let sub = activate_scope(
    &mut engine,
    root,
    "S",
    ScopeKind::SubProcess,
    vec![ConditionalCatchPoint::boundary("cancel", "cancelled = true")],
  );
  activate_task(&mut engine, sub, "T", vec![]);

  engine.set_variable(root, "cancelled", true).unwrap();

  let order: Vec<(String, ElementIntent)> = engine
    .log()
    .records()
    .iter()
    .filter_map(|r| r.element())
    .filter(|(intent, _)| {
      matches!(intent, ElementIntent::ElementTerminating | ElementIntent::ElementTerminated)
    })
    .map(|(intent, element)| (element.element_id.clone(), intent))
    .collect();
  assert_eq!(
    order,
    vec![
      ("S".to_string(), ElementIntent::ElementTerminating),
      ("T".to_string(), ElementIntent::ElementTerminating),
      ("T".to_string(), ElementIntent::ElementTerminated),
      ("S".to_string(), ElementIntent::ElementTerminated),
    ]
  );
}

#[test]
fn boundary_records_pass_through_the_flow_scope() {
  setup_tracing();
  let (mut engine, _sink) = engine_with_sink(EngineConfig::default());
  let root = start_root(&mut engine);
  let task = activate_task(
    &mut engine,
    root,
    "A",
    vec![ConditionalCatchPoint::boundary("boundary", "x > 10")],
  );

  engine.set_variable(task, "x", 11).unwrap();

  let boundary_events: Vec<_> = engine
    .log()
    .records()
    .iter()
    .filter_map(|r| r.element())
    .filter(|(_, e)| e.element_id == "boundary")
    .map(|(intent, e)| (intent, e.flow_scope_key))
    .collect();
  assert_eq!(
    boundary_events,
    vec![
      (ElementIntent::ElementActivating, Some(root)),
      (ElementIntent::ElementActivated, Some(root)),
      (ElementIntent::ElementCompleting, Some(root)),
      (ElementIntent::ElementCompleted, Some(root)),
    ]
  );
  // Consumed when it triggered; terminating the activity deletes nothing more.
  assert!(engine.log().subscriptions(SubscriptionIntent::Deleted).is_empty());
}

#[test]
fn subscription_sees_variables_written_above_its_scope() {
  setup_tracing();
  let (mut engine, _sink) = engine_with_sink(EngineConfig::default());
  let root = start_root(&mut engine);
  let task = activate_task(
    &mut engine,
    root,
    "A",
    vec![ConditionalCatchPoint::boundary("boundary", "limit < total").non_interrupting()],
  );

  engine.set_variable(task, "limit", 5).unwrap();
  assert_eq!(engine.log().triggered_count("boundary"), 0);

  let summary = engine.set_variable(root, "total", 10).unwrap();
  assert_eq!(summary.triggered().len(), 1);
}

#[test]
fn local_variable_shadows_the_ancestor_value() {
  setup_tracing();
  let (mut engine, _sink) = engine_with_sink(EngineConfig::default());
  let root = start_root(&mut engine);
  let task = activate_task(
    &mut engine,
    root,
    "A",
    vec![ConditionalCatchPoint::boundary("boundary", "x > 10").non_interrupting()],
  );

  engine.set_variable(task, "x", 1).unwrap();
  let summary = engine.set_variable(root, "x", 100).unwrap();

  assert_eq!(summary.count(CandidateOutcome::NotSatisfied), 1);
  assert_eq!(engine.log().triggered_count("boundary"), 0);
}
