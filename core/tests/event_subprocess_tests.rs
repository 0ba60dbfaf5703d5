// tests/event_subprocess_tests.rs
mod common;

use common::*;
use serde_json::json;
use vigil::{
  ConditionalCatchPoint, ElementCommand, ElementIntent, EngineConfig, ProcessModel, ScopeKind, SubscriptionIntent,
  Variables,
};

fn deploy_with_event_subprocess(engine: &mut vigil::Engine, catch_point: ConditionalCatchPoint) -> vigil::DefinitionKey {
  engine
    .deploy(ProcessModel::new("order").event_subprocess(catch_point))
    .expect("deployment should succeed")
}

#[test]
fn interrupting_event_subprocess_interrupts_the_process_scope() {
  setup_tracing();
  let (mut engine, _sink) = engine_with_sink(EngineConfig::default());
  let definition = deploy_with_event_subprocess(
    &mut engine,
    ConditionalCatchPoint::event_subprocess_start("escalate", "escalation", "x > 5"),
  );
  let root = engine.create_process_instance(definition, Variables::new()).unwrap();
  let task = activate_task(&mut engine, root, "A", vec![]);

  let summary = engine.set_variable(root, "x", 6).unwrap();
  assert_eq!(summary.triggered().len(), 1);

  let log = engine.log();
  assert_eq!(log.triggered_count("escalate"), 1);
  assert_eq!(log.element_intents("A").last(), Some(&ElementIntent::ElementTerminated));
  assert!(!engine.scopes().contains(task));
  assert_eq!(
    log.element_intents("escalation"),
    vec![ElementIntent::ElementActivating, ElementIntent::ElementActivated]
  );

  let children = engine.scopes().children_of(root);
  assert_eq!(children.len(), 1);
  let esp = engine.scopes().get(children[0]).unwrap();
  assert_eq!(esp.kind(), ScopeKind::EventSubProcess);
  assert_eq!(esp.element_id(), "escalation");

  assert!(log.element_commands().contains(&ElementCommand::InstantiateEventSubprocess {
    flow_scope_key: root,
    subprocess_id: "escalation".to_string(),
    start_event_id: "escalate".to_string(),
  }));
  assert_eq!(activated_flows(&engine), vec!["escalate"]);
  // Consumed: a second satisfying write does nothing.
  engine.set_variable(root, "x", 7).unwrap();
  assert_eq!(engine.log().triggered_count("escalate"), 1);
}

#[test]
fn interrupting_event_subprocess_deletes_sibling_start_subscriptions() {
  setup_tracing();
  let (mut engine, _sink) = engine_with_sink(EngineConfig::default());
  let definition = engine
    .deploy(
      ProcessModel::new("order")
        .event_subprocess(ConditionalCatchPoint::event_subprocess_start("first", "esp1", "x > 5"))
        .event_subprocess(ConditionalCatchPoint::event_subprocess_start("second", "esp2", "x > 5").non_interrupting()),
    )
    .unwrap();
  let root = engine.create_process_instance(definition, Variables::new()).unwrap();

  engine.set_variable(root, "x", 6).unwrap();

  let log = engine.log();
  assert_eq!(log.triggered_count("first"), 1);
  assert_eq!(log.triggered_count("second"), 0);
  let deleted: Vec<String> = log
    .subscriptions(SubscriptionIntent::Deleted)
    .into_iter()
    .map(|s| s.catch_event_id)
    .collect();
  assert_eq!(deleted, vec!["second"]);
  assert!(engine.subscriptions().is_empty());
}

#[test]
fn non_interrupting_event_subprocess_starts_one_occurrence_per_trigger() {
  setup_tracing();
  let (mut engine, _sink) = engine_with_sink(EngineConfig::default());
  let definition = deploy_with_event_subprocess(
    &mut engine,
    ConditionalCatchPoint::event_subprocess_start("notify", "notification", "x > 5").non_interrupting(),
  );
  let root = engine.create_process_instance(definition, Variables::new()).unwrap();
  let task = activate_task(&mut engine, root, "A", vec![]);

  engine.set_variable(root, "x", 6).unwrap();
  engine.set_variable(root, "x", 7).unwrap();

  assert_eq!(engine.log().triggered_count("notify"), 2);
  assert!(engine.scopes().contains(task));
  let occurrences = engine
    .scopes()
    .children_of(root)
    .into_iter()
    .filter(|key| engine.scopes().get(*key).map(|s| s.kind()) == Some(ScopeKind::EventSubProcess))
    .count();
  assert_eq!(occurrences, 2);
  assert_eq!(engine.subscriptions().len(), 1);
}

#[test]
fn subscriptions_carry_definition_and_tenant() {
  setup_tracing();
  let (mut engine, _sink) = engine_with_sink(EngineConfig::default());
  let definition = engine
    .deploy(
      ProcessModel::new("order")
        .tenant("acme")
        .event_subprocess(ConditionalCatchPoint::event_subprocess_start("s", "esp", "x > 5")),
    )
    .unwrap();
  let root = engine.create_process_instance(definition, Variables::new()).unwrap();

  let created = engine.log().subscriptions(SubscriptionIntent::Created);
  assert_eq!(created.len(), 1);
  assert_eq!(created[0].process_definition_key, Some(definition));
  assert_eq!(created[0].tenant_id, "acme");
  assert_eq!(created[0].process_instance_key, root);
  assert_eq!(created[0].scope_key, root);
}

#[test]
fn event_subprocess_inside_a_subprocess_keeps_the_outer_flow_running() {
  setup_tracing();
  let (mut engine, _sink) = engine_with_sink(EngineConfig::default());
  let root = start_root(&mut engine);
  let outer_task = activate_task(&mut engine, root, "outer", vec![]);
  let sub = activate_scope(
    &mut engine,
    root,
    "S",
    ScopeKind::SubProcess,
    vec![ConditionalCatchPoint::event_subprocess_start("s", "inner_esp", "done = true")],
  );
  let inner_task = activate_task(&mut engine, sub, "inner", vec![]);

  engine
    .apply_variables(sub, vars(&[("done", json!(true))]))
    .unwrap();

  assert!(engine.scopes().contains(outer_task));
  assert!(engine.scopes().contains(sub));
  assert!(!engine.scopes().contains(inner_task));
  assert_eq!(engine.log().element_intents("outer"), vec![
    ElementIntent::ElementActivating,
    ElementIntent::ElementActivated,
  ]);
}
