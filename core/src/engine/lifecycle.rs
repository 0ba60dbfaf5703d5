// vigil/src/engine/lifecycle.rs

//! Element instance lifecycle and the conditionally active window.
//!
//! The window of an element opens right after ACTIVATED (input mapping has
//! been applied by then) and closes before anything else happens on
//! completion or termination, so output mappings can never reach the
//! element's own catch points.

use super::{ActivateElement, Engine, InstanceMeta, TriggerCommand};
use crate::core::keys::{DefinitionKey, ProcessInstanceKey, ScopeKey, SubscriptionKey};
use crate::core::value::Variables;
use crate::error::{VigilError, VigilResult};
use crate::engine::failure::EvaluationFailure;
use crate::engine::Command;
use crate::log::{ElementIntent, RecordType, SubscriptionIntent};
use crate::scope::{ElementState, ScopeKind};
use crate::subscription::{CatchKind, ConditionalCatchPoint, ConditionalSubscription};
use std::collections::HashSet;
use tracing::{event, instrument, Level};

impl Engine {
  #[instrument(name = "Engine::create_instance", skip(self, variables), err(Display))]
  pub(crate) fn create_instance(
    &mut self,
    definition_key: DefinitionKey,
    variables: &Variables,
  ) -> VigilResult<ProcessInstanceKey> {
    let definition = self.definitions.require(definition_key)?;
    let activation = ActivateElement {
      flow_scope_key: None,
      element_id: definition.bpmn_process_id.clone(),
      kind: ScopeKind::ProcessInstance,
      input: variables.clone(),
      catch_points: definition.catch_points.clone(),
    };
    let meta = InstanceMeta {
      definition_key: Some(definition.key),
      tenant_id: definition.tenant_id.clone(),
    };
    self.activate(activation, Some(meta))
  }

  fn validate_activation(&self, activation: &ActivateElement) -> VigilResult<()> {
    let is_root = activation.flow_scope_key.is_none();
    if is_root != (activation.kind == ScopeKind::ProcessInstance) {
      return Err(VigilError::Configuration {
        key: activation.element_id.clone(),
        message: "exactly the process instance scope has no flow scope".to_string(),
      });
    }
    if let Some(flow_scope_key) = activation.flow_scope_key {
      let flow_scope = self.scopes.require(flow_scope_key)?;
      if flow_scope.state() != ElementState::Activated {
        return Err(VigilError::InvalidLifecycle {
          scope_key: flow_scope_key,
          element_id: flow_scope.element_id().to_string(),
          message: format!("cannot activate a child in state {:?}", flow_scope.state()),
        });
      }
    }
    let mut ids = HashSet::new();
    for point in &activation.catch_points {
      check_placement(point, !is_root)?;
      if !ids.insert(point.catch_event_id.as_str()) {
        return Err(VigilError::Configuration {
          key: point.catch_event_id.clone(),
          message: "catch event declared twice on the same element".to_string(),
        });
      }
    }
    Ok(())
  }

  /// ACTIVATING, input mapping, ACTIVATED, then the window opens.
  #[instrument(name = "Engine::activate", skip_all, fields(element_id = %activation.element_id), err(Display))]
  pub(crate) fn activate(
    &mut self,
    activation: ActivateElement,
    meta: Option<InstanceMeta>,
  ) -> VigilResult<ScopeKey> {
    self.validate_activation(&activation)?;

    let key = self.keys.next_scope_key();
    if activation.flow_scope_key.is_none() {
      let meta = meta.unwrap_or_else(|| InstanceMeta {
        definition_key: None,
        tenant_id: self.config.default_tenant_id.clone(),
      });
      self.instances.insert(key, meta);
    }
    self
      .scopes
      .create_scope(key, activation.flow_scope_key, activation.kind, activation.element_id)?;
    self.write_element(ElementIntent::ElementActivating, key)?;

    self.dispatch_batch(key, &activation.input)?;

    self.scopes.set_state(key, ElementState::Activated)?;
    self.write_element(ElementIntent::ElementActivated, key)?;
    event!(Level::DEBUG, scope_key = %key, "Element activated.");

    self.open_window(key, &activation.catch_points)?;
    Ok(key)
  }

  /// COMPLETING, window closes, output mapping on the flow scope, COMPLETED.
  #[instrument(name = "Engine::complete", skip(self, output), err(Display))]
  pub(crate) fn complete(&mut self, scope_key: ScopeKey, output: &Variables) -> VigilResult<()> {
    let scope = self.scopes.require(scope_key)?;
    let lifecycle_error = |message: String| VigilError::InvalidLifecycle {
      scope_key,
      element_id: scope.element_id().to_string(),
      message,
    };
    if scope.state() != ElementState::Activated {
      return Err(lifecycle_error(format!("cannot complete an element in state {:?}", scope.state())));
    }
    if scope.has_children() {
      return Err(lifecycle_error("cannot complete an element with active children".to_string()));
    }
    let flow_scope = scope.parent_key();
    if flow_scope.is_none() && !output.is_empty() {
      return Err(lifecycle_error("a process instance has no flow scope for output variables".to_string()));
    }

    self.scopes.set_state(scope_key, ElementState::Completing)?;
    self.write_element(ElementIntent::ElementCompleting, scope_key)?;
    self.close_window(scope_key);

    if let Some(flow_scope) = flow_scope {
      self.dispatch_batch(flow_scope, output)?;
    }
    if !self.scopes.contains(scope_key) {
      // The output mapping fired an interrupting catch above this element.
      event!(Level::DEBUG, scope_key = %scope_key, "Element terminated while completing.");
      return Ok(());
    }

    self.write_element(ElementIntent::ElementCompleted, scope_key)?;
    self.remove(scope_key)
  }

  #[instrument(name = "Engine::terminate", skip(self), err(Display))]
  pub(crate) fn terminate(&mut self, scope_key: ScopeKey) -> VigilResult<()> {
    let scope = self.scopes.require(scope_key)?;
    if scope.state() == ElementState::Terminating {
      return Err(VigilError::InvalidLifecycle {
        scope_key,
        element_id: scope.element_id().to_string(),
        message: "element is already terminating".to_string(),
      });
    }
    self.terminate_subtree(scope_key)
  }

  /// TERMINATING, window closes, children terminate in creation order, TERMINATED.
  pub(crate) fn terminate_subtree(&mut self, scope_key: ScopeKey) -> VigilResult<()> {
    self.scopes.set_state(scope_key, ElementState::Terminating)?;
    self.write_element(ElementIntent::ElementTerminating, scope_key)?;
    self.close_window(scope_key);

    for child in self.scopes.children_of(scope_key) {
      self.terminate_subtree(child)?;
    }

    self.write_element(ElementIntent::ElementTerminated, scope_key)?;
    self.remove(scope_key)
  }

  fn remove(&mut self, scope_key: ScopeKey) -> VigilResult<()> {
    let is_root = self.scopes.require(scope_key)?.parent_key().is_none();
    self.scopes.remove_scope(scope_key)?;
    if is_root {
      self.instances.remove(&scope_key);
    }
    Ok(())
  }

  // --- conditionally active window ---

  /// Creates one subscription per catch point, then evaluates them if
  /// evaluate-on-subscribe is enabled.
  pub(crate) fn open_window(
    &mut self,
    scope_key: ScopeKey,
    catch_points: &[ConditionalCatchPoint],
  ) -> VigilResult<Vec<SubscriptionKey>> {
    let mut opened = Vec::with_capacity(catch_points.len());
    for point in catch_points {
      opened.push(self.subscribe(scope_key, point)?);
    }
    if self.config.evaluate_on_subscribe {
      for key in &opened {
        self.evaluate_on_subscribe(*key);
      }
    }
    Ok(opened)
  }

  /// Deletes every subscription evaluated at `scope_key`, writing DELETED for each.
  pub(crate) fn close_window(&mut self, scope_key: ScopeKey) {
    for key in self.subscriptions.keys_for_scope(scope_key) {
      if let Some(subscription) = self.subscriptions.delete(key) {
        self.write_subscription(RecordType::Event, SubscriptionIntent::Deleted, &subscription);
      }
    }
  }

  fn subscribe(&mut self, scope_key: ScopeKey, point: &ConditionalCatchPoint) -> VigilResult<SubscriptionKey> {
    let process_instance_key = self.scopes.require(scope_key)?.process_instance_key();
    let meta = self.instance_meta(process_instance_key);
    let subscription = ConditionalSubscription {
      key: self.keys.next_subscription_key(),
      process_instance_key,
      process_definition_key: meta.definition_key,
      tenant_id: meta.tenant_id,
      scope_key,
      element_instance_key: scope_key,
      catch_event_id: point.catch_event_id.clone(),
      condition: point.condition.clone(),
      variable_names: point.variable_names.clone(),
      variable_events: point.variable_events.clone(),
      interrupting: point.interrupting,
      kind: point.kind.clone(),
    };
    let created = self.subscriptions.create(subscription)?.clone();
    self.write_subscription(RecordType::Event, SubscriptionIntent::Created, &created);
    event!(Level::DEBUG, subscription_key = %created.key, catch_event_id = %created.catch_event_id, "Subscription opened.");
    Ok(created.key)
  }

  /// Queues a TRIGGER follow-up when the new subscription is already satisfied.
  /// Filters do not apply here: there is no variable change to filter.
  fn evaluate_on_subscribe(&mut self, key: SubscriptionKey) {
    let Some(subscription) = self.subscriptions.get(key).cloned() else {
      return;
    };
    if self.evaluate_subscription(&subscription) != Some(true) {
      return;
    }
    self.write_subscription(RecordType::Command, SubscriptionIntent::Trigger, &subscription);
    self.pending.push_back(Command::Trigger(TriggerCommand {
      subscription_key: subscription.key,
      process_instance_key: subscription.process_instance_key,
      catch_event_id: subscription.catch_event_id,
    }));
  }

  /// Evaluates the condition at the subscription's own scope. Failures are
  /// reported to the failure sink and give `None`.
  pub(crate) fn evaluate_subscription(&self, subscription: &ConditionalSubscription) -> Option<bool> {
    let view = self.scopes.view(subscription.scope_key);
    match self.evaluator.evaluate(&subscription.condition, &view) {
      Ok(satisfied) => Some(satisfied),
      Err(error) => {
        self.failures.report(&EvaluationFailure {
          element_id: subscription.catch_event_id.clone(),
          subscription_key: Some(subscription.key),
          scope_key: Some(subscription.scope_key),
          expression: subscription.condition.clone(),
          error,
        });
        None
      }
    }
  }

  /// Opens a single subscription on an already active element.
  #[instrument(name = "Engine::open_single", skip(self, catch_point), fields(catch_event_id = %catch_point.catch_event_id), err(Display))]
  pub(crate) fn open_single(
    &mut self,
    scope_key: ScopeKey,
    catch_point: &ConditionalCatchPoint,
  ) -> VigilResult<SubscriptionKey> {
    let scope = self.scopes.require(scope_key)?;
    if scope.state() != ElementState::Activated {
      return Err(VigilError::InvalidLifecycle {
        scope_key,
        element_id: scope.element_id().to_string(),
        message: format!("cannot open a conditional window in state {:?}", scope.state()),
      });
    }
    check_placement(catch_point, scope.parent_key().is_some())?;
    let opened = self.open_window(scope_key, std::slice::from_ref(catch_point))?;
    opened
      .first()
      .copied()
      .ok_or_else(|| VigilError::Internal("no subscription opened".to_string()))
  }

  #[instrument(name = "Engine::close_single", skip(self), err(Display))]
  pub(crate) fn close_single(&mut self, scope_key: ScopeKey, catch_event_id: &str) -> VigilResult<SubscriptionKey> {
    let key = self
      .subscriptions
      .find(scope_key, catch_event_id)
      .map(|s| s.key)
      .ok_or_else(|| VigilError::NoSubscription {
        scope_key,
        catch_event_id: catch_event_id.to_string(),
      })?;
    if let Some(subscription) = self.subscriptions.delete(key) {
      self.write_subscription(RecordType::Event, SubscriptionIntent::Deleted, &subscription);
    }
    Ok(key)
  }
}

/// Boundary and intermediate catch events take a flow in the flow scope, so
/// only event subprocess starts may sit on a process instance scope.
fn check_placement(point: &ConditionalCatchPoint, has_flow_scope: bool) -> VigilResult<()> {
  if has_flow_scope || matches!(point.kind, CatchKind::EventSubprocessStart { .. }) {
    return Ok(());
  }
  Err(VigilError::Configuration {
    key: point.catch_event_id.clone(),
    message: "only event subprocess start events can be declared on the process scope".to_string(),
  })
}
