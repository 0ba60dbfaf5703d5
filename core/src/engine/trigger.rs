// vigil/src/engine/trigger.rs

//! Effects of a fired subscription, per catch kind.
//!
//! | kind                   | interrupting                                   | non-interrupting              |
//! |------------------------|------------------------------------------------|-------------------------------|
//! | boundary               | terminate the activity, then take the boundary | take the boundary             |
//! | event subprocess start | interrupt the scope, then instantiate          | instantiate                   |
//! | intermediate catch     | complete the element and take its flow         | (same)                        |
//!
//! Interrupting boundary and event subprocess subscriptions are consumed at
//! TRIGGERED; non-interrupting ones stay armed. An intermediate catch
//! subscription is deleted when its element completes.

use super::{Engine, TriggerCommand};
use crate::core::keys::{ScopeKey, SubscriptionKey};
use crate::core::value::Variables;
use crate::error::{VigilError, VigilResult};
use crate::log::{ElementCommand, ElementIntent, ElementKind, ElementRecord, RecordType, RecordValue, SubscriptionIntent};
use crate::scope::{ElementState, ScopeKind};
use crate::subscription::{CatchKind, ConditionalSubscription};
use tracing::{event, instrument, Level};

impl Engine {
  /// Handles a TRIGGER command. `external` commands get their TRIGGER record
  /// here; follow-ups had it written when they were queued.
  #[instrument(name = "Engine::process_trigger", skip_all, fields(subscription_key = %command.subscription_key), err(Display))]
  pub(crate) fn process_trigger(&mut self, command: &TriggerCommand, external: bool) -> VigilResult<SubscriptionKey> {
    let subscription = self
      .subscriptions
      .get(command.subscription_key)
      .filter(|s| {
        s.process_instance_key == command.process_instance_key && s.catch_event_id == command.catch_event_id
      })
      .cloned()
      .ok_or_else(|| VigilError::SubscriptionNotFound {
        subscription_key: command.subscription_key,
        process_instance_key: command.process_instance_key,
        catch_event_id: command.catch_event_id.clone(),
      })?;

    if external {
      self.write_subscription(RecordType::Command, SubscriptionIntent::Trigger, &subscription);
    }
    let key = subscription.key;
    self.fire(subscription)?;
    Ok(key)
  }

  /// Writes TRIGGERED and applies the effect of `subscription`.
  pub(crate) fn fire(&mut self, subscription: ConditionalSubscription) -> VigilResult<()> {
    // Boundary and intermediate catch events leave into the flow scope of
    // their element; check it exists before anything is written.
    let flow_scope = match subscription.kind {
      CatchKind::EventSubprocessStart { .. } => None,
      CatchKind::Boundary | CatchKind::IntermediateCatch => {
        Some(self.scopes.parent_of(subscription.scope_key).ok_or_else(|| VigilError::InvalidLifecycle {
          scope_key: subscription.scope_key,
          element_id: subscription.catch_event_id.clone(),
          message: "catch event has no flow scope".to_string(),
        })?)
      }
    };

    let consumed = subscription.interrupting && subscription.kind != CatchKind::IntermediateCatch;
    if consumed {
      self.subscriptions.delete(subscription.key);
    }
    self.write_subscription(RecordType::Event, SubscriptionIntent::Triggered, &subscription);
    event!(
      Level::DEBUG,
      subscription_key = %subscription.key,
      catch_event_id = %subscription.catch_event_id,
      interrupting = subscription.interrupting,
      "Conditional subscription triggered."
    );

    match (&subscription.kind, flow_scope) {
      (CatchKind::Boundary, Some(flow_scope)) => self.fire_boundary(&subscription, flow_scope),
      (CatchKind::IntermediateCatch, Some(flow_scope)) => self.fire_intermediate(&subscription, flow_scope),
      (CatchKind::EventSubprocessStart { subprocess_id }, _) => {
        self.fire_event_subprocess(&subscription, subprocess_id)
      }
      (_, None) => Err(VigilError::Internal(format!(
        "no flow scope resolved for '{}'",
        subscription.catch_event_id
      ))),
    }
  }

  fn fire_boundary(&mut self, subscription: &ConditionalSubscription, flow_scope: ScopeKey) -> VigilResult<()> {
    let attached = subscription.scope_key;
    if subscription.interrupting {
      let element_id = self.scopes.require(attached)?.element_id().to_string();
      self.write_element_command(
        Some(attached.value()),
        ElementCommand::TerminateElement {
          element_instance_key: attached,
          element_id,
        },
      );
      self.terminate_subtree(attached)?;
    }
    self.pass_through_event(flow_scope, &subscription.catch_event_id, ElementKind::BoundaryEvent)?;
    self.activate_flow(&subscription.catch_event_id, flow_scope)
  }

  fn fire_event_subprocess(&mut self, subscription: &ConditionalSubscription, subprocess_id: &str) -> VigilResult<()> {
    let scope_key = subscription.scope_key;
    if subscription.interrupting {
      // The scope is interrupted: no other event subprocess may start in it.
      let siblings: Vec<SubscriptionKey> = self
        .subscriptions
        .for_scope(scope_key)
        .into_iter()
        .filter(|s| matches!(s.kind, CatchKind::EventSubprocessStart { .. }))
        .map(|s| s.key)
        .collect();
      for key in siblings {
        if let Some(deleted) = self.subscriptions.delete(key) {
          self.write_subscription(RecordType::Event, SubscriptionIntent::Deleted, &deleted);
        }
      }

      for child in self.scopes.children_of(scope_key) {
        let element_id = self.scopes.require(child)?.element_id().to_string();
        self.write_element_command(
          Some(child.value()),
          ElementCommand::TerminateElement {
            element_instance_key: child,
            element_id,
          },
        );
        self.terminate_subtree(child)?;
      }
    }
    self
      .instantiate_event_subprocess(scope_key, subprocess_id, &subscription.catch_event_id)
      .map(|_| ())
  }

  fn fire_intermediate(&mut self, subscription: &ConditionalSubscription, flow_scope: ScopeKey) -> VigilResult<()> {
    let element_key = subscription.scope_key;
    let element_id = self.scopes.require(element_key)?.element_id().to_string();
    self.write_element_command(
      Some(element_key.value()),
      ElementCommand::CompleteElement {
        element_instance_key: element_key,
        element_id: element_id.clone(),
      },
    );
    self.complete(element_key, &Variables::new())?;
    self.activate_flow(&element_id, flow_scope)
  }

  /// Creates the event subprocess scope below `flow_scope` and takes the flow
  /// of its start event.
  fn instantiate_event_subprocess(
    &mut self,
    flow_scope: ScopeKey,
    subprocess_id: &str,
    start_event_id: &str,
  ) -> VigilResult<ScopeKey> {
    self.write_element_command(
      Some(flow_scope.value()),
      ElementCommand::InstantiateEventSubprocess {
        flow_scope_key: flow_scope,
        subprocess_id: subprocess_id.to_string(),
        start_event_id: start_event_id.to_string(),
      },
    );

    let key = self.keys.next_scope_key();
    self
      .scopes
      .create_scope(key, Some(flow_scope), ScopeKind::EventSubProcess, subprocess_id)?;
    self.write_element(ElementIntent::ElementActivating, key)?;
    self.scopes.set_state(key, ElementState::Activated)?;
    self.write_element(ElementIntent::ElementActivated, key)?;

    self.pass_through_event(key, start_event_id, ElementKind::StartEvent)?;
    self.activate_flow(start_event_id, key)?;
    Ok(key)
  }

  /// Lifecycle records of an event that owns no scope: it is activated and
  /// completed in one step inside `flow_scope`.
  pub(crate) fn pass_through_event(
    &mut self,
    flow_scope: ScopeKey,
    element_id: &str,
    kind: ElementKind,
  ) -> VigilResult<ScopeKey> {
    let process_instance_key = self.scopes.require(flow_scope)?.process_instance_key();
    let meta = self.instance_meta(process_instance_key);
    let key = self.keys.next_scope_key();
    let element = ElementRecord {
      element_id: element_id.to_string(),
      kind,
      flow_scope_key: Some(flow_scope),
      process_instance_key,
      process_definition_key: meta.definition_key,
      tenant_id: meta.tenant_id,
    };
    for intent in [
      ElementIntent::ElementActivating,
      ElementIntent::ElementActivated,
      ElementIntent::ElementCompleting,
      ElementIntent::ElementCompleted,
    ] {
      self.log.append(
        Some(key.value()),
        RecordType::Event,
        RecordValue::ProcessInstance {
          intent,
          element: element.clone(),
        },
        None,
      );
    }
    Ok(key)
  }

  pub(crate) fn activate_flow(&mut self, source_element_id: &str, flow_scope: ScopeKey) -> VigilResult<()> {
    let process_instance_key = self.scopes.require(flow_scope)?.process_instance_key();
    self.write_element_command(
      Some(flow_scope.value()),
      ElementCommand::ActivateFlow {
        source_element_id: source_element_id.to_string(),
        flow_scope_key: flow_scope,
        process_instance_key,
      },
    );
    Ok(())
  }
}
