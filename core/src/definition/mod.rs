// vigil/src/definition/mod.rs

//! Deployed process definitions.
//!
//! Only the parts of a process model the engine acts on are kept: the
//! conditional event-subprocess start events of the process scope and the
//! conditional start events of the process itself.

pub mod registry;

pub use registry::ProcessDefinitionRegistry;

use crate::core::keys::DefinitionKey;
use crate::core::value::{VariableEvent, Variables};
use crate::subscription::ConditionalCatchPoint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A root-level conditional start event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalStartEvent {
  pub element_id: String,
  pub condition: String,
  pub variable_names: BTreeSet<String>,
  pub variable_events: BTreeSet<VariableEvent>,
}

impl ConditionalStartEvent {
  pub fn new(element_id: impl Into<String>, condition: impl Into<String>) -> Self {
    Self {
      element_id: element_id.into(),
      condition: condition.into(),
      variable_names: BTreeSet::new(),
      variable_events: BTreeSet::new(),
    }
  }

  pub fn with_variable_names<I, S>(mut self, names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.variable_names.extend(names.into_iter().map(Into::into));
    self
  }

  pub fn with_variable_events(mut self, events: impl IntoIterator<Item = VariableEvent>) -> Self {
    self.variable_events.extend(events);
    self
  }

  /// Filter check for a root-level evaluation. Every supplied variable counts
  /// as a `create`.
  pub fn accepts(&self, variables: &Variables) -> bool {
    let names_match =
      self.variable_names.is_empty() || variables.keys().any(|name| self.variable_names.contains(name));
    let events_match = self.variable_events.is_empty() || self.variable_events.contains(&VariableEvent::Create);
    names_match && events_match
  }
}

/// What gets deployed. The registry assigns the key, version and tenant.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessModel {
  pub bpmn_process_id: String,
  pub tenant_id: Option<String>,
  pub catch_points: Vec<ConditionalCatchPoint>,
  pub start_events: Vec<ConditionalStartEvent>,
}

impl ProcessModel {
  pub fn new(bpmn_process_id: impl Into<String>) -> Self {
    Self {
      bpmn_process_id: bpmn_process_id.into(),
      ..Default::default()
    }
  }

  pub fn tenant(mut self, tenant_id: impl Into<String>) -> Self {
    self.tenant_id = Some(tenant_id.into());
    self
  }

  /// Adds a conditional event-subprocess start event of the process scope.
  pub fn event_subprocess(mut self, catch_point: ConditionalCatchPoint) -> Self {
    self.catch_points.push(catch_point);
    self
  }

  pub fn conditional_start(mut self, start_event: ConditionalStartEvent) -> Self {
    self.start_events.push(start_event);
    self
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDefinition {
  pub key: DefinitionKey,
  pub bpmn_process_id: String,
  pub version: u32,
  pub tenant_id: String,
  pub catch_points: Vec<ConditionalCatchPoint>,
  pub start_events: Vec<ConditionalStartEvent>,
}
