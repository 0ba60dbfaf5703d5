// vigil/src/subscription/mod.rs

//! Conditional catch points and the live subscriptions created from them.
//!
//! A [`ConditionalCatchPoint`] is the static description of a waiting
//! condition (as deployed). When the owning element enters its conditionally
//! active window the engine turns it into a [`ConditionalSubscription`] bound
//! to an evaluation scope.

pub mod registry;

pub use registry::SubscriptionRegistry;

use crate::core::keys::{DefinitionKey, ProcessInstanceKey, ScopeKey, SubscriptionKey};
use crate::core::value::{split_list, VariableChange, VariableEvent};
use crate::error::{VigilError, VigilResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which kind of element owns a catch point. Selects the trigger effect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CatchKind {
  /// Boundary event attached to the activity owning the evaluation scope.
  Boundary,
  /// Start event of an event subprocess placed in the evaluation scope.
  EventSubprocessStart { subprocess_id: String },
  /// Intermediate catch event; the evaluation scope is its own instance.
  IntermediateCatch,
}

/// Deployed description of a conditional catch point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalCatchPoint {
  pub catch_event_id: String,
  pub condition: String,
  pub kind: CatchKind,
  pub interrupting: bool,
  pub variable_names: BTreeSet<String>,
  pub variable_events: BTreeSet<VariableEvent>,
}

impl ConditionalCatchPoint {
  fn new(catch_event_id: impl Into<String>, condition: impl Into<String>, kind: CatchKind, interrupting: bool) -> Self {
    Self {
      catch_event_id: catch_event_id.into(),
      condition: condition.into(),
      kind,
      interrupting,
      variable_names: BTreeSet::new(),
      variable_events: BTreeSet::new(),
    }
  }

  /// An interrupting boundary event. Use [`Self::non_interrupting`] to flip it.
  pub fn boundary(catch_event_id: impl Into<String>, condition: impl Into<String>) -> Self {
    Self::new(catch_event_id, condition, CatchKind::Boundary, true)
  }

  /// An interrupting start event of the event subprocess `subprocess_id`.
  pub fn event_subprocess_start(
    catch_event_id: impl Into<String>,
    subprocess_id: impl Into<String>,
    condition: impl Into<String>,
  ) -> Self {
    let kind = CatchKind::EventSubprocessStart {
      subprocess_id: subprocess_id.into(),
    };
    Self::new(catch_event_id, condition, kind, true)
  }

  /// An intermediate catch event. Recorded as interrupting; the flag has no
  /// effect on how it is triggered.
  pub fn intermediate(catch_event_id: impl Into<String>, condition: impl Into<String>) -> Self {
    Self::new(catch_event_id, condition, CatchKind::IntermediateCatch, true)
  }

  pub fn non_interrupting(mut self) -> Self {
    self.interrupting = false;
    self
  }

  pub fn with_variable_names<I, S>(mut self, names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.variable_names.extend(names.into_iter().map(Into::into));
    self
  }

  /// Adds names from a comma separated list, e.g. `"x, y"`.
  pub fn with_variable_name_list(self, list: &str) -> Self {
    let names: Vec<String> = split_list(list).map(str::to_string).collect();
    self.with_variable_names(names)
  }

  pub fn with_variable_events(mut self, events: impl IntoIterator<Item = VariableEvent>) -> Self {
    self.variable_events.extend(events);
    self
  }

  /// Adds events from a comma separated list, e.g. `"create, update"`.
  pub fn with_variable_event_list(mut self, list: &str) -> VigilResult<Self> {
    for item in split_list(list) {
      let event = item.parse::<VariableEvent>().map_err(|message| VigilError::Configuration {
        key: format!("{}.variableEvents", self.catch_event_id),
        message,
      })?;
      self.variable_events.insert(event);
    }
    Ok(self)
  }
}

/// A live, armed conditional subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalSubscription {
  pub key: SubscriptionKey,
  pub process_instance_key: ProcessInstanceKey,
  pub process_definition_key: Option<DefinitionKey>,
  pub tenant_id: String,
  /// The scope whose variables the condition is resolved against.
  pub scope_key: ScopeKey,
  pub element_instance_key: ScopeKey,
  pub catch_event_id: String,
  pub condition: String,
  pub variable_names: BTreeSet<String>,
  pub variable_events: BTreeSet<VariableEvent>,
  pub interrupting: bool,
  pub kind: CatchKind,
}

impl ConditionalSubscription {
  /// True when some entry of the batch carries a name in the name filter.
  pub fn matches_names(&self, changes: &[VariableChange]) -> bool {
    self.variable_names.is_empty() || changes.iter().any(|change| self.variable_names.contains(&change.name))
  }

  /// True when some entry of the batch is of a kind in the event filter.
  pub fn matches_events(&self, changes: &[VariableChange]) -> bool {
    self.variable_events.is_empty() || changes.iter().any(|change| self.variable_events.contains(&change.kind))
  }

  /// True when the batch passes both filters. The filters are checked
  /// independently, each against the whole batch.
  pub fn accepts(&self, changes: &[VariableChange]) -> bool {
    !changes.is_empty() && self.matches_names(changes) && self.matches_events(changes)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn change(name: &str, kind: VariableEvent) -> VariableChange {
    VariableChange {
      name: name.to_string(),
      value: json!(1),
      kind,
    }
  }

  fn subscription(point: ConditionalCatchPoint) -> ConditionalSubscription {
    ConditionalSubscription {
      key: SubscriptionKey(1),
      process_instance_key: ScopeKey(1),
      process_definition_key: None,
      tenant_id: "<default>".into(),
      scope_key: ScopeKey(2),
      element_instance_key: ScopeKey(2),
      catch_event_id: point.catch_event_id,
      condition: point.condition,
      variable_names: point.variable_names,
      variable_events: point.variable_events,
      interrupting: point.interrupting,
      kind: point.kind,
    }
  }

  #[test]
  fn unfiltered_subscription_accepts_any_change() {
    let sub = subscription(ConditionalCatchPoint::boundary("b", "x > 1"));
    assert!(sub.accepts(&[change("anything", VariableEvent::Update)]));
    assert!(!sub.accepts(&[]));
  }

  #[test]
  fn filters_are_checked_against_the_whole_batch() {
    let sub = subscription(
      ConditionalCatchPoint::boundary("b", "x > 1")
        .with_variable_names(["x"])
        .with_variable_events([VariableEvent::Update]),
    );
    // name matches on one entry, kind on another.
    assert!(sub.accepts(&[change("x", VariableEvent::Create), change("y", VariableEvent::Update)]));
    assert!(sub.accepts(&[change("x", VariableEvent::Update)]));
    assert!(!sub.accepts(&[change("x", VariableEvent::Create)]));
    assert!(!sub.accepts(&[change("y", VariableEvent::Update)]));
  }

  #[test]
  fn lists_are_parsed() {
    let point = ConditionalCatchPoint::intermediate("wait", "ready")
      .with_variable_name_list("x, y,")
      .with_variable_event_list("create")
      .unwrap();
    assert_eq!(point.variable_names.len(), 2);
    assert!(point.variable_events.contains(&VariableEvent::Create));
    assert!(ConditionalCatchPoint::intermediate("wait", "ready")
      .with_variable_event_list("delete")
      .is_err());
  }
}
