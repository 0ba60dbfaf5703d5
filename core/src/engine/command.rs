// vigil/src/engine/command.rs

//! Inbound commands. Every externally submitted command is journaled, so the
//! journal replays into the same record log.

use crate::core::keys::{DefinitionKey, ProcessInstanceKey, ScopeKey, SubscriptionKey};
use crate::core::value::Variables;
use crate::definition::ProcessModel;
use crate::scope::ScopeKind;
use crate::subscription::ConditionalCatchPoint;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Activation of an element instance below `flow_scope_key`, or of a process
/// instance root when `flow_scope_key` is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateElement {
  pub flow_scope_key: Option<ScopeKey>,
  pub element_id: String,
  pub kind: ScopeKind,
  /// Input mapping, applied to the new scope before it becomes active.
  pub input: Variables,
  /// Catch points whose evaluation scope is the new element instance.
  pub catch_points: Vec<ConditionalCatchPoint>,
}

impl ActivateElement {
  pub fn new(flow_scope_key: ScopeKey, element_id: impl Into<String>, kind: ScopeKind) -> Self {
    Self {
      flow_scope_key: Some(flow_scope_key),
      element_id: element_id.into(),
      kind,
      input: Variables::new(),
      catch_points: Vec::new(),
    }
  }

  /// A process instance without a deployed definition.
  pub fn root(bpmn_process_id: impl Into<String>) -> Self {
    Self {
      flow_scope_key: None,
      element_id: bpmn_process_id.into(),
      kind: ScopeKind::ProcessInstance,
      input: Variables::new(),
      catch_points: Vec::new(),
    }
  }

  pub fn input(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
    self.input.insert(name.into(), value.into());
    self
  }

  pub fn with_variables(mut self, variables: Variables) -> Self {
    self.input.extend(variables);
    self
  }

  pub fn catch_point(mut self, catch_point: ConditionalCatchPoint) -> Self {
    self.catch_points.push(catch_point);
    self
  }
}

/// Variable writes applied to one scope and evaluated together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableBatch {
  pub scope_key: ScopeKey,
  pub variables: Variables,
}

impl VariableBatch {
  pub fn new(scope_key: ScopeKey) -> Self {
    Self {
      scope_key,
      variables: Variables::new(),
    }
  }

  pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
    self.variables.insert(name.into(), value.into());
    self
  }
}

/// Fires one subscription without evaluating its condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerCommand {
  pub subscription_key: SubscriptionKey,
  pub process_instance_key: ProcessInstanceKey,
  pub catch_event_id: String,
}

/// Evaluates root-level conditional start events against `variables`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalStartCommand {
  /// Restricts evaluation to one definition; otherwise the latest version of
  /// every process of the tenant is considered.
  pub process_definition_key: Option<DefinitionKey>,
  pub tenant_id: Option<String>,
  pub variables: Variables,
}

impl ConditionalStartCommand {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn definition(mut self, key: DefinitionKey) -> Self {
    self.process_definition_key = Some(key);
    self
  }

  pub fn tenant(mut self, tenant_id: impl Into<String>) -> Self {
    self.tenant_id = Some(tenant_id.into());
    self
  }

  pub fn variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
    self.variables.insert(name.into(), value.into());
    self
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
  Deploy {
    model: ProcessModel,
  },
  #[serde(rename_all = "camelCase")]
  CreateProcessInstance {
    definition_key: DefinitionKey,
    variables: Variables,
  },
  ActivateElement(ActivateElement),
  #[serde(rename_all = "camelCase")]
  CompleteElement {
    scope_key: ScopeKey,
    output: Variables,
  },
  #[serde(rename_all = "camelCase")]
  TerminateElement {
    scope_key: ScopeKey,
  },
  ApplyVariables(VariableBatch),
  #[serde(rename_all = "camelCase")]
  OpenSubscription {
    scope_key: ScopeKey,
    catch_point: ConditionalCatchPoint,
  },
  #[serde(rename_all = "camelCase")]
  CloseSubscription {
    scope_key: ScopeKey,
    catch_event_id: String,
  },
  Trigger(TriggerCommand),
  EvaluateConditionalStart(ConditionalStartCommand),
}

impl Command {
  pub fn name(&self) -> &'static str {
    match self {
      Command::Deploy { .. } => "DEPLOY",
      Command::CreateProcessInstance { .. } => "CREATE_PROCESS_INSTANCE",
      Command::ActivateElement(_) => "ACTIVATE_ELEMENT",
      Command::CompleteElement { .. } => "COMPLETE_ELEMENT",
      Command::TerminateElement { .. } => "TERMINATE_ELEMENT",
      Command::ApplyVariables(_) => "APPLY_VARIABLES",
      Command::OpenSubscription { .. } => "OPEN_SUBSCRIPTION",
      Command::CloseSubscription { .. } => "CLOSE_SUBSCRIPTION",
      Command::Trigger(_) => "TRIGGER",
      Command::EvaluateConditionalStart(_) => "EVALUATE_CONDITIONAL_START",
    }
  }
}
