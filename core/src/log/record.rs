// vigil/src/log/record.rs

//! Record types written to the [`super::RecordLog`].

use crate::core::keys::{DefinitionKey, ProcessInstanceKey, ScopeKey, SubscriptionKey};
use crate::core::value::Variables;
use crate::definition::ProcessDefinition;
use crate::engine::Command;
use crate::error::RejectionType;
use crate::scope::ScopeKind;
use crate::subscription::ConditionalSubscription;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordType {
  Event,
  Command,
  CommandRejection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionIntent {
  Created,
  Trigger,
  Triggered,
  Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElementIntent {
  ElementActivating,
  ElementActivated,
  ElementCompleting,
  ElementCompleted,
  ElementTerminating,
  ElementTerminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VariableIntent {
  Created,
  Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvaluationIntent {
  Evaluate,
  Evaluated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeploymentIntent {
  Created,
}

/// An element instance as seen by a lifecycle record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementRecord {
  pub element_id: String,
  pub kind: ElementKind,
  pub flow_scope_key: Option<ScopeKey>,
  pub process_instance_key: ProcessInstanceKey,
  pub process_definition_key: Option<DefinitionKey>,
  pub tenant_id: String,
}

/// Element kinds appearing in lifecycle records. Events pass through their
/// lifecycle without owning a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElementKind {
  Scope(ScopeKind),
  BoundaryEvent,
  StartEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableRecord {
  pub name: String,
  pub value: Value,
  pub scope_key: ScopeKey,
  pub process_instance_key: ProcessInstanceKey,
  pub tenant_id: String,
}

/// Structural command for the element lifecycle collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElementCommand {
  #[serde(rename_all = "camelCase")]
  TerminateElement {
    element_instance_key: ScopeKey,
    element_id: String,
  },
  #[serde(rename_all = "camelCase")]
  ActivateFlow {
    source_element_id: String,
    flow_scope_key: ScopeKey,
    process_instance_key: ProcessInstanceKey,
  },
  #[serde(rename_all = "camelCase")]
  CompleteElement {
    element_instance_key: ScopeKey,
    element_id: String,
  },
  #[serde(rename_all = "camelCase")]
  InstantiateEventSubprocess {
    flow_scope_key: ScopeKey,
    subprocess_id: String,
    start_event_id: String,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartedInstance {
  pub process_definition_key: DefinitionKey,
  pub process_instance_key: ProcessInstanceKey,
  pub start_event_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRecord {
  pub process_definition_key: Option<DefinitionKey>,
  pub tenant_id: String,
  pub variables: Variables,
  pub started_instances: Vec<StartedInstance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "valueType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordValue {
  ConditionalSubscription {
    intent: SubscriptionIntent,
    subscription: ConditionalSubscription,
  },
  ProcessInstance {
    intent: ElementIntent,
    element: ElementRecord,
  },
  Variable {
    intent: VariableIntent,
    variable: VariableRecord,
  },
  ElementCommand {
    command: ElementCommand,
  },
  ConditionalEvaluation {
    intent: EvaluationIntent,
    evaluation: EvaluationRecord,
  },
  Deployment {
    intent: DeploymentIntent,
    definition: ProcessDefinition,
  },
  /// A command as it was submitted, carried by rejection records.
  Command {
    command: Command,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
  pub rejection_type: RejectionType,
  pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
  pub position: u64,
  pub key: Option<u64>,
  pub record_type: RecordType,
  pub value: RecordValue,
  pub rejection: Option<Rejection>,
}

impl Record {
  pub fn subscription(&self) -> Option<(SubscriptionIntent, &ConditionalSubscription)> {
    match &self.value {
      RecordValue::ConditionalSubscription { intent, subscription } => Some((*intent, subscription)),
      _ => None,
    }
  }

  pub fn element(&self) -> Option<(ElementIntent, &ElementRecord)> {
    match &self.value {
      RecordValue::ProcessInstance { intent, element } => Some((*intent, element)),
      _ => None,
    }
  }

  pub fn element_command(&self) -> Option<&ElementCommand> {
    match &self.value {
      RecordValue::ElementCommand { command } => Some(command),
      _ => None,
    }
  }

  pub fn subscription_key(&self) -> Option<SubscriptionKey> {
    self.subscription().map(|(_, s)| s.key)
  }

  pub fn is_rejection(&self) -> bool {
    self.record_type == RecordType::CommandRejection
  }
}
