// vigil/src/engine/start.rs

use super::{ConditionalStartCommand, Engine};
use crate::core::keys::ProcessInstanceKey;
use crate::core::value::Variables;
use crate::definition::ProcessDefinition;
use crate::engine::failure::EvaluationFailure;
use crate::error::{VigilError, VigilResult};
use crate::log::{ElementKind, EvaluationIntent, EvaluationRecord, RecordType, RecordValue, StartedInstance};
use tracing::{event, instrument, Level};

impl Engine {
  /// Evaluates root-level conditional start events against the supplied
  /// variables and starts one process instance per satisfied start event.
  ///
  /// Only the supplied variables are visible to the conditions. The EVALUATED
  /// record is written even when nothing started.
  #[instrument(name = "Engine::run_conditional_start", skip_all, fields(definition_key = ?command.process_definition_key), err(Display))]
  pub(crate) fn run_conditional_start(
    &mut self,
    command: &ConditionalStartCommand,
  ) -> VigilResult<Vec<ProcessInstanceKey>> {
    let tenant_id = command
      .tenant_id
      .clone()
      .unwrap_or_else(|| self.config.default_tenant_id.clone());

    let definitions: Vec<ProcessDefinition> = match command.process_definition_key {
      Some(key) => {
        let definition = self.definitions.require(key)?;
        if definition.tenant_id != tenant_id {
          // Definitions of other tenants are invisible.
          return Err(VigilError::DefinitionNotFound { definition_key: key });
        }
        vec![definition.clone()]
      }
      None => self.definitions.latest_for_tenant(&tenant_id).into_iter().cloned().collect(),
    };

    let mut evaluation = EvaluationRecord {
      process_definition_key: command.process_definition_key,
      tenant_id,
      variables: command.variables.clone(),
      started_instances: Vec::new(),
    };
    self.log.append(
      None,
      RecordType::Command,
      RecordValue::ConditionalEvaluation {
        intent: EvaluationIntent::Evaluate,
        evaluation: evaluation.clone(),
      },
      None,
    );

    for definition in &definitions {
      for start_event in &definition.start_events {
        if !start_event.accepts(&command.variables) {
          continue;
        }
        match self.evaluator.evaluate(&start_event.condition, &command.variables) {
          Ok(true) => {
            let process_instance_key = self.start_instance(definition, &start_event.element_id, &command.variables)?;
            evaluation.started_instances.push(StartedInstance {
              process_definition_key: definition.key,
              process_instance_key,
              start_event_id: start_event.element_id.clone(),
            });
          }
          Ok(false) => {}
          Err(error) => self.failures.report(&EvaluationFailure {
            element_id: start_event.element_id.clone(),
            subscription_key: None,
            scope_key: None,
            expression: start_event.condition.clone(),
            error,
          }),
        }
      }
    }

    let started: Vec<ProcessInstanceKey> = evaluation
      .started_instances
      .iter()
      .map(|s| s.process_instance_key)
      .collect();
    event!(Level::DEBUG, started = started.len(), "Conditional start evaluated.");
    self.log.append(
      None,
      RecordType::Event,
      RecordValue::ConditionalEvaluation {
        intent: EvaluationIntent::Evaluated,
        evaluation,
      },
      None,
    );
    Ok(started)
  }

  fn start_instance(
    &mut self,
    definition: &ProcessDefinition,
    start_event_id: &str,
    variables: &Variables,
  ) -> VigilResult<ProcessInstanceKey> {
    let process_instance_key = self.create_instance(definition.key, variables)?;
    self.pass_through_event(process_instance_key, start_event_id, ElementKind::StartEvent)?;
    self.activate_flow(start_event_id, process_instance_key)?;
    Ok(process_instance_key)
  }
}
