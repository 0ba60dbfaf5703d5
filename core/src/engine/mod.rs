// vigil/src/engine/mod.rs

//! The single-writer engine.
//!
//! [`Engine::process`] handles one command at a time: it journals the command,
//! executes it, writes the resulting records and then drains any follow-up
//! commands (evaluate-on-subscribe triggers) before returning. The behavior is
//! split across several `impl Engine` blocks:
//!
//! * `lifecycle` activates, completes and terminates element instances and
//!   opens and closes their conditionally active window;
//! * `dispatcher` applies variable batches and evaluates candidates top-down;
//! * `trigger` applies the catch-kind specific effect of a fired subscription;
//! * `start` evaluates root-level conditional start events.

pub mod command;
mod dispatcher;
pub mod failure;
mod lifecycle;
mod start;
mod trigger;

pub use command::{ActivateElement, Command, ConditionalStartCommand, TriggerCommand, VariableBatch};
pub use failure::{CollectingFailureSink, EvaluationFailure, FailureSink, TracingFailureSink};

use crate::config::EngineConfig;
use crate::core::control::{CommandOutcome, DispatchSummary, Processed};
use crate::core::keys::{DefinitionKey, KeyGenerator, ProcessInstanceKey, ScopeKey, SubscriptionKey};
use crate::core::value::Variables;
use crate::definition::{ProcessDefinitionRegistry, ProcessModel};
use crate::error::{VigilError, VigilResult};
use crate::expression::{ConditionEvaluator, ExpressionEvaluator};
use crate::log::{
  DeploymentIntent, ElementCommand, ElementIntent, ElementKind, ElementRecord, RecordLog, RecordType, RecordValue,
  Rejection, SubscriptionIntent,
};
use crate::scope::ScopeStore;
use crate::subscription::{ConditionalCatchPoint, ConditionalSubscription, SubscriptionRegistry};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{event, instrument, Level};

/// Ownership of a process instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InstanceMeta {
  pub definition_key: Option<DefinitionKey>,
  pub tenant_id: String,
}

pub struct Engine {
  config: EngineConfig,
  keys: KeyGenerator,
  scopes: ScopeStore,
  subscriptions: SubscriptionRegistry,
  definitions: ProcessDefinitionRegistry,
  instances: HashMap<ProcessInstanceKey, InstanceMeta>,
  evaluator: Arc<dyn ConditionEvaluator>,
  failures: Arc<dyn FailureSink>,
  log: RecordLog,
  pending: VecDeque<Command>,
  journal: Vec<Command>,
}

impl Engine {
  /// Fails when the configured partition id cannot be encoded in keys.
  pub fn new(config: EngineConfig) -> VigilResult<Self> {
    event!(Level::DEBUG, partition_id = config.partition_id, "Creating engine.");
    Ok(Self {
      keys: KeyGenerator::new(config.partition_id)?,
      evaluator: Arc::new(ExpressionEvaluator::with_capacity(config.expression_cache_capacity)),
      failures: Arc::new(TracingFailureSink),
      config,
      scopes: ScopeStore::new(),
      subscriptions: SubscriptionRegistry::new(),
      definitions: ProcessDefinitionRegistry::new(),
      instances: HashMap::new(),
      log: RecordLog::new(),
      pending: VecDeque::new(),
      journal: Vec::new(),
    })
  }

  /// Replaces the default [`ExpressionEvaluator`].
  pub fn with_evaluator(mut self, evaluator: Arc<dyn ConditionEvaluator>) -> Self {
    self.evaluator = evaluator;
    self
  }

  pub fn with_failure_sink(mut self, sink: Arc<dyn FailureSink>) -> Self {
    self.failures = sink;
    self
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  pub fn scopes(&self) -> &ScopeStore {
    &self.scopes
  }

  pub fn subscriptions(&self) -> &SubscriptionRegistry {
    &self.subscriptions
  }

  pub fn definitions(&self) -> &ProcessDefinitionRegistry {
    &self.definitions
  }

  /// A handle to the record log; it stays valid while the engine appends.
  pub fn log(&self) -> RecordLog {
    self.log.clone()
  }

  /// Every externally submitted command, in processing order.
  pub fn journal(&self) -> &[Command] {
    &self.journal
  }

  /// Processes `journal` on this engine, which must not have processed
  /// anything yet. Rejected commands are rejected again, as they were.
  #[instrument(name = "Engine::replay", skip_all, fields(commands = journal.len()), err(Display))]
  pub fn replay(mut self, journal: &[Command]) -> VigilResult<Self> {
    if !self.journal.is_empty() || !self.log.is_empty() {
      return Err(VigilError::Internal("replay requires an engine without history".to_string()));
    }
    for command in journal {
      if let Err(err) = self.process(command.clone()) {
        event!(Level::DEBUG, command = command.name(), error = %err, "Replayed command rejected.");
      }
    }
    Ok(self)
  }

  /// Processes one command and all follow-ups it produced.
  ///
  /// A failing command leaves a rejection record in the log and returns the error.
  #[instrument(name = "Engine::process", skip_all, fields(command = command.name()), err(Display))]
  pub fn process(&mut self, command: Command) -> VigilResult<Processed> {
    let first_position = self.log.next_position();
    self.journal.push(command.clone());

    let result = self.execute(&command, true);
    if let Err(err) = &result {
      self.reject(command, err);
    }
    self.drain_follow_ups();

    let outcome = result?;
    Ok(Processed {
      outcome,
      positions: first_position..self.log.next_position(),
    })
  }

  fn execute(&mut self, command: &Command, external: bool) -> VigilResult<CommandOutcome> {
    match command {
      Command::Deploy { model } => self.deploy_model(model.clone()).map(CommandOutcome::Deployed),
      Command::CreateProcessInstance {
        definition_key,
        variables,
      } => self
        .create_instance(*definition_key, variables)
        .map(CommandOutcome::Activated),
      Command::ActivateElement(activation) => self.activate(activation.clone(), None).map(CommandOutcome::Activated),
      Command::CompleteElement { scope_key, output } => {
        self.complete(*scope_key, output)?;
        Ok(CommandOutcome::Completed(*scope_key))
      }
      Command::TerminateElement { scope_key } => {
        self.terminate(*scope_key)?;
        Ok(CommandOutcome::Terminated(*scope_key))
      }
      Command::ApplyVariables(batch) => self
        .dispatch_batch(batch.scope_key, &batch.variables)
        .map(CommandOutcome::Dispatched),
      Command::OpenSubscription { scope_key, catch_point } => self
        .open_single(*scope_key, catch_point)
        .map(CommandOutcome::Subscribed),
      Command::CloseSubscription {
        scope_key,
        catch_event_id,
      } => self
        .close_single(*scope_key, catch_event_id)
        .map(CommandOutcome::Unsubscribed),
      Command::Trigger(trigger) => self
        .process_trigger(trigger, external)
        .map(CommandOutcome::Triggered),
      Command::EvaluateConditionalStart(start) => self
        .run_conditional_start(start)
        .map(CommandOutcome::Evaluated),
    }
  }

  fn drain_follow_ups(&mut self) {
    while let Some(command) = self.pending.pop_front() {
      if let Err(err) = self.execute(&command, false) {
        event!(Level::WARN, command = command.name(), error = %err, "Follow-up command rejected.");
        self.reject(command, &err);
      }
    }
  }

  fn reject(&self, command: Command, err: &VigilError) {
    event!(Level::DEBUG, command = command.name(), error = %err, "Rejecting command.");
    self.log.append(
      None,
      RecordType::CommandRejection,
      RecordValue::Command { command },
      Some(Rejection {
        rejection_type: err.rejection_type(),
        reason: err.to_string(),
      }),
    );
  }

  fn deploy_model(&mut self, model: ProcessModel) -> VigilResult<DefinitionKey> {
    ProcessDefinitionRegistry::validate(&model)?;
    let key = self.keys.next_definition_key();
    let definition = self
      .definitions
      .register(key, model, &self.config.default_tenant_id)?
      .clone();
    self.log.append(
      Some(key.value()),
      RecordType::Event,
      RecordValue::Deployment {
        intent: DeploymentIntent::Created,
        definition,
      },
      None,
    );
    Ok(key)
  }

  // --- record helpers ---

  pub(crate) fn instance_meta(&self, process_instance_key: ProcessInstanceKey) -> InstanceMeta {
    self
      .instances
      .get(&process_instance_key)
      .cloned()
      .unwrap_or_else(|| InstanceMeta {
        definition_key: None,
        tenant_id: self.config.default_tenant_id.clone(),
      })
  }

  pub(crate) fn write_subscription(
    &self,
    record_type: RecordType,
    intent: SubscriptionIntent,
    subscription: &ConditionalSubscription,
  ) {
    self.log.append(
      Some(subscription.key.value()),
      record_type,
      RecordValue::ConditionalSubscription {
        intent,
        subscription: subscription.clone(),
      },
      None,
    );
  }

  /// Writes a lifecycle record for the element instance owning `scope_key`.
  pub(crate) fn write_element(&self, intent: ElementIntent, scope_key: ScopeKey) -> VigilResult<()> {
    let scope = self.scopes.require(scope_key)?;
    let meta = self.instance_meta(scope.process_instance_key());
    let element = ElementRecord {
      element_id: scope.element_id().to_string(),
      kind: ElementKind::Scope(scope.kind()),
      flow_scope_key: scope.parent_key(),
      process_instance_key: scope.process_instance_key(),
      process_definition_key: meta.definition_key,
      tenant_id: meta.tenant_id,
    };
    self.log.append(
      Some(scope_key.value()),
      RecordType::Event,
      RecordValue::ProcessInstance { intent, element },
      None,
    );
    Ok(())
  }

  pub(crate) fn write_element_command(&self, key: Option<u64>, command: ElementCommand) {
    event!(Level::TRACE, ?command, "Emitting element command.");
    self
      .log
      .append(key, RecordType::Command, RecordValue::ElementCommand { command }, None);
  }

  // --- convenience API; every call goes through `process` ---

  pub fn deploy(&mut self, model: ProcessModel) -> VigilResult<DefinitionKey> {
    match self.process(Command::Deploy { model })?.outcome {
      CommandOutcome::Deployed(key) => Ok(key),
      other => Err(unexpected(other)),
    }
  }

  pub fn create_process_instance(
    &mut self,
    definition_key: DefinitionKey,
    variables: Variables,
  ) -> VigilResult<ProcessInstanceKey> {
    let command = Command::CreateProcessInstance {
      definition_key,
      variables,
    };
    match self.process(command)?.outcome {
      CommandOutcome::Activated(key) => Ok(key),
      other => Err(unexpected(other)),
    }
  }

  pub fn activate_element(&mut self, activation: ActivateElement) -> VigilResult<ScopeKey> {
    match self.process(Command::ActivateElement(activation))?.outcome {
      CommandOutcome::Activated(key) => Ok(key),
      other => Err(unexpected(other)),
    }
  }

  pub fn complete_element(&mut self, scope_key: ScopeKey, output: Variables) -> VigilResult<()> {
    self
      .process(Command::CompleteElement { scope_key, output })
      .map(|_| ())
  }

  pub fn terminate_element(&mut self, scope_key: ScopeKey) -> VigilResult<()> {
    self.process(Command::TerminateElement { scope_key }).map(|_| ())
  }

  pub fn apply_variables(&mut self, scope_key: ScopeKey, variables: Variables) -> VigilResult<DispatchSummary> {
    let batch = VariableBatch { scope_key, variables };
    match self.process(Command::ApplyVariables(batch))?.outcome {
      CommandOutcome::Dispatched(summary) => Ok(summary),
      other => Err(unexpected(other)),
    }
  }

  /// Single-entry shorthand for [`Engine::apply_variables`].
  pub fn set_variable(
    &mut self,
    scope_key: ScopeKey,
    name: impl Into<String>,
    value: impl Into<Value>,
  ) -> VigilResult<DispatchSummary> {
    let mut variables = Variables::new();
    variables.insert(name.into(), value.into());
    self.apply_variables(scope_key, variables)
  }

  pub fn open_subscription(
    &mut self,
    scope_key: ScopeKey,
    catch_point: ConditionalCatchPoint,
  ) -> VigilResult<SubscriptionKey> {
    match self.process(Command::OpenSubscription { scope_key, catch_point })?.outcome {
      CommandOutcome::Subscribed(key) => Ok(key),
      other => Err(unexpected(other)),
    }
  }

  pub fn close_subscription(&mut self, scope_key: ScopeKey, catch_event_id: impl Into<String>) -> VigilResult<()> {
    let command = Command::CloseSubscription {
      scope_key,
      catch_event_id: catch_event_id.into(),
    };
    self.process(command).map(|_| ())
  }

  pub fn trigger(&mut self, trigger: TriggerCommand) -> VigilResult<()> {
    self.process(Command::Trigger(trigger)).map(|_| ())
  }

  pub fn evaluate_conditional_start(
    &mut self,
    command: ConditionalStartCommand,
  ) -> VigilResult<Vec<ProcessInstanceKey>> {
    match self.process(Command::EvaluateConditionalStart(command))?.outcome {
      CommandOutcome::Evaluated(started) => Ok(started),
      other => Err(unexpected(other)),
    }
  }
}

fn unexpected(outcome: CommandOutcome) -> VigilError {
  VigilError::Internal(format!("unexpected command outcome {:?}", outcome))
}
