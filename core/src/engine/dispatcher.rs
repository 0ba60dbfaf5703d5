// vigil/src/engine/dispatcher.rs

use super::Engine;
use crate::core::control::{CandidateOutcome, DispatchSummary};
use crate::core::keys::ScopeKey;
use crate::core::value::{VariableChange, VariableEvent, Variables};
use crate::error::VigilResult;
use crate::log::{RecordType, RecordValue, VariableIntent, VariableRecord};
use tracing::{event, instrument, Level};

impl Engine {
  /// Applies `variables` to the local map of `scope_key` and evaluates every
  /// subscription that can see the write.
  ///
  /// Candidates are visited shallow to deep and re-fetched before evaluation;
  /// a trigger that tears down part of the tree turns later candidates stale
  /// instead of reordering the list.
  #[instrument(name = "Engine::dispatch_batch", skip(self, variables), fields(entries = variables.len()), err(Display))]
  pub(crate) fn dispatch_batch(&mut self, scope_key: ScopeKey, variables: &Variables) -> VigilResult<DispatchSummary> {
    let changes = self.apply_writes(scope_key, variables)?;
    let mut summary = DispatchSummary {
      changes: changes.len(),
      candidates: Vec::new(),
    };
    if changes.is_empty() {
      return Ok(summary);
    }

    let candidates = self.subscriptions.candidates_for_write(&self.scopes, scope_key);
    event!(Level::DEBUG, changes = changes.len(), candidates = candidates.len(), "Dispatching variable batch.");

    for key in candidates {
      let Some(subscription) = self.subscriptions.get(key).cloned() else {
        event!(Level::TRACE, subscription_key = %key, "Skipping stale candidate.");
        summary.candidates.push((key, CandidateOutcome::Stale));
        continue;
      };
      if !subscription.accepts(&changes) {
        summary.candidates.push((key, CandidateOutcome::Filtered));
        continue;
      }

      let outcome = match self.evaluate_subscription(&subscription) {
        Some(true) => {
          self.fire(subscription)?;
          CandidateOutcome::Triggered
        }
        Some(false) => CandidateOutcome::NotSatisfied,
        None => CandidateOutcome::Failed,
      };
      summary.candidates.push((key, outcome));
    }

    Ok(summary)
  }

  /// Writes each entry, skipping values equal to the current local value.
  fn apply_writes(&mut self, scope_key: ScopeKey, variables: &Variables) -> VigilResult<Vec<VariableChange>> {
    let process_instance_key = self.scopes.require(scope_key)?.process_instance_key();
    let tenant_id = self.instance_meta(process_instance_key).tenant_id;

    let mut changes = Vec::with_capacity(variables.len());
    for (name, value) in variables {
      let Some(kind) = self.scopes.set_variable(scope_key, name, value.clone())? else {
        continue;
      };
      let intent = match kind {
        VariableEvent::Create => VariableIntent::Created,
        VariableEvent::Update => VariableIntent::Updated,
      };
      self.log.append(
        Some(scope_key.value()),
        RecordType::Event,
        RecordValue::Variable {
          intent,
          variable: VariableRecord {
            name: name.clone(),
            value: value.clone(),
            scope_key,
            process_instance_key,
            tenant_id: tenant_id.clone(),
          },
        },
        None,
      );
      changes.push(VariableChange {
        name: name.clone(),
        value: value.clone(),
        kind,
      });
    }
    Ok(changes)
  }
}
