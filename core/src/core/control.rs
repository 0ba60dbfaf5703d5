// vigil/src/core/control.rs

//! Outcomes reported by the dispatcher and by command processing.

use crate::core::keys::{DefinitionKey, ProcessInstanceKey, ScopeKey, SubscriptionKey};
use std::ops::Range;

/// What happened to one candidate subscription during a variable batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateOutcome {
  /// The condition held and the trigger protocol ran.
  Triggered,
  /// The condition evaluated to false.
  NotSatisfied,
  /// No change entry of the batch passed the name/event filters.
  Filtered,
  /// The condition could not be evaluated; treated as not satisfied.
  Failed,
  /// The subscription was deleted by an earlier trigger of the same batch.
  Stale,
}

/// Summary of one dispatched variable batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
  /// Number of variable entries that actually changed.
  pub changes: usize,
  /// Candidate subscriptions, in evaluation order, with their outcome.
  pub candidates: Vec<(SubscriptionKey, CandidateOutcome)>,
}

impl DispatchSummary {
  pub fn triggered(&self) -> Vec<SubscriptionKey> {
    self
      .candidates
      .iter()
      .filter(|(_, outcome)| *outcome == CandidateOutcome::Triggered)
      .map(|(key, _)| *key)
      .collect()
  }

  pub fn count(&self, outcome: CandidateOutcome) -> usize {
    self.candidates.iter().filter(|(_, o)| *o == outcome).count()
  }
}

/// The command-specific result of [`crate::Engine::process`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
  Deployed(DefinitionKey),
  Activated(ScopeKey),
  Completed(ScopeKey),
  Terminated(ScopeKey),
  Dispatched(DispatchSummary),
  Subscribed(SubscriptionKey),
  Unsubscribed(SubscriptionKey),
  Triggered(SubscriptionKey),
  /// Process instances started by a conditional start evaluation, in start order.
  Evaluated(Vec<ProcessInstanceKey>),
}

/// Outcome of a successfully processed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Processed {
  pub outcome: CommandOutcome,
  /// Log positions written while processing the command and its follow-ups.
  pub positions: Range<u64>,
}
