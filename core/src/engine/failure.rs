// vigil/src/engine/failure.rs

//! Reporting of condition evaluation failures.
//!
//! A failed evaluation counts as "not satisfied" and never fails the command;
//! the failure only goes to the configured [`FailureSink`].

use crate::core::keys::{ScopeKey, SubscriptionKey};
use crate::core::shared::Shared;
use crate::expression::EvalError;
use tracing::{event, Level};

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationFailure {
  /// Catch event or conditional start event whose condition failed.
  pub element_id: String,
  pub subscription_key: Option<SubscriptionKey>,
  pub scope_key: Option<ScopeKey>,
  pub expression: String,
  pub error: EvalError,
}

pub trait FailureSink: Send + Sync {
  fn report(&self, failure: &EvaluationFailure);
}

/// Logs failures at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFailureSink;

impl FailureSink for TracingFailureSink {
  fn report(&self, failure: &EvaluationFailure) {
    event!(
      Level::DEBUG,
      element_id = %failure.element_id,
      subscription_key = ?failure.subscription_key,
      scope_key = ?failure.scope_key,
      expression = %failure.expression,
      error = %failure.error,
      "Condition evaluation failed; treating as not satisfied."
    );
  }
}

/// Keeps every reported failure. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct CollectingFailureSink {
  failures: Shared<Vec<EvaluationFailure>>,
}

impl CollectingFailureSink {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn failures(&self) -> Vec<EvaluationFailure> {
    self.failures.read().clone()
  }

  pub fn len(&self) -> usize {
    self.failures.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.failures.read().is_empty()
  }
}

impl FailureSink for CollectingFailureSink {
  fn report(&self, failure: &EvaluationFailure) {
    TracingFailureSink.report(failure);
    self.failures.write().push(failure.clone());
  }
}
