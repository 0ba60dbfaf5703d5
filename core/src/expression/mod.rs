// vigil/src/expression/mod.rs

//! Condition evaluation.
//!
//! The engine only depends on the [`ConditionEvaluator`] trait; any expression
//! engine can be plugged in. [`ExpressionEvaluator`] implements a small
//! FEEL-like subset: literals, variable paths, arithmetic, comparisons,
//! `and`/`or`/`not(..)`, with an optional leading `=`.

mod eval;
mod lexer;
mod parser;

pub use eval::ExpressionEvaluator;

use crate::core::value::Variables;
use serde_json::Value;
use thiserror::Error;

/// Supplies variable values to an evaluation.
pub trait VariableResolver {
  fn resolve(&self, name: &str) -> Option<&Value>;
}

impl VariableResolver for Variables {
  fn resolve(&self, name: &str) -> Option<&Value> {
    self.get(name)
  }
}

/// Evaluates a condition to a truth value. Implementations must be pure: the
/// same expression and bindings always give the same result.
pub trait ConditionEvaluator: Send + Sync {
  fn evaluate(&self, expression: &str, resolver: &dyn VariableResolver) -> Result<bool, EvalError>;
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
  #[error("failed to parse expression '{expression}': {message}")]
  Parse { expression: String, message: String },

  #[error("no variable found with name '{0}'")]
  MissingVariable(String),

  #[error("division by zero")]
  DivisionByZero,

  #[error("type mismatch: {message}")]
  TypeMismatch { message: String },

  #[error("expected boolean but found {found}")]
  NonBoolean { found: String },
}
