// vigil/src/core/value.rs

//! Variable values and variable change kinds.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A set of variables keyed by name. Ordered so that batches are applied and
/// serialized deterministically.
pub type Variables = BTreeMap<String, Value>;

/// The kind of a variable write, as seen by the scope it was written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableEvent {
  /// The name did not exist locally in the scope before the write.
  Create,
  /// The name existed locally and its value changed.
  Update,
}

impl fmt::Display for VariableEvent {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      VariableEvent::Create => f.write_str("create"),
      VariableEvent::Update => f.write_str("update"),
    }
  }
}

impl FromStr for VariableEvent {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "create" => Ok(VariableEvent::Create),
      "update" => Ok(VariableEvent::Update),
      other => Err(format!("unknown variable event '{}'", other)),
    }
  }
}

/// One applied entry of a variable batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableChange {
  pub name: String,
  pub value: Value,
  pub kind: VariableEvent,
}

/// Splits a comma separated list such as `"x, y"` into trimmed, non-empty names.
pub fn split_list(list: &str) -> impl Iterator<Item = &str> {
  list.split(',').map(str::trim).filter(|s| !s.is_empty())
}
