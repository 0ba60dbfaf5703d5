// vigil/src/error.rs
use crate::core::keys::{DefinitionKey, ScopeKey, SubscriptionKey};
use anyhow::Error as AnyhowError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification written into command-rejection records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionType {
  NotFound,
  AlreadyExists,
  InvalidState,
  InvalidArgument,
}

#[derive(Debug, Error)]
pub enum VigilError {
  #[error(
    "Expected to trigger condition subscription with key '{subscription_key}', but no such subscription was found for process instance with key '{process_instance_key}' and catch event id '{catch_event_id}'."
  )]
  SubscriptionNotFound {
    subscription_key: SubscriptionKey,
    process_instance_key: ScopeKey,
    catch_event_id: String,
  },

  #[error("Expected to close condition subscription for scope '{scope_key}' and catch event id '{catch_event_id}', but none was found.")]
  NoSubscription { scope_key: ScopeKey, catch_event_id: String },

  #[error("Subscription already exists for scope '{scope_key}' and catch event id '{catch_event_id}'")]
  SubscriptionAlreadyExists { scope_key: ScopeKey, catch_event_id: String },

  #[error("Scope not found: {scope_key}")]
  ScopeNotFound { scope_key: ScopeKey },

  #[error("Scope already exists: {scope_key}")]
  ScopeAlreadyExists { scope_key: ScopeKey },

  #[error("Expected to find process definition with key '{definition_key}', but none found")]
  DefinitionNotFound { definition_key: DefinitionKey },

  #[error("Invalid lifecycle transition for element '{element_id}' ({scope_key}): {message}")]
  InvalidLifecycle {
    scope_key: ScopeKey,
    element_id: String,
    message: String,
  },

  #[error("Configuration error for '{key}': {message}")]
  Configuration { key: String, message: String },

  #[error("Exporter '{exporter}' failed at position {position}. Source: {source}")]
  ExporterFailure {
    exporter: String,
    position: u64,
    #[source]
    source: AnyhowError,
  },

  #[error("Failed to serialize records. Source: {source}")]
  Serialization {
    #[source]
    source: serde_json::Error,
  },

  #[error("Error in collaborator or external operation. Source: {source}")]
  External {
    #[source]
    source: AnyhowError,
  },

  #[error("Internal vigil error: {0}")]
  Internal(String),
}

impl VigilError {
  /// The rejection written to the log when a command fails with this error.
  pub fn rejection_type(&self) -> RejectionType {
    match self {
      VigilError::SubscriptionNotFound { .. }
      | VigilError::NoSubscription { .. }
      | VigilError::ScopeNotFound { .. }
      | VigilError::DefinitionNotFound { .. } => RejectionType::NotFound,
      VigilError::SubscriptionAlreadyExists { .. } | VigilError::ScopeAlreadyExists { .. } => {
        RejectionType::AlreadyExists
      }
      VigilError::InvalidLifecycle { .. } => RejectionType::InvalidState,
      VigilError::Configuration { .. } => RejectionType::InvalidArgument,
      VigilError::ExporterFailure { .. }
      | VigilError::Serialization { .. }
      | VigilError::External { .. }
      | VigilError::Internal(_) => RejectionType::InvalidState,
    }
  }
}

impl From<AnyhowError> for VigilError {
  fn from(err: AnyhowError) -> Self {
    VigilError::External { source: err }
  }
}

impl From<serde_json::Error> for VigilError {
  fn from(err: serde_json::Error) -> Self {
    VigilError::Serialization { source: err }
  }
}

pub type VigilResult<T, E = VigilError> = std::result::Result<T, E>;
