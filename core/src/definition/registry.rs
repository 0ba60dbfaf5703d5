// vigil/src/definition/registry.rs

//! Keyed store of deployed [`ProcessDefinition`]s.
//!
//! Definitions are never removed. Deploying a model whose process id already
//! exists for the same tenant creates the next version.

use super::{ProcessDefinition, ProcessModel};
use crate::core::keys::DefinitionKey;
use crate::error::{VigilError, VigilResult};
use crate::subscription::CatchKind;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{event, instrument, Level};

#[derive(Debug, Default)]
pub struct ProcessDefinitionRegistry {
  definitions: BTreeMap<DefinitionKey, ProcessDefinition>,
  versions: HashMap<(String, String), Vec<DefinitionKey>>,
}

impl ProcessDefinitionRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.definitions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.definitions.is_empty()
  }

  /// Checks a model before it gets a key.
  pub fn validate(model: &ProcessModel) -> VigilResult<()> {
    if model.bpmn_process_id.trim().is_empty() {
      return Err(VigilError::Configuration {
        key: "bpmnProcessId".to_string(),
        message: "must not be empty".to_string(),
      });
    }
    let mut seen = HashSet::new();
    for point in &model.catch_points {
      if !matches!(point.kind, CatchKind::EventSubprocessStart { .. }) {
        return Err(VigilError::Configuration {
          key: point.catch_event_id.clone(),
          message: "only event subprocess start events can be declared on the process scope".to_string(),
        });
      }
      if !seen.insert(point.catch_event_id.as_str()) {
        return Err(VigilError::Configuration {
          key: point.catch_event_id.clone(),
          message: "duplicate element id".to_string(),
        });
      }
    }
    for start in &model.start_events {
      if !seen.insert(start.element_id.as_str()) {
        return Err(VigilError::Configuration {
          key: start.element_id.clone(),
          message: "duplicate element id".to_string(),
        });
      }
    }
    Ok(())
  }

  #[instrument(name = "ProcessDefinitionRegistry::register", skip_all, fields(bpmn_process_id = %model.bpmn_process_id, definition_key = %key))]
  pub fn register(&mut self, key: DefinitionKey, model: ProcessModel, default_tenant: &str) -> VigilResult<&ProcessDefinition> {
    Self::validate(&model)?;
    if self.definitions.contains_key(&key) {
      return Err(VigilError::Internal(format!("definition key {} allocated twice", key)));
    }

    let tenant_id = model.tenant_id.unwrap_or_else(|| default_tenant.to_string());
    let versions = self
      .versions
      .entry((tenant_id.clone(), model.bpmn_process_id.clone()))
      .or_default();
    versions.push(key);
    let version = versions.len() as u32;

    event!(Level::DEBUG, %tenant_id, version, "Registering process definition.");
    let definition = ProcessDefinition {
      key,
      bpmn_process_id: model.bpmn_process_id,
      version,
      tenant_id,
      catch_points: model.catch_points,
      start_events: model.start_events,
    };
    Ok(self.definitions.entry(key).or_insert(definition))
  }

  pub fn get(&self, key: DefinitionKey) -> Option<&ProcessDefinition> {
    self.definitions.get(&key)
  }

  pub fn require(&self, key: DefinitionKey) -> VigilResult<&ProcessDefinition> {
    self
      .definitions
      .get(&key)
      .ok_or(VigilError::DefinitionNotFound { definition_key: key })
  }

  pub fn latest(&self, bpmn_process_id: &str, tenant_id: &str) -> Option<&ProcessDefinition> {
    self
      .versions
      .get(&(tenant_id.to_string(), bpmn_process_id.to_string()))
      .and_then(|keys| keys.last())
      .and_then(|key| self.definitions.get(key))
  }

  /// The latest version of every process of `tenant_id`, in deployment order.
  pub fn latest_for_tenant(&self, tenant_id: &str) -> Vec<&ProcessDefinition> {
    self
      .definitions
      .values()
      .filter(|definition| definition.tenant_id == tenant_id)
      .filter(|definition| {
        self
          .latest(&definition.bpmn_process_id, tenant_id)
          .is_some_and(|latest| latest.key == definition.key)
      })
      .collect()
  }

  pub fn iter(&self) -> impl Iterator<Item = &ProcessDefinition> {
    self.definitions.values()
  }
}
