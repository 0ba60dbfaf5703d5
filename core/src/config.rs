// vigil/src/config.rs

use crate::core::keys::MAX_PARTITION_ID;
use crate::error::{VigilError, VigilResult};
use std::env;
use std::str::FromStr;
use tracing::{event, Level};

pub const DEFAULT_TENANT_ID: &str = "<default>";

/// Engine settings. Every field has a default; [`EngineConfig::from_env`]
/// overrides them from `VIGIL_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
  /// Encoded into the upper bits of every generated key. At most
  /// [`MAX_PARTITION_ID`].
  pub partition_id: u16,
  /// Tenant used when a deployment or command does not name one.
  pub default_tenant_id: String,
  /// Evaluate a subscription right after it is created.
  pub evaluate_on_subscribe: bool,
  /// Parsed expressions kept by the default evaluator. Zero disables caching.
  pub expression_cache_capacity: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      partition_id: 1,
      default_tenant_id: DEFAULT_TENANT_ID.to_string(),
      evaluate_on_subscribe: true,
      expression_cache_capacity: 256,
    }
  }
}

impl EngineConfig {
  pub fn with_partition_id(mut self, partition_id: u16) -> Self {
    self.partition_id = partition_id;
    self
  }

  pub fn with_default_tenant(mut self, tenant_id: impl Into<String>) -> Self {
    self.default_tenant_id = tenant_id.into();
    self
  }

  pub fn with_evaluate_on_subscribe(mut self, enabled: bool) -> Self {
    self.evaluate_on_subscribe = enabled;
    self
  }

  pub fn with_expression_cache_capacity(mut self, capacity: usize) -> Self {
    self.expression_cache_capacity = capacity;
    self
  }

  /// Reads `VIGIL_PARTITION_ID`, `VIGIL_DEFAULT_TENANT`,
  /// `VIGIL_EVALUATE_ON_SUBSCRIBE` and `VIGIL_EXPRESSION_CACHE_CAPACITY`.
  /// Unset variables keep their defaults; unparsable ones are an error.
  pub fn from_env() -> VigilResult<Self> {
    let defaults = Self::default();

    let get_env = |var_name: &str| env::var(var_name).ok().filter(|v| !v.trim().is_empty());

    fn parse<T: FromStr>(var_name: &str, raw: String) -> VigilResult<T>
    where
      T::Err: std::fmt::Display,
    {
      raw.trim().parse::<T>().map_err(|e| VigilError::Configuration {
        key: var_name.to_string(),
        message: format!("invalid value '{}': {}", raw, e),
      })
    }

    let partition_id = match get_env("VIGIL_PARTITION_ID") {
      Some(raw) => parse::<u16>("VIGIL_PARTITION_ID", raw)?,
      None => defaults.partition_id,
    };
    if partition_id > MAX_PARTITION_ID {
      return Err(VigilError::Configuration {
        key: "VIGIL_PARTITION_ID".to_string(),
        message: format!("{} exceeds the maximum partition id {}", partition_id, MAX_PARTITION_ID),
      });
    }
    let default_tenant_id = get_env("VIGIL_DEFAULT_TENANT").unwrap_or(defaults.default_tenant_id);
    let evaluate_on_subscribe = match get_env("VIGIL_EVALUATE_ON_SUBSCRIBE") {
      Some(raw) => parse::<bool>("VIGIL_EVALUATE_ON_SUBSCRIBE", raw)?,
      None => defaults.evaluate_on_subscribe,
    };
    let expression_cache_capacity = match get_env("VIGIL_EXPRESSION_CACHE_CAPACITY") {
      Some(raw) => parse::<usize>("VIGIL_EXPRESSION_CACHE_CAPACITY", raw)?,
      None => defaults.expression_cache_capacity,
    };

    let config = Self {
      partition_id,
      default_tenant_id,
      evaluate_on_subscribe,
      expression_cache_capacity,
    };
    event!(Level::INFO, ?config, "Engine configuration loaded.");
    Ok(config)
  }
}
