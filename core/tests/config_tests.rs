// tests/config_tests.rs
mod common;

use common::*;
use serial_test::serial;
use std::env;
use vigil::config::DEFAULT_TENANT_ID;
use vigil::core::keys::MAX_PARTITION_ID;
use vigil::{Engine, EngineConfig, VigilError};

const VARS: [&str; 4] = [
  "VIGIL_PARTITION_ID",
  "VIGIL_DEFAULT_TENANT",
  "VIGIL_EVALUATE_ON_SUBSCRIBE",
  "VIGIL_EXPRESSION_CACHE_CAPACITY",
];

fn clear_env() {
  for var in VARS {
    env::remove_var(var);
  }
}

#[test]
#[serial]
fn from_env_without_variables_gives_defaults() {
  setup_tracing();
  clear_env();

  let config = EngineConfig::from_env().unwrap();

  assert_eq!(config, EngineConfig::default());
  assert_eq!(config.default_tenant_id, DEFAULT_TENANT_ID);
}

#[test]
#[serial]
fn from_env_reads_every_variable() {
  setup_tracing();
  clear_env();
  env::set_var("VIGIL_PARTITION_ID", "7");
  env::set_var("VIGIL_DEFAULT_TENANT", "acme");
  env::set_var("VIGIL_EVALUATE_ON_SUBSCRIBE", "false");
  env::set_var("VIGIL_EXPRESSION_CACHE_CAPACITY", " 0 ");

  let config = EngineConfig::from_env();
  clear_env();

  assert_eq!(
    config.unwrap(),
    EngineConfig::default()
      .with_partition_id(7)
      .with_default_tenant("acme")
      .with_evaluate_on_subscribe(false)
      .with_expression_cache_capacity(0)
  );
}

#[test]
#[serial]
fn empty_variables_keep_defaults() {
  setup_tracing();
  clear_env();
  env::set_var("VIGIL_DEFAULT_TENANT", "  ");

  let config = EngineConfig::from_env();
  clear_env();

  assert_eq!(config.unwrap().default_tenant_id, DEFAULT_TENANT_ID);
}

#[test]
#[serial]
fn unparsable_values_are_configuration_errors() {
  setup_tracing();
  clear_env();
  env::set_var("VIGIL_EVALUATE_ON_SUBSCRIBE", "sometimes");

  let result = EngineConfig::from_env();
  clear_env();

  match result {
    Err(VigilError::Configuration { key, .. }) => assert_eq!(key, "VIGIL_EVALUATE_ON_SUBSCRIBE"),
    other => panic!("expected a configuration error, got {:?}", other),
  }
}

#[test]
#[serial]
fn partition_id_out_of_range_is_rejected() {
  setup_tracing();
  clear_env();
  env::set_var("VIGIL_PARTITION_ID", "70000");

  let result = EngineConfig::from_env();
  clear_env();

  assert!(matches!(result, Err(VigilError::Configuration { .. })));
}

#[test]
#[serial]
fn partition_id_must_fit_the_key_encoding() {
  setup_tracing();
  clear_env();
  env::set_var("VIGIL_PARTITION_ID", "8192");

  let result = EngineConfig::from_env();
  env::set_var("VIGIL_PARTITION_ID", "8191");
  let largest = EngineConfig::from_env();
  clear_env();

  match result {
    Err(VigilError::Configuration { key, .. }) => assert_eq!(key, "VIGIL_PARTITION_ID"),
    other => panic!("expected a configuration error, got {:?}", other),
  }
  assert_eq!(largest.unwrap().partition_id, MAX_PARTITION_ID);

  // A builder-set partition id is checked when the engine is created.
  let engine = Engine::new(EngineConfig::default().with_partition_id(8192));
  assert!(matches!(engine, Err(VigilError::Configuration { .. })));
}
