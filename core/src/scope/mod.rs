// vigil/src/scope/mod.rs

//! The live scope tree and variable resolution across it.

pub mod store;

pub use store::{ElementState, Scope, ScopeKind, ScopeStore};

use crate::core::keys::ScopeKey;
use crate::expression::VariableResolver;
use serde_json::Value;

/// Resolves variables as seen from one scope of a [`ScopeStore`].
#[derive(Debug, Clone, Copy)]
pub struct ScopeView<'a> {
  store: &'a ScopeStore,
  scope_key: ScopeKey,
}

impl<'a> ScopeView<'a> {
  pub fn new(store: &'a ScopeStore, scope_key: ScopeKey) -> Self {
    Self { store, scope_key }
  }
}

impl VariableResolver for ScopeView<'_> {
  fn resolve(&self, name: &str) -> Option<&Value> {
    self.store.resolve(self.scope_key, name)
  }
}

impl ScopeStore {
  pub fn view(&self, scope_key: ScopeKey) -> ScopeView<'_> {
    ScopeView::new(self, scope_key)
  }
}
