// vigil/src/scope/store.rs

//! Arena-backed store of the live scope tree.
//!
//! Scopes are addressed by [`ScopeKey`] from the outside and by arena index on
//! the inside; parents and children are stored as indices, so traversal never
//! needs shared mutable references.

use crate::core::keys::{ProcessInstanceKey, ScopeKey};
use crate::core::value::{VariableEvent, Variables};
use crate::error::{VigilError, VigilResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{event, Level};

/// The kind of element instance owning a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScopeKind {
  ProcessInstance,
  SubProcess,
  EventSubProcess,
  MultiInstanceBody,
  MultiInstanceChild,
  Activity,
}

/// Lifecycle state of the element instance owning a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElementState {
  Activating,
  Activated,
  Completing,
  Terminating,
}

/// One node of the scope tree.
#[derive(Debug, Clone)]
pub struct Scope {
  key: ScopeKey,
  parent: Option<usize>,
  parent_key: Option<ScopeKey>,
  process_instance_key: ProcessInstanceKey,
  kind: ScopeKind,
  element_id: String,
  state: ElementState,
  depth: u32,
  sequence: u64,
  variables: Variables,
  children: Vec<usize>,
}

impl Scope {
  pub fn key(&self) -> ScopeKey {
    self.key
  }

  pub fn parent_key(&self) -> Option<ScopeKey> {
    self.parent_key
  }

  pub fn process_instance_key(&self) -> ProcessInstanceKey {
    self.process_instance_key
  }

  pub fn kind(&self) -> ScopeKind {
    self.kind
  }

  pub fn element_id(&self) -> &str {
    &self.element_id
  }

  pub fn state(&self) -> ElementState {
    self.state
  }

  /// Distance from the root; the process instance scope has depth 0.
  pub fn depth(&self) -> u32 {
    self.depth
  }

  /// Global creation order within the store.
  pub fn sequence(&self) -> u64 {
    self.sequence
  }

  pub fn variables(&self) -> &Variables {
    &self.variables
  }

  pub fn has_children(&self) -> bool {
    !self.children.is_empty()
  }
}

#[derive(Debug, Default)]
pub struct ScopeStore {
  arena: Vec<Option<Scope>>,
  index: HashMap<ScopeKey, usize>,
  next_sequence: u64,
}

impl ScopeStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.index.len()
  }

  pub fn is_empty(&self) -> bool {
    self.index.is_empty()
  }

  pub fn contains(&self, key: ScopeKey) -> bool {
    self.index.contains_key(&key)
  }

  pub fn get(&self, key: ScopeKey) -> Option<&Scope> {
    self.index.get(&key).and_then(|idx| self.slot(*idx))
  }

  /// Like [`ScopeStore::get`] but fails with `ScopeNotFound`.
  pub fn require(&self, key: ScopeKey) -> VigilResult<&Scope> {
    self.get(key).ok_or(VigilError::ScopeNotFound { scope_key: key })
  }

  fn slot(&self, idx: usize) -> Option<&Scope> {
    self.arena.get(idx).and_then(Option::as_ref)
  }

  fn slot_mut(&mut self, key: ScopeKey) -> VigilResult<&mut Scope> {
    let idx = *self.index.get(&key).ok_or(VigilError::ScopeNotFound { scope_key: key })?;
    self.arena[idx]
      .as_mut()
      .ok_or(VigilError::ScopeNotFound { scope_key: key })
  }

  /// Creates a scope below `parent_key`, or a root scope when `parent_key` is `None`.
  /// New scopes start in the `Activating` state with no variables.
  pub fn create_scope(
    &mut self,
    key: ScopeKey,
    parent_key: Option<ScopeKey>,
    kind: ScopeKind,
    element_id: impl Into<String>,
  ) -> VigilResult<&Scope> {
    if self.index.contains_key(&key) {
      return Err(VigilError::ScopeAlreadyExists { scope_key: key });
    }

    let (parent, depth, process_instance_key) = match parent_key {
      Some(pk) => {
        let pidx = *self.index.get(&pk).ok_or(VigilError::ScopeNotFound { scope_key: pk })?;
        let parent = self.slot(pidx).ok_or(VigilError::ScopeNotFound { scope_key: pk })?;
        (Some(pidx), parent.depth + 1, parent.process_instance_key)
      }
      None => (None, 0, key),
    };

    let idx = self.arena.len();
    let sequence = self.next_sequence;
    self.next_sequence += 1;
    self.arena.push(Some(Scope {
      key,
      parent,
      parent_key,
      process_instance_key,
      kind,
      element_id: element_id.into(),
      state: ElementState::Activating,
      depth,
      sequence,
      variables: Variables::new(),
      children: Vec::new(),
    }));
    self.index.insert(key, idx);
    if let Some(pidx) = parent {
      if let Some(Some(p)) = self.arena.get_mut(pidx) {
        p.children.push(idx);
      }
    }

    event!(Level::TRACE, scope_key = %key, depth, ?kind, "Scope created.");
    self
      .slot(idx)
      .ok_or_else(|| VigilError::Internal(format!("scope {} vanished after insert", key)))
  }

  /// Effective value of `name` as seen from `key`: the local value if present,
  /// otherwise the closest ancestor's.
  pub fn resolve(&self, key: ScopeKey, name: &str) -> Option<&Value> {
    let mut cursor = self.index.get(&key).copied();
    while let Some(idx) = cursor {
      let scope = self.slot(idx)?;
      if let Some(value) = scope.variables.get(name) {
        return Some(value);
      }
      cursor = scope.parent;
    }
    None
  }

  /// All variables visible from `key`, local values shadowing ancestors.
  pub fn visible_variables(&self, key: ScopeKey) -> Variables {
    let mut chain = Vec::new();
    let mut cursor = self.index.get(&key).copied();
    while let Some(idx) = cursor {
      match self.slot(idx) {
        Some(scope) => {
          chain.push(idx);
          cursor = scope.parent;
        }
        None => break,
      }
    }
    let mut merged = Variables::new();
    for idx in chain.into_iter().rev() {
      if let Some(scope) = self.slot(idx) {
        for (name, value) in &scope.variables {
          merged.insert(name.clone(), value.clone());
        }
      }
    }
    merged
  }

  /// True when `ancestor` is `descendant` itself or lies on its parent chain.
  pub fn is_ancestor_or_self(&self, ancestor: ScopeKey, descendant: ScopeKey) -> bool {
    let Some(target) = self.index.get(&ancestor).copied() else {
      return false;
    };
    let mut cursor = self.index.get(&descendant).copied();
    while let Some(idx) = cursor {
      if idx == target {
        return true;
      }
      cursor = self.slot(idx).and_then(|s| s.parent);
    }
    false
  }

  pub fn parent_of(&self, key: ScopeKey) -> Option<ScopeKey> {
    self.get(key).and_then(|s| s.parent_key)
  }

  /// Live children of `key` in creation order.
  pub fn children_of(&self, key: ScopeKey) -> Vec<ScopeKey> {
    self
      .get(key)
      .map(|scope| {
        scope
          .children
          .iter()
          .filter_map(|idx| self.slot(*idx).map(|c| c.key))
          .collect()
      })
      .unwrap_or_default()
  }

  /// `key` followed by all of its descendants, ordered by ascending depth and
  /// then by creation order. This is the top-down evaluation order.
  pub fn subtree_top_down(&self, key: ScopeKey) -> Vec<ScopeKey> {
    let Some(root) = self.index.get(&key).copied() else {
      return Vec::new();
    };
    let mut collected: Vec<(u32, u64, ScopeKey)> = Vec::new();
    let mut stack = vec![root];
    while let Some(idx) = stack.pop() {
      if let Some(scope) = self.slot(idx) {
        collected.push((scope.depth, scope.sequence, scope.key));
        stack.extend(scope.children.iter().copied());
      }
    }
    collected.sort_unstable_by_key(|(depth, sequence, _)| (*depth, *sequence));
    collected.into_iter().map(|(_, _, k)| k).collect()
  }

  /// Descendants of `key` (excluding itself) in top-down order.
  pub fn descendants_of(&self, key: ScopeKey) -> Vec<ScopeKey> {
    let mut subtree = self.subtree_top_down(key);
    if !subtree.is_empty() {
      subtree.remove(0);
    }
    subtree
  }

  /// Writes `name` into the local map of `key`.
  ///
  /// Returns the kind of change, or `None` when the local value is already equal.
  pub fn set_variable(&mut self, key: ScopeKey, name: &str, value: Value) -> VigilResult<Option<VariableEvent>> {
    let scope = self.slot_mut(key)?;
    match scope.variables.get(name) {
      Some(existing) if *existing == value => Ok(None),
      Some(_) => {
        scope.variables.insert(name.to_string(), value);
        Ok(Some(VariableEvent::Update))
      }
      None => {
        scope.variables.insert(name.to_string(), value);
        Ok(Some(VariableEvent::Create))
      }
    }
  }

  pub fn set_state(&mut self, key: ScopeKey, state: ElementState) -> VigilResult<()> {
    self.slot_mut(key)?.state = state;
    Ok(())
  }

  /// Removes `key` and all of its descendants. Returns the removed keys, deepest first.
  pub fn remove_scope(&mut self, key: ScopeKey) -> VigilResult<Vec<ScopeKey>> {
    let idx = *self.index.get(&key).ok_or(VigilError::ScopeNotFound { scope_key: key })?;
    let parent = self.slot(idx).and_then(|s| s.parent);

    let mut removed = self.subtree_top_down(key);
    removed.reverse();
    for k in &removed {
      if let Some(i) = self.index.remove(k) {
        self.arena[i] = None;
      }
    }
    if let Some(pidx) = parent {
      if let Some(Some(p)) = self.arena.get_mut(pidx) {
        p.children.retain(|c| *c != idx);
      }
    }

    event!(Level::TRACE, scope_key = %key, removed = removed.len(), "Scope subtree removed.");
    Ok(removed)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn k(raw: u64) -> ScopeKey {
    ScopeKey(raw)
  }

  /// root(1) -> sub(2) -> task(4)
  ///         -> task(3)
  ///   sub(2) -> task(5)
  fn tree() -> ScopeStore {
    let mut store = ScopeStore::new();
    store.create_scope(k(1), None, ScopeKind::ProcessInstance, "process").unwrap();
    store.create_scope(k(2), Some(k(1)), ScopeKind::SubProcess, "sub").unwrap();
    store.create_scope(k(3), Some(k(1)), ScopeKind::Activity, "task_a").unwrap();
    store.create_scope(k(4), Some(k(2)), ScopeKind::Activity, "task_b").unwrap();
    store.create_scope(k(5), Some(k(2)), ScopeKind::Activity, "task_c").unwrap();
    store
  }

  #[test]
  fn local_variables_shadow_ancestors() {
    let mut store = tree();
    store.set_variable(k(1), "x", json!(1)).unwrap();
    store.set_variable(k(2), "x", json!(2)).unwrap();

    assert_eq!(store.resolve(k(4), "x"), Some(&json!(2)));
    assert_eq!(store.resolve(k(3), "x"), Some(&json!(1)));
    assert_eq!(store.resolve(k(1), "missing"), None);
  }

  #[test]
  fn lookup_never_crosses_into_siblings() {
    let mut store = tree();
    store.set_variable(k(4), "local", json!(true)).unwrap();
    assert_eq!(store.resolve(k(5), "local"), None);
    assert_eq!(store.resolve(k(2), "local"), None);
  }

  #[test]
  fn subtree_is_ordered_by_depth_then_creation() {
    let store = tree();
    assert_eq!(store.subtree_top_down(k(1)), vec![k(1), k(2), k(3), k(4), k(5)]);
    assert_eq!(store.descendants_of(k(2)), vec![k(4), k(5)]);
    assert!(store.descendants_of(k(3)).is_empty());
  }

  #[test]
  fn ancestor_checks() {
    let store = tree();
    assert!(store.is_ancestor_or_self(k(1), k(4)));
    assert!(store.is_ancestor_or_self(k(4), k(4)));
    assert!(!store.is_ancestor_or_self(k(3), k(4)));
    assert!(!store.is_ancestor_or_self(k(4), k(2)));
  }

  #[test]
  fn set_variable_reports_change_kind() {
    let mut store = tree();
    assert_eq!(store.set_variable(k(3), "y", json!(1)).unwrap(), Some(VariableEvent::Create));
    assert_eq!(store.set_variable(k(3), "y", json!(2)).unwrap(), Some(VariableEvent::Update));
    assert_eq!(store.set_variable(k(3), "y", json!(2)).unwrap(), None);
  }

  #[test]
  fn remove_cascades_to_descendants() {
    let mut store = tree();
    let removed = store.remove_scope(k(2)).unwrap();
    assert_eq!(removed, vec![k(5), k(4), k(2)]);
    assert_eq!(store.len(), 2);
    assert_eq!(store.children_of(k(1)), vec![k(3)]);
    assert!(matches!(store.remove_scope(k(2)), Err(VigilError::ScopeNotFound { .. })));
  }

  #[test]
  fn child_inherits_process_instance_key_and_depth() {
    let store = tree();
    let task = store.get(k(4)).unwrap();
    assert_eq!(task.process_instance_key(), k(1));
    assert_eq!(task.depth(), 2);
  }

  #[test]
  fn visible_variables_merge_chain() {
    let mut store = tree();
    store.set_variable(k(1), "a", json!(1)).unwrap();
    store.set_variable(k(1), "b", json!(1)).unwrap();
    store.set_variable(k(2), "b", json!(2)).unwrap();
    let visible = store.visible_variables(k(4));
    assert_eq!(visible.get("a"), Some(&json!(1)));
    assert_eq!(visible.get("b"), Some(&json!(2)));
  }
}
