// vigil/src/subscription/registry.rs

use super::ConditionalSubscription;
use crate::core::keys::{ScopeKey, SubscriptionKey};
use crate::error::{VigilError, VigilResult};
use crate::scope::ScopeStore;
use std::collections::{BTreeMap, HashMap};
use tracing::{event, Level};

/// Live conditional subscriptions, unique per (evaluation scope, catch event id).
///
/// Subscription keys are allocated monotonically, so key order is creation order.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
  by_key: BTreeMap<SubscriptionKey, ConditionalSubscription>,
  by_scope: HashMap<ScopeKey, BTreeMap<String, SubscriptionKey>>,
}

impl SubscriptionRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.by_key.len()
  }

  pub fn is_empty(&self) -> bool {
    self.by_key.is_empty()
  }

  /// Stores `subscription`, failing if its (scope, catch event id) pair is taken.
  pub fn create(&mut self, subscription: ConditionalSubscription) -> VigilResult<&ConditionalSubscription> {
    let taken = self
      .by_scope
      .get(&subscription.scope_key)
      .is_some_and(|per_scope| per_scope.contains_key(&subscription.catch_event_id));
    if taken {
      return Err(VigilError::SubscriptionAlreadyExists {
        scope_key: subscription.scope_key,
        catch_event_id: subscription.catch_event_id,
      });
    }
    if self.by_key.contains_key(&subscription.key) {
      return Err(VigilError::Internal(format!(
        "subscription key {} allocated twice",
        subscription.key
      )));
    }
    self
      .by_scope
      .entry(subscription.scope_key)
      .or_default()
      .insert(subscription.catch_event_id.clone(), subscription.key);

    let key = subscription.key;
    event!(Level::TRACE, subscription_key = %key, scope_key = %subscription.scope_key, catch_event_id = %subscription.catch_event_id, "Subscription stored.");
    Ok(self.by_key.entry(key).or_insert(subscription))
  }

  /// Removes the subscription if it is still live. Deleting twice is a no-op.
  pub fn delete(&mut self, key: SubscriptionKey) -> Option<ConditionalSubscription> {
    let removed = self.by_key.remove(&key)?;
    if let Some(per_scope) = self.by_scope.get_mut(&removed.scope_key) {
      per_scope.remove(&removed.catch_event_id);
      if per_scope.is_empty() {
        self.by_scope.remove(&removed.scope_key);
      }
    }
    Some(removed)
  }

  pub fn get(&self, key: SubscriptionKey) -> Option<&ConditionalSubscription> {
    self.by_key.get(&key)
  }

  pub fn contains(&self, key: SubscriptionKey) -> bool {
    self.by_key.contains_key(&key)
  }

  pub fn find(&self, scope_key: ScopeKey, catch_event_id: &str) -> Option<&ConditionalSubscription> {
    self
      .by_scope
      .get(&scope_key)
      .and_then(|per_scope| per_scope.get(catch_event_id))
      .and_then(|key| self.by_key.get(key))
  }

  /// Keys of the subscriptions evaluated at `scope_key`, in creation order.
  pub fn keys_for_scope(&self, scope_key: ScopeKey) -> Vec<SubscriptionKey> {
    let mut keys: Vec<SubscriptionKey> = self
      .by_scope
      .get(&scope_key)
      .map(|per_scope| per_scope.values().copied().collect())
      .unwrap_or_default();
    keys.sort_unstable();
    keys
  }

  /// Subscriptions evaluated at `scope_key`, in creation order.
  pub fn for_scope(&self, scope_key: ScopeKey) -> Vec<&ConditionalSubscription> {
    self
      .keys_for_scope(scope_key)
      .into_iter()
      .filter_map(|key| self.by_key.get(&key))
      .collect()
  }

  /// Every subscription that can see a write at `write_scope`: those evaluated at
  /// the write scope or any of its descendants. Ordered top-down by scope, then
  /// by creation within a scope.
  pub fn candidates_for_write(&self, scopes: &ScopeStore, write_scope: ScopeKey) -> Vec<SubscriptionKey> {
    if self.by_key.is_empty() {
      return Vec::new();
    }
    scopes
      .subtree_top_down(write_scope)
      .into_iter()
      .flat_map(|scope_key| self.keys_for_scope(scope_key))
      .collect()
  }

  pub fn iter(&self) -> impl Iterator<Item = &ConditionalSubscription> {
    self.by_key.values()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::scope::ScopeKind;
  use crate::subscription::{CatchKind, ConditionalCatchPoint};

  fn sub(key: u64, scope: u64, catch_event_id: &str) -> ConditionalSubscription {
    let point = ConditionalCatchPoint::boundary(catch_event_id, "x > 10");
    ConditionalSubscription {
      key: SubscriptionKey(key),
      process_instance_key: ScopeKey(1),
      process_definition_key: None,
      tenant_id: "<default>".into(),
      scope_key: ScopeKey(scope),
      element_instance_key: ScopeKey(scope),
      catch_event_id: point.catch_event_id,
      condition: point.condition,
      variable_names: point.variable_names,
      variable_events: point.variable_events,
      interrupting: point.interrupting,
      kind: CatchKind::Boundary,
    }
  }

  #[test]
  fn duplicate_scope_and_event_is_rejected() {
    let mut registry = SubscriptionRegistry::new();
    registry.create(sub(10, 2, "b")).unwrap();
    let err = registry.create(sub(11, 2, "b")).unwrap_err();
    assert!(matches!(err, VigilError::SubscriptionAlreadyExists { .. }));
    // same event id on another scope is fine
    registry.create(sub(12, 3, "b")).unwrap();
    assert_eq!(registry.len(), 2);
  }

  #[test]
  fn rejected_create_leaves_no_scope_entry() {
    let mut registry = SubscriptionRegistry::new();
    registry.create(sub(10, 2, "b")).unwrap();
    let err = registry.create(sub(10, 3, "c")).unwrap_err();
    assert!(matches!(err, VigilError::Internal(_)));
    assert!(!registry.by_scope.contains_key(&ScopeKey(3)));
    assert!(registry.keys_for_scope(ScopeKey(3)).is_empty());
  }

  #[test]
  fn delete_is_idempotent() {
    let mut registry = SubscriptionRegistry::new();
    registry.create(sub(10, 2, "b")).unwrap();
    assert!(registry.delete(SubscriptionKey(10)).is_some());
    assert!(registry.delete(SubscriptionKey(10)).is_none());
    assert!(registry.find(ScopeKey(2), "b").is_none());
    // the pair is free again
    registry.create(sub(11, 2, "b")).unwrap();
  }

  #[test]
  fn candidates_follow_scope_order_then_creation() {
    let mut scopes = ScopeStore::new();
    scopes.create_scope(ScopeKey(1), None, ScopeKind::ProcessInstance, "p").unwrap();
    scopes.create_scope(ScopeKey(2), Some(ScopeKey(1)), ScopeKind::SubProcess, "s").unwrap();
    scopes.create_scope(ScopeKey(3), Some(ScopeKey(2)), ScopeKind::Activity, "t").unwrap();
    scopes.create_scope(ScopeKey(4), Some(ScopeKey(1)), ScopeKind::Activity, "u").unwrap();

    let mut registry = SubscriptionRegistry::new();
    registry.create(sub(20, 3, "inner")).unwrap();
    registry.create(sub(21, 2, "outer_b")).unwrap();
    registry.create(sub(22, 2, "outer_a")).unwrap();
    registry.create(sub(23, 4, "sibling")).unwrap();
    registry.create(sub(24, 1, "root")).unwrap();

    let from_root = registry.candidates_for_write(&scopes, ScopeKey(1));
    assert_eq!(
      from_root,
      vec![SubscriptionKey(24), SubscriptionKey(21), SubscriptionKey(22), SubscriptionKey(23), SubscriptionKey(20)]
    );

    let from_sub = registry.candidates_for_write(&scopes, ScopeKey(2));
    assert_eq!(from_sub, vec![SubscriptionKey(21), SubscriptionKey(22), SubscriptionKey(20)]);

    assert_eq!(registry.candidates_for_write(&scopes, ScopeKey(4)), vec![SubscriptionKey(23)]);
  }
}
