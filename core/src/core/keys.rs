// vigil/src/core/keys.rs

//! Strongly typed keys and the deterministic key generator.
//!
//! Every key produced by a partition carries the partition id in its upper bits,
//! so keys from different partitions never collide and a replay of the same
//! journal on the same partition produces the same keys.

use crate::error::{VigilError, VigilResult};
use serde::{Deserialize, Serialize};
use std::fmt;

const PARTITION_BITS_OFFSET: u32 = 51;

/// Largest partition id that fits in the 13 bits above the key counter.
pub const MAX_PARTITION_ID: u16 = (1 << (64 - PARTITION_BITS_OFFSET)) - 1;

macro_rules! key_type {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct $name(pub u64);

    impl $name {
      pub fn value(self) -> u64 {
        self.0
      }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
      }
    }

    impl From<u64> for $name {
      fn from(raw: u64) -> Self {
        $name(raw)
      }
    }
  };
}

key_type!(
  /// Key of a scope, which is also the key of the element instance owning it.
  ScopeKey
);
key_type!(
  /// Key of a conditional subscription.
  SubscriptionKey
);
key_type!(
  /// Key of a deployed process definition.
  DefinitionKey
);

/// The process instance key is the key of the root scope.
pub type ProcessInstanceKey = ScopeKey;

/// Monotonic key generator for one partition.
#[derive(Debug, Clone)]
pub struct KeyGenerator {
  partition_id: u16,
  next: u64,
}

impl KeyGenerator {
  pub fn new(partition_id: u16) -> VigilResult<Self> {
    if partition_id > MAX_PARTITION_ID {
      return Err(VigilError::Configuration {
        key: "partitionId".to_string(),
        message: format!("{} exceeds the maximum partition id {}", partition_id, MAX_PARTITION_ID),
      });
    }
    Ok(Self {
      partition_id,
      next: ((partition_id as u64) << PARTITION_BITS_OFFSET) + 1,
    })
  }

  pub fn partition_id(&self) -> u16 {
    self.partition_id
  }

  pub fn next_raw(&mut self) -> u64 {
    let key = self.next;
    self.next += 1;
    key
  }

  pub fn next_scope_key(&mut self) -> ScopeKey {
    ScopeKey(self.next_raw())
  }

  pub fn next_subscription_key(&mut self) -> SubscriptionKey {
    SubscriptionKey(self.next_raw())
  }

  pub fn next_definition_key(&mut self) -> DefinitionKey {
    DefinitionKey(self.next_raw())
  }

  /// Decodes the partition id a key was generated on.
  pub fn decode_partition_id(key: u64) -> u16 {
    (key >> PARTITION_BITS_OFFSET) as u16
  }
}
