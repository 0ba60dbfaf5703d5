// vigil/src/core/shared.rs

//! Lock-protected state the engine shares with readers outside it.
//!
//! The engine is the only writer. Readers are exporters running on async
//! tasks and in-memory sinks, and each takes a clone of the handle. Guards
//! must be dropped before awaiting anything.

use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::sync::Arc;

/// Cloneable handle; every clone sees the same value.
#[derive(Debug)]
pub struct Shared<T: Send + Sync + 'static>(Arc<RwLock<T>>);

impl<T: Send + Sync + 'static> Shared<T> {
  pub fn new(value: T) -> Self {
    Shared(Arc::new(RwLock::new(value)))
  }

  pub fn read(&self) -> RwLockReadGuard<'_, T> {
    self.0.read()
  }

  /// Held by the engine while it appends records.
  pub fn write(&self) -> RwLockWriteGuard<'_, T> {
    self.0.write()
  }

  /// Borrows part of the value, e.g. the tail of the record log an exporter
  /// has not seen yet.
  pub fn map_read<F, U: ?Sized>(&self, f: F) -> MappedRwLockReadGuard<'_, U>
  where
    F: FnOnce(&T) -> &U,
  {
    RwLockReadGuard::map(self.read(), f)
  }
}

impl<T: Send + Sync + 'static> Clone for Shared<T> {
  fn clone(&self) -> Self {
    Shared(Arc::clone(&self.0))
  }
}

impl<T: Send + Sync + 'static + Default> Default for Shared<T> {
  fn default() -> Self {
    Self::new(T::default())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn clones_observe_appends() {
    let log: Shared<Vec<u64>> = Shared::default();
    let reader = log.clone();
    log.write().extend([1, 2, 3]);

    assert_eq!(reader.read().len(), 3);
    assert_eq!(&*reader.map_read(|positions| &positions[1..]), &[2, 3]);
  }
}
