use super::{StorageArea, StorageEvent};
use crate::error::StorageError;
use crate::runtime::{ContextId, OriginInner};
use std::sync::Arc;

/// One context's view of its origin's persistent store.
///
/// Reads and writes go straight to the shared store. A write that changes
/// the stored string queues a [`StorageEvent`] for every other context of
/// the origin; the writing context never hears about its own writes.
pub struct LocalStorage {
    origin: Arc<OriginInner>,
    context: ContextId,
}

impl LocalStorage {
    pub(crate) fn new(origin: Arc<OriginInner>, context: ContextId) -> Self {
        Self { origin, context }
    }
}

impl StorageArea for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.origin.store.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let old_value = self.origin.store.replace(key, value)?;
        if old_value.as_deref() != Some(value) {
            self.origin.broadcast(
                self.context,
                StorageEvent {
                    key: key.to_string(),
                    old_value,
                    new_value: Some(value.to_string()),
                },
            );
        }
        Ok(())
    }
}

impl std::fmt::Debug for LocalStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStorage")
            .field("context", &self.context)
            .finish()
    }
}
