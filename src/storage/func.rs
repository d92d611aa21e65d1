use super::StorageArea;
use crate::error::StorageError;
use std::sync::Arc;

type GetFn = Arc<dyn Fn(&str) -> Result<Option<String>, StorageError> + Send + Sync>;
type SetFn = Arc<dyn Fn(&str, &str) -> Result<(), StorageError> + Send + Sync>;

/// A [`StorageArea`] made of two closures, for plugging in a store the
/// crate knows nothing about.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use std::sync::{Arc, Mutex};
/// use tincan_storage::storage::{FnStorage, StorageArea};
///
/// let map = Arc::new(Mutex::new(HashMap::<String, String>::new()));
/// let storage = FnStorage::new(
///     {
///         let map = map.clone();
///         move |key: &str| Ok(map.lock().unwrap().get(key).cloned())
///     },
///     {
///         let map = map.clone();
///         move |key: &str, value: &str| {
///             map.lock().unwrap().insert(key.to_string(), value.to_string());
///             Ok(())
///         }
///     },
/// );
///
/// storage.set("a", "1").unwrap();
/// assert_eq!(storage.get("a").unwrap().as_deref(), Some("1"));
/// ```
#[derive(Clone)]
pub struct FnStorage {
    get: GetFn,
    set: SetFn,
}

impl FnStorage {
    pub fn new<G, S>(get: G, set: S) -> Self
    where
        G: Fn(&str) -> Result<Option<String>, StorageError> + Send + Sync + 'static,
        S: Fn(&str, &str) -> Result<(), StorageError> + Send + Sync + 'static,
    {
        Self {
            get: Arc::new(get),
            set: Arc::new(set),
        }
    }
}

impl StorageArea for FnStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (self.get)(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (self.set)(key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_pass_through() {
        let storage = FnStorage::new(
            |_| Err(StorageError::backend("offline")),
            |_, _| Err(StorageError::backend("read only")),
        );

        assert_eq!(
            storage.get("k").unwrap_err(),
            StorageError::backend("offline")
        );
        assert_eq!(
            storage.set("k", "v").unwrap_err(),
            StorageError::backend("read only")
        );
    }
}
