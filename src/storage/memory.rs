use super::StorageArea;
use crate::error::StorageError;
use parking_lot::Mutex;
use std::collections::HashMap;

/// In-memory string store with an optional size limit.
///
/// The limit counts the bytes of every key and value held, like a browser
/// storage quota.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that refuses writes once `limit` bytes are used.
    pub fn with_quota(limit: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota: Some(limit),
        }
    }

    /// Remove a key, returning its previous value.
    pub fn remove(&self, key: &str) -> Option<String> {
        self.entries.lock().remove(key)
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Store `value` and return what was there before.
    pub(crate) fn replace(&self, key: &str, value: &str) -> Result<Option<String>, StorageError> {
        let mut entries = self.entries.lock();
        if let Some(limit) = self.quota {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if used + key.len() + value.len() > limit {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    limit,
                });
            }
        }
        Ok(entries.insert(key.to_string(), value.to_string()))
    }
}

impl StorageArea for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.replace(key, value).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_set_remove() {
        let store = MemoryStorage::new();
        assert_eq!(store.get("a").unwrap(), None);

        store.set("a", "1").unwrap();
        store.set("a", "2").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("2"));
        assert_eq!(store.len(), 1);

        assert_eq!(store.remove("a").as_deref(), Some("2"));
        assert!(store.is_empty());
    }

    #[test]
    fn quota_counts_keys_and_values() {
        let store = MemoryStorage::with_quota(8);
        store.set("ab", "cdef").unwrap();
        // Overwriting the same key only counts the new value.
        store.set("ab", "cdefgh").unwrap();

        let err = store.set("x", "yz").unwrap_err();
        assert_eq!(
            err,
            StorageError::QuotaExceeded {
                key: "x".to_string(),
                limit: 8
            }
        );
        assert_eq!(store.get("x").unwrap(), None);
    }

    #[test]
    fn clear_empties_store() {
        let store = MemoryStorage::new();
        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        store.clear();
        assert_eq!(store.len(), 0);
    }
}
