//! In-memory key/value store
//!
//! Backs ephemeral sessions and tests. Nothing survives the process.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::domain::result::{Error, Result};
use crate::ports::KeyValueStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every stored entry
    pub fn snapshot(&self) -> Result<HashMap<String, String>> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| Error::lock_poisoned("memory store"))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    fn modify(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<&str>) -> Result<Option<String>>,
    ) -> Result<()> {
        let mut entries = self.lock()?;
        let next = f(entries.get(key).map(String::as_str))?;
        if let Some(next) = next {
            entries.insert(key.to_string(), next);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a").unwrap(), None);

        store.set("a", "1").unwrap();
        store.set("b", "2").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        assert!(store.contains("b").unwrap());

        store.remove("a").unwrap();
        store.remove("missing").unwrap();
        assert_eq!(store.keys().unwrap(), vec!["b".to_string()]);
    }

    #[test]
    fn test_modify_none_leaves_key() {
        let store = MemoryStore::new();
        store.set("counter", "1").unwrap();

        store.modify("counter", &mut |_| Ok(None)).unwrap();
        assert_eq!(store.get("counter").unwrap().as_deref(), Some("1"));

        store
            .modify("counter", &mut |current| {
                let n: u64 = current.and_then(|c| c.parse().ok()).unwrap_or(0);
                Ok(Some((n + 1).to_string()))
            })
            .unwrap();
        assert_eq!(store.get("counter").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_modify_error_propagates() {
        let store = MemoryStore::new();
        let result = store.modify("k", &mut |_| Err(Error::storage("nope")));
        assert!(matches!(result, Err(Error::Storage(_))));
        assert!(store.snapshot().unwrap().is_empty());
    }
}
