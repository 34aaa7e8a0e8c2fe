//! On-device key/value store port
//!
//! The local backend persists everything as JSON strings under string keys,
//! mirroring the browser-style storage the guest experience was built on.

use crate::domain::result::Result;

/// Synchronous string key/value primitive
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;

    /// All keys currently stored, in no particular order
    fn keys(&self) -> Result<Vec<String>>;

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Read-modify-write a single key.
    ///
    /// The closure sees the current value and returns `Some(new)` to store it
    /// or `None` to leave the key untouched. The default is not atomic; stores
    /// shared between threads or processes override it to hold their lock
    /// across the whole cycle.
    fn modify(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<&str>) -> Result<Option<String>>,
    ) -> Result<()> {
        let current = self.get(key)?;
        if let Some(next) = f(current.as_deref())? {
            self.set(key, &next)?;
        }
        Ok(())
    }

    /// Remove several keys; stores backed by a file override this to write once
    fn remove_many(&self, keys: &[String]) -> Result<()> {
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }
}
