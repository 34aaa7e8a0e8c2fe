//! File-backed key/value store
//!
//! The whole store is one JSON object on disk mapping keys to string values.
//! Every operation takes an advisory lock on a sidecar `.lock` file and
//! re-reads the store, so several handles in one process or in several
//! processes never lose each other's writes. Writes land in a temp file in
//! the same directory and are renamed over the store.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;
use tempfile::NamedTempFile;

use crate::domain::result::{Error, Result};
use crate::ports::KeyValueStore;

type Entries = BTreeMap<String, String>;

pub struct JsonFileStore {
    path: PathBuf,
    lock_path: PathBuf,
    guard: Mutex<()>,
}

#[derive(Clone, Copy)]
enum LockKind {
    Shared,
    Exclusive,
}

impl JsonFileStore {
    /// Open (or prepare to create) a store at `path`
    ///
    /// The file itself is created lazily on the first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut lock_name = path.as_os_str().to_owned();
        lock_name.push(".lock");

        Ok(Self {
            lock_path: PathBuf::from(lock_name),
            path,
            guard: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` while holding both the in-process guard and the file lock
    fn locked<T>(&self, kind: LockKind, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let _guard = self
            .guard
            .lock()
            .map_err(|_| Error::lock_poisoned("json file store"))?;

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)?;
        match kind {
            LockKind::Shared => FileExt::lock_shared(&lock_file)?,
            LockKind::Exclusive => FileExt::lock_exclusive(&lock_file)?,
        }

        let result = f();
        FileExt::unlock(&lock_file)?;
        result
    }

    fn read_entries(&self) -> Result<Entries> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) => return Err(e.into()),
        };
        if file.metadata()?.len() == 0 {
            return Ok(Entries::new());
        }
        serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            Error::storage(format!(
                "store file {} is unreadable: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn write_entries(&self, entries: &Entries) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, entries)?;
        tmp.flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    fn update(&self, f: impl FnOnce(&mut Entries) -> Result<bool>) -> Result<()> {
        self.locked(LockKind::Exclusive, || {
            let mut entries = self.read_entries()?;
            if f(&mut entries)? {
                self.write_entries(&entries)?;
            }
            Ok(())
        })
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.locked(LockKind::Shared, || Ok(self.read_entries()?.remove(key)))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
            Ok(true)
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|entries| Ok(entries.remove(key).is_some()))
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.locked(LockKind::Shared, || {
            Ok(self.read_entries()?.into_keys().collect())
        })
    }

    fn modify(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<&str>) -> Result<Option<String>>,
    ) -> Result<()> {
        self.update(|entries| match f(entries.get(key).map(String::as_str))? {
            Some(next) => {
                entries.insert(key.to_string(), next);
                Ok(true)
            }
            None => Ok(false),
        })
    }

    fn remove_many(&self, keys: &[String]) -> Result<()> {
        self.update(|entries| {
            let before = entries.len();
            for key in keys {
                entries.remove(key);
            }
            Ok(entries.len() != before)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> JsonFileStore {
        JsonFileStore::open(dir.path().join("guest-store.json")).unwrap()
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.get("anything").unwrap(), None);
        assert!(store.keys().unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        store_in(&dir).set("h1-tasks", "[]").unwrap();

        let reopened = store_in(&dir);
        assert_eq!(reopened.get("h1-tasks").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_two_handles_see_each_other() {
        let dir = TempDir::new().unwrap();
        let a = store_in(&dir);
        let b = store_in(&dir);

        a.set("one", "1").unwrap();
        b.set("two", "2").unwrap();

        let mut keys = a.keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn test_remove_many() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        for key in ["a", "b", "c"] {
            store.set(key, "x").unwrap();
        }
        store
            .remove_many(&["a".to_string(), "c".to_string(), "zzz".to_string()])
            .unwrap();
        assert_eq!(store.keys().unwrap(), vec!["b".to_string()]);
    }

    #[test]
    fn test_corrupt_file_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "{not json").unwrap();

        assert!(matches!(store.get("a"), Err(Error::Storage(_))));
        assert!(matches!(store.keys(), Err(Error::Storage(_))));
        // A failed read must not clobber the file
        assert!(store.set("a", "1").is_err());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "{not json");
    }
}
