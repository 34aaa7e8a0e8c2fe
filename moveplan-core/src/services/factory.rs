//! Provider factory - picks the storage backend for a mode

use std::sync::Arc;

use crate::adapters::duckdb::{DuckDbDataProvider, DuckDbStore};
use crate::adapters::local::LocalDataProvider;
use crate::ports::MoveDataProvider;
use crate::services::guest::GuestSession;

pub use crate::ports::StorageMode;

/// Builds providers over shared backends
///
/// Every call returns a fresh provider; callers that want reuse memoize.
#[derive(Clone)]
pub struct ProviderFactory {
    guest: GuestSession,
    remote: Arc<DuckDbStore>,
}

impl ProviderFactory {
    pub fn new(guest: GuestSession, remote: Arc<DuckDbStore>) -> Self {
        Self { guest, remote }
    }

    pub fn create(&self, mode: StorageMode) -> Arc<dyn MoveDataProvider> {
        tracing::debug!(%mode, "creating data provider");
        match mode {
            StorageMode::Local => Arc::new(LocalDataProvider::new(self.guest.clone())),
            StorageMode::Database => Arc::new(DuckDbDataProvider::new(Arc::clone(&self.remote))),
        }
    }

    pub fn guest(&self) -> &GuestSession {
        &self.guest
    }

    pub fn remote(&self) -> &Arc<DuckDbStore> {
        &self.remote
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::domain::NewTask;

    fn factory() -> ProviderFactory {
        ProviderFactory::new(
            GuestSession::new(Arc::new(MemoryStore::new())),
            Arc::new(DuckDbStore::open_in_memory().unwrap()),
        )
    }

    #[test]
    fn test_create_matches_mode() {
        let factory = factory();
        assert_eq!(factory.create(StorageMode::Local).mode(), StorageMode::Local);
        assert_eq!(
            factory.create(StorageMode::Database).mode(),
            StorageMode::Database
        );
    }

    #[tokio::test]
    async fn test_providers_share_backends() {
        let factory = factory();
        let first = factory.create(StorageMode::Database);
        first.add_task("h1", NewTask::new("Call movers")).await.unwrap();

        let second = factory.create(StorageMode::Database);
        assert_eq!(second.list_tasks("h1").await.unwrap().len(), 1);
        // Modes never see each other's data
        let local = factory.create(StorageMode::Local);
        assert!(local.list_tasks("h1").await.unwrap().is_empty());
    }
}
