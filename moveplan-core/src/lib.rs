//! Moveplan Core - storage and migration logic for move planning
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Move records (Task, Expense, TimelineEvent, ...) and their merge rules
//! - **ports**: Trait definitions for storage (MoveDataProvider, KeyValueStore, WorkspaceDirectory)
//! - **services**: Guest session, provider factory, guest migration, session wiring
//! - **adapters**: Concrete implementations (JSON file / in-memory key-value stores, DuckDB)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::duckdb::DuckDbStore;
use adapters::json_file::JsonFileStore;
use config::{Config, DATABASE_FILENAME, GUEST_STORE_FILENAME};
use services::{EntryPoint, GuestSession, LogEvent, LoggingService, ProviderFactory, SessionService};

// Re-export commonly used types at crate root
pub use domain::result::{Error, Result as CoreResult};
pub use domain::{
    Budget, BudgetPatch, Disposition, EntityKind, Expense, ExpensePatch, Hub, InventoryItem,
    InventoryItemPatch, MoveDetails, MoveDetailsPatch, NewExpense, NewInventoryItem, NewTask,
    NewTimelineEvent, Task, TaskPatch, TaskPriority, TaskStatus, TimelineEvent,
    TimelineEventPatch, User,
};
pub use ports::{KeyValueStore, MoveDataProvider, ReadFallback, StorageMode, WorkspaceDirectory};

/// Main context for Moveplan operations
///
/// This is the primary entry point: it opens both stores in the data
/// directory and wires the services over them.
pub struct MoveplanContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub guest_store: Arc<JsonFileStore>,
    pub remote: Arc<DuckDbStore>,
    /// `None` when logs.duckdb could not be opened
    pub logging: Option<Arc<LoggingService>>,
    pub factory: ProviderFactory,
    pub session: SessionService,
}

impl MoveplanContext {
    /// Create a new Moveplan context rooted at `data_dir`
    pub fn new(data_dir: &Path, entry_point: EntryPoint) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;
        let config = Config::load(data_dir)?;

        let guest_store = Arc::new(
            JsonFileStore::open(data_dir.join(GUEST_STORE_FILENAME))
                .context("Failed to open guest store")?,
        );
        let remote = Arc::new(
            DuckDbStore::open(&data_dir.join(DATABASE_FILENAME))
                .context("Failed to open database")?,
        );

        // The event log is optional; a broken log never blocks the app
        let logging = match LoggingService::new(data_dir, entry_point, env!("CARGO_PKG_VERSION")) {
            Ok(service) => Some(Arc::new(service)),
            Err(e) => {
                tracing::warn!(error = %e, "event log unavailable");
                None
            }
        };

        let guest = GuestSession::new(guest_store.clone());
        let factory = ProviderFactory::new(guest, Arc::clone(&remote));
        let mut session = SessionService::new(
            factory.clone(),
            remote.clone(),
            config.default_hub_name.clone(),
        )
        .with_forced_mode(config.storage_mode);
        if let Some(logging) = &logging {
            session = session.with_logger(Arc::clone(logging));
        }

        Ok(Self {
            config,
            data_dir: data_dir.to_path_buf(),
            guest_store,
            remote,
            logging,
            factory,
            session,
        })
    }

    pub fn guest(&self) -> &GuestSession {
        self.session.guest()
    }

    /// Record an event if the log is available
    pub fn log(&self, event: LogEvent) {
        if let Some(logging) = &self.logging {
            if let Err(e) = logging.log(event) {
                tracing::debug!(error = %e, "failed to write event log");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_context_creates_stores() {
        let dir = TempDir::new().unwrap();
        let ctx = MoveplanContext::new(dir.path(), EntryPoint::Embedded).unwrap();

        let hub = ctx.session.active_hub().await.unwrap();
        ctx.session
            .provider()
            .unwrap()
            .add_task(&hub.id, NewTask::new("Pack boxes"))
            .await
            .unwrap();

        assert!(dir.path().join(GUEST_STORE_FILENAME).exists());
        assert!(dir.path().join(DATABASE_FILENAME).exists());
        assert!(ctx.logging.is_some());
    }

    #[tokio::test]
    async fn test_guest_data_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let hub_id = {
            let ctx = MoveplanContext::new(dir.path(), EntryPoint::Embedded).unwrap();
            let hub = ctx.session.active_hub().await.unwrap();
            ctx.session
                .provider()
                .unwrap()
                .add_task(&hub.id, NewTask::new("Pack boxes"))
                .await
                .unwrap();
            hub.id
        };

        let ctx = MoveplanContext::new(dir.path(), EntryPoint::Embedded).unwrap();
        assert_eq!(ctx.session.active_hub().await.unwrap().id, hub_id);
        let tasks = ctx.session.provider().unwrap().list_tasks(&hub_id).await.unwrap();
        assert_eq!(tasks.len(), 1);
    }
}
