//! Session wiring - auth state, storage mode and the active hub
//!
//! Signed-in users get the relational backend, everyone else the local one.
//! Sign-up leaves a pending-migration marker for the current guest; the
//! marker is consumed when the user's session is established and the guest
//! data has been moved over.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use crate::domain::result::{Error, Result};
use crate::domain::{Hub, User};
use crate::ports::{MoveDataProvider, StorageMode, WorkspaceDirectory};
use crate::services::factory::ProviderFactory;
use crate::services::guest::GuestSession;
use crate::services::guest_migration::{GuestMigrationService, MigrationOutcome};
use crate::services::logging::{LogEvent, LoggingService};

/// When a new account becomes usable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Signed in right away; guest data migrates now
    Immediate,
    /// Waits for confirmation; migration runs on the first sign-in
    Deferred,
}

pub struct SessionService {
    user: Mutex<Option<User>>,
    guest: GuestSession,
    factory: ProviderFactory,
    directory: Arc<dyn WorkspaceDirectory>,
    migration: GuestMigrationService,
    logger: Option<Arc<LoggingService>>,
    default_hub_name: String,
    forced_mode: Option<StorageMode>,
    providers: Mutex<HashMap<StorageMode, Arc<dyn MoveDataProvider>>>,
}

impl SessionService {
    pub fn new(
        factory: ProviderFactory,
        directory: Arc<dyn WorkspaceDirectory>,
        default_hub_name: impl Into<String>,
    ) -> Self {
        let default_hub_name = default_hub_name.into();
        let guest = factory.guest().clone();
        let migration =
            GuestMigrationService::new(guest.clone(), Arc::clone(&directory), default_hub_name.clone());
        Self {
            user: Mutex::new(None),
            guest,
            factory,
            directory,
            migration,
            logger: None,
            default_hub_name,
            forced_mode: None,
            providers: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_logger(mut self, logger: Arc<LoggingService>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Pin the storage mode regardless of auth state
    pub fn with_forced_mode(mut self, mode: Option<StorageMode>) -> Self {
        self.forced_mode = mode;
        self
    }

    pub fn guest(&self) -> &GuestSession {
        &self.guest
    }

    pub fn current_user(&self) -> Result<Option<User>> {
        Ok(self.user_slot()?.clone())
    }

    pub fn is_signed_in(&self) -> bool {
        self.user_slot().map(|u| u.is_some()).unwrap_or(false)
    }

    pub fn mode(&self) -> StorageMode {
        if let Some(mode) = self.forced_mode {
            return mode;
        }
        if self.is_signed_in() {
            StorageMode::Database
        } else {
            StorageMode::Local
        }
    }

    /// Provider for the current mode, created once per mode
    pub fn provider(&self) -> Result<Arc<dyn MoveDataProvider>> {
        self.provider_for(self.mode())
    }

    fn provider_for(&self, mode: StorageMode) -> Result<Arc<dyn MoveDataProvider>> {
        let mut providers = self
            .providers
            .lock()
            .map_err(|_| Error::lock_poisoned("provider cache"))?;
        let provider = providers
            .entry(mode)
            .or_insert_with(|| self.factory.create(mode));
        Ok(Arc::clone(provider))
    }

    /// The hub the current user (or guest) works in, created on first use
    pub async fn active_hub(&self) -> Result<Hub> {
        match self.mode() {
            StorageMode::Local => self.guest.ensure_guest_hub(&self.default_hub_name),
            StorageMode::Database => {
                let user = self.current_user()?.ok_or_else(|| {
                    Error::Config("database storage requires a signed-in user".to_string())
                })?;
                if let Some(hub) = self.directory.hub_for_user(&user.id).await? {
                    return Ok(hub);
                }
                debug!(user_id = %user.id, "creating first hub for user");
                self.directory
                    .create_hub(&self.default_hub_name, &user.id)
                    .await
            }
        }
    }

    /// Register a new account for whoever is using the device as a guest
    ///
    /// Returns the migration outcome when the account was activated
    /// immediately and there was a pending migration to run.
    pub async fn sign_up(
        &self,
        user: User,
        activation: Activation,
    ) -> Result<Option<MigrationOutcome>> {
        if let Some(guest_id) = self.guest.current_guest_id()? {
            self.guest.set_pending_migration(&user.id, &guest_id)?;
            debug!(user_id = %user.id, "pending migration recorded");
        }
        match activation {
            Activation::Immediate => self.establish_session(user).await,
            Activation::Deferred => Ok(None),
        }
    }

    /// Sign `user` in and run any migration waiting for them
    ///
    /// A failed migration does not fail the sign-in; the marker stays so
    /// the next session tries again.
    pub async fn establish_session(&self, user: User) -> Result<Option<MigrationOutcome>> {
        self.set_user(Some(user.clone()))?;
        self.log(LogEvent::new("session_established").with_mode(self.mode()));

        let Some(guest_id) = self.guest.pending_migration(&user.id)? else {
            return Ok(None);
        };
        Ok(Some(self.run_migration(&guest_id, &user).await?))
    }

    /// Retry the pending migration for the signed-in user, if any
    pub async fn retry_pending_migration(&self) -> Result<Option<MigrationOutcome>> {
        let user = self
            .current_user()?
            .ok_or_else(|| Error::validation("not signed in"))?;
        match self.guest.pending_migration(&user.id)? {
            Some(guest_id) => Ok(Some(self.run_migration(&guest_id, &user).await?)),
            None => Ok(None),
        }
    }

    async fn run_migration(&self, guest_id: &str, user: &User) -> Result<MigrationOutcome> {
        self.log(LogEvent::new("guest_migration_started").with_mode(StorageMode::Database));
        let target = self.provider_for(StorageMode::Database)?;
        let outcome = self.migration.migrate(guest_id, &user.id, target.as_ref()).await;

        if outcome.success {
            self.guest.clear_pending_migration(&user.id)?;
            let mut event = LogEvent::new("guest_migration_completed").with_mode(StorageMode::Database);
            if let Some(hub_id) = &outcome.new_hub_id {
                event = event.with_hub(hub_id.clone());
            }
            self.log(event);
            info!(user_id = %user.id, phase = %outcome.phase, "pending migration finished");
        } else {
            let failed: Vec<String> = outcome
                .collections
                .iter()
                .filter(|(_, status)| !status.is_ok())
                .map(|(kind, _)| kind.to_string())
                .collect();
            let mut event = LogEvent::new("guest_migration_failed")
                .with_mode(StorageMode::Database)
                .with_error(outcome.error.clone().unwrap_or_default());
            if !failed.is_empty() {
                event = event.with_error_details(format!("failed collections: {}", failed.join(", ")));
            }
            self.log(event);
        }
        Ok(outcome)
    }

    /// Sign back in after a restart; no migration checks
    pub fn restore(&self, user: User) -> Result<()> {
        self.set_user(Some(user))
    }

    pub fn sign_out(&self) -> Result<Option<User>> {
        let previous = self.user_slot()?.take();
        if previous.is_some() {
            self.log(LogEvent::new("signed_out"));
        }
        Ok(previous)
    }

    fn set_user(&self, user: Option<User>) -> Result<()> {
        *self.user_slot()? = user;
        Ok(())
    }

    fn user_slot(&self) -> Result<MutexGuard<'_, Option<User>>> {
        self.user.lock().map_err(|_| Error::lock_poisoned("session user"))
    }

    fn log(&self, event: LogEvent) {
        if let Some(logger) = &self.logger {
            if let Err(e) = logger.log(event) {
                debug!(error = %e, "failed to write event log");
            }
        }
    }
}
