//! Guest session state
//!
//! Everything an unauthenticated user owns on the device besides the hub's
//! own records: the guest identity, the pointer to the guest hub, the
//! activity counter, pending-migration markers and migration progress.
//! All of it lives in the same key/value store as the hub data.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::{new_id, EntityKind, Hub};
use crate::ports::KeyValueStore;

pub const GUEST_ID_KEY: &str = "moveplan-guest-id";
pub const GUEST_HUB_KEY: &str = "moveplan-guest-hub";
pub const GUEST_ACTIVITY_KEY: &str = "moveplan-guest-activity";
const PENDING_MIGRATION_PREFIX: &str = "moveplan-pending-migration-";
const MIGRATION_PROGRESS_PREFIX: &str = "moveplan-migration-progress-";

fn pending_migration_key(user_id: &str) -> String {
    format!("{}{}", PENDING_MIGRATION_PREFIX, user_id)
}

fn migration_progress_key(guest_id: &str) -> String {
    format!("{}{}", MIGRATION_PROGRESS_PREFIX, guest_id)
}

/// What a partially finished migration already did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationProgress {
    pub user_id: String,
    pub hub_id: String,
    #[serde(default)]
    pub completed: BTreeSet<EntityKind>,
}

impl MigrationProgress {
    pub fn new(user_id: impl Into<String>, hub_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            hub_id: hub_id.into(),
            completed: BTreeSet::new(),
        }
    }
}

/// Handle on the guest's on-device state
#[derive(Clone)]
pub struct GuestSession {
    store: Arc<dyn KeyValueStore>,
}

impl GuestSession {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// The guest identity, created on first use
    pub fn guest_id(&self) -> Result<String> {
        let mut id = None;
        self.store.modify(GUEST_ID_KEY, &mut |current| match current {
            Some(existing) if !existing.is_empty() => {
                id = Some(existing.to_string());
                Ok(None)
            }
            _ => {
                let fresh = new_id();
                id = Some(fresh.clone());
                Ok(Some(fresh))
            }
        })?;
        id.ok_or_else(|| Error::storage("guest identity could not be stored"))
    }

    /// The guest identity if one was ever created
    pub fn current_guest_id(&self) -> Result<Option<String>> {
        Ok(self.store.get(GUEST_ID_KEY)?.filter(|id| !id.is_empty()))
    }

    /// The stored guest hub, whoever owns it
    pub fn guest_hub(&self) -> Result<Option<Hub>> {
        self.store
            .get(GUEST_HUB_KEY)?
            .map(|raw| decode_hub(&raw))
            .transpose()
    }

    /// The guest hub owned by `guest_id`, if there is one
    pub fn guest_hub_for(&self, guest_id: &str) -> Result<Option<Hub>> {
        Ok(self.guest_hub()?.filter(|hub| hub.owner_id == guest_id))
    }

    /// The current guest's hub, created with `name` when missing
    pub fn ensure_guest_hub(&self, name: &str) -> Result<Hub> {
        let guest_id = self.guest_id()?;
        let mut hub = None;
        self.store.modify(GUEST_HUB_KEY, &mut |current| {
            if let Some(raw) = current {
                let existing = decode_hub(raw)?;
                if existing.owner_id == guest_id {
                    hub = Some(existing);
                    return Ok(None);
                }
            }
            let created = Hub::new_guest(name, guest_id.as_str());
            let raw = serde_json::to_string(&created)?;
            tracing::debug!(hub_id = %created.id, "created guest hub");
            hub = Some(created);
            Ok(Some(raw))
        })?;
        hub.ok_or_else(|| Error::storage("guest hub could not be stored"))
    }

    pub fn activity_count(&self) -> Result<u64> {
        Ok(self
            .store
            .get(GUEST_ACTIVITY_KEY)?
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(0))
    }

    /// Bump the activity counter and return the new value
    pub fn record_activity(&self) -> Result<u64> {
        let mut count = 0;
        self.store.modify(GUEST_ACTIVITY_KEY, &mut |current| {
            let previous: u64 = current.and_then(|raw| raw.trim().parse().ok()).unwrap_or(0);
            count = previous.saturating_add(1);
            Ok(Some(count.to_string()))
        })?;
        Ok(count)
    }

    // === Pending migration markers ===

    /// Guest id waiting to be migrated into `user_id`'s account
    pub fn pending_migration(&self, user_id: &str) -> Result<Option<String>> {
        Ok(self
            .store
            .get(&pending_migration_key(user_id))?
            .filter(|guest_id| !guest_id.is_empty()))
    }

    pub fn set_pending_migration(&self, user_id: &str, guest_id: &str) -> Result<()> {
        self.store.set(&pending_migration_key(user_id), guest_id)
    }

    pub fn clear_pending_migration(&self, user_id: &str) -> Result<()> {
        self.store.remove(&pending_migration_key(user_id))
    }

    // === Migration progress ===

    pub fn migration_progress(&self, guest_id: &str) -> Result<Option<MigrationProgress>> {
        let key = migration_progress_key(guest_id);
        self.store
            .get(&key)?
            .map(|raw| {
                serde_json::from_str(&raw)
                    .map_err(|e| Error::storage(format!("{} holds invalid data: {}", key, e)))
            })
            .transpose()
    }

    pub fn save_migration_progress(&self, guest_id: &str, progress: &MigrationProgress) -> Result<()> {
        let raw = serde_json::to_string(progress)?;
        self.store.set(&migration_progress_key(guest_id), &raw)
    }

    pub fn clear_migration_progress(&self, guest_id: &str) -> Result<()> {
        self.store.remove(&migration_progress_key(guest_id))
    }

    /// Remove every key belonging to the guest who owns `hub`
    ///
    /// Covers the hub's records, the hub pointer, the activity counter, the
    /// migration progress record and the guest identity. Returns how many
    /// keys were removed.
    pub fn clear_guest_data(&self, hub: &Hub) -> Result<usize> {
        let prefix = hub.key_prefix();
        let progress_key = migration_progress_key(&hub.owner_id);
        let guest_id = self.current_guest_id()?;

        let doomed: Vec<String> = self
            .store
            .keys()?
            .into_iter()
            .filter(|key| {
                key.starts_with(&prefix)
                    || key == GUEST_HUB_KEY
                    || key == GUEST_ACTIVITY_KEY
                    || *key == progress_key
                    || (key == GUEST_ID_KEY && guest_id.as_deref() == Some(hub.owner_id.as_str()))
            })
            .collect();

        self.store.remove_many(&doomed)?;
        tracing::debug!(hub_id = %hub.id, removed = doomed.len(), "cleared guest data");
        Ok(doomed.len())
    }
}

fn decode_hub(raw: &str) -> Result<Hub> {
    serde_json::from_str(raw)
        .map_err(|e| Error::storage(format!("{} holds invalid data: {}", GUEST_HUB_KEY, e)))
}
