//! Local (guest) data provider
//!
//! Stores each hub collection as one JSON array under `{hub}-{entity}` and
//! each singleton as one JSON object under `{hub}-budget` /
//! `{hub}-move-details` in a [`KeyValueStore`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::domain::result::{Error, Result};
use crate::domain::{
    new_id, Budget, BudgetPatch, Entity, EntityKind, Expense, ExpensePatch, InventoryItem,
    InventoryItemPatch, MoveDetails, MoveDetailsPatch, NewExpense, NewInventoryItem, NewTask,
    NewTimelineEvent, Task, TaskPatch, TimelineEvent, TimelineEventPatch,
};
use crate::ports::{KeyValueStore, MoveDataProvider, StorageMode};
use crate::services::guest::GuestSession;

pub struct LocalDataProvider {
    store: Arc<dyn KeyValueStore>,
    guest: GuestSession,
}

fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(|e| Error::storage(format!("{} holds invalid data: {}", key, e)))
}

impl LocalDataProvider {
    pub fn new(guest: GuestSession) -> Self {
        Self {
            store: Arc::clone(guest.store()),
            guest,
        }
    }

    fn read<T: Entity>(&self, hub_id: &str) -> Result<Vec<T>> {
        let key = T::KIND.storage_key(hub_id);
        match self.store.get(&key)? {
            Some(raw) => decode(&key, &raw),
            None => Ok(Vec::new()),
        }
    }

    fn list<T: Entity>(&self, hub_id: &str) -> Result<Vec<T>> {
        let mut items = self.read::<T>(hub_id)?;
        T::sort(&mut items);
        Ok(items)
    }

    fn add<T: Entity>(&self, hub_id: &str, draft: T::Draft) -> Result<T> {
        let mut record = T::from_draft(new_id(), draft);
        record.normalize_money()?;
        let key = T::KIND.storage_key(hub_id);

        self.store.modify(&key, &mut |current| {
            let mut items: Vec<T> = match current {
                Some(raw) => decode(&key, raw)?,
                None => Vec::new(),
            };
            items.push(record.clone());
            Ok(Some(serde_json::to_string(&items)?))
        })?;
        debug!(kind = %T::KIND, hub_id, id = record.id(), "added local record");

        if let Err(e) = self.guest.record_activity() {
            warn!(error = %e, "failed to record guest activity");
        }
        Ok(record)
    }

    fn update<T: Entity>(&self, hub_id: &str, id: &str, patch: T::Patch) -> Result<bool> {
        let key = T::KIND.storage_key(hub_id);
        let mut patch = Some(patch);
        let mut found = false;

        self.store.modify(&key, &mut |current| {
            let Some(raw) = current else {
                return Ok(None);
            };
            let mut items: Vec<T> = decode(&key, raw)?;
            let Some(item) = items.iter_mut().find(|item| item.id() == id) else {
                return Ok(None);
            };
            if let Some(patch) = patch.take() {
                item.apply(patch);
            }
            item.normalize_money()?;
            found = true;
            Ok(Some(serde_json::to_string(&items)?))
        })?;

        if !found {
            debug!(kind = %T::KIND, hub_id, id, "update matched nothing");
        }
        Ok(found)
    }

    fn delete<T: Entity>(&self, hub_id: &str, id: &str) -> Result<bool> {
        let key = T::KIND.storage_key(hub_id);
        let mut found = false;

        self.store.modify(&key, &mut |current| {
            let Some(raw) = current else {
                return Ok(None);
            };
            let mut items: Vec<T> = decode(&key, raw)?;
            let Some(pos) = items.iter().position(|item| item.id() == id) else {
                return Ok(None);
            };
            items.remove(pos);
            found = true;
            Ok(Some(serde_json::to_string(&items)?))
        })?;
        Ok(found)
    }

    fn get_singleton<T: DeserializeOwned>(&self, kind: EntityKind, hub_id: &str) -> Result<Option<T>> {
        let key = kind.storage_key(hub_id);
        self.store
            .get(&key)?
            .map(|raw| decode(&key, &raw))
            .transpose()
    }
}

#[async_trait]
impl MoveDataProvider for LocalDataProvider {
    fn mode(&self) -> StorageMode {
        StorageMode::Local
    }

    async fn list_tasks(&self, hub_id: &str) -> Result<Vec<Task>> {
        self.list(hub_id)
    }

    async fn add_task(&self, hub_id: &str, task: NewTask) -> Result<Task> {
        self.add::<Task>(hub_id, task)
    }

    async fn update_task(&self, hub_id: &str, id: &str, patch: TaskPatch) -> Result<bool> {
        self.update::<Task>(hub_id, id, patch)
    }

    async fn delete_task(&self, hub_id: &str, id: &str) -> Result<bool> {
        self.delete::<Task>(hub_id, id)
    }

    async fn list_expenses(&self, hub_id: &str) -> Result<Vec<Expense>> {
        self.list(hub_id)
    }

    async fn add_expense(&self, hub_id: &str, expense: NewExpense) -> Result<Expense> {
        self.add::<Expense>(hub_id, expense)
    }

    async fn update_expense(&self, hub_id: &str, id: &str, patch: ExpensePatch) -> Result<bool> {
        self.update::<Expense>(hub_id, id, patch)
    }

    async fn delete_expense(&self, hub_id: &str, id: &str) -> Result<bool> {
        self.delete::<Expense>(hub_id, id)
    }

    async fn list_timeline_events(&self, hub_id: &str) -> Result<Vec<TimelineEvent>> {
        self.list(hub_id)
    }

    async fn add_timeline_event(
        &self,
        hub_id: &str,
        event: NewTimelineEvent,
    ) -> Result<TimelineEvent> {
        self.add::<TimelineEvent>(hub_id, event)
    }

    async fn update_timeline_event(
        &self,
        hub_id: &str,
        id: &str,
        patch: TimelineEventPatch,
    ) -> Result<bool> {
        self.update::<TimelineEvent>(hub_id, id, patch)
    }

    async fn delete_timeline_event(&self, hub_id: &str, id: &str) -> Result<bool> {
        self.delete::<TimelineEvent>(hub_id, id)
    }

    async fn list_inventory_items(&self, hub_id: &str) -> Result<Vec<InventoryItem>> {
        self.list(hub_id)
    }

    async fn add_inventory_item(
        &self,
        hub_id: &str,
        item: NewInventoryItem,
    ) -> Result<InventoryItem> {
        self.add::<InventoryItem>(hub_id, item)
    }

    async fn update_inventory_item(
        &self,
        hub_id: &str,
        id: &str,
        patch: InventoryItemPatch,
    ) -> Result<bool> {
        self.update::<InventoryItem>(hub_id, id, patch)
    }

    async fn delete_inventory_item(&self, hub_id: &str, id: &str) -> Result<bool> {
        self.delete::<InventoryItem>(hub_id, id)
    }

    async fn get_budget(&self, hub_id: &str) -> Result<Option<Budget>> {
        self.get_singleton(EntityKind::Budget, hub_id)
    }

    async fn save_budget(&self, hub_id: &str, patch: BudgetPatch) -> Result<Budget> {
        let key = EntityKind::Budget.storage_key(hub_id);
        let mut patch = Some(patch);
        let mut saved = None;

        self.store.modify(&key, &mut |current| {
            let existing: Option<Budget> = current.map(|raw| decode(&key, raw)).transpose()?;
            let mut budget = Budget::merge(existing, patch.take().unwrap_or_default());
            budget.normalize_money()?;
            let raw = serde_json::to_string(&budget)?;
            saved = Some(budget);
            Ok(Some(raw))
        })?;
        saved.ok_or_else(|| Error::storage(format!("{} was not written", key)))
    }

    async fn get_move_details(&self, hub_id: &str) -> Result<Option<MoveDetails>> {
        self.get_singleton(EntityKind::MoveDetails, hub_id)
    }

    async fn save_move_details(&self, hub_id: &str, patch: MoveDetailsPatch) -> Result<MoveDetails> {
        let key = EntityKind::MoveDetails.storage_key(hub_id);
        let mut patch = Some(patch);
        let mut saved = None;

        self.store.modify(&key, &mut |current| {
            let existing: Option<MoveDetails> = current.map(|raw| decode(&key, raw)).transpose()?;
            let details = MoveDetails::merge(existing, patch.take().unwrap_or_default(), Utc::now());
            let raw = serde_json::to_string(&details)?;
            saved = Some(details);
            Ok(Some(raw))
        })?;
        saved.ok_or_else(|| Error::storage(format!("{} was not written", key)))
    }
}
