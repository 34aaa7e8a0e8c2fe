//! Recording test doubles
//!
//! `RecordingProvider` is a [`MoveDataProvider`] that logs every call and
//! then delegates to an in-memory local provider, so tests can assert both
//! on what was called and on the resulting data. Individual methods can be
//! told to fail. `MockDirectory` is a [`WorkspaceDirectory`] with the same
//! switches.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use super::local::LocalDataProvider;
use super::memory::MemoryStore;
use crate::domain::result::{Error, Result};
use crate::domain::{
    Budget, BudgetPatch, Expense, ExpensePatch, Hub, InventoryItem, InventoryItemPatch,
    MoveDetails, MoveDetailsPatch, NewExpense, NewInventoryItem, NewTask, NewTimelineEvent, Task,
    TaskPatch, TimelineEvent, TimelineEventPatch,
};
use crate::ports::{MoveDataProvider, StorageMode, WorkspaceDirectory};
use crate::services::guest::GuestSession;

/// One observed call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: &'static str,
    pub hub_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Methods that return a database error instead of delegating
    pub fail_on: HashSet<&'static str>,
    /// Mode reported by the provider
    pub mode: Option<StorageMode>,
}

impl MockConfig {
    pub fn failing(methods: &[&'static str]) -> Self {
        Self {
            fail_on: methods.iter().copied().collect(),
            mode: None,
        }
    }
}

pub struct RecordingProvider {
    inner: LocalDataProvider,
    store: Arc<MemoryStore>,
    config: Mutex<MockConfig>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    pub fn with_config(config: MockConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            inner: LocalDataProvider::new(GuestSession::new(store.clone())),
            store,
            config: Mutex::new(config),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Replace the failure switches (e.g. to let a retry succeed)
    pub fn set_config(&self, config: MockConfig) {
        *self.config.lock().unwrap() = config;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Backing store of the delegate, for inspecting written data
    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    fn record(&self, method: &'static str, hub_id: &str) -> Result<()> {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            hub_id: hub_id.to_string(),
        });
        if self.config.lock().unwrap().fail_on.contains(method) {
            return Err(Error::database(format!("{} failed (mock)", method)));
        }
        Ok(())
    }
}

impl Default for RecordingProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MoveDataProvider for RecordingProvider {
    fn mode(&self) -> StorageMode {
        self.config
            .lock()
            .unwrap()
            .mode
            .unwrap_or(StorageMode::Database)
    }

    async fn list_tasks(&self, hub_id: &str) -> Result<Vec<Task>> {
        self.record("list_tasks", hub_id)?;
        self.inner.list_tasks(hub_id).await
    }

    async fn add_task(&self, hub_id: &str, task: NewTask) -> Result<Task> {
        self.record("add_task", hub_id)?;
        self.inner.add_task(hub_id, task).await
    }

    async fn update_task(&self, hub_id: &str, id: &str, patch: TaskPatch) -> Result<bool> {
        self.record("update_task", hub_id)?;
        self.inner.update_task(hub_id, id, patch).await
    }

    async fn delete_task(&self, hub_id: &str, id: &str) -> Result<bool> {
        self.record("delete_task", hub_id)?;
        self.inner.delete_task(hub_id, id).await
    }

    async fn list_expenses(&self, hub_id: &str) -> Result<Vec<Expense>> {
        self.record("list_expenses", hub_id)?;
        self.inner.list_expenses(hub_id).await
    }

    async fn add_expense(&self, hub_id: &str, expense: NewExpense) -> Result<Expense> {
        self.record("add_expense", hub_id)?;
        self.inner.add_expense(hub_id, expense).await
    }

    async fn update_expense(&self, hub_id: &str, id: &str, patch: ExpensePatch) -> Result<bool> {
        self.record("update_expense", hub_id)?;
        self.inner.update_expense(hub_id, id, patch).await
    }

    async fn delete_expense(&self, hub_id: &str, id: &str) -> Result<bool> {
        self.record("delete_expense", hub_id)?;
        self.inner.delete_expense(hub_id, id).await
    }

    async fn list_timeline_events(&self, hub_id: &str) -> Result<Vec<TimelineEvent>> {
        self.record("list_timeline_events", hub_id)?;
        self.inner.list_timeline_events(hub_id).await
    }

    async fn add_timeline_event(
        &self,
        hub_id: &str,
        event: NewTimelineEvent,
    ) -> Result<TimelineEvent> {
        self.record("add_timeline_event", hub_id)?;
        self.inner.add_timeline_event(hub_id, event).await
    }

    async fn update_timeline_event(
        &self,
        hub_id: &str,
        id: &str,
        patch: TimelineEventPatch,
    ) -> Result<bool> {
        self.record("update_timeline_event", hub_id)?;
        self.inner.update_timeline_event(hub_id, id, patch).await
    }

    async fn delete_timeline_event(&self, hub_id: &str, id: &str) -> Result<bool> {
        self.record("delete_timeline_event", hub_id)?;
        self.inner.delete_timeline_event(hub_id, id).await
    }

    async fn list_inventory_items(&self, hub_id: &str) -> Result<Vec<InventoryItem>> {
        self.record("list_inventory_items", hub_id)?;
        self.inner.list_inventory_items(hub_id).await
    }

    async fn add_inventory_item(
        &self,
        hub_id: &str,
        item: NewInventoryItem,
    ) -> Result<InventoryItem> {
        self.record("add_inventory_item", hub_id)?;
        self.inner.add_inventory_item(hub_id, item).await
    }

    async fn update_inventory_item(
        &self,
        hub_id: &str,
        id: &str,
        patch: InventoryItemPatch,
    ) -> Result<bool> {
        self.record("update_inventory_item", hub_id)?;
        self.inner.update_inventory_item(hub_id, id, patch).await
    }

    async fn delete_inventory_item(&self, hub_id: &str, id: &str) -> Result<bool> {
        self.record("delete_inventory_item", hub_id)?;
        self.inner.delete_inventory_item(hub_id, id).await
    }

    async fn get_budget(&self, hub_id: &str) -> Result<Option<Budget>> {
        self.record("get_budget", hub_id)?;
        self.inner.get_budget(hub_id).await
    }

    async fn save_budget(&self, hub_id: &str, patch: BudgetPatch) -> Result<Budget> {
        self.record("save_budget", hub_id)?;
        self.inner.save_budget(hub_id, patch).await
    }

    async fn get_move_details(&self, hub_id: &str) -> Result<Option<MoveDetails>> {
        self.record("get_move_details", hub_id)?;
        self.inner.get_move_details(hub_id).await
    }

    async fn save_move_details(&self, hub_id: &str, patch: MoveDetailsPatch) -> Result<MoveDetails> {
        self.record("save_move_details", hub_id)?;
        self.inner.save_move_details(hub_id, patch).await
    }
}

/// Workspace directory that hands out sequential hub ids
#[derive(Default)]
pub struct MockDirectory {
    fail: Mutex<bool>,
    created: AtomicUsize,
    hubs: Mutex<Vec<Hub>>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let directory = Self::default();
        directory.set_failing(true);
        directory
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    /// Number of create_hub calls, failed ones included
    pub fn create_calls(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn hubs(&self) -> Vec<Hub> {
        self.hubs.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkspaceDirectory for MockDirectory {
    async fn create_hub(&self, name: &str, owner_id: &str) -> Result<Hub> {
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        if *self.fail.lock().unwrap() {
            return Err(Error::database("workspace creation rejected (mock)"));
        }
        let hub = Hub {
            id: format!("remote-hub-{}", n),
            name: name.to_string(),
            owner_id: owner_id.to_string(),
            created_at: Utc::now(),
        };
        self.hubs.lock().unwrap().push(hub.clone());
        Ok(hub)
    }

    async fn hub_for_user(&self, user_id: &str) -> Result<Option<Hub>> {
        Ok(self
            .hubs
            .lock()
            .unwrap()
            .iter()
            .find(|h| h.owner_id == user_id)
            .cloned())
    }
}
