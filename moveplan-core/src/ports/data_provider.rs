//! Move data provider port
//!
//! Defines the storage-mode-agnostic interface for every hub-scoped record.
//! The local (guest) backend and the relational (signed-in) backend both
//! implement it, so callers never know which one they are talking to.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::{
    Budget, BudgetPatch, EntityKind, Expense, ExpensePatch, InventoryItem, InventoryItemPatch,
    MoveDetails, MoveDetailsPatch, NewExpense, NewInventoryItem, NewTask, NewTimelineEvent, Task,
    TaskPatch, TimelineEvent, TimelineEventPatch,
};

/// Which backend serves the data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// On-device key/value storage for guests
    Local,
    /// Relational store for signed-in users
    Database,
}

impl StorageMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageMode::Local => "local",
            StorageMode::Database => "database",
        }
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(StorageMode::Local),
            "database" | "db" | "remote" => Ok(StorageMode::Database),
            other => Err(Error::Config(format!("unknown storage mode '{}'", other))),
        }
    }
}

/// Storage contract for all move-planning data
///
/// Collection writes return the materialized record including its generated
/// id. `update_*` and `delete_*` return whether a record matched; a missing id
/// is a silent no-op. Every operation is scoped by hub id.
#[async_trait]
pub trait MoveDataProvider: Send + Sync {
    fn mode(&self) -> StorageMode;

    // === Tasks ===

    async fn list_tasks(&self, hub_id: &str) -> Result<Vec<Task>>;

    async fn add_task(&self, hub_id: &str, task: NewTask) -> Result<Task>;

    async fn update_task(&self, hub_id: &str, id: &str, patch: TaskPatch) -> Result<bool>;

    async fn delete_task(&self, hub_id: &str, id: &str) -> Result<bool>;

    // === Expenses (newest first) ===

    async fn list_expenses(&self, hub_id: &str) -> Result<Vec<Expense>>;

    async fn add_expense(&self, hub_id: &str, expense: NewExpense) -> Result<Expense>;

    async fn update_expense(&self, hub_id: &str, id: &str, patch: ExpensePatch) -> Result<bool>;

    async fn delete_expense(&self, hub_id: &str, id: &str) -> Result<bool>;

    // === Timeline (earliest first) ===

    async fn list_timeline_events(&self, hub_id: &str) -> Result<Vec<TimelineEvent>>;

    async fn add_timeline_event(
        &self,
        hub_id: &str,
        event: NewTimelineEvent,
    ) -> Result<TimelineEvent>;

    async fn update_timeline_event(
        &self,
        hub_id: &str,
        id: &str,
        patch: TimelineEventPatch,
    ) -> Result<bool>;

    async fn delete_timeline_event(&self, hub_id: &str, id: &str) -> Result<bool>;

    // === Inventory ===

    async fn list_inventory_items(&self, hub_id: &str) -> Result<Vec<InventoryItem>>;

    async fn add_inventory_item(
        &self,
        hub_id: &str,
        item: NewInventoryItem,
    ) -> Result<InventoryItem>;

    async fn update_inventory_item(
        &self,
        hub_id: &str,
        id: &str,
        patch: InventoryItemPatch,
    ) -> Result<bool>;

    async fn delete_inventory_item(&self, hub_id: &str, id: &str) -> Result<bool>;

    // === Singletons (upsert) ===

    async fn get_budget(&self, hub_id: &str) -> Result<Option<Budget>>;

    async fn save_budget(&self, hub_id: &str, patch: BudgetPatch) -> Result<Budget>;

    async fn get_move_details(&self, hub_id: &str) -> Result<Option<MoveDetails>>;

    async fn save_move_details(&self, hub_id: &str, patch: MoveDetailsPatch) -> Result<MoveDetails>;
}

fn or_empty<T>(result: Result<Vec<T>>, kind: EntityKind, hub_id: &str) -> Vec<T> {
    result.unwrap_or_else(|e| {
        tracing::warn!(%kind, hub_id, error = %e, "read failed, showing empty collection");
        Vec::new()
    })
}

fn or_none<T>(result: Result<Option<T>>, kind: EntityKind, hub_id: &str) -> Option<T> {
    result.unwrap_or_else(|e| {
        tracing::warn!(%kind, hub_id, error = %e, "read failed, showing nothing");
        None
    })
}

/// Reads that downgrade failures to "no data"
///
/// Screens use these so an unreadable store looks empty instead of failing.
/// The error is still logged. Code that must not confuse "empty" with
/// "unreadable" (the guest migration) calls the strict methods instead.
#[async_trait]
pub trait ReadFallback: MoveDataProvider {
    async fn tasks_or_empty(&self, hub_id: &str) -> Vec<Task> {
        or_empty(self.list_tasks(hub_id).await, EntityKind::Tasks, hub_id)
    }

    async fn expenses_or_empty(&self, hub_id: &str) -> Vec<Expense> {
        or_empty(self.list_expenses(hub_id).await, EntityKind::Expenses, hub_id)
    }

    async fn timeline_or_empty(&self, hub_id: &str) -> Vec<TimelineEvent> {
        or_empty(
            self.list_timeline_events(hub_id).await,
            EntityKind::TimelineEvents,
            hub_id,
        )
    }

    async fn inventory_or_empty(&self, hub_id: &str) -> Vec<InventoryItem> {
        or_empty(
            self.list_inventory_items(hub_id).await,
            EntityKind::InventoryItems,
            hub_id,
        )
    }

    async fn budget_or_none(&self, hub_id: &str) -> Option<Budget> {
        or_none(self.get_budget(hub_id).await, EntityKind::Budget, hub_id)
    }

    async fn move_details_or_none(&self, hub_id: &str) -> Option<MoveDetails> {
        or_none(self.get_move_details(hub_id).await, EntityKind::MoveDetails, hub_id)
    }
}

impl<P: MoveDataProvider + ?Sized> ReadFallback for P {}
