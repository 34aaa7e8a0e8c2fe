//! Guest-to-account migration
//!
//! Copies everything a guest stored on the device into the remote hub of the
//! new account (created if the account has none), then wipes the guest state.
//! Local data is only removed once every collection has been copied.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::adapters::local::LocalDataProvider;
use crate::domain::result::Result;
use crate::domain::{
    BudgetPatch, EntityKind, Hub, MoveDetailsPatch, NewExpense, NewInventoryItem, NewTask,
    NewTimelineEvent,
};
use crate::ports::{MoveDataProvider, WorkspaceDirectory};
use crate::services::guest::{GuestSession, MigrationProgress};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationPhase {
    /// Nothing stored locally; nothing to do
    NoGuestData,
    CreatingRemoteWorkspace,
    CopyingEntities,
    ClearingLocalData,
    Done,
    Failed,
}

impl fmt::Display for MigrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MigrationPhase::NoGuestData => "no guest data",
            MigrationPhase::CreatingRemoteWorkspace => "creating remote workspace",
            MigrationPhase::CopyingEntities => "copying entities",
            MigrationPhase::ClearingLocalData => "clearing local data",
            MigrationPhase::Done => "done",
            MigrationPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Result of copying one collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum CollectionStatus {
    /// Number of records written to the target
    Copied(usize),
    /// Already copied by an earlier attempt
    Skipped,
    Failed(String),
}

impl CollectionStatus {
    pub fn is_ok(&self) -> bool {
        !matches!(self, CollectionStatus::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationOutcome {
    pub success: bool,
    pub new_hub_id: Option<String>,
    pub error: Option<String>,
    pub phase: MigrationPhase,
    pub collections: BTreeMap<EntityKind, CollectionStatus>,
}

impl MigrationOutcome {
    fn no_guest_data() -> Self {
        Self {
            success: true,
            new_hub_id: None,
            error: None,
            phase: MigrationPhase::NoGuestData,
            collections: BTreeMap::new(),
        }
    }

    fn failed(error: String, collections: BTreeMap<EntityKind, CollectionStatus>) -> Self {
        Self {
            success: false,
            new_hub_id: None,
            error: Some(error),
            phase: MigrationPhase::Failed,
            collections,
        }
    }

    fn done(hub_id: String, collections: BTreeMap<EntityKind, CollectionStatus>) -> Self {
        Self {
            success: true,
            new_hub_id: Some(hub_id),
            error: None,
            phase: MigrationPhase::Done,
            collections,
        }
    }

    /// Total records written across all collections
    pub fn records_copied(&self) -> usize {
        self.collections
            .values()
            .map(|status| match status {
                CollectionStatus::Copied(n) => *n,
                _ => 0,
            })
            .sum()
    }
}

pub struct GuestMigrationService {
    guest: GuestSession,
    directory: Arc<dyn WorkspaceDirectory>,
    default_hub_name: String,
}

impl GuestMigrationService {
    pub fn new(
        guest: GuestSession,
        directory: Arc<dyn WorkspaceDirectory>,
        default_hub_name: impl Into<String>,
    ) -> Self {
        Self {
            guest,
            directory,
            default_hub_name: default_hub_name.into(),
        }
    }

    /// Move everything `guest_id` stored locally into the hub of `user_id`,
    /// creating that hub when the user has none yet
    ///
    /// Never returns an error; failures are reported in the outcome and leave
    /// the guest's local data as it was. Retrying for the same user reuses
    /// the hub created by the earlier attempt and skips collections it
    /// already copied.
    pub async fn migrate(
        &self,
        guest_id: &str,
        user_id: &str,
        target: &dyn MoveDataProvider,
    ) -> MigrationOutcome {
        let guest_hub = match self.guest.guest_hub_for(guest_id) {
            Ok(Some(hub)) => hub,
            Ok(None) => {
                debug!(guest_id, "no guest hub, nothing to migrate");
                return MigrationOutcome::no_guest_data();
            }
            Err(e) => {
                return MigrationOutcome::failed(
                    format!("Could not read guest workspace: {}", e),
                    BTreeMap::new(),
                )
            }
        };

        debug!(phase = %MigrationPhase::CreatingRemoteWorkspace, guest_hub = %guest_hub.id);
        let mut progress = match self.remote_hub(guest_id, user_id, &guest_hub).await {
            Ok(progress) => progress,
            Err(e) => {
                return MigrationOutcome::failed(
                    format!("Could not create workspace: {}", e),
                    BTreeMap::new(),
                )
            }
        };

        debug!(phase = %MigrationPhase::CopyingEntities, hub_id = %progress.hub_id);
        let collections = self.copy_all(&guest_hub.id, &progress, target).await;

        for (kind, status) in &collections {
            if matches!(status, CollectionStatus::Copied(_)) {
                progress.completed.insert(*kind);
            }
        }

        let failures: Vec<String> = collections
            .iter()
            .filter_map(|(kind, status)| match status {
                CollectionStatus::Failed(msg) => Some(format!("{}: {}", kind, msg)),
                _ => None,
            })
            .collect();

        if !failures.is_empty() {
            if let Err(e) = self.guest.save_migration_progress(guest_id, &progress) {
                warn!(error = %e, "failed to save migration progress");
            }
            return MigrationOutcome::failed(
                format!("Failed to copy {}", failures.join("; ")),
                collections,
            );
        }

        debug!(phase = %MigrationPhase::ClearingLocalData);
        if let Err(e) = self.guest.clear_guest_data(&guest_hub) {
            if let Err(save_err) = self.guest.save_migration_progress(guest_id, &progress) {
                warn!(error = %save_err, "failed to save migration progress");
            }
            return MigrationOutcome::failed(
                format!("Data was copied but local data could not be cleared: {}", e),
                collections,
            );
        }

        let outcome = MigrationOutcome::done(progress.hub_id, collections);
        info!(
            hub_id = outcome.new_hub_id.as_deref().unwrap_or_default(),
            records = outcome.records_copied(),
            "guest migration completed"
        );
        outcome
    }

    /// The remote hub for this migration, reusing one from an earlier attempt
    async fn remote_hub(
        &self,
        guest_id: &str,
        user_id: &str,
        guest_hub: &Hub,
    ) -> Result<MigrationProgress> {
        if let Some(progress) = self.guest.migration_progress(guest_id)? {
            if progress.user_id == user_id {
                debug!(hub_id = %progress.hub_id, "resuming earlier migration");
                return Ok(progress);
            }
        }

        // A user has at most one hub; copy into it if it already exists
        let hub = match self.directory.hub_for_user(user_id).await? {
            Some(hub) => {
                debug!(hub_id = %hub.id, "user already has a hub");
                hub
            }
            None => {
                let name = if guest_hub.name.trim().is_empty() {
                    self.default_hub_name.as_str()
                } else {
                    guest_hub.name.as_str()
                };
                self.directory.create_hub(name, user_id).await?
            }
        };

        let progress = MigrationProgress::new(user_id, hub.id);
        if let Err(e) = self.guest.save_migration_progress(guest_id, &progress) {
            warn!(error = %e, "failed to save migration progress");
        }
        Ok(progress)
    }

    async fn copy_all(
        &self,
        from: &str,
        progress: &MigrationProgress,
        target: &dyn MoveDataProvider,
    ) -> BTreeMap<EntityKind, CollectionStatus> {
        let source = LocalDataProvider::new(self.guest.clone());
        let to = progress.hub_id.as_str();

        let (tasks, expenses, timeline, inventory, budget, details) = tokio::join!(
            track(progress, EntityKind::Tasks, copy_tasks(&source, from, to, target)),
            track(progress, EntityKind::Expenses, copy_expenses(&source, from, to, target)),
            track(
                progress,
                EntityKind::TimelineEvents,
                copy_timeline(&source, from, to, target)
            ),
            track(
                progress,
                EntityKind::InventoryItems,
                copy_inventory(&source, from, to, target)
            ),
            track(progress, EntityKind::Budget, copy_budget(&source, from, to, target)),
            track(
                progress,
                EntityKind::MoveDetails,
                copy_move_details(&source, from, to, target)
            ),
        );

        BTreeMap::from([
            (EntityKind::Tasks, tasks),
            (EntityKind::Expenses, expenses),
            (EntityKind::TimelineEvents, timeline),
            (EntityKind::InventoryItems, inventory),
            (EntityKind::Budget, budget),
            (EntityKind::MoveDetails, details),
        ])
    }
}

/// Run one copy unless an earlier attempt already finished it
async fn track<F>(progress: &MigrationProgress, kind: EntityKind, copy: F) -> CollectionStatus
where
    F: Future<Output = Result<usize>>,
{
    if progress.completed.contains(&kind) {
        return CollectionStatus::Skipped;
    }
    match copy.await {
        Ok(n) => {
            debug!(%kind, copied = n, "collection copied");
            CollectionStatus::Copied(n)
        }
        Err(e) => {
            warn!(%kind, error = %e, "collection copy failed");
            CollectionStatus::Failed(e.to_string())
        }
    }
}

async fn copy_tasks(
    source: &LocalDataProvider,
    from: &str,
    to: &str,
    target: &dyn MoveDataProvider,
) -> Result<usize> {
    let tasks = source.list_tasks(from).await?;
    for task in &tasks {
        target.add_task(to, NewTask::from(task.clone())).await?;
    }
    Ok(tasks.len())
}

async fn copy_expenses(
    source: &LocalDataProvider,
    from: &str,
    to: &str,
    target: &dyn MoveDataProvider,
) -> Result<usize> {
    let expenses = source.list_expenses(from).await?;
    for expense in &expenses {
        target.add_expense(to, NewExpense::from(expense.clone())).await?;
    }
    Ok(expenses.len())
}

async fn copy_timeline(
    source: &LocalDataProvider,
    from: &str,
    to: &str,
    target: &dyn MoveDataProvider,
) -> Result<usize> {
    let events = source.list_timeline_events(from).await?;
    for event in &events {
        target
            .add_timeline_event(to, NewTimelineEvent::from(event.clone()))
            .await?;
    }
    Ok(events.len())
}

async fn copy_inventory(
    source: &LocalDataProvider,
    from: &str,
    to: &str,
    target: &dyn MoveDataProvider,
) -> Result<usize> {
    let items = source.list_inventory_items(from).await?;
    for item in &items {
        target
            .add_inventory_item(to, NewInventoryItem::from(item.clone()))
            .await?;
    }
    Ok(items.len())
}

async fn copy_budget(
    source: &LocalDataProvider,
    from: &str,
    to: &str,
    target: &dyn MoveDataProvider,
) -> Result<usize> {
    match source.get_budget(from).await? {
        Some(budget) => {
            target.save_budget(to, BudgetPatch::from(budget)).await?;
            Ok(1)
        }
        None => Ok(0),
    }
}

async fn copy_move_details(
    source: &LocalDataProvider,
    from: &str,
    to: &str,
    target: &dyn MoveDataProvider,
) -> Result<usize> {
    match source.get_move_details(from).await? {
        Some(details) => {
            target
                .save_move_details(to, MoveDetailsPatch::from(details))
                .await?;
            Ok(1)
        }
        None => Ok(0),
    }
}
