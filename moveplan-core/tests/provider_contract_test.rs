//! Provider contract tests
//!
//! The same scenarios run against the local backend (JSON file store) and
//! the relational backend (DuckDB file), so both honor one contract.
//!
//! Run with: cargo test --test provider_contract_test -- --nocapture

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use tempfile::TempDir;

use moveplan_core::adapters::duckdb::{DuckDbDataProvider, DuckDbStore};
use moveplan_core::adapters::json_file::JsonFileStore;
use moveplan_core::adapters::local::LocalDataProvider;
use moveplan_core::services::GuestSession;
use moveplan_core::{
    BudgetPatch, Disposition, Error, ExpensePatch, InventoryItemPatch, MoveDataProvider,
    MoveDetailsPatch, NewExpense, NewInventoryItem, NewTask, NewTimelineEvent, TaskPatch,
    TaskPriority, TaskStatus, TimelineEventPatch,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn local_provider(temp_dir: &TempDir) -> Box<dyn MoveDataProvider> {
    let store = JsonFileStore::open(temp_dir.path().join("guest-store.json"))
        .expect("Failed to open guest store");
    Box::new(LocalDataProvider::new(GuestSession::new(Arc::new(store))))
}

fn database_provider(temp_dir: &TempDir) -> Box<dyn MoveDataProvider> {
    let store = DuckDbStore::open(&temp_dir.path().join("moveplan.duckdb"))
        .expect("Failed to open database");
    Box::new(DuckDbDataProvider::new(Arc::new(store)))
}

/// Both backends, each over its own temp directory
fn providers() -> Vec<(TempDir, Box<dyn MoveDataProvider>)> {
    let local_dir = TempDir::new().unwrap();
    let local = local_provider(&local_dir);
    let db_dir = TempDir::new().unwrap();
    let database = database_provider(&db_dir);
    vec![(local_dir, local), (db_dir, database)]
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ============================================================================
// Collections
// ============================================================================

#[tokio::test]
async fn test_task_lifecycle() {
    for (_dir, p) in providers() {
        let mode = p.mode();
        let task = p
            .add_task(
                "h1",
                NewTask::new("Pack boxes").with_priority(TaskPriority::High),
            )
            .await
            .unwrap();
        assert!(!task.id.is_empty());

        let tasks = p.list_tasks("h1").await.unwrap();
        assert_eq!(tasks, vec![task.clone()], "{mode}");
        assert_eq!(tasks[0].status, TaskStatus::Pending);

        assert!(p
            .update_task("h1", &task.id, TaskPatch::status(TaskStatus::Completed))
            .await
            .unwrap());
        let done = p.list_tasks("h1").await.unwrap().remove(0);
        assert!(done.completed_date.is_some(), "{mode}");
        assert_eq!(done.priority, TaskPriority::High);
        assert_eq!(done.title, "Pack boxes");

        p.update_task("h1", &task.id, TaskPatch::status(TaskStatus::Pending))
            .await
            .unwrap();
        let reopened = p.list_tasks("h1").await.unwrap().remove(0);
        assert_eq!(reopened.completed_date, None, "{mode}");

        assert!(p.delete_task("h1", &task.id).await.unwrap());
        assert!(p.list_tasks("h1").await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_unknown_ids_change_nothing() {
    for (_dir, p) in providers() {
        let mode = p.mode();
        p.add_task("h1", NewTask::new("Keep me")).await.unwrap();

        assert!(!p
            .update_task("h1", "missing", TaskPatch::status(TaskStatus::Cancelled))
            .await
            .unwrap(), "{mode}");
        assert!(!p.delete_task("h1", "missing").await.unwrap(), "{mode}");
        assert!(!p
            .update_expense("h1", "missing", ExpensePatch::default())
            .await
            .unwrap());
        assert!(!p.delete_inventory_item("h1", "missing").await.unwrap());

        let tasks = p.list_tasks("h1").await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status, TaskStatus::Pending);
    }
}

#[tokio::test]
async fn test_hub_isolation() {
    for (_dir, p) in providers() {
        let mode = p.mode();
        p.add_task("hub-1", NewTask::new("Hub one task")).await.unwrap();
        let other = p.add_task("hub-2", NewTask::new("Hub two task")).await.unwrap();

        // Writes addressed to the wrong hub must not touch the record
        assert!(!p.delete_task("hub-1", &other.id).await.unwrap(), "{mode}");

        let one = p.list_tasks("hub-1").await.unwrap();
        let two = p.list_tasks("hub-2").await.unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].title, "Hub one task");
        assert_eq!(two.len(), 1);
        assert_eq!(two[0].title, "Hub two task");
    }
}

#[tokio::test]
async fn test_date_ordering() {
    for (_dir, p) in providers() {
        let mode = p.mode();
        for (desc, d) in [("Tape", 2), ("Truck", 9), ("Boxes", 5)] {
            p.add_expense(
                "h1",
                NewExpense::new(desc, Decimal::new(1000, 2), "supplies", date(2024, 5, d)),
            )
            .await
            .unwrap();
        }
        for (title, d) in [("Keys", 30), ("Movers", 15), ("Notice", 1)] {
            p.add_timeline_event("h1", NewTimelineEvent::new(title, date(2024, 6, d), "milestone"))
                .await
                .unwrap();
        }

        let expenses: Vec<_> = p
            .list_expenses("h1")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.description)
            .collect();
        assert_eq!(expenses, vec!["Truck", "Boxes", "Tape"], "{mode}");

        let events: Vec<_> = p
            .list_timeline_events("h1")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(events, vec!["Notice", "Movers", "Keys"], "{mode}");
    }
}

#[tokio::test]
async fn test_partial_updates_keep_other_fields() {
    for (_dir, p) in providers() {
        let mode = p.mode();
        let expense = p
            .add_expense(
                "h1",
                NewExpense::new("Deposit", Decimal::new(50000, 2), "housing", date(2024, 4, 1))
                    .with_vendor("Landlord"),
            )
            .await
            .unwrap();
        p.update_expense(
            "h1",
            &expense.id,
            ExpensePatch {
                amount: Some(Decimal::new(45000, 2)),
                ..ExpensePatch::default()
            },
        )
        .await
        .unwrap();
        let updated = p.list_expenses("h1").await.unwrap().remove(0);
        assert_eq!(updated.amount, Decimal::new(45000, 2), "{mode}");
        assert_eq!(updated.vendor.as_deref(), Some("Landlord"));
        assert_eq!(updated.id, expense.id);

        let event = p
            .add_timeline_event(
                "h1",
                NewTimelineEvent::new("Movers", date(2024, 6, 15), "moving").with_notes("8am"),
            )
            .await
            .unwrap();
        p.update_timeline_event(
            "h1",
            &event.id,
            TimelineEventPatch {
                notes: Some(None),
                ..TimelineEventPatch::default()
            },
        )
        .await
        .unwrap();
        let updated = p.list_timeline_events("h1").await.unwrap().remove(0);
        assert_eq!(updated.notes, None, "{mode}");
        assert_eq!(updated.date, date(2024, 6, 15));
    }
}

#[tokio::test]
async fn test_inventory_sale_fields() {
    for (_dir, p) in providers() {
        let mode = p.mode();
        let couch = p
            .add_inventory_item(
                "h1",
                NewInventoryItem::new("Couch", "Living room")
                    .with_disposition(Disposition::Sell)
                    .with_value(Decimal::new(300, 0)),
            )
            .await
            .unwrap();
        p.update_inventory_item(
            "h1",
            &couch.id,
            InventoryItemPatch {
                sold: Some(Some(true)),
                sold_amount: Some(Some(Decimal::new(250, 0))),
                ..InventoryItemPatch::default()
            },
        )
        .await
        .unwrap();
        let sold = p.list_inventory_items("h1").await.unwrap().remove(0);
        assert!(sold.is_sold(), "{mode}");
        assert_eq!(sold.sold_amount, Some(Decimal::new(250, 0)));

        // Changing the disposition away from sell drops the sale fields
        p.update_inventory_item(
            "h1",
            &couch.id,
            InventoryItemPatch {
                disposition: Some(Disposition::Donate),
                ..InventoryItemPatch::default()
            },
        )
        .await
        .unwrap();
        let donated = p.list_inventory_items("h1").await.unwrap().remove(0);
        assert_eq!(donated.sold, None, "{mode}");
        assert_eq!(donated.sold_amount, None);
        assert_eq!(donated.value, Some(Decimal::new(300, 0)));
    }
}

#[tokio::test]
async fn test_money_is_stored_the_same_way() {
    let mut stored = Vec::new();
    for (_dir, p) in providers() {
        let mode = p.mode();
        let expense = p
            .add_expense(
                "h1",
                NewExpense::new("Tape", Decimal::new(1005, 3), "supplies", date(2024, 6, 1)),
            )
            .await
            .unwrap();
        assert_eq!(expense.amount, Decimal::new(101, 2), "{mode}");
        let listed = p.list_expenses("h1").await.unwrap().remove(0);
        assert_eq!(listed.amount, Decimal::new(101, 2), "{mode}");
        stored.push(listed.amount);

        let too_big = NewExpense::new(
            "Mansion",
            Decimal::new(1_000_000_000_000_000, 0),
            "housing",
            date(2024, 6, 1),
        );
        assert!(
            matches!(p.add_expense("h1", too_big).await, Err(Error::Validation(_))),
            "{mode}"
        );
        let patch = ExpensePatch {
            amount: Some(Decimal::new(1_000_000_000_000, 0)),
            ..ExpensePatch::default()
        };
        assert!(p.update_expense("h1", &expense.id, patch).await.is_err(), "{mode}");
        assert!(p
            .save_budget("h1", BudgetPatch::total(Decimal::new(1_000_000_000_000, 0)))
            .await
            .is_err());

        // Rejected writes leave the stored data alone
        assert_eq!(p.list_expenses("h1").await.unwrap(), vec![listed], "{mode}");
        assert_eq!(p.get_budget("h1").await.unwrap(), None, "{mode}");
    }
    assert_eq!(stored[0], stored[1]);
}

// ============================================================================
// Singletons
// ============================================================================

#[tokio::test]
async fn test_budget_upsert() {
    for (_dir, p) in providers() {
        let mode = p.mode();
        assert_eq!(p.get_budget("h1").await.unwrap(), None, "{mode}");

        p.save_budget("h1", BudgetPatch::total(Decimal::new(5000, 0)))
            .await
            .unwrap();
        let saved = p
            .save_budget(
                "h1",
                BudgetPatch {
                    category_budgets: Some(Some(
                        [("transport".to_string(), Decimal::new(1200, 0))].into(),
                    )),
                    ..BudgetPatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(saved.total_budget, Decimal::new(5000, 0), "{mode}");
        assert_eq!(saved.category_budget("transport"), Some(Decimal::new(1200, 0)));
        assert_eq!(p.get_budget("h1").await.unwrap(), Some(saved));
        assert_eq!(p.get_budget("h2").await.unwrap(), None);
    }
}

#[tokio::test]
async fn test_move_details_keep_created_date() {
    for (_dir, p) in providers() {
        let mode = p.mode();
        let first = p
            .save_move_details(
                "h1",
                MoveDetailsPatch {
                    current_address: Some("1 Oak Ave".to_string()),
                    ..MoveDetailsPatch::default()
                },
            )
            .await
            .unwrap();

        let second = p
            .save_move_details(
                "h1",
                MoveDetailsPatch {
                    new_address: Some("12 Elm St".to_string()),
                    move_date: Some(Some(date(2024, 8, 1))),
                    created_date: Some(Utc::now() + Duration::days(3)),
                    ..MoveDetailsPatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(second.created_date, first.created_date, "{mode}");
        assert_eq!(second.current_address, "1 Oak Ave");
        assert_eq!(second.new_address, "12 Elm St");
        assert_eq!(p.get_move_details("h1").await.unwrap(), Some(second));
    }
}

// ============================================================================
// Persistence
// ============================================================================

#[tokio::test]
async fn test_data_survives_reopen() {
    let local_dir = TempDir::new().unwrap();
    let db_dir = TempDir::new().unwrap();

    {
        let local = local_provider(&local_dir);
        let database = database_provider(&db_dir);
        local.add_task("h1", NewTask::new("Local task")).await.unwrap();
        database.add_task("h1", NewTask::new("Remote task")).await.unwrap();
    }

    let local = local_provider(&local_dir);
    let database = database_provider(&db_dir);
    assert_eq!(local.list_tasks("h1").await.unwrap()[0].title, "Local task");
    assert_eq!(database.list_tasks("h1").await.unwrap()[0].title, "Remote task");
}
