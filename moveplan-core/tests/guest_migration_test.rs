//! Guest-to-account migration against real stores
//!
//! The guest writes into a JSON file store, signs up, and the data must end
//! up in the DuckDB file with the guest's local keys gone.
//!
//! Run with: cargo test --test guest_migration_test -- --nocapture

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tempfile::TempDir;

use moveplan_core::adapters::duckdb::DuckDbStore;
use moveplan_core::config::DATABASE_FILENAME;
use moveplan_core::services::{Activation, EntryPoint, MigrationPhase};
use moveplan_core::{
    BudgetPatch, EntityKind, KeyValueStore, MoveDetailsPatch, MoveplanContext, NewExpense,
    NewInventoryItem, NewTask, NewTimelineEvent, StorageMode, TaskPatch, TaskStatus, User,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Fill a guest hub with one record of every kind; returns the hub id
async fn seed_guest(ctx: &MoveplanContext) -> String {
    let hub = ctx.session.active_hub().await.unwrap();
    let p = ctx.session.provider().unwrap();
    assert_eq!(p.mode(), StorageMode::Local);

    let task = p.add_task(&hub.id, NewTask::new("Pack boxes")).await.unwrap();
    p.update_task(&hub.id, &task.id, TaskPatch::status(TaskStatus::Completed))
        .await
        .unwrap();
    p.add_expense(
        &hub.id,
        NewExpense::new("Truck", Decimal::new(18999, 2), "transport", date(2024, 6, 14)),
    )
    .await
    .unwrap();
    p.add_timeline_event(&hub.id, NewTimelineEvent::new("Movers", date(2024, 6, 15), "moving"))
        .await
        .unwrap();
    p.add_inventory_item(&hub.id, NewInventoryItem::new("Desk", "Office").with_box("B-7"))
        .await
        .unwrap();
    p.save_budget(&hub.id, BudgetPatch::total(Decimal::new(3000, 0)))
        .await
        .unwrap();
    p.save_move_details(
        &hub.id,
        MoveDetailsPatch {
            new_address: Some("12 Elm St".to_string()),
            ..MoveDetailsPatch::default()
        },
    )
    .await
    .unwrap();
    hub.id
}

#[tokio::test]
async fn test_sign_up_moves_guest_data_into_database() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = MoveplanContext::new(temp_dir.path(), EntryPoint::Embedded).unwrap();
    let guest_hub = seed_guest(&ctx).await;
    let local_task = ctx
        .session
        .provider()
        .unwrap()
        .list_tasks(&guest_hub)
        .await
        .unwrap()
        .remove(0);
    let local_details = ctx
        .session
        .provider()
        .unwrap()
        .get_move_details(&guest_hub)
        .await
        .unwrap()
        .unwrap();

    let outcome = ctx
        .session
        .sign_up(User::new("user-1", "mover@example.com"), Activation::Immediate)
        .await
        .unwrap()
        .expect("guest data should migrate");

    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(outcome.phase, MigrationPhase::Done);
    assert_eq!(outcome.records_copied(), 6);
    let new_hub = outcome.new_hub_id.clone().unwrap();
    assert_ne!(new_hub, guest_hub);

    // Nothing left on the device
    assert!(ctx.guest_store.keys().unwrap().is_empty());

    let remote = ctx.session.provider().unwrap();
    assert_eq!(remote.mode(), StorageMode::Database);
    let task = remote.list_tasks(&new_hub).await.unwrap().remove(0);
    assert_eq!(task.title, "Pack boxes");
    assert_eq!(task.completed_date, local_task.completed_date);
    let details = remote.get_move_details(&new_hub).await.unwrap().unwrap();
    assert_eq!(details.created_date, local_details.created_date);
    assert_eq!(
        remote.list_inventory_items(&new_hub).await.unwrap()[0].box_label.as_deref(),
        Some("B-7")
    );
    assert_eq!(ctx.session.active_hub().await.unwrap().id, new_hub);

    let events: Vec<String> = ctx
        .logging
        .as_ref()
        .unwrap()
        .get_recent(20)
        .unwrap()
        .into_iter()
        .map(|e| e.event)
        .collect();
    assert!(events.contains(&"guest_migration_started".to_string()));
    assert!(events.contains(&"guest_migration_completed".to_string()));
}

#[tokio::test]
async fn test_migrated_data_persists_in_database_file() {
    let temp_dir = TempDir::new().unwrap();
    let new_hub = {
        let ctx = MoveplanContext::new(temp_dir.path(), EntryPoint::Embedded).unwrap();
        seed_guest(&ctx).await;
        ctx.session
            .sign_up(User::new("user-2", "b@example.com"), Activation::Immediate)
            .await
            .unwrap()
            .unwrap()
            .new_hub_id
            .unwrap()
    };

    let store = DuckDbStore::open(&temp_dir.path().join(DATABASE_FILENAME)).unwrap();
    assert_eq!(store.count(EntityKind::Tasks, &new_hub).unwrap(), 1);
    assert_eq!(store.count(EntityKind::Expenses, &new_hub).unwrap(), 1);
    assert_eq!(store.count(EntityKind::TimelineEvents, &new_hub).unwrap(), 1);
    assert_eq!(store.count(EntityKind::InventoryItems, &new_hub).unwrap(), 1);
    assert_eq!(
        store.get_budget(&new_hub).unwrap().unwrap().total_budget,
        Decimal::new(3000, 0)
    );
    assert_eq!(store.hub_for_user("user-2").unwrap().unwrap().id, new_hub);
}

#[tokio::test]
async fn test_deferred_sign_up_migrates_on_next_session() {
    let temp_dir = TempDir::new().unwrap();
    let user = User::new("user-3", "c@example.com");

    {
        let ctx = MoveplanContext::new(temp_dir.path(), EntryPoint::Embedded).unwrap();
        seed_guest(&ctx).await;
        let outcome = ctx
            .session
            .sign_up(user.clone(), Activation::Deferred)
            .await
            .unwrap();
        assert!(outcome.is_none());
    }

    // Next process start: the marker is still on disk
    let ctx = MoveplanContext::new(temp_dir.path(), EntryPoint::Embedded).unwrap();
    assert!(ctx.guest().pending_migration(&user.id).unwrap().is_some());

    let outcome = ctx.session.establish_session(user.clone()).await.unwrap().unwrap();
    assert!(outcome.success);
    assert!(ctx.guest().pending_migration(&user.id).unwrap().is_none());
    assert!(ctx.guest_store.keys().unwrap().is_empty());
}

#[tokio::test]
async fn test_sign_up_without_guest_data() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = MoveplanContext::new(temp_dir.path(), EntryPoint::Embedded).unwrap();

    let outcome = ctx
        .session
        .sign_up(User::new("user-4", "d@example.com"), Activation::Immediate)
        .await
        .unwrap();

    assert!(outcome.is_none());
    assert_eq!(ctx.session.mode(), StorageMode::Database);
    assert!(ctx.remote.hub_for_user("user-4").unwrap().is_none());
}
