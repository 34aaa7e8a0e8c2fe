//! Core domain entities
//!
//! All move-planning records are defined here. These are pure data structures
//! with merge rules - no I/O or storage concerns.

mod budget;
mod entity;
mod expense;
mod hub;
mod inventory;
mod money;
mod move_details;
pub mod result;
mod task;
mod timeline;
mod user;

pub use budget::{Budget, BudgetPatch};
pub use entity::{new_id, Entity, EntityKind};
pub use expense::{Expense, ExpensePatch, NewExpense};
pub use hub::Hub;
pub use inventory::{Disposition, InventoryItem, InventoryItemPatch, NewInventoryItem};
pub use money::{normalize_money, normalize_optional_money, MONEY_SCALE};
pub use move_details::{MoveDetails, MoveDetailsPatch};
pub use task::{NewTask, Task, TaskPatch, TaskPriority, TaskStatus};
pub use timeline::{NewTimelineEvent, TimelineEvent, TimelineEventPatch};
pub use user::User;
