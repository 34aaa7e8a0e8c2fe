//! Shared entity plumbing: collection kinds, storage keys, merge contract

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::{Error, Result};

/// Every per-hub collection or singleton that the storage layer persists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Tasks,
    Expenses,
    TimelineEvents,
    InventoryItems,
    Budget,
    MoveDetails,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Tasks,
        EntityKind::Expenses,
        EntityKind::TimelineEvents,
        EntityKind::InventoryItems,
        EntityKind::Budget,
        EntityKind::MoveDetails,
    ];

    /// Suffix used in local storage keys (`{hub}-{suffix}`)
    pub fn key_suffix(&self) -> &'static str {
        match self {
            EntityKind::Tasks => "tasks",
            EntityKind::Expenses => "expenses",
            EntityKind::TimelineEvents => "timeline-events",
            EntityKind::InventoryItems => "inventory-items",
            EntityKind::Budget => "budget",
            EntityKind::MoveDetails => "move-details",
        }
    }

    /// Relational table holding this kind
    pub fn table_name(&self) -> &'static str {
        match self {
            EntityKind::Tasks => "tasks",
            EntityKind::Expenses => "expenses",
            EntityKind::TimelineEvents => "timeline_events",
            EntityKind::InventoryItems => "inventory_items",
            EntityKind::Budget => "budgets",
            EntityKind::MoveDetails => "move_details",
        }
    }

    pub fn is_singleton(&self) -> bool {
        matches!(self, EntityKind::Budget | EntityKind::MoveDetails)
    }

    /// Local key/value key for this kind inside a hub namespace
    pub fn storage_key(&self, hub_id: &str) -> String {
        format!("{}-{}", hub_id, self.key_suffix())
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key_suffix())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.key_suffix() == s)
            .ok_or_else(|| Error::validation(format!("unknown entity kind '{}'", s)))
    }
}

/// Generate a fresh record identifier (random, not time ordered)
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// A record stored in a per-hub collection
///
/// Both storage backends create, merge and order records through this
/// contract so local and remote records stay interchangeable.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Input for creating a record (everything but the identifier)
    type Draft: Send;
    /// Partial update; `None` fields are left untouched
    type Patch: Send;

    const KIND: EntityKind;

    fn id(&self) -> &str;

    fn from_draft(id: String, draft: Self::Draft) -> Self;

    /// Merge a patch in place. The identifier never changes.
    fn apply(&mut self, patch: Self::Patch);

    /// Round money fields to cents; an amount out of range is a validation error
    fn normalize_money(&mut self) -> Result<()> {
        Ok(())
    }

    /// Order a collection the way the relational store returns it
    fn sort(_items: &mut [Self]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_keys() {
        assert_eq!(EntityKind::Tasks.storage_key("h1"), "h1-tasks");
        assert_eq!(
            EntityKind::TimelineEvents.storage_key("guest-1"),
            "guest-1-timeline-events"
        );
        assert_eq!(EntityKind::MoveDetails.storage_key("h1"), "h1-move-details");
    }

    #[test]
    fn test_kind_round_trips_through_suffix() {
        for kind in EntityKind::ALL {
            assert_eq!(kind.key_suffix().parse::<EntityKind>().unwrap(), kind);
        }
        assert!("boxes".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_new_ids_are_unique() {
        let a = new_id();
        let b = new_id();
        assert!(!a.is_empty());
        assert_ne!(a, b);
    }
}
