//! Move details domain model (one per hub)

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Where from, where to, and when
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveDetails {
    #[serde(default, alias = "fromLocation")]
    pub current_address: String,
    #[serde(default, alias = "toLocation")]
    pub new_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub move_date: Option<NaiveDate>,
    /// Set on the first save and never overwritten
    pub created_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoveDetailsPatch {
    pub current_address: Option<String>,
    pub new_address: Option<String>,
    pub move_date: Option<Option<NaiveDate>>,
    /// Only used when nothing is stored yet
    pub created_date: Option<DateTime<Utc>>,
}

impl From<MoveDetails> for MoveDetailsPatch {
    fn from(details: MoveDetails) -> Self {
        Self {
            current_address: Some(details.current_address),
            new_address: Some(details.new_address),
            move_date: Some(details.move_date),
            created_date: Some(details.created_date),
        }
    }
}

impl MoveDetails {
    /// Shallow-merge a patch over the stored details.
    ///
    /// `created_date` comes from the stored record when there is one, then
    /// from the patch, and only then from `now`.
    pub fn merge(existing: Option<MoveDetails>, patch: MoveDetailsPatch, now: DateTime<Utc>) -> MoveDetails {
        let mut details = match existing {
            Some(details) => details,
            None => MoveDetails {
                current_address: String::new(),
                new_address: String::new(),
                move_date: None,
                created_date: patch.created_date.unwrap_or(now),
            },
        };
        if let Some(current) = patch.current_address {
            details.current_address = current;
        }
        if let Some(new_address) = patch.new_address {
            details.new_address = new_address;
        }
        if let Some(move_date) = patch.move_date {
            details.move_date = move_date;
        }
        details
    }

    /// Whole days from `today` until the move, negative once it has passed
    pub fn days_until_move(&self, today: NaiveDate) -> Option<i64> {
        self.move_date.map(|d| (d - today).num_days())
    }
}
