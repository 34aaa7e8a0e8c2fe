//! Hub domain model - the workspace for one move

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix of locally generated guest hub identifiers
pub(crate) const GUEST_HUB_PREFIX: &str = "guest-";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hub {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

impl Hub {
    /// A new on-device hub owned by a guest identity
    pub fn new_guest(name: impl Into<String>, guest_id: impl Into<String>) -> Self {
        Self {
            id: format!("{}{}", GUEST_HUB_PREFIX, Uuid::new_v4()),
            name: name.into(),
            owner_id: guest_id.into(),
            created_at: Utc::now(),
        }
    }

    pub fn is_guest(&self) -> bool {
        self.id.starts_with(GUEST_HUB_PREFIX)
    }

    /// Prefix shared by every local key in this hub's namespace
    pub fn key_prefix(&self) -> String {
        format!("{}-", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guest_hub() {
        let hub = Hub::new_guest("My Move", "guest-identity");
        assert!(hub.is_guest());
        assert_eq!(hub.owner_id, "guest-identity");
        assert!(hub.key_prefix().starts_with("guest-"));
        assert!(hub.key_prefix().ends_with('-'));
    }
}
