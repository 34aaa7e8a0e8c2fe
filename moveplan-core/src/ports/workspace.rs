//! Workspace (hub) directory port
//!
//! Hub creation and membership live with the remote service. The migration
//! routine only needs to create a hub for a new account; the session wiring
//! needs to find a signed-in user's hub.

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::Hub;

#[async_trait]
pub trait WorkspaceDirectory: Send + Sync {
    /// Create a hub owned by `owner_id` and return it with its generated id
    async fn create_hub(&self, name: &str, owner_id: &str) -> Result<Hub>;

    /// The hub a user belongs to, if any
    async fn hub_for_user(&self, user_id: &str) -> Result<Option<Hub>>;
}
