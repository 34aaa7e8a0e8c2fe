//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod data_provider;
mod key_value;
mod workspace;

pub use data_provider::{MoveDataProvider, ReadFallback, StorageMode};
pub use key_value::KeyValueStore;
pub use workspace::WorkspaceDirectory;
