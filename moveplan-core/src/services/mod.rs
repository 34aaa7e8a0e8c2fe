//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod factory;
pub mod guest;
pub mod guest_migration;
pub mod logging;
pub mod schema;
pub mod session;
mod status;

pub use factory::ProviderFactory;
pub use guest::{GuestSession, MigrationProgress};
pub use guest_migration::{
    CollectionStatus, GuestMigrationService, MigrationOutcome, MigrationPhase,
};
pub use logging::{EntryPoint, LogEntry, LogEvent, LogStats, LoggingService};
pub use schema::{SchemaMigrationResult, SchemaService};
pub use session::{Activation, SessionService};
pub use status::{CategorySpend, StatusService, StatusSummary};
