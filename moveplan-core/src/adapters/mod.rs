//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - In-memory and JSON-file key/value stores for the KeyValueStore port
//! - The local data provider (guest mode) over any KeyValueStore
//! - DuckDB for the relational data provider and the WorkspaceDirectory port

pub mod duckdb;
pub mod json_file;
pub mod local;
pub mod memory;

#[cfg(test)]
pub mod recording_mock;
