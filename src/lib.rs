// ABOUTME: Library root for tier-replicator
// ABOUTME: Incremental, swap-load replication of MySQL tables across three tiers

pub mod commands;
pub mod config;
pub mod error;
pub mod mysql;
pub mod registry;
pub mod replication;
pub mod store;
pub mod utils;

pub use config::{ReplicatorConfig, TableNaming, Tier};
pub use error::ReplicationError;
pub use registry::TableDescriptor;
pub use store::{ColumnMeta, RowSet, StoreProvider, TierStore};
