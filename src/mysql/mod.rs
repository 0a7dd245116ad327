// ABOUTME: MySQL backend for the tier stores: pooled connections and SQL primitives
// ABOUTME: Every tier in a deployment speaks the MySQL wire protocol

pub mod pool;
pub mod store;

pub use pool::{connection_opts, ConnectionProvider, POOL_RECYCLE_SECS};
pub use store::{build_insert_statement, rewrite_create_statement, MySqlStore};
