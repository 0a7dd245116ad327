// ABOUTME: Tier store abstraction the replication engine is written against
// ABOUTME: Defines extracted row sets and the per-tier primitives of a swap-load

use anyhow::Result;
use mysql_async::consts::ColumnType;
use mysql_async::Value;

use crate::config::{TableNaming, Tier};
use crate::error::ReplicationError;

/// Name and wire type of one extracted column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMeta {
    pub name: String,
    pub column_type: ColumnType,
}

impl ColumnMeta {
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
        }
    }
}

/// Rows read from one table, in the order the tier returned them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<Value>>,
}

impl RowSet {
    pub fn new(columns: Vec<ColumnMeta>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// Primitives one tier offers to the replication engine.
///
/// Table names passed in are physical names on this tier. Every call runs in
/// auto-commit mode; no transaction spans two calls.
#[allow(async_fn_in_trait)]
pub trait TierStore {
    /// Tier this store talks to.
    fn tier(&self) -> Tier;

    /// Highest value of `column` in `table` (`ORDER BY column DESC LIMIT 1`),
    /// `None` when the table is empty. Errors when the table does not exist.
    async fn max_value(&self, table: &str, column: &str) -> Result<Option<Value>>;

    /// All rows with `column BETWEEN start AND end`.
    async fn select_range(
        &self,
        table: &str,
        column: &str,
        start: &Value,
        end: &Value,
    ) -> Result<RowSet>;

    async fn table_exists(&self, table: &str) -> Result<bool>;

    /// `CREATE TABLE` statement for `table`, `None` when the table is absent.
    async fn table_definition(&self, table: &str) -> Result<Option<String>>;

    /// Create `table` from a definition reflected on any tier, unless it exists.
    async fn create_table(&self, table: &str, definition: &str) -> Result<()>;

    /// Drop a leftover `staging` table and recreate it with the column
    /// definitions of `table`.
    async fn recreate_staging(&self, table: &str, staging: &str) -> Result<()>;

    /// Append rows to `staging`; values are ordered as `columns`.
    async fn append_rows(&self, staging: &str, columns: &[String], rows: &[Vec<Value>])
        -> Result<u64>;

    /// `REPLACE INTO table SELECT * FROM staging`.
    async fn replace_from_staging(&self, table: &str, staging: &str) -> Result<u64>;

    /// Drop `table` if it exists.
    async fn drop_table(&self, table: &str) -> Result<()>;
}

/// Hands out a store per tier.
pub trait StoreProvider {
    type Store: TierStore;

    /// Store for `tier`, or a configuration error when the tier is not registered.
    fn store(&self, tier: Tier) -> std::result::Result<Self::Store, ReplicationError>;

    fn naming(&self) -> &TableNaming;
}
