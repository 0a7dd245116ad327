// ABOUTME: MySQL implementation of the tier store primitives
// ABOUTME: Issues the max lookup, range select, DDL reflection and staging statements

use anyhow::{bail, Context, Result};
use mysql_async::prelude::*;
use mysql_async::{Params, Pool, Row, Value};

use crate::config::Tier;
use crate::store::{ColumnMeta, RowSet, TierStore};
use crate::utils::quote_mysql_ident;

/// MySQL caps a prepared statement at 65,535 placeholders.
const MAX_PLACEHOLDERS: usize = 65_535;

/// Store backed by a tier's connection pool.
///
/// Each call checks a connection out of the pool and hands it back when the
/// call returns, on success and on error alike.
#[derive(Clone)]
pub struct MySqlStore {
    tier: Tier,
    pool: Pool,
}

impl MySqlStore {
    pub fn new(tier: Tier, pool: Pool) -> Self {
        Self { tier, pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    async fn conn(&self) -> Result<mysql_async::Conn> {
        self.pool
            .get_conn()
            .await
            .with_context(|| format!("Failed to connect to the {} tier", self.tier))
    }
}

impl TierStore for MySqlStore {
    fn tier(&self) -> Tier {
        self.tier
    }

    async fn max_value(&self, table: &str, column: &str) -> Result<Option<Value>> {
        let sql = format!(
            "SELECT {col} FROM {table} ORDER BY {col} DESC LIMIT 1",
            col = quote_mysql_ident(column),
            table = quote_mysql_ident(table)
        );
        tracing::debug!("{}", sql);

        let mut conn = self.conn().await?;
        // Binary protocol so DATETIME and integer columns come back typed.
        let row: Option<Row> = conn
            .exec_first(sql.as_str(), Params::Empty)
            .await
            .with_context(|| format!("Failed to read max({}) from {}", column, table))?;

        Ok(row.and_then(|mut row| row.take::<Value, _>(0)))
    }

    async fn select_range(
        &self,
        table: &str,
        column: &str,
        start: &Value,
        end: &Value,
    ) -> Result<RowSet> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} BETWEEN ? AND ?",
            quote_mysql_ident(table),
            quote_mysql_ident(column)
        );
        tracing::debug!("{} -- [{:?}, {:?}]", sql, start, end);

        let mut conn = self.conn().await?;
        let rows: Vec<Row> = conn
            .exec(sql.as_str(), Params::Positional(vec![start.clone(), end.clone()]))
            .await
            .with_context(|| format!("Failed to read window from {}", table))?;

        Ok(rows_to_row_set(rows))
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        let mut conn = self.conn().await?;
        let count: Option<i64> = conn
            .exec_first(
                "SELECT COUNT(*) FROM information_schema.tables \
                 WHERE table_schema = DATABASE() AND table_name = ?",
                Params::Positional(vec![Value::Bytes(table.as_bytes().to_vec())]),
            )
            .await
            .with_context(|| format!("Failed to check whether {} exists", table))?;
        Ok(count.unwrap_or(0) > 0)
    }

    async fn table_definition(&self, table: &str) -> Result<Option<String>> {
        if !self.table_exists(table).await? {
            return Ok(None);
        }

        let mut conn = self.conn().await?;
        let row: Option<(String, String)> = conn
            .query_first(format!("SHOW CREATE TABLE {}", quote_mysql_ident(table)))
            .await
            .with_context(|| format!("Failed to reflect the definition of {}", table))?;
        Ok(row.map(|(_, ddl)| ddl))
    }

    async fn create_table(&self, table: &str, definition: &str) -> Result<()> {
        let ddl = rewrite_create_statement(definition, table)?;
        tracing::debug!("Creating {} on the {} tier if absent", table, self.tier);

        let mut conn = self.conn().await?;
        conn.query_drop(ddl)
            .await
            .with_context(|| format!("Failed to create {}", table))?;
        Ok(())
    }

    async fn recreate_staging(&self, table: &str, staging: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        conn.query_drop(format!("DROP TABLE IF EXISTS {}", quote_mysql_ident(staging)))
            .await
            .with_context(|| format!("Failed to drop leftover staging table {}", staging))?;

        // Column definitions only: keys and indexes stay on the real table.
        conn.query_drop(format!(
            "CREATE TABLE {} AS SELECT * FROM {} LIMIT 0",
            quote_mysql_ident(staging),
            quote_mysql_ident(table)
        ))
        .await
        .with_context(|| format!("Failed to create staging table {}", staging))?;
        Ok(())
    }

    async fn append_rows(
        &self,
        staging: &str,
        columns: &[String],
        rows: &[Vec<Value>],
    ) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        if columns.is_empty() {
            bail!("Cannot insert rows without columns into {}", staging);
        }

        let rows_per_statement = std::cmp::max(1, MAX_PLACEHOLDERS / columns.len());
        let mut conn = self.conn().await?;
        let mut inserted = 0u64;

        for chunk in rows.chunks(rows_per_statement) {
            let sql = build_insert_statement(staging, columns, chunk.len());
            let params: Vec<Value> = chunk.iter().flat_map(|row| row.iter().cloned()).collect();

            conn.exec_drop(sql.as_str(), Params::Positional(params))
                .await
                .with_context(|| format!("Failed to insert rows into {}", staging))?;
            inserted += chunk.len() as u64;
        }

        Ok(inserted)
    }

    async fn replace_from_staging(&self, table: &str, staging: &str) -> Result<u64> {
        let sql = format!(
            "REPLACE INTO {} SELECT * FROM {}",
            quote_mysql_ident(table),
            quote_mysql_ident(staging)
        );
        tracing::debug!("{}", sql);

        let mut conn = self.conn().await?;
        conn.query_drop(sql)
            .await
            .with_context(|| format!("Failed to replace {} from {}", table, staging))?;
        Ok(conn.affected_rows())
    }

    async fn drop_table(&self, table: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        conn.query_drop(format!("DROP TABLE IF EXISTS {}", quote_mysql_ident(table)))
            .await
            .with_context(|| format!("Failed to drop {}", table))?;
        Ok(())
    }
}

fn rows_to_row_set(rows: Vec<Row>) -> RowSet {
    let columns = rows
        .first()
        .map(|row| {
            row.columns_ref()
                .iter()
                .map(|c| ColumnMeta::new(&c.name_str(), c.column_type()))
                .collect()
        })
        .unwrap_or_default();

    let values = rows
        .into_iter()
        .map(|row| {
            (0..row.len())
                .map(|i| row.get::<Value, _>(i).unwrap_or(Value::NULL))
                .collect()
        })
        .collect();

    RowSet::new(columns, values)
}

/// Build a multi-row insert for `row_count` rows:
///
/// ```sql
/// INSERT INTO `staging` (`a`, `b`) VALUES (?, ?), (?, ?)
/// ```
pub fn build_insert_statement(table: &str, columns: &[String], row_count: usize) -> String {
    let column_list = columns
        .iter()
        .map(|c| quote_mysql_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = format!("({})", vec!["?"; columns.len()].join(", "));
    let values = vec![placeholders; row_count].join(", ");

    format!(
        "INSERT INTO {} ({}) VALUES {}",
        quote_mysql_ident(table),
        column_list,
        values
    )
}

/// Turn a reflected `SHOW CREATE TABLE` statement into an idempotent create of
/// `table`, keeping the column, key and table options as reflected.
pub fn rewrite_create_statement(definition: &str, table: &str) -> Result<String> {
    let trimmed = definition.trim_start();
    let header = "CREATE TABLE ";
    if !trimmed
        .get(..header.len())
        .is_some_and(|h| h.eq_ignore_ascii_case(header))
    {
        bail!("Unexpected table definition: {}", first_line(trimmed));
    }

    let mut rest = trimmed[header.len()..].trim_start();
    let if_not_exists = "IF NOT EXISTS ";
    if rest
        .get(..if_not_exists.len())
        .is_some_and(|h| h.eq_ignore_ascii_case(if_not_exists))
    {
        rest = rest[if_not_exists.len()..].trim_start();
    }

    let body_start = rest
        .find('(')
        .with_context(|| format!("Table definition has no column list: {}", first_line(rest)))?;

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} {}",
        quote_mysql_ident(table),
        &rest[body_start..]
    ))
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}
