//! In-memory tier stores for exercising the replication engine without MySQL.
//!
//! Every tier lives in one shared map of tables. The first column of a table
//! acts as its primary key for `replace_from_staging`. Calls are recorded so
//! tests can assert which steps ran, and any step can be made to fail for a
//! given table.

#![allow(dead_code)]

use anyhow::{anyhow, bail, Result};
use mysql_async::consts::ColumnType;
use mysql_async::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tier_replicator::config::{TableNaming, Tier};
use tier_replicator::error::ReplicationError;
use tier_replicator::store::{ColumnMeta, RowSet, StoreProvider, TierStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    MaxValue,
    SelectRange,
    TableExists,
    TableDefinition,
    CreateTable,
    RecreateStaging,
    AppendRows,
    Replace,
    Drop,
}

#[derive(Debug, Clone, Default)]
struct MemTable {
    columns: Vec<ColumnMeta>,
    rows: Vec<Vec<Value>>,
}

#[derive(Default)]
struct World {
    tables: HashMap<(Tier, String), MemTable>,
    failures: HashSet<(Tier, Op, String)>,
    calls: Vec<(Tier, Op, String)>,
}

impl World {
    fn enter(&mut self, tier: Tier, op: Op, table: &str) -> Result<()> {
        self.calls.push((tier, op, table.to_string()));
        if self.failures.contains(&(tier, op, table.to_string())) {
            bail!("injected {:?} failure on {} ({})", op, table, tier);
        }
        Ok(())
    }

    fn table(&self, tier: Tier, table: &str) -> Result<&MemTable> {
        self.tables
            .get(&(tier, table.to_string()))
            .ok_or_else(|| anyhow!("Table '{}' doesn't exist on {}", table, tier))
    }
}

/// Store for one tier of the shared in-memory world.
#[derive(Clone)]
pub struct MemoryStore {
    tier: Tier,
    world: Arc<Mutex<World>>,
}

fn column_index(table: &MemTable, column: &str) -> Result<usize> {
    table
        .columns
        .iter()
        .position(|c| c.name == column)
        .ok_or_else(|| anyhow!("Unknown column '{}'", column))
}

/// Ordering of the value kinds the tests use as watermarks.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Date(..), Value::Date(..)) => Some(date_key(a).cmp(&date_key(b))),
        (Value::Bytes(x), Value::Bytes(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn date_key(value: &Value) -> (u16, u8, u8, u8, u8, u8, u32) {
    match value {
        Value::Date(y, mo, d, h, mi, s, us) => (*y, *mo, *d, *h, *mi, *s, *us),
        _ => (0, 0, 0, 0, 0, 0, 0),
    }
}

fn definition_key(tier: Tier, table: &str) -> String {
    format!("memory:{}:{}", tier, table)
}

impl TierStore for MemoryStore {
    fn tier(&self) -> Tier {
        self.tier
    }

    async fn max_value(&self, table: &str, column: &str) -> Result<Option<Value>> {
        let mut world = self.world.lock().unwrap();
        world.enter(self.tier, Op::MaxValue, table)?;
        let mem = world.table(self.tier, table)?;
        let idx = column_index(mem, column)?;
        Ok(mem
            .rows
            .iter()
            .map(|row| row[idx].clone())
            .filter(|v| *v != Value::NULL)
            .max_by(|a, b| compare(a, b).unwrap_or(Ordering::Equal)))
    }

    async fn select_range(
        &self,
        table: &str,
        column: &str,
        start: &Value,
        end: &Value,
    ) -> Result<RowSet> {
        let mut world = self.world.lock().unwrap();
        world.enter(self.tier, Op::SelectRange, table)?;
        let mem = world.table(self.tier, table)?;
        let idx = column_index(mem, column)?;
        let rows: Vec<Vec<Value>> = mem
            .rows
            .iter()
            .filter(|row| {
                compare(&row[idx], start).is_some_and(|o| o != Ordering::Less)
                    && compare(&row[idx], end).is_some_and(|o| o != Ordering::Greater)
            })
            .cloned()
            .collect();
        let columns = if rows.is_empty() {
            Vec::new()
        } else {
            mem.columns.clone()
        };
        Ok(RowSet::new(columns, rows))
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        let mut world = self.world.lock().unwrap();
        world.enter(self.tier, Op::TableExists, table)?;
        Ok(world.tables.contains_key(&(self.tier, table.to_string())))
    }

    async fn table_definition(&self, table: &str) -> Result<Option<String>> {
        let mut world = self.world.lock().unwrap();
        world.enter(self.tier, Op::TableDefinition, table)?;
        Ok(world
            .tables
            .contains_key(&(self.tier, table.to_string()))
            .then(|| definition_key(self.tier, table)))
    }

    async fn create_table(&self, table: &str, definition: &str) -> Result<()> {
        let mut world = self.world.lock().unwrap();
        world.enter(self.tier, Op::CreateTable, table)?;
        if world.tables.contains_key(&(self.tier, table.to_string())) {
            return Ok(());
        }
        let columns = world
            .tables
            .iter()
            .find(|((tier, name), _)| definition_key(*tier, name) == definition)
            .map(|(_, mem)| mem.columns.clone())
            .ok_or_else(|| anyhow!("Unknown definition {}", definition))?;
        world.tables.insert(
            (self.tier, table.to_string()),
            MemTable {
                columns,
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    async fn recreate_staging(&self, table: &str, staging: &str) -> Result<()> {
        let mut world = self.world.lock().unwrap();
        world.enter(self.tier, Op::RecreateStaging, staging)?;
        world.tables.remove(&(self.tier, staging.to_string()));
        let columns = world.table(self.tier, table)?.columns.clone();
        world.tables.insert(
            (self.tier, staging.to_string()),
            MemTable {
                columns,
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    async fn append_rows(
        &self,
        staging: &str,
        columns: &[String],
        rows: &[Vec<Value>],
    ) -> Result<u64> {
        let mut world = self.world.lock().unwrap();
        world.enter(self.tier, Op::AppendRows, staging)?;
        let tier = self.tier;
        let mem = world
            .tables
            .get_mut(&(tier, staging.to_string()))
            .ok_or_else(|| anyhow!("Staging table '{}' doesn't exist", staging))?;

        let positions: Vec<usize> = mem
            .columns
            .iter()
            .map(|c| {
                columns
                    .iter()
                    .position(|name| *name == c.name)
                    .ok_or_else(|| anyhow!("Column '{}' missing from insert", c.name))
            })
            .collect::<Result<_>>()?;

        for row in rows {
            mem.rows
                .push(positions.iter().map(|&i| row[i].clone()).collect());
        }
        Ok(rows.len() as u64)
    }

    async fn replace_from_staging(&self, table: &str, staging: &str) -> Result<u64> {
        let mut world = self.world.lock().unwrap();
        world.enter(self.tier, Op::Replace, table)?;
        let staged = world.table(self.tier, staging)?.rows.clone();
        let real = world
            .tables
            .get_mut(&(self.tier, table.to_string()))
            .ok_or_else(|| anyhow!("Table '{}' doesn't exist", table))?;

        let mut by_key: HashMap<String, usize> = real
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| (format!("{:?}", row[0]), i))
            .collect();
        for row in staged.iter() {
            let key = format!("{:?}", row[0]);
            match by_key.get(&key) {
                Some(&i) => real.rows[i] = row.clone(),
                None => {
                    by_key.insert(key, real.rows.len());
                    real.rows.push(row.clone());
                }
            }
        }
        Ok(staged.len() as u64)
    }

    async fn drop_table(&self, table: &str) -> Result<()> {
        let mut world = self.world.lock().unwrap();
        world.enter(self.tier, Op::Drop, table)?;
        world.tables.remove(&(self.tier, table.to_string()));
        Ok(())
    }
}

/// Provider over a shared in-memory world; every tier is registered unless
/// removed with `without`.
pub struct MemoryProvider {
    world: Arc<Mutex<World>>,
    naming: TableNaming,
    registered: Vec<Tier>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self {
            world: Arc::new(Mutex::new(World::default())),
            naming: TableNaming::default(),
            registered: Tier::ALL.to_vec(),
        }
    }

    pub fn without(mut self, tier: Tier) -> Self {
        self.registered.retain(|t| *t != tier);
        self
    }

    pub fn create_table(&self, tier: Tier, table: &str, columns: &[(&str, ColumnType)]) {
        let columns = columns
            .iter()
            .map(|(name, ty)| ColumnMeta::new(name, *ty))
            .collect();
        self.world.lock().unwrap().tables.insert(
            (tier, table.to_string()),
            MemTable {
                columns,
                rows: Vec::new(),
            },
        );
    }

    pub fn insert(&self, tier: Tier, table: &str, rows: Vec<Vec<Value>>) {
        let mut world = self.world.lock().unwrap();
        let mem = world
            .tables
            .get_mut(&(tier, table.to_string()))
            .expect("table must be created before inserting");
        mem.rows.extend(rows);
    }

    pub fn rows(&self, tier: Tier, table: &str) -> Option<Vec<Vec<Value>>> {
        self.world
            .lock()
            .unwrap()
            .tables
            .get(&(tier, table.to_string()))
            .map(|t| t.rows.clone())
    }

    pub fn exists(&self, tier: Tier, table: &str) -> bool {
        self.rows(tier, table).is_some()
    }

    pub fn fail_on(&self, tier: Tier, op: Op, table: &str) {
        self.world
            .lock()
            .unwrap()
            .failures
            .insert((tier, op, table.to_string()));
    }

    pub fn clear_failures(&self) {
        self.world.lock().unwrap().failures.clear();
    }

    pub fn calls(&self, tier: Tier, op: Op) -> Vec<String> {
        self.world
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(t, o, _)| *t == tier && *o == op)
            .map(|(_, _, table)| table.clone())
            .collect()
    }

    pub fn memory_store(&self, tier: Tier) -> MemoryStore {
        MemoryStore {
            tier,
            world: Arc::clone(&self.world),
        }
    }
}

impl StoreProvider for MemoryProvider {
    type Store = MemoryStore;

    fn store(&self, tier: Tier) -> std::result::Result<MemoryStore, ReplicationError> {
        if !self.registered.contains(&tier) {
            return Err(ReplicationError::Configuration(tier));
        }
        Ok(self.memory_store(tier))
    }

    fn naming(&self) -> &TableNaming {
        &self.naming
    }
}

/// `YYYY-MM-DD HH:MM:SS` as a DATETIME value.
pub fn datetime(text: &str) -> Value {
    let ts = chrono::NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
        .expect("valid timestamp");
    tier_replicator::replication::Watermark::Timestamp(ts).to_sql()
}

pub fn text(value: &str) -> Value {
    Value::Bytes(value.as_bytes().to_vec())
}

pub const ORDER_COLUMNS: &[(&str, ColumnType)] = &[
    ("order_id", ColumnType::MYSQL_TYPE_LONGLONG),
    ("status", ColumnType::MYSQL_TYPE_VAR_STRING),
    ("updated_at", ColumnType::MYSQL_TYPE_DATETIME),
];

pub fn order(id: i64, status: &str, updated_at: &str) -> Vec<Value> {
    vec![Value::Int(id), text(status), datetime(updated_at)]
}
