// ABOUTME: Table registry listing which tables replicate and by which watermark column
// ABOUTME: Loads the JSON list of {table_name, column_name, cid} records once per batch

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::utils::validate_mysql_identifier;

/// One replicable table and the column its watermark is tracked on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TableDescriptor {
    pub table_name: String,
    pub column_name: String,
    #[serde(rename = "cid")]
    pub correlation_id: i64,
}

impl TableDescriptor {
    pub fn new(table_name: &str, column_name: &str, correlation_id: i64) -> Self {
        Self {
            table_name: table_name.to_string(),
            column_name: column_name.to_string(),
            correlation_id,
        }
    }
}

/// Load the registry from a JSON file.
pub fn load(path: &Path) -> Result<Vec<TableDescriptor>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read table registry from {:?}", path))?;
    parse(&contents).with_context(|| format!("Failed to parse table registry from {:?}", path))
}

/// Parse and validate registry JSON. Table and column names end up quoted in
/// generated SQL and must be plain identifiers.
pub fn parse(contents: &str) -> Result<Vec<TableDescriptor>> {
    let tables: Vec<TableDescriptor> = serde_json::from_str(contents)?;
    for table in &tables {
        validate_mysql_identifier(&table.table_name)
            .with_context(|| format!("Invalid table_name for cid {}", table.correlation_id))?;
        validate_mysql_identifier(&table.column_name)
            .with_context(|| format!("Invalid column_name for {}", table.table_name))?;
    }
    Ok(tables)
}

/// Render the `[ table | cid ]` listing shown by the `list` command.
pub fn render_listing(tables: &[TableDescriptor]) -> String {
    let mut out = String::new();
    out.push_str("[      Table                |   CID ]\n");
    out.push_str("[-----------------------------------]\n");
    for table in tables {
        out.push_str(&format!(
            "[ {:25} | {:5} ]\n",
            table.table_name, table.correlation_id
        ));
    }
    out
}
