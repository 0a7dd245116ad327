// ABOUTME: Replication commands running the batch driver over the registry
// ABOUTME: Per-table failures are reported in the summary but never fail the process

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::ReplicatorConfig;
use crate::mysql::ConnectionProvider;
use crate::registry;
use crate::replication::{run_batch, BatchStats, Edge, ReplicationWindow, Selection};

/// What a replication command covers.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicateOptions {
    pub edges: Vec<Edge>,
    pub selection: Selection,
    pub window: Option<ReplicationWindow>,
}

pub async fn run(config_path: &Path, opts: ReplicateOptions) -> Result<BatchStats> {
    let config = ReplicatorConfig::load(config_path)?;
    let tables = registry::load(&config.registry)?;
    let provider =
        ConnectionProvider::new(&config).context("Failed to set up tier connections")?;

    tracing::info!(
        "Loaded {} tables from {:?}",
        tables.len(),
        config.registry
    );

    let stats = run_batch(&provider, &tables, &opts.edges, opts.selection, opts.window).await;
    provider.disconnect().await;

    report(&stats);
    Ok(stats)
}

fn report(stats: &BatchStats) {
    tracing::info!(
        "Batch complete: {} merged, {} empty, {} rows in {}ms",
        stats.tables_merged,
        stats.tables_empty,
        stats.rows_merged,
        stats.duration_ms
    );
    if !stats.errors.is_empty() {
        tracing::warn!("Batch had {} errors", stats.errors.len());
        for err in &stats.errors {
            tracing::warn!("  - {}", err);
        }
    }

    println!();
    println!("========================================");
    println!("Replication batch complete");
    println!("========================================");
    println!("  Tables merged: {}", stats.tables_merged);
    println!("  Empty windows: {}", stats.tables_empty);
    println!("  Rows merged: {}", stats.rows_merged);
    if !stats.errors.is_empty() {
        println!("  Errors: {}", stats.errors.len());
    }
}
