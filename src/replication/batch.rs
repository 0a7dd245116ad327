// ABOUTME: Batch driver replicating registry tables across the requested edges
// ABOUTME: Runs tables sequentially in registry order and summarizes the outcomes

use std::time::Instant;

use super::orchestrator::{replicate, Edge, TableOutcome};
use super::window::ReplicationWindow;
use crate::registry::TableDescriptor;
use crate::store::StoreProvider;

/// Which registry entries a batch covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    All,
    /// Only the table with this correlation id
    Cid(i64),
}

impl Selection {
    pub fn matches(&self, table: &TableDescriptor) -> bool {
        match self {
            Selection::All => true,
            Selection::Cid(cid) => table.correlation_id == *cid,
        }
    }
}

/// Statistics from one batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchStats {
    pub tables_merged: usize,
    pub tables_empty: usize,
    pub rows_merged: u64,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl BatchStats {
    /// Check if every table completed without errors.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    fn record(&mut self, table: &TableDescriptor, edge: Edge, outcome: &TableOutcome) {
        match outcome {
            TableOutcome::Merged { rows, .. } => {
                self.tables_merged += 1;
                self.rows_merged += rows;
            }
            TableOutcome::Empty { .. } => self.tables_empty += 1,
            TableOutcome::Failed { error } => self
                .errors
                .push(format!("{} ({}): {}", table.table_name, edge, error)),
        }
    }
}

/// Replicate the selected tables across each edge in `edges`.
///
/// Each edge runs over every selected table before the next edge starts. An
/// explicit `window` applies to every table and skips watermark resolution.
pub async fn run_batch<P: StoreProvider>(
    provider: &P,
    tables: &[TableDescriptor],
    edges: &[Edge],
    selection: Selection,
    window: Option<ReplicationWindow>,
) -> BatchStats {
    let start = Instant::now();
    let mut stats = BatchStats::default();

    let selected: Vec<&TableDescriptor> = tables.iter().filter(|t| selection.matches(t)).collect();
    if selected.is_empty() {
        tracing::warn!("No registered table matches {:?}", selection);
    }
    if let Some(window) = &window {
        tracing::info!("Using explicit window {} for every table", window);
    }

    for edge in edges {
        tracing::info!("Replicating {} tables across {}", selected.len(), edge);
        for table in &selected {
            let outcome = replicate(provider, table, *edge, window).await;
            stats.record(table, *edge, &outcome);
        }
    }

    stats.duration_ms = start.elapsed().as_millis() as u64;
    stats
}
