// ABOUTME: Per-table replication across one edge: resolve window, extract, swap-load
// ABOUTME: Catches every failure so one table never aborts the rest of a batch

use std::fmt;
use std::time::{Duration, Instant};

use super::extract::extract;
use super::merge::swap_load;
use super::watermark::resolve_watermark;
use super::window::{self, ReplicationWindow};
use crate::config::Tier;
use crate::error::Result;
use crate::registry::TableDescriptor;
use crate::store::StoreProvider;

/// One of the two directions data flows between tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    SourceToWarehouse,
    WarehouseToProduction,
}

impl Edge {
    pub const ALL: [Edge; 2] = [Edge::SourceToWarehouse, Edge::WarehouseToProduction];

    pub fn origin(&self) -> Tier {
        match self {
            Edge::SourceToWarehouse => Tier::Source,
            Edge::WarehouseToProduction => Tier::Warehouse,
        }
    }

    pub fn destination(&self) -> Tier {
        match self {
            Edge::SourceToWarehouse => Tier::Warehouse,
            Edge::WarehouseToProduction => Tier::Production,
        }
    }

    /// Tier whose table definitions are authoritative when a destination
    /// table has to be created.
    pub fn schema_reference(&self) -> Tier {
        Tier::Warehouse
    }

    /// Short tag used in outcome log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Edge::SourceToWarehouse => "DW",
            Edge::WarehouseToProduction => "DISTRO",
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.origin(), self.destination())
    }
}

/// Result of replicating one table across one edge.
#[derive(Debug, Clone, PartialEq)]
pub enum TableOutcome {
    /// Rows were extracted and merged.
    Merged {
        window: ReplicationWindow,
        rows: u64,
        elapsed: Duration,
    },
    /// The window held no rows; nothing was merged.
    Empty { window: ReplicationWindow },
    /// Some step failed; the error has already been logged.
    Failed { error: String },
}

impl TableOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, TableOutcome::Failed { .. })
    }
}

/// Replicate one table across `edge`.
///
/// Without `window_override` the window starts at the destination's resolved
/// watermark. Failures are logged at error level and reported as
/// `TableOutcome::Failed`; they are never returned as errors and never retried
/// here.
pub async fn replicate<P: StoreProvider>(
    provider: &P,
    table: &TableDescriptor,
    edge: Edge,
    window_override: Option<ReplicationWindow>,
) -> TableOutcome {
    let started = Instant::now();
    match run(provider, table, edge, window_override, started).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(
                table = %table.table_name,
                edge = %edge,
                "[ {} -> {} failed: {} ]",
                edge.label(),
                table.table_name,
                e
            );
            TableOutcome::Failed {
                error: e.to_string(),
            }
        }
    }
}

async fn run<P: StoreProvider>(
    provider: &P,
    table: &TableDescriptor,
    edge: Edge,
    window_override: Option<ReplicationWindow>,
    started: Instant,
) -> Result<TableOutcome> {
    let naming = provider.naming();
    let origin = provider.store(edge.origin())?;
    let destination = provider.store(edge.destination())?;

    let window = match window_override {
        Some(window) => {
            if !window.fits_column(&table.column_name) {
                tracing::warn!(
                    table = %table.table_name,
                    "Window {} does not match the kind of watermark column {}",
                    window,
                    table.column_name
                );
            }
            window
        }
        None => {
            let start =
                resolve_watermark(&destination, naming, &table.table_name, &table.column_name)
                    .await;
            ReplicationWindow::following(start, window::now())
        }
    };

    tracing::debug!(
        "Running from {} to {} -> {:30}",
        window.start,
        window.end,
        table.table_name
    );

    let rows = extract(
        &origin,
        naming,
        &table.table_name,
        &table.column_name,
        &window,
    )
    .await?;

    if rows.is_empty() {
        tracing::info!(
            table = %table.table_name,
            edge = %edge,
            "[ {} -> empty window for {} range: {} ]",
            edge.label(),
            table.table_name,
            window
        );
        return Ok(TableOutcome::Empty { window });
    }

    let reference = provider.store(edge.schema_reference())?;
    let merged = swap_load(
        &destination,
        &[&reference, &origin],
        naming,
        &table.table_name,
        &rows,
    )
    .await?;

    let elapsed = started.elapsed();
    tracing::info!(
        table = %table.table_name,
        edge = %edge,
        rows = merged,
        elapsed_secs = elapsed.as_secs_f64(),
        "[ SUCCESS {:6} -> {:^26} >> range: {} >> {:^6} rows >> {:.2} sec ]",
        edge.label(),
        naming.physical(edge.destination(), &table.table_name),
        window,
        merged,
        elapsed.as_secs_f64()
    );

    Ok(TableOutcome::Merged {
        window,
        rows: merged,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_tiers() {
        assert_eq!(Edge::SourceToWarehouse.origin(), Tier::Source);
        assert_eq!(Edge::SourceToWarehouse.destination(), Tier::Warehouse);
        assert_eq!(Edge::WarehouseToProduction.origin(), Tier::Warehouse);
        assert_eq!(Edge::WarehouseToProduction.destination(), Tier::Production);
        assert_eq!(Edge::WarehouseToProduction.schema_reference(), Tier::Warehouse);
        assert_eq!(Edge::SourceToWarehouse.to_string(), "source->warehouse");
    }

    #[test]
    fn test_outcome_failure_flag() {
        assert!(TableOutcome::Failed {
            error: "boom".to_string()
        }
        .is_failure());
    }
}
