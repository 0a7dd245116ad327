// ABOUTME: Watermark resolver finding where the next extraction window starts
// ABOUTME: Reads the destination's max watermark and falls back to defaults on any failure

use anyhow::Result;
use chrono::Duration;

use super::window::{Watermark, WatermarkKind};
use crate::config::TableNaming;
use crate::error::ReplicationError;
use crate::store::TierStore;

/// Hours subtracted from a resolved timestamp watermark before it becomes the
/// next window start. Identifier watermarks are never adjusted.
///
/// Rows near the previous cutoff are read again; the merge replaces them by key.
pub const WATERMARK_CLOCK_SKEW_HOURS: i64 = 2;

/// Resolve the start of the next window for `table` on the store's tier.
///
/// Never fails: an empty table resolves to the column's default start, and a
/// failed lookup (missing table, lost connection, unreadable value) is logged
/// and also resolves to the default.
pub async fn resolve_watermark<S: TierStore>(
    store: &S,
    naming: &TableNaming,
    table: &str,
    column: &str,
) -> Watermark {
    let kind = WatermarkKind::for_column(column);
    let fallback = kind.default_start();
    let physical = naming.physical(store.tier(), table);

    let resolved = match latest_watermark(store, &physical, column, kind).await {
        Ok(Some(latest)) => apply_clock_skew(latest),
        Ok(None) => {
            tracing::debug!("{} is empty", physical);
            fallback
        }
        Err(source) => {
            let err = ReplicationError::WatermarkResolution {
                table: table.to_string(),
                source,
            };
            tracing::error!(table = %table, tier = %store.tier(), "{}", err);
            tracing::debug!(
                "Can't obtain maximum of {}. Standard: {}",
                physical,
                fallback
            );
            fallback
        }
    };

    tracing::debug!(
        "Last row in {} -> {} >> {}",
        store.tier(),
        physical,
        resolved
    );
    resolved
}

async fn latest_watermark<S: TierStore>(
    store: &S,
    physical: &str,
    column: &str,
    kind: WatermarkKind,
) -> Result<Option<Watermark>> {
    match store.max_value(physical, column).await? {
        Some(value) => Ok(Some(Watermark::from_sql(&value, kind)?)),
        None => Ok(None),
    }
}

/// Timestamp watermarks move back by `WATERMARK_CLOCK_SKEW_HOURS`; identifiers are kept as-is.
pub fn apply_clock_skew(latest: Watermark) -> Watermark {
    match latest {
        Watermark::Id(id) => Watermark::Id(id),
        Watermark::Timestamp(ts) => {
            Watermark::Timestamp(ts - Duration::hours(WATERMARK_CLOCK_SKEW_HOURS))
        }
    }
}
