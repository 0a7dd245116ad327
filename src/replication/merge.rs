// ABOUTME: Swap-load merger staging extracted rows and replacing them into the real table
// ABOUTME: The real table only ever changes through one REPLACE INTO ... SELECT statement

use anyhow::{bail, Context};

use crate::config::TableNaming;
use crate::error::{ReplicationError, Result};
use crate::store::{RowSet, TierStore};

/// Rows appended to the staging table per chunk.
pub const STAGING_CHUNK_ROWS: usize = 100_000;

/// Merge `rows` into `table` on the destination tier.
///
/// Steps, all on `destination`:
/// 1. create the real table if absent, from the first `schema_sources` tier
///    that holds a definition of it
/// 2. drop any leftover staging table and recreate it with the real table's columns
/// 3. append the rows to staging in chunks of `STAGING_CHUNK_ROWS`
/// 4. `REPLACE INTO real SELECT * FROM staging`
/// 5. drop the staging table
///
/// A failure before step 4 leaves the real table untouched. A failure in step 5
/// leaves the staging table behind; step 2 of the next merge removes it.
///
/// Returns the number of rows merged.
pub async fn swap_load<S: TierStore>(
    destination: &S,
    schema_sources: &[&S],
    naming: &TableNaming,
    table: &str,
    rows: &RowSet,
) -> Result<u64> {
    run_swap_load(destination, schema_sources, naming, table, rows)
        .await
        .map_err(|source| ReplicationError::Merge {
            table: table.to_string(),
            tier: destination.tier(),
            source,
        })
}

async fn run_swap_load<S: TierStore>(
    destination: &S,
    schema_sources: &[&S],
    naming: &TableNaming,
    table: &str,
    rows: &RowSet,
) -> anyhow::Result<u64> {
    if rows.is_empty() {
        bail!("Refusing to merge an empty extraction");
    }

    let real = naming.physical(destination.tier(), table);
    let staging = naming.staging(destination.tier(), table);

    ensure_destination_table(destination, schema_sources, naming, table, &real).await?;

    destination
        .recreate_staging(&real, &staging)
        .await
        .with_context(|| format!("Failed to prepare staging table {}", staging))?;

    tracing::debug!("Inserting data into staging table: {}", staging);
    let columns = rows.column_names();
    let mut staged = 0u64;
    for chunk in rows.rows.chunks(STAGING_CHUNK_ROWS) {
        staged += destination.append_rows(&staging, &columns, chunk).await?;
    }

    tracing::debug!("Replacing rows of {} from {}", real, staging);
    destination.replace_from_staging(&real, &staging).await?;

    destination
        .drop_table(&staging)
        .await
        .with_context(|| format!("{} was updated but staging table {} was not dropped", real, staging))?;

    Ok(staged)
}

/// Create the real destination table when it does not exist yet.
async fn ensure_destination_table<S: TierStore>(
    destination: &S,
    schema_sources: &[&S],
    naming: &TableNaming,
    table: &str,
    real: &str,
) -> anyhow::Result<()> {
    if destination.table_exists(real).await? {
        return Ok(());
    }

    for source in schema_sources {
        let reflected = naming.physical(source.tier(), table);
        if let Some(definition) = source.table_definition(&reflected).await? {
            tracing::info!(
                "Creating {} on the {} tier from the {} tier definition of {}",
                real,
                destination.tier(),
                source.tier(),
                reflected
            );
            destination.create_table(real, &definition).await?;
            return Ok(());
        }
    }

    bail!("No tier holds a definition of {} to create it from", table)
}
