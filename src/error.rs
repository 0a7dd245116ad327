// ABOUTME: Error kinds surfaced at the replication component boundaries
// ABOUTME: Wraps anyhow context chains from the database layer into typed failures

use thiserror::Error;

use crate::config::Tier;

/// Failure categories of the replication engine.
///
/// Lower layers build `anyhow` context chains; each component wraps its
/// failure into one of these kinds so the orchestrator can report where a
/// table failed.
#[derive(Debug, Error)]
pub enum ReplicationError {
    /// Credentials for a tier are not registered. Fatal to that tier's operations.
    #[error("no credentials configured for the {0} tier")]
    Configuration(Tier),

    /// Resolving a watermark failed. Only ever logged; the resolver falls back
    /// to the column's default start.
    #[error("failed to resolve watermark for {table}: {source:#}")]
    WatermarkResolution {
        table: String,
        #[source]
        source: anyhow::Error,
    },

    /// The windowed read against the origin tier failed.
    #[error("failed to extract {table} from the {tier} tier: {source:#}")]
    Extraction {
        table: String,
        tier: Tier,
        #[source]
        source: anyhow::Error,
    },

    /// Schema creation, staging, replace or staging cleanup failed.
    #[error("failed to merge {table} into the {tier} tier: {source:#}")]
    Merge {
        table: String,
        tier: Tier,
        #[source]
        source: anyhow::Error,
    },
}

pub type Result<T> = std::result::Result<T, ReplicationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_names_tier() {
        let err = ReplicationError::Configuration(Tier::Production);
        assert_eq!(
            err.to_string(),
            "no credentials configured for the production tier"
        );
    }

    #[test]
    fn test_merge_error_includes_cause_chain() {
        let cause = anyhow::anyhow!("Duplicate column").context("Failed to create staging table");
        let err = ReplicationError::Merge {
            table: "orders".to_string(),
            tier: Tier::Warehouse,
            source: cause,
        };
        let msg = err.to_string();
        assert!(msg.contains("orders"));
        assert!(msg.contains("warehouse"));
        assert!(msg.contains("Failed to create staging table"));
        assert!(msg.contains("Duplicate column"));
    }
}
