// ABOUTME: Connection provider building one recycled MySQL pool per configured tier
// ABOUTME: Unknown tiers fail with a configuration error instead of a connection attempt

use anyhow::{Context, Result};
use mysql_async::prelude::*;
use mysql_async::{OptsBuilder, Pool, PoolOpts};
use std::collections::HashMap;
use std::time::Duration;

use super::store::MySqlStore;
use crate::config::{ReplicatorConfig, TableNaming, Tier, TierCredentials};
use crate::error::ReplicationError;
use crate::store::StoreProvider;

/// Connections older than this are closed when returned to the pool instead of
/// being reused, regardless of how many connections the pool holds.
pub const POOL_RECYCLE_SECS: u64 = 9600;

/// How often the pool sweeps idle connections.
const TTL_CHECK_INTERVAL_SECS: u64 = 60;

/// Build the driver options for one tier.
pub fn connection_opts(credentials: &TierCredentials) -> Result<OptsBuilder> {
    let password = credentials
        .resolved_password()
        .with_context(|| format!("Failed to resolve password for {}", credentials.host))?;

    let pool_opts = PoolOpts::default()
        .with_abs_conn_ttl(Some(Duration::from_secs(POOL_RECYCLE_SECS)))
        .with_inactive_connection_ttl(Duration::from_secs(POOL_RECYCLE_SECS))
        .with_ttl_check_interval(Duration::from_secs(TTL_CHECK_INTERVAL_SECS));

    Ok(OptsBuilder::default()
        .ip_or_hostname(credentials.host.clone())
        .tcp_port(credentials.port)
        .user(Some(credentials.user.clone()))
        .pass(password)
        .db_name(Some(credentials.schema.clone()))
        .init(vec!["SET autocommit = 1"])
        .pool_opts(pool_opts))
}

/// Hands out connection factories keyed by tier.
///
/// Pools are created up front for every tier present in the configuration;
/// `Pool::new` does not connect, so a tier that is never used never opens a
/// socket.
pub struct ConnectionProvider {
    pools: HashMap<Tier, Pool>,
    naming: TableNaming,
}

impl ConnectionProvider {
    pub fn new(config: &ReplicatorConfig) -> Result<Self> {
        let mut pools = HashMap::new();
        for tier in Tier::ALL {
            let credentials = match config.credentials(tier) {
                Ok(credentials) => credentials,
                Err(_) => {
                    tracing::debug!("No credentials registered for the {} tier", tier);
                    continue;
                }
            };
            let opts = connection_opts(credentials)
                .with_context(|| format!("Invalid connection settings for the {} tier", tier))?;
            tracing::debug!(
                "Registered {} tier at {}:{}/{}",
                tier,
                credentials.host,
                credentials.port,
                credentials.schema
            );
            pools.insert(tier, Pool::new(opts));
        }

        Ok(Self {
            pools,
            naming: config.naming(),
        })
    }

    /// Connection factory for `tier`.
    pub fn connection(&self, tier: Tier) -> Result<Pool, ReplicationError> {
        self.pools
            .get(&tier)
            .cloned()
            .ok_or(ReplicationError::Configuration(tier))
    }

    pub fn is_registered(&self, tier: Tier) -> bool {
        self.pools.contains_key(&tier)
    }

    /// Check that `tier` accepts connections and answers a trivial query.
    pub async fn ping(&self, tier: Tier) -> Result<()> {
        let pool = self.connection(tier)?;
        let mut conn = pool
            .get_conn()
            .await
            .with_context(|| format!("Failed to connect to the {} tier", tier))?;
        conn.query_drop("SELECT 1")
            .await
            .with_context(|| format!("The {} tier did not answer SELECT 1", tier))?;
        Ok(())
    }

    /// Close every pool, waiting for checked-out connections to come back.
    pub async fn disconnect(self) {
        for (tier, pool) in self.pools {
            if let Err(e) = pool.disconnect().await {
                tracing::warn!("Failed to close the {} tier pool cleanly: {}", tier, e);
            }
        }
    }
}

impl StoreProvider for ConnectionProvider {
    type Store = MySqlStore;

    fn store(&self, tier: Tier) -> Result<MySqlStore, ReplicationError> {
        Ok(MySqlStore::new(tier, self.connection(tier)?))
    }

    fn naming(&self) -> &TableNaming {
        &self.naming
    }
}
