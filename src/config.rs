// ABOUTME: Per-tier connection settings and table naming loaded from replicator.toml
// ABOUTME: Resolves tier identities to credentials and physical table names

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::ReplicationError;

/// Default MySQL port when a tier does not specify one.
pub const DEFAULT_PORT: u16 = 3306;

/// Prefix used for warehouse and production table names.
pub const DEFAULT_TABLE_PREFIX: &str = "tb_";

/// Suffix appended to a physical table name to build its staging table.
pub const STAGING_SUFFIX: &str = "_tmp";

/// One of the three fixed tiers data moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Operational system of record
    Source,
    /// Intermediate warehouse
    Warehouse,
    /// Production/distribution store
    Production,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Source, Tier::Warehouse, Tier::Production];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Source => "source",
            Tier::Warehouse => "warehouse",
            Tier::Production => "production",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection settings for one tier.
#[derive(Clone, Deserialize)]
pub struct TierCredentials {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    /// Inline password
    #[serde(default)]
    pub password: Option<String>,
    /// Name of an environment variable holding the password (wins over `password`)
    #[serde(default)]
    pub password_env: Option<String>,
    /// Database (schema) name on the tier's server
    pub schema: String,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl TierCredentials {
    /// Resolve the password, preferring `password_env` when it is set.
    pub fn resolved_password(&self) -> Result<Option<String>> {
        if let Some(var) = &self.password_env {
            let value = std::env::var(var)
                .with_context(|| format!("Password environment variable {} is not set", var))?;
            return Ok(Some(value));
        }
        Ok(self.password.clone())
    }
}

// Credentials end up in logs through `{:?}`; never print the password.
impl fmt::Debug for TierCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TierCredentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("password_env", &self.password_env)
            .field("schema", &self.schema)
            .finish()
    }
}

/// Credentials keyed by tier. A missing section means the tier is not registered.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TierMap {
    pub source: Option<TierCredentials>,
    pub warehouse: Option<TierCredentials>,
    pub production: Option<TierCredentials>,
}

/// Physical naming convention shared by every tier.
///
/// The source tier stores tables under their logical name; the warehouse and
/// production tiers prefix it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNaming {
    prefix: String,
}

impl TableNaming {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Name of `table` as it exists on `tier`.
    pub fn physical(&self, tier: Tier, table: &str) -> String {
        match tier {
            Tier::Source => table.to_string(),
            Tier::Warehouse | Tier::Production => format!("{}{}", self.prefix, table),
        }
    }

    /// Staging table used while merging `table` into `tier`.
    pub fn staging(&self, tier: Tier, table: &str) -> String {
        format!("{}{}", self.physical(tier, table), STAGING_SUFFIX)
    }
}

impl Default for TableNaming {
    fn default() -> Self {
        Self::new(DEFAULT_TABLE_PREFIX)
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplicatorConfig {
    /// Path to the JSON table registry
    pub registry: PathBuf,
    #[serde(default = "default_prefix")]
    pub table_prefix: String,
    #[serde(default)]
    pub tiers: TierMap,
}

fn default_prefix() -> String {
    DEFAULT_TABLE_PREFIX.to_string()
}

impl ReplicatorConfig {
    /// Load configuration from a TOML file.
    ///
    /// A relative `registry` path is resolved against the directory holding
    /// the configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration from {:?}", path))?;
        let mut config = Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse configuration from {:?}", path))?;

        if config.registry.is_relative() {
            if let Some(dir) = path.parent() {
                config.registry = dir.join(&config.registry);
            }
        }
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: ReplicatorConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Credentials for `tier`, or a configuration error when the tier is not registered.
    pub fn credentials(&self, tier: Tier) -> Result<&TierCredentials, ReplicationError> {
        let entry = match tier {
            Tier::Source => self.tiers.source.as_ref(),
            Tier::Warehouse => self.tiers.warehouse.as_ref(),
            Tier::Production => self.tiers.production.as_ref(),
        };
        entry.ok_or(ReplicationError::Configuration(tier))
    }

    pub fn naming(&self) -> TableNaming {
        TableNaming::new(self.table_prefix.clone())
    }
}
