// ABOUTME: Check command verifying every configured tier accepts connections
// ABOUTME: Reports unregistered tiers instead of failing on them

use anyhow::{bail, Result};
use std::path::Path;

use crate::config::{ReplicatorConfig, Tier};
use crate::mysql::ConnectionProvider;

pub async fn run(config_path: &Path) -> Result<()> {
    let config = ReplicatorConfig::load(config_path)?;
    let provider = ConnectionProvider::new(&config)?;

    let mut failures = 0usize;
    for tier in Tier::ALL {
        if !provider.is_registered(tier) {
            println!("  {:10} not configured", tier.as_str());
            continue;
        }
        match provider.ping(tier).await {
            Ok(()) => println!("  {:10} ok", tier.as_str()),
            Err(e) => {
                failures += 1;
                tracing::error!("{:#}", e);
                println!("  {:10} FAILED: {}", tier.as_str(), e);
            }
        }
    }

    provider.disconnect().await;

    if failures > 0 {
        bail!("{} tier(s) failed the connectivity check", failures);
    }
    Ok(())
}
