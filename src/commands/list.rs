// ABOUTME: List command printing every registered table with its correlation id
// ABOUTME: Reads only the registry; no tier is contacted

use anyhow::Result;
use std::path::Path;

use crate::config::ReplicatorConfig;
use crate::registry;

pub fn run(config_path: &Path) -> Result<()> {
    let config = ReplicatorConfig::load(config_path)?;
    let tables = registry::load(&config.registry)?;
    print!("{}", registry::render_listing(&tables));
    Ok(())
}
