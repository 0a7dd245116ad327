// ABOUTME: Command implementations behind the CLI actions
// ABOUTME: Maps the closed set of actions to list, check and replication routines

pub mod check;
pub mod list;
pub mod replicate;

use anyhow::Result;
use std::path::Path;

pub use replicate::ReplicateOptions;

/// Every action the CLI can run.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    List,
    Check,
    Replicate(ReplicateOptions),
}

pub async fn execute(config_path: &Path, action: Action) -> Result<()> {
    match action {
        Action::List => list::run(config_path),
        Action::Check => check::run(config_path).await,
        Action::Replicate(opts) => {
            // Table failures are already logged and summarized; they do not
            // change the exit status.
            replicate::run(config_path, opts).await?;
            Ok(())
        }
    }
}
