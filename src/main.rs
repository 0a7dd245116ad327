// ABOUTME: CLI entry point for tier-replicator
// ABOUTME: Parses the action and routes it to the matching command

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tier_replicator::commands::{self, Action, ReplicateOptions};
use tier_replicator::replication::{Edge, ReplicationWindow, Selection};

#[derive(Parser)]
#[command(name = "tier-replicator")]
#[command(
    about = "Incremental source -> warehouse -> production replication of MySQL tables",
    long_about = None
)]
#[command(version, arg_required_else_help = true)]
struct Cli {
    /// Path to the replicator configuration file
    #[arg(
        long,
        global = true,
        env = "TIER_REPLICATOR_CONFIG",
        default_value = "replicator.toml"
    )]
    config: PathBuf,
    /// Set the log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Default)]
struct WindowArgs {
    /// Explicit backfill window: START END, or START_DATE START_TIME END_DATE END_TIME.
    /// Without it each table starts at its destination watermark.
    #[arg(value_name = "WINDOW", num_args = 0..=4)]
    window: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered tables with their correlation id
    #[command(short_flag = 'l', long_flag = "list")]
    List,
    /// Replicate every table from the source tier into the warehouse
    #[command(short_flag = 'm', long_flag = "matriz")]
    Matriz {
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Replicate every table from the warehouse into production
    #[command(short_flag = 'd', long_flag = "distro")]
    Distro {
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Replicate every table across both edges
    #[command(
        short_flag = 'e',
        long_flag = "execute",
        alias = "exe",
        long_flag_alias = "exe"
    )]
    Execute {
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Replicate one table, selected by correlation id, across both edges
    #[command(short_flag = 'c', long_flag = "cid")]
    Cid {
        /// Correlation id of the table (see `list`)
        cid: i64,
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Check connectivity to every configured tier
    Check,
}

fn replicate(
    edges: &[Edge],
    selection: Selection,
    window: WindowArgs,
) -> anyhow::Result<Action> {
    let window = ReplicationWindow::from_tokens(&window.window)?;
    Ok(Action::Replicate(ReplicateOptions {
        edges: edges.to_vec(),
        selection,
        window,
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // 1. RUST_LOG environment variable has highest precedence
    // 2. --log flag is used if RUST_LOG is not set
    // 3. Default to "info" if neither are provided
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log.clone()));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let action = match cli.command {
        Commands::List => Action::List,
        Commands::Check => Action::Check,
        Commands::Matriz { window } => {
            replicate(&[Edge::SourceToWarehouse], Selection::All, window)?
        }
        Commands::Distro { window } => {
            replicate(&[Edge::WarehouseToProduction], Selection::All, window)?
        }
        Commands::Execute { window } => replicate(&Edge::ALL, Selection::All, window)?,
        Commands::Cid { cid, window } => replicate(&Edge::ALL, Selection::Cid(cid), window)?,
    };

    commands::execute(&cli.config, action).await
}
