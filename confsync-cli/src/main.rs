//! confsync — keep local configuration files in sync with remote or local
//! sources.
//!
//! # Usage
//!
//! ```text
//! confsync get <key> [--poll]
//! confsync apply <key> [--poll]
//! confsync apply --all
//! confsync monitor
//! confsync objects
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{apply::ApplyArgs, get::GetArgs, monitor::MonitorArgs, objects::ObjectsArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "confsync",
    version,
    about = "Synchronize local configuration files with managed configuration sources",
    long_about = None,
)]
struct Cli {
    /// Path to the settings file. Defaults to the first of ./confsync.yaml,
    /// ~/confsync.yaml, /etc/confsync/confsync.yaml.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug detail.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the rendered value of a configuration object.
    Get(GetArgs),

    /// Write configuration objects to their destinations and run hooks.
    Apply(ApplyArgs),

    /// Poll every configured object, writing on each update.
    Monitor(MonitorArgs),

    /// List the configured objects.
    Objects(ObjectsArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    confsync_agent::init_tracing(cli.verbose);

    let ctx = commands::Context::load(cli.config)?;
    match cli.command {
        Commands::Get(args) => args.run(&ctx).await,
        Commands::Apply(args) => args.run(&ctx).await,
        Commands::Monitor(args) => args.run(ctx).await,
        Commands::Objects(args) => args.run(&ctx),
    }
}
