//! dbclaw CLI: the main entry point.
//!
//! Commands:
//! - `load`    : Load every dataset config into its own collection
//! - `agent`   : Run one prompt through the role-scoped database agents
//! - `roles`   : Show the role table and what each role may call
//! - `doctor`  : Diagnose configuration and credentials
//! - `onboard` : Write a default config file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "dbclaw",
    about = "dbclaw — Hugging Face datasets into MongoDB, queried by role-scoped agents",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the dataset into the document database, one collection per config
    Load {
        /// Only load these configs (repeatable)
        #[arg(short, long = "config", value_name = "NAME")]
        configs: Vec<String>,

        /// Insert at most this many rows per config
        #[arg(short, long)]
        limit: Option<usize>,

        /// Override the source dataset
        #[arg(long)]
        dataset: Option<String>,

        /// Override the target database name
        #[arg(long)]
        database: Option<String>,

        /// Skip the CSV mirror
        #[arg(long)]
        no_export: bool,

        /// Directory for CSV mirrors
        #[arg(long, value_name = "DIR")]
        export_dir: Option<PathBuf>,

        /// Load into an in-memory store instead of the database
        #[arg(long)]
        dry_run: bool,
    },

    /// Send one prompt to the database agents
    Agent {
        /// The prompt (defaults to listing all collections)
        #[arg(short, long)]
        prompt: Option<String>,
    },

    /// Show the role table
    Roles {
        /// Print the table as the agent runtime receives it
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and credentials
    Doctor,

    /// Initialize configuration
    Onboard,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // .env is optional
    let _ = dotenvy::dotenv();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Load {
            configs,
            limit,
            dataset,
            database,
            no_export,
            export_dir,
            dry_run,
        } => {
            commands::load::run(commands::load::LoadArgs {
                configs,
                limit,
                dataset,
                database,
                no_export,
                export_dir,
                dry_run,
            })
            .await?
        }
        Commands::Agent { prompt } => commands::agent::run(prompt).await?,
        Commands::Roles { json } => commands::roles::run(json)?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Onboard => commands::onboard::run()?,
    }

    Ok(())
}
