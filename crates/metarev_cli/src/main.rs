//! metarev CLI
//!
//! Command-line tools for metarev journal files.
//!
//! # Commands
//!
//! - `inspect` - Display journal statistics
//! - `verify` - Verify journal integrity and revision fingerprints
//! - `history` - List the revisions of one entity
//! - `dump-journal` - Dump journal records for debugging

mod commands;

use clap::{Parser, Subcommand};
use metarev_core::EntityId;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// metarev command-line journal tools.
#[derive(Parser)]
#[command(name = "metarev")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the journal file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display journal statistics
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Verify journal integrity
    Verify,

    /// List the revisions of one entity
    History {
        /// Entity UUID
        #[arg(short, long)]
        entity: EntityId,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Dump journal records for debugging
    DumpJournal {
        /// Maximum number of records to dump
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Journal path required for inspect")?;
            commands::inspect::run(&path, &format)?;
        }
        Commands::Verify => {
            let path = cli.path.ok_or("Journal path required for verify")?;
            commands::verify::run(&path)?;
        }
        Commands::History { entity, format } => {
            let path = cli.path.ok_or("Journal path required for history")?;
            commands::history::run(&path, entity, &format)?;
        }
        Commands::DumpJournal { limit, format } => {
            let path = cli.path.ok_or("Journal path required for dump-journal")?;
            commands::dump_journal::run(&path, limit, &format)?;
        }
        Commands::Version => {
            println!("metarev CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("metarev core v{}", metarev_core::VERSION);
        }
    }

    Ok(())
}
