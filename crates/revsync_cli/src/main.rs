//! revsync CLI
//!
//! Command-line tools for revision-based replication.
//!
//! # Commands
//!
//! - `encode` - Print the wire form of revision numbers
//! - `decode` - Print the numbers behind encoded revisions
//! - `tree` - Summarize a revision tree dump
//! - `compare` - List the differing leaves of two tree dumps

mod commands;

use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// revsync command-line tools.
#[derive(Parser)]
#[command(name = "revsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode revision numbers
    Encode {
        /// Revision numbers
        #[arg(required = true)]
        values: Vec<u64>,
    },

    /// Decode encoded revisions
    Decode {
        /// Reject symbols outside the alphabet and non-canonical forms
        #[arg(short, long)]
        strict: bool,

        /// Encoded revisions, optionally quoted
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Summarize a revision tree dump
    Tree {
        /// JSON file holding a revision tree
        file: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Compare two revision tree dumps
    Compare {
        /// Local tree dump
        ours: PathBuf,

        /// Remote tree dump
        theirs: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match cli.command {
        Commands::Encode { values } => commands::encode::run(&mut out, &values)?,
        Commands::Decode { strict, values } => commands::decode::run(&mut out, &values, strict)?,
        Commands::Tree { file, format } => commands::tree::run(&mut out, &file, &format)?,
        Commands::Compare {
            ours,
            theirs,
            format,
        } => commands::compare::run(&mut out, &ours, &theirs, &format)?,
    }

    Ok(())
}
