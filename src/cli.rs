// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// The CLI is the thin selection layer around the audit: it lists what is in
// the store, picks one document set, and hands it to an audit session.
// Global flags (config file, store location, verbosity) apply to every
// subcommand.
// =============================================================================

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "field-link-audit",
    version,
    about = "Audit a collection of documents for dead hyperlinks",
    long_about = "field-link-audit samples a document collection to find the fields that \
                  hold links, then checks every link in those fields and reports the broken \
                  ones. YouTube links are judged by page content, everything else by HTTP \
                  status."
)]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Store root directory (overrides [store] root from the config file)
    #[arg(long, global = true, value_name = "DIR")]
    pub store: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the databases in the store
    Databases,

    /// List the collections of a database
    ///
    /// Example: field-link-audit --store ./data collections library
    Collections {
        /// Database name
        database: String,
    },

    /// Show which fields of a collection look like they hold links
    Fields {
        #[command(flatten)]
        target: Target,

        /// Number of documents to sample
        #[arg(long, value_name = "N")]
        sample_size: Option<usize>,
    },

    /// Check every link in a collection and report the broken ones
    ///
    /// Example: field-link-audit --store ./data audit library books --concurrency 4
    Audit {
        #[command(flatten)]
        target: Target,

        /// Number of documents sampled to detect link fields
        #[arg(long, value_name = "N")]
        sample_size: Option<usize>,

        /// Links checked at once (1 = strictly one after another)
        #[arg(long, value_name = "N")]
        concurrency: Option<usize>,

        /// Per-request timeout in seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Output the summary as JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Stream events as newline-delimited JSON while the audit runs
        #[arg(long, conflicts_with = "json")]
        ndjson: bool,
    },
}

/// The document set to work on.
#[derive(Args, Debug, Clone)]
pub struct Target {
    /// Database name
    pub database: String,

    /// Collection name
    pub collection: String,
}
