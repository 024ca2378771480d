// src/main.rs
// =============================================================================
// This is the entry point of the field-link-audit CLI.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (tracing, to stderr)
// 3. Load and validate the configuration, open the store
// 4. Dispatch to the subcommand handler
// 5. Exit with a proper code (0 = clean, 1 = broken links, 2 = error)
// =============================================================================

mod audit;
mod checker;
mod cli;
mod config;
mod store;

use anyhow::{Context, Result};
use audit::{
    AuditSession, ConsoleReporter, JsonReporter, NdjsonReporter, Reporter, SessionSettings,
};
use checker::{HttpFetcher, ValidityChecker};
use clap::Parser;
use cli::{Cli, Commands, Target};
use config::{Config, Overrides};
use std::sync::Arc;
use store::{JsonCollection, JsonStore};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Returns:
//   Ok(0) = no broken links (or nothing to check)
//   Ok(1) = broken links found
//   Err   = configuration, selection or store error (exit code 2)
async fn run() -> Result<i32> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.quiet);
    debug!(?cli, "CLI arguments parsed");

    let mut overrides = Overrides {
        store_root: cli.store.clone(),
        ..Overrides::default()
    };
    if let Commands::Audit {
        sample_size,
        concurrency,
        timeout,
        ..
    } = &cli.command
    {
        overrides.sample_size = *sample_size;
        overrides.concurrency = *concurrency;
        overrides.timeout_secs = *timeout;
    } else if let Commands::Fields { sample_size, .. } = &cli.command {
        overrides.sample_size = *sample_size;
    }

    let config =
        Config::load(cli.config.as_deref(), &overrides).context("invalid configuration")?;
    let store = JsonStore::open(config.store_root()?).context("failed to open store")?;

    match &cli.command {
        Commands::Databases => {
            for name in store.databases().await? {
                println!("{}", name);
            }
            Ok(0)
        }
        Commands::Collections { database } => {
            for name in store.collections(database).await? {
                println!("{}", name);
            }
            Ok(0)
        }
        Commands::Fields { target, .. } => handle_fields(&store, target, &config).await,
        Commands::Audit {
            target,
            json,
            ndjson,
            ..
        } => {
            let format = if *ndjson {
                OutputFormat::Ndjson
            } else if *json {
                OutputFormat::Json
            } else {
                OutputFormat::Console
            };
            handle_audit(&store, target, &config, format).await
        }
    }
}

// Sets the log filter: RUST_LOG wins, then -q / -v flags
fn setup_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_collection(store: &JsonStore, target: &Target) -> Result<JsonCollection> {
    let collection = store
        .collection(&target.database, &target.collection)
        .context("invalid selection")?;
    info!(path = %collection.path().display(), "opened collection");
    Ok(collection)
}

// Handles the 'fields' subcommand: sniffing only, no network access
async fn handle_fields(store: &JsonStore, target: &Target, config: &Config) -> Result<i32> {
    let collection = open_collection(store, target)?;
    let fields = audit::detect_fields(&collection, config.audit.sample_size).await?;

    if fields.is_empty() {
        println!("⚠️  No link fields found in the sampled documents");
    }
    for name in fields.iter() {
        println!("{}", name);
    }
    Ok(0)
}

// How 'audit' reports its events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Console,
    Json,
    Ndjson,
}

// Handles the 'audit' subcommand
async fn handle_audit(
    store: &JsonStore,
    target: &Target,
    config: &Config,
    format: OutputFormat,
) -> Result<i32> {
    let collection = open_collection(store, target)?;

    let fetcher =
        HttpFetcher::new(&config.http.settings()).context("failed to create HTTP client")?;
    let checker = ValidityChecker::new(Arc::new(fetcher));
    let settings = SessionSettings {
        sample_size: config.audit.sample_size,
        concurrency: config.audit.concurrency,
    };

    if format == OutputFormat::Console {
        println!(
            "🔍 Auditing {}/{} (sample of {} document(s))",
            target.database, target.collection, settings.sample_size
        );
    }

    let mut reporter: Box<dyn Reporter> = match format {
        OutputFormat::Console => Box::new(ConsoleReporter::new()),
        OutputFormat::Json => Box::new(JsonReporter::new()),
        OutputFormat::Ndjson => Box::new(NdjsonReporter::new()),
    };

    let mut session = AuditSession::new(&collection, checker, settings);
    let outcome = session.run(reporter.as_mut()).await?;
    debug!(state = ?session.state(), "audit finished");

    if outcome.summary().broken_count > 0 {
        Ok(1)
    } else {
        Ok(0)
    }
}
