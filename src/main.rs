//! dengue-stats - dengue surveillance statistics backend
//!
//! Serves yearly, provincial and regional dengue case statistics over a
//! read-only HTTP API, imports case data from tabular JSON exports, and
//! renders offline summary reports.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, storage, import, bind failure, etc.)

mod analysis;
mod cli;
mod config;
mod engine;
mod ingest;
mod models;
mod report;
mod server;
mod store;
mod year;

use anyhow::{Context, Result};
use cli::{Args, Command, ImportArgs, OutputFormat, ReportArgs};
use config::{Config, DEFAULT_CONFIG_FILE};
use engine::StatsEngine;
use ingest::ImportOptions;
use std::path::Path;
use std::sync::Arc;
use store::{CaseStore, JsonFileStore};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use year::SystemClock;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // No logging needed to write a config file
    if let Command::InitConfig = args.command {
        return handle_init_config(args.config.as_deref());
    }

    init_logging(&args)?;

    info!("dengue-stats v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let result = match args.command {
        Command::Serve(_) => run_serve(&config).await,
        Command::Import(ref import) => run_import(&config, import, args.quiet),
        Command::Report(ref report) => run_report(&config, report),
        Command::InitConfig => Ok(()),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Write a default config file, refusing to overwrite an existing one.
fn handle_init_config(path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            path.display()
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("✅ Created {} with default settings.", path.display());
    println!("   Edit it to change the port, data file and query limits.");
    Ok(())
}

/// Initialize logging. `RUST_LOG` overrides the level picked by the flags.
fn init_logging(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(args.log_level().into()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}

fn open_store(config: &Config) -> Result<JsonFileStore> {
    let path = &config.storage.data_file;
    JsonFileStore::open(path)
        .with_context(|| format!("Failed to open case data {}", path.display()))
}

fn build_engine(config: &Config, store: JsonFileStore) -> StatsEngine {
    StatsEngine::new(
        Arc::new(store),
        Arc::new(SystemClock),
        config.query.clone(),
    )
}

async fn run_serve(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    info!(
        "Serving {} records from {}",
        store.count()?,
        store.path().display()
    );

    server::serve(&config.server, build_engine(config, store)).await
}

fn run_import(config: &Config, args: &ImportArgs, quiet: bool) -> Result<()> {
    let store = open_store(config)?;

    let options = ImportOptions {
        append: args.append,
        show_progress: !quiet,
    };
    let summary = ingest::import_file(&args.file, &store, options)
        .with_context(|| format!("Failed to import {}", args.file.display()))?;

    let years: Vec<String> = summary.years.iter().map(|y| y.to_string()).collect();

    println!("✅ Imported {} records into {}", summary.inserted, store.path().display());
    if summary.skipped > 0 {
        println!("   Skipped rows: {}", summary.skipped);
    }
    println!("   Total records: {}", summary.total_records);
    println!("   Years covered: {}", years.join(", "));
    println!("   Regencies: {}", summary.regencies);

    Ok(())
}

fn run_report(config: &Config, args: &ReportArgs) -> Result<()> {
    let store = open_store(config)?;
    let total_records = store.count()?;
    let data_file = store.path().display().to_string();

    let engine = build_engine(config, store);
    let year_report = report::build_report(&engine, args.year, args.limit, &data_file, total_records)
        .context("Failed to collect report data")?;

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&year_report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&year_report),
    };

    match args.output {
        Some(ref path) => {
            report::write_report(&output, path)?;
            println!("✅ Report for {} saved to: {}", year_report.year, path.display());
        }
        None => print!("{}", output),
    }

    Ok(())
}
