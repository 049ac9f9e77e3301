//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// dengue-stats - dengue surveillance statistics
///
/// Serves yearly, provincial and regional dengue statistics over HTTP,
/// imports case data, and renders offline summary reports.
///
/// Examples:
///   dengue-stats import data/dengue_fever_dataset.json
///   dengue-stats serve --port 5000
///   dengue-stats report --year 2023 --format json
///   dengue-stats init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for .dengue-stats.toml in the current directory
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Case data file (overrides the config file)
    #[arg(long, global = true, value_name = "FILE", env = "DENGUE_DATA")]
    pub data: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP API
    Serve(ServeArgs),

    /// Replace the case collection with rows from a tabular JSON export
    Import(ImportArgs),

    /// Render the summary of one year as Markdown or JSON
    Report(ReportArgs),

    /// Generate a default .dengue-stats.toml configuration file
    InitConfig,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long, value_name = "ADDR")]
    pub host: Option<String>,

    /// Origin allowed to call the API from a browser
    #[arg(long, value_name = "URL")]
    pub cors_origin: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ImportArgs {
    /// JSON export containing the dengue_fever_dataset table
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Append to the existing collection instead of replacing it
    #[arg(long)]
    pub append: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ReportArgs {
    /// Year to report on (defaults to the latest year with data)
    #[arg(short, long)]
    pub year: Option<i32>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Number of high-risk regencies to list
    #[arg(long, default_value = "10", value_name = "COUNT")]
    pub limit: usize,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        match self.command {
            Command::Serve(ref serve) => {
                if serve.port == Some(0) {
                    return Err("Port must be between 1 and 65535".to_string());
                }
                if let Some(ref origin) = serve.cors_origin {
                    if !origin.starts_with("http://") && !origin.starts_with("https://") {
                        return Err("CORS origin must start with 'http://' or 'https://'".to_string());
                    }
                }
            }
            Command::Import(ref import) => {
                if !import.file.is_file() {
                    return Err(format!(
                        "Import file does not exist: {}",
                        import.file.display()
                    ));
                }
            }
            Command::Report(ref report) => {
                if report.limit == 0 {
                    return Err("Limit must be at least 1".to_string());
                }
            }
            Command::InitConfig => {}
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
