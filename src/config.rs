//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.dengue-stats.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".dengue-stats.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Query defaults and caps.
    #[serde(default)]
    pub query: QueryConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Origin allowed by CORS. Unset disables the CORS layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cors_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON snapshot holding the case collection.
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
        }
    }
}

fn default_data_file() -> PathBuf {
    PathBuf::from("data/dengue_cases.json")
}

/// Query defaults and caps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Years covered by the trend series when none are requested.
    #[serde(default = "default_trend_years")]
    pub trend_years: u32,

    /// Entries in the high-risk ranking when no limit is requested.
    #[serde(default = "default_high_risk_limit")]
    pub high_risk_limit: usize,

    /// Entries in the regency breakdown.
    #[serde(default = "default_regency_limit")]
    pub regency_limit: usize,

    /// Provinces listed next to the year summary.
    #[serde(default = "default_top_provinces")]
    pub top_provinces: usize,

    /// Regencies in the chart bundle.
    #[serde(default = "default_chart_top_regencies")]
    pub chart_top_regencies: usize,

    /// Largest `limit` or `years` a caller may request.
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            trend_years: default_trend_years(),
            high_risk_limit: default_high_risk_limit(),
            regency_limit: default_regency_limit(),
            top_provinces: default_top_provinces(),
            chart_top_regencies: default_chart_top_regencies(),
            max_limit: default_max_limit(),
        }
    }
}

fn default_trend_years() -> u32 {
    5
}

fn default_high_risk_limit() -> usize {
    10
}

fn default_regency_limit() -> usize {
    15
}

fn default_top_provinces() -> usize {
    5
}

fn default_chart_top_regencies() -> usize {
    10
}

fn default_max_limit() -> usize {
    500
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were actually provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref data) = args.data {
            self.storage.data_file = data.clone();
        }

        if let crate::cli::Command::Serve(ref serve) = args.command {
            if let Some(port) = serve.port {
                self.server.port = port;
            }
            if let Some(ref host) = serve.host {
                self.server.host = host.clone();
            }
            if let Some(ref origin) = serve.cors_origin {
                self.server.cors_origin = Some(origin.clone());
            }
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
