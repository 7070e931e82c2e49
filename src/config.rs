use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

use crate::search::SearchConfig;

/// Environment variable naming an alternative config file
pub const CONFIG_PATH_ENV: &str = "INVOICE_VAULT_CONFIG";

/// Environment variable overriding the config home
pub const CONFIG_HOME_ENV: &str = "INVOICE_VAULT_HOME";

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Directory holding the user config file and, by default, the index
pub fn config_home() -> PathBuf {
    if let Some(home) = std::env::var_os(CONFIG_HOME_ENV) {
        return PathBuf::from(home);
    }
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(".invoice-vault")
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Config {
    /// Directory holding the encrypted descriptors
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,

    /// Index location, overrides `search.index_path`
    #[serde(default)]
    pub index_path: Option<PathBuf>,

    /// Date format copied into descriptors that don't set one
    #[serde(default = "default_date_input_format")]
    #[validate(length(min = 2))]
    pub date_input_format: String,

    /// Index and query tunables
    #[serde(default)]
    #[validate(nested)]
    pub search: SearchConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| config_home().join("config.toml"));
        Self::load_from(Some(config_path.as_path()))
    }

    /// Load the embedded defaults, then `path` if it exists, then the environment
    pub fn load_from(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml));

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            );
        }

        let config: Self = builder
            // Override with environment variables (prefix: INVOICE_VAULT__)
            .add_source(
                config::Environment::with_prefix("INVOICE_VAULT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config
            .validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(config)
    }

    /// Search settings with the top-level overrides applied
    pub fn search_config(&self) -> SearchConfig {
        let mut search = self.search.clone();
        if let Some(ref index_path) = self.index_path {
            search.index_path = index_path.clone();
        }
        search.default_date_format = self.date_input_format.clone();
        search
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            index_path: None,
            date_input_format: default_date_input_format(),
            search: SearchConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

fn default_workspace() -> PathBuf {
    config_home().join("invoices")
}

fn default_date_input_format() -> String {
    "%d.%m.%y".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
