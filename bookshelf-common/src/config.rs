//! Configuration loading
//!
//! Bootstrap settings resolve in this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable TOML file is logged and skipped; it never stops
//! startup.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{Error, Result};

pub const ENV_STORAGE_DIR: &str = "BOOKSHELF_STORAGE_DIR";
pub const ENV_DATABASE: &str = "BOOKSHELF_DATABASE";
pub const ENV_HOST: &str = "BOOKSHELF_HOST";
pub const ENV_PORT: &str = "BOOKSHELF_PORT";

/// Settings read from the TOML file; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Directory holding books.json and uploaded artifacts
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,

    /// SQLite database file
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub storage_dir: PathBuf,
    pub database_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl Default for CompiledDefaults {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("books_json"),
            database_path: PathBuf::from("bookshelf.db"),
            host: "127.0.0.1".to_string(),
            port: 8000,
            log_level: default_log_level(),
        }
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_file: Option<PathBuf>,
    pub storage_dir: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Fully resolved configuration; immutable after startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub storage_dir: PathBuf,
    pub database_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl AppConfig {
    /// Resolve every setting from CLI, environment, TOML and defaults
    pub fn resolve(cli: &CliOverrides) -> Self {
        let toml_config = match cli.config_file.clone().or_else(find_config_file) {
            Some(path) => match load_toml(&path) {
                Ok(config) => {
                    info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("{} (using defaults)", e);
                    TomlConfig::default()
                }
            },
            None => TomlConfig::default(),
        };

        Self::resolve_with(cli, &toml_config, &CompiledDefaults::default())
    }

    /// Resolution against an already-loaded TOML config
    pub fn resolve_with(
        cli: &CliOverrides,
        toml_config: &TomlConfig,
        defaults: &CompiledDefaults,
    ) -> Self {
        let storage_dir = cli
            .storage_dir
            .clone()
            .or_else(|| env_var(ENV_STORAGE_DIR).map(PathBuf::from))
            .or_else(|| toml_config.storage_dir.clone())
            .unwrap_or_else(|| defaults.storage_dir.clone());

        let database_path = cli
            .database_path
            .clone()
            .or_else(|| env_var(ENV_DATABASE).map(PathBuf::from))
            .or_else(|| toml_config.database_path.clone())
            .unwrap_or_else(|| defaults.database_path.clone());

        let host = cli
            .host
            .clone()
            .or_else(|| env_var(ENV_HOST))
            .or_else(|| toml_config.host.clone())
            .unwrap_or_else(|| defaults.host.clone());

        let port = cli
            .port
            .or_else(|| {
                env_var(ENV_PORT).and_then(|p| match p.parse() {
                    Ok(port) => Some(port),
                    Err(_) => {
                        warn!("Ignoring invalid {}={:?}", ENV_PORT, p);
                        None
                    }
                })
            })
            .or(toml_config.port)
            .unwrap_or(defaults.port);

        Self {
            storage_dir,
            database_path,
            host,
            port,
            log_level: Some(toml_config.logging.level.trim())
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| defaults.log_level.clone()),
        }
    }
}

/// Parse a TOML config file
pub fn load_toml(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Could not read config file {}: {}", path.display(), e))
    })?;
    toml::from_str(&content).map_err(|e| {
        Error::Config(format!("Could not parse config file {}: {}", path.display(), e))
    })
}

/// First existing config file among the platform locations
fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("bookshelf").join("config.toml"));
    let system_config = PathBuf::from("/etc/bookshelf/config.toml");

    user_config
        .into_iter()
        .chain(std::iter::once(system_config))
        .find(|p| p.exists())
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
