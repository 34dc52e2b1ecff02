//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: `ACTON_QUERY_`, nesting: `__`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/acton-query/config.toml
//! 4. System directory: /etc/acton-query/config.toml
//! 5. Default values
//!
//! ```toml
//! [query]
//! max_page_size = 1000
//! queries_dir = "queries"
//! log_statements = false
//!
//! [database]
//! url = "postgres://localhost/shop"
//! max_connections = 5
//!
//! [logging]
//! level = "info"
//! json = false
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "ACTON_QUERY_";

/// Directory name under the XDG and system config roots
const CONFIG_DIR: &str = "acton-query";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Query translation and execution settings
    #[serde(default)]
    pub query: QueryConfig,

    /// Data source connection settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Tracing subscriber settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Query translation and execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Upper bound on page size; 0 disables clamping
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,

    /// Directory `.sql` data table references are read from
    #[serde(default = "default_queries_dir")]
    pub queries_dir: PathBuf,

    /// Log every statement at debug level before it runs
    #[serde(default)]
    pub log_statements: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_page_size: default_max_page_size(),
            queries_dir: default_queries_dir(),
            log_statements: false,
        }
    }
}

impl QueryConfig {
    /// Effective page size cap
    pub fn page_cap(&self) -> Option<u64> {
        (self.max_page_size > 0).then_some(self.max_page_size)
    }
}

/// Data source connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL
    #[serde(default)]
    pub url: String,

    /// Maximum pool connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum idle connections
    #[serde(default)]
    pub min_connections: u32,

    /// Pool acquire timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: 0,
            connection_timeout_secs: default_connection_timeout(),
        }
    }
}

impl DatabaseConfig {
    /// Connection URL with any password masked, for logging
    pub fn sanitized_url(&self) -> String {
        let url = &self.url;
        if let (Some(scheme_end), Some(at_pos)) = (url.find("://"), url.rfind('@')) {
            if at_pos < scheme_end + 3 {
                return url.clone();
            }
            let credentials = &url[scheme_end + 3..at_pos];
            if let Some(colon_pos) = credentials.find(':') {
                return format!(
                    "{}{}:***{}",
                    &url[..scheme_end + 3],
                    &credentials[..colon_pos],
                    &url[at_pos..]
                );
            }
        }
        url.clone()
    }
}

/// Tracing subscriber settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_max_page_size() -> u64 {
    1000
}

fn default_queries_dir() -> PathBuf {
    PathBuf::from("queries")
}

fn default_max_connections() -> u32 {
    5
}

fn default_connection_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the standard locations
    pub fn load() -> Result<Self> {
        let config_paths = Self::find_config_paths();

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Lowest priority first so later files override earlier ones
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config = figment.extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// This bypasses the XDG and system directories. Environment variables
    /// still override the file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    /// All config file paths, highest priority first
    fn find_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix(CONFIG_DIR);
        if let Ok(path) = xdg_dirs.place_config_file("config.toml") {
            paths.push(path);
        }

        paths.push(PathBuf::from("/etc").join(CONFIG_DIR).join("config.toml"));
        paths
    }
}
