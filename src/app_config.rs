//! Application configuration from file and environment variables
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Environment variables (prefixed with REVIEWHUB_)
//! 2. Config file (config.toml)
//! 3. Default values
//!
//! `DATABASE_URL` (usually from `.env`) takes precedence over `database.url`
//! so credentials can stay out of the config file.

use config::{Config, ConfigError, Environment, File};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use std::time::Duration;

/// Global application configuration
pub static APP_CONFIG: Lazy<RwLock<AppConfig>> = Lazy::new(|| {
    RwLock::new(AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config file, using defaults: {}", e);
        AppConfig::default()
    }))
});

/// Database pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            connect_timeout_seconds: 8,
        }
    }
}

impl DatabaseConfig {
    /// `DATABASE_URL` if set, otherwise `database.url`.
    pub fn resolve_url(&self) -> Option<String> {
        std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.is_empty())
            .or_else(|| Some(self.url.clone()).filter(|url| !url.is_empty()))
    }
}

/// Cascade deletion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    /// A cascade running longer than this is rolled back
    pub timeout_seconds: u64,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
        }
    }
}

impl CascadeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Background orphan sweep configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub enabled: bool,
    /// Seconds between sweeps (default: 1 hour)
    pub interval_seconds: u64,
    /// Run one sweep before the server starts accepting requests
    pub on_startup: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: 3600,
            on_startup: false,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub cascade: CascadeConfig,
    pub sweep: SweepConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &str) -> Result<Self, ConfigError> {
        use config::FileFormat;

        let config = Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(File::new(path, FileFormat::Toml).required(false))
            // e.g. REVIEWHUB_CASCADE__TIMEOUT_SECONDS
            .add_source(
                Environment::with_prefix("REVIEWHUB")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

/// Initialize application configuration
///
/// Triggers the lazy load and logs the result. Call early in startup.
pub fn init() {
    let config = get_config();
    log::info!(
        "Configuration loaded: cascade timeout {}s, sweep every {}s (enabled: {})",
        config.cascade.timeout_seconds,
        config.sweep.interval_seconds,
        config.sweep.enabled
    );
}

/// Get the current application configuration
pub fn get_config() -> AppConfig {
    APP_CONFIG.read().map(|c| c.clone()).unwrap_or_default()
}

pub fn database() -> DatabaseConfig {
    get_config().database
}

pub fn cascade() -> CascadeConfig {
    get_config().cascade
}

pub fn sweep() -> SweepConfig {
    get_config().sweep
}

pub fn server() -> ServerConfig {
    get_config().server
}
