//! Application configuration management.

use std::collections::HashMap;

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger numeric policy.
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Seconds to wait for a connection before giving up.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    8
}

/// Precision settings applied to every ledger mutation.
///
/// Each currency is stored with a fixed number of minor-unit digits. Anything
/// not listed in `currency_minor_units` uses `default_minor_units`.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Minor-unit exponent for currencies without an explicit entry.
    #[serde(default = "default_minor_units")]
    pub default_minor_units: u32,
    /// Per-currency minor-unit exponents, keyed by currency code or token symbol.
    #[serde(default = "default_currency_minor_units")]
    pub currency_minor_units: HashMap<String, u32>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_minor_units: default_minor_units(),
            currency_minor_units: default_currency_minor_units(),
        }
    }
}

fn default_minor_units() -> u32 {
    2
}

fn default_currency_minor_units() -> HashMap<String, u32> {
    [
        ("JPY", 0),
        ("KRW", 0),
        ("IDR", 0),
        ("BTC", 8),
        ("USDC", 6),
        ("XLM", 7),
        ("APT", 8),
        ("SOL", 9),
        ("ETH", 18),
    ]
    .into_iter()
    .map(|(code, units)| (code.to_string(), units))
    .collect()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, later ones winning: `config/default.toml`,
    /// `config/{RUN_MODE}.toml`, then `TALLY__*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TALLY").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
