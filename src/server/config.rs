use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("Failed to parse TOML from config file at {path}: {source}")]
    Parse { path: String, source: toml::de::Error },
    #[error("Failed to load config from environment: {0}")]
    Env(#[from] envy::Error),
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub database_url: String,
    pub max_db_connections: u32,
    pub log_dir: String,
    /// Active devices silent for longer than this are swept to offline.
    pub stale_after_hours: i64,
    /// Rolling window for the per-device change count in the listing.
    pub change_window_days: i64,
    /// Change records returned with an ingest response.
    pub recent_changes_limit: u64,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
pub struct PartialServerConfig {
    listen_addr: Option<String>,
    database_url: Option<String>,
    max_db_connections: Option<u32>,
    log_dir: Option<String>,
    stale_after_hours: Option<i64>,
    change_window_days: Option<i64>,
    recent_changes_limit: Option<u64>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

const DEFAULT_MAX_DB_CONNECTIONS: u32 = 10;
const DEFAULT_STALE_AFTER_HOURS: i64 = 24;
const DEFAULT_CHANGE_WINDOW_DAYS: i64 = 7;
const DEFAULT_RECENT_CHANGES_LIMIT: u64 = 10;

fn positive<T: PartialOrd + Default + std::fmt::Display>(
    field: &'static str,
    value: T,
) -> Result<T, ConfigError> {
    if value > T::default() {
        Ok(value)
    } else {
        Err(ConfigError::Invalid { field, reason: format!("must be positive, got {value}") })
    }
}

impl ServerConfig {
    /// Loads the configuration: defaults, then the optional TOML file, then
    /// environment variables (after `.env`), each layer overriding the last.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config = match config_path {
            Some(path_str) if Path::new(path_str).exists() => {
                let contents = fs::read_to_string(path_str).map_err(|source| ConfigError::Read {
                    path: path_str.to_string(),
                    source,
                })?;
                toml::from_str(&contents).map_err(|source| ConfigError::Parse {
                    path: path_str.to_string(),
                    source,
                })?
            }
            _ => PartialServerConfig::default(),
        };

        // 2. Load from environment variables
        let env_config = envy::from_env::<PartialServerConfig>()?;

        Self::merge(file_config, env_config)
    }

    /// Merge: `env` overrides `file`, defaults fill the rest.
    pub fn merge(file: PartialServerConfig, env: PartialServerConfig) -> Result<Self, ConfigError> {
        let listen_addr = env
            .listen_addr
            .or(file.listen_addr)
            .unwrap_or_else(default_listen_addr);
        let listen_addr = listen_addr.parse().map_err(|e: std::net::AddrParseError| {
            ConfigError::Invalid { field: "listen_addr", reason: e.to_string() }
        })?;

        Ok(ServerConfig {
            listen_addr,
            database_url: env
                .database_url
                .or(file.database_url)
                .filter(|url| !url.trim().is_empty())
                .ok_or(ConfigError::Missing("DATABASE_URL"))?,
            max_db_connections: positive(
                "max_db_connections",
                env.max_db_connections
                    .or(file.max_db_connections)
                    .unwrap_or(DEFAULT_MAX_DB_CONNECTIONS),
            )?,
            log_dir: env.log_dir.or(file.log_dir).unwrap_or_else(default_log_dir),
            stale_after_hours: positive(
                "stale_after_hours",
                env.stale_after_hours
                    .or(file.stale_after_hours)
                    .unwrap_or(DEFAULT_STALE_AFTER_HOURS),
            )?,
            change_window_days: positive(
                "change_window_days",
                env.change_window_days
                    .or(file.change_window_days)
                    .unwrap_or(DEFAULT_CHANGE_WINDOW_DAYS),
            )?,
            recent_changes_limit: positive(
                "recent_changes_limit",
                env.recent_changes_limit
                    .or(file.recent_changes_limit)
                    .unwrap_or(DEFAULT_RECENT_CHANGES_LIMIT),
            )?,
        })
    }
}
