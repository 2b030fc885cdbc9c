//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::game::InteractionTuning;
use crate::net::JoinConfig;

/// Overlay configuration loaded from environment variables
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// JSON log lines instead of the human-readable format
    pub log_json: bool,

    /// Host address probed before rejoining a match
    pub join_addr: SocketAddr,
    pub join_retries: u32,
    pub join_backoff: Duration,
    pub ping_timeout: Duration,

    /// Local UDP bind address for state replication
    pub bind_addr: SocketAddr,
    /// Addresses every datagram is sent to
    pub peers: Vec<SocketAddr>,

    /// Character meshes built up front
    pub mesh_pool_size: usize,
    /// 0..=100
    pub master_volume: u8,

    pub rom_path: PathBuf,
    /// Hex SHA-256 the ROM image must match
    pub rom_sha256: Option<String>,
    /// JSON triangle list replacing the arena surfaces
    pub arena_file: Option<PathBuf>,

    pub tuning: InteractionTuning,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_json: false,
            join_addr: SocketAddr::from(([127, 0, 0, 1], 7777)),
            join_retries: 4,
            join_backoff: Duration::from_millis(250),
            ping_timeout: Duration::from_millis(1000),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 7778)),
            peers: Vec::new(),
            mesh_pool_size: 10,
            master_volume: 70,
            rom_path: PathBuf::from("rom.z64"),
            rom_sha256: None,
            arena_file: None,
            tuning: InteractionTuning::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables (and `.env`, if present)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source; unset variables keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let join_addr = match lookup("AVATAR_JOIN_ADDR") {
            Some(addr) => {
                let port = parsed(&lookup, "AVATAR_JOIN_PORT", defaults.join_addr.port())?;
                match addr.parse::<SocketAddr>() {
                    Ok(full) => full,
                    Err(_) => SocketAddr::new(
                        addr.parse()
                            .map_err(|_| ConfigError::Invalid("AVATAR_JOIN_ADDR"))?,
                        port,
                    ),
                }
            }
            None => SocketAddr::new(
                defaults.join_addr.ip(),
                parsed(&lookup, "AVATAR_JOIN_PORT", defaults.join_addr.port())?,
            ),
        };

        let peers = match lookup("AVATAR_PEERS") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.parse().map_err(|_| ConfigError::Invalid("AVATAR_PEERS")))
                .collect::<Result<Vec<SocketAddr>, _>>()?,
            None => defaults.peers,
        };

        let master_volume: u8 = parsed(&lookup, "AVATAR_MASTER_VOLUME", defaults.master_volume)?;
        if master_volume > 100 {
            return Err(ConfigError::Invalid("AVATAR_MASTER_VOLUME"));
        }

        let rom_sha256 = lookup("AVATAR_ROM_SHA256");
        if let Some(digest) = &rom_sha256 {
            let valid = hex::decode(digest).map(|d| d.len() == 32).unwrap_or(false);
            if !valid {
                return Err(ConfigError::Invalid("AVATAR_ROM_SHA256"));
            }
        }

        let tuning = match lookup("AVATAR_TUNING_FILE") {
            Some(path) => load_tuning(&path)?,
            None => defaults.tuning,
        };

        Ok(Self {
            log_level: lookup("AVATAR_LOG_LEVEL").unwrap_or(defaults.log_level),
            log_json: parsed(&lookup, "AVATAR_LOG_JSON", defaults.log_json)?,
            join_addr,
            join_retries: parsed(&lookup, "AVATAR_JOIN_RETRIES", defaults.join_retries)?,
            join_backoff: Duration::from_millis(parsed(&lookup, "AVATAR_JOIN_BACKOFF_MS", 250)?),
            ping_timeout: Duration::from_millis(parsed(&lookup, "AVATAR_PING_TIMEOUT_MS", 1000)?),
            bind_addr: parsed(&lookup, "AVATAR_BIND_ADDR", defaults.bind_addr)?,
            peers,
            mesh_pool_size: parsed(&lookup, "AVATAR_MESH_POOL_SIZE", defaults.mesh_pool_size)?,
            master_volume,
            rom_path: lookup("AVATAR_ROM_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.rom_path),
            rom_sha256,
            arena_file: lookup("AVATAR_ARENA_FILE").map(PathBuf::from),
            tuning,
        })
    }

    pub fn join_config(&self) -> JoinConfig {
        JoinConfig {
            host_addr: self.join_addr,
            retries: self.join_retries,
            backoff: self.join_backoff,
            ping_timeout: self.ping_timeout,
        }
    }
}

fn parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        None => Ok(default),
    }
}

fn load_tuning(path: &str) -> Result<InteractionTuning, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::TuningRead {
        path: path.to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(ConfigError::TuningParse)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Failed to read tuning file {path}: {source}")]
    TuningRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid tuning file: {0}")]
    TuningParse(#[source] serde_json::Error),
}
