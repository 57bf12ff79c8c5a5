//! Service configuration loaded from a TOML file.
//!
//! Every field has a default, so an empty or missing file yields a working
//! local setup: Stockfish from the usual install locations, an in-memory
//! cache and `127.0.0.1:8000`.

use crate::cache::DEFAULT_TTL;
use crate::normalize::DEFAULT_PV_PLIES;
use crate::Depth;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "eval.toml";

/// Install locations checked for Stockfish, in order, before falling back to `PATH`.
pub const ENGINE_CANDIDATES: &[&str] = &["/opt/homebrew/bin/stockfish", "/usr/local/bin/stockfish"];

/// Errors that can occur when loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// A value is outside its allowed range.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on.
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine executable. Defaults to the first existing
    /// [`ENGINE_CANDIDATES`] entry, else `stockfish` on `PATH`.
    #[serde(default = "resolve_engine_path")]
    pub path: PathBuf,
    /// Extra command-line arguments for the engine.
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: resolve_engine_path(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Depth used when a request does not name one.
    #[serde(default = "default_depth")]
    pub default_depth: i64,
    /// Maximum number of PV plies rendered into a result.
    #[serde(default = "default_pv_plies")]
    pub pv_plies: usize,
}

fn default_depth() -> i64 {
    15
}

fn default_pv_plies() -> usize {
    DEFAULT_PV_PLIES
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_depth: default_depth(),
            pv_plies: default_pv_plies(),
        }
    }
}

/// Which cache backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKind {
    #[default]
    Memory,
    Redis,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheKind,
    /// Redis connection URL, used by the `redis` backend.
    #[serde(default = "default_cache_url")]
    pub url: String,
    /// Expiry of stored results in seconds.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_cache_url() -> String {
    "redis://localhost".to_string()
}

fn default_ttl_secs() -> u64 {
    DEFAULT_TTL.as_secs()
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheKind::default(),
            url: default_cache_url(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl Config {
    /// Load and validate the configuration at `path`. A missing file yields
    /// the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ReadError`] if the file exists but cannot be read,
    /// [`ConfigError::ParseError`] if it is not valid TOML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::parse(&content)?
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Depth::new(self.analysis.default_depth)
            .map_err(|e| ConfigError::Invalid(format!("analysis.default_depth: {}", e)))?;
        if self.analysis.pv_plies == 0 {
            return Err(ConfigError::Invalid(
                "analysis.pv_plies must be at least 1".to_string(),
            ));
        }
        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "cache.ttl_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The validated default depth.
    pub fn default_depth(&self) -> Result<Depth, ConfigError> {
        Depth::new(self.analysis.default_depth)
            .map_err(|e| ConfigError::Invalid(format!("analysis.default_depth: {}", e)))
    }
}

/// First existing path among [`ENGINE_CANDIDATES`], else `stockfish`.
pub fn resolve_engine_path() -> PathBuf {
    ENGINE_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
        .unwrap_or_else(|| PathBuf::from("stockfish"))
}
