//! Database and tooling configuration.
//!
//! Precedence: explicit config file > `MONGOLITE_CONFIG` > user config dir > `./mongolite.toml`,
//! then environment variables for anything still unset, then defaults.

use crate::errors::DbError;
use crate::query::DEFAULT_CRITERIA_CACHE_SIZE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const JOURNAL_MODES: &[&str] = &["DELETE", "TRUNCATE", "PERSIST", "MEMORY", "WAL", "OFF"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    pub db_path: Option<PathBuf>,
    pub criteria_cache_size: usize,
    pub busy_timeout_ms: u64,
    pub journal_mode: String,
    pub default_collection: Option<String>,
    pub log_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_retention: Option<usize>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            criteria_cache_size: DEFAULT_CRITERIA_CACHE_SIZE,
            busy_timeout_ms: 5000,
            journal_mode: "WAL".to_string(),
            default_collection: None,
            log_dir: None,
            log_level: None,
            log_retention: None,
        }
    }
}

/// Every field optional so several files can be layered.
#[derive(Debug, Clone, Default, Deserialize)]
struct PartialConfig {
    db_path: Option<PathBuf>,
    criteria_cache_size: Option<usize>,
    busy_timeout_ms: Option<u64>,
    journal_mode: Option<String>,
    default_collection: Option<String>,
    log_dir: Option<PathBuf>,
    log_level: Option<String>,
    log_retention: Option<usize>,
}

impl PartialConfig {
    fn fill_from(&mut self, other: Self) {
        self.db_path = self.db_path.take().or(other.db_path);
        self.criteria_cache_size = self.criteria_cache_size.or(other.criteria_cache_size);
        self.busy_timeout_ms = self.busy_timeout_ms.or(other.busy_timeout_ms);
        self.journal_mode = self.journal_mode.take().or(other.journal_mode);
        self.default_collection = self.default_collection.take().or(other.default_collection);
        self.log_dir = self.log_dir.take().or(other.log_dir);
        self.log_level = self.log_level.take().or(other.log_level);
        self.log_retention = self.log_retention.or(other.log_retention);
    }

    fn from_env() -> Self {
        let var = |k: &str| std::env::var(k).ok().filter(|s| !s.is_empty());
        Self {
            db_path: var("MONGOLITE_DB").map(PathBuf::from),
            criteria_cache_size: var("MONGOLITE_CRITERIA_CACHE").and_then(|s| s.parse().ok()),
            busy_timeout_ms: var("MONGOLITE_BUSY_TIMEOUT_MS").and_then(|s| s.parse().ok()),
            journal_mode: var("MONGOLITE_JOURNAL_MODE"),
            default_collection: var("MONGOLITE_DEFAULT_COLLECTION"),
            log_dir: var("MONGOLITE_LOG_DIR").map(PathBuf::from),
            log_level: var("MONGOLITE_LOG_LEVEL"),
            log_retention: var("MONGOLITE_LOG_RETENTION").and_then(|s| s.parse().ok()),
        }
    }

    fn finish(self) -> DbConfig {
        let d = DbConfig::default();
        DbConfig {
            db_path: self.db_path,
            criteria_cache_size: self.criteria_cache_size.unwrap_or(d.criteria_cache_size),
            busy_timeout_ms: self.busy_timeout_ms.unwrap_or(d.busy_timeout_ms),
            journal_mode: self.journal_mode.unwrap_or(d.journal_mode).to_ascii_uppercase(),
            default_collection: self.default_collection,
            log_dir: self.log_dir,
            log_level: self.log_level,
            log_retention: self.log_retention,
        }
    }
}

impl DbConfig {
    /// Parses a TOML document; missing keys take their defaults.
    ///
    /// # Errors
    /// Returns `DbError::Config` for malformed TOML or invalid values.
    pub fn from_toml_str(s: &str) -> Result<Self, DbError> {
        let partial: PartialConfig = toml::from_str(s).map_err(|e| DbError::Config(e.to_string()))?;
        let cfg = partial.finish();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Loads configuration from files and the environment.
    ///
    /// # Errors
    /// Returns `DbError::Config` if an existing file cannot be parsed or the result is invalid.
    pub fn load(explicit: Option<&Path>) -> Result<Self, DbError> {
        let mut merged = PartialConfig::default();
        for path in config_paths(explicit) {
            if !path.exists() {
                continue;
            }
            let text = std::fs::read_to_string(&path)?;
            let file_cfg: PartialConfig = toml::from_str(&text)
                .map_err(|e| DbError::Config(format!("{}: {e}", path.display())))?;
            log::debug!("loaded config {}", path.display());
            merged.fill_from(file_cfg);
        }
        merged.fill_from(PartialConfig::from_env());
        let cfg = merged.finish();
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    /// Returns `DbError::Config` when a value is out of range.
    pub fn validate(&self) -> Result<(), DbError> {
        if !JOURNAL_MODES.contains(&self.journal_mode.to_ascii_uppercase().as_str()) {
            return Err(DbError::Config(format!("unknown journal_mode {}", self.journal_mode)));
        }
        if self.criteria_cache_size == 0 {
            return Err(DbError::Config("criteria_cache_size must be positive".into()));
        }
        Ok(())
    }
}

fn config_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(p) = explicit {
        paths.push(p.to_path_buf());
    }
    if let Ok(p) = std::env::var("MONGOLITE_CONFIG") {
        paths.push(PathBuf::from(p));
    }
    if let Some(dir) = dirs_next::config_dir() {
        paths.push(dir.join("mongolite.toml"));
    }
    if let Ok(cur) = std::env::current_dir() {
        paths.push(cur.join("mongolite.toml"));
    }
    paths
}
