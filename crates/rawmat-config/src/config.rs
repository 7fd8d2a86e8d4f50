// crates/rawmat-config/src/config.rs
// ============================================================================
// Module: Raw Material Ledger Configuration
// Description: Configuration loading and validation for the ledger.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: rawmat-core, rawmat-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The file is resolved from an explicit path, then [`CONFIG_ENV_VAR`], then
//! [`DEFAULT_CONFIG_NAME`] in the working directory. Only the default location
//! may be absent; an absent default yields [`RawmatConfig::default`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use rawmat_core::DispensingMethod;
use rawmat_core::LifecycleConfig;
use rawmat_store_sqlite::SqliteStoreConfig;
use rawmat_store_sqlite::SqliteStoreMode;
use rawmat_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "rawmat.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "RAWMAT_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default database filename for the sqlite store.
pub(crate) const DEFAULT_STORE_PATH: &str = "rawmat.db";
/// Default busy timeout for the sqlite store.
pub(crate) const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Default sqlite read pool size.
pub(crate) const DEFAULT_READ_POOL_SIZE: usize = 4;
/// Maximum sqlite read pool size.
pub(crate) const MAX_READ_POOL_SIZE: usize = 64;
/// Maximum automatic conflict retries.
pub(crate) const MAX_CONFLICT_RETRIES: u32 = 16;
/// Maximum expiry alert window in days.
pub(crate) const MAX_EXPIRY_ALERT_DAYS: u32 = 3_650;
/// Maximum length of a log filter directive.
pub(crate) const MAX_LOG_LEVEL_LENGTH: usize = 256;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Raw material ledger configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawmatConfig {
    /// Material store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Lifecycle engine configuration.
    #[serde(default)]
    pub lifecycle: LifecycleSettings,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RawmatConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let source = resolve_path(path, env::var(CONFIG_ENV_VAR).ok())?;
        Self::load_from(&source)
    }

    /// Loads configuration from an already resolved source.
    fn load_from(source: &ConfigSource) -> Result<Self, ConfigError> {
        validate_path(&source.path)?;
        let bytes = match fs::read(&source.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound && source.is_default => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(err) => return Err(ConfigError::Io(err.to_string())),
        };
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store.validate()?;
        self.lifecycle.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Resolved config location.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ConfigSource {
    /// Path to read.
    path: PathBuf,
    /// True when neither the caller nor the environment named a path.
    is_default: bool,
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Material store backend type.
///
/// Each CLI invocation is its own process, so only durable backends apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Durable `SQLite` store.
    #[default]
    Sqlite,
}

/// Material store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store backend type.
    #[serde(rename = "type", default)]
    pub store_type: StoreType,
    /// `SQLite` database path when using the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
    /// Number of read-only `SQLite` connections.
    #[serde(default = "default_read_pool_size")]
    pub read_pool_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
            read_pool_size: default_read_pool_size(),
        }
    }
}

impl StoreConfig {
    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("store.path", &path.to_string_lossy())?;
        }
        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "store.busy_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.read_pool_size == 0 || self.read_pool_size > MAX_READ_POOL_SIZE {
            return Err(ConfigError::Invalid(format!(
                "store.read_pool_size must be between 1 and {MAX_READ_POOL_SIZE}"
            )));
        }
        Ok(())
    }

    /// Returns the database path, falling back to [`DEFAULT_STORE_PATH`].
    #[must_use]
    pub fn effective_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH))
    }

    /// Builds the `SQLite` store configuration.
    #[must_use]
    pub fn to_sqlite_config(&self) -> SqliteStoreConfig {
        SqliteStoreConfig {
            path: self.effective_path(),
            busy_timeout_ms: self.busy_timeout_ms,
            journal_mode: self.journal_mode,
            sync_mode: self.sync_mode,
            read_pool_size: self.read_pool_size,
        }
    }
}

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

/// Lifecycle engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleSettings {
    /// Retries after a write conflict before it is surfaced.
    #[serde(default = "default_conflict_retries")]
    pub conflict_retries: u32,
    /// Ordering used when a request names none.
    #[serde(default)]
    pub default_dispensing_method: DispensingMethod,
    /// Default expiry alert window in days.
    #[serde(default = "default_expiry_alert_days")]
    pub expiry_alert_days: u32,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            conflict_retries: default_conflict_retries(),
            default_dispensing_method: DispensingMethod::default(),
            expiry_alert_days: default_expiry_alert_days(),
        }
    }
}

impl LifecycleSettings {
    /// Validates lifecycle settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.conflict_retries > MAX_CONFLICT_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "lifecycle.conflict_retries must be at most {MAX_CONFLICT_RETRIES}"
            )));
        }
        if self.expiry_alert_days == 0 || self.expiry_alert_days > MAX_EXPIRY_ALERT_DAYS {
            return Err(ConfigError::Invalid(format!(
                "lifecycle.expiry_alert_days must be between 1 and {MAX_EXPIRY_ALERT_DAYS}"
            )));
        }
        Ok(())
    }

    /// Builds the engine configuration.
    #[must_use]
    pub fn to_lifecycle_config(&self) -> LifecycleConfig {
        LifecycleConfig {
            conflict_retries: self.conflict_retries,
            default_dispensing_method: self.default_dispensing_method,
            expiry_alert_days: self.expiry_alert_days,
        }
    }
}

// ============================================================================
// SECTION: Logging
// ============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `rawmat_core=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
    /// Optional JSONL file receiving lifecycle events.
    #[serde(default)]
    pub event_log: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: LogFormat::default(), event_log: None }
    }
}

impl LoggingConfig {
    /// Validates logging configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let level = self.level.trim();
        if level.is_empty() {
            return Err(ConfigError::Invalid("logging.level must be non-empty".to_string()));
        }
        if level.len() > MAX_LOG_LEVEL_LENGTH {
            return Err(ConfigError::Invalid("logging.level exceeds max length".to_string()));
        }
        if let Some(path) = &self.event_log {
            validate_path_string("logging.event_log", &path.to_string_lossy())?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default sqlite busy timeout.
pub(crate) const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Default sqlite read pool size.
pub(crate) const fn default_read_pool_size() -> usize {
    DEFAULT_READ_POOL_SIZE
}

/// Default conflict retry count.
pub(crate) const fn default_conflict_retries() -> u32 {
    rawmat_core::runtime::DEFAULT_CONFLICT_RETRIES
}

/// Default expiry alert window.
pub(crate) const fn default_expiry_alert_days() -> u32 {
    rawmat_core::runtime::DEFAULT_EXPIRY_ALERT_DAYS
}

/// Default log filter.
fn default_log_level() -> String {
    "info".to_string()
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from an explicit path or the environment value.
fn resolve_path(path: Option<&Path>, env_path: Option<String>) -> Result<ConfigSource, ConfigError> {
    if let Some(path) = path {
        return Ok(ConfigSource { path: path.to_path_buf(), is_default: false });
    }
    if let Some(env_path) = env_path {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(ConfigSource { path: PathBuf::from(env_path), is_default: false });
    }
    Ok(ConfigSource { path: PathBuf::from(DEFAULT_CONFIG_NAME), is_default: true })
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
