//! Configuration file parser for the publications API (`config.toml`).
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are ignored by serde, though we log a warning for each one
//! since they are usually typos.
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable that overrides `database.url`.
pub const DATABASE_URL_ENV: &str = "PUBLICATIONS_DATABASE_URL";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level configuration. Every section and key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub feeds_api: FeedsApiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    pub request_timeout_secs: u64,
    /// Upper bound on the connection drain after shutdown is requested.
    pub shutdown_grace_secs: u64,
    /// TTL of cached list responses. 0 disables the cache.
    pub list_cache_ttl_ms: u64,
    pub list_cache_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
            shutdown_grace_secs: 5,
            list_cache_ttl_ms: 1000,
            list_cache_capacity: 512,
        }
    }
}

/// SEC-015: the URL may carry credentials, so it is a [`SecretString`] and
/// `Debug` masks it.
#[derive(Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    #[serde(deserialize_with = "secret_string")]
    pub url: SecretString,
    pub min_connections: u32,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: SecretString::from("sqlite:publications.db?mode=rwc".to_string()),
            min_connections: 1,
            max_connections: 5,
            acquire_timeout_secs: 10,
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"[REDACTED]")
            .field("min_connections", &self.min_connections)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .finish()
    }
}

fn secret_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
    String::deserialize(deserializer).map(SecretString::from)
}

/// Where the feed registrar lives and how long we wait on it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FeedsApiConfig {
    pub url: String,
    pub timeout_secs: u64,
    /// Time a rollback may keep running after its request is gone.
    pub compensation_grace_secs: u64,
}

impl Default for FeedsApiConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8081".to_string(),
            timeout_secs: 10,
            compensation_grace_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive; `RUST_LOG` takes precedence.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

const KNOWN_KEYS: &[(&str, &[&str])] = &[
    (
        "server",
        &[
            "address",
            "request_timeout_secs",
            "shutdown_grace_secs",
            "list_cache_ttl_ms",
            "list_cache_capacity",
        ],
    ),
    (
        "database",
        &[
            "url",
            "min_connections",
            "max_connections",
            "acquire_timeout_secs",
        ],
    ),
    (
        "feeds_api",
        &["url", "timeout_secs", "compensation_grace_secs"],
    ),
    ("logging", &["level", "format"]),
];

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // SEC-014: Check file size before reading
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::parse(&content)
    }

    /// Parses TOML text. Blank input yields the defaults.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            warn_unknown_keys(&raw);
        }

        let config: Config = toml::from_str(content)?;
        tracing::debug!(
            address = %config.server.address,
            feeds_api = %config.feeds_api.url,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Applies environment overrides, currently only [`DATABASE_URL_ENV`].
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(DATABASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            tracing::debug!(env = DATABASE_URL_ENV, "Database url taken from environment");
            self.database.url = SecretString::from(url);
        }
    }

    pub fn database_url(&self) -> &str {
        self.database.url.expose_secret()
    }

    /// Registrar timeout, kept strictly below the request timeout so a
    /// registrar failure surfaces before the request itself is cut off.
    pub fn registrar_timeout(&self) -> Duration {
        let configured = Duration::from_secs(self.feeds_api.timeout_secs);
        let request = Duration::from_secs(self.server.request_timeout_secs);
        if request.is_zero() || configured < request {
            return configured;
        }
        let clamped = request * 4 / 5;
        tracing::warn!(
            feeds_api_timeout_secs = self.feeds_api.timeout_secs,
            request_timeout_secs = self.server.request_timeout_secs,
            effective_ms = clamped.as_millis() as u64,
            "feeds_api.timeout_secs is not below server.request_timeout_secs, clamping"
        );
        clamped
    }
}

fn warn_unknown_keys(raw: &toml::Table) {
    for (section, value) in raw {
        let Some((_, keys)) = KNOWN_KEYS.iter().find(|(name, _)| name == section) else {
            tracing::warn!(key = %section, "Unknown section in config file, ignoring");
            continue;
        };
        if let Some(table) = value.as_table() {
            for key in table.keys() {
                if !keys.contains(&key.as_str()) {
                    tracing::warn!(section = %section, key = %key, "Unknown key in config file, ignoring");
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
