//! Configuration file parser for ~/.config/skywarn/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are accepted but logged, since they are usually typos.
use crate::alerts::{default_relays, RelayScheme, DEFAULT_FEED_BASE, DEFAULT_FEED_SLUG, MAX_ALERTS};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

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

/// Alert pipeline configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys may be set.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL that country feed slugs are appended to.
    pub feed_base_url: String,

    /// Slug of the continental feed used for unmapped countries.
    pub default_slug: String,

    /// Timeout in seconds for one whole attempt, headers and body. 0 = no timeout.
    pub request_timeout_secs: u64,

    /// Maximum alerts taken from one feed (clamped to 1..=10).
    pub max_alerts: usize,

    /// Maximum response body size accepted from a relay or the feed itself.
    pub max_response_bytes: usize,

    /// User-Agent header sent with every request.
    pub user_agent: String,

    /// Relays tried in order before the direct fetch. An empty list means direct only.
    pub relays: Vec<RelayScheme>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_base_url: DEFAULT_FEED_BASE.to_string(),
            default_slug: DEFAULT_FEED_SLUG.to_string(),
            request_timeout_secs: 15,
            max_alerts: MAX_ALERTS,
            max_response_bytes: 5 * 1024 * 1024,
            user_agent: concat!("skywarn/", env!("CARGO_PKG_VERSION")).to_string(),
            relays: default_relays(),
        }
    }
}

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 7] = [
        "feed_base_url",
        "default_slug",
        "request_timeout_secs",
        "max_alerts",
        "max_response_bytes",
        "user_agent",
        "relays",
    ];

    /// Per-request timeout, or `None` when disabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
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
                // Deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text. Blank text yields defaults.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(
            feed_base_url = %config.feed_base_url,
            relays = config.relays.len(),
            "Loaded configuration"
        );
        Ok(config)
    }
}

// ============================================================================
// Tests
// ============================================================================
