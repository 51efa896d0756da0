//! Application configuration.

use deal_alerts::{AlertConfig, NotifierConfig};
use deal_engine::EvaluatorConfig;
use deal_extract::ExtractorConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Extraction rules.
    pub extraction: ExtractionSettings,
    /// Best-deal comparison.
    pub comparison: ComparisonSettings,
    /// Alert delivery and retention.
    pub alerts: AlertSettings,
    /// SQLite database URL.
    pub database_url: String,
    /// Monitored channel list file.
    pub channels_file: String,
    /// Logging level.
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            extraction: ExtractionSettings::default(),
            comparison: ComparisonSettings::default(),
            alerts: AlertSettings::default(),
            database_url: "sqlite://price_monitor.db".to_string(),
            channels_file: "channels.txt".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Read a JSON config file, falling back to defaults when it is missing
    /// or malformed.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            info!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => {
                info!(path = %path.display(), "Loaded config file");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring config file, using defaults");
                Self::default()
            }
        }
    }
}

/// Extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    /// Currency assumed when a post names none.
    pub default_currency: String,
    /// Currency symbols and words, tried in order.
    pub currency_markers: Vec<String>,
    /// Words dropped from product names.
    pub stop_words: Vec<String>,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        let defaults = ExtractorConfig::default();
        Self {
            default_currency: defaults.default_currency,
            currency_markers: defaults.currency_markers,
            stop_words: defaults.stop_words,
        }
    }
}

impl From<&ExtractionSettings> for ExtractorConfig {
    fn from(settings: &ExtractionSettings) -> Self {
        ExtractorConfig {
            default_currency: settings.default_currency.clone(),
            currency_markers: settings.currency_markers.clone(),
            stop_words: settings.stop_words.clone(),
        }
    }
}

/// Comparison settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonSettings {
    /// Trailing window in seconds.
    pub window_secs: u64,
}

impl Default for ComparisonSettings {
    fn default() -> Self {
        Self {
            window_secs: EvaluatorConfig::default().window_secs,
        }
    }
}

impl From<&ComparisonSettings> for EvaluatorConfig {
    fn from(settings: &ComparisonSettings) -> Self {
        EvaluatorConfig {
            window_secs: settings.window_secs,
        }
    }
}

/// Alert settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertSettings {
    /// Telegram chat receiving alerts. 0 disables delivery.
    pub admin_chat_id: i64,
    /// Days to keep observations and alert history.
    pub history_retention_days: i64,
    /// Seconds between cleanup runs.
    pub cleanup_interval_secs: u64,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            admin_chat_id: 0,
            history_retention_days: NotifierConfig::default().history_retention_days,
            cleanup_interval_secs: 3600,
        }
    }
}

impl From<&AlertSettings> for NotifierConfig {
    fn from(settings: &AlertSettings) -> Self {
        NotifierConfig {
            history_retention_days: settings.history_retention_days,
        }
    }
}

impl From<&AlertSettings> for AlertConfig {
    fn from(settings: &AlertSettings) -> Self {
        AlertConfig::new(settings.admin_chat_id)
    }
}
