//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use crate::application::errors::ConfigError;
use crate::domain::visibility::VisibilityPolicy;

/// Upper bound for the presence timings, one week
pub const MAX_PRESENCE_SECS: u64 = 7 * 24 * 60 * 60;

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub room: RoomConfig,
    pub presence: PresenceConfig,
    pub delivery: DeliveryConfig,
    pub visibility: VisibilityConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RoomConfig {
    /// Recipient meaning "the whole room"
    pub everyone: String,
    pub join_text: String,
    pub leave_text: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PresenceConfig {
    pub sweep_interval_secs: u64,
    pub stale_threshold_secs: u64,
}

/// Retry policy for join/leave announcements
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeliveryConfig {
    pub announce_attempts: u32,
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct VisibilityConfig {
    pub private_to_everyone_is_public: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            room: RoomConfig {
                everyone: "Todos".to_string(),
                join_text: "joined".to_string(),
                leave_text: "left".to_string(),
            },
            presence: PresenceConfig {
                sweep_interval_secs: 15,
                stale_threshold_secs: 10,
            },
            delivery: DeliveryConfig {
                announce_attempts: 3,
                retry_backoff_ms: 50,
            },
            visibility: VisibilityConfig {
                private_to_everyone_is_public: false,
            },
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                path: PathBuf::from("chat.db"),
            },
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_env() -> Self {
        let mut config = Config::default();

        if let Ok(path) = std::env::var("CHAT_STORAGE_PATH") {
            config.storage.path = PathBuf::from(path);
            config.storage.backend = StorageBackend::Sqlite;
        }

        if let Ok(everyone) = std::env::var("CHAT_EVERYONE") {
            if !everyone.trim().is_empty() {
                config.room.everyone = everyone;
            }
        }

        if let Ok(secs) = std::env::var("CHAT_STALE_THRESHOLD_SECS") {
            if let Ok(s) = secs.parse() {
                config.presence.stale_threshold_secs = s;
            }
        }

        if let Ok(secs) = std::env::var("CHAT_SWEEP_INTERVAL_SECS") {
            if let Ok(s) = secs.parse::<u64>() {
                if s > 0 {
                    config.presence.sweep_interval_secs = s;
                }
            }
        }

        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.room.everyone.trim().is_empty() {
            return Err(ConfigError::MissingField("room.everyone".to_string()));
        }
        if self.room.join_text.trim().is_empty() || self.room.leave_text.trim().is_empty() {
            return Err(ConfigError::InvalidValue("room announcement texts must not be empty".to_string()));
        }
        if self.presence.sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidValue("presence.sweep-interval-secs must be positive".to_string()));
        }
        if self.presence.sweep_interval_secs > MAX_PRESENCE_SECS {
            return Err(ConfigError::InvalidValue(format!(
                "presence.sweep-interval-secs must be at most {}",
                MAX_PRESENCE_SECS
            )));
        }
        if self.presence.stale_threshold_secs > MAX_PRESENCE_SECS {
            return Err(ConfigError::InvalidValue(format!(
                "presence.stale-threshold-secs must be at most {}",
                MAX_PRESENCE_SECS
            )));
        }
        if self.delivery.announce_attempts == 0 {
            return Err(ConfigError::InvalidValue("delivery.announce-attempts must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.presence.sweep_interval_secs.clamp(1, MAX_PRESENCE_SECS))
    }

    /// Saturates at `MAX_PRESENCE_SECS` for configs that skipped `validate`.
    pub fn stale_threshold(&self) -> chrono::Duration {
        let secs = self.presence.stale_threshold_secs.min(MAX_PRESENCE_SECS);
        i64::try_from(secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or_else(|| chrono::Duration::seconds(MAX_PRESENCE_SECS as i64))
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.delivery.retry_backoff_ms)
    }

    pub fn visibility_policy(&self) -> VisibilityPolicy {
        if self.visibility.private_to_everyone_is_public {
            VisibilityPolicy::Legacy
        } else {
            VisibilityPolicy::Strict
        }
    }
}
