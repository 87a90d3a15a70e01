//! Engine configuration.

use std::path::{Path, PathBuf};

use referral_adapt::{AdaptationConfig, BufferConfig, ConfigError, DEFAULT_HISTORY_LIMIT};
use referral_rank::FilterConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading engine configuration.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

/// Every tunable of the engine, grouped by component.
///
/// ```toml
/// auto_adapt = true
///
/// [filter]
/// max_inactive_days = 30
///
/// [adaptation]
/// min_samples = 10
/// strength = "conservative"
///
/// [buffer]
/// capacity = 1000
/// dedup = "count_replays"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub filter: FilterConfig,
    pub adaptation: AdaptationConfig,
    pub buffer: BufferConfig,
    /// Adapt after every accepted feedback once `min_samples` are buffered
    pub auto_adapt: bool,
    /// Adaptation events kept for audit
    pub history_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            filter: FilterConfig::default(),
            adaptation: AdaptationConfig::default(),
            buffer: BufferConfig::default(),
            auto_adapt: true,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

impl EngineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigLoadError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.adaptation.validate()?;

        if self.buffer.capacity == 0 {
            return Err(invalid("buffer.capacity", "must be positive"));
        }
        if self.history_limit == 0 {
            return Err(invalid("history_limit", "must be positive"));
        }
        if let Some(rate) = self.filter.min_success_rate {
            if !(0.0..=1.0).contains(&rate) {
                return Err(invalid("filter.min_success_rate", "must be in [0, 1]"));
            }
        }
        if self.filter.max_inactive_days.is_some_and(|d| d < 0) {
            return Err(invalid("filter.max_inactive_days", "must not be negative"));
        }
        Ok(())
    }
}
