use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::PulseError;
use crate::live::generator::GeneratorConfig;

/// Environment variable prefix, e.g. `PULSE_MIN_TICK_MS=500`.
const ENV_PREFIX: &str = "PULSE";

/// Optional config file name (`pulse.toml`, `pulse.json`, ...) looked up in the working directory.
const CONFIG_FILE: &str = "pulse";

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    /// Token catalog JSON. The built-in catalog is used when unset.
    pub catalog_path: Option<PathBuf>,
    /// Where the recent search list is cached between runs
    pub recent_searches_path: PathBuf,

    /// Seed for the simulated feed. Random when unset.
    pub seed: Option<u64>,
    pub min_tick_ms: u64,
    pub max_tick_ms: u64,
    /// Keep a token's market state after its last subscriber leaves
    pub retain_state_on_stop: bool,

    /// How often the binary logs a fresh view summary
    pub refresh_interval_secs: u64,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_path: None,
            recent_searches_path: PathBuf::from("data/recent_searches.json"),
            seed: None,
            min_tick_ms: 1000,
            max_tick_ms: 4000,
            retain_state_on_stop: true,
            refresh_interval_secs: 2,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration: defaults, then `pulse.*` if present, then `PULSE_*` environment variables.
    pub fn load() -> Result<Self> {
        let defaults = Self::default();

        let settings = config::Config::builder()
            .set_default("recent_searches_path", defaults.recent_searches_path.to_string_lossy().to_string())?
            .set_default("min_tick_ms", defaults.min_tick_ms)?
            .set_default("max_tick_ms", defaults.max_tick_ms)?
            .set_default("retain_state_on_stop", defaults.retain_state_on_stop)?
            .set_default("refresh_interval_secs", defaults.refresh_interval_secs)?
            .set_default("log_level", defaults.log_level.clone())?
            .add_source(config::File::with_name(CONFIG_FILE).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to build configuration")?;

        let config: Self = settings
            .try_deserialize()
            .context("Failed to parse configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PulseError> {
        if self.min_tick_ms == 0 {
            return Err(PulseError::ConfigError("min_tick_ms must be greater than 0".to_string()));
        }
        if self.min_tick_ms > self.max_tick_ms {
            return Err(PulseError::ConfigError(format!(
                "min_tick_ms ({}) cannot be greater than max_tick_ms ({})",
                self.min_tick_ms, self.max_tick_ms
            )));
        }
        if self.refresh_interval_secs == 0 {
            return Err(PulseError::ConfigError("refresh_interval_secs must be greater than 0".to_string()));
        }
        Ok(())
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            min_tick: Duration::from_millis(self.min_tick_ms),
            max_tick: Duration::from_millis(self.max_tick_ms),
            seed: self.seed,
            retain_state_on_stop: self.retain_state_on_stop,
            ..GeneratorConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.min_tick_ms, 1000);
        assert_eq!(config.max_tick_ms, 4000);
        assert!(config.catalog_path.is_none());
    }

    #[test]
    fn test_inverted_tick_bounds_rejected() {
        let config = Config {
            min_tick_ms: 5000,
            max_tick_ms: 1000,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(PulseError::ConfigError(_))));
    }

    #[test]
    fn test_zero_tick_rejected() {
        let config = Config {
            min_tick_ms: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_generator_config_carries_bounds() {
        let config = Config {
            min_tick_ms: 250,
            max_tick_ms: 750,
            seed: Some(7),
            ..Config::default()
        };
        let gen = config.generator_config();
        assert_eq!(gen.min_tick, Duration::from_millis(250));
        assert_eq!(gen.max_tick, Duration::from_millis(750));
        assert_eq!(gen.seed, Some(7));
    }
}
