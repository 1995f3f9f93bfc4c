//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::Path;

use anyhow::{Context, Result};
use radio_core::Band;
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Band opened at startup.
    /// Override: `RADIO_STARTUP_BAND` (`FM`, `AM`)
    pub startup_band: Band,

    /// Base delay of the reopen backoff in milliseconds.
    /// Override: `RADIO_REOPEN_BASE_DELAY_MS`
    pub reopen_base_delay_ms: u64,

    /// Sweep the current band on the second tuner.
    /// Override: `RADIO_BACKGROUND_SCAN`
    pub background_scan: bool,

    /// Scan requests per sweep before giving up on loop-back.
    pub scan_max_steps: u32,

    /// Request stereo where the hardware supports it.
    pub stereo: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let core = radio_core::Config::default();
        Self {
            startup_band: core.default_band,
            reopen_base_delay_ms: core.reopen_base_delay_ms,
            background_scan: core.background_scan,
            scan_max_steps: core.scan_max_steps,
            stereo: core.stereo,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("RADIO_STARTUP_BAND") {
            match serde_yaml::from_str::<Band>(&val) {
                Ok(band) => self.startup_band = band,
                Err(e) => log::warn!("Ignoring RADIO_STARTUP_BAND={}: {}", val, e),
            }
        }

        if let Ok(val) = std::env::var("RADIO_REOPEN_BASE_DELAY_MS") {
            if let Ok(delay) = val.parse() {
                self.reopen_base_delay_ms = delay;
            }
        }

        if let Ok(val) = std::env::var("RADIO_BACKGROUND_SCAN") {
            if let Ok(enabled) = val.parse() {
                self.background_scan = enabled;
            }
        }

        // Note: RADIO_LOG_LEVEL is handled by clap via #[arg(env = ...)] in main.rs
    }

    /// Converts to radio-core's Config type.
    pub fn to_core_config(&self) -> radio_core::Config {
        radio_core::Config {
            reopen_base_delay_ms: self.reopen_base_delay_ms,
            scan_max_steps: self.scan_max_steps,
            background_scan: self.background_scan,
            default_band: self.startup_band,
            stereo: self.stereo,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_fields_fall_back_to_core_defaults() {
        let config: ServerConfig =
            serde_yaml::from_str("startup_band: AM\nbackground_scan: false\n").unwrap();
        let core = config.to_core_config();

        assert_eq!(core.default_band, Band::Am);
        assert!(!core.background_scan);
        assert_eq!(
            core.reopen_base_delay_ms,
            radio_core::Config::default().reopen_base_delay_ms
        );
        assert!(core.validate().is_ok());
    }
}
