//! JSON configuration file adapter.
//!
//! Implements [`ConfigPort`] on a host file. Missing file = first boot;
//! the caller falls back to defaults.

use std::fs;
use std::path::PathBuf;

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::SystemConfig;

pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound);
            }
            Err(e) => {
                warn!("CONFIG: read {} failed: {}", self.path.display(), e);
                return Err(ConfigError::IoError);
            }
        };
        let cfg: SystemConfig = serde_json::from_str(&text).map_err(|e| {
            warn!("CONFIG: {} is not valid: {}", self.path.display(), e);
            ConfigError::Corrupted
        })?;
        cfg.validate()?;
        info!("CONFIG: loaded {}", self.path.display());
        Ok(cfg)
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let text = serde_json::to_string_pretty(config).map_err(|_| ConfigError::IoError)?;
        fs::write(&self.path, text).map_err(|e| {
            warn!("CONFIG: write {} failed: {}", self.path.display(), e);
            ConfigError::IoError
        })?;
        info!("CONFIG: saved {}", self.path.display());
        Ok(())
    }
}
