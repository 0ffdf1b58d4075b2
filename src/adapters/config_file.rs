//! JSON configuration file adapter.
//!
//! Implements [`ConfigPort`] on a single JSON document.
//!
//! - Missing file: defaults are returned (first start on a new host).
//! - Unparsable file: [`ConfigError::Corrupted`], never silently replaced.
//! - Every load and save is range-checked through
//!   [`ControllerConfig::validate`].
//! - Saves go through a sibling temporary file and a rename, so a crash
//!   never leaves a half-written config behind.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::info;

use crate::app::ports::ConfigPort;
use crate::config::ControllerConfig;
use crate::error::ConfigError;

pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<ControllerConfig, ConfigError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("Config: {} not found, using defaults", self.path.display());
                return Ok(ControllerConfig::default());
            }
            Err(e) => return Err(ConfigError::Io(format!("{}: {e}", self.path.display()))),
        };

        let config: ControllerConfig = serde_json::from_str(&text)
            .map_err(|e| ConfigError::Corrupted(format!("{}: {e}", self.path.display())))?;
        config.validate()?;
        info!("Config: loaded {}", self.path.display());
        Ok(config)
    }

    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let json = serde_json::to_string_pretty(config)
            .map_err(|e| ConfigError::Corrupted(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| ConfigError::Io(format!("{}: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", self.path.display())))?;
        info!("Config: saved {}", self.path.display());
        Ok(())
    }
}
