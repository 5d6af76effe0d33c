//! Daemon configuration, loaded from TOML.
//!
//! ```toml
//! fps = 32
//! devices = ["/dev/hidraw3"]
//!
//! [groups]
//! arrows = ["UP", "DOWN", "LEFT", "RIGHT"]
//!
//! [[effects]]
//! effect = "fill"
//! color = "#202020"
//! arrows = "orange"
//! ```
//!
//! Every field has a default; a missing file is the default configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::render_loop::RenderLoopConfig;

pub const CONFIG_FILE: &str = "keyledsd.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("{0}")]
    Invalid(String),
}

/// One entry of the effect stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectConfig {
    /// Registered effect name
    pub effect: String,
    /// Everything else, handed to the effect as strings
    #[serde(flatten)]
    pub settings: BTreeMap<String, toml::Value>,
}

impl EffectConfig {
    /// Settings as the string map effects are built from
    pub fn settings(&self) -> BTreeMap<String, String> {
        self.settings
            .iter()
            .map(|(key, value)| {
                let text = match value {
                    toml::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), text)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fps: u32,
    /// Overall deadline of one device call
    pub call_timeout_ms: u64,
    pub error_grace_secs: u64,
    pub commit_delay_step_us: u64,
    pub commit_delay_max_us: u64,
    pub resync_attempts: u32,
    pub resync_backoff_ms: u64,
    /// hidraw nodes to drive; empty means every device found
    pub devices: Vec<String>,
    /// Keys some devices leave out of their own block enumeration, by block name
    pub key_patches: BTreeMap<String, Vec<u8>>,
    /// Named key groups: group name to key names
    pub groups: BTreeMap<String, Vec<String>>,
    /// Effect stack, bottom first
    pub effects: Vec<EffectConfig>,
}

impl Default for Config {
    fn default() -> Self {
        let render = RenderLoopConfig::default();
        Self {
            fps: render.fps,
            call_timeout_ms: keyleds_transport::DEFAULT_TIMEOUT.as_millis() as u64,
            error_grace_secs: render.error_grace.as_secs(),
            commit_delay_step_us: render.commit_delay_step.as_micros() as u64,
            commit_delay_max_us: render.commit_delay_max.as_micros() as u64,
            resync_attempts: render.resync_attempts,
            resync_backoff_ms: render.resync_backoff.as_millis() as u64,
            devices: Vec::new(),
            key_patches: BTreeMap::new(),
            groups: BTreeMap::new(),
            effects: Vec::new(),
        }
    }
}

impl Config {
    /// Load from a TOML file; a missing file gives the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<string>"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.fps == 0 || self.fps > 1000 {
            return Err(ConfigError::Invalid(format!(
                "fps must be between 1 and 1000, got {}",
                self.fps
            )));
        }
        if self.call_timeout_ms == 0 {
            return Err(ConfigError::Invalid("call_timeout_ms must not be zero".into()));
        }
        if self.commit_delay_step_us > self.commit_delay_max_us {
            return Err(ConfigError::Invalid(
                "commit_delay_step_us is larger than commit_delay_max_us".into(),
            ));
        }
        Ok(())
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn render_loop(&self) -> RenderLoopConfig {
        RenderLoopConfig {
            fps: self.fps,
            error_grace: Duration::from_secs(self.error_grace_secs),
            commit_delay_step: Duration::from_micros(self.commit_delay_step_us),
            commit_delay_max: Duration::from_micros(self.commit_delay_max_us),
            resync_attempts: self.resync_attempts,
            resync_backoff: Duration::from_millis(self.resync_backoff_ms),
        }
    }
}

/// Path to the default configuration file.
pub fn default_config_path() -> PathBuf {
    dirs_path().join(CONFIG_FILE)
}

fn dirs_path() -> PathBuf {
    if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(config).join("keyledsd")
    } else if let Some(home) = std::env::var_os("HOME") {
        PathBuf::from(home).join(".config/keyledsd")
    } else {
        PathBuf::from("/tmp/keyledsd")
    }
}
