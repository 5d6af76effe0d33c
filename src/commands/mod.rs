//! Command handlers for the CLI application.
//!
//! - `query`: read-only commands (list, info, get-leds)
//! - `set`: device settings (set-leds, gamemode, gkeys, report-rate)
//! - `daemon`: the render daemon (run)

pub mod daemon;
pub mod query;
pub mod set;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use keyleds_keyboard::{BlockId, Keyboard};
use keyledsd::config::{default_config_path, Config};
use keyledsd::key_db::{Key, KeyDatabase};
use tracing::{debug, warn};

/// Result type for command handlers
pub type CommandResult = anyhow::Result<()>;

/// Settings shared by every command
pub struct CommandContext {
    pub config: Config,
    /// `--device`, when given
    pub device: Option<String>,
}

impl CommandContext {
    /// Load the configuration from `path`, or from the default location.
    pub fn load(path: Option<&Path>, device: Option<String>) -> Result<Self> {
        let path = path.map_or_else(default_config_path, Path::to_path_buf);
        debug!("Loading configuration from {}", path.display());
        let config = Config::load(&path)?;
        Ok(Self { config, device })
    }

    /// Device nodes to drive: `--device`, then the configured list, then
    /// everything discovery finds.
    pub fn device_paths(&self) -> Result<Vec<String>> {
        if let Some(device) = &self.device {
            return Ok(vec![device.clone()]);
        }
        if !self.config.devices.is_empty() {
            return Ok(self.config.devices.clone());
        }
        Ok(keyleds_transport::list_devices()?
            .into_iter()
            .map(|d| d.path)
            .collect())
    }

    /// Open one device, applying the configured call timeout and key patches.
    pub fn open(&self, path: &str) -> Result<Keyboard> {
        let mut keyboard = Keyboard::open(path)?;
        keyboard.set_timeout(self.config.call_timeout());
        for (block_name, keys) in &self.config.key_patches {
            let Some(block) = BlockId::from_name(block_name) else {
                warn!("key_patches: unknown block '{}'", block_name);
                continue;
            };
            if keyboard.block(block).is_none() {
                continue;
            }
            keyboard.patch_missing_keys(block, keys)?;
        }
        Ok(keyboard)
    }
}

/// Open a keyboard and run a closure with it.
/// Prints an error and returns Ok(()) if no device is found.
pub fn with_keyboard<F>(ctx: &CommandContext, f: F) -> CommandResult
where
    F: FnOnce(&mut Keyboard) -> CommandResult,
{
    let paths = ctx.device_paths()?;
    let Some(path) = paths.first() else {
        eprintln!("No device found");
        return Ok(());
    };
    match ctx.open(path) {
        Ok(mut keyboard) => f(&mut keyboard),
        Err(e) => {
            eprintln!("No device found: {path}: {e}");
            Ok(())
        }
    }
}

/// Resolve key names against a device's keys.
pub fn resolve_keys<'a, S: AsRef<str>>(keys: &'a KeyDatabase, names: &[S]) -> Result<Vec<&'a Key>> {
    let mut found = Vec::with_capacity(names.len());
    for name in names {
        let name = name.as_ref();
        match keys.find_name(name) {
            Some(key) => found.push(key),
            None => bail!("Unknown key: {name}"),
        }
    }
    Ok(found)
}

/// Split a `NAME=VALUE` argument
pub fn split_assignment(arg: &str) -> Result<(&str, &str)> {
    match arg.split_once('=') {
        Some((name, value)) if !name.is_empty() && !value.is_empty() => Ok((name, value)),
        _ => Err(anyhow!("Expected NAME=VALUE, got '{arg}'")),
    }
}

/// Set up Ctrl+C handler, returns the running flag
pub fn setup_interrupt_handler() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::SeqCst);
    })
    .ok();

    running
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyleds_keyboard::{KeyBlock, RgbColor};

    #[test]
    fn test_split_assignment() {
        assert_eq!(split_assignment("ESC=red").unwrap(), ("ESC", "red"));
        assert_eq!(split_assignment("logo=#ff0000").unwrap(), ("logo", "#ff0000"));
        assert!(split_assignment("ESC").is_err());
        assert!(split_assignment("=red").is_err());
        assert!(split_assignment("ESC=").is_err());
    }

    #[test]
    fn test_resolve_keys() {
        let db = KeyDatabase::from_blocks(&[KeyBlock::new(
            BlockId::KEYS,
            vec![0x29, 0x04],
            RgbColor::WHITE,
        )]);
        let keys = resolve_keys(&db, &["esc", "KEY_A"]).unwrap();
        assert_eq!(keys.iter().map(|k| k.index).collect::<Vec<_>>(), vec![0, 1]);
        let err = resolve_keys(&db, &["F13"]).unwrap_err();
        assert!(err.to_string().contains("F13"));
    }

    #[test]
    fn test_device_flag_wins() {
        let ctx = CommandContext {
            config: Config {
                devices: vec!["/dev/hidraw7".into()],
                ..Config::default()
            },
            device: Some("/dev/hidraw2".into()),
        };
        assert_eq!(ctx.device_paths().unwrap(), vec!["/dev/hidraw2"]);

        let ctx = CommandContext {
            device: None,
            ..ctx
        };
        assert_eq!(ctx.device_paths().unwrap(), vec!["/dev/hidraw7"]);
    }
}
