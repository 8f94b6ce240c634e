//! Configuration management
//!
//! Handles loading, validation, and merging of configuration from:
//! - TOML files
//! - CLI arguments

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::arrange::Policy;
use crate::tools::ToolRunner;

pub mod types;

pub use types::{DisplaysConfig, LayoutConfig, SessionConfig, ToolsConfig, WallpaperConfig};

/// Shortest accepted settle interval
pub const MIN_SETTLE_MS: u64 = 500;

/// Longest accepted settle interval
pub const MAX_SETTLE_MS: u64 = 10_000;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Display session configuration
    pub session: SessionConfig,
    /// Known outputs
    pub displays: DisplaysConfig,
    /// Identity-pair layout
    pub layout: LayoutConfig,
    /// External tools
    pub tools: ToolsConfig,
    /// Wallpaper step
    pub wallpaper: WallpaperConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or from [`Config::default_path`] when none is given.
    ///
    /// A missing file at the default location yields the built-in defaults.
    /// An explicitly requested file must exist.
    pub fn load_or_default(path: Option<&str>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            Some(path) => {
                warn!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => {
                warn!("Cannot determine config directory, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// `$XDG_CONFIG_HOME/xrandr-arrange/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("xrandr-arrange").join("config.toml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.displays.panel.trim().is_empty() {
            anyhow::bail!("Invalid config: displays.panel must not be empty");
        }

        if self.tools.xrandr.trim().is_empty() {
            anyhow::bail!("Invalid config: tools.xrandr must not be empty");
        }
        if self.tools.edid_decode.trim().is_empty() {
            anyhow::bail!("Invalid config: tools.edid_decode must not be empty");
        }
        if self.tools.timeout_secs == 0 {
            anyhow::bail!("Invalid config: tools.timeout_secs must be greater than 0");
        }

        // xrandr needs this long to finish a mode change before the next call
        if self.layout.settle_ms < MIN_SETTLE_MS {
            anyhow::bail!(
                "Invalid config: layout.settle_ms ({}) must be at least {}",
                self.layout.settle_ms,
                MIN_SETTLE_MS
            );
        }
        if self.layout.settle_ms > MAX_SETTLE_MS {
            anyhow::bail!(
                "Invalid config: layout.settle_ms ({}) cannot exceed {}",
                self.layout.settle_ms,
                MAX_SETTLE_MS
            );
        }

        // Equal serials would make one monitor both left and right
        if !self.layout.left_serial.is_empty() && self.layout.left_serial == self.layout.right_serial {
            anyhow::bail!(
                "Invalid config: layout.left_serial and layout.right_serial are both {}",
                self.layout.left_serial
            );
        }

        Ok(())
    }

    /// Override config with CLI arguments
    pub fn with_overrides(mut self, display: Option<String>) -> Self {
        if let Some(display) = display {
            self.session.display = display;
        }
        self
    }

    /// Runner carrying the session display and the tool timeout
    pub fn tool_runner(&self) -> ToolRunner {
        ToolRunner::new(Duration::from_secs(self.tools.timeout_secs)).with_display(&self.session.display)
    }

    /// Pause between successful xrandr calls
    pub fn settle_interval(&self) -> Duration {
        Duration::from_millis(self.layout.settle_ms)
    }

    /// Identity-pair policy for the configured serials
    pub fn identity_pair(&self) -> Policy {
        Policy::IdentityPair {
            left_serial: self.layout.left_serial.clone(),
            right_serial: self.layout.right_serial.clone(),
        }
    }

    /// Wallpaper command with `~/` expanded, or `None` if disabled
    pub fn wallpaper_command(&self) -> Option<(String, Vec<String>)> {
        let home = dirs::home_dir();
        let mut parts = self
            .wallpaper
            .command
            .iter()
            .map(|part| expand_home(part, home.as_deref()));

        let program = parts.next()?;
        Some((program, parts.collect()))
    }
}

fn expand_home(value: &str, home: Option<&Path>) -> String {
    match (value.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => home.join(rest).to_string_lossy().into_owned(),
        _ => value.to_string(),
    }
}
