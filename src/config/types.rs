//! Configuration type definitions

use serde::{Deserialize, Serialize};

/// Display session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// X display passed to every child process as `DISPLAY`
    pub display: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            display: ":0".to_string(),
        }
    }
}

/// Known outputs of this machine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaysConfig {
    /// Connector name of the built-in panel
    pub panel: String,
}

impl Default for DisplaysConfig {
    fn default() -> Self {
        Self {
            panel: "eDP1".to_string(),
        }
    }
}

/// Identity-pair layout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// EDID serial of the monitor placed on the left
    pub left_serial: String,

    /// EDID serial of the primary monitor on the right
    pub right_serial: String,

    /// Pause after each successful xrandr call, in milliseconds
    pub settle_ms: u64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            left_serial: "1111575116".to_string(),
            right_serial: "1111838796".to_string(),
            settle_ms: 500,
        }
    }
}

/// External tool locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// xrandr program (path or name on `PATH`)
    pub xrandr: String,

    /// edid-decode program (path or name on `PATH`)
    pub edid_decode: String,

    /// Limit for each external call, in seconds
    pub timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            xrandr: "/usr/bin/xrandr".to_string(),
            edid_decode: "edid-decode".to_string(),
            timeout_secs: 10,
        }
    }
}

/// Wallpaper command run after `setup-displays`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WallpaperConfig {
    /// Program followed by its arguments (empty = no wallpaper step)
    pub command: Vec<String>,
}

impl Default for WallpaperConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "feh".to_string(),
                "--bg-scale".to_string(),
                "~/.config/i3/wallpaper.png".to_string(),
            ],
        }
    }
}
