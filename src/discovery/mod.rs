//! Output Discovery
//!
//! Builds the list of display outputs from the `xrandr --properties` report.
//!
//! # Report grammar
//!
//! ```text
//! Screen 0: minimum 8 x 8, current 3840 x 1080, maximum 32767 x 32767
//! eDP1 connected primary 1920x1080+0+0 (normal left inverted right x axis y axis) 309mm x 174mm
//! 	EDID:
//! 		00ffffffffffff0030e4d80200000000
//! 		00160104a51f117802ee95a3544c9926
//! 	BACKLIGHT: 400
//!    1920x1080     60.02*+  59.93
//! HDMI1 disconnected (normal left inverted right x axis y axis)
//! ```
//!
//! - A header line (`<name> connected|disconnected ...`) starts a new output.
//! - An indented `EDID:` line starts the identity block of the current output.
//! - Indented all-hex lines that follow are the block, one chunk per line.
//! - Everything else is ignored.
//!
//! [`ReportParser`] is the two-state machine over these lines, and
//! [`scan_report`] drives it from any async line source, decoding each
//! completed block with an [`IdentityDecoder`](crate::identity::IdentityDecoder).
//! [`XrandrScanner`] runs the real `xrandr` and feeds its stdout through the
//! same path.

mod parser;
mod scanner;

pub use parser::ReportParser;
pub use scanner::{scan_report, XrandrScanner};

use thiserror::Error;

use crate::identity::IdentityDecodeError;
use crate::tools::ToolError;

/// One display connector as reported by xrandr
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    /// Connector name (e.g. "eDP1", "HDMI-1")
    pub name: String,

    /// A sink is attached to this connector
    pub connected: bool,

    /// Hex EDID text, concatenated from the report's continuation lines
    pub identity_block: String,

    /// Serial decoded from `identity_block`, empty when not available
    pub serial: String,
}

impl Output {
    /// Create an output with no identity data
    pub fn new(name: impl Into<String>, connected: bool) -> Self {
        Self {
            name: name.into(),
            connected,
            identity_block: String::new(),
            serial: String::new(),
        }
    }

    /// Builder-style serial, mostly for tests and fixtures
    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = serial.into();
        self
    }

    /// Whether the identity block should be decoded
    pub fn has_identity_block(&self) -> bool {
        self.connected && !self.identity_block.is_empty()
    }
}

/// Discovery errors
#[derive(Error, Debug)]
pub enum ScanError {
    /// The display subsystem could not be queried
    #[error("Cannot enumerate outputs: {0}")]
    Enumeration(#[from] ToolError),

    /// The enumeration report could not be read
    #[error("Cannot enumerate outputs: failed to read report: {0}")]
    Report(#[source] std::io::Error),

    /// The identity decoder could not be run for an output
    #[error("Cannot decode identity of output {output}: {source}")]
    IdentityDecode {
        /// Output whose block was being decoded
        output: String,
        /// Decoder failure
        #[source]
        source: IdentityDecodeError,
    },
}

impl ScanError {
    /// Whether the display subsystem itself could not be queried
    pub fn is_enumeration(&self) -> bool {
        matches!(self, ScanError::Enumeration(_) | ScanError::Report(_))
    }
}
