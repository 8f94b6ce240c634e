//! Utility Functions
//!
//! User-friendly error formatting for the binaries.
//!
//! ## Error Formatting
//!
//! The [`errors`] module provides user-friendly error messages:
//!
//! ```rust,ignore
//! use xrandr_arrange::utils::format_user_error;
//!
//! match operation() {
//!     Err(e) => {
//!         eprintln!("{}", format_user_error(&e));
//!         // Shows:
//!         // - Formatted error with box drawing
//!         // - Context-specific troubleshooting steps
//!         // - Technical details
//!     }
//! }
//! ```
//!
//! Error categories with context-aware help:
//! - X display errors → Check `DISPLAY`, session type
//! - Output discovery errors → xrandr installation and path
//! - EDID decoder errors → edid-decode installation and path
//! - Failed xrandr calls → Screen limits, settle interval
//! - Config errors → Syntax validation, invalid values

pub mod errors;

pub use errors::format_user_error;
