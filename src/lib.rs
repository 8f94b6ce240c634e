//! # xrandr-arrange
//!
//! Discovers X11 display outputs, identifies them by the serial number in
//! their EDID block, and arranges them with `xrandr` according to a named
//! policy.
//!
//! # Architecture
//!
//! ```text
//! xrandr-arrange
//!   ├─> Output Scanner   (xrandr --properties → Vec<Output>)
//!   │     └─> Identity Decoder (EDID hex → edid-decode → serial)
//!   ├─> Policy Engine    (Vec<Output> + Policy → Plan)
//!   ├─> Mode Selector    (mode name → Policy)
//!   └─> Executor         (Plan → xrandr --output ..., settle between actions)
//! ```
//!
//! # Data Flow
//!
//! **Discovery:** xrandr → [`discovery::ReportParser`] → [`identity::IdentityDecoder`] → [`discovery::Output`]
//!
//! **Arrangement:** [`arrange::Policy`] → [`arrange::Plan`] → [`arrange::Executor`] → xrandr

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Arrangement policies, planning and execution
pub mod arrange;

/// Shared command-line plumbing for the binaries
pub mod cli;

/// Configuration loading and validation
pub mod config;

/// Output discovery from `xrandr --properties`
pub mod discovery;

/// EDID identity decoding
pub mod identity;

/// Logging initialisation
pub mod logging;

/// External process invocation
pub mod tools;

/// Utility functions
pub mod utils;
