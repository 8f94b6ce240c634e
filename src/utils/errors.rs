//! User-Friendly Error Formatting
//!
//! Provides user-friendly error messages with troubleshooting hints
//! for common error scenarios.

use std::fmt::Write;

use crate::arrange::ExecutionError;
use crate::discovery::ScanError;
use crate::identity::IdentityDecodeError;
use crate::tools::ToolError;

/// Format error for user consumption
///
/// Takes technical error and produces user-friendly message with
/// troubleshooting steps and context.
pub fn format_user_error(error: &anyhow::Error) -> String {
    let mut output = String::new();

    // Header
    writeln!(&mut output).ok();
    writeln!(
        &mut output,
        "╔════════════════════════════════════════════════════════════╗"
    )
    .ok();
    writeln!(
        &mut output,
        "║                     ERROR                                  ║"
    )
    .ok();
    writeln!(
        &mut output,
        "╚════════════════════════════════════════════════════════════╝"
    )
    .ok();
    writeln!(&mut output).ok();

    match classify(error) {
        Category::Display => format_display_error(&mut output),
        Category::Enumeration => format_enumeration_error(&mut output),
        Category::IdentityDecoder => format_decoder_error(&mut output),
        Category::Execution(count) => format_execution_error(&mut output, count),
        Category::Config => format_config_error(&mut output),
        Category::Generic => format_generic_error(&mut output, &error.to_string()),
    }

    // Technical details
    writeln!(&mut output).ok();
    writeln!(
        &mut output,
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
    )
    .ok();
    writeln!(&mut output, "Technical Details:").ok();
    writeln!(&mut output).ok();
    writeln!(&mut output, "{:#}", error).ok();
    writeln!(&mut output).ok();

    // Footer with help
    writeln!(
        &mut output,
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
    )
    .ok();
    writeln!(&mut output, "Need Help?").ok();
    writeln!(
        &mut output,
        "  - Run with --verbose for detailed logs: display-mode -vv <mode>"
    )
    .ok();
    writeln!(
        &mut output,
        "  - Preview the xrandr calls without applying them: --dry-run"
    )
    .ok();
    writeln!(
        &mut output,
        "╚════════════════════════════════════════════════════════════╝"
    )
    .ok();

    output
}

#[derive(Debug, PartialEq, Eq)]
enum Category {
    Display,
    Enumeration,
    IdentityDecoder,
    Execution(usize),
    Config,
    Generic,
}

fn classify(error: &anyhow::Error) -> Category {
    for cause in error.chain() {
        if let Some(err) = cause.downcast_ref::<ExecutionError>() {
            return Category::Execution(err.failures.len());
        }
        if let Some(err) = cause.downcast_ref::<ScanError>() {
            if !err.is_enumeration() {
                return Category::IdentityDecoder;
            }
            return match err {
                ScanError::Enumeration(ToolError::Failed { stderr, .. })
                    if stderr.contains("open display") =>
                {
                    Category::Display
                }
                _ => Category::Enumeration,
            };
        }
        if cause.downcast_ref::<IdentityDecodeError>().is_some() {
            return Category::IdentityDecoder;
        }
    }

    let error_msg = error.to_string();
    if error_msg.contains("config") {
        Category::Config
    } else {
        Category::Generic
    }
}

fn format_display_error(output: &mut String) {
    writeln!(output, "X Display Unavailable").ok();
    writeln!(output).ok();
    writeln!(output, "xrandr could not connect to the X server.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Wrong display selected").ok();
    writeln!(output, "     → Check: echo $DISPLAY").ok();
    writeln!(output, "     → Set [session] display in config.toml").ok();
    writeln!(output, "     → Or pass: --display :1").ok();
    writeln!(output).ok();
    writeln!(output, "  2. No X session running").ok();
    writeln!(output, "     → Run from inside the graphical session").ok();
    writeln!(output, "     → Wayland sessions need XWayland for xrandr").ok();
}

fn format_enumeration_error(output: &mut String) {
    writeln!(output, "Output Discovery Error").ok();
    writeln!(output).ok();
    writeln!(output, "Could not list display outputs with xrandr.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. xrandr is not installed").ok();
    writeln!(output, "     → Debian/Ubuntu: sudo apt install x11-xserver-utils").ok();
    writeln!(output, "     → Fedora: sudo dnf install xrandr").ok();
    writeln!(output).ok();
    writeln!(output, "  2. xrandr lives elsewhere").ok();
    writeln!(output, "     → Check: which xrandr").ok();
    writeln!(output, "     → Set [tools] xrandr in config.toml").ok();
    writeln!(output).ok();
    writeln!(output, "  3. xrandr hung").ok();
    writeln!(output, "     → Raise [tools] timeout_secs in config.toml").ok();
}

fn format_decoder_error(output: &mut String) {
    writeln!(output, "EDID Decoder Error").ok();
    writeln!(output).ok();
    writeln!(output, "Could not run edid-decode to identify a monitor.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. edid-decode is not installed").ok();
    writeln!(output, "     → Debian/Ubuntu: sudo apt install edid-decode").ok();
    writeln!(output, "     → Fedora: sudo dnf install edid-decode").ok();
    writeln!(output).ok();
    writeln!(output, "  2. edid-decode lives elsewhere").ok();
    writeln!(output, "     → Set [tools] edid_decode in config.toml").ok();
}

fn format_execution_error(output: &mut String, count: usize) {
    writeln!(output, "Display Arrangement Incomplete").ok();
    writeln!(output).ok();
    writeln!(
        output,
        "{} xrandr call(s) failed; the remaining outputs were still configured.",
        count
    )
    .ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Combined size exceeds the screen limit").ok();
    writeln!(output, "     → Check 'maximum' in: xrandr --current").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Outputs changed too quickly").ok();
    writeln!(output, "     → Raise [layout] settle_ms in config.toml").ok();
    writeln!(output).ok();
    writeln!(output, "  3. Not enough CRTCs for every connected output").ok();
    writeln!(output, "     → Disable an output or use the laptop mode").ok();
}

fn format_config_error(output: &mut String) {
    writeln!(output, "Configuration Error").ok();
    writeln!(output).ok();
    writeln!(output, "Problem with configuration file.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Configuration file not found").ok();
    writeln!(
        output,
        "     → Default location: ~/.config/xrandr-arrange/config.toml"
    )
    .ok();
    writeln!(output, "     → Or specify: display-mode -c /path/to/config.toml").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Invalid TOML syntax").ok();
    writeln!(output, "     → Check for typos, missing quotes, etc.").ok();
    writeln!(output).ok();
    writeln!(output, "  3. Invalid values").ok();
    writeln!(output, "     → The message above names the offending field").ok();
}

fn format_generic_error(output: &mut String, error: &str) {
    writeln!(output, "Display Setup Error").ok();
    writeln!(output).ok();
    writeln!(output, "An error occurred while arranging displays.").ok();
    writeln!(output).ok();
    writeln!(output, "Error: {}", error).ok();
    writeln!(output).ok();
    writeln!(output, "Troubleshooting:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Check the outputs xrandr sees:").ok();
    writeln!(output, "     → xrandr --properties").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Verify you're in an X session:").ok();
    writeln!(output, "     → echo $XDG_SESSION_TYPE (should be 'x11')").ok();
}
