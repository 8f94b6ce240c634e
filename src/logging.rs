//! Logging initialisation shared by the binaries

use std::fs::File;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Filter directive used when `RUST_LOG` is unset
pub fn default_directive(verbose: u8) -> String {
    let log_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    format!(
        "xrandr_arrange={level},display_mode={level},setup_displays={level},warn",
        level = log_level
    )
}

/// Install the global subscriber.
///
/// Logs go to stderr in `log_format` (json|pretty|compact), and to
/// `log_file` as well when given. Standard output stays free for mode
/// listings and dry-run command lines.
pub fn init_logging(verbose: u8, log_format: &str, log_file: Option<&str>) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive(verbose)));

    let mut layers: Vec<BoxedLayer> = Vec::new();

    match log_format {
        "json" => layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .boxed(),
        ),
        "compact" => layers.push(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .boxed(),
        ),
        _ => layers.push(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(std::io::stderr)
                .boxed(),
        ),
    }

    // If log file is specified, write to both stderr and file
    if let Some(log_file_path) = log_file {
        let file = File::create(log_file_path)
            .with_context(|| format!("Failed to create log file: {}", log_file_path))?;

        let file_layer = match log_format {
            "json" => tracing_subscriber::fmt::layer()
                .json()
                .with_writer(file)
                .with_ansi(false)
                .boxed(),
            "compact" => tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(file)
                .with_ansi(false)
                .boxed(),
            _ => tracing_subscriber::fmt::layer()
                .with_writer(file)
                .with_ansi(false)
                .boxed(),
        };
        layers.push(file_layer);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .context("Failed to initialise logging")?;

    if let Some(log_file_path) = log_file {
        info!("Logging to file: {}", log_file_path);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_by_verbosity() {
        assert_eq!(
            default_directive(0),
            "xrandr_arrange=info,display_mode=info,setup_displays=info,warn"
        );
        assert!(default_directive(1).starts_with("xrandr_arrange=debug,display_mode=debug,"));
        assert!(default_directive(3).contains("setup_displays=trace"));
    }

    #[test]
    fn test_default_directive_parses() {
        for verbose in 0..3 {
            assert!(tracing_subscriber::EnvFilter::try_new(default_directive(verbose)).is_ok());
        }
    }
}
