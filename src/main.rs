//! display-mode - switch the display arrangement by mode name
//!
//! Entry point for the mode-selector binary.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use xrandr_arrange::arrange::{Mode, ModeSelector};
use xrandr_arrange::cli::{self, CommonArgs};

const PROGRAM: &str = "display-mode";

/// Command-line arguments for display-mode
#[derive(Parser, Debug)]
#[command(name = "display-mode")]
#[command(version, about = "Arrange connected displays by mode name", long_about = None)]
pub struct Args {
    /// Mode to apply (`list` prints the available modes)
    pub mode: Option<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    args.common.init_logging()?;

    info!("{} v{}", PROGRAM, env!("CARGO_PKG_VERSION"));

    let config = match args.common.load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", xrandr_arrange::utils::format_user_error(&e));
            return Err(e);
        }
    };

    let selector = ModeSelector::standard(&config.displays.panel);
    let mode = match selector.select_arg(args.mode.as_deref()) {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("{}: {}\n", PROGRAM, e);
            eprint!("{}", selector.usage(PROGRAM));
            std::process::exit(1);
        }
    };

    match mode {
        Mode::List => {
            for name in selector.names() {
                println!("{}", name);
            }
        }
        Mode::Apply(policy) => {
            info!("Selected mode: {}", policy);
            let plan = match cli::apply_policy(&config, policy, args.common.dry_run).await {
                Ok(plan) => plan,
                Err(e) => {
                    eprintln!("{}", xrandr_arrange::utils::format_user_error(&e));
                    return Err(e);
                }
            };

            for warning in &plan.warnings {
                eprintln!("warning: {}", warning);
            }
        }
    }

    Ok(())
}
