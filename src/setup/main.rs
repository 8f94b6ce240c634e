//! setup-displays - apply the fixed dual-monitor layout
//!
//! Places the monitor with the right serial as primary, the left one beside
//! it, turns everything else off and then sets the wallpaper.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use xrandr_arrange::cli::{self, CommonArgs};

/// Command-line arguments for setup-displays
#[derive(Parser, Debug)]
#[command(name = "setup-displays")]
#[command(version, about = "Arrange the two known monitors by EDID serial", long_about = None)]
pub struct Args {
    #[command(flatten)]
    pub common: CommonArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    args.common.init_logging()?;

    info!("setup-displays v{}", env!("CARGO_PKG_VERSION"));

    let config = match args.common.load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", xrandr_arrange::utils::format_user_error(&e));
            return Err(e);
        }
    };

    let policy = config.identity_pair();
    let result = cli::apply_policy(&config, &policy, args.common.dry_run).await;

    // The wallpaper follows whatever layout was reached
    if args.common.dry_run {
        info!("Dry run, skipping wallpaper");
    } else {
        cli::run_wallpaper(&config).await;
    }

    match result {
        Ok(plan) => {
            for warning in &plan.warnings {
                eprintln!("warning: {}", warning);
            }
            info!("Display setup complete");
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", xrandr_arrange::utils::format_user_error(&e));
            Err(e)
        }
    }
}
