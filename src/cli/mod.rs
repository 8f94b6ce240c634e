//! Command-line plumbing shared by `display-mode` and `setup-displays`

use anyhow::{Context, Result};
use clap::Args;
use tracing::{debug, info, warn};

use crate::arrange::{
    plan_and_execute, Configurator, DryRunConfigurator, Executor, Plan, Policy, XrandrConfigurator,
};
use crate::config::Config;
use crate::discovery::{Output, XrandrScanner};
use crate::identity::EdidDecodeTool;

/// Flags accepted by both binaries
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Configuration file path
    #[arg(short, long, env = "XRANDR_ARRANGE_CONFIG")]
    pub config: Option<String>,

    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log format (json|pretty|compact)
    #[arg(long, default_value = "pretty")]
    pub log_format: String,

    /// Write logs to file (in addition to stderr)
    #[arg(long)]
    pub log_file: Option<String>,

    /// Print the xrandr calls instead of running them
    #[arg(long)]
    pub dry_run: bool,

    /// X display to act on (overrides [session] display)
    #[arg(long)]
    pub display: Option<String>,
}

impl CommonArgs {
    /// Install logging as requested by the flags
    pub fn init_logging(&self) -> Result<()> {
        crate::logging::init_logging(self.verbose, &self.log_format, self.log_file.as_deref())
    }

    /// Load configuration and apply the CLI overrides
    pub fn load_config(&self) -> Result<Config> {
        let config = Config::load_or_default(self.config.as_deref())?;
        let config = config.with_overrides(self.display.clone());

        info!("Configuration loaded successfully");
        debug!("Config: {:?}", config);
        Ok(config)
    }
}

/// Output scanner built from the tool configuration
pub fn scanner(config: &Config) -> XrandrScanner<EdidDecodeTool> {
    let runner = config.tool_runner();
    let decoder = EdidDecodeTool::new(&config.tools.edid_decode, runner.clone());
    XrandrScanner::new(&config.tools.xrandr, runner, decoder)
}

/// Executor applying actions through xrandr, or printing them on a dry run
pub fn executor(config: &Config, dry_run: bool) -> Executor<Box<dyn Configurator>> {
    let configurator: Box<dyn Configurator> = if dry_run {
        Box::new(DryRunConfigurator::new(&config.tools.xrandr))
    } else {
        Box::new(XrandrConfigurator::new(&config.tools.xrandr, config.tool_runner()))
    };
    Executor::new(configurator, config.settle_interval())
}

/// Enumerate outputs on the configured display
pub async fn scan_outputs(config: &Config) -> Result<Vec<Output>> {
    let outputs = scanner(config)
        .scan()
        .await
        .with_context(|| format!("Output discovery on display {} failed", config.session.display))?;

    for output in &outputs {
        debug!(
            "{} {} serial={:?}",
            output.name,
            if output.connected { "connected" } else { "disconnected" },
            output.serial
        );
    }
    Ok(outputs)
}

/// Scan, plan with `policy` and apply
pub async fn apply_policy(config: &Config, policy: &Policy, dry_run: bool) -> Result<Plan> {
    let outputs = scan_outputs(config).await?;
    let executor = executor(config, dry_run);

    let plan = plan_and_execute(&outputs, policy, &executor)
        .await
        .with_context(|| format!("Applying {} failed", policy))?;

    if plan.is_empty() {
        info!("Nothing to do for {}", policy);
    } else {
        info!("Applied {} ({} actions)", policy, plan.actions.len());
    }
    Ok(plan)
}

/// Run the configured wallpaper command.
///
/// Failures are logged and otherwise ignored.
pub async fn run_wallpaper(config: &Config) {
    let Some((program, args)) = config.wallpaper_command() else {
        debug!("No wallpaper command configured");
        return;
    };

    match config.tool_runner().run(&program, &args).await {
        Ok(_) => info!("Wallpaper set with {}", program),
        Err(e) => warn!("Wallpaper command failed: {}", e),
    }
}
