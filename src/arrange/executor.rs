//! Plan execution against xrandr

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{Action, ActionFailure, ActionKind, ExecutionError, Placement};
use crate::tools::{ToolError, ToolRunner};

/// Configuration call failures
#[derive(Error, Debug)]
pub enum ConfigureError {
    /// The configuration tool failed to run or exited unsuccessfully
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// xrandr ran but refused the request; carries its error output
    #[error("xrandr rejected the request: {0}")]
    Rejected(String),
}

/// Applies one action to the display system
#[async_trait]
pub trait Configurator: Send + Sync {
    /// Apply `action`
    async fn apply(&self, action: &Action) -> Result<(), ConfigureError>;
}

#[async_trait]
impl<T: Configurator + ?Sized> Configurator for Box<T> {
    async fn apply(&self, action: &Action) -> Result<(), ConfigureError> {
        (**self).apply(action).await
    }
}

/// xrandr arguments for `action`
///
/// Enable: `--output <name> --auto [--primary] [--left-of|--right-of|--above|--same-as <anchor>]`
///
/// Disable: `--output <name> --off`
pub fn xrandr_args(action: &Action) -> Vec<String> {
    let mut args = vec!["--output".to_string(), action.target.clone()];

    match &action.kind {
        ActionKind::Enable(placement) => {
            args.push("--auto".to_string());
            match placement {
                Placement::Primary => args.push("--primary".to_string()),
                Placement::Standalone => {}
                Placement::Relative { relation, anchor } => {
                    args.push(relation.xrandr_flag().to_string());
                    args.push(anchor.clone());
                }
            }
        }
        ActionKind::Disable => args.push("--off".to_string()),
    }

    args
}

/// [`Configurator`] that runs xrandr once per action
#[derive(Debug, Clone)]
pub struct XrandrConfigurator {
    program: String,
    runner: ToolRunner,
}

impl XrandrConfigurator {
    /// Create a configurator running `program`
    pub fn new(program: impl Into<String>, runner: ToolRunner) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }
}

#[async_trait]
impl Configurator for XrandrConfigurator {
    async fn apply(&self, action: &Action) -> Result<(), ConfigureError> {
        match self.runner.run(&self.program, &xrandr_args(action)).await {
            Ok(_) => Ok(()),
            Err(ToolError::Failed { stderr, .. }) if !stderr.is_empty() => {
                Err(ConfigureError::Rejected(stderr))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// [`Configurator`] that prints the xrandr command lines instead of running them
#[derive(Debug, Clone)]
pub struct DryRunConfigurator {
    program: String,
}

impl DryRunConfigurator {
    /// Create a dry-run configurator that reports commands for `program`
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Command line that would run for `action`
    pub fn command_line(&self, action: &Action) -> String {
        format!("{} {}", self.program, xrandr_args(action).join(" "))
    }
}

#[async_trait]
impl Configurator for DryRunConfigurator {
    async fn apply(&self, action: &Action) -> Result<(), ConfigureError> {
        println!("{}", self.command_line(action));
        Ok(())
    }
}

/// Runs plans one action at a time
pub struct Executor<C> {
    configurator: C,
    settle: Duration,
}

impl<C: Configurator> Executor<C> {
    /// Create an executor that waits `settle` after each successful action
    pub fn new(configurator: C, settle: Duration) -> Self {
        Self {
            configurator,
            settle,
        }
    }

    /// The configurator actions are applied through
    pub fn configurator(&self) -> &C {
        &self.configurator
    }

    /// Apply `actions` in order.
    ///
    /// A failed action is recorded and the next one is issued immediately;
    /// the settle pause only follows successful actions, and not the last.
    ///
    /// # Errors
    ///
    /// [`ExecutionError`] listing every failed action, after all were tried.
    pub async fn execute(&self, actions: &[Action]) -> Result<(), ExecutionError> {
        let mut failures = Vec::new();

        for (idx, action) in actions.iter().enumerate() {
            debug!("Action {}/{}: {}", idx + 1, actions.len(), action);

            match self.configurator.apply(action).await {
                Ok(()) => {
                    info!("Applied: {}", action);
                    if idx + 1 < actions.len() && !self.settle.is_zero() {
                        tokio::time::sleep(self.settle).await;
                    }
                }
                Err(error) => {
                    warn!("Failed to {}: {}", action, error);
                    failures.push(ActionFailure {
                        action: action.clone(),
                        error,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ExecutionError {
                attempted: actions.len(),
                failures,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrange::Relation;
    use std::sync::Mutex;
    use std::time::Instant;

    /// Records applied actions with timestamps, failing the named targets
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(Action, Instant)>>,
        fail: Vec<String>,
    }

    impl Recorder {
        fn failing(targets: &[&str]) -> Self {
            Self {
                fail: targets.iter().map(|t| t.to_string()).collect(),
                ..Default::default()
            }
        }

        fn actions(&self) -> Vec<Action> {
            self.calls.lock().unwrap().iter().map(|(a, _)| a.clone()).collect()
        }
    }

    #[async_trait]
    impl Configurator for Recorder {
        async fn apply(&self, action: &Action) -> Result<(), ConfigureError> {
            self.calls.lock().unwrap().push((action.clone(), Instant::now()));
            if self.fail.contains(&action.target) {
                return Err(ConfigureError::Rejected(format!("cannot configure {}", action.target)));
            }
            Ok(())
        }
    }

    #[test]
    fn test_xrandr_args_enable_primary() {
        assert_eq!(
            xrandr_args(&Action::primary("DP2")),
            vec!["--output", "DP2", "--auto", "--primary"]
        );
    }

    #[test]
    fn test_xrandr_args_enable_relative() {
        assert_eq!(
            xrandr_args(&Action::relative("DP1", Relation::LeftOf, "DP2")),
            vec!["--output", "DP1", "--auto", "--left-of", "DP2"]
        );
        assert_eq!(
            xrandr_args(&Action::relative("HDMI1", Relation::SameAs, "eDP1")),
            vec!["--output", "HDMI1", "--auto", "--same-as", "eDP1"]
        );
    }

    #[test]
    fn test_xrandr_args_enable_standalone_and_disable() {
        assert_eq!(xrandr_args(&Action::standalone("eDP1")), vec!["--output", "eDP1", "--auto"]);
        assert_eq!(xrandr_args(&Action::disable("VGA1")), vec!["--output", "VGA1", "--off"]);
    }

    #[test]
    fn test_dry_run_command_line() {
        let dry = DryRunConfigurator::new("/usr/bin/xrandr");
        assert_eq!(
            dry.command_line(&Action::relative("HDMI1", Relation::Above, "eDP1")),
            "/usr/bin/xrandr --output HDMI1 --auto --above eDP1"
        );
    }

    #[tokio::test]
    async fn test_execute_applies_in_order() {
        let executor = Executor::new(Recorder::default(), Duration::ZERO);
        let actions = vec![
            Action::primary("DP2"),
            Action::relative("DP1", Relation::LeftOf, "DP2"),
            Action::disable("eDP1"),
        ];

        executor.execute(&actions).await.unwrap();

        assert_eq!(executor.configurator().actions(), actions);
    }

    #[tokio::test]
    async fn test_execute_continues_after_failure() {
        let executor = Executor::new(Recorder::failing(&["HDMI1"]), Duration::ZERO);
        let actions = vec![
            Action::standalone("eDP1"),
            Action::disable("HDMI1"),
            Action::disable("DP1"),
        ];

        let err = executor.execute(&actions).await.unwrap_err();

        assert_eq!(executor.configurator().actions(), actions);
        assert_eq!(err.attempted, 3);
        assert_eq!(err.failures.len(), 1);
        assert_eq!(err.failures[0].action, Action::disable("HDMI1"));
    }

    #[tokio::test]
    async fn test_execute_collects_every_failure() {
        let executor = Executor::new(Recorder::failing(&["DP1", "DP2"]), Duration::ZERO);
        let actions = vec![Action::disable("DP1"), Action::disable("DP2")];

        let err = executor.execute(&actions).await.unwrap_err();

        let failed: Vec<&str> = err.failures.iter().map(|f| f.action.target.as_str()).collect();
        assert_eq!(failed, vec!["DP1", "DP2"]);
    }

    #[tokio::test]
    async fn test_execute_settles_between_actions() {
        let settle = Duration::from_millis(50);
        let executor = Executor::new(Recorder::default(), settle);
        let actions = vec![Action::primary("DP2"), Action::relative("DP1", Relation::LeftOf, "DP2")];

        let start = Instant::now();
        executor.execute(&actions).await.unwrap();

        let calls = executor.configurator().calls.lock().unwrap();
        assert!(calls[1].1.duration_since(calls[0].1) >= settle);
        // No pause after the final action
        assert!(start.elapsed() < settle * 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_xrandr_error_output_is_rejection() {
        // sh refuses the leading --output option with a message on stderr
        let xrandr = XrandrConfigurator::new("sh", ToolRunner::default());
        let err = xrandr.apply(&Action::disable("VGA1")).await.unwrap_err();
        match err {
            ConfigureError::Rejected(stderr) => assert!(!stderr.is_empty()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_xrandr_silent_failure_is_tool_error() {
        let xrandr = XrandrConfigurator::new("false", ToolRunner::default());
        let err = xrandr.apply(&Action::standalone("eDP1")).await.unwrap_err();
        assert!(matches!(err, ConfigureError::Tool(ToolError::Failed { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_xrandr_missing_program_is_tool_error() {
        let xrandr = XrandrConfigurator::new("/nonexistent/xrandr", ToolRunner::default());
        let err = xrandr.apply(&Action::standalone("eDP1")).await.unwrap_err();
        assert!(matches!(err, ConfigureError::Tool(ToolError::Spawn { .. })));
    }

    #[tokio::test]
    async fn test_execute_empty_plan() {
        let executor = Executor::new(Recorder::default(), Duration::from_secs(5));
        executor.execute(&[]).await.unwrap();
        assert!(executor.configurator().actions().is_empty());
    }
}
