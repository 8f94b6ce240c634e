//! Arrangement Policy Engine
//!
//! Maps discovered outputs to an ordered list of enable/disable actions and
//! applies them through xrandr.
//!
//! # Overview
//!
//! Planning and execution are separate steps:
//!
//! 1. **Plan** - [`Policy::plan`] is a pure function from the scanned
//!    [`Output`]s to a [`Plan`]: the ordered [`Action`]s plus any
//!    [`PlanWarning`]s about outputs the policy could not address.
//! 2. **Execute** - [`Executor::execute`] applies each action through a
//!    [`Configurator`], pausing for the settle interval after every
//!    successful action so the X server finishes a mode change before the
//!    next action positions another output relative to it.
//!
//! # Ordering
//!
//! Every plan satisfies, and [`check_ordering`] verifies:
//!
//! - an output used as an anchor is enabled before the output placed relative to it
//! - disables come after all enables
//! - no output is both enabled and disabled
//!
//! # Failures
//!
//! A failing action does not stop the plan. Failures are collected and
//! returned together as an [`ExecutionError`] once every action was tried.

mod executor;
mod modes;
mod policy;

pub use executor::{Configurator, ConfigureError, DryRunConfigurator, Executor, XrandrConfigurator};
pub use modes::{Mode, ModeSelector, UsageError};
pub use policy::Policy;

use std::collections::HashSet;
use std::fmt;

use thiserror::Error;
use tracing::{info, warn};

use crate::discovery::Output;

/// Position of an output relative to its anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// To the left of the anchor
    LeftOf,
    /// To the right of the anchor
    RightOf,
    /// Above the anchor
    Above,
    /// Mirroring the anchor
    SameAs,
}

impl Relation {
    /// xrandr flag for this relation
    pub fn xrandr_flag(self) -> &'static str {
        match self {
            Relation::LeftOf => "--left-of",
            Relation::RightOf => "--right-of",
            Relation::Above => "--above",
            Relation::SameAs => "--same-as",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.xrandr_flag().trim_start_matches("--"))
    }
}

/// How an enabled output is placed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Auto geometry, marked primary
    Primary,

    /// Auto geometry, no positional directive
    Standalone,

    /// Auto geometry, positioned relative to `anchor`
    Relative {
        /// Relation to the anchor
        relation: Relation,
        /// Name of the anchor output
        anchor: String,
    },
}

impl Placement {
    /// Anchor output referenced by this placement
    pub fn anchor(&self) -> Option<&str> {
        match self {
            Placement::Relative { anchor, .. } => Some(anchor),
            _ => None,
        }
    }
}

/// What an action does to its target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    /// Turn the output on with the given placement
    Enable(Placement),
    /// Turn the output off
    Disable,
}

/// One unit of configuration work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    /// Output name this action applies to
    pub target: String,
    /// Enable or disable
    pub kind: ActionKind,
}

impl Action {
    /// Enable `target` with `placement`
    pub fn enable(target: impl Into<String>, placement: Placement) -> Self {
        Self {
            target: target.into(),
            kind: ActionKind::Enable(placement),
        }
    }

    /// Enable `target` as the primary output
    pub fn primary(target: impl Into<String>) -> Self {
        Self::enable(target, Placement::Primary)
    }

    /// Enable `target` with auto geometry
    pub fn standalone(target: impl Into<String>) -> Self {
        Self::enable(target, Placement::Standalone)
    }

    /// Enable `target` positioned relative to `anchor`
    pub fn relative(target: impl Into<String>, relation: Relation, anchor: impl Into<String>) -> Self {
        Self::enable(
            target,
            Placement::Relative {
                relation,
                anchor: anchor.into(),
            },
        )
    }

    /// Disable `target`
    pub fn disable(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            kind: ActionKind::Disable,
        }
    }

    /// Whether this action enables its target
    pub fn is_enable(&self) -> bool {
        matches!(self.kind, ActionKind::Enable(_))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ActionKind::Enable(Placement::Primary) => write!(f, "enable {} (primary)", self.target),
            ActionKind::Enable(Placement::Standalone) => write!(f, "enable {}", self.target),
            ActionKind::Enable(Placement::Relative { relation, anchor }) => {
                write!(f, "enable {} ({} {})", self.target, relation, anchor)
            }
            ActionKind::Disable => write!(f, "disable {}", self.target),
        }
    }
}

/// Non-fatal planning outcome worth reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanWarning {
    /// The output a policy anchors on is absent or disconnected
    MissingAnchor {
        /// Expected anchor output name
        anchor: String,
    },

    /// The identity pair was not found among connected outputs
    PairNotFound {
        /// Serial of the left monitor was seen
        left_found: bool,
        /// Serial of the right monitor was seen
        right_found: bool,
    },
}

impl fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanWarning::MissingAnchor { anchor } => {
                write!(f, "output {} is not connected; nothing is positioned relative to it", anchor)
            }
            PlanWarning::PairNotFound {
                left_found,
                right_found,
            } => {
                let missing = match (*left_found, *right_found) {
                    (false, false) => "left and right monitors",
                    (false, true) => "left monitor",
                    _ => "right monitor",
                };
                write!(f, "{} not present; enabling all connected outputs", missing)
            }
        }
    }
}

/// Ordered actions computed by a policy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    /// Actions in execution order
    pub actions: Vec<Action>,
    /// Reportable degradations
    pub warnings: Vec<PlanWarning>,
}

impl Plan {
    /// Whether there is nothing to do
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Ordering invariant violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// An action is placed relative to an output not enabled before it
    #[error("{target} is placed relative to {anchor}, which is not enabled earlier in the plan")]
    AnchorNotEnabled {
        /// Output being placed
        target: String,
        /// Its anchor
        anchor: String,
    },

    /// An enable follows a disable
    #[error("enable of {target} comes after a disable")]
    EnableAfterDisable {
        /// Output being enabled
        target: String,
    },

    /// The same output is enabled and disabled
    #[error("{target} is both enabled and disabled")]
    Conflicting {
        /// Output concerned
        target: String,
    },
}

/// Verify the ordering invariants of `actions`
pub fn check_ordering(actions: &[Action]) -> Result<(), PlanError> {
    let mut enabled: HashSet<&str> = HashSet::new();
    let mut disabled: HashSet<&str> = HashSet::new();

    for action in actions {
        match &action.kind {
            ActionKind::Enable(placement) => {
                if !disabled.is_empty() {
                    return Err(PlanError::EnableAfterDisable {
                        target: action.target.clone(),
                    });
                }
                if let Some(anchor) = placement.anchor() {
                    if !enabled.contains(anchor) {
                        return Err(PlanError::AnchorNotEnabled {
                            target: action.target.clone(),
                            anchor: anchor.to_string(),
                        });
                    }
                }
                enabled.insert(action.target.as_str());
            }
            ActionKind::Disable => {
                if enabled.contains(action.target.as_str()) {
                    return Err(PlanError::Conflicting {
                        target: action.target.clone(),
                    });
                }
                disabled.insert(action.target.as_str());
            }
        }
    }

    Ok(())
}

/// A single action that failed to apply
#[derive(Debug)]
pub struct ActionFailure {
    /// The action attempted
    pub action: Action,
    /// Why it failed
    pub error: ConfigureError,
}

impl fmt::Display for ActionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.action, self.error)
    }
}

/// One or more actions of a plan failed
#[derive(Error, Debug)]
#[error("{} of {attempted} display actions failed: {}", .failures.len(), join_failures(.failures))]
pub struct ExecutionError {
    /// Number of actions attempted
    pub attempted: usize,
    /// Failed actions in plan order
    pub failures: Vec<ActionFailure>,
}

fn join_failures(failures: &[ActionFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Plan `outputs` with `policy` and apply the result with `executor`.
///
/// Plan warnings are logged and returned with the plan; they never stop
/// execution.
///
/// # Errors
///
/// Returns [`ExecutionError`] after the whole plan ran if any action failed.
pub async fn plan_and_execute<C: Configurator>(
    outputs: &[Output],
    policy: &Policy,
    executor: &Executor<C>,
) -> Result<Plan, ExecutionError> {
    let plan = policy.plan(outputs);
    debug_assert!(check_ordering(&plan.actions).is_ok(), "policy produced an unordered plan");

    for warning in &plan.warnings {
        warn!("{}", warning);
    }

    info!("Applying {} with {} actions", policy, plan.actions.len());
    executor.execute(&plan.actions).await?;
    Ok(plan)
}
