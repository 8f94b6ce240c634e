//! Built-in arrangement policies
//!
//! Each policy is a pure function from scanned outputs to a [`Plan`].

use std::fmt;

use tracing::debug;

use super::{Action, Plan, PlanWarning, Relation};
use crate::discovery::Output;

/// Named arrangement strategy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Policy {
    /// Fixed dual-monitor layout keyed by EDID serial.
    ///
    /// Right is primary, left sits to its left, everything else is turned off.
    /// Falls back to enabling every connected output when either monitor is
    /// missing.
    IdentityPair {
        /// Serial of the monitor placed on the left
        left_serial: String,
        /// Serial of the primary monitor on the right
        right_serial: String,
    },

    /// Only the built-in panel
    LaptopOnly {
        /// Connector name of the built-in panel
        panel: String,
    },

    /// Built-in panel first, every other connected output placed `relation` it
    Arrange {
        /// Connector name of the built-in panel
        panel: String,
        /// Placement of the other outputs relative to the panel
        relation: Relation,
    },
}

impl Policy {
    /// Compute the plan for `outputs`
    pub fn plan(&self, outputs: &[Output]) -> Plan {
        let plan = match self {
            Policy::IdentityPair {
                left_serial,
                right_serial,
            } => identity_pair(outputs, left_serial, right_serial),
            Policy::LaptopOnly { panel } => laptop_only(outputs, panel),
            Policy::Arrange { panel, relation } => arrange(outputs, panel, *relation),
        };

        debug!(
            "{} planned {} actions, {} warnings",
            self,
            plan.actions.len(),
            plan.warnings.len()
        );
        plan
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::IdentityPair { .. } => f.write_str("identity-pair layout"),
            Policy::LaptopOnly { panel } => write!(f, "{} only", panel),
            Policy::Arrange { panel, relation } => write!(f, "arrange {} {}", relation, panel),
        }
    }
}

fn connected_panel<'a>(outputs: &'a [Output], panel: &str) -> Option<&'a Output> {
    outputs.iter().find(|o| o.name == panel && o.connected)
}

fn identity_pair(outputs: &[Output], left_serial: &str, right_serial: &str) -> Plan {
    let find = move |serial: &str| {
        outputs
            .iter()
            .find(|o| o.connected && !o.serial.is_empty() && o.serial == serial)
    };

    match (find(left_serial), find(right_serial)) {
        (Some(left), Some(right)) if left.name != right.name => {
            debug!("Output {} is left, {} is right", left.name, right.name);

            let mut actions = vec![
                Action::primary(&right.name),
                Action::relative(&left.name, Relation::LeftOf, &right.name),
            ];
            actions.extend(
                outputs
                    .iter()
                    .filter(|o| o.name != left.name && o.name != right.name)
                    .map(|o| Action::disable(&o.name)),
            );

            Plan {
                actions,
                warnings: Vec::new(),
            }
        }
        (left, right) => {
            let mut connected = outputs.iter().filter(|o| o.connected);
            let mut actions: Vec<Action> = connected
                .next()
                .map(|first| Action::primary(&first.name))
                .into_iter()
                .chain(connected.map(|o| Action::standalone(&o.name)))
                .collect();
            actions.extend(
                outputs
                    .iter()
                    .filter(|o| !o.connected)
                    .map(|o| Action::disable(&o.name)),
            );

            Plan {
                actions,
                warnings: vec![PlanWarning::PairNotFound {
                    left_found: left.is_some(),
                    right_found: right.is_some(),
                }],
            }
        }
    }
}

fn laptop_only(outputs: &[Output], panel: &str) -> Plan {
    let mut warnings = Vec::new();
    if connected_panel(outputs, panel).is_none() {
        warnings.push(PlanWarning::MissingAnchor {
            anchor: panel.to_string(),
        });
    }

    let mut actions = vec![Action::standalone(panel)];
    actions.extend(
        outputs
            .iter()
            .filter(|o| o.name != panel)
            .map(|o| Action::disable(&o.name)),
    );

    Plan { actions, warnings }
}

fn arrange(outputs: &[Output], panel: &str, relation: Relation) -> Plan {
    let others = outputs.iter().filter(|o| o.connected && o.name != panel);

    if connected_panel(outputs, panel).is_none() {
        return Plan {
            actions: others.map(|o| Action::standalone(&o.name)).collect(),
            warnings: vec![PlanWarning::MissingAnchor {
                anchor: panel.to_string(),
            }],
        };
    }

    let mut actions = vec![Action::standalone(panel)];
    actions.extend(others.map(|o| Action::relative(&o.name, relation, panel)));

    Plan {
        actions,
        warnings: Vec::new(),
    }
}
