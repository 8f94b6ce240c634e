//! Mode Selector
//!
//! The fixed table of named modes accepted on the command line.

use std::collections::BTreeMap;

use thiserror::Error;

use super::{Policy, Relation};

/// Invalid mode selection
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UsageError {
    /// No mode was given
    #[error("no mode given")]
    MissingMode,

    /// The mode name is not in the table
    #[error("unknown mode '{0}'")]
    UnknownMode(String),
}

/// What a mode does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Arrange outputs with a policy
    Apply(Policy),
    /// Print the available mode names
    List,
}

#[derive(Debug, Clone)]
struct ModeEntry {
    description: &'static str,
    mode: Mode,
}

/// Immutable name → mode table, built once per invocation
#[derive(Debug, Clone)]
pub struct ModeSelector {
    modes: BTreeMap<&'static str, ModeEntry>,
}

impl ModeSelector {
    /// The standard mode set for a machine whose built-in panel is `panel`
    pub fn standard(panel: &str) -> Self {
        let arrange = |relation| Mode::Apply(Policy::Arrange {
            panel: panel.to_string(),
            relation,
        });

        let mut modes = BTreeMap::new();
        modes.insert(
            "laptop",
            ModeEntry {
                description: "enable only the integrated display.",
                mode: Mode::Apply(Policy::LaptopOnly {
                    panel: panel.to_string(),
                }),
            },
        );
        modes.insert(
            "mirror",
            ModeEntry {
                description: "mirror integrated display to all connected displays.",
                mode: arrange(Relation::SameAs),
            },
        );
        modes.insert(
            "arrange-right",
            ModeEntry {
                description: "arrange all connected displays with integrated display on the left.",
                mode: arrange(Relation::RightOf),
            },
        );
        modes.insert(
            "arrange-left",
            ModeEntry {
                description: "arrange all connected displays with integrated display on the right.",
                mode: arrange(Relation::LeftOf),
            },
        );
        modes.insert(
            "arrange-above",
            ModeEntry {
                description: "arrange all connected displays with integrated display on the bottom.",
                mode: arrange(Relation::Above),
            },
        );
        modes.insert(
            "list",
            ModeEntry {
                description: "list the available modes.",
                mode: Mode::List,
            },
        );

        Self { modes }
    }

    /// Mode names in lexicographic order
    pub fn names(&self) -> Vec<&'static str> {
        self.modes.keys().copied().collect()
    }

    /// Look up `name`
    pub fn select(&self, name: &str) -> Result<&Mode, UsageError> {
        self.modes
            .get(name)
            .map(|entry| &entry.mode)
            .ok_or_else(|| UsageError::UnknownMode(name.to_string()))
    }

    /// Look up an optional command-line argument
    pub fn select_arg(&self, name: Option<&str>) -> Result<&Mode, UsageError> {
        self.select(name.ok_or(UsageError::MissingMode)?)
    }

    /// Usage text listing every mode with its description
    pub fn usage(&self, program: &str) -> String {
        let mut text = format!("Usage: {} <mode>\n\nmode should be one of:\n", program);
        for (name, entry) in &self.modes {
            text.push_str(&format!("- {}: {}\n", name, entry.description));
        }
        text
    }
}
