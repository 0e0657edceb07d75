use derive_more::Display;
use log::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::engine::compute_diff;
use crate::lines::split_by_lines;
use crate::operation::DiffOperation;

/// Largest accepted edit cost
pub const MAX_EDIT_COST: u8 = 10;

/// Edit cost used when none is configured
pub const DEFAULT_EDIT_COST: u8 = 4;

/// Post-processing policy applied to the raw edit script
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CleanupMode {
    /// Align edits with word and line boundaries for human review
    #[default]
    #[display(fmt = "semantic")]
    Semantic,

    /// Merge small edits whose separation costs more than the edit cost
    #[display(fmt = "efficiency")]
    Efficiency,
}

/// Parameters of a diff computation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DiffConfig {
    /// Sensitivity of the efficiency cleanup, 0..=10
    pub edit_cost: u8,

    /// Cleanup pass to run after the edit script is computed
    pub cleanup: CleanupMode,

    /// Re-segment the operations at line boundaries
    pub split_by_line: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            edit_cost: DEFAULT_EDIT_COST,
            cleanup: CleanupMode::default(),
            split_by_line: false,
        }
    }
}

impl DiffConfig {
    /// Set the edit cost, clamping values above [`MAX_EDIT_COST`]
    pub fn edit_cost(mut self, edit_cost: u8) -> Self {
        self.edit_cost = clamp_edit_cost(edit_cost);
        self
    }

    pub fn cleanup(mut self, cleanup: CleanupMode) -> Self {
        self.cleanup = cleanup;
        self
    }

    pub fn split_by_line(mut self, split_by_line: bool) -> Self {
        self.split_by_line = split_by_line;
        self
    }

    /// Diff two texts with this configuration
    pub fn diff(&self, left: &str, right: &str) -> Vec<DiffOperation> {
        let ops = compute_diff(left, right, self.edit_cost, self.cleanup);
        split_by_lines(ops, self.split_by_line)
    }
}

pub(crate) fn clamp_edit_cost(edit_cost: u8) -> u8 {
    if edit_cost > MAX_EDIT_COST {
        warn!(
            "edit cost {} is out of range, clamping to {}",
            edit_cost, MAX_EDIT_COST
        );
        MAX_EDIT_COST
    } else {
        edit_cost
    }
}
