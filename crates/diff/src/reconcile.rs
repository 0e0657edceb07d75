//! Rebuild buffer content after the user acts on a single change.

use derive_more::Display;
use log::debug;

use crate::hunk::pair_of;
use crate::operation::{DiffKind, DiffOperation, Side};

/// Why a hunk action could not be applied
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ReconcileError {
    #[display(fmt = "operation index {} is out of range for {} operations", index, len)]
    IndexOutOfRange { index: usize, len: usize },

    #[display(fmt = "operation {} is unchanged text and has no action", index)]
    NotAChange { index: usize },
}

impl std::error::Error for ReconcileError {}

/// What acting on an operation does to the buffer of the acting side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum HunkAction {
    /// Drop the side's own unpaired text
    #[display(fmt = "remove")]
    Removal,

    /// Replace the side's own text with the paired text from the other side
    #[display(fmt = "replace")]
    Substitution { pair: usize },

    /// Take over text that only exists on the other side, replacing the
    /// side's own paired text when there is one
    #[display(fmt = "accept")]
    Acceptance { replaces: Option<usize> },
}

/// Decide what acting on `ops[index]` from `side` means
pub fn hunk_action(
    ops: &[DiffOperation],
    index: usize,
    side: Side,
) -> Result<HunkAction, ReconcileError> {
    let op = ops.get(index).ok_or(ReconcileError::IndexOutOfRange {
        index,
        len: ops.len(),
    })?;

    if op.kind == DiffKind::Equal {
        return Err(ReconcileError::NotAChange { index });
    }

    let pair = pair_of(ops, index);
    let action = if op.kind == side.own_kind() {
        match pair {
            Some(pair) => HunkAction::Substitution { pair },
            None => HunkAction::Removal,
        }
    } else {
        HunkAction::Acceptance { replaces: pair }
    };

    Ok(action)
}

/// Rebuild the full content of `side` after acting on `ops[index]`.
///
/// Only the acted-upon change is affected: diffing the result against the
/// untouched other side no longer shows that hunk, every other hunk stays.
pub fn apply_hunk_action(
    ops: &[DiffOperation],
    index: usize,
    side: Side,
) -> Result<String, ReconcileError> {
    let action = hunk_action(ops, index, side)?;
    debug!("applying {} on operation {} from the {} side", action, index, side);

    let mut content = String::new();
    for (i, op) in ops.iter().enumerate() {
        match action {
            HunkAction::Removal => {
                if i != index && op.belongs_to(side) {
                    content.push_str(&op.text);
                }
            }
            HunkAction::Substitution { pair } => {
                if i == index {
                    content.push_str(&ops[pair].text);
                } else if op.belongs_to(side) {
                    content.push_str(&op.text);
                }
            }
            HunkAction::Acceptance { replaces } => {
                if i == index {
                    content.push_str(&op.text);
                } else if Some(i) != replaces && op.belongs_to(side) {
                    content.push_str(&op.text);
                }
            }
        }
    }

    Ok(content)
}
