use derive_more::Display;
use std::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::operation::{DiffKind, DiffOperation};

/// Represents the status of a diff hunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DiffHunkStatus {
    /// The hunk represents added content (only exists in the right buffer)
    #[display(fmt = "Added")]
    Added,

    /// The hunk represents deleted content (only exists in the left buffer)
    #[display(fmt = "Deleted")]
    Deleted,

    /// The hunk replaces left content with right content
    #[display(fmt = "Modified")]
    Modified,
}

/// Represents a range of chars in one of the buffers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DiffHunkRange {
    /// The starting char offset (0-based)
    pub start: usize,

    /// The number of chars
    pub count: usize,
}

impl DiffHunkRange {
    /// Create a new range from start and count
    pub fn new(start: usize, count: usize) -> Self {
        Self { start, count }
    }

    /// Create a range from a start and end (exclusive)
    pub fn from_range(range: Range<usize>) -> Self {
        Self {
            start: range.start,
            count: range.end - range.start,
        }
    }

    /// Convert to a standard Range
    pub fn to_range(&self) -> Range<usize> {
        self.start..(self.start + self.count)
    }

    /// Get the end of the range (exclusive)
    pub fn end(&self) -> usize {
        self.start + self.count
    }

    /// Check if this range is empty
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Check if this range contains the given offset
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end()
    }
}

/// A maximal run of non-equal operations.
///
/// Hunks are derived from an operation sequence on demand and are never
/// stored alongside it, so they can't go stale when the diff is recomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DiffHunk {
    /// The status of the hunk
    pub status: DiffHunkStatus,

    /// Indices of the operations that make up this hunk
    pub operations: Range<usize>,

    /// The chars covered in the left buffer
    pub old_range: DiffHunkRange,

    /// The chars covered in the right buffer
    pub new_range: DiffHunkRange,
}

impl DiffHunk {
    /// Check if the operation at `index` belongs to this hunk
    pub fn contains_operation(&self, index: usize) -> bool {
        self.operations.contains(&index)
    }
}

/// Find the operation paired with the one at `index`.
///
/// A `Delete` pairs with an adjacent `Insert` and vice versa, forming a
/// modified region. The following neighbour is preferred over the preceding
/// one. `Equal` operations and unpaired changes return `None`.
pub fn pair_of(ops: &[DiffOperation], index: usize) -> Option<usize> {
    let wanted = ops.get(index)?.kind.opposite()?;
    let is_wanted = |i: usize| ops.get(i).map(|op| op.kind) == Some(wanted);

    if is_wanted(index + 1) {
        Some(index + 1)
    } else if index > 0 && is_wanted(index - 1) {
        Some(index - 1)
    } else {
        None
    }
}

/// Group the operations into hunks
pub fn hunks(ops: &[DiffOperation]) -> Vec<DiffHunk> {
    let mut result = Vec::new();
    let mut old_pos = 0;
    let mut new_pos = 0;
    let mut index = 0;

    while index < ops.len() {
        if ops[index].kind == DiffKind::Equal {
            let len = ops[index].char_len();
            old_pos += len;
            new_pos += len;
            index += 1;
            continue;
        }

        let start = index;
        let old_start = old_pos;
        let new_start = new_pos;
        while index < ops.len() && ops[index].kind != DiffKind::Equal {
            let len = ops[index].char_len();
            match ops[index].kind {
                DiffKind::Delete => old_pos += len,
                DiffKind::Insert => new_pos += len,
                DiffKind::Equal => {}
            }
            index += 1;
        }

        let old_count = old_pos - old_start;
        let new_count = new_pos - new_start;
        let status = match (old_count > 0, new_count > 0) {
            (true, true) => DiffHunkStatus::Modified,
            (true, false) => DiffHunkStatus::Deleted,
            _ => DiffHunkStatus::Added,
        };

        result.push(DiffHunk {
            status,
            operations: start..index,
            old_range: DiffHunkRange::new(old_start, old_count),
            new_range: DiffHunkRange::new(new_start, new_count),
        });
    }

    result
}

/// Summary counts for an edit script
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DiffStats {
    pub inserted_chars: usize,
    pub deleted_chars: usize,
    pub unchanged_chars: usize,
    pub hunks: usize,
}

impl DiffStats {
    pub fn of(ops: &[DiffOperation]) -> Self {
        let mut stats = ops.iter().fold(Self::default(), |mut stats, op| {
            let len = op.char_len();
            match op.kind {
                DiffKind::Equal => stats.unchanged_chars += len,
                DiffKind::Insert => stats.inserted_chars += len,
                DiffKind::Delete => stats.deleted_chars += len,
            }
            stats
        });
        stats.hunks = hunks(ops).len();
        stats
    }

    /// Check if the diff has any changes
    pub fn has_changes(&self) -> bool {
        self.inserted_chars > 0 || self.deleted_chars > 0
    }
}
