use log::trace;
use similar::{capture_diff_slices, Algorithm, DiffTag};

use crate::cleanup::{self, Chunk};
use crate::config::{clamp_edit_cost, CleanupMode};
use crate::operation::{DiffKind, DiffOperation};

/// Compute a character level edit script between two texts.
///
/// The result covers both inputs exactly: `Equal + Delete` operations rebuild
/// `left` and `Equal + Insert` operations rebuild `right`. The output only
/// depends on the arguments.
pub fn compute_diff(
    left: &str,
    right: &str,
    edit_cost: u8,
    cleanup: CleanupMode,
) -> Vec<DiffOperation> {
    // Trivial cases skip the edit script entirely
    if left == right {
        if left.is_empty() {
            return Vec::new();
        }
        return vec![DiffOperation::equal(left)];
    }
    if left.is_empty() {
        return vec![DiffOperation::insert(right)];
    }
    if right.is_empty() {
        return vec![DiffOperation::delete(left)];
    }

    let old: Vec<char> = left.chars().collect();
    let new: Vec<char> = right.chars().collect();

    let mut chunks = edit_script(&old, &new);
    cleanup::merge(&mut chunks);

    match cleanup {
        CleanupMode::Semantic => cleanup::cleanup_semantic(&mut chunks),
        CleanupMode::Efficiency => {
            cleanup::cleanup_efficiency(&mut chunks, clamp_edit_cost(edit_cost) as usize)
        }
    }
    cleanup::coalesce(&mut chunks);

    trace!(
        "diffed {} and {} chars into {} operations ({} cleanup)",
        old.len(),
        new.len(),
        chunks.len(),
        cleanup
    );

    chunks.into_iter().map(Chunk::into_operation).collect()
}

/// Raw Myers edit script over two char slices
fn edit_script(old: &[char], new: &[char]) -> Vec<Chunk> {
    let ops = capture_diff_slices(Algorithm::Myers, old, new);
    let mut chunks = Vec::with_capacity(ops.len() + 1);

    for op in ops {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        match tag {
            DiffTag::Equal => chunks.push(Chunk::new(DiffKind::Equal, old[old_range].to_vec())),
            DiffTag::Delete => chunks.push(Chunk::new(DiffKind::Delete, old[old_range].to_vec())),
            DiffTag::Insert => chunks.push(Chunk::new(DiffKind::Insert, new[new_range].to_vec())),
            DiffTag::Replace => {
                chunks.push(Chunk::new(DiffKind::Delete, old[old_range].to_vec()));
                chunks.push(Chunk::new(DiffKind::Insert, new[new_range].to_vec()));
            }
        }
    }

    chunks
}
