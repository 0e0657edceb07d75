//! Post-processing passes over a raw edit script.
//!
//! All passes work on `char` sequences so that offsets never fall inside a
//! multi-byte UTF-8 sequence. The passes keep the reconstruction invariant:
//! `Equal + Delete` always rebuilds the left text and `Equal + Insert` the
//! right text.

use crate::operation::{DiffKind, DiffOperation};

/// An operation whose text is kept as chars while the passes run
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Chunk {
    pub kind: DiffKind,
    pub chars: Vec<char>,
}

impl Chunk {
    pub fn new(kind: DiffKind, chars: Vec<char>) -> Self {
        Self { kind, chars }
    }

    pub fn into_operation(self) -> DiffOperation {
        DiffOperation::new(self.kind, self.chars.into_iter().collect::<String>())
    }
}

/// Number of chars shared at the start of both sequences
pub(crate) fn common_prefix(a: &[char], b: &[char]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Number of chars shared at the end of both sequences
pub(crate) fn common_suffix(a: &[char], b: &[char]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}

/// Length of the longest suffix of `a` that is also a prefix of `b`
pub(crate) fn common_overlap(a: &[char], b: &[char]) -> usize {
    let max = a.len().min(b.len());
    (1..=max)
        .rev()
        .find(|&k| a[a.len() - k..] == b[..k])
        .unwrap_or(0)
}

/// Normalize an edit script until it is stable.
///
/// Drops empty operations, merges runs of the same kind, orders every changed
/// region as `Delete` then `Insert`, factors text shared by a paired delete and
/// insert into the surrounding equalities and slides single edits over
/// neighbouring equalities when that removes one of them.
pub(crate) fn merge(diffs: &mut Vec<Chunk>) {
    loop {
        merge_runs(diffs);
        if !shift_single_edits(diffs) {
            break;
        }
    }
}

fn merge_runs(diffs: &mut Vec<Chunk>) {
    let mut out: Vec<Chunk> = Vec::with_capacity(diffs.len());
    let mut deleted: Vec<char> = Vec::new();
    let mut inserted: Vec<char> = Vec::new();

    for chunk in diffs.drain(..) {
        if chunk.chars.is_empty() {
            continue;
        }
        match chunk.kind {
            DiffKind::Delete => deleted.extend(chunk.chars),
            DiffKind::Insert => inserted.extend(chunk.chars),
            DiffKind::Equal => {
                flush_changes(&mut out, &mut deleted, &mut inserted, chunk.chars);
            }
        }
    }
    flush_changes(&mut out, &mut deleted, &mut inserted, Vec::new());

    *diffs = out;
}

/// Emit the changes collected since the last equality, followed by `following`
fn flush_changes(
    out: &mut Vec<Chunk>,
    deleted: &mut Vec<char>,
    inserted: &mut Vec<char>,
    mut following: Vec<char>,
) {
    if !deleted.is_empty() && !inserted.is_empty() {
        let prefix = common_prefix(inserted, deleted);
        if prefix > 0 {
            let shared: Vec<char> = inserted.drain(..prefix).collect();
            deleted.drain(..prefix);
            push_equal(out, shared);
        }

        let suffix = common_suffix(inserted, deleted);
        if suffix > 0 {
            let mut shared = inserted.split_off(inserted.len() - suffix);
            deleted.truncate(deleted.len() - suffix);
            shared.append(&mut following);
            following = shared;
        }
    }

    if !deleted.is_empty() {
        out.push(Chunk::new(DiffKind::Delete, std::mem::take(deleted)));
    }
    if !inserted.is_empty() {
        out.push(Chunk::new(DiffKind::Insert, std::mem::take(inserted)));
    }
    push_equal(out, following);
}

fn push_equal(out: &mut Vec<Chunk>, chars: Vec<char>) {
    if chars.is_empty() {
        return;
    }
    match out.last_mut() {
        Some(last) if last.kind == DiffKind::Equal => last.chars.extend(chars),
        _ => out.push(Chunk::new(DiffKind::Equal, chars)),
    }
}

/// Slide single edits over a neighbouring equality they repeat, e.g.
/// `a<ba>c` becomes `<ab>ac` and `a<cb>c` becomes `ac<bc>`
fn shift_single_edits(diffs: &mut Vec<Chunk>) -> bool {
    let mut changed = false;
    let mut i = 1;
    while i + 1 < diffs.len() {
        if diffs[i - 1].kind == DiffKind::Equal && diffs[i + 1].kind == DiffKind::Equal {
            let prev = diffs[i - 1].chars.clone();
            let cur = diffs[i].chars.clone();
            let next = diffs[i + 1].chars.clone();

            if cur.ends_with(&prev) {
                let mut shifted = prev.clone();
                shifted.extend_from_slice(&cur[..cur.len() - prev.len()]);
                let mut following = prev;
                following.extend(next);
                diffs[i].chars = shifted;
                diffs[i + 1].chars = following;
                diffs.remove(i - 1);
                changed = true;
            } else if cur.starts_with(&next) {
                let mut preceding = prev;
                preceding.extend_from_slice(&next);
                let mut shifted = cur[next.len()..].to_vec();
                shifted.extend(next);
                diffs[i - 1].chars = preceding;
                diffs[i].chars = shifted;
                diffs.remove(i + 1);
                changed = true;
            }
        }
        i += 1;
    }
    changed
}

/// Merge adjacent operations of the same kind and drop empty ones, without
/// moving any boundary between different kinds
pub(crate) fn coalesce(diffs: &mut Vec<Chunk>) {
    let mut out: Vec<Chunk> = Vec::with_capacity(diffs.len());
    for chunk in diffs.drain(..) {
        if chunk.chars.is_empty() {
            continue;
        }
        match out.last_mut() {
            Some(last) if last.kind == chunk.kind => last.chars.extend(chunk.chars),
            _ => out.push(chunk),
        }
    }
    *diffs = out;
}

/// Fold short equalities into the surrounding edits when keeping them apart
/// costs more than `edit_cost` chars of overhead.
///
/// An equality shorter than `edit_cost` is removed when it has both an insert
/// and a delete on each side, or when it is shorter than half of `edit_cost`
/// and three of those four neighbours exist. An `edit_cost` of zero never
/// merges anything.
pub(crate) fn cleanup_efficiency(diffs: &mut Vec<Chunk>, edit_cost: usize) {
    let mut changes = false;
    // Indices of equalities that are candidates for folding
    let mut equalities: Vec<usize> = Vec::new();
    let mut last_equality: Option<Vec<char>> = None;
    let mut pointer: isize = 0;
    // Is there an insertion/deletion before/after the last equality
    let mut pre_ins = false;
    let mut pre_del = false;
    let mut post_ins = false;
    let mut post_del = false;

    while (pointer as usize) < diffs.len() {
        let p = pointer as usize;
        if diffs[p].kind == DiffKind::Equal {
            if diffs[p].chars.len() < edit_cost && (post_ins || post_del) {
                equalities.push(p);
                pre_ins = post_ins;
                pre_del = post_del;
                last_equality = Some(diffs[p].chars.clone());
            } else {
                equalities.clear();
                last_equality = None;
            }
            post_ins = false;
            post_del = false;
        } else {
            if diffs[p].kind == DiffKind::Delete {
                post_del = true;
            } else {
                post_ins = true;
            }

            if let Some(equality) = last_equality.clone() {
                let sides = [pre_ins, pre_del, post_ins, post_del]
                    .iter()
                    .filter(|&&present| present)
                    .count();
                let surrounded = sides == 4;
                let cheap = equality.len() * 2 < edit_cost && sides == 3;

                if surrounded || cheap {
                    if let Some(&at) = equalities.last() {
                        diffs.insert(at, Chunk::new(DiffKind::Delete, equality));
                        diffs[at + 1].kind = DiffKind::Insert;
                        equalities.pop();
                        last_equality = None;

                        if pre_ins && pre_del {
                            // No changes made which could affect previous entry, keep going
                            post_ins = true;
                            post_del = true;
                            equalities.clear();
                        } else {
                            equalities.pop();
                            pointer = equalities.last().map_or(-1, |&i| i as isize);
                            post_ins = false;
                            post_del = false;
                        }
                        changes = true;
                    }
                }
            }
        }
        pointer += 1;
    }

    if changes {
        merge(diffs);
    }
}

/// Fold equalities that are no longer than the edits around them, then align
/// the remaining edits to natural boundaries and split overlapping
/// delete/insert pairs.
pub(crate) fn cleanup_semantic(diffs: &mut Vec<Chunk>) {
    let mut changes = false;
    let mut equalities: Vec<usize> = Vec::new();
    let mut last_equality: Option<Vec<char>> = None;
    let mut pointer: isize = 0;
    // Chars changed before and after the last equality
    let mut inserted_before = 0usize;
    let mut deleted_before = 0usize;
    let mut inserted_after = 0usize;
    let mut deleted_after = 0usize;

    while (pointer as usize) < diffs.len() {
        let p = pointer as usize;
        if diffs[p].kind == DiffKind::Equal {
            equalities.push(p);
            inserted_before = inserted_after;
            deleted_before = deleted_after;
            inserted_after = 0;
            deleted_after = 0;
            last_equality = Some(diffs[p].chars.clone());
        } else {
            if diffs[p].kind == DiffKind::Insert {
                inserted_after += diffs[p].chars.len();
            } else {
                deleted_after += diffs[p].chars.len();
            }

            if let Some(equality) = last_equality.clone() {
                let len = equality.len();
                if len <= inserted_before.max(deleted_before)
                    && len <= inserted_after.max(deleted_after)
                {
                    if let Some(&at) = equalities.last() {
                        diffs.insert(at, Chunk::new(DiffKind::Delete, equality));
                        diffs[at + 1].kind = DiffKind::Insert;
                        // Drop the folded equality and re-evaluate the one before it
                        equalities.pop();
                        equalities.pop();
                        pointer = equalities.last().map_or(-1, |&i| i as isize);
                        inserted_before = 0;
                        deleted_before = 0;
                        inserted_after = 0;
                        deleted_after = 0;
                        last_equality = None;
                        changes = true;
                    }
                }
            }
        }
        pointer += 1;
    }

    if changes {
        merge(diffs);
    }
    cleanup_semantic_lossless(diffs);
    split_overlaps(diffs);
}

/// Slide single edits surrounded by equalities to the position with the best
/// boundary score, e.g. `The c<at c>ame.` becomes `The <cat >came.`
pub(crate) fn cleanup_semantic_lossless(diffs: &mut Vec<Chunk>) {
    let mut i = 1;
    while i + 1 < diffs.len() {
        if diffs[i - 1].kind == DiffKind::Equal && diffs[i + 1].kind == DiffKind::Equal {
            let mut before = diffs[i - 1].chars.clone();
            let mut edit = diffs[i].chars.clone();
            let mut after = diffs[i + 1].chars.clone();

            // Shift the edit as far left as possible
            let offset = common_suffix(&before, &edit);
            if offset > 0 {
                let shared = edit[edit.len() - offset..].to_vec();
                before.truncate(before.len() - offset);
                let mut shifted = shared.clone();
                shifted.extend_from_slice(&edit[..edit.len() - offset]);
                edit = shifted;
                let mut following = shared;
                following.extend(after);
                after = following;
            }

            // Then walk right one char at a time, keeping the best fit
            let mut best = (before.clone(), edit.clone(), after.clone());
            let mut best_score = boundary_score(&before, &edit) + boundary_score(&edit, &after);
            while !after.is_empty() && edit.first() == after.first() {
                let c = after.remove(0);
                before.push(c);
                edit.rotate_left(1);
                let score = boundary_score(&before, &edit) + boundary_score(&edit, &after);
                // The >= encourages trailing rather than leading whitespace on edits
                if score >= best_score {
                    best_score = score;
                    best = (before.clone(), edit.clone(), after.clone());
                }
            }

            if diffs[i - 1].chars != best.0 {
                let (best_before, best_edit, best_after) = best;
                let mut removed = 0;
                diffs[i].chars = best_edit;
                if best_after.is_empty() {
                    diffs.remove(i + 1);
                    removed += 1;
                } else {
                    diffs[i + 1].chars = best_after;
                }
                if best_before.is_empty() {
                    diffs.remove(i - 1);
                    removed += 1;
                } else {
                    diffs[i - 1].chars = best_before;
                }
                i = i.saturating_sub(removed);
            }
        }
        i += 1;
    }
}

/// Score how natural the boundary between `one` and `two` is, from 6 (edge
/// of the text) down to 0 (inside a word)
fn boundary_score(one: &[char], two: &[char]) -> u8 {
    let (Some(&c1), Some(&c2)) = (one.last(), two.first()) else {
        return 6;
    };

    let non_alnum1 = !c1.is_alphanumeric();
    let non_alnum2 = !c2.is_alphanumeric();
    let whitespace1 = non_alnum1 && c1.is_whitespace();
    let whitespace2 = non_alnum2 && c2.is_whitespace();
    let line_break1 = whitespace1 && (c1 == '\n' || c1 == '\r');
    let line_break2 = whitespace2 && (c2 == '\n' || c2 == '\r');
    let blank_line1 = line_break1 && ends_with_blank_line(one);
    let blank_line2 = line_break2 && starts_with_blank_line(two);

    if blank_line1 || blank_line2 {
        5
    } else if line_break1 || line_break2 {
        4
    } else if non_alnum1 && !whitespace1 && whitespace2 {
        // End of sentence
        3
    } else if whitespace1 || whitespace2 {
        2
    } else if non_alnum1 || non_alnum2 {
        1
    } else {
        0
    }
}

/// Matches `\n\r?\n$`
fn ends_with_blank_line(text: &[char]) -> bool {
    text.ends_with(&['\n', '\n']) || text.ends_with(&['\n', '\r', '\n'])
}

/// Matches `^\r?\n\r?\n`
fn starts_with_blank_line(text: &[char]) -> bool {
    let rest = text.strip_prefix(&['\r']).unwrap_or(text);
    let Some(rest) = rest.strip_prefix(&['\n']) else {
        return false;
    };
    let rest = rest.strip_prefix(&['\r']).unwrap_or(rest);
    rest.starts_with(&['\n'])
}

/// Split a delete/insert pair around their common overlap when the overlap
/// covers at least half of either side, e.g. `<del>abcxxx</del><ins>xxxdef</ins>`
/// becomes `<del>abc</del>xxx<ins>def</ins>`
fn split_overlaps(diffs: &mut Vec<Chunk>) {
    let mut i = 1;
    while i < diffs.len() {
        if diffs[i - 1].kind == DiffKind::Delete && diffs[i].kind == DiffKind::Insert {
            let deletion = diffs[i - 1].chars.clone();
            let insertion = diffs[i].chars.clone();
            let forward = common_overlap(&deletion, &insertion);
            let reverse = common_overlap(&insertion, &deletion);

            if forward >= reverse {
                if forward > 0
                    && (forward * 2 >= deletion.len() || forward * 2 >= insertion.len())
                {
                    diffs.insert(i, Chunk::new(DiffKind::Equal, insertion[..forward].to_vec()));
                    diffs[i - 1].chars = deletion[..deletion.len() - forward].to_vec();
                    diffs[i + 1].chars = insertion[forward..].to_vec();
                    i += 1;
                }
            } else if reverse * 2 >= deletion.len() || reverse * 2 >= insertion.len() {
                // Reverse overlap, the insert now comes first
                diffs.insert(i, Chunk::new(DiffKind::Equal, deletion[..reverse].to_vec()));
                diffs[i - 1] = Chunk::new(
                    DiffKind::Insert,
                    insertion[..insertion.len() - reverse].to_vec(),
                );
                diffs[i + 1] = Chunk::new(DiffKind::Delete, deletion[reverse..].to_vec());
                i += 1;
            }
            i += 1;
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn chunks(parts: &[(DiffKind, &str)]) -> Vec<Chunk> {
        parts.iter()
            .map(|(kind, text)| Chunk::new(*kind, text.chars().collect()))
            .collect()
    }

    use DiffKind::{Delete as D, Equal as E, Insert as I};

    #[test]
    fn overlap_lengths() {
        let c = |s: &str| s.chars().collect::<Vec<_>>();
        assert_eq!(common_overlap(&c("abcxxx"), &c("xxxdef")), 3);
        assert_eq!(common_overlap(&c("abc"), &c("abc")), 3);
        assert_eq!(common_overlap(&c("abc"), &c("xyz")), 0);
        assert_eq!(common_overlap(&c(""), &c("abc")), 0);
    }

    #[test]
    fn merge_joins_runs_and_factors_affixes() {
        let mut diffs = chunks(&[(E, "a"), (D, "b"), (D, "c"), (E, ""), (I, "d"), (E, "e")]);
        merge(&mut diffs);
        assert_eq!(diffs, chunks(&[(E, "a"), (D, "bc"), (I, "d"), (E, "e")]));

        let mut diffs = chunks(&[(E, "x"), (D, "abc"), (I, "abd"), (E, "y")]);
        merge(&mut diffs);
        assert_eq!(diffs, chunks(&[(E, "xab"), (D, "c"), (I, "d"), (E, "y")]));

        let mut diffs = chunks(&[(I, "a"), (D, "b"), (I, "c")]);
        merge(&mut diffs);
        assert_eq!(diffs, chunks(&[(D, "b"), (I, "ac")]));
    }

    #[test]
    fn merge_slides_single_edits() {
        let mut diffs = chunks(&[(E, "a"), (I, "ba"), (E, "c")]);
        merge(&mut diffs);
        assert_eq!(diffs, chunks(&[(I, "ab"), (E, "ac")]));

        let mut diffs = chunks(&[(E, "a"), (I, "cb"), (E, "c")]);
        merge(&mut diffs);
        assert_eq!(diffs, chunks(&[(E, "ac"), (I, "bc")]));
    }

    #[test]
    fn efficiency_folds_surrounded_equalities() {
        let mut diffs = chunks(&[
            (D, "ab"),
            (I, "12"),
            (E, "xyz"),
            (D, "cd"),
            (I, "34"),
        ]);
        cleanup_efficiency(&mut diffs, 4);
        assert_eq!(diffs, chunks(&[(D, "abxyzcd"), (I, "12xyz34")]));
    }

    #[test]
    fn efficiency_keeps_long_equalities() {
        let original = chunks(&[
            (D, "ab"),
            (I, "12"),
            (E, "wxyz"),
            (D, "cd"),
            (I, "34"),
        ]);
        let mut diffs = original.clone();
        cleanup_efficiency(&mut diffs, 4);
        assert_eq!(diffs, original);
    }

    #[test]
    fn efficiency_three_sided_fold() {
        let mut diffs = chunks(&[(I, "12"), (E, "x"), (D, "cd"), (I, "34")]);
        cleanup_efficiency(&mut diffs, 4);
        assert_eq!(diffs, chunks(&[(D, "xcd"), (I, "12x34")]));
    }

    #[test]
    fn efficiency_with_zero_cost_is_a_no_op() {
        let original = chunks(&[(D, "ab"), (I, "12"), (E, "x"), (D, "cd"), (I, "34")]);
        let mut diffs = original.clone();
        cleanup_efficiency(&mut diffs, 0);
        assert_eq!(diffs, original);
    }

    #[test]
    fn semantic_folds_small_equalities() {
        let mut diffs = chunks(&[(D, "a"), (E, "b"), (D, "c")]);
        cleanup_semantic(&mut diffs);
        assert_eq!(diffs, chunks(&[(D, "abc"), (I, "b")]));
    }

    #[test]
    fn semantic_splits_overlaps() {
        let mut diffs = chunks(&[(D, "abcxxx"), (I, "xxxdef")]);
        cleanup_semantic(&mut diffs);
        assert_eq!(diffs, chunks(&[(D, "abc"), (E, "xxx"), (I, "def")]));

        let mut diffs = chunks(&[(D, "xxxabc"), (I, "defxxx")]);
        cleanup_semantic(&mut diffs);
        assert_eq!(diffs, chunks(&[(I, "def"), (E, "xxx"), (D, "abc")]));
    }

    #[test]
    fn lossless_aligns_to_word_boundaries() {
        let mut diffs = chunks(&[(E, "The c"), (I, "ow and the c"), (E, "at.")]);
        cleanup_semantic_lossless(&mut diffs);
        assert_eq!(diffs, chunks(&[(E, "The "), (I, "cow and the "), (E, "cat.")]));
    }

    #[test]
    fn lossless_prefers_line_breaks() {
        let mut diffs = chunks(&[(E, "AAA\r\n\r\nBBB"), (I, " DDD\r\n\r\nBBB"), (E, " EEE")]);
        cleanup_semantic_lossless(&mut diffs);
        assert_eq!(
            diffs,
            chunks(&[(E, "AAA\r\n\r\n"), (I, "BBB DDD\r\n\r\n"), (E, "BBB EEE")])
        );
    }
}
