use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::info;
use text_diff::{
    apply_hunk_action, render_inline, DiffConfig, DiffKind, DiffOperation, DiffStats, Side,
};

pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Diff the contents of two files
pub fn diff_files(left: &Path, right: &Path, config: &DiffConfig) -> Result<Vec<DiffOperation>> {
    let left_text = read_text(left)?;
    let right_text = read_text(right)?;
    Ok(config.diff(&left_text, &right_text))
}

/// Inline rendering of `ops`, optionally followed by a summary line
pub fn render_report(ops: &[DiffOperation], color: bool, stats: bool) -> String {
    let mut report = render_inline(ops, color);
    if stats {
        let stats = DiffStats::of(ops);
        if !report.is_empty() && !report.ends_with('\n') {
            report.push('\n');
        }
        report.push_str(&format!(
            "{} hunks, {} chars inserted, {} deleted, {} unchanged\n",
            stats.hunks, stats.inserted_chars, stats.deleted_chars, stats.unchanged_chars
        ));
    }
    report
}

/// Position of the `n`-th change (1-based) among all operations
pub fn change_index(ops: &[DiffOperation], n: usize) -> Option<usize> {
    ops.iter()
        .enumerate()
        .filter(|(_, op)| op.kind != DiffKind::Equal)
        .nth(n.checked_sub(1)?)
        .map(|(index, _)| index)
}

/// Act on the `n`-th change from `side`. Returns the rebuilt content of that
/// side, writing it back to the side's file when `write` is set.
pub fn apply_change(
    left: &Path,
    right: &Path,
    config: &DiffConfig,
    n: usize,
    side: Side,
    write: bool,
) -> Result<String> {
    let ops = diff_files(left, right, config)?;
    let changes = ops.iter().filter(|op| op.is_change()).count();
    let index = change_index(&ops, n)
        .ok_or_else(|| anyhow!("no change #{} ({} changes found)", n, changes))?;

    let content = apply_hunk_action(&ops, index, side)?;
    if write {
        let path = match side {
            Side::Left => left,
            Side::Right => right,
        };
        fs::write(path, &content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("Wrote change #{} into {}", n, path.display());
    }
    Ok(content)
}
