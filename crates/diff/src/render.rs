use crate::operation::{DiffKind, DiffOperation};

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

/// Render an edit script inline, like `git diff --word-diff`.
///
/// Deletions are wrapped in `[-...-]` and insertions in `{+...+}`; with
/// `color` the markers are also painted red and green.
pub fn render_inline(ops: &[DiffOperation], color: bool) -> String {
    let mut result = String::new();

    for op in ops {
        let (open, close, paint) = match op.kind {
            DiffKind::Equal => {
                result.push_str(&op.text);
                continue;
            }
            DiffKind::Delete => ("[-", "-]", RED),
            DiffKind::Insert => ("{+", "+}", GREEN),
        };

        if color {
            result.push_str(paint);
        }
        result.push_str(open);
        result.push_str(&op.text);
        result.push_str(close);
        if color {
            result.push_str(RESET);
        }
    }

    result
}
