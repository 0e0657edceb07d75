use crate::operation::DiffOperation;

/// Re-segment an edit script at line boundaries.
///
/// When `enabled`, every operation is cut after each `\n`; the newline stays at
/// the end of its segment and the kind is kept. A trailing empty segment is
/// never emitted, so `"a\n"` stays one operation while `"a\nb"` becomes
/// `"a\n"` and `"b"`. When disabled the input is returned unchanged.
pub fn split_by_lines(ops: Vec<DiffOperation>, enabled: bool) -> Vec<DiffOperation> {
    if !enabled {
        return ops;
    }

    let mut result = Vec::with_capacity(ops.len());
    for op in ops {
        if !op.text.contains('\n') {
            result.push(op);
            continue;
        }
        result.extend(
            op.text
                .split_inclusive('\n')
                .map(|segment| DiffOperation::new(op.kind, segment)),
        );
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{left_text, right_text, DiffKind};
    use pretty_assertions::assert_eq;

    #[test]
    fn disabled_is_identity() {
        let ops = vec![DiffOperation::equal("a\nb\n")];
        assert_eq!(split_by_lines(ops.clone(), false), ops);
    }

    #[test]
    fn keeps_newlines_at_segment_ends() {
        let ops = vec![
            DiffOperation::equal("one\ntwo"),
            DiffOperation::delete("\n\nthree\n"),
            DiffOperation::insert("x"),
        ];
        let split = split_by_lines(ops.clone(), true);

        assert_eq!(
            split,
            vec![
                DiffOperation::equal("one\n"),
                DiffOperation::equal("two"),
                DiffOperation::delete("\n"),
                DiffOperation::delete("\n"),
                DiffOperation::delete("three\n"),
                DiffOperation::insert("x"),
            ]
        );
        assert_eq!(left_text(&split), left_text(&ops));
        assert_eq!(right_text(&split), right_text(&ops));
    }

    #[test]
    fn no_trailing_empty_segment() {
        let split = split_by_lines(vec![DiffOperation::new(DiffKind::Insert, "line\n")], true);
        assert_eq!(split, vec![DiffOperation::insert("line\n")]);
    }
}
