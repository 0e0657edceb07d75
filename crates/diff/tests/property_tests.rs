use proptest::prelude::*;
use text_diff::{
    apply_hunk_action, compute_diff, hunk_action, left_text, pair_of, right_text, side_text,
    split_by_lines, CleanupMode, DiffOperation, HunkAction, Side,
};

fn cleanup_mode() -> impl Strategy<Value = CleanupMode> {
    prop_oneof![Just(CleanupMode::Semantic), Just(CleanupMode::Efficiency)]
}

// A small alphabet makes shared runs, and therefore cleanup work, likely
fn small_text() -> impl Strategy<Value = String> {
    "[ab \n.]{0,40}"
}

proptest! {
    #[test]
    fn round_trip_rebuilds_both_sides(
        left in small_text(),
        right in small_text(),
        cost in 0u8..=10,
        mode in cleanup_mode(),
    ) {
        let ops = compute_diff(&left, &right, cost, mode);

        prop_assert_eq!(left_text(&ops), left);
        prop_assert_eq!(right_text(&ops), right);
        prop_assert!(ops.iter().all(|op| !op.text.is_empty()));
        prop_assert!(ops.windows(2).all(|pair| pair[0].kind != pair[1].kind));
    }

    #[test]
    fn round_trip_with_any_unicode(
        left in "\\PC{0,24}",
        right in "\\PC{0,24}",
        cost in 0u8..=10,
        mode in cleanup_mode(),
    ) {
        let ops = compute_diff(&left, &right, cost, mode);

        prop_assert_eq!(left_text(&ops), left);
        prop_assert_eq!(right_text(&ops), right);
    }

    #[test]
    fn diff_is_deterministic(
        left in small_text(),
        right in small_text(),
        cost in 0u8..=10,
        mode in cleanup_mode(),
    ) {
        prop_assert_eq!(
            compute_diff(&left, &right, cost, mode),
            compute_diff(&left, &right, cost, mode)
        );
    }

    #[test]
    fn identical_inputs_are_one_equality(text in "\\PC{0,40}", cost in 0u8..=10, mode in cleanup_mode()) {
        let ops = compute_diff(&text, &text, cost, mode);

        if text.is_empty() {
            prop_assert!(ops.is_empty());
        } else {
            prop_assert_eq!(ops, vec![DiffOperation::equal(text.clone())]);
        }
    }

    #[test]
    fn line_split_keeps_reconstruction(
        left in small_text(),
        right in small_text(),
        mode in cleanup_mode(),
    ) {
        let ops = compute_diff(&left, &right, 4, mode);
        let split = split_by_lines(ops.clone(), true);

        prop_assert_eq!(left_text(&split), left);
        prop_assert_eq!(right_text(&split), right);
        prop_assert!(split.iter().all(|op| !op.text.is_empty()));
        prop_assert!(split.len() >= ops.len());

        // Joining runs of one kind gives back the unsplit operations
        let mut rejoined: Vec<DiffOperation> = Vec::new();
        for op in &split {
            match rejoined.last_mut() {
                Some(last) if last.kind == op.kind => last.text.push_str(&op.text),
                _ => rejoined.push(op.clone()),
            }
        }
        prop_assert_eq!(rejoined, ops);
    }

    #[test]
    fn hunk_actions_only_touch_their_operation(
        left in small_text(),
        right in small_text(),
        mode in cleanup_mode(),
    ) {
        let ops = compute_diff(&left, &right, 4, mode);

        for (index, op) in ops.iter().enumerate().filter(|(_, op)| op.is_change()) {
            for side in [Side::Left, Side::Right] {
                let original = side_text(&ops, side).chars().count();
                let rebuilt = apply_hunk_action(&ops, index, side).unwrap();
                let rebuilt_len = rebuilt.chars().count();
                let own = |i: usize| ops[i].char_len();

                let expected = match hunk_action(&ops, index, side).unwrap() {
                    HunkAction::Removal => original - op.char_len(),
                    HunkAction::Substitution { pair } => original - op.char_len() + own(pair),
                    HunkAction::Acceptance { replaces } => {
                        original + op.char_len() - replaces.map_or(0, own)
                    }
                };
                prop_assert_eq!(rebuilt_len, expected);
                prop_assert_eq!(
                    matches!(hunk_action(&ops, index, side).unwrap(), HunkAction::Substitution { .. }),
                    op.kind == side.own_kind() && pair_of(&ops, index).is_some()
                );
            }
        }
    }
}
