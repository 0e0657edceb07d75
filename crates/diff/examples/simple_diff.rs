use anyhow::Result;
use text_diff::{hunks, render_inline, CleanupMode, DiffConfig, DiffStats};

fn main() -> Result<()> {
    // Two sample texts to compare
    let text1 = "This is the first line.\nHere is the second line.\nAnd the third line.";
    let text2 = "This is the first line.\nThis is a completely different second line.\nAnd the third line.\nPlus a new fourth line.";

    for cleanup in [CleanupMode::Semantic, CleanupMode::Efficiency] {
        let config = DiffConfig::default().cleanup(cleanup);
        let ops = config.diff(text1, text2);

        println!("{} cleanup:", cleanup);
        println!("{}", render_inline(&ops, true));

        // Print diff statistics
        let stats = DiffStats::of(&ops);
        println!("\nDiff statistics:");
        println!("  Total hunks: {}", stats.hunks);
        println!("  Inserted chars: {}", stats.inserted_chars);
        println!("  Deleted chars: {}", stats.deleted_chars);
        println!("  Unchanged chars: {}", stats.unchanged_chars);
        println!();
    }

    // Line-split operations, one line per entry
    let config = DiffConfig::default().split_by_line(true);
    let ops = config.diff(text1, text2);
    println!("Operations split by line:");
    for (i, op) in ops.iter().enumerate() {
        println!("  {:>2} {:<6} {:?}", i, op.kind, op.text);
    }

    println!("\nHunks:");
    for (i, hunk) in hunks(&ops).iter().enumerate() {
        println!(
            "  Hunk {}: {} ops {:?}, old {}:{}, new {}:{}",
            i + 1,
            hunk.status,
            hunk.operations,
            hunk.old_range.start,
            hunk.old_range.count,
            hunk.new_range.start,
            hunk.new_range.count
        );
    }

    Ok(())
}
