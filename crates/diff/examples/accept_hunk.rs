use anyhow::Result;
use text_diff::{apply_hunk_action, hunk_action, render_inline, DiffConfig, Side};

fn main() -> Result<()> {
    let left = "fn greet() {\n    println!(\"Hello, world!\");\n}\n";
    let right = "fn greet(name: &str) {\n    println!(\"Hello, {}!\", name);\n}\n";

    let ops = DiffConfig::default().diff(left, right);
    println!("{}", render_inline(&ops, true));

    // Walk every change and show what acting on it from either side produces
    for (index, op) in ops.iter().enumerate().filter(|(_, op)| op.is_change()) {
        for side in [Side::Left, Side::Right] {
            let action = hunk_action(&ops, index, side)?;
            let rebuilt = apply_hunk_action(&ops, index, side)?;
            println!("--- {} {:?} from the {} side ({}):", op.kind, op.text, side, action);
            print!("{}", rebuilt);
        }
    }

    Ok(())
}
