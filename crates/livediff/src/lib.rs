//! File-level operations behind the `livediff` command

mod report;
mod watcher;

pub use report::{apply_change, change_index, diff_files, read_text, render_report};
pub use watcher::FileWatcher;
