// Core diff library for livediff
// This crate turns two texts into an edit script, regroups it by line and
// rebuilds buffer content when a single change is accepted or discarded

mod cleanup;
mod config;
mod engine;
mod hunk;
mod lines;
mod operation;
mod reconcile;
mod render;

pub use config::{CleanupMode, DiffConfig, DEFAULT_EDIT_COST, MAX_EDIT_COST};
pub use engine::compute_diff;
pub use hunk::{hunks, pair_of, DiffHunk, DiffHunkRange, DiffHunkStatus, DiffStats};
pub use lines::split_by_lines;
pub use operation::{left_text, right_text, side_text, DiffKind, DiffOperation, Side};
pub use reconcile::{apply_hunk_action, hunk_action, HunkAction, ReconcileError};
pub use render::render_inline;
