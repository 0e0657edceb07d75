use text_diff::{CleanupMode, DiffConfig, DiffOperation};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Everything a diff computation needs, captured at the moment of an edit
///
/// Requests own copies of both texts, so later edits to the buffers never
/// reach a computation that is already running.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DiffRequest {
    pub left_text: String,
    pub right_text: String,
    pub edit_cost: u8,
    pub cleanup: CleanupMode,
    pub split_by_line: bool,
}

impl DiffRequest {
    pub fn new(left: impl Into<String>, right: impl Into<String>, config: &DiffConfig) -> Self {
        Self {
            left_text: left.into(),
            right_text: right.into(),
            edit_cost: config.edit_cost,
            cleanup: config.cleanup,
            split_by_line: config.split_by_line,
        }
    }

    pub fn config(&self) -> DiffConfig {
        DiffConfig::default()
            .edit_cost(self.edit_cost)
            .cleanup(self.cleanup)
            .split_by_line(self.split_by_line)
    }

    /// Run the diff this request describes on the calling thread
    pub fn compute(&self) -> Vec<DiffOperation> {
        self.config().diff(&self.left_text, &self.right_text)
    }

    /// An empty answer to a request whose texts differ can only come from a
    /// failed computation
    pub fn is_soft_failure(&self, response: &DiffResponse) -> bool {
        response.operations.is_empty() && self.left_text != self.right_text
    }
}

/// Result of one request, tagged with the sequence number it was submitted under
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DiffResponse {
    pub seq: u64,
    pub operations: Vec<DiffOperation>,
}

impl DiffResponse {
    pub fn new(seq: u64, operations: Vec<DiffOperation>) -> Self {
        Self { seq, operations }
    }

    /// Answer used when a computation fails
    pub fn empty(seq: u64) -> Self {
        Self::new(seq, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
