use derive_more::Display;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The kind of a single diff operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DiffKind {
    /// Text present in both buffers
    #[display(fmt = "Equal")]
    Equal,

    /// Text only present in the right buffer
    #[display(fmt = "Insert")]
    Insert,

    /// Text only present in the left buffer
    #[display(fmt = "Delete")]
    Delete,
}

impl DiffKind {
    /// The kind that sits on the other side of a modified region
    pub fn opposite(self) -> Option<DiffKind> {
        match self {
            DiffKind::Insert => Some(DiffKind::Delete),
            DiffKind::Delete => Some(DiffKind::Insert),
            DiffKind::Equal => None,
        }
    }
}

/// One element of an edit script
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DiffOperation {
    pub kind: DiffKind,
    pub text: String,
}

impl DiffOperation {
    pub fn new(kind: DiffKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn equal(text: impl Into<String>) -> Self {
        Self::new(DiffKind::Equal, text)
    }

    pub fn insert(text: impl Into<String>) -> Self {
        Self::new(DiffKind::Insert, text)
    }

    pub fn delete(text: impl Into<String>) -> Self {
        Self::new(DiffKind::Delete, text)
    }

    /// Length of the text in chars
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Whether this operation is an insertion or a deletion
    pub fn is_change(&self) -> bool {
        self.kind != DiffKind::Equal
    }

    /// Whether the text of this operation belongs to the given side
    pub fn belongs_to(&self, side: Side) -> bool {
        self.kind == DiffKind::Equal || self.kind == side.own_kind()
    }
}

/// One of the two compared buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Side {
    /// The original buffer, rebuilt from `Equal` and `Delete` operations
    #[display(fmt = "left")]
    Left,

    /// The modified buffer, rebuilt from `Equal` and `Insert` operations
    #[display(fmt = "right")]
    Right,
}

impl Side {
    /// The change kind whose text only exists on this side
    pub fn own_kind(self) -> DiffKind {
        match self {
            Side::Left => DiffKind::Delete,
            Side::Right => DiffKind::Insert,
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Rebuild the content of one side from an edit script
pub fn side_text(ops: &[DiffOperation], side: Side) -> String {
    ops.iter()
        .filter(|op| op.belongs_to(side))
        .map(|op| op.text.as_str())
        .collect()
}

/// Rebuild the left buffer (`Equal` + `Delete`)
pub fn left_text(ops: &[DiffOperation]) -> String {
    side_text(ops, Side::Left)
}

/// Rebuild the right buffer (`Equal` + `Insert`)
pub fn right_text(ops: &[DiffOperation]) -> String {
    side_text(ops, Side::Right)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_reconstruction() {
        let ops = vec![
            DiffOperation::equal("ab"),
            DiffOperation::delete("c"),
            DiffOperation::insert("XY"),
            DiffOperation::equal("def"),
        ];

        assert_eq!(left_text(&ops), "abcdef");
        assert_eq!(right_text(&ops), "abXYdef");
    }

    #[test]
    fn char_len_counts_scalars() {
        assert_eq!(DiffOperation::insert("🚀x").char_len(), 2);
    }
}
