//! Buffers the live diff reads from and writes back to

use std::collections::HashMap;
use std::ops::Range;

use anyhow::{anyhow, Result};
use derive_more::{Display, From};
use log::debug;
use ropey::Rope;
use text_diff::Side;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identifies an editable text buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[display(fmt = "buffer#{}", _0)]
pub struct BufferId(pub u64);

/// Immutable copy of a buffer's content
#[derive(Debug, Clone)]
pub struct BufferSnapshot {
    id: BufferId,
    text: Rope,
}

impl BufferSnapshot {
    pub fn new(id: BufferId, text: Rope) -> Self {
        Self { id, text }
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn text(&self) -> &Rope {
        &self.text
    }

    pub fn len_chars(&self) -> usize {
        self.text.len_chars()
    }

    pub fn contents(&self) -> String {
        self.text.to_string()
    }
}

/// Source of buffer snapshots
pub trait BufferProvider {
    fn snapshot(&self, id: BufferId) -> Option<BufferSnapshot>;
}

/// Destination for rebuilt buffer content
pub trait ContentSink {
    fn update(&mut self, id: BufferId, content: String) -> Result<()>;
}

/// In-memory buffers backed by ropes
#[derive(Debug, Default)]
pub struct BufferStore {
    buffers: HashMap<BufferId, Rope>,
    next_id: u64,
}

impl BufferStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a buffer holding `text`
    pub fn create(&mut self, text: &str) -> BufferId {
        let id = BufferId(self.next_id);
        self.next_id += 1;
        self.buffers.insert(id, Rope::from_str(text));
        debug!("Created {} ({} chars)", id, text.chars().count());
        id
    }

    pub fn contains(&self, id: BufferId) -> bool {
        self.buffers.contains_key(&id)
    }

    pub fn contents(&self, id: BufferId) -> Option<String> {
        self.buffers.get(&id).map(Rope::to_string)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Insert `text` at a char offset
    pub fn insert(&mut self, id: BufferId, char_idx: usize, text: &str) -> Result<()> {
        self.rope_mut(id)?.try_insert(char_idx, text)?;
        Ok(())
    }

    /// Replace a char range with `replacement`
    pub fn edit(&mut self, id: BufferId, range: Range<usize>, replacement: &str) -> Result<()> {
        let rope = self.rope_mut(id)?;
        let start = range.start;
        rope.try_remove(range)?;
        rope.try_insert(start, replacement)?;
        Ok(())
    }

    pub fn remove(&mut self, id: BufferId) -> Option<Rope> {
        self.buffers.remove(&id)
    }

    fn rope_mut(&mut self, id: BufferId) -> Result<&mut Rope> {
        self.buffers
            .get_mut(&id)
            .ok_or_else(|| anyhow!("unknown {}", id))
    }
}

impl BufferProvider for BufferStore {
    fn snapshot(&self, id: BufferId) -> Option<BufferSnapshot> {
        self.buffers
            .get(&id)
            .map(|rope| BufferSnapshot::new(id, rope.clone()))
    }
}

impl ContentSink for BufferStore {
    fn update(&mut self, id: BufferId, content: String) -> Result<()> {
        *self.rope_mut(id)? = Rope::from(content);
        Ok(())
    }
}

/// The buffers shown on the left and right of a comparison
///
/// Both sides may name the same buffer. Writing to either side of such a
/// mirrored pair then updates both views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ComparePair {
    pub left: BufferId,
    pub right: BufferId,
}

impl ComparePair {
    pub fn new(left: BufferId, right: BufferId) -> Self {
        Self { left, right }
    }

    pub fn id(&self, side: Side) -> BufferId {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub fn is_mirrored(&self) -> bool {
        self.left == self.right
    }

    /// Sides showing `id`
    pub fn sides_of(&self, id: BufferId) -> Vec<Side> {
        [Side::Left, Side::Right]
            .into_iter()
            .filter(|side| self.id(*side) == id)
            .collect()
    }
}
