//! Index newtypes for the node arena.
//!
//! Tree positions are `NodeId(u32)` indices rather than owning pointers, so
//! replacing the variant at a position is a single slot write in the arena
//! and no parent ever holds a dangling reference.

use std::fmt;
use std::hash::{Hash, Hasher};

/// Index into a [`NodeArena`](crate::NodeArena). Identifies a tree position.
#[derive(Copy, Clone, Eq, PartialEq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// Sentinel for "no node" (e.g. an `if` without an `else` branch).
    pub const INVALID: NodeId = NodeId(u32::MAX);

    #[inline]
    pub const fn new(index: u32) -> Self {
        NodeId(index)
    }

    /// Get the index into the arena.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns `true` if this is not the sentinel.
    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }
}

impl Hash for NodeId {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "NodeId({})", self.0)
        } else {
            write!(f, "NodeId::INVALID")
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::INVALID
    }
}

/// Contiguous range of child IDs in the arena's flattened `node_lists`.
///
/// Used for block statements and call arguments.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
#[repr(C)]
pub struct NodeRange {
    pub start: u32,
    pub len: u32,
}

impl NodeRange {
    pub const EMPTY: NodeRange = NodeRange { start: 0, len: 0 };

    #[inline]
    pub const fn new(start: u32, len: u32) -> Self {
        NodeRange { start, len }
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.len as usize
    }
}

impl fmt::Debug for NodeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeRange({}..{})", self.start, self.start + self.len)
    }
}

/// Index of a local variable slot in a frame.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct LocalSlot(u32);

impl LocalSlot {
    #[inline]
    pub const fn new(index: u32) -> Self {
        LocalSlot(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl From<u32> for LocalSlot {
    fn from(index: u32) -> Self {
        LocalSlot(index)
    }
}

impl fmt::Debug for LocalSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocalSlot({})", self.0)
    }
}

impl fmt::Display for LocalSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// Index into a program's function table.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct FuncId(u32);

impl FuncId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        FuncId(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index into the arena's string constant pool.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct StrId(u32);

impl StrId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        StrId(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}
