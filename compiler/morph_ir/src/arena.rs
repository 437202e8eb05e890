//! Node arena.
//!
//! [`NodeArena`] owns every node of a program in one flat `Vec<NodeKind>`
//! indexed by [`NodeId`]. Parents refer to children by ID only, which makes
//! the arena slot the unit of replacement: the specializer swaps the
//! `NodeKind` stored at an ID and every parent sees the new variant on its
//! next execute call.
//!
//! # Index Spaces
//!
//! - `kinds`: indexed by [`NodeId`]
//! - `node_lists`: flat `Vec<NodeId>` indexed by [`NodeRange`]
//! - `strings`: string literal constants indexed by [`StrId`](crate::StrId)

use crate::{NodeId, NodeKind, NodeRange, StringPool};

/// Convert a length to `u32`, panicking with context on overflow.
///
/// The arena addresses nodes with 32-bit indices; exceeding that is a
/// capacity exhaustion, not a recoverable condition.
#[inline]
pub(crate) fn to_u32(value: usize, what: &str) -> u32 {
    u32::try_from(value).unwrap_or_else(|_| panic!("arena capacity exceeded for {what}"))
}

/// Flat storage for all nodes of a program.
#[derive(Clone, Debug, Default)]
pub struct NodeArena {
    kinds: Vec<NodeKind>,
    /// Flattened child ID lists (block statements, call arguments).
    node_lists: Vec<NodeId>,
    strings: StringPool,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a node, returning its position.
    pub fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId::new(to_u32(self.kinds.len(), "nodes"));
        self.kinds.push(kind);
        id
    }

    /// Get the variant currently occupying a position.
    #[inline]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.kinds[id.index()]
    }

    /// Like [`kind`](Self::kind) but `None` for IDs outside the arena.
    #[inline]
    pub fn try_kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.kinds.get(id.index())
    }

    /// Check that `id` names an allocated node.
    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.kinds.len()
    }

    /// Overwrite the variant at `id`, returning the previous one.
    ///
    /// This is the only mutation the arena allows after construction.
    pub fn replace(&mut self, id: NodeId, kind: NodeKind) -> NodeKind {
        std::mem::replace(&mut self.kinds[id.index()], kind)
    }

    /// Allocate a contiguous list of child IDs.
    pub fn push_list(&mut self, ids: &[NodeId]) -> NodeRange {
        if ids.is_empty() {
            return NodeRange::EMPTY;
        }
        let start = to_u32(self.node_lists.len(), "node lists");
        self.node_lists.extend_from_slice(ids);
        NodeRange::new(start, to_u32(ids.len(), "node list"))
    }

    /// Get the child IDs of a range.
    pub fn get_list(&self, range: NodeRange) -> &[NodeId] {
        if range.is_empty() {
            return &[];
        }
        let start = range.start as usize;
        &self.node_lists[start..start + range.len()]
    }

    pub fn strings(&self) -> &StringPool {
        &self.strings
    }

    pub fn strings_mut(&mut self) -> &mut StringPool {
        &mut self.strings
    }

    /// Number of allocated nodes.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Direct children of a node, in evaluation order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match *self.kind(id) {
            NodeKind::IntLiteral(_)
            | NodeKind::BoolLiteral(_)
            | NodeKind::StrLiteral(_)
            | NodeKind::Read { .. } => Vec::new(),
            NodeKind::Write { value, .. } | NodeKind::Print { value } => vec![value],
            NodeKind::Binary { lhs, rhs, .. } => vec![lhs, rhs],
            NodeKind::Block { stmts } => self.get_list(stmts).to_vec(),
            NodeKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let mut out = vec![cond, then_branch];
                if else_branch.is_valid() {
                    out.push(else_branch);
                }
                out
            }
            NodeKind::While { cond, body, .. } | NodeKind::FusedWhile { cond, body, .. } => {
                vec![cond, body]
            }
            NodeKind::Call { args, .. } => self.get_list(args).to_vec(),
        }
    }

    /// Returns `true` if evaluating the subtree at `root` can write a slot,
    /// print, or call a function.
    ///
    /// Only side-effect-free subtrees may be evaluated speculatively and
    /// then discarded on a retry.
    pub fn has_side_effects(&self, root: NodeId) -> bool {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            match *self.kind(id) {
                NodeKind::IntLiteral(_)
                | NodeKind::BoolLiteral(_)
                | NodeKind::StrLiteral(_)
                | NodeKind::Read { .. } => {}
                NodeKind::Binary { lhs, rhs, .. } => {
                    stack.push(lhs);
                    stack.push(rhs);
                }
                _ => return true,
            }
        }
        false
    }
}

#[cfg(test)]
mod tests;
