//! Node kinds: the polymorphic execution nodes stored in the arena.
//!
//! Every tree position holds exactly one [`NodeKind`]. The kinds that take
//! part in specialization carry a [`Shape`], the cached assumption about the
//! runtime type flowing through that position. A rewrite replaces the whole
//! `NodeKind` value at the position; children stay where they are.

use std::fmt;

use crate::{BinaryOp, FuncId, LocalSlot, NodeId, NodeRange, StrId};

/// Runtime type tag of a frame slot or a value.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Tag {
    /// Slot never written.
    Unset,
    Int,
    Bool,
    /// Anything that is not a primitive (strings, unit).
    Boxed,
}

impl Tag {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unset => "unset",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Boxed => "boxed",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Specialization state of a tree position.
///
/// Transitions only move forward: `Uninitialized -> Assume(tag) -> Generic`
/// or `Uninitialized -> Generic`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum Shape {
    /// Nothing observed yet. Every node the builder creates starts here.
    #[default]
    Uninitialized,
    /// Speculative-typed variant, valid while the tag holds.
    Assume(Tag),
    /// Dynamic dispatch; never deoptimizes.
    Generic,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("uninitialized"),
            Self::Assume(tag) => write!(f, "assume({tag})"),
            Self::Generic => f.write_str("generic"),
        }
    }
}

/// Whether a `While` may still be replaced by its fused form.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum OsrState {
    #[default]
    Eligible,
    /// The fused form was deoptimized once; never fuse this loop again.
    Disabled,
}

/// Operand of a fused loop guard.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum GuardOperand {
    /// Read an int slot; the guard fails if the slot is not tagged `Int`.
    Slot(LocalSlot),
    Const(i64),
}

/// Loop condition compiled at the loop merge point.
///
/// Equivalent to `lhs <op> rhs` while every `Slot` operand holds an int.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct LoopGuard {
    pub op: BinaryOp,
    pub lhs: GuardOperand,
    pub rhs: GuardOperand,
}

/// A node variant.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum NodeKind {
    IntLiteral(i64),
    BoolLiteral(bool),
    StrLiteral(StrId),
    /// Read of a local slot.
    Read { slot: LocalSlot, shape: Shape },
    /// `slot := value`. Yields unit.
    Write {
        slot: LocalSlot,
        value: NodeId,
        shape: Shape,
    },
    /// Arithmetic or comparison. `Assume(Int)` means both operands are
    /// assumed to produce ints.
    Binary {
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
        shape: Shape,
    },
    /// Statement sequence; yields the value of the last statement.
    Block { stmts: NodeRange },
    /// `then_branch` runs when `cond` is true; `else_branch` may be `INVALID`.
    If {
        cond: NodeId,
        then_branch: NodeId,
        else_branch: NodeId,
    },
    While {
        cond: NodeId,
        body: NodeId,
        osr: OsrState,
    },
    /// On-stack-replaced `While` whose condition is checked through `guard`.
    ///
    /// `cond` is kept so the loop can be restored on deoptimization.
    FusedWhile {
        guard: LoopGuard,
        cond: NodeId,
        body: NodeId,
    },
    Call {
        func: FuncId,
        args: NodeRange,
    },
    Print { value: NodeId },
}

impl NodeKind {
    /// Short variant name for logs and statistics.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::IntLiteral(_) => "IntLiteral",
            Self::BoolLiteral(_) => "BoolLiteral",
            Self::StrLiteral(_) => "StrLiteral",
            Self::Read { shape, .. } => match shape {
                Shape::Uninitialized => "UninitializedRead",
                Shape::Assume(Tag::Int) => "IntRead",
                Shape::Assume(Tag::Bool) => "BoolRead",
                Shape::Assume(_) => "BoxedRead",
                Shape::Generic => "GenericRead",
            },
            Self::Write { shape, .. } => match shape {
                Shape::Uninitialized => "UninitializedWrite",
                Shape::Assume(Tag::Int) => "IntWrite",
                Shape::Assume(Tag::Bool) => "BoolWrite",
                Shape::Assume(_) => "BoxedWrite",
                Shape::Generic => "GenericWrite",
            },
            Self::Binary { shape, .. } => match shape {
                Shape::Uninitialized => "UninitializedBinary",
                Shape::Assume(_) => "IntBinary",
                Shape::Generic => "GenericBinary",
            },
            Self::Block { .. } => "Block",
            Self::If { .. } => "If",
            Self::While { .. } => "While",
            Self::FusedWhile { .. } => "FusedWhile",
            Self::Call { .. } => "Call",
            Self::Print { .. } => "Print",
        }
    }

    /// Specialization state of this position, if it takes part in it.
    pub fn shape(&self) -> Option<Shape> {
        match self {
            Self::Read { shape, .. } | Self::Write { shape, .. } | Self::Binary { shape, .. } => {
                Some(*shape)
            }
            _ => None,
        }
    }

    /// The same variant with a different shape. Children are untouched.
    ///
    /// Kinds without a shape are returned unchanged.
    #[must_use]
    pub fn with_shape(self, new_shape: Shape) -> Self {
        match self {
            Self::Read { slot, .. } => Self::Read {
                slot,
                shape: new_shape,
            },
            Self::Write { slot, value, .. } => Self::Write {
                slot,
                value,
                shape: new_shape,
            },
            Self::Binary { op, lhs, rhs, .. } => Self::Binary {
                op,
                lhs,
                rhs,
                shape: new_shape,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_shape_preserves_children() {
        let kind = NodeKind::Binary {
            op: BinaryOp::Lt,
            lhs: NodeId::new(1),
            rhs: NodeId::new(2),
            shape: Shape::Uninitialized,
        };
        let generic = kind.with_shape(Shape::Generic);
        assert_eq!(
            generic,
            NodeKind::Binary {
                op: BinaryOp::Lt,
                lhs: NodeId::new(1),
                rhs: NodeId::new(2),
                shape: Shape::Generic,
            }
        );
        assert_eq!(generic.variant_name(), "GenericBinary");
    }

    #[test]
    fn with_shape_ignores_unshaped_kinds() {
        let kind = NodeKind::IntLiteral(7);
        assert_eq!(kind.with_shape(Shape::Generic), kind);
        assert_eq!(kind.shape(), None);
    }

    #[test]
    fn shape_display() {
        assert_eq!(Shape::Assume(Tag::Int).to_string(), "assume(int)");
        assert_eq!(Shape::Generic.to_string(), "generic");
    }
}
