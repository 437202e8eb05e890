//! Non-local exits from node execution.
//!
//! A node's execute entry either produces a value or returns an
//! [`Interrupt`]. Two of the three interrupt kinds are recoverable:
//!
//! - `TypeMismatch`: a typed entry (`execute_int`, `execute_bool`) could not
//!   produce the requested primitive. Only the immediate caller consumes it,
//!   usually by rewriting itself to its generic variant.
//! - `UnexpectedResult`: a node's speculation was wrong (or it has just made
//!   its first observation). Carries the [`Rewrite`] to install; a retry
//!   boundary applies it and re-executes its subtree.
//!
//! `Fatal` is a user-visible error and terminates the run.

use std::fmt;

use morph_ir::{LoopGuard, NodeId, NodeKind, Tag};

use crate::errors::{EvalError, FrameError};

/// What a node saw that made it leave its current variant.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Observation {
    /// A value of this tag flowed through the position.
    Tag(Tag),
    /// Operands of differing or non-speculable tags.
    Operands(Tag, Tag),
    /// A child could not produce the requested primitive; it held this tag.
    Mismatch(Tag),
    /// The subtree has side effects, so it cannot be evaluated speculatively.
    SideEffects,
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(tag) => write!(f, "{tag}"),
            Self::Operands(l, r) => write!(f, "{l} and {r}"),
            Self::Mismatch(tag) => write!(f, "child produced {tag}"),
            Self::SideEffects => f.write_str("side effects"),
        }
    }
}

/// Why a position is being rewritten.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RewriteReason {
    /// First observation; install a speculative variant for the tag.
    Speculate(Tag),
    /// First observation is not speculable; go straight to generic.
    Generalize(Observation),
    /// A speculative assumption failed.
    Deoptimize {
        assumed: Tag,
        observed: Observation,
    },
    /// A loop became stable; on-stack-replace it with its fused form.
    FuseLoop(LoopGuard),
    /// The fused loop's guard failed; restore the plain loop.
    GuardFailed,
}

impl RewriteReason {
    /// Whether this rewrite abandons a speculation.
    pub fn is_deoptimization(&self) -> bool {
        matches!(self, Self::Deoptimize { .. } | Self::GuardFailed)
    }
}

impl fmt::Display for RewriteReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Speculate(tag) => write!(f, "speculate {tag}"),
            Self::Generalize(obs) => write!(f, "generalize on {obs}"),
            Self::Deoptimize { assumed, observed } => {
                write!(f, "assumed {assumed}, observed {observed}")
            }
            Self::FuseLoop(guard) => write!(f, "fuse loop on `{}`", guard.op.as_symbol()),
            Self::GuardFailed => f.write_str("loop guard failed"),
        }
    }
}

/// A replacement for one tree position.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Rewrite {
    pub target: NodeId,
    pub replacement: NodeKind,
    pub reason: RewriteReason,
}

/// Non-local exit from `execute`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Interrupt {
    /// A typed entry could not produce its primitive. Holds the actual tag.
    TypeMismatch(Tag),
    /// Respecialize and retry from the nearest boundary.
    UnexpectedResult(Box<Rewrite>),
    Fatal(EvalError),
}

impl Interrupt {
    pub fn rewrite(rewrite: Rewrite) -> Self {
        Interrupt::UnexpectedResult(Box::new(rewrite))
    }
}

impl From<EvalError> for Interrupt {
    fn from(err: EvalError) -> Self {
        Interrupt::Fatal(err)
    }
}

/// Typed-read mismatches stay recoverable; every other frame error is fatal.
impl From<FrameError> for Interrupt {
    fn from(err: FrameError) -> Self {
        match err {
            FrameError::TypeMismatch { actual, .. } => Interrupt::TypeMismatch(actual),
            other => Interrupt::Fatal(other.into()),
        }
    }
}

pub type ExecResult<T> = Result<T, Interrupt>;
