//! Evaluation errors and their constructors.
//!
//! Every fatal condition the interpreter can report is an [`EvalErrorKind`].
//! Construct errors through the `#[cold]` factory functions below so each
//! message is defined in one place. Frame access failures have their own
//! type, [`FrameError`], because a typed-read mismatch is not fatal: the
//! interpreter turns it into a respecialization.

use morph_ir::{BinaryOp, FuncId, LocalSlot, NodeId, Tag};
use thiserror::Error;

/// Failure of a frame slot access.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("slot {slot} holds {actual}, expected {expected}")]
    TypeMismatch {
        slot: LocalSlot,
        expected: Tag,
        actual: Tag,
    },
    #[error("slot {slot} is out of bounds for a frame of {len} slots")]
    SlotOutOfBounds { slot: LocalSlot, len: usize },
    #[error("undefined variable: slot {slot} was read before it was written")]
    Unset { slot: LocalSlot },
}

/// Structured error category.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EvalErrorKind {
    // Frame
    #[error(transparent)]
    Frame(#[from] FrameError),

    // Arithmetic
    #[error("integer overflow in {operation}")]
    IntegerOverflow { operation: &'static str },

    // Type/Operator
    #[error("operator `{}` cannot be applied to {left} and {right}", .op.as_symbol())]
    BinaryTypeMismatch {
        op: BinaryOp,
        left: &'static str,
        right: &'static str,
    },
    #[error("condition must be bool, got {actual}")]
    ConditionNotBool { actual: Tag },

    // Calls
    #[error("call to unknown function #{index}")]
    UnknownFunction { index: usize },
    #[error("undefined function: {name}")]
    UndefinedFunction { name: String },
    #[error("`{name}` expects {expected} arguments, got {got}")]
    ArityMismatch {
        name: String,
        expected: u32,
        got: usize,
    },
    #[error("maximum call depth exceeded (limit: {depth})")]
    StackOverflow { depth: usize },

    // Tree
    #[error("node {node} is not part of the program")]
    UnknownNode { node: NodeId },
    #[error("unknown string constant #{index}")]
    UnknownConstant { index: usize },

    // Specialization
    #[error("position {node} respecialized more than {limit} times")]
    RespecializationLimit { node: NodeId, limit: u32 },
    #[error("type mismatch ({actual}) escaped to the retry boundary at {node}")]
    EscapedTypeMismatch { node: NodeId, actual: Tag },
}

/// Fatal evaluation error.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct EvalError {
    pub kind: EvalErrorKind,
}

impl EvalError {
    pub fn from_kind(kind: EvalErrorKind) -> Self {
        EvalError { kind }
    }

    pub fn kind(&self) -> &EvalErrorKind {
        &self.kind
    }
}

impl From<FrameError> for EvalError {
    fn from(err: FrameError) -> Self {
        EvalError::from_kind(EvalErrorKind::Frame(err))
    }
}

pub type EvalResult<T = crate::Value> = Result<T, EvalError>;

// Arithmetic

/// Integer overflow in a checked operation.
#[cold]
pub fn integer_overflow(operation: &'static str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::IntegerOverflow { operation })
}

// Type/Operator

#[cold]
pub fn binary_type_mismatch(op: BinaryOp, left: &'static str, right: &'static str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::BinaryTypeMismatch { op, left, right })
}

#[cold]
pub fn condition_not_bool(actual: Tag) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ConditionNotBool { actual })
}

// Calls

#[cold]
pub fn unknown_function(func: FuncId) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UnknownFunction {
        index: func.index(),
    })
}

#[cold]
pub fn undefined_function(name: &str) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UndefinedFunction {
        name: name.to_owned(),
    })
}

#[cold]
pub fn arity_mismatch(name: &str, expected: u32, got: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::ArityMismatch {
        name: name.to_owned(),
        expected,
        got,
    })
}

/// Maximum call depth exceeded.
#[cold]
pub fn stack_overflow(depth: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::StackOverflow { depth })
}

// Tree

#[cold]
pub fn unknown_node(node: NodeId) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UnknownNode { node })
}

#[cold]
pub fn unknown_constant(index: usize) -> EvalError {
    EvalError::from_kind(EvalErrorKind::UnknownConstant { index })
}

// Specialization

#[cold]
pub fn respecialization_limit(node: NodeId, limit: u32) -> EvalError {
    EvalError::from_kind(EvalErrorKind::RespecializationLimit { node, limit })
}

/// A typed-entry mismatch reached a retry boundary instead of being
/// consumed by the node that asked for the typed value.
#[cold]
pub fn escaped_type_mismatch(node: NodeId, actual: Tag) -> EvalError {
    EvalError::from_kind(EvalErrorKind::EscapedTypeMismatch { node, actual })
}
