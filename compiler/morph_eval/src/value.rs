//! Runtime values.

use std::fmt;
use std::sync::Arc;

use morph_ir::Tag;

/// A runtime value.
///
/// Ints and bools are the primitive shapes the specializer speculates on;
/// everything else lives in a frame's boxed storage.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Str(Arc<str>),
    Unit,
}

impl Value {
    pub fn string(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }

    /// The frame tag this value is stored under.
    pub fn tag(&self) -> Tag {
        match self {
            Value::Int(_) => Tag::Int,
            Value::Bool(_) => Tag::Bool,
            Value::Str(_) | Value::Unit => Tag::Boxed,
        }
    }

    /// Source-level type name, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::Str(_) => "str",
            Value::Unit => "unit",
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Str(s) => f.write_str(s),
            Value::Unit => f.write_str("()"),
        }
    }
}
