//! Binary operators.

/// Binary operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,

    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl BinaryOp {
    /// Returns the source-level symbol for this operator.
    ///
    /// Used in error messages to show the exact operator that failed.
    pub const fn as_symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
        }
    }

    /// Comparison operators produce a bool; arithmetic ones produce an int.
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq
        )
    }

    /// Evaluate this comparison on two integers.
    ///
    /// Returns `None` for arithmetic operators.
    pub fn compare_ints(self, a: i64, b: i64) -> Option<bool> {
        Some(match self {
            Self::Eq => a == b,
            Self::NotEq => a != b,
            Self::Lt => a < b,
            Self::LtEq => a <= b,
            Self::Gt => a > b,
            Self::GtEq => a >= b,
            Self::Add | Self::Sub | Self::Mul => return None,
        })
    }
}
