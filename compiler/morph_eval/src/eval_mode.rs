//! Evaluation modes.

/// Whether the interpreter specializes the tree as it runs.
///
/// `GenericOnly` executes every position through its generic variant and
/// never fuses loops. It is the reference semantics a specializing run must
/// be indistinguishable from.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum EvalMode {
    #[default]
    Specializing,
    GenericOnly,
}

impl EvalMode {
    #[inline]
    pub fn specializes(self) -> bool {
        matches!(self, Self::Specializing)
    }
}
