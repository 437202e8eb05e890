//! `InterpreterBuilder` for creating Interpreter instances with various configurations.

use morph_ir::Program;

use super::Interpreter;
use crate::eval_mode::EvalMode;
use crate::print_handler::{stdout_handler, SharedPrintHandler};
use crate::specialize::Specializer;

/// Consecutive stable iterations before a loop is considered for fusion.
pub const DEFAULT_LOOP_STABILITY_THRESHOLD: u32 = 2;

/// Maximum nesting of function activations.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;

/// Builder for creating Interpreter instances.
///
/// Defaults: specializing mode, a loop stability threshold of
/// [`DEFAULT_LOOP_STABILITY_THRESHOLD`], a call depth limit of
/// [`DEFAULT_MAX_CALL_DEPTH`], and output to stdout.
pub struct InterpreterBuilder {
    program: Program,
    mode: EvalMode,
    loop_stability_threshold: u32,
    max_call_depth: usize,
    print_handler: Option<SharedPrintHandler>,
}

impl InterpreterBuilder {
    pub fn new(program: Program) -> Self {
        Self {
            program,
            mode: EvalMode::default(),
            loop_stability_threshold: DEFAULT_LOOP_STABILITY_THRESHOLD,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            print_handler: None,
        }
    }

    #[must_use]
    pub fn mode(mut self, mode: EvalMode) -> Self {
        self.mode = mode;
        self
    }

    /// Number of consecutive iterations without a rewrite after which a
    /// loop may be replaced by its fused form.
    ///
    /// Clamped to at least 1: the condition has to run once before it has
    /// a shape a guard can be compiled from.
    #[must_use]
    pub fn loop_stability_threshold(mut self, iterations: u32) -> Self {
        self.loop_stability_threshold = iterations.max(1);
        self
    }

    #[must_use]
    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Set the print handler. Defaults to stdout.
    #[must_use]
    pub fn print_handler(mut self, handler: SharedPrintHandler) -> Self {
        self.print_handler = Some(handler);
        self
    }

    pub fn build(self) -> Interpreter {
        tracing::debug!(
            mode = ?self.mode,
            loop_stability_threshold = self.loop_stability_threshold,
            max_call_depth = self.max_call_depth,
            "building interpreter"
        );
        Interpreter {
            program: self.program,
            specializer: Specializer::new(),
            mode: self.mode,
            loop_stability_threshold: self.loop_stability_threshold,
            max_call_depth: self.max_call_depth,
            call_depth: 0,
            print_handler: self.print_handler.unwrap_or_else(stdout_handler),
        }
    }
}
