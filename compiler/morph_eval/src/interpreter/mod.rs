//! Self-specializing tree-walking interpreter.
//!
//! # Architecture
//!
//! The interpreter owns the [`Program`] and rewrites its arena while running.
//! Every position is executed through one of three entries:
//!
//! - `execute`: produce a dynamically typed [`Value`]
//! - `execute_int` / `execute_bool`: produce an unboxed primitive, or
//!   [`Interrupt::TypeMismatch`] with the actual tag
//!
//! A node whose speculation fails returns [`Interrupt::UnexpectedResult`]
//! carrying its replacement. Retry boundaries (block statements, loop
//! bodies, `if` branches, call arguments, operands of generic binaries, and
//! function bodies) install the replacement and re-execute their subtree.
//! Nodes only speculate over side-effect-free subtrees, so a retry never
//! repeats a write, a print, or a call.
//!
//! Submodules:
//!
//! - `nodes` - literals, reads, writes, binaries, blocks, `if`, print
//! - `loops` - the loop merge point and on-stack replacement
//! - `call` - function calls and activation frames

mod builder;
mod call;
mod loops;
mod nodes;

pub use builder::{InterpreterBuilder, DEFAULT_LOOP_STABILITY_THRESHOLD, DEFAULT_MAX_CALL_DEPTH};

use morph_ir::{FuncId, NodeId, NodeKind, Program, Shape};

use crate::errors::{escaped_type_mismatch, undefined_function, unknown_node, EvalResult};
use crate::eval_mode::EvalMode;
use crate::frame::Frame;
use crate::print_handler::SharedPrintHandler;
use crate::signal::{ExecResult, Interrupt, Observation, Rewrite};
use crate::specialize::{SpecializationStats, Specializer};
use crate::stack::ensure_sufficient_stack;
use crate::Value;

/// Tree-walking interpreter that specializes the tree it runs.
pub struct Interpreter {
    program: Program,
    specializer: Specializer,
    mode: EvalMode,
    loop_stability_threshold: u32,
    max_call_depth: usize,
    call_depth: usize,
    print_handler: SharedPrintHandler,
}

impl Interpreter {
    /// Interpreter with default configuration.
    pub fn new(program: Program) -> Self {
        InterpreterBuilder::new(program).build()
    }

    pub fn builder(program: Program) -> InterpreterBuilder {
        InterpreterBuilder::new(program)
    }

    /// The program, including every rewrite applied so far.
    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn into_program(self) -> Program {
        self.program
    }

    pub fn mode(&self) -> EvalMode {
        self.mode
    }

    pub fn specializer(&self) -> &Specializer {
        &self.specializer
    }

    pub fn stats(&self) -> &SpecializationStats {
        self.specializer.stats()
    }

    pub fn print_handler(&self) -> &SharedPrintHandler {
        &self.print_handler
    }

    /// Execute the subtree at `root` against `frame` until it produces a
    /// value or a fatal error. Rewrites are applied and retried internally.
    #[tracing::instrument(level = "debug", skip_all, fields(root = %root))]
    pub fn run(&mut self, root: NodeId, frame: &mut Frame) -> EvalResult {
        if !self.program.arena().contains(root) {
            return Err(unknown_node(root));
        }
        self.run_boundary(root, frame)
    }

    /// Call `func` with `args` in a fresh frame.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn run_function(&mut self, func: FuncId, args: Vec<Value>) -> EvalResult {
        self.invoke(func, args)
    }

    /// Call the function named `name`.
    pub fn run_named(&mut self, name: &str, args: Vec<Value>) -> EvalResult {
        let func = self
            .program
            .function_id(name)
            .ok_or_else(|| undefined_function(name))?;
        self.run_function(func, args)
    }

    /// Retry boundary: execute `id`, applying rewrites and re-executing until
    /// it completes.
    ///
    /// Terminates because every position accepts a bounded number of
    /// rewrites; the next one past the bound is a fatal error.
    pub(crate) fn run_boundary(&mut self, id: NodeId, frame: &mut Frame) -> EvalResult {
        loop {
            match self.execute(id, frame) {
                Ok(value) => return Ok(value),
                Err(Interrupt::UnexpectedResult(rewrite)) => self.apply(*rewrite)?,
                Err(Interrupt::TypeMismatch(actual)) => {
                    return Err(escaped_type_mismatch(id, actual))
                }
                Err(Interrupt::Fatal(err)) => return Err(err),
            }
        }
    }

    fn apply(&mut self, rewrite: Rewrite) -> EvalResult<()> {
        self.specializer.apply(self.program.arena_mut(), rewrite)
    }

    /// Build the interrupt that replaces `node` after `observation`.
    fn signal(&self, node: NodeId, observation: Observation) -> Interrupt {
        Interrupt::rewrite(
            self.specializer
                .respecialize(self.program.arena(), node, observation),
        )
    }

    /// The shape a position executes as in the current mode.
    #[inline]
    fn effective(&self, shape: Shape) -> Shape {
        if self.mode.specializes() {
            shape
        } else {
            Shape::Generic
        }
    }

    #[inline]
    fn kind(&self, id: NodeId) -> NodeKind {
        *self.program.arena().kind(id)
    }

    /// Execute `id` for a dynamically typed value.
    pub(crate) fn execute(&mut self, id: NodeId, frame: &mut Frame) -> ExecResult<Value> {
        ensure_sufficient_stack(|| self.dispatch(id, frame))
    }

    fn dispatch(&mut self, id: NodeId, frame: &mut Frame) -> ExecResult<Value> {
        match self.kind(id) {
            NodeKind::IntLiteral(n) => Ok(Value::Int(n)),
            NodeKind::BoolLiteral(b) => Ok(Value::Bool(b)),
            NodeKind::StrLiteral(s) => self.string_constant(s),
            NodeKind::Read { slot, shape } => self.execute_read(id, slot, shape, frame),
            NodeKind::Write { slot, value, shape } => {
                self.execute_write(id, slot, value, shape, frame)
            }
            NodeKind::Binary {
                op,
                lhs,
                rhs,
                shape,
            } => self.execute_binary(id, op, lhs, rhs, shape, frame),
            NodeKind::Block { stmts } => self.execute_block(stmts, frame),
            NodeKind::If {
                cond,
                then_branch,
                else_branch,
            } => self.execute_if(cond, then_branch, else_branch, frame),
            NodeKind::While { cond, body, osr } => self.execute_while(id, cond, body, osr, frame),
            NodeKind::FusedWhile { guard, cond, body } => {
                self.execute_fused_while(id, guard, cond, body, frame)
            }
            NodeKind::Call { func, args } => self.execute_call(func, args, frame),
            NodeKind::Print { value } => self.execute_print(value, frame),
        }
    }
}

#[cfg(test)]
mod tests;
