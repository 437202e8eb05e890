//! Function calls.

use morph_ir::{FuncId, LocalSlot, NodeRange};

use super::Interpreter;
use crate::errors::{arity_mismatch, stack_overflow, unknown_function, EvalResult};
use crate::frame::Frame;
use crate::signal::ExecResult;
use crate::Value;

impl Interpreter {
    /// Evaluate arguments left to right, each in its own retry boundary,
    /// then invoke the callee.
    pub(super) fn execute_call(
        &mut self,
        func: FuncId,
        args: NodeRange,
        frame: &mut Frame,
    ) -> ExecResult<Value> {
        let mut values = Vec::with_capacity(args.len());
        for index in 0..args.len() {
            let arg = self.program.arena().get_list(args)[index];
            values.push(self.run_boundary(arg, frame)?);
        }
        Ok(self.invoke(func, values)?)
    }

    /// Run `func`'s body in a fresh frame whose first slots hold `args`.
    ///
    /// The body is a retry boundary, so rewrites inside the callee never
    /// escape into the caller.
    pub(super) fn invoke(&mut self, func: FuncId, args: Vec<Value>) -> EvalResult {
        let function = self
            .program
            .function(func)
            .ok_or_else(|| unknown_function(func))?;
        if args.len() != function.arity as usize {
            return Err(arity_mismatch(&function.name, function.arity, args.len()));
        }
        if self.call_depth >= self.max_call_depth {
            return Err(stack_overflow(self.max_call_depth));
        }
        tracing::trace!(function = %function.name, depth = self.call_depth, "call");
        let body = function.body;
        let mut callee = Frame::new(function.locals as usize);
        for (slot, value) in (0..function.arity).map(LocalSlot::new).zip(args) {
            callee.write(slot, value)?;
        }

        self.call_depth += 1;
        let result = self.run_boundary(body, &mut callee);
        self.call_depth -= 1;
        result
    }
}
