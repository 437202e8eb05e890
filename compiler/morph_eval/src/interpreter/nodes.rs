//! Execution of expression and statement nodes.

use morph_ir::{BinaryOp, LocalSlot, NodeId, NodeKind, NodeRange, Shape, StrId, Tag};

use super::Interpreter;
use crate::errors::{condition_not_bool, unknown_constant, FrameError};
use crate::frame::Frame;
use crate::operators::{evaluate_binary, int_arith, int_compare};
use crate::signal::{ExecResult, Interrupt, Observation};
use crate::Value;

impl Interpreter {
    // Typed entries

    /// Execute `id` for an unboxed int.
    ///
    /// Fails with `TypeMismatch` carrying the actual tag when the position
    /// produces something else. The caller decides what to do about it.
    pub(crate) fn execute_int(&mut self, id: NodeId, frame: &mut Frame) -> ExecResult<i64> {
        match self.kind(id) {
            NodeKind::IntLiteral(n) => Ok(n),
            NodeKind::Read { slot, shape } => match self.effective(shape) {
                Shape::Assume(Tag::Int) if frame.is_tag(slot, Tag::Int) => {
                    Ok(frame.read_int(slot)?)
                }
                Shape::Assume(assumed) if frame.is_tag(slot, assumed) => {
                    Err(Interrupt::TypeMismatch(assumed))
                }
                _ => self.int_via_execute(id, frame),
            },
            NodeKind::Binary {
                op,
                lhs,
                rhs,
                shape,
            } if !op.is_comparison() && self.effective(shape) == Shape::Assume(Tag::Int) => {
                self.speculative_arith(id, op, lhs, rhs, frame)
            }
            _ => self.int_via_execute(id, frame),
        }
    }

    /// Execute `id` for an unboxed bool. See [`Self::execute_int`].
    pub(crate) fn execute_bool(&mut self, id: NodeId, frame: &mut Frame) -> ExecResult<bool> {
        match self.kind(id) {
            NodeKind::BoolLiteral(b) => Ok(b),
            NodeKind::Read { slot, shape } => match self.effective(shape) {
                Shape::Assume(Tag::Bool) if frame.is_tag(slot, Tag::Bool) => {
                    Ok(frame.read_bool(slot)?)
                }
                Shape::Assume(assumed) if frame.is_tag(slot, assumed) => {
                    Err(Interrupt::TypeMismatch(assumed))
                }
                _ => self.bool_via_execute(id, frame),
            },
            NodeKind::Binary {
                op,
                lhs,
                rhs,
                shape,
            } if op.is_comparison() && self.effective(shape) == Shape::Assume(Tag::Int) => {
                self.speculative_compare(id, op, lhs, rhs, frame)
            }
            _ => self.bool_via_execute(id, frame),
        }
    }

    fn int_via_execute(&mut self, id: NodeId, frame: &mut Frame) -> ExecResult<i64> {
        match self.execute(id, frame)? {
            Value::Int(n) => Ok(n),
            other => Err(Interrupt::TypeMismatch(other.tag())),
        }
    }

    fn bool_via_execute(&mut self, id: NodeId, frame: &mut Frame) -> ExecResult<bool> {
        match self.execute(id, frame)? {
            Value::Bool(b) => Ok(b),
            other => Err(Interrupt::TypeMismatch(other.tag())),
        }
    }

    // Leaves

    pub(super) fn string_constant(&self, id: StrId) -> ExecResult<Value> {
        let s = self
            .program
            .arena()
            .strings()
            .get(id)
            .ok_or_else(|| unknown_constant(id.index()))?;
        Ok(Value::Str(s.clone()))
    }

    pub(super) fn execute_read(
        &mut self,
        id: NodeId,
        slot: LocalSlot,
        shape: Shape,
        frame: &mut Frame,
    ) -> ExecResult<Value> {
        match self.effective(shape) {
            Shape::Uninitialized => {
                let observed = frame.tag(slot)?;
                if observed == Tag::Unset {
                    return Err(FrameError::Unset { slot }.into());
                }
                Err(self.signal(id, Observation::Tag(observed)))
            }
            Shape::Assume(assumed) => {
                if frame.is_tag(slot, assumed) {
                    Ok(frame.read_typed(slot, assumed)?)
                } else {
                    let observed = frame.tag(slot)?;
                    Err(self.signal(id, Observation::Tag(observed)))
                }
            }
            Shape::Generic => Ok(frame.read(slot)?),
        }
    }

    // Writes

    pub(super) fn execute_write(
        &mut self,
        id: NodeId,
        slot: LocalSlot,
        value: NodeId,
        shape: Shape,
        frame: &mut Frame,
    ) -> ExecResult<Value> {
        match self.effective(shape) {
            Shape::Uninitialized => {
                if self.program.arena().has_side_effects(value) {
                    return Err(self.signal(id, Observation::SideEffects));
                }
                let observed = self.execute(value, frame)?.tag();
                return Err(self.signal(id, Observation::Tag(observed)));
            }
            Shape::Assume(Tag::Int) => {
                let n = self.typed_operand(id, value, frame, Self::execute_int)?;
                frame.write_int(slot, n)?;
            }
            Shape::Assume(Tag::Bool) => {
                let b = self.typed_operand(id, value, frame, Self::execute_bool)?;
                frame.write_bool(slot, b)?;
            }
            Shape::Assume(_) | Shape::Generic => {
                let v = self.execute(value, frame)?;
                frame.write(slot, v)?;
            }
        }
        Ok(Value::Unit)
    }

    /// Run a typed entry on `child` on behalf of the speculative node
    /// `parent`. A mismatch rewrites `parent` to its generic variant.
    fn typed_operand<T>(
        &mut self,
        parent: NodeId,
        child: NodeId,
        frame: &mut Frame,
        entry: fn(&mut Self, NodeId, &mut Frame) -> ExecResult<T>,
    ) -> ExecResult<T> {
        entry(self, child, frame).map_err(|interrupt| match interrupt {
            Interrupt::TypeMismatch(actual) => self.signal(parent, Observation::Mismatch(actual)),
            other => other,
        })
    }

    // Binaries

    pub(super) fn execute_binary(
        &mut self,
        id: NodeId,
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
        shape: Shape,
        frame: &mut Frame,
    ) -> ExecResult<Value> {
        match self.effective(shape) {
            Shape::Uninitialized => self.observe_binary(id, lhs, rhs, frame),
            Shape::Assume(_) if op.is_comparison() => self
                .speculative_compare(id, op, lhs, rhs, frame)
                .map(Value::Bool),
            Shape::Assume(_) => self
                .speculative_arith(id, op, lhs, rhs, frame)
                .map(Value::Int),
            Shape::Generic => {
                let left = self.run_boundary(lhs, frame)?;
                let right = self.run_boundary(rhs, frame)?;
                Ok(evaluate_binary(left, right, op)?)
            }
        }
    }

    /// First execution of a binary: look at the operand types and pick a
    /// variant. Always interrupts.
    fn observe_binary(
        &mut self,
        id: NodeId,
        lhs: NodeId,
        rhs: NodeId,
        frame: &mut Frame,
    ) -> ExecResult<Value> {
        let arena = self.program.arena();
        if arena.has_side_effects(lhs) || arena.has_side_effects(rhs) {
            return Err(self.signal(id, Observation::SideEffects));
        }
        let left = self.execute(lhs, frame)?.tag();
        let right = self.execute(rhs, frame)?.tag();
        let observation = if left == Tag::Int && right == Tag::Int {
            Observation::Tag(Tag::Int)
        } else {
            Observation::Operands(left, right)
        };
        Err(self.signal(id, observation))
    }

    /// Int arithmetic on unboxed operands. The right operand is not touched
    /// until the left one has produced an int.
    fn speculative_arith(
        &mut self,
        id: NodeId,
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
        frame: &mut Frame,
    ) -> ExecResult<i64> {
        let a = self.typed_operand(id, lhs, frame, Self::execute_int)?;
        let b = self.typed_operand(id, rhs, frame, Self::execute_int)?;
        Ok(int_arith(a, b, op)?)
    }

    fn speculative_compare(
        &mut self,
        id: NodeId,
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
        frame: &mut Frame,
    ) -> ExecResult<bool> {
        let a = self.typed_operand(id, lhs, frame, Self::execute_int)?;
        let b = self.typed_operand(id, rhs, frame, Self::execute_int)?;
        Ok(int_compare(a, b, op)?)
    }

    // Statements

    /// Each statement is its own retry boundary. Yields the last value.
    pub(super) fn execute_block(&mut self, stmts: NodeRange, frame: &mut Frame) -> ExecResult<Value> {
        let mut last = Value::Unit;
        for index in 0..stmts.len() {
            let stmt = self.program.arena().get_list(stmts)[index];
            last = self.run_boundary(stmt, frame)?;
        }
        Ok(last)
    }

    /// Condition of an `if` or loop. A non-bool condition is fatal.
    pub(super) fn condition(&mut self, cond: NodeId, frame: &mut Frame) -> ExecResult<bool> {
        self.execute_bool(cond, frame)
            .map_err(|interrupt| match interrupt {
                Interrupt::TypeMismatch(actual) => condition_not_bool(actual).into(),
                other => other,
            })
    }

    pub(super) fn execute_if(
        &mut self,
        cond: NodeId,
        then_branch: NodeId,
        else_branch: NodeId,
        frame: &mut Frame,
    ) -> ExecResult<Value> {
        if self.condition(cond, frame)? {
            Ok(self.run_boundary(then_branch, frame)?)
        } else if else_branch.is_valid() {
            Ok(self.run_boundary(else_branch, frame)?)
        } else {
            Ok(Value::Unit)
        }
    }

    pub(super) fn execute_print(&mut self, value: NodeId, frame: &mut Frame) -> ExecResult<Value> {
        let v = self.execute(value, frame)?;
        self.print_handler.println(&v.to_string());
        Ok(Value::Unit)
    }
}
