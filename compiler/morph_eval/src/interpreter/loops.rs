//! Loops, the loop merge point, and on-stack replacement.
//!
//! A `While` counts consecutive iterations in which no rewrite happened
//! anywhere. Once the count reaches the stability threshold, the merge point
//! (the top of an iteration, before the condition) checks whether the
//! condition has settled into an int comparison of int slots and constants.
//! If so, the loop is replaced in place by a `FusedWhile` that evaluates the
//! condition through a [`LoopGuard`] on the frame, and execution continues in
//! the fused form from the same iteration. When a guard slot stops holding
//! an int, the fused loop deoptimizes back to a `While` that will never fuse
//! again and resumes from the merge point.

use morph_ir::{GuardOperand, LoopGuard, NodeArena, NodeId, NodeKind, OsrState, Shape, Tag};

use super::Interpreter;
use crate::frame::Frame;
use crate::signal::{ExecResult, Interrupt};
use crate::Value;

impl Interpreter {
    pub(super) fn execute_while(
        &mut self,
        id: NodeId,
        cond: NodeId,
        body: NodeId,
        osr: OsrState,
        frame: &mut Frame,
    ) -> ExecResult<Value> {
        let mut may_fuse = osr == OsrState::Eligible && self.mode.specializes();
        let mut stable_iterations: u32 = 0;
        loop {
            tracing::trace!(node = %id, stable_iterations, "merge point");
            if may_fuse && stable_iterations >= self.loop_stability_threshold {
                may_fuse = false;
                let arena = self.program.arena();
                if let Some(guard) = compile_guard(arena, cond) {
                    if let Some(rewrite) = self.specializer.fuse_loop(arena, id, guard) {
                        tracing::debug!(node = %id, stable_iterations, "entering fused loop");
                        self.apply(rewrite)?;
                        return self.execute_fused_while(id, guard, cond, body, frame);
                    }
                }
            }

            let rewrites_before = self.stats().total_rewrites();
            match self.condition(cond, frame) {
                Ok(true) => {}
                Ok(false) => break,
                Err(Interrupt::UnexpectedResult(rewrite)) => {
                    self.apply(*rewrite)?;
                    stable_iterations = 0;
                    continue;
                }
                Err(other) => return Err(other),
            }
            self.run_boundary(body, frame)?;

            if self.stats().total_rewrites() == rewrites_before {
                stable_iterations = stable_iterations.saturating_add(1);
            } else {
                stable_iterations = 0;
            }
        }
        Ok(Value::Unit)
    }

    pub(super) fn execute_fused_while(
        &mut self,
        id: NodeId,
        guard: LoopGuard,
        cond: NodeId,
        body: NodeId,
        frame: &mut Frame,
    ) -> ExecResult<Value> {
        if !self.mode.specializes() {
            return self.execute_while(id, cond, body, OsrState::Disabled, frame);
        }
        loop {
            let Some(holds) = check_guard(guard, frame) else {
                tracing::debug!(node = %id, "loop guard failed, leaving fused loop");
                if let Some(rewrite) = self.specializer.deoptimize_loop(self.program.arena(), id) {
                    self.apply(rewrite)?;
                }
                return self.execute_while(id, cond, body, OsrState::Disabled, frame);
            };
            if !holds {
                break;
            }
            self.run_boundary(body, frame)?;
        }
        Ok(Value::Unit)
    }
}

/// Compile a settled loop condition into a guard.
///
/// Only an int comparison whose operands are int reads or int literals
/// qualifies.
pub(super) fn compile_guard(arena: &NodeArena, cond: NodeId) -> Option<LoopGuard> {
    let NodeKind::Binary {
        op,
        lhs,
        rhs,
        shape: Shape::Assume(Tag::Int),
    } = *arena.kind(cond)
    else {
        return None;
    };
    if !op.is_comparison() {
        return None;
    }
    Some(LoopGuard {
        op,
        lhs: guard_operand(arena, lhs)?,
        rhs: guard_operand(arena, rhs)?,
    })
}

fn guard_operand(arena: &NodeArena, id: NodeId) -> Option<GuardOperand> {
    match *arena.kind(id) {
        NodeKind::Read {
            slot,
            shape: Shape::Assume(Tag::Int),
        } => Some(GuardOperand::Slot(slot)),
        NodeKind::IntLiteral(n) => Some(GuardOperand::Const(n)),
        _ => None,
    }
}

/// Evaluate `guard` against the frame. `None` means a slot operand no
/// longer holds an int.
pub(super) fn check_guard(guard: LoopGuard, frame: &Frame) -> Option<bool> {
    let lhs = guard_value(guard.lhs, frame)?;
    let rhs = guard_value(guard.rhs, frame)?;
    guard.op.compare_ints(lhs, rhs)
}

#[inline]
fn guard_value(operand: GuardOperand, frame: &Frame) -> Option<i64> {
    match operand {
        GuardOperand::Const(n) => Some(n),
        GuardOperand::Slot(slot) if frame.is_tag(slot, Tag::Int) => frame.read_int(slot).ok(),
        GuardOperand::Slot(_) => None,
    }
}
