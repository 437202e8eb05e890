#![allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use morph_ir::{BinaryOp, LocalSlot, OsrState, ProgramBuilder, Tag};
use pretty_assertions::assert_eq;

use super::*;
use crate::errors::{binary_type_mismatch, condition_not_bool, stack_overflow};
use crate::print_handler::buffer_handler;
use crate::signal::RewriteReason;
use crate::specialize::MAX_REWRITES_PER_POSITION;
use crate::FrameError;

/// `cnt := 0; while (cnt < limit) { cnt := cnt + 1 }`
///
/// Returns the program, the root block and the loop.
fn counting_loop(limit: i64) -> (Program, NodeId, NodeId) {
    let mut b = ProgramBuilder::new();
    let zero = b.int(0);
    let init = b.write(0, zero);
    let cnt = b.read(0);
    let lim = b.int(limit);
    let cond = b.lt(cnt, lim);
    let cnt2 = b.read(0);
    let one = b.int(1);
    let inc = b.add(cnt2, one);
    let step = b.write(0, inc);
    let body = b.block(&[step]);
    let lp = b.while_loop(cond, body);
    let root = b.block(&[init, lp]);
    (b.finish().unwrap(), root, lp)
}

fn interpreter(program: Program, mode: EvalMode) -> Interpreter {
    Interpreter::builder(program)
        .mode(mode)
        .print_handler(buffer_handler())
        .build()
}

#[test]
fn counting_loop_specializes_and_fuses() {
    let (program, root, lp) = counting_loop(100);
    let mut interp = interpreter(program, EvalMode::Specializing);
    let mut frame = Frame::new(1);

    assert_eq!(interp.run(root, &mut frame).unwrap(), Value::Unit);
    assert_eq!(frame.snapshot(), vec![Some(Value::Int(100))]);

    let stats = interp.stats().clone();
    assert_eq!(stats.speculations, 6);
    assert_eq!(stats.loop_fusions, 1);
    assert_eq!(stats.deoptimizations, 0);
    assert_eq!(stats.total_rewrites(), 7);
    assert!(matches!(
        interp.program().arena().kind(lp),
        NodeKind::FusedWhile { .. }
    ));

    // A settled tree runs again without a single rewrite.
    let mut frame = Frame::new(1);
    interp.run(root, &mut frame).unwrap();
    assert_eq!(frame.snapshot(), vec![Some(Value::Int(100))]);
    assert_eq!(interp.stats(), &stats);
}

#[test]
fn generic_only_mode_never_rewrites() {
    let (program, root, lp) = counting_loop(100);
    let mut interp = interpreter(program, EvalMode::GenericOnly);
    let mut frame = Frame::new(1);
    interp.run(root, &mut frame).unwrap();
    assert_eq!(frame.snapshot(), vec![Some(Value::Int(100))]);
    assert_eq!(interp.stats().total_rewrites(), 0);
    assert!(matches!(
        interp.program().arena().kind(lp),
        NodeKind::While {
            osr: OsrState::Eligible,
            ..
        }
    ));
}

#[test]
fn left_operand_signal_leaves_right_operand_untouched() {
    let mut b = ProgramBuilder::new();
    let x = b.read(0);
    let y = b.read(1);
    let sum = b.add(x, y);
    let mut program = b.finish().unwrap();
    let arena = program.arena_mut();
    arena.replace(
        x,
        NodeKind::Read {
            slot: LocalSlot::new(0),
            shape: Shape::Assume(Tag::Int),
        },
    );
    arena.replace(
        sum,
        NodeKind::Binary {
            op: BinaryOp::Add,
            lhs: x,
            rhs: y,
            shape: Shape::Assume(Tag::Int),
        },
    );

    let mut interp = interpreter(program, EvalMode::Specializing);
    let mut frame = Frame::new(2);
    frame.write(LocalSlot::new(0), Value::string("s")).unwrap();
    frame.write_int(LocalSlot::new(1), 2).unwrap();

    let Err(Interrupt::UnexpectedResult(rewrite)) = interp.execute(sum, &mut frame) else {
        panic!("expected the left operand to signal");
    };
    assert_eq!(rewrite.target, x);
    assert_eq!(
        *interp.program().arena().kind(y),
        NodeKind::Read {
            slot: LocalSlot::new(1),
            shape: Shape::Uninitialized,
        }
    );

    // Driven to completion, the binary deoptimizes and reports the same
    // error a generic run would.
    assert_eq!(
        interp.run(sum, &mut frame),
        Err(binary_type_mismatch(BinaryOp::Add, "str", "int"))
    );
    assert_eq!(
        interp.program().arena().kind(sum).shape(),
        Some(Shape::Generic)
    );
}

/// `i := 0; while (i != 10) { if (i == 5) { i := "five" } else { if (i == "five") { i := 10 } else { i := i + 1 } } }`
fn type_switching_loop() -> (Program, NodeId, NodeId) {
    let mut b = ProgramBuilder::new();
    let zero = b.int(0);
    let init = b.write(0, zero);

    let i = b.read(0);
    let ten = b.int(10);
    let cond = b.binary(BinaryOp::NotEq, i, ten);

    let i = b.read(0);
    let five = b.int(5);
    let is_five = b.eq(i, five);
    let text = b.str("five");
    let to_text = b.write(0, text);

    let i = b.read(0);
    let text = b.str("five");
    let is_text = b.eq(i, text);
    let ten = b.int(10);
    let to_ten = b.write(0, ten);

    let i = b.read(0);
    let one = b.int(1);
    let inc = b.add(i, one);
    let step = b.write(0, inc);

    let inner = b.if_else(is_text, to_ten, Some(step));
    let outer = b.if_else(is_five, to_text, Some(inner));
    let body = b.block(&[outer]);
    let lp = b.while_loop(cond, body);
    let root = b.block(&[init, lp]);
    (b.finish().unwrap(), root, lp)
}

#[test]
fn fused_loop_deoptimizes_when_guard_slot_changes_type() {
    let (program, root, lp) = type_switching_loop();
    let mut interp = interpreter(program, EvalMode::Specializing);
    let mut frame = Frame::new(1);
    interp.run(root, &mut frame).unwrap();

    assert_eq!(frame.snapshot(), vec![Some(Value::Int(10))]);
    assert_eq!(interp.stats().loop_fusions, 1);
    assert_eq!(interp.stats().loop_deoptimizations, 1);
    assert!(matches!(
        interp.program().arena().kind(lp),
        NodeKind::While {
            osr: OsrState::Disabled,
            ..
        }
    ));
    assert!(interp.specializer().max_rewrites_per_position() <= MAX_REWRITES_PER_POSITION);

    let (program, root, _) = type_switching_loop();
    let mut generic = interpreter(program, EvalMode::GenericOnly);
    let mut generic_frame = Frame::new(1);
    generic.run(root, &mut generic_frame).unwrap();
    assert_eq!(generic_frame.snapshot(), frame.snapshot());
}

#[test]
fn recursion_past_call_depth_limit_is_fatal() {
    // f(n) = if (n == 0) { 0 } else { f(n - 1) }
    let mut b = ProgramBuilder::new();
    let f = b.declare_function("f", 1, 1);
    let n = b.read(0);
    let zero = b.int(0);
    let done = b.eq(n, zero);
    let base = b.int(0);
    let n = b.read(0);
    let one = b.int(1);
    let pred = b.sub(n, one);
    let recurse = b.call(f, &[pred]);
    let body = b.if_else(done, base, Some(recurse));
    b.define_function(f, body).unwrap();
    let program = b.finish().unwrap();

    let mut interp = Interpreter::builder(program)
        .max_call_depth(10)
        .print_handler(buffer_handler())
        .build();
    assert_eq!(
        interp.run_function(f, vec![Value::Int(100)]),
        Err(stack_overflow(10))
    );
    assert_eq!(interp.run_function(f, vec![Value::Int(5)]), Ok(Value::Int(0)));
}

#[test]
fn non_bool_condition_is_fatal_in_both_modes() {
    for mode in [EvalMode::Specializing, EvalMode::GenericOnly] {
        let mut b = ProgramBuilder::new();
        let one = b.int(1);
        let two = b.int(2);
        let branch = b.if_else(one, two, None);
        let program = b.finish().unwrap();
        let mut interp = interpreter(program, mode);
        assert_eq!(
            interp.run(branch, &mut Frame::new(0)),
            Err(condition_not_bool(Tag::Int))
        );
    }
}

#[test]
fn reading_unset_slot_is_undefined_variable_in_both_modes() {
    for mode in [EvalMode::Specializing, EvalMode::GenericOnly] {
        let mut b = ProgramBuilder::new();
        let x = b.read(0);
        let program = b.finish().unwrap();
        let mut interp = interpreter(program, mode);
        assert_eq!(
            interp.run(x, &mut Frame::new(1)),
            Err(FrameError::Unset {
                slot: LocalSlot::new(0)
            }
            .into())
        );
    }
}

#[test]
fn speculative_read_of_unset_slot_deoptimizes_then_fails() {
    // read(0) + 1
    let mut b = ProgramBuilder::new();
    let x = b.read(0);
    let one = b.int(1);
    let sum = b.add(x, one);
    let program = b.finish().unwrap();
    let mut interp = interpreter(program, EvalMode::Specializing);

    let mut frame = Frame::new(1);
    frame.write_int(LocalSlot::new(0), 2).unwrap();
    assert_eq!(interp.run(sum, &mut frame), Ok(Value::Int(3)));
    assert_eq!(
        interp.program().arena().kind(x).shape(),
        Some(Shape::Assume(Tag::Int))
    );
    let speculated = interp.specializer().history().len();

    assert_eq!(
        interp.run(sum, &mut Frame::new(1)),
        Err(FrameError::Unset {
            slot: LocalSlot::new(0)
        }
        .into())
    );
    let deopt = &interp.specializer().history()[speculated..];
    assert_eq!(deopt.len(), 1);
    assert_eq!(deopt[0].target, x);
    assert_eq!((deopt[0].from, deopt[0].to), ("IntRead", "GenericRead"));
    assert_eq!(
        deopt[0].reason,
        RewriteReason::Deoptimize {
            assumed: Tag::Int,
            observed: Observation::Tag(Tag::Unset),
        }
    );

    // The generic read still serves ints.
    assert_eq!(interp.run(sum, &mut frame), Ok(Value::Int(3)));
    assert_eq!(interp.specializer().history().len(), speculated + 1);
}

#[test]
fn zero_stability_threshold_still_fuses() {
    let (program, root, lp) = counting_loop(100);
    let mut interp = Interpreter::builder(program)
        .loop_stability_threshold(0)
        .print_handler(buffer_handler())
        .build();
    assert_eq!(interp.loop_stability_threshold, 1);

    let mut frame = Frame::new(1);
    interp.run(root, &mut frame).unwrap();
    assert_eq!(frame.snapshot(), vec![Some(Value::Int(100))]);
    assert_eq!(interp.stats().loop_fusions, 1);
    assert!(matches!(
        interp.program().arena().kind(lp),
        NodeKind::FusedWhile { .. }
    ));
}

#[test]
fn print_writes_to_handler() {
    let mut b = ProgramBuilder::new();
    let three = b.int(3);
    let four = b.int(4);
    let sum = b.add(three, four);
    let print = b.print(sum);
    let program = b.finish().unwrap();
    let mut interp = interpreter(program, EvalMode::Specializing);
    interp.run(print, &mut Frame::new(0)).unwrap();
    assert_eq!(interp.print_handler().get_output(), "7\n");
}

#[test]
fn unknown_root_is_rejected() {
    let (program, ..) = counting_loop(1);
    let mut interp = interpreter(program, EvalMode::Specializing);
    let bogus = NodeId::new(1000);
    assert_eq!(
        interp.run(bogus, &mut Frame::new(1)),
        Err(unknown_node(bogus))
    );
}
