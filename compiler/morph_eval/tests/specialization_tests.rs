//! End-to-end specialization scenarios through the public API.

#![allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]

use morph_eval::{
    buffer_handler, EvalMode, Frame, Interpreter, RewriteReason, Value,
    MAX_REWRITES_PER_POSITION,
};
use morph_ir::{BinaryOp, FuncId, NodeId, NodeKind, Program, ProgramBuilder, Shape};
use pretty_assertions::assert_eq;

struct AddProgram {
    program: Program,
    add_body: NodeId,
}

/// ```text
/// def add(a, b): return a + b
///
/// sum := 0
/// i := 0
/// while (i < 100) { sum := add(sum, i); i := i + 1 }
/// print(sum)
/// print(add("foo", "bar"))
/// ```
fn add_program() -> AddProgram {
    let mut b = ProgramBuilder::new();

    let add = b.declare_function("add", 2, 2);
    let a = b.read(0);
    let c = b.read(1);
    let add_body = b.add(a, c);
    b.define_function(add, add_body).unwrap();

    let zero = b.int(0);
    let init_sum = b.write(0, zero);
    let zero = b.int(0);
    let init_i = b.write(1, zero);

    let i = b.read(1);
    let hundred = b.int(100);
    let cond = b.lt(i, hundred);
    let sum = b.read(0);
    let i = b.read(1);
    let call = b.call(add, &[sum, i]);
    let accumulate = b.write(0, call);
    let i = b.read(1);
    let one = b.int(1);
    let inc = b.add(i, one);
    let step = b.write(1, inc);
    let body = b.block(&[accumulate, step]);
    let lp = b.while_loop(cond, body);

    let sum = b.read(0);
    let print_sum = b.print(sum);
    let foo = b.str("foo");
    let bar = b.str("bar");
    let concat = b.call(add, &[foo, bar]);
    let print_concat = b.print(concat);

    let main_body = b.block(&[init_sum, init_i, lp, print_sum, print_concat]);
    let main = b.declare_function("main", 0, 2);
    b.define_function(main, main_body).unwrap();

    AddProgram {
        program: b.finish().unwrap(),
        add_body,
    }
}

fn run_main(program: Program, mode: EvalMode) -> (Interpreter, String) {
    morph_eval::init_tracing();
    let handler = buffer_handler();
    let mut interp = Interpreter::builder(program)
        .mode(mode)
        .print_handler(handler.clone())
        .build();
    interp.run_named("main", vec![]).unwrap();
    (interp, handler.get_output())
}

#[test]
fn add_specializes_on_ints_then_generalizes_on_strings() {
    let AddProgram { program, add_body } = add_program();
    let (interp, output) = run_main(program, EvalMode::Specializing);

    assert_eq!(output, "4950\nfoobar\n");
    assert_eq!(
        interp.program().arena().kind(add_body).shape(),
        Some(Shape::Generic)
    );

    let reasons: Vec<_> = interp
        .specializer()
        .history()
        .iter()
        .filter(|event| event.target == add_body)
        .map(|event| (event.from, event.to))
        .collect();
    assert_eq!(
        reasons,
        vec![
            ("UninitializedBinary", "IntBinary"),
            ("IntBinary", "GenericBinary"),
        ]
    );
    assert!(interp.specializer().max_rewrites_per_position() <= MAX_REWRITES_PER_POSITION);
}

#[test]
fn add_program_matches_generic_only_run() {
    let (_, specialized) = run_main(add_program().program, EvalMode::Specializing);
    let (generic, output) = run_main(add_program().program, EvalMode::GenericOnly);
    assert_eq!(specialized, output);
    assert_eq!(generic.stats().total_rewrites(), 0);
}

#[test]
fn direct_calls_return_values() {
    let AddProgram { program, .. } = add_program();
    let mut interp = Interpreter::builder(program)
        .print_handler(buffer_handler())
        .build();
    let add = interp.program().function_id("add").unwrap();
    assert_eq!(
        interp.run_function(add, vec![Value::Int(3), Value::Int(4)]),
        Ok(Value::Int(7))
    );
    assert_eq!(
        interp.run_function(add, vec![Value::from("foo"), Value::from("bar")]),
        Ok(Value::from("foobar"))
    );
    // Back to ints: the generic variant still handles them.
    assert_eq!(
        interp.run_function(add, vec![Value::Int(1), Value::Int(1)]),
        Ok(Value::Int(2))
    );
}

#[test]
fn wrong_argument_count_is_rejected() {
    let AddProgram { program, .. } = add_program();
    let mut interp = Interpreter::new(program);
    let err = interp
        .run_function(FuncId::new(0), vec![Value::Int(1)])
        .unwrap_err();
    assert_eq!(err.to_string(), "`add` expects 2 arguments, got 1");
}

#[test]
fn loop_guard_fuses_after_stability_threshold() {
    // cnt := 0; while (cnt < 100) { cnt := cnt + 1 }
    let mut b = ProgramBuilder::new();
    let zero = b.int(0);
    let init = b.write(0, zero);
    let cnt = b.read(0);
    let limit = b.int(100);
    let cond = b.lt(cnt, limit);
    let cnt = b.read(0);
    let one = b.int(1);
    let inc = b.add(cnt, one);
    let step = b.write(0, inc);
    let body = b.block(&[step]);
    let lp = b.while_loop(cond, body);
    let root = b.block(&[init, lp]);
    let program = b.finish().unwrap();

    let mut interp = Interpreter::builder(program)
        .loop_stability_threshold(5)
        .print_handler(buffer_handler())
        .build();
    let mut frame = Frame::new(1);
    interp.run(root, &mut frame).unwrap();
    assert_eq!(frame.snapshot(), vec![Some(Value::Int(100))]);

    let NodeKind::FusedWhile { guard, .. } = *interp.program().arena().kind(lp) else {
        panic!("loop was not fused");
    };
    assert_eq!(guard.op, BinaryOp::Lt);
    let fusions: Vec<_> = interp
        .specializer()
        .history()
        .iter()
        .filter(|event| matches!(event.reason, RewriteReason::FuseLoop(_)))
        .map(|event| event.target)
        .collect();
    assert_eq!(fusions, vec![lp]);
}

#[test]
fn loop_never_fuses_below_threshold() {
    // cnt := 0; while (cnt < 3) { cnt := cnt + 1 } with a threshold larger
    // than the trip count.
    let mut b = ProgramBuilder::new();
    let zero = b.int(0);
    let init = b.write(0, zero);
    let cnt = b.read(0);
    let limit = b.int(3);
    let cond = b.lt(cnt, limit);
    let cnt = b.read(0);
    let one = b.int(1);
    let inc = b.add(cnt, one);
    let step = b.write(0, inc);
    let lp = b.while_loop(cond, step);
    let root = b.block(&[init, lp]);
    let program = b.finish().unwrap();

    let mut interp = Interpreter::builder(program)
        .loop_stability_threshold(10)
        .print_handler(buffer_handler())
        .build();
    let mut frame = Frame::new(1);
    interp.run(root, &mut frame).unwrap();
    assert_eq!(frame.snapshot(), vec![Some(Value::Int(3))]);
    assert_eq!(interp.stats().loop_fusions, 0);
}
