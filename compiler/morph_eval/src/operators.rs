//! Binary operator implementations.
//!
//! `evaluate_binary` is the generic path: it dispatches on the runtime types
//! of both operands. The speculative int path calls [`int_arith`] and
//! [`BinaryOp::compare_ints`] directly on unboxed operands; both paths share
//! the same checked arithmetic, so overflow reports identically.

use morph_ir::BinaryOp;

use crate::errors::{binary_type_mismatch, integer_overflow, EvalResult};
use crate::Value;

/// Checked arithmetic on two ints.
///
/// Comparison operators are rejected; they produce bools, not ints.
#[inline]
pub fn int_arith(a: i64, b: i64, op: BinaryOp) -> EvalResult<i64> {
    match op {
        BinaryOp::Add => a.checked_add(b).ok_or_else(|| integer_overflow("addition")),
        BinaryOp::Sub => a.checked_sub(b).ok_or_else(|| integer_overflow("subtraction")),
        BinaryOp::Mul => a
            .checked_mul(b)
            .ok_or_else(|| integer_overflow("multiplication")),
        _ => Err(binary_type_mismatch(op, "int", "int")),
    }
}

/// Int comparison; arithmetic operators are rejected.
#[inline]
pub fn int_compare(a: i64, b: i64, op: BinaryOp) -> EvalResult<bool> {
    op.compare_ints(a, b)
        .ok_or_else(|| binary_type_mismatch(op, "int", "int"))
}

/// Evaluate a binary operation on two dynamically typed values.
#[allow(
    clippy::needless_pass_by_value,
    reason = "callers hand over owned operand values"
)]
pub fn evaluate_binary(left: Value, right: Value, op: BinaryOp) -> EvalResult {
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => eval_int_binary(*a, *b, op),
        (Value::Bool(a), Value::Bool(b)) => eval_bool_binary(*a, *b, op),
        (Value::Str(a), Value::Str(b)) => eval_string_binary(a, b, op),
        (Value::Unit, Value::Unit) => eval_equality(true, op, &left, &right),
        _ => eval_equality(false, op, &left, &right),
    }
}

/// Equality between values with no richer operator table. Values of
/// different types are never equal.
fn eval_equality(equal: bool, op: BinaryOp, left: &Value, right: &Value) -> EvalResult {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(equal)),
        BinaryOp::NotEq => Ok(Value::Bool(!equal)),
        _ => Err(binary_type_mismatch(op, left.type_name(), right.type_name())),
    }
}

fn eval_int_binary(a: i64, b: i64, op: BinaryOp) -> EvalResult {
    if op.is_comparison() {
        int_compare(a, b, op).map(Value::Bool)
    } else {
        int_arith(a, b, op).map(Value::Int)
    }
}

fn eval_bool_binary(a: bool, b: bool, op: BinaryOp) -> EvalResult {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(a == b)),
        BinaryOp::NotEq => Ok(Value::Bool(a != b)),
        _ => Err(binary_type_mismatch(op, "bool", "bool")),
    }
}

fn eval_string_binary(a: &str, b: &str, op: BinaryOp) -> EvalResult {
    match op {
        BinaryOp::Add => {
            let mut out = String::with_capacity(a.len() + b.len());
            out.push_str(a);
            out.push_str(b);
            Ok(Value::Str(out.into()))
        }
        BinaryOp::Eq => Ok(Value::Bool(a == b)),
        BinaryOp::NotEq => Ok(Value::Bool(a != b)),
        BinaryOp::Lt => Ok(Value::Bool(a < b)),
        BinaryOp::LtEq => Ok(Value::Bool(a <= b)),
        BinaryOp::Gt => Ok(Value::Bool(a > b)),
        BinaryOp::GtEq => Ok(Value::Bool(a >= b)),
        BinaryOp::Sub | BinaryOp::Mul => Err(binary_type_mismatch(op, "str", "str")),
    }
}
