//! Morph evaluator - a self-specializing tree-walking interpreter.
//!
//! Executing a node may rewrite it in place into a variant specialized for
//! the types it has observed. Speculative variants read and write unboxed
//! primitives through typed frame slots; when an assumption fails they
//! deoptimize to a generic variant and the nearest retry boundary
//! re-executes the affected subtree. Hot loops are replaced on the stack by
//! a fused form whose condition is a single frame guard.
//!
//! # Architecture
//!
//! - `value` / `frame`: runtime values and tagged slot storage
//! - `signal`: the interrupts that carry type mismatches and rewrites
//! - `specialize`: the specialization policy and rewrite accounting
//! - `operators`: generic and int binary operator semantics
//! - `interpreter`: execution entries, retry boundaries, loops, calls
//!
//! A program built in `EvalMode::GenericOnly` runs the same tree without
//! specializing; both modes produce the same results, frames, output, and
//! errors.
//!
//! # Logging
//!
//! Rewrites are logged at `debug`, calls at `trace`. Call [`init_tracing`]
//! and set `RUST_LOG=morph_eval=debug` to see them.

use std::sync::Once;

pub mod errors;
mod eval_mode;
mod frame;
mod interpreter;
mod operators;
mod print_handler;
mod signal;
mod specialize;
mod stack;
mod value;

pub use errors::{EvalError, EvalErrorKind, EvalResult, FrameError};
pub use eval_mode::EvalMode;
pub use frame::Frame;
pub use interpreter::{
    Interpreter, InterpreterBuilder, DEFAULT_LOOP_STABILITY_THRESHOLD, DEFAULT_MAX_CALL_DEPTH,
};
pub use operators::evaluate_binary;
pub use print_handler::{
    buffer_handler, silent_handler, stdout_handler, BufferPrintHandler, PrintHandlerImpl,
    SharedPrintHandler,
};
pub use signal::{ExecResult, Interrupt, Observation, Rewrite, RewriteReason};
pub use specialize::{
    RewriteEvent, SpecializationStats, Specializer, MAX_REWRITES_PER_POSITION,
};
pub use stack::ensure_sufficient_stack;
pub use value::Value;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call multiple times. Does nothing unless `RUST_LOG` is set.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
