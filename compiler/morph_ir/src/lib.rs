//! Morph IR - the self-modifying node tree.
//!
//! This crate holds the data the interpreter executes and rewrites:
//! - IDs for tree positions, slots, functions and string constants
//! - `NodeArena`: flat node storage where a position's variant can be replaced
//! - `NodeKind`: the node variants, with their specialization `Shape`
//! - `ProgramBuilder`: constructors for the initial, unspecialized tree
//! - `Program`: a validated arena plus its function table
//!
//! # Design Philosophy
//!
//! - **Flatten Everything**: no `Box<Node>`; children are `NodeId(u32)` indices
//! - **Replace, don't mutate**: a rewrite writes a whole new `NodeKind` into a
//!   position; the variant values themselves are `Copy` and never edited
//! - **Validate once**: malformed trees are rejected at `finish()`, so the
//!   interpreter never meets a dangling or shared child

mod arena;
mod builder;
mod ids;
mod node;
mod operators;
mod program;
mod strings;

pub use arena::NodeArena;
pub use builder::{BuildError, ProgramBuilder};
pub use ids::{FuncId, LocalSlot, NodeId, NodeRange, StrId};
pub use node::{GuardOperand, LoopGuard, NodeKind, OsrState, Shape, Tag};
pub use operators::BinaryOp;
pub use program::{Function, Program};
pub use strings::StringPool;
