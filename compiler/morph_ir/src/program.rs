//! Validated programs: an arena plus a function table.

use crate::{FuncId, NodeArena, NodeId};

/// A function: its body runs in a fresh frame of `locals` slots, with the
/// arguments written to slots `0..arity`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub arity: u32,
    pub locals: u32,
    pub body: NodeId,
}

/// Output of [`ProgramBuilder::finish`](crate::ProgramBuilder::finish).
///
/// The arena is owned here; the interpreter takes the whole program by value
/// because execution rewrites nodes in place.
#[derive(Clone, Debug)]
pub struct Program {
    arena: NodeArena,
    functions: Vec<Function>,
}

impl Program {
    pub(crate) fn new(arena: NodeArena, functions: Vec<Function>) -> Self {
        Self { arena, functions }
    }

    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut NodeArena {
        &mut self.arena
    }

    pub fn function(&self, id: FuncId) -> Option<&Function> {
        self.functions.get(id.index())
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// Find a function by name.
    pub fn function_id(&self, name: &str) -> Option<FuncId> {
        self.functions
            .iter()
            .position(|f| f.name == name)
            .and_then(|i| u32::try_from(i).ok())
            .map(FuncId::new)
    }
}
