//! Construction of the initial (unspecialized) tree.
//!
//! `ProgramBuilder` is the interface a parser or embedder uses to hand the
//! core an AST. Every node it creates starts in `Shape::Uninitialized`; the
//! interpreter specializes from there. Malformed trees are rejected by
//! [`ProgramBuilder::finish`] and never reach execution.

use thiserror::Error;

use crate::arena::to_u32;
use crate::{
    BinaryOp, FuncId, Function, LocalSlot, NodeArena, NodeId, NodeKind, OsrState, Program, Shape,
};

/// Malformed initial AST.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("node {parent} refers to child {child}, which does not precede it")]
    DanglingChild { parent: NodeId, child: NodeId },
    #[error("node {child} has more than one owner")]
    SharedChild { child: NodeId },
    #[error("function `{name}` has no body")]
    MissingBody { name: String },
    #[error("function `{name}` is defined twice")]
    DuplicateBody { name: String },
    #[error("call to unknown function #{index}")]
    UnknownFunction { index: usize },
    #[error("`{name}` expects {expected} arguments, call passes {got}")]
    ArityMismatch {
        name: String,
        expected: u32,
        got: usize,
    },
    #[error("slot {slot} is outside the {locals} locals of `{name}`")]
    SlotOutOfRange {
        name: String,
        slot: LocalSlot,
        locals: u32,
    },
    #[error("`{name}` declares {arity} parameters but only {locals} locals")]
    InvalidSignature { name: String, arity: u32, locals: u32 },
}

struct FunctionDecl {
    name: String,
    arity: u32,
    locals: u32,
    body: Option<NodeId>,
}

/// Builder for the initial AST.
#[derive(Default)]
pub struct ProgramBuilder {
    arena: NodeArena,
    functions: Vec<FunctionDecl>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    // Leaves

    pub fn int(&mut self, value: i64) -> NodeId {
        self.arena.push(NodeKind::IntLiteral(value))
    }

    pub fn bool(&mut self, value: bool) -> NodeId {
        self.arena.push(NodeKind::BoolLiteral(value))
    }

    pub fn str(&mut self, value: &str) -> NodeId {
        let id = self.arena.strings_mut().intern(value);
        self.arena.push(NodeKind::StrLiteral(id))
    }

    pub fn read(&mut self, slot: u32) -> NodeId {
        self.arena.push(NodeKind::Read {
            slot: LocalSlot::new(slot),
            shape: Shape::Uninitialized,
        })
    }

    // Expressions

    pub fn write(&mut self, slot: u32, value: NodeId) -> NodeId {
        self.arena.push(NodeKind::Write {
            slot: LocalSlot::new(slot),
            value,
            shape: Shape::Uninitialized,
        })
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.arena.push(NodeKind::Binary {
            op,
            lhs,
            rhs,
            shape: Shape::Uninitialized,
        })
    }

    pub fn add(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.binary(BinaryOp::Add, lhs, rhs)
    }

    pub fn sub(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.binary(BinaryOp::Sub, lhs, rhs)
    }

    pub fn mul(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.binary(BinaryOp::Mul, lhs, rhs)
    }

    pub fn lt(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.binary(BinaryOp::Lt, lhs, rhs)
    }

    pub fn eq(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.binary(BinaryOp::Eq, lhs, rhs)
    }

    pub fn call(&mut self, func: FuncId, args: &[NodeId]) -> NodeId {
        let args = self.arena.push_list(args);
        self.arena.push(NodeKind::Call { func, args })
    }

    pub fn print(&mut self, value: NodeId) -> NodeId {
        self.arena.push(NodeKind::Print { value })
    }

    // Statements

    pub fn block(&mut self, stmts: &[NodeId]) -> NodeId {
        let stmts = self.arena.push_list(stmts);
        self.arena.push(NodeKind::Block { stmts })
    }

    pub fn if_else(
        &mut self,
        cond: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    ) -> NodeId {
        self.arena.push(NodeKind::If {
            cond,
            then_branch,
            else_branch: else_branch.unwrap_or(NodeId::INVALID),
        })
    }

    pub fn while_loop(&mut self, cond: NodeId, body: NodeId) -> NodeId {
        self.arena.push(NodeKind::While {
            cond,
            body,
            osr: OsrState::Eligible,
        })
    }

    // Functions

    /// Declare a function so calls to it can be built before its body.
    pub fn declare_function(&mut self, name: &str, arity: u32, locals: u32) -> FuncId {
        let id = FuncId::new(to_u32(self.functions.len(), "functions"));
        self.functions.push(FunctionDecl {
            name: name.to_owned(),
            arity,
            locals,
            body: None,
        });
        id
    }

    pub fn define_function(&mut self, func: FuncId, body: NodeId) -> Result<(), BuildError> {
        let decl = self
            .functions
            .get_mut(func.index())
            .ok_or(BuildError::UnknownFunction {
                index: func.index(),
            })?;
        if decl.body.is_some() {
            return Err(BuildError::DuplicateBody {
                name: decl.name.clone(),
            });
        }
        decl.body = Some(body);
        Ok(())
    }

    /// Validate the tree and produce the program.
    pub fn finish(self) -> Result<Program, BuildError> {
        let ProgramBuilder { arena, functions } = self;

        let mut owners = vec![0u8; arena.len()];
        for index in 0..arena.len() {
            let parent = NodeId::new(to_u32(index, "nodes"));
            for child in arena.children(parent) {
                if child >= parent {
                    return Err(BuildError::DanglingChild { parent, child });
                }
                claim(&mut owners, child)?;
            }
            check_call(&arena, &functions, parent)?;
        }

        let mut out = Vec::with_capacity(functions.len());
        for decl in functions {
            let body = decl.body.ok_or_else(|| BuildError::MissingBody {
                name: decl.name.clone(),
            })?;
            if !arena.contains(body) {
                return Err(BuildError::DanglingChild {
                    parent: NodeId::INVALID,
                    child: body,
                });
            }
            claim(&mut owners, body)?;
            if decl.arity > decl.locals {
                return Err(BuildError::InvalidSignature {
                    name: decl.name,
                    arity: decl.arity,
                    locals: decl.locals,
                });
            }
            check_slots(&arena, body, &decl.name, decl.locals)?;
            out.push(Function {
                name: decl.name,
                arity: decl.arity,
                locals: decl.locals,
                body,
            });
        }

        Ok(Program::new(arena, out))
    }
}

/// Record one more owner for `child`; a second owner breaks the tree shape.
fn claim(owners: &mut [u8], child: NodeId) -> Result<(), BuildError> {
    let count = &mut owners[child.index()];
    if *count > 0 {
        return Err(BuildError::SharedChild { child });
    }
    *count = 1;
    Ok(())
}

fn check_call(
    arena: &NodeArena,
    functions: &[FunctionDecl],
    id: NodeId,
) -> Result<(), BuildError> {
    if let NodeKind::Call { func, args } = *arena.kind(id) {
        let decl = functions
            .get(func.index())
            .ok_or(BuildError::UnknownFunction {
                index: func.index(),
            })?;
        if args.len() != decl.arity as usize {
            return Err(BuildError::ArityMismatch {
                name: decl.name.clone(),
                expected: decl.arity,
                got: args.len(),
            });
        }
    }
    Ok(())
}

fn check_slots(arena: &NodeArena, body: NodeId, name: &str, locals: u32) -> Result<(), BuildError> {
    let mut stack = vec![body];
    while let Some(id) = stack.pop() {
        if let NodeKind::Read { slot, .. } | NodeKind::Write { slot, .. } = *arena.kind(id) {
            if slot.raw() >= locals {
                return Err(BuildError::SlotOutOfRange {
                    name: name.to_owned(),
                    slot,
                    locals,
                });
            }
        }
        stack.extend(arena.children(id));
    }
    Ok(())
}
