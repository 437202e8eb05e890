//! The specialization policy and rewrite bookkeeping.
//!
//! [`Specializer::respecialize`] decides what a position becomes after an
//! observation; [`Specializer::apply`] installs the replacement in the arena.
//! Shapes only move forward (`Uninitialized -> Assume -> Generic`), and every
//! position is rewritten at most [`MAX_REWRITES_PER_POSITION`] times, so a
//! run always reaches a fixed point.

use morph_ir::{LoopGuard, NodeArena, NodeId, NodeKind, OsrState, Shape, Tag};
use rustc_hash::FxHashMap;

use crate::errors::{respecialization_limit, unknown_node, EvalError};
use crate::signal::{Observation, Rewrite, RewriteReason};

/// Upper bound on rewrites of a single position.
///
/// Covers `Uninitialized -> Assume -> Generic` and `While -> FusedWhile -> While`.
pub const MAX_REWRITES_PER_POSITION: u32 = 2;

/// Counters over every rewrite applied by one interpreter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpecializationStats {
    /// `Uninitialized -> Assume(tag)`.
    pub speculations: u32,
    /// `Uninitialized -> Generic`.
    pub generalizations: u32,
    /// `Assume(tag) -> Generic`.
    pub deoptimizations: u32,
    /// `While -> FusedWhile`.
    pub loop_fusions: u32,
    /// `FusedWhile -> While`.
    pub loop_deoptimizations: u32,
}

impl SpecializationStats {
    pub fn total_rewrites(&self) -> u32 {
        self.speculations
            + self.generalizations
            + self.deoptimizations
            + self.loop_fusions
            + self.loop_deoptimizations
    }

    fn record(&mut self, reason: RewriteReason) {
        let counter = match reason {
            RewriteReason::Speculate(_) => &mut self.speculations,
            RewriteReason::Generalize(_) => &mut self.generalizations,
            RewriteReason::Deoptimize { .. } => &mut self.deoptimizations,
            RewriteReason::FuseLoop(_) => &mut self.loop_fusions,
            RewriteReason::GuardFailed => &mut self.loop_deoptimizations,
        };
        *counter += 1;
    }
}

/// One applied rewrite, as recorded in the history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewriteEvent {
    pub target: NodeId,
    pub from: &'static str,
    pub to: &'static str,
    pub reason: RewriteReason,
}

#[derive(Default)]
pub struct Specializer {
    rewrites: FxHashMap<NodeId, u32>,
    history: Vec<RewriteEvent>,
    stats: SpecializationStats,
}

impl Specializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &SpecializationStats {
        &self.stats
    }

    /// Every rewrite applied so far, oldest first.
    pub fn history(&self) -> &[RewriteEvent] {
        &self.history
    }

    /// How many times `node` has been rewritten.
    pub fn rewrites_at(&self, node: NodeId) -> u32 {
        self.rewrites.get(&node).copied().unwrap_or(0)
    }

    pub fn max_rewrites_per_position(&self) -> u32 {
        self.rewrites.values().copied().max().unwrap_or(0)
    }

    /// The replacement for `node` after `observation`. `node` must be in
    /// `arena`; the interpreter only signals for positions it is executing.
    pub(crate) fn respecialize(
        &self,
        arena: &NodeArena,
        node: NodeId,
        observation: Observation,
    ) -> Rewrite {
        let current = *arena.kind(node);
        let (shape, reason) = match current.shape() {
            Some(Shape::Uninitialized) => match observation {
                Observation::Tag(tag) if speculable(&current, tag) => {
                    (Shape::Assume(tag), RewriteReason::Speculate(tag))
                }
                other => (Shape::Generic, RewriteReason::Generalize(other)),
            },
            Some(Shape::Assume(assumed)) => (
                Shape::Generic,
                RewriteReason::Deoptimize {
                    assumed,
                    observed: observation,
                },
            ),
            Some(Shape::Generic) | None => (Shape::Generic, RewriteReason::Generalize(observation)),
        };
        Rewrite {
            target: node,
            replacement: current.with_shape(shape),
            reason,
        }
    }

    /// On-stack replacement of a stable `While` with its fused form.
    pub fn fuse_loop(&self, arena: &NodeArena, node: NodeId, guard: LoopGuard) -> Option<Rewrite> {
        match *arena.try_kind(node)? {
            NodeKind::While {
                cond,
                body,
                osr: OsrState::Eligible,
            } => Some(Rewrite {
                target: node,
                replacement: NodeKind::FusedWhile { guard, cond, body },
                reason: RewriteReason::FuseLoop(guard),
            }),
            _ => None,
        }
    }

    /// Restore a fused loop whose guard failed. It will not fuse again.
    pub fn deoptimize_loop(&self, arena: &NodeArena, node: NodeId) -> Option<Rewrite> {
        match *arena.try_kind(node)? {
            NodeKind::FusedWhile { cond, body, .. } => Some(Rewrite {
                target: node,
                replacement: NodeKind::While {
                    cond,
                    body,
                    osr: OsrState::Disabled,
                },
                reason: RewriteReason::GuardFailed,
            }),
            _ => None,
        }
    }

    /// Install `rewrite` in the arena.
    ///
    /// Fails when the target is not in `arena`, or once it has already been
    /// rewritten [`MAX_REWRITES_PER_POSITION`] times.
    pub fn apply(&mut self, arena: &mut NodeArena, rewrite: Rewrite) -> Result<(), EvalError> {
        let Rewrite {
            target,
            replacement,
            reason,
        } = rewrite;
        if !arena.contains(target) {
            return Err(unknown_node(target));
        }
        let count = self.rewrites.entry(target).or_insert(0);
        if *count >= MAX_REWRITES_PER_POSITION {
            return Err(respecialization_limit(target, MAX_REWRITES_PER_POSITION));
        }
        *count += 1;

        let old = arena.replace(target, replacement);
        tracing::debug!(
            node = %target,
            from = old.variant_name(),
            to = replacement.variant_name(),
            %reason,
            "respecialized"
        );
        self.stats.record(reason);
        self.history.push(RewriteEvent {
            target,
            from: old.variant_name(),
            to: replacement.variant_name(),
            reason,
        });
        Ok(())
    }
}

/// Whether a position of this kind has a speculative variant for `tag`.
fn speculable(kind: &NodeKind, tag: Tag) -> bool {
    match kind {
        NodeKind::Read { .. } => tag != Tag::Unset,
        NodeKind::Write { .. } => matches!(tag, Tag::Int | Tag::Bool),
        NodeKind::Binary { .. } => tag == Tag::Int,
        _ => false,
    }
}
