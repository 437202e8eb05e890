use pretty_assertions::assert_eq;

use super::*;
use crate::{BinaryOp, LocalSlot, Shape};

fn read(arena: &mut NodeArena, slot: u32) -> NodeId {
    arena.push(NodeKind::Read {
        slot: LocalSlot::new(slot),
        shape: Shape::Uninitialized,
    })
}

#[test]
fn push_and_kind() {
    let mut arena = NodeArena::new();
    let a = arena.push(NodeKind::IntLiteral(1));
    let b = arena.push(NodeKind::BoolLiteral(true));
    assert_eq!(arena.len(), 2);
    assert_eq!(*arena.kind(a), NodeKind::IntLiteral(1));
    assert_eq!(*arena.kind(b), NodeKind::BoolLiteral(true));
    assert!(arena.contains(b));
    assert!(!arena.contains(NodeId::new(2)));
    assert!(arena.try_kind(NodeId::INVALID).is_none());
}

#[test]
fn replace_swaps_variant_in_place() {
    let mut arena = NodeArena::new();
    let lhs = read(&mut arena, 0);
    let rhs = arena.push(NodeKind::IntLiteral(100));
    let cmp = arena.push(NodeKind::Binary {
        op: BinaryOp::Lt,
        lhs,
        rhs,
        shape: Shape::Uninitialized,
    });

    let specialized = arena.kind(cmp).with_shape(Shape::Generic);
    let old = arena.replace(cmp, specialized);

    assert_eq!(old.shape(), Some(Shape::Uninitialized));
    assert_eq!(arena.kind(cmp).shape(), Some(Shape::Generic));
    // Children are untouched.
    assert_eq!(arena.children(cmp), vec![lhs, rhs]);
    assert_eq!(arena.len(), 3);
}

#[test]
fn lists_round_trip() {
    let mut arena = NodeArena::new();
    let a = arena.push(NodeKind::IntLiteral(1));
    let b = arena.push(NodeKind::IntLiteral(2));
    let range = arena.push_list(&[a, b]);
    assert_eq!(arena.get_list(range), &[a, b]);
    assert_eq!(arena.push_list(&[]), NodeRange::EMPTY);
    assert!(arena.get_list(NodeRange::EMPTY).is_empty());
}

#[test]
fn side_effects_of_pure_expression() {
    let mut arena = NodeArena::new();
    let lhs = read(&mut arena, 0);
    let rhs = arena.push(NodeKind::IntLiteral(1));
    let add = arena.push(NodeKind::Binary {
        op: BinaryOp::Add,
        lhs,
        rhs,
        shape: Shape::Uninitialized,
    });
    assert!(!arena.has_side_effects(add));
}

#[test]
fn side_effects_through_nested_write() {
    let mut arena = NodeArena::new();
    let one = arena.push(NodeKind::IntLiteral(1));
    let write = arena.push(NodeKind::Write {
        slot: LocalSlot::new(0),
        value: one,
        shape: Shape::Uninitialized,
    });
    let two = arena.push(NodeKind::IntLiteral(2));
    let add = arena.push(NodeKind::Binary {
        op: BinaryOp::Add,
        lhs: two,
        rhs: write,
        shape: Shape::Uninitialized,
    });
    assert!(arena.has_side_effects(write));
    assert!(arena.has_side_effects(add));
    assert!(!arena.has_side_effects(two));
}

#[test]
fn children_of_if_without_else() {
    let mut arena = NodeArena::new();
    let cond = arena.push(NodeKind::BoolLiteral(true));
    let then_branch = arena.push(NodeKind::IntLiteral(1));
    let node = arena.push(NodeKind::If {
        cond,
        then_branch,
        else_branch: NodeId::INVALID,
    });
    assert_eq!(arena.children(node), vec![cond, then_branch]);
}
