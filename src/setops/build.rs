// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! `build_from_decomposition`: stitch an ordered list of disjoint
//! subtrees/leaves (spec.md §4.6.2's `DisjointList`) of differing heights
//! back into one balanced B+ tree (spec.md §4.6.3).
//!
//! The spec's original realization threads an explicit `frontier` (a path
//! from the root down one edge of the tree) through the list and attaches
//! each entry at an "insertion depth" computed from the height difference,
//! splitting and carrying a new root into existence when an ancestor
//! overflows. This crate folds the list pairwise through [`join`], a
//! standalone two-tree join: attach the shorter tree into the taller tree's
//! adjoining spine (rightmost if the taller tree is on the left, leftmost
//! if on the right) at the depth where the heights match, splicing and
//! splitting on overflow exactly the way a normal insertion propagates a
//! split upward. Folding left-to-right over the list reproduces the same
//! "amortized O(height difference) per entry" cost profile the frontier
//! design is after, since an entry that slots in next to the already-built
//! result only ever touches the nodes on the adjoining edge.

use std::rc::Rc;

use crate::node::{InternalNode, LeafNode, Node, NodeRef};

/// `height` convention: `0` means "this node is a leaf".
pub(crate) fn height_of<K, V>(node: &NodeRef<K, V>) -> usize {
    let mut h = 0;
    let mut n = node;
    while let Node::Internal(i) = n.as_ref() {
        h += 1;
        n = &i.children[0];
    }
    h
}

/// Join two trees of known height into one, assuming every key in `left`
/// is less than every key in `right` (the caller — `build_from_decomposition`
/// folding an ascending disjoint list — guarantees this). Returns the new
/// `(height, root)`.
pub(crate) fn join<K: Clone, V: Clone>(
    left_h: usize,
    left: NodeRef<K, V>,
    right_h: usize,
    right: NodeRef<K, V>,
    max_node_size: usize,
) -> (usize, NodeRef<K, V>) {
    use std::cmp::Ordering::*;
    match left_h.cmp(&right_h) {
        Equal => join_same_height(left, right, max_node_size),
        Less => {
            // `right` is taller: descend its leftmost child, attach `left`
            // there, and splice any carried overflow back in.
            let Node::Internal(ri) = right.as_ref() else { unreachable!("right_h > 0 implies internal") };
            let (sub_h, sub) = join(left_h, left, right_h - 1, Rc::clone(&ri.children[0]), max_node_size);
            attach_into(right_h, ri, 0, right_h - 1, sub_h, sub, max_node_size)
        }
        Greater => {
            let Node::Internal(li) = left.as_ref() else { unreachable!("left_h > 0 implies internal") };
            let last = li.children.len() - 1;
            let (sub_h, sub) = join(left_h - 1, Rc::clone(&li.children[last]), right_h, right, max_node_size);
            attach_into(left_h, li, last, left_h - 1, sub_h, sub, max_node_size)
        }
    }
}

fn join_same_height<K: Clone, V: Clone>(left: NodeRef<K, V>, right: NodeRef<K, V>, max_node_size: usize) -> (usize, NodeRef<K, V>) {
    match (left.as_ref(), right.as_ref()) {
        (Node::Leaf(a), Node::Leaf(b)) => {
            if a.keys.len() + b.keys.len() <= max_node_size {
                let mut keys = a.keys.clone();
                let mut values = a.values.clone();
                keys.extend(b.keys.iter().cloned());
                values.extend(b.values.iter().cloned());
                (0, Rc::new(Node::Leaf(LeafNode { keys, values })))
            } else {
                (1, Rc::new(Node::Internal(InternalNode::from_children(vec![left, right]))))
            }
        }
        (Node::Internal(a), Node::Internal(b)) => {
            let h = height_of(&left);
            if a.children.len() + b.children.len() <= max_node_size {
                let mut children = a.children.clone();
                children.extend(b.children.iter().cloned());
                (h, Rc::new(Node::Internal(InternalNode::from_children(children))))
            } else {
                (h + 1, Rc::new(Node::Internal(InternalNode::from_children(vec![left, right]))))
            }
        }
        _ => unreachable!("join_same_height called with mismatched node variants"),
    }
}

/// Replace `parent.children[slot]` with `new_child` (height `expected_h`).
/// If `join` had to wrap `new_child` one level taller than expected (because
/// the join at that depth itself overflowed), splice its two constituent
/// children into `slot` instead of replacing it 1:1, and propagate a split
/// upward exactly like `InternalNode::set` does on overflow. The children
/// stay in ascending key order regardless of which edge was attached, so a
/// resulting overflow always splits into `[left_node, right_node]`.
fn attach_into<K: Clone, V: Clone>(
    parent_h: usize,
    parent: &InternalNode<K, V>,
    slot: usize,
    expected_h: usize,
    new_h: usize,
    new_child: NodeRef<K, V>,
    max_node_size: usize,
) -> (usize, NodeRef<K, V>) {
    let mut children = parent.children.clone();
    if new_h == expected_h {
        children[slot] = new_child;
    } else {
        debug_assert_eq!(new_h, expected_h + 1, "join only ever grows by one level at a time");
        let Node::Internal(wrapped) = new_child.as_ref() else { unreachable!() };
        children.splice(slot..=slot, wrapped.children.iter().cloned());
    }
    if children.len() <= max_node_size {
        (parent_h, Rc::new(Node::Internal(InternalNode::from_children(children))))
    } else {
        let mid = children.len() / 2;
        let right_half = children.split_off(mid);
        let left_node = Rc::new(Node::Internal(InternalNode::from_children(children)));
        let right_node = Rc::new(Node::Internal(InternalNode::from_children(right_half)));
        (parent_h + 1, Rc::new(Node::Internal(InternalNode::from_children(vec![left_node, right_node]))))
    }
}

/// Stitch an ordered, non-overlapping `(height, subtree)` list into one
/// balanced tree by folding [`join`] left to right. An empty list yields the
/// canonical empty leaf.
pub(crate) fn build_from_decomposition<K: Clone, V: Clone>(mut entries: Vec<(usize, NodeRef<K, V>)>, max_node_size: usize) -> (usize, NodeRef<K, V>) {
    if entries.is_empty() {
        return (0, Rc::new(Node::Leaf(LeafNode::empty())));
    }
    let (mut acc_h, mut acc) = entries.remove(0);
    for (h, node) in entries {
        let (nh, nn) = join(acc_h, acc, h, node, max_node_size);
        acc_h = nh;
        acc = nn;
    }
    (acc_h, acc)
}
