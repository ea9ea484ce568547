// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! B+-Tree node representation with copy-on-write sharing.
//!
//! A node is reached through a [`NodeRef`], an `Rc<Node<K, V>>`. Sharing is
//! not tracked with a separate boolean flag; `Rc`'s own reference count is
//! the flag. `Rc::strong_count(&node) > 1` means the node is reachable from
//! more than one tree (or more than one place in a mutation in flight) and
//! must not be mutated in place. [`Rc::make_mut`] is the CoW primitive used
//! throughout this crate: it clones the pointee only when the count is
//! greater than one, and the clone is shallow with respect to children —
//! cloning an `InternalNode` clones its `Vec<NodeRef<K, V>>` of child
//! pointers, which bumps each child's own count, which is exactly how
//! sharing propagates to descendants without an eager whole-subtree walk.
//!
//! ## Node Types
//!
//! - **LeafNode**: parallel `keys`/`values` arrays, `1..=max_node_size`
//!   entries (the canonical empty tree is the sole exception, with 0).
//! - **InternalNode**: parallel `children`/`keys` arrays where
//!   `keys[i] == children[i].max_key()`, plus a cached `size` equal to the
//!   sum of the children's sizes.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::error::{TreeError, TreeResult};
use crate::ord::Comparator;

/// Handle to a node, shared copy-on-write between trees.
pub(crate) type NodeRef<K, V> = Rc<Node<K, V>>;

#[derive(Clone)]
pub(crate) enum Node<K, V> {
    Leaf(LeafNode<K, V>),
    Internal(InternalNode<K, V>),
}

#[derive(Clone)]
pub(crate) struct LeafNode<K, V> {
    pub(crate) keys: Vec<K>,
    pub(crate) values: Vec<V>,
}

#[derive(Clone)]
pub(crate) struct InternalNode<K, V> {
    pub(crate) children: Vec<NodeRef<K, V>>,
    /// `keys[i] == children[i].max_key()`.
    pub(crate) keys: Vec<K>,
    /// Cached `sum(child.len() for child in children)`.
    pub(crate) size: usize,
}

/// Result of a binary search for `key` within a node's sorted key array.
pub(crate) enum SearchResult {
    Found(usize),
    /// Position at which `key` would need to be inserted to keep the array
    /// sorted; equivalently, the index of the first entry `>= key`.
    Absent(usize),
}

impl SearchResult {
    /// The index at which `key` was found, or would be inserted.
    pub(crate) fn index(&self) -> usize {
        match self {
            SearchResult::Found(i) | SearchResult::Absent(i) => *i,
        }
    }
}

/// Binary search `keys` for `key` using `cmp`.
///
/// Fails with [`TreeError::BadKey`] the moment the comparator reports a
/// non-finite ordering, matching spec.md §4.1's `indexOf`.
pub(crate) fn search<K>(keys: &[K], key: &K, cmp: &Comparator<K>) -> TreeResult<SearchResult> {
    let mut lo = 0usize;
    let mut hi = keys.len();
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        match cmp.compare(&keys[mid], key)? {
            Ordering::Less => lo = mid + 1,
            Ordering::Greater => hi = mid,
            Ordering::Equal => return Ok(SearchResult::Found(mid)),
        }
    }
    Ok(SearchResult::Absent(lo))
}

/// Outcome of inserting/overwriting a key in a node.
pub(crate) enum SetOutcome<K, V> {
    /// Key was already present; overwritten (or left alone if
    /// `overwrite == false`).
    Overwritten,
    /// Key was newly inserted, no split needed.
    Inserted,
    /// Key was newly inserted and the node split; caller must link the
    /// returned right sibling into the parent.
    Split(NodeRef<K, V>),
}

impl<K, V> Node<K, V> {
    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Node::Leaf(l) => l.keys.len(),
            Node::Internal(i) => i.size,
        }
    }

    /// Number of slots occupied in *this* node: key count for a leaf,
    /// child count for an internal node. Unlike `len()` (which is the
    /// subtree's total key count, i.e. `size` for an internal node), this
    /// is what `max_node_size` actually bounds and is the right quantity
    /// to test before splitting or shifting a sibling slot.
    pub(crate) fn slot_count(&self) -> usize {
        match self {
            Node::Leaf(l) => l.keys.len(),
            Node::Internal(i) => i.children.len(),
        }
    }

    /// The maximum key in this subtree. Panics on an empty leaf — callers
    /// must check `len() > 0` first (the only node that may be empty is a
    /// tree's own root).
    pub(crate) fn max_key(&self) -> &K {
        match self {
            Node::Leaf(l) => l.keys.last().expect("max_key on empty leaf"),
            Node::Internal(i) => i.keys.last().expect("internal node has no children"),
        }
    }

    /// The minimum key in this subtree. Panics on an empty leaf.
    pub(crate) fn min_key(&self) -> &K {
        match self {
            Node::Leaf(l) => l.keys.first().expect("min_key on empty leaf"),
            Node::Internal(i) => i.children.first().expect("internal node has no children").min_key(),
        }
    }
}

impl<K: Clone, V: Clone> Node<K, V> {
    /// Structural audit used by `Tree::check_valid`. Returns the counted
    /// size of this subtree so callers can compare it against any cached
    /// size. `leaf_depth` tracks the depth at which leaves were first
    /// observed so that "all leaves at the same depth" can be checked
    /// across the whole recursive walk. Also verifies spec.md §3's
    /// cross-sibling ordering invariant (`children[i].max_key() <
    /// children[i+1].min_key()`), not just that the cached routing keys
    /// are internally consistent with `max_key()`.
    pub(crate) fn check_valid(
        &self,
        cmp: &Comparator<K>,
        depth: usize,
        leaf_depth: &mut Option<usize>,
    ) -> TreeResult<usize> {
        match self {
            Node::Leaf(leaf) => {
                if leaf.keys.len() != leaf.values.len() {
                    return Err(TreeError::InvariantViolation {
                        reason: "leaf keys/values length mismatch".into(),
                    });
                }
                for w in leaf.keys.windows(2) {
                    if cmp.compare(&w[0], &w[1])? != Ordering::Less {
                        return Err(TreeError::InvariantViolation {
                            reason: "leaf keys not strictly increasing".into(),
                        });
                    }
                }
                match *leaf_depth {
                    None => *leaf_depth = Some(depth),
                    Some(d) if d != depth => {
                        return Err(TreeError::InvariantViolation {
                            reason: "leaves at inconsistent depth".into(),
                        });
                    }
                    _ => {}
                }
                Ok(leaf.keys.len())
            }
            Node::Internal(internal) => {
                if internal.children.is_empty() {
                    return Err(TreeError::InvariantViolation {
                        reason: "empty interior node".into(),
                    });
                }
                if internal.children.len() != internal.keys.len() {
                    return Err(TreeError::InvariantViolation {
                        reason: "internal children/keys length mismatch".into(),
                    });
                }
                for w in internal.keys.windows(2) {
                    if cmp.compare(&w[0], &w[1])? != Ordering::Less {
                        return Err(TreeError::InvariantViolation {
                            reason: "internal keys not strictly increasing".into(),
                        });
                    }
                }
                let mut counted = 0usize;
                for (i, child) in internal.children.iter().enumerate() {
                    counted += child.check_valid(cmp, depth + 1, leaf_depth)?;
                    if cmp.compare(&internal.keys[i], child.max_key())? != Ordering::Equal {
                        return Err(TreeError::InvariantViolation {
                            reason: format!("keys[{i}] != children[{i}].max_key()"),
                        });
                    }
                    if i > 0 && cmp.compare(internal.children[i - 1].max_key(), child.min_key())? != Ordering::Less {
                        return Err(TreeError::InvariantViolation {
                            reason: format!("children[{}].max_key() >= children[{i}].min_key()", i - 1),
                        });
                    }
                }
                if counted != internal.size {
                    return Err(TreeError::InvariantViolation {
                        reason: format!("cached size {} != counted size {}", internal.size, counted),
                    });
                }
                Ok(counted)
            }
        }
    }
}

impl<K: Clone, V: Clone> LeafNode<K, V> {
    pub(crate) fn empty() -> Self {
        LeafNode { keys: Vec::new(), values: Vec::new() }
    }

    /// Insert-then-split-if-needed. Splitting after insertion (rather than
    /// computing the split point before) keeps the index arithmetic simple
    /// and costs nothing asymptotically since `max_node_size` bounds the
    /// work either way.
    pub(crate) fn set(
        &mut self,
        key: K,
        value: V,
        overwrite: bool,
        cmp: &Comparator<K>,
        max_node_size: usize,
    ) -> TreeResult<(SetOutcome<K, V>, bool)> {
        match search(&self.keys, &key, cmp)? {
            SearchResult::Found(i) => {
                if overwrite {
                    // Distinct keys can compare equal under a coarser
                    // comparator; overwrite the key slot too.
                    self.keys[i] = key;
                    self.values[i] = value;
                }
                Ok((SetOutcome::Overwritten, false))
            }
            SearchResult::Absent(i) => {
                self.keys.insert(i, key);
                self.values.insert(i, value);
                if self.keys.len() > max_node_size {
                    let right = self.split_off_right();
                    Ok((SetOutcome::Split(Rc::new(Node::Leaf(right))), true))
                } else {
                    Ok((SetOutcome::Inserted, true))
                }
            }
        }
    }

    pub(crate) fn split_off_right(&mut self) -> LeafNode<K, V> {
        let mid = self.keys.len() / 2;
        let keys = self.keys.split_off(mid);
        let values = self.values.split_off(mid);
        LeafNode { keys, values }
    }

    pub(crate) fn take_from_right(&mut self, right: &mut LeafNode<K, V>) {
        self.keys.push(right.keys.remove(0));
        self.values.push(right.values.remove(0));
    }

    pub(crate) fn take_from_left(&mut self, left: &mut LeafNode<K, V>) {
        self.keys.insert(0, left.keys.pop().expect("take_from_left on empty sibling"));
        self.values.insert(0, left.values.pop().expect("take_from_left on empty sibling"));
    }

    pub(crate) fn merge_sibling(&mut self, mut right: LeafNode<K, V>) {
        self.keys.append(&mut right.keys);
        self.values.append(&mut right.values);
    }
}

impl<K: Clone, V: Clone> InternalNode<K, V> {
    pub(crate) fn from_children(children: Vec<NodeRef<K, V>>) -> Self {
        let keys = children.iter().map(|c| c.max_key().clone()).collect();
        let size = children.iter().map(|c| c.len()).sum();
        InternalNode { children, keys, size }
    }

    pub(crate) fn recompute_size(&mut self) {
        self.size = self.children.iter().map(|c| c.len()).sum();
    }

    pub(crate) fn recompute_key_at(&mut self, i: usize) {
        self.keys[i] = self.children[i].max_key().clone();
    }

    /// Index of the child whose range contains `key`, clamped to the last
    /// child when `key` exceeds the current `max_key` (spec.md §4.1).
    pub(crate) fn child_index_for(&self, key: &K, cmp: &Comparator<K>) -> TreeResult<usize> {
        let idx = search(&self.keys, key, cmp)?.index();
        Ok(idx.min(self.children.len() - 1))
    }

    pub(crate) fn set(
        &mut self,
        key: K,
        value: V,
        overwrite: bool,
        cmp: &Comparator<K>,
        max_node_size: usize,
    ) -> TreeResult<(SetOutcome<K, V>, bool)> {
        let idx = self.child_index_for(&key, cmp)?;
        if self.children[idx].slot_count() >= max_node_size {
            self.try_shift_before_insert(idx, &key, cmp, max_node_size)?;
        }
        let (outcome, grew) = {
            let child_mut = Rc::make_mut(&mut self.children[idx]);
            match child_mut {
                Node::Leaf(leaf) => leaf.set(key, value, overwrite, cmp, max_node_size)?,
                Node::Internal(internal) => internal.set(key, value, overwrite, cmp, max_node_size)?,
            }
        };
        self.recompute_key_at(idx);
        if grew {
            self.size += 1;
        }
        match outcome {
            SetOutcome::Overwritten => Ok((SetOutcome::Overwritten, false)),
            SetOutcome::Inserted => Ok((SetOutcome::Inserted, grew)),
            SetOutcome::Split(new_sibling) => {
                self.keys.insert(idx + 1, new_sibling.max_key().clone());
                self.children.insert(idx + 1, new_sibling);
                if self.children.len() > max_node_size {
                    let right = self.split_off_right();
                    Ok((SetOutcome::Split(Rc::new(Node::Internal(right))), grew))
                } else {
                    Ok((SetOutcome::Inserted, grew))
                }
            }
        }
    }

    /// Before recursing into a full child, try to borrow a slot from a
    /// sibling instead of letting the child split (spec.md §4.1). A shift
    /// is only taken when the sibling has spare capacity and when moving
    /// the boundary entry would not reassign `key` itself to the sibling
    /// (condition (b)/(c) in spec.md's description) — otherwise this is a
    /// no-op and the caller falls through to its ordinary split path.
    fn try_shift_before_insert(&mut self, idx: usize, key: &K, cmp: &Comparator<K>, max_node_size: usize) -> TreeResult<()> {
        if idx > 0 && self.children[idx - 1].slot_count() < max_node_size {
            let boundary = self.children[idx].min_key().clone();
            if cmp.compare(key, &boundary)? == Ordering::Greater {
                self.shift_from_right_child_to_left_sibling(idx);
                return Ok(());
            }
        }
        if idx + 1 < self.children.len() && self.children[idx + 1].slot_count() < max_node_size {
            let boundary = self.children[idx].max_key().clone();
            if cmp.compare(key, &boundary)? == Ordering::Less {
                self.shift_from_left_child_to_right_sibling(idx);
            }
        }
        Ok(())
    }

    /// Move `children[idx]`'s first entry onto the end of `children[idx-1]`.
    fn shift_from_right_child_to_left_sibling(&mut self, idx: usize) {
        let (left_half, right_half) = self.children.split_at_mut(idx);
        let left = Rc::make_mut(&mut left_half[idx - 1]);
        let right = Rc::make_mut(&mut right_half[0]);
        match (left, right) {
            (Node::Leaf(l), Node::Leaf(r)) => l.take_from_right(r),
            (Node::Internal(l), Node::Internal(r)) => l.take_from_right(r),
            _ => unreachable!("siblings at the same depth always share a variant"),
        }
        self.recompute_key_at(idx - 1);
    }

    /// Move `children[idx]`'s last entry onto the front of `children[idx+1]`.
    fn shift_from_left_child_to_right_sibling(&mut self, idx: usize) {
        let (left_half, right_half) = self.children.split_at_mut(idx + 1);
        let left = Rc::make_mut(&mut left_half[idx]);
        let right = Rc::make_mut(&mut right_half[0]);
        match (right, left) {
            (Node::Leaf(r), Node::Leaf(l)) => r.take_from_left(l),
            (Node::Internal(r), Node::Internal(l)) => r.take_from_left(l),
            _ => unreachable!("siblings at the same depth always share a variant"),
        }
        self.recompute_key_at(idx);
    }

    pub(crate) fn split_off_right(&mut self) -> InternalNode<K, V> {
        let mid = self.children.len() / 2;
        let children = self.children.split_off(mid);
        let keys = self.keys.split_off(mid);
        self.recompute_size();
        let size = children.iter().map(|c| c.len()).sum();
        InternalNode { children, keys, size }
    }

    pub(crate) fn take_from_right(&mut self, right: &mut InternalNode<K, V>) {
        let child = right.children.remove(0);
        let key = right.keys.remove(0);
        let moved = child.len();
        right.size -= moved;
        self.size += moved;
        self.children.push(child);
        self.keys.push(key);
    }

    pub(crate) fn take_from_left(&mut self, left: &mut InternalNode<K, V>) {
        let child = left.children.pop().expect("take_from_left on empty sibling");
        let key = left.keys.pop().expect("take_from_left on empty sibling");
        let moved = child.len();
        left.size -= moved;
        self.size += moved;
        self.children.insert(0, child);
        self.keys.insert(0, key);
    }

    pub(crate) fn merge_sibling(&mut self, mut right: InternalNode<K, V>) {
        self.children.append(&mut right.children);
        self.keys.append(&mut right.keys);
        self.size += right.size;
    }
}

/// Deep-clone a subtree, respecting (or overriding) CoW sharing.
///
/// `force == false`: a node already reachable from more than one place
/// (`Rc::strong_count > 1`) is reused wholesale rather than copied — there
/// is nothing to gain by privatizing a reference when another one still
/// exists. Everything not already shared is copied eagerly (this is what
/// makes the clone "greedy": it does the CoW work now instead of lazily on
/// the next mutation).
///
/// `force == true`: every node is duplicated, including ones that are
/// currently uniquely owned, so the result shares *nothing* with the
/// source subtree — this is what the "greedyClone(true) copies all nodes"
/// property (spec.md §8 item 5) requires, and `force` is threaded into
/// every recursive call so it holds transitively.
pub(crate) fn greedy_clone<K: Clone, V: Clone>(node: &NodeRef<K, V>, force: bool) -> NodeRef<K, V> {
    if !force && Rc::strong_count(node) > 1 {
        return Rc::clone(node);
    }
    match node.as_ref() {
        Node::Leaf(leaf) => Rc::new(Node::Leaf(leaf.clone())),
        Node::Internal(internal) => {
            let children = internal.children.iter().map(|c| greedy_clone(c, force)).collect();
            Rc::new(Node::Internal(InternalNode::from_children(children)))
        }
    }
}

/// True iff two internal nodes partition their key space at exactly the
/// same boundaries, i.e. `ia.keys[i] == ib.keys[i]` for every `i`. Used by
/// the diff and set-algebra engines to recurse child-by-child instead of
/// falling back to a linear merge.
pub(crate) fn boundaries_aligned<K, V>(ia: &InternalNode<K, V>, ib: &InternalNode<K, V>, cmp: &Comparator<K>) -> TreeResult<bool> {
    if ia.keys.len() != ib.keys.len() {
        return Ok(false);
    }
    for (ka, kb) in ia.keys.iter().zip(ib.keys.iter()) {
        if cmp.compare(ka, kb)? != Ordering::Equal {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Descend from `node` to decide whether `key` is present anywhere in the
/// subtree. Used by the set-algebra fallback paths (`setops/mod.rs`) to
/// test membership against a bare `NodeRef` rather than a whole `Tree`.
pub(crate) fn contains_key<K, V>(node: &NodeRef<K, V>, key: &K, cmp: &Comparator<K>) -> TreeResult<bool> {
    let mut n = node;
    loop {
        match n.as_ref() {
            Node::Leaf(leaf) => return Ok(matches!(search(&leaf.keys, key, cmp)?, SearchResult::Found(_))),
            Node::Internal(internal) => {
                let idx = internal.child_index_for(key, cmp)?;
                n = &internal.children[idx];
            }
        }
    }
}

/// The leftmost (key, value) pair reachable from `node`. Panics on an
/// empty leaf, same caveat as `Node::min_key`.
pub(crate) fn leftmost_pair<K, V>(node: &NodeRef<K, V>) -> (&K, &V) {
    match node.as_ref() {
        Node::Leaf(l) => (l.keys.first().expect("leftmost_pair on empty leaf"), l.values.first().unwrap()),
        Node::Internal(i) => leftmost_pair(&i.children[0]),
    }
}

/// The rightmost (key, value) pair reachable from `node`.
pub(crate) fn rightmost_pair<K, V>(node: &NodeRef<K, V>) -> (&K, &V) {
    match node.as_ref() {
        Node::Leaf(l) => (l.keys.last().expect("rightmost_pair on empty leaf"), l.values.last().unwrap()),
        Node::Internal(i) => rightmost_pair(i.children.last().expect("internal node has no children")),
    }
}
