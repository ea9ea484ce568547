// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Range scanning and range editing.
//!
//! `for_range` walks a key range read-only. `edit_range` walks the same
//! shape of range but clones only the children it actually touches via
//! `Rc::make_mut` (spec.md §5's "CoW-on-descent"), then unwinds the
//! recursion with a rebalance pass so deletions that leave a node
//! underfull get merged into a sibling before the caller ever sees an
//! undersized node.

use std::ops::Bound;
use std::rc::Rc;

use crate::error::TreeResult;
use crate::node::{search, InternalNode, LeafNode, Node, NodeRef, SearchResult};
use crate::ord::Comparator;

/// What to do with the current (key, value) pair during an `edit_range`
/// scan (spec.md §5.2's per-pair mutator contract).
pub enum RangeEdit<V, R> {
    Continue,
    SetValue(V),
    Delete,
    Break(R),
    BreakAfterSetValue(V, R),
    BreakAfterDelete(R),
}

/// Whether a read-only scan should continue or stop early with a result.
pub enum Control<R> {
    Continue,
    Break(R),
}

/// How a range walk ended: it ran to completion (carrying the final
/// running counter), or a callback asked to stop early.
pub(crate) enum RangeOutcome<R> {
    Completed(u64),
    Broken(R),
}

/// Read-only walk over `[low, high)` (per the `Bound` semantics of each
/// end), invoking `f(key, value, counter)` in ascending key order.
pub(crate) fn for_range<K, V, R>(
    root: &NodeRef<K, V>,
    low: Bound<&K>,
    high: Bound<&K>,
    cmp: &Comparator<K>,
    initial_counter: u64,
    f: &mut dyn FnMut(&K, &V, u64) -> Control<R>,
) -> TreeResult<RangeOutcome<R>> {
    let mut counter = initial_counter;
    match walk_read(root, low, high, cmp, &mut counter, f)? {
        Some(r) => Ok(RangeOutcome::Broken(r)),
        None => Ok(RangeOutcome::Completed(counter)),
    }
}

fn walk_read<K, V, R>(
    node: &NodeRef<K, V>,
    low: Bound<&K>,
    high: Bound<&K>,
    cmp: &Comparator<K>,
    counter: &mut u64,
    f: &mut dyn FnMut(&K, &V, u64) -> Control<R>,
) -> TreeResult<Option<R>> {
    match node.as_ref() {
        Node::Leaf(leaf) => {
            let (s, e) = leaf_bounds(&leaf.keys, low, high, cmp)?;
            for i in s..e {
                match f(&leaf.keys[i], &leaf.values[i], *counter) {
                    Control::Continue => *counter += 1,
                    Control::Break(r) => return Ok(Some(r)),
                }
            }
            Ok(None)
        }
        Node::Internal(internal) => {
            let (first, last) = child_span(internal, low, high, cmp)?;
            for idx in first..=last {
                if let Some(r) = walk_read(&internal.children[idx], low, high, cmp, counter, f)? {
                    return Ok(Some(r));
                }
            }
            Ok(None)
        }
    }
}

/// Mutating walk over `[low, high)`. Only children overlapping the range
/// are cloned (via `Rc::make_mut`); subtrees entirely outside the range
/// are left untouched and therefore still shared with whatever else
/// references them. `*len` is adjusted by the net change in entry count.
pub(crate) fn edit_range<K: Clone, V: Clone, R>(
    root: &mut NodeRef<K, V>,
    len: &mut usize,
    low: Bound<&K>,
    high: Bound<&K>,
    cmp: &Comparator<K>,
    max_node_size: usize,
    initial_counter: u64,
    f: &mut dyn FnMut(&K, &V, u64) -> RangeEdit<V, R>,
) -> TreeResult<RangeOutcome<R>> {
    let mut counter = initial_counter;
    let mut delta: i64 = 0;
    let broke = walk_edit(root, low, high, cmp, max_node_size, &mut counter, &mut delta, f)?;
    collapse_root(root);
    *len = (*len as i64 + delta) as usize;
    match broke {
        Some(r) => Ok(RangeOutcome::Broken(r)),
        None => Ok(RangeOutcome::Completed(counter)),
    }
}

fn walk_edit<K: Clone, V: Clone, R>(
    node: &mut NodeRef<K, V>,
    low: Bound<&K>,
    high: Bound<&K>,
    cmp: &Comparator<K>,
    max_node_size: usize,
    counter: &mut u64,
    delta: &mut i64,
    f: &mut dyn FnMut(&K, &V, u64) -> RangeEdit<V, R>,
) -> TreeResult<Option<R>> {
    let node_mut = Rc::make_mut(node);
    match node_mut {
        Node::Leaf(leaf) => edit_leaf(leaf, low, high, cmp, counter, delta, f),
        Node::Internal(internal) => {
            let (first, last) = child_span(internal, low, high, cmp)?;
            let mut broke = None;
            for idx in first..=last {
                let r = walk_edit(&mut internal.children[idx], low, high, cmp, max_node_size, counter, delta, f)?;
                internal.recompute_key_at(idx);
                if r.is_some() {
                    broke = r;
                    break;
                }
            }
            rebalance_children(internal, max_node_size);
            Ok(broke)
        }
    }
}

fn edit_leaf<K: Clone, V: Clone, R>(
    leaf: &mut LeafNode<K, V>,
    low: Bound<&K>,
    high: Bound<&K>,
    cmp: &Comparator<K>,
    counter: &mut u64,
    delta: &mut i64,
    f: &mut dyn FnMut(&K, &V, u64) -> RangeEdit<V, R>,
) -> TreeResult<Option<R>> {
    let (s, mut end) = leaf_bounds(&leaf.keys, low, high, cmp)?;
    let mut i = s;
    while i < end {
        let action = f(&leaf.keys[i], &leaf.values[i], *counter);
        match action {
            RangeEdit::Continue => {
                *counter += 1;
                i += 1;
            }
            RangeEdit::SetValue(v) => {
                leaf.values[i] = v;
                *counter += 1;
                i += 1;
            }
            RangeEdit::Delete => {
                leaf.keys.remove(i);
                leaf.values.remove(i);
                *delta -= 1;
                end -= 1;
                *counter += 1;
                // element at `i` shifted down; don't advance.
            }
            RangeEdit::Break(r) => return Ok(Some(r)),
            RangeEdit::BreakAfterSetValue(v, r) => {
                leaf.values[i] = v;
                return Ok(Some(r));
            }
            RangeEdit::BreakAfterDelete(r) => {
                leaf.keys.remove(i);
                leaf.values.remove(i);
                *delta -= 1;
                return Ok(Some(r));
            }
        }
    }
    Ok(None)
}

/// `[s, e)` indices within a leaf's sorted `keys` overlapping `[low, high)`.
pub(crate) fn leaf_bounds<K>(keys: &[K], low: Bound<&K>, high: Bound<&K>, cmp: &Comparator<K>) -> TreeResult<(usize, usize)> {
    let len = keys.len();
    let s = match low {
        Bound::Unbounded => 0,
        Bound::Included(k) => search(keys, k, cmp)?.index(),
        Bound::Excluded(k) => match search(keys, k, cmp)? {
            SearchResult::Found(i) => i + 1,
            SearchResult::Absent(i) => i,
        },
    };
    let e = match high {
        Bound::Unbounded => len,
        Bound::Included(k) => match search(keys, k, cmp)? {
            SearchResult::Found(i) => i + 1,
            SearchResult::Absent(i) => i,
        },
        Bound::Excluded(k) => search(keys, k, cmp)?.index(),
    };
    let s = s.min(len);
    let e = e.min(len).max(s);
    Ok((s, e))
}

/// `[first, last]` child indices that may contain keys overlapping
/// `[low, high)`. This is a conservative (not necessarily tight) span:
/// at most one extra child beyond the true overlap may be visited, which
/// `leaf_bounds`/recursion simply sees no matching entries in.
fn child_span<K, V>(internal: &InternalNode<K, V>, low: Bound<&K>, high: Bound<&K>, cmp: &Comparator<K>) -> TreeResult<(usize, usize)> {
    let last_idx = internal.children.len() - 1;
    let first = match low {
        Bound::Unbounded => 0,
        Bound::Included(k) | Bound::Excluded(k) => search(&internal.keys, k, cmp)?.index().min(last_idx),
    };
    let last = match high {
        Bound::Unbounded => last_idx,
        Bound::Included(k) | Bound::Excluded(k) => search(&internal.keys, k, cmp)?.index().min(last_idx),
    };
    Ok((first, last.max(first)))
}

fn merge_into<K: Clone, V: Clone>(left: &mut Node<K, V>, right: Node<K, V>) {
    match (left, right) {
        (Node::Leaf(l), Node::Leaf(r)) => l.merge_sibling(r),
        (Node::Internal(l), Node::Internal(r)) => l.merge_sibling(r),
        _ => unreachable!("siblings at the same depth always share a variant"),
    }
}

/// Splice out emptied children and merge underfull children into a
/// sibling when the combination still fits `max_node_size`, the
/// "merge-on-underflow unwind" spec.md §5.3 requires.
fn rebalance_children<K: Clone, V: Clone>(internal: &mut InternalNode<K, V>, max_node_size: usize) {
    let threshold = max_node_size / 2;
    let mut i = 0;
    while i < internal.children.len() {
        if internal.children[i].len() == 0 {
            internal.children.remove(i);
            internal.keys.remove(i);
            continue;
        }
        if internal.children[i].len() <= threshold && i + 1 < internal.children.len() {
            let combined = internal.children[i].len() + internal.children[i + 1].len();
            if combined <= max_node_size {
                let right_ref = internal.children.remove(i + 1);
                internal.keys.remove(i + 1);
                let right_owned = Rc::try_unwrap(right_ref).unwrap_or_else(|rc| (*rc).clone());
                let left_mut = Rc::make_mut(&mut internal.children[i]);
                merge_into(left_mut, right_owned);
                internal.recompute_key_at(i);
                continue;
            }
        }
        i += 1;
    }
    internal.recompute_size();
}

/// Collapse a root whose single internal child makes the level redundant,
/// and replace an emptied-out internal root with the canonical empty leaf.
pub(crate) fn collapse_root<K: Clone, V: Clone>(root: &mut NodeRef<K, V>) {
    if let Node::Internal(i) = root.as_ref() {
        if i.children.is_empty() {
            *root = Rc::new(Node::Leaf(LeafNode::empty()));
            return;
        }
    }
    loop {
        let collapse = matches!(root.as_ref(), Node::Internal(i) if i.children.len() == 1);
        if !collapse {
            break;
        }
        let next = match root.as_ref() {
            Node::Internal(i) => Rc::clone(&i.children[0]),
            _ => unreachable!(),
        };
        *root = next;
    }
}
