// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! The structural set-algebra engine: `union`, `intersect`, `subtract`, and
//! `bulk_load` (spec.md §4.6).
//!
//! `union`/`subtract` decompose their two operands into an ordered list of
//! disjoint `(height, subtree)` entries (`decompose` in the spec's own
//! terms) and stitch the list back into one tree with
//! [`build::build_from_decomposition`]. `intersect` builds its result
//! directly from matched pairs, since its output is generally much smaller
//! than either input and the spec itself describes it as the "simpler
//! path" of the engine (spec.md §4.6.5).
//!
//! Each walk shares three tricks with [`crate::diff`]: an `Rc::ptr_eq`
//! check that reuses (`union`/`subtract`) or fully resolves (`intersect`)
//! an identical subtree in O(1) regardless of its size, a cheap min/max-key
//! range test that skips disjoint subtrees outright, and a
//! `boundaries_aligned` fast path that recurses child-by-child when two
//! internal nodes still partition their key space identically. Anything
//! that doesn't line up falls back to flattening both sides via the
//! ordinary forward cursor and merging linearly — the same fallback
//! `diff.rs` takes, and for the same reason: once two subtrees have
//! genuinely diverged in shape there is nothing left to reuse wholesale.

mod build;
mod bulk;

pub use bulk::bulk_load;

use std::cmp::Ordering;
use std::rc::Rc;

use crate::cursor::Iter;
use crate::error::{TreeError, TreeResult};
use crate::node::{boundaries_aligned, contains_key, Node, NodeRef};
use crate::ord::Comparator;
use crate::tree::Tree;

use build::{build_from_decomposition, height_of};
use bulk::build_leaves;

fn check_comparators<K>(a: &Comparator<K>, b: &Comparator<K>) -> TreeResult<()> {
    if !a.same_as(b) {
        return Err(TreeError::ComparatorMismatch);
    }
    Ok(())
}

fn check_branching(a: usize, b: usize) -> TreeResult<()> {
    if a != b {
        return Err(TreeError::BranchingMismatch { left: a, right: b });
    }
    Ok(())
}

/// `true` iff `a`'s and `b`'s key ranges cannot overlap, decided in O(1)
/// from their cached min/max keys.
fn ranges_disjoint<K, V>(a: &NodeRef<K, V>, b: &NodeRef<K, V>, cmp: &Comparator<K>) -> TreeResult<bool> {
    Ok(cmp.compare(a.max_key(), b.min_key())? == Ordering::Less || cmp.compare(b.max_key(), a.min_key())? == Ordering::Less)
}

fn flatten_pairs<K: Clone, V: Clone>(node: &NodeRef<K, V>) -> Vec<(K, V)> {
    Iter::new(Rc::clone(node)).collect()
}

// ---------------------------------------------------------------------
// union
// ---------------------------------------------------------------------

/// `union(a, b, merge)`: every key present in either tree, with keys
/// present in both resolved by `merge(key, value_in_a, value_in_b)`
/// (spec.md §4.6.5).
pub fn union<K: Clone, V: Clone>(a: &Tree<K, V>, b: &Tree<K, V>, merge: &dyn Fn(&K, &V, &V) -> V) -> TreeResult<Tree<K, V>> {
    check_comparators(&a.cmp, &b.cmp)?;
    check_branching(a.max_node_size, b.max_node_size)?;
    if a.is_empty() {
        return Ok(b.clone());
    }
    if b.is_empty() {
        return Ok(a.clone());
    }
    let entries = union_entries(&a.root, &b.root, &a.cmp, a.max_node_size, merge)?;
    let (_height, root) = build_from_decomposition(entries, a.max_node_size);
    let len = root.len();
    Ok(Tree::from_parts(root, a.cmp.clone(), a.max_node_size, len))
}

fn union_entries<K: Clone, V: Clone>(
    a: &NodeRef<K, V>,
    b: &NodeRef<K, V>,
    cmp: &Comparator<K>,
    max_node_size: usize,
    merge: &dyn Fn(&K, &V, &V) -> V,
) -> TreeResult<Vec<(usize, NodeRef<K, V>)>> {
    if Rc::ptr_eq(a, b) {
        return Ok(vec![(height_of(a), Rc::clone(a))]);
    }
    match (a.as_ref(), b.as_ref()) {
        (Node::Leaf(la), Node::Leaf(lb)) => {
            let pairs = merge_leaf_union(&la.keys, &la.values, &lb.keys, &lb.values, cmp, merge)?;
            Ok(build_leaves(pairs, max_node_size).into_iter().map(|leaf| (0, leaf)).collect())
        }
        (Node::Internal(ia), Node::Internal(ib)) if boundaries_aligned(ia, ib, cmp)? => {
            let mut entries = Vec::new();
            for (ca, cb) in ia.children.iter().zip(ib.children.iter()) {
                entries.extend(union_entries(ca, cb, cmp, max_node_size, merge)?);
            }
            Ok(entries)
        }
        _ => {
            let (ka, va): (Vec<K>, Vec<V>) = flatten_pairs(a).into_iter().unzip();
            let (kb, vb): (Vec<K>, Vec<V>) = flatten_pairs(b).into_iter().unzip();
            let pairs = merge_leaf_union(&ka, &va, &kb, &vb, cmp, merge)?;
            Ok(build_leaves(pairs, max_node_size).into_iter().map(|leaf| (0, leaf)).collect())
        }
    }
}

fn merge_leaf_union<K: Clone, V: Clone>(
    ka: &[K],
    va: &[V],
    kb: &[K],
    vb: &[V],
    cmp: &Comparator<K>,
    merge: &dyn Fn(&K, &V, &V) -> V,
) -> TreeResult<Vec<(K, V)>> {
    let mut out = Vec::with_capacity(ka.len() + kb.len());
    let (mut i, mut j) = (0usize, 0usize);
    while i < ka.len() && j < kb.len() {
        match cmp.compare(&ka[i], &kb[j])? {
            Ordering::Less => {
                out.push((ka[i].clone(), va[i].clone()));
                i += 1;
            }
            Ordering::Greater => {
                out.push((kb[j].clone(), vb[j].clone()));
                j += 1;
            }
            Ordering::Equal => {
                out.push((ka[i].clone(), merge(&ka[i], &va[i], &vb[j])));
                i += 1;
                j += 1;
            }
        }
    }
    out.extend(ka[i..].iter().cloned().zip(va[i..].iter().cloned()));
    out.extend(kb[j..].iter().cloned().zip(vb[j..].iter().cloned()));
    Ok(out)
}

// ---------------------------------------------------------------------
// subtract
// ---------------------------------------------------------------------

/// `subtract(target, remove)`: every key of `target` whose key is absent
/// from `remove` (spec.md §4.6.5). The right-hand tree is "silent" — it is
/// only ever consulted for membership, never contributes a value.
pub fn subtract<K: Clone, V: Clone>(target: &Tree<K, V>, remove: &Tree<K, V>) -> TreeResult<Tree<K, V>> {
    check_comparators(&target.cmp, &remove.cmp)?;
    check_branching(target.max_node_size, remove.max_node_size)?;
    if remove.is_empty() || target.is_empty() {
        return if remove.is_empty() {
            Ok(target.clone())
        } else {
            Ok(Tree::with_comparator_and_max_node_size(target.cmp.clone(), target.max_node_size))
        };
    }
    let entries = subtract_entries(&target.root, &remove.root, &target.cmp, target.max_node_size)?;
    let (_height, root) = build_from_decomposition(entries, target.max_node_size);
    let len = root.len();
    Ok(Tree::from_parts(root, target.cmp.clone(), target.max_node_size, len))
}

fn subtract_entries<K: Clone, V: Clone>(
    a: &NodeRef<K, V>,
    b: &NodeRef<K, V>,
    cmp: &Comparator<K>,
    max_node_size: usize,
) -> TreeResult<Vec<(usize, NodeRef<K, V>)>> {
    if Rc::ptr_eq(a, b) {
        return Ok(Vec::new());
    }
    if ranges_disjoint(a, b, cmp)? {
        return Ok(vec![(height_of(a), Rc::clone(a))]);
    }
    match (a.as_ref(), b.as_ref()) {
        (Node::Leaf(la), Node::Leaf(lb)) => {
            let mut pairs = Vec::with_capacity(la.keys.len());
            for (k, v) in la.keys.iter().zip(la.values.iter()) {
                if !matches!(crate::node::search(&lb.keys, k, cmp)?, crate::node::SearchResult::Found(_)) {
                    pairs.push((k.clone(), v.clone()));
                }
            }
            Ok(build_leaves(pairs, max_node_size).into_iter().map(|leaf| (0, leaf)).collect())
        }
        (Node::Internal(ia), Node::Internal(ib)) if boundaries_aligned(ia, ib, cmp)? => {
            let mut entries = Vec::new();
            for (ca, cb) in ia.children.iter().zip(ib.children.iter()) {
                entries.extend(subtract_entries(ca, cb, cmp, max_node_size)?);
            }
            Ok(entries)
        }
        _ => {
            let mut pairs = Vec::new();
            for (k, v) in flatten_pairs(a) {
                if !contains_key(b, &k, cmp)? {
                    pairs.push((k, v));
                }
            }
            Ok(build_leaves(pairs, max_node_size).into_iter().map(|leaf| (0, leaf)).collect())
        }
    }
}

// ---------------------------------------------------------------------
// intersect
// ---------------------------------------------------------------------

/// `intersect(a, b, combine)`: every key present in both trees, with the
/// value `combine(key, value_in_a, value_in_b)` (spec.md §4.6.5). Disjoint
/// subtrees are skipped outright via the same O(1) min/max-key range test
/// `subtract`/`union` use; the result is built directly from matched pairs
/// rather than reusing whole subtrees, since `combine` must be invoked for
/// every matching key and the intersection is typically far smaller than
/// either input.
pub fn intersect<K: Clone, V: Clone>(a: &Tree<K, V>, b: &Tree<K, V>, combine: &dyn Fn(&K, &V, &V) -> V) -> TreeResult<Tree<K, V>> {
    check_comparators(&a.cmp, &b.cmp)?;
    check_branching(a.max_node_size, b.max_node_size)?;
    if a.is_empty() || b.is_empty() {
        return Ok(Tree::with_comparator_and_max_node_size(a.cmp.clone(), a.max_node_size));
    }
    let mut pairs = Vec::new();
    intersect_pairs(&a.root, &b.root, &a.cmp, combine, &mut pairs)?;
    bulk_load(pairs, a.cmp.clone(), a.max_node_size)
}

fn intersect_pairs<K: Clone, V: Clone>(
    a: &NodeRef<K, V>,
    b: &NodeRef<K, V>,
    cmp: &Comparator<K>,
    combine: &dyn Fn(&K, &V, &V) -> V,
    out: &mut Vec<(K, V)>,
) -> TreeResult<()> {
    if ranges_disjoint(a, b, cmp)? {
        return Ok(());
    }
    match (a.as_ref(), b.as_ref()) {
        (Node::Leaf(la), Node::Leaf(lb)) => {
            let (mut i, mut j) = (0usize, 0usize);
            while i < la.keys.len() && j < lb.keys.len() {
                match cmp.compare(&la.keys[i], &lb.keys[j])? {
                    Ordering::Less => i += 1,
                    Ordering::Greater => j += 1,
                    Ordering::Equal => {
                        out.push((la.keys[i].clone(), combine(&la.keys[i], &la.values[i], &lb.values[j])));
                        i += 1;
                        j += 1;
                    }
                }
            }
            Ok(())
        }
        (Node::Internal(ia), Node::Internal(ib)) if boundaries_aligned(ia, ib, cmp)? => {
            for (ca, cb) in ia.children.iter().zip(ib.children.iter()) {
                intersect_pairs(ca, cb, cmp, combine, out)?;
            }
            Ok(())
        }
        _ => {
            let (mut ia, mut ib) = (flatten_pairs(a).into_iter().peekable(), flatten_pairs(b).into_iter().peekable());
            loop {
                match (ia.peek(), ib.peek()) {
                    (Some((ka, _)), Some((kb, _))) => match cmp.compare(ka, kb)? {
                        Ordering::Less => {
                            ia.next();
                        }
                        Ordering::Greater => {
                            ib.next();
                        }
                        Ordering::Equal => {
                            let (k, va) = ia.next().unwrap();
                            let (_, vb) = ib.next().unwrap();
                            out.push((k.clone(), combine(&k, &va, &vb)));
                        }
                    },
                    _ => break,
                }
            }
            Ok(())
        }
    }
}
