// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Three-way structural diff between two trees.
//!
//! `diff_against` walks both trees in ascending key order, reporting keys
//! present only in one side (`only_this` / `only_other`) and keys present
//! in both with unequal values (`different`). Whenever recursion reaches
//! a pair of subtrees that are the *same* `Rc` allocation (`Rc::ptr_eq`),
//! the walk stops descending immediately: an identical subtree can hold no
//! differences, so the whole thing is skipped in O(1) regardless of how
//! many entries it covers. Subtree boundaries that still line up exactly
//! between the two sides (the common case when one tree was derived from
//! the other by a handful of `set`/`delete` calls) are walked
//! child-by-child for the same reason. Only when boundaries have actually
//! diverged does the walk fall back to a plain linear merge of the two
//! sides' sorted entries, which is the case where no subtree could have
//! been skipped wholesale anyway.

use crate::cursor::Iter;
use crate::error::TreeResult;
use crate::node::{boundaries_aligned, Node, NodeRef};
use crate::ord::{Comparator, ValueEq};
use std::cmp::Ordering;
use std::rc::Rc;

/// What to do after reporting one diff entry.
pub enum DiffControl<R> {
    Continue,
    Break(R),
}

struct Callbacks<'a, K, V, R> {
    cmp: &'a Comparator<K>,
    veq: &'a ValueEq<V>,
    only_this: &'a mut dyn FnMut(&K, &V) -> DiffControl<R>,
    only_other: &'a mut dyn FnMut(&K, &V) -> DiffControl<R>,
    different: &'a mut dyn FnMut(&K, &V, &V) -> DiffControl<R>,
}

/// Diff `this` against `other`, calling the three callbacks in ascending
/// key order. Returns `Ok(Some(r))` if a callback broke early with `r`,
/// `Ok(None)` if the walk ran to completion. Fails with
/// [`crate::error::TreeError::ComparatorMismatch`] if the two trees were
/// not built with the same comparator reference.
pub fn diff_against<K: Clone, V: Clone, R>(
    this_root: &NodeRef<K, V>,
    this_cmp: &Comparator<K>,
    other_root: &NodeRef<K, V>,
    other_cmp: &Comparator<K>,
    value_eq: &ValueEq<V>,
    only_this: &mut dyn FnMut(&K, &V) -> DiffControl<R>,
    only_other: &mut dyn FnMut(&K, &V) -> DiffControl<R>,
    different: &mut dyn FnMut(&K, &V, &V) -> DiffControl<R>,
) -> TreeResult<Option<R>> {
    if !this_cmp.same_as(other_cmp) {
        return Err(crate::error::TreeError::ComparatorMismatch);
    }
    let mut cb = Callbacks { cmp: this_cmp, veq: value_eq, only_this, only_other, different };
    diff_rec(this_root, other_root, &mut cb)
}

fn diff_rec<K: Clone, V: Clone, R>(a: &NodeRef<K, V>, b: &NodeRef<K, V>, cb: &mut Callbacks<K, V, R>) -> TreeResult<Option<R>> {
    if Rc::ptr_eq(a, b) {
        return Ok(None);
    }
    match (a.as_ref(), b.as_ref()) {
        (Node::Leaf(la), Node::Leaf(lb)) => merge_leaves(&la.keys, &la.values, &lb.keys, &lb.values, cb),
        (Node::Internal(ia), Node::Internal(ib)) if boundaries_aligned(ia, ib, cb.cmp)? => {
            for (ca, cb_child) in ia.children.iter().zip(ib.children.iter()) {
                if let Some(r) = diff_rec(ca, cb_child, cb)? {
                    return Ok(Some(r));
                }
            }
            Ok(None)
        }
        _ => merge_flatten(a, b, cb),
    }
}

fn merge_leaves<K: Clone, V: Clone, R>(ka: &[K], va: &[V], kb: &[K], vb: &[V], cb: &mut Callbacks<K, V, R>) -> TreeResult<Option<R>> {
    let (mut i, mut j) = (0usize, 0usize);
    while i < ka.len() && j < kb.len() {
        match cb.cmp.compare(&ka[i], &kb[j])? {
            Ordering::Less => {
                if let DiffControl::Break(r) = (cb.only_this)(&ka[i], &va[i]) {
                    return Ok(Some(r));
                }
                i += 1;
            }
            Ordering::Greater => {
                if let DiffControl::Break(r) = (cb.only_other)(&kb[j], &vb[j]) {
                    return Ok(Some(r));
                }
                j += 1;
            }
            Ordering::Equal => {
                if !cb.veq.eq(&va[i], &vb[j]) {
                    if let DiffControl::Break(r) = (cb.different)(&ka[i], &va[i], &vb[j]) {
                        return Ok(Some(r));
                    }
                }
                i += 1;
                j += 1;
            }
        }
    }
    while i < ka.len() {
        if let DiffControl::Break(r) = (cb.only_this)(&ka[i], &va[i]) {
            return Ok(Some(r));
        }
        i += 1;
    }
    while j < kb.len() {
        if let DiffControl::Break(r) = (cb.only_other)(&kb[j], &vb[j]) {
            return Ok(Some(r));
        }
        j += 1;
    }
    Ok(None)
}

/// Linear fallback merge for subtrees whose structure no longer lines up
/// (reached only when `a` and `b` have genuinely diverged shapes, so
/// there is nothing left to skip wholesale).
fn merge_flatten<K: Clone, V: Clone, R>(a: &NodeRef<K, V>, b: &NodeRef<K, V>, cb: &mut Callbacks<K, V, R>) -> TreeResult<Option<R>> {
    let mut ia = Iter::new(Rc::clone(a)).peekable();
    let mut ib = Iter::new(Rc::clone(b)).peekable();
    loop {
        match (ia.peek(), ib.peek()) {
            (None, None) => return Ok(None),
            (Some(_), None) => {
                let (k, v) = ia.next().unwrap();
                if let DiffControl::Break(r) = (cb.only_this)(&k, &v) {
                    return Ok(Some(r));
                }
            }
            (None, Some(_)) => {
                let (k, v) = ib.next().unwrap();
                if let DiffControl::Break(r) = (cb.only_other)(&k, &v) {
                    return Ok(Some(r));
                }
            }
            (Some((ka, _)), Some((kb, _))) => match cb.cmp.compare(ka, kb)? {
                Ordering::Less => {
                    let (k, v) = ia.next().unwrap();
                    if let DiffControl::Break(r) = (cb.only_this)(&k, &v) {
                        return Ok(Some(r));
                    }
                }
                Ordering::Greater => {
                    let (k, v) = ib.next().unwrap();
                    if let DiffControl::Break(r) = (cb.only_other)(&k, &v) {
                        return Ok(Some(r));
                    }
                }
                Ordering::Equal => {
                    let (ka, va) = ia.next().unwrap();
                    let (_, vb) = ib.next().unwrap();
                    if !cb.veq.eq(&va, &vb) {
                        if let DiffControl::Break(r) = (cb.different)(&ka, &va, &vb) {
                            return Ok(Some(r));
                        }
                    }
                }
            },
        }
    }
}
