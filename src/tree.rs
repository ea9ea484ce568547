// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! The `Tree<K, V>` handle and its point operations.
//!
//! A `Tree` is a thin, cheaply-clonable wrapper around a [`NodeRef`] root:
//! cloning a `Tree` (`Tree::clone`) is `Rc::clone` of the root plus copying
//! three `Copy`/cheap fields, not a deep copy — this is spec.md §3's "clone
//! is O(1) and shares everything with the source until either side
//! mutates" made literal by `Rc`.

use std::cmp::Ordering;
use std::ops::Bound;
use std::rc::Rc;

use crate::cursor::{Iter, IterRev};
use crate::diff::{self, DiffControl};
use crate::error::{TreeError, TreeResult};
use crate::node::{greedy_clone, leftmost_pair, rightmost_pair, search, InternalNode, LeafNode, Node, NodeRef, SearchResult, SetOutcome};
use crate::ord::{Comparator, ValueEq};
use crate::range::{self, Control, RangeEdit, RangeOutcome};

/// Smallest and largest accepted branching factor. Below 4 a B+ tree
/// degenerates into a linked list of tiny nodes; above 256 a single node
/// rewrite on every mutating `set`/`delete` starts to dominate the cost
/// CoW sharing is meant to avoid.
pub const MIN_MAX_NODE_SIZE: usize = 4;
pub const MAX_MAX_NODE_SIZE: usize = 256;

/// An in-memory, sorted key/value B+ tree with copy-on-write node
/// sharing. See the crate-level docs for the sharing model.
pub struct Tree<K, V> {
    pub(crate) root: NodeRef<K, V>,
    pub(crate) cmp: Comparator<K>,
    pub(crate) max_node_size: usize,
    pub(crate) len: usize,
}

impl<K, V> Clone for Tree<K, V> {
    fn clone(&self) -> Self {
        Tree { root: Rc::clone(&self.root), cmp: self.cmp.clone(), max_node_size: self.max_node_size, len: self.len }
    }
}

fn clamp_max_node_size(max_node_size: usize) -> usize {
    max_node_size.clamp(MIN_MAX_NODE_SIZE, MAX_MAX_NODE_SIZE)
}

impl<K: Clone, V: Clone> Tree<K, V> {
    /// An empty tree ordered by `K`'s natural `Ord`.
    pub fn new() -> Self
    where
        K: Ord + 'static,
    {
        Tree::with_comparator(Comparator::natural())
    }

    /// An empty tree ordered by an explicit comparator.
    pub fn with_comparator(cmp: Comparator<K>) -> Self {
        Tree::with_comparator_and_max_node_size(cmp, 32)
    }

    /// An empty tree with an explicit branching factor, clamped to
    /// `[MIN_MAX_NODE_SIZE, MAX_MAX_NODE_SIZE]`.
    pub fn with_comparator_and_max_node_size(cmp: Comparator<K>, max_node_size: usize) -> Self {
        Tree { root: Rc::new(Node::Leaf(LeafNode::empty())), cmp, max_node_size: clamp_max_node_size(max_node_size), len: 0 }
    }

    /// Construct a tree directly from an already-shaped root. Used by the
    /// set-algebra engine (`bulk_load`/`union`/`intersect`/`subtract`) to
    /// hand back a tree without replaying every insertion through `set`.
    pub(crate) fn from_parts(root: NodeRef<K, V>, cmp: Comparator<K>, max_node_size: usize, len: usize) -> Self {
        Tree { root, cmp, max_node_size, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn max_node_size(&self) -> usize {
        self.max_node_size
    }

    pub fn comparator(&self) -> &Comparator<K> {
        &self.cmp
    }

    /// Height of the tree, i.e. its internal depth (spec.md §2/§8 property
    /// 6): `0` when the root is a leaf, incrementing once per internal
    /// level below the root.
    pub fn height(&self) -> usize {
        let mut h = 0;
        let mut node = &self.root;
        while let Node::Internal(i) = node.as_ref() {
            h += 1;
            node = &i.children[0];
        }
        h
    }

    pub fn has(&self, key: &K) -> TreeResult<bool> {
        Ok(self.locate(key)?.is_some())
    }

    pub fn get(&self, key: &K) -> TreeResult<Option<V>> {
        Ok(self.locate(key)?.map(|(_, v)| v.clone()))
    }

    fn locate(&self, key: &K) -> TreeResult<Option<(&K, &V)>> {
        let mut node = &self.root;
        loop {
            match node.as_ref() {
                Node::Leaf(leaf) => {
                    return match search(&leaf.keys, key, &self.cmp)? {
                        SearchResult::Found(i) => Ok(Some((&leaf.keys[i], &leaf.values[i]))),
                        SearchResult::Absent(_) => Ok(None),
                    };
                }
                Node::Internal(internal) => {
                    let idx = internal.child_index_for(key, &self.cmp)?;
                    node = &internal.children[idx];
                }
            }
        }
    }

    /// Insert or overwrite `key` with `value`. Returns `true` iff the key
    /// was newly inserted (mirroring spec.md §4.1's `set` return value).
    /// If `overwrite` is `false` and `key` is already present, the
    /// existing value is left untouched.
    pub fn set(&mut self, key: K, value: V, overwrite: bool) -> TreeResult<bool> {
        let (outcome, grew) = {
            let root_mut = Rc::make_mut(&mut self.root);
            match root_mut {
                Node::Leaf(leaf) => leaf.set(key, value, overwrite, &self.cmp, self.max_node_size)?,
                Node::Internal(internal) => internal.set(key, value, overwrite, &self.cmp, self.max_node_size)?,
            }
        };
        let is_new = match outcome {
            SetOutcome::Overwritten => false,
            SetOutcome::Inserted => true,
            SetOutcome::Split(sibling) => {
                let new_root = InternalNode::from_children(vec![Rc::clone(&self.root), sibling]);
                self.root = Rc::new(Node::Internal(new_root));
                true
            }
        };
        if grew {
            self.len += 1;
        }
        Ok(is_new)
    }

    /// Insert `(key, value)` pairs in order, overwriting existing keys.
    pub fn set_pairs(&mut self, pairs: impl IntoIterator<Item = (K, V)>) -> TreeResult<()> {
        for (k, v) in pairs {
            self.set(k, v, true)?;
        }
        Ok(())
    }

    /// Set `key` to `value` only if `key` is not already present.
    /// Returns `true` iff it was inserted.
    pub fn set_if_not_present(&mut self, key: K, value: V) -> TreeResult<bool> {
        self.set(key, value, false)
    }

    /// Replace the value at `key` with `f(old_value)` if `key` is
    /// present; does nothing otherwise. Returns `true` iff `key` was
    /// present.
    pub fn change_if_present(&mut self, key: &K, f: impl FnOnce(&V) -> V) -> TreeResult<bool> {
        let mut changed = false;
        let mut f = Some(f);
        range::edit_range::<K, V, ()>(
            &mut self.root,
            &mut self.len,
            Bound::Included(key),
            Bound::Included(key),
            &self.cmp,
            self.max_node_size,
            0,
            &mut |_k, v, _c| {
                changed = true;
                let f = f.take().expect("callback invoked at most once for a point range");
                RangeEdit::BreakAfterSetValue(f(v), ())
            },
        )?;
        Ok(changed)
    }

    /// Remove `key`. Returns `true` iff it was present.
    pub fn delete(&mut self, key: &K) -> TreeResult<bool> {
        let mut deleted = false;
        range::edit_range::<K, V, ()>(
            &mut self.root,
            &mut self.len,
            Bound::Included(key),
            Bound::Included(key),
            &self.cmp,
            self.max_node_size,
            0,
            &mut |_k, _v, _c| {
                deleted = true;
                RangeEdit::BreakAfterDelete(())
            },
        )?;
        Ok(deleted)
    }

    pub fn min_key(&self) -> Option<&K> {
        if self.len == 0 {
            None
        } else {
            Some(leftmost_pair(&self.root).0)
        }
    }

    pub fn max_key(&self) -> Option<&K> {
        if self.len == 0 {
            None
        } else {
            Some(rightmost_pair(&self.root).0)
        }
    }

    pub fn min_pair(&self) -> Option<(K, V)> {
        if self.len == 0 {
            None
        } else {
            let (k, v) = leftmost_pair(&self.root);
            Some((k.clone(), v.clone()))
        }
    }

    pub fn max_pair(&self) -> Option<(K, V)> {
        if self.len == 0 {
            None
        } else {
            let (k, v) = rightmost_pair(&self.root);
            Some((k.clone(), v.clone()))
        }
    }

    /// Forward iterator over the whole tree.
    pub fn iter(&self) -> Iter<K, V> {
        Iter::new(Rc::clone(&self.root))
    }

    /// Reverse iterator over the whole tree.
    pub fn iter_rev(&self) -> IterRev<K, V> {
        IterRev::new(Rc::clone(&self.root))
    }

    /// Read-only scan of `[low, high)`, stopping early if `f` returns
    /// `Control::Break`. `counter` passed to `f` starts at 0 and
    /// increments once per visited pair.
    pub fn for_range<R>(&self, low: Bound<&K>, high: Bound<&K>, f: &mut dyn FnMut(&K, &V, u64) -> Control<R>) -> TreeResult<Option<R>> {
        match range::for_range(&self.root, low, high, &self.cmp, 0, f)? {
            RangeOutcome::Completed(_) => Ok(None),
            RangeOutcome::Broken(r) => Ok(Some(r)),
        }
    }

    /// Whole-tree scan over values only, in ascending key order (spec.md
    /// §6's `forEach`). A thin adapter over [`Tree::for_range`].
    pub fn for_each<R>(&self, f: &mut dyn FnMut(&V, u64) -> Control<R>) -> TreeResult<Option<R>> {
        self.for_range(Bound::Unbounded, Bound::Unbounded, &mut |_k, v, c| f(v, c))
    }

    /// Whole-tree scan over `(key, value)` pairs, in ascending key order
    /// (spec.md §6's `forEachPair`). A thin adapter over
    /// [`Tree::for_range`].
    pub fn for_each_pair<R>(&self, f: &mut dyn FnMut(&K, &V, u64) -> Control<R>) -> TreeResult<Option<R>> {
        self.for_range(Bound::Unbounded, Bound::Unbounded, f)
    }

    /// Fold `f` over every `(key, value)` pair in ascending key order,
    /// starting from `init` (spec.md §6's `reduce`). A thin adapter over
    /// [`Tree::for_range`]: the scan never breaks early, so the
    /// accumulator always survives to be returned.
    pub fn reduce<A>(&self, init: A, f: &mut dyn FnMut(A, &K, &V) -> A) -> TreeResult<A> {
        let mut acc = Some(init);
        self.for_range::<()>(Bound::Unbounded, Bound::Unbounded, &mut |k, v, _c| {
            let a = acc.take().expect("accumulator consumed at most once per visited pair");
            acc = Some(f(a, k, v));
            Control::Continue
        })?;
        Ok(acc.expect("for_range completes without breaking, so the accumulator is always restored"))
    }

    /// Mutating scan of `[low, high)` (spec.md §5.2). See
    /// [`RangeEdit`] for the per-pair mutation contract.
    pub fn edit_range<R>(&mut self, low: Bound<&K>, high: Bound<&K>, f: &mut dyn FnMut(&K, &V, u64) -> RangeEdit<V, R>) -> TreeResult<Option<R>> {
        match range::edit_range(&mut self.root, &mut self.len, low, high, &self.cmp, self.max_node_size, 0, f)? {
            RangeOutcome::Completed(_) => Ok(None),
            RangeOutcome::Broken(r) => Ok(Some(r)),
        }
    }

    /// The next key strictly greater than `key`, or the minimum key if
    /// `key` is `None`.
    pub fn next_higher_key(&self, key: Option<&K>) -> TreeResult<Option<K>> {
        Ok(self.next_higher_pair(key)?.map(|(k, _)| k))
    }

    pub fn next_higher_pair(&self, key: Option<&K>) -> TreeResult<Option<(K, V)>> {
        match key {
            None => Ok(self.min_pair()),
            Some(k) => {
                let mut it = Iter::starting_at(Rc::clone(&self.root), k, &self.cmp)?;
                match it.next() {
                    None => Ok(None),
                    Some((fk, fv)) => {
                        if self.cmp.compare(&fk, k)? == Ordering::Equal {
                            Ok(it.next())
                        } else {
                            Ok(Some((fk, fv)))
                        }
                    }
                }
            }
        }
    }

    /// The next key strictly less than `key`, or the maximum key if
    /// `key` is `None`.
    pub fn next_lower_key(&self, key: Option<&K>) -> TreeResult<Option<K>> {
        Ok(self.next_lower_pair(key)?.map(|(k, _)| k))
    }

    pub fn next_lower_pair(&self, key: Option<&K>) -> TreeResult<Option<(K, V)>> {
        match key {
            None => Ok(self.max_pair()),
            Some(k) => {
                let mut it = IterRev::starting_at(Rc::clone(&self.root), k, &self.cmp)?;
                match it.next() {
                    None => Ok(None),
                    Some((fk, fv)) => {
                        if self.cmp.compare(&fk, k)? == Ordering::Equal {
                            Ok(it.next())
                        } else {
                            Ok(Some((fk, fv)))
                        }
                    }
                }
            }
        }
    }

    /// `key`'s own pair if present, otherwise the next higher pair.
    pub fn pair_or_next_higher(&self, key: &K) -> TreeResult<Option<(K, V)>> {
        let mut it = Iter::starting_at(Rc::clone(&self.root), key, &self.cmp)?;
        Ok(it.next())
    }

    /// `key`'s own pair if present, otherwise the next lower pair.
    pub fn pair_or_next_lower(&self, key: &K) -> TreeResult<Option<(K, V)>> {
        let mut it = IterRev::starting_at(Rc::clone(&self.root), key, &self.cmp)?;
        Ok(it.next())
    }

    /// Deep-clone the tree, respecting (`force == false`) or overriding
    /// (`force == true`) existing CoW sharing. See
    /// [`crate::node::greedy_clone`].
    pub fn greedy_clone(&self, force: bool) -> Tree<K, V> {
        Tree { root: greedy_clone(&self.root, force), cmp: self.cmp.clone(), max_node_size: self.max_node_size, len: self.len }
    }

    /// Three-way diff against `other`: `only_this`/`only_other` fire for
    /// keys present in just one side, `different` for keys present in
    /// both with values `value_eq` considers unequal. See
    /// [`crate::diff::diff_against`] for the sharing-aware walk.
    pub fn diff_against<R>(
        &self,
        other: &Tree<K, V>,
        value_eq: &ValueEq<V>,
        only_this: &mut dyn FnMut(&K, &V) -> DiffControl<R>,
        only_other: &mut dyn FnMut(&K, &V) -> DiffControl<R>,
        different: &mut dyn FnMut(&K, &V, &V) -> DiffControl<R>,
    ) -> TreeResult<Option<R>> {
        diff::diff_against(&self.root, &self.cmp, &other.root, &other.cmp, value_eq, only_this, only_other, different)
    }

    /// A new tree equal to `self` with `key` set to `value` (spec.md §6's
    /// `with`). `self` is untouched; the result shares every node with
    /// `self` except along the path `set` actually touches.
    pub fn with(&self, key: K, value: V, overwrite: bool) -> TreeResult<Tree<K, V>> {
        let mut t = self.clone();
        t.set(key, value, overwrite)?;
        Ok(t)
    }

    /// A new tree equal to `self` with every `(key, value)` in `pairs` set
    /// (spec.md §6's `withPairs`).
    pub fn with_pairs(&self, pairs: impl IntoIterator<Item = (K, V)>) -> TreeResult<Tree<K, V>> {
        let mut t = self.clone();
        t.set_pairs(pairs)?;
        Ok(t)
    }

    /// A new tree equal to `self` with every key in `keys` set to a clone
    /// of `value` (spec.md §6's `withKeys`).
    pub fn with_keys(&self, keys: impl IntoIterator<Item = K>, value: V) -> TreeResult<Tree<K, V>>
    where
        V: Clone,
    {
        let mut t = self.clone();
        for k in keys {
            t.set(k, value.clone(), true)?;
        }
        Ok(t)
    }

    /// A new tree equal to `self` with `key` removed, if present (spec.md
    /// §6's `without`).
    pub fn without(&self, key: &K) -> TreeResult<Tree<K, V>> {
        let mut t = self.clone();
        t.delete(key)?;
        Ok(t)
    }

    /// A new tree equal to `self` with every key in `keys` removed, if
    /// present (spec.md §6's `withoutKeys`).
    pub fn without_keys<'a>(&self, keys: impl IntoIterator<Item = &'a K>) -> TreeResult<Tree<K, V>>
    where
        K: 'a,
    {
        let mut t = self.clone();
        for k in keys {
            t.delete(k)?;
        }
        Ok(t)
    }

    /// A new tree equal to `self` with every key in `[low, high)` removed
    /// (spec.md §6's `withoutRange`).
    pub fn without_range(&self, low: Bound<&K>, high: Bound<&K>) -> TreeResult<Tree<K, V>> {
        let mut t = self.clone();
        t.edit_range(low, high, &mut |_k, _v, _c| RangeEdit::Delete)?;
        Ok(t)
    }

    /// A new tree holding only the pairs for which `pred` returns `true`
    /// (spec.md §6's `filter`).
    pub fn filter(&self, mut pred: impl FnMut(&K, &V) -> bool) -> TreeResult<Tree<K, V>> {
        let mut t = self.clone();
        t.edit_range(Bound::Unbounded, Bound::Unbounded, &mut |k, v, _c| {
            if pred(k, v) {
                RangeEdit::Continue
            } else {
                RangeEdit::Delete
            }
        })?;
        Ok(t)
    }

    /// A new tree with every value replaced by `f(key, value)`, keeping
    /// the same keys and structure (spec.md §6's `mapValues`).
    pub fn map_values(&self, mut f: impl FnMut(&K, &V) -> V) -> TreeResult<Tree<K, V>> {
        let mut t = self.clone();
        t.edit_range(Bound::Unbounded, Bound::Unbounded, &mut |k, v, _c| RangeEdit::SetValue(f(k, v)))?;
        Ok(t)
    }

    /// Recursively audit every structural invariant: see
    /// [`crate::node::Node::check_valid`].
    pub fn check_valid(&self) -> TreeResult<()> {
        let mut leaf_depth = None;
        let counted = self.root.check_valid(&self.cmp, 0, &mut leaf_depth)?;
        if counted != self.len {
            return Err(TreeError::InvariantViolation { reason: format!("tree len {} != counted size {}", self.len, counted) });
        }
        Ok(())
    }
}

impl<'a, K: Clone, V: Clone> IntoIterator for &'a Tree<K, V> {
    type Item = (K, V);
    type IntoIter = Iter<K, V>;

    fn into_iter(self) -> Iter<K, V> {
        self.iter()
    }
}
