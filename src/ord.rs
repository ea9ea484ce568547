// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Comparator and value-equality handles.
//!
//! The tree core is generic over key and value types and needs only two
//! pieces of caller-supplied behaviour: a total-order comparator for keys,
//! and (for diffing) a "same value" predicate. Both are modelled as
//! cheaply-clonable, pointer-comparable handles so that set-algebra and
//! diff operations can enforce "both trees were built with the same
//! comparator" the way spec.md requires, by comparing pointers rather than
//! re-deriving equality of arbitrary closures.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::error::{TreeError, TreeResult};

type CompareFn<K> = dyn Fn(&K, &K) -> Option<Ordering>;

/// A total-order comparator over `K`, shared cheaply via `Rc`.
///
/// Returning `None` from the underlying function models a non-finite /
/// NaN-like comparison and is surfaced to callers as [`TreeError::BadKey`].
///
/// Two `Comparator`s are considered "the same" for the purposes of
/// [`ComparatorMismatch`](TreeError::ComparatorMismatch) checks iff they
/// were produced from the same `Comparator::new` call (pointer identity of
/// the underlying `Rc`), mirroring spec.md §4.6.5's "same comparator
/// reference" contract.
#[derive(Clone)]
pub struct Comparator<K> {
    f: Rc<CompareFn<K>>,
}

impl<K> Comparator<K> {
    /// Build a comparator from an arbitrary ordering function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&K, &K) -> Option<Ordering> + 'static,
    {
        Comparator { f: Rc::new(f) }
    }

    /// Build a comparator from `K`'s natural `Ord` implementation.
    ///
    /// `Ord::cmp` is total by construction, so this comparator never
    /// raises [`TreeError::BadKey`].
    pub fn natural() -> Self
    where
        K: Ord + 'static,
    {
        Comparator::new(|a: &K, b: &K| Some(a.cmp(b)))
    }

    /// Compare two keys, failing with `BadKey` on a non-finite result.
    pub fn compare(&self, a: &K, b: &K) -> TreeResult<Ordering> {
        (self.f)(a, b).ok_or(TreeError::BadKey)
    }

    /// True iff `self` and `other` were built from the same underlying
    /// function (i.e. originate from the same tree lineage).
    pub fn same_as(&self, other: &Comparator<K>) -> bool {
        Rc::ptr_eq(&self.f, &other.f)
    }
}

type EqFn<V> = dyn Fn(&V, &V) -> bool;

/// A value-equality predicate used by the diff engine to decide whether to
/// call `different` for a key present in both trees.
#[derive(Clone)]
pub struct ValueEq<V> {
    f: Rc<EqFn<V>>,
}

impl<V> ValueEq<V> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&V, &V) -> bool + 'static,
    {
        ValueEq { f: Rc::new(f) }
    }

    pub fn eq(&self, a: &V, b: &V) -> bool {
        (self.f)(a, b)
    }

    /// Build a `ValueEq` from `V`'s `PartialEq` implementation. Note this
    /// is *not* NaN-aware: `f64::NAN == f64::NAN` is `false` under
    /// `PartialEq`. Use [`ValueEq::same_value`] for `SameValue` types when
    /// NaN-equals-NaN semantics are wanted (spec.md §9 Open Question 3).
    pub fn partial_eq() -> Self
    where
        V: PartialEq + 'static,
    {
        ValueEq::new(|a: &V, b: &V| a == b)
    }

    /// Build a `ValueEq` from `V`'s [`SameValue`] implementation.
    pub fn same_value() -> Self
    where
        V: SameValue + 'static,
    {
        ValueEq::new(|a: &V, b: &V| a.same_value(b))
    }
}

/// "Same value" equality: like `PartialEq` except two NaN-equivalent
/// values are considered equal (spec.md §9 Open Question 3, and §3's
/// "same-value-or-both-NaN-like" value equality for diffing).
pub trait SameValue {
    fn same_value(&self, other: &Self) -> bool;
}

macro_rules! same_value_via_eq {
    ($($t:ty),* $(,)?) => {
        $(impl SameValue for $t {
            fn same_value(&self, other: &Self) -> bool {
                self == other
            }
        })*
    };
}

same_value_via_eq!(
    bool, char, String, (),
    i8, i16, i32, i64, i128, isize,
    u8, u16, u32, u64, u128, usize
);

macro_rules! same_value_via_nan_aware_eq {
    ($($t:ty),* $(,)?) => {
        $(impl SameValue for $t {
            fn same_value(&self, other: &Self) -> bool {
                if self.is_nan() && other.is_nan() {
                    true
                } else {
                    self == other
                }
            }
        })*
    };
}

same_value_via_nan_aware_eq!(f32, f64);

impl<T: SameValue> SameValue for Option<T> {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same_value(b),
            (None, None) => true,
            _ => false,
        }
    }
}
