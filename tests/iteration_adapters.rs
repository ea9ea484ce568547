// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! `forEach`/`forEachPair`/`reduce` (spec.md §6), thin adapters over
//! `for_range`.

use std::ops::Bound;

use cow_btree::ord::Comparator;
use cow_btree::range::Control;
use cow_btree::tree::Tree;

fn small_tree() -> Tree<i32, i32> {
    let mut t = Tree::with_comparator_and_max_node_size(Comparator::natural(), 4);
    for k in 0..20 {
        t.set(k, k * 10, true).unwrap();
    }
    t
}

#[test]
fn for_each_visits_every_value_in_ascending_key_order() {
    let t = small_tree();
    let mut seen = Vec::new();
    let result = t.for_each::<()>(&mut |v, _c| {
        seen.push(*v);
        Control::Continue
    }).unwrap();
    assert!(result.is_none());
    assert_eq!(seen, (0..20).map(|k| k * 10).collect::<Vec<_>>());
}

#[test]
fn for_each_breaks_early_and_returns_the_value() {
    let t = small_tree();
    let result = t
        .for_each(&mut |v, _c| if *v == 50 { Control::Break(*v) } else { Control::Continue })
        .unwrap();
    assert_eq!(result, Some(50));
}

#[test]
fn for_each_pair_visits_keys_and_values_together() {
    let t = small_tree();
    let mut seen = Vec::new();
    t.for_each_pair::<()>(&mut |k, v, _c| {
        seen.push((*k, *v));
        Control::Continue
    })
    .unwrap();
    assert_eq!(seen, (0..20).map(|k| (k, k * 10)).collect::<Vec<_>>());
}

#[test]
fn reduce_folds_over_every_pair_in_ascending_key_order() {
    let t = small_tree();
    let sum = t.reduce(0i64, &mut |acc, _k, v| acc + *v as i64).unwrap();
    let expected: i64 = (0..20).map(|k| (k * 10) as i64).sum();
    assert_eq!(sum, expected);

    let keys_concat = t.reduce(Vec::new(), &mut |mut acc: Vec<i32>, k, _v| {
        acc.push(*k);
        acc
    }).unwrap();
    assert_eq!(keys_concat, (0..20).collect::<Vec<_>>());
}

#[test]
fn for_each_pair_agrees_with_for_range_unbounded() {
    let t = small_tree();
    let mut via_for_range = Vec::new();
    t.for_range::<()>(Bound::Unbounded, Bound::Unbounded, &mut |k, v, _c| {
        via_for_range.push((*k, *v));
        Control::Continue
    })
    .unwrap();

    let mut via_for_each_pair = Vec::new();
    t.for_each_pair::<()>(&mut |k, v, _c| {
        via_for_each_pair.push((*k, *v));
        Control::Continue
    })
    .unwrap();

    assert_eq!(via_for_range, via_for_each_pair);
}
