// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! The literal seed scenarios from spec.md §8.

use std::ops::Bound;

use cow_btree::ord::Comparator;
use cow_btree::range::Control;
use cow_btree::tree::Tree;
use cow_btree::DiffControl;

fn small_tree() -> Tree<i32, i32> {
    Tree::with_comparator_and_max_node_size(Comparator::natural(), 4)
}

#[test]
fn scrambled_insert_order_yields_sorted_traversal() {
    let mut t = small_tree();
    for (k, v) in [(6, 6), (7, 7), (5, 5), (2, 2), (4, 4), (1, 1), (3, 3), (8, 8)] {
        t.set(k, v, true).unwrap();
    }
    let keys: Vec<i32> = t.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(t.min_key(), Some(&1));
    assert_eq!(t.max_key(), Some(&8));
}

#[test]
fn range_delete_leaves_a_hole_without_changing_height() {
    let mut t = small_tree();
    for k in 0..64 {
        t.set(k, k, true).unwrap();
    }
    let height_before = t.height();

    // deleteRange(1, 16, false): [1, 16), inclusive low, exclusive high.
    t.edit_range::<()>(Bound::Included(&1), Bound::Excluded(&16), &mut |_k, _v, _c| cow_btree::RangeEdit::Delete)
        .unwrap();

    assert_eq!(t.height(), height_before, "batch deletion must not change tree height");
    assert_eq!(t.len(), 64 - 15);
    assert_eq!(t.min_key(), Some(&0));
    assert_eq!(t.max_key(), Some(&63));
    t.check_valid().unwrap();

    let keys: Vec<i32> = t.iter().map(|(k, _)| k).collect();
    let mut expected: Vec<i32> = (0..64).collect();
    expected.retain(|k| !(1..16).contains(k));
    assert_eq!(keys, expected);
}

#[test]
fn diff_against_disjoint_trees_reports_only_this_and_only_other() {
    let mut a = small_tree();
    let mut b = small_tree();
    for (k, v) in [(1, 1), (3, 3), (5, 5), (7, 7)] {
        a.set(k, v, true).unwrap();
    }
    for (k, v) in [(2, 2), (4, 4), (6, 6), (8, 8)] {
        b.set(k, v, true).unwrap();
    }

    let veq = cow_btree::ValueEq::same_value();
    let mut only_this = Vec::new();
    let mut only_other = Vec::new();
    let mut different_called = false;

    a.diff_against::<()>(
        &b,
        &veq,
        &mut |k, v| {
            only_this.push((*k, *v));
            DiffControl::Continue
        },
        &mut |k, v| {
            only_other.push((*k, *v));
            DiffControl::Continue
        },
        &mut |_k, _va, _vb| {
            different_called = true;
            DiffControl::Continue
        },
    )
    .unwrap();

    assert_eq!(only_this, vec![(1, 1), (3, 3), (5, 5), (7, 7)]);
    assert_eq!(only_other, vec![(2, 2), (4, 4), (6, 6), (8, 8)]);
    assert!(!different_called);
}

#[test]
fn diff_against_breaks_early_at_first_different_key() {
    let cmp = Comparator::<i32>::natural();
    let mut t: Tree<i32, i32> = Tree::with_comparator(cmp);
    for k in 0..100 {
        t.set(k, k, true).unwrap();
    }
    let mut t2 = t.clone();
    t2.set(-1, -1, true).unwrap();
    t2.delete(&10).unwrap();
    t2.set(20, -1, true).unwrap();
    t2.set(110, -1, true).unwrap();

    let veq = cow_btree::ValueEq::same_value();
    let mut only_this = Vec::new();
    let mut only_other = Vec::new();

    let result = t
        .diff_against(
            &t2,
            &veq,
            &mut |k, v| {
                only_this.push((*k, *v));
                DiffControl::Continue
            },
            &mut |k, v| {
                only_other.push((*k, *v));
                DiffControl::Continue
            },
            &mut |k, _va, _vb| DiffControl::Break(*k),
        )
        .unwrap();

    assert_eq!(result, Some(20));
}

#[test]
fn for_range_break_stops_the_scan_and_returns_the_value() {
    let mut t = small_tree();
    for k in 0..20 {
        t.set(k, k * 10, true).unwrap();
    }
    let result = t
        .for_range(Bound::Unbounded, Bound::Unbounded, &mut |k, v, _c| {
            if *k == 5 {
                Control::Break(*v)
            } else {
                Control::Continue
            }
        })
        .unwrap();
    assert_eq!(result, Some(50));
}
