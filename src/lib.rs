// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! `cow_btree` - an in-memory sorted key/value container backed by a
//! B+ tree with copy-on-write node sharing, plus a structural set-algebra
//! layer (diff, union, intersect, subtract, bulk-load) that exploits
//! shared subtrees for sublinear cost when two trees are physically
//! related.
//!
//! ## Quick Start
//!
//! ```rust
//! use cow_btree::Tree;
//!
//! let mut t: Tree<i32, &str> = Tree::new();
//! t.set(1, "one", true).unwrap();
//! t.set(2, "two", true).unwrap();
//!
//! let snapshot = t.clone(); // O(1): shares every node with `t`
//! t.set(3, "three", true).unwrap(); // only the touched path is cloned
//! assert_eq!(snapshot.len(), 2);
//! assert_eq!(t.len(), 3);
//! ```
//!
//! ## Sharing model
//!
//! [`Tree::clone`] is a shallow `Rc` clone: the cloned tree shares every
//! node with its source until one side mutates. A node is never mutated
//! while more than one tree can reach it — [`std::rc::Rc::make_mut`] is
//! the clone-on-first-write primitive used throughout the mutation path.
//! See the [`node`] module docs for the full sharing contract.
//!
//! ## Architecture
//!
//! - [`node`]: node representation, CoW sharing, split/merge/shift,
//!   structural validation.
//! - [`tree`]: the `Tree<K, V>` handle and its point operations.
//! - [`range`]: range scans and callback-driven range edits.
//! - [`cursor`]: forward/reverse iteration cursors.
//! - [`diff`]: three-way structural diff between two trees.
//! - [`setops`]: union, intersect, subtract, and bulk-load.
//! - [`ord`]: comparator and value-equality handles.
//! - [`error`]: the crate's error type.

pub mod cursor;
pub mod diff;
pub mod error;
pub mod node;
pub mod ord;
pub mod range;
pub mod setops;
pub mod tree;

#[cfg(test)]
mod node_test;

pub use cursor::{Iter, IterRev};
pub use diff::DiffControl;
pub use error::{TreeError, TreeResult};
pub use ord::{Comparator, SameValue, ValueEq};
pub use range::{Control, RangeEdit};
pub use setops::{bulk_load, intersect, subtract, union};
pub use tree::{Tree, MAX_MAX_NODE_SIZE, MIN_MAX_NODE_SIZE};
