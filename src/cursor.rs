// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Forward and reverse iteration cursors.
//!
//! Both cursors hold an owned path of `(NodeRef, index)` frames from root
//! to the currently-active leaf rather than borrowing from a `Tree`.
//! Frames are cheap `Rc` clones, so a cursor can outlive the `Tree` it was
//! built from and is fully independent of it (spec.md §6's "restartable,
//! detached cursor"). An internal frame's `idx` is the index of the child
//! currently being descended into; a leaf frame's `idx` is the position of
//! the next value to emit (forward) or one past it (reverse).

use std::rc::Rc;

use crate::error::TreeResult;
use crate::node::{search, Node, NodeRef, SearchResult};
use crate::ord::Comparator;

struct Frame<K, V> {
    node: NodeRef<K, V>,
    idx: usize,
}

/// Ascending-order cursor over a tree's entries.
pub struct Iter<K, V> {
    stack: Vec<Frame<K, V>>,
}

impl<K: Clone, V: Clone> Iter<K, V> {
    pub(crate) fn new(root: NodeRef<K, V>) -> Self {
        let mut stack = Vec::new();
        push_leftmost_path(&mut stack, root);
        Iter { stack }
    }

    /// A forward cursor positioned so that the first call to `next()`
    /// yields the smallest key `>= key` (spec.md §6's restart-from-key).
    pub(crate) fn starting_at(root: NodeRef<K, V>, key: &K, cmp: &Comparator<K>) -> TreeResult<Self> {
        let mut stack = Vec::new();
        let mut node = root;
        loop {
            if node.is_leaf() {
                let idx = match node.as_ref() {
                    Node::Leaf(leaf) => search(&leaf.keys, key, cmp)?.index(),
                    Node::Internal(_) => unreachable!(),
                };
                stack.push(Frame { node, idx });
                break;
            }
            let (idx, child) = match node.as_ref() {
                Node::Internal(internal) => {
                    let idx = internal.child_index_for(key, cmp)?;
                    (idx, Rc::clone(&internal.children[idx]))
                }
                Node::Leaf(_) => unreachable!(),
            };
            stack.push(Frame { node, idx });
            node = child;
        }
        Ok(Iter { stack })
    }
}

impl<K: Clone, V: Clone> Iterator for Iter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        loop {
            let top = self.stack.last_mut()?;
            let leaf = match top.node.as_ref() {
                Node::Leaf(leaf) => leaf,
                Node::Internal(_) => unreachable!("top of stack is always a leaf"),
            };
            if top.idx < leaf.keys.len() {
                let i = top.idx;
                let result = (leaf.keys[i].clone(), leaf.values[i].clone());
                top.idx += 1;
                return Some(result);
            }
            self.stack.pop();
            advance(&mut self.stack);
        }
    }
}

fn push_leftmost_path<K, V>(stack: &mut Vec<Frame<K, V>>, mut node: NodeRef<K, V>) {
    loop {
        match node.as_ref() {
            Node::Leaf(_) => {
                stack.push(Frame { node, idx: 0 });
                return;
            }
            Node::Internal(internal) => {
                let child = Rc::clone(&internal.children[0]);
                stack.push(Frame { node, idx: 0 });
                node = child;
            }
        }
    }
}

fn advance<K, V>(stack: &mut Vec<Frame<K, V>>) {
    loop {
        match stack.last_mut() {
            None => return,
            Some(frame) => {
                let children_len = match frame.node.as_ref() {
                    Node::Internal(i) => i.children.len(),
                    Node::Leaf(_) => unreachable!(),
                };
                let next_idx = frame.idx + 1;
                if next_idx < children_len {
                    frame.idx = next_idx;
                    let child = match frame.node.as_ref() {
                        Node::Internal(i) => Rc::clone(&i.children[next_idx]),
                        Node::Leaf(_) => unreachable!(),
                    };
                    push_leftmost_path(stack, child);
                    return;
                } else {
                    stack.pop();
                }
            }
        }
    }
}

/// Descending-order cursor over a tree's entries.
pub struct IterRev<K, V> {
    stack: Vec<Frame<K, V>>,
}

impl<K: Clone, V: Clone> IterRev<K, V> {
    pub(crate) fn new(root: NodeRef<K, V>) -> Self {
        let mut stack = Vec::new();
        push_rightmost_path(&mut stack, root);
        IterRev { stack }
    }

    /// A reverse cursor positioned so that the first call to `next()`
    /// yields the largest key `<= key`.
    pub(crate) fn starting_at(root: NodeRef<K, V>, key: &K, cmp: &Comparator<K>) -> TreeResult<Self> {
        let mut stack = Vec::new();
        let mut node = root;
        loop {
            if node.is_leaf() {
                let idx = match node.as_ref() {
                    Node::Leaf(leaf) => match search(&leaf.keys, key, cmp)? {
                        SearchResult::Found(i) => i + 1,
                        SearchResult::Absent(i) => i,
                    },
                    Node::Internal(_) => unreachable!(),
                };
                stack.push(Frame { node, idx });
                break;
            }
            let (idx, child) = match node.as_ref() {
                Node::Internal(internal) => {
                    let idx = internal.child_index_for(key, cmp)?;
                    (idx, Rc::clone(&internal.children[idx]))
                }
                Node::Leaf(_) => unreachable!(),
            };
            stack.push(Frame { node, idx });
            node = child;
        }
        Ok(IterRev { stack })
    }
}

impl<K: Clone, V: Clone> Iterator for IterRev<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        loop {
            let top = self.stack.last_mut()?;
            let leaf = match top.node.as_ref() {
                Node::Leaf(leaf) => leaf,
                Node::Internal(_) => unreachable!("top of stack is always a leaf"),
            };
            if top.idx > 0 {
                top.idx -= 1;
                let i = top.idx;
                return Some((leaf.keys[i].clone(), leaf.values[i].clone()));
            }
            self.stack.pop();
            advance_rev(&mut self.stack);
        }
    }
}

fn push_rightmost_path<K, V>(stack: &mut Vec<Frame<K, V>>, mut node: NodeRef<K, V>) {
    loop {
        match node.as_ref() {
            Node::Leaf(leaf) => {
                let idx = leaf.keys.len();
                stack.push(Frame { node, idx });
                return;
            }
            Node::Internal(internal) => {
                let last = internal.children.len() - 1;
                let child = Rc::clone(&internal.children[last]);
                stack.push(Frame { node, idx: last });
                node = child;
            }
        }
    }
}

fn advance_rev<K, V>(stack: &mut Vec<Frame<K, V>>) {
    loop {
        match stack.last_mut() {
            None => return,
            Some(frame) => {
                if frame.idx > 0 {
                    frame.idx -= 1;
                    let idx = frame.idx;
                    let child = match frame.node.as_ref() {
                        Node::Internal(i) => Rc::clone(&i.children[idx]),
                        Node::Leaf(_) => unreachable!(),
                    };
                    push_rightmost_path(stack, child);
                    return;
                } else {
                    stack.pop();
                }
            }
        }
    }
}
