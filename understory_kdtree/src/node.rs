// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node arena, handles, and structural navigation.
//!
//! Nodes live in a slot vector and link to each other by slot index. Slot 0 is
//! the header: its `parent` is the root, its `right` is the rightmost node and
//! its `left` points back at itself. The header doubles as the past-the-end
//! position of every iterator. The leftmost node is cached beside it.

use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::error::{Error, Result};

/// Slot of the header node.
pub(crate) const HEADER: usize = 0;

static NEXT_TAG: AtomicU32 = AtomicU32::new(1);

/// Fresh identity for a container, so handles cannot cross containers.
fn next_tag() -> u32 {
    NEXT_TAG.fetch_add(1, Ordering::Relaxed)
}

/// Generational handle to an element of a container.
///
/// Handles survive every operation except erasing their element; rebalancing
/// relinks nodes but never moves elements between slots. A handle is rejected
/// by any other container, by clones, and after [`clear`](crate::Kdtree::clear).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(u32, u32, u32);

impl NodeId {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "NodeId uses 32-bit slot indices by design."
    )]
    const fn new(slot: usize, generation: u32, tag: u32) -> Self {
        Self(slot as u32, generation, tag)
    }

    pub(crate) const fn slot(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Node<K, V> {
    pub(crate) parent: usize,
    pub(crate) left: Option<usize>,
    pub(crate) right: Option<usize>,
    /// Number of elements in the subtree; maintained by relaxed containers only.
    pub(crate) weight: usize,
    generation: u32,
    entry: Option<(K, V)>,
}

impl<K, V> Node<K, V> {
    fn header() -> Self {
        Self {
            parent: HEADER,
            left: Some(HEADER),
            right: Some(HEADER),
            weight: 0,
            generation: 0,
            entry: None,
        }
    }
}

pub(crate) type SlotValuesMut<'a, K, V> = core::iter::FilterMap<
    core::slice::IterMut<'a, Node<K, V>>,
    fn(&'a mut Node<K, V>) -> Option<&'a mut V>,
>;

pub(crate) struct Arena<K, V> {
    nodes: Vec<Node<K, V>>,
    free_list: Vec<usize>,
    leftmost: usize,
    tag: u32,
}

impl<K, V> core::fmt::Debug for Arena<K, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Arena")
            .field("slots", &self.nodes.len())
            .field("free_list", &self.free_list.len())
            .finish_non_exhaustive()
    }
}

impl<K, V> Arena<K, V> {
    pub(crate) fn new() -> Self {
        Self::with_capacity(0)
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let mut nodes = Vec::with_capacity(capacity + 1);
        nodes.push(Node::header());
        Self {
            nodes,
            free_list: Vec::new(),
            leftmost: HEADER,
            tag: next_tag(),
        }
    }

    /// Drop every element and invalidate all outstanding handles.
    pub(crate) fn clear(&mut self) {
        self.nodes.truncate(1);
        self.free_list.clear();
        self.reset_header();
        self.tag = next_tag();
    }

    /// Unlink the header from the tree, leaving an empty tree. Slots are untouched.
    pub(crate) fn reset_header(&mut self) {
        self.nodes[HEADER] = Node::header();
        self.leftmost = HEADER;
    }

    // --- Header accessors ---

    pub(crate) fn root(&self) -> Option<usize> {
        let root = self.nodes[HEADER].parent;
        (root != HEADER).then_some(root)
    }

    pub(crate) fn set_root(&mut self, node: usize) {
        self.nodes[HEADER].parent = node;
        if node != HEADER {
            self.nodes[node].parent = HEADER;
        }
    }

    pub(crate) fn leftmost(&self) -> usize {
        self.leftmost
    }

    pub(crate) fn set_leftmost(&mut self, node: usize) {
        self.leftmost = node;
    }

    pub(crate) fn rightmost(&self) -> usize {
        self.nodes[HEADER].right.unwrap_or(HEADER)
    }

    pub(crate) fn set_rightmost(&mut self, node: usize) {
        self.nodes[HEADER].right = Some(node);
    }

    // --- Links ---

    #[inline]
    pub(crate) fn parent(&self, node: usize) -> usize {
        self.nodes[node].parent
    }

    #[inline]
    pub(crate) fn left(&self, node: usize) -> Option<usize> {
        self.nodes[node].left
    }

    #[inline]
    pub(crate) fn right(&self, node: usize) -> Option<usize> {
        self.nodes[node].right
    }

    #[inline]
    pub(crate) fn is_leaf(&self, node: usize) -> bool {
        self.nodes[node].left.is_none() && self.nodes[node].right.is_none()
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, node: usize) -> &mut Node<K, V> {
        &mut self.nodes[node]
    }

    #[inline]
    pub(crate) fn weight(&self, node: usize) -> usize {
        self.nodes[node].weight
    }

    /// Weight of an optional child; absent children weigh nothing.
    #[inline]
    pub(crate) fn link_weight(&self, link: Option<usize>) -> usize {
        link.map_or(0, |n| self.nodes[n].weight)
    }

    // --- Elements ---

    #[inline]
    pub(crate) fn entry(&self, node: usize) -> (&K, &V) {
        let (k, v) = self.nodes[node].entry.as_ref().expect("dangling node slot");
        (k, v)
    }

    #[inline]
    pub(crate) fn key(&self, node: usize) -> &K {
        self.entry(node).0
    }

    pub(crate) fn value_mut(&mut self, node: usize) -> &mut V {
        &mut self.nodes[node].entry.as_mut().expect("dangling node slot").1
    }

    /// Every live value, in slot order.
    pub(crate) fn values_mut<'a>(&'a mut self) -> SlotValuesMut<'a, K, V> {
        let value: fn(&'a mut Node<K, V>) -> Option<&'a mut V> =
            |n| n.entry.as_mut().map(|(_, v)| v);
        self.nodes.iter_mut().filter_map(value)
    }

    /// Store an element in a fresh, unlinked node of weight 1.
    pub(crate) fn allocate(&mut self, key: K, value: V) -> usize {
        if let Some(slot) = self.free_list.pop() {
            let node = &mut self.nodes[slot];
            node.parent = HEADER;
            node.left = None;
            node.right = None;
            node.weight = 1;
            node.generation = node.generation.wrapping_add(1);
            node.entry = Some((key, value));
            slot
        } else {
            self.nodes.push(Node {
                parent: HEADER,
                left: None,
                right: None,
                weight: 1,
                generation: 1,
                entry: Some((key, value)),
            });
            self.nodes.len() - 1
        }
    }

    /// Take the element out of an unlinked node and recycle its slot.
    pub(crate) fn release(&mut self, node: usize) -> Option<(K, V)> {
        let entry = self.nodes[node].entry.take();
        if entry.is_some() {
            self.free_list.push(node);
        }
        entry
    }

    // --- Handles ---

    pub(crate) fn id(&self, node: usize) -> NodeId {
        NodeId::new(node, self.nodes[node].generation, self.tag)
    }

    /// Map a handle back to its slot.
    ///
    /// The header and stale or foreign handles are rejected.
    pub(crate) fn resolve(&self, id: NodeId) -> Result<usize> {
        if id.2 != self.tag {
            return Err(Error::InvalidIterator);
        }
        let slot = id.slot();
        if slot == HEADER {
            return Err(Error::InvalidNode);
        }
        match self.nodes.get(slot) {
            Some(n) if n.entry.is_some() && n.generation == id.1 => Ok(slot),
            _ => Err(Error::InvalidIterator),
        }
    }

    // --- Structural navigation ---

    pub(crate) fn minimum(&self, mut node: usize) -> usize {
        while let Some(l) = self.left(node) {
            node = l;
        }
        node
    }

    pub(crate) fn maximum(&self, mut node: usize) -> usize {
        while let Some(r) = self.right(node) {
            node = r;
        }
        node
    }

    /// In-order successor; the header follows the rightmost node.
    pub(crate) fn increment(&self, mut node: usize) -> usize {
        debug_assert_ne!(node, HEADER, "increment past the end");
        if let Some(r) = self.right(node) {
            return self.minimum(r);
        }
        let mut p = self.parent(node);
        while p != HEADER && self.right(p) == Some(node) {
            node = p;
            p = self.parent(p);
        }
        p
    }

    /// In-order predecessor; the rightmost node precedes the header.
    pub(crate) fn decrement(&self, mut node: usize) -> usize {
        if node == HEADER {
            return self.rightmost();
        }
        if let Some(l) = self.left(node) {
            return self.maximum(l);
        }
        let mut p = self.parent(node);
        while p != HEADER && self.left(p) == Some(node) {
            node = p;
            p = self.parent(p);
        }
        p
    }

    /// Pre-order successor; the header follows the last node.
    pub(crate) fn preorder_increment(&self, mut node: usize) -> usize {
        if let Some(l) = self.left(node) {
            return l;
        }
        if let Some(r) = self.right(node) {
            return r;
        }
        loop {
            let p = self.parent(node);
            if p == HEADER {
                return HEADER;
            }
            match self.right(p) {
                Some(r) if r != node => return r,
                _ => node = p,
            }
        }
    }

    /// Pre-order predecessor; the last node precedes the header.
    pub(crate) fn preorder_decrement(&self, node: usize) -> usize {
        let last_below = |mut n: usize| {
            while let Some(c) = self.right(n).or(self.left(n)) {
                n = c;
            }
            n
        };
        if node == HEADER {
            return self.root().map_or(HEADER, last_below);
        }
        let p = self.parent(node);
        if p != HEADER
            && self.right(p) == Some(node)
            && let Some(l) = self.left(p)
        {
            return last_below(l);
        }
        p
    }

    /// Axis on which `node` splits, from its depth.
    pub(crate) fn axis_of(&self, rank: usize, mut node: usize) -> usize {
        let mut depth = 0;
        while self.parent(node) != HEADER {
            node = self.parent(node);
            depth += 1;
        }
        depth % rank
    }

    /// Exchange the tree positions of `a` and `b`, elements staying in their slots.
    ///
    /// Weights follow positions. The caller maintains the leftmost and
    /// rightmost caches.
    pub(crate) fn swap_nodes(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let swap = |x: usize| {
            if x == a {
                b
            } else if x == b {
                a
            } else {
                x
            }
        };
        let (pa, la, ra) = (self.parent(a), self.left(a), self.right(a));
        let (pb, lb, rb) = (self.parent(b), self.left(b), self.right(b));
        let around = [Some(pa), la, ra, Some(pb), lb, rb];
        for (i, link) in around.iter().enumerate() {
            let Some(n) = *link else { continue };
            if n == a || n == b || around[..i].contains(&Some(n)) {
                continue;
            }
            if n == HEADER {
                let root = self.nodes[HEADER].parent;
                self.nodes[HEADER].parent = swap(root);
            } else {
                let node = &mut self.nodes[n];
                node.parent = swap(node.parent);
                node.left = node.left.map(swap);
                node.right = node.right.map(swap);
            }
        }
        let node = &mut self.nodes[a];
        node.parent = swap(pb);
        node.left = lb.map(swap);
        node.right = rb.map(swap);
        let node = &mut self.nodes[b];
        node.parent = swap(pa);
        node.left = la.map(swap);
        node.right = ra.map(swap);
        let (wa, wb) = (self.nodes[a].weight, self.nodes[b].weight);
        self.nodes[a].weight = wb;
        self.nodes[b].weight = wa;
    }
}

impl<K: Clone, V: Clone> Arena<K, V> {
    /// Copy of the tree shape into a compact arena with a new identity.
    ///
    /// Nodes are copied in pre-order, so the copy's slot order follows the
    /// tree rather than the allocation history of `self`.
    pub(crate) fn compact_clone(&self) -> Self {
        let mut out = Self::with_capacity(self.nodes.len() - 1 - self.free_list.len());
        let Some(root) = self.root() else {
            return out;
        };
        // Slot of each copied node, indexed by source slot.
        let mut map = alloc::vec![HEADER; self.nodes.len()];
        let mut node = root;
        while node != HEADER {
            let (k, v) = self.entry(node);
            let copy = out.allocate(k.clone(), v.clone());
            out.nodes[copy].weight = self.nodes[node].weight;
            let parent = map[self.parent(node)];
            if parent == HEADER {
                out.set_root(copy);
            } else {
                out.nodes[copy].parent = parent;
                if self.left(self.parent(node)) == Some(node) {
                    out.nodes[parent].left = Some(copy);
                } else {
                    out.nodes[parent].right = Some(copy);
                }
            }
            map[node] = copy;
            node = self.preorder_increment(node);
        }
        out.leftmost = map[self.leftmost];
        out.set_rightmost(map[self.rightmost()]);
        out
    }
}
