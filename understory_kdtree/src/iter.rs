// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural iteration: in-order and pre-order walks that ignore keys.

use core::fmt;
use core::iter::FusedIterator;

use crate::node::{Arena, HEADER, SlotValuesMut};
use crate::tree::Kdtree;

/// Elements in in-order sequence.
///
/// Created by [`Kdtree::iter`].
pub struct Iter<'a, K, V> {
    arena: &'a Arena<K, V>,
    front: usize,
    back: usize,
    len: usize,
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            arena: self.arena,
            front: self.front,
            back: self.back,
            len: self.len,
        }
    }
}

impl<K, V> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        let node = self.front;
        self.front = self.arena.increment(node);
        self.len -= 1;
        Some(self.arena.entry(node))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        self.back = self.arena.decrement(self.back);
        self.len -= 1;
        Some(self.arena.entry(self.back))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Keys in in-order sequence.
///
/// Created by [`Kdtree::keys`].
#[derive(Clone, Debug)]
pub struct Keys<'a, K, V>(Iter<'a, K, V>);

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.0.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Keys<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|(k, _)| k)
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}
impl<K, V> FusedIterator for Keys<'_, K, V> {}

/// Values in in-order sequence.
///
/// Created by [`Kdtree::values`].
#[derive(Clone, Debug)]
pub struct Values<'a, K, V>(Iter<'a, K, V>);

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.0.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Values<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|(_, v)| v)
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}
impl<K, V> FusedIterator for Values<'_, K, V> {}

/// Mutable values in storage order.
///
/// Created by [`Kdtree::values_mut`].
pub struct ValuesMut<'a, K, V> {
    slots: SlotValuesMut<'a, K, V>,
    len: usize,
}

impl<K, V> fmt::Debug for ValuesMut<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValuesMut")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<&'a mut V> {
        let v = self.slots.next()?;
        self.len -= 1;
        Some(v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<K, V> DoubleEndedIterator for ValuesMut<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let v = self.slots.next_back()?;
        self.len -= 1;
        Some(v)
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}
impl<K, V> FusedIterator for ValuesMut<'_, K, V> {}

/// Elements in pre-order: each node before its left then right subtree.
///
/// Created by [`Kdtree::preorder`]. Rebuilding a tree from this sequence with
/// plain insertions reproduces its shape.
pub struct Preorder<'a, K, V> {
    arena: &'a Arena<K, V>,
    front: usize,
    back: usize,
    len: usize,
}

impl<K, V> fmt::Debug for Preorder<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Preorder")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl<'a, K, V> Iterator for Preorder<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        let node = self.front;
        self.front = self.arena.preorder_increment(node);
        self.len -= 1;
        Some(self.arena.entry(node))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<K, V> DoubleEndedIterator for Preorder<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }
        self.back = self.arena.preorder_decrement(self.back);
        self.len -= 1;
        Some(self.arena.entry(self.back))
    }
}

impl<K, V> ExactSizeIterator for Preorder<'_, K, V> {}
impl<K, V> FusedIterator for Preorder<'_, K, V> {}

impl<K, V, R, C, B> Kdtree<K, V, R, C, B> {
    /// Every element in in-order sequence.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            arena: &self.arena,
            front: self.arena.leftmost(),
            back: HEADER,
            len: self.len,
        }
    }

    /// Every key in in-order sequence.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys(self.iter())
    }

    /// Every value in in-order sequence.
    pub fn values(&self) -> Values<'_, K, V> {
        Values(self.iter())
    }

    /// Every value, mutably. The order is unspecified.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            slots: self.arena.values_mut(),
            len: self.len,
        }
    }

    /// Every element in pre-order.
    pub fn preorder(&self) -> Preorder<'_, K, V> {
        Preorder {
            arena: &self.arena,
            front: self.arena.root().unwrap_or(HEADER),
            back: HEADER,
            len: self.len,
        }
    }
}

impl<'a, K, V, R, C, B> IntoIterator for &'a Kdtree<K, V, R, C, B> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}
