//! Chain: singly linked bucket storage with a forward-only cursor.
//!
//! Nodes live in a per-chain generational arena; `head`, `tail` and each
//! node's `next` are arena keys rather than pointers. Removing a node frees
//! its slot, so a stale key can never resolve to a later node.

use core::fmt;
use core::iter::FusedIterator;
use slotmap::{DefaultKey, SlotMap};
use thiserror::Error;

/// Returned by [`Iter::try_next`] once every element has been yielded.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
#[error("chain iteration is exhausted")]
pub struct ExhaustedIteration;

#[derive(Debug)]
struct Node<T> {
    value: T,
    next: Option<DefaultKey>,
}

/// Insertion-ordered singly linked sequence. Appends go to the tail;
/// removal takes the first match from any position.
pub struct Chain<T> {
    nodes: SlotMap<DefaultKey, Node<T>>, // owns every reachable node, nothing else
    head: Option<DefaultKey>,
    tail: Option<DefaultKey>,
}

impl<T> Chain<T> {
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Add `value` as the new tail.
    pub fn append(&mut self, value: T) {
        let k = self.nodes.insert(Node { value, next: None });
        match self.tail {
            Some(t) => self.nodes[t].next = Some(k),
            None => self.head = Some(k),
        }
        self.tail = Some(k);
    }

    /// Unlink and return the first element matching `pred`. A chain with
    /// no match is left untouched.
    pub fn remove_where<F>(&mut self, mut pred: F) -> Option<T>
    where
        F: FnMut(&T) -> bool,
    {
        let mut prev: Option<DefaultKey> = None;
        let mut cur = self.head;
        while let Some(k) = cur {
            let node = &self.nodes[k];
            let next = node.next;
            if pred(&node.value) {
                let removed = self.nodes.remove(k)?;
                match prev {
                    Some(p) => self.nodes[p].next = removed.next,
                    None => self.head = removed.next,
                }
                if self.tail == Some(k) {
                    self.tail = prev;
                }
                return Some(removed.value);
            }
            prev = Some(k);
            cur = next;
        }
        None
    }

    /// Remove the first element equal to `value`. Returns whether a node
    /// was unlinked; absence is not an error.
    pub fn remove(&mut self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.remove_where(|v| v == value).is_some()
    }

    pub fn find<F>(&self, mut pred: F) -> Option<&T>
    where
        F: FnMut(&T) -> bool,
    {
        self.iter().find(|&v| pred(v))
    }

    pub fn find_mut<F>(&mut self, pred: F) -> Option<&mut T>
    where
        F: FnMut(&T) -> bool,
    {
        let k = self.position(pred)?;
        self.nodes.get_mut(k).map(|n| &mut n.value)
    }

    fn position<F>(&self, mut pred: F) -> Option<DefaultKey>
    where
        F: FnMut(&T) -> bool,
    {
        let mut cur = self.head;
        while let Some(k) = cur {
            let node = self.nodes.get(k)?;
            if pred(&node.value) {
                return Some(k);
            }
            cur = node.next;
        }
        None
    }

    /// Start a new pass from the head. Each call restarts; the chain is
    /// never mutated by iterating.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            nodes: &self.nodes,
            next: self.head,
            remaining: self.nodes.len(),
        }
    }
}

impl<T> Default for Chain<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Chain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> Extend<T> for Chain<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for v in iter {
            self.append(v);
        }
    }
}

impl<T> FromIterator<T> for Chain<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut chain = Chain::new();
        chain.extend(iter);
        chain
    }
}

/// Borrowing cursor over a chain, holding the key of the next node to visit.
pub struct Iter<'a, T> {
    nodes: &'a SlotMap<DefaultKey, Node<T>>,
    next: Option<DefaultKey>,
    remaining: usize,
}

impl<'a, T> Iter<'a, T> {
    /// Whether another element is available. Never advances the cursor.
    #[inline]
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    /// Advance, failing with [`ExhaustedIteration`] past the last element.
    #[inline]
    pub fn try_next(&mut self) -> Result<&'a T, ExhaustedIteration> {
        self.next().ok_or(ExhaustedIteration)
    }
}

impl<'a, T> Clone for Iter<'a, T> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes,
            next: self.next,
            remaining: self.remaining,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let node = self.nodes.get(self.next?)?;
        self.next = node.next;
        self.remaining -= 1;
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> {}
impl<'a, T> FusedIterator for Iter<'a, T> {}

impl<'a, T> IntoIterator for &'a Chain<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Consuming iterator; yields elements in chain order, moving them out.
pub struct IntoIter<T> {
    nodes: SlotMap<DefaultKey, Node<T>>,
    next: Option<DefaultKey>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let node = self.nodes.remove(self.next?)?;
        self.next = node.next;
        Some(node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.nodes.len(), Some(self.nodes.len()))
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}
impl<T> FusedIterator for IntoIter<T> {}

impl<T> IntoIterator for Chain<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;
    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            nodes: self.nodes,
            next: self.head,
        }
    }
}
