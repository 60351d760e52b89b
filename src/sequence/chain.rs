//! Doubly linked sequence over slab-allocated nodes.
//!
//! This module provides [`ChainSequence`], a doubly linked chain whose nodes
//! live in a contiguous slab and reference each other by slot index, never by
//! lifetime. The chain doubles as a deque, a stack, and a queue: both ends
//! support O(1) insertion and removal, with throwing and non-throwing
//! variants of every end operation.
//!
//! # Representation
//!
//! Links are a relation, not ownership: each node records the slot indices of
//! its neighbors, the slab owns every node, and removed slots go onto a free
//! list for reuse. Indexed access locates the target node by bisection:
//! forward from the head for the first half, backward from the tail for the
//! second, so a lookup never traverses more than half the chain.
//!
//! # Examples
//!
//! ```rust
//! use seqlist::sequence::{ChainSequence, Sequence};
//!
//! let mut deque = ChainSequence::new();
//! deque.push_back(2);
//! deque.push_back(3);
//! deque.push_front(1);
//!
//! assert_eq!(deque.to_vec()?, vec![1, 2, 3]);
//! assert_eq!(deque.pop_back()?, 3);
//! assert_eq!(deque.pop_front()?, 1);
//! # Ok::<(), seqlist::SequenceError>(())
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FromIterator;

use super::{SharedCell, Sequence};
use crate::error::SequenceError;

// =============================================================================
// Node and Slab Definitions
// =============================================================================

/// A chain node: the element plus the slot indices of its neighbors.
pub(crate) struct ChainNode<T> {
    pub(crate) element: T,
    pub(crate) previous: Option<usize>,
    pub(crate) next: Option<usize>,
}

/// One slab slot: either a live node or a link in the free list.
pub(crate) enum Slot<T> {
    Occupied(ChainNode<T>),
    Vacant { next_free: Option<usize> },
}

/// Exclusive owner of the slab, the end pointers, and the mutation
/// generation. Every relinking primitive lives here and bumps the
/// generation exactly once.
pub(crate) struct ChainCore<T> {
    pub(crate) slots: Vec<Slot<T>>,
    free_head: Option<usize>,
    pub(crate) head: Option<usize>,
    pub(crate) tail: Option<usize>,
    pub(crate) length: usize,
    pub(crate) generation: u64,
}

impl<T> ChainCore<T> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            head: None,
            tail: None,
            length: 0,
            generation: 0,
        }
    }

    pub(crate) fn node(&self, index: usize) -> &ChainNode<T> {
        match &self.slots[index] {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => unreachable!("chain link points at a vacant slot"),
        }
    }

    pub(crate) fn node_mut(&mut self, index: usize) -> &mut ChainNode<T> {
        match &mut self.slots[index] {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => unreachable!("chain link points at a vacant slot"),
        }
    }

    /// Checked node access for callers that may hold a stale index.
    pub(crate) fn try_node(&self, index: usize) -> Option<&ChainNode<T>> {
        match self.slots.get(index) {
            Some(Slot::Occupied(node)) => Some(node),
            _ => None,
        }
    }

    fn allocate(&mut self, node: ChainNode<T>) -> usize {
        match self.free_head {
            Some(index) => {
                let next_free = match &self.slots[index] {
                    Slot::Vacant { next_free } => *next_free,
                    Slot::Occupied(_) => {
                        unreachable!("free list points at an occupied slot")
                    }
                };
                self.free_head = next_free;
                self.slots[index] = Slot::Occupied(node);
                index
            }
            None => {
                self.slots.push(Slot::Occupied(node));
                self.slots.len() - 1
            }
        }
    }

    /// Removes the node from the slab, dropping its links with it, and puts
    /// the slot on the free list.
    fn release(&mut self, index: usize) -> ChainNode<T> {
        let slot = std::mem::replace(
            &mut self.slots[index],
            Slot::Vacant {
                next_free: self.free_head,
            },
        );
        self.free_head = Some(index);
        match slot {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => unreachable!("released a vacant slot"),
        }
    }

    pub(crate) fn link_first(&mut self, element: T) {
        let old_head = self.head;
        let index = self.allocate(ChainNode {
            element,
            previous: None,
            next: old_head,
        });
        match old_head {
            Some(head) => self.node_mut(head).previous = Some(index),
            None => self.tail = Some(index),
        }
        self.head = Some(index);
        self.length += 1;
        self.generation += 1;
    }

    pub(crate) fn link_last(&mut self, element: T) {
        let old_tail = self.tail;
        let index = self.allocate(ChainNode {
            element,
            previous: old_tail,
            next: None,
        });
        match old_tail {
            Some(tail) => self.node_mut(tail).next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.length += 1;
        self.generation += 1;
    }

    pub(crate) fn link_before(&mut self, element: T, successor: usize) {
        let predecessor = self.node(successor).previous;
        let index = self.allocate(ChainNode {
            element,
            previous: predecessor,
            next: Some(successor),
        });
        self.node_mut(successor).previous = Some(index);
        match predecessor {
            Some(previous) => self.node_mut(previous).next = Some(index),
            None => self.head = Some(index),
        }
        self.length += 1;
        self.generation += 1;
    }

    /// Unlinks the node at `index`, fixing up both neighbors. Handles the
    /// head, tail, and interior cases.
    pub(crate) fn unlink(&mut self, index: usize) -> T {
        let node = self.release(index);
        match node.previous {
            Some(previous) => self.node_mut(previous).next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.node_mut(next).previous = node.previous,
            None => self.tail = node.previous,
        }
        self.length -= 1;
        self.generation += 1;
        node.element
    }

    /// Locates the node holding position `position`, which must be within
    /// `[0, length)`. Bisects: walks forward from the head for the first
    /// half, backward from the tail for the second.
    pub(crate) fn node_index_at(&self, position: usize) -> usize {
        if position < self.length / 2 {
            let Some(mut index) = self.head else {
                unreachable!("non-empty chain has no head")
            };
            for _ in 0..position {
                index = match self.node(index).next {
                    Some(next) => next,
                    None => unreachable!("forward chain ends before its length"),
                };
            }
            index
        } else {
            let Some(mut index) = self.tail else {
                unreachable!("non-empty chain has no tail")
            };
            for _ in 0..(self.length - 1 - position) {
                index = match self.node(index).previous {
                    Some(previous) => previous,
                    None => unreachable!("backward chain ends before its length"),
                };
            }
            index
        }
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.free_head = None;
        self.head = None;
        self.tail = None;
        self.length = 0;
        self.generation += 1;
    }
}

// =============================================================================
// ChainSequence Definition
// =============================================================================

/// A doubly linked sequence over slab-allocated nodes, usable as a deque,
/// stack, or queue.
///
/// # Time Complexity
///
/// | Operation                    | Complexity   |
/// |------------------------------|--------------|
/// | `push_front` / `push_back`   | O(1)         |
/// | `pop_front` / `pop_back`     | O(1)         |
/// | `get` / `set` / `insert` / `remove_at` | O(min(i, len − i)) |
/// | `index_of`                   | O(len)       |
/// | `clear`                      | O(len)       |
///
/// # Examples
///
/// ```rust
/// use seqlist::sequence::ChainSequence;
///
/// let mut stack = ChainSequence::new();
/// stack.push(1);
/// stack.push(2);
/// assert_eq!(stack.pop()?, 2);
/// assert_eq!(stack.peek(), Some(1));
/// # Ok::<(), seqlist::SequenceError>(())
/// ```
pub struct ChainSequence<T> {
    core: SharedCell<ChainCore<T>>,
}

impl<T> ChainSequence<T> {
    /// Creates a new empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: SharedCell::new(std::cell::RefCell::new(ChainCore::new())),
        }
    }

    pub(crate) fn share_core(&self) -> SharedCell<ChainCore<T>> {
        SharedCell::clone(&self.core)
    }

    /// Inserts an element at the front of the chain.
    pub fn push_front(&mut self, element: T) {
        self.core.borrow_mut().link_first(element);
    }

    /// Appends an element at the back of the chain.
    pub fn push_back(&mut self, element: T) {
        self.core.borrow_mut().link_last(element);
    }

    /// Removes and returns the first element.
    ///
    /// # Errors
    ///
    /// [`SequenceError::NoSuchElement`] if the chain is empty.
    pub fn pop_front(&mut self) -> Result<T, SequenceError> {
        let mut core = self.core.borrow_mut();
        let Some(head) = core.head else {
            return Err(SequenceError::NoSuchElement);
        };
        Ok(core.unlink(head))
    }

    /// Removes and returns the last element.
    ///
    /// # Errors
    ///
    /// [`SequenceError::NoSuchElement`] if the chain is empty.
    pub fn pop_back(&mut self) -> Result<T, SequenceError> {
        let mut core = self.core.borrow_mut();
        let Some(tail) = core.tail else {
            return Err(SequenceError::NoSuchElement);
        };
        Ok(core.unlink(tail))
    }

    /// Removes and returns the first element, or `None` when empty.
    pub fn poll_front(&mut self) -> Option<T> {
        self.pop_front().ok()
    }

    /// Removes and returns the last element, or `None` when empty.
    pub fn poll_back(&mut self) -> Option<T> {
        self.pop_back().ok()
    }

    /// Pushes onto the stack (the front of the chain).
    pub fn push(&mut self, element: T) {
        self.push_front(element);
    }

    /// Pops the stack (the front of the chain).
    ///
    /// # Errors
    ///
    /// [`SequenceError::NoSuchElement`] if the chain is empty.
    pub fn pop(&mut self) -> Result<T, SequenceError> {
        self.pop_front()
    }

    /// Enqueues at the back of the chain. Never fails; returns `true`.
    pub fn offer(&mut self, element: T) -> bool {
        self.push_back(element);
        true
    }

    /// Dequeues from the front of the chain, or `None` when empty.
    pub fn poll(&mut self) -> Option<T> {
        self.poll_front()
    }
}

impl<T: Clone> ChainSequence<T> {
    /// Returns the first element.
    ///
    /// # Errors
    ///
    /// [`SequenceError::NoSuchElement`] if the chain is empty.
    pub fn front(&self) -> Result<T, SequenceError> {
        let core = self.core.borrow();
        match core.head {
            Some(head) => Ok(core.node(head).element.clone()),
            None => Err(SequenceError::NoSuchElement),
        }
    }

    /// Returns the last element.
    ///
    /// # Errors
    ///
    /// [`SequenceError::NoSuchElement`] if the chain is empty.
    pub fn back(&self) -> Result<T, SequenceError> {
        let core = self.core.borrow();
        match core.tail {
            Some(tail) => Ok(core.node(tail).element.clone()),
            None => Err(SequenceError::NoSuchElement),
        }
    }

    /// Returns the first element, or `None` when empty.
    #[must_use]
    pub fn peek_front(&self) -> Option<T> {
        self.front().ok()
    }

    /// Returns the last element, or `None` when empty.
    #[must_use]
    pub fn peek_back(&self) -> Option<T> {
        self.back().ok()
    }

    /// Peeks the stack (the front of the chain), or `None` when empty.
    #[must_use]
    pub fn peek(&self) -> Option<T> {
        self.peek_front()
    }

    /// Removes the last element equal to `element`, if any.
    ///
    /// Returns `true` if an element was removed. The counterpart of
    /// [`Sequence::remove_value`], scanning backward from the tail.
    pub fn remove_last_value(&mut self, element: &T) -> bool
    where
        T: PartialEq,
    {
        let mut core = self.core.borrow_mut();
        let mut index = core.tail;
        while let Some(current) = index {
            let node = core.node(current);
            if node.element == *element {
                core.unlink(current);
                return true;
            }
            index = node.previous;
        }
        false
    }

    /// Creates an independent copy with fresh nodes.
    ///
    /// The copy starts a generation history of its own; cursors of the
    /// original never observe it.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        self.collect_elements().into_iter().collect()
    }

    /// Returns a cursor positioned before the first element.
    #[must_use]
    pub fn cursor(&self) -> ChainCursor<T> {
        let head = self.core.borrow().head;
        ChainCursor::new(self.share_core(), head, 0)
    }

    /// Returns a cursor positioned before `index`, located by bisection.
    ///
    /// # Errors
    ///
    /// [`SequenceError::IndexOutOfRange`] if `index > len()`.
    pub fn cursor_at(&self, index: usize) -> Result<ChainCursor<T>, SequenceError> {
        let core = self.core.borrow();
        if index > core.length {
            return Err(SequenceError::IndexOutOfRange {
                index,
                length: core.length,
            });
        }
        let next_node = if index == core.length {
            None
        } else {
            Some(core.node_index_at(index))
        };
        drop(core);
        Ok(ChainCursor::new(self.share_core(), next_node, index))
    }

    /// Returns a split cursor over the whole chain.
    ///
    /// Splits materialize geometrically growing batches of front elements
    /// into detached snapshots, since node links cannot be subdivided by
    /// index.
    #[must_use]
    pub fn split_cursor(&self) -> super::ChainSplitCursor<T> {
        super::ChainSplitCursor::over_chain(self.share_core())
    }

    fn collect_elements(&self) -> Vec<T> {
        let core = self.core.borrow();
        let mut elements = Vec::with_capacity(core.length);
        let mut index = core.head;
        while let Some(current) = index {
            let node = core.node(current);
            elements.push(node.element.clone());
            index = node.next;
        }
        elements
    }
}

// =============================================================================
// Sequence Implementation
// =============================================================================

impl<T: Clone> Sequence<T> for ChainSequence<T> {
    fn len(&self) -> usize {
        self.core.borrow().length
    }

    fn generation(&self) -> u64 {
        self.core.borrow().generation
    }

    fn get(&self, index: usize) -> Result<T, SequenceError> {
        let core = self.core.borrow();
        if index >= core.length {
            return Err(SequenceError::IndexOutOfRange {
                index,
                length: core.length,
            });
        }
        let node_index = core.node_index_at(index);
        Ok(core.node(node_index).element.clone())
    }

    fn set(&mut self, index: usize, element: T) -> Result<T, SequenceError> {
        let mut core = self.core.borrow_mut();
        if index >= core.length {
            return Err(SequenceError::IndexOutOfRange {
                index,
                length: core.length,
            });
        }
        let node_index = core.node_index_at(index);
        Ok(std::mem::replace(
            &mut core.node_mut(node_index).element,
            element,
        ))
    }

    fn append(&mut self, element: T) -> Result<(), SequenceError> {
        self.push_back(element);
        Ok(())
    }

    fn insert(&mut self, index: usize, element: T) -> Result<(), SequenceError> {
        let mut core = self.core.borrow_mut();
        if index > core.length {
            return Err(SequenceError::IndexOutOfRange {
                index,
                length: core.length,
            });
        }
        if index == core.length {
            core.link_last(element);
        } else {
            let successor = core.node_index_at(index);
            core.link_before(element, successor);
        }
        Ok(())
    }

    fn remove_at(&mut self, index: usize) -> Result<T, SequenceError> {
        let mut core = self.core.borrow_mut();
        if index >= core.length {
            return Err(SequenceError::IndexOutOfRange {
                index,
                length: core.length,
            });
        }
        let node_index = core.node_index_at(index);
        Ok(core.unlink(node_index))
    }

    fn remove_value(&mut self, element: &T) -> Result<bool, SequenceError>
    where
        T: PartialEq,
    {
        let mut core = self.core.borrow_mut();
        let mut index = core.head;
        while let Some(current) = index {
            let node = core.node(current);
            if node.element == *element {
                core.unlink(current);
                return Ok(true);
            }
            index = node.next;
        }
        Ok(false)
    }

    fn index_of(&self, element: &T) -> Result<Option<usize>, SequenceError>
    where
        T: PartialEq,
    {
        let core = self.core.borrow();
        let mut index = core.head;
        let mut position = 0;
        while let Some(current) = index {
            let node = core.node(current);
            if node.element == *element {
                return Ok(Some(position));
            }
            index = node.next;
            position += 1;
        }
        Ok(None)
    }

    fn last_index_of(&self, element: &T) -> Result<Option<usize>, SequenceError>
    where
        T: PartialEq,
    {
        let core = self.core.borrow();
        let mut index = core.tail;
        let mut position = core.length;
        while let Some(current) = index {
            let node = core.node(current);
            position -= 1;
            if node.element == *element {
                return Ok(Some(position));
            }
            index = node.previous;
        }
        Ok(None)
    }

    fn clear(&mut self) -> Result<(), SequenceError> {
        self.core.borrow_mut().clear();
        Ok(())
    }

    fn to_vec(&self) -> Result<Vec<T>, SequenceError> {
        Ok(self.collect_elements())
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<T> Default for ChainSequence<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialEq> PartialEq for ChainSequence<T> {
    fn eq(&self, other: &Self) -> bool {
        if SharedCell::ptr_eq(&self.core, &other.core) {
            return true;
        }
        let left = self.core.borrow();
        let right = other.core.borrow();
        if left.length != right.length {
            return false;
        }
        let mut left_index = left.head;
        let mut right_index = right.head;
        while let (Some(left_current), Some(right_current)) = (left_index, right_index) {
            let left_node = left.node(left_current);
            let right_node = right.node(right_current);
            if left_node.element != right_node.element {
                return false;
            }
            left_index = left_node.next;
            right_index = right_node.next;
        }
        true
    }
}

impl<T: Eq> Eq for ChainSequence<T> {}

impl<T: Hash> Hash for ChainSequence<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let core = self.core.borrow();
        core.length.hash(state);
        let mut index = core.head;
        while let Some(current) = index {
            let node = core.node(current);
            node.element.hash(state);
            index = node.next;
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ChainSequence<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.core.borrow();
        let mut builder = formatter.debug_list();
        let mut index = core.head;
        while let Some(current) = index {
            let node = core.node(current);
            builder.entry(&node.element);
            index = node.next;
        }
        builder.finish()
    }
}

impl<T: fmt::Display> fmt::Display for ChainSequence<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "[")?;
        let core = self.core.borrow();
        let mut index = core.head;
        let mut first = true;
        while let Some(current) = index {
            let node = core.node(current);
            if first {
                first = false;
            } else {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{}", node.element)?;
            index = node.next;
        }
        write!(formatter, "]")
    }
}

impl<T> FromIterator<T> for ChainSequence<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut core = ChainCore::new();
        for element in iter {
            core.link_last(element);
        }
        // Construction is not mutation history.
        core.generation = 0;
        Self {
            core: SharedCell::new(std::cell::RefCell::new(core)),
        }
    }
}

impl<T: Clone> IntoIterator for ChainSequence<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        match SharedCell::try_unwrap(self.core) {
            Ok(cell) => {
                let mut core = cell.into_inner();
                let mut elements = Vec::with_capacity(core.length);
                let mut index = core.head;
                while let Some(current) = index {
                    let slot = std::mem::replace(
                        &mut core.slots[current],
                        Slot::Vacant { next_free: None },
                    );
                    match slot {
                        Slot::Occupied(node) => {
                            elements.push(node.element);
                            index = node.next;
                        }
                        Slot::Vacant { .. } => {
                            unreachable!("chain link points at a vacant slot")
                        }
                    }
                }
                elements.into_iter()
            }
            Err(core) => {
                let chain = Self { core };
                chain.collect_elements().into_iter()
            }
        }
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<T: serde::Serialize> serde::Serialize for ChainSequence<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;
        let core = self.core.borrow();
        let mut seq = serializer.serialize_seq(Some(core.length))?;
        let mut index = core.head;
        while let Some(current) = index {
            let node = core.node(current);
            seq.serialize_element(&node.element)?;
            index = node.next;
        }
        seq.end()
    }
}

#[cfg(feature = "serde")]
struct ChainSequenceVisitor<T> {
    marker: std::marker::PhantomData<T>,
}

#[cfg(feature = "serde")]
impl<T> ChainSequenceVisitor<T> {
    const fn new() -> Self {
        Self {
            marker: std::marker::PhantomData,
        }
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::de::Visitor<'de> for ChainSequenceVisitor<T>
where
    T: serde::Deserialize<'de>,
{
    type Value = ChainSequence<T>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a sequence")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        let mut core = ChainCore::new();
        while let Some(element) = seq.next_element()? {
            core.link_last(element);
        }
        core.generation = 0;
        Ok(ChainSequence {
            core: SharedCell::new(std::cell::RefCell::new(core)),
        })
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for ChainSequence<T>
where
    T: serde::Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(ChainSequenceVisitor::new())
    }
}

// =============================================================================
// ChainCursor
// =============================================================================

/// Bidirectional fail-fast cursor over a [`ChainSequence`].
///
/// The cursor is anchored on the node the next
/// [`advance`](ChainCursor::advance) returns, plus the logical position for
/// [`next_index`](ChainCursor::next_index). Staleness detection and
/// own-edit resynchronization follow the same protocol as
/// [`ArrayCursor`](super::ArrayCursor).
pub struct ChainCursor<T> {
    core: SharedCell<ChainCore<T>>,
    next_node: Option<usize>,
    next_position: usize,
    last_returned: Option<usize>,
    expected_generation: u64,
}

impl<T: Clone> ChainCursor<T> {
    pub(crate) fn new(
        core: SharedCell<ChainCore<T>>,
        next_node: Option<usize>,
        next_position: usize,
    ) -> Self {
        let expected_generation = core.borrow().generation;
        Self {
            core,
            next_node,
            next_position,
            last_returned: None,
            expected_generation,
        }
    }

    fn check_generation(&self) -> Result<(), SequenceError> {
        let observed = self.core.borrow().generation;
        if observed == self.expected_generation {
            Ok(())
        } else {
            Err(SequenceError::ConcurrentStructuralChange {
                expected: self.expected_generation,
                observed,
            })
        }
    }

    fn resynchronize(&mut self) {
        self.expected_generation = self.core.borrow().generation;
    }

    /// Returns `true` if an [`advance`](ChainCursor::advance) would return
    /// an element.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.next_position < self.core.borrow().length
    }

    /// Returns `true` if a [`retreat`](ChainCursor::retreat) would return
    /// an element.
    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.next_position > 0
    }

    /// Returns the logical index of the element the next
    /// [`advance`](ChainCursor::advance) would return.
    #[must_use]
    pub const fn next_index(&self) -> usize {
        self.next_position
    }

    /// Returns the logical index of the element the next
    /// [`retreat`](ChainCursor::retreat) would return, or `None` at the
    /// front.
    #[must_use]
    pub const fn previous_index(&self) -> Option<usize> {
        self.next_position.checked_sub(1)
    }

    /// Returns the next element and steps forward over it.
    ///
    /// # Errors
    ///
    /// [`SequenceError::ConcurrentStructuralChange`] if the chain was
    /// structurally modified behind this cursor;
    /// [`SequenceError::NoSuchElement`] at the end.
    pub fn advance(&mut self) -> Result<T, SequenceError> {
        self.check_generation()?;
        let Some(current) = self.next_node else {
            return Err(SequenceError::NoSuchElement);
        };
        let (element, next) = {
            let core = self.core.borrow();
            let node = core.node(current);
            (node.element.clone(), node.next)
        };
        self.last_returned = Some(current);
        self.next_node = next;
        self.next_position += 1;
        Ok(element)
    }

    /// Returns the previous element and steps backward over it.
    ///
    /// # Errors
    ///
    /// [`SequenceError::ConcurrentStructuralChange`] if the chain was
    /// structurally modified behind this cursor;
    /// [`SequenceError::NoSuchElement`] at the front.
    pub fn retreat(&mut self) -> Result<T, SequenceError> {
        self.check_generation()?;
        let (previous, element) = {
            let core = self.core.borrow();
            let previous = match self.next_node {
                Some(current) => core.node(current).previous,
                None => core.tail,
            };
            let Some(previous) = previous else {
                return Err(SequenceError::NoSuchElement);
            };
            (previous, core.node(previous).element.clone())
        };
        self.next_node = Some(previous);
        self.last_returned = Some(previous);
        self.next_position -= 1;
        Ok(element)
    }

    /// Replaces the last element returned by
    /// [`advance`](ChainCursor::advance) or
    /// [`retreat`](ChainCursor::retreat).
    ///
    /// Not a structural change.
    ///
    /// # Errors
    ///
    /// [`SequenceError::IllegalIteratorState`] without a preceding
    /// successful positional move;
    /// [`SequenceError::ConcurrentStructuralChange`] on staleness.
    pub fn set(&mut self, element: T) -> Result<(), SequenceError> {
        let index = self
            .last_returned
            .ok_or(SequenceError::IllegalIteratorState)?;
        self.check_generation()?;
        self.core.borrow_mut().node_mut(index).element = element;
        Ok(())
    }

    /// Inserts an element at the cursor position, before the element the
    /// next [`advance`](ChainCursor::advance) would have returned.
    ///
    /// The cursor steps over the inserted element and remains valid.
    ///
    /// # Errors
    ///
    /// [`SequenceError::ConcurrentStructuralChange`] on staleness.
    pub fn insert(&mut self, element: T) -> Result<(), SequenceError> {
        self.check_generation()?;
        {
            let mut core = self.core.borrow_mut();
            match self.next_node {
                Some(successor) => core.link_before(element, successor),
                None => core.link_last(element),
            }
        }
        self.next_position += 1;
        self.last_returned = None;
        self.resynchronize();
        Ok(())
    }

    /// Removes the last element returned by
    /// [`advance`](ChainCursor::advance) or
    /// [`retreat`](ChainCursor::retreat). The cursor remains valid.
    ///
    /// # Errors
    ///
    /// [`SequenceError::IllegalIteratorState`] without a preceding
    /// successful positional move;
    /// [`SequenceError::ConcurrentStructuralChange`] on staleness.
    pub fn remove(&mut self) -> Result<(), SequenceError> {
        let removed = self
            .last_returned
            .ok_or(SequenceError::IllegalIteratorState)?;
        self.check_generation()?;
        let successor = self.core.borrow().node(removed).next;
        self.core.borrow_mut().unlink(removed);
        if self.next_node == Some(removed) {
            // The cursor was resting on the removed node (after a retreat):
            // it now rests on the removed node's successor.
            self.next_node = successor;
        } else {
            self.next_position -= 1;
        }
        self.last_returned = None;
        self.resynchronize();
        Ok(())
    }

    /// Visits every remaining element with one generation check before the
    /// loop and one validation after it, instead of a per-step check.
    ///
    /// # Errors
    ///
    /// [`SequenceError::ConcurrentStructuralChange`] before or after the
    /// loop.
    pub fn for_each_remaining<F>(&mut self, mut action: F) -> Result<(), SequenceError>
    where
        F: FnMut(T),
    {
        self.check_generation()?;
        loop {
            let (current, element, next) = {
                let core = self.core.borrow();
                if core.generation != self.expected_generation {
                    break;
                }
                let Some(current) = self.next_node else {
                    break;
                };
                let node = core.node(current);
                (current, node.element.clone(), node.next)
            };
            self.last_returned = Some(current);
            self.next_node = next;
            self.next_position += 1;
            action(element);
        }
        self.check_generation()
    }
}

impl<T: Clone> Iterator for ChainCursor<T> {
    type Item = Result<T, SequenceError>;

    /// Yields `Ok` elements until the end; a detected structural change is
    /// yielded as `Err` rather than swallowed.
    fn next(&mut self) -> Option<Self::Item> {
        match self.advance() {
            Ok(element) => Some(Ok(element)),
            Err(SequenceError::NoSuchElement) => None,
            Err(error) => Some(Err(error)),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    // =========================================================================
    // End Operation Tests
    // =========================================================================

    #[rstest]
    fn test_new_creates_empty() {
        let chain: ChainSequence<i32> = ChainSequence::new();
        assert!(chain.is_empty());
        assert_eq!(chain.len(), 0);
    }

    #[rstest]
    fn test_push_front_and_back_interleaved() {
        let mut chain = ChainSequence::new();
        chain.push_back(2);
        chain.push_front(1);
        chain.push_back(3);
        assert_eq!(chain.to_vec().unwrap(), vec![1, 2, 3]);
    }

    #[rstest]
    fn test_pop_front_and_back() {
        let mut chain: ChainSequence<i32> = (1..=3).collect();
        assert_eq!(chain.pop_front().unwrap(), 1);
        assert_eq!(chain.pop_back().unwrap(), 3);
        assert_eq!(chain.to_vec().unwrap(), vec![2]);
    }

    #[rstest]
    fn test_pop_empty_fails() {
        let mut chain: ChainSequence<i32> = ChainSequence::new();
        assert_eq!(chain.pop_front(), Err(SequenceError::NoSuchElement));
        assert_eq!(chain.pop_back(), Err(SequenceError::NoSuchElement));
    }

    #[rstest]
    fn test_front_and_back_observers() {
        let chain: ChainSequence<i32> = (1..=3).collect();
        assert_eq!(chain.front().unwrap(), 1);
        assert_eq!(chain.back().unwrap(), 3);
        let empty: ChainSequence<i32> = ChainSequence::new();
        assert_eq!(empty.front(), Err(SequenceError::NoSuchElement));
        assert_eq!(empty.peek_front(), None);
    }

    #[rstest]
    fn test_stack_aliases() {
        let mut stack = ChainSequence::new();
        stack.push(1);
        stack.push(2);
        stack.push(3);
        assert_eq!(stack.pop().unwrap(), 3);
        assert_eq!(stack.pop().unwrap(), 2);
        assert_eq!(stack.pop().unwrap(), 1);
        assert_eq!(stack.pop(), Err(SequenceError::NoSuchElement));
    }

    #[rstest]
    fn test_queue_aliases() {
        let mut queue = ChainSequence::new();
        assert!(queue.offer(1));
        assert!(queue.offer(2));
        assert_eq!(queue.poll(), Some(1));
        assert_eq!(queue.poll(), Some(2));
        assert_eq!(queue.poll(), None);
    }

    // =========================================================================
    // Indexed Operation Tests
    // =========================================================================

    #[rstest]
    fn test_get_from_both_halves() {
        let chain: ChainSequence<i32> = (0..10).collect();
        for index in 0..10 {
            assert_eq!(chain.get(index).unwrap(), i32::try_from(index).unwrap());
        }
    }

    #[rstest]
    fn test_set_replaces_and_keeps_generation() {
        let mut chain: ChainSequence<i32> = (1..=3).collect();
        let before = chain.generation();
        assert_eq!(chain.set(1, 9).unwrap(), 2);
        assert_eq!(chain.to_vec().unwrap(), vec![1, 9, 3]);
        assert_eq!(chain.generation(), before);
    }

    #[rstest]
    fn test_insert_interior_and_ends() {
        let mut chain: ChainSequence<i32> = vec![1, 3].into_iter().collect();
        chain.insert(1, 2).unwrap();
        chain.insert(0, 0).unwrap();
        chain.insert(4, 4).unwrap();
        assert_eq!(chain.to_vec().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[rstest]
    fn test_remove_at_head_interior_tail() {
        let mut chain: ChainSequence<i32> = (1..=5).collect();
        assert_eq!(chain.remove_at(0).unwrap(), 1);
        assert_eq!(chain.remove_at(3).unwrap(), 5);
        assert_eq!(chain.remove_at(1).unwrap(), 3);
        assert_eq!(chain.to_vec().unwrap(), vec![2, 4]);
    }

    #[rstest]
    fn test_boundary_indices_fail() {
        let mut chain: ChainSequence<i32> = (1..=3).collect();
        assert!(matches!(
            chain.get(3),
            Err(SequenceError::IndexOutOfRange { index: 3, length: 3 })
        ));
        assert!(matches!(
            chain.remove_at(3),
            Err(SequenceError::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            chain.insert(4, 0),
            Err(SequenceError::IndexOutOfRange { .. })
        ));
    }

    #[rstest]
    fn test_remove_value_first_and_last() {
        let mut chain: ChainSequence<i32> = vec![1, 2, 1, 2].into_iter().collect();
        assert!(chain.remove_value(&2).unwrap());
        assert_eq!(chain.to_vec().unwrap(), vec![1, 1, 2]);
        assert!(chain.remove_last_value(&1));
        assert_eq!(chain.to_vec().unwrap(), vec![1, 2]);
        assert!(!chain.remove_last_value(&9));
    }

    #[rstest]
    fn test_index_of_and_last_index_of() {
        let chain: ChainSequence<i32> = vec![1, 2, 1, 3].into_iter().collect();
        assert_eq!(chain.index_of(&1).unwrap(), Some(0));
        assert_eq!(chain.last_index_of(&1).unwrap(), Some(2));
        assert_eq!(chain.index_of(&9).unwrap(), None);
    }

    #[rstest]
    fn test_clear_resets_slab() {
        let mut chain: ChainSequence<i32> = (1..=3).collect();
        chain.clear().unwrap();
        assert_eq!(chain.len(), 0);
        chain.clear().unwrap();
        assert_eq!(chain.len(), 0);
        chain.push_back(1);
        assert_eq!(chain.to_vec().unwrap(), vec![1]);
    }

    // =========================================================================
    // Slab Reuse Tests
    // =========================================================================

    #[rstest]
    fn test_released_slots_are_reused() {
        let mut chain: ChainSequence<i32> = (1..=3).collect();
        chain.remove_at(1).unwrap();
        chain.push_back(4);
        assert_eq!(chain.core.borrow().slots.len(), 3);
        assert_eq!(chain.to_vec().unwrap(), vec![1, 3, 4]);
    }

    // =========================================================================
    // Cursor Tests
    // =========================================================================

    #[rstest]
    fn test_cursor_walks_both_directions() {
        let chain: ChainSequence<i32> = (1..=3).collect();
        let mut cursor = chain.cursor();
        assert_eq!(cursor.advance().unwrap(), 1);
        assert_eq!(cursor.advance().unwrap(), 2);
        assert_eq!(cursor.retreat().unwrap(), 2);
        assert_eq!(cursor.retreat().unwrap(), 1);
        assert_eq!(cursor.retreat(), Err(SequenceError::NoSuchElement));
    }

    #[rstest]
    fn test_cursor_at_positions_by_bisection() {
        let chain: ChainSequence<i32> = (0..10).collect();
        let mut cursor = chain.cursor_at(7).unwrap();
        assert_eq!(cursor.advance().unwrap(), 7);
        let mut end_cursor = chain.cursor_at(10).unwrap();
        assert_eq!(end_cursor.retreat().unwrap(), 9);
    }

    #[rstest]
    fn test_cursor_remove_after_advance() {
        let chain: ChainSequence<i32> = (1..=3).collect();
        let mut cursor = chain.cursor();
        cursor.advance().unwrap();
        cursor.remove().unwrap();
        assert_eq!(chain.to_vec().unwrap(), vec![2, 3]);
        assert_eq!(cursor.advance().unwrap(), 2);
        assert_eq!(cursor.next_index(), 1);
    }

    #[rstest]
    fn test_cursor_remove_after_retreat() {
        let chain: ChainSequence<i32> = (1..=3).collect();
        let mut cursor = chain.cursor_at(2).unwrap();
        cursor.retreat().unwrap();
        cursor.remove().unwrap();
        assert_eq!(chain.to_vec().unwrap(), vec![1, 3]);
        assert_eq!(cursor.advance().unwrap(), 3);
    }

    #[rstest]
    fn test_cursor_insert_keeps_order() {
        let chain: ChainSequence<i32> = vec![1, 3].into_iter().collect();
        let mut cursor = chain.cursor();
        cursor.advance().unwrap();
        cursor.insert(2).unwrap();
        assert_eq!(chain.to_vec().unwrap(), vec![1, 2, 3]);
        assert_eq!(cursor.advance().unwrap(), 3);
    }

    #[rstest]
    fn test_foreign_mutation_fails_cursor() {
        let mut chain: ChainSequence<i32> = (1..=3).collect();
        let mut cursor = chain.cursor();
        chain.push_back(4);
        assert!(matches!(
            cursor.advance(),
            Err(SequenceError::ConcurrentStructuralChange { .. })
        ));
    }

    #[rstest]
    fn test_cursor_set_without_move_fails() {
        let chain: ChainSequence<i32> = (1..=3).collect();
        let mut cursor = chain.cursor();
        assert_eq!(cursor.set(9), Err(SequenceError::IllegalIteratorState));
    }

    #[rstest]
    fn test_for_each_remaining_visits_everything() {
        let chain: ChainSequence<i32> = (1..=4).collect();
        let mut cursor = chain.cursor();
        cursor.advance().unwrap();
        let mut visited = Vec::new();
        cursor.for_each_remaining(|element| visited.push(element)).unwrap();
        assert_eq!(visited, vec![2, 3, 4]);
        assert!(!cursor.has_next());
    }

    // =========================================================================
    // Standard Trait Tests
    // =========================================================================

    #[rstest]
    fn test_display() {
        let chain: ChainSequence<i32> = (1..=3).collect();
        assert_eq!(format!("{chain}"), "[1, 2, 3]");
    }

    #[rstest]
    fn test_eq() {
        let first: ChainSequence<i32> = (1..=3).collect();
        let second: ChainSequence<i32> = (1..=3).collect();
        let third: ChainSequence<i32> = (2..=4).collect();
        assert_eq!(first, second);
        assert_ne!(first, third);
    }

    #[rstest]
    fn test_duplicate_is_independent() {
        let mut original: ChainSequence<i32> = (1..=3).collect();
        let mut copy = original.duplicate();
        copy.push_back(4);
        original.pop_front().unwrap();
        assert_eq!(original.to_vec().unwrap(), vec![2, 3]);
        assert_eq!(copy.to_vec().unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(copy.generation(), 1);
    }

    #[rstest]
    fn test_into_iterator_round_trip() {
        let chain: ChainSequence<i32> = (1..=3).collect();
        let collected: Vec<i32> = chain.into_iter().collect();
        assert_eq!(collected, vec![1, 2, 3]);
    }
}
