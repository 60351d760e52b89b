//! Sequence containers with fail-fast cursors and aliasing views.
//!
//! This module provides two interchangeable implementations of an ordered,
//! duplicate-permitting sequence:
//!
//! - [`ArraySequence`]: growable contiguous storage with amortized O(1)
//!   append and O(1) random access
//! - [`ChainSequence`]: a doubly linked chain of slab-allocated nodes with
//!   O(1) operations at both ends, usable as a stack, queue, or deque
//!
//! Both implement the [`Sequence`] capability trait, and both share three
//! cross-cutting protocols:
//!
//! - **Fail-fast detection.** Every structural change bumps a per-container
//!   mutation generation. Cursors and views capture the generation when they
//!   are created and re-check it lazily on every step; a mismatch fails with
//!   [`SequenceError::ConcurrentStructuralChange`]. Detection is a
//!   diagnostic, not a guarantee: it makes interleaved mutation
//!   safe-to-detect, never safe-to-continue.
//! - **Derived views.** [`RangeView`] aliases a contiguous window of an
//!   [`ArraySequence`] without owning it, forwarding every structural edit
//!   to the root container and keeping nested views consistent.
//! - **Split cursors.** [`ArraySplitCursor`] and [`ChainSplitCursor`] divide
//!   their remaining range in two for batched consumption, partitioning the
//!   original range exactly.
//!
//! # Examples
//!
//! ## `ArraySequence`
//!
//! ```rust
//! use seqlist::sequence::{ArraySequence, Sequence};
//!
//! let mut sequence = ArraySequence::new();
//! sequence.append(1)?;
//! sequence.append(2)?;
//! sequence.append(3)?;
//! sequence.insert(1, 9)?;
//!
//! assert_eq!(sequence.to_vec()?, vec![1, 9, 2, 3]);
//! assert_eq!(sequence.remove_at(0)?, 1);
//! assert_eq!(sequence.to_vec()?, vec![9, 2, 3]);
//! # Ok::<(), seqlist::SequenceError>(())
//! ```
//!
//! ## `ChainSequence` as a stack
//!
//! ```rust
//! use seqlist::sequence::ChainSequence;
//!
//! let mut stack = ChainSequence::new();
//! stack.push(1);
//! stack.push(2);
//! stack.push(3);
//!
//! assert_eq!(stack.pop()?, 3);
//! assert_eq!(stack.pop()?, 2);
//! assert_eq!(stack.pop()?, 1);
//! assert!(stack.pop().is_err());
//! # Ok::<(), seqlist::SequenceError>(())
//! ```
//!
//! ## Fail-fast cursors
//!
//! ```rust
//! use seqlist::sequence::{ArraySequence, Sequence};
//! use seqlist::SequenceError;
//!
//! let mut sequence: ArraySequence<i32> = (1..=3).collect();
//! let mut cursor = sequence.cursor();
//! assert_eq!(cursor.advance()?, 1);
//!
//! // A structural change not performed through the cursor invalidates it.
//! sequence.append(4)?;
//! assert!(matches!(
//!     cursor.advance(),
//!     Err(SequenceError::ConcurrentStructuralChange { .. })
//! ));
//! # Ok::<(), seqlist::SequenceError>(())
//! ```

use crate::error::SequenceError;

// =============================================================================
// Shared Handle Type Aliases
// =============================================================================

/// Shared, interiorly mutable handle to a container core.
///
/// Containers, cursors, and views each hold one of these; the core they point
/// at is the single owner of the element storage. `Rc` rather than `Arc`
/// encodes the single-threaded contract in the type system: no handle can
/// cross a thread boundary.
pub(crate) type SharedCell<T> = std::rc::Rc<std::cell::RefCell<T>>;

/// Shared immutable slice, used for detached split-cursor snapshots.
pub(crate) type SharedSlice<T> = std::rc::Rc<[T]>;

// =============================================================================
// Sequence Trait
// =============================================================================

/// Capability trait implemented independently by every sequence container.
///
/// [`ArraySequence`], [`ChainSequence`], and [`RangeView`] each implement
/// this trait directly; there is no shared base type. Operations that a view
/// must validate against its root are fallible for every implementor, so the
/// trait surface is uniform.
///
/// Elements are passed and returned by value (`T: Clone`): accessors hand out
/// owned clones, which keeps callers free to mutate the container while
/// holding previously read elements.
pub trait Sequence<T: Clone> {
    /// Returns the number of elements in the sequence.
    fn len(&self) -> usize;

    /// Returns `true` if the sequence contains no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the current mutation generation observed through this
    /// container.
    ///
    /// The generation increases by exactly one for every structural change
    /// (any mutation altering element count or ordering). In-place `set` and
    /// pure capacity changes are not structural.
    fn generation(&self) -> u64;

    /// Returns a clone of the element at `index`.
    ///
    /// # Errors
    ///
    /// [`SequenceError::IndexOutOfRange`] if `index >= len()`;
    /// [`SequenceError::ConcurrentStructuralChange`] on a stale view.
    fn get(&self, index: usize) -> Result<T, SequenceError>;

    /// Replaces the element at `index`, returning the previous element.
    ///
    /// This is an in-place edit, not a structural change: it does not bump
    /// the mutation generation.
    ///
    /// # Errors
    ///
    /// [`SequenceError::IndexOutOfRange`] if `index >= len()`;
    /// [`SequenceError::ConcurrentStructuralChange`] on a stale view.
    fn set(&mut self, index: usize, element: T) -> Result<T, SequenceError>;

    /// Appends an element at the end of the sequence.
    ///
    /// # Errors
    ///
    /// [`SequenceError::CapacityExceeded`] if the array-backed store cannot
    /// grow any further; [`SequenceError::ConcurrentStructuralChange`] on a
    /// stale view.
    fn append(&mut self, element: T) -> Result<(), SequenceError>;

    /// Inserts an element before position `index`, shifting the tail segment.
    ///
    /// `index == len()` appends.
    ///
    /// # Errors
    ///
    /// [`SequenceError::IndexOutOfRange`] if `index > len()`; capacity and
    /// staleness failures as for [`append`](Sequence::append).
    fn insert(&mut self, index: usize, element: T) -> Result<(), SequenceError>;

    /// Removes and returns the element at `index`, shifting the tail segment.
    ///
    /// # Errors
    ///
    /// [`SequenceError::IndexOutOfRange`] if `index >= len()`;
    /// [`SequenceError::ConcurrentStructuralChange`] on a stale view.
    fn remove_at(&mut self, index: usize) -> Result<T, SequenceError>;

    /// Removes the first element equal to `element`, if any.
    ///
    /// Returns `true` if an element was removed.
    ///
    /// # Errors
    ///
    /// [`SequenceError::ConcurrentStructuralChange`] on a stale view.
    fn remove_value(&mut self, element: &T) -> Result<bool, SequenceError>
    where
        T: PartialEq,
    {
        match self.index_of(element)? {
            Some(index) => {
                self.remove_at(index)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Returns the index of the first element equal to `element`.
    ///
    /// # Errors
    ///
    /// [`SequenceError::ConcurrentStructuralChange`] on a stale view.
    fn index_of(&self, element: &T) -> Result<Option<usize>, SequenceError>
    where
        T: PartialEq;

    /// Returns the index of the last element equal to `element`.
    ///
    /// # Errors
    ///
    /// [`SequenceError::ConcurrentStructuralChange`] on a stale view.
    fn last_index_of(&self, element: &T) -> Result<Option<usize>, SequenceError>
    where
        T: PartialEq;

    /// Returns `true` if the sequence contains an element equal to `element`.
    ///
    /// # Errors
    ///
    /// [`SequenceError::ConcurrentStructuralChange`] on a stale view.
    fn contains(&self, element: &T) -> Result<bool, SequenceError>
    where
        T: PartialEq,
    {
        Ok(self.index_of(element)?.is_some())
    }

    /// Removes every element. Idempotent.
    ///
    /// # Errors
    ///
    /// [`SequenceError::ConcurrentStructuralChange`] on a stale view.
    fn clear(&mut self) -> Result<(), SequenceError>;

    /// Returns an owned copy of all elements in logical order.
    ///
    /// # Errors
    ///
    /// [`SequenceError::ConcurrentStructuralChange`] on a stale view.
    fn to_vec(&self) -> Result<Vec<T>, SequenceError>;
}

mod array;
mod chain;
mod split;
mod view;

pub use array::ArrayCursor;
pub use array::ArraySequence;
pub use array::DEFAULT_CAPACITY;
pub use array::MAXIMUM_CAPACITY;
pub use chain::ChainCursor;
pub use chain::ChainSequence;
pub use split::ArraySplitCursor;
pub use split::BATCH_UNIT;
pub use split::ChainSplitCursor;
pub use split::MAXIMUM_BATCH;
pub use split::SnapshotSplitCursor;
pub use split::SplitCursor;
pub use view::RangeView;
pub use view::RangeViewCursor;

// =============================================================================
// Tests
// =============================================================================
