//! Aliasing range views over array-backed storage.
//!
//! A [`RangeView`] is a container-shaped window onto a contiguous slice of an
//! [`ArraySequence`](super::ArraySequence). It owns no elements: every
//! operation validates its generation snapshot against the root container,
//! translates local indices by its accumulated offset, and forwards
//! structural edits to the root. Views nest (a view of a view composes
//! offsets additively), and an edit through a child updates the cached
//! length and generation snapshot of every ancestor view, so the whole
//! lineage stays valid while unrelated cursors and views fail fast.
//!
//! # Examples
//!
//! ```rust
//! use seqlist::sequence::{ArraySequence, Sequence};
//!
//! let sequence: ArraySequence<i32> = (0..5).collect();
//! let mut view = sequence.sub_range(1, 4)?;
//!
//! assert_eq!(view.to_vec()?, vec![1, 2, 3]);
//! assert_eq!(view.remove_at(0)?, 1);
//! assert_eq!(view.len(), 2);
//! assert_eq!(sequence.len(), 4);
//! assert_eq!(sequence.get(1)?, 2);
//! # Ok::<(), seqlist::SequenceError>(())
//! ```

use std::fmt;

use super::array::ArrayCore;
use super::{ArraySequence, SharedCell, Sequence};
use crate::error::SequenceError;

// =============================================================================
// View State
// =============================================================================

/// Per-view bookkeeping: the window coordinates, the generation snapshot,
/// and the parent chain used to propagate edits upward.
pub(crate) struct ViewState {
    /// Absolute start of the window in root coordinates. Fixed at creation:
    /// any edit that could move it invalidates the view first.
    pub(crate) offset: usize,
    /// Cached window length; updated on every edit through this view or a
    /// descendant of it.
    pub(crate) length: usize,
    /// Root generation this view last observed.
    pub(crate) expected_generation: u64,
    /// The parent view's state, `None` when the parent is the root.
    parent: Option<SharedCell<ViewState>>,
}

// =============================================================================
// RangeView Definition
// =============================================================================

/// A lightweight second container aliasing a window of an
/// [`ArraySequence`].
///
/// The view is a coordinate transform plus a forwarding layer: element
/// storage stays with the root container, and a structural edit through the
/// view is a structural edit of the root. A view whose snapshot no longer
/// matches the root generation fails every operation with
/// [`SequenceError::ConcurrentStructuralChange`] until dropped.
///
/// `len`, `is_empty`, and `generation` are cheap cached observers and do
/// not validate.
pub struct RangeView<T> {
    core: SharedCell<ArrayCore<T>>,
    state: SharedCell<ViewState>,
}

impl<T: Clone> RangeView<T> {
    pub(crate) fn over_root(
        sequence: &ArraySequence<T>,
        start: usize,
        end: usize,
    ) -> Result<Self, SequenceError> {
        if start > end {
            return Err(SequenceError::InvalidRange { start, end });
        }
        let core = sequence.share_core();
        let (length, generation) = {
            let borrowed = core.borrow();
            (borrowed.elements.len(), borrowed.generation)
        };
        if end > length {
            return Err(SequenceError::IndexOutOfRange { index: end, length });
        }
        Ok(Self {
            core,
            state: SharedCell::new(std::cell::RefCell::new(ViewState {
                offset: start,
                length: end - start,
                expected_generation: generation,
                parent: None,
            })),
        })
    }

    /// Returns a nested view aliasing `[start, end)` of this view.
    ///
    /// Offsets compose additively; edits through the nested view remain
    /// visible to validation on this view and on the root.
    ///
    /// # Errors
    ///
    /// [`SequenceError::InvalidRange`] if `start > end`;
    /// [`SequenceError::IndexOutOfRange`] if `end > len()`;
    /// [`SequenceError::ConcurrentStructuralChange`] if this view is stale.
    pub fn sub_range(&self, start: usize, end: usize) -> Result<Self, SequenceError> {
        if start > end {
            return Err(SequenceError::InvalidRange { start, end });
        }
        self.validate()?;
        let state = self.state.borrow();
        if end > state.length {
            return Err(SequenceError::IndexOutOfRange {
                index: end,
                length: state.length,
            });
        }
        Ok(Self {
            core: SharedCell::clone(&self.core),
            state: SharedCell::new(std::cell::RefCell::new(ViewState {
                offset: state.offset + start,
                length: end - start,
                expected_generation: state.expected_generation,
                parent: Some(SharedCell::clone(&self.state)),
            })),
        })
    }

    pub(crate) fn alias(&self) -> Self {
        Self {
            core: SharedCell::clone(&self.core),
            state: SharedCell::clone(&self.state),
        }
    }

    fn validate(&self) -> Result<(), SequenceError> {
        let observed = self.core.borrow().generation;
        let expected = self.state.borrow().expected_generation;
        if observed == expected {
            Ok(())
        } else {
            Err(SequenceError::ConcurrentStructuralChange { expected, observed })
        }
    }

    /// Applies a length delta and the root's current generation to this
    /// view's state and every ancestor state.
    fn synchronize(&self, delta: isize) {
        let generation = self.core.borrow().generation;
        let mut state = Some(SharedCell::clone(&self.state));
        while let Some(cell) = state {
            let mut current = cell.borrow_mut();
            current.length = current.length.checked_add_signed(delta).unwrap_or(0);
            current.expected_generation = generation;
            state = current.parent.clone();
        }
    }

    fn window(&self) -> (usize, usize) {
        let state = self.state.borrow();
        (state.offset, state.length)
    }

    /// Appends every element of `incoming`, in order, at the end of the
    /// window, with one splice and one generation bump.
    ///
    /// Returns `true` if the sequence changed.
    ///
    /// # Errors
    ///
    /// [`SequenceError::ConcurrentStructuralChange`] if this view is stale;
    /// capacity failures as for the root container.
    pub fn append_all<I>(&mut self, incoming: I) -> Result<bool, SequenceError>
    where
        I: IntoIterator<Item = T>,
    {
        self.validate()?;
        let (offset, length) = self.window();
        let incoming: Vec<T> = incoming.into_iter().collect();
        let count = incoming.len();
        let changed = self.core.borrow_mut().insert_all(offset + length, incoming)?;
        if changed {
            self.synchronize(isize::try_from(count).unwrap_or(isize::MAX));
        }
        Ok(changed)
    }

    /// Returns a cursor over the window, positioned before its first
    /// element.
    #[must_use]
    pub fn cursor(&self) -> RangeViewCursor<T> {
        RangeViewCursor::new(self.alias(), 0)
    }

    /// Returns a cursor over the window, positioned before `index`.
    ///
    /// # Errors
    ///
    /// [`SequenceError::IndexOutOfRange`] if `index > len()`.
    pub fn cursor_at(&self, index: usize) -> Result<RangeViewCursor<T>, SequenceError> {
        let length = self.state.borrow().length;
        if index > length {
            return Err(SequenceError::IndexOutOfRange { index, length });
        }
        Ok(RangeViewCursor::new(self.alias(), index))
    }

    /// Returns a split cursor over the window.
    #[must_use]
    pub fn split_cursor(&self) -> super::ArraySplitCursor<T> {
        super::ArraySplitCursor::over_view(
            SharedCell::clone(&self.core),
            SharedCell::clone(&self.state),
        )
    }
}

// =============================================================================
// Sequence Implementation
// =============================================================================

impl<T: Clone> Sequence<T> for RangeView<T> {
    fn len(&self) -> usize {
        self.state.borrow().length
    }

    fn generation(&self) -> u64 {
        self.core.borrow().generation
    }

    fn get(&self, index: usize) -> Result<T, SequenceError> {
        self.validate()?;
        let (offset, length) = self.window();
        if index >= length {
            return Err(SequenceError::IndexOutOfRange { index, length });
        }
        Ok(self.core.borrow().elements[offset + index].clone())
    }

    fn set(&mut self, index: usize, element: T) -> Result<T, SequenceError> {
        self.validate()?;
        let (offset, length) = self.window();
        if index >= length {
            return Err(SequenceError::IndexOutOfRange { index, length });
        }
        let mut core = self.core.borrow_mut();
        Ok(std::mem::replace(
            &mut core.elements[offset + index],
            element,
        ))
    }

    fn append(&mut self, element: T) -> Result<(), SequenceError> {
        let length = self.state.borrow().length;
        self.insert(length, element)
    }

    fn insert(&mut self, index: usize, element: T) -> Result<(), SequenceError> {
        let (offset, length) = self.window();
        if index > length {
            return Err(SequenceError::IndexOutOfRange { index, length });
        }
        self.validate()?;
        self.core.borrow_mut().insert(offset + index, element)?;
        self.synchronize(1);
        Ok(())
    }

    fn remove_at(&mut self, index: usize) -> Result<T, SequenceError> {
        let (offset, length) = self.window();
        if index >= length {
            return Err(SequenceError::IndexOutOfRange { index, length });
        }
        self.validate()?;
        let element = self.core.borrow_mut().remove_at(offset + index)?;
        self.synchronize(-1);
        Ok(element)
    }

    fn index_of(&self, element: &T) -> Result<Option<usize>, SequenceError>
    where
        T: PartialEq,
    {
        self.validate()?;
        let (offset, length) = self.window();
        let core = self.core.borrow();
        Ok(core.elements[offset..offset + length]
            .iter()
            .position(|candidate| candidate == element))
    }

    fn last_index_of(&self, element: &T) -> Result<Option<usize>, SequenceError>
    where
        T: PartialEq,
    {
        self.validate()?;
        let (offset, length) = self.window();
        let core = self.core.borrow();
        Ok(core.elements[offset..offset + length]
            .iter()
            .rposition(|candidate| candidate == element))
    }

    /// Removes the entire backing window from the root with one bulk shift.
    fn clear(&mut self) -> Result<(), SequenceError> {
        self.validate()?;
        let (offset, length) = self.window();
        self.core.borrow_mut().remove_range(offset, offset + length);
        self.synchronize(-(isize::try_from(length).unwrap_or(isize::MAX)));
        Ok(())
    }

    fn to_vec(&self) -> Result<Vec<T>, SequenceError> {
        self.validate()?;
        let (offset, length) = self.window();
        Ok(self.core.borrow().elements[offset..offset + length].to_vec())
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for RangeView<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.validate().is_err() {
            return formatter.write_str("RangeView(<stale>)");
        }
        let (offset, length) = self.window();
        let core = self.core.borrow();
        formatter
            .debug_list()
            .entries(core.elements[offset..offset + length].iter())
            .finish()
    }
}

// =============================================================================
// RangeViewCursor
// =============================================================================

/// Bidirectional fail-fast cursor over a [`RangeView`].
///
/// Every edit goes through the view, so the view and its ancestors stay
/// valid across the cursor's own edits; any other mutation of the root fails
/// the cursor's next step.
pub struct RangeViewCursor<T> {
    view: RangeView<T>,
    position: usize,
    last_returned: Option<usize>,
    expected_generation: u64,
}

impl<T: Clone> RangeViewCursor<T> {
    fn new(view: RangeView<T>, position: usize) -> Self {
        let expected_generation = view.core.borrow().generation;
        Self {
            view,
            position,
            last_returned: None,
            expected_generation,
        }
    }

    fn check_generation(&self) -> Result<(), SequenceError> {
        let observed = self.view.core.borrow().generation;
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
        self.expected_generation = self.view.core.borrow().generation;
    }

    /// Returns `true` if an [`advance`](RangeViewCursor::advance) would
    /// return an element.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.position < self.view.len()
    }

    /// Returns `true` if a [`retreat`](RangeViewCursor::retreat) would
    /// return an element.
    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.position > 0
    }

    /// Returns the view-local index of the element the next
    /// [`advance`](RangeViewCursor::advance) would return.
    #[must_use]
    pub const fn next_index(&self) -> usize {
        self.position
    }

    /// Returns the view-local index of the element the next
    /// [`retreat`](RangeViewCursor::retreat) would return, or `None` at the
    /// front of the window.
    #[must_use]
    pub const fn previous_index(&self) -> Option<usize> {
        self.position.checked_sub(1)
    }

    /// Returns the next element of the window and steps forward over it.
    ///
    /// # Errors
    ///
    /// [`SequenceError::ConcurrentStructuralChange`] on staleness;
    /// [`SequenceError::NoSuchElement`] at the end of the window.
    pub fn advance(&mut self) -> Result<T, SequenceError> {
        self.check_generation()?;
        if self.position >= self.view.len() {
            return Err(SequenceError::NoSuchElement);
        }
        let element = self.view.get(self.position)?;
        self.last_returned = Some(self.position);
        self.position += 1;
        Ok(element)
    }

    /// Returns the previous element of the window and steps backward over
    /// it.
    ///
    /// # Errors
    ///
    /// [`SequenceError::ConcurrentStructuralChange`] on staleness;
    /// [`SequenceError::NoSuchElement`] at the front of the window.
    pub fn retreat(&mut self) -> Result<T, SequenceError> {
        self.check_generation()?;
        let Some(previous) = self.position.checked_sub(1) else {
            return Err(SequenceError::NoSuchElement);
        };
        let element = self.view.get(previous)?;
        self.position = previous;
        self.last_returned = Some(previous);
        Ok(element)
    }

    /// Replaces the last element returned by a positional move.
    ///
    /// # Errors
    ///
    /// [`SequenceError::IllegalIteratorState`] without a preceding
    /// successful positional move; staleness as for
    /// [`advance`](RangeViewCursor::advance).
    pub fn set(&mut self, element: T) -> Result<(), SequenceError> {
        let index = self
            .last_returned
            .ok_or(SequenceError::IllegalIteratorState)?;
        self.check_generation()?;
        self.view.set(index, element)?;
        Ok(())
    }

    /// Inserts an element at the cursor position within the window.
    ///
    /// The view and its ancestors stay valid; the cursor steps over the
    /// inserted element.
    ///
    /// # Errors
    ///
    /// Staleness and capacity failures as for the view's
    /// [`insert`](Sequence::insert).
    pub fn insert(&mut self, element: T) -> Result<(), SequenceError> {
        self.check_generation()?;
        self.view.insert(self.position, element)?;
        self.position += 1;
        self.last_returned = None;
        self.resynchronize();
        Ok(())
    }

    /// Removes the last element returned by a positional move. The cursor,
    /// the view, and the view's ancestors all remain valid.
    ///
    /// # Errors
    ///
    /// [`SequenceError::IllegalIteratorState`] without a preceding
    /// successful positional move; staleness as for
    /// [`advance`](RangeViewCursor::advance).
    pub fn remove(&mut self) -> Result<(), SequenceError> {
        let index = self
            .last_returned
            .ok_or(SequenceError::IllegalIteratorState)?;
        self.check_generation()?;
        self.view.remove_at(index)?;
        self.position = index;
        self.last_returned = None;
        self.resynchronize();
        Ok(())
    }
}

impl<T: Clone> Iterator for RangeViewCursor<T> {
    type Item = Result<T, SequenceError>;

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
