//! Array-backed sequence with explicit capacity management.
//!
//! This module provides [`ArraySequence`], a growable contiguous sequence
//! with amortized O(1) append, O(1) random access, and single-bulk-move
//! insertion and removal, together with its bidirectional fail-fast cursor
//! [`ArrayCursor`].
//!
//! # Growth policy
//!
//! The logical length is always at most the physical capacity. When an
//! append or insertion needs room, capacity grows to `old + old / 2`, at
//! least the required minimum, and at least [`DEFAULT_CAPACITY`] when
//! growing from empty. Capacity is capped at [`MAXIMUM_CAPACITY`]; an
//! operation that would need more fails with
//! [`SequenceError::CapacityExceeded`] rather than growing silently.
//! Capacity never shrinks implicitly; [`ArraySequence::trim_to_capacity`]
//! is the explicit trim.
//!
//! Pure capacity changes are not structural: they bump no generation and
//! never invalidate outstanding cursors or views.
//!
//! # Examples
//!
//! ```rust
//! use seqlist::sequence::{ArraySequence, Sequence};
//!
//! let mut sequence = ArraySequence::new();
//! sequence.append(1)?;
//! sequence.append(2)?;
//! sequence.append(3)?;
//!
//! assert_eq!(sequence.len(), 3);
//! assert_eq!(sequence.get(1)?, 2);
//! # Ok::<(), seqlist::SequenceError>(())
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::iter::FromIterator;

use static_assertions::const_assert;

use super::{SharedCell, Sequence};
use crate::error::SequenceError;

// =============================================================================
// Constants
// =============================================================================

/// Capacity installed by the first growth of an empty container.
pub const DEFAULT_CAPACITY: usize = 10;

/// Largest capacity the backing store will ever reserve.
pub const MAXIMUM_CAPACITY: usize = usize::MAX - 8;

const_assert!(DEFAULT_CAPACITY > 0);
const_assert!(DEFAULT_CAPACITY < MAXIMUM_CAPACITY);

/// Computes the capacity a growth step installs.
///
/// The result is `old + old / 2`, raised to `required` when the padded
/// growth is not enough, raised to [`DEFAULT_CAPACITY`] when growing from
/// empty, and capped at [`MAXIMUM_CAPACITY`].
fn grown_capacity(
    old_capacity: usize,
    required_capacity: usize,
) -> Result<usize, SequenceError> {
    if required_capacity > MAXIMUM_CAPACITY {
        return Err(SequenceError::CapacityExceeded {
            required: required_capacity,
        });
    }
    let mut grown = old_capacity.saturating_add(old_capacity >> 1);
    if grown < required_capacity {
        grown = required_capacity;
    }
    if old_capacity == 0 && grown < DEFAULT_CAPACITY {
        grown = DEFAULT_CAPACITY;
    }
    Ok(grown.min(MAXIMUM_CAPACITY))
}

// =============================================================================
// Core Definition
// =============================================================================

/// Exclusive owner of the contiguous storage and the mutation generation.
///
/// Every structural primitive lives here and is the single point that bumps
/// the generation; the public container, its cursors, its views, and its
/// split cursors all hold a [`SharedCell`] of this core.
pub(crate) struct ArrayCore<T> {
    /// Live elements occupy `[0, elements.len())`; spare capacity is
    /// unspecified.
    pub(crate) elements: Vec<T>,
    /// Bumped exactly once per structural change.
    pub(crate) generation: u64,
}

impl<T> ArrayCore<T> {
    pub(crate) const fn new() -> Self {
        Self {
            elements: Vec::new(),
            generation: 0,
        }
    }

    /// Reserves room for at least `required` elements without bumping the
    /// generation: capacity is not structure.
    pub(crate) fn ensure_capacity(&mut self, required: usize) -> Result<(), SequenceError> {
        let capacity = self.elements.capacity();
        if required <= capacity {
            return Ok(());
        }
        let grown = grown_capacity(capacity, required)?;
        self.elements.reserve_exact(grown - self.elements.len());
        Ok(())
    }

    pub(crate) fn push(&mut self, element: T) -> Result<(), SequenceError> {
        self.ensure_capacity(self.elements.len() + 1)?;
        self.elements.push(element);
        self.generation += 1;
        Ok(())
    }

    pub(crate) fn insert(&mut self, index: usize, element: T) -> Result<(), SequenceError> {
        let length = self.elements.len();
        if index > length {
            return Err(SequenceError::IndexOutOfRange { index, length });
        }
        self.ensure_capacity(length + 1)?;
        self.elements.insert(index, element);
        self.generation += 1;
        Ok(())
    }

    pub(crate) fn remove_at(&mut self, index: usize) -> Result<T, SequenceError> {
        let length = self.elements.len();
        if index >= length {
            return Err(SequenceError::IndexOutOfRange { index, length });
        }
        let element = self.elements.remove(index);
        self.generation += 1;
        Ok(element)
    }

    /// Removes `[start, end)` with one bulk shift. Bounds must be valid.
    pub(crate) fn remove_range(&mut self, start: usize, end: usize) {
        self.elements.drain(start..end);
        self.generation += 1;
    }

    /// Inserts every element of `incoming` before `index` with one splice.
    pub(crate) fn insert_all(
        &mut self,
        index: usize,
        incoming: Vec<T>,
    ) -> Result<bool, SequenceError> {
        let length = self.elements.len();
        if index > length {
            return Err(SequenceError::IndexOutOfRange { index, length });
        }
        if incoming.is_empty() {
            return Ok(false);
        }
        let required = length
            .checked_add(incoming.len())
            .ok_or(SequenceError::CapacityExceeded { required: usize::MAX })?;
        self.ensure_capacity(required)?;
        self.elements.splice(index..index, incoming);
        self.generation += 1;
        Ok(true)
    }

    pub(crate) fn clear(&mut self) {
        self.elements.clear();
        self.generation += 1;
    }

    /// Two-pointer compaction keeping the elements `keep` approves.
    ///
    /// When `keep` fails partway, every already-approved element stays
    /// compacted at the front, the undecided tail is preserved verbatim
    /// after them, the generation advances by the number of elements
    /// dropped, and the failure is re-raised.
    pub(crate) fn compact_where<E, P>(&mut self, mut keep: P) -> Result<bool, E>
    where
        P: FnMut(&T) -> Result<bool, E>,
    {
        let length = self.elements.len();
        let mut read = 0;
        let mut write = 0;
        let mut failure = None;
        while read < length {
            match keep(&self.elements[read]) {
                Ok(true) => {
                    if write != read {
                        self.elements.swap(write, read);
                    }
                    write += 1;
                    read += 1;
                }
                Ok(false) => {
                    read += 1;
                }
                Err(error) => {
                    failure = Some(error);
                    break;
                }
            }
        }
        // [0, write) holds approved elements, [write, read) the dropped
        // ones, [read, length) whatever keep never saw.
        let dropped = read - write;
        if dropped > 0 {
            self.elements.drain(write..read);
            self.generation += dropped as u64;
        }
        match failure {
            Some(error) => Err(error),
            None => Ok(dropped > 0),
        }
    }
}

// =============================================================================
// ArraySequence Definition
// =============================================================================

/// A growable contiguous sequence with fail-fast cursors and range views.
///
/// # Time Complexity
///
/// | Operation       | Complexity        |
/// |-----------------|-------------------|
/// | `new`           | O(1)              |
/// | `get` / `set`   | O(1)              |
/// | `append`        | amortized O(1)    |
/// | `insert(i, _)`  | O(len − i)        |
/// | `remove_at(i)`  | O(len − i)        |
/// | `index_of`      | O(len)            |
/// | `clear`         | O(len)            |
///
/// # Examples
///
/// ```rust
/// use seqlist::sequence::{ArraySequence, Sequence};
///
/// let mut sequence: ArraySequence<i32> = (1..=5).collect();
/// assert_eq!(sequence.len(), 5);
/// sequence.insert(0, 0)?;
/// assert_eq!(sequence.to_vec()?, vec![0, 1, 2, 3, 4, 5]);
/// # Ok::<(), seqlist::SequenceError>(())
/// ```
pub struct ArraySequence<T> {
    core: SharedCell<ArrayCore<T>>,
}

impl<T> ArraySequence<T> {
    /// Creates a new empty sequence without reserving storage.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use seqlist::sequence::{ArraySequence, Sequence};
    ///
    /// let sequence: ArraySequence<i32> = ArraySequence::new();
    /// assert!(sequence.is_empty());
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: SharedCell::new(std::cell::RefCell::new(ArrayCore::new())),
        }
    }

    /// Creates a new empty sequence with at least `capacity` slots reserved.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_elements(Vec::with_capacity(capacity))
    }

    pub(crate) fn from_elements(elements: Vec<T>) -> Self {
        Self {
            core: SharedCell::new(std::cell::RefCell::new(ArrayCore {
                elements,
                generation: 0,
            })),
        }
    }

    pub(crate) fn share_core(&self) -> SharedCell<ArrayCore<T>> {
        SharedCell::clone(&self.core)
    }

    /// Returns the physical capacity of the backing store.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.core.borrow().elements.capacity()
    }

    /// Reserves capacity for at least `minimum_capacity` total elements.
    ///
    /// Not a structural change: outstanding cursors and views stay valid.
    ///
    /// # Errors
    ///
    /// [`SequenceError::CapacityExceeded`] if `minimum_capacity` exceeds
    /// [`MAXIMUM_CAPACITY`].
    pub fn reserve(&mut self, minimum_capacity: usize) -> Result<(), SequenceError> {
        self.core.borrow_mut().ensure_capacity(minimum_capacity)
    }

    /// Shrinks the physical capacity to the logical length.
    ///
    /// Not a structural change: outstanding cursors and views stay valid.
    pub fn trim_to_capacity(&mut self) {
        self.core.borrow_mut().elements.shrink_to_fit();
    }
}

impl<T: Clone> ArraySequence<T> {
    /// Appends every element of `incoming`, in order, with one reserve and
    /// one splice.
    ///
    /// Returns `true` if the sequence changed. Bumps the generation once
    /// when it does.
    ///
    /// # Errors
    ///
    /// [`SequenceError::CapacityExceeded`] if the grown length would exceed
    /// [`MAXIMUM_CAPACITY`].
    pub fn append_all<I>(&mut self, incoming: I) -> Result<bool, SequenceError>
    where
        I: IntoIterator<Item = T>,
    {
        let length = self.len();
        self.insert_all(length, incoming)
    }

    /// Inserts every element of `incoming` before `index`, in order, with
    /// one reserve and one splice.
    ///
    /// # Errors
    ///
    /// [`SequenceError::IndexOutOfRange`] if `index > len()`; capacity
    /// failures as for [`append_all`](ArraySequence::append_all).
    pub fn insert_all<I>(&mut self, index: usize, incoming: I) -> Result<bool, SequenceError>
    where
        I: IntoIterator<Item = T>,
    {
        let incoming: Vec<T> = incoming.into_iter().collect();
        self.core.borrow_mut().insert_all(index, incoming)
    }

    /// Removes `[start, end)` with one bulk shift and one generation bump.
    ///
    /// # Errors
    ///
    /// [`SequenceError::InvalidRange`] if `start > end`;
    /// [`SequenceError::IndexOutOfRange`] if `end > len()`.
    pub fn remove_range(&mut self, start: usize, end: usize) -> Result<(), SequenceError> {
        if start > end {
            return Err(SequenceError::InvalidRange { start, end });
        }
        let length = self.len();
        if end > length {
            return Err(SequenceError::IndexOutOfRange { index: end, length });
        }
        self.core.borrow_mut().remove_range(start, end);
        Ok(())
    }

    /// Keeps only the elements `predicate` approves, in one compaction pass.
    ///
    /// Returns `true` if the sequence changed.
    pub fn retain_where<P>(&mut self, mut predicate: P) -> bool
    where
        P: FnMut(&T) -> bool,
    {
        match self.try_retain_where(|element| {
            Ok::<bool, std::convert::Infallible>(predicate(element))
        }) {
            Ok(changed) => changed,
            Err(never) => match never {},
        }
    }

    /// Keeps only the elements `predicate` approves, with a fallible
    /// predicate.
    ///
    /// If `predicate` fails partway, the container reflects every decision
    /// made so far: approved elements stay compacted at the front and the
    /// undecided remainder sits untouched after them. The predicate's
    /// failure is then re-raised.
    ///
    /// # Errors
    ///
    /// Whatever `predicate` returned.
    pub fn try_retain_where<E, P>(&mut self, predicate: P) -> Result<bool, E>
    where
        P: FnMut(&T) -> Result<bool, E>,
    {
        self.core.borrow_mut().compact_where(predicate)
    }

    /// Removes every element equal to a member of `members`.
    ///
    /// Returns `true` if the sequence changed.
    pub fn remove_all(&mut self, members: &[T]) -> bool
    where
        T: PartialEq,
    {
        self.retain_where(|element| !members.contains(element))
    }

    /// Keeps only the elements equal to a member of `members`.
    ///
    /// Returns `true` if the sequence changed.
    pub fn retain_all(&mut self, members: &[T]) -> bool
    where
        T: PartialEq,
    {
        self.retain_where(|element| members.contains(element))
    }

    /// Creates an independent copy with fresh storage.
    ///
    /// The copy starts a generation history of its own; cursors and views
    /// of the original never observe it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use seqlist::sequence::{ArraySequence, Sequence};
    ///
    /// let mut original: ArraySequence<i32> = (1..=3).collect();
    /// let mut copy = original.duplicate();
    /// copy.append(4)?;
    /// assert_eq!(original.len(), 3);
    /// assert_eq!(copy.len(), 4);
    /// # Ok::<(), seqlist::SequenceError>(())
    /// ```
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self::from_elements(self.core.borrow().elements.clone())
    }

    /// Returns a [`RangeView`](super::RangeView) aliasing `[start, end)` of
    /// this sequence.
    ///
    /// # Errors
    ///
    /// [`SequenceError::InvalidRange`] if `start > end`;
    /// [`SequenceError::IndexOutOfRange`] if `end > len()`.
    pub fn sub_range(
        &self,
        start: usize,
        end: usize,
    ) -> Result<super::RangeView<T>, SequenceError> {
        super::RangeView::over_root(self, start, end)
    }

    /// Returns a cursor positioned before the first element.
    #[must_use]
    pub fn cursor(&self) -> ArrayCursor<T> {
        ArrayCursor::new(self.share_core(), 0)
    }

    /// Returns a cursor positioned before `index`.
    ///
    /// `index == len()` positions the cursor past the last element, where
    /// only [`ArrayCursor::retreat`] can move.
    ///
    /// # Errors
    ///
    /// [`SequenceError::IndexOutOfRange`] if `index > len()`.
    pub fn cursor_at(&self, index: usize) -> Result<ArrayCursor<T>, SequenceError> {
        let length = self.len();
        if index > length {
            return Err(SequenceError::IndexOutOfRange { index, length });
        }
        Ok(ArrayCursor::new(self.share_core(), index))
    }

    /// Returns a split cursor over the whole sequence.
    ///
    /// The cursor binds its upper bound and expected generation lazily, on
    /// first use.
    #[must_use]
    pub fn split_cursor(&self) -> super::ArraySplitCursor<T> {
        super::ArraySplitCursor::over_root(self.share_core())
    }
}

// =============================================================================
// Sequence Implementation
// =============================================================================

impl<T: Clone> Sequence<T> for ArraySequence<T> {
    fn len(&self) -> usize {
        self.core.borrow().elements.len()
    }

    fn generation(&self) -> u64 {
        self.core.borrow().generation
    }

    fn get(&self, index: usize) -> Result<T, SequenceError> {
        let core = self.core.borrow();
        core.elements
            .get(index)
            .cloned()
            .ok_or(SequenceError::IndexOutOfRange {
                index,
                length: core.elements.len(),
            })
    }

    fn set(&mut self, index: usize, element: T) -> Result<T, SequenceError> {
        let mut core = self.core.borrow_mut();
        let length = core.elements.len();
        match core.elements.get_mut(index) {
            Some(slot) => Ok(std::mem::replace(slot, element)),
            None => Err(SequenceError::IndexOutOfRange { index, length }),
        }
    }

    fn append(&mut self, element: T) -> Result<(), SequenceError> {
        self.core.borrow_mut().push(element)
    }

    fn insert(&mut self, index: usize, element: T) -> Result<(), SequenceError> {
        self.core.borrow_mut().insert(index, element)
    }

    fn remove_at(&mut self, index: usize) -> Result<T, SequenceError> {
        self.core.borrow_mut().remove_at(index)
    }

    fn index_of(&self, element: &T) -> Result<Option<usize>, SequenceError>
    where
        T: PartialEq,
    {
        Ok(self
            .core
            .borrow()
            .elements
            .iter()
            .position(|candidate| candidate == element))
    }

    fn last_index_of(&self, element: &T) -> Result<Option<usize>, SequenceError>
    where
        T: PartialEq,
    {
        Ok(self
            .core
            .borrow()
            .elements
            .iter()
            .rposition(|candidate| candidate == element))
    }

    fn clear(&mut self) -> Result<(), SequenceError> {
        self.core.borrow_mut().clear();
        Ok(())
    }

    fn to_vec(&self) -> Result<Vec<T>, SequenceError> {
        Ok(self.core.borrow().elements.clone())
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<T> Default for ArraySequence<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialEq> PartialEq for ArraySequence<T> {
    fn eq(&self, other: &Self) -> bool {
        if SharedCell::ptr_eq(&self.core, &other.core) {
            return true;
        }
        self.core.borrow().elements == other.core.borrow().elements
    }
}

impl<T: Eq> Eq for ArraySequence<T> {}

impl<T: Hash> Hash for ArraySequence<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let core = self.core.borrow();
        core.elements.len().hash(state);
        for element in &core.elements {
            element.hash(state);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ArraySequence<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_list()
            .entries(self.core.borrow().elements.iter())
            .finish()
    }
}

impl<T: fmt::Display> fmt::Display for ArraySequence<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "[")?;
        let core = self.core.borrow();
        let mut first = true;
        for element in &core.elements {
            if first {
                first = false;
            } else {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{element}")?;
        }
        write!(formatter, "]")
    }
}

impl<T> FromIterator<T> for ArraySequence<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_elements(Vec::from_iter(iter))
    }
}

impl<T: Clone> IntoIterator for ArraySequence<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        match SharedCell::try_unwrap(self.core) {
            Ok(cell) => cell.into_inner().elements.into_iter(),
            Err(core) => core.borrow().elements.clone().into_iter(),
        }
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<T: serde::Serialize> serde::Serialize for ArraySequence<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;
        let core = self.core.borrow();
        let mut seq = serializer.serialize_seq(Some(core.elements.len()))?;
        for element in &core.elements {
            seq.serialize_element(element)?;
        }
        seq.end()
    }
}

#[cfg(feature = "serde")]
struct ArraySequenceVisitor<T> {
    marker: std::marker::PhantomData<T>,
}

#[cfg(feature = "serde")]
impl<T> ArraySequenceVisitor<T> {
    const fn new() -> Self {
        Self {
            marker: std::marker::PhantomData,
        }
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::de::Visitor<'de> for ArraySequenceVisitor<T>
where
    T: serde::Deserialize<'de>,
{
    type Value = ArraySequence<T>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a sequence")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        const MAX_PREALLOCATE: usize = 4096;
        let capacity = seq.size_hint().unwrap_or(0).min(MAX_PREALLOCATE);
        let mut elements = Vec::with_capacity(capacity);
        while let Some(element) = seq.next_element()? {
            elements.push(element);
        }
        Ok(ArraySequence::from_elements(elements))
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for ArraySequence<T>
where
    T: serde::Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(ArraySequenceVisitor::new())
    }
}

// =============================================================================
// ArrayCursor
// =============================================================================

/// Bidirectional fail-fast cursor over an [`ArraySequence`].
///
/// The cursor sits between elements: `position` is the index of the element
/// the next [`advance`](ArrayCursor::advance) returns. Every step first
/// compares the container's live generation to the one the cursor expects
/// and fails with [`SequenceError::ConcurrentStructuralChange`] on mismatch.
/// The cursor's own [`insert`](ArrayCursor::insert) and
/// [`remove`](ArrayCursor::remove) go through the same structural
/// primitives as direct container mutation, then resynchronize the expected
/// generation, so a cursor stays valid for its own edits while still
/// failing on anyone else's.
///
/// # Examples
///
/// ```rust
/// use seqlist::sequence::{ArraySequence, Sequence};
///
/// let sequence: ArraySequence<i32> = (1..=3).collect();
/// let mut cursor = sequence.cursor();
///
/// assert_eq!(cursor.advance()?, 1);
/// assert_eq!(cursor.advance()?, 2);
/// cursor.remove()?;
/// assert_eq!(sequence.to_vec()?, vec![1, 3]);
/// assert_eq!(cursor.advance()?, 3);
/// # Ok::<(), seqlist::SequenceError>(())
/// ```
pub struct ArrayCursor<T> {
    core: SharedCell<ArrayCore<T>>,
    position: usize,
    last_returned: Option<usize>,
    expected_generation: u64,
}

impl<T: Clone> ArrayCursor<T> {
    pub(crate) fn new(core: SharedCell<ArrayCore<T>>, position: usize) -> Self {
        let expected_generation = core.borrow().generation;
        Self {
            core,
            position,
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

    /// Returns `true` if an [`advance`](ArrayCursor::advance) would return
    /// an element.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.position < self.core.borrow().elements.len()
    }

    /// Returns `true` if a [`retreat`](ArrayCursor::retreat) would return
    /// an element.
    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.position > 0
    }

    /// Returns the index of the element the next
    /// [`advance`](ArrayCursor::advance) would return.
    #[must_use]
    pub const fn next_index(&self) -> usize {
        self.position
    }

    /// Returns the index of the element the next
    /// [`retreat`](ArrayCursor::retreat) would return, or `None` at the
    /// front.
    #[must_use]
    pub const fn previous_index(&self) -> Option<usize> {
        self.position.checked_sub(1)
    }

    /// Returns the next element and steps forward over it.
    ///
    /// # Errors
    ///
    /// [`SequenceError::ConcurrentStructuralChange`] if the container was
    /// structurally modified behind this cursor;
    /// [`SequenceError::NoSuchElement`] at the end.
    pub fn advance(&mut self) -> Result<T, SequenceError> {
        self.check_generation()?;
        let element = {
            let core = self.core.borrow();
            if self.position >= core.elements.len() {
                return Err(SequenceError::NoSuchElement);
            }
            core.elements[self.position].clone()
        };
        self.last_returned = Some(self.position);
        self.position += 1;
        Ok(element)
    }

    /// Returns the previous element and steps backward over it.
    ///
    /// # Errors
    ///
    /// [`SequenceError::ConcurrentStructuralChange`] if the container was
    /// structurally modified behind this cursor;
    /// [`SequenceError::NoSuchElement`] at the front.
    pub fn retreat(&mut self) -> Result<T, SequenceError> {
        self.check_generation()?;
        let Some(previous) = self.position.checked_sub(1) else {
            return Err(SequenceError::NoSuchElement);
        };
        let element = {
            let core = self.core.borrow();
            if previous >= core.elements.len() {
                return Err(SequenceError::ConcurrentStructuralChange {
                    expected: self.expected_generation,
                    observed: core.generation,
                });
            }
            core.elements[previous].clone()
        };
        self.position = previous;
        self.last_returned = Some(previous);
        Ok(element)
    }

    /// Replaces the last element returned by
    /// [`advance`](ArrayCursor::advance) or
    /// [`retreat`](ArrayCursor::retreat).
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
        let mut core = self.core.borrow_mut();
        core.elements[index] = element;
        Ok(())
    }

    /// Inserts an element at the cursor position, before the element the
    /// next [`advance`](ArrayCursor::advance) would have returned.
    ///
    /// The cursor steps over the inserted element and remains valid.
    ///
    /// # Errors
    ///
    /// [`SequenceError::ConcurrentStructuralChange`] on staleness;
    /// [`SequenceError::CapacityExceeded`] if the store cannot grow.
    pub fn insert(&mut self, element: T) -> Result<(), SequenceError> {
        self.check_generation()?;
        self.core.borrow_mut().insert(self.position, element)?;
        self.position += 1;
        self.last_returned = None;
        self.resynchronize();
        Ok(())
    }

    /// Removes the last element returned by
    /// [`advance`](ArrayCursor::advance) or
    /// [`retreat`](ArrayCursor::retreat). The cursor remains valid.
    ///
    /// # Errors
    ///
    /// [`SequenceError::IllegalIteratorState`] without a preceding
    /// successful positional move;
    /// [`SequenceError::ConcurrentStructuralChange`] on staleness.
    pub fn remove(&mut self) -> Result<(), SequenceError> {
        let index = self
            .last_returned
            .ok_or(SequenceError::IllegalIteratorState)?;
        self.check_generation()?;
        self.core.borrow_mut().remove_at(index)?;
        self.position = index;
        self.last_returned = None;
        self.resynchronize();
        Ok(())
    }

    /// Visits every remaining element with one generation check before the
    /// loop and one validation after it, instead of a per-step check.
    ///
    /// A structural change made by `action` (through another handle) stops
    /// the loop and is reported by the final validation.
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
        let mut position = self.position;
        loop {
            let element = {
                let core = self.core.borrow();
                if core.generation != self.expected_generation
                    || position >= core.elements.len()
                {
                    break;
                }
                core.elements[position].clone()
            };
            position += 1;
            action(element);
        }
        if position > self.position {
            self.last_returned = Some(position - 1);
        }
        self.position = position;
        self.check_generation()
    }
}

impl<T: Clone> Iterator for ArrayCursor<T> {
    type Item = Result<T, SequenceError>;

    /// Yields `Ok` elements until the end; a detected structural change is
    /// yielded as `Err` rather than swallowed, and keeps being yielded
    /// until the cursor is dropped.
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
