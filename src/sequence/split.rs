//! Split-friendly traversal cursors.
//!
//! A split cursor walks a range of a container and can divide its remaining
//! range in two for batched or host-parallel consumption. Three shapes are
//! provided:
//!
//! - [`ArraySplitCursor`]: over an [`ArraySequence`](super::ArraySequence)
//!   or a [`RangeView`](super::RangeView); splits at the midpoint of the
//!   remaining index range. The upper fence and the expected generation are
//!   bound lazily, on first use.
//! - [`ChainSplitCursor`]: over a [`ChainSequence`](super::ChainSequence).
//!   Node links cannot be subdivided by index, so a split materializes a
//!   geometrically growing batch of front elements into a detached snapshot.
//! - [`SnapshotSplitCursor`]: the detached snapshot itself, an
//!   independently consumable shared slice with no generation checks, since
//!   nothing can structurally change under it.
//!
//! `for_each_remaining` performs one generation check before the loop and
//! one validation at the end rather than a per-step check, trading
//! finer-grained detection for throughput.
//!
//! # Examples
//!
//! ```rust
//! use seqlist::sequence::{ArraySequence, SplitCursor};
//!
//! let sequence: ArraySequence<i32> = (0..8).collect();
//! let mut right = sequence.split_cursor();
//! let mut left = right.try_split().expect("range is splittable");
//!
//! let mut visited = Vec::new();
//! left.for_each_remaining(|element| visited.push(element))?;
//! right.for_each_remaining(|element| visited.push(element))?;
//! assert_eq!(visited, (0..8).collect::<Vec<_>>());
//! # Ok::<(), seqlist::SequenceError>(())
//! ```

use smallvec::SmallVec;
use static_assertions::const_assert;

use super::array::ArrayCore;
use super::chain::ChainCore;
use super::view::ViewState;
use super::{SharedCell, SharedSlice};
use crate::error::SequenceError;

// =============================================================================
// Constants
// =============================================================================

/// Extra elements each successive chain split materializes.
pub const BATCH_UNIT: usize = 1 << 10;

/// Largest batch a single chain split will materialize.
pub const MAXIMUM_BATCH: usize = 1 << 25;

const_assert!(BATCH_UNIT > 0);
const_assert!(BATCH_UNIT <= MAXIMUM_BATCH);

// =============================================================================
// SplitCursor Trait
// =============================================================================

/// Parallel-decomposable traversal over a sequence.
///
/// Once split, the receiver and the returned prefix cover disjoint ranges
/// whose concatenation (prefix first) is exactly what the original cursor
/// would have visited.
pub trait SplitCursor<T: Clone> {
    /// The cursor type a split produces for the front half.
    type Prefix;

    /// Returns the number of elements a full traversal from here would
    /// visit, binding the fence if it is not bound yet.
    fn estimate_remaining(&mut self) -> usize;

    /// Visits the next element, if any. Returns `Ok(false)` when the range
    /// is exhausted.
    ///
    /// # Errors
    ///
    /// [`SequenceError::ConcurrentStructuralChange`] if the backing
    /// container changed structurally since this cursor bound its
    /// generation.
    fn try_advance<F>(&mut self, action: F) -> Result<bool, SequenceError>
    where
        F: FnOnce(T);

    /// Visits every remaining element with one generation check before the
    /// loop and one validation at the end.
    ///
    /// # Errors
    ///
    /// [`SequenceError::ConcurrentStructuralChange`] before or after the
    /// loop.
    fn for_each_remaining<F>(&mut self, action: F) -> Result<(), SequenceError>
    where
        F: FnMut(T);

    /// Splits off a prefix of the remaining range, or returns `None` when
    /// the remainder is too small to subdivide usefully.
    fn try_split(&mut self) -> Option<Self::Prefix>;
}

// =============================================================================
// ArraySplitCursor
// =============================================================================

/// Midpoint-splitting cursor over contiguous storage.
///
/// The exclusive upper bound (`fence`) and the expected generation are
/// captured lazily on first use, so a cursor created early still covers
/// elements appended before traversal begins. When the cursor walks a view,
/// it binds the view's window and generation snapshot instead.
pub struct ArraySplitCursor<T> {
    core: SharedCell<ArrayCore<T>>,
    view: Option<SharedCell<ViewState>>,
    position: usize,
    fence: Option<usize>,
    expected_generation: u64,
}

impl<T: Clone> ArraySplitCursor<T> {
    pub(crate) fn over_root(core: SharedCell<ArrayCore<T>>) -> Self {
        Self {
            core,
            view: None,
            position: 0,
            fence: None,
            expected_generation: 0,
        }
    }

    pub(crate) fn over_view(
        core: SharedCell<ArrayCore<T>>,
        state: SharedCell<ViewState>,
    ) -> Self {
        let position = state.borrow().offset;
        Self {
            core,
            view: Some(state),
            position,
            fence: None,
            expected_generation: 0,
        }
    }

    /// Resolves the fence, capturing the expected generation alongside it.
    fn bind(&mut self) -> usize {
        if let Some(fence) = self.fence {
            return fence;
        }
        let fence = match &self.view {
            Some(state) => {
                let state = state.borrow();
                self.expected_generation = state.expected_generation;
                state.offset + state.length
            }
            None => {
                let core = self.core.borrow();
                self.expected_generation = core.generation;
                core.elements.len()
            }
        };
        self.fence = Some(fence);
        fence
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
}

impl<T: Clone> SplitCursor<T> for ArraySplitCursor<T> {
    type Prefix = Self;

    fn estimate_remaining(&mut self) -> usize {
        let fence = self.bind();
        fence.saturating_sub(self.position)
    }

    fn try_advance<F>(&mut self, action: F) -> Result<bool, SequenceError>
    where
        F: FnOnce(T),
    {
        let fence = self.bind();
        if self.position >= fence {
            return Ok(false);
        }
        let element = {
            let core = self.core.borrow();
            match core.elements.get(self.position) {
                Some(element) => element.clone(),
                None => {
                    return Err(SequenceError::ConcurrentStructuralChange {
                        expected: self.expected_generation,
                        observed: core.generation,
                    });
                }
            }
        };
        self.position += 1;
        action(element);
        self.check_generation()?;
        Ok(true)
    }

    fn for_each_remaining<F>(&mut self, mut action: F) -> Result<(), SequenceError>
    where
        F: FnMut(T),
    {
        let fence = self.bind();
        self.check_generation()?;
        while self.position < fence {
            let element = {
                let core = self.core.borrow();
                match core.elements.get(self.position) {
                    Some(element) => element.clone(),
                    // Let the final validation report what happened.
                    None => break,
                }
            };
            self.position += 1;
            action(element);
        }
        self.check_generation()
    }

    fn try_split(&mut self) -> Option<Self> {
        let fence = self.bind();
        let low = self.position;
        let mid = (low + fence) >> 1;
        if low >= mid {
            return None;
        }
        let prefix = Self {
            core: SharedCell::clone(&self.core),
            view: self.view.clone(),
            position: low,
            fence: Some(mid),
            expected_generation: self.expected_generation,
        };
        self.position = mid;
        Some(prefix)
    }
}

// =============================================================================
// ChainSplitCursor
// =============================================================================

/// Batch-materializing cursor over a node chain.
///
/// The size estimate and the expected generation are captured lazily on
/// first use. Each [`try_split`](SplitCursor::try_split) dequeues
/// [`BATCH_UNIT`] more elements than the previous one, up to
/// [`MAXIMUM_BATCH`], into a detached [`SnapshotSplitCursor`].
pub struct ChainSplitCursor<T> {
    core: SharedCell<ChainCore<T>>,
    current: Option<usize>,
    remaining: Option<usize>,
    expected_generation: u64,
    batch: usize,
}

impl<T: Clone> ChainSplitCursor<T> {
    pub(crate) fn over_chain(core: SharedCell<ChainCore<T>>) -> Self {
        Self {
            core,
            current: None,
            remaining: None,
            expected_generation: 0,
            batch: 0,
        }
    }

    /// Resolves the size estimate, anchoring the cursor on the head and
    /// capturing the expected generation.
    fn bind(&mut self) -> usize {
        if let Some(remaining) = self.remaining {
            return remaining;
        }
        let (head, length, generation) = {
            let core = self.core.borrow();
            (core.head, core.length, core.generation)
        };
        self.current = head;
        self.expected_generation = generation;
        self.remaining = Some(length);
        length
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
}

impl<T: Clone> SplitCursor<T> for ChainSplitCursor<T> {
    type Prefix = SnapshotSplitCursor<T>;

    fn estimate_remaining(&mut self) -> usize {
        self.bind()
    }

    fn try_advance<F>(&mut self, action: F) -> Result<bool, SequenceError>
    where
        F: FnOnce(T),
    {
        let remaining = self.bind();
        let Some(current) = self.current else {
            return Ok(false);
        };
        if remaining == 0 {
            return Ok(false);
        }
        let (element, next) = {
            let core = self.core.borrow();
            match core.try_node(current) {
                Some(node) => (node.element.clone(), node.next),
                None => {
                    return Err(SequenceError::ConcurrentStructuralChange {
                        expected: self.expected_generation,
                        observed: core.generation,
                    });
                }
            }
        };
        self.current = next;
        self.remaining = Some(remaining - 1);
        action(element);
        self.check_generation()?;
        Ok(true)
    }

    fn for_each_remaining<F>(&mut self, mut action: F) -> Result<(), SequenceError>
    where
        F: FnMut(T),
    {
        self.bind();
        self.check_generation()?;
        loop {
            let Some(current) = self.current else {
                break;
            };
            let (element, next) = {
                let core = self.core.borrow();
                match core.try_node(current) {
                    Some(node) => (node.element.clone(), node.next),
                    // Let the final validation report what happened.
                    None => break,
                }
            };
            self.current = next;
            self.remaining = self.remaining.map(|remaining| remaining.saturating_sub(1));
            action(element);
        }
        self.check_generation()
    }

    fn try_split(&mut self) -> Option<SnapshotSplitCursor<T>> {
        let remaining = self.bind();
        let current = self.current?;
        if remaining <= 1 || self.check_generation().is_err() {
            // A stale cursor refuses to split; the next advance surfaces
            // the detection.
            return None;
        }
        let size = (self.batch + BATCH_UNIT).min(remaining).min(MAXIMUM_BATCH);
        let mut buffer: SmallVec<[T; 8]> = SmallVec::new();
        {
            let core = self.core.borrow();
            let mut index = Some(current);
            while let Some(node_index) = index {
                if buffer.len() >= size {
                    break;
                }
                let node = core.node(node_index);
                buffer.push(node.element.clone());
                index = node.next;
            }
            self.current = index;
        }
        self.batch = buffer.len();
        self.remaining = Some(remaining - buffer.len());
        Some(SnapshotSplitCursor::from_batch(buffer.into_vec()))
    }
}

// =============================================================================
// SnapshotSplitCursor
// =============================================================================

/// Detached, independently consumable snapshot produced by a chain split.
///
/// The snapshot owns (a share of) its elements; no generation checks apply
/// because nothing can structurally change under it. Further splits divide
/// the snapshot at the midpoint without copying.
pub struct SnapshotSplitCursor<T> {
    elements: SharedSlice<T>,
    position: usize,
    fence: usize,
}

impl<T: Clone> SnapshotSplitCursor<T> {
    fn from_batch(batch: Vec<T>) -> Self {
        let fence = batch.len();
        Self {
            elements: SharedSlice::from(batch),
            position: 0,
            fence,
        }
    }
}

impl<T: Clone> SplitCursor<T> for SnapshotSplitCursor<T> {
    type Prefix = Self;

    fn estimate_remaining(&mut self) -> usize {
        self.fence - self.position
    }

    fn try_advance<F>(&mut self, action: F) -> Result<bool, SequenceError>
    where
        F: FnOnce(T),
    {
        if self.position >= self.fence {
            return Ok(false);
        }
        let element = self.elements[self.position].clone();
        self.position += 1;
        action(element);
        Ok(true)
    }

    fn for_each_remaining<F>(&mut self, mut action: F) -> Result<(), SequenceError>
    where
        F: FnMut(T),
    {
        while self.position < self.fence {
            let element = self.elements[self.position].clone();
            self.position += 1;
            action(element);
        }
        Ok(())
    }

    fn try_split(&mut self) -> Option<Self> {
        let low = self.position;
        let mid = (low + self.fence) >> 1;
        if low >= mid {
            return None;
        }
        let prefix = Self {
            elements: SharedSlice::clone(&self.elements),
            position: low,
            fence: mid,
        };
        self.position = mid;
        Some(prefix)
    }
}

// =============================================================================
// Tests
// =============================================================================
