//! Error types for sequence containers, cursors, and views.
//!
//! This module provides [`SequenceError`], the single failure taxonomy shared
//! by every container, cursor, and view in the crate. All errors are reported
//! to the immediate caller; nothing is retried internally, and no
//! single-element operation leaves a container in a torn state.

/// Represents every failure a sequence operation can report.
///
/// Each variant is locally fatal to the call that produced it and fully
/// recoverable by the caller: the container itself is always left in a
/// well-defined state.
///
/// # Examples
///
/// ```rust
/// use seqlist::SequenceError;
///
/// let error = SequenceError::IndexOutOfRange { index: 5, length: 3 };
/// assert_eq!(
///     format!("{}", error),
///     "index 5 out of range for sequence of length 3"
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceError {
    /// An index fell outside `[0, length)` (or `[0, length]` for insertion
    /// points).
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// The logical length of the container at the time of the call.
        length: usize,
    },
    /// An element was requested from an empty container, or a cursor was
    /// advanced or retreated past an end.
    NoSuchElement,
    /// A cursor `set` or `remove` was invoked without a preceding successful
    /// `advance` or `retreat`.
    IllegalIteratorState,
    /// A cursor or view observed a mutation generation different from the one
    /// it captured: the container was structurally modified by another code
    /// path while the cursor or view was live.
    ///
    /// Detection is best-effort and diagnostic. It reports *that* the
    /// structure changed, never *what* changed, and it is not a correctness
    /// guarantee against lost updates.
    ConcurrentStructuralChange {
        /// The generation the cursor or view captured.
        expected: u64,
        /// The generation the container currently carries.
        observed: u64,
    },
    /// Growing the array-backed container would exceed the maximum
    /// representable capacity.
    CapacityExceeded {
        /// The capacity the operation required.
        required: usize,
    },
    /// A sub-range was requested with `start > end`.
    InvalidRange {
        /// The inclusive start bound of the requested range.
        start: usize,
        /// The exclusive end bound of the requested range.
        end: usize,
    },
}

impl std::fmt::Display for SequenceError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IndexOutOfRange { index, length } => {
                write!(
                    formatter,
                    "index {index} out of range for sequence of length {length}"
                )
            }
            Self::NoSuchElement => write!(formatter, "no such element"),
            Self::IllegalIteratorState => {
                write!(
                    formatter,
                    "cursor has no current element: advance or retreat first"
                )
            }
            Self::ConcurrentStructuralChange { expected, observed } => {
                write!(
                    formatter,
                    "concurrent structural change detected: expected generation \
                     {expected}, observed {observed}"
                )
            }
            Self::CapacityExceeded { required } => {
                write!(
                    formatter,
                    "required capacity {required} exceeds the maximum array capacity"
                )
            }
            Self::InvalidRange { start, end } => {
                write!(formatter, "invalid range: start {start} > end {end}")
            }
        }
    }
}

impl std::error::Error for SequenceError {}
