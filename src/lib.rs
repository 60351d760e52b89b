//! # seqlist
//!
//! Fail-fast sequence containers: a growable contiguous array and a
//! slab-backed doubly linked chain, with shared cursors, aliasing range
//! views, and splittable traversal.
//!
//! ## Overview
//!
//! This library provides two interchangeable implementations of an ordered,
//! duplicate-permitting sequence and the traversal machinery around them:
//!
//! - **Containers**: [`sequence::ArraySequence`] (contiguous, amortized O(1)
//!   append) and [`sequence::ChainSequence`] (doubly linked, O(1) at both
//!   ends, deque/stack/queue aliases), both implementing
//!   [`sequence::Sequence`]
//! - **Fail-fast cursors**: bidirectional, mutation-capable cursors that
//!   detect structural changes made behind their back
//! - **Range views**: [`sequence::RangeView`] windows that alias the
//!   array-backed store and forward edits to it, nestable to any depth
//! - **Split cursors**: traversal objects that partition their remaining
//!   range for batched consumption
//!
//! The containers are single-threaded by contract: there is no locking and
//! no atomic state, and the handles are `!Send` by construction. Interleaved
//! mutation from several code paths on one container is *detected*
//! (best-effort, via a per-container mutation generation), never prevented.
//!
//! ## Feature Flags
//!
//! - `serde`: `Serialize`/`Deserialize` for both containers as ordered
//!   element sequences
//!
//! ## Example
//!
//! ```rust
//! use seqlist::prelude::*;
//!
//! let mut sequence = ArraySequence::new();
//! sequence.append("a")?;
//! sequence.append("b")?;
//! assert_eq!(sequence.len(), 2);
//! # Ok::<(), SequenceError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// Note: Disabling redundant_closure_for_method_calls due to clippy 0.1.92 panic bug
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// Re-exports commonly used types and traits.
///
/// # Usage
///
/// ```rust
/// use seqlist::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::SequenceError;
    pub use crate::sequence::*;
}

pub mod error;
pub mod sequence;

pub use error::SequenceError;
