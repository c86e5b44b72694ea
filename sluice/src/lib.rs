//! Byte sources for hand-written parsers.
//!
//! This crate provides the input side of a parsing stack: a [`Source`] trait
//! describing cursor-style access to a run of bytes, together with two
//! implementations covering the cases that matter in practice:
//!
//! * [`SliceSource`] for data that is already contiguous in memory. All
//!   operations compile down to index arithmetic on the slice.
//! * [`ReadSource`] for data arriving through a [`Read`][std::io::Read]
//!   instance. It buffers in chunks, keeps the bytes of the current parsing
//!   window addressable for cheap backtracking, and defers IO errors so the
//!   parsing hot path never has to check a `Result`.
//!
//! Parsers written against [`Source`] are monomorphized per input kind, so
//! supporting both buffers and streams costs no virtual dispatch.
//!
//! ## Deferred IO errors
//!
//! When a read fails, [`ReadSource`] behaves as if the input had ended and
//! stores the error. Parsing logic then runs out of input and reports
//! whatever failure that causes; outside of the hot path the caller asks
//! [`ReadSource::check_io_error`] whether an IO error was the underlying
//! reason. This does not lose or delay any error information, it only moves
//! the check out of the per-byte loops.
//!
//! ## Anchored windows
//!
//! Some parsers need to revisit bytes they have already looked at, for
//! example to retry an alternative interpretation of a field. [`Source`]
//! supports this through an *anchor*: after [`set_anchor`][Source::set_anchor]
//! every byte from the anchor position on stays addressable, so
//! [`seek`][Source::seek] and [`slice`][Source::slice] are O(1) within that
//! window. Moving the anchor forward releases the window for reuse.

#![warn(missing_docs)]
mod read;
mod slice;
mod source;

pub use read::ReadSource;
pub use slice::SliceSource;
pub use source::Source;
