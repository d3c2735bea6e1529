//! Errors returned by tree operations.
//!
//! Only caller mistakes are reported here. A position with no content is
//! an empty result, and removing something that is not there returns
//! `None`; neither is an error.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// A rank outside `[0, len)` (or `[-len, -1]` for negative ranks).
    #[error("index {index} out of range for tree of length {len}")]
    IndexOutOfRange { index: isize, len: usize },

    /// A rank range that is inverted or extends past the end.
    #[error("range {start}..{stop} out of bounds for tree of length {len}")]
    RangeOutOfBounds { start: usize, stop: usize, len: usize },

    /// An item whose end lies before its start.
    #[error("span ends at {end} before it starts at {start}")]
    InvalidSpan { start: String, end: String },

    /// A sliding window of zero verticalities.
    #[error("window size must be at least 1, got {0}")]
    InvalidWindow(usize),

    /// Reported by `validate` when a cached aggregate disagrees with a recount.
    #[error("tree invariant violated: {0}")]
    Invariant(String),
}
