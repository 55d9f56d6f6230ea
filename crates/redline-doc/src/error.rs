//! Error type for document-model operations.

use thiserror::Error;

/// Errors returned by position-addressed document edits.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocError {
    /// A position lies past the end of the document.
    #[error("OUT_OF_BOUNDS: position {pos} exceeds document size {size}")]
    OutOfBounds { pos: usize, size: usize },

    /// `from > to`.
    #[error("INVALID_RANGE: {from}..{to}")]
    InvalidRange { from: usize, to: usize },

    /// A position does not address a valid inline insertion point
    /// (e.g. it lands between two block nodes).
    #[error("INVALID_POSITION: {0}")]
    InvalidPosition(usize),
}
