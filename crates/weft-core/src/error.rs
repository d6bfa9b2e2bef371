//! Error types for CRDT mutators.
//!
//! Joins are total and never fail; only mutators addressing something that
//! does not exist in the current state report an error.

use crate::dot::Dot;
use crate::id::VertexId;
use thiserror::Error;

/// Errors raised by mutators. A failed mutator produces no delta.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrdtError {
    #[error("Position out of bounds: {index} (length: {length})")]
    OutOfBounds { index: usize, length: usize },

    #[error("Vertex not found: {0}")]
    UnknownVertex(VertexId),

    #[error("Dot is not live: {0}")]
    UnknownDot(Dot),
}

impl CrdtError {
    /// Every variant addresses a position, vertex or dot missing from the
    /// state the mutator was given.
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(
            self,
            CrdtError::OutOfBounds { .. } | CrdtError::UnknownVertex(_) | CrdtError::UnknownDot(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CrdtError>;
