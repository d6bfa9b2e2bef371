//! Error types for delta replication.

use crate::buffer::{ReplicaId, SeqNo};
use thiserror::Error;
use weft_core::CrdtError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeltaError {
    /// A payload skipped deltas the receiver has not seen from that sender.
    #[error("Gap in deltas from {from}: expected seq {expected}, got {got}")]
    Gap {
        from: ReplicaId,
        expected: SeqNo,
        got: SeqNo,
    },

    #[error("Replica index out of range: {0}")]
    UnknownReplica(usize),

    #[error(transparent)]
    Crdt(#[from] CrdtError),
}

pub type Result<T> = std::result::Result<T, DeltaError>;
