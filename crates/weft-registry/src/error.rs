//! Error types for the type registry.

use thiserror::Error;
use weft_core::CrdtError;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("unknown type named {0}")]
    UnknownType(String),

    #[error("{0} is already defined as a type")]
    DuplicateType(String),

    /// The operation JSON does not name a mutator of the type
    #[error("Invalid operation for {type_name}: {reason}")]
    InvalidOperation { type_name: String, reason: String },

    /// The state JSON does not decode as the type's state
    #[error("Invalid state for {type_name}: {reason}")]
    InvalidState { type_name: String, reason: String },

    #[error(transparent)]
    Crdt(#[from] CrdtError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
