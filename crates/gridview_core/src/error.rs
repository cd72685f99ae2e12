//! Error type shared by the grid engine and record sources.
use crate::models::field::FieldId;
use thiserror::Error;

/// Top-level grid engine error type.
#[derive(Error, Debug)]
pub enum GridError {
    /// A fetch was superseded by a newer one of the same kind.
    #[error("Refresh cancelled")]
    Cancelled,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid order key: {0}")]
    InvalidOrderKey(String),

    #[error("Unknown field: {0}")]
    UnknownField(FieldId),

    #[error("Unknown record: {0}")]
    UnknownRecord(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GridError {
    /// Whether this error only signals supersession and must not reach the user.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
