//! Error types for MIDI-CI processing.

use thiserror::Error;

use crate::property::property_status;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid MUID {0:#010x}: every byte must be 7-bit")]
    InvalidMuid(u32),

    #[error("Malformed MIDI-CI message (sub-id {sub_id:#04x}): {message}")]
    Malformed { sub_id: u8, message: String },

    #[error("MIDI-CI {field} of {value} exceeds {limit} (sub-id {sub_id:#04x})")]
    FieldOverflow {
        sub_id: u8,
        field: &'static str,
        value: usize,
        limit: usize,
    },

    #[error("Property exchange error: {0}")]
    Property(#[from] PropertyError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn malformed(sub_id: u8, message: impl Into<String>) -> Self {
        Error::Malformed {
            sub_id,
            message: message.into(),
        }
    }
}

/// Failures of a property exchange transaction. Each maps to the status code
/// reported back to the peer in the reply header.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    #[error("Unknown property: {0}")]
    NotFound(String),

    #[error("Property is readonly: {0}")]
    ReadOnly(String),

    #[error("Operation not allowed: {0}")]
    NotAllowed(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PropertyError {
    pub fn status(&self) -> u16 {
        match self {
            PropertyError::NotFound(_) => property_status::NOT_FOUND,
            PropertyError::ReadOnly(_) | PropertyError::NotAllowed(_) => property_status::NOT_ALLOWED,
            PropertyError::BadRequest(_) => property_status::BAD_REQUEST,
            PropertyError::UnsupportedEncoding(_) => property_status::UNSUPPORTED_MEDIA_TYPE,
            PropertyError::Internal(_) => property_status::INTERNAL_ERROR,
        }
    }
}

impl From<serde_json::Error> for PropertyError {
    fn from(e: serde_json::Error) -> Self {
        PropertyError::BadRequest(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
