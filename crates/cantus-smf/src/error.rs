//! Error types for the SMF codec.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SMF parse error: {message} (at {offset})")]
    Parse { message: String, offset: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    pub(crate) fn parse(message: impl Into<String>, offset: usize) -> Self {
        Error::Parse {
            message: message.into(),
            offset,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
