//! Error types for the UMP codec.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Delta Clockstamp and JR Timestamp cannot be mixed in one source")]
    MixedTimestamps,

    #[error("Invalid packet: {0}")]
    InvalidPacket(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;
