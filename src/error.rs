//! Centralized error type for the cantus umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[cfg(feature = "ump")]
    #[error("UMP: {0}")]
    Ump(#[from] cantus_ump::Error),

    #[cfg(feature = "smf")]
    #[error("SMF: {0}")]
    Smf(#[from] cantus_smf::Error),

    #[cfg(feature = "ci")]
    #[error("MIDI-CI: {0}")]
    Ci(#[from] cantus_ci::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
