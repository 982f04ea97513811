//! MIDI Unique Identifiers.

use rand::Rng;

use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A 28-bit MUID stored as four 7-bit bytes, least significant byte first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Muid(u32);

impl Muid {
    pub const BROADCAST: Muid = Muid(0x7F7F_7F7F);

    pub fn new(value: u32) -> Result<Self> {
        if value != value & 0x7F7F_7F7F {
            return Err(Error::InvalidMuid(value));
        }
        Ok(Muid(value))
    }

    /// A random non-broadcast MUID.
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        loop {
            let value = rng.gen::<u32>() & 0x7F7F_7F7F;
            if value != Self::BROADCAST.0 {
                return Muid(value);
            }
        }
    }

    pub fn value(self) -> u32 {
        self.0
    }

    pub fn is_broadcast(self) -> bool {
        self == Self::BROADCAST
    }

    pub fn to_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    pub fn from_bytes(bytes: [u8; 4]) -> Result<Self> {
        Self::new(u32::from_le_bytes(bytes))
    }
}

impl std::fmt::Display for Muid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}
