//! Standard MIDI File codec.
//!
//! Reads and writes `MThd`/`MTrk` images with running status, sysex and meta
//! events, and tracks MIDI 1.0 channel state.
//!
//! Feature gates: `serde` (serialization of songs and events).

pub mod error;
pub use error::{Error, Result};

mod message;
pub use message::{fixed_data_size, meta_type, midi1_status, midi_cc, Midi1Event, Midi1Message};

mod music;
pub use music::{Midi1Music, Midi1Track, DEFAULT_TEMPO};

pub mod vlq;

mod reader;
mod writer;
pub use writer::{
    track_data_size, DefaultMetaEventWriter, MetaEventWriter, Midi1WriterOptions,
    VlqMetaEventWriter,
};

mod file;

mod machine;
pub use machine::{DteTarget, Midi1Machine, Midi1MachineChannel, Midi1SystemCommon};
