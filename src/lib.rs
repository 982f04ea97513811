//! # Cantus - MIDI 1.0 / MIDI 2.0 toolkit
//!
//! Codecs and protocol state machines built from modular subsystems.
//!
//! ## Architecture
//!
//! Cantus is an umbrella crate that re-exports:
//! - **cantus-ump** - Universal MIDI Packets (builders, SysEx/text reassembly, MIDI 2.0 tracks, merge/split)
//! - **cantus-smf** - Standard MIDI Files (reader, writer, running status, MIDI 1.0 channel state)
//! - **cantus-ci** - MIDI Capability Inquiry (discovery, profiles, property exchange, process inquiry)
//!
//! ## Quick Start
//!
//! ```ignore
//! use cantus::ci::{MidiCiDevice, Muid};
//!
//! let (tx, rx) = crossbeam_channel::unbounded();
//! let mut device = MidiCiDevice::builder()
//!     .product_instance_id("unit-1")
//!     .output(tx)
//!     .build()?;
//!
//! device.send_discovery(0);
//! while let Ok((group, sysex)) = transport.recv() {
//!     device.process_input(group, &sysex)?;
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Everything (`full`)
//! - `ump` - UMP codec and MIDI 2.0 tracks
//! - `smf` - Standard MIDI File codec
//! - `ci` - MIDI-CI device (implies `ump` and `smf`)
//! - `serde` - Serialization of songs, packets and CI metadata

mod error;
pub use error::{Error, Result};

/// Re-export of cantus-ump for direct access
#[cfg(feature = "ump")]
pub use cantus_ump as ump;

/// Re-export of cantus-smf for direct access
#[cfg(feature = "smf")]
pub use cantus_smf as smf;

/// Re-export of cantus-ci for direct access
#[cfg(feature = "ci")]
pub use cantus_ci as ci;

#[cfg(feature = "ump")]
pub use cantus_ump::{Midi2Music, Midi2Track, Ump};

#[cfg(feature = "smf")]
pub use cantus_smf::{Midi1Event, Midi1Machine, Midi1Message, Midi1Music, Midi1Track};

#[cfg(feature = "ci")]
pub use cantus_ci::{MidiCiDevice, MidiCiDeviceBuilder, MidiCiDeviceConfig, Muid};

/// Common imports.
pub mod prelude {
    pub use crate::{Error, Result};

    #[cfg(feature = "ump")]
    pub use cantus_ump::{factory, Midi2Music, Midi2Track, Ump};

    #[cfg(feature = "smf")]
    pub use cantus_smf::{Midi1Event, Midi1Machine, Midi1Message, Midi1Music, Midi1Track};

    #[cfg(feature = "ci")]
    pub use cantus_ci::{
        CiOutput, ConnectionChange, MidiCiDevice, MidiCiDeviceConfig, MidiCiDeviceInfo, MidiCiProfile,
        MidiCiProfileId, Muid,
    };
}
