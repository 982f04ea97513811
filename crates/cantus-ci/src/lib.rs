//! MIDI Capability Inquiry.
//!
//! A [`MidiCiDevice`] owns one MUID and acts as both initiator and responder:
//! discovery, profile configuration, property exchange (common rules) and
//! process inquiry. Inbound sysex goes through
//! [`MidiCiDevice::process_input`]; replies leave through a [`CiOutput`].
//!
//! Feature gates: `serde` (serialization of profiles, MUIDs and property metadata).

pub mod error;
pub use error::{Error, PropertyError, Result};

pub mod constants;

mod muid;
pub use muid::Muid;

mod observer;
pub use observer::{ListenerId, Listeners};

mod profile;
pub use profile::{MidiCiProfile, MidiCiProfileId, ObservableProfileList, ProfilesChange};

mod message;
pub use message::{AckNak, Message, MessageBody, MessageDirection, PropertyData};

pub mod factory;
pub mod retrieval;

mod chunk;
pub use chunk::PropertyChunkManager;

pub mod property;

mod config;
pub use config::{MidiCiDeviceConfig, MidiCiDeviceInfo};

mod output;
pub use output::{CiOutput, NullOutput};

mod strategy;
pub use strategy::{
    DefaultMidiCiStrategy, MachineReporter, MidiCiStrategy, MidiMessageReportRequest, MidiMessageReporter,
};

mod device;
pub use device::{
    AckNakDetails, ClientConnection, ClientSubscription, ConnectionChange, MidiCiDevice, MidiCiDeviceBuilder,
    MidiCiEvents, ProfileSet, SubscriptionState, SubscriptionUpdate,
};
