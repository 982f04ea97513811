//! Universal MIDI Packet codec.
//!
//! Provides the `Ump` packet type, message builders for every UMP message type,
//! SysEx/text reassembly, byte order conversion and MIDI 2.0 track merge/split.
//!
//! Feature gates: `serde` (serialization of packets and songs).

pub mod error;
pub use error::{Error, Result};

mod ump;
pub use ump::{binary_chunk_status, message_type, utility_status, word_count, Ump};

pub mod factory;
pub use factory::DeviceDetails;

pub mod retriever;
pub use retriever::{get_flex_text, get_stream_text, get_sysex7_data, get_sysex8_data};

mod platform;
pub use platform::{from_platform_bytes, to_platform_bytes, umps_to_platform_bytes, ByteOrder};

mod channel_message;
pub use channel_message::{
    midi1_pitch_bend_to_midi2, midi1_to_midi2, midi1_value_to_midi2, midi1_velocity_to_midi2,
    midi2_pitch_bend_to_midi1, midi2_value_to_midi1, midi2_velocity_to_midi1,
    Midi2ChannelMessage,
};

mod music;
pub use music::{filter_events, Midi2Music, Midi2Track, DEFAULT_TEMPO_MICROS};

mod merge;

mod split;
pub use split::{group_and_channel_key, CONDUCTOR_TRACK};
