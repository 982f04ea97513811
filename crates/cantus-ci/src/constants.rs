//! Wire constants of the MIDI-CI protocol.

/// Universal sysex non-realtime id, first byte of every CI message.
pub const UNIVERSAL_SYSEX: u8 = 0x7E;
/// Sub-id #1 identifying MIDI-CI.
pub const SUB_ID_1_MIDI_CI: u8 = 0x0D;
/// CI message version / format written by this implementation.
pub const CI_VERSION_AND_FORMAT: u8 = 0x02;
/// Size of the common header preceding every message body.
pub const HEADER_SIZE: usize = 13;
/// Largest value a 14-bit length or count field can carry.
pub const MAX_U14: usize = 0x3FFF;
/// Largest value a 28-bit field can carry.
pub const MAX_U28: usize = 0x0FFF_FFFF;
/// Bytes of a property exchange chunk besides its JSON header and body,
/// counting F0 and F7.
pub const PROPERTY_CHUNK_OVERHEAD: usize = 2 + HEADER_SIZE + 9;

pub const DEFAULT_RECEIVABLE_MAX_SYSEX_SIZE: u32 = 4096;
pub const DEFAULT_MAX_PROPERTY_CHUNK_SIZE: usize = 4096 - 256;
pub const MAX_PRODUCT_INSTANCE_ID_LENGTH: usize = 16;
pub const NO_FUNCTION_BLOCK: u8 = 0x7F;

pub mod sub_id2 {
    pub const PROFILE_INQUIRY: u8 = 0x20;
    pub const PROFILE_INQUIRY_REPLY: u8 = 0x21;
    pub const SET_PROFILE_ON: u8 = 0x22;
    pub const SET_PROFILE_OFF: u8 = 0x23;
    pub const PROFILE_ENABLED_REPORT: u8 = 0x24;
    pub const PROFILE_DISABLED_REPORT: u8 = 0x25;
    pub const PROFILE_ADDED_REPORT: u8 = 0x26;
    pub const PROFILE_REMOVED_REPORT: u8 = 0x27;
    pub const PROFILE_DETAILS_INQUIRY: u8 = 0x28;
    pub const PROFILE_DETAILS_REPLY: u8 = 0x29;
    pub const PROFILE_SPECIFIC_DATA: u8 = 0x2F;

    pub const PROPERTY_CAPABILITIES_INQUIRY: u8 = 0x30;
    pub const PROPERTY_CAPABILITIES_REPLY: u8 = 0x31;
    pub const PROPERTY_GET_DATA_INQUIRY: u8 = 0x34;
    pub const PROPERTY_GET_DATA_REPLY: u8 = 0x35;
    pub const PROPERTY_SET_DATA_INQUIRY: u8 = 0x36;
    pub const PROPERTY_SET_DATA_REPLY: u8 = 0x37;
    pub const PROPERTY_SUBSCRIBE: u8 = 0x38;
    pub const PROPERTY_SUBSCRIBE_REPLY: u8 = 0x39;
    pub const PROPERTY_NOTIFY: u8 = 0x3F;

    pub const PROCESS_INQUIRY_CAPABILITIES: u8 = 0x40;
    pub const PROCESS_INQUIRY_CAPABILITIES_REPLY: u8 = 0x41;
    pub const MIDI_MESSAGE_REPORT_INQUIRY: u8 = 0x42;
    pub const MIDI_MESSAGE_REPORT_REPLY: u8 = 0x43;
    pub const END_OF_MIDI_MESSAGE_REPORT: u8 = 0x44;

    pub const DISCOVERY_INQUIRY: u8 = 0x70;
    pub const DISCOVERY_REPLY: u8 = 0x71;
    pub const ENDPOINT_MESSAGE_INQUIRY: u8 = 0x72;
    pub const ENDPOINT_MESSAGE_REPLY: u8 = 0x73;
    pub const ACK: u8 = 0x7D;
    pub const INVALIDATE_MUID: u8 = 0x7E;
    pub const NAK: u8 = 0x7F;

    /// Sub-ids whose messages travel as property chunks.
    pub fn is_property_chunked(sub_id: u8) -> bool {
        matches!(sub_id, PROPERTY_GET_DATA_INQUIRY..=PROPERTY_SUBSCRIBE_REPLY | PROPERTY_NOTIFY)
    }
}

/// Bits of the "capability inquiry category supported" byte.
pub mod category {
    pub const PROTOCOL_NEGOTIATION: u8 = 0x02;
    pub const PROFILE_CONFIGURATION: u8 = 0x04;
    pub const PROPERTY_EXCHANGE: u8 = 0x08;
    pub const PROCESS_INQUIRY: u8 = 0x10;
    /// Profiles, properties and process inquiry.
    pub const THREE_P: u8 = PROFILE_CONFIGURATION | PROPERTY_EXCHANGE | PROCESS_INQUIRY;
}

pub mod address {
    /// Highest single-channel address.
    pub const MAX_CHANNEL: u8 = 0x0F;
    pub const GROUP: u8 = 0x7E;
    pub const FUNCTION_BLOCK: u8 = 0x7F;

    pub fn is_group_or_function_block(address: u8) -> bool {
        address >= GROUP
    }
}

pub mod endpoint_status {
    pub const PRODUCT_INSTANCE_ID: u8 = 0;
}

pub mod nak_status {
    pub const NAK: u8 = 0x00;
    pub const MESSAGE_NOT_SUPPORTED: u8 = 0x01;
    pub const CI_VERSION_NOT_SUPPORTED: u8 = 0x02;
    pub const TARGET_NOT_IN_USE: u8 = 0x03;
    pub const PROFILE_NOT_SUPPORTED: u8 = 0x04;
    pub const TERMINATE_INQUIRY: u8 = 0x20;
    pub const PROPERTY_CHUNKS_OUT_OF_SEQUENCE: u8 = 0x21;
    pub const ERROR_RETRY_SUGGESTED: u8 = 0x40;
    pub const MALFORMED_MESSAGE: u8 = 0x41;
    pub const TIMEOUT: u8 = 0x42;
    pub const TIMEOUT_RETRY_SUGGESTED: u8 = 0x43;
}

/// Bits of the process inquiry "supported features" byte.
pub mod process_inquiry_features {
    pub const MIDI_MESSAGE_REPORT: u8 = 0x01;
}

/// Flags of the MIDI message report inquiry.
pub mod midi_report {
    pub mod data_control {
        pub const NO_DATA: u8 = 0;
        pub const ONLY_NON_DEFAULT: u8 = 1;
        pub const FULL: u8 = 0x7F;
    }

    pub mod system {
        pub const MTC_QUARTER_FRAME: u8 = 0x01;
        pub const SONG_POSITION: u8 = 0x02;
        pub const SONG_SELECT: u8 = 0x04;
    }

    pub mod channel_controller {
        pub const PITCH_BEND: u8 = 0x01;
        pub const CONTROL_CHANGE: u8 = 0x02;
        pub const RPN: u8 = 0x04;
        pub const NRPN: u8 = 0x08;
        pub const PROGRAM_CHANGE: u8 = 0x10;
        pub const CHANNEL_PRESSURE: u8 = 0x20;
    }

    pub mod note_data {
        pub const NOTES: u8 = 0x01;
        pub const POLY_PRESSURE: u8 = 0x02;
    }
}
