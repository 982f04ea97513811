//! UMP Stream (type 0xF) messages: endpoint and function block discovery.

use super::text_chunks;
use crate::ump::Ump;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod stream_status {
    pub const ENDPOINT_DISCOVERY: u16 = 0x00;
    pub const ENDPOINT_INFO: u16 = 0x01;
    pub const DEVICE_IDENTITY: u16 = 0x02;
    pub const ENDPOINT_NAME: u16 = 0x03;
    pub const PRODUCT_INSTANCE_ID: u16 = 0x04;
    pub const STREAM_CONFIG_REQUEST: u16 = 0x05;
    pub const STREAM_CONFIG_NOTIFICATION: u16 = 0x06;
    pub const FUNCTION_BLOCK_DISCOVERY: u16 = 0x10;
    pub const FUNCTION_BLOCK_INFO: u16 = 0x11;
    pub const FUNCTION_BLOCK_NAME: u16 = 0x12;
    pub const START_OF_CLIP: u16 = 0x20;
    pub const END_OF_CLIP: u16 = 0x21;
}

/// Endpoint discovery filter bits.
pub mod endpoint_discovery_filter {
    pub const ENDPOINT_INFO: u8 = 1;
    pub const DEVICE_IDENTITY: u8 = 2;
    pub const ENDPOINT_NAME: u8 = 4;
    pub const PRODUCT_INSTANCE_ID: u8 = 8;
    pub const STREAM_CONFIGURATION: u8 = 0x10;
}

/// Function block discovery filter bits.
pub mod function_block_discovery_filter {
    pub const INFO: u8 = 1;
    pub const NAME: u8 = 2;
}

/// A device identity: manufacturer (3 bytes), family, model and version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceDetails {
    pub manufacturer: u32,
    pub family: u16,
    pub model_number: u16,
    pub software_revision_level: u32,
}

impl DeviceDetails {
    pub const fn new(manufacturer: u32, family: u16, model_number: u16, software_revision_level: u32) -> Self {
        Self {
            manufacturer,
            family,
            model_number,
            software_revision_level,
        }
    }
}

fn stream_header(form: u8, status: u16) -> u32 {
    0xF000_0000 | ((form as u32 & 3) << 26) | ((status as u32 & 0x3FF) << 16)
}

/// Text-bearing stream messages. `prefix` occupies the bytes after the status.
fn stream_text(status: u16, prefix: &[u8], text: &[u8]) -> Vec<Ump> {
    let capacity = 14 - prefix.len();
    text_chunks(text, capacity)
        .into_iter()
        .map(|(form, chunk)| {
            let mut bytes = [0u8; 16];
            bytes[0..4].copy_from_slice(&stream_header(form, status).to_be_bytes());
            bytes[2..2 + prefix.len()].copy_from_slice(prefix);
            let start = 2 + prefix.len();
            bytes[start..start + chunk.len()].copy_from_slice(chunk);
            Ump::from_be_bytes(bytes)
        })
        .collect()
}

pub fn endpoint_discovery(ump_version_major: u8, ump_version_minor: u8, filter_bitmap: u8) -> Ump {
    Ump::from_words(
        stream_header(0, stream_status::ENDPOINT_DISCOVERY)
            | ((ump_version_major as u32) << 8)
            | ump_version_minor as u32,
        filter_bitmap as u32,
        0,
        0,
    )
}

#[allow(clippy::too_many_arguments)]
pub fn endpoint_info_notification(
    ump_version_major: u8,
    ump_version_minor: u8,
    static_function_blocks: bool,
    function_block_count: u8,
    midi2_capable: bool,
    midi1_capable: bool,
    supports_rx_jr: bool,
    supports_tx_jr: bool,
) -> Ump {
    Ump::from_words(
        stream_header(0, stream_status::ENDPOINT_INFO)
            | ((ump_version_major as u32) << 8)
            | ump_version_minor as u32,
        ((static_function_blocks as u32) << 31)
            | ((function_block_count as u32 & 0x7F) << 24)
            | ((midi2_capable as u32) << 9)
            | ((midi1_capable as u32) << 8)
            | ((supports_rx_jr as u32) << 1)
            | supports_tx_jr as u32,
        0,
        0,
    )
}

pub fn device_identity_notification(device: &DeviceDetails) -> Ump {
    Ump::from_words(
        stream_header(0, stream_status::DEVICE_IDENTITY),
        device.manufacturer & 0xFF_FFFF,
        ((device.family as u32) << 16) | device.model_number as u32,
        device.software_revision_level,
    )
}

/// Endpoint name, 14 bytes per packet.
pub fn endpoint_name_notification(name: &str) -> Vec<Ump> {
    stream_text(stream_status::ENDPOINT_NAME, &[], name.as_bytes())
}

/// Product instance id, 14 bytes per packet.
pub fn product_instance_id_notification(id: &str) -> Vec<Ump> {
    stream_text(stream_status::PRODUCT_INSTANCE_ID, &[], id.as_bytes())
}

pub fn stream_config_request(protocol: u8, rx_jr_timestamp: bool, tx_jr_timestamp: bool) -> Ump {
    stream_config(stream_status::STREAM_CONFIG_REQUEST, protocol, rx_jr_timestamp, tx_jr_timestamp)
}

pub fn stream_config_notification(protocol: u8, rx_jr_timestamp: bool, tx_jr_timestamp: bool) -> Ump {
    stream_config(
        stream_status::STREAM_CONFIG_NOTIFICATION,
        protocol,
        rx_jr_timestamp,
        tx_jr_timestamp,
    )
}

fn stream_config(status: u16, protocol: u8, rx_jr: bool, tx_jr: bool) -> Ump {
    Ump::from_words(
        stream_header(0, status) | ((protocol as u32) << 8) | ((rx_jr as u32) << 1) | tx_jr as u32,
        0,
        0,
        0,
    )
}

pub fn function_block_discovery(function_block_number: u8, filter: u8) -> Ump {
    Ump::from_words(
        stream_header(0, stream_status::FUNCTION_BLOCK_DISCOVERY)
            | ((function_block_number as u32) << 8)
            | filter as u32,
        0,
        0,
        0,
    )
}

#[allow(clippy::too_many_arguments)]
pub fn function_block_info_notification(
    active: bool,
    function_block_number: u8,
    ui_hint: u8,
    midi1: u8,
    direction: u8,
    first_group: u8,
    number_of_groups: u8,
    midi_ci_version: u8,
    max_sysex8_streams: u8,
) -> Ump {
    Ump::from_words(
        stream_header(0, stream_status::FUNCTION_BLOCK_INFO)
            | ((active as u32) << 15)
            | ((function_block_number as u32 & 0x7F) << 8)
            | ((ui_hint as u32 & 3) << 4)
            | ((midi1 as u32 & 3) << 2)
            | (direction as u32 & 3),
        u32::from_be_bytes([first_group, number_of_groups, midi_ci_version, max_sysex8_streams]),
        0,
        0,
    )
}

/// Function block name, 13 bytes per packet after the block number.
pub fn function_block_name_notification(function_block_number: u8, name: &str) -> Vec<Ump> {
    stream_text(
        stream_status::FUNCTION_BLOCK_NAME,
        &[function_block_number],
        name.as_bytes(),
    )
}
