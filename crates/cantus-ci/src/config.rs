//! Device identity and behavior configuration.

use std::time::Duration;

use cantus_ump::DeviceDetails;
use serde_json::{json, Value};

use crate::constants::{
    category, DEFAULT_MAX_PROPERTY_CHUNK_SIZE, DEFAULT_RECEIVABLE_MAX_SYSEX_SIZE, MAX_PRODUCT_INSTANCE_ID_LENGTH,
    MAX_U14, NO_FUNCTION_BLOCK,
};
use crate::error::{Error, Result};
use crate::property::device_info_keys as keys;

/// Identity published in discovery replies and the `DeviceInfo` resource.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MidiCiDeviceInfo {
    pub manufacturer_id: u32,
    pub family_id: u16,
    pub model_id: u16,
    pub version_id: u32,
    pub manufacturer: String,
    pub family: String,
    pub model: String,
    pub version: String,
    pub serial_number: Option<String>,
}

impl MidiCiDeviceInfo {
    pub fn device_details(&self) -> DeviceDetails {
        DeviceDetails::new(self.manufacturer_id, self.family_id, self.model_id, self.version_id)
    }

    /// The `DeviceInfo` resource body. Ids are sent as arrays of 7-bit bytes, LSB first.
    pub fn to_json(&self) -> Value {
        let bytes = |v: u32, n: usize| (0..n).map(|i| (v >> (i * 8)) & 0x7F).collect::<Vec<_>>();
        let mut value = json!({
            (keys::MANUFACTURER_ID): bytes(self.manufacturer_id, 3),
            (keys::FAMILY_ID): bytes(self.family_id.into(), 2),
            (keys::MODEL_ID): bytes(self.model_id.into(), 2),
            (keys::VERSION_ID): bytes(self.version_id, 4),
            (keys::MANUFACTURER): self.manufacturer,
            (keys::FAMILY): self.family,
            (keys::MODEL): self.model,
            (keys::VERSION): self.version,
        });
        if let (Some(serial), Some(map)) = (&self.serial_number, value.as_object_mut()) {
            map.insert(keys::SERIAL_NUMBER.into(), serial.clone().into());
        }
        value
    }
}

/// Configuration for a [`MidiCiDevice`](crate::MidiCiDevice).
#[derive(Debug, Clone)]
pub struct MidiCiDeviceConfig {
    pub device_info: MidiCiDeviceInfo,
    /// Category bitmask advertised in discovery.
    pub capability_inquiry_supported: u8,
    pub receivable_max_sysex_size: u32,
    pub max_simultaneous_property_requests: u8,
    pub max_property_chunk_size: usize,
    pub product_instance_id: String,
    pub function_block: u8,
    pub output_path_id: u8,

    pub auto_send_endpoint_inquiry: bool,
    pub auto_send_profile_inquiry: bool,
    pub auto_send_property_capabilities: bool,
    pub auto_send_get_resource_list: bool,

    /// Peer omits `subscribeId` in subscription replies; match by request id instead.
    pub accept_missing_subscription_id: bool,
    /// Peer expects 1 instead of 0 channels when a profile is set at a group or function block.
    pub profile_channels_for_group_address: bool,

    /// Lifetime of open requests, chunk assemblies and pending subscriptions.
    /// `None` never expires them.
    pub request_timeout: Option<Duration>,
}

impl Default for MidiCiDeviceConfig {
    fn default() -> Self {
        Self {
            device_info: MidiCiDeviceInfo::default(),
            capability_inquiry_supported: category::THREE_P,
            receivable_max_sysex_size: DEFAULT_RECEIVABLE_MAX_SYSEX_SIZE,
            max_simultaneous_property_requests: 127,
            max_property_chunk_size: DEFAULT_MAX_PROPERTY_CHUNK_SIZE,
            product_instance_id: String::new(),
            function_block: NO_FUNCTION_BLOCK,
            output_path_id: 0,
            auto_send_endpoint_inquiry: true,
            auto_send_profile_inquiry: true,
            auto_send_property_capabilities: true,
            auto_send_get_resource_list: true,
            accept_missing_subscription_id: false,
            profile_channels_for_group_address: false,
            request_timeout: None,
        }
    }
}

impl MidiCiDeviceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.receivable_max_sysex_size < 128 || self.receivable_max_sysex_size > 0x0FFF_FFFF {
            return Err(Error::InvalidConfig(format!(
                "receivable_max_sysex_size must be in 128..=0x0FFFFFFF, got {}",
                self.receivable_max_sysex_size
            )));
        }
        if self.max_simultaneous_property_requests == 0 || self.max_simultaneous_property_requests > 0x7F {
            return Err(Error::InvalidConfig(format!(
                "max_simultaneous_property_requests must be in 1..=127, got {}",
                self.max_simultaneous_property_requests
            )));
        }
        let chunk_limit = (self.receivable_max_sysex_size as usize - 1).min(MAX_U14);
        if self.max_property_chunk_size == 0 || self.max_property_chunk_size > chunk_limit {
            return Err(Error::InvalidConfig(format!(
                "max_property_chunk_size must be in 1..={chunk_limit}, got {}",
                self.max_property_chunk_size
            )));
        }
        check_product_instance_id(&self.product_instance_id).map_err(|e| match e {
            Error::Configuration(msg) => Error::InvalidConfig(msg),
            other => other,
        })?;
        if self.function_block > 0x7F || self.output_path_id > 0x7F {
            return Err(Error::InvalidConfig("function_block and output_path_id must be 7-bit".into()));
        }
        if self.device_info.manufacturer_id > 0x7F_7F_7F
            || self.device_info.manufacturer_id & 0x80_80_80 != 0
            || self.device_info.family_id & 0x8080 != 0
            || self.device_info.model_id & 0x8080 != 0
            || self.device_info.version_id & 0x8080_8080 != 0
        {
            return Err(Error::InvalidConfig("device identity bytes must be 7-bit".into()));
        }
        Ok(())
    }
}

/// Product instance ids are ASCII and at most 16 bytes.
pub(crate) fn check_product_instance_id(id: &str) -> Result<()> {
    if id.len() > MAX_PRODUCT_INSTANCE_ID_LENGTH {
        return Err(Error::Configuration(format!(
            "product instance id is {} bytes, the limit is {MAX_PRODUCT_INSTANCE_ID_LENGTH}",
            id.len()
        )));
    }
    if !id.is_ascii() {
        return Err(Error::Configuration("product instance id must be ASCII".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validates() {
        let config = MidiCiDeviceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.capability_inquiry_supported, 0x1C);
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn test_validate_rejects() {
        let mut config = MidiCiDeviceConfig {
            receivable_max_sysex_size: 64,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        config.receivable_max_sysex_size = 4096;
        config.max_property_chunk_size = 4096;
        assert!(config.validate().is_err());

        // body length fields are 14-bit
        config.receivable_max_sysex_size = 0x10000;
        config.max_property_chunk_size = 20000;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
        config.max_property_chunk_size = 0x3FFF;
        assert!(config.validate().is_ok());

        config.max_property_chunk_size = 256;
        config.product_instance_id = "x".repeat(17);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        config.product_instance_id = "unit-1".into();
        config.max_simultaneous_property_requests = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_device_info_json() {
        let info = MidiCiDeviceInfo {
            manufacturer_id: 0x563412,
            family_id: 0x0102,
            model_id: 0x0304,
            version_id: 0x01020304,
            manufacturer: "Cantus".into(),
            family: "Synths".into(),
            model: "One".into(),
            version: "1.0".into(),
            serial_number: Some("0001".into()),
        };
        let json = info.to_json();
        assert_eq!(json["manufacturerId"], json!([0x12, 0x34, 0x56]));
        assert_eq!(json["versionId"], json!([4, 3, 2, 1]));
        assert_eq!(json["serialNumber"], "0001");
        assert_eq!(info.device_details().family, 0x0102);
    }
}
