//! JSON header construction and inspection.

use serde_json::{json, Map, Value};

use super::encoding::encode_ascii;
use super::{header_keys, property_status, subscription_command};
use crate::error::PropertyError;

/// Parses a header or body. An empty slice reads as `null`.
pub fn parse_json(bytes: &[u8]) -> Result<Value, PropertyError> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(bytes)?)
}

/// Compact serialization with non-ASCII escaped, ready for a 7-bit transport.
pub fn to_json_bytes(value: &Value) -> Vec<u8> {
    encode_ascii(&value.to_string()).into_bytes()
}

pub fn header_string(header: &[u8], key: &str) -> Option<String> {
    parse_json(header).ok()?.get(key)?.as_str().map(str::to_string)
}

pub fn header_integer(header: &[u8], key: &str) -> Option<i64> {
    parse_json(header).ok()?.get(key)?.as_i64()
}

pub fn header_bool(header: &[u8], key: &str) -> Option<bool> {
    parse_json(header).ok()?.get(key)?.as_bool()
}

/// The property a header addresses: `resId` when present, otherwise `resource`.
pub fn property_id_for_header(header: &[u8]) -> String {
    header_string(header, header_keys::RES_ID)
        .or_else(|| header_string(header, header_keys::RESOURCE))
        .unwrap_or_default()
}

pub fn status_header(status: u16) -> Vec<u8> {
    to_json_bytes(&json!({ (header_keys::STATUS): status }))
}

pub(crate) fn error_header(error: &PropertyError) -> Vec<u8> {
    to_json_bytes(&json!({
        (header_keys::STATUS): error.status(),
        (header_keys::MESSAGE): error.to_string(),
    }))
}

/// Header for a Get or Set inquiry.
pub fn data_request_header(resource: &str, res_id: Option<&str>, encoding: Option<&str>, set_partial: bool) -> Vec<u8> {
    let mut map = Map::new();
    map.insert(header_keys::RESOURCE.into(), resource.into());
    if let Some(res_id) = res_id {
        map.insert(header_keys::RES_ID.into(), res_id.into());
    }
    if let Some(encoding) = encoding {
        map.insert(header_keys::MUTUAL_ENCODING.into(), encoding.into());
    }
    if set_partial {
        map.insert(header_keys::SET_PARTIAL.into(), true.into());
    }
    to_json_bytes(&Value::Object(map))
}

/// Header for a subscription message. `start` carries the resource, later
/// commands carry the subscribe id.
pub fn subscription_header(
    resource: Option<&str>,
    command: &str,
    encoding: Option<&str>,
    subscribe_id: Option<&str>,
) -> Vec<u8> {
    let mut map = Map::new();
    if let Some(resource) = resource {
        map.insert(header_keys::RESOURCE.into(), resource.into());
    }
    map.insert(header_keys::COMMAND.into(), command.into());
    if let Some(encoding) = encoding {
        map.insert(header_keys::MUTUAL_ENCODING.into(), encoding.into());
    }
    if let Some(id) = subscribe_id {
        map.insert(header_keys::SUBSCRIBE_ID.into(), id.into());
    }
    to_json_bytes(&Value::Object(map))
}

/// The fields of an inquiry header the common rules act on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestHeader {
    pub resource: String,
    pub res_id: Option<String>,
    pub mutual_encoding: Option<String>,
    pub set_partial: bool,
    pub command: Option<String>,
    pub subscribe_id: Option<String>,
    pub status: Option<u16>,
}

impl RequestHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self, PropertyError> {
        let value = parse_json(bytes)?;
        if !value.is_object() {
            return Err(PropertyError::BadRequest("header is not a JSON object".into()));
        }
        let s = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        Ok(Self {
            resource: s(header_keys::RESOURCE).unwrap_or_default(),
            res_id: s(header_keys::RES_ID),
            mutual_encoding: s(header_keys::MUTUAL_ENCODING),
            set_partial: value
                .get(header_keys::SET_PARTIAL)
                .and_then(Value::as_bool)
                .unwrap_or(false),
            command: s(header_keys::COMMAND),
            subscribe_id: s(header_keys::SUBSCRIBE_ID),
            status: value
                .get(header_keys::STATUS)
                .and_then(Value::as_u64)
                .and_then(|v| u16::try_from(v).ok()),
        })
    }

    pub fn property_id(&self) -> &str {
        self.res_id.as_deref().unwrap_or(&self.resource)
    }

    pub fn is_ok(&self) -> bool {
        self.status == Some(property_status::OK)
    }

    pub fn is_command(&self, command: &str) -> bool {
        self.command.as_deref() == Some(command)
    }

    pub fn is_subscription_end(&self) -> bool {
        self.is_command(subscription_command::END)
    }
}
