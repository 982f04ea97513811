//! Initiator side view of a remote device's properties.

use serde_json::Value;
use tracing::{debug, warn};

use super::encoding::decode_body;
use super::headers::{parse_json, RequestHeader};
use super::resource::PropertyMetadata;
use super::resource_names;
use super::service::apply_partial;
use crate::error::PropertyError;

/// The last known body of a remote property, already decoded from its
/// transfer encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientPropertyValue {
    pub id: String,
    pub media_type: String,
    pub body: Vec<u8>,
}

impl ClientPropertyValue {
    pub fn json(&self) -> Result<Value, PropertyError> {
        parse_json(&self.body)
    }
}

/// Emitted whenever a value in a [`ClientPropertyList`] changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyValueUpdate {
    pub property_id: String,
    pub body: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct ClientPropertyList {
    values: Vec<ClientPropertyValue>,
    resources: Vec<PropertyMetadata>,
    pub value_updated: crate::observer::Listeners<PropertyValueUpdate>,
    pub catalog_updated: crate::observer::Listeners<Vec<String>>,
}

impl ClientPropertyList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resource names from the last `ResourceList` reply, in reply order.
    pub fn property_ids(&self) -> Vec<String> {
        self.resources.iter().map(|r| r.resource.clone()).collect()
    }

    pub fn metadata(&self, resource: &str) -> Option<&PropertyMetadata> {
        self.resources.iter().find(|r| r.resource == resource)
    }

    pub fn values(&self) -> &[ClientPropertyValue] {
        &self.values
    }

    pub fn value(&self, property_id: &str) -> Option<&ClientPropertyValue> {
        self.values.iter().find(|v| v.id == property_id)
    }

    fn store(&mut self, property_id: &str, media_type: Option<&str>, body: Vec<u8>) {
        let media_type = media_type.unwrap_or("application/json").to_string();
        match self.values.iter_mut().find(|v| v.id == property_id) {
            Some(existing) => {
                existing.body = body.clone();
                existing.media_type = media_type;
            }
            None => self.values.push(ClientPropertyValue {
                id: property_id.to_string(),
                media_type,
                body: body.clone(),
            }),
        }
        self.value_updated.notify(&PropertyValueUpdate {
            property_id: property_id.to_string(),
            body,
        });
    }

    fn replace_resources(&mut self, body: &[u8]) -> Result<(), PropertyError> {
        let list = parse_json(body)?;
        let entries = list
            .as_array()
            .ok_or_else(|| PropertyError::BadRequest("ResourceList body is not an array".into()))?;
        self.resources = entries.iter().filter_map(PropertyMetadata::from_json).collect();
        debug!(count = self.resources.len(), "resource list updated");
        self.catalog_updated.notify(&self.property_ids());
        Ok(())
    }

    /// Applies a successful GetPropertyDataReply to the inquiry that caused it.
    pub fn apply_get_reply(&mut self, request: &RequestHeader, reply_header: &[u8], reply_body: &[u8]) -> Result<(), PropertyError> {
        let reply = RequestHeader::parse(reply_header)?;
        let body = decode_body(reply_body, reply.mutual_encoding.as_deref())?;
        if request.resource == resource_names::RESOURCE_LIST {
            self.replace_resources(&body)?;
        }
        let media_type = super::headers::header_string(reply_header, super::header_keys::MEDIA_TYPE);
        self.store(request.property_id(), media_type.as_deref(), body);
        Ok(())
    }

    /// Applies a `full` or `partial` subscription update from the responder.
    pub fn apply_subscription_update(&mut self, property_id: &str, header: &RequestHeader, body: &[u8]) -> Result<(), PropertyError> {
        let body = decode_body(body, header.mutual_encoding.as_deref())?;
        if header.is_command(super::subscription_command::PARTIAL) {
            let mut current = self
                .value(property_id)
                .map(ClientPropertyValue::json)
                .transpose()?
                .ok_or_else(|| PropertyError::BadRequest(format!("no value of {property_id} to patch")))?;
            apply_partial(&mut current, &parse_json(&body)?)?;
            self.store(property_id, None, super::headers::to_json_bytes(&current));
        } else {
            if property_id == resource_names::RESOURCE_LIST {
                if let Err(e) = self.replace_resources(&body) {
                    warn!(error = %e, "ignoring malformed ResourceList update");
                }
            }
            self.store(property_id, None, body);
        }
        Ok(())
    }
}
