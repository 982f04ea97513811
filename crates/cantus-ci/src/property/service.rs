//! Responder side of the property exchange common rules.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::encoding::{decode_body, encode_body};
use super::headers::{error_header, parse_json, status_header, to_json_bytes, RequestHeader};
use super::resource::{default_resources, PropertyMetadata, PropertySetAccess};
use super::{header_keys, property_status, resource_names, subscription_command};
use crate::config::MidiCiDeviceInfo;
use crate::error::PropertyError;
use crate::message::PropertyData;
use crate::muid::Muid;
use crate::observer::Listeners;

/// One active subscription held by the responder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySubscription {
    pub property_id: String,
    pub subscriber: Muid,
    pub subscribe_id: String,
    pub encoding: Option<String>,
}

/// Answers Get/Set/Subscribe inquiries from the local catalog.
///
/// `ResourceList` and `DeviceInfo` are built from live state; everything else
/// resolves against the stored values.
#[derive(Debug)]
pub struct CommonRulesPropertyService {
    owner: Muid,
    device_info: MidiCiDeviceInfo,
    metadata: Vec<PropertyMetadata>,
    values: HashMap<String, Value>,
    subscriptions: Vec<PropertySubscription>,
    subscription_serial: u32,
    pub catalog_updated: Listeners<Vec<PropertyMetadata>>,
}

impl CommonRulesPropertyService {
    /// `owner` is the MUID of the answering device; subscribe ids carry it so
    /// they never repeat ids that peers issue.
    pub fn new(owner: Muid, device_info: MidiCiDeviceInfo) -> Self {
        Self {
            owner,
            device_info,
            metadata: default_resources(),
            values: HashMap::new(),
            subscriptions: Vec::new(),
            subscription_serial: 0,
            catalog_updated: Listeners::new(),
        }
    }

    pub fn metadata(&self) -> &[PropertyMetadata] {
        &self.metadata
    }

    pub fn subscriptions(&self) -> &[PropertySubscription] {
        &self.subscriptions
    }

    /// Adds or replaces a catalog entry.
    pub fn add_metadata(&mut self, metadata: PropertyMetadata) {
        match self.metadata.iter_mut().find(|m| m.resource == metadata.resource) {
            Some(existing) => *existing = metadata,
            None => self.metadata.push(metadata),
        }
        self.catalog_updated.notify(&self.metadata);
    }

    pub fn remove_metadata(&mut self, resource: &str) -> Option<PropertyMetadata> {
        let index = self.metadata.iter().position(|m| m.resource == resource)?;
        let removed = self.metadata.remove(index);
        self.values.remove(resource);
        self.catalog_updated.notify(&self.metadata);
        Some(removed)
    }

    pub fn value(&self, property_id: &str) -> Option<&Value> {
        self.values.get(property_id)
    }

    /// Stores a value without any wire traffic.
    pub fn set_value(&mut self, property_id: impl Into<String>, value: Value) {
        self.values.insert(property_id.into(), value);
    }

    fn resource_list(&self) -> Value {
        Value::Array(self.metadata.iter().map(PropertyMetadata::to_json).collect())
    }

    fn get(&self, header: &RequestHeader) -> Result<Value, PropertyError> {
        let id = header.property_id();
        match header.resource.as_str() {
            resource_names::RESOURCE_LIST => return Ok(self.resource_list()),
            resource_names::DEVICE_INFO => return Ok(self.device_info.to_json()),
            _ => {}
        }
        if let Some(value) = self.values.get(id) {
            return Ok(value.clone());
        }
        if resource_names::PLACEHOLDERS.contains(&header.resource.as_str()) {
            return Ok(Value::Object(Map::new()));
        }
        Err(PropertyError::NotFound(id.to_string()))
    }

    fn encoded_reply(&self, header: &RequestHeader, value: &Value) -> Result<(Vec<u8>, Vec<u8>), PropertyError> {
        let encoding = header.mutual_encoding.as_deref();
        let body = encode_body(&to_json_bytes(value), encoding)?;
        let mut reply = Map::new();
        reply.insert(header_keys::STATUS.into(), property_status::OK.into());
        if let Some(encoding) = encoding {
            reply.insert(header_keys::MUTUAL_ENCODING.into(), encoding.into());
        }
        Ok((to_json_bytes(&Value::Object(reply)), body))
    }

    /// Builds the GetPropertyDataReply for an inquiry. Failures become a
    /// status header with an empty body.
    pub fn get_property_data(&self, request: &PropertyData) -> PropertyData {
        let result = RequestHeader::parse(&request.header).and_then(|header| {
            let value = self.get(&header)?;
            self.encoded_reply(&header, &value)
        });
        reply_or_error(request.request_id, result)
    }

    fn set(&mut self, header: &RequestHeader, body: &[u8]) -> Result<String, PropertyError> {
        let id = header.property_id().to_string();
        if matches!(
            header.resource.as_str(),
            resource_names::RESOURCE_LIST
                | resource_names::DEVICE_INFO
                | resource_names::JSON_SCHEMA
                | resource_names::CHANNEL_LIST
        ) {
            return Err(PropertyError::ReadOnly(header.resource.clone()));
        }
        let metadata = self.metadata.iter().find(|m| m.resource == header.resource);
        if metadata.is_none() && !self.values.contains_key(&id) {
            return Err(PropertyError::NotFound(id));
        }
        if let Some(m) = metadata {
            let allowed = match m.can_set {
                PropertySetAccess::None => false,
                PropertySetAccess::Full => !header.set_partial,
                PropertySetAccess::Partial => true,
            };
            if !allowed {
                return Err(PropertyError::NotAllowed(format!("set on {}", m.resource)));
            }
        }

        let decoded = decode_body(body, header.mutual_encoding.as_deref())?;
        let value = parse_json(&decoded)?;
        if header.set_partial {
            let target = self
                .values
                .get_mut(&id)
                .ok_or_else(|| PropertyError::BadRequest(format!("no value of {id} to patch")))?;
            apply_partial(target, &value)?;
        } else {
            self.values.insert(id.clone(), value);
        }
        Ok(id)
    }

    /// Handles a SetPropertyData inquiry. Returns the reply and, on success,
    /// the property id whose value changed.
    pub fn set_property_data(&mut self, request: &PropertyData) -> (PropertyData, Option<String>) {
        let result = RequestHeader::parse(&request.header).and_then(|header| self.set(&header, &request.body));
        match result {
            Ok(id) => {
                debug!(property = %id, "property set");
                let reply = PropertyData::new(request.request_id, status_header(property_status::OK), Vec::new());
                (reply, Some(id))
            }
            Err(e) => {
                warn!(error = %e, "set property data rejected");
                (PropertyData::new(request.request_id, error_header(&e), Vec::new()), None)
            }
        }
    }

    fn subscribe(&mut self, subscriber: Muid, header: &RequestHeader) -> Result<Value, PropertyError> {
        match header.command.as_deref() {
            Some(subscription_command::START) => {
                let id = header.property_id().to_string();
                self.get(header)?;
                if let Some(m) = self.metadata.iter().find(|m| m.resource == header.resource) {
                    if !m.can_subscribe {
                        return Err(PropertyError::NotAllowed(format!("subscribe to {}", m.resource)));
                    }
                }
                self.subscription_serial += 1;
                let subscribe_id = format!("{:08x}-{}", self.owner.value(), self.subscription_serial);
                debug!(%subscriber, property = %id, %subscribe_id, "subscription started");
                self.subscriptions.push(PropertySubscription {
                    property_id: id,
                    subscriber,
                    subscribe_id: subscribe_id.clone(),
                    encoding: header.mutual_encoding.clone(),
                });
                let mut reply = Map::new();
                reply.insert(header_keys::STATUS.into(), property_status::OK.into());
                reply.insert(header_keys::SUBSCRIBE_ID.into(), subscribe_id.into());
                Ok(Value::Object(reply))
            }
            Some(subscription_command::END) => {
                let before = self.subscriptions.len();
                self.subscriptions.retain(|s| {
                    let matches = match &header.subscribe_id {
                        Some(id) => &s.subscribe_id == id,
                        None => s.property_id == header.property_id(),
                    };
                    !(matches && s.subscriber == subscriber)
                });
                if self.subscriptions.len() == before {
                    return Err(PropertyError::NotFound(
                        header.subscribe_id.clone().unwrap_or_else(|| header.property_id().to_string()),
                    ));
                }
                Ok(serde_json::json!({ (header_keys::STATUS): property_status::OK }))
            }
            other => Err(PropertyError::BadRequest(format!(
                "unexpected subscription command {:?}",
                other.unwrap_or("")
            ))),
        }
    }

    /// Handles a SubscribeProperty inquiry (`start` or `end`) from `subscriber`.
    pub fn subscribe_property(&mut self, subscriber: Muid, request: &PropertyData) -> PropertyData {
        let result = RequestHeader::parse(&request.header).and_then(|header| self.subscribe(subscriber, &header));
        match result {
            Ok(header) => PropertyData::new(request.request_id, to_json_bytes(&header), Vec::new()),
            Err(e) => {
                warn!(%subscriber, error = %e, "subscription rejected");
                PropertyData::new(request.request_id, error_header(&e), Vec::new())
            }
        }
    }

    /// Whether `subscriber` holds the subscription named by an `end` header.
    pub fn has_subscription(&self, subscriber: Muid, subscribe_id: &str) -> bool {
        self.subscriptions
            .iter()
            .any(|s| s.subscriber == subscriber && s.subscribe_id == subscribe_id)
    }

    /// `full` notifications (destination, header, body) for every subscriber of `property_id`.
    pub fn update_notifications(&self, property_id: &str) -> Vec<(Muid, Vec<u8>, Vec<u8>)> {
        let Some(value) = self.values.get(property_id) else {
            return Vec::new();
        };
        self.subscriptions
            .iter()
            .filter(|s| s.property_id == property_id)
            .filter_map(|s| {
                let body = match encode_body(&to_json_bytes(value), s.encoding.as_deref()) {
                    Ok(body) => body,
                    Err(e) => {
                        warn!(subscriber = %s.subscriber, error = %e, "cannot encode notification");
                        return None;
                    }
                };
                let mut header = Map::new();
                header.insert(header_keys::COMMAND.into(), subscription_command::FULL.into());
                header.insert(header_keys::SUBSCRIBE_ID.into(), s.subscribe_id.clone().into());
                if let Some(encoding) = &s.encoding {
                    header.insert(header_keys::MUTUAL_ENCODING.into(), encoding.clone().into());
                }
                Some((s.subscriber, to_json_bytes(&Value::Object(header)), body))
            })
            .collect()
    }

    /// Removes every subscription, returning an `end` header per subscriber.
    pub fn terminate_subscriptions(&mut self) -> Vec<(Muid, Vec<u8>)> {
        self.subscriptions
            .drain(..)
            .map(|s| {
                let mut header = Map::new();
                header.insert(header_keys::COMMAND.into(), subscription_command::END.into());
                header.insert(header_keys::SUBSCRIBE_ID.into(), s.subscribe_id.into());
                (s.subscriber, to_json_bytes(&Value::Object(header)))
            })
            .collect()
    }

    /// Drops subscriptions of a peer that went away.
    pub fn remove_subscriber(&mut self, subscriber: Muid) {
        self.subscriptions.retain(|s| s.subscriber != subscriber);
    }
}

fn reply_or_error(request_id: u8, result: Result<(Vec<u8>, Vec<u8>), PropertyError>) -> PropertyData {
    match result {
        Ok((header, body)) => PropertyData::new(request_id, header, body),
        Err(e) => {
            warn!(request_id, error = %e, "get property data failed");
            PropertyData::new(request_id, error_header(&e), Vec::new())
        }
    }
}

/// Applies an object of `{ "/json/pointer": value }` entries to `target`.
pub(crate) fn apply_partial(target: &mut Value, patch: &Value) -> Result<(), PropertyError> {
    let entries = patch
        .as_object()
        .ok_or_else(|| PropertyError::BadRequest("partial body must be an object".into()))?;
    for (pointer, value) in entries {
        let slot = target
            .pointer_mut(pointer)
            .ok_or_else(|| PropertyError::BadRequest(format!("no such field {pointer}")))?;
        *slot = value.clone();
    }
    Ok(())
}
