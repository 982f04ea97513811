//! What an initiator knows about one remote device.

use std::time::Instant;

use cantus_ump::DeviceDetails;

use crate::message::PropertyData;
use crate::muid::Muid;
use crate::profile::ObservableProfileList;
use crate::property::{ClientPropertyList, RequestHeader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Subscribing,
    Subscribed,
    Unsubscribing,
    Unsubscribed,
}

/// A subscription this device holds on a remote property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSubscription {
    /// Request id of the inquiry awaiting a reply, if any.
    pub pending_request_id: Option<u8>,
    pub subscription_id: Option<String>,
    pub property_id: String,
    pub state: SubscriptionState,
    pub(crate) since: Instant,
}

impl ClientSubscription {
    pub(crate) fn new(request_id: u8, property_id: impl Into<String>, now: Instant) -> Self {
        Self {
            pending_request_id: Some(request_id),
            subscription_id: None,
            property_id: property_id.into(),
            state: SubscriptionState::Subscribing,
            since: now,
        }
    }

    /// Moves a `Subscribed` entry to `Unsubscribing` for the given request.
    pub(crate) fn promote_to_unsubscribing(&mut self, request_id: u8, now: Instant) {
        self.pending_request_id = Some(request_id);
        self.state = SubscriptionState::Unsubscribing;
        self.since = now;
    }
}

/// A Get inquiry awaiting its reply.
#[derive(Debug, Clone)]
pub(crate) struct OpenRequest {
    pub(crate) request: PropertyData,
    pub(crate) header: RequestHeader,
    pub(crate) sent: Instant,
}

/// Per-peer state, created on a discovery reply and dropped on invalidation.
#[derive(Debug)]
pub struct ClientConnection {
    pub(crate) target_muid: Muid,
    pub(crate) device: DeviceDetails,
    pub(crate) max_sysex_size: u32,
    pub(crate) max_simultaneous_property_requests: u8,
    pub(crate) product_instance_id: Option<String>,
    pub(crate) profiles: ObservableProfileList,
    pub(crate) properties: ClientPropertyList,
    pub(crate) open_requests: Vec<OpenRequest>,
    pub(crate) subscriptions: Vec<ClientSubscription>,
}

impl ClientConnection {
    pub(crate) fn new(target_muid: Muid, device: DeviceDetails, max_sysex_size: u32) -> Self {
        Self {
            target_muid,
            device,
            max_sysex_size,
            max_simultaneous_property_requests: 0,
            product_instance_id: None,
            profiles: ObservableProfileList::new(),
            properties: ClientPropertyList::new(),
            open_requests: Vec::new(),
            subscriptions: Vec::new(),
        }
    }

    pub fn target_muid(&self) -> Muid {
        self.target_muid
    }

    pub fn device(&self) -> &DeviceDetails {
        &self.device
    }

    pub fn max_sysex_size(&self) -> u32 {
        self.max_sysex_size
    }

    /// Zero until the peer answered a property capabilities inquiry.
    pub fn max_simultaneous_property_requests(&self) -> u8 {
        self.max_simultaneous_property_requests
    }

    pub fn product_instance_id(&self) -> Option<&str> {
        self.product_instance_id.as_deref()
    }

    pub fn profiles(&self) -> &ObservableProfileList {
        &self.profiles
    }

    pub fn properties(&self) -> &ClientPropertyList {
        &self.properties
    }

    /// Resource names from the peer's `ResourceList`.
    pub fn property_ids(&self) -> Vec<String> {
        self.properties.property_ids()
    }

    pub fn subscriptions(&self) -> &[ClientSubscription] {
        &self.subscriptions
    }

    pub fn open_request_count(&self) -> usize {
        self.open_requests.len()
    }

    pub(crate) fn take_open_request(&mut self, request_id: u8) -> Option<OpenRequest> {
        let index = self
            .open_requests
            .iter()
            .position(|r| r.request.request_id == request_id)?;
        Some(self.open_requests.remove(index))
    }

    /// Index of the subscription a reply refers to: by subscribe id first,
    /// then by the pending request id.
    pub(crate) fn find_subscription(&self, subscribe_id: Option<&str>, request_id: u8) -> Option<usize> {
        subscribe_id
            .and_then(|id| {
                self.subscriptions
                    .iter()
                    .position(|s| s.subscription_id.as_deref() == Some(id))
            })
            .or_else(|| {
                self.subscriptions
                    .iter()
                    .position(|s| s.pending_request_id == Some(request_id))
            })
    }
}
