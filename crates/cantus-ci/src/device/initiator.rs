//! Initiator role: discovering peers and querying their profiles and properties.
//!
//! Subscriptions move `Subscribing -> Subscribed -> Unsubscribing ->
//! Unsubscribed`. A refused reply (status other than 200) also settles a
//! pending request: a refused subscribe is dropped and reported as
//! `Unsubscribed`, and a refused unsubscribe returns to `Subscribed`, since
//! the responder still holds the subscription.

use std::time::Instant;

use cantus_ump::DeviceDetails;
use tracing::{debug, error, warn};

use super::connection::OpenRequest;
use super::{ClientConnection, ClientSubscription, ConnectionChange, DeviceTask, MidiCiDevice, SubscriptionState, SubscriptionUpdate};
use crate::constants::{address, category, endpoint_status, nak_status, sub_id2};
use crate::message::{AckNak, MessageBody, PropertyData};
use crate::muid::Muid;
use crate::profile::{MidiCiProfile, MidiCiProfileId};
use crate::property::{
    data_request_header, encode_body, property_status, resource_names, status_header, subscription_command,
    subscription_header, RequestHeader,
};
use crate::strategy::MidiMessageReportRequest;

impl MidiCiDevice {
    /// Broadcasts a discovery inquiry.
    pub fn send_discovery(&mut self, group: u8) {
        let body = MessageBody::DiscoveryInquiry {
            device: self.config.device_info.device_details(),
            ci_category_supported: self.config.capability_inquiry_supported,
            receivable_max_sysex_size: self.config.receivable_max_sysex_size,
            output_path_id: self.config.output_path_id,
        };
        self.send_body(group, address::FUNCTION_BLOCK, Muid::BROADCAST, body);
    }

    pub fn send_endpoint_inquiry(&mut self, group: u8, destination: Muid, status: u8) {
        self.send_body(group, address::FUNCTION_BLOCK, destination, MessageBody::EndpointInquiry { status });
    }

    /// Tells every device that `target` is gone and forgets its connection.
    pub fn send_invalidate_muid(&mut self, group: u8, target: Muid) {
        self.remove_connection(target);
        self.forget_peer(target);
        self.send_body(
            group,
            address::FUNCTION_BLOCK,
            Muid::BROADCAST,
            MessageBody::InvalidateMuid { target_muid: target },
        );
    }

    pub fn request_profiles(&mut self, group: u8, address: u8, destination: Muid) {
        self.send_body(group, address, destination, MessageBody::ProfileInquiry);
    }

    pub fn set_profile_on(&mut self, group: u8, address: u8, destination: Muid, profile: MidiCiProfileId, num_channels: u16) {
        let num_channels_requested = if num_channels == 0
            && self.config.profile_channels_for_group_address
            && address::is_group_or_function_block(address)
        {
            1
        } else {
            num_channels
        };
        let body = MessageBody::SetProfileOn {
            profile,
            num_channels_requested,
        };
        self.send_body(group, address, destination, body);
    }

    pub fn set_profile_off(&mut self, group: u8, address: u8, destination: Muid, profile: MidiCiProfileId) {
        self.send_body(group, address, destination, MessageBody::SetProfileOff { profile });
    }

    pub fn request_profile_details(&mut self, group: u8, address: u8, destination: Muid, profile: MidiCiProfileId, target: u8) {
        self.send_body(group, address, destination, MessageBody::ProfileDetailsInquiry { profile, target });
    }

    pub fn send_profile_specific_data(&mut self, group: u8, address: u8, destination: Muid, profile: MidiCiProfileId, data: Vec<u8>) {
        self.send_body(group, address, destination, MessageBody::ProfileSpecificData { profile, data });
    }

    pub fn request_property_capabilities(&mut self, group: u8, destination: Muid) {
        let body = MessageBody::PropertyCapabilitiesInquiry {
            max_simultaneous_requests: self.config.max_simultaneous_property_requests,
            major_version: 0,
            minor_version: 0,
        };
        self.send_body(group, address::FUNCTION_BLOCK, destination, body);
    }

    pub fn send_process_inquiry(&mut self, group: u8, destination: Muid) {
        self.send_body(group, address::FUNCTION_BLOCK, destination, MessageBody::ProcessInquiryCapabilities);
    }

    pub fn request_midi_message_report(&mut self, group: u8, destination: Muid, request: &MidiMessageReportRequest) {
        let body = MessageBody::MidiMessageReportInquiry {
            message_data_control: request.message_data_control,
            system_messages: request.system_messages,
            channel_controller_messages: request.channel_controller_messages,
            note_data_messages: request.note_data_messages,
        };
        self.send_body(group, request.address, destination, body);
    }

    /// Whether a new property request to `destination` may be sent now.
    fn can_request(&self, destination: Muid) -> bool {
        let Some(conn) = self.connections.get(&destination) else {
            warn!(%destination, "no connection to this device");
            return false;
        };
        let max = conn.max_simultaneous_property_requests as usize;
        if max > 0 && conn.open_requests.len() >= max {
            warn!(%destination, max, "too many simultaneous property requests");
            return false;
        }
        true
    }

    /// Sends GetPropertyData and tracks it until the reply arrives. Returns the
    /// request id, or `None` if there is no connection to `destination`.
    pub fn send_get_property_data(&mut self, destination: Muid, resource: &str, encoding: Option<&str>) -> Option<u8> {
        if !self.can_request(destination) {
            return None;
        }
        let request_id = self.next_request_id();
        let request = PropertyData::new(request_id, data_request_header(resource, None, encoding, false), Vec::new());
        let header = RequestHeader {
            resource: resource.to_string(),
            mutual_encoding: encoding.map(str::to_string),
            ..Default::default()
        };
        if let Some(conn) = self.connections.get_mut(&destination) {
            conn.open_requests.push(OpenRequest {
                request: request.clone(),
                header,
                sent: Instant::now(),
            });
        }
        let group = self.peer_group(destination);
        self.send_body(group, address::FUNCTION_BLOCK, destination, MessageBody::GetPropertyData(request));
        Some(request_id)
    }

    /// Sends SetPropertyData with `body` encoded per `encoding`.
    pub fn send_set_property_data(
        &mut self,
        destination: Muid,
        resource: &str,
        body: &[u8],
        encoding: Option<&str>,
        partial: bool,
    ) -> Option<u8> {
        if !self.can_request(destination) {
            return None;
        }
        let body = match encode_body(body, encoding) {
            Ok(body) => body,
            Err(e) => {
                warn!(%destination, error = %e, "cannot encode property body");
                return None;
            }
        };
        let request_id = self.next_request_id();
        let request = PropertyData::new(request_id, data_request_header(resource, None, encoding, partial), body);
        let group = self.peer_group(destination);
        self.send_body(group, address::FUNCTION_BLOCK, destination, MessageBody::SetPropertyData(request));
        Some(request_id)
    }

    pub fn subscribe_property(&mut self, destination: Muid, resource: &str, encoding: Option<&str>) -> Option<u8> {
        if !self.can_request(destination) {
            return None;
        }
        let request_id = self.next_request_id();
        let header = subscription_header(Some(resource), subscription_command::START, encoding, None);
        if let Some(conn) = self.connections.get_mut(&destination) {
            conn.subscriptions
                .push(ClientSubscription::new(request_id, resource, Instant::now()));
        }
        let group = self.peer_group(destination);
        let request = PropertyData::new(request_id, header, Vec::new());
        self.send_body(group, address::FUNCTION_BLOCK, destination, MessageBody::SubscribeProperty(request));
        Some(request_id)
    }

    /// Ends a `Subscribed` subscription on `property_id`.
    pub fn unsubscribe_property(&mut self, destination: Muid, property_id: &str) -> Option<u8> {
        let request_id = self.next_request_id();
        let conn = self.connections.get_mut(&destination)?;
        let Some(sub) = conn
            .subscriptions
            .iter_mut()
            .find(|s| s.property_id == property_id && s.state == SubscriptionState::Subscribed)
        else {
            warn!(%destination, property = property_id, "no active subscription to end");
            return None;
        };
        sub.promote_to_unsubscribing(request_id, Instant::now());
        let update = SubscriptionUpdate {
            muid: destination,
            subscription: sub.clone(),
        };
        let header = subscription_header(
            Some(property_id),
            subscription_command::END,
            None,
            sub.subscription_id.as_deref(),
        );
        self.events.subscription_updated.notify(&update);
        let group = self.peer_group(destination);
        let request = PropertyData::new(request_id, header, Vec::new());
        self.send_body(group, address::FUNCTION_BLOCK, destination, MessageBody::SubscribeProperty(request));
        Some(request_id)
    }

    pub(super) fn remove_connection(&mut self, muid: Muid) {
        if self.connections.remove(&muid).is_some() {
            debug!(%muid, "connection removed");
            self.events.connection_changed.notify(&ConnectionChange::Removed(muid));
        }
    }

    pub(super) fn on_discovery_reply(
        &mut self,
        group: u8,
        source: Muid,
        device: DeviceDetails,
        ci_category_supported: u8,
        max_sysex_size: u32,
    ) {
        // a repeated reply means the peer restarted; start over
        self.remove_connection(source);
        self.connections
            .insert(source, ClientConnection::new(source, device, max_sysex_size));
        debug!(%source, "connection added");
        self.events.connection_changed.notify(&ConnectionChange::Added(source));

        if self.config.auto_send_endpoint_inquiry {
            self.send_endpoint_inquiry(group, source, endpoint_status::PRODUCT_INSTANCE_ID);
        }
        if self.config.auto_send_profile_inquiry && ci_category_supported & category::PROFILE_CONFIGURATION != 0 {
            self.request_profiles(group, address::FUNCTION_BLOCK, source);
        }
        if self.config.auto_send_property_capabilities && ci_category_supported & category::PROPERTY_EXCHANGE != 0 {
            self.request_property_capabilities(group, source);
        }
    }

    pub(super) fn on_endpoint_reply(&mut self, source: Muid, status: u8, data: &[u8]) {
        let Some(conn) = self.connections.get_mut(&source) else {
            warn!(%source, "endpoint reply from unknown device");
            return;
        };
        if status == endpoint_status::PRODUCT_INSTANCE_ID {
            conn.product_instance_id = Some(String::from_utf8_lossy(data).into_owned());
        }
    }

    pub(super) fn on_invalidate_muid(&mut self, group: u8, address: u8, source: Muid, target: Muid) {
        if target == self.muid {
            warn!(%source, "peer invalidated this device's MUID");
        }
        self.remove_connection(target);
        self.forget_peer(target);
        self.property_service.remove_subscriber(target);
        self.send_body(
            group,
            address,
            source,
            MessageBody::Ack(AckNak {
                original_sub_id: sub_id2::INVALIDATE_MUID,
                ..Default::default()
            }),
        );
    }

    pub(super) fn on_profile_reply(
        &mut self,
        group: u8,
        address: u8,
        source: Muid,
        enabled: &[MidiCiProfileId],
        disabled: &[MidiCiProfileId],
    ) {
        let Some(conn) = self.connections.get_mut(&source) else {
            warn!(%source, "profile reply from unknown device");
            return;
        };
        let channels = MidiCiProfile::default_channels(address);
        for (profiles, on) in [(enabled, true), (disabled, false)] {
            for profile in profiles {
                conn.profiles
                    .add(MidiCiProfile::new(*profile, group, address, on, channels));
            }
        }
    }

    pub(super) fn on_profile_report(&mut self, address: u8, source: Muid, profile: MidiCiProfileId, enabled: bool, num_channels: u16) {
        if let Some(conn) = self.connections.get_mut(&source) {
            conn.profiles.set_enabled(enabled, address, &profile, num_channels);
        }
    }

    pub(super) fn on_profile_added(&mut self, group: u8, address: u8, source: Muid, profile: MidiCiProfileId) {
        if let Some(conn) = self.connections.get_mut(&source) {
            let channels = MidiCiProfile::default_channels(address);
            conn.profiles
                .add(MidiCiProfile::new(profile, group, address, false, channels));
        }
    }

    pub(super) fn on_profile_removed(&mut self, group: u8, address: u8, source: Muid, profile: MidiCiProfileId) {
        if let Some(conn) = self.connections.get_mut(&source) {
            conn.profiles.remove(&profile, group, address);
        }
    }

    pub(super) fn on_property_capabilities_reply(&mut self, group: u8, address: u8, source: Muid, max: u8) {
        let Some(conn) = self.connections.get_mut(&source) else {
            warn!(%source, "property capabilities reply from unknown device");
            self.send_nak(group, address, source, sub_id2::PROPERTY_CAPABILITIES_REPLY, nak_status::NAK, "unknown MUID");
            return;
        };
        conn.max_simultaneous_property_requests = max;
        if self.config.auto_send_get_resource_list {
            self.queue(DeviceTask::GetProperty {
                destination: source,
                resource: resource_names::RESOURCE_LIST.to_string(),
            });
        }
    }

    pub(super) fn on_get_property_data_reply(&mut self, source: Muid, data: &PropertyData) {
        let Some(conn) = self.connections.get_mut(&source) else {
            warn!(%source, "property reply from unknown device");
            return;
        };
        let Some(open) = conn.take_open_request(data.request_id) else {
            warn!(%source, request_id = data.request_id, "dropping reply without an open request");
            return;
        };
        let status = RequestHeader::parse(&data.header).ok().and_then(|h| h.status);
        if status != Some(property_status::OK) {
            warn!(%source, property = open.header.property_id(), ?status, "get property data failed");
            return;
        }
        if let Err(e) = conn.properties.apply_get_reply(&open.header, &data.header, &data.body) {
            warn!(%source, property = open.header.property_id(), error = %e, "unusable property reply");
        }
    }

    pub(super) fn on_set_property_data_reply(&mut self, source: Muid, data: &PropertyData) {
        let status = RequestHeader::parse(&data.header).ok().and_then(|h| h.status);
        if status != Some(property_status::OK) {
            warn!(%source, request_id = data.request_id, ?status, "set property data failed");
        }
    }

    /// Applies a reply to one of this device's subscription requests.
    pub(super) fn on_subscribe_property_reply(&mut self, source: Muid, data: &PropertyData) {
        let Some(conn) = self.connections.get_mut(&source) else {
            debug!(%source, "subscription reply from a device without connection");
            return;
        };
        let header = RequestHeader::parse(&data.header).unwrap_or_default();
        let Some(index) = conn.find_subscription(header.subscribe_id.as_deref(), data.request_id) else {
            if header.subscribe_id.is_some() {
                warn!(%source, subscribe_id = ?header.subscribe_id, "reply for unknown subscription");
            } else {
                debug!(%source, request_id = data.request_id, "subscription reply acknowledged");
            }
            return;
        };
        let sub = &mut conn.subscriptions[index];
        if matches!(sub.state, SubscriptionState::Subscribed | SubscriptionState::Unsubscribed) {
            error!(%source, state = ?sub.state, property = %sub.property_id, "subscription reply in a settled state");
            return;
        }
        if sub.pending_request_id != Some(data.request_id) && header.subscribe_id.is_none() {
            warn!(%source, request_id = data.request_id, "subscription reply for another request");
            return;
        }
        if header.is_ok()
            && sub.state == SubscriptionState::Subscribing
            && header.subscribe_id.is_none()
            && !self.config.accept_missing_subscription_id
        {
            error!(%source, property = %sub.property_id, "subscription reply without subscribeId");
            return;
        }

        sub.pending_request_id = None;
        let update = if !header.is_ok() {
            warn!(%source, property = %sub.property_id, status = ?header.status, "subscription request refused");
            if sub.state == SubscriptionState::Subscribing {
                let mut removed = conn.subscriptions.remove(index);
                removed.state = SubscriptionState::Unsubscribed;
                removed
            } else {
                sub.state = SubscriptionState::Subscribed;
                sub.clone()
            }
        } else if sub.state == SubscriptionState::Unsubscribing {
            let mut removed = conn.subscriptions.remove(index);
            removed.state = SubscriptionState::Unsubscribed;
            removed
        } else {
            sub.state = SubscriptionState::Subscribed;
            if header.subscribe_id.is_some() {
                sub.subscription_id = header.subscribe_id.clone();
            }
            sub.clone()
        };
        debug!(%source, property = %update.property_id, state = ?update.state, "subscription updated");
        self.events.subscription_updated.notify(&SubscriptionUpdate {
            muid: source,
            subscription: update,
        });
    }

    /// Handles a subscription update (`full`, `partial`, `notify`, `end`)
    /// from a responder this device subscribed to.
    pub(super) fn on_subscription_update(
        &mut self,
        group: u8,
        address: u8,
        source: Muid,
        header: &RequestHeader,
        data: &PropertyData,
    ) {
        let Some(conn) = self.connections.get_mut(&source) else {
            warn!(%source, "subscription update from unknown device");
            self.send_nak(group, address, source, sub_id2::PROPERTY_SUBSCRIBE, nak_status::NAK, "unknown MUID");
            return;
        };
        let index = header.subscribe_id.as_deref().and_then(|id| {
            conn.subscriptions
                .iter()
                .position(|s| s.subscription_id.as_deref() == Some(id))
        });
        let mut refetch = None;
        let status = match index {
            None => {
                warn!(%source, subscribe_id = ?header.subscribe_id, "update for unknown subscription");
                property_status::NOT_FOUND
            }
            Some(i) => {
                let property_id = conn.subscriptions[i].property_id.clone();
                match header.command.as_deref() {
                    Some(subscription_command::FULL) | Some(subscription_command::PARTIAL) => {
                        match conn.properties.apply_subscription_update(&property_id, header, &data.body) {
                            Ok(()) => property_status::OK,
                            Err(e) => {
                                warn!(%source, property = %property_id, error = %e, "bad subscription update");
                                e.status()
                            }
                        }
                    }
                    Some(subscription_command::NOTIFY) => {
                        refetch = Some(property_id);
                        property_status::OK
                    }
                    Some(subscription_command::END) => {
                        let mut ended = conn.subscriptions.remove(i);
                        ended.state = SubscriptionState::Unsubscribed;
                        ended.pending_request_id = None;
                        debug!(%source, property = %ended.property_id, "subscription ended by responder");
                        self.events.subscription_updated.notify(&SubscriptionUpdate {
                            muid: source,
                            subscription: ended,
                        });
                        property_status::OK
                    }
                    _ => property_status::BAD_REQUEST,
                }
            }
        };
        let reply = PropertyData::new(data.request_id, status_header(status), Vec::new());
        self.send_body(group, address, source, MessageBody::SubscribePropertyReply(reply));
        if let Some(property_id) = refetch {
            self.send_get_property_data(source, &property_id, None);
        }
    }
}
