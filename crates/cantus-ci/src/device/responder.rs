//! Responder role: answering inquiries about local profiles and properties.

use serde_json::Value;
use tracing::{debug, error, warn};

use super::{MidiCiDevice, ProfileSet};
use crate::config::check_product_instance_id;
use crate::constants::{address, category, endpoint_status, nak_status, process_inquiry_features, sub_id2};
use crate::error::Result;
use crate::message::{MessageBody, PropertyData};
use crate::muid::Muid;
use crate::profile::{MidiCiProfile, MidiCiProfileId};
use crate::strategy::MidiMessageReportRequest;

impl MidiCiDevice {
    /// Registers a local profile and announces it with a profile added report.
    pub fn add_local_profile(&mut self, profile: MidiCiProfile) {
        let (group, address, id) = (profile.group, profile.address, profile.profile);
        self.local_profiles.add(profile);
        self.send_body(group, address, Muid::BROADCAST, MessageBody::ProfileAddedReport { profile: id });
    }

    pub fn remove_local_profile(&mut self, group: u8, address: u8, profile: &MidiCiProfileId) -> Option<MidiCiProfile> {
        let removed = self.local_profiles.remove(profile, group, address)?;
        self.send_body(group, address, Muid::BROADCAST, MessageBody::ProfileRemovedReport { profile: *profile });
        Some(removed)
    }

    /// Enables or disables a local profile, sending a report if its state changed.
    pub fn set_local_profile_enabled(
        &mut self,
        group: u8,
        address: u8,
        profile: &MidiCiProfileId,
        enabled: bool,
        num_channels: u16,
    ) -> bool {
        let changed = self.local_profiles.set_enabled(enabled, address, profile, num_channels);
        if changed {
            self.send_profile_report(group, address, *profile, enabled, num_channels);
        }
        changed
    }

    fn send_profile_report(&mut self, group: u8, address: u8, profile: MidiCiProfileId, enabled: bool, num_channels: u16) {
        let body = if enabled {
            MessageBody::ProfileEnabledReport { profile, num_channels }
        } else {
            MessageBody::ProfileDisabledReport { profile, num_channels }
        };
        self.send_body(group, address, Muid::BROADCAST, body);
    }

    /// Stores a new property value and sends a `full` update to its subscribers.
    pub fn update_property_value(&mut self, property_id: &str, value: Value) {
        self.property_service.set_value(property_id, value);
        self.notify_subscribers(property_id);
    }

    fn notify_subscribers(&mut self, property_id: &str) {
        for (subscriber, header, body) in self.property_service.update_notifications(property_id) {
            let request_id = self.next_request_id();
            let group = self.peer_group(subscriber);
            debug!(%subscriber, property = property_id, request_id, "sending subscription update");
            let data = PropertyData::new(request_id, header, body);
            self.send_body(group, address::FUNCTION_BLOCK, subscriber, MessageBody::SubscribeProperty(data));
        }
    }

    /// Ends every subscription held by peers, sending an `end` command to each.
    pub fn terminate_subscriptions(&mut self) {
        for (subscriber, header) in self.property_service.terminate_subscriptions() {
            let request_id = self.next_request_id();
            let group = self.peer_group(subscriber);
            let data = PropertyData::new(request_id, header, Vec::new());
            self.send_body(group, address::FUNCTION_BLOCK, subscriber, MessageBody::SubscribeProperty(data));
        }
    }

    pub(super) fn reply_discovery(&mut self, group: u8, source: Muid, output_path_id: u8) {
        let body = MessageBody::DiscoveryReply {
            device: self.config.device_info.device_details(),
            ci_category_supported: self.config.capability_inquiry_supported,
            receivable_max_sysex_size: self.config.receivable_max_sysex_size,
            output_path_id,
            function_block: self.config.function_block,
        };
        self.send_body(group, address::FUNCTION_BLOCK, source, body);
    }

    pub(super) fn reply_endpoint(&mut self, group: u8, source: Muid, status: u8) -> Result<()> {
        let data = if status == endpoint_status::PRODUCT_INSTANCE_ID {
            let id = &self.config.product_instance_id;
            if let Err(e) = check_product_instance_id(id) {
                error!(error = %e, "cannot reply to endpoint inquiry");
                return Err(e);
            }
            id.as_bytes().to_vec()
        } else {
            Vec::new()
        };
        self.send_body(group, address::FUNCTION_BLOCK, source, MessageBody::EndpointReply { status, data });
        Ok(())
    }

    /// Group and function block inquiries get one reply per address holding
    /// profiles, in ascending address order.
    pub(super) fn reply_profile_inquiry(&mut self, group: u8, address: u8, source: Muid) {
        let addresses = if address::is_group_or_function_block(address) {
            self.local_profiles.addresses()
        } else {
            vec![address]
        };
        let addresses = if addresses.is_empty() { vec![address] } else { addresses };
        for target in addresses {
            let body = MessageBody::ProfileReply {
                enabled_profiles: self.local_profiles.matching_profiles(target, true),
                disabled_profiles: self.local_profiles.matching_profiles(target, false),
            };
            self.send_body(group, target, source, body);
        }
    }

    pub(super) fn on_set_profile(
        &mut self,
        group: u8,
        address: u8,
        source: Muid,
        profile: MidiCiProfileId,
        enabled: bool,
        num_channels: u16,
    ) {
        let requested = MidiCiProfile::new(profile, group, address, enabled, num_channels);
        if !self.strategy.accept_set_profile(&requested, num_channels) {
            debug!(%source, %profile, enabled, "set profile refused");
            let original = if enabled {
                sub_id2::SET_PROFILE_ON
            } else {
                sub_id2::SET_PROFILE_OFF
            };
            self.send_nak(group, address, source, original, nak_status::PROFILE_NOT_SUPPORTED, "profile not supported");
            return;
        }

        let was_enabled = self.local_profiles.find(&profile, address).map(|p| p.enabled);
        match was_enabled {
            Some(_) => {
                self.local_profiles.set_enabled(enabled, address, &profile, num_channels);
            }
            None => self.local_profiles.add(requested.clone()),
        }
        self.events.profile_set.notify(&ProfileSet {
            profile: requested,
            num_channels_requested: num_channels,
        });
        if was_enabled.unwrap_or(false) != enabled {
            self.send_profile_report(group, address, profile, enabled, num_channels);
        } else {
            debug!(%source, %profile, enabled, "profile state unchanged");
        }
    }

    pub(super) fn reply_profile_details(&mut self, group: u8, address: u8, source: Muid, profile: MidiCiProfileId, target: u8) {
        if self.local_profiles.find(&profile, address).is_none() {
            warn!(%source, %profile, address, "details requested for unknown profile");
            self.send_nak(group, address, source, sub_id2::PROFILE_DETAILS_INQUIRY, nak_status::PROFILE_NOT_SUPPORTED, "profile not supported");
            return;
        }
        match self.strategy.profile_details(&profile, target) {
            Some(data) => {
                self.send_body(group, address, source, MessageBody::ProfileDetailsReply { profile, target, data });
            }
            None => {
                self.send_nak(group, address, source, sub_id2::PROFILE_DETAILS_INQUIRY, nak_status::NAK, "no details for target");
            }
        }
    }

    pub(super) fn reply_property_capabilities(&mut self, group: u8, address: u8, source: Muid, max: u8) {
        let established = max.min(self.config.max_simultaneous_property_requests);
        let body = MessageBody::PropertyCapabilitiesReply {
            max_simultaneous_requests: established,
            major_version: 0,
            minor_version: 0,
        };
        self.send_body(group, address, source, body);
    }

    pub(super) fn reply_get_property_data(&mut self, group: u8, address: u8, source: Muid, data: &PropertyData) {
        let reply = self.property_service.get_property_data(data);
        self.send_body(group, address, source, MessageBody::GetPropertyDataReply(reply));
    }

    pub(super) fn reply_set_property_data(&mut self, group: u8, address: u8, source: Muid, data: &PropertyData) {
        let (reply, changed) = self.property_service.set_property_data(data);
        self.send_body(group, address, source, MessageBody::SetPropertyDataReply(reply));
        if let Some(property_id) = changed {
            self.notify_subscribers(&property_id);
        }
    }

    pub(super) fn reply_subscribe_property(&mut self, group: u8, address: u8, source: Muid, data: &PropertyData) {
        let reply = self.property_service.subscribe_property(source, data);
        self.send_body(group, address, source, MessageBody::SubscribePropertyReply(reply));
    }

    fn supports_process_inquiry(&self) -> bool {
        self.config.capability_inquiry_supported & category::PROCESS_INQUIRY != 0
    }

    pub(super) fn reply_process_inquiry(&mut self, group: u8, address: u8, source: Muid) {
        if !self.supports_process_inquiry() {
            self.send_nak(group, address, source, sub_id2::PROCESS_INQUIRY_CAPABILITIES, nak_status::MESSAGE_NOT_SUPPORTED, "process inquiry not supported");
            return;
        }
        let body = MessageBody::ProcessInquiryCapabilitiesReply {
            supported_features: process_inquiry_features::MIDI_MESSAGE_REPORT,
        };
        self.send_body(group, address, source, body);
    }

    /// Replies with the report flags, streams the reported MIDI 1.0 messages
    /// through the report output, then ends the report.
    pub(super) fn reply_midi_message_report(&mut self, group: u8, source: Muid, request: MidiMessageReportRequest) {
        if !self.supports_process_inquiry() {
            self.send_nak(group, request.address, source, sub_id2::MIDI_MESSAGE_REPORT_INQUIRY, nak_status::MESSAGE_NOT_SUPPORTED, "process inquiry not supported");
            return;
        }
        let reply = MessageBody::MidiMessageReportReply {
            system_messages: request.system_messages,
            channel_controller_messages: request.channel_controller_messages,
            note_data_messages: request.note_data_messages,
        };
        self.send_body(group, request.address, source, reply);

        let messages = self.strategy.midi_message_report(&self.midi_machine, &request);
        match self.report_output.as_mut() {
            Some(output) => {
                for bytes in messages.iter().filter_map(|m| m.to_short_bytes()) {
                    output.send(group, &bytes);
                }
            }
            None if !messages.is_empty() => {
                warn!(count = messages.len(), "no MIDI message report output, report data dropped");
            }
            None => {}
        }
        self.send_body(group, request.address, source, MessageBody::EndOfMidiMessageReport);
    }
}

#[cfg(test)]
mod tests {
    use crate::config::MidiCiDeviceConfig;
    use crate::constants::{address, midi_report, nak_status};
    use crate::device::MidiCiDevice;
    use crate::factory::serialize;
    use crate::message::{Message, MessageBody, PropertyData};
    use crate::muid::Muid;
    use crate::profile::{MidiCiProfile, MidiCiProfileId};
    use crate::property::{data_request_header, parse_json, property_status, subscription_command, subscription_header, RequestHeader};
    use crate::retrieval;
    use cantus_smf::Midi1Message;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    type Sent = Arc<Mutex<Vec<Message>>>;

    const PROFILE: MidiCiProfileId = MidiCiProfileId::new([0x7E, 0x00, 0x00, 0x01, 0x01]);

    fn responder() -> (MidiCiDevice, Sent) {
        let sent: Sent = Arc::default();
        let sink = sent.clone();
        let device = MidiCiDevice::builder()
            .muid(Muid::new(0x0101_0101).unwrap())
            .product_instance_id("resp-1")
            .output(move |group: u8, data: &[u8]| {
                if let Ok(Some(message)) = retrieval::parse(group, data) {
                    sink.lock().push(message);
                }
            })
            .build()
            .unwrap();
        (device, sent)
    }

    fn peer() -> Muid {
        Muid::new(0x0202_0202).unwrap()
    }

    fn deliver(device: &mut MidiCiDevice, address: u8, body: MessageBody) {
        let message = Message::new(0, address, peer(), device.muid(), body);
        device.process_input(0, &serialize(&message).unwrap()).unwrap();
    }

    #[test]
    fn test_profile_inquiry_one_reply_per_address() {
        let (mut d, sent) = responder();
        d.add_local_profile(MidiCiProfile::new(PROFILE, 0, 5, true, 1));
        d.add_local_profile(MidiCiProfile::new(MidiCiProfileId::new([0x7E, 0, 0, 2, 1]), 0, 3, false, 1));
        sent.lock().clear();

        deliver(&mut d, address::GROUP, MessageBody::ProfileInquiry);
        let out = sent.lock();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].address, 3);
        assert_eq!(out[1].address, 5);
        assert_eq!(
            out[1].body,
            MessageBody::ProfileReply {
                enabled_profiles: vec![PROFILE],
                disabled_profiles: vec![],
            }
        );
    }

    #[test]
    fn test_profile_inquiry_without_profiles() {
        let (mut d, sent) = responder();
        deliver(&mut d, address::FUNCTION_BLOCK, MessageBody::ProfileInquiry);
        let out = sent.lock();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].address, address::FUNCTION_BLOCK);
    }

    #[test]
    fn test_set_profile_on_is_idempotent() {
        let (mut d, sent) = responder();
        let seen = Arc::new(Mutex::new(0));
        let counter = seen.clone();
        d.events().profile_set.add(move |_| *counter.lock() += 1);

        let on = MessageBody::SetProfileOn {
            profile: PROFILE,
            num_channels_requested: 1,
        };
        deliver(&mut d, 2, on.clone());
        deliver(&mut d, 2, on);

        let reports: Vec<_> = sent
            .lock()
            .iter()
            .filter(|m| matches!(m.body, MessageBody::ProfileEnabledReport { .. }))
            .cloned()
            .collect();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].destination, Muid::BROADCAST);
        assert_eq!(*seen.lock(), 2);
        assert!(d.local_profiles().find(&PROFILE, 2).unwrap().enabled);
    }

    #[test]
    fn test_set_profile_off_reports_change() {
        let (mut d, sent) = responder();
        d.add_local_profile(MidiCiProfile::new(PROFILE, 0, 2, true, 1));
        sent.lock().clear();
        deliver(&mut d, 2, MessageBody::SetProfileOff { profile: PROFILE });
        assert!(matches!(sent.lock()[0].body, MessageBody::ProfileDisabledReport { num_channels: 0, .. }));
    }

    #[test]
    fn test_endpoint_reply_and_oversized_id() {
        let (mut d, sent) = responder();
        deliver(&mut d, address::FUNCTION_BLOCK, MessageBody::EndpointInquiry { status: 0 });
        assert_eq!(
            sent.lock()[0].body,
            MessageBody::EndpointReply {
                status: 0,
                data: b"resp-1".to_vec()
            }
        );

        d.config_mut().product_instance_id = "x".repeat(17);
        let message = Message::new(0, 0x7F, peer(), d.muid(), MessageBody::EndpointInquiry { status: 0 });
        assert!(matches!(d.process_input(0, &serialize(&message).unwrap()), Err(crate::Error::Configuration(_))));
    }

    #[test]
    fn test_get_unknown_resource_is_404() {
        let (mut d, sent) = responder();
        let request = PropertyData::new(1, data_request_header("NoSuchThing", None, None, false), Vec::new());
        deliver(&mut d, address::FUNCTION_BLOCK, MessageBody::GetPropertyData(request));
        let out = sent.lock();
        let MessageBody::GetPropertyDataReply(reply) = &out[0].body else {
            panic!("expected get reply, got {:?}", out[0].body);
        };
        assert_eq!(RequestHeader::parse(&reply.header).unwrap().status, Some(property_status::NOT_FOUND));
    }

    #[test]
    fn test_subscription_notified_on_update() {
        let (mut d, sent) = responder();
        d.property_service_mut()
            .add_metadata(crate::property::PropertyMetadata::new("X-Level").with_subscribe(true));
        d.update_property_value("X-Level", json!(1));

        let header = subscription_header(Some("X-Level"), subscription_command::START, None, None);
        deliver(&mut d, address::FUNCTION_BLOCK, MessageBody::SubscribeProperty(PropertyData::new(9, header, Vec::new())));
        d.update_property_value("X-Level", json!(2));

        let out = sent.lock();
        let MessageBody::SubscribePropertyReply(reply) = &out[0].body else {
            panic!("expected subscription reply");
        };
        let subscribe_id = RequestHeader::parse(&reply.header).unwrap().subscribe_id.unwrap();
        let MessageBody::SubscribeProperty(update) = &out[1].body else {
            panic!("expected update");
        };
        assert_eq!(out[1].destination, peer());
        let header = RequestHeader::parse(&update.header).unwrap();
        assert_eq!(header.command.as_deref(), Some(subscription_command::FULL));
        assert_eq!(header.subscribe_id, Some(subscribe_id));
        assert_eq!(parse_json(&update.body).unwrap(), json!(2));

        drop(out);
        d.terminate_subscriptions();
        let out = sent.lock();
        let MessageBody::SubscribeProperty(end) = &out[2].body else {
            panic!("expected end");
        };
        assert!(RequestHeader::parse(&end.header).unwrap().is_subscription_end());
        assert!(d.property_service().subscriptions().is_empty());
    }

    #[test]
    fn test_process_inquiry_and_report() {
        let streamed = Arc::new(Mutex::new(Vec::new()));
        let sink = streamed.clone();
        let sent: Sent = Arc::default();
        let out = sent.clone();
        let mut d = MidiCiDevice::builder()
            .muid(Muid::new(0x0101_0101).unwrap())
            .output(move |group: u8, data: &[u8]| {
                if let Ok(Some(m)) = retrieval::parse(group, data) {
                    out.lock().push(m);
                }
            })
            .midi_message_report_output(move |_group: u8, data: &[u8]| sink.lock().push(data.to_vec()))
            .build()
            .unwrap();
        d.midi_machine_mut().process_message(&Midi1Message::program(0, 5));

        deliver(&mut d, address::FUNCTION_BLOCK, MessageBody::ProcessInquiryCapabilities);
        deliver(
            &mut d,
            0,
            MessageBody::MidiMessageReportInquiry {
                message_data_control: midi_report::data_control::ONLY_NON_DEFAULT,
                system_messages: 0,
                channel_controller_messages: midi_report::channel_controller::PROGRAM_CHANGE,
                note_data_messages: 0,
            },
        );

        let out = sent.lock();
        assert_eq!(out[0].body, MessageBody::ProcessInquiryCapabilitiesReply { supported_features: 1 });
        assert!(matches!(out[1].body, MessageBody::MidiMessageReportReply { .. }));
        assert_eq!(out[2].body, MessageBody::EndOfMidiMessageReport);
        assert_eq!(*streamed.lock(), vec![vec![0xC0, 5]]);
    }

    #[test]
    fn test_process_inquiry_unsupported_naks() {
        let (mut d, sent) = responder();
        let mut config = MidiCiDeviceConfig::default();
        config.capability_inquiry_supported = 0;
        *d.config_mut() = config;
        deliver(&mut d, address::FUNCTION_BLOCK, MessageBody::ProcessInquiryCapabilities);
        assert!(matches!(
            &sent.lock()[0].body,
            MessageBody::Nak(n) if n.status_code == nak_status::MESSAGE_NOT_SUPPORTED
        ));
    }
}
