//! A MIDI-CI device: one MUID acting as both initiator and responder.
//!
//! Input arrives through [`MidiCiDevice::process_input`], which decodes the
//! sysex, dispatches it and sends any replies through the configured
//! [`CiOutput`] before returning.

mod builder;
mod connection;
mod initiator;
mod responder;

pub use builder::MidiCiDeviceBuilder;
pub use connection::{ClientConnection, ClientSubscription, SubscriptionState};

use std::collections::HashMap;
use std::time::Instant;

use cantus_smf::Midi1Machine;
use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, error, trace, warn};

use crate::chunk::PropertyChunkManager;
use crate::config::MidiCiDeviceConfig;
use crate::constants::{nak_status, sub_id2, PROPERTY_CHUNK_OVERHEAD};
use crate::error::Result;
use crate::factory::serialize_chunks;
use crate::message::{AckNak, Message, MessageBody, MessageDirection};
use crate::muid::Muid;
use crate::observer::Listeners;
use crate::output::CiOutput;
use crate::profile::{MidiCiProfile, ObservableProfileList};
use crate::property::{subscription_command, CommonRulesPropertyService, RequestHeader};
use crate::retrieval::{self, CiHeader};
use crate::strategy::{MidiCiStrategy, MidiMessageReportRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionChange {
    Added(Muid),
    Removed(Muid),
}

/// An ACK or NAK received from a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckNakDetails {
    pub source: Muid,
    pub address: u8,
    pub original_sub_id: u8,
    pub status_code: u8,
    pub status_data: u8,
    pub details: [u8; 5],
    pub message_text: Vec<u8>,
}

impl AckNakDetails {
    fn new(source: Muid, address: u8, body: &AckNak) -> Self {
        Self {
            source,
            address,
            original_sub_id: body.original_sub_id,
            status_code: body.status_code,
            status_data: body.status_data,
            details: body.details,
            message_text: body.message_text.clone(),
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.message_text).into_owned()
    }
}

/// A peer changed a local profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSet {
    pub profile: MidiCiProfile,
    pub num_channels_requested: u16,
}

/// State change of a subscription this device holds on a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionUpdate {
    pub muid: Muid,
    pub subscription: ClientSubscription,
}

/// Observer registries of a device. Registration works through `&self`.
#[derive(Debug, Default)]
pub struct MidiCiEvents {
    pub message_received: Listeners<Message>,
    pub message_sent: Listeners<Message>,
    /// Raw sysex of messages with an unknown sub-id.
    pub unknown_message: Listeners<Vec<u8>>,
    pub connection_changed: Listeners<ConnectionChange>,
    pub profile_set: Listeners<ProfileSet>,
    pub ack: Listeners<AckNakDetails>,
    pub nak: Listeners<AckNakDetails>,
    pub subscription_updated: Listeners<SubscriptionUpdate>,
}

/// What the device learned about a peer from its traffic.
#[derive(Debug, Clone, Copy, Default)]
struct Peer {
    group: u8,
    /// Receivable maximum sysex size from the peer's discovery message, F0/F7 included.
    max_sysex_size: Option<u32>,
}

/// Follow-ups executed after the triggering handler returned.
#[derive(Debug)]
enum DeviceTask {
    GetProperty { destination: Muid, resource: String },
}

pub struct MidiCiDevice {
    muid: Muid,
    config: MidiCiDeviceConfig,
    output: Box<dyn CiOutput>,
    report_output: Option<Box<dyn CiOutput>>,
    strategy: Box<dyn MidiCiStrategy>,
    events: MidiCiEvents,
    connections: HashMap<Muid, ClientConnection>,
    peers: HashMap<Muid, Peer>,
    local_profiles: ObservableProfileList,
    property_service: CommonRulesPropertyService,
    chunks: PropertyChunkManager,
    midi_machine: Midi1Machine,
    task_tx: Sender<DeviceTask>,
    task_rx: Receiver<DeviceTask>,
    request_id_serial: u8,
}

impl std::fmt::Debug for MidiCiDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidiCiDevice")
            .field("muid", &self.muid)
            .field("connections", &self.connections.len())
            .field("local_profiles", &self.local_profiles.len())
            .finish_non_exhaustive()
    }
}

impl MidiCiDevice {
    pub fn builder() -> MidiCiDeviceBuilder {
        MidiCiDeviceBuilder::new()
    }

    pub(crate) fn from_parts(
        muid: Muid,
        config: MidiCiDeviceConfig,
        output: Box<dyn CiOutput>,
        report_output: Option<Box<dyn CiOutput>>,
        strategy: Box<dyn MidiCiStrategy>,
    ) -> Self {
        let (task_tx, task_rx) = crossbeam_channel::unbounded();
        let property_service = CommonRulesPropertyService::new(muid, config.device_info.clone());
        Self {
            muid,
            config,
            output,
            report_output,
            strategy,
            events: MidiCiEvents::default(),
            connections: HashMap::new(),
            peers: HashMap::new(),
            local_profiles: ObservableProfileList::new(),
            property_service,
            chunks: PropertyChunkManager::new(),
            midi_machine: Midi1Machine::new(),
            task_tx,
            task_rx,
            request_id_serial: 0,
        }
    }

    pub fn muid(&self) -> Muid {
        self.muid
    }

    pub fn config(&self) -> &MidiCiDeviceConfig {
        &self.config
    }

    /// Changes made here are not validated again. An invalid product instance
    /// id surfaces as an error when an endpoint inquiry is answered.
    pub fn config_mut(&mut self) -> &mut MidiCiDeviceConfig {
        &mut self.config
    }

    pub fn events(&self) -> &MidiCiEvents {
        &self.events
    }

    pub fn connection(&self, muid: Muid) -> Option<&ClientConnection> {
        self.connections.get(&muid)
    }

    pub fn connections(&self) -> impl Iterator<Item = &ClientConnection> {
        self.connections.values()
    }

    pub fn local_profiles(&self) -> &ObservableProfileList {
        &self.local_profiles
    }

    pub fn property_service(&self) -> &CommonRulesPropertyService {
        &self.property_service
    }

    /// Catalog edits made here send nothing; use
    /// [`update_property_value`](Self::update_property_value) to notify subscribers.
    pub fn property_service_mut(&mut self) -> &mut CommonRulesPropertyService {
        &mut self.property_service
    }

    /// Channel state reported in MIDI message reports.
    pub fn midi_machine(&self) -> &Midi1Machine {
        &self.midi_machine
    }

    pub fn midi_machine_mut(&mut self) -> &mut Midi1Machine {
        &mut self.midi_machine
    }

    /// Handles one inbound MIDI-CI sysex (F0/F7 stripped).
    ///
    /// Malformed or unexpected peer input is logged, NAKed where applicable
    /// and never returned as an error. Errors are local configuration defects.
    pub fn process_input(&mut self, group: u8, data: &[u8]) -> Result<()> {
        if !retrieval::is_midi_ci(data) {
            trace!(group, len = data.len(), "not a MIDI-CI message");
            return Ok(());
        }
        let header = match retrieval::parse_header(data) {
            Ok(header) => header,
            Err(e) => {
                warn!(error = %e, "dropping malformed MIDI-CI message");
                return Ok(());
            }
        };
        if header.source == self.muid {
            trace!("ignoring own message");
            return Ok(());
        }
        if header.destination != self.muid && !header.destination.is_broadcast() {
            trace!(destination = %header.destination, "message for another device");
            return Ok(());
        }
        self.peers.entry(header.source).or_default().group = group;

        let Some(message) = self.decode(group, &header, data) else {
            return Ok(());
        };
        debug!(
            direction = ?MessageDirection::In,
            sub_id = message.sub_id2(),
            source = %message.source,
            destination = %message.destination,
            "ci message"
        );
        self.events.message_received.notify(&message);
        let result = self.dispatch(message);
        self.run_pending_tasks();
        result
    }

    fn decode(&mut self, group: u8, header: &CiHeader, data: &[u8]) -> Option<Message> {
        if sub_id2::is_property_chunked(header.sub_id2) {
            let chunk = match retrieval::parse_property_chunk(data) {
                Ok(chunk) => chunk,
                Err(e) => {
                    warn!(source = %header.source, error = %e, "malformed property exchange message");
                    self.send_nak(group, header.address, header.source, header.sub_id2, nak_status::MALFORMED_MESSAGE, "malformed message");
                    return None;
                }
            };
            let data = self.chunks.add_chunk(header.source, header.sub_id2, chunk, Instant::now())?;
            let body = MessageBody::from_property_data(header.sub_id2, data)?;
            return Some(Message::new(group, header.address, header.source, header.destination, body));
        }
        match retrieval::parse(group, data) {
            Ok(Some(message)) => Some(message),
            Ok(None) => {
                warn!(source = %header.source, sub_id = header.sub_id2, "unsupported MIDI-CI message");
                self.events.unknown_message.notify(&data.to_vec());
                self.send_nak(group, header.address, header.source, header.sub_id2, nak_status::MESSAGE_NOT_SUPPORTED, "message not supported");
                None
            }
            Err(e) => {
                warn!(source = %header.source, error = %e, "malformed MIDI-CI message");
                if !matches!(header.sub_id2, sub_id2::ACK | sub_id2::NAK) {
                    self.send_nak(group, header.address, header.source, header.sub_id2, nak_status::MALFORMED_MESSAGE, "malformed message");
                }
                None
            }
        }
    }

    fn dispatch(&mut self, message: Message) -> Result<()> {
        let Message {
            group,
            address,
            source,
            body,
            ..
        } = message;
        match body {
            MessageBody::DiscoveryInquiry {
                receivable_max_sysex_size,
                output_path_id,
                ..
            } => {
                self.record_peer_max_sysex_size(source, receivable_max_sysex_size);
                self.reply_discovery(group, source, output_path_id)
            }
            MessageBody::DiscoveryReply {
                device,
                ci_category_supported,
                receivable_max_sysex_size,
                ..
            } => {
                self.record_peer_max_sysex_size(source, receivable_max_sysex_size);
                self.on_discovery_reply(group, source, device, ci_category_supported, receivable_max_sysex_size)
            }
            MessageBody::EndpointInquiry { status } => return self.reply_endpoint(group, source, status),
            MessageBody::EndpointReply { status, data } => self.on_endpoint_reply(source, status, &data),
            MessageBody::InvalidateMuid { target_muid } => self.on_invalidate_muid(group, address, source, target_muid),
            MessageBody::Ack(body) => {
                debug!(%source, original_sub_id = body.original_sub_id, "ACK");
                self.events.ack.notify(&AckNakDetails::new(source, address, &body));
            }
            MessageBody::Nak(body) => {
                let details = AckNakDetails::new(source, address, &body);
                warn!(%source, original_sub_id = body.original_sub_id, status = body.status_code, text = %details.text(), "NAK");
                self.events.nak.notify(&details);
            }

            MessageBody::ProfileInquiry => self.reply_profile_inquiry(group, address, source),
            MessageBody::ProfileReply {
                enabled_profiles,
                disabled_profiles,
            } => self.on_profile_reply(group, address, source, &enabled_profiles, &disabled_profiles),
            MessageBody::SetProfileOn {
                profile,
                num_channels_requested,
            } => self.on_set_profile(group, address, source, profile, true, num_channels_requested),
            MessageBody::SetProfileOff { profile } => self.on_set_profile(group, address, source, profile, false, 0),
            MessageBody::ProfileEnabledReport { profile, num_channels } => {
                self.on_profile_report(address, source, profile, true, num_channels)
            }
            MessageBody::ProfileDisabledReport { profile, num_channels } => {
                self.on_profile_report(address, source, profile, false, num_channels)
            }
            MessageBody::ProfileAddedReport { profile } => self.on_profile_added(group, address, source, profile),
            MessageBody::ProfileRemovedReport { profile } => self.on_profile_removed(group, address, source, profile),
            MessageBody::ProfileDetailsInquiry { profile, target } => {
                self.reply_profile_details(group, address, source, profile, target)
            }
            MessageBody::ProfileSpecificData { profile, data } => {
                self.strategy.profile_specific_data(source, address, &profile, &data)
            }

            MessageBody::PropertyCapabilitiesInquiry {
                max_simultaneous_requests,
                ..
            } => self.reply_property_capabilities(group, address, source, max_simultaneous_requests),
            MessageBody::PropertyCapabilitiesReply {
                max_simultaneous_requests,
                ..
            } => self.on_property_capabilities_reply(group, address, source, max_simultaneous_requests),
            MessageBody::GetPropertyData(data) => self.reply_get_property_data(group, address, source, &data),
            MessageBody::GetPropertyDataReply(data) => self.on_get_property_data_reply(source, &data),
            MessageBody::SetPropertyData(data) => self.reply_set_property_data(group, address, source, &data),
            MessageBody::SetPropertyDataReply(data) => self.on_set_property_data_reply(source, &data),
            MessageBody::SubscribeProperty(data) => self.route_subscribe_property(group, address, source, &data),
            MessageBody::SubscribePropertyReply(data) => self.on_subscribe_property_reply(source, &data),
            MessageBody::PropertyNotify(data) => self.strategy.property_notify(source, &data),

            MessageBody::ProcessInquiryCapabilities => self.reply_process_inquiry(group, address, source),
            MessageBody::MidiMessageReportInquiry {
                message_data_control,
                system_messages,
                channel_controller_messages,
                note_data_messages,
            } => self.reply_midi_message_report(
                group,
                source,
                MidiMessageReportRequest {
                    address,
                    message_data_control,
                    system_messages,
                    channel_controller_messages,
                    note_data_messages,
                },
            ),

            // observed through `message_received` only
            MessageBody::ProfileDetailsReply { .. }
            | MessageBody::ProcessInquiryCapabilitiesReply { .. }
            | MessageBody::MidiMessageReportReply { .. }
            | MessageBody::EndOfMidiMessageReport => {}
        }
        Ok(())
    }

    /// A SubscribeProperty is either an inquiry to the local responder
    /// (`start`, or `end` of a subscription it holds) or an update from a
    /// responder this device subscribed to.
    fn route_subscribe_property(&mut self, group: u8, address: u8, source: Muid, data: &crate::message::PropertyData) {
        let header = RequestHeader::parse(&data.header).unwrap_or_default();
        let for_responder = header.is_command(subscription_command::START)
            || (header.is_subscription_end()
                && header
                    .subscribe_id
                    .as_deref()
                    .map_or(true, |id| self.property_service.has_subscription(source, id)))
            || header.command.is_none();
        if for_responder {
            self.reply_subscribe_property(group, address, source, data);
        } else {
            self.on_subscription_update(group, address, source, &header, data);
        }
    }

    /// Executes queued follow-ups. Called at the end of every `process_input`.
    pub fn run_pending_tasks(&mut self) {
        while let Ok(task) = self.task_rx.try_recv() {
            match task {
                DeviceTask::GetProperty { destination, resource } => {
                    self.send_get_property_data(destination, &resource, None);
                }
            }
        }
    }

    fn queue(&self, task: DeviceTask) {
        if self.task_tx.send(task).is_err() {
            warn!("task queue closed");
        }
    }

    /// Drops open requests, chunk assemblies and pending subscriptions older
    /// than the configured `request_timeout`. Returns the number dropped.
    pub fn expire_requests(&mut self, now: Instant) -> usize {
        let Some(timeout) = self.config.request_timeout else {
            return 0;
        };
        let Some(deadline) = now.checked_sub(timeout) else {
            return 0;
        };
        let mut expired = self.chunks.expire(deadline);
        let mut dropped = Vec::new();
        for conn in self.connections.values_mut() {
            let before = conn.open_requests.len();
            conn.open_requests.retain(|r| r.sent >= deadline);
            let stale = before - conn.open_requests.len();
            if stale > 0 {
                warn!(muid = %conn.target_muid, count = stale, "property requests timed out");
            }
            expired += stale;

            let muid = conn.target_muid;
            conn.subscriptions.retain(|s| {
                let pending = matches!(s.state, SubscriptionState::Subscribing | SubscriptionState::Unsubscribing);
                if pending && s.since < deadline {
                    let mut subscription = s.clone();
                    subscription.state = SubscriptionState::Unsubscribed;
                    dropped.push(SubscriptionUpdate { muid, subscription });
                    return false;
                }
                true
            });
        }
        for update in &dropped {
            warn!(muid = %update.muid, property = %update.subscription.property_id, "subscription request timed out");
            self.events.subscription_updated.notify(update);
        }
        expired + dropped.len()
    }

    pub(crate) fn next_request_id(&mut self) -> u8 {
        self.request_id_serial = self.request_id_serial % 0x7F + 1;
        self.request_id_serial
    }

    pub(crate) fn peer_group(&self, muid: Muid) -> u8 {
        self.peers.get(&muid).map_or(0, |peer| peer.group)
    }

    fn record_peer_max_sysex_size(&mut self, muid: Muid, size: u32) {
        self.peers.entry(muid).or_default().max_sysex_size = Some(size);
    }

    /// Forgets the group and sysex limit learned from `muid`.
    pub(crate) fn forget_peer(&mut self, muid: Muid) {
        self.peers.remove(&muid);
    }

    /// Body bytes per property chunk sent with `message`: the local limit,
    /// lowered so every chunk fits the destination's receivable sysex size.
    /// `None` when not even the header fits.
    fn chunk_size_for(&self, message: &Message) -> Option<usize> {
        let local = self.config.max_property_chunk_size;
        let Some(data) = message.body.property_data() else {
            return Some(local);
        };
        let Some(peer_max) = self.peers.get(&message.destination).and_then(|p| p.max_sysex_size) else {
            return Some(local);
        };
        let room = (peer_max as usize).checked_sub(PROPERTY_CHUNK_OVERHEAD + data.header.len())?;
        (room > 0).then(|| room.min(local))
    }

    pub(crate) fn send(&mut self, message: Message) {
        let Some(chunk_size) = self.chunk_size_for(&message) else {
            error!(
                sub_id = message.sub_id2(),
                destination = %message.destination,
                "property header does not fit the peer's receivable sysex size"
            );
            return;
        };
        let packets = match serialize_chunks(&message, chunk_size) {
            Ok(packets) => packets,
            Err(e) => {
                error!(sub_id = message.sub_id2(), destination = %message.destination, error = %e, "cannot serialize MIDI-CI message");
                return;
            }
        };
        debug!(
            direction = ?MessageDirection::Out,
            sub_id = message.sub_id2(),
            source = %message.source,
            destination = %message.destination,
            chunks = packets.len(),
            "ci message"
        );
        self.events.message_sent.notify(&message);
        for packet in packets {
            self.output.send(message.group, &packet);
        }
    }

    pub(crate) fn send_body(&mut self, group: u8, address: u8, destination: Muid, body: MessageBody) {
        let message = Message::new(group, address, self.muid, destination, body);
        self.send(message);
    }

    pub(crate) fn send_nak(&mut self, group: u8, address: u8, destination: Muid, original_sub_id: u8, status_code: u8, text: &str) {
        let body = MessageBody::Nak(AckNak {
            original_sub_id,
            status_code,
            message_text: text.as_bytes().to_vec(),
            ..Default::default()
        });
        self.send_body(group, address, destination, body);
    }
}
