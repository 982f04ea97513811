//! Typed MIDI-CI messages.

use cantus_ump::DeviceDetails;

use crate::constants::sub_id2;
use crate::muid::Muid;
use crate::profile::MidiCiProfileId;

/// Request id, header and body of a property exchange message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PropertyData {
    pub request_id: u8,
    pub header: Vec<u8>,
    pub body: Vec<u8>,
}

impl PropertyData {
    pub fn new(request_id: u8, header: Vec<u8>, body: Vec<u8>) -> Self {
        Self { request_id, header, body }
    }
}

/// Payload shared by ACK and NAK.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AckNak {
    pub original_sub_id: u8,
    pub status_code: u8,
    pub status_data: u8,
    pub details: [u8; 5],
    pub message_text: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    DiscoveryInquiry {
        device: DeviceDetails,
        ci_category_supported: u8,
        receivable_max_sysex_size: u32,
        output_path_id: u8,
    },
    DiscoveryReply {
        device: DeviceDetails,
        ci_category_supported: u8,
        receivable_max_sysex_size: u32,
        output_path_id: u8,
        function_block: u8,
    },
    EndpointInquiry {
        status: u8,
    },
    EndpointReply {
        status: u8,
        data: Vec<u8>,
    },
    InvalidateMuid {
        target_muid: Muid,
    },
    Ack(AckNak),
    Nak(AckNak),

    ProfileInquiry,
    ProfileReply {
        enabled_profiles: Vec<MidiCiProfileId>,
        disabled_profiles: Vec<MidiCiProfileId>,
    },
    SetProfileOn {
        profile: MidiCiProfileId,
        num_channels_requested: u16,
    },
    SetProfileOff {
        profile: MidiCiProfileId,
    },
    ProfileEnabledReport {
        profile: MidiCiProfileId,
        num_channels: u16,
    },
    ProfileDisabledReport {
        profile: MidiCiProfileId,
        num_channels: u16,
    },
    ProfileAddedReport {
        profile: MidiCiProfileId,
    },
    ProfileRemovedReport {
        profile: MidiCiProfileId,
    },
    ProfileDetailsInquiry {
        profile: MidiCiProfileId,
        target: u8,
    },
    ProfileDetailsReply {
        profile: MidiCiProfileId,
        target: u8,
        data: Vec<u8>,
    },
    ProfileSpecificData {
        profile: MidiCiProfileId,
        data: Vec<u8>,
    },

    PropertyCapabilitiesInquiry {
        max_simultaneous_requests: u8,
        major_version: u8,
        minor_version: u8,
    },
    PropertyCapabilitiesReply {
        max_simultaneous_requests: u8,
        major_version: u8,
        minor_version: u8,
    },
    GetPropertyData(PropertyData),
    GetPropertyDataReply(PropertyData),
    SetPropertyData(PropertyData),
    SetPropertyDataReply(PropertyData),
    SubscribeProperty(PropertyData),
    SubscribePropertyReply(PropertyData),
    PropertyNotify(PropertyData),

    ProcessInquiryCapabilities,
    ProcessInquiryCapabilitiesReply {
        supported_features: u8,
    },
    MidiMessageReportInquiry {
        message_data_control: u8,
        system_messages: u8,
        channel_controller_messages: u8,
        note_data_messages: u8,
    },
    MidiMessageReportReply {
        system_messages: u8,
        channel_controller_messages: u8,
        note_data_messages: u8,
    },
    EndOfMidiMessageReport,
}

impl MessageBody {
    pub fn sub_id2(&self) -> u8 {
        match self {
            MessageBody::DiscoveryInquiry { .. } => sub_id2::DISCOVERY_INQUIRY,
            MessageBody::DiscoveryReply { .. } => sub_id2::DISCOVERY_REPLY,
            MessageBody::EndpointInquiry { .. } => sub_id2::ENDPOINT_MESSAGE_INQUIRY,
            MessageBody::EndpointReply { .. } => sub_id2::ENDPOINT_MESSAGE_REPLY,
            MessageBody::InvalidateMuid { .. } => sub_id2::INVALIDATE_MUID,
            MessageBody::Ack(_) => sub_id2::ACK,
            MessageBody::Nak(_) => sub_id2::NAK,
            MessageBody::ProfileInquiry => sub_id2::PROFILE_INQUIRY,
            MessageBody::ProfileReply { .. } => sub_id2::PROFILE_INQUIRY_REPLY,
            MessageBody::SetProfileOn { .. } => sub_id2::SET_PROFILE_ON,
            MessageBody::SetProfileOff { .. } => sub_id2::SET_PROFILE_OFF,
            MessageBody::ProfileEnabledReport { .. } => sub_id2::PROFILE_ENABLED_REPORT,
            MessageBody::ProfileDisabledReport { .. } => sub_id2::PROFILE_DISABLED_REPORT,
            MessageBody::ProfileAddedReport { .. } => sub_id2::PROFILE_ADDED_REPORT,
            MessageBody::ProfileRemovedReport { .. } => sub_id2::PROFILE_REMOVED_REPORT,
            MessageBody::ProfileDetailsInquiry { .. } => sub_id2::PROFILE_DETAILS_INQUIRY,
            MessageBody::ProfileDetailsReply { .. } => sub_id2::PROFILE_DETAILS_REPLY,
            MessageBody::ProfileSpecificData { .. } => sub_id2::PROFILE_SPECIFIC_DATA,
            MessageBody::PropertyCapabilitiesInquiry { .. } => sub_id2::PROPERTY_CAPABILITIES_INQUIRY,
            MessageBody::PropertyCapabilitiesReply { .. } => sub_id2::PROPERTY_CAPABILITIES_REPLY,
            MessageBody::GetPropertyData(_) => sub_id2::PROPERTY_GET_DATA_INQUIRY,
            MessageBody::GetPropertyDataReply(_) => sub_id2::PROPERTY_GET_DATA_REPLY,
            MessageBody::SetPropertyData(_) => sub_id2::PROPERTY_SET_DATA_INQUIRY,
            MessageBody::SetPropertyDataReply(_) => sub_id2::PROPERTY_SET_DATA_REPLY,
            MessageBody::SubscribeProperty(_) => sub_id2::PROPERTY_SUBSCRIBE,
            MessageBody::SubscribePropertyReply(_) => sub_id2::PROPERTY_SUBSCRIBE_REPLY,
            MessageBody::PropertyNotify(_) => sub_id2::PROPERTY_NOTIFY,
            MessageBody::ProcessInquiryCapabilities => sub_id2::PROCESS_INQUIRY_CAPABILITIES,
            MessageBody::ProcessInquiryCapabilitiesReply { .. } => sub_id2::PROCESS_INQUIRY_CAPABILITIES_REPLY,
            MessageBody::MidiMessageReportInquiry { .. } => sub_id2::MIDI_MESSAGE_REPORT_INQUIRY,
            MessageBody::MidiMessageReportReply { .. } => sub_id2::MIDI_MESSAGE_REPORT_REPLY,
            MessageBody::EndOfMidiMessageReport => sub_id2::END_OF_MIDI_MESSAGE_REPORT,
        }
    }

    pub fn property_data(&self) -> Option<&PropertyData> {
        match self {
            MessageBody::GetPropertyData(p)
            | MessageBody::GetPropertyDataReply(p)
            | MessageBody::SetPropertyData(p)
            | MessageBody::SetPropertyDataReply(p)
            | MessageBody::SubscribeProperty(p)
            | MessageBody::SubscribePropertyReply(p)
            | MessageBody::PropertyNotify(p) => Some(p),
            _ => None,
        }
    }

    /// Rebuilds a property message of kind `sub_id` around reassembled data.
    pub(crate) fn from_property_data(sub_id: u8, data: PropertyData) -> Option<Self> {
        Some(match sub_id {
            sub_id2::PROPERTY_GET_DATA_INQUIRY => MessageBody::GetPropertyData(data),
            sub_id2::PROPERTY_GET_DATA_REPLY => MessageBody::GetPropertyDataReply(data),
            sub_id2::PROPERTY_SET_DATA_INQUIRY => MessageBody::SetPropertyData(data),
            sub_id2::PROPERTY_SET_DATA_REPLY => MessageBody::SetPropertyDataReply(data),
            sub_id2::PROPERTY_SUBSCRIBE => MessageBody::SubscribeProperty(data),
            sub_id2::PROPERTY_SUBSCRIBE_REPLY => MessageBody::SubscribePropertyReply(data),
            sub_id2::PROPERTY_NOTIFY => MessageBody::PropertyNotify(data),
            _ => return None,
        })
    }
}

/// A MIDI-CI message with its addressing envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// UMP group the message travels on.
    pub group: u8,
    /// Channel 0-15, 0x7E (group) or 0x7F (function block).
    pub address: u8,
    pub source: Muid,
    pub destination: Muid,
    pub body: MessageBody,
}

impl Message {
    pub fn new(group: u8, address: u8, source: Muid, destination: Muid, body: MessageBody) -> Self {
        Self {
            group,
            address,
            source,
            destination,
            body,
        }
    }

    pub fn sub_id2(&self) -> u8 {
        self.body.sub_id2()
    }
}

/// Direction of a logged message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageDirection {
    In,
    Out,
}
