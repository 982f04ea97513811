//! Serialization of CI messages into sysex payloads (without F0/F7).
//!
//! Multi-byte integers are written 7 bits per byte, least significant group
//! first. Device identity fields keep one byte per octet of the id.

use cantus_ump::DeviceDetails;

use crate::constants::{CI_VERSION_AND_FORMAT, MAX_U14, MAX_U28, SUB_ID_1_MIDI_CI, UNIVERSAL_SYSEX};
use crate::error::{Error, Result};
use crate::message::{AckNak, Message, MessageBody, PropertyData};
use crate::muid::Muid;
use crate::profile::MidiCiProfileId;

fn push_header(out: &mut Vec<u8>, sub_id: u8, address: u8, source: Muid, destination: Muid) {
    out.extend_from_slice(&[UNIVERSAL_SYSEX, address, SUB_ID_1_MIDI_CI, sub_id, CI_VERSION_AND_FORMAT]);
    out.extend_from_slice(&source.to_bytes());
    out.extend_from_slice(&destination.to_bytes());
}

fn check_field(sub_id: u8, field: &'static str, value: usize, limit: usize) -> Result<()> {
    if value > limit {
        return Err(Error::FieldOverflow {
            sub_id,
            field,
            value,
            limit,
        });
    }
    Ok(())
}

/// Writes a 14-bit field. Values that do not fit are refused, never masked.
fn push_u14(out: &mut Vec<u8>, sub_id: u8, field: &'static str, value: usize) -> Result<()> {
    check_field(sub_id, field, value, MAX_U14)?;
    out.extend_from_slice(&[(value & 0x7F) as u8, (value >> 7) as u8]);
    Ok(())
}

fn push_u28(out: &mut Vec<u8>, sub_id: u8, field: &'static str, value: usize) -> Result<()> {
    check_field(sub_id, field, value, MAX_U28)?;
    for i in 0..4 {
        out.push(((value >> (7 * i)) & 0x7F) as u8);
    }
    Ok(())
}

fn push_device(out: &mut Vec<u8>, device: &DeviceDetails) {
    let m = device.manufacturer;
    out.extend_from_slice(&[(m & 0x7F) as u8, ((m >> 8) & 0x7F) as u8, ((m >> 16) & 0x7F) as u8]);
    for v in [device.family, device.model_number] {
        out.extend_from_slice(&[(v & 0x7F) as u8, ((v >> 8) & 0x7F) as u8]);
    }
    let r = device.software_revision_level;
    for i in 0..4 {
        out.push(((r >> (8 * i)) & 0x7F) as u8);
    }
}

fn push_profile_list(out: &mut Vec<u8>, sub_id: u8, profiles: &[MidiCiProfileId]) -> Result<()> {
    push_u14(out, sub_id, "profile count", profiles.len())?;
    for p in profiles {
        out.extend_from_slice(p.as_bytes());
    }
    Ok(())
}

fn push_ack_nak(out: &mut Vec<u8>, sub_id: u8, ack_nak: &AckNak) -> Result<()> {
    out.extend_from_slice(&[ack_nak.original_sub_id, ack_nak.status_code, ack_nak.status_data]);
    out.extend_from_slice(&ack_nak.details);
    push_u14(out, sub_id, "message text length", ack_nak.message_text.len())?;
    out.extend_from_slice(&ack_nak.message_text);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn push_property_chunk(
    out: &mut Vec<u8>,
    sub_id: u8,
    request_id: u8,
    header: &[u8],
    num_chunks: usize,
    chunk_index: usize,
    body: &[u8],
) -> Result<()> {
    out.push(request_id);
    push_u14(out, sub_id, "property header length", header.len())?;
    out.extend_from_slice(header);
    push_u14(out, sub_id, "property chunk count", num_chunks)?;
    push_u14(out, sub_id, "property chunk index", chunk_index)?;
    push_u14(out, sub_id, "property body length", body.len())?;
    out.extend_from_slice(body);
    Ok(())
}

/// Splits a property message body into chunks of at most `max_chunk_size`
/// bytes (never more than a 14-bit body length). The header travels in the
/// first chunk only; chunk indices are 1-based and an empty body still yields
/// one chunk.
///
/// Fails with [`Error::FieldOverflow`] when the header or the chunk count
/// does not fit its 14-bit field.
#[allow(clippy::too_many_arguments)]
pub fn property_chunks(
    max_chunk_size: usize,
    sub_id: u8,
    address: u8,
    source: Muid,
    destination: Muid,
    request_id: u8,
    header: &[u8],
    body: &[u8],
) -> Result<Vec<Vec<u8>>> {
    let max_chunk_size = max_chunk_size.clamp(1, MAX_U14);
    let bodies: Vec<&[u8]> = if body.is_empty() {
        vec![&[]]
    } else {
        body.chunks(max_chunk_size).collect()
    };
    let num_chunks = bodies.len();
    check_field(sub_id, "property chunk count", num_chunks, MAX_U14)?;
    bodies
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let mut out = Vec::with_capacity(22 + header.len() + chunk.len());
            push_header(&mut out, sub_id, address, source, destination);
            let chunk_header = if i == 0 { header } else { &[] };
            push_property_chunk(&mut out, sub_id, request_id, chunk_header, num_chunks, i + 1, chunk)?;
            Ok(out)
        })
        .collect()
}

/// Serializes `msg` into one sysex payload. Property messages become a single
/// chunk; use [`serialize_chunks`] to honor a chunk size limit.
///
/// Lengths and counts that do not fit their wire fields are refused with
/// [`Error::FieldOverflow`].
pub fn serialize(msg: &Message) -> Result<Vec<u8>> {
    let sub_id = msg.sub_id2();
    let mut out = Vec::with_capacity(32);
    push_header(&mut out, sub_id, msg.address, msg.source, msg.destination);
    match &msg.body {
        MessageBody::DiscoveryInquiry {
            device,
            ci_category_supported,
            receivable_max_sysex_size,
            output_path_id,
        } => {
            push_device(&mut out, device);
            out.push(*ci_category_supported);
            push_u28(&mut out, sub_id, "receivable max sysex size", *receivable_max_sysex_size as usize)?;
            out.push(*output_path_id);
        }
        MessageBody::DiscoveryReply {
            device,
            ci_category_supported,
            receivable_max_sysex_size,
            output_path_id,
            function_block,
        } => {
            push_device(&mut out, device);
            out.push(*ci_category_supported);
            push_u28(&mut out, sub_id, "receivable max sysex size", *receivable_max_sysex_size as usize)?;
            out.extend_from_slice(&[*output_path_id, *function_block]);
        }
        MessageBody::EndpointInquiry { status } => out.push(*status),
        MessageBody::EndpointReply { status, data } => {
            out.push(*status);
            push_u14(&mut out, sub_id, "endpoint data length", data.len())?;
            out.extend_from_slice(data);
        }
        MessageBody::InvalidateMuid { target_muid } => out.extend_from_slice(&target_muid.to_bytes()),
        MessageBody::Ack(ack_nak) | MessageBody::Nak(ack_nak) => push_ack_nak(&mut out, sub_id, ack_nak)?,

        MessageBody::ProfileInquiry => {}
        MessageBody::ProfileReply {
            enabled_profiles,
            disabled_profiles,
        } => {
            push_profile_list(&mut out, sub_id, enabled_profiles)?;
            push_profile_list(&mut out, sub_id, disabled_profiles)?;
        }
        MessageBody::SetProfileOn {
            profile,
            num_channels_requested,
        } => {
            out.extend_from_slice(profile.as_bytes());
            push_u14(&mut out, sub_id, "channel count", (*num_channels_requested).into())?;
        }
        MessageBody::SetProfileOff { profile } => {
            out.extend_from_slice(profile.as_bytes());
            out.extend_from_slice(&[0, 0]);
        }
        MessageBody::ProfileEnabledReport { profile, num_channels }
        | MessageBody::ProfileDisabledReport { profile, num_channels } => {
            out.extend_from_slice(profile.as_bytes());
            push_u14(&mut out, sub_id, "channel count", (*num_channels).into())?;
        }
        MessageBody::ProfileAddedReport { profile } | MessageBody::ProfileRemovedReport { profile } => {
            out.extend_from_slice(profile.as_bytes());
        }
        MessageBody::ProfileDetailsInquiry { profile, target } => {
            out.extend_from_slice(profile.as_bytes());
            out.push(*target);
        }
        MessageBody::ProfileDetailsReply { profile, target, data } => {
            out.extend_from_slice(profile.as_bytes());
            out.push(*target);
            push_u14(&mut out, sub_id, "profile details length", data.len())?;
            out.extend_from_slice(data);
        }
        MessageBody::ProfileSpecificData { profile, data } => {
            out.extend_from_slice(profile.as_bytes());
            push_u28(&mut out, sub_id, "profile data length", data.len())?;
            out.extend_from_slice(data);
        }

        MessageBody::PropertyCapabilitiesInquiry {
            max_simultaneous_requests,
            major_version,
            minor_version,
        }
        | MessageBody::PropertyCapabilitiesReply {
            max_simultaneous_requests,
            major_version,
            minor_version,
        } => out.extend_from_slice(&[*max_simultaneous_requests, *major_version, *minor_version]),
        MessageBody::GetPropertyData(p)
        | MessageBody::GetPropertyDataReply(p)
        | MessageBody::SetPropertyData(p)
        | MessageBody::SetPropertyDataReply(p)
        | MessageBody::SubscribeProperty(p)
        | MessageBody::SubscribePropertyReply(p)
        | MessageBody::PropertyNotify(p) => {
            let PropertyData {
                request_id,
                header,
                body,
            } = p;
            push_property_chunk(&mut out, sub_id, *request_id, header, 1, 1, body)?;
        }

        MessageBody::ProcessInquiryCapabilities | MessageBody::EndOfMidiMessageReport => {}
        MessageBody::ProcessInquiryCapabilitiesReply { supported_features } => out.push(*supported_features),
        MessageBody::MidiMessageReportInquiry {
            message_data_control,
            system_messages,
            channel_controller_messages,
            note_data_messages,
        } => out.extend_from_slice(&[
            *message_data_control,
            *system_messages,
            0,
            *channel_controller_messages,
            *note_data_messages,
        ]),
        MessageBody::MidiMessageReportReply {
            system_messages,
            channel_controller_messages,
            note_data_messages,
        } => out.extend_from_slice(&[*system_messages, 0, *channel_controller_messages, *note_data_messages]),
    }
    Ok(out)
}

/// Serializes `msg`, splitting property bodies into chunks of at most
/// `max_chunk_size` bytes.
pub fn serialize_chunks(msg: &Message, max_chunk_size: usize) -> Result<Vec<Vec<u8>>> {
    match msg.body.property_data() {
        Some(p) => property_chunks(
            max_chunk_size,
            msg.sub_id2(),
            msg.address,
            msg.source,
            msg.destination,
            p.request_id,
            &p.header,
            &p.body,
        ),
        None => serialize(msg).map(|packet| vec![packet]),
    }
}
