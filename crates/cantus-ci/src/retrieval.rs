//! Parsing of CI sysex payloads (without F0/F7) into typed messages.

use cantus_ump::DeviceDetails;

use crate::constants::{sub_id2, HEADER_SIZE, SUB_ID_1_MIDI_CI, UNIVERSAL_SYSEX};
use crate::error::{Error, Result};
use crate::message::{AckNak, Message, MessageBody, PropertyData};
use crate::muid::Muid;
use crate::profile::MidiCiProfileId;

/// The fixed 13-byte envelope of every CI message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CiHeader {
    pub address: u8,
    pub sub_id2: u8,
    pub version: u8,
    pub source: Muid,
    pub destination: Muid,
}

/// One chunk of a property exchange message as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyChunk {
    pub request_id: u8,
    pub header: Vec<u8>,
    pub num_chunks: u16,
    pub chunk_index: u16,
    pub body: Vec<u8>,
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    sub_id: u8,
}

impl<'a> Cursor<'a> {
    fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos + len;
        if end > self.data.len() {
            return Err(Error::malformed(
                self.sub_id,
                format!("expected {len} bytes at offset {}, {} available", self.pos, self.data.len() - self.pos),
            ));
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn byte(&mut self) -> Result<u8> {
        Ok(self.bytes(1)?[0])
    }

    fn optional_byte(&mut self) -> u8 {
        self.byte().unwrap_or(0)
    }

    fn u14(&mut self) -> Result<u16> {
        let b = self.bytes(2)?;
        Ok((b[0] & 0x7F) as u16 | (((b[1] & 0x7F) as u16) << 7))
    }

    fn u28(&mut self) -> Result<u32> {
        let b = self.bytes(4)?;
        Ok(b.iter().enumerate().fold(0u32, |acc, (i, v)| acc | (((v & 0x7F) as u32) << (7 * i))))
    }

    fn muid(&mut self) -> Result<Muid> {
        let b = self.bytes(4)?;
        Muid::from_bytes([b[0], b[1], b[2], b[3]])
    }

    fn device(&mut self) -> Result<DeviceDetails> {
        let b = self.bytes(11)?;
        let manufacturer = b[0] as u32 | (b[1] as u32) << 8 | (b[2] as u32) << 16;
        let family = b[3] as u16 | (b[4] as u16) << 8;
        let model = b[5] as u16 | (b[6] as u16) << 8;
        let version = b[7] as u32 | (b[8] as u32) << 8 | (b[9] as u32) << 16 | (b[10] as u32) << 24;
        Ok(DeviceDetails::new(manufacturer, family, model, version))
    }

    fn profile(&mut self) -> Result<MidiCiProfileId> {
        let b = self.bytes(5)?;
        Ok(MidiCiProfileId::new([b[0], b[1], b[2], b[3], b[4]]))
    }

    fn profile_list(&mut self) -> Result<Vec<MidiCiProfileId>> {
        let count = self.u14()?;
        (0..count).map(|_| self.profile()).collect()
    }

    fn sized(&mut self, len: usize) -> Result<Vec<u8>> {
        Ok(self.bytes(len)?.to_vec())
    }
}

/// Returns `true` if `data` starts like a MIDI-CI message.
pub fn is_midi_ci(data: &[u8]) -> bool {
    data.len() >= 4 && data[0] == UNIVERSAL_SYSEX && data[2] == SUB_ID_1_MIDI_CI
}

pub fn parse_header(data: &[u8]) -> Result<CiHeader> {
    if !is_midi_ci(data) {
        return Err(Error::malformed(0, "not a MIDI-CI message"));
    }
    let mut c = Cursor {
        data,
        pos: 0,
        sub_id: data[3],
    };
    let envelope = c.bytes(5)?;
    Ok(CiHeader {
        address: envelope[1],
        sub_id2: envelope[3],
        version: envelope[4],
        source: c.muid()?,
        destination: c.muid()?,
    })
}

pub fn parse_property_chunk(data: &[u8]) -> Result<PropertyChunk> {
    let header = parse_header(data)?;
    let mut c = Cursor {
        data,
        pos: HEADER_SIZE,
        sub_id: header.sub_id2,
    };
    let request_id = c.byte()?;
    let header_len = c.u14()? as usize;
    let header = c.sized(header_len)?;
    let num_chunks = c.u14()?;
    let chunk_index = c.u14()?;
    let body_len = c.u14()? as usize;
    let body = c.sized(body_len)?;
    Ok(PropertyChunk {
        request_id,
        header,
        num_chunks,
        chunk_index,
        body,
    })
}

/// Parses a complete message. Property messages are taken as one chunk;
/// multi-chunk transfers are reassembled by
/// [`PropertyChunkManager`](crate::PropertyChunkManager).
///
/// Unknown sub-ids yield `Ok(None)`.
pub fn parse(group: u8, data: &[u8]) -> Result<Option<Message>> {
    let header = parse_header(data)?;
    let mut c = Cursor {
        data,
        pos: HEADER_SIZE,
        sub_id: header.sub_id2,
    };

    let body = match header.sub_id2 {
        sub_id2::DISCOVERY_INQUIRY => MessageBody::DiscoveryInquiry {
            device: c.device()?,
            ci_category_supported: c.byte()?,
            receivable_max_sysex_size: c.u28()?,
            // only present from CI version 1.2
            output_path_id: c.optional_byte(),
        },
        sub_id2::DISCOVERY_REPLY => MessageBody::DiscoveryReply {
            device: c.device()?,
            ci_category_supported: c.byte()?,
            receivable_max_sysex_size: c.u28()?,
            output_path_id: c.optional_byte(),
            function_block: c.optional_byte(),
        },
        sub_id2::ENDPOINT_MESSAGE_INQUIRY => MessageBody::EndpointInquiry { status: c.byte()? },
        sub_id2::ENDPOINT_MESSAGE_REPLY => {
            let status = c.byte()?;
            let len = c.u14()? as usize;
            MessageBody::EndpointReply {
                status,
                data: c.sized(len)?,
            }
        }
        sub_id2::INVALIDATE_MUID => MessageBody::InvalidateMuid { target_muid: c.muid()? },
        sub_id2::ACK | sub_id2::NAK => {
            let original_sub_id = c.byte()?;
            let status_code = c.byte()?;
            let status_data = c.byte()?;
            let mut details = [0u8; 5];
            details.copy_from_slice(c.bytes(5)?);
            let len = c.u14()? as usize;
            let ack_nak = AckNak {
                original_sub_id,
                status_code,
                status_data,
                details,
                message_text: c.sized(len)?,
            };
            if header.sub_id2 == sub_id2::ACK {
                MessageBody::Ack(ack_nak)
            } else {
                MessageBody::Nak(ack_nak)
            }
        }

        sub_id2::PROFILE_INQUIRY => MessageBody::ProfileInquiry,
        sub_id2::PROFILE_INQUIRY_REPLY => MessageBody::ProfileReply {
            enabled_profiles: c.profile_list()?,
            disabled_profiles: c.profile_list()?,
        },
        sub_id2::SET_PROFILE_ON => MessageBody::SetProfileOn {
            profile: c.profile()?,
            num_channels_requested: c.u14().unwrap_or(0),
        },
        sub_id2::SET_PROFILE_OFF => MessageBody::SetProfileOff { profile: c.profile()? },
        sub_id2::PROFILE_ENABLED_REPORT => MessageBody::ProfileEnabledReport {
            profile: c.profile()?,
            num_channels: c.u14().unwrap_or(0),
        },
        sub_id2::PROFILE_DISABLED_REPORT => MessageBody::ProfileDisabledReport {
            profile: c.profile()?,
            num_channels: c.u14().unwrap_or(0),
        },
        sub_id2::PROFILE_ADDED_REPORT => MessageBody::ProfileAddedReport { profile: c.profile()? },
        sub_id2::PROFILE_REMOVED_REPORT => MessageBody::ProfileRemovedReport { profile: c.profile()? },
        sub_id2::PROFILE_DETAILS_INQUIRY => MessageBody::ProfileDetailsInquiry {
            profile: c.profile()?,
            target: c.byte()?,
        },
        sub_id2::PROFILE_DETAILS_REPLY => {
            let profile = c.profile()?;
            let target = c.byte()?;
            let len = c.u14()? as usize;
            MessageBody::ProfileDetailsReply {
                profile,
                target,
                data: c.sized(len)?,
            }
        }
        sub_id2::PROFILE_SPECIFIC_DATA => {
            let profile = c.profile()?;
            let len = c.u28()? as usize;
            MessageBody::ProfileSpecificData {
                profile,
                data: c.sized(len)?,
            }
        }

        sub_id2::PROPERTY_CAPABILITIES_INQUIRY => MessageBody::PropertyCapabilitiesInquiry {
            max_simultaneous_requests: c.byte()?,
            major_version: c.optional_byte(),
            minor_version: c.optional_byte(),
        },
        sub_id2::PROPERTY_CAPABILITIES_REPLY => MessageBody::PropertyCapabilitiesReply {
            max_simultaneous_requests: c.byte()?,
            major_version: c.optional_byte(),
            minor_version: c.optional_byte(),
        },
        sub_id if sub_id2::is_property_chunked(sub_id) => {
            let chunk = parse_property_chunk(data)?;
            let data = PropertyData::new(chunk.request_id, chunk.header, chunk.body);
            match MessageBody::from_property_data(sub_id, data) {
                Some(body) => body,
                None => return Ok(None),
            }
        }

        sub_id2::PROCESS_INQUIRY_CAPABILITIES => MessageBody::ProcessInquiryCapabilities,
        sub_id2::PROCESS_INQUIRY_CAPABILITIES_REPLY => MessageBody::ProcessInquiryCapabilitiesReply {
            supported_features: c.byte()?,
        },
        sub_id2::MIDI_MESSAGE_REPORT_INQUIRY => {
            let b = c.bytes(5)?;
            MessageBody::MidiMessageReportInquiry {
                message_data_control: b[0],
                system_messages: b[1],
                channel_controller_messages: b[3],
                note_data_messages: b[4],
            }
        }
        sub_id2::MIDI_MESSAGE_REPORT_REPLY => {
            let b = c.bytes(4)?;
            MessageBody::MidiMessageReportReply {
                system_messages: b[0],
                channel_controller_messages: b[2],
                note_data_messages: b[3],
            }
        }
        sub_id2::END_OF_MIDI_MESSAGE_REPORT => MessageBody::EndOfMidiMessageReport,
        _ => return Ok(None),
    };

    Ok(Some(Message::new(group, header.address, header.source, header.destination, body)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{address, category, endpoint_status};
    use crate::factory::{property_chunks, serialize};

    fn muid(v: u32) -> Muid {
        Muid::new(v).unwrap()
    }

    fn round_trip(body: MessageBody) {
        let msg = Message::new(2, address::FUNCTION_BLOCK, muid(0x11), muid(0x22), body);
        let parsed = parse(2, &serialize(&msg).unwrap()).unwrap().unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_representative_messages() {
        round_trip(MessageBody::DiscoveryReply {
            device: DeviceDetails::new(0x7D, 1, 2, 3),
            ci_category_supported: category::THREE_P,
            receivable_max_sysex_size: 4096,
            output_path_id: 0,
            function_block: 0x7F,
        });
        round_trip(MessageBody::EndpointReply {
            status: endpoint_status::PRODUCT_INSTANCE_ID,
            data: b"cantus-01".to_vec(),
        });
        round_trip(MessageBody::Nak(AckNak {
            original_sub_id: 0x34,
            status_code: 1,
            status_data: 0,
            details: [1, 2, 3, 4, 5],
            message_text: b"nope".to_vec(),
        }));
        round_trip(MessageBody::ProfileReply {
            enabled_profiles: vec![MidiCiProfileId::new([1; 5])],
            disabled_profiles: vec![MidiCiProfileId::new([2; 5]), MidiCiProfileId::new([3; 5])],
        });
        round_trip(MessageBody::MidiMessageReportInquiry {
            message_data_control: 0x7F,
            system_messages: 7,
            channel_controller_messages: 0x3F,
            note_data_messages: 3,
        });
        round_trip(MessageBody::SetPropertyData(PropertyData::new(
            9,
            br#"{"resource":"X"}"#.to_vec(),
            b"[1,2]".to_vec(),
        )));
    }

    #[test]
    fn test_truncated_message_is_malformed() {
        let msg = Message::new(
            0,
            0,
            muid(1),
            muid(2),
            MessageBody::SetProfileOn {
                profile: MidiCiProfileId::new([1; 5]),
                num_channels_requested: 1,
            },
        );
        let bytes = serialize(&msg).unwrap();
        assert!(matches!(
            parse(0, &bytes[..16]),
            Err(Error::Malformed { sub_id: 0x22, .. })
        ));
    }

    #[test]
    fn test_invalid_source_muid() {
        let mut bytes = serialize(&Message::new(0, 0, muid(1), muid(2), MessageBody::ProfileInquiry)).unwrap();
        bytes[5] = 0x80;
        assert!(matches!(parse(0, &bytes), Err(Error::InvalidMuid(_))));
    }

    #[test]
    fn test_unknown_sub_id() {
        let mut bytes = serialize(&Message::new(0, 0, muid(1), muid(2), MessageBody::ProfileInquiry)).unwrap();
        bytes[3] = 0x5A;
        assert_eq!(parse(0, &bytes).unwrap(), None);
    }

    #[test]
    fn test_parse_chunk() {
        let chunks = property_chunks(3, sub_id2::PROPERTY_GET_DATA_REPLY, 0x7F, muid(1), muid(2), 4, b"{}", b"abcde").unwrap();
        let second = parse_property_chunk(&chunks[1]).unwrap();
        assert_eq!(second.request_id, 4);
        assert!(second.header.is_empty());
        assert_eq!((second.num_chunks, second.chunk_index), (2, 2));
        assert_eq!(second.body, b"de");
    }
}
