//! Reassembly of multi-packet payloads: SysEx7, SysEx8 and text messages.

use crate::error::{Error, Result};
use crate::ump::{binary_chunk_status, message_type, Ump};

fn is_last(status: u8) -> bool {
    status == binary_chunk_status::COMPLETE_PACKET || status == binary_chunk_status::END
}

fn expect_type(ump: &Ump, expected: u8) -> Result<()> {
    if ump.message_type() == expected {
        Ok(())
    } else {
        Err(Error::InvalidPacket(format!(
            "expected message type {expected:X}, got {ump}"
        )))
    }
}

/// Concatenates the SysEx7 payload of packets up to the first complete or end packet.
pub fn get_sysex7_data<'a>(packets: impl IntoIterator<Item = &'a Ump>) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for ump in packets {
        expect_type(ump, message_type::SYSEX7)?;
        let bytes = ump.to_be_bytes();
        let size = (bytes[1] & 0xF).min(6) as usize;
        out.extend_from_slice(&bytes[2..2 + size]);
        if is_last(bytes[1] >> 4) {
            break;
        }
    }
    Ok(out)
}

/// Concatenates the SysEx8 payload of packets, dropping the stream id byte.
pub fn get_sysex8_data<'a>(packets: impl IntoIterator<Item = &'a Ump>) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for ump in packets {
        expect_type(ump, message_type::SYSEX8_MDS)?;
        let bytes = ump.to_be_bytes();
        // the count nibble includes the stream id
        let size = (bytes[1] & 0xF).saturating_sub(1).min(13) as usize;
        out.extend_from_slice(&bytes[3..3 + size]);
        if is_last(bytes[1] >> 4) {
            break;
        }
    }
    Ok(out)
}

fn collect_text<'a>(
    packets: impl IntoIterator<Item = &'a Ump>,
    kind: u8,
    offset: usize,
) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for ump in packets {
        expect_type(ump, kind)?;
        out.extend_from_slice(&ump.to_be_bytes()[offset..]);
        if is_last(ump.form()) {
            break;
        }
    }
    // only the padding of the final packet is trimmed; embedded NULs stay
    while out.last() == Some(&0) {
        out.pop();
    }
    Ok(out)
}

/// Text bytes of a (possibly multi-packet) Flex Data text message.
pub fn get_flex_text<'a>(packets: impl IntoIterator<Item = &'a Ump>) -> Result<Vec<u8>> {
    collect_text(packets, message_type::FLEX_DATA, 4)
}

/// Text bytes of a UMP Stream name or product instance id message.
/// Function block names carry the block number first; pass `true` for `skip_block_number`.
pub fn get_stream_text<'a>(
    packets: impl IntoIterator<Item = &'a Ump>,
    skip_block_number: bool,
) -> Result<Vec<u8>> {
    collect_text(packets, message_type::UMP_STREAM, if skip_block_number { 3 } else { 2 })
}
