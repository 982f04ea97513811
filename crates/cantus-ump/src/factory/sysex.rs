//! SysEx7 (type 3) and SysEx8 (type 5) packetization.
//!
//! SysEx7 inputs may still carry the MIDI 1.0 `F0`/`F7` delimiters; a leading
//! `F0` is skipped and the payload ends at the first `F7`. SysEx8 payloads are
//! 8-bit clean and taken as-is.

use crate::ump::binary_chunk_status::*;

const SYSEX7_BYTES_PER_PACKET: usize = 6;
const SYSEX8_BYTES_PER_PACKET: usize = 13;

fn strip_sysex_start(src: &[u8]) -> &[u8] {
    match src.first() {
        Some(0xF0) => &src[1..],
        _ => src,
    }
}

fn packet_position(index: usize, num_bytes: usize, per_packet: usize) -> (u8, usize) {
    if num_bytes <= per_packet {
        (COMPLETE_PACKET, num_bytes)
    } else if index == 0 {
        (START, per_packet)
    } else if (index + 1) * per_packet >= num_bytes {
        (END, num_bytes.saturating_sub(index * per_packet))
    } else {
        (CONTINUE, per_packet)
    }
}

// SysEx7 ---------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
pub fn sysex7_direct(
    group: u8,
    status: u8,
    num_bytes: u8,
    data1: u8,
    data2: u8,
    data3: u8,
    data4: u8,
    data5: u8,
    data6: u8,
) -> u64 {
    u64::from_be_bytes([
        0x30 | (group & 0xF),
        ((status & 0xF) << 4) | (num_bytes & 0xF),
        data1,
        data2,
        data3,
        data4,
        data5,
        data6,
    ])
}

/// Length of a SysEx body, skipping a leading `F0` and stopping at `F7`.
pub fn sysex7_get_sysex_length(src: &[u8]) -> usize {
    let body = strip_sysex_start(src);
    body.iter().position(|&b| b == 0xF7).unwrap_or(body.len())
}

/// Number of SysEx7 packets for `num_bytes` of payload; never less than one.
pub fn sysex7_get_packet_count(num_bytes: usize) -> usize {
    num_bytes.div_ceil(SYSEX7_BYTES_PER_PACKET).max(1)
}

/// The `index`-th SysEx7 packet of a `num_bytes` long payload in `src`.
/// An `index` past the last packet yields an empty end packet.
pub fn sysex7_get_packet_of(group: u8, num_bytes: usize, src: &[u8], index: usize) -> u64 {
    let body = strip_sysex_start(src);
    let (status, size) = packet_position(index, num_bytes, SYSEX7_BYTES_PER_PACKET);
    let mut bytes = [0u8; 8];
    bytes[0] = 0x30 | (group & 0xF);
    bytes[1] = (status << 4) | size as u8;
    let start = index * SYSEX7_BYTES_PER_PACKET;
    for (i, slot) in bytes[2..2 + size].iter_mut().enumerate() {
        *slot = body.get(start + i).copied().unwrap_or(0);
    }
    u64::from_be_bytes(bytes)
}

/// Packetizes a SysEx body and hands every packet to `send`.
pub fn sysex7_process(group: u8, src: &[u8], mut send: impl FnMut(u64)) {
    let length = sysex7_get_sysex_length(src);
    for index in 0..sysex7_get_packet_count(length) {
        send(sysex7_get_packet_of(group, length, src, index));
    }
}

/// Collects the packets of [`sysex7_process`].
pub fn sysex7(group: u8, src: &[u8]) -> Vec<u64> {
    let mut out = Vec::with_capacity(sysex7_get_packet_count(src.len()));
    sysex7_process(group, src, |p| out.push(p));
    out
}

// SysEx8 ---------------------------------------------------------------------

/// Number of SysEx8 packets for `num_bytes` of payload; never less than one.
pub fn sysex8_get_packet_count(num_bytes: usize) -> usize {
    num_bytes.div_ceil(SYSEX8_BYTES_PER_PACKET).max(1)
}

/// The `index`-th SysEx8 packet. The byte-count nibble includes the stream id byte.
/// An `index` past the last packet yields an end packet carrying only the stream id.
pub fn sysex8_get_packet_of(
    group: u8,
    stream_id: u8,
    num_bytes: usize,
    src: &[u8],
    index: usize,
) -> (u64, u64) {
    let (status, size) = packet_position(index, num_bytes, SYSEX8_BYTES_PER_PACKET);
    let mut bytes = [0u8; 16];
    bytes[0] = 0x50 | (group & 0xF);
    bytes[1] = (status << 4) | (size as u8 + 1);
    bytes[2] = stream_id;
    let start = index * SYSEX8_BYTES_PER_PACKET;
    for (i, slot) in bytes[3..3 + size].iter_mut().enumerate() {
        *slot = src.get(start + i).copied().unwrap_or(0);
    }
    let (hi, lo) = bytes.split_at(8);
    let word = |s: &[u8]| s.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64);
    (word(hi), word(lo))
}

/// Packetizes an 8-bit payload on stream 0 and hands every packet to `send`.
pub fn sysex8_process(group: u8, src: &[u8], send: impl FnMut(u64, u64)) {
    sysex8_process_stream(group, 0, src, send)
}

pub fn sysex8_process_stream(group: u8, stream_id: u8, src: &[u8], mut send: impl FnMut(u64, u64)) {
    for index in 0..sysex8_get_packet_count(src.len()) {
        let (hi, lo) = sysex8_get_packet_of(group, stream_id, src.len(), src, index);
        send(hi, lo);
    }
}

/// Collects the packets of [`sysex8_process`].
pub fn sysex8(group: u8, src: &[u8]) -> Vec<(u64, u64)> {
    let mut out = Vec::with_capacity(sysex8_get_packet_count(src.len()));
    sysex8_process(group, src, |hi, lo| out.push((hi, lo)));
    out
}
