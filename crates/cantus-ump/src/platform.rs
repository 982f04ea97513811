//! Conversion between flat byte buffers and packets.

use crate::error::{Error, Result};
use crate::ump::{word_count, Ump};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    Big,
    Little,
}

impl ByteOrder {
    /// Byte order of the running platform.
    pub fn native() -> Self {
        if cfg!(target_endian = "little") {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        }
    }

    fn read(self, b: &[u8]) -> u32 {
        let bytes = [b[0], b[1], b[2], b[3]];
        match self {
            ByteOrder::Big => u32::from_be_bytes(bytes),
            ByteOrder::Little => u32::from_le_bytes(bytes),
        }
    }

    fn write(self, w: u32) -> [u8; 4] {
        match self {
            ByteOrder::Big => w.to_be_bytes(),
            ByteOrder::Little => w.to_le_bytes(),
        }
    }
}

/// Splits a buffer of words into packets, the size of each inferred from its
/// message type. Fails when the buffer ends inside a packet.
pub fn from_platform_bytes(order: ByteOrder, bytes: &[u8]) -> Result<Vec<Ump>> {
    let mut packets = Vec::new();
    let mut offset = 0;
    while offset < bytes.len() {
        if bytes.len() - offset < 4 {
            return Err(Error::InvalidPacket(format!(
                "{} trailing bytes at offset {offset}",
                bytes.len() - offset
            )));
        }
        let first = order.read(&bytes[offset..]);
        let count = word_count((first >> 28) as u8);
        if bytes.len() - offset < count * 4 {
            return Err(Error::InvalidPacket(format!(
                "packet at offset {offset} needs {count} words"
            )));
        }
        let mut words = [0u32; 4];
        for (i, w) in words.iter_mut().enumerate().take(count) {
            *w = order.read(&bytes[offset + i * 4..]);
        }
        packets.push(Ump::from_words(words[0], words[1], words[2], words[3]));
        offset += count * 4;
    }
    Ok(packets)
}

/// The meaningful words of one packet in the requested byte order.
pub fn to_platform_bytes(ump: &Ump, order: ByteOrder) -> Vec<u8> {
    ump.words().iter().flat_map(|&w| order.write(w)).collect()
}

/// All packets concatenated in the requested byte order.
pub fn umps_to_platform_bytes<'a>(umps: impl IntoIterator<Item = &'a Ump>, order: ByteOrder) -> Vec<u8> {
    umps.into_iter().flat_map(|u| to_platform_bytes(u, order)).collect()
}
