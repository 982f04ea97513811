//! The `Ump` packet type and its field accessors.
//!
//! A packet is stored as four big-endian-ordered 32-bit words. Words beyond the
//! size implied by the message type are always zero, so two packets compare
//! equal exactly when their meaningful words do.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// UMP message type nibbles (bits 28-31 of the first word).
pub mod message_type {
    pub const UTILITY: u8 = 0x0;
    pub const SYSTEM: u8 = 0x1;
    pub const MIDI1: u8 = 0x2;
    pub const SYSEX7: u8 = 0x3;
    pub const MIDI2: u8 = 0x4;
    pub const SYSEX8_MDS: u8 = 0x5;
    pub const FLEX_DATA: u8 = 0xD;
    pub const UMP_STREAM: u8 = 0xF;
}

/// Utility message status nibbles (bits 20-23 of the first word).
pub mod utility_status {
    pub const NOOP: u8 = 0x0;
    pub const JR_CLOCK: u8 = 0x1;
    pub const JR_TIMESTAMP: u8 = 0x2;
    pub const DCTPQ: u8 = 0x3;
    pub const DELTA_CLOCKSTAMP: u8 = 0x4;
}

/// Position status of SysEx7/SysEx8 packets and multi-packet text forms.
pub mod binary_chunk_status {
    pub const COMPLETE_PACKET: u8 = 0x0;
    pub const START: u8 = 0x1;
    pub const CONTINUE: u8 = 0x2;
    pub const END: u8 = 0x3;
}

/// Number of 32-bit words in a packet of the given message type.
pub const fn word_count(message_type: u8) -> usize {
    match message_type & 0xF {
        0x0 | 0x1 | 0x2 | 0x6 | 0x7 => 1,
        0x3 | 0x4 | 0x8 | 0x9 | 0xA => 2,
        0xB | 0xC => 3,
        _ => 4,
    }
}

/// One Universal MIDI Packet (32, 64, 96 or 128 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ump {
    words: [u32; 4],
}

impl Ump {
    /// Builds a packet from its words; words past the packet size are cleared.
    pub fn from_words(w0: u32, w1: u32, w2: u32, w3: u32) -> Self {
        let mut words = [w0, w1, w2, w3];
        let n = word_count((w0 >> 28) as u8);
        for w in words.iter_mut().skip(n) {
            *w = 0;
        }
        Self { words }
    }

    /// Builds a packet from 16 bytes in wire (big-endian) order.
    pub fn from_be_bytes(bytes: [u8; 16]) -> Self {
        let w = |i: usize| u32::from_be_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        Self::from_words(w(0), w(4), w(8), w(12))
    }

    pub fn word(&self, index: usize) -> u32 {
        self.words.get(index).copied().unwrap_or(0)
    }

    /// The meaningful words of this packet.
    pub fn words(&self) -> &[u32] {
        &self.words[..word_count(self.message_type())]
    }

    pub fn to_words(&self) -> [u32; 4] {
        self.words
    }

    /// First two words as one 64-bit value.
    pub fn as_u64(&self) -> u64 {
        ((self.words[0] as u64) << 32) | self.words[1] as u64
    }

    pub fn message_type(&self) -> u8 {
        (self.words[0] >> 28) as u8
    }

    pub fn size_in_bytes(&self) -> usize {
        word_count(self.message_type()) * 4
    }

    pub fn group(&self) -> u8 {
        ((self.words[0] >> 24) & 0xF) as u8
    }

    /// Second byte of the first word (status and channel for channel messages).
    pub fn status_byte(&self) -> u8 {
        ((self.words[0] >> 16) & 0xFF) as u8
    }

    /// Status without the channel (or byte count) nibble. System messages keep all 8 bits.
    pub fn status_code(&self) -> u8 {
        match self.message_type() {
            message_type::SYSTEM => self.status_byte(),
            _ => self.status_byte() & 0xF0,
        }
    }

    pub fn channel(&self) -> u8 {
        self.status_byte() & 0xF
    }

    /// Group in the high nibble, channel in the low nibble.
    pub fn group_and_channel(&self) -> u8 {
        (self.group() << 4) | self.channel()
    }

    pub fn is_channel_message(&self) -> bool {
        matches!(
            self.message_type(),
            message_type::MIDI1 | message_type::MIDI2
        )
    }

    pub fn msb(&self) -> u8 {
        ((self.words[0] >> 8) & 0xFF) as u8
    }

    pub fn lsb(&self) -> u8 {
        (self.words[0] & 0xFF) as u8
    }

    fn utility_status(&self) -> Option<u8> {
        (self.message_type() == message_type::UTILITY).then(|| ((self.words[0] >> 20) & 0xF) as u8)
    }

    pub fn is_delta_clockstamp(&self) -> bool {
        self.utility_status() == Some(utility_status::DELTA_CLOCKSTAMP)
    }

    /// Ticks of a Delta Clockstamp (20 bits).
    pub fn delta_clockstamp(&self) -> u32 {
        self.words[0] & 0xF_FFFF
    }

    pub fn is_jr_timestamp(&self) -> bool {
        self.utility_status() == Some(utility_status::JR_TIMESTAMP)
    }

    /// Ticks (1/31250 s) of a JR Timestamp.
    pub fn jr_timestamp(&self) -> u32 {
        self.words[0] & 0xFFFF
    }

    pub fn is_dctpq(&self) -> bool {
        self.utility_status() == Some(utility_status::DCTPQ)
    }

    /// Ticks per quarter note of a DCTPQ message.
    pub fn dctpq(&self) -> u16 {
        (self.words[0] & 0xFFFF) as u16
    }

    /// Flex Data status bank and status, when this is a Flex Data packet.
    pub fn flex_data_status(&self) -> Option<(u8, u8)> {
        (self.message_type() == message_type::FLEX_DATA)
            .then(|| (((self.words[0] >> 8) & 0xFF) as u8, (self.words[0] & 0xFF) as u8))
    }

    pub fn is_tempo(&self) -> bool {
        self.flex_data_status() == Some((0, 0))
    }

    /// Tempo in units of 10 nanoseconds per quarter note.
    pub fn tempo(&self) -> Option<u32> {
        self.is_tempo().then_some(self.words[1])
    }

    /// The 2-bit form field of Flex Data and UMP Stream packets.
    pub fn form(&self) -> u8 {
        match self.message_type() {
            message_type::FLEX_DATA => ((self.words[0] >> 22) & 3) as u8,
            message_type::UMP_STREAM => ((self.words[0] >> 26) & 3) as u8,
            _ => binary_chunk_status::COMPLETE_PACKET,
        }
    }

    /// 10-bit UMP Stream status.
    pub fn stream_status(&self) -> Option<u16> {
        (self.message_type() == message_type::UMP_STREAM)
            .then(|| ((self.words[0] >> 16) & 0x3FF) as u16)
    }

    /// All 16 bytes in wire (big-endian) order.
    pub fn to_be_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        for (i, w) in self.words.iter().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(&w.to_be_bytes());
        }
        out
    }
}

impl From<u32> for Ump {
    fn from(value: u32) -> Self {
        Self::from_words(value, 0, 0, 0)
    }
}

impl From<u64> for Ump {
    fn from(value: u64) -> Self {
        Self::from_words((value >> 32) as u32, value as u32, 0, 0)
    }
}

impl From<(u64, u64)> for Ump {
    fn from((hi, lo): (u64, u64)) -> Self {
        Self::from_words((hi >> 32) as u32, hi as u32, (lo >> 32) as u32, lo as u32)
    }
}

impl std::fmt::Display for Ump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let words = self.words();
        for (i, w) in words.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{w:08X}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_count_per_message_type() {
        for mt in [0x0, 0x1, 0x2, 0x6, 0x7] {
            assert_eq!(word_count(mt), 1, "type {mt:X}");
        }
        for mt in [0x3, 0x4, 0x8, 0x9, 0xA] {
            assert_eq!(word_count(mt), 2, "type {mt:X}");
        }
        assert_eq!(word_count(0xB), 3);
        assert_eq!(word_count(0xC), 3);
        for mt in [0x5, 0xD, 0xE, 0xF] {
            assert_eq!(word_count(mt), 4, "type {mt:X}");
        }
    }

    #[test]
    fn test_unused_words_are_cleared() {
        let ump = Ump::from_words(0x2192_410A, 0xFFFF_FFFF, 1, 2);
        assert_eq!(ump.words(), &[0x2192_410A]);
        assert_eq!(ump, Ump::from(0x2192_410Au32));
    }

    #[test]
    fn test_channel_accessors() {
        let ump = Ump::from(0x4192_4003_FEDC_4100u64);
        assert_eq!(ump.message_type(), message_type::MIDI2);
        assert_eq!(ump.group(), 1);
        assert_eq!(ump.status_code(), 0x90);
        assert_eq!(ump.channel(), 2);
        assert_eq!(ump.group_and_channel(), 0x12);
        assert_eq!(ump.msb(), 0x40);
        assert_eq!(ump.size_in_bytes(), 8);
        assert!(ump.is_channel_message());
    }

    #[test]
    fn test_timestamp_accessors() {
        let dc = Ump::from(0x0040_0123u32);
        assert!(dc.is_delta_clockstamp());
        assert_eq!(dc.delta_clockstamp(), 0x123);

        let jr = Ump::from(0x0020_7A12u32);
        assert!(jr.is_jr_timestamp());
        assert!(!jr.is_delta_clockstamp());
        assert_eq!(jr.jr_timestamp(), 31250);
    }

    #[test]
    fn test_display() {
        let ump = Ump::from(0x4182_4000_1234_0000u64);
        assert_eq!(ump.to_string(), "41824000 12340000");
    }
}
