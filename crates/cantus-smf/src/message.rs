//! MIDI 1.0 messages and timed events as stored in a Standard MIDI File.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Status bytes (channel nibble cleared for channel voice messages).
pub mod midi1_status {
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;
    pub const PAF: u8 = 0xA0;
    pub const CC: u8 = 0xB0;
    pub const PROGRAM: u8 = 0xC0;
    pub const CAF: u8 = 0xD0;
    pub const PITCH_BEND: u8 = 0xE0;
    pub const SYSEX: u8 = 0xF0;
    pub const MTC_QUARTER_FRAME: u8 = 0xF1;
    pub const SONG_POSITION_POINTER: u8 = 0xF2;
    pub const SONG_SELECT: u8 = 0xF3;
    pub const TUNE_REQUEST: u8 = 0xF6;
    pub const SYSEX_END: u8 = 0xF7;
    pub const TIMING_CLOCK: u8 = 0xF8;
    pub const START: u8 = 0xFA;
    pub const CONTINUE: u8 = 0xFB;
    pub const STOP: u8 = 0xFC;
    pub const ACTIVE_SENSING: u8 = 0xFE;
    pub const META: u8 = 0xFF;
}

pub mod meta_type {
    pub const SEQUENCE_NUMBER: u8 = 0x00;
    pub const TEXT: u8 = 0x01;
    pub const COPYRIGHT: u8 = 0x02;
    pub const TRACK_NAME: u8 = 0x03;
    pub const INSTRUMENT_NAME: u8 = 0x04;
    pub const LYRIC: u8 = 0x05;
    pub const MARKER: u8 = 0x06;
    pub const CUE: u8 = 0x07;
    pub const CHANNEL_PREFIX: u8 = 0x20;
    pub const END_OF_TRACK: u8 = 0x2F;
    pub const TEMPO: u8 = 0x51;
    pub const SMPTE_OFFSET: u8 = 0x54;
    pub const TIME_SIGNATURE: u8 = 0x58;
    pub const KEY_SIGNATURE: u8 = 0x59;
    pub const SEQUENCER_SPECIFIC: u8 = 0x7F;
}

/// Controller numbers the channel state machine interprets.
pub mod midi_cc {
    pub const BANK_SELECT: u8 = 0x00;
    pub const DTE_MSB: u8 = 0x06;
    pub const VOLUME: u8 = 0x07;
    pub const BANK_SELECT_LSB: u8 = 0x20;
    pub const DTE_LSB: u8 = 0x26;
    pub const DTE_INCREMENT: u8 = 0x60;
    pub const DTE_DECREMENT: u8 = 0x61;
    pub const NRPN_LSB: u8 = 0x62;
    pub const NRPN_MSB: u8 = 0x63;
    pub const RPN_LSB: u8 = 0x64;
    pub const RPN_MSB: u8 = 0x65;
}

/// Number of data bytes following a status byte in a short message.
pub fn fixed_data_size(status: u8) -> usize {
    match status & 0xF0 {
        0xF0 => match status {
            midi1_status::MTC_QUARTER_FRAME | midi1_status::SONG_SELECT => 1,
            midi1_status::SONG_POSITION_POINTER => 2,
            _ => 0,
        },
        midi1_status::PROGRAM | midi1_status::CAF => 1,
        _ => 2,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Midi1Message {
    /// Channel voice or system common message with up to two data bytes.
    Simple { status: u8, msb: u8, lsb: u8 },
    /// `F0` or `F7` record; `data` excludes the status byte.
    Sysex { status: u8, data: Vec<u8> },
    Meta { meta_type: u8, data: Vec<u8> },
}

impl Midi1Message {
    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self::channel(midi1_status::NOTE_ON, channel, note, velocity)
    }

    pub fn note_off(channel: u8, note: u8, velocity: u8) -> Self {
        Self::channel(midi1_status::NOTE_OFF, channel, note, velocity)
    }

    pub fn cc(channel: u8, controller: u8, value: u8) -> Self {
        Self::channel(midi1_status::CC, channel, controller, value)
    }

    pub fn program(channel: u8, program: u8) -> Self {
        Self::channel(midi1_status::PROGRAM, channel, program, 0)
    }

    /// Pitch bend from a 14-bit value, 8192 being the center.
    pub fn pitch_bend(channel: u8, value: u16) -> Self {
        Self::channel(
            midi1_status::PITCH_BEND,
            channel,
            (value & 0x7F) as u8,
            ((value >> 7) & 0x7F) as u8,
        )
    }

    fn channel(code: u8, channel: u8, msb: u8, lsb: u8) -> Self {
        Self::Simple {
            status: code | (channel & 0xF),
            msb: msb & 0x7F,
            lsb: lsb & 0x7F,
        }
    }

    /// Tempo meta event in microseconds per quarter note.
    pub fn tempo(micros_per_quarter_note: u32) -> Self {
        let b = micros_per_quarter_note.to_be_bytes();
        Self::Meta {
            meta_type: meta_type::TEMPO,
            data: vec![b[1], b[2], b[3]],
        }
    }

    pub fn end_of_track() -> Self {
        Self::Meta {
            meta_type: meta_type::END_OF_TRACK,
            data: Vec::new(),
        }
    }

    pub fn text(meta_type: u8, text: &str) -> Self {
        Self::Meta {
            meta_type,
            data: text.as_bytes().to_vec(),
        }
    }

    /// The full status byte (channel included, `FF` for meta events).
    pub fn status_byte(&self) -> u8 {
        match self {
            Self::Simple { status, .. } | Self::Sysex { status, .. } => *status,
            Self::Meta { .. } => midi1_status::META,
        }
    }

    /// Status without the channel nibble for channel messages.
    pub fn status_code(&self) -> u8 {
        let status = self.status_byte();
        if status < 0xF0 {
            status & 0xF0
        } else {
            status
        }
    }

    pub fn channel_number(&self) -> u8 {
        self.status_byte() & 0x0F
    }

    pub fn is_channel_message(&self) -> bool {
        (0x80..0xF0).contains(&self.status_byte())
    }

    pub fn meta_type(&self) -> Option<u8> {
        match self {
            Self::Meta { meta_type, .. } => Some(*meta_type),
            _ => None,
        }
    }

    pub fn is_end_of_track(&self) -> bool {
        self.meta_type() == Some(meta_type::END_OF_TRACK)
    }

    /// Bytes of a short message as sent on a MIDI 1.0 stream. `None` for
    /// sysex and meta events.
    pub fn to_short_bytes(&self) -> Option<Vec<u8>> {
        match self {
            Self::Simple { status, msb, lsb } => {
                let mut out = vec![*status, *msb, *lsb];
                out.truncate(1 + fixed_data_size(*status));
                Some(out)
            }
            _ => None,
        }
    }

    /// Tempo in microseconds per quarter note, if this is a tempo meta event.
    pub fn tempo_value(&self) -> Option<u32> {
        match self {
            Self::Meta {
                meta_type: meta_type::TEMPO,
                data,
            } if data.len() >= 3 => {
                Some(((data[0] as u32) << 16) | ((data[1] as u32) << 8) | data[2] as u32)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Midi1Event {
    pub delta_time: u32,
    pub message: Midi1Message,
}

impl Midi1Event {
    pub fn new(delta_time: u32, message: Midi1Message) -> Self {
        Self {
            delta_time,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_data_size() {
        assert_eq!(fixed_data_size(0x90), 2);
        assert_eq!(fixed_data_size(0xC3), 1);
        assert_eq!(fixed_data_size(0xD0), 1);
        assert_eq!(fixed_data_size(0xF1), 1);
        assert_eq!(fixed_data_size(0xF2), 2);
        assert_eq!(fixed_data_size(0xF3), 1);
        assert_eq!(fixed_data_size(0xF6), 0);
        assert_eq!(fixed_data_size(0xF8), 0);
        assert_eq!(fixed_data_size(0xFE), 0);
    }

    #[test]
    fn test_status_accessors() {
        let m = Midi1Message::note_on(3, 60, 100);
        assert_eq!(m.status_byte(), 0x93);
        assert_eq!(m.status_code(), midi1_status::NOTE_ON);
        assert_eq!(m.channel_number(), 3);
        assert!(m.is_channel_message());
        assert!(!Midi1Message::end_of_track().is_channel_message());
        assert_eq!(Midi1Message::end_of_track().status_byte(), 0xFF);
    }

    #[test]
    fn test_pitch_bend_split() {
        assert_eq!(
            Midi1Message::pitch_bend(0, 8192),
            Midi1Message::Simple {
                status: 0xE0,
                msb: 0,
                lsb: 0x40
            }
        );
    }

    #[test]
    fn test_short_bytes() {
        assert_eq!(Midi1Message::note_on(1, 60, 100).to_short_bytes(), Some(vec![0x91, 60, 100]));
        assert_eq!(Midi1Message::program(0, 5).to_short_bytes(), Some(vec![0xC0, 5]));
        assert_eq!(Midi1Message::end_of_track().to_short_bytes(), None);
    }

    #[test]
    fn test_tempo_value() {
        let tempo = Midi1Message::tempo(500_000);
        assert_eq!(tempo.tempo_value(), Some(500_000));
        assert_eq!(Midi1Message::end_of_track().tempo_value(), None);
    }
}
