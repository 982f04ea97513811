//! Parsed MIDI 2.0 channel voice messages and MIDI 1.0 -> 2.0 value scaling.

use crate::factory::{self, channel_status, per_note_management, PROGRAM_CHANGE_BANK_VALID};
use crate::ump::{message_type, Ump};

/// Decoded view of a type 4 (MIDI 2.0 channel voice) packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Midi2ChannelMessage {
    NoteOn {
        note: u8,
        velocity: u16,
        attribute_type: u8,
        attribute: u16,
    },
    NoteOff {
        note: u8,
        velocity: u16,
        attribute_type: u8,
        attribute: u16,
    },
    KeyPressure {
        note: u8,
        pressure: u32,
    },
    ControlChange {
        controller: u8,
        value: u32,
    },
    /// Program change; `bank` is `(msb, lsb)` when the bank-valid flag is set.
    ProgramChange {
        program: u8,
        bank: Option<(u8, u8)>,
    },
    ChannelPressure {
        pressure: u32,
    },
    /// Raw 32-bit pitch bend, center at 0x80000000.
    PitchBend {
        bend: u32,
    },
    PerNotePitchBend {
        note: u8,
        bend: u32,
    },
    RegisteredPerNoteController {
        note: u8,
        index: u8,
        value: u32,
    },
    AssignablePerNoteController {
        note: u8,
        index: u8,
        value: u32,
    },
    RegisteredController {
        bank: u8,
        index: u8,
        value: u32,
    },
    AssignableController {
        bank: u8,
        index: u8,
        value: u32,
    },
    RelativeRegisteredController {
        bank: u8,
        index: u8,
        value: i32,
    },
    RelativeAssignableController {
        bank: u8,
        index: u8,
        value: i32,
    },
    PerNoteManagement {
        note: u8,
        detach: bool,
        reset: bool,
    },
}

impl Midi2ChannelMessage {
    /// Decodes a MIDI 2.0 channel voice packet; other packets yield `None`.
    pub fn parse(ump: &Ump) -> Option<Self> {
        if ump.message_type() != message_type::MIDI2 {
            return None;
        }
        let note = ump.msb() & 0x7F;
        let index = ump.lsb();
        let data = ump.word(1);
        let message = match ump.status_code() {
            channel_status::NOTE_ON => Self::NoteOn {
                note,
                velocity: (data >> 16) as u16,
                attribute_type: index,
                attribute: data as u16,
            },
            channel_status::NOTE_OFF => Self::NoteOff {
                note,
                velocity: (data >> 16) as u16,
                attribute_type: index,
                attribute: data as u16,
            },
            channel_status::PAF => Self::KeyPressure { note, pressure: data },
            channel_status::CC => Self::ControlChange {
                controller: note,
                value: data,
            },
            channel_status::PROGRAM => Self::ProgramChange {
                program: ((data >> 24) & 0x7F) as u8,
                bank: (index & PROGRAM_CHANGE_BANK_VALID != 0)
                    .then_some((((data >> 8) & 0x7F) as u8, (data & 0x7F) as u8)),
            },
            channel_status::CAF => Self::ChannelPressure { pressure: data },
            channel_status::PITCH_BEND => Self::PitchBend { bend: data },
            channel_status::PER_NOTE_PITCH_BEND => Self::PerNotePitchBend { note, bend: data },
            channel_status::PER_NOTE_RCC => Self::RegisteredPerNoteController {
                note,
                index,
                value: data,
            },
            channel_status::PER_NOTE_ACC => Self::AssignablePerNoteController {
                note,
                index,
                value: data,
            },
            channel_status::RPN => Self::RegisteredController {
                bank: note,
                index: index & 0x7F,
                value: data,
            },
            channel_status::NRPN => Self::AssignableController {
                bank: note,
                index: index & 0x7F,
                value: data,
            },
            channel_status::RELATIVE_RPN => Self::RelativeRegisteredController {
                bank: note,
                index: index & 0x7F,
                value: data as i32,
            },
            channel_status::RELATIVE_NRPN => Self::RelativeAssignableController {
                bank: note,
                index: index & 0x7F,
                value: data as i32,
            },
            channel_status::PER_NOTE_MANAGEMENT => Self::PerNoteManagement {
                note,
                detach: index & per_note_management::DETACH != 0,
                reset: index & per_note_management::RESET != 0,
            },
            _ => return None,
        };
        Some(message)
    }

    pub fn is_note(&self) -> bool {
        matches!(self, Self::NoteOn { .. } | Self::NoteOff { .. })
    }
}

/// 7-bit velocity to 16-bit; zero stays zero.
#[inline]
pub fn midi1_velocity_to_midi2(v: u8) -> u16 {
    if v == 0 {
        0
    } else {
        ((v as u32 * 65535 + 63) / 127) as u16
    }
}

#[inline]
pub fn midi2_velocity_to_midi1(v: u16) -> u8 {
    ((v as u32 * 127 + 32767) / 65535).min(127) as u8
}

/// 7-bit controller value to 32-bit, mapping 127 to the full scale.
#[inline]
pub fn midi1_value_to_midi2(v: u8) -> u32 {
    match v {
        0 => 0,
        127..=u8::MAX => 0xFFFF_FFFF,
        _ => ((v as u64 * 0xFFFF_FFFF + 63) / 127) as u32,
    }
}

#[inline]
pub fn midi2_value_to_midi1(v: u32) -> u8 {
    ((v as u64 * 127 + 0x7FFF_FFFF) / 0xFFFF_FFFF).min(127) as u8
}

/// 14-bit pitch bend (center 8192) to 32-bit (center 0x80000000).
#[inline]
pub fn midi1_pitch_bend_to_midi2(v: u16) -> u32 {
    match v {
        0 => 0,
        16383..=u16::MAX => 0xFFFF_FFFF,
        _ => ((v as u64 * 0xFFFF_FFFF + 8191) / 16383) as u32,
    }
}

#[inline]
pub fn midi2_pitch_bend_to_midi1(v: u32) -> u16 {
    ((v as u64 * 16383 + 0x7FFF_FFFF) / 0xFFFF_FFFF).min(16383) as u16
}

/// Converts a type 2 (MIDI 1.0 channel voice) packet into its type 4 equivalent.
/// Other packets are returned unchanged. A MIDI 1.0 note on with velocity 0 becomes a note off.
pub fn midi1_to_midi2(ump: &Ump) -> Ump {
    if ump.message_type() != message_type::MIDI1 {
        return *ump;
    }
    let (group, channel, msb, lsb) = (ump.group(), ump.channel(), ump.msb(), ump.lsb());
    let packet = match ump.status_code() {
        channel_status::NOTE_ON if lsb == 0 => factory::midi2_note_off(group, channel, msb, 0, 0, 0),
        channel_status::NOTE_ON => {
            factory::midi2_note_on(group, channel, msb, 0, midi1_velocity_to_midi2(lsb), 0)
        }
        channel_status::NOTE_OFF => {
            factory::midi2_note_off(group, channel, msb, 0, midi1_velocity_to_midi2(lsb), 0)
        }
        channel_status::PAF => factory::midi2_paf(group, channel, msb, midi1_value_to_midi2(lsb)),
        channel_status::CC => factory::midi2_cc(group, channel, msb, midi1_value_to_midi2(lsb)),
        channel_status::PROGRAM => factory::midi2_program(group, channel, 0, msb, 0, 0),
        channel_status::CAF => factory::midi2_caf(group, channel, midi1_value_to_midi2(msb)),
        channel_status::PITCH_BEND => factory::midi2_pitch_bend_direct(
            group,
            channel,
            midi1_pitch_bend_to_midi2(((lsb as u16) << 7) | msb as u16),
        ),
        _ => return *ump,
    };
    Ump::from(packet)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_note_on_with_attribute() {
        let ump = Ump::from(factory::midi2_note_on(1, 2, 0x40, 3, 0xFEDC, 0x4100));
        assert_eq!(
            Midi2ChannelMessage::parse(&ump),
            Some(Midi2ChannelMessage::NoteOn {
                note: 0x40,
                velocity: 0xFEDC,
                attribute_type: 3,
                attribute: 0x4100,
            })
        );
    }

    #[test]
    fn test_parse_program_change_bank() {
        let with_bank = Ump::from(factory::midi2_program(0, 0, PROGRAM_CHANGE_BANK_VALID, 5, 1, 2));
        assert_eq!(
            Midi2ChannelMessage::parse(&with_bank),
            Some(Midi2ChannelMessage::ProgramChange {
                program: 5,
                bank: Some((1, 2)),
            })
        );
        let without = Ump::from(factory::midi2_program(0, 0, 0, 5, 1, 2));
        assert_eq!(
            Midi2ChannelMessage::parse(&without),
            Some(Midi2ChannelMessage::ProgramChange { program: 5, bank: None })
        );
    }

    #[test]
    fn test_parse_relative_and_management() {
        let rel = Ump::from(factory::midi2_relative_rpn(0, 0, 1, 2, -5));
        assert_eq!(
            Midi2ChannelMessage::parse(&rel),
            Some(Midi2ChannelMessage::RelativeRegisteredController {
                bank: 1,
                index: 2,
                value: -5,
            })
        );
        let pnm = Ump::from(factory::midi2_per_note_management(0, 0, 60, 3));
        assert_eq!(
            Midi2ChannelMessage::parse(&pnm),
            Some(Midi2ChannelMessage::PerNoteManagement {
                note: 60,
                detach: true,
                reset: true,
            })
        );
    }

    #[test]
    fn test_parse_rejects_other_types() {
        assert_eq!(Midi2ChannelMessage::parse(&Ump::from(0x2090_4064u32)), None);
    }

    #[test]
    fn test_value_scaling_round_trip() {
        for v in 0..=127u8 {
            assert_eq!(midi2_velocity_to_midi1(midi1_velocity_to_midi2(v)), v);
            assert_eq!(midi2_value_to_midi1(midi1_value_to_midi2(v)), v);
        }
        assert_eq!(midi1_pitch_bend_to_midi2(0), 0);
        assert_eq!(midi1_pitch_bend_to_midi2(16383), 0xFFFF_FFFF);
        assert_eq!(midi2_pitch_bend_to_midi1(midi1_pitch_bend_to_midi2(8192)), 8192);
    }

    #[test]
    fn test_midi1_to_midi2() {
        let on = midi1_to_midi2(&Ump::from(factory::midi1_note_on(1, 2, 60, 127)));
        assert_eq!(on, Ump::from(factory::midi2_note_on(1, 2, 60, 0, 0xFFFF, 0)));

        let zero = midi1_to_midi2(&Ump::from(factory::midi1_note_on(0, 0, 60, 0)));
        assert!(matches!(
            Midi2ChannelMessage::parse(&zero),
            Some(Midi2ChannelMessage::NoteOff { note: 60, .. })
        ));

        let tempo = factory::tempo(0, 0, 50_000_000);
        assert_eq!(midi1_to_midi2(&tempo), tempo);
    }
}
