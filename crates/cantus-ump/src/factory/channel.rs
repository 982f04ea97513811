//! MIDI 1.0 (type 2) and MIDI 2.0 (type 4) channel voice messages.

/// Channel voice status codes (upper nibble of the status byte).
pub mod channel_status {
    pub const PER_NOTE_RCC: u8 = 0x00;
    pub const PER_NOTE_ACC: u8 = 0x10;
    pub const RPN: u8 = 0x20;
    pub const NRPN: u8 = 0x30;
    pub const RELATIVE_RPN: u8 = 0x40;
    pub const RELATIVE_NRPN: u8 = 0x50;
    pub const PER_NOTE_PITCH_BEND: u8 = 0x60;
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;
    pub const PAF: u8 = 0xA0;
    pub const CC: u8 = 0xB0;
    pub const PROGRAM: u8 = 0xC0;
    pub const CAF: u8 = 0xD0;
    pub const PITCH_BEND: u8 = 0xE0;
    pub const PER_NOTE_MANAGEMENT: u8 = 0xF0;
}

/// MIDI 2.0 note attribute types.
pub mod note_attribute {
    pub const NONE: u8 = 0;
    pub const MANUFACTURER_SPECIFIC: u8 = 1;
    pub const PROFILE_SPECIFIC: u8 = 2;
    pub const PITCH7_9: u8 = 3;
}

/// Option flag for program change: bank fields are valid.
pub const PROGRAM_CHANGE_BANK_VALID: u8 = 1;

/// Per-note management flags.
pub mod per_note_management {
    pub const RESET: u8 = 1;
    pub const DETACH: u8 = 2;
}

use channel_status::*;

fn status_byte(code: u8, channel: u8) -> u32 {
    ((code & 0xF0) | (channel & 0xF)) as u32
}

// MIDI 1.0 -------------------------------------------------------------------

pub fn midi1_message(group: u8, code: u8, channel: u8, byte3: u8, byte4: u8) -> u32 {
    0x2000_0000
        | ((group as u32 & 0xF) << 24)
        | (status_byte(code, channel) << 16)
        | ((byte3 as u32 & 0x7F) << 8)
        | (byte4 as u32 & 0x7F)
}

pub fn midi1_note_off(group: u8, channel: u8, note: u8, velocity: u8) -> u32 {
    midi1_message(group, NOTE_OFF, channel, note, velocity)
}

pub fn midi1_note_on(group: u8, channel: u8, note: u8, velocity: u8) -> u32 {
    midi1_message(group, NOTE_ON, channel, note, velocity)
}

pub fn midi1_paf(group: u8, channel: u8, note: u8, data: u8) -> u32 {
    midi1_message(group, PAF, channel, note, data)
}

pub fn midi1_cc(group: u8, channel: u8, index: u8, data: u8) -> u32 {
    midi1_message(group, CC, channel, index, data)
}

pub fn midi1_program(group: u8, channel: u8, program: u8) -> u32 {
    midi1_message(group, PROGRAM, channel, program, 0)
}

pub fn midi1_caf(group: u8, channel: u8, data: u8) -> u32 {
    midi1_message(group, CAF, channel, data, 0)
}

/// Pitch bend from a raw 14-bit value (center 0x2000).
pub fn midi1_pitch_bend_direct(group: u8, channel: u8, data: u16) -> u32 {
    midi1_message(
        group,
        PITCH_BEND,
        channel,
        (data & 0x7F) as u8,
        ((data >> 7) & 0x7F) as u8,
    )
}

/// Pitch bend from a signed value in -8192..=8191.
pub fn midi1_pitch_bend(group: u8, channel: u8, value: i16) -> u32 {
    midi1_pitch_bend_direct(group, channel, (value as i32 + 8192).clamp(0, 0x3FFF) as u16)
}

// MIDI 2.0 -------------------------------------------------------------------

fn midi2_first_word(group: u8, code: u8, channel: u8, byte3: u8, byte4: u8) -> u64 {
    (0x4000_0000
        | ((group as u64 & 0xF) << 24)
        | ((status_byte(code, channel) as u64) << 16)
        | ((byte3 as u64) << 8)
        | byte4 as u64)
        << 32
}

#[allow(clippy::too_many_arguments)]
pub fn midi2_channel_message_8_8_16_16(
    group: u8,
    code: u8,
    channel: u8,
    byte3: u8,
    byte4: u8,
    short1: u16,
    short2: u16,
) -> u64 {
    midi2_first_word(group, code, channel, byte3, byte4) | ((short1 as u64) << 16) | short2 as u64
}

pub fn midi2_channel_message_8_8_32(
    group: u8,
    code: u8,
    channel: u8,
    byte3: u8,
    byte4: u8,
    rest: u32,
) -> u64 {
    midi2_first_word(group, code, channel, byte3, byte4) | rest as u64
}

/// Pitch 7.9 attribute value from a fractional semitone.
pub fn pitch_7_9(semitone: f64) -> u16 {
    let whole = semitone.trunc();
    pitch_7_9_split(whole as u8, semitone - whole)
}

/// Pitch 7.9 attribute value from a semitone and a fraction in 0.0..1.0.
pub fn pitch_7_9_split(semitone: u8, fraction: f64) -> u16 {
    (((semitone as u16) & 0x7F) << 9) | (((fraction * 512.0) as u16) & 0x1FF)
}

pub fn midi2_note_off(
    group: u8,
    channel: u8,
    note: u8,
    attribute_type: u8,
    velocity: u16,
    attribute_data: u16,
) -> u64 {
    midi2_channel_message_8_8_16_16(
        group,
        NOTE_OFF,
        channel,
        note & 0x7F,
        attribute_type,
        velocity,
        attribute_data,
    )
}

pub fn midi2_note_on(
    group: u8,
    channel: u8,
    note: u8,
    attribute_type: u8,
    velocity: u16,
    attribute_data: u16,
) -> u64 {
    midi2_channel_message_8_8_16_16(
        group,
        NOTE_ON,
        channel,
        note & 0x7F,
        attribute_type,
        velocity,
        attribute_data,
    )
}

pub fn midi2_paf(group: u8, channel: u8, note: u8, data: u32) -> u64 {
    midi2_channel_message_8_8_32(group, PAF, channel, note & 0x7F, 0, data)
}

pub fn midi2_cc(group: u8, channel: u8, index: u8, data: u32) -> u64 {
    midi2_channel_message_8_8_32(group, CC, channel, index & 0x7F, 0, data)
}

pub fn midi2_program(
    group: u8,
    channel: u8,
    option_flags: u8,
    program: u8,
    bank_msb: u8,
    bank_lsb: u8,
) -> u64 {
    let rest = ((program as u32 & 0x7F) << 24) | ((bank_msb as u32 & 0x7F) << 8) | (bank_lsb as u32 & 0x7F);
    midi2_channel_message_8_8_32(group, PROGRAM, channel, 0, option_flags, rest)
}

pub fn midi2_caf(group: u8, channel: u8, data: u32) -> u64 {
    midi2_channel_message_8_8_32(group, CAF, channel, 0, 0, data)
}

/// Pitch bend from a raw unsigned value (center 0x80000000).
pub fn midi2_pitch_bend_direct(group: u8, channel: u8, data: u32) -> u64 {
    midi2_channel_message_8_8_32(group, PITCH_BEND, channel, 0, 0, data)
}

/// Pitch bend from a signed value, 0 being the center.
pub fn midi2_pitch_bend(group: u8, channel: u8, data: i32) -> u64 {
    midi2_pitch_bend_direct(group, channel, (data as u32).wrapping_add(0x8000_0000))
}

pub fn midi2_per_note_rcc(group: u8, channel: u8, note: u8, index: u8, data: u32) -> u64 {
    midi2_channel_message_8_8_32(group, PER_NOTE_RCC, channel, note & 0x7F, index, data)
}

pub fn midi2_per_note_acc(group: u8, channel: u8, note: u8, index: u8, data: u32) -> u64 {
    midi2_channel_message_8_8_32(group, PER_NOTE_ACC, channel, note & 0x7F, index, data)
}

pub fn midi2_rpn(group: u8, channel: u8, bank: u8, index: u8, data: u32) -> u64 {
    midi2_channel_message_8_8_32(group, RPN, channel, bank & 0x7F, index & 0x7F, data)
}

pub fn midi2_nrpn(group: u8, channel: u8, bank: u8, index: u8, data: u32) -> u64 {
    midi2_channel_message_8_8_32(group, NRPN, channel, bank & 0x7F, index & 0x7F, data)
}

pub fn midi2_relative_rpn(group: u8, channel: u8, bank: u8, index: u8, data: i32) -> u64 {
    midi2_channel_message_8_8_32(group, RELATIVE_RPN, channel, bank & 0x7F, index & 0x7F, data as u32)
}

pub fn midi2_relative_nrpn(group: u8, channel: u8, bank: u8, index: u8, data: i32) -> u64 {
    midi2_channel_message_8_8_32(group, RELATIVE_NRPN, channel, bank & 0x7F, index & 0x7F, data as u32)
}

pub fn midi2_per_note_pitch_bend_direct(group: u8, channel: u8, note: u8, data: u32) -> u64 {
    midi2_channel_message_8_8_32(group, PER_NOTE_PITCH_BEND, channel, note & 0x7F, 0, data)
}

pub fn midi2_per_note_pitch_bend(group: u8, channel: u8, note: u8, data: i32) -> u64 {
    midi2_per_note_pitch_bend_direct(group, channel, note, (data as u32).wrapping_add(0x8000_0000))
}

pub fn midi2_per_note_management(group: u8, channel: u8, note: u8, option_flags: u8) -> u64 {
    midi2_channel_message_8_8_32(group, PER_NOTE_MANAGEMENT, channel, note & 0x7F, option_flags & 3, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midi1_channel_messages() {
        assert_eq!(midi1_message(1, NOTE_OFF, 2, 65, 10), 0x2182_410A);
        assert_eq!(midi1_note_on(1, 2, 65, 10), 0x2192_410A);
        assert_eq!(midi1_paf(1, 2, 65, 10), 0x21A2_410A);
        assert_eq!(midi1_cc(1, 2, 65, 10), 0x21B2_410A);
        assert_eq!(midi1_program(1, 2, 29), 0x21C2_1D00);
        assert_eq!(midi1_caf(1, 2, 10), 0x21D2_0A00);
    }

    #[test]
    fn test_midi1_pitch_bend() {
        assert_eq!(midi1_pitch_bend_direct(1, 2, 0), 0x21E2_0000);
        assert_eq!(midi1_pitch_bend_direct(1, 2, 1), 0x21E2_0100);
        assert_eq!(midi1_pitch_bend_direct(1, 2, 0x3FFF), 0x21E2_7F7F);
        assert_eq!(midi1_pitch_bend(1, 2, 0), 0x21E2_0040);
        assert_eq!(midi1_pitch_bend(1, 2, -8192), 0x21E2_0000);
        assert_eq!(midi1_pitch_bend(1, 2, 8191), 0x21E2_7F7F);
    }

    #[test]
    fn test_pitch_7_9() {
        assert_eq!(pitch_7_9_split(0x20, 0.5), 0x4100);
        assert_eq!(pitch_7_9(32.5), 0x4100);
    }

    #[test]
    fn test_midi2_generic_layouts() {
        let pitch = pitch_7_9_split(0x20, 0.5);
        assert_eq!(
            midi2_channel_message_8_8_16_16(1, NOTE_OFF, 2, 0x20, note_attribute::PITCH7_9, 0xFEDC, pitch),
            0x4182_2003_FEDC_4100
        );
        assert_eq!(
            midi2_channel_message_8_8_32(1, NOTE_OFF, 2, 0x20, note_attribute::PITCH7_9, 0x1234_5678),
            0x4182_2003_1234_5678
        );
    }

    #[test]
    fn test_midi2_notes() {
        assert_eq!(midi2_note_off(1, 2, 64, 0, 0x1234, 0), 0x4182_4000_1234_0000);
        let pitch = pitch_7_9_split(0x20, 0.5);
        assert_eq!(
            midi2_note_on(1, 2, 64, note_attribute::PITCH7_9, 0xFEDC, pitch),
            0x4192_4003_FEDC_4100
        );
    }

    #[test]
    fn test_midi2_controllers() {
        assert_eq!(midi2_paf(1, 2, 64, 0x8765_4321), 0x41A2_4000_8765_4321);
        assert_eq!(midi2_cc(1, 2, 1, 0x8765_4321), 0x41B2_0100_8765_4321);
        assert_eq!(
            midi2_program(1, 2, PROGRAM_CHANGE_BANK_VALID, 29, 8, 1),
            0x41C2_0001_1D00_0801
        );
        assert_eq!(midi2_caf(1, 2, 0x8765_4321), 0x41D2_0000_8765_4321);
        assert_eq!(midi2_pitch_bend_direct(1, 2, 0x8765_4321), 0x41E2_0000_8765_4321);
        assert_eq!(midi2_pitch_bend(1, 2, 1), 0x41E2_0000_8000_0001);
    }

    #[test]
    fn test_midi2_per_note_and_parameter_numbers() {
        assert_eq!(midi2_per_note_rcc(1, 2, 0x38, 0x10, 0x3333_3333), 0x4102_3810_3333_3333);
        assert_eq!(midi2_per_note_acc(1, 2, 0x38, 0x10, 0x3333_3333), 0x4112_3810_3333_3333);
        assert_eq!(midi2_rpn(1, 2, 0x10, 0x20, 0x1234_5678), 0x4122_1020_1234_5678);
        assert_eq!(midi2_nrpn(1, 2, 0x10, 0x20, 0x1234_5678), 0x4132_1020_1234_5678);
        assert_eq!(midi2_relative_rpn(1, 2, 0x10, 0x20, 0x1234_5678), 0x4142_1020_1234_5678);
        assert_eq!(midi2_relative_nrpn(1, 2, 0x10, 0x20, 0x1234_5678), 0x4152_1020_1234_5678);
        assert_eq!(
            midi2_per_note_pitch_bend_direct(1, 2, 0x38, 0x8765_4321),
            0x4162_3800_8765_4321
        );
        assert_eq!(midi2_per_note_pitch_bend(1, 2, 0x38, 1), 0x4162_3800_8000_0001);
        assert_eq!(
            midi2_per_note_management(1, 2, 0x38, per_note_management::DETACH),
            0x41F2_3802_0000_0000
        );
    }
}
