//! Flex Data (type 0xD) messages: tempo, time signature, metronome, key
//! signature, chord name and text.
//!
//! Text messages copy every byte of the input, embedded NUL included. A text
//! such as `"A melisma\0ah"` therefore stays one 12-byte packet, and a decoder
//! that treats NUL as a terminator would see only `"A melisma"`.

use super::text_chunks;
use crate::ump::Ump;

/// Flex Data addressing: to a single channel or to the whole group.
pub mod flex_address {
    pub const CHANNEL: u8 = 0;
    pub const GROUP: u8 = 1;
}

/// Flex Data status banks.
pub mod flex_status_bank {
    pub const SETUP_AND_PERFORMANCE: u8 = 0;
    pub const METADATA_TEXT: u8 = 1;
    pub const PERFORMANCE_TEXT: u8 = 2;
}

/// Statuses of the setup and performance bank.
pub mod flex_status {
    pub const TEMPO: u8 = 0;
    pub const TIME_SIGNATURE: u8 = 1;
    pub const METRONOME: u8 = 2;
    pub const KEY_SIGNATURE: u8 = 5;
    pub const CHORD_NAME: u8 = 6;
}

pub mod metadata_text_status {
    pub const UNKNOWN: u8 = 0;
    pub const PROJECT_NAME: u8 = 1;
    pub const SONG_NAME: u8 = 2;
    pub const MIDI_CLIP_NAME: u8 = 3;
    pub const COPYRIGHT_NOTICE: u8 = 4;
    pub const COMPOSER_NAME: u8 = 5;
    pub const LYRICIST_NAME: u8 = 6;
    pub const ARRANGER_NAME: u8 = 7;
    pub const PUBLISHER_NAME: u8 = 8;
    pub const PRIMARY_PERFORMER_NAME: u8 = 9;
    pub const ACCOMPANYING_PERFORMER_NAME: u8 = 0xA;
    pub const RECORDING_DATE: u8 = 0xB;
    pub const RECORDING_LOCATION: u8 = 0xC;
}

pub mod performance_text_status {
    pub const UNKNOWN: u8 = 0;
    pub const LYRICS: u8 = 1;
    pub const LYRICS_LANGUAGE: u8 = 2;
    pub const RUBY: u8 = 3;
    pub const RUBY_LANGUAGE: u8 = 4;
}

/// Sharps/flats field values (signed nibble).
pub mod sharps_flats {
    pub const DOUBLE_SHARP: i8 = 2;
    pub const SHARP: i8 = 1;
    pub const NATURAL: i8 = 0;
    pub const FLAT: i8 = -1;
    pub const DOUBLE_FLAT: i8 = -2;
    pub const NON_STANDARD: i8 = -8;
}

/// Tonic note field values (A = 1 ... G = 7).
pub mod tonic_note {
    pub const UNKNOWN: u8 = 0;
    pub const A: u8 = 1;
    pub const B: u8 = 2;
    pub const C: u8 = 3;
    pub const D: u8 = 4;
    pub const E: u8 = 5;
    pub const F: u8 = 6;
    pub const G: u8 = 7;
}

pub mod chord_type {
    pub const NO_CHORD: u8 = 0x00;
    pub const MAJOR: u8 = 0x01;
    pub const MAJOR_6TH: u8 = 0x02;
    pub const MAJOR_7TH: u8 = 0x03;
    pub const MAJOR_9TH: u8 = 0x04;
    pub const MAJOR_11TH: u8 = 0x05;
    pub const MAJOR_13TH: u8 = 0x06;
    pub const MINOR: u8 = 0x07;
    pub const MINOR_6TH: u8 = 0x08;
    pub const MINOR_7TH: u8 = 0x09;
    pub const MINOR_9TH: u8 = 0x0A;
    pub const MINOR_11TH: u8 = 0x0B;
    pub const MINOR_13TH: u8 = 0x0C;
    pub const DOMINANT: u8 = 0x0D;
    pub const DOMINANT_NINTH: u8 = 0x0E;
    pub const DOMINANT_11TH: u8 = 0x0F;
    pub const DOMINANT_13TH: u8 = 0x10;
    pub const AUGMENTED: u8 = 0x11;
    pub const AUGMENTED_SEVENTH: u8 = 0x12;
    pub const DIMINISHED: u8 = 0x13;
    pub const DIMINISHED_SEVENTH: u8 = 0x14;
    pub const HALF_DIMINISHED: u8 = 0x15;
    pub const MAJOR_MINOR: u8 = 0x16;
    pub const PEDAL: u8 = 0x17;
    pub const POWER: u8 = 0x18;
    pub const SUSPENDED_2ND: u8 = 0x19;
    pub const SUSPENDED_4TH: u8 = 0x1A;
    pub const SEVEN_SUSPENDED_4TH: u8 = 0x1B;
}

/// Chord alteration kinds; an alteration byte is `kind | degree`.
pub mod chord_alteration {
    pub const NONE: u8 = 0x00;
    pub const ADD_DEGREE: u8 = 0x10;
    pub const SUBTRACT_DEGREE: u8 = 0x20;
    pub const RAISE_DEGREE: u8 = 0x30;
    pub const LOWER_DEGREE: u8 = 0x40;
}

/// Fields of a chord name message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChordName {
    pub tonic_sharps_flats: i8,
    pub chord_tonic: u8,
    pub chord_type: u8,
    pub alterations: [u8; 4],
    pub bass_sharps_flats: i8,
    pub bass_note: u8,
    pub bass_chord_type: u8,
    pub bass_alterations: [u8; 2],
}

fn flex_header(group: u8, form: u8, address: u8, channel: u8, status_bank: u8, status: u8) -> u32 {
    0xD000_0000
        | ((group as u32 & 0xF) << 24)
        | ((form as u32 & 3) << 22)
        | ((address as u32 & 3) << 20)
        | ((channel as u32 & 0xF) << 16)
        | ((status_bank as u32) << 8)
        | status as u32
}

fn nibbles(high: i8, low: u8) -> u32 {
    (((high as u8 & 0xF) << 4) | (low & 0xF)) as u32
}

/// Tempo in units of 10 nanoseconds per quarter note.
pub fn tempo(group: u8, channel: u8, number_of_10_nanoseconds_per_quarter_note: u32) -> Ump {
    Ump::from_words(
        flex_header(group, 0, flex_address::GROUP, channel, 0, flex_status::TEMPO),
        number_of_10_nanoseconds_per_quarter_note,
        0,
        0,
    )
}

/// Time signature with the denominator as the raw power-of-two exponent field.
pub fn time_signature_direct(
    group: u8,
    channel: u8,
    numerator: u8,
    raw_denominator: u8,
    number_of_32_notes: u8,
) -> Ump {
    Ump::from_words(
        flex_header(group, 0, flex_address::GROUP, channel, 0, flex_status::TIME_SIGNATURE),
        ((numerator as u32) << 24) | ((raw_denominator as u32) << 16) | ((number_of_32_notes as u32) << 8),
        0,
        0,
    )
}

/// Time signature with a musical denominator (4 for quarter notes, 8 for eighths).
pub fn time_signature(group: u8, channel: u8, numerator: u8, denominator: u8, number_of_32_notes: u8) -> Ump {
    let raw = denominator.max(1).trailing_zeros() as u8;
    time_signature_direct(group, channel, numerator, raw, number_of_32_notes)
}

#[allow(clippy::too_many_arguments)]
pub fn metronome(
    group: u8,
    channel: u8,
    number_of_clocks_per_primary_click: u8,
    bar_accent_part1: u8,
    bar_accent_part2: u8,
    bar_accent_part3: u8,
    number_of_subdivision_clicks1: u8,
    number_of_subdivision_clicks2: u8,
) -> Ump {
    Ump::from_words(
        flex_header(group, 0, flex_address::GROUP, channel, 0, flex_status::METRONOME),
        u32::from_be_bytes([
            number_of_clocks_per_primary_click,
            bar_accent_part1,
            bar_accent_part2,
            bar_accent_part3,
        ]),
        u32::from_be_bytes([number_of_subdivision_clicks1, number_of_subdivision_clicks2, 0, 0]),
        0,
    )
}

pub fn key_signature(group: u8, address: u8, channel: u8, sharps_or_flats: i8, tonic: u8) -> Ump {
    Ump::from_words(
        flex_header(group, 0, address, channel, 0, flex_status::KEY_SIGNATURE),
        nibbles(sharps_or_flats, tonic) << 24,
        0,
        0,
    )
}

pub fn chord_name(group: u8, address: u8, channel: u8, chord: &ChordName) -> Ump {
    let a = chord.alterations;
    let b = chord.bass_alterations;
    Ump::from_words(
        flex_header(group, 0, address, channel, 0, flex_status::CHORD_NAME),
        (nibbles(chord.tonic_sharps_flats, chord.chord_tonic) << 24)
            | ((chord.chord_type as u32) << 16)
            | ((a[0] as u32) << 8)
            | a[1] as u32,
        ((a[2] as u32) << 24) | ((a[3] as u32) << 16),
        (nibbles(chord.bass_sharps_flats, chord.bass_note) << 24)
            | ((chord.bass_chord_type as u32) << 16)
            | ((b[0] as u32) << 8)
            | b[1] as u32,
    )
}

/// Generic Flex Data text: 12 bytes per packet with complete/start/continue/end forms.
pub fn flex_data_text(
    group: u8,
    address: u8,
    channel: u8,
    status_bank: u8,
    status: u8,
    text: &[u8],
) -> Vec<Ump> {
    text_chunks(text, 12)
        .into_iter()
        .map(|(form, chunk)| {
            let mut bytes = [0u8; 16];
            bytes[0..4].copy_from_slice(
                &flex_header(group, form, address, channel, status_bank, status).to_be_bytes(),
            );
            bytes[4..4 + chunk.len()].copy_from_slice(chunk);
            Ump::from_be_bytes(bytes)
        })
        .collect()
}

pub fn metadata_text(group: u8, address: u8, channel: u8, status: u8, text: &str) -> Vec<Ump> {
    flex_data_text(
        group,
        address,
        channel,
        flex_status_bank::METADATA_TEXT,
        status,
        text.as_bytes(),
    )
}

pub fn performance_text(group: u8, address: u8, channel: u8, status: u8, text: &str) -> Vec<Ump> {
    flex_data_text(
        group,
        address,
        channel,
        flex_status_bank::PERFORMANCE_TEXT,
        status,
        text.as_bytes(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(ump: &Ump) -> [u32; 4] {
        [ump.word(0), ump.word(1), ump.word(2), ump.word(3)]
    }

    #[test]
    fn test_tempo() {
        assert_eq!(words(&tempo(0, 0, 50_000_000)), [0xD010_0000, 0x02FA_F080, 0, 0]);
        assert_eq!(words(&tempo(0xF, 0xE, 50_000_000)), [0xDF1E_0000, 0x02FA_F080, 0, 0]);
    }

    #[test]
    fn test_time_signature() {
        assert_eq!(words(&time_signature_direct(0, 0, 3, 4, 0)), [0xD010_0001, 0x0304_0000, 0, 0]);
        assert_eq!(
            words(&time_signature_direct(0xF, 0xE, 5, 8, 32)),
            [0xDF1E_0001, 0x0508_2000, 0, 0]
        );
        assert_eq!(time_signature(0, 0, 3, 4, 0), time_signature_direct(0, 0, 3, 2, 0));
    }

    #[test]
    fn test_metronome() {
        assert_eq!(words(&metronome(0, 0, 3, 4, 4, 1, 0, 0)), [0xD010_0002, 0x0304_0401, 0, 0]);
        assert_eq!(
            words(&metronome(0xF, 0xE, 2, 3, 2, 0, 2, 3)),
            [0xDF1E_0002, 0x0203_0200, 0x0203_0000, 0]
        );
    }

    #[test]
    fn test_key_signature() {
        assert_eq!(
            words(&key_signature(0, 0, 0, sharps_flats::DOUBLE_SHARP, tonic_note::F)),
            [0xD000_0005, 0x2600_0000, 0, 0]
        );
        assert_eq!(
            words(&key_signature(0xF, 1, 0xE, sharps_flats::DOUBLE_FLAT, tonic_note::G)),
            [0xDF1E_0005, 0xE700_0000, 0, 0]
        );
    }

    #[test]
    fn test_chord_name() {
        let chord = ChordName {
            tonic_sharps_flats: sharps_flats::SHARP,
            chord_tonic: tonic_note::F,
            chord_type: chord_type::MAJOR,
            alterations: [chord_alteration::ADD_DEGREE + 1, 1, 2, 3],
            bass_sharps_flats: sharps_flats::SHARP,
            bass_note: tonic_note::C,
            bass_chord_type: chord_type::MAJOR,
            bass_alterations: [1, 2],
        };
        assert_eq!(
            words(&chord_name(0, 0, 0, &chord)),
            [0xD000_0006, 0x1601_1101, 0x0203_0000, 0x1301_0102]
        );

        let chord = ChordName {
            tonic_sharps_flats: sharps_flats::DOUBLE_FLAT,
            chord_tonic: tonic_note::G,
            chord_type: chord_type::SEVEN_SUSPENDED_4TH,
            alterations: [
                chord_alteration::SUBTRACT_DEGREE + 1,
                chord_alteration::SUBTRACT_DEGREE + 1,
                chord_alteration::RAISE_DEGREE + 2,
                3,
            ],
            bass_sharps_flats: sharps_flats::FLAT,
            bass_note: tonic_note::C,
            bass_chord_type: chord_type::DIMINISHED_SEVENTH,
            bass_alterations: [chord_alteration::RAISE_DEGREE, 2],
        };
        assert_eq!(
            words(&chord_name(0xF, 1, 0xE, &chord)),
            [0xDF1E_0006, 0xE71B_2121, 0x3203_0000, 0xF314_3002]
        );
    }

    #[test]
    fn test_single_packet_text() {
        let packets = metadata_text(0, 0, 0, metadata_text_status::UNKNOWN, "TEST STRING");
        assert_eq!(packets.len(), 1);
        assert_eq!(words(&packets[0]), [0xD000_0100, 0x5445_5354, 0x2053_5452, 0x494E_4700]);

        let packets = metadata_text(0, 0, 0, metadata_text_status::PROJECT_NAME, "TEST STRING1");
        assert_eq!(packets.len(), 1);
        assert_eq!(words(&packets[0]), [0xD000_0101, 0x5445_5354, 0x2053_5452, 0x494E_4731]);
    }

    #[test]
    fn test_multi_packet_text_forms() {
        let packets = metadata_text(
            0,
            0,
            5,
            metadata_text_status::PROJECT_NAME,
            "Test String That Spans Three Packets",
        );
        assert_eq!(packets.len(), 3);
        assert_eq!(packets[0].word(0), 0xD045_0101);
        assert_eq!(packets[1].word(0), 0xD085_0101);
        assert_eq!(packets[2].word(0), 0xD0C5_0101);
    }

    #[test]
    fn test_lyrics_keep_embedded_nul() {
        let packets = performance_text(0, 0, 5, performance_text_status::LYRICS, "A melisma\0ah");
        assert_eq!(packets.len(), 1);
        assert_eq!(words(&packets[0]), [0xD005_0201, 0x4120_6D65, 0x6C69_736D, 0x6100_6168]);
    }

    #[test]
    fn test_empty_text_is_one_packet() {
        let packets = metadata_text(0, 0, 0, metadata_text_status::SONG_NAME, "");
        assert_eq!(packets.len(), 1);
        assert_eq!(words(&packets[0]), [0xD000_0102, 0, 0, 0]);
    }
}
