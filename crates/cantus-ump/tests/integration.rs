//! Integration tests for cantus-ump.
//!
//! These tests exercise packet building, byte conversion and reassembly together.

use cantus_ump::{
    factory, from_platform_bytes, get_flex_text, get_sysex7_data, get_sysex8_data,
    umps_to_platform_bytes, ByteOrder, Midi2ChannelMessage, Midi2Music, Midi2Track, Ump,
};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// 1. Wire round trips: builders -> platform bytes -> packets -> payload
// ---------------------------------------------------------------------------

/// A GS reset travels through SysEx7 packets and little-endian bytes unchanged.
#[test]
fn test_sysex7_through_platform_bytes() {
    let gs_reset = [0xF0, 0x41, 0x10, 0x42, 0x12, 0x40, 0x00, 0x7F, 0x00, 0x41, 0xF7];
    let packets: Vec<Ump> = factory::sysex7(0, &gs_reset).into_iter().map(Ump::from).collect();
    assert_eq!(packets.len(), 2);

    let bytes = umps_to_platform_bytes(&packets, ByteOrder::Little);
    assert_eq!(bytes.len(), 16);
    let decoded = from_platform_bytes(ByteOrder::Little, &bytes).unwrap();
    assert_eq!(decoded, packets);
    assert_eq!(get_sysex7_data(&decoded).unwrap(), &gs_reset[1..10]);
}

/// Mixed-size packets are split back by their message type.
#[test]
fn test_mixed_packet_sizes() {
    let mut packets = vec![
        Ump::from(factory::midi1_note_on(0, 0, 60, 100)),
        Ump::from(factory::midi2_cc(0, 0, 7, 0x8000_0000)),
        factory::tempo(0, 0, 50_000_000),
    ];
    packets.extend(factory::sysex8(0, &[1, 2, 3]).into_iter().map(Ump::from));
    let bytes = umps_to_platform_bytes(&packets, ByteOrder::Big);
    assert_eq!(bytes.len(), 4 + 8 + 16 + 16);
    assert_eq!(from_platform_bytes(ByteOrder::Big, &bytes).unwrap(), packets);
}

/// Metadata text spanning several packets reads back whole.
#[test]
fn test_metadata_text_reassembly() {
    let title = "A fairly long song title, to span several packets";
    let packets = factory::metadata_text(0, 1, 0, 2, title);
    assert!(packets.len() > 1);
    assert_eq!(get_flex_text(&packets).unwrap(), title.as_bytes());
}

// ---------------------------------------------------------------------------
// 2. Track engine
// ---------------------------------------------------------------------------

/// A song of three channel tracks survives merge then split.
#[test]
fn test_merge_then_split() {
    let mut music = Midi2Music::default();
    for channel in 0..3u8 {
        let mut messages = Vec::new();
        for step in 0..4u8 {
            messages.push(Ump::from(factory::delta_clockstamp(120)));
            messages.push(Ump::from(factory::midi2_note_on(0, channel, 60 + step, 0, 0xC000, 0)));
        }
        music.add_track(Midi2Track::new(messages));
    }

    let merged = music.merge_tracks().unwrap();
    assert!(merged.is_single_track());
    assert_eq!(merged.total_ticks().unwrap(), 480);

    let split = merged.tracks[0].split_tracks_by_channel(merged.delta_time_spec).unwrap();
    assert_eq!(split.tracks.len(), 4);
    for (channel, track) in split.tracks[1..].iter().enumerate() {
        assert_eq!(track.messages, music.tracks[channel].messages);
    }
}

/// Notes are found across tracks with their absolute tick.
#[test]
fn test_filter_notes_from_merged_song() {
    let mut music = Midi2Music::default();
    music.add_track(Midi2Track::new(vec![
        factory::tempo(0, 0, 50_000_000),
        Ump::from(factory::delta_clockstamp(480)),
    ]));
    music.add_track(Midi2Track::new(vec![
        Ump::from(factory::midi2_note_on(0, 0, 60, 0, 0xFFFF, 0)),
        Ump::from(factory::delta_clockstamp(240)),
        Ump::from(factory::midi2_note_off(0, 0, 60, 0, 0, 0)),
    ]));

    let notes = music
        .filter_events(|u| Midi2ChannelMessage::parse(u).is_some_and(|m| m.is_note()))
        .unwrap();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[1].0, 240);
    // the trailing clockstamp of the tempo track carries no event and is dropped
    assert_eq!(music.total_play_time_ms().unwrap(), 250);
}

// ---------------------------------------------------------------------------
// 3. Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn prop_sysex7_packet_count(n in 0usize..200) {
        prop_assert_eq!(factory::sysex7_get_packet_count(n), n.div_ceil(6).max(1));
    }

    #[test]
    fn prop_sysex8_packet_count(n in 0usize..400) {
        prop_assert_eq!(factory::sysex8_get_packet_count(n), n.div_ceil(13).max(1));
    }

    #[test]
    fn prop_sysex7_payload_round_trip(data in proptest::collection::vec(0u8..0x7F, 0..64)) {
        let packets: Vec<Ump> = factory::sysex7(3, &data).into_iter().map(Ump::from).collect();
        prop_assert_eq!(get_sysex7_data(&packets).unwrap(), data);
    }

    #[test]
    fn prop_sysex8_payload_round_trip(data in proptest::collection::vec(any::<u8>(), 0..80)) {
        let packets: Vec<Ump> = factory::sysex8(1, &data).into_iter().map(Ump::from).collect();
        prop_assert_eq!(get_sysex8_data(&packets).unwrap(), data);
    }
}
