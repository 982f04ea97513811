//! Integration tests for cantus-smf.
//!
//! These tests exercise write -> read round trips and the channel state machine
//! over whole songs.

use cantus_smf::{
    meta_type, vlq, Error, Midi1Event, Midi1Machine, Midi1Message, Midi1Music, Midi1Track,
    Midi1WriterOptions, VlqMetaEventWriter,
};
use proptest::prelude::*;

fn two_track_song() -> Midi1Music {
    let mut conductor = Midi1Track::default();
    conductor.push(0, Midi1Message::text(meta_type::TRACK_NAME, "conductor"));
    conductor.push(0, Midi1Message::tempo(400_000));
    conductor.push(1920, Midi1Message::end_of_track());

    let mut piano = Midi1Track::default();
    piano.push(0, Midi1Message::program(0, 1));
    for (i, note) in [60u8, 64, 67].into_iter().enumerate() {
        piano.push(if i == 0 { 0 } else { 240 }, Midi1Message::note_on(0, note, 100));
    }
    piano.push(480, Midi1Message::note_on(0, 60, 0));
    piano.push(0, Midi1Message::note_on(0, 64, 0));
    piano.push(0, Midi1Message::note_on(0, 67, 0));
    piano.push(
        0,
        Midi1Message::Sysex {
            status: 0xF0,
            data: vec![0x7E, 0x7F, 0x09, 0x01, 0xF7],
        },
    );
    piano.push(0, Midi1Message::end_of_track());

    let mut music = Midi1Music::default();
    music.add_track(conductor);
    music.add_track(piano);
    music
}

// ---------------------------------------------------------------------------
// 1. Round trips
// ---------------------------------------------------------------------------

/// A song with explicit end-of-track events reads back identically.
#[test]
fn test_write_read_round_trip() {
    let music = two_track_song();
    let bytes = music.to_bytes();
    assert_eq!(&bytes[..4], b"MThd");
    assert_eq!(Midi1Music::read(&bytes).unwrap(), music);
}

/// Running status shortens the image but not the content.
#[test]
fn test_running_status_saves_bytes() {
    let music = two_track_song();
    let compact = music.to_bytes();
    let mut verbose = Vec::new();
    music.write_with(
        &mut verbose,
        &Midi1WriterOptions {
            disable_running_status: true,
            ..Default::default()
        },
    );
    // five repeated 0x90 status bytes are dropped
    assert_eq!(verbose.len() - compact.len(), 5);
    assert_eq!(Midi1Music::read(&verbose).unwrap(), Midi1Music::read(&compact).unwrap());
}

/// Repeated system common messages keep their status bytes.
#[test]
fn test_system_common_round_trip() {
    let mut track = Midi1Track::default();
    track.push(0, Midi1Message::Simple { status: 0xF2, msb: 1, lsb: 2 });
    track.push(10, Midi1Message::Simple { status: 0xF2, msb: 3, lsb: 4 });
    track.push(0, Midi1Message::end_of_track());
    let mut music = Midi1Music::default();
    music.add_track(track);
    assert_eq!(Midi1Music::read(&music.to_bytes()).unwrap(), music);
}

/// A missing end-of-track is appended on write.
#[test]
fn test_end_of_track_appended() {
    let mut music = Midi1Music::default();
    music.add_track(Midi1Track::new(vec![Midi1Event::new(
        0,
        Midi1Message::note_on(0, 60, 1),
    )]));
    let read = Midi1Music::read(&music.to_bytes()).unwrap();
    assert_eq!(read.tracks[0].events.len(), 2);
    assert!(read.tracks[0].events[1].message.is_end_of_track());
}

/// Long meta payloads are split by the default writer and kept whole by the VLQ writer.
#[test]
fn test_long_meta_writers() {
    let text = "x".repeat(300);
    let mut music = Midi1Music::default();
    music.add_track(Midi1Track::new(vec![
        Midi1Event::new(0, Midi1Message::text(meta_type::TEXT, &text)),
        Midi1Event::new(0, Midi1Message::end_of_track()),
    ]));

    let split = Midi1Music::read(&music.to_bytes()).unwrap();
    assert_eq!(split.tracks[0].events.len(), 4);
    let joined: Vec<u8> = split.tracks[0].events[..3]
        .iter()
        .flat_map(|e| match &e.message {
            Midi1Message::Meta { data, .. } => data.clone(),
            _ => Vec::new(),
        })
        .collect();
    assert_eq!(joined, text.as_bytes());

    let mut whole = Vec::new();
    music.write_with(
        &mut whole,
        &Midi1WriterOptions {
            meta_writer: &VlqMetaEventWriter,
            ..Default::default()
        },
    );
    assert_eq!(Midi1Music::read(&whole).unwrap(), music);
}

/// A corrupted track length fails with the offset at which reading stopped.
#[test]
fn test_corrupted_track_length() {
    let mut bytes = two_track_song().to_bytes();
    // first MTrk length lives at bytes 18..22
    bytes[21] = bytes[21].wrapping_add(1);
    assert!(matches!(
        Midi1Music::read(&bytes),
        Err(Error::Parse { offset, .. }) if offset > 22
    ));
}

/// Files round-trip through the filesystem.
#[test]
fn test_save_and_load() {
    let path = std::env::temp_dir().join(format!("cantus-smf-{}.mid", std::process::id()));
    let music = two_track_song();
    music.save(&path).unwrap();
    let loaded = Midi1Music::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded, music);
}

// ---------------------------------------------------------------------------
// 2. Timing and state
// ---------------------------------------------------------------------------

/// Play time follows the tempo meta event of the conductor track.
#[test]
fn test_play_time() {
    let music = two_track_song();
    assert_eq!(music.total_ticks(), 1920);
    // four beats at 400 000 us
    assert_eq!(music.total_play_time_ms(), 1600);
}

/// Feeding the merged song to the machine leaves every note at zero velocity.
#[test]
fn test_machine_over_song() {
    let music = two_track_song();
    let mut machine = Midi1Machine::new();
    for (_, message) in music.merged_events() {
        machine.process_message(message);
    }
    assert_eq!(machine.channels[0].program, 1);
    for note in [60, 64, 67] {
        assert!(machine.channels[0].note_on_status[note]);
        assert_eq!(machine.channels[0].note_velocity[note], 0);
    }
}

// ---------------------------------------------------------------------------
// 3. Properties
// ---------------------------------------------------------------------------

fn channel_message() -> impl Strategy<Value = Midi1Message> {
    (0u8..16, 0x8u8..0xF, 0u8..0x80, 0u8..0x80).prop_map(|(ch, code, msb, lsb)| {
        let status = (code << 4) | ch;
        let lsb = if cantus_smf::fixed_data_size(status) > 1 { lsb } else { 0 };
        Midi1Message::Simple { status, msb, lsb }
    })
}

fn system_message() -> impl Strategy<Value = Midi1Message> {
    // F0, F7 and FF are records of their own, never `Simple`
    let statuses = prop::sample::select(vec![0xF1u8, 0xF2, 0xF3, 0xF6, 0xF8, 0xFA, 0xFB, 0xFC, 0xFE]);
    (statuses, 0u8..0x80, 0u8..0x80).prop_map(|(status, msb, lsb)| {
        let size = cantus_smf::fixed_data_size(status);
        Midi1Message::Simple {
            status,
            msb: if size > 0 { msb } else { 0 },
            lsb: if size > 1 { lsb } else { 0 },
        }
    })
}

fn event() -> impl Strategy<Value = Midi1Event> {
    let meta = (0u8..0x7F, proptest::collection::vec(any::<u8>(), 0..0x7F))
        .prop_filter("end of track is appended separately", |(t, _)| {
            *t != meta_type::END_OF_TRACK
        })
        .prop_map(|(meta_type, data)| Midi1Message::Meta { meta_type, data });
    (0u32..0x10000, prop_oneof![4 => channel_message(), 1 => system_message(), 1 => meta])
        .prop_map(|(delta, message)| Midi1Event::new(delta, message))
}

proptest! {
    #[test]
    fn prop_vlq_round_trip(value in 0u32..=vlq::MAX_VLQ) {
        let mut out = Vec::new();
        vlq::write_vlq(&mut out, value);
        prop_assert_eq!(out.len(), vlq::vlq_length(value));
        prop_assert_eq!(vlq::read_vlq(&out), Some((value, out.len())));
    }

    #[test]
    fn prop_write_read_idempotent(
        events in proptest::collection::vec(event(), 0..40),
        disable_running_status in any::<bool>(),
    ) {
        let mut track = Midi1Track::new(events);
        track.push(0, Midi1Message::end_of_track());
        let mut music = Midi1Music::default();
        music.add_track(track);

        let mut bytes = Vec::new();
        let options = Midi1WriterOptions { disable_running_status, ..Default::default() };
        music.write_with(&mut bytes, &options);
        let read = Midi1Music::read(&bytes).unwrap();
        prop_assert_eq!(&read, &music);

        let mut again = Vec::new();
        read.write_with(&mut again, &options);
        prop_assert_eq!(again, bytes);
    }
}
