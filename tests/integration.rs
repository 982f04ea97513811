//! Cross-crate integration tests.
//!
//! MIDI-CI carried over UMP SysEx7 packets, SMF songs feeding a device's MIDI
//! message report, and SMF channel messages converted into MIDI 2.0 tracks.

use std::sync::Arc;

use cantus::ci::constants::{midi_report, sub_id2};
use cantus::ci::{MidiCiDevice, MidiCiDeviceConfig, MidiMessageReportRequest, Muid};
use cantus::smf::{Midi1Message, Midi1Music, Midi1Track};
use cantus::ump::{factory, get_sysex7_data, midi1_to_midi2, Midi2Music, Midi2Track, Ump};
use cantus::Error;
use crossbeam_channel::{unbounded, Receiver};
use parking_lot::Mutex;

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// A device whose output is packetized into UMP SysEx7 messages, one
/// `Vec<Ump>` per CI message.
fn ump_device(muid: u32, config: MidiCiDeviceConfig) -> (MidiCiDevice, Receiver<Vec<Ump>>) {
    let (tx, rx) = unbounded();
    let device = MidiCiDevice::builder()
        .muid(Muid::new(muid).unwrap())
        .config(config)
        .output(move |group: u8, sysex: &[u8]| {
            let packets = factory::sysex7(group, sysex).into_iter().map(Ump::from).collect();
            let _ = tx.send(packets);
        })
        .build()
        .unwrap();
    (device, rx)
}

fn deliver(device: &mut MidiCiDevice, packets: &[Ump]) -> cantus::Result<()> {
    let group = packets.first().map(Ump::group).unwrap_or(0);
    let sysex = get_sysex7_data(packets)?;
    device.process_input(group, &sysex)?;
    Ok(())
}

fn song() -> Midi1Music {
    let mut track = Midi1Track::default();
    track.push(0, Midi1Message::program(1, 24));
    track.push(0, Midi1Message::cc(1, 7, 90));
    track.push(0, Midi1Message::note_on(1, 64, 80));
    track.push(480, Midi1Message::note_off(1, 64, 0));
    track.push(0, Midi1Message::note_on(1, 67, 70));
    track.push(480, Midi1Message::end_of_track());
    let mut music = Midi1Music::default();
    music.add_track(track);
    music
}

// ---------------------------------------------------------------------------
// 1. MIDI-CI over UMP
// ---------------------------------------------------------------------------

/// Discovery and the automatic follow-ups complete when every CI message
/// travels as SysEx7 packets on group 3.
#[test]
fn test_ci_discovery_over_sysex7() -> cantus::Result<()> {
    init_logging();
    let (mut initiator, from_initiator) = ump_device(0x0123_4567, MidiCiDeviceConfig::default());
    let mut config = MidiCiDeviceConfig::default();
    config.product_instance_id = "over-ump".into();
    let (mut responder, from_responder) = ump_device(0x0765_4321, config);

    initiator.send_discovery(3);
    loop {
        let mut idle = true;
        while let Ok(packets) = from_initiator.try_recv() {
            assert!(packets.iter().all(|p| p.group() == 3));
            deliver(&mut responder, &packets)?;
            idle = false;
        }
        while let Ok(packets) = from_responder.try_recv() {
            deliver(&mut initiator, &packets)?;
            idle = false;
        }
        if idle {
            break;
        }
    }

    let conn = initiator.connection(responder.muid()).unwrap();
    assert_eq!(conn.product_instance_id(), Some("over-ump"));
    assert_eq!(conn.property_ids(), vec!["DeviceInfo", "ChannelList", "JSONSchema"]);
    Ok(())
}

/// Local configuration defects surface through the umbrella error.
#[test]
fn test_oversized_product_id_is_an_error() {
    let (mut responder, _rx) = ump_device(0x0765_4321, MidiCiDeviceConfig::default());
    responder.config_mut().product_instance_id = "a-very-long-product-id".into();

    let (mut initiator, from_initiator) = ump_device(0x0101_0101, MidiCiDeviceConfig::default());
    initiator.send_endpoint_inquiry(0, responder.muid(), 0);
    let packets = from_initiator.try_recv().unwrap();
    let err = deliver(&mut responder, &packets).unwrap_err();
    assert!(matches!(err, Error::Ci(cantus::ci::Error::Configuration(_))));
}

// ---------------------------------------------------------------------------
// 2. SMF state in MIDI message reports
// ---------------------------------------------------------------------------

/// Channel state played from an SMF image is what the report streams.
#[test]
fn test_report_streams_song_state() -> cantus::Result<()> {
    let bytes = song().to_bytes();
    let music = Midi1Music::read(&bytes)?;

    let streamed = Arc::new(Mutex::new(Vec::new()));
    let sink = streamed.clone();
    let sent = Arc::new(Mutex::new(Vec::new()));
    let out = sent.clone();
    let mut responder = MidiCiDevice::builder()
        .muid(Muid::new(0x0202_0202)?)
        .output(move |_group: u8, sysex: &[u8]| out.lock().push(sysex[3]))
        .midi_message_report_output(move |_group: u8, data: &[u8]| sink.lock().push(data.to_vec()))
        .build()?;
    for (_, message) in music.merged_events() {
        responder.midi_machine_mut().process_message(message);
    }

    let (mut initiator, from_initiator) = ump_device(0x0303_0303, MidiCiDeviceConfig::default());
    let request = MidiMessageReportRequest {
        address: 1,
        message_data_control: midi_report::data_control::ONLY_NON_DEFAULT,
        system_messages: 0,
        channel_controller_messages: midi_report::channel_controller::PROGRAM_CHANGE
            | midi_report::channel_controller::CONTROL_CHANGE,
        note_data_messages: midi_report::note_data::NOTES,
    };
    initiator.request_midi_message_report(0, responder.muid(), &request);
    deliver(&mut responder, &from_initiator.try_recv().unwrap())?;

    assert_eq!(
        *streamed.lock(),
        vec![vec![0xC1, 24], vec![0xB1, 7, 90], vec![0x91, 67, 70]]
    );
    assert_eq!(
        *sent.lock(),
        vec![sub_id2::MIDI_MESSAGE_REPORT_REPLY, sub_id2::END_OF_MIDI_MESSAGE_REPORT]
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// 3. SMF to MIDI 2.0 tracks
// ---------------------------------------------------------------------------

/// SMF channel messages become MIDI 2.0 packets with delta clockstamps, and
/// the song length in ticks is preserved.
#[test]
fn test_smf_song_as_midi2_track() -> cantus::Result<()> {
    let music = song();
    let mut messages = vec![Ump::from(factory::dctpq(music.delta_time_spec))];
    for event in &music.tracks[0].events {
        if event.delta_time > 0 {
            messages.extend(factory::delta_clockstamps(event.delta_time.into()).into_iter().map(Ump::from));
        }
        if let Midi1Message::Simple { status, msb, lsb } = event.message {
            let midi1 = Ump::from(factory::midi1_message(0, status, status & 0x0F, msb, lsb));
            messages.push(midi1_to_midi2(&midi1));
        }
    }
    let mut midi2 = Midi2Music::new(music.delta_time_spec);
    midi2.add_track(Midi2Track::new(messages));

    assert_eq!(midi2.total_ticks()?, music.total_ticks());
    assert_eq!(midi2.total_play_time_ms()?, music.total_play_time_ms());
    Ok(())
}
