//! Splitting one track into per-channel tracks.

use std::collections::BTreeMap;

use tracing::trace;

use crate::error::Result;
use crate::music::{Midi2Music, Midi2Track, TimestampKind};
use crate::ump::Ump;

/// Track id of messages that belong to no channel (tempo, text, sysex ...).
pub const CONDUCTOR_TRACK: i32 = -1;

/// Default split key: group and channel for channel voice messages,
/// [`CONDUCTOR_TRACK`] for everything else.
pub fn group_and_channel_key(ump: &Ump) -> i32 {
    if ump.is_channel_message() {
        ump.group_and_channel() as i32
    } else {
        CONDUCTOR_TRACK
    }
}

struct SplitTrack {
    now: u64,
    messages: Vec<Ump>,
}

impl Midi2Track {
    /// Splits by group and channel. The conductor track comes first and is
    /// present even when empty; the others follow in ascending key order.
    pub fn split_tracks_by_channel(&self, delta_time_spec: u16) -> Result<Midi2Music> {
        self.split_tracks_by(delta_time_spec, group_and_channel_key)
    }

    /// Splits with a custom key, e.g. to separate notes from other messages.
    pub fn split_tracks_by(
        &self,
        delta_time_spec: u16,
        mut key: impl FnMut(&Ump) -> i32,
    ) -> Result<Midi2Music> {
        let mut tracks: BTreeMap<i32, SplitTrack> = BTreeMap::new();
        tracks.insert(
            CONDUCTOR_TRACK,
            SplitTrack {
                now: 0,
                messages: Vec::new(),
            },
        );

        let mut kind = TimestampKind::default();
        let mut now = 0u64;
        for ump in &self.messages {
            if let Some(ticks) = kind.observe(ump)? {
                now += ticks;
                continue;
            }
            let track = tracks.entry(key(ump)).or_insert(SplitTrack {
                now: 0,
                messages: Vec::new(),
            });
            if track.now < now {
                track.messages.extend(kind.packets(now - track.now));
                track.now = now;
            }
            track.messages.push(*ump);
        }
        trace!(tracks = tracks.len(), "split track");

        let mut music = Midi2Music::new(delta_time_spec);
        for (_, track) in tracks {
            music.add_track(Midi2Track::new(track.messages));
        }
        Ok(music)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::factory;

    fn dc(ticks: u32) -> Ump {
        Ump::from(factory::delta_clockstamp(ticks))
    }

    fn note_on(group: u8, channel: u8, note: u8) -> Ump {
        Ump::from(factory::midi2_note_on(group, channel, note, 0, 0xF800, 0))
    }

    #[test]
    fn test_split_by_channel() {
        let tempo = factory::tempo(0, 0, 50_000_000);
        let track = Midi2Track::new(vec![
            tempo,
            note_on(0, 1, 60),
            dc(100),
            note_on(0, 2, 62),
            dc(50),
            note_on(0, 1, 64),
        ]);
        let music = track.split_tracks_by_channel(480).unwrap();
        assert_eq!(music.tracks.len(), 3);
        assert_eq!(music.tracks[0].messages, vec![tempo]);
        assert_eq!(
            music.tracks[1].messages,
            vec![note_on(0, 1, 60), dc(150), note_on(0, 1, 64)]
        );
        assert_eq!(music.tracks[2].messages, vec![dc(100), note_on(0, 2, 62)]);
        assert_eq!(music.delta_time_spec, 480);
    }

    #[test]
    fn test_conductor_track_always_present() {
        let music = Midi2Track::new(vec![note_on(1, 0, 60)])
            .split_tracks_by_channel(480)
            .unwrap();
        assert_eq!(music.tracks.len(), 2);
        assert!(music.tracks[0].messages.is_empty());

        let empty = Midi2Track::default().split_tracks_by_channel(480).unwrap();
        assert_eq!(empty.tracks, vec![Midi2Track::default()]);
    }

    #[test]
    fn test_custom_key_separates_notes() {
        let cc = Ump::from(factory::midi2_cc(0, 0, 7, 0x8000_0000));
        let track = Midi2Track::new(vec![cc, note_on(0, 0, 60), dc(10), note_on(0, 0, 62)]);
        let music = track
            .split_tracks_by(480, |u| {
                match crate::Midi2ChannelMessage::parse(u) {
                    Some(m) if m.is_note() => 1,
                    _ => 0,
                }
            })
            .unwrap();
        assert_eq!(music.tracks.len(), 3);
        assert_eq!(music.tracks[1].messages, vec![cc]);
        assert_eq!(
            music.tracks[2].messages,
            vec![note_on(0, 0, 60), dc(10), note_on(0, 0, 62)]
        );
    }

    #[test]
    fn test_split_then_merge_restores_order() {
        let track = Midi2Track::new(vec![
            note_on(0, 0, 60),
            note_on(0, 1, 61),
            dc(30),
            note_on(0, 1, 62),
            note_on(0, 0, 63),
        ]);
        let merged = track.split_tracks_by_channel(480).unwrap().merge_tracks().unwrap();
        assert_eq!(merged.total_ticks().unwrap(), 30);
        assert_eq!(merged.filter_events(|_| true).unwrap().len(), 4);
    }

    #[test]
    fn test_mixed_timestamps_fail() {
        let track = Midi2Track::new(vec![dc(1), Ump::from(factory::jr_timestamp_direct(1))]);
        assert_eq!(track.split_tracks_by_channel(480), Err(Error::MixedTimestamps));
    }
}
