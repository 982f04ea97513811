//! MIDI 2.0 songs as lists of UMP tracks.
//!
//! Time is carried in-band: Delta Clockstamp packets advance the clock in ticks
//! (see `delta_time_spec`), JR Timestamp packets in 1/31250 s units. A single
//! source must use one or the other, never both.

use crate::error::{Error, Result};
use crate::factory::JR_TIMESTAMP_TICKS_PER_SECOND;
use crate::ump::Ump;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Microseconds per quarter note when no tempo message has been seen.
pub const DEFAULT_TEMPO_MICROS: u32 = 500_000;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Midi2Track {
    pub messages: Vec<Ump>,
}

impl Midi2Track {
    pub fn new(messages: Vec<Ump>) -> Self {
        Self { messages }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Midi2Music {
    pub tracks: Vec<Midi2Track>,
    /// Ticks per quarter note for Delta Clockstamps; 0 means JR Timestamp timing.
    pub delta_time_spec: u16,
}

impl Default for Midi2Music {
    fn default() -> Self {
        Self {
            tracks: Vec::new(),
            delta_time_spec: 480,
        }
    }
}

/// Which timestamp family a source has been seen to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum TimestampKind {
    #[default]
    Unknown,
    DeltaClockstamp,
    JrTimestamp,
}

impl TimestampKind {
    /// Ticks advanced by `ump`, or `None` if it is not a timestamp.
    pub(crate) fn observe(&mut self, ump: &Ump) -> Result<Option<u64>> {
        let (kind, ticks) = if ump.is_delta_clockstamp() {
            (TimestampKind::DeltaClockstamp, ump.delta_clockstamp() as u64)
        } else if ump.is_jr_timestamp() {
            (TimestampKind::JrTimestamp, ump.jr_timestamp() as u64)
        } else {
            return Ok(None);
        };
        match *self {
            TimestampKind::Unknown => *self = kind,
            seen if seen != kind => return Err(Error::MixedTimestamps),
            _ => {}
        }
        Ok(Some(ticks))
    }

    /// Timestamp packets spanning `ticks` in this kind.
    pub(crate) fn packets(self, ticks: u64) -> Vec<Ump> {
        let raw = match self {
            TimestampKind::JrTimestamp => crate::factory::jr_timestamps_direct(ticks),
            _ => crate::factory::delta_clockstamps(ticks),
        };
        raw.into_iter().map(Ump::from).collect()
    }
}

/// Non-timestamp messages of `messages` paired with their absolute tick.
pub fn filter_events<'a>(
    messages: impl IntoIterator<Item = &'a Ump>,
    mut filter: impl FnMut(&Ump) -> bool,
) -> Result<Vec<(u64, Ump)>> {
    let mut kind = TimestampKind::default();
    let mut now = 0u64;
    let mut out = Vec::new();
    for ump in messages {
        match kind.observe(ump)? {
            Some(ticks) => now += ticks,
            None if filter(ump) => out.push((now, *ump)),
            None => {}
        }
    }
    Ok(out)
}

impl Midi2Music {
    pub fn new(delta_time_spec: u16) -> Self {
        Self {
            tracks: Vec::new(),
            delta_time_spec,
        }
    }

    pub fn add_track(&mut self, track: Midi2Track) {
        self.tracks.push(track);
    }

    pub fn is_single_track(&self) -> bool {
        self.tracks.len() == 1
    }

    /// The messages of the song as one time-ordered list.
    fn merged_messages(&self) -> Result<Vec<Ump>> {
        if self.tracks.len() <= 1 {
            return Ok(self.tracks.first().map(|t| t.messages.clone()).unwrap_or_default());
        }
        let mut merged = self.merge_tracks()?;
        Ok(merged.tracks.pop().map(|t| t.messages).unwrap_or_default())
    }

    /// Non-timestamp messages across all tracks with their absolute tick.
    pub fn filter_events(&self, filter: impl FnMut(&Ump) -> bool) -> Result<Vec<(u64, Ump)>> {
        filter_events(&self.merged_messages()?, filter)
    }

    /// Sum of all timestamp ticks of the merged song.
    pub fn total_ticks(&self) -> Result<u64> {
        let mut kind = TimestampKind::default();
        let mut total = 0;
        for ump in &self.merged_messages()? {
            total += kind.observe(ump)?.unwrap_or(0);
        }
        Ok(total)
    }

    /// Play time in milliseconds, honoring Flex Data tempo changes.
    pub fn total_play_time_ms(&self) -> Result<u64> {
        self.play_time_ms_at(None)
    }

    /// Play time in milliseconds up to `ticks`.
    pub fn play_time_ms_at_tick(&self, ticks: u64) -> Result<u64> {
        self.play_time_ms_at(Some(ticks))
    }

    fn play_time_ms_at(&self, limit: Option<u64>) -> Result<u64> {
        let messages = self.merged_messages()?;
        if self.delta_time_spec == 0 {
            let mut kind = TimestampKind::default();
            let mut ticks = 0u64;
            for ump in &messages {
                ticks += kind.observe(ump)?.unwrap_or(0);
            }
            let ticks = limit.map_or(ticks, |l| ticks.min(l));
            return Ok(ticks * 1000 / JR_TIMESTAMP_TICKS_PER_SECOND as u64);
        }

        let spec = self.delta_time_spec as f64;
        let mut kind = TimestampKind::default();
        let mut tempo = DEFAULT_TEMPO_MICROS as f64;
        let mut now = 0u64;
        let mut micros = 0f64;
        for ump in &messages {
            if let Some(mut ticks) = kind.observe(ump)? {
                if let Some(l) = limit {
                    ticks = ticks.min(l.saturating_sub(now));
                }
                micros += tempo * ticks as f64 / spec;
                now += ticks;
                if limit.is_some_and(|l| now >= l) {
                    break;
                }
            } else if let Some(t) = ump.tempo() {
                // 10 ns units
                tempo = t as f64 / 100.0;
            }
        }
        Ok((micros / 1000.0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory;

    fn dc(ticks: u32) -> Ump {
        Ump::from(factory::delta_clockstamp(ticks))
    }

    fn note_on(note: u8) -> Ump {
        Ump::from(factory::midi2_note_on(0, 0, note, 0, 0xF800, 0))
    }

    #[test]
    fn test_filter_events_absolute_time() {
        let messages = vec![note_on(60), dc(480), note_on(62), dc(240), note_on(64)];
        let events = filter_events(&messages, |_| true).unwrap();
        let times: Vec<u64> = events.iter().map(|(t, _)| *t).collect();
        assert_eq!(times, vec![0, 480, 720]);
    }

    #[test]
    fn test_filter_events_rejects_mixed_timestamps() {
        let messages = vec![dc(10), Ump::from(factory::jr_timestamp_direct(10))];
        assert_eq!(filter_events(&messages, |_| true), Err(Error::MixedTimestamps));
    }

    #[test]
    fn test_total_ticks_and_play_time() {
        let mut music = Midi2Music::new(480);
        music.add_track(Midi2Track::new(vec![note_on(60), dc(480), note_on(60), dc(480)]));
        assert_eq!(music.total_ticks().unwrap(), 960);
        // two quarter notes at 120 bpm
        assert_eq!(music.total_play_time_ms().unwrap(), 1000);
        assert_eq!(music.play_time_ms_at_tick(480).unwrap(), 500);
    }

    #[test]
    fn test_play_time_follows_tempo_changes() {
        let mut music = Midi2Music::new(480);
        music.add_track(Midi2Track::new(vec![
            dc(480),
            // 1 000 000 us per quarter note
            factory::tempo(0, 0, 100_000_000),
            dc(480),
        ]));
        assert_eq!(music.total_play_time_ms().unwrap(), 1500);
    }

    #[test]
    fn test_jr_timestamp_play_time() {
        let mut music = Midi2Music::new(0);
        music.add_track(Midi2Track::new(vec![
            Ump::from(factory::jr_timestamp_direct(31250)),
            note_on(60),
        ]));
        assert_eq!(music.total_play_time_ms().unwrap(), 1000);
    }
}
