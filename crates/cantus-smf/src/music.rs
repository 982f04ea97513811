//! Songs as SMF tracks of delta-timed events.

use crate::message::{Midi1Event, Midi1Message};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Microseconds per quarter note when no tempo event has been seen.
pub const DEFAULT_TEMPO: u32 = 500_000;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Midi1Track {
    pub events: Vec<Midi1Event>,
}

impl Midi1Track {
    pub fn new(events: Vec<Midi1Event>) -> Self {
        Self { events }
    }

    pub fn push(&mut self, delta_time: u32, message: Midi1Message) {
        self.events.push(Midi1Event::new(delta_time, message));
    }

    pub fn total_ticks(&self) -> u64 {
        self.events.iter().map(|e| e.delta_time as u64).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Midi1Music {
    pub format: u16,
    /// Ticks per quarter note (or SMPTE division when the top bit is set).
    pub delta_time_spec: u16,
    pub tracks: Vec<Midi1Track>,
}

impl Default for Midi1Music {
    fn default() -> Self {
        Self {
            format: 1,
            delta_time_spec: 480,
            tracks: Vec::new(),
        }
    }
}

impl Midi1Music {
    pub fn add_track(&mut self, track: Midi1Track) {
        self.tracks.push(track);
    }

    /// Events of every track with absolute ticks, ordered by time. Events at
    /// the same tick keep track order, then in-track order.
    pub fn merged_events(&self) -> Vec<(u64, &Midi1Message)> {
        let mut all: Vec<(u64, &Midi1Message)> = Vec::new();
        for track in &self.tracks {
            let mut now = 0u64;
            for e in &track.events {
                now += e.delta_time as u64;
                all.push((now, &e.message));
            }
        }
        all.sort_by_key(|(t, _)| *t);
        all
    }

    /// Length of the longest track in ticks.
    pub fn total_ticks(&self) -> u64 {
        self.tracks.iter().map(Midi1Track::total_ticks).max().unwrap_or(0)
    }

    /// Play time in milliseconds honoring tempo meta events on any track.
    pub fn total_play_time_ms(&self) -> u64 {
        self.play_time_ms_at_tick(self.total_ticks())
    }

    pub fn play_time_ms_at_tick(&self, ticks: u64) -> u64 {
        if self.delta_time_spec == 0 || self.delta_time_spec & 0x8000 != 0 {
            return 0;
        }
        let spec = self.delta_time_spec as f64;
        let mut tempo = DEFAULT_TEMPO as f64;
        let mut last = 0u64;
        let mut micros = 0f64;
        for (time, message) in self.merged_events() {
            if time > ticks {
                break;
            }
            if let Some(t) = message.tempo_value() {
                micros += tempo * (time - last) as f64 / spec;
                last = time;
                tempo = t as f64;
            }
        }
        micros += tempo * ticks.saturating_sub(last) as f64 / spec;
        (micros / 1000.0) as u64
    }
}
