//! Merging the tracks of a song into one time-ordered track.

use tracing::trace;

use crate::error::Result;
use crate::music::{Midi2Music, Midi2Track, TimestampKind};
use crate::ump::Ump;

impl Midi2Music {
    /// Merges all tracks into a single track.
    ///
    /// Events sharing an absolute time stay in source order: a program change
    /// followed by a note on at the same tick is never reordered. Timestamp
    /// packets are regenerated between distinct times in the family the source
    /// used. A single track is returned unchanged.
    pub fn merge_tracks(&self) -> Result<Midi2Music> {
        if self.is_single_track() {
            return Ok(self.clone());
        }

        let mut kind = TimestampKind::default();
        let mut events: Vec<(u64, Ump)> = Vec::new();
        for track in &self.tracks {
            let mut now = 0u64;
            for ump in &track.messages {
                match kind.observe(ump)? {
                    Some(ticks) => now += ticks,
                    None => events.push((now, *ump)),
                }
            }
        }

        let mut merged = Midi2Music::new(self.delta_time_spec);
        if events.is_empty() {
            merged.add_track(Midi2Track::default());
            return Ok(merged);
        }

        // Runs of equal time are moved as a whole; the sort is stable so runs
        // at the same time keep their track order.
        let mut runs: Vec<&[(u64, Ump)]> = events.chunk_by(|a, b| a.0 == b.0).collect();
        runs.sort_by_key(|run| run[0].0);
        trace!(events = events.len(), runs = runs.len(), "merging tracks");

        let mut messages = Vec::with_capacity(events.len() + runs.len());
        let mut now = 0u64;
        for run in runs {
            let time = run[0].0;
            if time > now {
                messages.extend(kind.packets(time - now));
                now = time;
            }
            messages.extend(run.iter().map(|(_, ump)| *ump));
        }

        merged.add_track(Midi2Track::new(messages));
        Ok(merged)
    }
}
