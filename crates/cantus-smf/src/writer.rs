//! SMF writer.
//!
//! Every track length is computed by a sizing pass before the track body is
//! emitted; the two passes share one event walker so they cannot disagree.

use tracing::trace;

use crate::message::{fixed_data_size, meta_type, midi1_status, Midi1Message};
use crate::music::{Midi1Music, Midi1Track};
use crate::vlq::{vlq_length, write_vlq};

/// Writes the bytes of a meta event after its delta time.
pub trait MetaEventWriter {
    /// Number of bytes [`write`](Self::write) emits for this event.
    fn size(&self, meta_type: u8, data: &[u8]) -> usize;
    fn write(&self, meta_type: u8, data: &[u8], out: &mut Vec<u8>);
}

/// Splits payloads into records of at most 0x7F bytes with a one-byte length,
/// each following record preceded by a zero delta time.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMetaEventWriter;

const META_CHUNK: usize = 0x7F;

impl MetaEventWriter for DefaultMetaEventWriter {
    fn size(&self, _meta_type: u8, data: &[u8]) -> usize {
        let repeat = data.len() / META_CHUNK;
        if repeat == 0 {
            return 3 + data.len();
        }
        let rest = data.len() % META_CHUNK;
        repeat * (4 + META_CHUNK) - 1 + if rest > 0 { 4 + rest } else { 0 }
    }

    fn write(&self, meta_type: u8, data: &[u8], out: &mut Vec<u8>) {
        if data.is_empty() {
            out.extend_from_slice(&[midi1_status::META, meta_type, 0]);
            return;
        }
        for (i, chunk) in data.chunks(META_CHUNK).enumerate() {
            if i > 0 {
                out.push(0);
            }
            out.extend_from_slice(&[midi1_status::META, meta_type, chunk.len() as u8]);
            out.extend_from_slice(chunk);
        }
    }
}

/// Writes each meta event as a single record with a VLQ length.
#[derive(Debug, Clone, Copy, Default)]
pub struct VlqMetaEventWriter;

impl MetaEventWriter for VlqMetaEventWriter {
    fn size(&self, _meta_type: u8, data: &[u8]) -> usize {
        2 + vlq_length(data.len() as u32) + data.len()
    }

    fn write(&self, meta_type: u8, data: &[u8], out: &mut Vec<u8>) {
        out.extend_from_slice(&[midi1_status::META, meta_type]);
        write_vlq(out, data.len() as u32);
        out.extend_from_slice(data);
    }
}

pub struct Midi1WriterOptions<'a> {
    pub disable_running_status: bool,
    pub meta_writer: &'a dyn MetaEventWriter,
}

impl Default for Midi1WriterOptions<'_> {
    fn default() -> Self {
        Self {
            disable_running_status: false,
            meta_writer: &DefaultMetaEventWriter,
        }
    }
}

const END_OF_TRACK: [u8; 4] = [0, midi1_status::META, meta_type::END_OF_TRACK, 0];

/// Walks a track, either counting (`out == None`) or emitting bytes.
fn walk_track(track: &Midi1Track, options: &Midi1WriterOptions<'_>, mut out: Option<&mut Vec<u8>>) -> usize {
    let mut size = 0;
    let mut running_status = 0u8;
    let mut wrote_end_of_track = false;

    for event in &track.events {
        size += vlq_length(event.delta_time);
        if let Some(out) = out.as_deref_mut() {
            write_vlq(out, event.delta_time);
        }

        match &event.message {
            Midi1Message::Meta { meta_type, data } => {
                size += options.meta_writer.size(*meta_type, data);
                if let Some(out) = out.as_deref_mut() {
                    options.meta_writer.write(*meta_type, data, out);
                }
                wrote_end_of_track |= *meta_type == meta_type::END_OF_TRACK;
            }
            Midi1Message::Sysex { status, data } => {
                size += 1 + vlq_length(data.len() as u32) + data.len();
                if let Some(out) = out.as_deref_mut() {
                    out.push(*status);
                    write_vlq(out, data.len() as u32);
                    out.extend_from_slice(data);
                }
            }
            Midi1Message::Simple { status, msb, lsb } => {
                // running status only spans channel voice messages
                let with_status =
                    options.disable_running_status || *status >= 0xF0 || *status != running_status;
                let len = fixed_data_size(*status);
                size += len + usize::from(with_status);
                if let Some(out) = out.as_deref_mut() {
                    if with_status {
                        out.push(*status);
                    }
                    let data = [*msb, *lsb];
                    out.extend_from_slice(&data[..len]);
                }
            }
        }
        running_status = match event.message.status_byte() {
            status if status < 0xF0 => status,
            _ => 0,
        };
    }

    if !wrote_end_of_track {
        size += END_OF_TRACK.len();
        if let Some(out) = out {
            out.extend_from_slice(&END_OF_TRACK);
        }
    }
    size
}

/// Bytes of the `MTrk` body for `track`, end-of-track record included.
pub fn track_data_size(track: &Midi1Track, options: &Midi1WriterOptions<'_>) -> usize {
    walk_track(track, options, None)
}

pub(crate) fn write_music(music: &Midi1Music, out: &mut Vec<u8>, options: &Midi1WriterOptions<'_>) {
    out.extend_from_slice(b"MThd");
    out.extend_from_slice(&6u32.to_be_bytes());
    out.extend_from_slice(&music.format.to_be_bytes());
    out.extend_from_slice(&(music.tracks.len() as u16).to_be_bytes());
    out.extend_from_slice(&music.delta_time_spec.to_be_bytes());

    for track in &music.tracks {
        let size = track_data_size(track, options);
        out.extend_from_slice(b"MTrk");
        out.extend_from_slice(&(size as u32).to_be_bytes());
        let start = out.len();
        walk_track(track, options, Some(out));
        debug_assert_eq!(out.len() - start, size, "track size pre-pass mismatch");
        trace!(events = track.events.len(), size, "wrote track");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Midi1Event;

    fn written(track: &Midi1Track, options: &Midi1WriterOptions<'_>) -> Vec<u8> {
        let mut out = Vec::new();
        walk_track(track, options, Some(&mut out));
        assert_eq!(out.len(), track_data_size(track, options));
        out
    }

    #[test]
    fn test_running_status() {
        let track = Midi1Track::new(vec![
            Midi1Event::new(0, Midi1Message::note_on(0, 60, 100)),
            Midi1Event::new(48, Midi1Message::note_on(0, 60, 0)),
        ]);
        assert_eq!(
            written(&track, &Midi1WriterOptions::default()),
            vec![0, 0x90, 60, 100, 48, 60, 0, 0, 0xFF, 0x2F, 0]
        );

        let options = Midi1WriterOptions {
            disable_running_status: true,
            ..Default::default()
        };
        assert_eq!(
            written(&track, &options),
            vec![0, 0x90, 60, 100, 48, 0x90, 60, 0, 0, 0xFF, 0x2F, 0]
        );
    }

    #[test]
    fn test_explicit_end_of_track_not_duplicated() {
        let track = Midi1Track::new(vec![
            Midi1Event::new(0, Midi1Message::program(1, 5)),
            Midi1Event::new(10, Midi1Message::end_of_track()),
        ]);
        assert_eq!(
            written(&track, &Midi1WriterOptions::default()),
            vec![0, 0xC1, 5, 10, 0xFF, 0x2F, 0]
        );
    }

    #[test]
    fn test_meta_after_channel_message_restores_status() {
        let track = Midi1Track::new(vec![
            Midi1Event::new(0, Midi1Message::note_on(0, 60, 100)),
            Midi1Event::new(0, Midi1Message::text(meta_type::MARKER, "A")),
            Midi1Event::new(0, Midi1Message::note_on(0, 62, 100)),
        ]);
        let bytes = written(&track, &Midi1WriterOptions::default());
        assert_eq!(&bytes[4..12], &[0, 0xFF, 0x06, 1, b'A', 0, 0x90, 62]);
    }

    #[test]
    fn test_system_common_always_carries_status() {
        let track = Midi1Track::new(vec![
            Midi1Event::new(0, Midi1Message::note_on(0, 60, 100)),
            Midi1Event::new(0, Midi1Message::Simple { status: 0xF2, msb: 1, lsb: 2 }),
            Midi1Event::new(10, Midi1Message::Simple { status: 0xF2, msb: 3, lsb: 4 }),
            Midi1Event::new(0, Midi1Message::note_on(0, 62, 100)),
        ]);
        let bytes = written(&track, &Midi1WriterOptions::default());
        assert_eq!(
            bytes,
            vec![0, 0x90, 60, 100, 0, 0xF2, 1, 2, 10, 0xF2, 3, 4, 0, 0x90, 62, 100, 0, 0xFF, 0x2F, 0]
        );

        let mut music = crate::Midi1Music::default();
        music.add_track(track);
        let read = crate::Midi1Music::read(&music.to_bytes()).unwrap();
        assert_eq!(read.tracks[0].events[2].message, Midi1Message::Simple { status: 0xF2, msb: 3, lsb: 4 });
    }

    #[test]
    fn test_default_meta_writer_sizes() {
        let w = DefaultMetaEventWriter;
        for len in [0usize, 1, 126, 127, 128, 254, 255, 300] {
            let data = vec![0x20u8; len];
            let mut out = Vec::new();
            w.write(meta_type::TEXT, &data, &mut out);
            assert_eq!(out.len(), w.size(meta_type::TEXT, &data), "len {len}");
        }
    }

    #[test]
    fn test_default_meta_writer_splits_long_payloads() {
        let data = vec![b'x'; 130];
        let mut out = Vec::new();
        DefaultMetaEventWriter.write(meta_type::TEXT, &data, &mut out);
        assert_eq!(&out[..3], &[0xFF, 0x01, 0x7F]);
        assert_eq!(&out[130..135], &[0, 0xFF, 0x01, 3, b'x']);
    }

    #[test]
    fn test_vlq_meta_writer() {
        let data = vec![b'x'; 200];
        let mut out = Vec::new();
        VlqMetaEventWriter.write(meta_type::TEXT, &data, &mut out);
        assert_eq!(&out[..4], &[0xFF, 0x01, 0x81, 0x48]);
        assert_eq!(out.len(), VlqMetaEventWriter.size(meta_type::TEXT, &data));
    }

    #[test]
    fn test_sysex_record() {
        let track = Midi1Track::new(vec![Midi1Event::new(
            0,
            Midi1Message::Sysex {
                status: 0xF0,
                data: vec![0x7E, 0x7F, 0x09, 0x01, 0xF7],
            },
        )]);
        assert_eq!(
            written(&track, &Midi1WriterOptions::default()),
            vec![0, 0xF0, 5, 0x7E, 0x7F, 0x09, 0x01, 0xF7, 0, 0xFF, 0x2F, 0]
        );
    }
}
