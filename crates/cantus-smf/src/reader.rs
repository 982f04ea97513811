//! SMF reader. Every error carries the byte offset where parsing stopped.

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::message::{fixed_data_size, midi1_status, Midi1Event, Midi1Message};
use crate::music::{Midi1Music, Midi1Track};

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn error(&self, message: impl Into<String>) -> Error {
        Error::parse(message, self.pos)
    }

    fn peek(&self) -> Result<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or_else(|| self.error("Insufficient stream. Failed to read a byte"))
    }

    fn byte(&mut self) -> Result<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Ok(b)
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let available = self.data.len() - self.pos;
        if available < len {
            return Err(self.error(format!(
                "The stream is insufficient to read {len} bytes; only {available} left"
            )));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn tag(&mut self, expected: &[u8; 4]) -> Result<()> {
        let start = self.pos;
        if self.bytes(4)? != expected {
            return Err(Error::parse(
                format!("{} is expected", String::from_utf8_lossy(expected)),
                start,
            ));
        }
        Ok(())
    }

    fn vlq(&mut self) -> Result<u32> {
        let mut value = 0u32;
        for _ in 0..4 {
            let b = self.byte()?;
            value = (value << 7) | (b & 0x7F) as u32;
            if b < 0x80 {
                return Ok(value);
            }
        }
        Err(self.error("Variable length quantity exceeds the 4-byte limitation"))
    }
}

/// Parses a complete SMF image.
pub fn read_music(data: &[u8]) -> Result<Midi1Music> {
    let mut r = Reader { data, pos: 0 };
    r.tag(b"MThd")?;
    let header_size = r.u32()?;
    if header_size != 6 {
        return Err(r.error(format!("Unexpected header size {header_size} (should be 6)")));
    }
    let format = r.u16()?;
    let track_count = r.u16()?;
    let delta_time_spec = r.u16()?;
    debug!(format, track_count, delta_time_spec, "reading SMF");

    let mut music = Midi1Music {
        format,
        delta_time_spec,
        tracks: Vec::with_capacity(track_count as usize),
    };
    for _ in 0..track_count {
        music.tracks.push(read_track(&mut r)?);
    }
    Ok(music)
}

fn read_track(r: &mut Reader<'_>) -> Result<Midi1Track> {
    r.tag(b"MTrk")?;
    let declared = r.u32()? as usize;
    let start = r.pos;
    let mut track = Midi1Track::default();
    let mut running_status = 0u8;

    while r.pos - start < declared {
        let delta_time = r.vlq()?;
        let message = read_message(r, &mut running_status)?;
        track.events.push(Midi1Event::new(delta_time, message));
    }
    if r.pos - start != declared {
        return Err(r.error(format!(
            "Size information mismatch: declared {declared}, read {}",
            r.pos - start
        )));
    }
    trace!(events = track.events.len(), size = declared, "read track");
    Ok(track)
}

fn read_message(r: &mut Reader<'_>, running_status: &mut u8) -> Result<Midi1Message> {
    if r.peek()? >= 0x80 {
        *running_status = r.byte()?;
    } else if *running_status < 0x80 || *running_status >= 0xF0 {
        return Err(r.error("Data byte without a running status"));
    }

    match *running_status {
        midi1_status::SYSEX | midi1_status::SYSEX_END => {
            let len = r.vlq()? as usize;
            Ok(Midi1Message::Sysex {
                status: *running_status,
                data: r.bytes(len)?.to_vec(),
            })
        }
        midi1_status::META => {
            let meta_type = r.byte()?;
            let len = r.vlq()? as usize;
            Ok(Midi1Message::Meta {
                meta_type,
                data: r.bytes(len)?.to_vec(),
            })
        }
        status => {
            let size = fixed_data_size(status);
            let msb = if size > 0 { r.byte()? } else { 0 };
            let lsb = if size > 1 { r.byte()? } else { 0 };
            Ok(Midi1Message::Simple { status, msb, lsb })
        }
    }
}
