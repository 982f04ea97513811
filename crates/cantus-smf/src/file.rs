//! Reading and writing whole SMF images and files.

use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::music::Midi1Music;
use crate::reader::read_music;
use crate::writer::{write_music, Midi1WriterOptions};

impl Midi1Music {
    /// Parses an SMF image.
    pub fn read(data: &[u8]) -> Result<Self> {
        read_music(data)
    }

    /// Appends the SMF image to `out` with running status and the default meta writer.
    pub fn write(&self, out: &mut Vec<u8>) {
        self.write_with(out, &Midi1WriterOptions::default());
    }

    pub fn write_with(&self, out: &mut Vec<u8>, options: &Midi1WriterOptions<'_>) {
        write_music(self, out, options);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write(&mut out);
        out
    }

    /// Load and parse a MIDI file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        debug!(path = %path.as_ref().display(), bytes = data.len(), "loading SMF");
        Self::read(&data)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_bytes())?;
        Ok(())
    }
}
