//! Transport boundary for outgoing sysex.

use crossbeam_channel::Sender;
use tracing::warn;

/// Receives one complete MIDI-CI sysex payload (no F0/F7) per call.
pub trait CiOutput: Send {
    fn send(&mut self, group: u8, data: &[u8]);
}

impl<F> CiOutput for F
where
    F: FnMut(u8, &[u8]) + Send,
{
    fn send(&mut self, group: u8, data: &[u8]) {
        self(group, data)
    }
}

impl CiOutput for Sender<(u8, Vec<u8>)> {
    fn send(&mut self, group: u8, data: &[u8]) {
        if Sender::send(self, (group, data.to_vec())).is_err() {
            warn!(group, len = data.len(), "output channel disconnected, message dropped");
        }
    }
}

/// Output that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOutput;

impl CiOutput for NullOutput {
    fn send(&mut self, _group: u8, _data: &[u8]) {}
}
