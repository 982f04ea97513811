//! UMP builders.
//!
//! Pure functions mapping message parameters to packets. 32-bit messages are
//! returned as `u32`, 64-bit messages as `u64`, 128-bit SysEx8 packets as a
//! `(u64, u64)` pair, and Flex Data / UMP Stream messages as [`Ump`](crate::Ump)
//! values (text-bearing variants as a `Vec<Ump>`).

mod channel;
mod flex;
mod stream;
mod sysex;
mod utility;

pub use channel::*;
pub use flex::*;
pub use stream::*;
pub use sysex::*;
pub use utility::*;

/// Splits a byte payload into packets of `capacity` bytes, yielding the form
/// (complete/start/continue/end) of each chunk. An empty payload yields one
/// complete, empty chunk.
pub(crate) fn text_chunks(bytes: &[u8], capacity: usize) -> Vec<(u8, &[u8])> {
    use crate::ump::binary_chunk_status::*;

    if bytes.len() <= capacity {
        return vec![(COMPLETE_PACKET, bytes)];
    }
    let chunks: Vec<&[u8]> = bytes.chunks(capacity).collect();
    let last = chunks.len() - 1;
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let form = match i {
                0 => START,
                i if i == last => END,
                _ => CONTINUE,
            };
            (form, chunk)
        })
        .collect()
}
