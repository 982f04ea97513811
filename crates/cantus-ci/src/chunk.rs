//! Reassembly of multi-chunk property exchange messages.

use std::collections::HashMap;
use std::time::Instant;

use tracing::{trace, warn};

use crate::message::PropertyData;
use crate::muid::Muid;
use crate::retrieval::PropertyChunk;

#[derive(Debug)]
struct PendingChunks {
    sub_id: u8,
    header: Vec<u8>,
    body: Vec<u8>,
    next_index: u16,
    started: Instant,
}

/// Collects chunks keyed by (source MUID, request id) until the last one arrives.
#[derive(Debug, Default)]
pub struct PropertyChunkManager {
    pending: HashMap<(Muid, u8), PendingChunks>,
}

impl PropertyChunkManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk; returns the reassembled data once the final chunk is in.
    pub fn add_chunk(&mut self, source: Muid, sub_id: u8, chunk: PropertyChunk, now: Instant) -> Option<PropertyData> {
        let key = (source, chunk.request_id);

        if chunk.chunk_index <= 1 {
            if chunk.num_chunks <= 1 {
                self.pending.remove(&key);
                return Some(PropertyData::new(chunk.request_id, chunk.header, chunk.body));
            }
            if self.pending.contains_key(&key) {
                warn!(%source, request_id = chunk.request_id, "restarting an unfinished chunked transfer");
            }
            self.pending.insert(
                key,
                PendingChunks {
                    sub_id,
                    header: chunk.header,
                    body: chunk.body,
                    next_index: 2,
                    started: now,
                },
            );
            return None;
        }

        let Some(entry) = self.pending.get_mut(&key) else {
            warn!(%source, request_id = chunk.request_id, index = chunk.chunk_index, "dropping chunk without a first chunk");
            return None;
        };
        if entry.sub_id != sub_id || entry.next_index != chunk.chunk_index {
            warn!(
                %source,
                request_id = chunk.request_id,
                expected = entry.next_index,
                got = chunk.chunk_index,
                "chunk out of sequence, discarding transfer"
            );
            self.pending.remove(&key);
            return None;
        }
        entry.body.extend_from_slice(&chunk.body);
        entry.next_index += 1;
        trace!(%source, request_id = chunk.request_id, index = chunk.chunk_index, total = chunk.num_chunks, "chunk");

        if chunk.chunk_index < chunk.num_chunks {
            return None;
        }
        let done = self.pending.remove(&key)?;
        Some(PropertyData::new(chunk.request_id, done.header, done.body))
    }

    /// Drops transfers started before `deadline`. Returns how many were dropped.
    pub fn expire(&mut self, deadline: Instant) -> usize {
        let before = self.pending.len();
        self.pending.retain(|(source, request_id), p| {
            let keep = p.started >= deadline;
            if !keep {
                warn!(%source, request_id, "chunked transfer timed out");
            }
            keep
        });
        before - self.pending.len()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
