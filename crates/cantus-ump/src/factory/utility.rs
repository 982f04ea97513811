//! Utility (type 0) and System (type 1) messages.

use crate::ump::utility_status;

/// JR Clock / JR Timestamp resolution.
pub const JR_TIMESTAMP_TICKS_PER_SECOND: u32 = 31250;

const MAX_JR_TICKS: u64 = 0xFFFF;
const MAX_DELTA_CLOCKSTAMP_TICKS: u64 = 0xF_FFFF;

fn utility(status: u8, data: u32) -> u32 {
    ((status as u32 & 0xF) << 20) | (data & 0xF_FFFF)
}

fn seconds_to_jr_ticks(seconds: f64) -> u64 {
    (seconds * JR_TIMESTAMP_TICKS_PER_SECOND as f64) as u64
}

pub fn noop() -> u32 {
    0
}

/// JR Clock carrying the sender clock time in seconds.
pub fn jr_clock(sender_clock_time: f64) -> u32 {
    jr_clock_direct(seconds_to_jr_ticks(sender_clock_time) as u16)
}

pub fn jr_clock_direct(ticks: u16) -> u32 {
    utility(utility_status::JR_CLOCK, ticks as u32)
}

/// JR Timestamp carrying a timestamp in seconds (at most 0xFFFF ticks).
pub fn jr_timestamp(seconds: f64) -> u32 {
    jr_timestamp_direct(seconds_to_jr_ticks(seconds).min(MAX_JR_TICKS) as u16)
}

pub fn jr_timestamp_direct(ticks: u16) -> u32 {
    utility(utility_status::JR_TIMESTAMP, ticks as u32)
}

/// JR Timestamps spanning `seconds`, split into as many packets as needed.
pub fn jr_timestamps(seconds: f64) -> Vec<u32> {
    jr_timestamps_direct(seconds_to_jr_ticks(seconds))
}

pub fn jr_timestamps_direct(mut ticks: u64) -> Vec<u32> {
    let mut out = Vec::with_capacity((ticks / MAX_JR_TICKS + 1) as usize);
    while ticks > 0 {
        let step = ticks.min(MAX_JR_TICKS);
        out.push(jr_timestamp_direct(step as u16));
        ticks -= step;
    }
    out
}

/// Delta Clockstamp Ticks Per Quarter note.
pub fn dctpq(ticks_per_quarter_note: u16) -> u32 {
    utility(utility_status::DCTPQ, ticks_per_quarter_note as u32)
}

/// Delta Clockstamp (20-bit tick count; larger values are masked).
pub fn delta_clockstamp(ticks: u32) -> u32 {
    utility(utility_status::DELTA_CLOCKSTAMP, ticks)
}

/// Delta Clockstamps spanning `ticks`, split into as many packets as needed.
pub fn delta_clockstamps(mut ticks: u64) -> Vec<u32> {
    let mut out = Vec::with_capacity((ticks / MAX_DELTA_CLOCKSTAMP_TICKS + 1) as usize);
    while ticks > 0 {
        let step = ticks.min(MAX_DELTA_CLOCKSTAMP_TICKS);
        out.push(delta_clockstamp(step as u32));
        ticks -= step;
    }
    out
}

/// System Common / System Real Time message (type 1).
pub fn system_message(group: u8, status: u8, midi1_byte2: u8, midi1_byte3: u8) -> u32 {
    0x1000_0000
        | ((group as u32 & 0xF) << 24)
        | ((status as u32) << 16)
        | ((midi1_byte2 as u32 & 0x7F) << 8)
        | (midi1_byte3 as u32 & 0x7F)
}
