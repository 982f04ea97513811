//! Policy hooks for the parts of responder behavior an application decides.

use cantus_smf::{Midi1Machine, Midi1Message};
use tracing::debug;

use crate::constants::{address, midi_report};
use crate::message::PropertyData;
use crate::muid::Muid;
use crate::profile::{MidiCiProfile, MidiCiProfileId};

/// Which state a MIDI message report asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MidiMessageReportRequest {
    pub address: u8,
    pub message_data_control: u8,
    pub system_messages: u8,
    pub channel_controller_messages: u8,
    pub note_data_messages: u8,
}

/// Turns channel state into the messages a MIDI message report streams.
pub trait MidiMessageReporter: Send {
    fn report(&mut self, machine: &Midi1Machine, request: &MidiMessageReportRequest) -> Vec<Midi1Message>;
}

/// Reports the tracked state of a [`Midi1Machine`]: system common values,
/// then per channel program, controllers, RPN/NRPN values, pitch bend,
/// channel pressure and the notes currently on.
#[derive(Debug, Default, Clone, Copy)]
pub struct MachineReporter;

impl MidiMessageReporter for MachineReporter {
    fn report(&mut self, machine: &Midi1Machine, request: &MidiMessageReportRequest) -> Vec<Midi1Message> {
        use cantus_smf::{midi1_status, midi_cc};
        use midi_report::{channel_controller as cc, note_data, system};

        let mut out = Vec::new();
        if request.message_data_control == midi_report::data_control::NO_DATA {
            return out;
        }
        let simple = |status: u8, msb: u8, lsb: u8| Midi1Message::Simple { status, msb, lsb };

        let sys = &machine.system_common;
        if request.system_messages & system::MTC_QUARTER_FRAME != 0 {
            out.push(simple(midi1_status::MTC_QUARTER_FRAME, sys.mtc_quarter_frame, 0));
        }
        if request.system_messages & system::SONG_POSITION != 0 {
            let spp = sys.song_position_pointer;
            out.push(simple(midi1_status::SONG_POSITION_POINTER, (spp & 0x7F) as u8, (spp >> 7) as u8 & 0x7F));
        }
        if request.system_messages & system::SONG_SELECT != 0 {
            out.push(simple(midi1_status::SONG_SELECT, sys.song_select, 0));
        }

        let channels: Vec<u8> = if address::is_group_or_function_block(request.address) {
            (0..16).collect()
        } else {
            vec![request.address & 0x0F]
        };
        let only_changed = request.message_data_control == midi_report::data_control::ONLY_NON_DEFAULT;
        for ch in channels {
            let Some(state) = machine.channels.get(ch as usize) else {
                continue;
            };
            let ctrl = request.channel_controller_messages;
            if ctrl & cc::PROGRAM_CHANGE != 0 && !(only_changed && state.program == 0) {
                out.push(Midi1Message::program(ch, state.program));
            }
            if ctrl & cc::CONTROL_CHANGE != 0 {
                for (number, value) in state.controls.iter().enumerate() {
                    if only_changed && *value == 0 {
                        continue;
                    }
                    out.push(Midi1Message::cc(ch, number as u8, *value));
                }
            }
            let parameter_values = |values: &[u16], msb: u8, lsb: u8, out: &mut Vec<Midi1Message>| {
                for (index, value) in values.iter().enumerate().filter(|(_, v)| **v != 0) {
                    out.push(Midi1Message::cc(ch, msb, (index >> 7) as u8));
                    out.push(Midi1Message::cc(ch, lsb, (index & 0x7F) as u8));
                    out.push(Midi1Message::cc(ch, midi_cc::DTE_MSB, (value >> 7) as u8));
                    out.push(Midi1Message::cc(ch, midi_cc::DTE_LSB, (value & 0x7F) as u8));
                }
            };
            if ctrl & cc::RPN != 0 {
                parameter_values(&state.rpns, midi_cc::RPN_MSB, midi_cc::RPN_LSB, &mut out);
            }
            if ctrl & cc::NRPN != 0 {
                parameter_values(&state.nrpns, midi_cc::NRPN_MSB, midi_cc::NRPN_LSB, &mut out);
            }
            if ctrl & cc::PITCH_BEND != 0 && !(only_changed && state.pitch_bend == 8192) {
                out.push(Midi1Message::pitch_bend(ch, state.pitch_bend));
            }
            if ctrl & cc::CHANNEL_PRESSURE != 0 && !(only_changed && state.caf == 0) {
                out.push(simple(midi1_status::CAF | ch, state.caf, 0));
            }

            let notes = request.note_data_messages;
            for note in 0..128u8 {
                if !state.note_on_status[note as usize] {
                    continue;
                }
                if notes & note_data::NOTES != 0 {
                    out.push(Midi1Message::note_on(ch, note, state.note_velocity[note as usize]));
                }
                if notes & note_data::POLY_PRESSURE != 0 {
                    out.push(simple(midi1_status::PAF | ch, note, state.paf_velocity[note as usize]));
                }
            }
        }
        out
    }
}

/// Decisions the responder delegates to the application. Dispatch itself is
/// fixed; these hooks only decide outcomes and receive payloads.
pub trait MidiCiStrategy: Send {
    /// Whether a SetProfileOn/Off from a peer is honored.
    fn accept_set_profile(&mut self, _profile: &MidiCiProfile, _num_channels_requested: u16) -> bool {
        true
    }

    /// Data for a profile details reply. `None` answers with a NAK.
    fn profile_details(&mut self, _profile: &MidiCiProfileId, _target: u8) -> Option<Vec<u8>> {
        Some(Vec::new())
    }

    fn profile_specific_data(&mut self, source: Muid, address: u8, profile: &MidiCiProfileId, data: &[u8]) {
        debug!(%source, address, %profile, len = data.len(), "profile specific data");
    }

    fn property_notify(&mut self, source: Muid, data: &PropertyData) {
        debug!(%source, request_id = data.request_id, "property notify");
    }

    fn midi_message_report(&mut self, machine: &Midi1Machine, request: &MidiMessageReportRequest) -> Vec<Midi1Message> {
        MachineReporter.report(machine, request)
    }
}

/// Accepts every profile change and reports from the device's channel state.
#[derive(Debug, Default)]
pub struct DefaultMidiCiStrategy;

impl MidiCiStrategy for DefaultMidiCiStrategy {}
