//! MIDI 1.0 channel state tracking.

use crate::message::{midi1_status, midi_cc, Midi1Message};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DteTarget {
    #[default]
    Rpn,
    Nrpn,
}

#[derive(Debug, Clone, Default)]
pub struct Midi1SystemCommon {
    pub mtc_quarter_frame: u8,
    pub song_position_pointer: u16,
    pub song_select: u8,
}

/// State of one channel as last set by incoming messages.
#[derive(Debug, Clone)]
pub struct Midi1MachineChannel {
    pub note_on_status: [bool; 128],
    pub note_velocity: [u8; 128],
    pub paf_velocity: [u8; 128],
    pub controls: [u8; 128],
    /// Values set through data entry, indexed by `(msb << 7) | lsb`.
    pub rpns: Vec<u16>,
    pub nrpns: Vec<u16>,
    pub program: u8,
    pub caf: u8,
    /// 14-bit pitch bend, 8192 at the center.
    pub pitch_bend: u16,
    pub dte_target: DteTarget,
}

impl Default for Midi1MachineChannel {
    fn default() -> Self {
        Self {
            note_on_status: [false; 128],
            note_velocity: [0; 128],
            paf_velocity: [0; 128],
            controls: [0; 128],
            rpns: vec![0; 128 * 128],
            nrpns: vec![0; 128 * 128],
            program: 0,
            caf: 0,
            pitch_bend: 8192,
            dte_target: DteTarget::Rpn,
        }
    }
}

impl Midi1MachineChannel {
    pub fn current_rpn(&self) -> usize {
        ((self.controls[midi_cc::RPN_MSB as usize] as usize) << 7)
            | self.controls[midi_cc::RPN_LSB as usize] as usize
    }

    pub fn current_nrpn(&self) -> usize {
        ((self.controls[midi_cc::NRPN_MSB as usize] as usize) << 7)
            | self.controls[midi_cc::NRPN_LSB as usize] as usize
    }

    fn dte_slot(&mut self) -> &mut u16 {
        match self.dte_target {
            DteTarget::Rpn => {
                let index = self.current_rpn();
                &mut self.rpns[index]
            }
            DteTarget::Nrpn => {
                let index = self.current_nrpn();
                &mut self.nrpns[index]
            }
        }
    }

    fn process_dte(&mut self, value: u8, is_msb: bool) {
        let slot = self.dte_slot();
        *slot = if is_msb {
            (*slot & 0x007F) | (((value & 0x7F) as u16) << 7)
        } else {
            (*slot & 0x3F80) | (value & 0x7F) as u16
        };
    }

    fn process_dte_step(&mut self, increment: bool) {
        let slot = self.dte_slot();
        *slot = if increment {
            (*slot + 1).min(0x3FFF)
        } else {
            slot.saturating_sub(1)
        };
    }
}

type MessageListener = Box<dyn FnMut(&Midi1Message) + Send>;

/// Tracks the state of all 16 channels from a stream of MIDI 1.0 messages.
pub struct Midi1Machine {
    pub system_common: Midi1SystemCommon,
    pub channels: Vec<Midi1MachineChannel>,
    listeners: Vec<MessageListener>,
}

impl Default for Midi1Machine {
    fn default() -> Self {
        Self {
            system_common: Midi1SystemCommon::default(),
            channels: vec![Midi1MachineChannel::default(); 16],
            listeners: Vec::new(),
        }
    }
}

impl std::fmt::Debug for Midi1Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Midi1Machine")
            .field("system_common", &self.system_common)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl Midi1Machine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener called after each processed message.
    pub fn add_listener(&mut self, listener: impl FnMut(&Midi1Message) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn process_message(&mut self, message: &Midi1Message) {
        if let Midi1Message::Simple { status, msb, lsb } = *message {
            self.apply(status, msb, lsb);
        }
        for listener in &mut self.listeners {
            listener(message);
        }
    }

    fn apply(&mut self, status: u8, msb: u8, lsb: u8) {
        let (note, value) = ((msb & 0x7F) as usize, lsb & 0x7F);
        if status >= 0xF0 {
            match status {
                midi1_status::MTC_QUARTER_FRAME => self.system_common.mtc_quarter_frame = msb,
                midi1_status::SONG_POSITION_POINTER => {
                    self.system_common.song_position_pointer = ((lsb as u16) << 7) | msb as u16
                }
                midi1_status::SONG_SELECT => self.system_common.song_select = msb,
                _ => {}
            }
            return;
        }
        let ch = &mut self.channels[(status & 0xF) as usize];
        match status & 0xF0 {
            midi1_status::NOTE_ON => {
                ch.note_velocity[note] = value;
                ch.note_on_status[note] = true;
            }
            midi1_status::NOTE_OFF => {
                ch.note_velocity[note] = value;
                ch.note_on_status[note] = false;
            }
            midi1_status::PAF => ch.paf_velocity[note] = value,
            midi1_status::CC => {
                match msb {
                    midi_cc::NRPN_MSB | midi_cc::NRPN_LSB => ch.dte_target = DteTarget::Nrpn,
                    midi_cc::RPN_MSB | midi_cc::RPN_LSB => ch.dte_target = DteTarget::Rpn,
                    _ => {}
                }
                // the controller value must be in place before data entry reads the target
                ch.controls[note] = value;
                match msb {
                    midi_cc::DTE_MSB => ch.process_dte(value, true),
                    midi_cc::DTE_LSB => ch.process_dte(value, false),
                    midi_cc::DTE_INCREMENT => ch.process_dte_step(true),
                    midi_cc::DTE_DECREMENT => ch.process_dte_step(false),
                    _ => {}
                }
            }
            midi1_status::PROGRAM => ch.program = msb,
            midi1_status::CAF => ch.caf = msb,
            midi1_status::PITCH_BEND => ch.pitch_bend = ((lsb as u16) << 7) | msb as u16,
            _ => {}
        }
    }
}
