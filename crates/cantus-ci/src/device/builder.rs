//! Builder for configuring and constructing a [`MidiCiDevice`].

use std::time::Duration;

use tracing::debug;

use super::MidiCiDevice;
use crate::config::{MidiCiDeviceConfig, MidiCiDeviceInfo};
use crate::error::{Error, Result};
use crate::muid::Muid;
use crate::output::{CiOutput, NullOutput};
use crate::strategy::{DefaultMidiCiStrategy, MidiCiStrategy};

/// A random MUID is generated unless one is given. Without an output, sent
/// messages are discarded.
///
/// # Example
///
/// ```ignore
/// let (tx, rx) = crossbeam_channel::unbounded();
/// let device = MidiCiDevice::builder()
///     .device_info(info)
///     .product_instance_id("unit-1")
///     .output(tx)
///     .build()?;
/// ```
pub struct MidiCiDeviceBuilder {
    muid: Option<Muid>,
    config: MidiCiDeviceConfig,
    output: Option<Box<dyn CiOutput>>,
    report_output: Option<Box<dyn CiOutput>>,
    strategy: Option<Box<dyn MidiCiStrategy>>,
}

impl Default for MidiCiDeviceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MidiCiDeviceBuilder {
    pub fn new() -> Self {
        Self {
            muid: None,
            config: MidiCiDeviceConfig::default(),
            output: None,
            report_output: None,
            strategy: None,
        }
    }

    pub fn muid(mut self, muid: Muid) -> Self {
        self.muid = Some(muid);
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: MidiCiDeviceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn device_info(mut self, info: MidiCiDeviceInfo) -> Self {
        self.config.device_info = info;
        self
    }

    pub fn product_instance_id(mut self, id: impl Into<String>) -> Self {
        self.config.product_instance_id = id.into();
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = Some(timeout);
        self
    }

    pub fn output(mut self, output: impl CiOutput + 'static) -> Self {
        self.output = Some(Box::new(output));
        self
    }

    /// Destination of the MIDI 1.0 bytes streamed by a MIDI message report.
    pub fn midi_message_report_output(mut self, output: impl CiOutput + 'static) -> Self {
        self.report_output = Some(Box::new(output));
        self
    }

    pub fn strategy(mut self, strategy: impl MidiCiStrategy + 'static) -> Self {
        self.strategy = Some(Box::new(strategy));
        self
    }

    pub fn build(self) -> Result<MidiCiDevice> {
        self.config.validate()?;
        let muid = self.muid.unwrap_or_else(Muid::random);
        if muid.is_broadcast() {
            return Err(Error::InvalidMuid(muid.value()));
        }
        let output = self.output.unwrap_or_else(|| {
            debug!("no output configured, outgoing messages are discarded");
            Box::new(NullOutput)
        });
        let strategy = self.strategy.unwrap_or_else(|| Box::new(DefaultMidiCiStrategy));
        debug!(%muid, "MIDI-CI device created");
        Ok(MidiCiDevice::from_parts(muid, self.config, output, self.report_output, strategy))
    }
}
