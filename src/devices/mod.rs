
// Drivers currently cover Rigol DS1000Z-series oscilloscopes and Siglent
// SDG2000X-series waveform generators.  Each driver is one concrete type over
// the shared ScpiLink helper; the registry in crate::discovery maps reported
// model strings onto these types.

pub mod ds1000z;
pub mod sdg2000x;

use crate::bus::Identity;
use crate::error::Result;
use crate::params::{BasicWaveform, Wavetype};

pub trait Instrument {
    fn identity(&self) -> &Identity;
    fn resource(&self) -> &str;

    fn identification_string(&self) -> String {
        self.identity().identification_string()
    }
}

/// Capability surface shared by every supported oscilloscope.
pub trait Oscilloscope: Instrument + Send {
    fn run(&self) -> Result<()>;
    fn stop(&self) -> Result<()>;

    /// Calibrated voltages for the samples currently on screen.
    fn read_screen(&self, chan_num: u8) -> Result<Vec<f32>>;

    /// Calibrated voltages for the full capture memory.
    fn read_deep_memory(&self, chan_num: u8) -> Result<Vec<f32>>;
}

/// Capability surface shared by every supported function generator.
pub trait FunctionGenerator: Instrument + Send {
    fn basic_waveform(&self, chan_num: u8) -> Result<BasicWaveform>;

    fn set_basic_waveform(
        &self,
        chan_num: u8,
        wavetype: Wavetype,
        freq_hz: f32,
        amp_v: f32,
        offset_v: f32,
        phase_deg: f32,
    ) -> Result<()>;

    fn output(&self, chan_num: u8) -> Result<bool>;
    fn set_output(&self, chan_num: u8, on: bool) -> Result<()>;
}
