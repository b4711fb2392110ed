
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Sentinel for parameters the instrument did not report in its current mode.
/// None of the decoded quantities is legitimately negative here, so callers
/// must treat -1 as "not applicable" rather than data.
pub const UNSET: f32 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Wavetype {
    Sine,
    Square,
    Ramp,
    Pulse,
    Noise,
    Arb,
    Dc,
}

impl Wavetype {
    pub fn from_token(token: &str) -> Result<Self> {
        match token {
            "SINE" => Ok(Wavetype::Sine),
            "SQUARE" => Ok(Wavetype::Square),
            "RAMP" => Ok(Wavetype::Ramp),
            "PULSE" => Ok(Wavetype::Pulse),
            "NOISE" => Ok(Wavetype::Noise),
            "ARB" => Ok(Wavetype::Arb),
            "DC" => Ok(Wavetype::Dc),
            _ => Err(Error::Parse { field: "WVTP", value: token.to_owned() }),
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            Wavetype::Sine => "SINE",
            Wavetype::Square => "SQUARE",
            Wavetype::Ramp => "RAMP",
            Wavetype::Pulse => "PULSE",
            Wavetype::Noise => "NOISE",
            Wavetype::Arb => "ARB",
            Wavetype::Dc => "DC",
        }
    }
}

/// Decoded parameter set of a basic-waveform status response.  Which fields
/// the instrument reports depends on the selected wavetype; everything it
/// left out stays at `UNSET` (or `None` for the wavetype itself).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicWaveform {
    pub wavetype: Option<Wavetype>,
    pub frequency_hz: f32,
    pub period_s: f32,
    pub amplitude_v: f32,
    pub amplitude_vrms: f32,
    pub offset_v: f32,
    pub symmetry_pct: f32,
    pub duty_pct: f32,
    pub phase_deg: f32,
    pub high_level_v: f32,
    pub low_level_v: f32,
    pub noise_stdev_v: f32,
    pub noise_mean_v: f32,
}

impl Default for BasicWaveform {
    fn default() -> Self {
        BasicWaveform {
            wavetype: None,
            frequency_hz: UNSET,
            period_s: UNSET,
            amplitude_v: UNSET,
            amplitude_vrms: UNSET,
            offset_v: UNSET,
            symmetry_pct: UNSET,
            duty_pct: UNSET,
            phase_deg: UNSET,
            high_level_v: UNSET,
            low_level_v: UNSET,
            noise_stdev_v: UNSET,
            noise_mean_v: UNSET,
        }
    }
}

/// Decode one basic-waveform status line.
///
/// The line may carry the instrument's `C<n>:BSWV ` echo (everything up to the
/// first space is the echo token and is ignored) or start directly at the
/// first key.  The remaining comma-separated tokens are `(key, value)` pairs
/// in no guaranteed order, and the set of keys present varies with the
/// selected wavetype.  Keys this decoder does not know are skipped so that
/// firmware additions do not break it.
pub fn decode_basic_waveform(line: &str) -> Result<BasicWaveform> {
    let line: &str = line.trim_end();
    let body: &str = match line.find(' ') {
        Some(space) => &line[space + 1..],
        None => line,
    };

    let mut decoded = BasicWaveform::default();

    let mut tokens = body.split(',');
    while let Some(key) = tokens.next() {
        let value: &str = match tokens.next() {
            Some(v) => v.trim(),
            // A dangling trailing token is tolerated like an unknown key
            None => break,
        };

        match key.trim() {
            "WVTP" => decoded.wavetype = Some(Wavetype::from_token(value)?),
            "FRQ" => decoded.frequency_hz = numeric("FRQ", value, "HZ")?,
            "PERI" => decoded.period_s = numeric("PERI", value, "S")?,
            "AMP" => decoded.amplitude_v = numeric("AMP", value, "V")?,
            "AMPVRMS" => decoded.amplitude_vrms = numeric("AMPVRMS", value, "VRMS")?,
            "OFST" => decoded.offset_v = numeric("OFST", value, "V")?,
            "SYM" => decoded.symmetry_pct = numeric("SYM", value, "")?,
            "DUTY" => decoded.duty_pct = numeric("DUTY", value, "")?,
            "PHSE" => decoded.phase_deg = numeric("PHSE", value, "")?,
            "HLEV" => decoded.high_level_v = numeric("HLEV", value, "V")?,
            "LLEV" => decoded.low_level_v = numeric("LLEV", value, "V")?,
            "STDEV" => decoded.noise_stdev_v = numeric("STDEV", value, "V")?,
            "MEAN" => decoded.noise_mean_v = numeric("MEAN", value, "V")?,
            _ => {}
        }
    }

    Ok(decoded)
}

// Strip a trailing unit and parse the rest.  `f32::from_str` already accepts
// scientific notation and is locale-independent.
fn numeric(field: &'static str, raw: &str, unit: &str) -> Result<f32> {
    let digits: &str = if !unit.is_empty()
        && raw.len() >= unit.len()
        && raw.is_char_boundary(raw.len() - unit.len())
        && raw[raw.len() - unit.len()..].eq_ignore_ascii_case(unit)
    {
        &raw[..raw.len() - unit.len()]
    } else {
        raw
    };

    digits
        .parse::<f32>()
        .map_err(|_| Error::Parse { field, value: raw.to_owned() })
}
