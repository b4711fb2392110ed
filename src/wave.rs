
use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Per-channel scale factors queried from the oscilloscope around a transfer.
/// These move whenever the channel settings change, so they are queried fresh
/// for every transfer and never cached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub y_origin: f32,
    pub y_increment: f32,
    pub y_reference: f32,
    pub x_increment: f32,
}

impl Calibration {
    /// Map one raw sample byte onto a calibrated voltage.
    pub fn volts(&self, sample: u8) -> f32 {
        (f32::from(sample) - self.y_origin - self.y_reference) * self.y_increment
    }

    pub fn decode(&self, raw: &[u8]) -> Vec<f32> {
        raw.iter().map(|&sample| self.volts(sample)).collect()
    }
}

/// Rescale voltages onto the full signed 16-bit range for upload.  `low` maps
/// to -32768 and `high` to 32767; every sample must lie within those levels.
pub fn encode_samples(voltages: &[f32], low: f32, high: f32) -> Result<Vec<i16>> {
    if !(low < high) {
        return Err(Error::InvalidState(format!(
            "low level {} must be below high level {}",
            low, high
        )));
    }

    let span: f32 = high - low;
    let mut codes: Vec<i16> = Vec::with_capacity(voltages.len());
    for &v in voltages {
        if v < low {
            return Err(Error::Range {
                what: "voltage below low level",
                value: f64::from(v),
                min: f64::from(low),
                max: f64::from(high),
            });
        }
        if v > high {
            return Err(Error::Range {
                what: "voltage above high level",
                value: f64::from(v),
                min: f64::from(low),
                max: f64::from(high),
            });
        }

        let scaled: f64 = f64::from((v - low) / span);
        codes.push((-32768.0 + scaled * 65535.0).round() as i16);
    }

    Ok(codes)
}

/// Serialize samples little-endian, independent of host byte order.
pub fn to_le_bytes(samples: &[i16]) -> Vec<u8> {
    let mut bytes: Vec<u8> = vec![0u8; samples.len() * 2];
    LittleEndian::write_i16_into(samples, &mut bytes);
    bytes
}
