
use std::time::Duration;

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use crate::bus::{Identity, ResourceManager, ScpiLink, Session};
use crate::devices::{FunctionGenerator, Instrument};
use crate::error::{Error, Result};
use crate::params::{self, BasicWaveform, Wavetype};
use crate::wave;

lazy_static! {
	static ref OUTP_RE: Regex  = Regex::new("C[12]:OUTP (ON|OFF),LOAD,([^,]+),PLRT,([^,\\s]+)").unwrap();
	static ref SRATE_RE: Regex = Regex::new("C[12]:SRATE MODE,(DDS|TARB),VALUE,([^,\\s]+)").unwrap();
}

/// This series drops commands that arrive back-to-back, so every
/// transmission is preceded by a short pause.
pub const DEFAULT_TX_THROTTLE: Duration = Duration::from_millis(100);

/// Deadline for the single raw write carrying a full arbitrary waveform.
pub const UPLOAD_TIMEOUT: Duration = Duration::from_secs(10);

pub const MIN_LEVEL_V: f32 = -10.0;
pub const MAX_LEVEL_V: f32 = 10.0;

pub const MIN_ARB_POINTS: usize = 8;
pub const MAX_ARB_POINTS: usize = 8_388_608;

pub struct Sdg2000x {
	link: ScpiLink,
	identity: Identity,
}

fn chan_ok(chan_num: u8) -> Result<()> {
	if chan_num != 1 && chan_num != 2 {
		return Err(Error::Range {
			what: "channel number",
			value: f64::from(chan_num),
			min: 1.0,
			max: 2.0,
		});
	}
	Ok(())
}

fn points_ok(count: usize) -> Result<()> {
	if count < MIN_ARB_POINTS || count > MAX_ARB_POINTS {
		return Err(Error::Range {
			what: "arbitrary waveform point count",
			value: count as f64,
			min: MIN_ARB_POINTS as f64,
			max: MAX_ARB_POINTS as f64,
		});
	}
	Ok(())
}

fn level_ok(what: &'static str, level: f32) -> Result<()> {
	if level < MIN_LEVEL_V || level > MAX_LEVEL_V {
		return Err(Error::Range {
			what,
			value: f64::from(level),
			min: f64::from(MIN_LEVEL_V),
			max: f64::from(MAX_LEVEL_V),
		});
	}
	Ok(())
}

impl Sdg2000x {

	pub fn open(rm: &mut dyn ResourceManager, resource: &str) -> Result<Self> {
		let session: Box<dyn Session> = rm.open(resource)?;
		Self::with_session(session, resource)
	}

	pub fn with_session(session: Box<dyn Session>, resource: &str) -> Result<Self> {
		let link = ScpiLink::new(session, resource).throttled(DEFAULT_TX_THROTTLE);

		let identity: Identity = link.identify()?;
		if !identity.model.starts_with("SDG") {
			return Err(Error::Protocol(format!(
				"{} reports model {:?}, which is not an SDG-series generator",
				resource, identity.model
			)));
		}

		Ok(Sdg2000x { link, identity })
	}

	pub fn set_tx_throttle(&mut self, interval: Option<Duration>) {
		self.link.set_throttle(interval);
	}

	pub fn basic_waveform(&self, chan_num: u8) -> Result<BasicWaveform> {
		chan_ok(chan_num)?;
		let res: String = self.link.ask(&format!("C{}:BSWV?", chan_num))?;
		params::decode_basic_waveform(&res)
	}

	pub fn set_basic_waveform(&self, chan_num: u8, wavetype: Wavetype, freq_hz: f32, amp_v: f32, offset_v: f32, phase_deg: f32) -> Result<()> {
		chan_ok(chan_num)?;
		let cmd: String = format!(
			"C{}:BSWV WVTP,{},FRQ,{:.6},AMP,{:.6}V,OFST,{:.6}V,PHSE,{:.6}",
			chan_num, wavetype.token(), freq_hz, amp_v, offset_v, phase_deg
		);
		self.link.write(&cmd)
	}

	pub fn output(&self, chan_num: u8) -> Result<bool> {
		chan_ok(chan_num)?;
		let res: String = self.link.ask(&format!("C{}:OUTP?", chan_num))?;
		let cap: Captures = OUTP_RE
			.captures(&res)
			.ok_or_else(|| Error::Protocol(format!("unrecognized output state response {:?}", res)))?;

		Ok(cap.get(1).map(|m| m.as_str()) == Some("ON"))
	}

	pub fn set_output(&self, chan_num: u8, on: bool) -> Result<()> {
		chan_ok(chan_num)?;

		if self.output(chan_num)? == on {
			// Already in the commanded state
			return Ok(());
		}
		self.link.write(&format!("C{}:OUTP {}", chan_num, if on { "ON" } else { "OFF" }))
	}

	/// Sample rate in TrueArb mode, where playback rate is explicit instead of
	/// derived from frequency and point count.
	pub fn truarb_sample_rate(&self, chan_num: u8) -> Result<f32> {
		chan_ok(chan_num)?;
		let res: String = self.link.ask(&format!("C{}:SRATE?", chan_num))?;
		let cap: Captures = SRATE_RE
			.captures(&res)
			.ok_or_else(|| Error::Protocol(format!("unrecognized sample rate response {:?}", res)))?;

		let value: &str = cap.get(2).map(|m| m.as_str()).unwrap_or("");
		value
			.trim_end_matches("Sa/s")
			.parse::<f32>()
			.map_err(|_| Error::Parse { field: "sample rate", value: value.to_owned() })
	}

	pub fn set_truarb_sample_rate(&self, chan_num: u8, sa_per_s: f32) -> Result<()> {
		chan_ok(chan_num)?;
		self.link.write(&format!("C{}:SRATE MODE,TARB,VALUE,{:.6},INTER,LINE", chan_num, sa_per_s))
	}

	/// Switch the channel to a stored arbitrary waveform by name.
	pub fn select_arbitrary(&self, chan_num: u8, name: &str) -> Result<()> {
		chan_ok(chan_num)?;
		self.link.write(&format!("C{}:ARWV NAME,{}", chan_num, name))
	}

	/// Upload voltages as an arbitrary waveform.  Samples are rescaled onto
	/// the full signed 16-bit range, with `low_v` mapping to -32768 and
	/// `high_v` to 32767; every sample must lie within those levels and the
	/// levels themselves within the instrument's output range.
	pub fn upload_arbitrary(&self, chan_num: u8, name: &str, voltages: &[f32], sample_rate: f32, low_v: f32, high_v: f32, offset_v: f32, phase_deg: f32) -> Result<()> {
		level_ok("low level", low_v)?;
		level_ok("high level", high_v)?;

		let samples: Vec<i16> = wave::encode_samples(voltages, low_v, high_v)?;
		self.upload_arbitrary_raw(chan_num, name, &samples, sample_rate, high_v - low_v, offset_v, phase_deg)
	}

	/// Upload pre-scaled 16-bit samples as an arbitrary waveform.
	pub fn upload_arbitrary_raw(&self, chan_num: u8, name: &str, samples: &[i16], sample_rate: f32, amp_v: f32, offset_v: f32, phase_deg: f32) -> Result<()> {
		chan_ok(chan_num)?;
		points_ok(samples.len())?;

		let freq_hz: f32 = sample_rate / (samples.len() as f32);
		let preamble: String = format!(
			"C{}:WVDT WVNM,{},FREQ,{:.6},AMPL,{:.6},OFST,{:.6},PHASE,{:.6},WAVEDATA,",
			chan_num, name, freq_hz, amp_v, offset_v, phase_deg
		);

		let payload: Vec<u8> = wave::to_le_bytes(samples);
		let mut message: Vec<u8> = Vec::with_capacity(preamble.len() + payload.len());
		message.extend_from_slice(preamble.as_bytes());
		message.extend_from_slice(&payload);

		// Metadata and sample bytes must arrive as a single write or the
		// instrument rejects the block
		self.link.write_raw(&message, UPLOAD_TIMEOUT)
	}

	pub fn opc(&self) -> Result<bool> {
		Ok(self.link.ask("*OPC?")?.trim_end() == "1")
	}
}

impl Instrument for Sdg2000x {

	fn identity(&self) -> &Identity { &self.identity }

	fn resource(&self) -> &str { self.link.resource() }

}

impl FunctionGenerator for Sdg2000x {

	fn basic_waveform(&self, chan_num: u8) -> Result<BasicWaveform> {
		Sdg2000x::basic_waveform(self, chan_num)
	}

	fn set_basic_waveform(&self, chan_num: u8, wavetype: Wavetype, freq_hz: f32, amp_v: f32, offset_v: f32, phase_deg: f32) -> Result<()> {
		Sdg2000x::set_basic_waveform(self, chan_num, wavetype, freq_hz, amp_v, offset_v, phase_deg)
	}

	fn output(&self, chan_num: u8) -> Result<bool> {
		Sdg2000x::output(self, chan_num)
	}

	fn set_output(&self, chan_num: u8, on: bool) -> Result<()> {
		Sdg2000x::set_output(self, chan_num, on)
	}

}

// Not Yet Implemented
// MDWV		modulation parameters
// SWWV		sweep parameters
// BTWV		burst parameters
// PACP		copy parameters between channels
// SYNC		synchronization output
// HARM		harmonic generation
// CMBN		channel combine
// STL		list stored waveforms
// ROSC		reference clock source
// VOLTPRT	output protection

// Implemented
// *IDN		identification
// *OPC		operation complete
// BSWV		basic wave parameters (order-independent decode)
// OUTP		output state
// SRATE	TrueArb sample rate
// ARWV		select stored arbitrary wave
// WVDT		arbitrary wave upload
