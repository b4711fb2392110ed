
use serde::{Deserialize, Serialize};

use crate::bus::{Identity, ResourceManager, ScpiLink, Session};
use crate::chunked;
use crate::devices::{Instrument, Oscilloscope};
use crate::error::{Error, Result};
use crate::frame;
use crate::wave::Calibration;

/// Most sample points one RAW-mode `:WAV:DATA?` transfer can return in BYTE
/// format on this series.
pub const MAX_CHUNK_POINTS: usize = 250_000;

/// Points in one NORM-mode (screen) transfer.
pub const SCREEN_POINTS: usize = 1200;

// `#` + width digit + nine length digits + trailing newline
const FRAME_OVERHEAD: usize = 12;

pub struct Ds1000z {
	link: ScpiLink,
	identity: Identity,
	chunk_points: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TriggerStatus {
	Triggered,
	Waiting,
	Running,
	Auto,
	Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MemoryDepth {
	Auto,
	Points(usize),
}

fn chan_ok(chan_num: u8) -> Result<()> {
	if chan_num < 1 || chan_num > 4 {
		return Err(Error::Range {
			what: "channel number",
			value: f64::from(chan_num),
			min: 1.0,
			max: 4.0,
		});
	}
	Ok(())
}

impl Ds1000z {

	pub fn open(rm: &mut dyn ResourceManager, resource: &str) -> Result<Self> {
		let session: Box<dyn Session> = rm.open(resource)?;
		Self::with_session(session, resource)
	}

	pub fn with_session(session: Box<dyn Session>, resource: &str) -> Result<Self> {
		let link = ScpiLink::new(session, resource);

		let identity: Identity = link.identify()?;
		if !identity.model.starts_with("DS1") {
			return Err(Error::Protocol(format!(
				"{} reports model {:?}, which is not a DS1000Z-series oscilloscope",
				resource, identity.model
			)));
		}

		Ok(Ds1000z { link, identity, chunk_points: MAX_CHUNK_POINTS })
	}

	/// Lower the per-transfer window for firmware that caps RAW reads below
	/// the series maximum (10k points has been observed on some revisions).
	pub fn set_chunk_points(&mut self, points: usize) {
		self.chunk_points = points;
	}

	// One-liners
	pub fn run(&self) -> Result<()>           { self.link.write(":RUN") }
	pub fn stop(&self) -> Result<()>          { self.link.write(":STOP") }
	pub fn single(&self) -> Result<()>        { self.link.write(":SING") }
	pub fn force_trigger(&self) -> Result<()> { self.link.write(":TFOR") }

	pub fn trigger_status(&self) -> Result<TriggerStatus> {
		let res: String = self.link.ask(":TRIG:STAT?")?;
		match res.trim_end() {
			"TD"   => Ok(TriggerStatus::Triggered),
			"WAIT" => Ok(TriggerStatus::Waiting),
			"RUN"  => Ok(TriggerStatus::Running),
			"AUTO" => Ok(TriggerStatus::Auto),
			"STOP" => Ok(TriggerStatus::Stopped),
			other  => Err(Error::Protocol(format!("unrecognized trigger status {:?}", other))),
		}
	}

	pub fn memory_depth(&self) -> Result<MemoryDepth> {
		let res: String = self.link.ask(":ACQ:MDEP?")?;
		let trimmed: &str = res.trim_end();
		if trimmed == "AUTO" {
			return Ok(MemoryDepth::Auto);
		}

		// Depth can come back in scientific notation on some firmware
		let points: f64 = trimmed
			.parse::<f64>()
			.map_err(|_| Error::Parse { field: "memory depth", value: trimmed.to_owned() })?;
		Ok(MemoryDepth::Points(points as usize))
	}

	pub fn set_memory_depth(&self, depth: MemoryDepth) -> Result<()> {
		match depth {
			MemoryDepth::Auto      => self.link.write(":ACQ:MDEP AUTO"),
			MemoryDepth::Points(n) => self.link.write(&format!(":ACQ:MDEP {}", n)),
		}
	}

	pub fn sample_rate(&self) -> Result<f32> {
		self.ask_f32("sample rate", ":ACQ:SRAT?")
	}

	pub fn time_scale(&self) -> Result<f32> {
		self.ask_f32("time scale", ":TIM:SCAL?")
	}

	pub fn set_time_scale(&self, seconds_per_div: f32) -> Result<()> {
		self.link.write(&format!(":TIM:SCAL {:.9}", seconds_per_div))
	}

	pub fn voltage_scale(&self, chan_num: u8) -> Result<f32> {
		chan_ok(chan_num)?;
		self.ask_f32("voltage scale", &format!(":CHAN{}:SCAL?", chan_num))
	}

	pub fn set_voltage_scale(&self, chan_num: u8, volts_per_div: f32) -> Result<()> {
		chan_ok(chan_num)?;
		self.link.write(&format!(":CHAN{}:SCAL {:.4}", chan_num, volts_per_div))
	}

	pub fn voltage_offset(&self, chan_num: u8) -> Result<f32> {
		chan_ok(chan_num)?;
		self.ask_f32("voltage offset", &format!(":CHAN{}:OFFS?", chan_num))
	}

	pub fn set_voltage_offset(&self, chan_num: u8, volts: f32) -> Result<()> {
		chan_ok(chan_num)?;
		self.link.write(&format!(":CHAN{}:OFFS {:.4}", chan_num, volts))
	}

	pub fn display_enabled(&self, chan_num: u8) -> Result<bool> {
		chan_ok(chan_num)?;
		let res: String = self.link.ask(&format!(":CHAN{}:DISP?", chan_num))?;
		Ok(matches!(res.trim_end(), "1" | "ON"))
	}

	pub fn set_display_enabled(&self, chan_num: u8, on: bool) -> Result<()> {
		chan_ok(chan_num)?;
		self.link.write(&format!(":CHAN{}:DISP {}", chan_num, if on { "ON" } else { "OFF" }))
	}

	/// Scale factors for decoding raw samples from a channel.  Queried fresh
	/// every time since they track the channel settings.
	pub fn calibration(&self, chan_num: u8) -> Result<Calibration> {
		chan_ok(chan_num)?;
		self.link.write(&format!(":WAV:SOUR CHAN{}", chan_num))?;

		Ok(Calibration {
			y_origin:    self.ask_f32("Y origin", ":WAV:YOR?")?,
			y_increment: self.ask_f32("Y increment", ":WAV:YINC?")?,
			y_reference: self.ask_f32("Y reference", ":WAV:YREF?")?,
			x_increment: self.ask_f32("X increment", ":WAV:XINC?")?,
		})
	}

	/// Calibrated voltages for the samples currently on screen.
	pub fn read_screen(&self, chan_num: u8) -> Result<Vec<f32>> {
		chan_ok(chan_num)?;
		let cal: Calibration = self.calibration(chan_num)?;

		let mut session = self.link.session();
		session.write_line(":WAV:MODE NORM")?;
		session.write_line(":WAV:FORM BYTE")?;
		session.write_line(":WAV:STAR 1")?;
		session.write_line(&format!(":WAV:STOP {}", SCREEN_POINTS))?;
		session.write_line(":WAV:DATA?")?;
		let framed: Vec<u8> = session.read_raw(SCREEN_POINTS + FRAME_OVERHEAD)?;

		Ok(cal.decode(frame::strip(&framed)?))
	}

	/// Download the full capture memory as raw sample bytes.
	///
	/// The acquisition must be stopped and the memory depth fixed; a single
	/// transfer cannot return the whole region, so the download pages through
	/// it while holding the session lock so no other command can interleave.
	pub fn read_deep_memory_raw(&self, chan_num: u8) -> Result<Vec<u8>> {
		chan_ok(chan_num)?;

		match self.trigger_status()? {
			TriggerStatus::Stopped => {}
			other => {
				return Err(Error::InvalidState(format!(
					"deep memory is only readable while stopped, not in {:?}",
					other
				)))
			}
		}

		let depth: usize = match self.memory_depth()? {
			MemoryDepth::Points(n) => n,
			MemoryDepth::Auto => {
				return Err(Error::InvalidState(
					"memory depth is AUTO; set a fixed depth before a deep-memory download".to_owned(),
				))
			}
		};

		let chunk: usize = self.chunk_points;
		let mut session = self.link.session();
		session.write_line(&format!(":WAV:SOUR CHAN{}", chan_num))?;
		session.write_line(":WAV:MODE RAW")?;
		session.write_line(":WAV:FORM BYTE")?;

		chunked::read_paged(depth, chunk, |start, stop| {
			session.write_line(&format!(":WAV:STAR {}", start))?;
			session.write_line(&format!(":WAV:STOP {}", stop))?;
			session.write_line(":WAV:DATA?")?;
			let framed: Vec<u8> = session.read_raw(chunk + FRAME_OVERHEAD)?;
			Ok(frame::strip(&framed)?.to_vec())
		})
	}

	/// Download the full capture memory as calibrated voltages.
	pub fn read_deep_memory(&self, chan_num: u8) -> Result<Vec<f32>> {
		let cal: Calibration = self.calibration(chan_num)?;
		let raw: Vec<u8> = self.read_deep_memory_raw(chan_num)?;
		Ok(cal.decode(&raw))
	}

	fn ask_f32(&self, field: &'static str, cmd: &str) -> Result<f32> {
		let res: String = self.link.ask(cmd)?;
		let trimmed: &str = res.trim_end();
		trimmed
			.parse::<f32>()
			.map_err(|_| Error::Parse { field, value: trimmed.to_owned() })
	}
}

impl Instrument for Ds1000z {

	fn identity(&self) -> &Identity { &self.identity }

	fn resource(&self) -> &str { self.link.resource() }

}

impl Oscilloscope for Ds1000z {

	fn run(&self) -> Result<()>  { Ds1000z::run(self) }

	fn stop(&self) -> Result<()> { Ds1000z::stop(self) }

	fn read_screen(&self, chan_num: u8) -> Result<Vec<f32>> {
		Ds1000z::read_screen(self, chan_num)
	}

	fn read_deep_memory(&self, chan_num: u8) -> Result<Vec<f32>> {
		Ds1000z::read_deep_memory(self, chan_num)
	}

}

// TODO: support WORD-format transfers for reading the 12-bit sample path

// Not Yet Implemented
// :ACQ:TYPE		acquisition type (normal/average/peak/hires)
// :ACQ:AVER		average count
// :CHAN<n>:BWL		bandwidth limit
// :CHAN<n>:COUP	channel coupling
// :CHAN<n>:PROB	probe ratio
// :CURS...			cursor measurements
// :MEAS...			automatic measurements
// :TRIG:EDG...		edge trigger configuration
// :TIM:OFFS		timebase offset
// :WAV:PRE?		combined preamble query (individual fields queried instead)

// Implemented
// *IDN?			identification
// :RUN :STOP :SING :TFOR
// :TRIG:STAT?		trigger status
// :ACQ:MDEP		memory depth
// :ACQ:SRAT?		sample rate
// :TIM:SCAL		timebase scale
// :CHAN<n>:SCAL	vertical scale
// :CHAN<n>:OFFS	vertical offset
// :CHAN<n>:DISP	trace display
// :WAV:SOUR :WAV:MODE :WAV:FORM :WAV:STAR :WAV:STOP :WAV:DATA?
// :WAV:YOR? :WAV:YINC? :WAV:YREF? :WAV:XINC?
