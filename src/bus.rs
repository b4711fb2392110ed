
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Resource pattern matching every instrument visible on the bus.
pub const ALL_INSTRUMENTS: &str = "?*::INSTR";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// One open connection to an instrument.  Implemented by the transport backend,
/// consumed by the drivers in this crate.  Command/response framing on a session
/// is not interleavable, so callers must serialize access; `ScpiLink` does this
/// with a per-instance lock.
pub trait Session: Send {
    fn write_line(&mut self, line: &str) -> Result<()>;
    fn query_line(&mut self, line: &str) -> Result<String>;

    /// One raw read of at most `max_len` bytes.
    fn read_raw(&mut self, max_len: usize) -> Result<Vec<u8>>;

    /// One raw write, blocking until accepted or `timeout` elapses.
    fn write_raw(&mut self, data: &[u8], timeout: Duration) -> Result<()>;

    fn set_timeout(&mut self, timeout: Duration) -> Result<()>;
}

/// The bus-level half of the transport port.  `enumerate` reports a missing
/// backend as `Error::BackendMissing`; any other enumeration failure means
/// "nothing usable found" and discovery treats it as an empty bus.
pub trait ResourceManager {
    fn enumerate(&mut self, pattern: &str) -> Result<Vec<String>>;
    fn open(&mut self, resource: &str) -> Result<Box<dyn Session>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub manufacturer: String,
    pub model: String,
    pub serial_num: String,
    pub fw_version: String,
}

impl Identity {
    /// Parse a `*IDN?` response.  The line is always
    /// `manufacturer,model,serial[,extra...]`; fewer than three fields is a
    /// protocol violation.
    pub fn parse(line: &str) -> Result<Self> {
        let trimmed: &str = line.trim_end();
        let fields: Vec<&str> = trimmed.split(',').collect();
        if fields.len() < 3 {
            return Err(Error::Protocol(format!(
                "identification response has {} fields, expected at least 3: {:?}",
                fields.len(),
                trimmed
            )));
        }

        Ok(Identity {
            manufacturer: fields[0].to_owned(),
            model: fields[1].to_owned(),
            serial_num: fields[2].to_owned(),
            fw_version: if fields.len() > 3 { fields[3..].join(",") } else { String::new() },
        })
    }

    pub fn identification_string(&self) -> String {
        format!("{},{},{}", self.manufacturer, self.model, self.serial_num)
    }
}

/// Shared session helper every driver is composed from.  Owns the session
/// behind a lock scoped to this instance, so two threads sharing a device
/// cannot interleave command/response pairs, and two separate instruments
/// never contend with each other.
pub struct ScpiLink {
    resource: String,
    tx_throttle: Option<Duration>,
    session: Mutex<Box<dyn Session>>,
}

impl ScpiLink {
    pub fn new(session: Box<dyn Session>, resource: &str) -> Self {
        ScpiLink {
            resource: resource.to_owned(),
            tx_throttle: None,
            session: Mutex::new(session),
        }
    }

    pub fn open(rm: &mut dyn ResourceManager, resource: &str) -> Result<Self> {
        let session: Box<dyn Session> = rm.open(resource)?;
        Ok(Self::new(session, resource))
    }

    /// Delay every transmission by `interval`.  Some instruments drop commands
    /// arriving back-to-back.
    pub fn throttled(mut self, interval: Duration) -> Self {
        self.tx_throttle = Some(interval);
        self
    }

    pub fn set_throttle(&mut self, interval: Option<Duration>) {
        self.tx_throttle = interval;
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Take the session lock for a multi-command exchange that must not be
    /// interleaved, e.g. a paginated waveform transfer.
    pub fn session(&self) -> MutexGuard<'_, Box<dyn Session>> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn write(&self, cmd: &str) -> Result<()> {
        self.pause();
        self.session().write_line(cmd)
    }

    pub fn ask(&self, cmd: &str) -> Result<String> {
        self.pause();
        self.session().query_line(cmd)
    }

    pub fn write_raw(&self, data: &[u8], timeout: Duration) -> Result<()> {
        self.pause();
        self.session().write_raw(data, timeout)
    }

    pub fn set_timeout(&self, timeout: Duration) -> Result<()> {
        self.session().set_timeout(timeout)
    }

    pub fn identify(&self) -> Result<Identity> {
        Identity::parse(&self.ask("*IDN?")?)
    }

    fn pause(&self) {
        if let Some(interval) = self.tx_throttle {
            thread::sleep(interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Identity;
    use crate::error::Error;

    #[test]
    fn identity_with_four_fields() {
        let id = Identity::parse("RIGOL TECHNOLOGIES,DS1104Z,DS1ZA000000001,00.04.04.SP4\n").unwrap();
        assert_eq!(id.manufacturer, "RIGOL TECHNOLOGIES");
        assert_eq!(id.model, "DS1104Z");
        assert_eq!(id.serial_num, "DS1ZA000000001");
        assert_eq!(id.fw_version, "00.04.04.SP4");
    }

    #[test]
    fn identity_with_three_fields_has_empty_firmware() {
        let id = Identity::parse("Siglent,SDG2042X,SDG2XCAX00001").unwrap();
        assert_eq!(id.fw_version, "");
    }

    #[test]
    fn identity_with_two_fields_is_a_protocol_violation() {
        match Identity::parse("RIGOL,DS1104Z") {
            Err(Error::Protocol(_)) => {}
            other => panic!("expected a protocol error, got {:?}", other),
        }
    }

    #[test]
    fn identification_string_joins_the_first_three_fields() {
        let id = Identity::parse("A,B,C,D,E").unwrap();
        assert_eq!(id.identification_string(), "A,B,C");
    }

    #[test]
    fn extra_fields_are_kept_in_firmware() {
        let id = Identity::parse("A,B,C,D,E").unwrap();
        assert_eq!(id.fw_version, "D,E");
    }
}
