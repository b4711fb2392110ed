#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use benchvisa::bus::{ResourceManager, Session};
use benchvisa::error::{Error, Result};
use benchvisa::frame;

/// Scripted stand-in for one instrument session.  Canned replies answer line
/// queries; an optional sample memory emulates the oscilloscope's windowed
/// `:WAV:STAR`/`:WAV:STOP`/`:WAV:DATA?` transfer protocol; raw writes are
/// captured for inspection.
pub struct ScriptedSession {
    replies: HashMap<String, String>,
    memory: Vec<u8>,
    page_limit: usize,
    star: usize,
    stop: usize,
    pending: Option<Vec<u8>>,
    pub data_reads: Arc<Mutex<usize>>,
    pub line_writes: Arc<Mutex<Vec<String>>>,
    pub raw_writes: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl ScriptedSession {
    pub fn new(replies: &[(&str, &str)]) -> Self {
        ScriptedSession {
            replies: replies
                .iter()
                .map(|(query, reply)| (query.to_string(), reply.to_string()))
                .collect(),
            memory: Vec::new(),
            page_limit: usize::MAX,
            star: 1,
            stop: 1,
            pending: None,
            data_reads: Arc::new(Mutex::new(0)),
            line_writes: Arc::new(Mutex::new(Vec::new())),
            raw_writes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Load a capture memory and cap how many bytes one `:WAV:DATA?` returns.
    pub fn with_memory(mut self, memory: Vec<u8>, page_limit: usize) -> Self {
        self.memory = memory;
        self.page_limit = page_limit;
        self
    }
}

impl Session for ScriptedSession {
    fn write_line(&mut self, line: &str) -> Result<()> {
        self.line_writes.lock().unwrap().push(line.to_string());

        if let Some(rest) = line.strip_prefix(":WAV:STAR ") {
            self.star = rest.parse().unwrap();
        } else if let Some(rest) = line.strip_prefix(":WAV:STOP ") {
            self.stop = rest.parse().unwrap();
        } else if line == ":WAV:DATA?" {
            // Window is 1-based and inclusive
            let begin: usize = (self.star - 1).min(self.memory.len());
            let end: usize = self.stop.min(self.memory.len());
            let take: usize = end.saturating_sub(begin).min(self.page_limit);
            let page: &[u8] = &self.memory[begin..begin + take];

            self.pending = Some(frame::wrap(page));
            *self.data_reads.lock().unwrap() += 1;
        }
        Ok(())
    }

    fn query_line(&mut self, line: &str) -> Result<String> {
        self.replies
            .get(line)
            .cloned()
            .ok_or_else(|| Error::Protocol(format!("unscripted query {:?}", line)))
    }

    fn read_raw(&mut self, max_len: usize) -> Result<Vec<u8>> {
        let mut framed: Vec<u8> = self
            .pending
            .take()
            .ok_or_else(|| Error::Transport("nothing to read".to_string()))?;
        framed.truncate(max_len);
        Ok(framed)
    }

    fn write_raw(&mut self, data: &[u8], _timeout: Duration) -> Result<()> {
        self.raw_writes.lock().unwrap().push(data.to_vec());
        Ok(())
    }

    fn set_timeout(&mut self, _timeout: Duration) -> Result<()> {
        Ok(())
    }
}

/// Scripted resource manager.  Each resource either answers `*IDN?` with the
/// given line or fails to open.
pub struct MockBus {
    pub backend_missing: bool,
    pub enumerate_fails: bool,
    pub resources: Vec<(String, Option<String>)>,
}

impl MockBus {
    pub fn new(resources: &[(&str, Option<&str>)]) -> Self {
        MockBus {
            backend_missing: false,
            enumerate_fails: false,
            resources: resources
                .iter()
                .map(|(resource, idn)| (resource.to_string(), idn.map(|s| s.to_string())))
                .collect(),
        }
    }
}

impl ResourceManager for MockBus {
    fn enumerate(&mut self, _pattern: &str) -> Result<Vec<String>> {
        if self.backend_missing {
            return Err(Error::BackendMissing(
                "no VISA implementation installed".to_string(),
            ));
        }
        if self.enumerate_fails {
            return Err(Error::Transport("VI_ERROR_RSRC_NFOUND".to_string()));
        }
        Ok(self.resources.iter().map(|(resource, _)| resource.clone()).collect())
    }

    fn open(&mut self, resource: &str) -> Result<Box<dyn Session>> {
        let entry = self
            .resources
            .iter()
            .find(|(known, _)| known == resource)
            .ok_or_else(|| Error::Transport(format!("unknown resource {}", resource)))?;

        match &entry.1 {
            Some(idn) => Ok(Box::new(ScriptedSession::new(&[("*IDN?", idn.as_str())]))),
            None => Err(Error::Transport(format!("unable to open {}", resource))),
        }
    }
}

pub const SCOPE_IDN: &str = "RIGOL TECHNOLOGIES,DS1104Z,DS1ZA170000001,00.04.04.SP4";
pub const GEN_IDN: &str = "Siglent Technologies,SDG2042X,SDG2XCAX1R0001,2.01.01.35R3B2";
