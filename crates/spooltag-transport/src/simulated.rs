//! In-process reader and tag, for running without hardware and for tests.
//!
//! Readers can be attached and detached, a tag image can be placed on or
//! taken off the reader, and individual page reads/writes can be made to
//! fail with a non-success status word.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use spooltag_codec::TagMemory;

use crate::apdu::{ApduCommand, ApduResponse, SW_FAILURE};
use crate::backend::{CardBackend, CardConnection};
use crate::{Result, TransportError};

#[derive(Debug, Default)]
struct SimState {
    readers: Vec<String>,
    tag: Option<TagMemory>,
    failing_reads: HashSet<u8>,
    failing_writes: HashSet<u8>,
    written_pages: Vec<u8>,
    connect_attempts: usize,
    open_sessions: usize,
}

/// Shared handle to a simulated reader setup. Clones see the same state.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBackend {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend with one reader attached and no tag.
    pub fn with_reader(name: &str) -> Self {
        let backend = Self::new();
        backend.attach_reader(name);
        backend
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn attach_reader(&self, name: &str) {
        let mut state = self.state();
        if !state.readers.iter().any(|r| r == name) {
            state.readers.push(name.to_string());
        }
    }

    pub fn detach_reader(&self, name: &str) {
        self.state().readers.retain(|r| r != name);
    }

    pub fn present_tag(&self, memory: TagMemory) {
        self.state().tag = Some(memory);
    }

    pub fn remove_tag(&self) -> Option<TagMemory> {
        self.state().tag.take()
    }

    /// Current contents of the tag on the reader.
    pub fn tag(&self) -> Option<TagMemory> {
        self.state().tag.clone()
    }

    pub fn fail_read_at(&self, page: u8) {
        self.state().failing_reads.insert(page);
    }

    pub fn fail_write_at(&self, page: u8) {
        self.state().failing_writes.insert(page);
    }

    /// Pages that received a write command, in order.
    pub fn written_pages(&self) -> Vec<u8> {
        self.state().written_pages.clone()
    }

    pub fn connect_attempts(&self) -> usize {
        self.state().connect_attempts
    }

    pub fn open_sessions(&self) -> usize {
        self.state().open_sessions
    }
}

impl CardBackend for SimulatedBackend {
    fn list_readers(&self) -> Result<Vec<String>> {
        Ok(self.state().readers.clone())
    }

    fn connect(&self, reader: &str) -> Result<Box<dyn CardConnection>> {
        let mut state = self.state();
        state.connect_attempts += 1;
        if !state.readers.iter().any(|r| r == reader) {
            return Err(TransportError::ReaderUnavailable(reader.to_string()));
        }
        if state.tag.is_none() {
            return Err(TransportError::NoCard);
        }
        state.open_sessions += 1;
        Ok(Box::new(SimConnection {
            backend: self.clone(),
        }))
    }
}

struct SimConnection {
    backend: SimulatedBackend,
}

impl SimConnection {
    fn execute(&self, command: &[u8]) -> ApduResponse {
        let mut state = self.backend.state();
        let Some(cmd) = ApduCommand::decode(command) else {
            return ApduResponse::status([0x6d, 0x00]);
        };
        match cmd {
            ApduCommand::ReadPage { page } => {
                if state.failing_reads.contains(&page) {
                    return ApduResponse::status(SW_FAILURE);
                }
                match state.tag.as_ref() {
                    Some(tag) if usize::from(page) < tag.page_count() => {
                        ApduResponse::success(&tag.page(usize::from(page)))
                    }
                    _ => ApduResponse::status(SW_FAILURE),
                }
            }
            ApduCommand::WritePage { page, data } => {
                if state.failing_writes.contains(&page) {
                    return ApduResponse::status(SW_FAILURE);
                }
                let written = match state.tag.as_mut() {
                    Some(tag) if usize::from(page) < tag.page_count() => {
                        tag.set_page(usize::from(page), data);
                        true
                    }
                    _ => false,
                };
                if written {
                    state.written_pages.push(page);
                    ApduResponse::success(&[])
                } else {
                    ApduResponse::status(SW_FAILURE)
                }
            }
        }
    }
}

impl CardConnection for SimConnection {
    fn transmit(&mut self, command: &[u8]) -> Result<Vec<u8>> {
        Ok(self.execute(command).to_raw())
    }
}

impl Drop for SimConnection {
    fn drop(&mut self) {
        let mut state = self.backend.state();
        state.open_sessions = state.open_sessions.saturating_sub(1);
    }
}
