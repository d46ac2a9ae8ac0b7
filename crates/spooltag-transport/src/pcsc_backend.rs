//! PC/SC backend (pcsclite on Linux/macOS, WinSCard on Windows).
//!
//! The context is established lazily and dropped when the resource manager
//! reports it gone, so the next call re-establishes it. On Windows the
//! service stops when the last reader is unplugged.

use std::ffi::CString;
use std::sync::Mutex;

use pcsc::{Context, Protocols, Scope, ShareMode};

use crate::backend::{CardBackend, CardConnection};
use crate::{Result, TransportError};

pub struct PcscBackend {
    context: Mutex<Option<Context>>,
}

impl PcscBackend {
    pub fn new() -> Self {
        Self {
            context: Mutex::new(None),
        }
    }

    fn context(&self) -> Result<Context> {
        let mut guard = self
            .context
            .lock()
            .map_err(|_| TransportError::LockPoisoned)?;
        if let Some(ctx) = guard.as_ref() {
            return Ok(ctx.clone());
        }
        let ctx = Context::establish(Scope::User)?;
        tracing::debug!("pcsc context established");
        *guard = Some(ctx.clone());
        Ok(ctx)
    }

    fn invalidate(&self, err: pcsc::Error) -> TransportError {
        if matches!(
            err,
            pcsc::Error::NoService | pcsc::Error::ServiceStopped | pcsc::Error::InvalidHandle
        ) {
            if let Ok(mut guard) = self.context.lock() {
                *guard = None;
            }
            tracing::debug!(error = %err, "pcsc context dropped");
        }
        err.into()
    }
}

impl Default for PcscBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CardBackend for PcscBackend {
    fn list_readers(&self) -> Result<Vec<String>> {
        let ctx = self.context()?;
        match ctx.list_readers_owned() {
            Ok(names) => Ok(names
                .into_iter()
                .map(|n| n.to_string_lossy().into_owned())
                .collect()),
            Err(pcsc::Error::NoReadersAvailable) => Ok(Vec::new()),
            Err(e) => Err(self.invalidate(e)),
        }
    }

    fn connect(&self, reader: &str) -> Result<Box<dyn CardConnection>> {
        let name = CString::new(reader)
            .map_err(|_| TransportError::ReaderUnavailable(reader.to_string()))?;
        let ctx = self.context()?;
        match ctx.connect(&name, ShareMode::Shared, Protocols::ANY) {
            Ok(card) => Ok(Box::new(PcscConnection { card })),
            Err(pcsc::Error::NoSmartcard) | Err(pcsc::Error::RemovedCard) => {
                Err(TransportError::NoCard)
            }
            Err(pcsc::Error::UnknownReader) | Err(pcsc::Error::ReaderUnavailable) => {
                Err(TransportError::ReaderUnavailable(reader.to_string()))
            }
            Err(e) => Err(self.invalidate(e)),
        }
    }
}

struct PcscConnection {
    card: pcsc::Card,
}

impl CardConnection for PcscConnection {
    fn transmit(&mut self, command: &[u8]) -> Result<Vec<u8>> {
        let mut buf = [0u8; pcsc::MAX_BUFFER_SIZE];
        let response = self.card.transmit(command, &mut buf)?;
        Ok(response.to_vec())
    }
}
