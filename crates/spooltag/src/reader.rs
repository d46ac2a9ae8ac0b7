//! Spool reader facade -- wait for a tag, then read, dump or write it.
//!
//! All operations block the calling thread until a tag is presented or the
//! wait is cancelled. Run them on a worker, not on a UI or request thread.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use spooltag_codec::{CodecError, SpoolCodec, SpoolSpec, TagMemory};
use spooltag_transport::{
    read_all, run_locator_loop, write_all, CardBackend, PollLoop, ReaderLocator, ReaderSelection,
    TransportError,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::SpoolTagConfig;

#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("no supported reader attached")]
    NoReader,
    #[error("wait for tag cancelled")]
    Cancelled,
    #[error("transport error: {0}")]
    Transport(TransportError),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl From<TransportError> for ReaderError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::NoReader => ReaderError::NoReader,
            TransportError::Cancelled => ReaderError::Cancelled,
            other => ReaderError::Transport(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReaderError>;

/// Hex dump of a tag, with its decoded interpretation when available.
#[derive(Debug, Clone, Serialize)]
pub struct RawDump {
    pub uid: Option<String>,
    pub text: String,
}

/// Reader/writer for filament spool tags. Clones share the reader
/// selection and the wait state, so one clone can cancel another's wait.
#[derive(Clone)]
pub struct SpoolReader {
    locator: Arc<ReaderLocator>,
    poll: PollLoop,
    page_count: usize,
}

impl SpoolReader {
    pub fn new(
        backend: Arc<dyn CardBackend>,
        selection: ReaderSelection,
        poll_interval: Duration,
        page_count: usize,
    ) -> Self {
        Self {
            locator: Arc::new(ReaderLocator::new(backend, selection)),
            poll: PollLoop::new(poll_interval),
            page_count,
        }
    }

    pub fn from_config(backend: Arc<dyn CardBackend>, cfg: &SpoolTagConfig) -> Self {
        Self::new(
            backend,
            cfg.selection(),
            cfg.poll_interval(),
            cfg.tag.page_count,
        )
    }

    pub fn locator(&self) -> &Arc<ReaderLocator> {
        &self.locator
    }

    /// Start the background reader re-selection loop on the tokio runtime.
    pub fn spawn_locator(
        &self,
        interval: Duration,
        shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(run_locator_loop(self.locator.clone(), interval, shutdown))
    }

    /// True when a supported reader is attached. Says nothing about tags.
    pub fn get_connection_state(&self) -> bool {
        self.locator.is_connected()
    }

    /// Abort a pending wait for a tag. Safe from any thread.
    pub fn cancel_wait_for_tag(&self) {
        self.poll.cancel();
    }

    pub fn available_filament_types() -> Vec<&'static str> {
        spooltag_codec::available_filament_types()
    }

    fn read_tag(&self) -> Result<TagMemory> {
        let mut conn = self.poll.wait_for_card(&self.locator)?;
        Ok(read_all(conn.as_mut(), self.page_count)?)
    }

    /// Wait for a tag and decode its spool record.
    pub fn read_spool(&self) -> Result<SpoolSpec> {
        let memory = self.read_tag()?;
        let spec = SpoolCodec::decode(&memory)?;
        tracing::info!(
            material = %spec.material,
            custom = spec.is_custom(),
            "spool read"
        );
        Ok(spec)
    }

    /// Wait for a tag and return its hex dump.
    ///
    /// The decoded record is appended when decoding works; a tag that does
    /// not decode still yields the dump.
    pub fn read_spool_raw(&self) -> Result<RawDump> {
        let memory = self.read_tag()?;
        let dump = memory.dump();
        let text = match SpoolCodec::decode(&memory).and_then(|spec| spec.to_json_pretty()) {
            Ok(interpretation) => format!("{dump}\n\n{interpretation}"),
            Err(e) => {
                tracing::debug!(error = %e, "dump without interpretation");
                dump
            }
        };
        Ok(RawDump {
            uid: memory.uid(),
            text,
        })
    }

    /// Encode `spec` and write it to the next tag presented.
    pub fn write_spool(&self, spec: &SpoolSpec) -> Result<()> {
        let mut codec = SpoolCodec::new(TagMemory::new(self.page_count));
        codec.set_spool_specs(spec)?;
        let memory = codec.into_memory();

        let mut conn = self.poll.wait_for_card(&self.locator)?;
        let pages = write_all(conn.as_mut(), &memory, self.page_count)?;
        tracing::info!(material = %spec.material, pages, "spool written");
        Ok(())
    }
}
