//! Spooltag -- read and write filament spool NFC tags.
//!
//! Library half of the `spooltag` binary: the reader facade, configuration
//! and backend selection, for front ends and integration tests.

pub mod config;
pub mod reader;

use std::path::PathBuf;
use std::sync::Arc;

use spooltag_codec::TagMemory;
use spooltag_transport::{CardBackend, PcscBackend, SimulatedBackend};

pub use config::{BackendKind, SpoolTagConfig};
pub use reader::{RawDump, ReaderError, SpoolReader};

/// Name of the reader exposed by the simulated backend.
pub const SIMULATED_READER: &str = "Simulated ACR122U PICC";

/// Build the card backend named in the config.
///
/// The simulated backend starts with one reader and a blank tag on it.
pub fn open_backend(cfg: &SpoolTagConfig) -> Arc<dyn CardBackend> {
    match cfg.reader.backend {
        BackendKind::Pcsc => Arc::new(PcscBackend::new()),
        BackendKind::Simulated => {
            let sim = SimulatedBackend::with_reader(SIMULATED_READER);
            sim.present_tag(TagMemory::new(cfg.tag.page_count));
            tracing::info!(reader = SIMULATED_READER, "using simulated reader");
            Arc::new(sim)
        }
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs_or_home() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

pub fn dirs_or_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}
