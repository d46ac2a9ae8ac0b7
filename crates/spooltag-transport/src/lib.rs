//! Spooltag transport -- card access for NTAG spool tags over PC/SC.
//!
//! Page reads and writes use the reader's pseudo-APDUs (`FF B0` read
//! binary, `FF D6` update binary), 4 bytes per page, status `90 00` on
//! success. Reader discovery runs as a background tick; card presence is
//! a cancellable blocking wait.

pub mod apdu;
pub mod backend;
pub mod locator;
pub mod pcsc_backend;
pub mod poll;
pub mod simulated;
pub mod transport;

use std::time::Duration;

pub use apdu::{ApduCommand, ApduResponse};
pub use backend::{CardBackend, CardConnection};
pub use locator::{run_locator_loop, select_reader, ReaderLocator, ReaderSelection};
pub use pcsc_backend::PcscBackend;
pub use poll::{PollLoop, PollState};
pub use simulated::SimulatedBackend;
pub use transport::{is_protected_page, read_all, read_page, write_all, write_page};

/// Interval between connection attempts while waiting for a card.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Interval between reader re-selection ticks.
pub const LOCATOR_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("no supported reader attached")]
    NoReader,
    #[error("wait for card cancelled")]
    Cancelled,
    #[error("no card present")]
    NoCard,
    #[error("reader {0:?} is not attached")]
    ReaderUnavailable(String),
    #[error("page {page:#04x}: status {sw1:02x} {sw2:02x}")]
    Status { page: usize, sw1: u8, sw2: u8 },
    #[error("page {page:#04x}: short response ({len} bytes)")]
    ShortResponse { page: usize, len: usize },
    #[error("page {0} is not addressable")]
    PageOutOfRange(usize),
    #[error("pcsc error: {0}")]
    Pcsc(#[from] pcsc::Error),
    #[error("lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, TransportError>;
