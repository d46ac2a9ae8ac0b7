//! Spooltag codec -- tag memory model and filament spool record layout.
//!
//! NTAG-style tags: 45 pages of 4 bytes. The spool record lives in pages
//! 0x04-0x27; pages 0-3 and the last five pages belong to the tag itself
//! (UID, lock bytes, configuration) and are never written.

pub mod catalog;
pub mod codec;
pub mod memory;
pub mod spec;

pub use catalog::{available_filament_types, preset, FilamentType, CATALOG};
pub use codec::{FormatVersion, SpoolCodec};
pub use memory::TagMemory;
pub use spec::{Color, PrintRange, RawRecord, SpoolSpec};

/// Bytes per tag page.
pub const PAGE_SIZE: usize = 4;

/// Page count of the tags used on filament spools (NTAG213).
pub const DEFAULT_PAGE_COUNT: usize = 0x2d;

/// Longest string stored in a record string slot.
pub const MAX_STRING_LEN: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("tag memory too small: {pages} pages, layout needs {needed}")]
    TooFewPages { pages: usize, needed: usize },
    #[error("field {field} is not ASCII: {value:?}")]
    NonAscii { field: &'static str, value: String },
    #[error("invalid color {0:?}: expected #rrggbb")]
    InvalidColor(String),
    #[error("diameter {0} mm does not fit the tag encoding")]
    DiameterOutOfRange(f64),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CodecError>;
