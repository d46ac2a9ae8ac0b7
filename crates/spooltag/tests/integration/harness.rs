//! Test harness: a simulated reader plus a `SpoolReader` wired to it.

use std::sync::Arc;
use std::time::Duration;

use spooltag::SpoolReader;
use spooltag_codec::{PrintRange, SpoolSpec, TagMemory, DEFAULT_PAGE_COUNT};
use spooltag_transport::{ReaderSelection, SimulatedBackend};

pub const ACR122: &str = "ACS ACR122U PICC Interface 00 00";
pub const ACR1252_PICC: &str = "ACS ACR1252 1S CL Reader PICC 0";
pub const ACR1252_SAM: &str = "ACS ACR1252 1S CL Reader SAM 0";

pub const POLL: Duration = Duration::from_millis(10);

/// Blank 45-page tag with a manufacturer UID in pages 0 and 1.
pub fn blank_tag() -> TagMemory {
    let mut tag = TagMemory::new(DEFAULT_PAGE_COUNT);
    tag.set_page(0, [0x04, 0xa1, 0xb2, 0x9c]);
    tag.set_page(1, [0x12, 0x34, 0x56, 0x78]);
    tag.set_page(2, [0x7e, 0x48, 0x00, 0x00]);
    tag.set_page(3, [0xe1, 0x10, 0x12, 0x00]);
    for page in DEFAULT_PAGE_COUNT - 5..DEFAULT_PAGE_COUNT {
        tag.set_page(page, [0xee; 4]);
    }
    tag
}

/// The worked example: plain PLA, 200-210 nozzle, 50-60 bed.
pub fn pla_spec() -> SpoolSpec {
    let mut spec = SpoolSpec::new("PLA", PrintRange::nozzle(200, 210));
    spec.bed_min = 50;
    spec.bed_max = 60;
    spec
}

pub struct TestRig {
    pub sim: SimulatedBackend,
    pub reader: SpoolReader,
}

#[allow(dead_code)]
impl TestRig {
    /// One ACR122 reader attached, no tag yet.
    pub fn new() -> Self {
        Self::with_readers(&[ACR122])
    }

    pub fn with_readers(readers: &[&str]) -> Self {
        Self::build(readers, ReaderSelection::default())
    }

    pub fn build(readers: &[&str], selection: ReaderSelection) -> Self {
        let sim = SimulatedBackend::new();
        for name in readers {
            sim.attach_reader(name);
        }
        let reader = SpoolReader::new(Arc::new(sim.clone()), selection, POLL, DEFAULT_PAGE_COUNT);
        Self { sim, reader }
    }

    pub fn with_blank_tag(self) -> Self {
        self.sim.present_tag(blank_tag());
        self
    }

    /// Present `tag` after `delay` from a helper thread.
    pub fn present_later(&self, tag: TagMemory, delay: Duration) -> std::thread::JoinHandle<()> {
        let sim = self.sim.clone();
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            sim.present_tag(tag);
        })
    }
}
