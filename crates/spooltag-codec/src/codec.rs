//! Spool record layout and codec.
//!
//! Layout (page.index, 16-bit fields low byte first):
//!
//! | field          | location      |
//! |----------------|---------------|
//! | record marker  | 0x04.0 (0x7b) |
//! | format version | 0x04.2        |
//! | SKU            | 0x05 string   |
//! | manufacturer   | 0x0a string   |
//! | type           | 0x0f string   |
//! | color A,B,G,R  | 0x14          |
//! | range A speed  | 0x17.0/0x17.2 |
//! | range A nozzle | 0x18.0/0x18.2 |
//! | range B        | 0x19 / 0x1a   |
//! | range C        | 0x1b / 0x1c   |
//! | bed            | 0x1d.0/0x1d.2 |
//! | diameter/100   | 0x1e.0        |
//! | length         | 0x1e.2        |
//! | weight         | 0x1f.0        |
//! | custom marker  | 0x27.3 (0x4d) |
//!
//! Version 1 records have no speed fields and no manufacturer slot.
//! Only version 2 is ever written.

use crate::catalog;
use crate::memory::TagMemory;
use crate::spec::{Color, PrintRange, RawRecord, SpoolSpec};
use crate::{CodecError, Result, DEFAULT_PAGE_COUNT};

const PAGE_HEADER: usize = 0x04;
const RECORD_MARKER: u8 = 0x7b;
const PAGE_SKU: usize = 0x05;
const PAGE_MANUFACTURER: usize = 0x0a;
const PAGE_TYPE: usize = 0x0f;
const PAGE_COLOR: usize = 0x14;
const PAGE_RANGE_A_SPEED: usize = 0x17;
const PAGE_RANGE_A_NOZZLE: usize = 0x18;
const PAGE_RANGE_B_SPEED: usize = 0x19;
const PAGE_RANGE_B_NOZZLE: usize = 0x1a;
const PAGE_RANGE_C_SPEED: usize = 0x1b;
const PAGE_RANGE_C_NOZZLE: usize = 0x1c;
const PAGE_BED: usize = 0x1d;
const PAGE_DIAMETER_LENGTH: usize = 0x1e;
const PAGE_WEIGHT: usize = 0x1f;
const PAGE_CUSTOM: usize = 0x27;
const CUSTOM_MARKER: u8 = 0x4d;

/// Smallest tag image that holds the whole record.
pub const MIN_PAGE_COUNT: usize = PAGE_CUSTOM + 1;

/// Record layout version, stored at 0x04.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatVersion {
    V1,
    V2,
}

impl FormatVersion {
    pub fn marker(self) -> u8 {
        match self {
            FormatVersion::V1 => 0x64,
            FormatVersion::V2 => 0x65,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            FormatVersion::V1 => 1,
            FormatVersion::V2 => 2,
        }
    }

    fn from_marker(marker: u8) -> Self {
        match marker {
            0x64 => FormatVersion::V1,
            0x65 => FormatVersion::V2,
            other => {
                tracing::debug!(marker = other, "unknown format version, decoding as v2");
                FormatVersion::V2
            }
        }
    }
}

/// Encodes and decodes a spool record over a tag image it owns.
#[derive(Debug, Clone, Default)]
pub struct SpoolCodec {
    memory: TagMemory,
}

impl SpoolCodec {
    pub fn new(memory: TagMemory) -> Self {
        Self { memory }
    }

    /// Encode `spec` into a zeroed image of the default tag size.
    pub fn encode(spec: &SpoolSpec) -> Result<TagMemory> {
        let mut codec = Self::new(TagMemory::new(DEFAULT_PAGE_COUNT));
        codec.set_spool_specs(spec)?;
        Ok(codec.into_memory())
    }

    /// Decode the record held by `memory`.
    pub fn decode(memory: &TagMemory) -> Result<SpoolSpec> {
        Self::new(memory.clone()).get_spool_specs()
    }

    pub fn memory(&self) -> &TagMemory {
        &self.memory
    }

    pub fn into_memory(self) -> TagMemory {
        self.memory
    }

    fn check_size(&self) -> Result<()> {
        let pages = self.memory.page_count();
        if pages < MIN_PAGE_COUNT {
            return Err(CodecError::TooFewPages {
                pages,
                needed: MIN_PAGE_COUNT,
            });
        }
        Ok(())
    }

    /// Write `spec` as a version 2 custom record.
    ///
    /// Absent `range_b`/`range_c` leave their pages as they are.
    pub fn set_spool_specs(&mut self, spec: &SpoolSpec) -> Result<()> {
        self.check_size()?;
        ensure_ascii("type", &spec.material)?;
        ensure_ascii("manufacturer", &spec.manufacturer)?;
        let diameter = encode_diameter(spec.diameter)?;

        let mem = &mut self.memory;
        mem.write_byte(PAGE_HEADER, 0, RECORD_MARKER);
        mem.write_byte(PAGE_CUSTOM, 3, CUSTOM_MARKER);
        mem.write_byte(PAGE_HEADER, 2, FormatVersion::V2.marker());

        mem.write_string(PAGE_SKU, catalog::sku_for(&spec.material));
        mem.write_string(PAGE_MANUFACTURER, &spec.manufacturer);
        mem.write_string(PAGE_TYPE, &spec.material);
        write_color(mem, PAGE_COLOR, spec.color);

        write_range(mem, PAGE_RANGE_A_SPEED, PAGE_RANGE_A_NOZZLE, &spec.range_a);
        if let Some(range) = &spec.range_b {
            write_range(mem, PAGE_RANGE_B_SPEED, PAGE_RANGE_B_NOZZLE, range);
        }
        if let Some(range) = &spec.range_c {
            write_range(mem, PAGE_RANGE_C_SPEED, PAGE_RANGE_C_NOZZLE, range);
        }

        mem.write_u16(PAGE_BED, 0, spec.bed_min);
        mem.write_u16(PAGE_BED, 2, spec.bed_max);
        mem.write_u16(PAGE_DIAMETER_LENGTH, 0, diameter);
        mem.write_u16(PAGE_DIAMETER_LENGTH, 2, spec.length);
        mem.write_u16(PAGE_WEIGHT, 0, spec.weight);
        Ok(())
    }

    /// Read the record back, resolving the type from the SKU.
    ///
    /// All three ranges are always returned; unwritten ones read as zero.
    pub fn get_spool_specs(&self) -> Result<SpoolSpec> {
        self.check_size()?;
        let mem = &self.memory;
        let version = FormatVersion::from_marker(mem.read_byte(PAGE_HEADER, 2));
        let has_speed = version == FormatVersion::V2;

        let sku = mem.read_string(PAGE_SKU);
        let literal_type = mem.read_string(PAGE_TYPE);
        let material = catalog::catalog_type(&sku, &literal_type);
        let manufacturer = match version {
            FormatVersion::V2 => mem.read_string(PAGE_MANUFACTURER),
            FormatVersion::V1 => String::new(),
        };

        Ok(SpoolSpec {
            material,
            manufacturer,
            color: read_color(mem, PAGE_COLOR),
            range_a: read_range(mem, PAGE_RANGE_A_SPEED, PAGE_RANGE_A_NOZZLE, has_speed),
            range_b: Some(read_range(mem, PAGE_RANGE_B_SPEED, PAGE_RANGE_B_NOZZLE, has_speed)),
            range_c: Some(read_range(mem, PAGE_RANGE_C_SPEED, PAGE_RANGE_C_NOZZLE, has_speed)),
            bed_min: mem.read_u16(PAGE_BED, 0),
            bed_max: mem.read_u16(PAGE_BED, 2),
            diameter: f64::from(mem.read_u16(PAGE_DIAMETER_LENGTH, 0)) / 100.0,
            length: mem.read_u16(PAGE_DIAMETER_LENGTH, 2),
            weight: mem.read_u16(PAGE_WEIGHT, 0),
            raw: Some(RawRecord {
                sku,
                material: literal_type,
                is_custom: mem.read_byte(PAGE_CUSTOM, 3) == CUSTOM_MARKER,
                format_version: version.number(),
                has_record_marker: mem.read_byte(PAGE_HEADER, 0) == RECORD_MARKER,
            }),
        })
    }
}

fn ensure_ascii(field: &'static str, value: &str) -> Result<()> {
    if value.is_ascii() {
        Ok(())
    } else {
        Err(CodecError::NonAscii {
            field,
            value: value.to_string(),
        })
    }
}

fn encode_diameter(diameter: f64) -> Result<u16> {
    let hundredths = (diameter * 100.0).round();
    if !hundredths.is_finite() || hundredths < 0.0 || hundredths > f64::from(u16::MAX) {
        return Err(CodecError::DiameterOutOfRange(diameter));
    }
    Ok(hundredths as u16)
}

/// Color bytes are alpha, blue, green, red. Unset colors are not written.
fn write_color(mem: &mut TagMemory, page: usize, color: Color) {
    if let Some([r, g, b]) = color.components() {
        mem.set_page(page, [0xff, b, g, r]);
    }
}

fn read_color(mem: &TagMemory, page: usize) -> Color {
    let [a, b, g, r] = mem.page(page);
    if a == 0 && r == 0 && g == 0 && b == 0 {
        Color::UNSET
    } else {
        Color::rgb(r, g, b)
    }
}

fn write_range(mem: &mut TagMemory, speed_page: usize, nozzle_page: usize, range: &PrintRange) {
    mem.write_u16(speed_page, 0, range.speed_min);
    mem.write_u16(speed_page, 2, range.speed_max);
    mem.write_u16(nozzle_page, 0, range.nozzle_min);
    mem.write_u16(nozzle_page, 2, range.nozzle_max);
}

fn read_range(mem: &TagMemory, speed_page: usize, nozzle_page: usize, has_speed: bool) -> PrintRange {
    let (speed_min, speed_max) = if has_speed {
        (mem.read_u16(speed_page, 0), mem.read_u16(speed_page, 2))
    } else {
        (0, 0)
    };
    PrintRange {
        speed_min,
        speed_max,
        nozzle_min: mem.read_u16(nozzle_page, 0),
        nozzle_max: mem.read_u16(nozzle_page, 2),
    }
}
