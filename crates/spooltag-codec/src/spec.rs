//! Filament spool record types.
//!
//! These are the JSON shapes exchanged with front ends: a spec to write,
//! or a decoded spec plus the raw provenance fields read off the tag.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CodecError;

/// One print-speed tier and the nozzle temperature band that goes with it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintRange {
    #[serde(default)]
    pub speed_min: u16,
    #[serde(default)]
    pub speed_max: u16,
    pub nozzle_min: u16,
    pub nozzle_max: u16,
}

impl PrintRange {
    pub fn nozzle(nozzle_min: u16, nozzle_max: u16) -> Self {
        Self {
            speed_min: 0,
            speed_max: 0,
            nozzle_min,
            nozzle_max,
        }
    }

    pub fn with_speed(mut self, speed_min: u16, speed_max: u16) -> Self {
        self.speed_min = speed_min;
        self.speed_max = speed_max;
        self
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// 24-bit RGB color, or unset.
///
/// Serialized as `"#rrggbb"`, with `""` for unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(Option<[u8; 3]>);

impl Color {
    pub const UNSET: Color = Color(None);

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self(Some([r, g, b]))
    }

    pub fn components(&self) -> Option<[u8; 3]> {
        self.0
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }
}

impl FromStr for Color {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Self::UNSET);
        }
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if digits.len() != 6 {
            return Err(CodecError::InvalidColor(s.to_string()));
        }
        let mut rgb = [0u8; 3];
        hex::decode_to_slice(digits, &mut rgb).map_err(|_| CodecError::InvalidColor(s.to_string()))?;
        Ok(Self(Some(rgb)))
    }
}

impl TryFrom<String> for Color {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some([r, g, b]) => write!(f, "#{r:02x}{g:02x}{b:02x}"),
            None => Ok(()),
        }
    }
}

/// Fields as literally stored on the tag, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub sku: String,
    /// Type string stored on the tag, before SKU resolution.
    #[serde(rename = "type")]
    pub material: String,
    pub is_custom: bool,
    pub format_version: u8,
    pub has_record_marker: bool,
}

/// A filament spool record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpoolSpec {
    #[serde(rename = "type")]
    pub material: String,
    #[serde(default = "default_manufacturer")]
    pub manufacturer: String,
    #[serde(default)]
    pub color: Color,
    pub range_a: PrintRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_b: Option<PrintRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_c: Option<PrintRange>,
    #[serde(default)]
    pub bed_min: u16,
    #[serde(default)]
    pub bed_max: u16,
    /// Filament diameter in mm. Stored on the tag in hundredths.
    #[serde(default = "default_diameter")]
    pub diameter: f64,
    /// Spool length in meters.
    #[serde(default = "default_length")]
    pub length: u16,
    /// Filament weight in grams.
    #[serde(default = "default_weight")]
    pub weight: u16,
    /// Present only on decoded records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<RawRecord>,
}

fn default_manufacturer() -> String {
    "AC".into()
}
fn default_diameter() -> f64 {
    1.75
}
fn default_length() -> u16 {
    330
}
fn default_weight() -> u16 {
    1000
}

impl SpoolSpec {
    /// Minimal spec with the catalog defaults for everything but the type
    /// and the nozzle band.
    pub fn new(material: impl Into<String>, range_a: PrintRange) -> Self {
        Self {
            material: material.into(),
            manufacturer: default_manufacturer(),
            color: Color::UNSET,
            range_a,
            range_b: None,
            range_c: None,
            bed_min: 0,
            bed_max: 0,
            diameter: default_diameter(),
            length: default_length(),
            weight: default_weight(),
            raw: None,
        }
    }

    /// True when the tag carried the custom-record marker.
    pub fn is_custom(&self) -> bool {
        self.raw.as_ref().is_some_and(|r| r.is_custom)
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
