//! Known filament types, their vendor SKUs and presets.
//!
//! The SKU is what the printer firmware keys on. Decoding resolves the type
//! from the longest known SKU prefix, so "AHPLP..." (PLA+) is not mistaken
//! for "AHPL..." (PLA).

use crate::spec::{PrintRange, SpoolSpec};

/// SKU written when the type is not in the catalog.
pub const DEFAULT_SKU: &str = "AHPLBK-101";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilamentType {
    pub name: &'static str,
    /// SKU written to tags of this type.
    pub sku: &'static str,
    /// Prefix identifying this type in vendor SKUs.
    pub sku_prefix: &'static str,
}

const fn entry(name: &'static str, sku: &'static str, sku_prefix: &'static str) -> FilamentType {
    FilamentType {
        name,
        sku,
        sku_prefix,
    }
}

/// Catalog order is the menu order; the first entry is the fallback type.
pub const CATALOG: &[FilamentType] = &[
    entry("PLA", "AHPLBK-101", "AHPL"),
    entry("PLA+", "AHPLPBK-102", "AHPLP"),
    entry("PLA High Speed", "AHHSBK-102", "AHHS"),
    entry("PLA Matte", "HYGBK-101", "HYG"),
    entry("PLA Silk", "HSCWH-101", "HSC"),
    entry("PETG", "HPEBK-103", "HPE"),
    entry("ASA", "HASBK-101", "HAS"),
    entry("ABS", "HABBK-102", "HAB"),
    entry("TPU", "HTPBK-101", "HTP"),
    entry("PLA Luminous", "HFGBL-101", "HFG"),
];

pub fn available_filament_types() -> Vec<&'static str> {
    CATALOG.iter().map(|t| t.name).collect()
}

pub fn sku_for(material: &str) -> &'static str {
    CATALOG
        .iter()
        .find(|t| t.name == material)
        .map(|t| t.sku)
        .unwrap_or(DEFAULT_SKU)
}

/// Resolve the material type of a tag from its SKU and literal type string.
///
/// The longest prefix in `prefixes` that starts `sku` wins. Without a match
/// the literal type is used, and if that is not one of `types` the first
/// entry of `types` is returned.
pub fn resolve_type<'a, I>(sku: &str, literal: &str, prefixes: I, types: &[&str]) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let by_prefix = prefixes
        .into_iter()
        .filter(|(prefix, _)| sku.starts_with(prefix))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(_, name)| name);

    let candidate = by_prefix.unwrap_or(literal);
    if types.contains(&candidate) {
        return candidate.to_string();
    }

    let fallback = types.first().copied().unwrap_or_default();
    tracing::debug!(
        sku,
        literal,
        fallback,
        "unrecognised filament type, using fallback"
    );
    fallback.to_string()
}

/// Resolve against the built-in catalog.
pub fn catalog_type(sku: &str, literal: &str) -> String {
    let types = available_filament_types();
    resolve_type(
        sku,
        literal,
        CATALOG.iter().map(|t| (t.sku_prefix, t.name)),
        &types,
    )
}

/// Default record for a catalog type.
pub fn preset(material: &str) -> Option<SpoolSpec> {
    let (nozzle_min, nozzle_max, bed_min, bed_max) = match material {
        "PLA" | "PLA+" => (190, 230, 50, 60),
        "PLA High Speed" => (190, 210, 50, 60),
        "PLA Matte" => (210, 230, 50, 60),
        "PLA Silk" => (215, 230, 50, 60),
        "PETG" => (220, 260, 70, 90),
        "ASA" => (240, 280, 90, 110),
        "ABS" => (240, 280, 80, 100),
        "TPU" => (210, 250, 30, 60),
        "PLA Luminous" => (190, 230, 35, 45),
        _ => return None,
    };

    let mut spec = SpoolSpec::new(material, PrintRange::nozzle(nozzle_min, nozzle_max));
    spec.bed_min = bed_min;
    spec.bed_max = bed_max;

    if material == "PLA High Speed" {
        spec.range_a = spec.range_a.with_speed(50, 150);
        spec.range_b = Some(PrintRange::nozzle(210, 230).with_speed(150, 300));
        spec.range_c = Some(PrintRange::nozzle(230, 260).with_speed(300, 600));
    }
    Some(spec)
}
