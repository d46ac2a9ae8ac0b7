//! Configuration types for spooltag.
//! Parsed from ~/.spooltag/config.toml.

use serde::{Deserialize, Serialize};
use spooltag_transport::ReaderSelection;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpoolTagConfig {
    #[serde(default)]
    pub reader: ReaderSection,
    #[serde(default)]
    pub timing: TimingSection,
    #[serde(default)]
    pub tag: TagSection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Pcsc,
    Simulated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderSection {
    /// Substring of the reader name to prefer over the built-in rules.
    pub preferred: Option<String>,
    /// Each entry lists substrings that must all appear in a reader name.
    #[serde(default = "default_rules")]
    pub rules: Vec<Vec<String>>,
    #[serde(default = "default_backend")]
    pub backend: BackendKind,
}

impl Default for ReaderSection {
    fn default() -> Self {
        Self {
            preferred: None,
            rules: default_rules(),
            backend: default_backend(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingSection {
    #[serde(default = "default_500")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_1000")]
    pub locator_interval_ms: u64,
}

impl Default for TimingSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            locator_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagSection {
    #[serde(default = "default_page_count")]
    pub page_count: usize,
}

impl Default for TagSection {
    fn default() -> Self {
        Self {
            page_count: default_page_count(),
        }
    }
}

// Default value functions
fn default_rules() -> Vec<Vec<String>> {
    ReaderSelection::default_rules()
}
fn default_backend() -> BackendKind {
    BackendKind::Pcsc
}
fn default_500() -> u64 {
    500
}
fn default_1000() -> u64 {
    1000
}
fn default_page_count() -> usize {
    spooltag_codec::DEFAULT_PAGE_COUNT
}

impl SpoolTagConfig {
    /// Load config from file, or use defaults if missing.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: SpoolTagConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn selection(&self) -> ReaderSelection {
        ReaderSelection {
            preferred: self.reader.preferred.clone(),
            rules: self.reader.rules.clone(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.timing.poll_interval_ms)
    }

    pub fn locator_interval(&self) -> Duration {
        Duration::from_millis(self.timing.locator_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = SpoolTagConfig::default();
        assert_eq!(cfg.tag.page_count, 45);
        assert_eq!(cfg.poll_interval(), Duration::from_millis(500));
        assert_eq!(cfg.locator_interval(), Duration::from_secs(1));
        assert_eq!(cfg.reader.backend, BackendKind::Pcsc);
        assert_eq!(cfg.selection(), ReaderSelection::default());
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
[reader]
preferred = "ACR1252"
rules = [["acr122"], ["omnikey", "cl"]]
backend = "simulated"

[timing]
poll_interval_ms = 250
"#;

        let cfg: SpoolTagConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.reader.preferred.as_deref(), Some("ACR1252"));
        assert_eq!(cfg.reader.rules.len(), 2);
        assert_eq!(cfg.reader.rules[1], vec!["omnikey", "cl"]);
        assert_eq!(cfg.reader.backend, BackendKind::Simulated);
        assert_eq!(cfg.timing.poll_interval_ms, 250);
        assert_eq!(cfg.timing.locator_interval_ms, 1000);
        assert_eq!(cfg.tag.page_count, 45);
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = SpoolTagConfig::load_or_default(&dir.path().join("config.toml")).unwrap();
        assert!(cfg.reader.preferred.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[tag]\npage_count = 135\n").unwrap();
        let cfg = SpoolTagConfig::load_or_default(&path).unwrap();
        assert_eq!(cfg.tag.page_count, 135);
    }

    #[test]
    fn test_serialise_default() {
        let cfg = SpoolTagConfig::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        assert!(toml_str.contains("[reader]"));
        assert!(toml_str.contains("poll_interval_ms"));
    }
}
