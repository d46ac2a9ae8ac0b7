//! Reader discovery -- picks the active reader among those attached.
//!
//! Selection order:
//!   1. preferred-name filter (case-insensitive substring), if configured
//!   2. rule-sets in order; a reader matches a rule-set when its name
//!      contains every substring of it
//!   3. nothing
//!
//! A background loop re-evaluates the selection every tick so readers can
//! be plugged and unplugged while the process runs.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::broadcast;

use crate::backend::CardBackend;
use crate::Result;

/// Preference and fallback rules for choosing a reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderSelection {
    pub preferred: Option<String>,
    pub rules: Vec<Vec<String>>,
}

impl ReaderSelection {
    /// ACR122U, and the PICC slot of the ACR1252U (its SAM slot is listed
    /// as a separate reader and cannot talk to tags).
    pub fn default_rules() -> Vec<Vec<String>> {
        vec![
            vec!["acr122".into()],
            vec!["acr1252".into(), "picc".into()],
        ]
    }
}

impl Default for ReaderSelection {
    fn default() -> Self {
        Self {
            preferred: None,
            rules: Self::default_rules(),
        }
    }
}

/// Choose the active reader from `attached`, in enumeration order.
pub fn select_reader(attached: &[String], selection: &ReaderSelection) -> Option<String> {
    let lowered: Vec<String> = attached.iter().map(|n| n.to_lowercase()).collect();

    if let Some(preferred) = selection.preferred.as_deref().filter(|p| !p.is_empty()) {
        let needle = preferred.to_lowercase();
        if let Some(i) = lowered.iter().position(|n| n.contains(&needle)) {
            return Some(attached[i].clone());
        }
    }

    for rule in &selection.rules {
        let parts: Vec<String> = rule.iter().map(|p| p.to_lowercase()).collect();
        if let Some(i) = lowered
            .iter()
            .position(|n| parts.iter().all(|p| n.contains(p.as_str())))
        {
            return Some(attached[i].clone());
        }
    }
    None
}

/// Tracks the currently selected reader.
pub struct ReaderLocator {
    backend: Arc<dyn CardBackend>,
    selection: RwLock<ReaderSelection>,
    current: RwLock<Option<String>>,
}

impl ReaderLocator {
    /// Create a locator and run the first selection immediately.
    pub fn new(backend: Arc<dyn CardBackend>, selection: ReaderSelection) -> Self {
        let locator = Self {
            backend,
            selection: RwLock::new(selection),
            current: RwLock::new(None),
        };
        locator.refresh();
        locator
    }

    pub fn backend(&self) -> &Arc<dyn CardBackend> {
        &self.backend
    }

    /// Name of the selected reader, if any.
    pub fn current(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_connected(&self) -> bool {
        self.current().is_some()
    }

    pub fn selection(&self) -> ReaderSelection {
        self.selection
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the preferred-name filter. Takes effect on the next refresh.
    pub fn set_preferred(&self, preferred: Option<String>) {
        self.selection
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .preferred = preferred;
    }

    pub fn attached_readers(&self) -> Result<Vec<String>> {
        self.backend.list_readers()
    }

    /// Re-derive the selected reader from the attached set.
    ///
    /// The stored selection only changes when the computed name differs.
    pub fn refresh(&self) -> Option<String> {
        let attached = match self.backend.list_readers() {
            Ok(names) => names,
            Err(e) => {
                tracing::debug!(error = %e, "reader enumeration failed, treating as none attached");
                Vec::new()
            }
        };
        let selected = select_reader(&attached, &self.selection());

        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if *current != selected {
            match &selected {
                Some(reader) => tracing::info!(reader = %reader, "reader selected"),
                None => tracing::info!(
                    previous = current.as_deref().unwrap_or(""),
                    "reader lost"
                ),
            }
            *current = selected.clone();
        }
        selected
    }
}

/// Re-run reader selection every `interval` until shutdown.
pub async fn run_locator_loop(
    locator: Arc<ReaderLocator>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                let l = locator.clone();
                if let Err(e) = tokio::task::spawn_blocking(move || l.refresh()).await {
                    tracing::warn!("locator: refresh task failed: {e}");
                }
            }
            _ = shutdown.recv() => {
                tracing::debug!("locator loop shutting down");
                break;
            }
        }
    }
}
