// =============================================================================
// Signal Cache - current SignalSet plus its refresh guard
// =============================================================================
//
// Readers take a cheap `Arc` clone of the current set under a short
// `parking_lot::RwLock` read. A refresh builds a complete new set and swaps
// the `Arc` wholesale, so readers never observe a half-written set.
//
// The `tokio::sync::Mutex` refresh guard is held across the whole
// check-stale → refresh → publish sequence, so overlapping requests trigger
// at most one refresh.
//
// On-disk shape:
//
//   {"signals": [ {code, name, date, close, signals: {...}}, ... ],
//    "update_time": "YYYY-MM-DD HH:MM:SS"}
//
// Writes are atomic (write `.tmp`, then rename) and run on the blocking pool.
// =============================================================================

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use parking_lot::RwLock;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{error, info, warn};

use crate::signals::SignalSet;

/// Read a persisted signal set.
pub fn load_signal_set(path: impl AsRef<Path>) -> Result<SignalSet> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read signal cache from {}", path.display()))?;
    let set: SignalSet = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse signal cache from {}", path.display()))?;
    Ok(set)
}

/// Persist `set` to `path` atomically.
pub fn save_signal_set(path: impl AsRef<Path>, set: &SignalSet) -> Result<()> {
    let path = path.as_ref();
    let content =
        serde_json::to_string_pretty(set).context("failed to serialise signal set to JSON")?;

    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, &content)
        .with_context(|| format!("failed to write tmp signal cache to {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("failed to rename tmp signal cache to {}", path.display()))?;
    Ok(())
}

pub struct SignalCache {
    current: RwLock<Arc<SignalSet>>,
    refresh_guard: Mutex<()>,
    path: Option<PathBuf>,
}

impl SignalCache {
    pub fn new(initial: SignalSet, path: Option<PathBuf>) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
            refresh_guard: Mutex::new(()),
            path,
        }
    }

    /// Non-persistent cache starting empty.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::new(SignalSet::default(), None)
    }

    /// Cache backed by `path`. A missing file starts empty; an unreadable
    /// one is logged and also starts empty.
    pub fn load_or_empty(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let initial = if !path.exists() {
            warn!(path = %path.display(), "No persisted signal cache, starting empty");
            SignalSet::default()
        } else {
            match load_signal_set(&path) {
                Ok(set) => {
                    info!(
                        path = %path.display(),
                        signals = set.len(),
                        update_time = ?set.update_time,
                        "Signal cache loaded"
                    );
                    set
                }
                Err(e) => {
                    error!(error = %e, "Failed to load signal cache, starting empty");
                    SignalSet::default()
                }
            }
        };
        Self::new(initial, Some(path))
    }

    pub fn current(&self) -> Arc<SignalSet> {
        self.current.read().clone()
    }

    pub fn last_refresh(&self) -> Option<NaiveDateTime> {
        self.current.read().update_time
    }

    /// Serialise refreshes. Hold the guard from the staleness check through
    /// `publish`.
    pub async fn lock_refresh(&self) -> MutexGuard<'_, ()> {
        self.refresh_guard.lock().await
    }

    /// Swap in `set` and persist it. A persistence failure is logged; the
    /// in-memory set is still replaced.
    pub async fn publish(&self, set: SignalSet) -> Arc<SignalSet> {
        let set = Arc::new(set);
        *self.current.write() = Arc::clone(&set);

        if let Some(path) = self.path.clone() {
            let to_save = Arc::clone(&set);
            let saved = tokio::task::spawn_blocking(move || {
                save_signal_set(&path, &to_save).map(|()| path)
            })
            .await;
            match saved {
                Ok(Ok(path)) => {
                    info!(path = %path.display(), signals = set.len(), "Signal cache saved (atomic)")
                }
                Ok(Err(e)) => error!(error = %e, "Failed to persist signal cache"),
                Err(e) => error!(error = %e, "Signal cache writer task failed"),
            }
        }
        set
    }
}
