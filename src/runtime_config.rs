// =============================================================================
// Engine Configuration - serde-defaulted settings with atomic save
// =============================================================================
//
// Every tunable parameter of the signal engine lives here: history window,
// batch shape, fetch retry policy, freshness window and file locations.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.  All fields carry a serde default so that a partial or older config
// file still loads.
//
// =============================================================================

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::info;

pub const BIND_ADDR_ENV: &str = "SIGNAL_BIND_ADDR";
pub const CACHE_PATH_ENV: &str = "SIGNAL_CACHE_PATH";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_history_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 9, 1).unwrap_or_default()
}

fn default_batch_size() -> usize {
    50
}

fn default_max_workers() -> usize {
    4
}

fn default_inter_batch_pause_ms() -> u64 {
    2000
}

fn default_progress_every() -> usize {
    100
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_jitter_ms() -> u64 {
    1000
}

fn default_window_start() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 30, 0).unwrap_or_default()
}

fn default_window_end() -> NaiveTime {
    NaiveTime::from_hms_opt(15, 0, 0).unwrap_or_default()
}

fn default_intraday_max_age_secs() -> i64 {
    1800
}

fn default_universe_path() -> PathBuf {
    PathBuf::from("datas/universe.csv")
}

fn default_supplement_path() -> Option<PathBuf> {
    Some(PathBuf::from("datas/supplement.csv"))
}

fn default_cache_path() -> PathBuf {
    PathBuf::from("stock_signals.json")
}

fn default_bind_addr() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

// =============================================================================
// Sections
// =============================================================================

/// Shape of a refresh run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Concurrent fetch+compute tasks within one batch.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    #[serde(default = "default_inter_batch_pause_ms")]
    pub inter_batch_pause_ms: u64,

    /// Log progress every this many processed symbols.
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_workers: default_max_workers(),
            inter_batch_pause_ms: default_inter_batch_pause_ms(),
            progress_every: default_progress_every(),
        }
    }
}

/// Per-symbol fetch retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total fetch attempts, including the first.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound of the uniform jitter added to every delay.
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            jitter_ms: default_jitter_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreshnessConfig {
    #[serde(default = "default_window_start")]
    pub window_start: NaiveTime,

    #[serde(default = "default_window_end")]
    pub window_end: NaiveTime,

    #[serde(default = "default_intraday_max_age_secs")]
    pub intraday_max_age_secs: i64,
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            window_start: default_window_start(),
            window_end: default_window_end(),
            intraday_max_age_secs: default_intraday_max_age_secs(),
        }
    }
}

// =============================================================================
// EngineConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// First date requested from the OHLC source.
    #[serde(default = "default_history_start")]
    pub history_start: NaiveDate,

    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub freshness: FreshnessConfig,

    #[serde(default = "default_universe_path")]
    pub universe_path: PathBuf,

    /// Optional secondary universe merged after the primary one.
    #[serde(default = "default_supplement_path")]
    pub supplement_path: Option<PathBuf>,

    #[serde(default = "default_cache_path")]
    pub cache_path: PathBuf,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_start: default_history_start(),
            batch: BatchConfig::default(),
            retry: RetryConfig::default(),
            freshness: FreshnessConfig::default(),
            universe_path: default_universe_path(),
            supplement_path: default_supplement_path(),
            cache_path: default_cache_path(),
            bind_addr: default_bind_addr(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse engine config from {}", path.display()))?;

        info!(
            path = %path.display(),
            history_start = %config.history_start,
            batch_size = config.batch.batch_size,
            max_workers = config.batch.max_workers,
            "engine config loaded"
        );

        Ok(config)
    }

    /// Persist the configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise engine config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "engine config saved (atomic)");
        Ok(())
    }

    /// Apply `SIGNAL_BIND_ADDR` / `SIGNAL_CACHE_PATH` from the environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var(BIND_ADDR_ENV).ok(),
            std::env::var(CACHE_PATH_ENV).ok(),
        );
    }

    fn apply_overrides(&mut self, bind_addr: Option<String>, cache_path: Option<String>) {
        if let Some(addr) = bind_addr.filter(|s| !s.trim().is_empty()) {
            self.bind_addr = addr.trim().to_string();
        }
        if let Some(path) = cache_path.filter(|s| !s.trim().is_empty()) {
            self.cache_path = PathBuf::from(path.trim());
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.history_start, NaiveDate::from_ymd_opt(2024, 9, 1).unwrap());
        assert_eq!(cfg.batch.batch_size, 50);
        assert_eq!(cfg.batch.max_workers, 4);
        assert_eq!(cfg.batch.inter_batch_pause_ms, 2000);
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.freshness.window_start, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(cfg.freshness.window_end, NaiveTime::from_hms_opt(15, 0, 0).unwrap());
        assert_eq!(cfg.freshness.intraday_max_age_secs, 1800);
        assert_eq!(cfg.cache_path, PathBuf::from("stock_signals.json"));
        assert_eq!(cfg.bind_addr, "127.0.0.1:5000");
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.batch.batch_size, 50);
        assert_eq!(cfg.retry.jitter_ms, 1000);
        assert_eq!(cfg.supplement_path, Some(PathBuf::from("datas/supplement.csv")));
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{
            "history_start": "2025-01-02",
            "batch": { "max_workers": 8 },
            "freshness": { "window_end": "14:57:00" },
            "supplement_path": null
        }"#;
        let cfg: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.history_start, NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
        assert_eq!(cfg.batch.max_workers, 8);
        assert_eq!(cfg.batch.batch_size, 50);
        assert_eq!(cfg.freshness.window_end, NaiveTime::from_hms_opt(14, 57, 0).unwrap());
        assert_eq!(cfg.freshness.window_start, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(cfg.supplement_path, None);
    }

    #[test]
    fn save_then_load() {
        let path = std::env::temp_dir().join(format!("{}_signal_config.json", uuid::Uuid::new_v4()));
        let mut cfg = EngineConfig::default();
        cfg.batch.batch_size = 7;
        cfg.save(&path).unwrap();
        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded.batch.batch_size, 7);
        assert!(!path.with_extension("json.tmp").exists());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn load_missing_file_errors() {
        assert!(EngineConfig::load("/nonexistent/signal_config.json").is_err());
    }

    #[test]
    fn overrides_ignore_blank_values() {
        let mut cfg = EngineConfig::default();
        cfg.apply_overrides(Some("0.0.0.0:8080".into()), Some("  ".into()));
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
        assert_eq!(cfg.cache_path, PathBuf::from("stock_signals.json"));
    }
}
