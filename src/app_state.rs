// =============================================================================
// Central Application State - MACD Signal Engine
// =============================================================================
//
// Ties configuration, the signal cache, the batch orchestrator and the
// universe source together. Shared across request handlers via
// `Arc<AppState<S>>`.
//
// Thread safety:
//   - `SignalCache` owns the current set and the refresh guard.
//   - parking_lot::RwLock for the small last-run summary.
//   - The orchestrator and universe are read-only after construction.
// =============================================================================

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{info, warn};

use crate::batch::{BatchOrchestrator, RefreshReport};
use crate::error::SignalError;
use crate::freshness::FreshnessPolicy;
use crate::indicators::IndicatorFrame;
use crate::market_data::{validate_symbol, OhlcSource, UniverseSource};
use crate::runtime_config::EngineConfig;
use crate::signal_cache::SignalCache;
use crate::signals::SignalSet;
use crate::types::{PriceSeries, UniverseEntry};

// =============================================================================
// Run summary
// =============================================================================

/// Counters of the last completed refresh run, for the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub attempted: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub rejected: usize,
    pub elapsed_secs: f64,
    pub published: bool,
}

impl RunSummary {
    fn from_report(report: &RefreshReport, published: bool) -> Self {
        Self {
            run_id: report.run_id.to_string(),
            attempted: report.attempted,
            succeeded: report.succeeded,
            skipped: report.skipped,
            failed: report.failed,
            rejected: report.rejected,
            elapsed_secs: report.elapsed.as_secs_f64(),
            published,
        }
    }
}

// =============================================================================
// AppState
// =============================================================================

pub struct AppState<S: OhlcSource> {
    pub config: EngineConfig,
    pub cache: SignalCache,
    pub freshness: FreshnessPolicy,
    orchestrator: BatchOrchestrator<S>,
    universe: Box<dyn UniverseSource>,
    pub last_run: RwLock<Option<RunSummary>>,
    /// Instant when the engine was started. Used for uptime calculations.
    pub start_time: std::time::Instant,
}

impl<S: OhlcSource> AppState<S> {
    pub fn new(
        config: EngineConfig,
        cache: SignalCache,
        source: Arc<S>,
        universe: Box<dyn UniverseSource>,
    ) -> Self {
        let orchestrator = BatchOrchestrator::new(source, &config);
        Self::with_orchestrator(config, cache, orchestrator, universe)
    }

    pub fn with_orchestrator(
        config: EngineConfig,
        cache: SignalCache,
        orchestrator: BatchOrchestrator<S>,
        universe: Box<dyn UniverseSource>,
    ) -> Self {
        Self {
            freshness: FreshnessPolicy::from_config(&config.freshness),
            config,
            cache,
            orchestrator,
            universe,
            last_run: RwLock::new(None),
            start_time: std::time::Instant::now(),
        }
    }

    /// Return the current set, refreshing it first when stale at `now`.
    ///
    /// The refresh guard is held from the staleness check through publish,
    /// so concurrent callers wait for one refresh and then see its result.
    /// On failure the previous set stays in place and the error is returned.
    pub async fn refresh_if_stale(&self, now: NaiveDateTime) -> Result<Arc<SignalSet>> {
        let _guard = self.cache.lock_refresh().await;
        let current = self.cache.current();
        if !self.freshness.is_stale(now, current.update_time) {
            return Ok(current);
        }
        info!(last_refresh = ?current.update_time, now = %now, "Signal set stale, refreshing");
        self.refresh_locked(now).await
    }

    /// Unconditional refresh, still serialised with other refreshes.
    pub async fn force_refresh(&self, now: NaiveDateTime) -> Result<Arc<SignalSet>> {
        let _guard = self.cache.lock_refresh().await;
        self.refresh_locked(now).await
    }

    async fn refresh_locked(&self, now: NaiveDateTime) -> Result<Arc<SignalSet>> {
        let universe = self
            .universe
            .load()
            .context("universe source failed, keeping previous signal set")?;

        let report = self.orchestrator.run(&universe, now.date()).await;

        // A run where every dispatched symbol failed is an upstream outage,
        // not an empty market.
        let outage = report.attempted > 0 && report.failed == report.attempted;
        *self.last_run.write() = Some(RunSummary::from_report(&report, !outage));
        if outage {
            warn!(
                run_id = %report.run_id,
                failed = report.failed,
                "Every symbol failed, keeping previous signal set"
            );
            bail!("refresh failed for all {} symbols", report.failed);
        }

        let set = SignalSet::new(report.snapshots, now);
        if set.is_empty() {
            warn!(run_id = %report.run_id, "Refresh produced no snapshots");
        }
        Ok(self.cache.publish(set).await)
    }

    /// Fetch one symbol and compute its full indicator frame, outside the
    /// refresh cycle. `Ok(None)` when the upstream has no rows for it.
    pub async fn symbol_frame(
        &self,
        code: &str,
        end: NaiveDate,
    ) -> Result<Option<(PriceSeries, IndicatorFrame)>, SignalError> {
        validate_symbol(code)?;
        let Some(series) = self.orchestrator.fetch_history(code, end).await? else {
            return Ok(None);
        };
        let frame = IndicatorFrame::compute(&series)?;
        Ok(Some((series, frame)))
    }

    /// Universe entry for `code`, named from the current set when known.
    pub fn entry_for(&self, code: &str) -> UniverseEntry {
        let current = self.cache.current();
        let name = current
            .signals
            .iter()
            .find(|s| s.code == code)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| code.to_string());
        UniverseEntry::new(code, name)
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::retry::RetryPolicy;
    use crate::runtime_config::BatchConfig;
    use crate::types::series_from_closes;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        down: AtomicBool,
    }

    impl OhlcSource for CountingSource {
        async fn fetch_daily(
            &self,
            symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Option<PriceSeries>, SignalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.down.load(Ordering::SeqCst) {
                return Err(SignalError::UpstreamUnavailable {
                    symbol: symbol.into(),
                    reason: "503".into(),
                });
            }
            let closes: Vec<f64> = (0..150).map(|i| 30.0 + (i as f64 / 7.0).cos()).collect();
            Ok(Some(series_from_closes(symbol, &closes)))
        }
    }

    struct StaticUniverse(Option<Vec<UniverseEntry>>);

    impl UniverseSource for StaticUniverse {
        fn load(&self) -> Result<Vec<UniverseEntry>> {
            match &self.0 {
                Some(v) => Ok(v.clone()),
                None => bail!("constituent list unavailable"),
            }
        }
    }

    fn state(
        universe: Option<Vec<UniverseEntry>>,
    ) -> (Arc<AppState<CountingSource>>, Arc<CountingSource>) {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            down: AtomicBool::new(false),
        });
        let orchestrator = BatchOrchestrator::with_policy(
            Arc::clone(&source),
            BatchConfig {
                batch_size: 10,
                max_workers: 2,
                inter_batch_pause_ms: 0,
                progress_every: 100,
            },
            RetryPolicy::immediate(1),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        );
        let state = AppState::with_orchestrator(
            EngineConfig::default(),
            SignalCache::in_memory(),
            orchestrator,
            Box::new(StaticUniverse(universe)),
        );
        (Arc::new(state), source)
    }

    fn universe() -> Vec<UniverseEntry> {
        vec![
            UniverseEntry::new("600000", "浦发银行"),
            UniverseEntry::new("000001", "平安银行"),
        ]
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 7, 16)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn first_request_refreshes_then_serves_cached() {
        let (state, source) = state(Some(universe()));
        let set = state.refresh_if_stale(at(10, 0)).await.unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.update_time, Some(at(10, 0)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);

        let again = state.refresh_if_stale(at(10, 20)).await.unwrap();
        assert!(Arc::ptr_eq(&set, &again));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);

        state.refresh_if_stale(at(10, 30)).await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);
        assert_eq!(state.last_run.read().as_ref().unwrap().succeeded, 2);
    }

    #[tokio::test]
    async fn concurrent_requests_trigger_one_refresh() {
        let (state, source) = state(Some(universe()));
        let a = tokio::spawn({
            let s = Arc::clone(&state);
            async move { s.refresh_if_stale(at(11, 0)).await.map(|x| x.len()) }
        });
        let b = tokio::spawn({
            let s = Arc::clone(&state);
            async move { s.refresh_if_stale(at(11, 0)).await.map(|x| x.len()) }
        });
        assert_eq!(a.await.unwrap().unwrap(), 2);
        assert_eq!(b.await.unwrap().unwrap(), 2);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn universe_failure_keeps_previous_set() {
        let (state, _) = state(None);
        let previous = SignalSet::new(Vec::new(), at(9, 0));
        state.cache.publish(previous.clone()).await;

        assert!(state.refresh_if_stale(at(16, 0)).await.is_ok());
        assert!(state.force_refresh(at(16, 0)).await.is_err());
        assert_eq!(*state.cache.current(), previous);
    }

    #[tokio::test]
    async fn total_outage_keeps_previous_set() {
        let (state, source) = state(Some(universe()));
        let first = state.refresh_if_stale(at(10, 0)).await.unwrap();

        source.down.store(true, Ordering::SeqCst);
        assert!(state.force_refresh(at(14, 0)).await.is_err());
        assert!(Arc::ptr_eq(&first, &state.cache.current()));
        assert!(!state.last_run.read().as_ref().unwrap().published);
    }

    #[tokio::test]
    async fn symbol_frame_validates_and_computes() {
        let (state, source) = state(Some(universe()));
        let day = NaiveDate::from_ymd_opt(2025, 7, 16).unwrap();

        let err = state.symbol_frame("60000A", day).await.unwrap_err();
        assert!(matches!(err, SignalError::MalformedUniverseEntry { .. }));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);

        let (series, frame) = state.symbol_frame("600000", day).await.unwrap().unwrap();
        assert_eq!(series.len(), 150);
        assert_eq!(frame.len(), 150);
        assert_eq!(state.entry_for("600000").name, "600000");

        state.refresh_if_stale(at(10, 0)).await.unwrap();
        assert_eq!(state.entry_for("600000").name, "浦发银行");
    }
}
