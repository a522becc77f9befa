// =============================================================================
// Batch Orchestrator - universe → snapshots
// =============================================================================
//
// The universe is deduplicated (first occurrence wins), validated, and cut
// into fixed-size batches. Batches run one after another; inside a batch
// every symbol gets its own task, gated by a semaphore of `max_workers`
// permits. Each task returns its own outcome and the orchestrator joins them
// after spawning, so nothing is shared between tasks.
//
// A panicking task surfaces as a `JoinError` and is counted as a
// `Computation` failure for that symbol only. Zero successes is still a valid
// report.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::batch::retry::{fetch_with_retry, RetryPolicy};
use crate::error::SignalError;
use crate::market_data::{validate_symbol, OhlcSource};
use crate::runtime_config::{BatchConfig, EngineConfig};
use crate::signals::{analyze_series, SignalSnapshot};
use crate::types::{PriceSeries, UniverseEntry};

/// Result of one symbol task.
#[derive(Debug)]
enum SymbolOutcome {
    Snapshot(SignalSnapshot),
    /// Upstream returned no rows.
    Empty,
    Skipped(SignalError),
    Failed(SignalError),
}

/// Snapshots of one run plus its counters.
#[derive(Debug, Clone, Default)]
pub struct RefreshReport {
    pub run_id: Uuid,
    /// Unordered.
    pub snapshots: Vec<SignalSnapshot>,
    /// Unique, well-formed symbols that were dispatched.
    pub attempted: usize,
    pub succeeded: usize,
    /// Empty, short or malformed series.
    pub skipped: usize,
    /// Upstream gave up, or computation failed.
    pub failed: usize,
    /// Universe entries rejected by the symbol format check.
    pub rejected: usize,
    pub elapsed: Duration,
}

impl RefreshReport {
    fn record(&mut self, outcome: SymbolOutcome) {
        match outcome {
            SymbolOutcome::Snapshot(s) => {
                self.succeeded += 1;
                self.snapshots.push(s);
            }
            SymbolOutcome::Empty => self.skipped += 1,
            SymbolOutcome::Skipped(e) => {
                debug!(error = %e, kind = e.kind(), "symbol skipped");
                self.skipped += 1;
            }
            SymbolOutcome::Failed(e) => {
                warn!(error = %e, kind = e.kind(), "symbol failed");
                self.failed += 1;
            }
        }
    }

    pub fn failure_rate(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            self.failed as f64 / self.attempted as f64
        }
    }
}

/// Dedup by code (first wins) and drop malformed codes.
fn prepare_universe(universe: &[UniverseEntry]) -> (Vec<UniverseEntry>, usize) {
    let mut seen = HashSet::new();
    let mut rejected = 0;
    let mut out = Vec::with_capacity(universe.len());
    for entry in universe {
        if let Err(e) = validate_symbol(&entry.code) {
            warn!(error = %e, name = %entry.name, "Rejecting universe entry");
            rejected += 1;
            continue;
        }
        if seen.insert(entry.code.clone()) {
            out.push(entry.clone());
        }
    }
    (out, rejected)
}

pub struct BatchOrchestrator<S: OhlcSource> {
    source: Arc<S>,
    batch: BatchConfig,
    retry: RetryPolicy,
    history_start: NaiveDate,
}

impl<S: OhlcSource> BatchOrchestrator<S> {
    pub fn new(source: Arc<S>, config: &EngineConfig) -> Self {
        Self::with_policy(
            source,
            config.batch.clone(),
            RetryPolicy::from_config(&config.retry),
            config.history_start,
        )
    }

    pub fn with_policy(
        source: Arc<S>,
        batch: BatchConfig,
        retry: RetryPolicy,
        history_start: NaiveDate,
    ) -> Self {
        Self {
            source,
            batch,
            retry,
            history_start,
        }
    }

    /// One symbol's history under the run's retry policy.
    pub async fn fetch_history(
        &self,
        symbol: &str,
        end: NaiveDate,
    ) -> Result<Option<PriceSeries>, SignalError> {
        fetch_with_retry(self.source.as_ref(), &self.retry, symbol, self.history_start, end).await
    }

    /// Run the whole universe with histories ending at `end`.
    pub async fn run(&self, universe: &[UniverseEntry], end: NaiveDate) -> RefreshReport {
        let started = Instant::now();
        let run_id = Uuid::new_v4();
        let (entries, rejected) = prepare_universe(universe);
        let total = entries.len();
        let batch_size = self.batch.batch_size.max(1);
        let n_batches = total.div_ceil(batch_size);
        let workers = Arc::new(Semaphore::new(self.batch.max_workers.max(1)));
        let pause = Duration::from_millis(self.batch.inter_batch_pause_ms);

        info!(
            run_id = %run_id,
            symbols = total,
            rejected,
            batches = n_batches,
            workers = self.batch.max_workers,
            "Refresh run started"
        );

        let mut report = RefreshReport {
            run_id,
            attempted: total,
            rejected,
            ..Default::default()
        };
        let mut processed = 0usize;

        for (k, chunk) in entries.chunks(batch_size).enumerate() {
            info!(run_id = %run_id, "batch {}/{} with {} tasks", k + 1, n_batches, chunk.len());

            let mut tasks = JoinSet::new();
            let mut codes = HashMap::with_capacity(chunk.len());
            for entry in chunk {
                let handle = tasks.spawn(process_symbol(
                    Arc::clone(&self.source),
                    Arc::clone(&workers),
                    self.retry.clone(),
                    entry.clone(),
                    self.history_start,
                    end,
                ));
                codes.insert(handle.id(), entry.code.clone());
            }

            while let Some(joined) = tasks.join_next_with_id().await {
                let outcome = match joined {
                    Ok((_, outcome)) => outcome,
                    Err(e) => {
                        let symbol = codes.get(&e.id()).cloned().unwrap_or_default();
                        let reason = if e.is_panic() {
                            "task panicked".to_string()
                        } else {
                            format!("task aborted: {e}")
                        };
                        SymbolOutcome::Failed(SignalError::Computation { symbol, reason })
                    }
                };
                report.record(outcome);
                processed += 1;
                self.log_progress(run_id, processed, total, started);
            }

            if k + 1 < n_batches && !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
        }

        report.elapsed = started.elapsed();
        info!(
            run_id = %run_id,
            attempted = report.attempted,
            succeeded = report.succeeded,
            skipped = report.skipped,
            failed = report.failed,
            failure_rate = format!("{:.3}", report.failure_rate()),
            elapsed_secs = format!("{:.1}", report.elapsed.as_secs_f64()),
            "Refresh run finished"
        );
        report
    }

    fn log_progress(&self, run_id: Uuid, processed: usize, total: usize, started: Instant) {
        let every = self.batch.progress_every.max(1);
        if processed % every != 0 && processed != total {
            return;
        }
        let elapsed = started.elapsed().as_secs_f64();
        let remaining = elapsed / processed as f64 * (total - processed) as f64;
        info!(
            run_id = %run_id,
            processed,
            total,
            pct = format!("{:.1}", processed as f64 * 100.0 / total as f64),
            elapsed_secs = format!("{elapsed:.1}"),
            remaining_secs = format!("{remaining:.1}"),
            "progress"
        );
    }
}

async fn process_symbol<S: OhlcSource>(
    source: Arc<S>,
    workers: Arc<Semaphore>,
    retry: RetryPolicy,
    entry: UniverseEntry,
    start: NaiveDate,
    end: NaiveDate,
) -> SymbolOutcome {
    let Ok(_permit) = workers.acquire_owned().await else {
        return SymbolOutcome::Failed(SignalError::Computation {
            symbol: entry.code,
            reason: "worker pool closed".into(),
        });
    };

    let series = match fetch_with_retry(source.as_ref(), &retry, &entry.code, start, end).await {
        Ok(Some(series)) => series,
        Ok(None) => return SymbolOutcome::Empty,
        Err(e) => return classify_error(e),
    };

    match analyze_series(&entry, &series) {
        Ok(snapshot) => SymbolOutcome::Snapshot(snapshot),
        Err(e) => classify_error(e),
    }
}

fn classify_error(e: SignalError) -> SymbolOutcome {
    if e.is_skip() {
        SymbolOutcome::Skipped(e)
    } else {
        SymbolOutcome::Failed(e)
    }
}
