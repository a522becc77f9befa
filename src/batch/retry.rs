// =============================================================================
// Fetch Retry Policy
// =============================================================================
//
// Every fetch attempt is preceded by a jittered delay (base + U[0, jitter]).
// Only `UpstreamUnavailable` is retried; the final error is returned to the
// caller instead of being swallowed.

use std::time::Duration;

use chrono::NaiveDate;
use rand::Rng;
use tracing::{debug, warn};

use crate::error::SignalError;
use crate::market_data::OhlcSource;
use crate::runtime_config::RetryConfig;
use crate::types::PriceSeries;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub jitter: Duration,
}

impl RetryPolicy {
    pub fn from_config(cfg: &RetryConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            base_delay: Duration::from_millis(cfg.base_delay_ms),
            jitter: Duration::from_millis(cfg.jitter_ms),
        }
    }

    /// No delays, `max_attempts` tries.
    #[cfg(test)]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    /// One jittered delay. The RNG never lives across an await point.
    pub fn delay(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        let extra = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        self.base_delay + Duration::from_millis(extra)
    }
}

/// Fetch `symbol` under `policy`.
pub async fn fetch_with_retry<S: OhlcSource>(
    source: &S,
    policy: &RetryPolicy,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Option<PriceSeries>, SignalError> {
    let mut attempt = 1;
    loop {
        let delay = policy.delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match source.fetch_daily(symbol, start, end).await {
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                debug!(symbol, attempt, error = %e, "fetch failed, retrying");
                attempt += 1;
            }
            Err(e) => {
                if e.is_retryable() {
                    warn!(symbol, attempts = attempt, error = %e, "fetch gave up");
                }
                return Err(e);
            }
            ok => return ok,
        }
    }
}
