// =============================================================================
// Freshness Policy
// =============================================================================
//
// Decides whether the cached signal set must be recomputed before serving.
//
//   never refreshed                  → stale
//   now inside [window_start, end)   → stale once now - last ≥ max age
//   now outside the window           → stale once the calendar date changed
//
// Outside the window the comparison is on dates, not durations: a refresh at
// 23:59 is stale at 00:01 the next day.

use chrono::{Duration, NaiveDateTime, NaiveTime};

use crate::runtime_config::FreshnessConfig;

#[derive(Debug, Clone)]
pub struct FreshnessPolicy {
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
    pub intraday_max_age: Duration,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self::from_config(&FreshnessConfig::default())
    }
}

impl FreshnessPolicy {
    pub fn from_config(cfg: &FreshnessConfig) -> Self {
        Self {
            window_start: cfg.window_start,
            window_end: cfg.window_end,
            intraday_max_age: Duration::seconds(cfg.intraday_max_age_secs),
        }
    }

    pub fn in_window(&self, now: NaiveDateTime) -> bool {
        let t = now.time();
        t >= self.window_start && t < self.window_end
    }

    pub fn is_stale(&self, now: NaiveDateTime, last_refresh: Option<NaiveDateTime>) -> bool {
        let Some(last) = last_refresh else {
            return true;
        };
        if self.in_window(now) {
            now - last >= self.intraday_max_age
        } else {
            now.date() > last.date()
        }
    }
}
