// =============================================================================
// Upstream Collaborator Seams
// =============================================================================
//
// `OhlcSource` supplies daily bars per symbol; `UniverseSource` supplies the
// list of symbols to scan. Both are implemented by thin adapters in this
// module tree and by in-memory fakes in tests.

use std::future::Future;

use anyhow::Result;
use chrono::NaiveDate;

use crate::error::SignalError;
use crate::types::{PriceSeries, UniverseEntry};

/// Daily price history provider.
///
/// `Ok(None)` means the upstream returned no rows, which is an ordinary
/// outcome. `Err(UpstreamUnavailable)` is retried by the caller; any other
/// error is final for that symbol.
pub trait OhlcSource: Send + Sync + 'static {
    fn fetch_daily(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl Future<Output = Result<Option<PriceSeries>, SignalError>> + Send;
}

/// Provider of `(code, name)` pairs. A failure here is fatal for the run.
pub trait UniverseSource: Send + Sync {
    fn load(&self) -> Result<Vec<UniverseEntry>>;
}
