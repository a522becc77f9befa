// =============================================================================
// Eastmoney Daily Kline Client
// =============================================================================
//
// Public, unsigned endpoint. Daily bars are requested unadjusted (fqt=0) and
// returned as CSV-ish strings:
//
//   "date,open,close,high,low,volume,amount,amplitude,pct,chg,turnover"
//
// Shanghai codes (leading 6 or 9) use market id 1, everything else 0.
// =============================================================================

use std::time::Duration;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::SignalError;
use crate::market_data::source::OhlcSource;
use crate::types::{PriceBar, PriceSeries};

const DEFAULT_BASE_URL: &str = "https://push2his.eastmoney.com";
const KLINE_FIELDS: &str = "f51,f52,f53,f54,f55,f56,f57,f58,f59,f60,f61";

/// Daily kline client for A-share symbols.
#[derive(Clone)]
pub struct EastmoneyClient {
    base_url: String,
    client: reqwest::Client,
}

impl EastmoneyClient {
    /// Create a client with a per-request `timeout`.
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, timeout)
    }

    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into();
        debug!(base_url = %base_url, "EastmoneyClient initialised");
        Ok(Self { base_url, client })
    }

    /// Eastmoney `secid` for a six-digit code.
    pub fn secid(symbol: &str) -> String {
        let market = if symbol.starts_with('6') || symbol.starts_with('9') {
            1
        } else {
            0
        };
        format!("{market}.{symbol}")
    }

    fn kline_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}/api/qt/stock/kline/get?fields1=f1,f2,f3,f4,f5,f6&fields2={}&klt=101&fqt=0&secid={}&beg={}&end={}",
            self.base_url,
            KLINE_FIELDS,
            Self::secid(symbol),
            start.format("%Y%m%d"),
            end.format("%Y%m%d"),
        )
    }

    #[instrument(skip(self), name = "eastmoney::get_daily")]
    async fn get_daily(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<PriceSeries>, SignalError> {
        let unavailable = |reason: String| SignalError::UpstreamUnavailable {
            symbol: symbol.to_string(),
            reason,
        };

        let resp = self
            .client
            .get(self.kline_url(symbol, start, end))
            .send()
            .await
            .map_err(|e| unavailable(format!("GET kline request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(unavailable(format!("kline endpoint returned {status}")));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| unavailable(format!("failed to parse kline response: {e}")))?;

        let series = parse_klines(symbol, &body)?;
        debug!(
            symbol,
            bars = series.as_ref().map_or(0, PriceSeries::len),
            "daily klines fetched"
        );
        Ok(series)
    }
}

impl OhlcSource for EastmoneyClient {
    async fn fetch_daily(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<PriceSeries>, SignalError> {
        self.get_daily(symbol, start, end).await
    }
}

/// Parse the `data.klines` array of a kline response. A missing `data`
/// object or an empty list means "no rows".
pub fn parse_klines(symbol: &str, body: &Value) -> Result<Option<PriceSeries>, SignalError> {
    let Some(rows) = body["data"]["klines"].as_array() else {
        return Ok(None);
    };
    if rows.is_empty() {
        return Ok(None);
    }

    let malformed = |reason: String| SignalError::MalformedSeries {
        symbol: symbol.to_string(),
        reason,
    };

    let mut bars = Vec::with_capacity(rows.len());
    for row in rows {
        let line = row
            .as_str()
            .ok_or_else(|| malformed(format!("kline row is not a string: {row}")))?;
        bars.push(parse_kline_row(line).map_err(malformed)?);
    }

    PriceSeries::new(symbol, bars).map(Some)
}

fn parse_kline_row(line: &str) -> Result<PriceBar, String> {
    let cols: Vec<&str> = line.split(',').collect();
    if cols.len() < 6 {
        return Err(format!("kline row has {} fields: {line:?}", cols.len()));
    }
    let num = |i: usize| {
        cols[i]
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("field {i} of {line:?}: {e}"))
    };
    let date = NaiveDate::parse_from_str(cols[0].trim(), "%Y-%m-%d")
        .map_err(|e| format!("date of {line:?}: {e}"))?;

    Ok(PriceBar {
        date,
        open: num(1)?,
        close: num(2)?,
        high: num(3)?,
        low: num(4)?,
        volume: num(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn secid_by_exchange() {
        assert_eq!(EastmoneyClient::secid("600000"), "1.600000");
        assert_eq!(EastmoneyClient::secid("000001"), "0.000001");
        assert_eq!(EastmoneyClient::secid("300750"), "0.300750");
    }

    #[test]
    fn url_carries_dates_and_secid() {
        let client =
            EastmoneyClient::with_base_url("http://localhost:9", Duration::from_secs(1)).unwrap();
        let url = client.kline_url(
            "603501",
            NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 7, 16).unwrap(),
        );
        assert!(url.starts_with("http://localhost:9/api/qt/stock/kline/get?"));
        assert!(url.contains("secid=1.603501"));
        assert!(url.contains("beg=20240901"));
        assert!(url.contains("end=20250716"));
        assert!(url.contains("fqt=0"));
    }

    #[test]
    fn parses_kline_rows_in_column_order() {
        let body = json!({
            "data": {
                "code": "600000",
                "klines": [
                    "2024-09-02,8.50,8.40,8.55,8.38,123456,1.0e8,2.0,-1.1,-0.1,0.4",
                    "2024-09-03,8.40,8.60,8.62,8.35,223456,1.9e8,3.2,2.4,0.2,0.7"
                ]
            }
        });
        let series = parse_klines("600000", &body).unwrap().unwrap();
        assert_eq!(series.len(), 2);
        let b = series.bars()[1];
        assert_eq!(b.open, 8.40);
        assert_eq!(b.close, 8.60);
        assert_eq!(b.high, 8.62);
        assert_eq!(b.low, 8.35);
        assert_eq!(b.volume, 223456.0);
    }

    #[test]
    fn missing_data_is_empty_not_error() {
        assert_eq!(parse_klines("999999", &json!({ "data": null })).unwrap(), None);
        assert_eq!(
            parse_klines("600000", &json!({ "data": { "klines": [] } })).unwrap(),
            None
        );
    }

    #[test]
    fn garbage_row_is_malformed() {
        let body = json!({ "data": { "klines": ["2024-09-02,abc,8.4,8.5,8.3,1"] } });
        assert!(matches!(
            parse_klines("600000", &body),
            Err(SignalError::MalformedSeries { .. })
        ));
    }
}
