//! Yahoo Finance price-history client

use crate::error::{Result, StockError};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, instrument};
use yahoo_finance_api as yahoo;

/// One daily OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Traded volume in shares
    pub volume: u64,
}

/// Source of daily price history, oldest bar first
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceHistory: Send + Sync {
    /// Daily bars for `symbol` over a trailing range such as `3mo`
    async fn daily_bars(&self, symbol: &str, range: &str) -> Result<Vec<PriceBar>>;
}

/// Append `suffix` unless the ticker already carries it
pub fn normalize_ticker(ticker: &str, suffix: &str) -> Result<String> {
    let ticker = ticker.trim();
    if ticker.is_empty() {
        return Err(StockError::ConfigError("ticker is empty".to_string()));
    }

    let upper = ticker.to_uppercase();
    if upper.ends_with(&suffix.to_uppercase()) {
        Ok(upper)
    } else {
        Ok(format!("{upper}{}", suffix.to_uppercase()))
    }
}

/// Yahoo Finance API client
#[derive(Debug, Clone, Default)]
pub struct YahooFinanceClient {}

impl YahooFinanceClient {
    /// Create a new Yahoo Finance client
    pub fn new() -> Self {
        Self {}
    }

    /// Get historical bars between two instants
    pub async fn get_historical_quotes(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PriceBar>> {
        let provider = yahoo::YahooConnector::new()
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;

        // Convert chrono DateTime to time OffsetDateTime
        let start_odt = OffsetDateTime::from_unix_timestamp(start.timestamp())
            .map_err(|e| StockError::YahooFinanceError(format!("Invalid start timestamp: {e}")))?;
        let end_odt = OffsetDateTime::from_unix_timestamp(end.timestamp())
            .map_err(|e| StockError::YahooFinanceError(format!("Invalid end timestamp: {e}")))?;

        let response = provider
            .get_quote_history(symbol, start_odt, end_odt)
            .await
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;

        let quotes = response
            .quotes()
            .map_err(|e| StockError::YahooFinanceError(e.to_string()))?;

        let mut bars: Vec<PriceBar> = quotes
            .iter()
            .map(|q| PriceBar {
                timestamp: DateTime::from_timestamp(q.timestamp as i64, 0).unwrap_or_else(Utc::now),
                open: q.open,
                high: q.high,
                low: q.low,
                close: q.close,
                volume: q.volume,
            })
            .collect();
        bars.sort_by_key(|bar| bar.timestamp);

        Ok(bars)
    }

    /// Get historical bars for a trailing range
    pub async fn get_historical_range(&self, symbol: &str, range: &str) -> Result<Vec<PriceBar>> {
        let end = Utc::now();
        let start = range_start(range, end)?;
        self.get_historical_quotes(symbol, start, end).await
    }
}

/// Start of a trailing range ending at `end`
fn range_start(range: &str, end: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let days = match range {
        "5d" => 5,
        "1mo" => 30,
        "3mo" => 90,
        "6mo" => 180,
        "1y" => 365,
        "2y" => 730,
        "ytd" => {
            return chrono::NaiveDate::from_ymd_opt(end.year(), 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|d| d.and_utc())
                .ok_or_else(|| StockError::ConfigError("invalid year start".to_string()));
        }
        _ => return Err(StockError::ConfigError(format!("Invalid range: {range}"))),
    };
    Ok(end - chrono::Duration::days(days))
}

#[async_trait]
impl PriceHistory for YahooFinanceClient {
    #[instrument(skip(self))]
    async fn daily_bars(&self, symbol: &str, range: &str) -> Result<Vec<PriceBar>> {
        let bars = self.get_historical_range(symbol, range).await?;
        debug!(count = bars.len(), "price history fetched");
        Ok(bars)
    }
}
