//! Text report and the fetch-compute-render service

use super::snapshot::{IndicatorSnapshot, compute_snapshot};
use crate::api::{PriceHistory, normalize_ticker};
use crate::config::PulseConfig;
use crate::error::Result;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::Arc;
use tracing::{info, instrument};

const UNAVAILABLE: &str = "N/A";

fn price(value: Option<f64>) -> String {
    value.map_or_else(|| UNAVAILABLE.to_string(), |v| format!("{v:.2}"))
}

fn signed(value: Option<f64>) -> String {
    value.map_or_else(|| UNAVAILABLE.to_string(), |v| format!("{v:+.2}"))
}

fn volume_line(delta: Option<i64>) -> String {
    match delta {
        Some(d) if d >= 0 => format!("增加 {d} 張"),
        Some(d) => format!("減少 {} 張", d.unsigned_abs()),
        None => UNAVAILABLE.to_string(),
    }
}

/// Render the snapshot as the plain-text report that heads each export
pub fn render_report(symbol: &str, snapshot: &IndicatorSnapshot, fetched_at: DateTime<Local>) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "📈 技術指標報告: {symbol}");
    let _ = writeln!(out, "🕒 資料時間: {}", fetched_at.format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "收盤價: {:.2}", snapshot.close);

    let change = match (snapshot.change_vs_prev_day, snapshot.change_pct) {
        (Some(diff), Some(pct)) => format!("{diff:+.2} ({pct:+.2}%)"),
        (diff, _) => signed(diff),
    };
    let _ = writeln!(out, "漲跌: {change}");
    let _ = writeln!(out, "成交量變化: {}", volume_line(snapshot.volume_delta_lots));

    let _ = writeln!(
        out,
        "MA5: {} | MA20: {} | MA60: {}",
        price(snapshot.ma5),
        price(snapshot.ma20),
        price(snapshot.ma60)
    );
    let ma_relation = match snapshot.above_ma5() {
        Some(true) => "站上 MA5",
        Some(false) => "跌破 MA5",
        None => UNAVAILABLE,
    };
    let _ = writeln!(out, "均線位置: {ma_relation}");

    let rsi_band = snapshot.rsi_band().map_or(UNAVAILABLE, |band| band.label());
    let _ = writeln!(out, "RSI(14): {} ({rsi_band})", price(snapshot.rsi14));

    let cross = snapshot.cross_signal.map_or(UNAVAILABLE, |c| c.label());
    let _ = writeln!(
        out,
        "KD(9): K {} / D {} | {cross}",
        price(snapshot.k9),
        price(snapshot.d9)
    );

    out
}

/// Rendered indicator report for one symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorReport {
    pub symbol: String,
    pub snapshot: IndicatorSnapshot,
    pub text: String,
}

/// Normalizes a ticker, fetches its history and renders the report
pub struct IndicatorService {
    prices: Arc<dyn PriceHistory>,
    config: Arc<PulseConfig>,
}

impl IndicatorService {
    pub fn new(prices: Arc<dyn PriceHistory>, config: Arc<PulseConfig>) -> Self {
        Self { prices, config }
    }

    #[instrument(skip(self))]
    pub async fn report(&self, ticker: &str) -> Result<IndicatorReport> {
        let symbol = normalize_ticker(ticker, &self.config.market_suffix)?;
        let bars = self.prices.daily_bars(&symbol, &self.config.price_range).await?;
        let snapshot = compute_snapshot(&symbol, &bars)?;
        let text = render_report(&symbol, &snapshot, Local::now());

        info!(symbol = %symbol, bars = bars.len(), "indicator report ready");
        Ok(IndicatorReport { symbol, snapshot, text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockPriceHistory;
    use crate::error::StockError;
    use crate::indicators::snapshot::CrossSignal;
    use crate::indicators::snapshot::fixtures::{bars_from_closes, wave};
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap()
    }

    fn config() -> Arc<PulseConfig> {
        Arc::new(PulseConfig::builder().keywords("台積電").build().unwrap())
    }

    #[test]
    fn test_render_report_full() {
        let closes: Vec<f64> = (1..=20).map(f64::from).collect();
        let snapshot = compute_snapshot("2330.TW", &bars_from_closes(&closes)).unwrap();
        let text = render_report("2330.TW", &snapshot, fixed_time());

        assert!(text.contains("2330.TW"));
        assert!(text.contains("2024-03-01 14:30:00"));
        assert!(text.contains("收盤價: 20.00"));
        assert!(text.contains("漲跌: +1.00 (+5.26%)"));
        assert!(text.contains("增加 1 張"));
        assert!(text.contains("MA5: 18.00"));
        assert!(text.contains("MA60: N/A"));
        assert!(text.contains("站上 MA5"));
        assert!(text.contains("過熱"));
    }

    #[test]
    fn test_render_report_unavailable_fields() {
        let snapshot = IndicatorSnapshot::from_series("X", &bars_from_closes(&[50.0])).unwrap();
        let text = render_report("X", &snapshot, fixed_time());

        assert!(text.contains("漲跌: N/A"));
        assert!(text.contains("成交量變化: N/A"));
        assert!(text.contains("KD(9): K N/A / D N/A | N/A"));
    }

    #[test]
    fn test_volume_line_sign() {
        assert_eq!(volume_line(Some(-2500)), "減少 2500 張");
        assert_eq!(volume_line(Some(0)), "增加 0 張");
    }

    #[test]
    fn test_render_cross_label() {
        let mut snapshot = compute_snapshot("X", &wave(30)).unwrap();
        snapshot.cross_signal = Some(CrossSignal::GoldenCross);
        assert!(render_report("X", &snapshot, fixed_time()).contains("黃金交叉"));
    }

    #[tokio::test]
    async fn test_service_normalizes_and_renders() {
        let mut prices = MockPriceHistory::new();
        prices
            .expect_daily_bars()
            .withf(|symbol, range| symbol.to_string() == "2330.TW" && range.to_string() == "3mo")
            .times(1)
            .returning(|_, _| Ok(wave(40)));

        let service = IndicatorService::new(Arc::new(prices), config());
        let report = service.report("2330").await.unwrap();

        assert_eq!(report.symbol, "2330.TW");
        assert!(report.text.starts_with("📈 技術指標報告: 2330.TW"));
        assert!(report.snapshot.ma20.is_some());
    }

    #[tokio::test]
    async fn test_service_short_history() {
        let mut prices = MockPriceHistory::new();
        prices.expect_daily_bars().returning(|_, _| Ok(wave(5)));

        let service = IndicatorService::new(Arc::new(prices), config());
        let err = service.report("2330").await.unwrap_err();
        assert!(matches!(err, StockError::InsufficientData { bars: 5, .. }));
    }

    #[tokio::test]
    async fn test_service_propagates_fetch_error() {
        let mut prices = MockPriceHistory::new();
        prices
            .expect_daily_bars()
            .returning(|_, _| Err(StockError::YahooFinanceError("no data".to_string())));

        let service = IndicatorService::new(Arc::new(prices), config());
        let err = service.report("9999").await.unwrap_err();
        assert_eq!(err.kind(), "price-history");
    }
}
