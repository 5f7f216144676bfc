//! Point-in-time technical snapshot for the latest bar

use super::rolling::{ewm_adjusted, rsi, rsv, sma};
use crate::api::PriceBar;
use crate::error::{Result, StockError};
use serde::{Deserialize, Serialize};

/// Bars needed before the snapshot is computed at all
pub const MIN_BARS: usize = 20;
/// Shares per lot
pub const SHARES_PER_LOT: i64 = 1000;

const RSI_PERIOD: usize = 14;
const KD_PERIOD: usize = 9;
const KD_CENTER_OF_MASS: f64 = 2.0;

/// K/D crossing between yesterday and today
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrossSignal {
    /// K moved from below D to above it
    GoldenCross,
    /// K moved from above D to below it
    DeathCross,
    NoCross,
}

impl CrossSignal {
    /// Classify from yesterday's and today's `(K, D)`
    ///
    /// Only strict inequalities on both days count.
    pub fn from_kd(yesterday: (f64, f64), today: (f64, f64)) -> Self {
        let (k_y, d_y) = yesterday;
        let (k_t, d_t) = today;
        if k_y < d_y && k_t > d_t {
            Self::GoldenCross
        } else if k_y > d_y && k_t < d_t {
            Self::DeathCross
        } else {
            Self::NoCross
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::GoldenCross => "黃金交叉 (偏多)",
            Self::DeathCross => "死亡交叉 (偏空)",
            Self::NoCross => "無交叉",
        }
    }
}

/// Qualitative RSI band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RsiBand {
    Overheated,
    Oversold,
    Neutral,
}

impl RsiBand {
    /// Above 70 is overheated, below 30 oversold
    pub fn classify(rsi: f64) -> Self {
        if rsi > 70.0 {
            Self::Overheated
        } else if rsi < 30.0 {
            Self::Oversold
        } else {
            Self::Neutral
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Overheated => "過熱",
            Self::Oversold => "超賣",
            Self::Neutral => "中性",
        }
    }
}

/// Technical report values for the most recent bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub close: f64,
    pub ma5: Option<f64>,
    pub ma20: Option<f64>,
    pub ma60: Option<f64>,
    pub rsi14: Option<f64>,
    pub k9: Option<f64>,
    pub d9: Option<f64>,
    /// Today's close minus yesterday's
    pub change_vs_prev_day: Option<f64>,
    pub change_pct: Option<f64>,
    /// Volume change in lots, truncated toward zero
    pub volume_delta_lots: Option<i64>,
    pub cross_signal: Option<CrossSignal>,
}

impl IndicatorSnapshot {
    /// Compute from any non-empty series
    ///
    /// Windows that are not full leave their fields `None`; with a single
    /// bar the day-over-day fields are `None` as well.
    pub fn from_series(symbol: &str, bars: &[PriceBar]) -> Result<Self> {
        let Some(today) = bars.last() else {
            return Err(StockError::InsufficientData {
                symbol: symbol.to_string(),
                bars: 0,
                required: 1,
            });
        };

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();

        let ma5 = sma(&closes, 5)?;
        let ma20 = sma(&closes, 20)?;
        let ma60 = sma(&closes, 60)?;
        let rsi14 = rsi(&closes, RSI_PERIOD)?;
        let rsv9 = rsv(&highs, &lows, &closes, KD_PERIOD)?;
        let k9 = ewm_adjusted(&rsv9, KD_CENTER_OF_MASS);
        let d9 = ewm_adjusted(&k9, KD_CENTER_OF_MASS);

        let last = bars.len() - 1;
        let yesterday = last.checked_sub(1).map(|i| &bars[i]);

        let change_vs_prev_day = yesterday.map(|y| today.close - y.close);
        let change_pct = yesterday
            .filter(|y| y.close != 0.0)
            .map(|y| (today.close - y.close) / y.close * 100.0);
        let volume_delta_lots =
            yesterday.map(|y| (today.volume as i64 - y.volume as i64) / SHARES_PER_LOT);
        let cross_signal = last.checked_sub(1).and_then(|prev| {
            let y = (k9[prev]?, d9[prev]?);
            let t = (k9[last]?, d9[last]?);
            Some(CrossSignal::from_kd(y, t))
        });

        Ok(Self {
            close: today.close,
            ma5: ma5[last],
            ma20: ma20[last],
            ma60: ma60[last],
            rsi14: rsi14[last],
            k9: k9[last],
            d9: d9[last],
            change_vs_prev_day,
            change_pct,
            volume_delta_lots,
            cross_signal,
        })
    }

    /// Whether today's close is above MA5
    pub fn above_ma5(&self) -> Option<bool> {
        self.ma5.map(|ma| self.close > ma)
    }

    pub fn rsi_band(&self) -> Option<RsiBand> {
        self.rsi14.map(RsiBand::classify)
    }
}

/// Compute the snapshot, requiring at least [`MIN_BARS`] bars
pub fn compute_snapshot(symbol: &str, bars: &[PriceBar]) -> Result<IndicatorSnapshot> {
    if bars.len() < MIN_BARS {
        return Err(StockError::InsufficientData {
            symbol: symbol.to_string(),
            bars: bars.len(),
            required: MIN_BARS,
        });
    }
    IndicatorSnapshot::from_series(symbol, bars)
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_nineteen_bars_is_insufficient() {
        let err = compute_snapshot("2330.TW", &wave(19)).unwrap_err();
        assert!(matches!(
            err,
            StockError::InsufficientData { bars: 19, required: 20, .. }
        ));
    }

    #[test]
    fn test_twenty_bars_succeeds_with_ma60_undefined() {
        let snapshot = compute_snapshot("2330.TW", &wave(20)).unwrap();
        assert!(snapshot.ma5.is_some());
        assert!(snapshot.ma20.is_some());
        assert!(snapshot.rsi14.is_some());
        assert!(snapshot.k9.is_some());
        assert!(snapshot.d9.is_some());
        assert_eq!(snapshot.ma60, None);
        assert!(snapshot.cross_signal.is_some());
    }

    #[test]
    fn test_sixty_bars_defines_ma60() {
        let snapshot = compute_snapshot("2330.TW", &wave(60)).unwrap();
        assert!(snapshot.ma60.is_some());
    }

    #[test]
    fn test_moving_averages_and_day_change() {
        let closes: Vec<f64> = (1..=20).map(f64::from).collect();
        let snapshot = compute_snapshot("X", &bars_from_closes(&closes)).unwrap();

        assert_eq!(snapshot.close, 20.0);
        assert!((snapshot.ma5.unwrap() - 18.0).abs() < 1e-9);
        assert!((snapshot.ma20.unwrap() - 10.5).abs() < 1e-9);
        assert_eq!(snapshot.change_vs_prev_day, Some(1.0));
        assert!((snapshot.change_pct.unwrap() - 100.0 / 19.0).abs() < 1e-9);
        // volume grows 1500 shares a day
        assert_eq!(snapshot.volume_delta_lots, Some(1));
        assert_eq!(snapshot.above_ma5(), Some(true));
        assert_eq!(snapshot.rsi_band(), Some(RsiBand::Overheated));
    }

    #[test]
    fn test_volume_delta_is_signed() {
        let mut bars = wave(20);
        bars[18].volume = 5_000_000;
        bars[19].volume = 2_499_500;
        let snapshot = compute_snapshot("X", &bars).unwrap();
        assert_eq!(snapshot.volume_delta_lots, Some(-2500));
    }

    #[test]
    fn test_single_bar_reports_unavailable_day_fields() {
        let snapshot = IndicatorSnapshot::from_series("X", &bars_from_closes(&[100.0])).unwrap();
        assert_eq!(snapshot.close, 100.0);
        assert_eq!(snapshot.change_vs_prev_day, None);
        assert_eq!(snapshot.volume_delta_lots, None);
        assert_eq!(snapshot.cross_signal, None);
        assert_eq!(snapshot.ma5, None);
    }

    #[test]
    fn test_empty_series() {
        assert!(matches!(
            IndicatorSnapshot::from_series("X", &[]),
            Err(StockError::InsufficientData { bars: 0, .. })
        ));
    }

    #[test]
    fn test_cross_signal_rules() {
        assert_eq!(CrossSignal::from_kd((10.0, 12.0), (13.0, 11.0)), CrossSignal::GoldenCross);
        assert_eq!(CrossSignal::from_kd((13.0, 11.0), (10.0, 12.0)), CrossSignal::DeathCross);
        assert_eq!(CrossSignal::from_kd((10.0, 8.0), (9.0, 11.0)), CrossSignal::DeathCross);
        // touching is not crossing
        assert_eq!(CrossSignal::from_kd((10.0, 10.0), (13.0, 11.0)), CrossSignal::NoCross);
        assert_eq!(CrossSignal::from_kd((10.0, 12.0), (11.0, 11.0)), CrossSignal::NoCross);
        assert_eq!(CrossSignal::from_kd((14.0, 12.0), (15.0, 11.0)), CrossSignal::NoCross);
    }

    #[test]
    fn test_rsi_bands() {
        assert_eq!(RsiBand::classify(75.0), RsiBand::Overheated);
        assert_eq!(RsiBand::classify(25.0), RsiBand::Oversold);
        assert_eq!(RsiBand::classify(70.0), RsiBand::Neutral);
        assert_eq!(RsiBand::classify(30.0), RsiBand::Neutral);
    }

    #[test]
    fn test_recompute_is_bit_identical() {
        let bars = wave(63);
        let a = compute_snapshot("X", &bars).unwrap();
        let b = compute_snapshot("X", &bars).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.k9.map(f64::to_bits), b.k9.map(f64::to_bits));
        assert_eq!(a.rsi14.map(f64::to_bits), b.rsi14.map(f64::to_bits));
    }

    #[test]
    fn test_kd_bounded() {
        let snapshot = compute_snapshot("X", &wave(63)).unwrap();
        for value in [snapshot.k9, snapshot.d9, snapshot.rsi14] {
            let v = value.unwrap();
            assert!((-1e-9..=100.0 + 1e-9).contains(&v), "{v}");
        }
    }
}
