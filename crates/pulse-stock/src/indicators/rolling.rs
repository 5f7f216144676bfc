//! Rolling-window series math
//!
//! Every function returns one entry per input bar. `None` marks bars where
//! the window is not full yet.

use crate::error::{Result, StockError};
use ta::Next;
use ta::indicators::{Maximum, Minimum, SimpleMovingAverage};

fn indicator_error(e: ta::errors::TaError) -> StockError {
    StockError::IndicatorError(e.to_string())
}

/// Feed `values` through a `ta` indicator, masking the warm-up bars
fn windowed<I>(values: &[f64], period: usize, mut indicator: I) -> Vec<Option<f64>>
where
    I: Next<f64, Output = f64>,
{
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let out = indicator.next(v);
            (i + 1 >= period).then_some(out)
        })
        .collect()
}

/// Simple moving average
pub fn sma(values: &[f64], period: usize) -> Result<Vec<Option<f64>>> {
    let indicator = SimpleMovingAverage::new(period).map_err(indicator_error)?;
    Ok(windowed(values, period, indicator))
}

/// Highest value over the trailing window
pub fn rolling_max(values: &[f64], period: usize) -> Result<Vec<Option<f64>>> {
    let indicator = Maximum::new(period).map_err(indicator_error)?;
    Ok(windowed(values, period, indicator))
}

/// Lowest value over the trailing window
pub fn rolling_min(values: &[f64], period: usize) -> Result<Vec<Option<f64>>> {
    let indicator = Minimum::new(period).map_err(indicator_error)?;
    Ok(windowed(values, period, indicator))
}

/// Relative strength index from simple rolling means of gains and losses
///
/// The first bar has no prior close and counts as a zero move. When the
/// average loss is zero the index is 100, or 50 if the average gain is zero
/// too.
pub fn rsi(closes: &[f64], period: usize) -> Result<Vec<Option<f64>>> {
    let deltas: Vec<f64> = std::iter::once(0.0)
        .chain(closes.windows(2).map(|w| w[1] - w[0]))
        .take(closes.len())
        .collect();
    let gains: Vec<f64> = deltas.iter().map(|&d| if d > 0.0 { d } else { 0.0 }).collect();
    let losses: Vec<f64> = deltas.iter().map(|&d| if d < 0.0 { -d } else { 0.0 }).collect();

    let avg_gain = sma(&gains, period)?;
    let avg_loss = sma(&losses, period)?;

    Ok(avg_gain
        .into_iter()
        .zip(avg_loss)
        .map(|(gain, loss)| Some(rsi_from_averages(gain?, loss?)))
        .collect())
}

/// `100 - 100 / (1 + gain / loss)` with the zero-loss boundary defined
pub fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss <= 0.0 {
        if avg_gain > 0.0 { 100.0 } else { 50.0 }
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// Raw stochastic value: where the close sits in the trailing high-low range
///
/// A flat range gives 50.
pub fn rsv(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Result<Vec<Option<f64>>> {
    if highs.len() != closes.len() || lows.len() != closes.len() {
        return Err(StockError::IndicatorError(format!(
            "series length mismatch: high {}, low {}, close {}",
            highs.len(),
            lows.len(),
            closes.len()
        )));
    }

    let highest = rolling_max(highs, period)?;
    let lowest = rolling_min(lows, period)?;

    Ok(closes
        .iter()
        .zip(highest.into_iter().zip(lowest))
        .map(|(&close, (high, low))| {
            let (high, low) = (high?, low?);
            let range = high - low;
            Some(if range > 0.0 { (close - low) / range * 100.0 } else { 50.0 })
        })
        .collect())
}

/// Adjusted exponentially weighted mean with the given center of mass
///
/// Weights are `(1 - alpha)^i` over the observations since the first
/// defined value, with `alpha = 1 / (1 + com)`. Gaps after the start keep
/// the previous mean while still aging older observations.
pub fn ewm_adjusted(values: &[Option<f64>], com: f64) -> Vec<Option<f64>> {
    let decay = 1.0 - 1.0 / (1.0 + com);
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    let mut started = false;

    values
        .iter()
        .map(|value| match value {
            Some(x) => {
                numerator = x + decay * numerator;
                denominator = 1.0 + decay * denominator;
                started = true;
                Some(numerator / denominator)
            }
            None if started => {
                numerator *= decay;
                denominator *= decay;
                Some(numerator / denominator)
            }
            None => None,
        })
        .collect()
}
