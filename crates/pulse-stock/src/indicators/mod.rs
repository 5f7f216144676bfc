//! Technical indicators over daily price history

pub mod report;
pub mod rolling;
pub mod snapshot;

pub use report::{IndicatorReport, IndicatorService, render_report};
pub use snapshot::{CrossSignal, IndicatorSnapshot, MIN_BARS, RsiBand, compute_snapshot};
