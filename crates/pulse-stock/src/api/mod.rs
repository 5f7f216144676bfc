//! API clients for market data providers

pub mod yahoo;

pub use yahoo::{PriceBar, PriceHistory, YahooFinanceClient, normalize_ticker};

#[cfg(test)]
pub use yahoo::MockPriceHistory;
