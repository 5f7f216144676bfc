//! Error types for scraping and indicator operations

use thiserror::Error;

/// Errors raised by the forum scraper, the indicator calculator and the run
/// pipeline
#[derive(Debug, Error)]
pub enum StockError {
    /// Transport failure, timeout or non-200 response
    #[error("Fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The site served its age-verification gate instead of the page
    #[error("Age verification gate hit for {url}")]
    Gated { url: String },

    /// Expected markup absent or malformed
    #[error("Parse failed for {url}: {reason}")]
    Parse { url: String, reason: String },

    /// URL outside the board's article namespace
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Price series too short for the indicator windows
    #[error("Insufficient data for {symbol}: {bars} bars, need at least {required}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        required: usize,
    },

    /// Technical indicator calculation error
    #[error("Technical indicator error: {0}")]
    IndicatorError(String),

    /// Yahoo Finance API error
    #[error("Yahoo Finance error: {0}")]
    YahooFinanceError(String),

    /// LLM call failed
    #[error(transparent)]
    Llm(#[from] pulse_llm::LLMError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Prompt template error
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Filesystem error while writing the export
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StockError {
    /// Short label for the failure kind, used in run logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch { .. } | Self::NetworkError(_) => "fetch",
            Self::Gated { .. } => "gated",
            Self::Parse { .. } => "parse",
            Self::InvalidUrl(_) => "invalid-url",
            Self::InsufficientData { .. } => "insufficient-data",
            Self::IndicatorError(_) => "indicator",
            Self::YahooFinanceError(_) => "price-history",
            Self::Llm(_) => "api",
            Self::ConfigError(_) => "config",
            Self::Template(_) => "template",
            Self::Io(_) => "io",
        }
    }

    pub(crate) fn parse(url: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn fetch(url: &str, reason: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for stock operations
pub type Result<T> = std::result::Result<T, StockError>;
