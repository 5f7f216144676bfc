//! Configuration for a scrape-and-analyse run

use crate::error::{Result, StockError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Smallest accepted article limit
pub const MIN_ARTICLE_LIMIT: usize = 1;
/// Largest accepted article limit
pub const MAX_ARTICLE_LIMIT: usize = 50;

/// Configuration for a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseConfig {
    /// Number of threads to download, 1..=50
    pub article_limit: usize,

    /// Search keywords, whitespace-delimited on input
    pub keywords: Vec<String>,

    /// Ticker to compute indicators for (optional)
    pub ticker: Option<String>,

    /// Cap on body characters per thread; `None` keeps the whole body
    pub body_char_limit: Option<usize>,

    /// Timeout for each forum request
    pub request_timeout: Duration,

    /// Forum requests allowed per second
    pub fetch_rate_per_second: u32,

    /// Forum origin, e.g. `https://www.ptt.cc`
    pub forum_base_url: String,

    /// Board name, e.g. `Stock`
    pub board: String,

    /// Market suffix appended to bare tickers
    pub market_suffix: String,

    /// Trailing price-history window passed to the price client
    pub price_range: String,

    /// Cap on scraped characters sent to the LLM
    pub prompt_char_limit: usize,

    /// Prefix exported text with a UTF-8 BOM
    pub write_bom: bool,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            article_limit: 5,
            keywords: Vec::new(),
            ticker: None,
            body_char_limit: None,
            request_timeout: Duration::from_secs(10),
            fetch_rate_per_second: 5,
            forum_base_url: "https://www.ptt.cc".to_string(),
            board: "Stock".to_string(),
            market_suffix: ".TW".to_string(),
            price_range: "3mo".to_string(),
            prompt_char_limit: 40_000,
            write_bom: false,
        }
    }
}

impl PulseConfig {
    /// Create a new configuration builder
    pub fn builder() -> PulseConfigBuilder {
        PulseConfigBuilder::default()
    }

    /// Configuration for an indicator report alone, without forum keywords
    pub fn for_ticker(ticker: &str) -> Result<Self> {
        let ticker = ticker.trim();
        if ticker.is_empty() {
            return Err(StockError::ConfigError("ticker must not be blank".to_string()));
        }

        let config = Self {
            ticker: Some(ticker.to_string()),
            ..Self::default()
        };
        config.validate_limits()?;
        Ok(config)
    }

    /// Overlay `PTT_PULSE_LIMIT` and `PTT_PULSE_TICKER` from the environment
    pub fn with_env(self) -> Result<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Overlay settings from `lookup`, keyed by environment variable name
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(limit) = lookup("PTT_PULSE_LIMIT") {
            self.article_limit = limit.trim().parse().map_err(|_| {
                StockError::ConfigError(format!("PTT_PULSE_LIMIT is not a number: {limit}"))
            })?;
        }
        if let Some(ticker) = lookup("PTT_PULSE_TICKER") {
            if !ticker.trim().is_empty() {
                self.ticker = Some(ticker.trim().to_string());
            }
        }
        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.keywords.is_empty() {
            return Err(StockError::ConfigError("at least one keyword is required".to_string()));
        }
        self.validate_limits()
    }

    /// Checks shared by keyword runs and ticker-only runs
    fn validate_limits(&self) -> Result<()> {
        if !(MIN_ARTICLE_LIMIT..=MAX_ARTICLE_LIMIT).contains(&self.article_limit) {
            return Err(StockError::ConfigError(format!(
                "article_limit must be between {MIN_ARTICLE_LIMIT} and {MAX_ARTICLE_LIMIT}, got {}",
                self.article_limit
            )));
        }

        if let Some(ticker) = &self.ticker {
            if ticker.trim().is_empty() {
                return Err(StockError::ConfigError("ticker must not be blank".to_string()));
            }
        }

        if self.fetch_rate_per_second == 0 {
            return Err(StockError::ConfigError(
                "fetch_rate_per_second must be greater than 0".to_string(),
            ));
        }

        if self.prompt_char_limit == 0 {
            return Err(StockError::ConfigError(
                "prompt_char_limit must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Keywords joined back with spaces, as the user typed them
    pub fn keyword_line(&self) -> String {
        self.keywords.join(" ")
    }

    /// Board index page, sent as the referer
    pub fn board_index_url(&self) -> String {
        format!("{}/bbs/{}/index.html", self.base(), self.board)
    }

    /// Board search endpoint (without query)
    pub fn board_search_url(&self) -> String {
        format!("{}/bbs/{}/search", self.base(), self.board)
    }

    /// Path prefix that every thread of the board lives under
    pub fn board_path(&self) -> String {
        format!("/bbs/{}/", self.board)
    }

    pub(crate) fn base(&self) -> &str {
        self.forum_base_url.trim_end_matches('/')
    }
}

/// Split a whitespace-delimited keyword line
pub fn split_keywords(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

/// Builder for PulseConfig
#[derive(Debug, Default)]
pub struct PulseConfigBuilder {
    article_limit: Option<usize>,
    keywords: Vec<String>,
    ticker: Option<String>,
    body_char_limit: Option<usize>,
    request_timeout: Option<Duration>,
    fetch_rate_per_second: Option<u32>,
    forum_base_url: Option<String>,
    board: Option<String>,
    market_suffix: Option<String>,
    price_range: Option<String>,
    prompt_char_limit: Option<usize>,
    write_bom: bool,
}

impl PulseConfigBuilder {
    /// Set the article limit
    pub fn article_limit(mut self, limit: usize) -> Self {
        self.article_limit = Some(limit);
        self
    }

    /// Set keywords from a whitespace-delimited line
    pub fn keywords(mut self, line: &str) -> Self {
        self.keywords = split_keywords(line);
        self
    }

    /// Set the ticker; blank input clears it
    pub fn ticker(mut self, ticker: impl Into<String>) -> Self {
        let ticker = ticker.into();
        self.ticker = (!ticker.trim().is_empty()).then(|| ticker.trim().to_string());
        self
    }

    /// Cap body length per thread
    pub fn body_char_limit(mut self, limit: usize) -> Self {
        self.body_char_limit = Some(limit);
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set forum request rate
    pub fn fetch_rate_per_second(mut self, rate: u32) -> Self {
        self.fetch_rate_per_second = Some(rate);
        self
    }

    /// Point at a different forum origin
    pub fn forum_base_url(mut self, url: impl Into<String>) -> Self {
        self.forum_base_url = Some(url.into());
        self
    }

    /// Use a different board
    pub fn board(mut self, board: impl Into<String>) -> Self {
        self.board = Some(board.into());
        self
    }

    /// Set the market suffix
    pub fn market_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.market_suffix = Some(suffix.into());
        self
    }

    /// Set the price-history window
    pub fn price_range(mut self, range: impl Into<String>) -> Self {
        self.price_range = Some(range.into());
        self
    }

    /// Cap scraped characters in the prompt
    pub fn prompt_char_limit(mut self, limit: usize) -> Self {
        self.prompt_char_limit = Some(limit);
        self
    }

    /// Write a BOM before exported text
    pub fn write_bom(mut self, write_bom: bool) -> Self {
        self.write_bom = write_bom;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<PulseConfig> {
        let defaults = PulseConfig::default();

        let config = PulseConfig {
            article_limit: self.article_limit.unwrap_or(defaults.article_limit),
            keywords: self.keywords,
            ticker: self.ticker,
            body_char_limit: self.body_char_limit,
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            fetch_rate_per_second: self
                .fetch_rate_per_second
                .unwrap_or(defaults.fetch_rate_per_second),
            forum_base_url: self.forum_base_url.unwrap_or(defaults.forum_base_url),
            board: self.board.unwrap_or(defaults.board),
            market_suffix: self.market_suffix.unwrap_or(defaults.market_suffix),
            price_range: self.price_range.unwrap_or(defaults.price_range),
            prompt_char_limit: self.prompt_char_limit.unwrap_or(defaults.prompt_char_limit),
            write_bom: self.write_bom,
        };

        config.validate()?;
        Ok(config)
    }
}
