//! PTT Stock-board sentiment pulse
//!
//! This crate gathers retail-investor chatter and price signals for a
//! Taiwan-listed stock. It includes:
//!
//! - Board search and thread extraction from the PTT Stock board
//! - Newest-first link selection across keywords
//! - Daily price history from Yahoo Finance
//! - A technical snapshot (MA, RSI, KD and cross signals) with a text report
//! - A contrarian sentiment prompt for a hosted LLM
//! - A single-file text export of the run
//!
//! # Example
//!
//! ```rust,ignore
//! use pulse_stock::{ForumClient, IndicatorService, PulseConfig, PulseRun, YahooFinanceClient};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Arc::new(PulseConfig::builder().keywords("台積電 2330").ticker("2330").build()?);
//!     let forum = Arc::new(ForumClient::new(config.clone())?);
//!     let service = IndicatorService::new(Arc::new(YahooFinanceClient::new()), config.clone());
//!
//!     let outcome = PulseRun::new(forum, config).with_indicators(service).run().await;
//!     println!("{}", outcome.scraped_text);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod export;
pub mod forum;
pub mod indicators;
pub mod pipeline;
pub mod prompts;

// Re-export main types for convenience
pub use api::{PriceBar, PriceHistory, YahooFinanceClient, normalize_ticker};
pub use config::{PulseConfig, PulseConfigBuilder};
pub use error::{Result, StockError};
pub use export::ExportArtifact;
pub use forum::{ForumClient, ThreadRecord, ThreadSource};
pub use indicators::{IndicatorReport, IndicatorService, IndicatorSnapshot, compute_snapshot, render_report};
pub use pipeline::{EntryStatus, PulseRun, RunEntry, RunOutcome, SentimentReport};
pub use prompts::sentiment_prompt;
