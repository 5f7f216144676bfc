//! Shared utilities for ptt-pulse
//!
//! This crate provides common functionality used across the ptt-pulse workspace:
//! logging setup and the small text helpers the scraper and exporter share.

pub mod logging;
pub mod text;

pub use logging::{init_tracing, init_tracing_with};
pub use text::{collapse_whitespace, sanitize_filename_component, truncate_chars};
