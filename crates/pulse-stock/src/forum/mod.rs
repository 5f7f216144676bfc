//! PTT board scraping: search, link ordering and thread extraction

pub mod client;
pub mod links;
pub mod thread;

pub use client::{ForumClient, ThreadSource};
#[cfg(test)]
pub use client::MockThreadSource;
pub use links::{link_key, parse_search_page, select_links};
pub use thread::{Comment, ThreadRecord, parse_thread};
