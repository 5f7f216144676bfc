//! Search-result links: extraction, recency key and selection

use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use std::sync::LazyLock;

static LINK_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"M\.(\d+)").expect("valid link key pattern"));
static TITLE_DIV: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.title").expect("valid selector"));
static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Recency key embedded in a thread URL (`M.<unix seconds>.A.xxx.html`)
///
/// Links without a key, or with one that does not fit, sort as 0.
pub fn link_key(url: &str) -> u64 {
    LINK_KEY
        .captures(url)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Dedup, order newest first, and keep `limit` links
///
/// Links with equal keys keep their lexical order.
pub fn select_links<I>(links: I, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let unique: BTreeSet<String> = links.into_iter().collect();
    let mut ordered: Vec<String> = unique.into_iter().collect();
    ordered.sort_by_key(|url| std::cmp::Reverse(link_key(url)));
    ordered.truncate(limit);
    ordered
}

/// Thread links from a board search page, made absolute against `base`
pub fn parse_search_page(html: &str, base: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let base = base.trim_end_matches('/');

    document
        .select(&TITLE_DIV)
        .filter_map(|title| title.select(&ANCHOR).next())
        .filter_map(|anchor| anchor.value().attr("href"))
        .map(|href| {
            if href.starts_with("http://") || href.starts_with("https://") {
                href.to_string()
            } else {
                format!("{base}{href}")
            }
        })
        .collect()
}
