//! HTTP client for the forum
//!
//! Every request carries the `over18` cookie and browser-like headers;
//! without them the site answers with its age-verification page.

use crate::config::PulseConfig;
use crate::error::{Result, StockError};
use crate::forum::links::parse_search_page;
use crate::forum::thread::{ThreadRecord, parse_thread};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use reqwest::header::{CONNECTION, COOKIE, HeaderMap, HeaderValue, REFERER, USER_AGENT};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, instrument};
use url::Url;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const AGE_COOKIE: &str = "over18=1";
const AGE_GATE_PATH: &str = "/ask/over18";

/// Where the run pipeline gets its threads from
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ThreadSource: Send + Sync {
    /// Absolute thread links matching one keyword
    async fn search(&self, keyword: &str) -> Result<Vec<String>>;

    async fn fetch_thread(&self, url: &str) -> Result<ThreadRecord>;
}

/// Client for board search and thread pages
#[derive(Clone)]
pub struct ForumClient {
    client: Client,
    rate_limiter: SharedRateLimiter,
    config: Arc<PulseConfig>,
}

impl ForumClient {
    /// Create a client from the run configuration
    pub fn new(config: Arc<PulseConfig>) -> Result<Self> {
        let referer = HeaderValue::from_str(&config.board_index_url())
            .map_err(|e| StockError::ConfigError(format!("invalid board URL: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(REFERER, referer);
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(COOKIE, HeaderValue::from_static(AGE_COOKIE));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        let rate_limiter = spaced_limiter(config.fetch_rate_per_second);

        Ok(Self {
            client,
            rate_limiter,
            config,
        })
    }

    /// Search the board for one keyword and return absolute thread links
    #[instrument(skip(self))]
    pub async fn search(&self, keyword: &str) -> Result<Vec<String>> {
        let url = Url::parse_with_params(&self.config.board_search_url(), &[("q", keyword)])
            .map_err(|e| StockError::InvalidUrl(format!("search URL: {e}")))?;

        let html = self.get_html(url.as_str()).await?;
        let links = parse_search_page(&html, self.config.base());
        debug!(count = links.len(), "search results");
        Ok(links)
    }

    /// Fetch and parse one thread
    #[instrument(skip(self))]
    pub async fn fetch_thread(&self, url: &str) -> Result<ThreadRecord> {
        self.check_thread_url(url)?;
        let html = self.get_html(url).await?;
        parse_thread(url, &html, self.config.body_char_limit)
    }

    /// Accept only pages under this board on the configured host
    pub fn check_thread_url(&self, url: &str) -> Result<()> {
        let parsed = Url::parse(url).map_err(|e| StockError::InvalidUrl(format!("{url}: {e}")))?;
        let base = Url::parse(self.config.base())
            .map_err(|e| StockError::ConfigError(format!("invalid forum base URL: {e}")))?;

        if parsed.host_str() != base.host_str() || !parsed.path().starts_with(&self.config.board_path()) {
            return Err(StockError::InvalidUrl(format!(
                "{url} is not under {}{}",
                self.config.base(),
                self.config.board_path()
            )));
        }
        Ok(())
    }

    /// GET a page, waiting on the rate limiter first
    ///
    /// No retries: the first failure is returned.
    async fn get_html(&self, url: &str) -> Result<String> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StockError::fetch(url, e.to_string()))?;

        classify_response(url, response.url().path(), response.status())?;

        response
            .text()
            .await
            .map_err(|e| StockError::fetch(url, e.to_string()))
    }
}

/// Limiter that spaces requests evenly, with no initial burst
fn spaced_limiter(per_second: u32) -> SharedRateLimiter {
    let rate = NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN);
    let quota = Quota::per_second(rate).allow_burst(NonZeroU32::MIN);
    Arc::new(RateLimiter::direct(quota))
}

/// Decide whether a response to `url` carries the page
///
/// Landing on the age gate is `Gated`; any other status than 200 is `Fetch`.
fn classify_response(url: &str, final_path: &str, status: StatusCode) -> Result<()> {
    if final_path.starts_with(AGE_GATE_PATH) {
        return Err(StockError::Gated { url: url.to_string() });
    }
    if status != StatusCode::OK {
        return Err(StockError::fetch(url, format!("HTTP {status}")));
    }
    Ok(())
}

#[async_trait]
impl ThreadSource for ForumClient {
    async fn search(&self, keyword: &str) -> Result<Vec<String>> {
        ForumClient::search(self, keyword).await
    }

    async fn fetch_thread(&self, url: &str) -> Result<ThreadRecord> {
        ForumClient::fetch_thread(self, url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ForumClient {
        let config = PulseConfig::builder().keywords("2330").build().unwrap();
        ForumClient::new(Arc::new(config)).unwrap()
    }

    #[test]
    fn test_thread_url_namespace() {
        let client = client();
        assert!(client
            .check_thread_url("https://www.ptt.cc/bbs/Stock/M.1704070800.A.ABC.html")
            .is_ok());

        for url in [
            "https://www.ptt.cc/bbs/Gossiping/M.1704070800.A.ABC.html",
            "https://example.com/bbs/Stock/M.1704070800.A.ABC.html",
            "not a url",
        ] {
            assert!(
                matches!(client.check_thread_url(url), Err(StockError::InvalidUrl(_))),
                "{url}"
            );
        }
    }

    const THREAD: &str = "https://www.ptt.cc/bbs/Stock/M.1704070800.A.ABC.html";

    #[test]
    fn test_classify_ok() {
        assert!(classify_response(THREAD, "/bbs/Stock/M.1704070800.A.ABC.html", StatusCode::OK).is_ok());
    }

    #[test]
    fn test_classify_age_gate() {
        let err = classify_response(THREAD, "/ask/over18", StatusCode::OK).unwrap_err();
        assert!(matches!(err, StockError::Gated { ref url } if url == THREAD));
        assert_eq!(err.kind(), "gated");
    }

    #[test]
    fn test_classify_error_statuses() {
        for status in [StatusCode::NOT_FOUND, StatusCode::INTERNAL_SERVER_ERROR] {
            let err = classify_response(THREAD, "/bbs/Stock/M.1704070800.A.ABC.html", status).unwrap_err();
            assert_eq!(err.kind(), "fetch");
            assert!(err.to_string().contains(status.as_str()), "{err}");
        }
    }

    #[tokio::test]
    async fn test_requests_are_spaced_without_burst() {
        let limiter = spaced_limiter(5);
        let mut last = std::time::Instant::now();
        limiter.until_ready().await;

        for _ in 0..4 {
            limiter.until_ready().await;
            let now = std::time::Instant::now();
            assert!(
                now.duration_since(last) >= std::time::Duration::from_millis(150),
                "gap was {:?}",
                now.duration_since(last)
            );
            last = now;
        }
    }

    #[tokio::test]
    async fn test_fetch_thread_rejects_foreign_url_without_network() {
        let client = client();
        let err = client
            .fetch_thread("https://example.com/bbs/Stock/M.1.A.html")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid-url");
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_search_live() {
        let links = client().search("台積電").await.unwrap();
        assert!(links.iter().all(|l| l.starts_with("https://www.ptt.cc/bbs/Stock/")));
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_fetch_thread_live() {
        let client = client();
        let links = client.search("2330").await.unwrap();
        let first = links.first().expect("search returned no links");
        let record = client.fetch_thread(first).await.unwrap();
        assert!(!record.title.is_empty());
    }
}
