//! One scrape-and-report run
//!
//! A run searches every keyword, keeps the newest threads, fetches them one
//! at a time and prepends the indicator report when a ticker is configured.
//! Per-thread failures are logged and skipped; an indicator failure only
//! drops the indicator section.

use crate::config::PulseConfig;
use crate::error::{Result, StockError};
use crate::forum::{ThreadSource, select_links};
use crate::indicators::{IndicatorReport, IndicatorService};
use crate::prompts::sentiment_prompt;
use pulse_llm::Analyst;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Result of fetching one link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    /// Carries the thread's `[posted_at] title` line
    Fetched { summary: String },
    Failed { kind: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEntry {
    pub url: String,
    pub status: EntryStatus,
}

impl RunEntry {
    /// One line for the run log
    pub fn log_line(&self) -> String {
        match &self.status {
            EntryStatus::Fetched { summary } => format!("✅ {summary}"),
            EntryStatus::Failed { .. } => format!("❌ 讀取失敗: {}", self.url),
        }
    }

    pub fn is_fetched(&self) -> bool {
        matches!(self.status, EntryStatus::Fetched { .. })
    }
}

/// Everything a run produced
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunOutcome {
    /// One entry per selected link, newest first
    pub entries: Vec<RunEntry>,
    /// Indicator report followed by every fetched thread block
    pub scraped_text: String,
    pub indicator_report: Option<IndicatorReport>,
    pub indicator_error: Option<String>,
}

impl RunOutcome {
    pub fn fetched_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_fetched()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.entries.len() - self.fetched_count()
    }

    /// Nothing worth exporting or analyzing
    pub fn is_empty(&self) -> bool {
        self.scraped_text.trim().is_empty()
    }
}

/// Model output for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentReport {
    pub model: String,
    pub text: String,
}

/// Drives a single run against a thread source and an optional price service
pub struct PulseRun {
    source: Arc<dyn ThreadSource>,
    indicators: Option<IndicatorService>,
    config: Arc<PulseConfig>,
}

impl PulseRun {
    pub fn new(source: Arc<dyn ThreadSource>, config: Arc<PulseConfig>) -> Self {
        Self {
            source,
            indicators: None,
            config,
        }
    }

    /// Attach the indicator service used when a ticker is configured
    pub fn with_indicators(mut self, service: IndicatorService) -> Self {
        self.indicators = Some(service);
        self
    }

    pub fn config(&self) -> &PulseConfig {
        &self.config
    }

    /// Union of search results across all keywords
    ///
    /// A failed search is logged and contributes no links.
    pub async fn collect_links(&self) -> BTreeSet<String> {
        let mut links = BTreeSet::new();
        for keyword in &self.config.keywords {
            match self.source.search(keyword).await {
                Ok(found) => {
                    info!(%keyword, count = found.len(), "search finished");
                    links.extend(found);
                }
                Err(e) => warn!(%keyword, kind = e.kind(), error = %e, "search failed"),
            }
        }
        links
    }

    /// Run the scrape and, when configured, the indicator report
    #[instrument(skip(self), fields(keywords = %self.config.keyword_line()))]
    pub async fn run(&self) -> RunOutcome {
        let mut outcome = RunOutcome::default();

        if let (Some(ticker), Some(service)) = (&self.config.ticker, &self.indicators) {
            match service.report(ticker).await {
                Ok(report) => {
                    outcome.scraped_text.push_str(&report.text);
                    outcome.indicator_report = Some(report);
                }
                Err(e) => {
                    warn!(%ticker, kind = e.kind(), error = %e, "indicator report failed");
                    outcome.indicator_error = Some(e.to_string());
                }
            }
        }

        let links = select_links(self.collect_links().await, self.config.article_limit);
        if links.is_empty() {
            warn!("no threads found");
            return outcome;
        }
        info!(count = links.len(), "fetching threads");

        for url in links {
            let status = match self.source.fetch_thread(&url).await {
                Ok(record) => {
                    info!(%url, title = %record.title, "fetched");
                    outcome.scraped_text.push_str(&record.format_block());
                    EntryStatus::Fetched {
                        summary: record.summary_line(),
                    }
                }
                Err(e) => {
                    warn!(%url, kind = e.kind(), error = %e, "fetch failed");
                    EntryStatus::Failed {
                        kind: e.kind().to_string(),
                        reason: e.to_string(),
                    }
                }
            };
            outcome.entries.push(RunEntry { url, status });
        }

        info!(
            fetched = outcome.fetched_count(),
            failed = outcome.failed_count(),
            "run finished"
        );
        outcome
    }

    /// Send the run's text to the model with the sentiment prompt
    pub async fn analyze(&self, outcome: &RunOutcome, analyst: &Analyst) -> Result<SentimentReport> {
        if outcome.is_empty() {
            return Err(StockError::ConfigError("nothing to analyze: the run produced no text".to_string()));
        }

        let prompt = sentiment_prompt(
            &self.config.keyword_line(),
            &outcome.scraped_text,
            self.config.prompt_char_limit,
        )?;
        let (text, model) = analyst.call(&prompt).await?;
        info!(%model, chars = text.chars().count(), "analysis received");
        Ok(SentimentReport { model, text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockPriceHistory;
    use crate::forum::MockThreadSource;
    use crate::forum::thread::fixtures::{META, push, thread_page};
    use crate::forum::parse_thread;
    use crate::indicators::snapshot::fixtures::wave;
    use pulse_llm::{CompletionResponse, LLMError, LLMProvider};
    use std::collections::HashMap;

    const A: &str = "https://www.ptt.cc/bbs/Stock/M.1700000300.A.AAA.html";
    const B: &str = "https://www.ptt.cc/bbs/Stock/M.1700000200.A.BBB.html";
    const C: &str = "https://www.ptt.cc/bbs/Stock/M.1700000100.A.CCC.html";

    fn config(line: &str, limit: usize, ticker: Option<&str>) -> Arc<PulseConfig> {
        let mut builder = PulseConfig::builder().keywords(line).article_limit(limit);
        if let Some(ticker) = ticker {
            builder = builder.ticker(ticker);
        }
        Arc::new(builder.build().unwrap())
    }

    fn record(url: &str) -> crate::forum::ThreadRecord {
        let html = thread_page(&META, &[push("推", "u1", "衝", "1.2.3.4 01/01 10:00")], "內文");
        parse_thread(url, &html, None).unwrap()
    }

    fn source(search: HashMap<&'static str, Vec<&'static str>>, failing: &'static [&'static str]) -> MockThreadSource {
        let mut source = MockThreadSource::new();
        source.expect_search().returning(move |keyword| {
            Ok(search
                .get(keyword)
                .map(|links| links.iter().map(ToString::to_string).collect())
                .unwrap_or_default())
        });
        source.expect_fetch_thread().returning(move |url| {
            if failing.iter().any(|f| *f == url) {
                Err(StockError::fetch(url, "HTTP 404"))
            } else {
                Ok(record(url))
            }
        });
        source
    }

    #[tokio::test]
    async fn test_run_merges_keywords_and_keeps_newest() {
        let search = HashMap::from([("台積電", vec![C, A]), ("2330", vec![A, B])]);
        let run = PulseRun::new(Arc::new(source(search, &[])), config("台積電 2330", 2, None));

        let outcome = run.run().await;
        let urls: Vec<&str> = outcome.entries.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, vec![A, B]);
        assert_eq!(outcome.fetched_count(), 2);
        assert_eq!(outcome.scraped_text.matches("📄 標題:").count(), 2);
        assert!(outcome.indicator_report.is_none());
    }

    #[tokio::test]
    async fn test_failed_fetch_is_logged_and_skipped() {
        let search = HashMap::from([("2330", vec![A, B, C])]);
        let run = PulseRun::new(Arc::new(source(search, &[B])), config("2330", 5, None));

        let outcome = run.run().await;
        assert_eq!(outcome.entries.len(), 3);
        assert_eq!(outcome.failed_count(), 1);
        assert_eq!(outcome.entries[1].log_line(), format!("❌ 讀取失敗: {B}"));
        assert_eq!(
            outcome.entries[0].log_line(),
            "✅ [Mon Jan  1 09:00:00 2024] [標的] 2330 台積電 多"
        );
        assert!(matches!(
            &outcome.entries[1].status,
            EntryStatus::Failed { kind, .. } if kind == "fetch"
        ));
        assert_eq!(outcome.scraped_text.matches("📄 標題:").count(), 2);
    }

    #[tokio::test]
    async fn test_search_failure_contributes_nothing() {
        let mut source = MockThreadSource::new();
        source
            .expect_search()
            .returning(|_| Err(StockError::fetch("https://www.ptt.cc/bbs/Stock/search", "timeout")));
        source.expect_fetch_thread().never();

        let run = PulseRun::new(Arc::new(source), config("2330", 5, None));
        let outcome = run.run().await;
        assert!(outcome.entries.is_empty());
        assert!(outcome.is_empty());
    }

    #[tokio::test]
    async fn test_indicator_report_heads_the_text() {
        let search = HashMap::from([("2330", vec![A])]);
        let cfg = config("2330", 5, Some("2330"));
        let mut prices = MockPriceHistory::new();
        prices.expect_daily_bars().returning(|_, _| Ok(wave(40)));

        let run = PulseRun::new(Arc::new(source(search, &[])), cfg.clone())
            .with_indicators(IndicatorService::new(Arc::new(prices), cfg));
        let outcome = run.run().await;

        assert!(outcome.scraped_text.starts_with("📈 技術指標報告: 2330.TW"));
        assert!(outcome.scraped_text.contains("📄 標題:"));
        assert!(outcome.indicator_error.is_none());
    }

    #[tokio::test]
    async fn test_indicator_failure_keeps_articles() {
        let search = HashMap::from([("2330", vec![A])]);
        let cfg = config("2330", 5, Some("2330"));
        let mut prices = MockPriceHistory::new();
        prices.expect_daily_bars().returning(|_, _| Ok(wave(10)));

        let run = PulseRun::new(Arc::new(source(search, &[])), cfg.clone())
            .with_indicators(IndicatorService::new(Arc::new(prices), cfg));
        let outcome = run.run().await;

        assert!(outcome.indicator_report.is_none());
        assert!(outcome.indicator_error.as_deref().unwrap().contains("Insufficient data"));
        assert_eq!(outcome.fetched_count(), 1);
    }

    #[tokio::test]
    async fn test_each_run_starts_empty() {
        let search = HashMap::from([("2330", vec![A])]);
        let run = PulseRun::new(Arc::new(source(search, &[])), config("2330", 5, None));

        let first = run.run().await;
        let second = run.run().await;
        assert_eq!(first.scraped_text, second.scraped_text);
        assert_eq!(second.entries.len(), 1);
    }

    struct EchoProvider;

    #[async_trait::async_trait]
    impl LLMProvider for EchoProvider {
        async fn complete(&self, request: pulse_llm::CompletionRequest) -> pulse_llm::Result<CompletionResponse> {
            Ok(CompletionResponse {
                text: format!("{} chars", request.prompt.chars().count()),
                model: request.model,
                usage: None,
            })
        }

        async fn list_models(&self) -> pulse_llm::Result<Vec<String>> {
            Err(LLMError::ConfigurationError("offline".to_string()))
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn test_analyze_uses_prompt_and_reports_model() {
        let search = HashMap::from([("2330", vec![A])]);
        let run = PulseRun::new(Arc::new(source(search, &[])), config("2330", 5, None));
        let outcome = run.run().await;

        let analyst = Analyst::new(Arc::new(EchoProvider));
        let report = run.analyze(&outcome, &analyst).await.unwrap();
        assert_eq!(report.model, pulse_llm::DEFAULT_MODEL);
        assert!(report.text.ends_with("chars"));
    }

    #[tokio::test]
    async fn test_analyze_refuses_empty_run() {
        let run = PulseRun::new(Arc::new(MockThreadSource::new()), config("2330", 5, None));
        let analyst = Analyst::new(Arc::new(EchoProvider));
        let err = run.analyze(&RunOutcome::default(), &analyst).await.unwrap_err();
        assert_eq!(err.kind(), "config");
    }
}
