//! Command-line interface for ptt-pulse

use anyhow::{Context, bail};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use comfy_table::Table;
use pulse_llm::{Analyst, ModelPreference};
use pulse_llm::providers::GeminiProvider;
use pulse_stock::{
    EntryStatus, ExportArtifact, ForumClient, IndicatorService, PulseConfig, PulseRun, RunOutcome,
    YahooFinanceClient,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "ptt-pulse")]
#[command(about = "PTT Stock-board sentiment and technical pulse", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scrape matching threads and write the text export
    Scrape(ScrapeArgs),
    /// Print the technical indicator report for a ticker
    Indicators {
        /// Ticker, with or without the market suffix
        #[arg(short, long)]
        ticker: String,
        /// Print the snapshot as JSON instead of the text report
        #[arg(long)]
        json: bool,
    },
    /// Scrape, then ask the model for a sentiment report
    Analyze {
        #[command(flatten)]
        scrape: ScrapeArgs,
        /// Gemini API key; falls back to GEMINI_API_KEY
        #[arg(long)]
        api_key: Option<String>,
        /// Try this model before the built-in tiers
        #[arg(long)]
        model: Option<String>,
    },
}

#[derive(Args, Debug)]
struct ScrapeArgs {
    /// Space-separated search keywords
    #[arg(short, long)]
    keywords: String,
    /// Number of newest threads to fetch (1-50)
    #[arg(short, long)]
    limit: Option<usize>,
    /// Prepend the indicator report for this ticker
    #[arg(short, long)]
    ticker: Option<String>,
    /// Directory for the export file
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,
    /// Prefix the export with a UTF-8 BOM
    #[arg(long)]
    bom: bool,
}

impl ScrapeArgs {
    /// Flags win over the environment
    fn config(&self) -> anyhow::Result<Arc<PulseConfig>> {
        let mut config = PulseConfig::builder()
            .keywords(&self.keywords)
            .write_bom(self.bom)
            .build()?
            .with_env()?;
        if let Some(limit) = self.limit {
            config.article_limit = limit;
        }
        if let Some(ticker) = self.ticker.as_deref().filter(|t| !t.trim().is_empty()) {
            config.ticker = Some(ticker.trim().to_string());
        }
        config.validate()?;
        Ok(Arc::new(config))
    }
}

fn build_run(config: Arc<PulseConfig>) -> anyhow::Result<PulseRun> {
    let forum = ForumClient::new(config.clone())?;
    let prices = IndicatorService::new(Arc::new(YahooFinanceClient::new()), config.clone());
    Ok(PulseRun::new(Arc::new(forum), config).with_indicators(prices))
}

fn print_outcome(outcome: &RunOutcome) {
    if let Some(error) = &outcome.indicator_error {
        println!("⚠️ 技術指標失敗: {error}");
    }
    if outcome.entries.is_empty() {
        println!("❌ 找不到相關文章");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["", "文章", "網址"]);
    for entry in &outcome.entries {
        let (mark, label) = match &entry.status {
            EntryStatus::Fetched { summary } => ("✅", summary.clone()),
            EntryStatus::Failed { kind, .. } => ("❌", format!("讀取失敗 ({kind})")),
        };
        table.add_row(vec![mark.to_string(), label, entry.url.clone()]);
    }
    println!("{table}");
    println!(
        "找到 {} 篇，成功 {} 篇",
        outcome.entries.len(),
        outcome.fetched_count()
    );
}

async fn scrape(args: &ScrapeArgs) -> anyhow::Result<(PulseRun, RunOutcome)> {
    let config = args.config()?;
    let run = build_run(config.clone())?;
    let outcome = run.run().await;
    print_outcome(&outcome);

    if !outcome.is_empty() {
        let artifact = ExportArtifact::from_outcome(&outcome, &config, Local::now());
        let path = artifact.write_to(&args.output_dir).await?;
        println!("📥 已儲存: {}", path.display());
    }
    Ok((run, outcome))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pulse_utils::init_tracing();

    let cli = Cli::parse();
    info!("Starting ptt-pulse");

    match cli.command {
        Commands::Scrape(args) => {
            scrape(&args).await?;
        }
        Commands::Indicators { ticker, json } => {
            let config = Arc::new(PulseConfig::for_ticker(&ticker)?);
            let service = IndicatorService::new(Arc::new(YahooFinanceClient::new()), config);
            let report = service.report(&ticker).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report.snapshot)?);
            } else {
                print!("{}", report.text);
            }
        }
        Commands::Analyze {
            scrape: args,
            api_key,
            model,
        } => {
            let api_key = api_key
                .or_else(|| std::env::var("GEMINI_API_KEY").ok())
                .filter(|key| !key.trim().is_empty())
                .context("Gemini API key missing: pass --api-key or set GEMINI_API_KEY")?;

            let (run, outcome) = scrape(&args).await?;
            if outcome.is_empty() {
                bail!("nothing to analyze");
            }

            let mut analyst = Analyst::new(Arc::new(GeminiProvider::new(api_key)?));
            if let Some(model) = model {
                analyst = analyst.with_preference(ModelPreference::default().prefer(model));
            }
            let report = run.analyze(&outcome, &analyst).await?;
            println!("\n📊 分析報告 (使用模型: {})\n", report.model);
            println!("{}", report.text);
        }
    }

    Ok(())
}
