use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::env;
use std::sync::Arc;
use tracing::{error, info};

use arxiv_trends::{
    AlphaXivConfig, AlphaXivFeed, ArxivApiSource, ArxivConfig, Bot, BotConfig, ChatSummarizer,
    HuggingFaceConfig, HuggingFaceFeed, LlmConfig, PdfFigureExtractor, PostgresHistory,
    RankedFeedSource, TwitterClient, TwitterConfig,
};
use arxiv_trends::sources::AbstractSource;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SourceKind {
    /// AlphaXiv and HuggingFace feeds, merged and scored.
    Ranked,
    /// The arXiv Atom API, presence only.
    Arxiv,
}

#[derive(Debug, Parser)]
#[command(name = "arxiv-trends", about = "Summarize trending arXiv papers as a tweet thread")]
struct Cli {
    /// Hours before now at which the candidate window opens.
    #[arg(long, default_value_t = 48)]
    window_start: i64,

    /// Hours before now at which the candidate window closes.
    #[arg(long, default_value_t = 24)]
    window_stop: i64,

    /// How many papers to summarize and post.
    #[arg(long, default_value_t = 3)]
    papers: usize,

    /// Which abstract source to use.
    #[arg(long, value_enum, default_value = "ranked")]
    source: SourceKind,

    /// Print the candidate table instead of posting.
    #[arg(long)]
    dry_run: bool,
}

/// Hide credentials before a connection string reaches the logs.
fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("***"));
            }
            parsed.to_string()
        }
        Err(_) => "<unparseable url>".to_string(),
    }
}

fn build_source(kind: SourceKind) -> Arc<dyn AbstractSource> {
    match kind {
        SourceKind::Ranked => Arc::new(RankedFeedSource::new(
            AlphaXivFeed::new(AlphaXivConfig::default()),
            HuggingFaceFeed::new(HuggingFaceConfig::default()),
        )),
        SourceKind::Arxiv => Arc::new(ArxivApiSource::new(ArxivConfig::default())),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = BotConfig {
        window_start_hours: cli.window_start,
        window_stop_hours: cli.window_stop,
        papers_to_summarize: cli.papers,
    };

    let source = build_source(cli.source);

    if cli.dry_run {
        let now = chrono::Utc::now();
        let after = now - chrono::Duration::hours(config.window_start_hours);
        let before = now - chrono::Duration::hours(config.window_stop_hours);
        let (rows, considered) = source.get_all_abstracts(after, before).await?;

        info!("Considered {} papers, {} in window", considered, rows.len());
        for row in &rows {
            println!(
                "{}  score={}  avg_rank={:<8}  {}",
                row.arxiv,
                row.score,
                format!("{:.1}", row.average_rank),
                row.title
            );
        }
        return Ok(());
    }

    let database_url = env::var("DATABASE_URL")
        .context("DATABASE_URL must point at the history store")?;
    let llm_api_key = env::var("OPENAI_API_KEY").context("OPENAI_API_KEY is required")?;
    let twitter_token =
        env::var("TWITTER_BEARER_TOKEN").context("TWITTER_BEARER_TOKEN is required")?;

    info!("Connecting to history store at {}", redact_url(&database_url));
    let history = PostgresHistory::new(&database_url).await.map_err(|err| {
        error!("Failed to connect to the history store: {}", err);
        anyhow::anyhow!(err)
    })?;

    let workdir = env::temp_dir().join("arxiv-trends");
    tokio::fs::create_dir_all(&workdir).await?;

    let bot = Bot::new(
        source,
        Arc::new(ChatSummarizer::new(LlmConfig::default(), llm_api_key)),
        Arc::new(PdfFigureExtractor::new(ArxivConfig::default(), workdir)),
        Arc::new(TwitterClient::new(TwitterConfig::default(), twitter_token)),
        Arc::new(history),
        config,
    );

    let report = bot.run().await?;
    info!(
        "Run {} complete: considered {}, selected {}, posted {}",
        report.run_id, report.considered, report.selected, report.posted
    );

    Ok(())
}
