use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use arxiv_trends::figures::NoFigures;
use arxiv_trends::llm::ScriptedSummarizer;
use arxiv_trends::pipeline::Bot;
use arxiv_trends::sources::{AbstractSource, StaticSource};
use arxiv_trends::store::{History, MemoryHistory};
use arxiv_trends::twitter::RecordingPublisher;
use arxiv_trends::types::{PaperRow, PostedPaper};
use arxiv_trends::{
    AlphaXivConfig, AlphaXivFeed, BotConfig, HuggingFaceConfig, HuggingFaceFeed, RankedFeedSource,
};

fn row(arxiv: &str, score: u8) -> PaperRow {
    PaperRow {
        arxiv: arxiv.to_string(),
        title: format!("Paper {}", arxiv),
        abstract_text: "An abstract worth summarizing".to_string(),
        published_on: Utc::now() - Duration::hours(30),
        score,
        alphaxiv_rank: Some(0),
        hf_rank: None,
        average_rank: 0.0,
    }
}

fn posted(arxiv_id: &str) -> PostedPaper {
    PostedPaper {
        arxiv_id: arxiv_id.to_string(),
        tweet_id: 1,
        tweet_url: "https://twitter.com/user/status/1".to_string(),
        title: "Already posted".to_string(),
        published_on: Utc::now(),
        run_id: Uuid::new_v4(),
    }
}

fn bot_with(
    rows: Vec<PaperRow>,
    considered: usize,
    summarizer: Arc<ScriptedSummarizer>,
    publisher: Arc<RecordingPublisher>,
    history: Arc<MemoryHistory>,
) -> Bot {
    Bot::new(
        Arc::new(StaticSource { rows, considered }),
        summarizer,
        Arc::new(NoFigures),
        publisher,
        history,
        BotConfig::default(),
    )
}

#[tokio::test]
async fn fully_posted_history_means_zero_enrichment_calls() {
    let _ = tracing_subscriber::fmt().try_init();

    let summarizer = Arc::new(ScriptedSummarizer::new("A short summary"));
    let publisher = Arc::new(RecordingPublisher::new());
    let history = Arc::new(MemoryHistory::new());
    history.seed(posted("2411.11111")).await;
    history.seed(posted("2411.22222")).await;

    let rows = vec![row("2411.11111", 2), row("2411.22222", 1)];
    let bot = bot_with(rows, 10, summarizer.clone(), publisher.clone(), history);

    let report = bot.run().await.unwrap();

    assert_eq!(report.selected, 0);
    assert_eq!(report.posted, 0);
    assert_eq!(summarizer.calls(), 0, "no enrichment for posted papers");
    assert!(publisher.sent().is_empty(), "not even a lead tweet");
}

#[tokio::test]
async fn posts_a_thread_and_records_history() {
    let _ = tracing_subscriber::fmt().try_init();

    let summarizer = Arc::new(ScriptedSummarizer::new("A short summary"));
    let publisher = Arc::new(RecordingPublisher::new());
    let history = Arc::new(MemoryHistory::new());
    // One candidate was posted in an earlier run and must be skipped.
    history.seed(posted("2411.00999")).await;

    let rows = vec![row("2411.00999", 2), row("2411.11111", 2), row("2411.22222", 1)];
    let bot = bot_with(
        rows,
        42,
        summarizer.clone(),
        publisher.clone(),
        history.clone(),
    );

    let report = bot.run().await.unwrap();

    assert_eq!(report.considered, 42);
    assert_eq!(report.selected, 2);
    assert_eq!(report.posted, 2);
    assert_eq!(summarizer.calls(), 2);

    let sent = publisher.sent();
    assert_eq!(sent.len(), 3, "lead tweet plus one reply per paper");

    let lead = &sent[0];
    assert!(lead.in_reply_to.is_none());
    assert!(lead.text.contains("42 abstracts"));
    assert!(lead.text.contains("selected 2"));

    for reply in &sent[1..] {
        assert_eq!(reply.in_reply_to, Some(lead.id));
        assert!(reply.text.contains("https://arxiv.org/abs/"));
        assert!(reply.text.contains("A short summary"));
    }

    assert!(history.contains("2411.11111").await.unwrap());
    assert!(history.contains("2411.22222").await.unwrap());
    let recorded = history.get("2411.11111").await.unwrap().unwrap();
    assert_eq!(recorded.run_id, report.run_id);
}

#[tokio::test]
async fn empty_window_is_a_quiet_no_op() {
    let _ = tracing_subscriber::fmt().try_init();

    let summarizer = Arc::new(ScriptedSummarizer::new("unused"));
    let publisher = Arc::new(RecordingPublisher::new());
    let history = Arc::new(MemoryHistory::new());

    let bot = bot_with(Vec::new(), 0, summarizer.clone(), publisher.clone(), history);
    let report = bot.run().await.unwrap();

    assert_eq!(report.selected, 0);
    assert_eq!(report.posted, 0);
    assert!(publisher.sent().is_empty());
    assert_eq!(summarizer.calls(), 0);
}

/// A degenerate window short-circuits before any feed is contacted: the feed
/// endpoints here point at an unroutable address, so any network attempt
/// would surface as an error instead of an empty table.
#[tokio::test]
async fn degenerate_window_returns_empty_without_network_calls() {
    let alphaxiv_config = AlphaXivConfig {
        base_url: "http://127.0.0.1:1/feed".to_string(),
        max_retries: 1,
        ..AlphaXivConfig::default()
    };
    let hf_config = HuggingFaceConfig {
        base_url: "http://127.0.0.1:1/daily_papers".to_string(),
        max_retries: 1,
        ..HuggingFaceConfig::default()
    };

    let source = RankedFeedSource::new(
        AlphaXivFeed::new(alphaxiv_config),
        HuggingFaceFeed::new(hf_config),
    );

    let now: DateTime<Utc> = Utc::now();
    let (rows, considered) = source.get_all_abstracts(now, now).await.unwrap();

    assert!(rows.is_empty());
    assert_eq!(considered, 0);
}
