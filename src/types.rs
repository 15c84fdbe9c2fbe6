use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which feed(s) reported a paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSource {
    #[serde(rename = "alphaxiv")]
    AlphaXiv,
    #[serde(rename = "hf")]
    HuggingFace,
    #[serde(rename = "both")]
    Both,
}

/// One paper as reported by a single feed, before merging.
///
/// `published_on` stays a string at this stage: the feeds disagree on
/// timestamp formats, so it is parsed lazily when the date filter needs an
/// absolute time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawPaper {
    pub arxiv_id: String,
    pub title: String,
    pub abstract_text: String,
    pub published_on: String,
    pub votes: Option<i64>,
}

/// A paper after the merge, carrying both feeds' signals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedPaper {
    pub arxiv_id: String,
    pub title: String,
    pub abstract_text: String,
    pub published_on: String,
    /// 2 when both feeds reported the paper, otherwise 1.
    pub score: u8,
    /// Zero-based position in the AlphaXiv feed ordering at fetch time.
    pub alphaxiv_rank: Option<usize>,
    /// Zero-based position across the concatenated HuggingFace days.
    pub hf_rank: Option<usize>,
    pub source: PaperSource,
}

impl RankedPaper {
    /// Mean of the per-feed ranks that are present; infinity when neither is.
    /// Used only as a tie-break below `score`.
    pub fn average_rank(&self) -> f64 {
        let ranks: Vec<f64> = [self.alphaxiv_rank, self.hf_rank]
            .iter()
            .flatten()
            .map(|&r| r as f64)
            .collect();
        if ranks.is_empty() {
            f64::INFINITY
        } else {
            ranks.iter().sum::<f64>() / ranks.len() as f64
        }
    }
}

/// One row of the ranking core's output table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperRow {
    pub arxiv: String,
    pub title: String,
    pub abstract_text: String,
    pub published_on: DateTime<Utc>,
    pub score: u8,
    pub alphaxiv_rank: Option<usize>,
    pub hf_rank: Option<usize>,
    pub average_rank: f64,
}

/// History-store record for a paper that was posted successfully.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostedPaper {
    pub arxiv_id: String,
    pub tweet_id: i64,
    pub tweet_url: String,
    pub title: String,
    pub published_on: DateTime<Utc>,
    pub run_id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{feed} feed error: {message}")]
    Feed { feed: &'static str, message: String },

    #[error("Malformed arxiv identifier: {raw:?}")]
    MalformedId { raw: String },

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Summary still {length} characters after {attempts} attempts (budget {budget})")]
    SummaryTooLong {
        length: usize,
        attempts: u32,
        budget: usize,
    },

    #[error("Twitter error: {0}")]
    Twitter(String),
}

pub type Result<T> = std::result::Result<T, BotError>;
