use std::time::Duration;

/// AlphaXiv "Hot" feed settings.
#[derive(Debug, Clone)]
pub struct AlphaXivConfig {
    pub base_url: String,
    pub page_size: usize,
    pub max_papers: usize,
    /// Percentile of the vote distribution a paper must reach to be kept.
    pub top_percentile: f64,
    /// Server-side interval requested from the feed, independent of the
    /// caller's window width.
    pub lookback_days: i64,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,
}

impl Default for AlphaXivConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.alphaxiv.org/papers/v3/feed".to_string(),
            page_size: 20,
            max_papers: 100,
            top_percentile: 66.0,
            lookback_days: 7,
            max_retries: 5,
            retry_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
        }
    }
}

/// HuggingFace daily-papers feed settings.
#[derive(Debug, Clone)]
pub struct HuggingFaceConfig {
    pub base_url: String,
    /// How many calendar days to walk backward from today. The feed has no
    /// server-side date filter, so the later window filter narrows down.
    pub lookback_days: i64,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://huggingface.co/api/daily_papers".to_string(),
            lookback_days: 7,
            max_retries: 5,
            retry_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
        }
    }
}

/// arXiv Atom API settings (the alternative abstract source).
#[derive(Debug, Clone)]
pub struct ArxivConfig {
    pub query_url: String,
    pub pdf_base_url: String,
    /// Category filter applied to the search query.
    pub categories: Vec<String>,
    pub page_size: usize,
    pub max_pages: usize,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            query_url: "https://export.arxiv.org/api/query".to_string(),
            pdf_base_url: "https://export.arxiv.org/pdf".to_string(),
            categories: ["cs.CV", "cs.LG", "cs.CL", "cs.AI", "cs.NE", "cs.RO"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            page_size: 100,
            max_pages: 10,
            max_retries: 5,
            retry_delay: Duration::from_secs(3),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Chat-completion API settings for summarization.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    /// How many times to re-prompt before giving up on an over-length summary.
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,
    pub tweet_max: usize,
    /// Characters reserved for the arxiv URL and the separating space.
    pub url_reserve: usize,
}

impl LlmConfig {
    /// Character budget left for the summary itself.
    pub fn text_budget(&self) -> usize {
        self.tweet_max.saturating_sub(self.url_reserve)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_attempts: 10,
            retry_delay: Duration::from_secs(5),
            timeout: Duration::from_secs(60),
            tweet_max: 280,
            url_reserve: 34,
        }
    }
}

/// Twitter API v2 settings.
#[derive(Debug, Clone)]
pub struct TwitterConfig {
    pub api_base: String,
    pub upload_url: String,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub timeout: Duration,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.twitter.com/2".to_string(),
            upload_url: "https://upload.twitter.com/1.1/media/upload.json".to_string(),
            max_retries: 5,
            retry_delay: Duration::from_secs(10),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Run-level settings for one bot invocation.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Window opens this many hours before now.
    pub window_start_hours: i64,
    /// Window closes this many hours before now, leaving time for the feeds
    /// to accumulate popularity signals.
    pub window_stop_hours: i64,
    pub papers_to_summarize: usize,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            window_start_hours: 48,
            window_stop_hours: 24,
            papers_to_summarize: 3,
        }
    }
}
