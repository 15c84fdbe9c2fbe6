//! HuggingFace daily-papers feed adapter.
//!
//! The endpoint takes a literal calendar date and returns that day's
//! curated list, so the adapter walks one day at a time going backward from
//! today. A day that exhausts its retries is skipped, not fatal: one bad day
//! must not blank the whole window.

use chrono::{Duration, Utc};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::HuggingFaceConfig;
use crate::retry::{default_class, retry, RetryPolicy};
use crate::sources::{extract_str, pace};
use crate::types::{BotError, RawPaper, Result};
use crate::utils::sanitize_arxiv_id;

pub struct HuggingFaceFeed {
    client: reqwest::Client,
    config: HuggingFaceConfig,
}

impl HuggingFaceFeed {
    pub fn new(config: HuggingFaceConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("arxiv-trends/0.1")
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    /// Fetch the configured number of calendar days, concatenated in
    /// day-then-within-day order. The position in the returned list is the
    /// paper's HuggingFace rank.
    pub async fn fetch(&self) -> Result<Vec<RawPaper>> {
        let today = Utc::now().date_naive();
        let mut all_papers = Vec::new();
        let mut skipped_ids = 0usize;

        info!(
            "Fetching HuggingFace papers (last {} days)",
            self.config.lookback_days
        );

        for offset in 0..self.config.lookback_days {
            let date = (today - Duration::days(offset)).format("%Y-%m-%d").to_string();
            match self.fetch_day(&date).await {
                Ok((papers, skipped)) => {
                    debug!("Fetched {} papers from HF for {}", papers.len(), date);
                    all_papers.extend(papers);
                    skipped_ids += skipped;
                    pace().await;
                }
                Err(err) => {
                    error!("Could not fetch HF papers for {}, continuing: {}", date, err);
                    continue;
                }
            }
        }

        if skipped_ids > 0 {
            warn!(
                "Skipped {} HuggingFace records with unusable identifiers",
                skipped_ids
            );
        }
        info!("Total HuggingFace papers fetched: {}", all_papers.len());

        Ok(all_papers)
    }

    async fn fetch_day(&self, date: &str) -> Result<(Vec<RawPaper>, usize)> {
        let policy = RetryPolicy::exponential(
            self.config.max_retries,
            self.config.retry_delay,
            self.config.retry_delay * 32,
        );

        retry(&policy, "HuggingFace day fetch", default_class, || async {
            let response = self
                .client
                .get(&self.config.base_url)
                .query(&[("date", date)])
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(BotError::Feed {
                    feed: "HuggingFace",
                    message: format!("HTTP {} for {}", status, date),
                });
            }

            let records: Vec<Value> = response.json().await?;

            let mut papers = Vec::with_capacity(records.len());
            let mut skipped = 0usize;
            for record in &records {
                match adapt_record(record) {
                    Ok(paper) => papers.push(paper),
                    Err(BotError::MalformedId { raw }) => {
                        debug!("Dropping HF record with identifier {:?}", raw);
                        skipped += 1;
                    }
                    Err(other) => return Err(other),
                }
            }

            Ok((papers, skipped))
        })
        .await
    }
}

/// Map one daily-papers record into a [`RawPaper`]. The interesting fields
/// usually sit under a nested `paper` object; `publishedAt` sometimes only
/// exists at the top level. This feed carries no vote signal, its scoring
/// contribution is presence alone.
fn adapt_record(record: &Value) -> Result<RawPaper> {
    let raw_id = extract_str(record, &["id"], &["paper"]).ok_or(BotError::MalformedId {
        raw: String::new(),
    })?;
    let arxiv_id = sanitize_arxiv_id(&raw_id)?;

    Ok(RawPaper {
        arxiv_id,
        title: extract_str(record, &["title"], &["paper"]).unwrap_or_default(),
        abstract_text: extract_str(record, &["summary"], &["paper"]).unwrap_or_default(),
        published_on: extract_str(record, &["publishedAt"], &["paper"]).unwrap_or_default(),
        votes: None,
    })
}
