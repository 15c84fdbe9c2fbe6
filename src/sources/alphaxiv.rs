//! AlphaXiv "Hot" feed adapter.
//!
//! Paginates the vote-ranked feed, maps each record into a [`RawPaper`] and
//! keeps only the top slice of the vote distribution.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::AlphaXivConfig;
use crate::retry::{default_class, retry, RetryPolicy};
use crate::sources::{extract_str, pace};
use crate::types::{BotError, RawPaper, Result};
use crate::utils::{parse_publication_date, percentile, sanitize_arxiv_id};

pub struct AlphaXivFeed {
    client: reqwest::Client,
    config: AlphaXivConfig,
}

impl AlphaXivFeed {
    pub fn new(config: AlphaXivConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("arxiv-trends/0.1")
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    /// Fetch the vote-filtered candidate list. When both window bounds are
    /// given, the accumulated pages are narrowed to the window before the
    /// percentile threshold is computed. Returns the kept papers plus the
    /// number of candidates considered before the percentile filter.
    pub async fn fetch(
        &self,
        after: Option<DateTime<Utc>>,
        before: Option<DateTime<Utc>>,
    ) -> Result<(Vec<RawPaper>, usize)> {
        let max_pages = self.config.max_papers.div_ceil(self.config.page_size);
        let mut all_papers: Vec<RawPaper> = Vec::new();
        let mut skipped_ids = 0usize;
        let mut page_num = 0usize;

        info!(
            "Fetching alphaXiv papers (last {} days, max {}, top percentile {})",
            self.config.lookback_days, self.config.max_papers, self.config.top_percentile
        );

        while all_papers.len() < self.config.max_papers {
            let (papers, skipped) = self.fetch_page(page_num).await?;

            if papers.is_empty() {
                info!("No more papers from alphaXiv at page {}", page_num);
                break;
            }

            skipped_ids += skipped;
            all_papers.extend(papers);
            debug!("Fetched page {} (total {})", page_num, all_papers.len());

            page_num += 1;
            if page_num >= max_pages {
                break;
            }
            pace().await;
        }

        if skipped_ids > 0 {
            warn!("Skipped {} alphaXiv records with unusable identifiers", skipped_ids);
        }

        let windowed: Vec<RawPaper> = match (after, before) {
            (Some(after), Some(before)) => all_papers
                .into_iter()
                .filter(|p| match parse_publication_date(&p.published_on) {
                    Some(published) => after <= published && published <= before,
                    None => false,
                })
                .collect(),
            _ => all_papers,
        };

        let candidates: Vec<RawPaper> =
            windowed.into_iter().filter(|p| p.votes.is_some()).collect();

        if candidates.is_empty() {
            info!("No papers with vote data from alphaXiv");
            return Ok((Vec::new(), 0));
        }

        let considered = candidates.len();
        let votes: Vec<f64> = candidates
            .iter()
            .filter_map(|p| p.votes)
            .map(|v| v as f64)
            .collect();
        let threshold = percentile(&votes, self.config.top_percentile);

        let kept: Vec<RawPaper> = candidates
            .into_iter()
            .filter(|p| p.votes.map(|v| v as f64 >= threshold).unwrap_or(false))
            .take(self.config.max_papers)
            .collect();

        info!(
            "Kept {} of {} alphaXiv papers with votes >= {:.1}",
            kept.len(),
            considered,
            threshold
        );

        Ok((kept, considered))
    }

    /// One page of the feed, retried with capped exponential backoff on
    /// transient failures. Non-retryable failures propagate unchanged.
    async fn fetch_page(&self, page_num: usize) -> Result<(Vec<RawPaper>, usize)> {
        let policy = RetryPolicy::exponential(
            self.config.max_retries,
            self.config.retry_delay,
            self.config.retry_delay * 32,
        );

        retry(&policy, "alphaXiv page fetch", default_class, || async {
            let response = self
                .client
                .get(&self.config.base_url)
                .query(&[
                    ("pageNum", page_num.to_string()),
                    ("sort", "Hot".to_string()),
                    ("pageSize", self.config.page_size.to_string()),
                    ("interval", format!("{} Days", self.config.lookback_days)),
                    ("topics", "[]".to_string()),
                ])
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(BotError::Feed {
                    feed: "alphaXiv",
                    message: format!("HTTP {} on page {}", status, page_num),
                });
            }

            let body: Value = response.json().await?;
            let records = body
                .get("papers")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            let mut papers = Vec::with_capacity(records.len());
            let mut skipped = 0usize;
            for record in &records {
                match adapt_record(record) {
                    Ok(paper) => papers.push(paper),
                    Err(BotError::MalformedId { raw }) => {
                        debug!("Dropping alphaXiv record with identifier {:?}", raw);
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

/// Map one raw feed record into a [`RawPaper`]. Records may nest their
/// fields under a `paper` object and use either of two date field names.
fn adapt_record(record: &Value) -> Result<RawPaper> {
    let raw_id = extract_str(record, &["universal_paper_id", "id"], &["paper"]).ok_or(
        BotError::MalformedId {
            raw: String::new(),
        },
    )?;
    let arxiv_id = sanitize_arxiv_id(&raw_id)?;

    let votes = record
        .get("metrics")
        .and_then(|m| m.get("public_total_votes"))
        .and_then(Value::as_i64);

    Ok(RawPaper {
        arxiv_id,
        title: extract_str(record, &["title"], &["paper"]).unwrap_or_default(),
        abstract_text: extract_str(record, &["abstract"], &["paper"]).unwrap_or_default(),
        published_on: extract_str(record, &["publication_date", "publishedAt"], &["paper"])
            .unwrap_or_default(),
        votes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn adapts_flat_record_with_votes() {
        let record = json!({
            "universal_paper_id": "2411.12345v2",
            "title": "Test Paper",
            "abstract": "An abstract",
            "publication_date": "2025-11-13T00:00:00.000Z",
            "metrics": {"public_total_votes": 17},
        });

        let paper = adapt_record(&record).unwrap();
        assert_eq!(paper.arxiv_id, "2411.12345");
        assert_eq!(paper.votes, Some(17));
    }

    #[test]
    fn adapts_nested_record_without_metrics() {
        let record = json!({
            "paper": {"id": "2411.67890", "title": "Nested", "abstract": "A"},
        });

        let paper = adapt_record(&record).unwrap();
        assert_eq!(paper.arxiv_id, "2411.67890");
        assert_eq!(paper.votes, None);
        assert!(paper.published_on.is_empty());
    }

    #[test]
    fn rejects_unusable_identifier() {
        let record = json!({"id": "not-an-id", "title": "Bad"});
        assert!(matches!(
            adapt_record(&record),
            Err(BotError::MalformedId { .. })
        ));
    }
}
