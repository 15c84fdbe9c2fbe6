//! arXiv export API integration.
//!
//! Two concerns live here: an alternative [`AbstractSource`] backed by the
//! arXiv Atom query API (no popularity signal, presence only), and the PDF
//! download used by figure extraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::ArxivConfig;
use crate::retry::{default_class, retry, RetryPolicy};
use crate::sources::{pace, AbstractSource};
use crate::types::{BotError, PaperRow, Result};
use crate::utils::{sanitize_abstract, sanitize_arxiv_id};

pub struct ArxivApiSource {
    client: reqwest::Client,
    config: ArxivConfig,
}

impl ArxivApiSource {
    pub fn new(config: ArxivConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("arxiv-trends/0.1")
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    fn search_query(&self, after: DateTime<Utc>, before: DateTime<Utc>) -> String {
        let categories = self
            .config
            .categories
            .iter()
            .map(|c| format!("cat:{}", c))
            .collect::<Vec<_>>()
            .join(" OR ");
        format!(
            "({}) AND submittedDate:[{} TO {}]",
            categories,
            after.format("%Y%m%d%H%M"),
            before.format("%Y%m%d%H%M"),
        )
    }

    /// One page of Atom results, retried on transient failures.
    async fn fetch_page(&self, query: &str, start: usize) -> Result<Vec<PaperRow>> {
        let policy = RetryPolicy::exponential(
            self.config.max_retries,
            self.config.retry_delay,
            self.config.retry_delay * 32,
        );

        retry(&policy, "arXiv page fetch", default_class, || async {
            let response = self
                .client
                .get(&self.config.query_url)
                .query(&[
                    ("search_query", query),
                    ("start", &start.to_string()),
                    ("max_results", &self.config.page_size.to_string()),
                    ("sortBy", "submittedDate"),
                    ("sortOrder", "descending"),
                ])
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(BotError::Feed {
                    feed: "arXiv",
                    message: format!("HTTP {} at offset {}", status, start),
                });
            }

            let body = response.bytes().await?;
            let feed = feed_rs::parser::parse(body.as_ref()).map_err(|err| BotError::Feed {
                feed: "arXiv",
                message: format!("Atom parse failure: {}", err),
            })?;

            let mut rows = Vec::with_capacity(feed.entries.len());
            let mut skipped = 0usize;
            for entry in feed.entries {
                // Entry ids look like http://arxiv.org/abs/2303.11177v1
                let raw_id = entry.id.rsplit('/').next().unwrap_or(&entry.id);
                let arxiv = match sanitize_arxiv_id(raw_id) {
                    Ok(id) => id,
                    Err(_) => {
                        skipped += 1;
                        continue;
                    }
                };
                let published = match entry.published {
                    Some(ts) => ts,
                    None => {
                        debug!("arXiv entry {} has no published date, dropping", arxiv);
                        continue;
                    }
                };

                rows.push(PaperRow {
                    arxiv,
                    title: entry
                        .title
                        .map(|t| sanitize_abstract(&t.content))
                        .unwrap_or_default(),
                    abstract_text: entry
                        .summary
                        .map(|t| sanitize_abstract(&t.content))
                        .unwrap_or_default(),
                    published_on: published,
                    score: 1,
                    alphaxiv_rank: None,
                    hf_rank: None,
                    average_rank: f64::INFINITY,
                });
            }

            if skipped > 0 {
                warn!("Skipped {} arXiv entries with unusable identifiers", skipped);
            }
            Ok(rows)
        })
        .await
    }
}

#[async_trait]
impl AbstractSource for ArxivApiSource {
    fn source_name(&self) -> &'static str {
        "arxiv"
    }

    async fn get_all_abstracts(
        &self,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<(Vec<PaperRow>, usize)> {
        if after >= before {
            info!("Invalid time window, returning empty table");
            return Ok((Vec::new(), 0));
        }

        let query = self.search_query(after, before);
        let mut rows: Vec<PaperRow> = Vec::new();

        for page in 0..self.config.max_pages {
            let start = page * self.config.page_size;
            let page_rows = self.fetch_page(&query, start).await?;
            if page_rows.is_empty() {
                break;
            }
            let full_page = page_rows.len() == self.config.page_size;
            rows.extend(page_rows);
            if !full_page {
                break;
            }
            pace().await;
        }

        // The server already applies the submittedDate range; re-check the
        // inclusive bounds anyway so the table honors the window contract.
        rows.retain(|row| after <= row.published_on && row.published_on <= before);

        info!("Fetched {} abstracts from arXiv", rows.len());
        let considered = rows.len();
        Ok((rows, considered))
    }
}

/// Download the paper PDF into `dir`, returning the local path. Responses
/// that are HTML (arXiv's "paper unavailable" pages come back with HTTP 200)
/// are rejected.
pub async fn download_pdf(
    client: &reqwest::Client,
    config: &ArxivConfig,
    arxiv_id: &str,
    dir: &Path,
) -> Result<PathBuf> {
    let pdf_url = format!("{}/{}.pdf", config.pdf_base_url, arxiv_id);
    let pdf_path = dir.join(format!("{}.pdf", arxiv_id));
    if pdf_path.is_file() {
        return Ok(pdf_path);
    }

    let policy = RetryPolicy::exponential(config.max_retries, config.retry_delay, config.retry_delay * 8);
    let bytes = retry(&policy, "arXiv PDF download", default_class, || async {
        let response = client.get(&pdf_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BotError::Feed {
                feed: "arXiv",
                message: format!("HTTP {} for {}", status, pdf_url),
            });
        }
        let bytes = response.bytes().await?;
        if looks_like_html(&bytes) {
            return Err(BotError::Feed {
                feed: "arXiv",
                message: format!("Got HTML instead of PDF for {}", pdf_url),
            });
        }
        Ok(bytes)
    })
    .await?;

    tokio::fs::write(&pdf_path, &bytes).await?;
    debug!("Downloaded PDF for {} to {}", arxiv_id, pdf_path.display());
    Ok(pdf_path)
}

fn looks_like_html(body: &[u8]) -> bool {
    body.iter()
        .skip_while(|byte| byte.is_ascii_whitespace())
        .take(6)
        .map(u8::to_ascii_lowercase)
        .eq(b"<html>".iter().copied())
}
