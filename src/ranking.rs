//! Multi-source ranking core: merge the feeds' candidate lists into one
//! deduplicated, scored table restricted to the publication window.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::info;

use crate::sources::alphaxiv::AlphaXivFeed;
use crate::sources::huggingface::HuggingFaceFeed;
use crate::sources::AbstractSource;
use crate::types::{PaperRow, PaperSource, RankedPaper, RawPaper, Result};
use crate::utils::parse_publication_date;

/// Merge the two candidate lists into one deduplicated scored list.
///
/// Every AlphaXiv paper is inserted first with `score = 1` and its feed
/// position as `alphaxiv_rank`. The HuggingFace pass then either promotes an
/// existing entry in place (score 2, source `Both`, `hf_rank` filled in) or
/// inserts a new score-1 entry. Promotion is presence-based: seeing the id in
/// the second feed is enough, whether or not both ranks end up populated.
///
/// The output holds exactly one entry per distinct identifier, sorted by
/// `(-score, average_rank)`; ties keep their insertion order.
pub fn merge_and_score(alphaxiv: &[RawPaper], huggingface: &[RawPaper]) -> Vec<RankedPaper> {
    // Vec + index map instead of a bare HashMap so tie order stays the
    // insertion order, which the stable sort below preserves.
    let mut papers: Vec<RankedPaper> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (rank, paper) in alphaxiv.iter().enumerate() {
        if index.contains_key(&paper.arxiv_id) {
            // Duplicate id within one feed: keep the first, better-ranked one.
            continue;
        }
        index.insert(paper.arxiv_id.clone(), papers.len());
        papers.push(RankedPaper {
            arxiv_id: paper.arxiv_id.clone(),
            title: paper.title.clone(),
            abstract_text: paper.abstract_text.clone(),
            published_on: paper.published_on.clone(),
            score: 1,
            alphaxiv_rank: Some(rank),
            hf_rank: None,
            source: PaperSource::AlphaXiv,
        });
    }

    for (rank, paper) in huggingface.iter().enumerate() {
        match index.get(&paper.arxiv_id) {
            Some(&at) => {
                let existing = &mut papers[at];
                if existing.hf_rank.is_none() {
                    existing.hf_rank = Some(rank);
                }
                if existing.source != PaperSource::HuggingFace {
                    existing.score = 2;
                    existing.source = PaperSource::Both;
                }
            }
            None => {
                index.insert(paper.arxiv_id.clone(), papers.len());
                papers.push(RankedPaper {
                    arxiv_id: paper.arxiv_id.clone(),
                    title: paper.title.clone(),
                    abstract_text: paper.abstract_text.clone(),
                    published_on: paper.published_on.clone(),
                    score: 1,
                    alphaxiv_rank: None,
                    hf_rank: Some(rank),
                    source: PaperSource::HuggingFace,
                });
            }
        }
    }

    papers.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(a.average_rank().total_cmp(&b.average_rank()))
    });
    papers
}

/// Keep exactly the papers published inside `[after, before]`, both ends
/// inclusive. Records whose timestamp cannot be parsed are dropped with a
/// log line; occasional malformed dates are expected from these feeds.
pub fn filter_by_window(
    papers: Vec<RankedPaper>,
    after: DateTime<Utc>,
    before: DateTime<Utc>,
) -> Vec<RankedPaper> {
    papers
        .into_iter()
        .filter(|paper| match parse_publication_date(&paper.published_on) {
            Some(published) => after <= published && published <= before,
            None => {
                info!(
                    "Could not parse date {:?} for {}, dropping from window",
                    paper.published_on, paper.arxiv_id
                );
                false
            }
        })
        .collect()
}

/// Project the ranked list into the flat output table, keeping its order.
/// A parse failure here cannot occur for window-filtered input, but the
/// current time stands in rather than panicking on a gap.
pub fn to_rows(papers: &[RankedPaper]) -> Vec<PaperRow> {
    papers
        .iter()
        .map(|paper| PaperRow {
            arxiv: paper.arxiv_id.clone(),
            title: paper.title.clone(),
            abstract_text: paper.abstract_text.clone(),
            published_on: parse_publication_date(&paper.published_on).unwrap_or_else(Utc::now),
            score: paper.score,
            alphaxiv_rank: paper.alphaxiv_rank,
            hf_rank: paper.hf_rank,
            average_rank: paper.average_rank(),
        })
        .collect()
}

/// The default abstract source: AlphaXiv and HuggingFace merged and scored.
pub struct RankedFeedSource {
    alphaxiv: AlphaXivFeed,
    huggingface: HuggingFaceFeed,
}

impl RankedFeedSource {
    pub fn new(alphaxiv: AlphaXivFeed, huggingface: HuggingFaceFeed) -> Self {
        Self {
            alphaxiv,
            huggingface,
        }
    }
}

#[async_trait]
impl AbstractSource for RankedFeedSource {
    fn source_name(&self) -> &'static str {
        "ranked"
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

        let (alphaxiv_papers, considered) = self.alphaxiv.fetch(Some(after), Some(before)).await?;
        let hf_papers = self.huggingface.fetch().await?;

        let merged = merge_and_score(&alphaxiv_papers, &hf_papers);
        if merged.is_empty() {
            info!("No papers found across feeds");
            return Ok((Vec::new(), considered));
        }

        let filtered = filter_by_window(merged, after, before);
        if filtered.is_empty() {
            info!("No papers in time window after date filtering");
            return Ok((Vec::new(), considered));
        }

        let rows = to_rows(&filtered);
        let both = rows.iter().filter(|r| r.score == 2).count();
        info!(
            "Returning {} papers sorted by score and rank ({} in both feeds, {} in one)",
            rows.len(),
            both,
            rows.len() - both
        );

        Ok((rows, considered))
    }
}
