//! One bot run, end to end: gather the candidate window, drop papers already
//! posted, summarize and illustrate the survivors, post the thread, and
//! record what was posted.

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::BotConfig;
use crate::figures::FigureExtractor;
use crate::llm::{plain_announcement, Summarizer};
use crate::sources::AbstractSource;
use crate::store::History;
use crate::twitter::Publisher;
use crate::types::{BotError, PaperRow, PostedPaper, Result};
use crate::utils::arxiv_abs_url;

/// What one run did, for logging and exit reporting.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    /// Papers considered before popularity filtering.
    pub considered: usize,
    /// Papers that survived window, popularity, and history filtering.
    pub selected: usize,
    /// Papers actually posted and recorded.
    pub posted: usize,
}

pub struct Bot {
    source: Arc<dyn AbstractSource>,
    summarizer: Arc<dyn Summarizer>,
    figures: Arc<dyn FigureExtractor>,
    publisher: Arc<dyn Publisher>,
    history: Arc<dyn History>,
    config: BotConfig,
}

impl Bot {
    pub fn new(
        source: Arc<dyn AbstractSource>,
        summarizer: Arc<dyn Summarizer>,
        figures: Arc<dyn FigureExtractor>,
        publisher: Arc<dyn Publisher>,
        history: Arc<dyn History>,
        config: BotConfig,
    ) -> Self {
        Self {
            source,
            summarizer,
            figures,
            publisher,
            history,
            config,
        }
    }

    pub async fn run(&self) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        info!("Bot starting (run {}, source {})", run_id, self.source.source_name());

        let now = Utc::now();
        let after = now - Duration::hours(self.config.window_start_hours);
        let before = now - Duration::hours(self.config.window_stop_hours);

        let (rows, considered) = self.source.get_all_abstracts(after, before).await?;
        if rows.is_empty() {
            info!("No abstracts in the time window {} - {}", after, before);
            return Ok(RunReport {
                run_id,
                considered,
                selected: 0,
                posted: 0,
            });
        }

        let fresh = self.drop_already_posted(rows).await?;
        let selected: Vec<PaperRow> = fresh
            .into_iter()
            .take(self.config.papers_to_summarize)
            .collect();
        if selected.is_empty() {
            info!("Every candidate was already posted, nothing to do");
            return Ok(RunReport {
                run_id,
                considered,
                selected: 0,
                posted: 0,
            });
        }

        let lead_id = self.post_lead_tweet(considered, selected.len()).await?;

        let mut posted = 0usize;
        for row in &selected {
            let summary = self.summarizer.summarize_abstract(&row.abstract_text).await?;
            let figure = self.figures.extract(&row.arxiv).await;
            let text = format!("{} {}", arxiv_abs_url(&row.arxiv), summary);

            let (tweet_url, tweet_id) = self
                .publisher
                .post(&text, figure.as_deref(), Some(lead_id))
                .await?;

            match (tweet_url, tweet_id) {
                (Some(tweet_url), Some(tweet_id)) => {
                    self.history
                        .record(&PostedPaper {
                            arxiv_id: row.arxiv.clone(),
                            tweet_id: tweet_id as i64,
                            tweet_url,
                            title: row.title.clone(),
                            published_on: row.published_on,
                            run_id,
                        })
                        .await?;
                    posted += 1;
                }
                _ => {
                    // The run goes on; the paper stays eligible next round.
                    error!("Could not post {}, leaving it out of history", row.arxiv);
                }
            }
        }

        info!("Bot finishing (posted {} of {} selected)", posted, selected.len());
        Ok(RunReport {
            run_id,
            considered,
            selected: selected.len(),
            posted,
        })
    }

    /// Consult the history store and keep only never-posted papers.
    async fn drop_already_posted(&self, rows: Vec<PaperRow>) -> Result<Vec<PaperRow>> {
        let mut fresh = Vec::with_capacity(rows.len());
        for row in rows {
            if self.history.contains(&row.arxiv).await? {
                info!("Paper {} already posted, skipping", row.arxiv);
            } else {
                fresh.push(row);
            }
        }
        Ok(fresh)
    }

    /// Post the thread root. Failing to generate the styled announcement
    /// degrades to the plain sentence; failing to post it ends the run.
    async fn post_lead_tweet(&self, considered: usize, selected: usize) -> Result<u64> {
        let announcement = match self
            .summarizer
            .round_announcement(considered, selected)
            .await
        {
            Ok(text) => text,
            Err(err) => {
                warn!("Could not generate announcement, using plain text: {}", err);
                plain_announcement(considered, selected)
            }
        };

        let (_, lead_id) = self.publisher.post(&announcement, None, None).await?;
        lead_id.ok_or_else(|| BotError::Twitter("could not post the lead tweet".to_string()))
    }
}
