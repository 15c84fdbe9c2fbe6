//! Posted-paper history store.
//!
//! One record per paper ever posted, keyed by arxiv id. The store is what
//! makes posting at-most-once across runs: a hit here removes the paper from
//! the current candidate set.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

use crate::types::{PostedPaper, Result};

#[async_trait]
pub trait History: Send + Sync {
    /// Point existence check by arxiv id.
    async fn contains(&self, arxiv_id: &str) -> Result<bool>;

    /// Point read by arxiv id.
    async fn get(&self, arxiv_id: &str) -> Result<Option<PostedPaper>>;

    /// Point write; replaces any previous record for the same id.
    async fn record(&self, entry: &PostedPaper) -> Result<()>;
}

pub struct PostgresHistory {
    db: PgPool,
}

impl PostgresHistory {
    pub async fn new(database_url: &str) -> Result<Self> {
        let db = PgPool::connect(database_url).await?;

        // Note: database schema should be initialized with migrations before
        // running. In production, run: sqlx migrate run
        Ok(Self { db })
    }
}

#[async_trait]
impl History for PostgresHistory {
    async fn contains(&self, arxiv_id: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM posted_papers WHERE arxiv_id = $1")
            .bind(arxiv_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(row.is_some())
    }

    async fn get(&self, arxiv_id: &str) -> Result<Option<PostedPaper>> {
        let row = sqlx::query(
            r#"
            SELECT arxiv_id, tweet_id, tweet_url, title, published_on, run_id
            FROM posted_papers WHERE arxiv_id = $1
            "#,
        )
        .bind(arxiv_id)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => Ok(Some(PostedPaper {
                arxiv_id: row.try_get("arxiv_id")?,
                tweet_id: row.try_get("tweet_id")?,
                tweet_url: row.try_get("tweet_url")?,
                title: row.try_get("title")?,
                published_on: row.try_get("published_on")?,
                run_id: row.try_get("run_id")?,
            })),
            None => Ok(None),
        }
    }

    async fn record(&self, entry: &PostedPaper) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO posted_papers (arxiv_id, tweet_id, tweet_url, title, published_on, run_id, posted_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT (arxiv_id) DO UPDATE SET
                tweet_id = EXCLUDED.tweet_id,
                tweet_url = EXCLUDED.tweet_url,
                title = EXCLUDED.title,
                published_on = EXCLUDED.published_on,
                run_id = EXCLUDED.run_id,
                posted_at = EXCLUDED.posted_at
            "#,
        )
        .bind(&entry.arxiv_id)
        .bind(entry.tweet_id)
        .bind(&entry.tweet_url)
        .bind(&entry.title)
        .bind(entry.published_on)
        .bind(entry.run_id)
        .execute(&self.db)
        .await?;

        info!("Recorded posted paper {}", entry.arxiv_id);
        Ok(())
    }
}

/// In-memory history used by tests.
#[derive(Default)]
pub struct MemoryHistory {
    entries: RwLock<HashMap<String, PostedPaper>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-load an id as already posted.
    pub async fn seed(&self, entry: PostedPaper) {
        self.entries
            .write()
            .await
            .insert(entry.arxiv_id.clone(), entry);
    }
}

#[async_trait]
impl History for MemoryHistory {
    async fn contains(&self, arxiv_id: &str) -> Result<bool> {
        Ok(self.entries.read().await.contains_key(arxiv_id))
    }

    async fn get(&self, arxiv_id: &str) -> Result<Option<PostedPaper>> {
        Ok(self.entries.read().await.get(arxiv_id).cloned())
    }

    async fn record(&self, entry: &PostedPaper) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(entry.arxiv_id.clone(), entry.clone());
        Ok(())
    }
}
