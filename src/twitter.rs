//! Tweet publishing through the Twitter API v2.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::TwitterConfig;
use crate::retry::{default_class, retry, RetryPolicy};
use crate::types::{BotError, Result};

/// Posts short texts with an optional image, optionally as a reply.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Post `text`, returning `(url, id)` of the created tweet, or
    /// `(None, None)` when posting failed unrecoverably. The caller decides
    /// whether that is fatal.
    async fn post(
        &self,
        text: &str,
        image: Option<&Path>,
        in_reply_to: Option<u64>,
    ) -> Result<(Option<String>, Option<u64>)>;
}

pub struct TwitterClient {
    client: reqwest::Client,
    config: TwitterConfig,
    bearer_token: String,
}

impl TwitterClient {
    pub fn new(config: TwitterConfig, bearer_token: String) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("arxiv-trends/0.1")
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            config,
            bearer_token,
        }
    }

    /// Upload one media file, returning its media id string.
    async fn upload_media(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "figure.jpg".to_string());

        let policy = RetryPolicy::fixed(self.config.max_retries, self.config.retry_delay);
        retry(&policy, "media upload", default_class, || {
            let bytes = bytes.clone();
            let filename = filename.clone();
            async move {
                let part = reqwest::multipart::Part::bytes(bytes).file_name(filename);
                let form = reqwest::multipart::Form::new().part("media", part);

                let response = self
                    .client
                    .post(&self.config.upload_url)
                    .bearer_auth(&self.bearer_token)
                    .multipart(form)
                    .send()
                    .await?;

                let status = response.status();
                let payload: Value = response.json().await?;
                if !status.is_success() {
                    return Err(BotError::Twitter(format!(
                        "media upload failed with HTTP {}: {}",
                        status, payload
                    )));
                }

                payload["media_id_string"]
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| {
                        BotError::Twitter("upload response carried no media id".to_string())
                    })
            }
        })
        .await
    }

    /// Create one tweet, retried with a fixed delay.
    async fn create_tweet(
        &self,
        text: &str,
        media_id: Option<&str>,
        in_reply_to: Option<u64>,
    ) -> Result<(String, u64)> {
        let policy = RetryPolicy::fixed(self.config.max_retries, self.config.retry_delay);
        let url = format!("{}/tweets", self.config.api_base);

        retry(&policy, "tweet create", default_class, || async {
            let mut body = json!({ "text": text });
            if let Some(media_id) = media_id {
                body["media"] = json!({ "media_ids": [media_id] });
            }
            if let Some(reply_to) = in_reply_to {
                body["reply"] = json!({ "in_reply_to_tweet_id": reply_to.to_string() });
            }

            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.bearer_token)
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            let payload: Value = response.json().await?;
            if !status.is_success() {
                return Err(BotError::Twitter(format!(
                    "tweet failed with HTTP {}: {}",
                    status, payload
                )));
            }

            let id = payload["data"]["id"]
                .as_str()
                .and_then(|raw| raw.parse::<u64>().ok())
                .ok_or_else(|| {
                    BotError::Twitter("tweet response carried no usable id".to_string())
                })?;

            Ok((format!("https://twitter.com/user/status/{}", id), id))
        })
        .await
    }
}

#[async_trait]
impl Publisher for TwitterClient {
    async fn post(
        &self,
        text: &str,
        image: Option<&Path>,
        in_reply_to: Option<u64>,
    ) -> Result<(Option<String>, Option<u64>)> {
        // An image that will not upload is dropped, not fatal.
        let media_id = match image {
            Some(path) => match self.upload_media(path).await {
                Ok(id) => {
                    info!("Uploaded image {} as media id {}", path.display(), id);
                    Some(id)
                }
                Err(err) => {
                    error!("Could not upload image after retries: {}", err);
                    None
                }
            },
            None => None,
        };

        let first_try = self
            .create_tweet(text, media_id.as_deref(), in_reply_to)
            .await;
        let result = match (first_try, &media_id) {
            (Ok(ok), _) => Ok(ok),
            (Err(err), Some(_)) => {
                // Media attachment is the most fragile part of the call;
                // retry once more without it before giving up.
                warn!("Could not send tweet with image, retrying text-only: {}", err);
                self.create_tweet(text, None, in_reply_to).await
            }
            (Err(err), None) => Err(err),
        };

        match result {
            Ok((tweet_url, tweet_id)) => {
                info!("Sent tweet {}", tweet_url);
                Ok((Some(tweet_url), Some(tweet_id)))
            }
            Err(err) => {
                error!("Could not send tweet: {}", err);
                Ok((None, None))
            }
        }
    }
}

/// A tweet captured by [`RecordingPublisher`] during tests.
#[derive(Debug, Clone)]
pub struct SentTweet {
    pub text: String,
    pub image: Option<PathBuf>,
    pub in_reply_to: Option<u64>,
    pub id: u64,
}

/// In-memory publisher used by pipeline tests: every post succeeds and gets
/// a sequential id.
#[derive(Default)]
pub struct RecordingPublisher {
    sent: Mutex<Vec<SentTweet>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentTweet> {
        self.sent.lock().expect("publisher mutex poisoned").clone()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn post(
        &self,
        text: &str,
        image: Option<&Path>,
        in_reply_to: Option<u64>,
    ) -> Result<(Option<String>, Option<u64>)> {
        let mut sent = self.sent.lock().expect("publisher mutex poisoned");
        let id = sent.len() as u64 + 1;
        sent.push(SentTweet {
            text: text.to_string(),
            image: image.map(Path::to_path_buf),
            in_reply_to,
            id,
        });
        Ok((Some(format!("https://twitter.com/user/status/{}", id)), Some(id)))
    }
}
