//! Abstract summarization via an OpenAI-compatible chat-completion API.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::retry::{default_class, retry, ErrorClass, RetryPolicy};
use crate::types::{BotError, Result};

/// Produces the short texts the bot posts.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize one abstract within the tweet character budget.
    async fn summarize_abstract(&self, abstract_text: &str) -> Result<String>;

    /// Phrase the round announcement for the lead tweet.
    async fn round_announcement(&self, considered: usize, selected: usize) -> Result<String>;
}

/// Plain phrasing used when the styled announcement cannot be generated.
pub fn plain_announcement(considered: usize, selected: usize) -> String {
    format!(
        "In this round I considered {} abstracts and selected {}. \
         Read the summaries in the following tweets. See you in a few hours!",
        considered, selected
    )
}

pub struct ChatSummarizer {
    client: reqwest::Client,
    config: LlmConfig,
    api_key: String,
}

impl ChatSummarizer {
    pub fn new(config: LlmConfig, api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            config,
            api_key,
        }
    }

    /// One chat-completion round trip, retried on transient failures.
    async fn chat(&self, messages: &[Value]) -> Result<String> {
        let policy = RetryPolicy::fixed(self.config.max_attempts, self.config.retry_delay);
        let url = format!("{}/chat/completions", self.config.base_url);

        // Client-side mistakes (bad key, bad request) cannot be retried away;
        // only rate limiting and server-side failures are transient.
        let classify = |err: &BotError| match err {
            BotError::Llm(message)
                if message.starts_with("HTTP 4") && !message.starts_with("HTTP 429") =>
            {
                ErrorClass::Permanent
            }
            other => default_class(other),
        };

        retry(&policy, "chat completion", classify, || async {
            let body = json!({
                "model": self.config.model,
                "messages": messages,
            });
            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await?;

            let status = response.status().as_u16();
            let payload: Value = response.json().await?;
            if status >= 400 {
                let message = payload["error"]["message"]
                    .as_str()
                    .or_else(|| payload["message"].as_str())
                    .unwrap_or("unknown API error");
                return Err(BotError::Llm(format!("HTTP {}: {}", status, message)));
            }

            payload["choices"][0]["message"]["content"]
                .as_str()
                .map(|content| content.trim().to_string())
                .ok_or_else(|| BotError::Llm("response carried no message content".to_string()))
        })
        .await
    }
}

#[async_trait]
impl Summarizer for ChatSummarizer {
    async fn summarize_abstract(&self, abstract_text: &str) -> Result<String> {
        let budget = self.config.text_budget();
        let mut history = vec![
            json!({
                "role": "system",
                "content": format!(
                    "You are a twitter chat bot. Write engaging tweets with a maximum \
                     length of {budget} characters. Be concise, informative, and engaging."
                ),
            }),
            json!({
                "role": "user",
                "content": format!(
                    "Summarize the following abstract in one short tweet: `{abstract_text}`. \
                     Do not include any hashtag or emojis. Make sure to highlight the \
                     innovative contribution of the paper. Use the third person when \
                     referring to the authors. Use {budget} characters or less."
                ),
            }),
        ];

        let mut last_length = 0usize;
        for attempt in 1..=self.config.max_attempts {
            let summary = self.chat(&history).await?;
            if summary.chars().count() <= budget {
                debug!("Summary accepted on attempt {}", attempt);
                return Ok(summary);
            }

            last_length = summary.chars().count();
            warn!(
                "Summary was {} characters long instead of {}, re-prompting",
                last_length, budget
            );
            history.push(json!({"role": "assistant", "content": summary}));
            history.push(json!({
                "role": "user",
                "content": format!(
                    "The tweet was too long ({last_length} characters). Make it a little shorter."
                ),
            }));
        }

        Err(BotError::SummaryTooLong {
            length: last_length,
            attempts: self.config.max_attempts,
            budget,
        })
    }

    async fn round_announcement(&self, considered: usize, selected: usize) -> Result<String> {
        let original = plain_announcement(considered, selected);
        let history = vec![
            json!({"role": "system", "content": "You are a helpful assistant."}),
            json!({
                "role": "user",
                "content": format!(
                    "Generate an engaging variation of the following sentence, but avoid \
                     sounding too human (you are a bot!): {original}"
                ),
            }),
        ];
        self.chat(&history).await
    }
}

/// Deterministic summarizer used by pipeline tests: returns a canned reply
/// and counts how often it was asked.
pub struct ScriptedSummarizer {
    reply: String,
    calls: AtomicUsize,
}

impl ScriptedSummarizer {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of summarize calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Summarizer for ScriptedSummarizer {
    async fn summarize_abstract(&self, _abstract_text: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }

    async fn round_announcement(&self, considered: usize, selected: usize) -> Result<String> {
        Ok(plain_announcement(considered, selected))
    }
}
