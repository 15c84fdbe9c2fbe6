use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use tracing::warn;

use crate::types::{BotError, Result};

/// How a failed operation should be treated by the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Worth another attempt after a backoff delay.
    Transient,
    /// Retrying cannot help; propagate immediately.
    Permanent,
}

/// Default classification: network failures and feed-level errors (non-2xx,
/// zero results where results were expected) are transient; everything else
/// indicates a bug or a contract change and propagates unchanged.
pub fn default_class(err: &BotError) -> ErrorClass {
    match err {
        BotError::Http(_) | BotError::Feed { .. } | BotError::Llm(_) | BotError::Twitter(_) => {
            ErrorClass::Transient
        }
        _ => ErrorClass::Permanent,
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl RetryPolicy {
    /// Capped exponential backoff starting at `initial`.
    pub fn exponential(max_attempts: u32, initial: Duration, cap: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay: initial,
            max_delay: cap,
            multiplier: 2.0,
        }
    }

    /// The same delay between every attempt.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay: delay,
            max_delay: delay,
            multiplier: 1.0,
        }
    }

    fn schedule(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_delay,
            initial_interval: self.initial_delay,
            max_interval: self.max_delay,
            multiplier: self.multiplier,
            randomization_factor: 0.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// Run `op` until it succeeds, the classifier declares the error permanent,
/// or `policy.max_attempts` attempts are exhausted. The last error is
/// returned unchanged on exhaustion.
pub async fn retry<T, F, Fut, C>(policy: &RetryPolicy, label: &str, classify: C, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    C: Fn(&BotError) -> ErrorClass,
{
    let mut schedule = policy.schedule();
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if classify(&err) == ErrorClass::Permanent {
                    return Err(err);
                }
                if attempt == max_attempts {
                    warn!("{} failed after {} attempts: {}", label, attempt, err);
                    return Err(err);
                }
                let delay = schedule.next_backoff().unwrap_or(policy.max_delay);
                warn!(
                    "{} attempt {} failed: {}, retrying in {:?}",
                    label, attempt, err, delay
                );
                tokio::time::sleep(delay).await;
            }
        }
    }

    unreachable!("retry loop exits via return");
}
