//! Candidate-paper sources.

pub mod alphaxiv;
pub mod arxiv;
pub mod huggingface;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde_json::Value;
use std::time::Duration;

use crate::types::{PaperRow, Result};

/// A source of ranked paper abstracts for a publication-time window.
#[async_trait]
pub trait AbstractSource: Send + Sync {
    /// Name used in logs and CLI selection.
    fn source_name(&self) -> &'static str;

    /// Fetch the candidate table for `[after, before]`, ordered best-first.
    /// Also returns how many papers were considered before popularity
    /// filtering, for run reporting.
    async fn get_all_abstracts(
        &self,
        after: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<(Vec<PaperRow>, usize)>;
}

/// Look up the first of `names` present on the record itself, then under any
/// of the `nested` keys. The feeds wrap some records under a `paper` object
/// and rename fields between versions, so adapters probe a few spellings.
pub(crate) fn extract_field<'a>(
    record: &'a Value,
    names: &[&str],
    nested: &[&str],
) -> Option<&'a Value> {
    for name in names {
        if let Some(value) = record.get(name) {
            return Some(value);
        }
    }
    for key in nested {
        if let Some(inner) = record.get(key).filter(|v| v.is_object()) {
            for name in names {
                if let Some(value) = inner.get(name) {
                    return Some(value);
                }
            }
        }
    }
    None
}

pub(crate) fn extract_str(record: &Value, names: &[&str], nested: &[&str]) -> Option<String> {
    extract_field(record, names, nested)
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Jittered pause between consecutive requests to the same host.
pub(crate) async fn pace() {
    let delay = {
        let mut rng = rand::thread_rng();
        Duration::from_millis(rng.gen_range(500..3000))
    };
    tokio::time::sleep(delay).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finds_top_level_field() {
        let record = json!({"universal_paper_id": "2411.12345"});
        assert_eq!(
            extract_str(&record, &["universal_paper_id"], &[]),
            Some("2411.12345".to_string())
        );
    }

    #[test]
    fn falls_back_across_names() {
        let record = json!({"id": "2411.11111"});
        assert_eq!(
            extract_str(&record, &["universal_paper_id", "id"], &[]),
            Some("2411.11111".to_string())
        );
    }

    #[test]
    fn probes_nested_keys() {
        let record = json!({"paper": {"id": "2411.67890"}});
        assert_eq!(
            extract_str(&record, &["id"], &["paper"]),
            Some("2411.67890".to_string())
        );
    }

    #[test]
    fn top_level_wins_over_nested() {
        let record = json!({"title": "outer", "paper": {"title": "inner"}});
        assert_eq!(
            extract_str(&record, &["title"], &["paper"]),
            Some("outer".to_string())
        );
    }

    #[test]
    fn missing_field_is_none() {
        let record = json!({"other_field": "value"});
        assert_eq!(extract_str(&record, &["id"], &["paper"]), None);
    }
}

/// Fixed table source used by pipeline tests.
pub struct StaticSource {
    pub rows: Vec<PaperRow>,
    pub considered: usize,
}

#[async_trait]
impl AbstractSource for StaticSource {
    fn source_name(&self) -> &'static str {
        "static"
    }

    async fn get_all_abstracts(
        &self,
        _after: DateTime<Utc>,
        _before: DateTime<Utc>,
    ) -> Result<(Vec<PaperRow>, usize)> {
        Ok((self.rows.clone(), self.considered))
    }
}
