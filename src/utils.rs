use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;

use crate::types::{BotError, Result};

/// Characters allowed in an abstract once sanitized for prompting.
const ABSTRACT_ALLOWED_CHARACTERS: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789.,!?'- ";

fn arxiv_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4}\.\d{4,5})").expect("arxiv id pattern is valid"))
}

/// Reduce a raw feed identifier to the canonical `YYMM.NNNNN` form by taking
/// the anchored numeric-and-dot prefix. Version markers and path/query debris
/// after the prefix are dropped. An identifier with no such prefix means the
/// upstream contract changed and is reported as an error.
pub fn sanitize_arxiv_id(raw: &str) -> Result<String> {
    match arxiv_id_pattern().captures(raw.trim()) {
        Some(caps) => Ok(caps[1].to_string()),
        None => Err(BotError::MalformedId {
            raw: raw.to_string(),
        }),
    }
}

/// Collapse whitespace and strip characters outside the allowed set before
/// an abstract is handed to the LLM.
pub fn sanitize_abstract(text: &str) -> String {
    let flattened = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let stripped: String = flattened
        .chars()
        .filter(|c| ABSTRACT_ALLOWED_CHARACTERS.contains(*c))
        .collect();
    // Stripping can leave doubled spaces behind.
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Linear-interpolation percentile over a non-empty sample, matching the
/// behavior the vote threshold was tuned against. `pct` is in [0, 100].
pub fn percentile(values: &[f64], pct: f64) -> f64 {
    assert!(!values.is_empty(), "percentile of an empty sample");

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pct = pct.clamp(0.0, 100.0);
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let fraction = rank - lower as f64;
    sorted[lower] + fraction * (sorted[upper] - sorted[lower])
}

/// Parse a feed publication timestamp into UTC. Accepts RFC 3339 with or
/// without the literal `Z` marker, and bare `YYYY-MM-DD` dates (taken as
/// midnight UTC). Returns `None` for anything else.
pub fn parse_publication_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    // Some records carry a naive timestamp with a trailing literal Z that
    // rfc3339 parsing already accepts, or no zone marker at all.
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    None
}

pub fn arxiv_abs_url(arxiv_id: &str) -> String {
    format!("https://arxiv.org/abs/{}", arxiv_id)
}
