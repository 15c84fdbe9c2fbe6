use arxiv_trends::ranking::{filter_by_window, merge_and_score, to_rows};
use arxiv_trends::types::{PaperSource, RankedPaper, RawPaper};
use chrono::{DateTime, Utc};

fn raw(arxiv_id: &str, votes: Option<i64>) -> RawPaper {
    RawPaper {
        arxiv_id: arxiv_id.to_string(),
        title: format!("Paper {}", arxiv_id),
        abstract_text: "Test abstract".to_string(),
        published_on: "2025-11-10T00:00:00.000Z".to_string(),
        votes,
    }
}

fn ranked(arxiv_id: &str, published_on: &str) -> RankedPaper {
    RankedPaper {
        arxiv_id: arxiv_id.to_string(),
        title: "Test".to_string(),
        abstract_text: "Test abstract".to_string(),
        published_on: published_on.to_string(),
        score: 1,
        alphaxiv_rank: Some(0),
        hf_rank: None,
        source: PaperSource::AlphaXiv,
    }
}

fn ts(raw: &str) -> DateTime<Utc> {
    raw.parse().expect("test timestamp parses")
}

#[test]
fn merge_scores_shared_papers_first() {
    let alphaxiv = vec![raw("2411.11111", Some(10)), raw("2411.22222", Some(5))];
    let huggingface = vec![raw("2411.33333", None), raw("2411.11111", None)];

    let merged = merge_and_score(&alphaxiv, &huggingface);

    assert_eq!(merged.len(), 3);
    assert_eq!(merged[0].arxiv_id, "2411.11111");
    assert_eq!(merged[0].score, 2);
    assert_eq!(merged[0].source, PaperSource::Both);
    assert_eq!(merged[0].alphaxiv_rank, Some(0));
    assert_eq!(merged[0].hf_rank, Some(1));

    // The score-1 pair orders by each one's single rank: the HF-only paper
    // sits at position 0 of its feed, the alphaXiv-only paper at position 1.
    let tail: Vec<&str> = merged[1..].iter().map(|p| p.arxiv_id.as_str()).collect();
    assert_eq!(tail, vec!["2411.33333", "2411.22222"]);
    assert!(merged[1..].iter().all(|p| p.score == 1));
}

#[test]
fn merge_is_idempotent_over_identical_inputs() {
    let papers = vec![
        raw("2411.11111", Some(3)),
        raw("2411.22222", Some(2)),
        raw("2411.11111", Some(3)), // duplicate id within the same feed
    ];

    let merged = merge_and_score(&papers, &papers);

    assert_eq!(merged.len(), 2);
    for paper in &merged {
        assert_eq!(paper.score, 2);
        assert_eq!(paper.source, PaperSource::Both);
    }
}

#[test]
fn score_two_exactly_when_source_is_both() {
    let alphaxiv = vec![raw("2411.00001", Some(1)), raw("2411.00002", Some(1))];
    let huggingface = vec![raw("2411.00002", None), raw("2411.00003", None)];

    for paper in merge_and_score(&alphaxiv, &huggingface) {
        assert_eq!(paper.score == 2, paper.source == PaperSource::Both);
    }
}

#[test]
fn output_is_sorted_by_score_then_average_rank() {
    let alphaxiv = vec![
        raw("2411.00001", Some(9)),
        raw("2411.00002", Some(8)),
        raw("2411.00003", Some(7)),
        raw("2411.00004", Some(6)),
    ];
    let huggingface = vec![raw("2411.00003", None), raw("2411.00001", None)];

    let merged = merge_and_score(&alphaxiv, &huggingface);

    let sort_key = |p: &RankedPaper| (-(p.score as i32), p.average_rank());
    for pair in merged.windows(2) {
        let (kp, kq) = (sort_key(&pair[0]), sort_key(&pair[1]));
        assert!(
            kp.0 < kq.0 || (kp.0 == kq.0 && kp.1 <= kq.1),
            "{} before {} violates the ordering contract",
            pair[0].arxiv_id,
            pair[1].arxiv_id
        );
    }

    // Spot checks: both shared papers come first, best average rank leading.
    assert_eq!(merged[0].arxiv_id, "2411.00001"); // avg (0 + 1) / 2 = 0.5
    assert_eq!(merged[1].arxiv_id, "2411.00003"); // avg (2 + 0) / 2 = 1.0
    assert_eq!(merged[0].score, 2);
    assert_eq!(merged[1].score, 2);
}

#[test]
fn average_rank_handles_missing_sides() {
    let mut paper = ranked("2411.12345", "2025-11-10T00:00:00.000Z");

    paper.alphaxiv_rank = Some(5);
    paper.hf_rank = Some(3);
    assert_eq!(paper.average_rank(), 4.0);

    paper.hf_rank = None;
    assert_eq!(paper.average_rank(), 5.0);

    paper.alphaxiv_rank = None;
    assert_eq!(paper.average_rank(), f64::INFINITY);
}

#[test]
fn window_bounds_are_inclusive_to_the_microsecond() {
    let after = ts("2025-11-09T00:00:00Z");
    let before = ts("2025-11-15T00:00:00Z");

    let papers = vec![
        ranked("2411.00001", "2025-11-09T00:00:00.000000Z"), // exactly `after`
        ranked("2411.00002", "2025-11-08T23:59:59.999999Z"), // 1 us early
        ranked("2411.00003", "2025-11-15T00:00:00.000000Z"), // exactly `before`
        ranked("2411.00004", "2025-11-15T00:00:00.000001Z"), // 1 us late
        ranked("2411.00005", "2025-11-12T12:00:00.000000Z"), // inside
    ];

    let kept: Vec<String> = filter_by_window(papers, after, before)
        .into_iter()
        .map(|p| p.arxiv_id)
        .collect();

    assert_eq!(kept, vec!["2411.00001", "2411.00003", "2411.00005"]);
}

#[test]
fn unparseable_dates_are_dropped_not_fatal() {
    let after = ts("2025-11-09T00:00:00Z");
    let before = ts("2025-11-15T00:00:00Z");

    let papers = vec![
        ranked("2411.00001", "2025-11-10T00:00:00.000Z"),
        ranked("2411.00002", "not a timestamp"),
        ranked("2411.00003", ""),
    ];

    let kept = filter_by_window(papers, after, before);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].arxiv_id, "2411.00001");
}

#[test]
fn rows_keep_order_and_carry_derived_rank() {
    let alphaxiv = vec![raw("2411.00001", Some(4)), raw("2411.00002", Some(2))];
    let huggingface = vec![raw("2411.00001", None)];

    let merged = merge_and_score(&alphaxiv, &huggingface);
    let rows = to_rows(&merged);

    assert_eq!(rows.len(), merged.len());
    for (row, paper) in rows.iter().zip(&merged) {
        assert_eq!(row.arxiv, paper.arxiv_id);
        assert_eq!(row.score, paper.score);
        assert_eq!(row.average_rank, paper.average_rank());
    }
    assert_eq!(rows[0].arxiv, "2411.00001");
}
