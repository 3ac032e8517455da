//! Tests for normalization statistics and result structures

use crate::coordinate::ParseFailure;
use crate::normalizer::stats::{DropReason, DuplicateIdWarning, NormalizationSummary};

#[test]
fn test_summary_new() {
    let summary = NormalizationSummary::new(10);

    assert_eq!(summary.total_input, 10);
    assert_eq!(summary.accepted, 0);
    assert_eq!(summary.dropped_rows, 0);
    assert!(summary.drop_reasons.is_empty());
    assert!(!summary.is_consistent());
}

#[test]
fn test_summary_counting() {
    let mut summary = NormalizationSummary::new(4);
    summary.record_accepted();
    summary.record_accepted();
    summary.record_dropped(DropReason::InvalidFormat);
    summary.record_dropped(DropReason::InvalidFormat);

    assert_eq!(summary.accepted, 2);
    assert_eq!(summary.dropped_rows, 2);
    assert_eq!(summary.dropped_for(DropReason::InvalidFormat), 2);
    assert_eq!(summary.dropped_for(DropReason::OutOfRange), 0);
    assert!(summary.is_consistent());
}

#[test]
fn test_acceptance_rate() {
    let mut summary = NormalizationSummary::new(0);
    assert_eq!(summary.acceptance_rate(), 100.0);

    summary.total_input = 4;
    summary.accepted = 3;
    assert_eq!(summary.acceptance_rate(), 75.0);
}

#[test]
fn test_summary_string() {
    let mut summary = NormalizationSummary::new(2);
    summary.record_accepted();
    summary.record_dropped(DropReason::OutOfRange);

    let text = summary.summary();
    assert!(text.contains("2 -> 1 stations"));
    assert!(text.contains("50.0% accepted"));
    assert!(text.contains("coordinate component out of range: 1"));

    let clean = NormalizationSummary::new(0).summary();
    assert!(clean.contains("Dropped: 0 (none)"));
}

#[test]
fn test_drop_reason_from_parse_failure() {
    assert_eq!(
        DropReason::from(&ParseFailure::EmptyInput),
        DropReason::EmptyInput
    );
    assert_eq!(
        DropReason::from(&ParseFailure::InvalidFormat {
            token: "x".to_string()
        }),
        DropReason::InvalidFormat
    );
    assert_eq!(
        DropReason::from(&ParseFailure::OutOfRange {
            degrees: 95,
            minutes: 0,
            seconds: 0
        }),
        DropReason::OutOfRange
    );
}

#[test]
fn test_summary_serializes_reason_keys() {
    let mut summary = NormalizationSummary::new(1);
    summary.record_dropped(DropReason::DuplicateId);

    let value = serde_json::to_value(&summary).unwrap();
    assert_eq!(value["dropped_rows"], 1);
    assert_eq!(value["drop_reasons"]["duplicate_id"], 1);
}

#[test]
fn test_duplicate_warning_message() {
    let warning = DuplicateIdWarning {
        station_id: "3195".to_string(),
        first_row: 0,
        duplicate_row: 7,
    };
    assert_eq!(
        warning.to_string(),
        "duplicate station id '3195' at row 7 (first accepted at row 0)"
    );
}
