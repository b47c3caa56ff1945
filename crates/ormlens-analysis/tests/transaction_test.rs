//! Transaction boundary state machine tests — the begin/commit/
//! rollback/flush sequences and their findings.

use std::time::Duration;

use ormlens_analysis::detectors::traits::{DetectionContext, Detector};
use ormlens_analysis::detectors::TransactionBoundaryDetector;
use ormlens_core::config::AnalysisConfig;
use ormlens_core::finding::{Finding, FindingKind, Severity};
use ormlens_core::mapping::MappingSnapshot;
use ormlens_core::trace::{QueryRecord, QueryTrace};

// ---- Helpers ----

fn trace_of(texts: &[&str]) -> QueryTrace {
    trace_with_durations(&texts.iter().map(|t| (*t, 1)).collect::<Vec<_>>())
}

fn trace_with_durations(steps: &[(&str, u64)]) -> QueryTrace {
    let records = steps
        .iter()
        .enumerate()
        .map(|(i, (text, ms))| QueryRecord::new(i as u64, *text, Duration::from_millis(*ms)))
        .collect();
    QueryTrace::from_records(records).unwrap()
}

fn analyze(trace: &QueryTrace) -> Vec<Finding> {
    analyze_with(trace, &AnalysisConfig::default())
}

fn analyze_with(trace: &QueryTrace, config: &AnalysisConfig) -> Vec<Finding> {
    let snapshot = MappingSnapshot::empty();
    let ctx = DetectionContext::new(trace, &snapshot, config);
    TransactionBoundaryDetector::new().detect(&ctx).collect()
}

fn count_kind(findings: &[Finding], kind: FindingKind) -> usize {
    findings.iter().filter(|f| f.kind == kind).count()
}

// ---- Sequences ----

#[test]
fn lone_begin_is_unclosed() {
    let findings = analyze(&trace_of(&["begin"]));
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].kind, FindingKind::UnclosedTransaction);
    assert_eq!(findings[0].severity, Severity::Critical);
}

#[test]
fn nested_begin_is_critical_but_balanced_commits_close() {
    let findings = analyze(&trace_of(&["begin", "begin", "commit", "commit"]));
    assert_eq!(count_kind(&findings, FindingKind::NestedTransaction), 1);
    assert_eq!(count_kind(&findings, FindingKind::UnclosedTransaction), 0);
    let nested = findings
        .iter()
        .find(|f| f.kind == FindingKind::NestedTransaction)
        .unwrap();
    assert_eq!(nested.severity, Severity::Critical);
    // Evidence points at the outer begin and the offending inner one.
    assert_eq!(nested.evidence.as_slice(), &[0, 1]);
}

#[test]
fn two_flushes_in_one_transaction_warn_once() {
    let findings = analyze(&trace_of(&["begin", "flush", "flush", "commit"]));
    assert_eq!(
        count_kind(&findings, FindingKind::MultipleFlushInTransaction),
        1
    );
    assert_eq!(count_kind(&findings, FindingKind::UnclosedTransaction), 0);
}

#[test]
fn extra_flushes_do_not_warn_again() {
    let findings = analyze(&trace_of(&["begin", "flush", "flush", "flush", "flush", "commit"]));
    assert_eq!(
        count_kind(&findings, FindingKind::MultipleFlushInTransaction),
        1
    );
}

#[test]
fn single_flush_is_fine() {
    let findings = analyze(&trace_of(&["begin", "flush", "commit"]));
    assert!(findings.is_empty());
}

#[test]
fn clean_begin_commit_yields_nothing() {
    assert!(analyze(&trace_of(&["begin", "commit"])).is_empty());
}

#[test]
fn rollback_is_a_legitimate_close() {
    assert!(analyze(&trace_of(&["begin", "rollback"])).is_empty());
}

#[test]
fn flush_outside_transaction_is_autocommit_noise() {
    assert!(analyze(&trace_of(&["flush", "flush", "flush"])).is_empty());
}

#[test]
fn commit_without_begin_is_ignored() {
    assert!(analyze(&trace_of(&["commit", "rollback"])).is_empty());
}

#[test]
fn partial_unwind_of_nested_transactions_leaves_one_open() {
    let findings = analyze(&trace_of(&["begin", "begin", "commit"]));
    assert_eq!(count_kind(&findings, FindingKind::NestedTransaction), 1);
    assert_eq!(count_kind(&findings, FindingKind::UnclosedTransaction), 1);
}

// ---- Long-running transactions ----

#[test]
fn slow_statements_inside_a_transaction_warn() {
    let trace = trace_with_durations(&[
        ("begin", 1),
        ("select * from users", 700),
        ("select * from orders", 700),
        ("commit", 1),
    ]);
    let findings = analyze(&trace);
    assert_eq!(count_kind(&findings, FindingKind::LongRunningTransaction), 1);
    let long = &findings[0];
    assert_eq!(long.severity, Severity::Warning);
    assert_eq!(long.evidence.as_slice(), &[0, 3]);
}

#[test]
fn fast_transactions_do_not_warn() {
    let trace = trace_with_durations(&[("begin", 1), ("select * from users", 10), ("commit", 1)]);
    assert!(analyze(&trace).is_empty());
}

#[test]
fn long_transaction_threshold_is_configurable() {
    let config = AnalysisConfig::from_toml_str("long_transaction_ms = 5").unwrap();
    let trace = trace_with_durations(&[("begin", 1), ("select * from users", 10), ("commit", 1)]);
    let findings = analyze_with(&trace, &config);
    assert_eq!(count_kind(&findings, FindingKind::LongRunningTransaction), 1);
}

#[test]
fn rollback_can_still_be_long_running() {
    let trace = trace_with_durations(&[("begin", 1), ("update users set x = 1", 2000), ("rollback", 1)]);
    let findings = analyze(&trace);
    assert_eq!(count_kind(&findings, FindingKind::LongRunningTransaction), 1);
    assert_eq!(count_kind(&findings, FindingKind::UnclosedTransaction), 0);
}

// ---- Unclosed with accumulated state ----

#[test]
fn unclosed_transaction_reports_flush_count() {
    let findings = analyze(&trace_of(&["begin", "flush", "flush", "flush"]));
    let unclosed = findings
        .iter()
        .find(|f| f.kind == FindingKind::UnclosedTransaction)
        .unwrap();
    let suggestion = unclosed.suggestion.as_ref().unwrap();
    assert_eq!(suggestion.context["flush_count"], 3);
}

#[test]
fn back_to_back_transactions_are_tracked_separately() {
    let findings = analyze(&trace_of(&[
        "begin", "flush", "flush", "commit", "begin", "flush", "flush", "commit",
    ]));
    // Same kind twice, but distinct transactions: distinct subjects.
    assert_eq!(
        count_kind(&findings, FindingKind::MultipleFlushInTransaction),
        2
    );
    assert_ne!(findings[0].subject, findings[1].subject);
}
