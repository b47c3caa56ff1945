//! Transaction boundary state machine.
//!
//! A single strict-order pass over the trace tracking open/closed
//! transaction state: nested begins, flush storms, long-running
//! transactions, and units of work that never close at all.

use std::collections::VecDeque;
use std::time::Duration;

use ormlens_core::finding::{Finding, FindingKind, Severity, Suggestion};
use ormlens_core::trace::QueryRecord;

use crate::sql::shapes::{SqlShapes, StatementKind};

use super::traits::{DetectionContext, Detector, DetectorKind, FindingStream};

pub struct TransactionBoundaryDetector {
    shapes: SqlShapes,
}

impl TransactionBoundaryDetector {
    pub fn new() -> Self {
        Self {
            shapes: SqlShapes::new(),
        }
    }
}

impl Default for TransactionBoundaryDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for TransactionBoundaryDetector {
    fn id(&self) -> &str {
        "transaction-boundary"
    }

    fn kind(&self) -> DetectorKind {
        DetectorKind::TransactionBoundary
    }

    fn detect<'a>(&'a self, ctx: &DetectionContext<'a>) -> FindingStream<'a> {
        Box::new(TxScan {
            shapes: &self.shapes,
            records: ctx.trace.records().iter(),
            state: TxState::Closed,
            pending: VecDeque::new(),
            flush_warning_count: ctx.config.effective_flush_warning_count(),
            long_transaction_ms: ctx.config.effective_long_transaction_ms(),
            exhausted: false,
        })
    }
}

enum TxState {
    Closed,
    Open {
        depth: u32,
        flush_count: u32,
        flush_warned: bool,
        start_index: u64,
        /// Summed statement time observed while the transaction is
        /// open, the begin and closing statements included.
        elapsed: Duration,
    },
}

/// Lazy single-pass scan. Findings are buffered briefly in `pending`
/// so a step that emits can still finish its transition.
struct TxScan<'a> {
    shapes: &'a SqlShapes,
    records: std::slice::Iter<'a, QueryRecord>,
    state: TxState,
    pending: VecDeque<Finding>,
    flush_warning_count: u32,
    long_transaction_ms: u64,
    exhausted: bool,
}

impl Iterator for TxScan<'_> {
    type Item = Finding;

    fn next(&mut self) -> Option<Finding> {
        loop {
            if let Some(finding) = self.pending.pop_front() {
                return Some(finding);
            }
            if self.exhausted {
                return None;
            }
            match self.records.next() {
                Some(record) => self.step(record),
                None => {
                    self.finish();
                    self.exhausted = true;
                }
            }
        }
    }
}

impl TxScan<'_> {
    fn step(&mut self, record: &QueryRecord) {
        if let TxState::Open { elapsed, .. } = &mut self.state {
            *elapsed += record.duration;
        }

        match self.shapes.statement_kind(&record.text) {
            StatementKind::Begin => self.on_begin(record),
            StatementKind::Flush => self.on_flush(record),
            StatementKind::Commit | StatementKind::Rollback => self.on_close(record),
            StatementKind::Select | StatementKind::Other => {}
        }
    }

    fn on_begin(&mut self, record: &QueryRecord) {
        match &mut self.state {
            TxState::Closed => {
                self.state = TxState::Open {
                    depth: 1,
                    flush_count: 0,
                    flush_warned: false,
                    start_index: record.index,
                    elapsed: record.duration,
                };
            }
            TxState::Open { depth, start_index, .. } => {
                // The underlying engine cannot truly nest
                // transactions; this is always a bug.
                *depth += 1;
                let outer = *start_index;
                self.pending.push_back(
                    Finding::new(
                        FindingKind::NestedTransaction,
                        Severity::Critical,
                        format!("tx@{}", record.index),
                    )
                    .with_title("transaction begun inside an open transaction")
                    .with_description(format!(
                        "A second BEGIN at record {} while the transaction \
                         opened at record {} is still active; the inner \
                         begin is silently absorbed and its commit does \
                         not persist anything.",
                        record.index, outer
                    ))
                    .with_evidence([outer, record.index])
                    .with_suggestion(
                        Suggestion::new("remove-nested-begin")
                            .with_context("outer_start", outer)
                            .with_context("inner_start", record.index)
                            .with_tag("transaction"),
                    ),
                );
            }
        }
    }

    fn on_flush(&mut self, record: &QueryRecord) {
        // Flush outside a transaction is autocommit, not a finding.
        if let TxState::Open {
            flush_count,
            flush_warned,
            start_index,
            ..
        } = &mut self.state
        {
            *flush_count += 1;
            if !*flush_warned && *flush_count >= self.flush_warning_count {
                *flush_warned = true;
                let start = *start_index;
                let count = *flush_count;
                self.pending.push_back(
                    Finding::new(
                        FindingKind::MultipleFlushInTransaction,
                        Severity::Warning,
                        format!("tx@{start}"),
                    )
                    .with_title(format!("{count} flushes inside one transaction"))
                    .with_description(format!(
                        "The transaction opened at record {start} flushed \
                         {count} times; every flush extends lock hold time \
                         and widens the deadlock window.",
                    ))
                    .with_evidence([start, record.index])
                    .with_suggestion(
                        Suggestion::new("batch-flushes")
                            .with_context("flush_count", count)
                            .with_tag("transaction"),
                    ),
                );
            }
        }
    }

    fn on_close(&mut self, record: &QueryRecord) {
        if let TxState::Open {
            depth,
            start_index,
            elapsed,
            ..
        } = &mut self.state
        {
            if *depth > 1 {
                // Closes one nesting level only.
                *depth -= 1;
                return;
            }
            let start = *start_index;
            let elapsed_ms = elapsed.as_millis() as u64;
            if elapsed_ms > self.long_transaction_ms {
                self.pending.push_back(
                    Finding::new(
                        FindingKind::LongRunningTransaction,
                        Severity::Warning,
                        format!("tx@{start}"),
                    )
                    .with_title(format!("transaction held for {elapsed_ms}ms of statement time"))
                    .with_description(format!(
                        "The transaction opened at record {} spent {}ms \
                         executing statements before closing at record {}; \
                         long transactions hold locks and bloat undo.",
                        start, elapsed_ms, record.index
                    ))
                    .with_evidence([start, record.index])
                    .with_suggestion(
                        Suggestion::new("shorten-transaction")
                            .with_context("elapsed_ms", elapsed_ms)
                            .with_tag("transaction"),
                    ),
                );
            }
            self.state = TxState::Closed;
        }
        // Commit/rollback while closed: autocommit noise, skipped.
    }

    fn finish(&mut self) {
        let (start_index, flush_count) = match self.state {
            TxState::Open {
                start_index,
                flush_count,
                ..
            } => (start_index, flush_count),
            TxState::Closed => return,
        };
        self.pending.push_back(
            Finding::new(
                FindingKind::UnclosedTransaction,
                Severity::Critical,
                format!("tx@{start_index}"),
            )
            .with_title("transaction never committed or rolled back")
            .with_description(format!(
                "The transaction opened at record {start_index} was still \
                 open when the unit of work ended ({flush_count} flushes \
                 observed); its writes are in limbo and its locks survive \
                 until the connection drops.",
            ))
            .with_evidence([start_index])
            .with_suggestion(
                Suggestion::new("close-transaction")
                    .with_context("start_index", start_index)
                    .with_context("flush_count", flush_count)
                    .with_tag("transaction"),
            ),
        );
        self.state = TxState::Closed;
    }
}
