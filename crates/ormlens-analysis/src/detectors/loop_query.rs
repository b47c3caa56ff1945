//! Sequential loop detector — the classic N+1 symptom: a
//! select-by-primary-key repeated many times in a tight index
//! sequence.

use rustc_hash::FxHashMap;

use ormlens_core::finding::{Finding, FindingKind, Severity, Suggestion};
use ormlens_core::trace::QueryRecord;

use crate::sql::idents;
use crate::sql::shapes::SqlShapes;

use super::traits::{DetectionContext, Detector, DetectorKind, FindingStream};

pub struct SequentialLoopDetector {
    shapes: SqlShapes,
}

impl SequentialLoopDetector {
    pub fn new() -> Self {
        Self {
            shapes: SqlShapes::new(),
        }
    }
}

impl Default for SequentialLoopDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for SequentialLoopDetector {
    fn id(&self) -> &str {
        "sequential-loop"
    }

    fn kind(&self) -> DetectorKind {
        DetectorKind::SequentialLoop
    }

    fn detect<'a>(&'a self, ctx: &DetectionContext<'a>) -> FindingStream<'a> {
        // Grouping has to see the whole trace; emission per group
        // stays lazy.
        let mut order: Vec<String> = Vec::new();
        let mut groups: FxHashMap<String, Vec<&QueryRecord>> = FxHashMap::default();
        for record in ctx.trace {
            if let Some(lookup) = self.shapes.key_lookup(&record.text) {
                groups
                    .entry(lookup.table.clone())
                    .or_insert_with(|| {
                        order.push(lookup.table.clone());
                        Vec::new()
                    })
                    .push(record);
            }
        }

        let threshold = ctx.config.effective_loop_threshold();
        let critical_threshold = ctx.config.effective_loop_critical_threshold();
        let gap_window = ctx.config.effective_gap_window();

        Box::new(order.into_iter().filter_map(move |table| {
            let members = groups.remove(&table)?;
            build_group_finding(&table, &members, threshold, critical_threshold, gap_window)
        }))
    }
}

fn build_group_finding(
    table: &str,
    members: &[&QueryRecord],
    threshold: usize,
    critical_threshold: usize,
    gap_window: f64,
) -> Option<Finding> {
    if members.len() < threshold {
        return None;
    }
    if average_gap(members) > gap_window {
        // Spread evenly across a long trace: repeated queries, not a
        // tight loop.
        return None;
    }

    let total_time: std::time::Duration = members.iter().map(|r| r.duration).sum();
    let total_time_ms = total_time.as_millis() as u64;
    let entity = idents::entity_name_from_table(table);
    let relation = idents::relation_from_call_site(&members[0].call_site)
        .unwrap_or_else(|| "relation".to_string());

    let severity = if members.len() >= critical_threshold {
        Severity::Critical
    } else {
        Severity::Warning
    };

    let suggestion = Suggestion::new("eager-load-relation")
        .with_context("entity", entity.clone())
        .with_context("relation", relation.clone())
        .with_context("table", table)
        .with_context("count", members.len() as u64)
        .with_context("total_time_ms", total_time_ms)
        .with_tag("n-plus-one");

    Some(
        Finding::new(FindingKind::SequentialLoadLoop, severity, table)
            .with_title(format!(
                "{} sequential single-row loads from `{}`",
                members.len(),
                table
            ))
            .with_description(format!(
                "`{}` was loaded row by row {} times in a tight sequence \
                 ({}ms total), the typical signature of iterating a \
                 collection and touching `{}` on each element.",
                entity,
                members.len(),
                total_time_ms,
                relation
            ))
            .with_evidence(members.iter().map(|r| r.index))
            .with_suggestion(suggestion),
    )
}

/// Average gap between consecutive member indices. A single-member
/// group has no gaps and averages 0.
fn average_gap(members: &[&QueryRecord]) -> f64 {
    if members.len() < 2 {
        return 0.0;
    }
    let total: u64 = members
        .windows(2)
        .map(|pair| pair[1].index - pair[0].index)
        .sum();
    total as f64 / (members.len() - 1) as f64
}
