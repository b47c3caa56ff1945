//! Collection-pagination hazard detector.
//!
//! A numeric row limit combined with a collection-fetching join
//! truncates the *related* rows, not the root entities: the database
//! applies the limit to the multiplied row set.

use ormlens_core::finding::{Finding, FindingKind, Severity, Suggestion};
use ormlens_core::trace::QueryRecord;

use crate::sql::shapes::SqlShapes;

use super::traits::{DetectionContext, Detector, DetectorKind, FindingStream};

pub struct PaginationHazardDetector {
    shapes: SqlShapes,
}

impl PaginationHazardDetector {
    pub fn new() -> Self {
        Self {
            shapes: SqlShapes::new(),
        }
    }

    fn record_finding(&self, record: &QueryRecord) -> Option<Finding> {
        if !self.shapes.is_select(&record.text) {
            return None;
        }
        let limit = self.shapes.row_limit(&record.text)?;
        let joins = self.shapes.joins(&record.text);
        if joins.is_empty() {
            return None;
        }
        // Projected columns from two or more alias prefixes mean the
        // join result is selected into the row set, not just filtered
        // on: a fetch join under a limit.
        let prefixes = self.shapes.projection_alias_prefixes(&record.text);
        if prefixes.len() < 2 {
            return None;
        }

        let subject = joins[0].table.clone();
        let suggestion = Suggestion::new("two-phase-pagination")
            .with_context("limit", limit)
            .with_context("table", subject.clone())
            .with_context("projected_aliases", prefixes.len() as u64)
            .with_tag("pagination");

        Some(
            Finding::new(
                FindingKind::PaginationWithCollectionJoin,
                Severity::Critical,
                subject,
            )
            .with_title(format!("row limit {limit} applied across a collection join"))
            .with_description(
                "The statement limits rows while also selecting joined \
                 collection columns; the limit truncates related rows \
                 instead of root entities. Fetch the root identifiers \
                 under the limit first, then load the full graph for \
                 exactly those identifiers."
                    .to_string(),
            )
            .with_evidence([record.index])
            .with_suggestion(suggestion),
        )
    }
}

impl Default for PaginationHazardDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for PaginationHazardDetector {
    fn id(&self) -> &str {
        "pagination-hazard"
    }

    fn kind(&self) -> DetectorKind {
        DetectorKind::PaginationHazard
    }

    fn detect<'a>(&'a self, ctx: &DetectionContext<'a>) -> FindingStream<'a> {
        let trace = ctx.trace;
        Box::new(
            trace
                .into_iter()
                .filter_map(move |record| self.record_finding(record)),
        )
    }
}
