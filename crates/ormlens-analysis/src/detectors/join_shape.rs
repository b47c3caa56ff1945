//! Join shape detector — joins that are more expensive than
//! necessary, or entirely wasted.
//!
//! Three rules per SELECT statement: too many joins, a LEFT JOIN
//! against a provably non-null relation (strictly safe to tighten to
//! INNER), and a join whose alias is never consumed.

use ormlens_core::finding::{Finding, FindingKind, Severity, Suggestion};
use ormlens_core::mapping::MappingSnapshot;
use ormlens_core::trace::QueryRecord;

use crate::sql::shapes::{JoinFragment, JoinKind, SqlShapes};

use super::traits::{DetectionContext, Detector, DetectorKind, FindingStream};

pub struct JoinShapeDetector {
    shapes: SqlShapes,
}

impl JoinShapeDetector {
    pub fn new() -> Self {
        Self {
            shapes: SqlShapes::new(),
        }
    }

    fn record_findings(
        &self,
        record: &QueryRecord,
        snapshot: &MappingSnapshot,
        max_recommended: usize,
        max_critical: usize,
    ) -> Vec<Finding> {
        if !self.shapes.is_select(&record.text) {
            return Vec::new();
        }
        let joins = self.shapes.joins(&record.text);
        if joins.is_empty() {
            return Vec::new();
        }

        let mut findings = Vec::new();
        if joins.len() > max_recommended {
            findings.push(too_many_joins(record, &joins, max_recommended, max_critical));
        }
        for fragment in &joins {
            if fragment.kind == JoinKind::Left {
                if let Some(finding) = self.left_join_on_not_null(record, fragment, snapshot) {
                    findings.push(finding);
                }
            }
            if let Some(finding) = self.unused_join(record, fragment) {
                findings.push(finding);
            }
        }
        findings
    }

    /// A LEFT JOIN whose ON clause matches a non-nullable foreign-key
    /// association can never produce a null-padded row; INNER is
    /// strictly safe and faster.
    fn left_join_on_not_null(
        &self,
        record: &QueryRecord,
        fragment: &JoinFragment,
        snapshot: &MappingSnapshot,
    ) -> Option<Finding> {
        let entity = snapshot.entity_by_table(&fragment.table)?;
        let on_clause = self
            .shapes
            .on_clause_after(&record.text, fragment)?
            .to_ascii_lowercase();

        let association = entity.associations.iter().find(|assoc| {
            let column = match &assoc.join_column {
                Some(column) => column.to_ascii_lowercase(),
                None => return false,
            };
            assoc.nullable == Some(false) && on_clause.contains(&column)
        })?;

        let suggestion = Suggestion::new("tighten-left-join")
            .with_context("table", fragment.table.clone())
            .with_context("entity", entity.entity_name.clone())
            .with_context("association", association.field_name.clone())
            .with_context(
                "column",
                association.join_column.clone().unwrap_or_default(),
            )
            .with_tag("join");

        Some(
            Finding::new(
                FindingKind::LeftJoinOnNotNull,
                Severity::Critical,
                fragment.table.clone(),
            )
            .with_title(format!(
                "LEFT JOIN on non-nullable relation `{}`",
                association.field_name
            ))
            .with_description(format!(
                "`{}` is joined with LEFT JOIN, but the matched \
                 association `{}` is declared non-nullable; an INNER \
                 JOIN returns identical rows and lets the planner \
                 reorder freely.",
                fragment.table, association.field_name
            ))
            .with_evidence([record.index])
            .with_suggestion(suggestion),
        )
    }

    /// A join whose alias never appears outside its own fragment was
    /// executed but never consumed.
    fn unused_join(&self, record: &QueryRecord, fragment: &JoinFragment) -> Option<Finding> {
        let alias = fragment.alias.as_deref()?;
        if self
            .shapes
            .alias_used_outside_join(&record.text, fragment, alias)
        {
            return None;
        }

        let suggestion = Suggestion::new("drop-unused-join")
            .with_context("table", fragment.table.clone())
            .with_context("alias", alias)
            .with_tag("join");

        Some(
            Finding::new(
                FindingKind::UnusedJoin,
                Severity::Warning,
                fragment.table.clone(),
            )
            .with_title(format!("join on `{}` is never used", fragment.table))
            .with_description(format!(
                "`{}` (alias `{}`) is joined but no other part of the \
                 statement references it; the scan or merge is wasted \
                 work.",
                fragment.table, alias
            ))
            .with_evidence([record.index])
            .with_suggestion(suggestion),
        )
    }
}

impl Default for JoinShapeDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for JoinShapeDetector {
    fn id(&self) -> &str {
        "join-shape"
    }

    fn kind(&self) -> DetectorKind {
        DetectorKind::JoinShape
    }

    fn detect<'a>(&'a self, ctx: &DetectionContext<'a>) -> FindingStream<'a> {
        let ctx = *ctx;
        let max_recommended = ctx.config.effective_max_joins_recommended();
        let max_critical = ctx.config.effective_max_joins_critical();
        Box::new(ctx.trace.into_iter().flat_map(move |record| {
            self.record_findings(record, ctx.snapshot, max_recommended, max_critical)
        }))
    }
}

fn too_many_joins(
    record: &QueryRecord,
    joins: &[JoinFragment],
    max_recommended: usize,
    max_critical: usize,
) -> Finding {
    let severity = if joins.len() > max_critical {
        Severity::Critical
    } else {
        Severity::Warning
    };
    let subject = joins[0].table.clone();

    let suggestion = Suggestion::new("split-query")
        .with_context("join_count", joins.len() as u64)
        .with_context("recommended_max", max_recommended as u64)
        .with_tag("join");

    Finding::new(FindingKind::TooManyJoins, severity, subject)
        .with_title(format!("{} joins in one statement", joins.len()))
        .with_description(format!(
            "The statement performs {} joins (recommended maximum {}); \
             consider splitting the query or trimming fetch depth.",
            joins.len(),
            max_recommended
        ))
        .with_evidence([record.index])
        .with_suggestion(suggestion)
}
