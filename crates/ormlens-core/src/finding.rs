//! Finding model — the universal detector output type, plus the
//! suggestion descriptor handed to the external renderer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Finding severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The closed set of finding kinds, with stable string tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingKind {
    SequentialLoadLoop,
    TooManyJoins,
    LeftJoinOnNotNull,
    UnusedJoin,
    NestedTransaction,
    MultipleFlushInTransaction,
    LongRunningTransaction,
    UnclosedTransaction,
    PaginationWithCollectionJoin,
}

impl FindingKind {
    /// All kinds the engine can emit.
    pub fn all() -> &'static [FindingKind] {
        &[
            Self::SequentialLoadLoop,
            Self::TooManyJoins,
            Self::LeftJoinOnNotNull,
            Self::UnusedJoin,
            Self::NestedTransaction,
            Self::MultipleFlushInTransaction,
            Self::LongRunningTransaction,
            Self::UnclosedTransaction,
            Self::PaginationWithCollectionJoin,
        ]
    }

    /// Stable tag, used in dedup keys and serialized output.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SequentialLoadLoop => "sequential-load-loop",
            Self::TooManyJoins => "too-many-joins",
            Self::LeftJoinOnNotNull => "left-join-on-not-null",
            Self::UnusedJoin => "unused-join",
            Self::NestedTransaction => "nested-transaction",
            Self::MultipleFlushInTransaction => "multiple-flush-in-transaction",
            Self::LongRunningTransaction => "long-running-transaction",
            Self::UnclosedTransaction => "unclosed-transaction",
            Self::PaginationWithCollectionJoin => "pagination-with-collection-join",
        }
    }

    /// Parse from a stable tag.
    pub fn parse_str(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|k| k.name() == s)
    }
}

impl std::fmt::Display for FindingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Remediation descriptor. Rendering to display text is external;
/// the engine only names a template and supplies its context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub template_name: String,
    /// BTreeMap so serialized context is deterministically ordered.
    pub context: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Suggestion {
    pub fn new(template_name: impl Into<String>) -> Self {
        Self {
            template_name: template_name.into(),
            context: BTreeMap::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// One detected issue — created by exactly one detector invocation,
/// immutable afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    /// What the finding is about (a table name, usually). Combined
    /// with `kind` to form the dedup key.
    pub subject: String,
    /// Weak references into the trace, by record index. Never owns
    /// records.
    pub evidence: SmallVec<[u64; 4]>,
    pub suggestion: Option<Suggestion>,
}

impl Finding {
    pub fn new(kind: FindingKind, severity: Severity, subject: impl Into<String>) -> Self {
        Self {
            kind,
            title: String::new(),
            description: String::new(),
            severity,
            subject: subject.into(),
            evidence: SmallVec::new(),
            suggestion: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_evidence(mut self, indices: impl IntoIterator<Item = u64>) -> Self {
        self.evidence.extend(indices);
        self
    }

    pub fn with_suggestion(mut self, suggestion: Suggestion) -> Self {
        self.suggestion = Some(suggestion);
        self
    }

    /// Identity used to collapse repeats of the same structural
    /// defect within one run.
    pub fn dedup_key(&self) -> String {
        format!("{}:{}", self.kind.name(), self.subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_round_trip() {
        for kind in FindingKind::all() {
            assert_eq!(FindingKind::parse_str(kind.name()), Some(*kind));
        }
        assert_eq!(FindingKind::parse_str("no-such-kind"), None);
    }

    #[test]
    fn dedup_key_combines_kind_and_subject() {
        let a = Finding::new(FindingKind::TooManyJoins, Severity::Warning, "orders");
        let b = Finding::new(FindingKind::TooManyJoins, Severity::Critical, "orders");
        let c = Finding::new(FindingKind::UnusedJoin, Severity::Warning, "orders");
        assert_eq!(a.dedup_key(), b.dedup_key());
        assert_ne!(a.dedup_key(), c.dedup_key());
    }

    #[test]
    fn severity_orders_info_below_critical() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Critical);
    }

    #[test]
    fn suggestion_context_serializes_in_key_order() {
        let s = Suggestion::new("eager-load-relation")
            .with_context("relation", "orders")
            .with_context("entity", "User");
        let json = serde_json::to_string(&s).unwrap();
        // Quoted keys, so the template name cannot shadow a match.
        let entity = json.find("\"entity\"").unwrap();
        let relation = json.find("\"relation\"").unwrap();
        assert!(entity < relation);
    }
}
