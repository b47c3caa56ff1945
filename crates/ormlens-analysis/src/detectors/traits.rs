//! Detector trait and the detection context.

use ormlens_core::config::AnalysisConfig;
use ormlens_core::finding::Finding;
use ormlens_core::mapping::MappingSnapshot;
use ormlens_core::trace::QueryTrace;

/// Everything a detector may look at during one run. Detectors never
/// mutate any of it.
#[derive(Clone, Copy)]
pub struct DetectionContext<'a> {
    pub trace: &'a QueryTrace,
    pub snapshot: &'a MappingSnapshot,
    pub config: &'a AnalysisConfig,
}

impl<'a> DetectionContext<'a> {
    pub fn new(
        trace: &'a QueryTrace,
        snapshot: &'a MappingSnapshot,
        config: &'a AnalysisConfig,
    ) -> Self {
        Self {
            trace,
            snapshot,
            config,
        }
    }
}

/// A lazy, finite, non-restartable sequence of findings. Callers may
/// stop consuming early without materializing the rest.
pub type FindingStream<'a> = Box<dyn Iterator<Item = Finding> + 'a>;

/// Trait that every detector must implement.
///
/// Detectors are pure: the same `(trace, snapshot, config)` must
/// produce the same ordered finding sequence every run. A statement
/// shape a detector cannot classify is silently skipped, never an
/// error. A detector may ignore either input entirely.
pub trait Detector: Send + Sync {
    /// Unique identifier for this detector.
    fn id(&self) -> &str;

    /// Which of the closed set of detectors this is.
    fn kind(&self) -> DetectorKind;

    /// Run detection, yielding findings lazily in trace order.
    fn detect<'a>(&'a self, ctx: &DetectionContext<'a>) -> FindingStream<'a>;
}

/// The closed set of concrete detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectorKind {
    SequentialLoop,
    JoinShape,
    TransactionBoundary,
    PaginationHazard,
}

impl DetectorKind {
    pub fn all() -> &'static [DetectorKind] {
        &[
            Self::SequentialLoop,
            Self::JoinShape,
            Self::TransactionBoundary,
            Self::PaginationHazard,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SequentialLoop => "sequential_loop",
            Self::JoinShape => "join_shape",
            Self::TransactionBoundary => "transaction_boundary",
            Self::PaginationHazard => "pagination_hazard",
        }
    }
}

impl std::fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
