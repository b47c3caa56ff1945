//! Analysis engine — runs the configured detectors over one
//! finalized trace and merges their output.
//!
//! Failure isolation: one detector panicking is logged and skipped,
//! the others still report. Deduplication by `(kind, subject)` is the
//! only transformation applied after a detector yields a finding, and
//! the dedup set is local to one `run` call.

use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};

use rustc_hash::FxHashSet;

use ormlens_core::config::AnalysisConfig;
use ormlens_core::finding::Finding;
use ormlens_core::mapping::{MappingProvider, MappingSnapshot};
use ormlens_core::trace::QueryTrace;

use crate::detectors::traits::{DetectionContext, Detector};
use crate::detectors::{
    JoinShapeDetector, PaginationHazardDetector, SequentialLoopDetector,
    TransactionBoundaryDetector,
};

/// Registry and runner for the detector set.
pub struct AnalysisEngine {
    detectors: Vec<Box<dyn Detector>>,
    disabled: HashSet<String>,
}

impl AnalysisEngine {
    /// Create a new empty engine.
    pub fn new() -> Self {
        Self {
            detectors: Vec::new(),
            disabled: HashSet::new(),
        }
    }

    /// Engine with the four standard detectors installed.
    pub fn with_default_detectors() -> Self {
        let mut engine = Self::new();
        engine.register(Box::new(SequentialLoopDetector::new()));
        engine.register(Box::new(JoinShapeDetector::new()));
        engine.register(Box::new(TransactionBoundaryDetector::new()));
        engine.register(Box::new(PaginationHazardDetector::new()));
        engine
    }

    /// Register a detector.
    pub fn register(&mut self, detector: Box<dyn Detector>) {
        self.detectors.push(detector);
    }

    /// Disable a specific detector by ID.
    pub fn disable(&mut self, id: &str) {
        self.disabled.insert(id.to_string());
    }

    /// Enable a previously disabled detector.
    pub fn enable(&mut self, id: &str) {
        self.disabled.remove(id);
    }

    /// Total number of registered detectors.
    pub fn count(&self) -> usize {
        self.detectors.len()
    }

    /// Number of enabled detectors.
    pub fn enabled_count(&self) -> usize {
        self.detectors
            .iter()
            .filter(|d| !self.disabled.contains(d.id()))
            .count()
    }

    /// Run every enabled detector over the trace and snapshot,
    /// deduplicating by `(kind, subject)` in first-occurrence order.
    pub fn run(
        &self,
        trace: &QueryTrace,
        snapshot: &MappingSnapshot,
        config: &AnalysisConfig,
    ) -> Vec<Finding> {
        let ctx = DetectionContext::new(trace, snapshot, config);
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut findings = Vec::new();

        for detector in &self.detectors {
            if self.disabled.contains(detector.id()) {
                continue;
            }
            let result = catch_unwind(AssertUnwindSafe(|| {
                detector.detect(&ctx).collect::<Vec<Finding>>()
            }));
            match result {
                Ok(detected) => {
                    for finding in detected {
                        if seen.insert(finding.dedup_key()) {
                            findings.push(finding);
                        }
                    }
                }
                Err(_) => {
                    tracing::error!(
                        detector_id = detector.id(),
                        "detector panicked during analysis"
                    );
                }
            }
        }
        findings
    }

    /// Run against a mapping provider. A failing provider is logged
    /// and analysis proceeds with an empty snapshot, so trace-only
    /// detectors still report.
    pub fn run_with_provider(
        &self,
        trace: &QueryTrace,
        provider: &dyn MappingProvider,
        config: &AnalysisConfig,
    ) -> Vec<Finding> {
        let snapshot = match provider.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(error = %e, "mapping provider failed; analyzing without metadata");
                MappingSnapshot::empty()
            }
        };
        self.run(trace, &snapshot, config)
    }
}

impl Default for AnalysisEngine {
    fn default() -> Self {
        Self::with_default_detectors()
    }
}
