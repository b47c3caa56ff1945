//! # ormlens-analysis
//!
//! The query-trace diagnostic engine: SQL shape classification, the
//! detector contract, the four concrete detectors, and the engine
//! that runs them over a finalized trace and deduplicates findings.

pub mod detectors;
pub mod engine;
pub mod sql;

pub use detectors::traits::{DetectionContext, Detector, DetectorKind, FindingStream};
pub use engine::AnalysisEngine;
