//! Detector system — one narrow `Detector` trait, four concrete
//! implementations, each independently unit-testable.

pub mod join_shape;
pub mod loop_query;
pub mod pagination;
pub mod traits;
pub mod transaction;

pub use join_shape::JoinShapeDetector;
pub use loop_query::SequentialLoopDetector;
pub use pagination::PaginationHazardDetector;
pub use traits::{DetectionContext, Detector, DetectorKind, FindingStream};
pub use transaction::TransactionBoundaryDetector;
