//! # ormlens-core
//!
//! Foundation crate for the ormlens diagnostic engine.
//! Defines the query trace model, the mapping snapshot, the finding
//! model, configuration, and errors. Every other crate in the
//! workspace depends on this.

pub mod config;
pub mod errors;
pub mod finding;
pub mod mapping;
pub mod trace;

// Re-export the most commonly used types at the crate root.
pub use config::AnalysisConfig;
pub use errors::{ConfigError, ErrorCode, MappingError, TraceError};
pub use finding::{Finding, FindingKind, Severity, Suggestion};
pub use mapping::{Association, Cardinality, EntityMapping, FetchStrategy, MappingProvider, MappingSnapshot};
pub use trace::{CallFrame, QueryRecord, QueryTrace};
