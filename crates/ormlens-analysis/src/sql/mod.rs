//! Structural SQL shape recognition.
//!
//! Not a parser: classification is regex-driven pattern matching,
//! sufficient to recognize statement shapes. Anything unrecognized
//! classifies as `None`/`Other` and is skipped by detectors, never an
//! error.

pub mod idents;
pub mod shapes;

pub use shapes::{JoinFragment, JoinKind, KeyLookup, SqlShapes, StatementKind};
