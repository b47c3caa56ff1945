//! Error types, each with a stable machine-readable code.

/// Stable machine codes for every error variant, for log filtering
/// and host-side handling.
pub trait ErrorCode {
    fn error_code(&self) -> &'static str;
}

/// Capture-side trace violations.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("record index {index} does not increase past {last}")]
    NonMonotonicIndex { index: u64, last: u64 },
}

impl ErrorCode for TraceError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NonMonotonicIndex { .. } => "TRACE_NON_MONOTONIC_INDEX",
        }
    }
}

/// Failures at the external mapping boundary.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("mapping metadata unavailable: {message}")]
    Unavailable { message: String },

    #[error("mapping metadata lookup timed out after {millis}ms")]
    Timeout { millis: u64 },

    #[error("mapping metadata inconsistent: {message}")]
    Inconsistent { message: String },
}

impl ErrorCode for MappingError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => "MAPPING_UNAVAILABLE",
            Self::Timeout { .. } => "MAPPING_TIMEOUT",
            Self::Inconsistent { .. } => "MAPPING_INCONSISTENT",
        }
    }
}

/// Configuration load/validation failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse config: {message}")]
    Parse { message: String },

    #[error("invalid config value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "CONFIG_PARSE",
            Self::Invalid { .. } => "CONFIG_INVALID",
        }
    }
}
