//! Analysis configuration.
//!
//! All detector heuristics are tunable here; the literal defaults are
//! starting points, not constants baked into the detectors.

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Configuration for one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Minimum group size before a repeated key lookup counts as a
    /// loop. Default: 10.
    pub loop_threshold: Option<usize>,
    /// Group size at which a loop finding escalates to critical.
    /// Default: 25.
    pub loop_critical_threshold: Option<usize>,
    /// Upper bound (inclusive) on the average consecutive-index gap
    /// for a group to count as a tight loop. Default: 5.0.
    pub gap_window: Option<f64>,
    /// Join count above which a statement gets a warning. Default: 5.
    pub max_joins_recommended: Option<usize>,
    /// Join count above which the warning escalates to critical.
    /// Default: 8.
    pub max_joins_critical: Option<usize>,
    /// Flush count inside one transaction that triggers a warning.
    /// Default: 2.
    pub flush_warning_count: Option<u32>,
    /// Summed statement time inside one transaction, in milliseconds,
    /// above which the transaction is flagged as long-running.
    /// Default: 1000.
    pub long_transaction_ms: Option<u64>,
}

impl AnalysisConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.effective_loop_threshold() == 0 {
            return Err(ConfigError::Invalid {
                field: "loop_threshold",
                message: "must be at least 1".to_string(),
            });
        }
        if self.effective_gap_window() < 0.0 {
            return Err(ConfigError::Invalid {
                field: "gap_window",
                message: "must be non-negative".to_string(),
            });
        }
        if self.effective_flush_warning_count() == 0 {
            return Err(ConfigError::Invalid {
                field: "flush_warning_count",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn effective_loop_threshold(&self) -> usize {
        self.loop_threshold.unwrap_or(10)
    }

    pub fn effective_loop_critical_threshold(&self) -> usize {
        self.loop_critical_threshold.unwrap_or(25)
    }

    pub fn effective_gap_window(&self) -> f64 {
        self.gap_window.unwrap_or(5.0)
    }

    pub fn effective_max_joins_recommended(&self) -> usize {
        self.max_joins_recommended.unwrap_or(5)
    }

    pub fn effective_max_joins_critical(&self) -> usize {
        self.max_joins_critical.unwrap_or(8)
    }

    pub fn effective_flush_warning_count(&self) -> u32 {
        self.flush_warning_count.unwrap_or(2)
    }

    pub fn effective_long_transaction_ms(&self) -> u64 {
        self.long_transaction_ms.unwrap_or(1000)
    }
}
