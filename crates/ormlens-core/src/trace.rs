//! Query trace model — the ordered, immutable log of captured
//! statement executions that detectors analyze.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::TraceError;

/// One frame of the call site captured alongside a statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallFrame {
    pub file: String,
    pub line: u32,
    pub function: String,
    /// Enclosing class/type, when the capture layer knows it.
    pub class: Option<String>,
}

impl CallFrame {
    pub fn new(file: impl Into<String>, line: u32, function: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            function: function.into(),
            class: None,
        }
    }
}

/// One captured statement execution. Created once by the capture
/// boundary, never mutated, owned by the trace that contains it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRecord {
    /// Strictly increasing capture-order index. Defines trace order.
    pub index: u64,
    /// The statement text, lowered to executable SQL where possible.
    pub text: String,
    /// Bound parameter values, in bind order. May be empty.
    #[serde(default)]
    pub parameters: Vec<serde_json::Value>,
    /// Elapsed execution time.
    pub duration: Duration,
    /// Rows returned/affected, when known.
    pub row_count: Option<u64>,
    /// Call-site frames, innermost first. May be empty.
    #[serde(default)]
    pub call_site: Vec<CallFrame>,
}

impl QueryRecord {
    pub fn new(index: u64, text: impl Into<String>, duration: Duration) -> Self {
        Self {
            index,
            text: text.into(),
            parameters: Vec::new(),
            duration,
            row_count: None,
            call_site: Vec::new(),
        }
    }

    pub fn with_call_site(mut self, frames: Vec<CallFrame>) -> Self {
        self.call_site = frames;
        self
    }

    pub fn with_row_count(mut self, rows: u64) -> Self {
        self.row_count = Some(rows);
        self
    }

    pub fn with_parameters(mut self, parameters: Vec<serde_json::Value>) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Ordered sequence of captured statements. Append-only during
/// capture, immutable during analysis.
///
/// Invariant: records appear in strictly increasing `index` order;
/// no two records share an index. `push` enforces this.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryTrace {
    records: Vec<QueryRecord>,
}

impl QueryTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a trace from records already in capture order.
    /// Fails on the first index regression or duplicate.
    pub fn from_records(records: Vec<QueryRecord>) -> Result<Self, TraceError> {
        let mut trace = Self::new();
        for record in records {
            trace.push(record)?;
        }
        Ok(trace)
    }

    /// Append a record. The capture boundary assigns indices; this
    /// only verifies monotonicity.
    pub fn push(&mut self, record: QueryRecord) -> Result<(), TraceError> {
        if let Some(last) = self.records.last() {
            if record.index <= last.index {
                return Err(TraceError::NonMonotonicIndex {
                    index: record.index,
                    last: last.index,
                });
            }
        }
        self.records.push(record);
        Ok(())
    }

    pub fn records(&self) -> &[QueryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up a record by its capture index.
    pub fn get(&self, index: u64) -> Option<&QueryRecord> {
        self.records
            .binary_search_by_key(&index, |r| r.index)
            .ok()
            .map(|pos| &self.records[pos])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QueryRecord> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a QueryTrace {
    type Item = &'a QueryRecord;
    type IntoIter = std::slice::Iter<'a, QueryRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
