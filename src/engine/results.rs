//! Result collection for one execution pass.
//!
//! The [`ResultLog`] is an append-only record list plus running counters.
//! Appending is the only way to mutate it, which keeps the two in lockstep:
//! exactly one record per evaluated case, and counters that always sum to
//! the record list.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Outcome of a single evaluated test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pass,
    Fail,
    Skip,
    Pending,
}

/// Coarse classification for a captured failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureCategory {
    /// A matcher/assertion signalled a mismatch.
    Assertion,
    /// The body returned an error that is not an assertion.
    Runtime,
    /// The body or a hook panicked; payload captured at the case boundary.
    Panic,
    /// Measured execution time exceeded the case's timeout option.
    Timeout,
    /// A suite or module failed to load.
    Load,
}

/// The structured error object exchanged with the matcher library.
///
/// Matchers raise this on mismatch; the engine also synthesizes one from a
/// caught panic or a timeout so every failure path lands in the same shape.
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub message: String,
    pub category: FailureCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Failure {
    pub fn assertion(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            category: FailureCategory::Assertion,
            context: None,
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            category: FailureCategory::Runtime,
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Builds a Failure from a `catch_unwind` payload.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "panic with non-string payload".to_string()
        };
        Self {
            message,
            category: FailureCategory::Panic,
            context: None,
        }
    }

    pub fn timeout(limit: Duration, elapsed: Duration) -> Self {
        Self {
            message: format!(
                "case exceeded its timeout: limit {:?}, measured {:?}",
                limit, elapsed
            ),
            category: FailureCategory::Timeout,
            context: None,
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// One structured result per evaluated test case.
#[derive(Debug, Clone, Serialize)]
pub struct TestRecord {
    pub status: TestStatus,
    pub name: String,
    /// Ancestor group names plus the case's own name, outermost first.
    pub path: Vec<String>,
    pub path_display: String,
    pub timestamp: DateTime<Utc>,
    /// Wall time around hooks + body, monotonic clock. Absent on the skip path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Failure>,
    /// True when the case declared it expects its body to raise.
    pub expect_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

impl TestRecord {
    pub fn new(status: TestStatus, name: impl Into<String>, path: Vec<String>) -> Self {
        let path_display = path.join(" > ");
        Self {
            status,
            name: name.into(),
            path,
            path_display,
            timestamp: Utc::now(),
            elapsed: None,
            error: None,
            expect_error: false,
            skip_reason: None,
        }
    }
}

/// Running pass/fail/skip tallies for one execution pass.
///
/// `failures` also counts definition-level errors (a group body that
/// panicked), which produce no TestRecord. Pending cases tally under
/// `pending` here and fold into the skipped column of file aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    pub passes: usize,
    pub failures: usize,
    pub skipped: usize,
    pub pending: usize,
}

impl Counters {
    pub fn skipped_total(&self) -> usize {
        self.skipped + self.pending
    }
}

/// Append-only structured result log plus counters.
#[derive(Debug, Default)]
pub struct ResultLog {
    records: Vec<TestRecord>,
    counters: Counters,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one record and updates the matching counter.
    pub fn append(&mut self, record: TestRecord) {
        match record.status {
            TestStatus::Pass => self.counters.passes += 1,
            TestStatus::Fail => self.counters.failures += 1,
            TestStatus::Skip => self.counters.skipped += 1,
            TestStatus::Pending => self.counters.pending += 1,
        }
        self.records.push(record);
    }

    /// Counts a definition-level failure that has no per-case record.
    pub fn count_definition_failure(&mut self) {
        self.counters.failures += 1;
    }

    pub fn records(&self) -> &[TestRecord] {
        &self.records
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }
}
