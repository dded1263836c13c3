//! Run identity and run results.
//!
//! A run is one complete execution of a workflow document. Each run gets a
//! fresh [`RunId`]; the executor returns one [`RunResult`] per invocation
//! and retains nothing afterwards.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Unique identifier for a single workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of a single step's dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The handler (or its mock stand-in) completed successfully.
    Success,
    /// Input resolution, the handler, or an output write failed.
    Error,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepStatus::Success => write!(f, "success"),
            StepStatus::Error => write!(f, "error"),
        }
    }
}

/// Structured log entry for one executed step.
///
/// Rendered via `Display` into the flat log lines carried on [`RunResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepLogEntry {
    /// When the step finished.
    pub timestamp: DateTime<Utc>,
    /// The step identifier.
    pub step_id: String,
    /// The capability reference the step dispatched to.
    pub capability_ref: String,
    /// Step outcome.
    pub status: StepStatus,
    /// Names of the inputs that resolved successfully.
    pub inputs: Vec<String>,
    /// Wall-clock time spent in resolution + dispatch + writes.
    pub elapsed_ms: u64,
    /// Error message or degradation note, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl std::fmt::Display for StepLogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] capability '{}' {} in {}ms",
            self.timestamp.to_rfc3339(),
            self.step_id,
            self.capability_ref,
            self.status,
            self.elapsed_ms
        )?;
        if !self.inputs.is_empty() {
            write!(f, " (inputs: {})", self.inputs.join(", "))?;
        }
        if let Some(detail) = &self.detail {
            write!(f, ": {}", detail)?;
        }
        Ok(())
    }
}

/// The result of one workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// True iff every step dispatched successfully.
    pub success: bool,
    /// Ordered log lines for the whole run.
    pub logs: Vec<String>,
    /// The populated workflow outputs. Declared outputs that were never
    /// written are simply absent.
    pub outputs: BTreeMap<String, Value>,
}

impl RunResult {
    /// A failed result carrying only log lines, produced when the run
    /// never reached step execution.
    pub fn aborted(logs: Vec<String>) -> Self {
        Self {
            success: false,
            logs,
            outputs: BTreeMap::new(),
        }
    }
}
