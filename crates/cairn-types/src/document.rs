//! Workflow document model.
//!
//! Parses JSON capability-module documents into [`WorkflowDocument`] structs.
//! A document declares named inputs, named outputs, optional parameters, and
//! an ordered list of steps, each referencing a logical compute capability.
//!
//! # Example JSON
//!
//! ```json
//! {
//!   "id": "ratio_analysis",
//!   "name": "Ratio Analysis",
//!   "inputs": {
//!     "financials": { "value": { "revenue": 120 }, "type": "object" }
//!   },
//!   "outputs": {
//!     "summary": { "type": "string", "description": "Narrative summary" }
//!   },
//!   "workflow": [
//!     {
//!       "stepId": "step-1",
//!       "description": "Compute core ratios",
//!       "computeCapabilityRef": "compute_ratios",
//!       "inputBindings": { "data": "cacm.inputs.financials" },
//!       "outputBindings": { "summary": "cacm.outputs.summary" }
//!     }
//!   ]
//! }
//! ```
//!
//! Step order is the only control-flow construct: there are no branches,
//! loops, or conditionals. The document is read-only once parsed.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DocumentError;

/// A complete, immutable workflow document.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDocument {
    /// Document identifier. Metadata only, no effect on execution.
    #[serde(default)]
    pub id: String,

    /// Human-readable name.
    #[serde(default)]
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Declared inputs: name → raw record.
    ///
    /// Records conventionally carry `{value, description, type}` but are
    /// kept as raw JSON so the binding resolver can apply its value-unwrap
    /// rule against the record exactly as written.
    #[serde(default)]
    pub inputs: BTreeMap<String, Value>,

    /// Declared outputs: name → declaration.
    ///
    /// A declaration of what the run must eventually populate via
    /// `cacm.outputs.*` write targets; not filled in until execution.
    #[serde(default)]
    pub outputs: BTreeMap<String, OutputDecl>,

    /// Optional named parameters, usable identically to inputs within
    /// binding expressions.
    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,

    /// The ordered list of steps.
    #[serde(default)]
    pub workflow: Vec<Step>,
}

/// A single step within a workflow.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Unique step identifier within the document.
    pub step_id: String,

    /// Informational description. Also passed to agent handlers as the
    /// task description for the invocation.
    #[serde(default)]
    pub description: String,

    /// Key into the capability catalog.
    pub compute_capability_ref: String,

    /// Capability input-parameter name → binding expression.
    ///
    /// A binding expression is any JSON value; strings rooted at `cacm.`,
    /// `steps.`, or `intermediate.` are path expressions, everything else
    /// is a literal.
    #[serde(default)]
    pub input_bindings: BTreeMap<String, Value>,

    /// Capability output-field name → write-target path expression.
    #[serde(default)]
    pub output_bindings: BTreeMap<String, String>,
}

/// Declaration of a single workflow output.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputDecl {
    /// Declared type name (e.g. "string", "number", "object").
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

impl WorkflowDocument {
    /// Parse a workflow document from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        serde_json::from_str(json).map_err(|e| DocumentError::Parse(e.to_string()))
    }

    /// Parse a workflow document from an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        serde_json::from_value(value).map_err(|e| DocumentError::Parse(e.to_string()))
    }

    /// Load a workflow document from a file path.
    pub fn from_file(path: &Path) -> Result<Self, DocumentError> {
        let content = std::fs::read_to_string(path).map_err(|e| DocumentError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    /// Look up a step by its identifier.
    pub fn step(&self, step_id: &str) -> Option<&Step> {
        self.workflow.iter().find(|s| s.step_id == step_id)
    }
}
