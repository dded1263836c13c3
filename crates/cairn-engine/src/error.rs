//! Error types for the execution core.

use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised while resolving or writing a binding expression.
///
/// Every variant is scoped to a single step: the executor records the
/// failure against the step and continues the run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    /// A string rooted at a recognized namespace did not parse as a path.
    #[error("Binding '{expr}' is not a valid path: {reason}")]
    InvalidPath {
        /// The offending expression.
        expr: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The workflow declares no input with this name.
    #[error("Unknown workflow input '{0}'")]
    UnknownInput(String),

    /// The workflow declares no parameter with this name.
    #[error("Unknown workflow parameter '{0}'")]
    UnknownParameter(String),

    /// The referenced step has not executed yet (or failed and recorded
    /// no outputs). Forward references land here.
    #[error("Step '{0}' has not executed or recorded no outputs")]
    StepNotExecuted(String),

    /// The referenced step executed but produced no output with this name.
    #[error("Step '{step_id}' produced no output named '{name}'")]
    UnknownStepOutput {
        /// The referenced step.
        step_id: String,
        /// The missing output name.
        name: String,
    },

    /// No entry exists in the shared run store under this key.
    #[error("No shared-store entry under key '{0}'")]
    MissingStoreKey(String),

    /// A subpath segment did not resolve (missing key or wrong shape).
    #[error("Binding '{expr}': cannot resolve segment '{segment}'")]
    MissingSegment {
        /// The full expression being resolved.
        expr: String,
        /// The segment that failed.
        segment: String,
    },

    /// A numeric index fell outside the sequence bounds.
    #[error("Binding '{expr}': index {index} out of range (length {len})")]
    IndexOutOfRange {
        /// The full expression being resolved.
        expr: String,
        /// The out-of-range index.
        index: usize,
        /// The actual sequence length.
        len: usize,
    },

    /// The expression is not usable as a write target.
    #[error("Invalid write target '{expr}': {reason}")]
    InvalidTarget {
        /// The offending target expression.
        expr: String,
        /// Why it cannot be written to.
        reason: String,
    },

    /// A required capability input had no resolvable binding.
    #[error("Missing required input '{name}' for capability '{capability}'")]
    MissingRequiredInput {
        /// The declared input name.
        name: String,
        /// The capability that declares it.
        capability: String,
    },
}

/// Errors raised outside of step execution (catalog loading and similar
/// setup paths). Step-scoped failures never surface here; they become
/// log entries on the `RunResult` instead.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The capability catalog could not be loaded.
    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    /// Failed to read a file.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// The path that could not be read.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A binding failure escaping a non-step context.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}
