//! Error types for document and catalog parsing.

use thiserror::Error;

/// Errors raised while loading a workflow document or capability catalog.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Failed to read a document from disk.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// The path that could not be read.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid JSON or does not match the expected shape.
    #[error("Invalid document: {0}")]
    Parse(String),
}
