//! Shared data model for the Cairn workflow orchestrator.
//!
//! This crate defines the wire-level types that the engine, the CLI, and
//! handler implementations all agree on:
//!
//! - [`WorkflowDocument`]: a parsed capability-module document (inputs,
//!   outputs, parameters, ordered steps)
//! - [`CapabilityDescriptor`]: a catalog entry mapping a capability
//!   reference to a handler shape
//! - [`RunResult`]: the outcome of one workflow execution
//!
//! It deliberately contains no execution logic; that lives in
//! `cairn-engine`.

pub mod capability;
pub mod document;
pub mod error;
pub mod run;

pub use capability::{CapabilityDescriptor, FieldSpec, HandlerKind};
pub use document::{OutputDecl, Step, WorkflowDocument};
pub use error::DocumentError;
pub use run::{RunId, RunResult, StepLogEntry, StepStatus};
