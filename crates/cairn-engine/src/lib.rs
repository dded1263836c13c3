//! Workflow execution core for Cairn.
//!
//! This crate interprets capability-module workflow documents: a small
//! interpreter over a graph of named bindings, a capability-resolution and
//! dispatch layer supporting two handler shapes (stateful agents and
//! stateless skills), a per-run shared mutable store, and a
//! degrade-gracefully policy for capabilities with no implementation.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  WorkflowExecutor                                        │
//! │  - validates the document (pre-run gate)                 │
//! │  - creates RunId + RunStore + AgentCache per run         │
//! │  - per step: resolve bindings → dispatch → write outputs │
//! │  - assembles declared outputs into a RunResult           │
//! └──────────────────────────────────────────────────────────┘
//!        │                │                   │
//!   binding::resolve   Dispatcher          RunStore
//!   binding::write     (agent/skill/mock)  (intermediate.*)
//! ```
//!
//! Steps run strictly sequentially; all step-level failures become log
//! entries and a `success` flag, never errors out of the executor.

pub mod binding;
pub mod catalog;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod handler;
pub mod store;
pub mod validate;

pub use binding::{PathExpr, RunState, Segment};
pub use catalog::Catalog;
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use error::{EngineError, ResolutionError, Result};
pub use executor::WorkflowExecutor;
pub use handler::{
    Agent, AgentCache, AgentFactory, HandlerInputs, HandlerRegistry, HandlerResult, HandlerStatus,
    SkillFn,
};
pub use store::RunStore;
pub use validate::{Violation, validate_document};
