//! Workflow executor.
//!
//! Interprets a workflow document as a strictly sequential program of
//! steps: resolve each step's input bindings, dispatch to the capability's
//! handler, write the result through the step's output bindings, and
//! assemble the declared outputs at the end.
//!
//! The executor has exactly two states, running and done, with no
//! backward transitions: no retry loop, no branching. Failures are scoped
//! tightly: a validation failure aborts before any step executes; a
//! resolution or handler failure marks only its own step and the run
//! continues; whatever outputs were written remain in the result
//! (partial-result policy, no rollback).

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use cairn_types::{
    FieldSpec, RunId, RunResult, Step, StepLogEntry, StepStatus, WorkflowDocument,
};

use crate::binding::{self, PathExpr, RunState};
use crate::catalog::Catalog;
use crate::dispatch::Dispatcher;
use crate::error::ResolutionError;
use crate::handler::{AgentCache, HandlerInputs, HandlerRegistry};
use crate::store::RunStore;
use crate::validate::validate_document;

/// Executes workflow documents against a catalog and handler registry.
///
/// The executor itself is stateless across runs: every `execute` call gets
/// a fresh run id, store, and agent cache, so concurrent runs never
/// observe each other.
pub struct WorkflowExecutor {
    catalog: Arc<Catalog>,
    dispatcher: Dispatcher,
}

impl WorkflowExecutor {
    /// Create an executor over a loaded catalog and handler registry.
    pub fn new(catalog: Arc<Catalog>, registry: Arc<HandlerRegistry>) -> Self {
        Self {
            catalog,
            dispatcher: Dispatcher::new(registry),
        }
    }

    /// Execute one workflow document to completion.
    pub async fn execute(&self, doc: &WorkflowDocument) -> RunResult {
        let violations = validate_document(doc);
        if !violations.is_empty() {
            warn!(
                workflow = %doc.name,
                violations = violations.len(),
                "Workflow document failed validation"
            );
            return RunResult::aborted(
                violations
                    .iter()
                    .map(|v| format!("validation error at {}", v))
                    .collect(),
            );
        }

        let run_id = RunId::new();
        let store = Arc::new(RunStore::new(run_id));
        let agents = AgentCache::new();
        let mut state = RunState::new(doc, store.clone());
        let mut logs = Vec::new();
        let mut success = true;

        info!(
            run_id = %run_id,
            workflow = %doc.name,
            steps = doc.workflow.len(),
            "Workflow run starting"
        );

        for step in &doc.workflow {
            let started = Instant::now();
            let descriptor = self.catalog.lookup(&step.compute_capability_ref);
            let mut notes: Vec<String> = Vec::new();

            let (inputs, skipped) = match resolve_step_inputs(step, descriptor, &state) {
                Ok(resolved) => resolved,
                Err(e) => {
                    debug!(step_id = %step.step_id, error = %e, "Input resolution failed");
                    success = false;
                    logs.push(
                        step_entry(step, StepStatus::Error, vec![], started, Some(e.to_string()))
                            .to_string(),
                    );
                    continue;
                }
            };
            notes.extend(skipped);
            let input_names: Vec<String> = inputs.keys().cloned().collect();

            let fallback_outputs = if descriptor.is_none() {
                fallback_output_specs(step, doc)
            } else {
                Vec::new()
            };

            let outcome = self
                .dispatcher
                .dispatch(
                    descriptor,
                    &step.compute_capability_ref,
                    &step.description,
                    inputs,
                    &store,
                    &agents,
                    &fallback_outputs,
                )
                .await;
            if let Some(note) = outcome.note {
                notes.push(note);
            }

            let status = if outcome.result.is_success() {
                let data = output_map(outcome.result.data);
                let mut write_failed = false;
                for (key, target) in &step.output_bindings {
                    match data.get(key) {
                        Some(value) => {
                            if let Err(e) = binding::write(target, value.clone(), &mut state) {
                                write_failed = true;
                                notes.push(format!("output '{}': {}", key, e));
                            }
                        }
                        None => {
                            debug!(
                                step_id = %step.step_id,
                                output = %key,
                                "Handler produced no value for bound output"
                            );
                        }
                    }
                }
                state.record_step_outputs(&step.step_id, data);
                if write_failed {
                    success = false;
                    StepStatus::Error
                } else {
                    StepStatus::Success
                }
            } else {
                success = false;
                if let Some(message) = outcome.result.message {
                    notes.push(message);
                }
                StepStatus::Error
            };

            let detail = if notes.is_empty() {
                None
            } else {
                Some(notes.join("; "))
            };
            logs.push(step_entry(step, status, input_names, started, detail).to_string());
        }

        let outputs = state.into_outputs();
        info!(
            run_id = %run_id,
            success,
            outputs = outputs.len(),
            "Workflow run finished"
        );

        RunResult {
            success,
            logs,
            outputs,
        }
    }
}

/// Resolve a step's input bindings, applying the required-input policy:
/// a binding that fails for a declared-optional input is skipped with a
/// note; any other failure fails the step, including a required input
/// with no binding at all.
fn resolve_step_inputs(
    step: &Step,
    descriptor: Option<&cairn_types::CapabilityDescriptor>,
    state: &RunState,
) -> Result<(HandlerInputs, Vec<String>), ResolutionError> {
    let optional: HashSet<&str> = descriptor
        .map(|d| {
            d.inputs
                .iter()
                .filter(|f| f.optional)
                .map(|f| f.name.as_str())
                .collect()
        })
        .unwrap_or_default();

    let mut inputs = HandlerInputs::new();
    let mut notes = Vec::new();
    for (name, expr) in &step.input_bindings {
        match binding::resolve(expr, state) {
            Ok(value) => {
                inputs.insert(name.clone(), value);
            }
            Err(e) if optional.contains(name.as_str()) => {
                notes.push(format!("optional input '{}' skipped: {}", name, e));
            }
            Err(e) => return Err(e),
        }
    }

    if let Some(descriptor) = descriptor {
        for spec in descriptor.inputs.iter().filter(|f| !f.optional) {
            if !inputs.contains_key(&spec.name) {
                return Err(ResolutionError::MissingRequiredInput {
                    name: spec.name.clone(),
                    capability: descriptor.id.clone(),
                });
            }
        }
    }

    Ok((inputs, notes))
}

/// Output shape to mock against when the capability reference is absent
/// from the catalog: one field per output binding, typed from the
/// workflow's declared output when the target is `cacm.outputs.<name>`.
fn fallback_output_specs(step: &Step, doc: &WorkflowDocument) -> Vec<FieldSpec> {
    step.output_bindings
        .iter()
        .map(|(key, target)| {
            let kind = match binding::parse_path(target) {
                Ok(PathExpr::WorkflowOutput { name, .. }) => {
                    doc.outputs.get(&name).and_then(|decl| decl.kind.clone())
                }
                _ => None,
            };
            FieldSpec {
                name: key.clone(),
                kind,
                optional: false,
            }
        })
        .collect()
}

/// Normalize handler result data into a named-output map.
fn output_map(data: Option<Value>) -> Map<String, Value> {
    match data {
        Some(Value::Object(map)) => map,
        Some(other) => {
            let mut map = Map::new();
            map.insert("result".to_string(), other);
            map
        }
        None => Map::new(),
    }
}

fn step_entry(
    step: &Step,
    status: StepStatus,
    inputs: Vec<String>,
    started: Instant,
    detail: Option<String>,
) -> StepLogEntry {
    StepLogEntry {
        timestamp: Utc::now(),
        step_id: step.step_id.clone(),
        capability_ref: step.compute_capability_ref.clone(),
        status,
        inputs,
        elapsed_ms: started.elapsed().as_millis() as u64,
        detail,
    }
}
