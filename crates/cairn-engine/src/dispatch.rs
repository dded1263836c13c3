//! Capability dispatch.
//!
//! The [`Dispatcher`] resolves a capability descriptor to an executable
//! handler and invokes it: it obtains-or-creates the run-scoped agent
//! instance, or looks up the named skill function, and normalizes whatever
//! comes back into a [`HandlerResult`].
//!
//! Nothing thrown by a handler escapes this layer: every failure is
//! converted into an error result so the executor can record it and move
//! on to the next step. A capability with no concrete implementation
//! (declared-but-unbound descriptor, reference absent from the catalog, or
//! a named handler nobody registered) degrades to a deterministic mock
//! whose shape matches the declared output schema: an incomplete catalog
//! must never abort an otherwise-runnable workflow.

use std::sync::Arc;

use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use cairn_types::{CapabilityDescriptor, FieldSpec, HandlerKind};

use crate::handler::{AgentCache, HandlerInputs, HandlerRegistry, HandlerResult};
use crate::store::RunStore;

/// Outcome of dispatching one step.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// The normalized handler result.
    pub result: HandlerResult,
    /// Degradation note to surface in the run log (mock fallback and
    /// similar), when there is one.
    pub note: Option<String>,
}

impl DispatchOutcome {
    fn of(result: HandlerResult) -> Self {
        Self { result, note: None }
    }

    fn degraded(result: HandlerResult, note: String) -> Self {
        Self {
            result,
            note: Some(note),
        }
    }
}

/// Routes capability invocations to their handlers.
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
}

impl Dispatcher {
    /// Create a dispatcher over a handler registry.
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    /// Invoke the handler for a capability.
    ///
    /// `descriptor` is the catalog entry when the reference resolved;
    /// `fallback_outputs` is the output shape to mock against when it did
    /// not (derived by the executor from the step's bindings).
    pub async fn dispatch(
        &self,
        descriptor: Option<&CapabilityDescriptor>,
        capability_ref: &str,
        task_description: &str,
        inputs: HandlerInputs,
        store: &Arc<RunStore>,
        agents: &AgentCache,
        fallback_outputs: &[FieldSpec],
    ) -> DispatchOutcome {
        let kind = descriptor
            .map(CapabilityDescriptor::handler_kind)
            .unwrap_or(HandlerKind::Unbound);

        match kind {
            HandlerKind::Agent { agent_type } => {
                let Some(factory) = self.registry.agent_factory(&agent_type) else {
                    return self.mock(descriptor, capability_ref, fallback_outputs, &format!(
                        "agent type '{}' has no registered factory",
                        agent_type
                    ));
                };
                let agent = match agents.get_or_create(&agent_type, factory) {
                    Ok(agent) => agent,
                    Err(e) => {
                        warn!(capability = %capability_ref, agent_type = %agent_type, error = %e, "Agent construction failed");
                        return DispatchOutcome::of(HandlerResult::error(format!(
                            "Failed to construct agent '{}': {}",
                            agent_type, e
                        )));
                    }
                };
                debug!(capability = %capability_ref, agent_type = %agent_type, "Dispatching to agent");
                match agent.run(task_description, &inputs, store).await {
                    Ok(result) => DispatchOutcome::of(result),
                    Err(e) => {
                        warn!(capability = %capability_ref, agent_type = %agent_type, error = %e, "Agent invocation failed");
                        DispatchOutcome::of(HandlerResult::error(format!(
                            "Agent '{}' failed: {}",
                            agent_type, e
                        )))
                    }
                }
            }
            HandlerKind::Skill { plugin, function } => {
                let Some(skill) = self.registry.skill(&plugin, &function) else {
                    return self.mock(descriptor, capability_ref, fallback_outputs, &format!(
                        "skill '{}.{}' has no registered implementation",
                        plugin, function
                    ));
                };
                debug!(capability = %capability_ref, plugin = %plugin, function = %function, "Dispatching to skill");
                match skill(inputs).await {
                    Ok(value) => {
                        DispatchOutcome::of(HandlerResult::success(normalize_skill_output(value)))
                    }
                    Err(e) => {
                        warn!(capability = %capability_ref, plugin = %plugin, function = %function, error = %e, "Skill invocation failed");
                        DispatchOutcome::of(HandlerResult::error(format!(
                            "Skill '{}.{}' failed: {}",
                            plugin, function, e
                        )))
                    }
                }
            }
            HandlerKind::Unbound => {
                let reason = if descriptor.is_some() {
                    "capability is declared but has no concrete implementation".to_string()
                } else {
                    "capability is not in the catalog".to_string()
                };
                self.mock(descriptor, capability_ref, fallback_outputs, &reason)
            }
        }
    }

    /// Deterministic mock result shaped by the declared output schema.
    fn mock(
        &self,
        descriptor: Option<&CapabilityDescriptor>,
        capability_ref: &str,
        fallback_outputs: &[FieldSpec],
        reason: &str,
    ) -> DispatchOutcome {
        let outputs = descriptor
            .map(|d| d.outputs.as_slice())
            .unwrap_or(fallback_outputs);
        let mut data = Map::new();
        for spec in outputs {
            data.insert(spec.name.clone(), spec.placeholder());
        }
        warn!(capability = %capability_ref, reason = %reason, "No handler for capability; producing mock output");
        DispatchOutcome::degraded(
            HandlerResult::success(Value::Object(data)),
            format!(
                "warning: capability '{}' has no handler ({}); produced mock output",
                capability_ref, reason
            ),
        )
    }
}

/// Skills return a bare JSON value; give non-objects a stable field name
/// so output-binding key matching works uniformly.
fn normalize_skill_output(value: Value) -> Value {
    match value {
        Value::Object(_) => value,
        other => json!({ "result": other }),
    }
}
