//! Capability catalog entries.
//!
//! A [`CapabilityDescriptor`] maps a capability-reference string to a handler
//! shape: a stateful agent type, a stateless skill function, or neither. A
//! descriptor with neither is a declared-but-unimplemented capability, which
//! is a valid state: the dispatcher degrades it to deterministic mock
//! output instead of failing the run.
//!
//! # Example JSON
//!
//! ```json
//! {
//!   "id": "compute_ratios",
//!   "description": "Derive core financial ratios",
//!   "skill_plugin_name": "financial_analysis",
//!   "skill_function_name": "compute_ratios",
//!   "inputs": [ { "name": "data", "type": "object" } ],
//!   "outputs": [ { "name": "ratios", "type": "object" } ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// One entry in the capability catalog.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CapabilityDescriptor {
    /// Unique capability reference.
    pub id: String,

    /// Human-readable name.
    #[serde(default)]
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Agent handler class name, when the capability is agent-backed.
    #[serde(default)]
    pub agent_type: Option<String>,

    /// Skill plugin name, when the capability is skill-backed.
    #[serde(default)]
    pub skill_plugin_name: Option<String>,

    /// Skill function name within the plugin.
    #[serde(default)]
    pub skill_function_name: Option<String>,

    /// Declared input parameters. Used for required-input checks and
    /// documentation, not strictly enforced at runtime.
    #[serde(default)]
    pub inputs: Vec<FieldSpec>,

    /// Declared output fields. Used for mock generation.
    #[serde(default)]
    pub outputs: Vec<FieldSpec>,
}

/// A declared input or output field on a capability.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FieldSpec {
    /// Field name.
    pub name: String,

    /// Declared type name (e.g. "string", "number", "object").
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    /// Whether the field may be omitted.
    #[serde(default)]
    pub optional: bool,
}

impl FieldSpec {
    /// A required field with a declared type.
    pub fn required(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: Some(kind.into()),
            optional: false,
        }
    }

    /// A zero/empty placeholder value conforming to the declared type.
    pub fn placeholder(&self) -> Value {
        placeholder_for(self.kind.as_deref())
    }
}

/// The handler shape a descriptor resolves to. Selected once per lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerKind {
    /// A stateful, run-scoped handler instance.
    Agent {
        /// Agent class name used to key the per-run instance cache.
        agent_type: String,
    },
    /// A stateless named function.
    Skill {
        /// Plugin the function belongs to.
        plugin: String,
        /// Function name within the plugin.
        function: String,
    },
    /// Declared but has no concrete implementation.
    Unbound,
}

impl CapabilityDescriptor {
    /// Resolve the handler shape for this descriptor.
    ///
    /// `agent_type` wins when both shapes are named. A skill shape requires
    /// both plugin and function names; anything less is [`HandlerKind::Unbound`].
    pub fn handler_kind(&self) -> HandlerKind {
        if let Some(agent_type) = &self.agent_type {
            return HandlerKind::Agent {
                agent_type: agent_type.clone(),
            };
        }
        if let (Some(plugin), Some(function)) =
            (&self.skill_plugin_name, &self.skill_function_name)
        {
            return HandlerKind::Skill {
                plugin: plugin.clone(),
                function: function.clone(),
            };
        }
        HandlerKind::Unbound
    }
}

/// A zero/empty placeholder value for a declared type name.
///
/// Unknown or missing types map to `null`.
pub fn placeholder_for(kind: Option<&str>) -> Value {
    match kind.map(|k| k.to_ascii_lowercase()).as_deref() {
        Some("string" | "str" | "text") => json!(""),
        Some("number" | "integer" | "int" | "float" | "double") => json!(0),
        Some("boolean" | "bool") => json!(false),
        Some("object" | "map" | "dict") => json!({}),
        Some("array" | "list") => json!([]),
        _ => Value::Null,
    }
}
