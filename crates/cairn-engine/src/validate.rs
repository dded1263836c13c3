//! Pre-run document validation.
//!
//! A yes/no gate invoked once before execution: it returns a list of
//! `(path, message)` violations, and any violation short-circuits the run
//! with zero steps executed.
//!
//! Validation covers structural problems only: duplicate or empty step
//! ids, empty capability references, malformed binding paths, unusable
//! write targets. Runtime conditions are deliberately out of scope here:
//! a forward step reference or a capability missing from the catalog is
//! handled during execution (step-level error and mock fallback
//! respectively), not rejected up front.

use std::collections::HashSet;

use serde_json::Value;

use cairn_types::WorkflowDocument;

use crate::binding;

/// A single validation violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON-pointer-ish location of the problem.
    pub path: String,
    /// What is wrong there.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Validate a workflow document, returning every violation found.
///
/// An empty result means the document may execute.
pub fn validate_document(doc: &WorkflowDocument) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut seen_ids = HashSet::new();

    for (index, step) in doc.workflow.iter().enumerate() {
        let at = |field: &str| format!("workflow[{}].{}", index, field);

        if step.step_id.is_empty() {
            violations.push(Violation {
                path: at("stepId"),
                message: "step id cannot be empty".to_string(),
            });
        } else if !seen_ids.insert(step.step_id.as_str()) {
            violations.push(Violation {
                path: at("stepId"),
                message: format!("duplicate step id '{}'", step.step_id),
            });
        }

        if step.compute_capability_ref.is_empty() {
            violations.push(Violation {
                path: at("computeCapabilityRef"),
                message: "capability reference cannot be empty".to_string(),
            });
        }

        for (input_name, expr) in &step.input_bindings {
            // Path-shaped strings must parse; existence is checked at run
            // time so forward references stay a step-level concern.
            if let Value::String(s) = expr
                && binding::is_path_string(s)
                && let Err(e) = binding::parse_path(s)
            {
                violations.push(Violation {
                    path: format!("workflow[{}].inputBindings.{}", index, input_name),
                    message: e.to_string(),
                });
            }
        }

        for (output_name, target) in &step.output_bindings {
            if let Err(e) = binding::validate_write_target(target) {
                violations.push(Violation {
                    path: format!("workflow[{}].outputBindings.{}", index, output_name),
                    message: e.to_string(),
                });
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> WorkflowDocument {
        WorkflowDocument::from_value(v).unwrap()
    }

    #[test]
    fn test_valid_document() {
        let d = doc(json!({
            "workflow": [
                {
                    "stepId": "s1",
                    "computeCapabilityRef": "add",
                    "inputBindings": { "num1": "cacm.inputs.a", "literal": 3 },
                    "outputBindings": { "sum": "cacm.outputs.sum" }
                },
                {
                    "stepId": "s2",
                    "computeCapabilityRef": "store_it",
                    "inputBindings": { "v": "steps.s1.outputs.sum" },
                    "outputBindings": { "v": "intermediate.saved" }
                }
            ]
        }));
        assert!(validate_document(&d).is_empty());
    }

    #[test]
    fn test_empty_workflow_is_valid() {
        assert!(validate_document(&doc(json!({}))).is_empty());
    }

    #[test]
    fn test_duplicate_step_ids() {
        let d = doc(json!({
            "workflow": [
                { "stepId": "dup", "computeCapabilityRef": "a" },
                { "stepId": "dup", "computeCapabilityRef": "b" }
            ]
        }));
        let violations = validate_document(&d);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "workflow[1].stepId");
        assert!(violations[0].message.contains("duplicate"));
    }

    #[test]
    fn test_empty_step_id_and_ref() {
        let d = doc(json!({
            "workflow": [ { "stepId": "", "computeCapabilityRef": "" } ]
        }));
        let violations = validate_document(&d);
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn test_bad_output_binding_target() {
        let d = doc(json!({
            "workflow": [{
                "stepId": "s1",
                "computeCapabilityRef": "c",
                "outputBindings": { "x": "cacm.inputs.a" }
            }]
        }));
        let violations = validate_document(&d);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "workflow[0].outputBindings.x");
    }

    #[test]
    fn test_malformed_input_binding_path() {
        let d = doc(json!({
            "workflow": [{
                "stepId": "s1",
                "computeCapabilityRef": "c",
                "inputBindings": { "x": "cacm.nowhere.a" }
            }]
        }));
        let violations = validate_document(&d);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].path.contains("inputBindings.x"));
    }

    #[test]
    fn test_forward_reference_is_not_a_violation() {
        let d = doc(json!({
            "workflow": [{
                "stepId": "s1",
                "computeCapabilityRef": "c",
                "inputBindings": { "x": "steps.s9.outputs.y" }
            }]
        }));
        assert!(validate_document(&d).is_empty());
    }

    #[test]
    fn test_literal_strings_not_validated_as_paths() {
        let d = doc(json!({
            "workflow": [{
                "stepId": "s1",
                "computeCapabilityRef": "c",
                "inputBindings": { "url": "https://example.com/a.b.c" }
            }]
        }));
        assert!(validate_document(&d).is_empty());
    }

    #[test]
    fn test_violation_display() {
        let v = Violation {
            path: "workflow[0].stepId".into(),
            message: "step id cannot be empty".into(),
        };
        assert_eq!(v.to_string(), "workflow[0].stepId: step id cannot be empty");
    }
}
