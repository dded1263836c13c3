//! Binding expression resolution for workflow data flow.
//!
//! A step's `inputBindings` and `outputBindings` are binding expressions:
//! either literals (any JSON value) or path strings that name where a value
//! comes from or where it should be written.
//!
//! # Path Syntax
//!
//! - `cacm.inputs.<name>[.<subpath>]`: a declared workflow input; the
//!   record's `value` field is unwrapped transparently unless a subpath
//!   continues past it (`cacm.inputs.x.value.client_id` descends into the
//!   payload, `cacm.inputs.x.description` reads record metadata)
//! - `cacm.parameters.<name>[.<subpath>]`: same rule, rooted at parameters
//! - `steps.<stepId>.outputs.<name>[.<subpath>]`: a previously executed
//!   step's recorded output
//! - `cacm.outputs.<name>`: write target only; the value becomes part of
//!   the workflow's final outputs
//! - `intermediate.<key>[.<subpath>]`: the shared run store
//!
//! Subpaths navigate nested maps and sequences by key or numeric index,
//! with `items[0].name` bracket indices supported. A string is a path
//! expression only when its first dot-segment is one of the recognized
//! roots; everything else (URLs, prose, file names) stays a literal.
//!
//! Resolution is pure and side-effect-free; [`write`] is the only mutation
//! point, always scoped to the current run's state.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use cairn_types::{RunId, WorkflowDocument};

use crate::error::ResolutionError;
use crate::store::RunStore;

/// Roots that mark a string as a path expression.
const RESERVED_ROOTS: [&str; 3] = ["cacm", "steps", "intermediate"];

/// One segment of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A map key.
    Key(String),
    /// A numeric sequence index.
    Index(usize),
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Segment::Key(k) => write!(f, "{}", k),
            Segment::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// A structured, validated path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathExpr {
    /// `cacm.inputs.<name>[.<subpath>]`
    Input {
        /// Declared input name.
        name: String,
        /// Remaining navigation into the record.
        subpath: Vec<Segment>,
    },
    /// `cacm.parameters.<name>[.<subpath>]`
    Parameter {
        /// Declared parameter name.
        name: String,
        /// Remaining navigation into the record.
        subpath: Vec<Segment>,
    },
    /// `cacm.outputs.<name>`, valid only as a write target.
    WorkflowOutput {
        /// Declared output name.
        name: String,
        /// Anything past the name (invalid for writes, kept for errors).
        subpath: Vec<Segment>,
    },
    /// `steps.<stepId>.outputs.<name>[.<subpath>]`
    StepOutput {
        /// The referenced step.
        step_id: String,
        /// The output name within that step's recorded outputs.
        name: String,
        /// Remaining navigation into the output value.
        subpath: Vec<Segment>,
    },
    /// `intermediate.<key>[.<subpath>]`, the shared run store.
    Store {
        /// Flat store key.
        key: String,
        /// Remaining navigation into the stored value.
        subpath: Vec<Segment>,
    },
}

/// Whether a string should be treated as a path expression rather than a
/// literal.
pub fn is_path_string(s: &str) -> bool {
    match s.split_once('.') {
        Some((root, rest)) => !rest.is_empty() && RESERVED_ROOTS.contains(&root),
        None => false,
    }
}

fn invalid(expr: &str, reason: impl Into<String>) -> ResolutionError {
    ResolutionError::InvalidPath {
        expr: expr.to_string(),
        reason: reason.into(),
    }
}

/// Parse a path expression into its structured form.
///
/// The input must already be a path string (see [`is_path_string`]);
/// anything malformed past the root is an error, not a silent literal, so
/// typos surface at the step that carries them.
pub fn parse_path(expr: &str) -> Result<PathExpr, ResolutionError> {
    let segments = parse_segments(expr)?;

    let root = match segments.first() {
        Some(Segment::Key(root)) => root.as_str(),
        _ => return Err(invalid(expr, "missing root namespace")),
    };

    match root {
        "cacm" => {
            let namespace = match segments.get(1) {
                Some(Segment::Key(ns)) => ns.as_str(),
                _ => return Err(invalid(expr, "expected 'inputs', 'parameters', or 'outputs' after 'cacm'")),
            };
            let name = match segments.get(2) {
                Some(Segment::Key(name)) => name.clone(),
                Some(Segment::Index(_)) => {
                    return Err(invalid(expr, "expected a name, not an index"));
                }
                None => return Err(invalid(expr, format!("expected a name after 'cacm.{}'", namespace))),
            };
            let subpath = segments[3..].to_vec();
            match namespace {
                "inputs" => Ok(PathExpr::Input { name, subpath }),
                "parameters" => Ok(PathExpr::Parameter { name, subpath }),
                "outputs" => Ok(PathExpr::WorkflowOutput { name, subpath }),
                other => Err(invalid(expr, format!("unknown namespace 'cacm.{}'", other))),
            }
        }
        "steps" => {
            let step_id = match segments.get(1) {
                Some(Segment::Key(id)) => id.clone(),
                _ => return Err(invalid(expr, "expected a step id after 'steps'")),
            };
            match segments.get(2) {
                Some(Segment::Key(kw)) if kw == "outputs" => {}
                _ => {
                    return Err(invalid(expr, "step references must use 'steps.<stepId>.outputs.<name>'"));
                }
            }
            let name = match segments.get(3) {
                Some(Segment::Key(name)) => name.clone(),
                Some(Segment::Index(_)) => {
                    return Err(invalid(expr, "expected an output name, not an index"));
                }
                None => return Err(invalid(expr, "expected an output name after 'outputs'")),
            };
            Ok(PathExpr::StepOutput {
                step_id,
                name,
                subpath: segments[4..].to_vec(),
            })
        }
        "intermediate" => {
            let key = match segments.get(1) {
                Some(Segment::Key(key)) => key.clone(),
                _ => return Err(invalid(expr, "expected a store key after 'intermediate'")),
            };
            Ok(PathExpr::Store {
                key,
                subpath: segments[2..].to_vec(),
            })
        }
        other => Err(invalid(expr, format!("unknown root namespace '{}'", other))),
    }
}

/// Tokenize a dotted path into segments, handling `name[0]` bracket
/// indices and bare numeric indices.
fn parse_segments(expr: &str) -> Result<Vec<Segment>, ResolutionError> {
    let mut segments = Vec::new();
    for part in expr.split('.') {
        if part.is_empty() {
            return Err(invalid(expr, "empty path segment"));
        }
        let (head, mut rest) = match part.find('[') {
            Some(i) => (&part[..i], &part[i..]),
            None => (part, ""),
        };
        if head.is_empty() {
            return Err(invalid(expr, format!("segment '{}' must name a field before an index", part)));
        }
        if head.chars().all(|c| c.is_ascii_digit()) {
            let index = head
                .parse::<usize>()
                .map_err(|_| invalid(expr, format!("index '{}' is out of range", head)))?;
            segments.push(Segment::Index(index));
        } else {
            segments.push(Segment::Key(head.to_string()));
        }
        while !rest.is_empty() {
            let close = rest
                .find(']')
                .ok_or_else(|| invalid(expr, "unclosed '[' in segment"))?;
            let idx_str = &rest[1..close];
            let index = idx_str
                .parse::<usize>()
                .map_err(|_| invalid(expr, format!("non-numeric index '{}'", idx_str)))?;
            segments.push(Segment::Index(index));
            rest = &rest[close + 1..];
            if !rest.is_empty() && !rest.starts_with('[') {
                return Err(invalid(expr, format!("unexpected text after ']' in segment '{}'", part)));
            }
        }
    }
    Ok(segments)
}

// ---------------------------------------------------------------------------
// Run state
// ---------------------------------------------------------------------------

/// The mutable state of one run, as seen by the resolver.
///
/// Holds the document's inputs and parameters (snapshotted at run start;
/// the document itself is never mutated), the outputs recorded per executed
/// step, the workflow outputs written so far, and the shared run store.
#[derive(Debug)]
pub struct RunState {
    inputs: BTreeMap<String, Value>,
    parameters: BTreeMap<String, Value>,
    step_outputs: BTreeMap<String, Map<String, Value>>,
    outputs: BTreeMap<String, Value>,
    store: Arc<RunStore>,
}

impl RunState {
    /// Build the initial state for a run of `doc`.
    pub fn new(doc: &WorkflowDocument, store: Arc<RunStore>) -> Self {
        Self {
            inputs: doc.inputs.clone(),
            parameters: doc.parameters.clone(),
            step_outputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
            store,
        }
    }

    /// The run this state belongs to.
    pub fn run_id(&self) -> RunId {
        self.store.run_id()
    }

    /// The shared run store.
    pub fn store(&self) -> &Arc<RunStore> {
        &self.store
    }

    /// Record a completed step's outputs for later `steps.*` reads.
    pub fn record_step_outputs(&mut self, step_id: impl Into<String>, outputs: Map<String, Value>) {
        self.step_outputs.insert(step_id.into(), outputs);
    }

    /// The recorded outputs of a step, if it has executed.
    pub fn recorded_outputs(&self, step_id: &str) -> Option<&Map<String, Value>> {
        self.step_outputs.get(step_id)
    }

    /// The workflow outputs written so far.
    pub fn outputs(&self) -> &BTreeMap<String, Value> {
        &self.outputs
    }

    /// Consume the state, yielding the populated workflow outputs.
    pub fn into_outputs(self) -> BTreeMap<String, Value> {
        self.outputs
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve a binding expression against the current run state.
///
/// Literals come back as-is; path strings are parsed and looked up. Reads
/// are pure: resolving the same expression twice against an unmodified
/// state yields the same value.
pub fn resolve(binding: &Value, state: &RunState) -> Result<Value, ResolutionError> {
    match binding {
        Value::String(s) if is_path_string(s) => {
            let path = parse_path(s)?;
            resolve_path(s, &path, state)
        }
        other => Ok(other.clone()),
    }
}

fn resolve_path(expr: &str, path: &PathExpr, state: &RunState) -> Result<Value, ResolutionError> {
    match path {
        PathExpr::Input { name, subpath } => {
            let record = state
                .inputs
                .get(name)
                .ok_or_else(|| ResolutionError::UnknownInput(name.clone()))?;
            resolve_record(expr, record, subpath)
        }
        PathExpr::Parameter { name, subpath } => {
            let record = state
                .parameters
                .get(name)
                .ok_or_else(|| ResolutionError::UnknownParameter(name.clone()))?;
            resolve_record(expr, record, subpath)
        }
        PathExpr::WorkflowOutput { .. } => Err(invalid(
            expr,
            "'cacm.outputs' is a write-only namespace and cannot be read",
        )),
        PathExpr::StepOutput {
            step_id,
            name,
            subpath,
        } => {
            let recorded = state
                .step_outputs
                .get(step_id)
                .ok_or_else(|| ResolutionError::StepNotExecuted(step_id.clone()))?;
            let value = recorded
                .get(name)
                .ok_or_else(|| ResolutionError::UnknownStepOutput {
                    step_id: step_id.clone(),
                    name: name.clone(),
                })?;
            navigate(expr, value, subpath)
        }
        PathExpr::Store { key, subpath } => {
            let value = state
                .store
                .get(key)
                .ok_or_else(|| ResolutionError::MissingStoreKey(key.clone()))?;
            navigate(expr, &value, subpath)
        }
    }
}

/// Apply the input/parameter record rule: a bare reference unwraps the
/// record's `value` field when present; an explicit subpath navigates the
/// record as written.
fn resolve_record(expr: &str, record: &Value, subpath: &[Segment]) -> Result<Value, ResolutionError> {
    if subpath.is_empty() {
        if let Value::Object(map) = record
            && let Some(value) = map.get("value")
        {
            return Ok(value.clone());
        }
        return Ok(record.clone());
    }
    navigate(expr, record, subpath)
}

/// Walk a subpath through a JSON value, cloning the final position.
fn navigate(expr: &str, value: &Value, segments: &[Segment]) -> Result<Value, ResolutionError> {
    let mut current = value;
    for segment in segments {
        current = match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => {
                map.get(key).ok_or_else(|| ResolutionError::MissingSegment {
                    expr: expr.to_string(),
                    segment: segment.to_string(),
                })?
            }
            (Segment::Index(index), Value::Array(items)) => {
                items
                    .get(*index)
                    .ok_or_else(|| ResolutionError::IndexOutOfRange {
                        expr: expr.to_string(),
                        index: *index,
                        len: items.len(),
                    })?
            }
            _ => {
                return Err(ResolutionError::MissingSegment {
                    expr: expr.to_string(),
                    segment: segment.to_string(),
                });
            }
        };
    }
    Ok(current.clone())
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Check that a string is usable as a write target.
///
/// Valid targets are `cacm.outputs.<name>` (exactly one name) and
/// `intermediate.<key>[.<sub>]` with key segments only.
pub fn validate_write_target(target: &str) -> Result<(), ResolutionError> {
    let target_err = |reason: &str| ResolutionError::InvalidTarget {
        expr: target.to_string(),
        reason: reason.to_string(),
    };

    if !is_path_string(target) {
        return Err(target_err("must be rooted at 'cacm.outputs' or 'intermediate'"));
    }
    match parse_path(target)? {
        PathExpr::WorkflowOutput { subpath, .. } => {
            if subpath.is_empty() {
                Ok(())
            } else {
                Err(target_err("'cacm.outputs' targets take a single output name"))
            }
        }
        PathExpr::Store { subpath, .. } => {
            if subpath.iter().all(|s| matches!(s, Segment::Key(_))) {
                Ok(())
            } else {
                Err(target_err("index segments are not writable"))
            }
        }
        PathExpr::Input { .. } | PathExpr::Parameter { .. } => {
            Err(target_err("workflow inputs and parameters are read-only"))
        }
        PathExpr::StepOutput { .. } => {
            Err(target_err("step outputs are recorded by the executor and cannot be bound"))
        }
    }
}

/// Write a value through a write-target expression.
///
/// `cacm.outputs.<name>` populates the workflow's final outputs;
/// `intermediate.<key>[.<sub>]` writes into the shared run store, creating
/// nested objects along the subpath as needed. This is the only mutation
/// point in the resolver, always scoped to the current run.
pub fn write(target: &str, value: Value, state: &mut RunState) -> Result<(), ResolutionError> {
    validate_write_target(target)?;
    match parse_path(target)? {
        PathExpr::WorkflowOutput { name, .. } => {
            state.outputs.insert(name, value);
            Ok(())
        }
        PathExpr::Store { key, subpath } => {
            if subpath.is_empty() {
                state.store.set(key, value);
                return Ok(());
            }
            let mut current = state.store.get(&key).unwrap_or(Value::Object(Map::new()));
            write_nested(target, &mut current, &subpath, value)?;
            state.store.set(key, current);
            Ok(())
        }
        // validate_write_target rejects everything else
        _ => unreachable!("validated write target"),
    }
}

fn write_nested(
    target: &str,
    current: &mut Value,
    segments: &[Segment],
    value: Value,
) -> Result<(), ResolutionError> {
    let Value::Object(map) = current else {
        return Err(ResolutionError::InvalidTarget {
            expr: target.to_string(),
            reason: "existing value along the path is not an object".to_string(),
        });
    };
    match segments {
        [Segment::Key(key)] => {
            map.insert(key.clone(), value);
            Ok(())
        }
        [Segment::Key(key), rest @ ..] => {
            let entry = map
                .entry(key.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            write_nested(target, entry, rest, value)
        }
        // validate_write_target rejects index segments
        _ => unreachable!("validated store subpath"),
    }
}
