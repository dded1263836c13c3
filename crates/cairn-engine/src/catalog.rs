//! Capability catalog.
//!
//! The catalog is a read-only mapping from capability-reference strings to
//! [`CapabilityDescriptor`]s, loaded once at startup from a static JSON
//! source. Lookups are O(1); a miss is not fatal: the dispatcher degrades
//! unresolvable references to mock output.
//!
//! The JSON source is either a flat array of descriptors or an object with
//! a `capabilities` array:
//!
//! ```json
//! { "capabilities": [ { "id": "add", "skill_plugin_name": "math", ... } ] }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use cairn_types::CapabilityDescriptor;

use crate::error::EngineError;

/// Wrapper for the object form of the catalog source.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    capabilities: Vec<CapabilityDescriptor>,
}

/// Loaded, read-only capability catalog.
#[derive(Debug, Default)]
pub struct Catalog {
    entries: BTreeMap<String, CapabilityDescriptor>,
}

impl Catalog {
    /// An empty catalog: every capability reference degrades to mock output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from a list of descriptors.
    ///
    /// Duplicate ids fail the load: the catalog is static input, so a
    /// collision is a configuration error worth surfacing immediately.
    pub fn from_descriptors(
        descriptors: Vec<CapabilityDescriptor>,
    ) -> Result<Self, EngineError> {
        let mut entries = BTreeMap::new();
        for descriptor in descriptors {
            if descriptor.id.is_empty() {
                return Err(EngineError::InvalidCatalog(
                    "descriptor with empty id".to_string(),
                ));
            }
            if let Some(previous) = entries.insert(descriptor.id.clone(), descriptor) {
                return Err(EngineError::InvalidCatalog(format!(
                    "duplicate capability id '{}'",
                    previous.id
                )));
            }
        }
        debug!(capabilities = entries.len(), "Capability catalog loaded");
        Ok(Self { entries })
    }

    /// Parse a catalog from a JSON string (array or `{capabilities: []}`).
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| EngineError::InvalidCatalog(format!("JSON parse error: {}", e)))?;
        let descriptors = if value.is_array() {
            serde_json::from_value::<Vec<CapabilityDescriptor>>(value)
                .map_err(|e| EngineError::InvalidCatalog(e.to_string()))?
        } else {
            serde_json::from_value::<CatalogFile>(value)
                .map_err(|e| EngineError::InvalidCatalog(e.to_string()))?
                .capabilities
        };
        Self::from_descriptors(descriptors)
    }

    /// Load a catalog from a file path.
    pub fn from_file(path: &Path) -> Result<Self, EngineError> {
        let content = std::fs::read_to_string(path).map_err(|e| EngineError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    /// Look up a descriptor by capability reference.
    pub fn lookup(&self, capability_ref: &str) -> Option<&CapabilityDescriptor> {
        self.entries.get(capability_ref)
    }

    /// All capability ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_types::HandlerKind;
    use serde_json::json;

    #[test]
    fn test_from_json_array() {
        let catalog = Catalog::from_json(
            &json!([
                { "id": "add", "skill_plugin_name": "math", "skill_function_name": "add" },
                { "id": "analyze", "agent_type": "AnalysisAgent" }
            ])
            .to_string(),
        )
        .unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(matches!(
            catalog.lookup("add").unwrap().handler_kind(),
            HandlerKind::Skill { .. }
        ));
    }

    #[test]
    fn test_from_json_object_form() {
        let catalog = Catalog::from_json(
            &json!({ "capabilities": [ { "id": "noop" } ] }).to_string(),
        )
        .unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(
            catalog.lookup("noop").unwrap().handler_kind(),
            HandlerKind::Unbound
        );
    }

    #[test]
    fn test_lookup_miss() {
        let catalog = Catalog::new();
        assert!(catalog.lookup("anything").is_none());
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_duplicate_id_fails_load() {
        let err = Catalog::from_json(
            &json!([ { "id": "dup" }, { "id": "dup" } ]).to_string(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate capability id 'dup'"));
    }

    #[test]
    fn test_empty_id_fails_load() {
        let err = Catalog::from_json(&json!([ { "id": "" } ]).to_string()).unwrap_err();
        assert!(err.to_string().contains("empty id"));
    }

    #[test]
    fn test_invalid_json() {
        assert!(Catalog::from_json("nope {{{").is_err());
    }

    #[test]
    fn test_ids_sorted() {
        let catalog = Catalog::from_json(
            &json!([ { "id": "b" }, { "id": "a" } ]).to_string(),
        )
        .unwrap();
        assert_eq!(catalog.ids(), vec!["a", "b"]);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, json!([ { "id": "add" } ]).to_string()).unwrap();
        let catalog = Catalog::from_file(&path).unwrap();
        assert!(catalog.lookup("add").is_some());
    }

    #[test]
    fn test_from_missing_file() {
        let err = Catalog::from_file(Path::new("/nonexistent/catalog.json")).unwrap_err();
        assert!(matches!(err, EngineError::Io { .. }));
    }
}
