//! Handler contract and registry.
//!
//! Two handler shapes back a capability:
//!
//! - **Agents** implement the [`Agent`] trait: stateful, constructed lazily
//!   on first reference within a run, cached per run and reused by later
//!   steps, and free to read/write the shared [`RunStore`] directly.
//! - **Skills** are stateless named functions registered under a
//!   `(plugin, function)` pair, invoked fresh on every call with the
//!   resolved inputs only, with no store access.
//!
//! The [`HandlerRegistry`] holds caller-supplied agent factories and skill
//! functions; the orchestrator never constructs handlers any other way.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::store::RunStore;

/// Resolved inputs passed to a handler, keyed by parameter name.
pub type HandlerInputs = BTreeMap<String, Value>;

/// Execution status reported by a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerStatus {
    /// The invocation produced usable output data.
    Success,
    /// The invocation failed; see `message`.
    Error,
}

/// Result envelope returned by every handler invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerResult {
    /// Success or error.
    pub status: HandlerStatus,
    /// Output data on success (conventionally an object of named fields).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Failure description on error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HandlerResult {
    /// A successful result carrying output data.
    pub fn success(data: Value) -> Self {
        Self {
            status: HandlerStatus::Success,
            data: Some(data),
            message: None,
        }
    }

    /// A failed result carrying a message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: HandlerStatus::Error,
            data: None,
            message: Some(message.into()),
        }
    }

    /// Returns true if the handler reported success.
    pub fn is_success(&self) -> bool {
        self.status == HandlerStatus::Success
    }
}

/// A stateful handler instance, scoped to a single run.
///
/// The same logical agent may be invoked by multiple steps and observes its
/// own prior state (already-initialized resources, accumulated context).
/// Returning `Err` is equivalent to returning an error result: the
/// dispatcher converts it and the run continues.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Execute one step's worth of work.
    ///
    /// `task_description` is the step's description text; `inputs` are the
    /// resolved input bindings; `store` is the run's shared store, which
    /// the agent may read and write directly by key.
    async fn run(
        &self,
        task_description: &str,
        inputs: &HandlerInputs,
        store: &RunStore,
    ) -> anyhow::Result<HandlerResult>;
}

/// A stateless skill function.
///
/// Invoked with the resolved inputs; expected to be referentially
/// transparent. Non-object return values are normalized by the dispatcher.
pub type SkillFn = Arc<
    dyn Fn(HandlerInputs) -> Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send>>
        + Send
        + Sync,
>;

/// Factory producing a fresh agent instance for one run.
pub type AgentFactory = Arc<dyn Fn() -> anyhow::Result<Arc<dyn Agent>> + Send + Sync>;

/// Caller-supplied handler implementations.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    agents: HashMap<String, AgentFactory>,
    skills: HashMap<(String, String), SkillFn>,
}

impl HandlerRegistry {
    /// An empty registry: every capability degrades to mock output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent factory under an agent-type name.
    pub fn register_agent(&mut self, agent_type: impl Into<String>, factory: AgentFactory) {
        let agent_type = agent_type.into();
        if self.agents.insert(agent_type.clone(), factory).is_some() {
            warn!(agent_type = %agent_type, "Agent factory replaced");
        }
    }

    /// Register a skill function under a `(plugin, function)` pair.
    pub fn register_skill(
        &mut self,
        plugin: impl Into<String>,
        function: impl Into<String>,
        skill: SkillFn,
    ) {
        let key = (plugin.into(), function.into());
        if self.skills.insert(key.clone(), skill).is_some() {
            warn!(plugin = %key.0, function = %key.1, "Skill function replaced");
        }
    }

    /// The factory registered for an agent type, if any.
    pub fn agent_factory(&self, agent_type: &str) -> Option<&AgentFactory> {
        self.agents.get(agent_type)
    }

    /// The skill registered under a plugin/function pair, if any.
    pub fn skill(&self, plugin: &str, function: &str) -> Option<&SkillFn> {
        self.skills
            .get(&(plugin.to_string(), function.to_string()))
    }

    /// Whether an agent type has a registered factory.
    pub fn has_agent(&self, agent_type: &str) -> bool {
        self.agents.contains_key(agent_type)
    }

    /// Whether a skill is registered.
    pub fn has_skill(&self, plugin: &str, function: &str) -> bool {
        self.skill(plugin, function).is_some()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("agents", &self.agents.keys().collect::<Vec<_>>())
            .field("skills", &self.skills.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Per-run cache of constructed agent instances, keyed by agent type.
///
/// The cache object itself belongs to exactly one run, which realizes the
/// `(run_id, agent_type)` instance key: two concurrent runs never share a
/// cache, so they never share an agent instance. Dropped with the run.
#[derive(Default)]
pub struct AgentCache {
    instances: Mutex<HashMap<String, Arc<dyn Agent>>>,
}

impl AgentCache {
    /// An empty cache for a new run.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached instance for an agent type, constructing it via
    /// `factory` on first reference.
    pub fn get_or_create(
        &self,
        agent_type: &str,
        factory: &AgentFactory,
    ) -> anyhow::Result<Arc<dyn Agent>> {
        let mut instances = self.instances.lock();
        if let Some(agent) = instances.get(agent_type) {
            return Ok(agent.clone());
        }
        let agent = factory()?;
        instances.insert(agent_type.to_string(), agent.clone());
        Ok(agent)
    }

    /// Number of constructed instances.
    pub fn len(&self) -> usize {
        self.instances.lock().len()
    }

    /// Whether no instance has been constructed yet.
    pub fn is_empty(&self) -> bool {
        self.instances.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_types::RunId;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingAgent {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Agent for CountingAgent {
        async fn run(
            &self,
            _task: &str,
            _inputs: &HandlerInputs,
            _store: &RunStore,
        ) -> anyhow::Result<HandlerResult> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(HandlerResult::success(json!({ "calls": n })))
        }
    }

    fn counting_factory(constructed: Arc<AtomicUsize>) -> AgentFactory {
        Arc::new(move || {
            constructed.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(CountingAgent {
                calls: AtomicUsize::new(0),
            }) as Arc<dyn Agent>)
        })
    }

    #[test]
    fn test_handler_result_constructors() {
        let ok = HandlerResult::success(json!({"x": 1}));
        assert!(ok.is_success());
        assert_eq!(ok.data.unwrap()["x"], json!(1));

        let err = HandlerResult::error("boom");
        assert!(!err.is_success());
        assert_eq!(err.message.as_deref(), Some("boom"));
        assert!(err.data.is_none());
    }

    #[test]
    fn test_handler_result_serde() {
        let ok = HandlerResult::success(json!({"x": 1}));
        let v = serde_json::to_value(&ok).unwrap();
        assert_eq!(v["status"], json!("success"));
        assert_eq!(v["data"]["x"], json!(1));
        assert!(v.get("message").is_none());

        let parsed: HandlerResult =
            serde_json::from_value(json!({"status": "error", "message": "nope"})).unwrap();
        assert!(!parsed.is_success());
    }

    #[test]
    fn test_registry_register_and_lookup() {
        let mut registry = HandlerRegistry::new();
        let skill: SkillFn = Arc::new(|inputs| Box::pin(async move { Ok(json!(inputs.len())) }));
        registry.register_skill("math", "add", skill);

        assert!(registry.has_skill("math", "add"));
        assert!(!registry.has_skill("math", "sub"));
        assert!(!registry.has_agent("Anything"));
    }

    #[tokio::test]
    async fn test_skill_invocation() {
        let skill: SkillFn = Arc::new(|inputs| {
            Box::pin(async move {
                let a = inputs["a"].as_i64().unwrap_or(0);
                let b = inputs["b"].as_i64().unwrap_or(0);
                Ok(json!({ "sum": a + b }))
            })
        });
        let mut inputs = HandlerInputs::new();
        inputs.insert("a".into(), json!(5));
        inputs.insert("b".into(), json!(3));
        let out = skill(inputs).await.unwrap();
        assert_eq!(out["sum"], json!(8));
    }

    #[tokio::test]
    async fn test_agent_cache_reuses_instance() {
        let constructed = Arc::new(AtomicUsize::new(0));
        let factory = counting_factory(constructed.clone());
        let cache = AgentCache::new();
        let store = RunStore::new(RunId::new());

        let first = cache.get_or_create("Counter", &factory).unwrap();
        let again = cache.get_or_create("Counter", &factory).unwrap();
        assert_eq!(constructed.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);

        // Same instance: call counts accumulate across handles
        let r1 = first.run("t", &HandlerInputs::new(), &store).await.unwrap();
        let r2 = again.run("t", &HandlerInputs::new(), &store).await.unwrap();
        assert_eq!(r1.data.unwrap()["calls"], json!(1));
        assert_eq!(r2.data.unwrap()["calls"], json!(2));
    }

    #[test]
    fn test_agent_cache_separate_types() {
        let constructed = Arc::new(AtomicUsize::new(0));
        let factory = counting_factory(constructed.clone());
        let cache = AgentCache::new();
        cache.get_or_create("A", &factory).unwrap();
        cache.get_or_create("B", &factory).unwrap();
        assert_eq!(constructed.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_caches_are_isolated() {
        let constructed = Arc::new(AtomicUsize::new(0));
        let factory = counting_factory(constructed.clone());
        let run_one = AgentCache::new();
        let run_two = AgentCache::new();
        run_one.get_or_create("A", &factory).unwrap();
        run_two.get_or_create("A", &factory).unwrap();
        // One construction per run, never shared
        assert_eq!(constructed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_factory_error_propagates() {
        let factory: AgentFactory = Arc::new(|| anyhow::bail!("no resources"));
        let cache = AgentCache::new();
        let err = cache.get_or_create("Broken", &factory).err().unwrap();
        assert!(err.to_string().contains("no resources"));
        assert!(cache.is_empty());
    }
}
