//! Tool trait: the abstraction over agent capabilities.
//!
//! A tool takes one string argument and returns one string observation.
//! Tools are registered by name before any query runs; the agent loop
//! looks them up by the exact, case-sensitive name the model emitted.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::ToolError;

/// The core Tool trait.
///
/// Each call must be independent and safe to retry; the loop may run the
/// same tool concurrently for different queries.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "wikipedia", "google").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the model).
    fn description(&self) -> &str;

    /// Run the tool on a single string argument.
    async fn invoke(&self, input: &str) -> std::result::Result<String, ToolError>;
}

/// Adapts a plain function into a [`Tool`].
pub struct FnTool<F> {
    name: String,
    description: String,
    f: F,
}

impl<F> FnTool<F>
where
    F: Fn(&str) -> std::result::Result<String, ToolError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, description: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            f,
        }
    }
}

#[async_trait]
impl<F> Tool for FnTool<F>
where
    F: Fn(&str) -> std::result::Result<String, ToolError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn invoke(&self, input: &str) -> std::result::Result<String, ToolError> {
        (self.f)(input)
    }
}

/// A registry of available tools, keyed by name.
///
/// Iteration order is the sorted name order so that the rendered system
/// prompt is stable across runs.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            debug!(tool = %name, "Replaced existing tool binding");
        }
    }

    /// Register a plain function under `name`. Same overwrite rule as
    /// [`register`](Self::register).
    pub fn register_fn<F>(&mut self, name: &str, description: &str, f: F)
    where
        F: Fn(&str) -> std::result::Result<String, ToolError> + Send + Sync + 'static,
    {
        self.register(Arc::new(FnTool::new(name, description, f)));
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Invoke a tool by name.
    pub async fn invoke(&self, name: &str, input: &str) -> std::result::Result<String, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.invoke(input).await
    }

    /// List all registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// `(name, description)` pairs, sorted by name.
    pub fn descriptions(&self) -> Vec<(&str, &str)> {
        self.tools
            .iter()
            .map(|(name, tool)| (name.as_str(), tool.description()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
