use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::ToolError;

/// JSON-schema description of a tool, sent upstream to enable tool calling.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A callable tool.
///
/// Implementations receive the parsed keyword arguments and return any
/// JSON-serializable result.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn call(
        &self,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> Result<serde_json::Value, ToolError>;
}

type ToolFn = Box<
    dyn Fn(serde_json::Map<String, serde_json::Value>) -> Result<serde_json::Value, ToolError>
        + Send
        + Sync,
>;

/// Adapts a synchronous closure into a [`Tool`].
struct FnTool {
    definition: ToolDefinition,
    func: ToolFn,
}

#[async_trait::async_trait]
impl Tool for FnTool {
    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn call(
        &self,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> Result<serde_json::Value, ToolError> {
        (self.func)(arguments)
    }
}

/// Registry: tool name -> callable, plus the definitions advertised upstream.
///
/// Populate it at startup, then share it read-only (`Arc<ToolRegistry>`).
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    definitions: Vec<ToolDefinition>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool under its definition name. Re-registering a name
    /// replaces both the callable and its definition.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let definition = tool.definition();
        match self
            .definitions
            .iter_mut()
            .find(|existing| existing.name == definition.name)
        {
            Some(existing) => *existing = definition.clone(),
            None => self.definitions.push(definition.clone()),
        }
        self.tools.insert(definition.name, tool);
    }

    /// Registers a synchronous closure as a tool.
    pub fn register_fn(
        &mut self,
        definition: ToolDefinition,
        func: impl Fn(serde_json::Map<String, serde_json::Value>) -> Result<serde_json::Value, ToolError>
        + Send
        + Sync
        + 'static,
    ) {
        self.register(Arc::new(FnTool {
            definition,
            func: Box::new(func),
        }));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Definitions in registration order.
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Looks up `name` and invokes it with `arguments`.
    ///
    /// Never panics or propagates: an unknown name, non-object arguments, or a
    /// failing tool all come back as [`ToolError`].
    pub async fn dispatch(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        let serde_json::Value::Object(arguments) = arguments else {
            return Err(ToolError::InvalidArguments(format!(
                "{name}() arguments must be a JSON object"
            )));
        };
        tool.call(arguments).await
    }
}
