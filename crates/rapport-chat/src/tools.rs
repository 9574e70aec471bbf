//! Tools the assistant can call on the user's behalf.
//!
//! A [`Tool`] takes a JSON object of arguments and returns a JSON value.
//! The [`ToolRegistry`] dispatches by name and turns every invocation,
//! including calls to tools that are not registered, into a
//! [`ToolCallRecord`] for the call history.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ChatError;
use crate::provider::DataProvider;

/// Name of the built-in statistics tool.
pub const DATABASE_STATS_TOOL: &str = "database_stats";

/// Name of the directory export tool. Provided by the embedding application.
pub const CREATE_DIRECTORY_TOOL: &str = "create_directory";

/// Tool arguments.
pub type ToolArgs = Map<String, Value>;

/// A callable tool.
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn invoke(&self, args: &ToolArgs) -> Result<Value, ChatError>;
}

// =============================================================================
// FnTool
// =============================================================================

/// Adapts a closure into a [`Tool`].
pub struct FnTool<F> {
    name: String,
    description: String,
    func: F,
}

impl<F> FnTool<F>
where
    F: Fn(&ToolArgs) -> Result<Value, ChatError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, description: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            func,
        }
    }
}

impl<F> Tool for FnTool<F>
where
    F: Fn(&ToolArgs) -> Result<Value, ChatError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn invoke(&self, args: &ToolArgs) -> Result<Value, ChatError> {
        (self.func)(args)
    }
}

// =============================================================================
// DatabaseStatsTool
// =============================================================================

/// Reports contact, tag, note, and table counts.
pub struct DatabaseStatsTool {
    provider: Arc<dyn DataProvider>,
}

impl DatabaseStatsTool {
    pub fn new(provider: Arc<dyn DataProvider>) -> Self {
        Self { provider }
    }
}

impl Tool for DatabaseStatsTool {
    fn name(&self) -> &str {
        DATABASE_STATS_TOOL
    }

    fn description(&self) -> &str {
        "Count contacts, tags, notes, and tables in the database"
    }

    fn invoke(&self, _args: &ToolArgs) -> Result<Value, ChatError> {
        let snapshot = self.provider.snapshot()?;
        serde_json::to_value(snapshot).map_err(|e| ChatError::ToolFailed {
            tool: DATABASE_STATS_TOOL.to_string(),
            message: e.to_string(),
        })
    }
}

// =============================================================================
// Call records
// =============================================================================

/// What happened when a tool was called.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ToolOutcome {
    Success(Value),
    Failed(String),
    Unavailable,
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success(_))
    }
}

/// One entry of the tool call history.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallRecord {
    pub id: Uuid,
    pub tool: String,
    pub arguments: ToolArgs,
    pub outcome: ToolOutcome,
    pub called_at: DateTime<Utc>,
}

// =============================================================================
// ToolRegistry
// =============================================================================

/// Tools keyed by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), Box::new(tool)).is_some() {
            debug!(tool = %name, "Replaced registered tool");
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Call a tool by name.
    pub fn call(&self, name: &str, args: &ToolArgs) -> Result<Value, ChatError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ChatError::ToolNotFound(name.to_string()))?;
        tool.invoke(args)
    }

    /// Call a tool and describe the result as a history record.
    pub fn invoke(&self, name: &str, args: ToolArgs) -> ToolCallRecord {
        let outcome = match self.call(name, &args) {
            Ok(value) => ToolOutcome::Success(value),
            Err(ChatError::ToolNotFound(_)) => {
                warn!(tool = %name, "Tool not registered");
                ToolOutcome::Unavailable
            }
            Err(e) => {
                warn!(tool = %name, error = %e, "Tool call failed");
                ToolOutcome::Failed(e.to_string())
            }
        };

        debug!(tool = %name, success = outcome.is_success(), "Tool called");

        ToolCallRecord {
            id: Uuid::new_v4(),
            tool: name.to_string(),
            arguments: args,
            outcome,
            called_at: Utc::now(),
        }
    }
}
