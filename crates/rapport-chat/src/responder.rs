//! Deterministic chat responder.
//!
//! Replies are chosen in this order: caller overrides, tool calls detected
//! from keywords, then the built-in patterns. Each reply is a template
//! filled from the data provider's snapshot, the message, and the matched
//! capture groups.

use std::sync::Arc;

use regex::{Captures, Regex, RegexBuilder};
use serde_json::Value;
use tracing::{debug, info, warn};

use rapport_core::config::ChatConfig;

use crate::error::ChatError;
use crate::history::ConversationBuffer;
use crate::patterns::{detect_tool_call, ToolCallRequest, BUILTIN_PATTERNS, FALLBACK_RESPONSE};
use crate::provider::DataProvider;
use crate::template::{render, TemplateContext};
use crate::tools::{
    DatabaseStatsTool, Tool, ToolCallRecord, ToolOutcome, ToolRegistry, CREATE_DIRECTORY_TOOL,
    DATABASE_STATS_TOOL,
};

const STATS_TEMPLATES: &[(&str, &str)] = &[
    ("contacts", "You have {contact_count} contacts in your database."),
    ("tags", "You have {tag_count} tags in your database."),
    ("notes", "You have {note_count} notes in your database."),
];

const DIRECTORY_CREATED: &str = "Created the contact directory \"{output_name}\" with photos.";
const TOOL_DONE: &str = "The {tool} tool finished.";
const TOOL_FAILED: &str = "Sorry, the {tool} tool failed: {error}";
const TOOL_UNAVAILABLE: &str = "Sorry, the {tool} tool is not available right now.";

struct ResponseOverride {
    pattern: String,
    regex: Regex,
    response: String,
}

/// Answers chat messages and records the conversation.
pub struct ChatResponder {
    config: ChatConfig,
    provider: Arc<dyn DataProvider>,
    history: ConversationBuffer,
    tools: ToolRegistry,
    overrides: Vec<ResponseOverride>,
    tool_calls: Vec<ToolCallRecord>,
}

impl ChatResponder {
    /// Create a responder with the `database_stats` tool registered.
    pub fn new(config: ChatConfig, provider: Arc<dyn DataProvider>) -> Self {
        let mut tools = ToolRegistry::new();
        tools.register(DatabaseStatsTool::new(Arc::clone(&provider)));

        Self {
            history: ConversationBuffer::new(config.max_history),
            config,
            provider,
            tools,
            overrides: Vec::new(),
            tool_calls: Vec::new(),
        }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn history(&self) -> &ConversationBuffer {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut ConversationBuffer {
        &mut self.history
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Register an extra tool, e.g. `create_directory`.
    pub fn register_tool(&mut self, tool: impl Tool + 'static) {
        self.tools.register(tool);
    }

    /// Every tool call made so far, oldest first.
    pub fn get_tool_call_history(&self) -> &[ToolCallRecord] {
        &self.tool_calls
    }

    /// Answer `pattern` matches with `response` ahead of everything else.
    ///
    /// Patterns are case-insensitive regexes; one that does not compile is
    /// matched literally. Setting an existing pattern again replaces its
    /// response without changing its position.
    pub fn set_override(
        &mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Result<(), ChatError> {
        let pattern = pattern.into();
        let response = response.into();

        if let Some(existing) = self.overrides.iter_mut().find(|o| o.pattern == pattern) {
            existing.response = response;
            return Ok(());
        }

        let regex = compile_override(&pattern)?;
        self.overrides.push(ResponseOverride {
            pattern,
            regex,
            response,
        });
        Ok(())
    }

    /// Remove an override. Returns whether it existed.
    pub fn remove_override(&mut self, pattern: &str) -> bool {
        let before = self.overrides.len();
        self.overrides.retain(|o| o.pattern != pattern);
        self.overrides.len() != before
    }

    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }

    /// Answer a message and record both sides in the history.
    pub fn respond(&mut self, message: &str) -> Result<String, ChatError> {
        let message = self.validate(message)?;
        let reply = self.compose_reply(message);

        self.history.add_user(message);
        self.history.add_assistant(reply.as_str());
        Ok(reply)
    }

    fn validate<'a>(&self, message: &'a str) -> Result<&'a str, ChatError> {
        let trimmed = message.trim();
        if trimmed.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if trimmed.chars().count() > self.config.max_message_length {
            return Err(ChatError::MessageTooLong(self.config.max_message_length));
        }
        Ok(trimmed)
    }

    fn compose_reply(&mut self, message: &str) -> String {
        let mut context = self.base_context(message);

        for o in &self.overrides {
            if let Some(caps) = o.regex.captures(message) {
                debug!(pattern = %o.pattern, "Override matched");
                let positional = capture_context(&o.regex, &caps, &mut context);
                return render(&o.response, &context, &positional);
            }
        }

        if let Some(request) = detect_tool_call(message) {
            return self.run_tool(request, context);
        }

        let lower = message.to_lowercase();
        for pattern in BUILTIN_PATTERNS.iter() {
            if let Some(caps) = pattern.regex.captures(&lower) {
                debug!(pattern = pattern.name, "Built-in pattern matched");
                let positional = capture_context(&pattern.regex, &caps, &mut context);
                return render(pattern.template, &context, &positional);
            }
        }

        FALLBACK_RESPONSE.to_string()
    }

    fn base_context(&self, message: &str) -> TemplateContext {
        let mut context = match self.provider.snapshot() {
            Ok(snapshot) => snapshot.to_context(),
            Err(e) => {
                warn!(error = %e, "Data provider failed, answering without database context");
                TemplateContext::new()
            }
        };
        context.insert("message".to_string(), message.to_string());
        context
    }

    fn run_tool(&mut self, request: ToolCallRequest, mut context: TemplateContext) -> String {
        let record = self.tools.invoke(request.tool, request.arguments);
        info!(tool = %record.tool, call_id = %record.id, "Tool call dispatched");

        context.insert("tool".to_string(), record.tool.clone());
        for (key, value) in &record.arguments {
            context.insert(key.clone(), value_to_text(value));
        }

        let template = match &record.outcome {
            ToolOutcome::Success(result) => {
                if let Value::Object(fields) = result {
                    for (key, value) in fields {
                        context.insert(key.clone(), value_to_text(value));
                    }
                }
                context.insert("result".to_string(), result.to_string());
                success_template(&record)
            }
            ToolOutcome::Failed(error) => {
                context.insert("error".to_string(), error.clone());
                TOOL_FAILED
            }
            ToolOutcome::Unavailable => TOOL_UNAVAILABLE,
        };

        let reply = render(template, &context, &[]);
        self.tool_calls.push(record);
        reply
    }
}

fn success_template(record: &ToolCallRecord) -> &'static str {
    match record.tool.as_str() {
        DATABASE_STATS_TOOL => {
            let subject = record
                .arguments
                .get("subject")
                .and_then(Value::as_str)
                .unwrap_or("contacts");
            STATS_TEMPLATES
                .iter()
                .find(|(s, _)| *s == subject)
                .map(|(_, t)| *t)
                .unwrap_or(STATS_TEMPLATES[0].1)
        }
        CREATE_DIRECTORY_TOOL => DIRECTORY_CREATED,
        _ => TOOL_DONE,
    }
}

fn compile_override(pattern: &str) -> Result<Regex, ChatError> {
    if pattern.is_empty() {
        return Err(ChatError::InvalidPattern("pattern cannot be empty".to_string()));
    }

    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(regex) => Ok(regex),
        Err(e) => {
            debug!(pattern, error = %e, "Override is not a valid regex, matching literally");
            RegexBuilder::new(&regex::escape(pattern))
                .case_insensitive(true)
                .build()
                .map_err(|e| ChatError::InvalidPattern(e.to_string()))
        }
    }
}

/// Add named groups to `context` and return the positional groups.
fn capture_context(regex: &Regex, caps: &Captures<'_>, context: &mut TemplateContext) -> Vec<String> {
    for name in regex.capture_names().flatten() {
        if let Some(m) = caps.name(name) {
            context.insert(name.to_string(), m.as_str().to_string());
        }
    }
    caps.iter()
        .skip(1)
        .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
        .collect()
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(items) => items.iter().map(value_to_text).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}
