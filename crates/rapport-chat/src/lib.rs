//! Chat assistant for Rapport.
//!
//! A deterministic responder that answers questions about the contact
//! database from ordered regex templates, dispatches simple tool calls,
//! and keeps a bounded conversation history. An LLM client facade wraps
//! it so callers can swap in a real model later.

pub mod error;
pub mod history;
pub mod llm;
pub mod patterns;
pub mod provider;
pub mod responder;
pub mod template;
pub mod tools;

pub use error::ChatError;
pub use history::{ConversationBuffer, ConversationMessage, Role};
pub use llm::{LlmClient, MockLlmClient, ModelInfo, ModelInfoCache};
pub use patterns::{detect_tool_call, ResponsePattern, ToolCallRequest, BUILTIN_PATTERNS};
pub use provider::{DataProvider, DataSnapshot, StaticDataProvider, StorageDataProvider};
pub use responder::ChatResponder;
pub use template::{render, try_render, TemplateContext};
pub use tools::{
    DatabaseStatsTool, FnTool, Tool, ToolArgs, ToolCallRecord, ToolOutcome, ToolRegistry,
    CREATE_DIRECTORY_TOOL, DATABASE_STATS_TOOL,
};
