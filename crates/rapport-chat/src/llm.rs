//! LLM client facade.
//!
//! [`LlmClient`] is the interface a network-backed model client would
//! implement. [`MockLlmClient`] answers through a [`ChatResponder`] and
//! never actually suspends, which keeps the chat loop deterministic.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use rapport_core::config::ChatConfig;

use crate::error::ChatError;
use crate::history::{ConversationMessage, Role};
use crate::responder::ChatResponder;

/// Context window reported for the mock model.
const MOCK_CONTEXT_LENGTH: usize = 4096;

/// Metadata about a model, as returned by `preload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub family: String,
    pub context_length: usize,
    pub loaded_at: DateTime<Utc>,
}

/// A chat-completion backend.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Name of the model this client talks to.
    fn model(&self) -> &str;

    /// Whether the backend is reachable.
    async fn health_check(&self) -> Result<bool, ChatError>;

    /// Load the model and return its metadata.
    async fn preload(&self) -> Result<ModelInfo, ChatError>;

    /// Produce the assistant's reply to `messages`.
    async fn complete(&self, messages: &[ConversationMessage]) -> Result<String, ChatError>;
}

// =============================================================================
// ModelInfoCache
// =============================================================================

/// Bounded cache of model metadata. Evicts the oldest insertion when full.
#[derive(Debug, Clone)]
pub struct ModelInfoCache {
    capacity: usize,
    entries: VecDeque<ModelInfo>,
}

impl ModelInfoCache {
    /// Create a cache. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelInfo> {
        self.entries.iter().find(|info| info.name == name)
    }

    /// Insert or refresh an entry. Returns the evicted entry, if any.
    pub fn insert(&mut self, info: ModelInfo) -> Option<ModelInfo> {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.name == info.name) {
            *existing = info;
            return None;
        }

        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        if let Some(ref old) = evicted {
            debug!(model = %old.name, "Evicted model info from cache");
        }
        self.entries.push_back(info);
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// =============================================================================
// MockLlmClient
// =============================================================================

/// Offline client that routes completions through a [`ChatResponder`].
pub struct MockLlmClient {
    model: String,
    responder: Mutex<ChatResponder>,
    cache: Mutex<ModelInfoCache>,
}

impl MockLlmClient {
    pub fn new(responder: ChatResponder) -> Self {
        let config: &ChatConfig = responder.config();
        let model = config.model.clone();
        let cache = ModelInfoCache::new(config.model_cache_capacity);
        Self {
            model,
            responder: Mutex::new(responder),
            cache: Mutex::new(cache),
        }
    }

    /// Run a closure against the wrapped responder.
    pub fn with_responder<F, T>(&self, f: F) -> Result<T, ChatError>
    where
        F: FnOnce(&mut ChatResponder) -> T,
    {
        let mut responder = self
            .responder
            .lock()
            .map_err(|e| ChatError::LlmError(format!("responder lock poisoned: {}", e)))?;
        Ok(f(&mut responder))
    }

    /// Cached metadata for a model, if it has been preloaded.
    pub fn cached_model_info(&self, name: &str) -> Option<ModelInfo> {
        self.cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(name).cloned())
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool, ChatError> {
        Ok(true)
    }

    async fn preload(&self) -> Result<ModelInfo, ChatError> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|e| ChatError::LlmError(format!("model cache lock poisoned: {}", e)))?;

        if let Some(info) = cache.get(&self.model) {
            debug!(model = %self.model, "Model info served from cache");
            return Ok(info.clone());
        }

        let info = ModelInfo {
            name: self.model.clone(),
            family: "mock".to_string(),
            context_length: MOCK_CONTEXT_LENGTH,
            loaded_at: Utc::now(),
        };
        cache.insert(info.clone());
        info!(model = %self.model, "Model preloaded");
        Ok(info)
    }

    async fn complete(&self, messages: &[ConversationMessage]) -> Result<String, ChatError> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .ok_or_else(|| ChatError::LlmError("no user message to complete".to_string()))?;

        self.with_responder(|responder| responder.respond(&last_user.content))?
    }
}
