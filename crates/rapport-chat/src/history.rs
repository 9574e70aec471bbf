//! Bounded conversation history.
//!
//! Keeps the most recent messages of a chat. A system message at the very
//! start of the buffer is pinned and survives pruning; everything else is
//! evicted oldest first.

use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
}

impl ConversationMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Ordered message buffer holding at most `max_history` entries.
#[derive(Debug, Clone)]
pub struct ConversationBuffer {
    messages: Vec<ConversationMessage>,
    max_history: usize,
}

impl ConversationBuffer {
    /// Create an empty buffer. A capacity of zero is raised to one.
    pub fn new(max_history: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_history: max_history.max(1),
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Append a message and prune.
    pub fn add(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(ConversationMessage::new(role, content));
        self.prune();
    }

    pub fn add_user(&mut self, content: impl Into<String>) {
        self.add(Role::User, content);
    }

    pub fn add_assistant(&mut self, content: impl Into<String>) {
        self.add(Role::Assistant, content);
    }

    pub fn add_system(&mut self, content: impl Into<String>) {
        self.add(Role::System, content);
    }

    /// Stored messages, oldest first.
    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    /// Messages to send to a model.
    ///
    /// With a prompt, a fresh system message is placed in front of the
    /// stored history. The buffer itself is not modified.
    pub fn get_for_llm(&self, system_prompt: Option<&str>) -> Vec<ConversationMessage> {
        let mut out = Vec::with_capacity(self.messages.len() + 1);
        if let Some(prompt) = system_prompt {
            out.push(ConversationMessage::system(prompt));
        }
        out.extend(self.messages.iter().cloned());
        out
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Evict overflow from the front.
    ///
    /// A leading system message is kept along with the newest
    /// `max_history - 1` other messages. Without one, the newest
    /// `max_history` messages are kept.
    pub fn prune(&mut self) {
        if self.messages.len() <= self.max_history {
            return;
        }
        let excess = self.messages.len() - self.max_history;
        let pinned = self
            .messages
            .first()
            .is_some_and(|m| m.role == Role::System);

        if pinned {
            self.messages.drain(1..1 + excess);
        } else {
            self.messages.drain(..excess);
        }
    }
}

impl Default for ConversationBuffer {
    fn default() -> Self {
        Self::new(20)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(buffer: &ConversationBuffer) -> Vec<&str> {
        buffer.messages().iter().map(|m| m.content.as_str()).collect()
    }

    // ---- Pruning ----

    #[test]
    fn test_prune_keeps_last_messages() {
        let mut buffer = ConversationBuffer::new(5);
        for i in 1..=7 {
            buffer.add_user(format!("m{}", i));
        }
        assert_eq!(buffer.message_count(), 5);
        assert_eq!(contents(&buffer), vec!["m3", "m4", "m5", "m6", "m7"]);
    }

    #[test]
    fn test_prune_pins_leading_system_message() {
        let mut buffer = ConversationBuffer::new(5);
        buffer.add_system("persona");
        for i in 1..=10 {
            buffer.add_user(format!("m{}", i));
        }
        assert_eq!(buffer.message_count(), 5);
        assert_eq!(buffer.messages()[0].role, Role::System);
        assert_eq!(contents(&buffer), vec!["persona", "m7", "m8", "m9", "m10"]);
    }

    #[test]
    fn test_prune_does_not_pin_later_system_message() {
        let mut buffer = ConversationBuffer::new(3);
        buffer.add_user("u1");
        buffer.add_system("s1");
        buffer.add_user("u2");
        buffer.add_user("u3");
        buffer.add_user("u4");
        assert_eq!(contents(&buffer), vec!["u2", "u3", "u4"]);
    }

    #[test]
    fn test_prune_noop_under_capacity() {
        let mut buffer = ConversationBuffer::new(5);
        buffer.add_user("a");
        buffer.add_assistant("b");
        buffer.prune();
        assert_eq!(contents(&buffer), vec!["a", "b"]);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut buffer = ConversationBuffer::new(0);
        assert_eq!(buffer.max_history(), 1);
        buffer.add_user("a");
        buffer.add_user("b");
        assert_eq!(contents(&buffer), vec!["b"]);
    }

    #[test]
    fn test_capacity_one_with_system_keeps_only_system() {
        let mut buffer = ConversationBuffer::new(1);
        buffer.add_system("persona");
        buffer.add_user("hello");
        assert_eq!(contents(&buffer), vec!["persona"]);
    }

    // ---- get_for_llm ----

    #[test]
    fn test_get_for_llm_prepends_prompt_without_mutating() {
        let mut buffer = ConversationBuffer::new(5);
        buffer.add_user("hi");
        buffer.add_assistant("hello");

        let msgs = buffer.get_for_llm(Some("be brief"));
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[0], ConversationMessage::system("be brief"));
        assert_eq!(msgs[1], ConversationMessage::user("hi"));
        assert_eq!(buffer.message_count(), 2);
    }

    #[test]
    fn test_get_for_llm_without_prompt() {
        let mut buffer = ConversationBuffer::new(5);
        buffer.add_user("hi");
        assert_eq!(buffer.get_for_llm(None), vec![ConversationMessage::user("hi")]);
    }

    // ---- Misc ----

    #[test]
    fn test_clear() {
        let mut buffer = ConversationBuffer::new(5);
        buffer.add_user("hi");
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.message_count(), 0);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let msg = ConversationMessage::assistant("ok");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"ok"}"#);
        let back: ConversationMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
