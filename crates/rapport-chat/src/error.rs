//! Error types for the chat assistant.

use rapport_core::error::RapportError;

/// Errors from the chat assistant.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("tool not found: {0}")]
    ToolNotFound(String),
    #[error("tool {tool} failed: {message}")]
    ToolFailed { tool: String, message: String },
    #[error("LLM error: {0}")]
    LlmError(String),
    #[error("storage error: {0}")]
    StorageError(String),
}

impl From<RapportError> for ChatError {
    fn from(err: RapportError) -> Self {
        ChatError::StorageError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        assert_eq!(ChatError::EmptyMessage.to_string(), "message cannot be empty");
        assert_eq!(
            ChatError::MessageTooLong(4000).to_string(),
            "message exceeds maximum length of 4000 characters"
        );
        assert_eq!(
            ChatError::InvalidPattern("empty".to_string()).to_string(),
            "invalid pattern: empty"
        );
        assert_eq!(
            ChatError::ToolNotFound("create_directory".to_string()).to_string(),
            "tool not found: create_directory"
        );
        assert_eq!(
            ChatError::ToolFailed {
                tool: "database_stats".to_string(),
                message: "locked".to_string(),
            }
            .to_string(),
            "tool database_stats failed: locked"
        );
        assert_eq!(
            ChatError::LlmError("model not loaded".to_string()).to_string(),
            "LLM error: model not loaded"
        );
        assert_eq!(
            ChatError::StorageError("disk full".to_string()).to_string(),
            "storage error: disk full"
        );
    }

    #[test]
    fn test_chat_error_from_rapport_error() {
        let err: ChatError = RapportError::Storage("connection lost".to_string()).into();
        assert!(matches!(err, ChatError::StorageError(_)));
        assert!(err.to_string().contains("connection lost"));
    }

    #[test]
    fn test_chat_error_unicode_inner_messages() {
        let err = ChatError::LlmError("model error: \u{1f4a5}".to_string());
        assert!(err.to_string().contains("\u{1f4a5}"));
    }
}
