use std::time::Duration;
use crate::types::ChatId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod mock;
mod retry;

pub use mock::MockContentGenerator;
pub use retry::RetryingGenerator;

/// What a state asks the content collaborator to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentKind {
    Lesson,
    Question,
    Digest,
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            ContentKind::Lesson   => "lesson",
            ContentKind::Question => "question",
            ContentKind::Digest   => "digest",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRequest {
    pub kind:    ContentKind,
    pub topic:   String,
    pub chat_id: ChatId,
}

impl ContentRequest {
    pub fn new(kind: ContentKind, topic: impl Into<String>, chat_id: ChatId) -> Self {
        Self { kind, topic: topic.into(), chat_id }
    }
}

/// Why a generation attempt failed. Providers classify their own failures;
/// `RetryingGenerator` decides from the variant alone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentError {
    /// Transient provider failure (5xx, connection reset). Worth retrying.
    #[error("content provider unavailable: {0}")]
    Unavailable(String),

    /// Provider asked us to slow down. Retried after a longer wait.
    #[error("content provider rate limited: {0}")]
    RateLimited(String),

    /// The request itself was refused (credentials, malformed request).
    /// Retrying cannot help.
    #[error("content request rejected: {0}")]
    Rejected(String),

    #[error("{kind} generation timed out after {after:?}")]
    TimedOut { kind: ContentKind, after: Duration },

    #[error("content generation failed after {retries} retries: {last}")]
    Exhausted { retries: u32, last: Box<ContentError> },
}

impl ContentError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ContentError::Unavailable(_) | ContentError::RateLimited(_) | ContentError::TimedOut { .. }
        )
    }
}

/// The single interface between states and a content-generation provider
/// (a language model, a template engine, a knowledge service).
///
/// # Contract
/// - Must be Send + Sync (shared by every chat's cycle)
/// - Returns Ok(text) on success
/// - Returns a classified `ContentError` for any failure; the calling state
///   degrades to fallback content, the engine never sees the failure
/// - Timeouts are applied by the caller (`Turn::generate`)
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, request: &ContentRequest) -> Result<String, ContentError>;
}
