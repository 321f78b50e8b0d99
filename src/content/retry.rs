use crate::content::{ContentError, ContentGenerator, ContentRequest};
use async_trait::async_trait;

use std::sync::Arc;
use std::time::Duration;

/// A wrapper around any `ContentGenerator` that retries retryable failures
/// with exponential back-off.
///
/// Classification comes from the inner generator's `ContentError` variant:
/// `Rejected` is returned at once, `RateLimited` waits longer between
/// attempts, everything retryable gives up as `Exhausted` after
/// `max_retries` extra attempts.
pub struct RetryingGenerator {
    inner:       Arc<dyn ContentGenerator>,
    max_retries: u32,
}

impl RetryingGenerator {
    pub fn new(inner: Arc<dyn ContentGenerator>, max_retries: u32) -> Self {
        Self { inner, max_retries }
    }

    /// Back-off before retry number `attempt + 1`, capped at a minute.
    fn backoff(err: &ContentError, attempt: u32) -> Duration {
        let base: u64 = match err {
            ContentError::RateLimited(_) => 5,
            _ => 1,
        };
        Duration::from_secs(std::cmp::min(base << attempt, 60))
    }
}

#[async_trait]
impl ContentGenerator for RetryingGenerator {
    async fn generate(&self, request: &ContentRequest) -> Result<String, ContentError> {
        let mut attempt = 0;

        loop {
            let err = match self.inner.generate(request).await {
                Ok(text) => return Ok(text),
                Err(e) => e,
            };

            if !err.is_retryable() {
                tracing::error!(error = %err, kind = %request.kind, "content generation failed permanently, not retrying");
                return Err(err);
            }

            if attempt >= self.max_retries {
                return Err(ContentError::Exhausted {
                    retries: self.max_retries,
                    last:    Box::new(err),
                });
            }

            let wait = Self::backoff(&err, attempt);
            attempt += 1;
            tracing::warn!(
                attempt,
                max    = self.max_retries,
                wait_s = wait.as_secs(),
                error  = %err,
                "content generation transient error, retrying"
            );
            tokio::time::sleep(wait).await;
        }
    }
}
