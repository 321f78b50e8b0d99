use std::sync::Mutex;
use std::time::Duration;
use crate::content::{ContentError, ContentGenerator, ContentRequest};
use async_trait::async_trait;

pub struct MockContentGenerator {
    responses: Mutex<Vec<Result<String, ContentError>>>,
    canned:    bool,
    delay:     Option<Duration>,
    call_log:  Mutex<Vec<ContentRequest>>,
}

impl MockContentGenerator {
    /// Replays `responses` in order, then fails every further call.
    pub fn new(responses: Vec<Result<String, ContentError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            canned:    false,
            delay:     None,
            call_log:  Mutex::new(Vec::new()),
        }
    }

    /// Never runs dry: once programmed responses are used up, answers with
    /// a deterministic text derived from the request.
    pub fn canned() -> Self {
        Self { canned: true, ..Self::new(Vec::new()) }
    }

    /// Sleeps before answering, to exercise caller-side timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns the number of times generate() was invoked
    pub fn call_count(&self) -> usize {
        self.call_log.lock().unwrap().len()
    }

    /// Returns the Nth request (0-indexed)
    pub fn request(&self, n: usize) -> Option<ContentRequest> {
        self.call_log.lock().unwrap().get(n).cloned()
    }
}

#[async_trait]
impl ContentGenerator for MockContentGenerator {
    async fn generate(&self, request: &ContentRequest) -> Result<String, ContentError> {
        self.call_log.lock().unwrap().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() { None } else { Some(responses.remove(0)) }
        };
        match next {
            Some(response) => response,
            None if self.canned => Ok(format!("[{}] {}", request.kind, request.topic)),
            None => Err(ContentError::Unavailable("MockContentGenerator: no more programmed responses".to_string())),
        }
    }
}
