use std::time::Duration;
use chrono::Utc;
use crate::content::{ContentError, ContentGenerator, ContentKind, ContentRequest};
use crate::events::Event;
use crate::keyboard;
use crate::session::{Context, Session};
use crate::trace::{Trace, TraceEntry, TraceKind};
use crate::transport::{Affordance, MessageRef, OutboundMessage, Transport};
use crate::types::{ChatId, Mode, StateId};

/// Everything a state may touch during one cycle: the chat's session
/// context, the outbound send surface (with keyboard cleanup applied), the
/// content collaborator and the cycle trace.
pub struct Turn<'a> {
    pub(crate) session: &'a mut Session,
    transport:          &'a dyn Transport,
    content:            &'a dyn ContentGenerator,
    trace:              &'a mut Trace,
    timeout:            Duration,
    hop:                usize,
    reentry:            bool,
}

impl<'a> Turn<'a> {
    pub(crate) fn new(
        session:   &'a mut Session,
        transport: &'a dyn Transport,
        content:   &'a dyn ContentGenerator,
        trace:     &'a mut Trace,
        timeout:   Duration,
    ) -> Self {
        Self { session, transport, content, trace, timeout, hop: 0, reentry: false }
    }

    /// Called by the engine before each `enter`.
    pub(crate) fn begin_hop(&mut self, reentry: bool) {
        self.hop += 1;
        self.reentry = reentry;
    }

    pub(crate) fn hops(&self) -> usize {
        self.hop
    }

    pub fn chat_id(&self) -> ChatId {
        self.session.chat_id
    }

    pub fn mode(&self) -> Option<Mode> {
        self.session.mode
    }

    pub fn state_id(&self) -> &StateId {
        &self.session.state_id
    }

    /// True when the state is being re-entered from itself, i.e. after
    /// `invalid_input` or another `_same` transition. States render a short
    /// re-prompt instead of their full content.
    pub fn is_reentry(&self) -> bool {
        self.reentry
    }

    pub fn context(&self) -> &Context {
        &self.session.context
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.session.context
    }

    /// Sends one message. A pending keyboard cleanup is applied to this
    /// send and cleared, whether or not delivery succeeds.
    pub async fn send(&mut self, message: OutboundMessage) -> Result<MessageRef, String> {
        let chat_id = self.session.chat_id;
        let pending = self.session.take_pending_cleanup();
        let plan = keyboard::plan(pending, message);
        let result = keyboard::deliver(self.transport, chat_id, plan).await;
        if let Err(e) = &result {
            tracing::warn!(chat_id, state = %self.session.state_id, error = %e, "outbound send failed");
        }
        result
    }

    /// Sends plain text, logging (not propagating) a delivery failure.
    pub async fn say(&mut self, text: impl Into<String>) {
        let _ = self.send(OutboundMessage::text(text)).await;
    }

    /// Sends text with an affordance, logging a delivery failure.
    pub async fn say_with(&mut self, text: impl Into<String>, affordance: Affordance) {
        let _ = self.send(OutboundMessage::text(text).with_affordance(affordance)).await;
    }

    /// Asks the content collaborator for text, bounded by the collaborator
    /// timeout. A timeout comes back as `ContentError::TimedOut` so the
    /// state can fall back like on any other failure.
    pub async fn generate(&mut self, kind: ContentKind, topic: &str) -> Result<String, ContentError> {
        let request = ContentRequest::new(kind, topic, self.session.chat_id);
        let outcome = match tokio::time::timeout(self.timeout, self.content.generate(&request)).await {
            Ok(result) => result,
            Err(_) => Err(ContentError::TimedOut { kind, after: self.timeout }),
        };
        if let Err(e) = &outcome {
            tracing::warn!(
                chat_id = self.session.chat_id,
                state   = %self.session.state_id,
                kind    = %kind,
                error   = %e,
                "content generation degraded"
            );
            self.log(&format!("{}_FAILED", kind.to_string().to_uppercase()), &e.to_string());
        }
        outcome
    }

    /// Records a state-level note into the cycle trace.
    pub fn log(&mut self, event: &str, detail: &str) {
        let state = self.session.state_id.clone();
        tracing::debug!(chat_id = self.session.chat_id, state = %state, event, detail, "state trace");
        self.record(TraceKind::Note, &state, &Event::new(event), detail);
    }

    pub(crate) fn record(&mut self, kind: TraceKind, state: &StateId, event: &Event, detail: &str) {
        self.trace.record(TraceEntry {
            hop:       self.hop,
            kind,
            state:     state.clone(),
            event:     event.clone(),
            detail:    detail.to_string(),
            timestamp: Utc::now(),
        });
    }
}
