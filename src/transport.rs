use crate::types::ChatId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;

/// One inline button: visible text plus the callback data it sends back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineButton {
    pub text:     String,
    pub callback: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, callback: impl Into<String>) -> Self {
        Self { text: text.into(), callback: callback.into() }
    }
}

/// An interactive input surface attached to an outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Affordance {
    /// Per-message buttons, rows of buttons.
    Inline(Vec<Vec<InlineButton>>),
    /// Persistent custom keyboard, rows of button labels.
    Reply(Vec<Vec<String>>),
    /// Instruction to remove a persistent reply keyboard.
    RemoveReply,
}

impl Affordance {
    /// Single-row inline keyboard.
    pub fn inline_row(buttons: Vec<InlineButton>) -> Self {
        Affordance::Inline(vec![buttons])
    }

    /// One reply button per row.
    pub fn reply_column<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> Self {
        Affordance::Reply(labels.into_iter().map(|l| vec![l.into()]).collect())
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Affordance::Inline(_))
    }

    pub fn is_reply(&self) -> bool {
        matches!(self, Affordance::Reply(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub text:       String,
    pub affordance: Option<Affordance>,
}

impl OutboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), affordance: None }
    }

    pub fn with_affordance(mut self, affordance: Affordance) -> Self {
        self.affordance = Some(affordance);
        self
    }
}

/// Handle to a delivered message, needed to edit it afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat_id:    ChatId,
    pub message_id: i64,
}

/// The outbound send surface: the two primitives the keyboard lifecycle
/// composes.
///
/// # Contract
/// - Must be Send + Sync (shared by every chat's cycle)
/// - `send` delivers one message with at most one affordance
/// - `edit_affordance` replaces the affordance of an already sent message
/// - Failures are returned as `Err(String)`, never panics
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        chat_id:    ChatId,
        text:       &str,
        affordance: Option<&Affordance>,
    ) -> Result<MessageRef, String>;

    async fn edit_affordance(
        &self,
        message:    &MessageRef,
        affordance: &Affordance,
    ) -> Result<(), String>;
}

/// One primitive call observed by [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOp {
    Send {
        message:    MessageRef,
        text:       String,
        affordance: Option<Affordance>,
    },
    Edit {
        message:    MessageRef,
        affordance: Affordance,
    },
}

impl TransportOp {
    pub fn chat_id(&self) -> ChatId {
        match self {
            TransportOp::Send { message, .. } | TransportOp::Edit { message, .. } => message.chat_id,
        }
    }

    pub fn is_removal(&self) -> bool {
        matches!(self, TransportOp::Send { affordance: Some(Affordance::RemoveReply), .. })
    }
}

/// In-memory transport that records every call, for tests and demos.
pub struct RecordingTransport {
    ops:        Mutex<Vec<TransportOp>>,
    next_id:    AtomicI64,
    fail_sends: AtomicBool,
    fail_edits: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            ops:        Mutex::new(Vec::new()),
            next_id:    AtomicI64::new(1),
            fail_sends: AtomicBool::new(false),
            fail_edits: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent `send` fail until reset.
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent `edit_affordance` fail until reset.
    pub fn set_fail_edits(&self, fail: bool) {
        self.fail_edits.store(fail, Ordering::SeqCst);
    }

    pub fn ops(&self) -> Vec<TransportOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn ops_for(&self, chat_id: ChatId) -> Vec<TransportOp> {
        self.ops().into_iter().filter(|op| op.chat_id() == chat_id).collect()
    }

    /// Texts of every message sent to `chat_id`, in order.
    pub fn texts_for(&self, chat_id: ChatId) -> Vec<String> {
        self.ops_for(chat_id)
            .into_iter()
            .filter_map(|op| match op {
                TransportOp::Send { text, .. } => Some(text),
                TransportOp::Edit { .. } => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.ops.lock().unwrap().clear();
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(
        &self,
        chat_id:    ChatId,
        text:       &str,
        affordance: Option<&Affordance>,
    ) -> Result<MessageRef, String> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(format!("RecordingTransport: send to chat {} refused", chat_id));
        }
        let message = MessageRef {
            chat_id,
            message_id: self.next_id.fetch_add(1, Ordering::SeqCst),
        };
        self.ops.lock().unwrap().push(TransportOp::Send {
            message,
            text:       text.to_string(),
            affordance: affordance.cloned(),
        });
        Ok(message)
    }

    async fn edit_affordance(
        &self,
        message:    &MessageRef,
        affordance: &Affordance,
    ) -> Result<(), String> {
        if self.fail_edits.load(Ordering::SeqCst) {
            return Err(format!("RecordingTransport: edit of message {} refused", message.message_id));
        }
        self.ops.lock().unwrap().push(TransportOp::Edit {
            message:    *message,
            affordance: affordance.clone(),
        });
        Ok(())
    }
}
