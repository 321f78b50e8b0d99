use crate::types::{ChatId, Mode, StateId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque key-value bag owned by the states of one chat.
///
/// The engine never inspects it; states read and write their own keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Context(Map<String, Value>);

impl Context {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(Value::as_u64)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Adds `by` to a numeric counter, treating a missing key as zero.
    pub fn increment(&mut self, key: &str, by: u64) -> u64 {
        let next = self.get_u64(key).unwrap_or(0) + by;
        self.set(key, next);
        next
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Per-chat FSM record. Mutated only by the engine's cycle and persisted
/// once per completed cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    // ── Identity ─────────────────────────────────────────
    pub chat_id:         ChatId,
    /// `None` until the user picks a mode; the bootstrap flow applies.
    pub mode:            Option<Mode>,

    // ── Position ─────────────────────────────────────────
    pub state_id:        StateId,
    /// State the chat left on its last bypass, target of `_previous`.
    #[serde(default)]
    pub previous_state:  Option<StateId>,

    // ── State-owned data ─────────────────────────────────
    #[serde(default)]
    pub context:         Context,

    // ── Keyboard lifecycle ───────────────────────────────
    /// Set on a reply → inline/none transition, consumed by the next send.
    #[serde(default)]
    pub pending_cleanup: bool,

    pub updated_at:      DateTime<Utc>,
}

impl Session {
    pub fn new(chat_id: ChatId, mode: Option<Mode>, state_id: StateId) -> Self {
        Self {
            chat_id,
            mode,
            state_id,
            previous_state:  None,
            context:         Context::new(),
            pending_cleanup: false,
            updated_at:      Utc::now(),
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Takes the pending cleanup marker, leaving it cleared. Every send
    /// goes through here, so a marker is consumed exactly once.
    pub fn take_pending_cleanup(&mut self) -> bool {
        std::mem::take(&mut self.pending_cleanup)
    }

    /// Name of the flow that applies to this session, for logs and errors.
    pub fn scope(&self) -> &'static str {
        self.mode.map_or("bootstrap", |m| m.as_str())
    }
}
