use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::events::Event;
use crate::types::StateId;

/// What produced a trace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    /// The resting state interpreted the inbound update.
    Handle,
    /// A state was entered and returned its event.
    Enter,
    /// Command bypass; `detail` holds the target.
    GoTo,
    /// The chat moved to another mode; `detail` holds the mode.
    SwitchMode,
    /// A configuration defect sent the chat to the error state.
    Fault,
    /// Free-form note written by a state through `Turn::log`.
    Note,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    pub hop:       usize,
    pub kind:      TraceKind,
    pub state:     StateId,
    pub event:     Event,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail:    String,
    pub timestamp: DateTime<Utc>,
}

/// Ordered record of one cycle: every handled input, entered state and
/// bypass, in the order the engine performed them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trace {
    entries: Vec<TraceEntry>,
}

impl Trace {
    pub fn new() -> Self { Self { entries: Vec::new() } }

    pub fn record(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns all entries for a given state id
    pub fn for_state(&self, state: &str) -> Vec<&TraceEntry> {
        self.entries.iter().filter(|e| e.state.as_str() == state).collect()
    }

    pub fn of_kind(&self, kind: TraceKind) -> Vec<&TraceEntry> {
        self.entries.iter().filter(|e| e.kind == kind).collect()
    }

    /// Events in recorded order.
    pub fn events(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.event.as_str()).collect()
    }

    /// States entered during the cycle, in order.
    pub fn path(&self) -> Vec<&StateId> {
        self.entries.iter()
            .filter(|e| e.kind == TraceKind::Enter)
            .map(|e| &e.state)
            .collect()
    }
}
