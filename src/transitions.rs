use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use crate::types::StateId;
use crate::events::Event;
use crate::error::EngineError;

/// Where a transition leads.
///
/// In the flow file a target is a plain string: a state id, or one of the
/// special targets `_same` and `_previous`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Target {
    State(StateId),
    /// The source state itself: re-enter it (re-prompt).
    Same,
    /// The state the chat left on its last bypass.
    Previous,
}

impl From<String> for Target {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "_same"     => Target::Same,
            "_previous" => Target::Previous,
            _           => Target::State(StateId::new(raw)),
        }
    }
}

impl From<Target> for String {
    fn from(target: Target) -> Self {
        match target {
            Target::State(id) => id.0,
            Target::Same      => "_same".to_string(),
            Target::Previous  => "_previous".to_string(),
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Target::State(id) => write!(f, "{}", id),
            Target::Same      => write!(f, "_same"),
            Target::Previous  => write!(f, "_previous"),
        }
    }
}

/// One `{from, event, to}` line of the flow file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransitionEntry {
    pub from:  StateId,
    pub event: Event,
    pub to:    Target,
}

impl TransitionEntry {
    pub fn new(from: impl Into<StateId>, event: impl Into<Event>, to: Target) -> Self {
        Self { from: from.into(), event: event.into(), to }
    }
}

/// Immutable `(state, event) → target` mapping of one flow.
///
/// Any (state, event) pair not in the table is illegal: the engine treats
/// it as a configuration defect and routes the chat to the error state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionTable {
    edges: HashMap<(StateId, Event), Target>,
}

impl TransitionTable {
    /// Builds the table, rejecting duplicate `(from, event)` keys.
    pub fn from_entries(entries: &[TransitionEntry]) -> Result<Self, EngineError> {
        let mut edges = HashMap::with_capacity(entries.len());
        let mut duplicates = Vec::new();

        for entry in entries {
            let key = (entry.from.clone(), entry.event.clone());
            if edges.insert(key, entry.to.clone()).is_some() {
                duplicates.push(format!("duplicate transition ({}, {})", entry.from, entry.event));
            }
        }

        if duplicates.is_empty() {
            Ok(Self { edges })
        } else {
            Err(EngineError::Config(duplicates.join("; ")))
        }
    }

    pub fn get(&self, from: &StateId, event: &Event) -> Option<&Target> {
        self.edges.get(&(from.clone(), event.clone()))
    }

    /// Validates that a given (state, event) pair is legal.
    pub fn contains(&self, from: &StateId, event: &Event) -> bool {
        self.edges.contains_key(&(from.clone(), event.clone()))
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StateId, &Event, &Target)> {
        self.edges.iter().map(|((from, event), to)| (from, event, to))
    }

    /// Back to declarative form, sorted by `(from, event)`.
    pub fn to_entries(&self) -> Vec<TransitionEntry> {
        let mut entries: Vec<TransitionEntry> = self.iter()
            .map(|(from, event, to)| TransitionEntry {
                from:  from.clone(),
                event: event.clone(),
                to:    to.clone(),
            })
            .collect();
        entries.sort_by(|a, b| (&a.from, &a.event).cmp(&(&b.from, &b.event)));
        entries
    }
}
