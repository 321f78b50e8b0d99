use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use crate::error::EngineError;
use crate::states::{default_behaviors, ConversationState};
use crate::types::{KeyboardType, StateId};

/// A registered state: behaviour plus the static metadata declared for it.
#[derive(Clone)]
pub struct StateEntry {
    pub id:            StateId,
    pub keyboard_type: KeyboardType,
    pub label:         String,
    /// Global commands accepted while resting here; `None` accepts every
    /// command of the flow.
    pub commands:      Option<BTreeSet<String>>,
    pub behavior:      Arc<dyn ConversationState>,
}

impl StateEntry {
    pub fn allows_command(&self, name: &str) -> bool {
        self.commands.as_ref().map_or(true, |allowed| allowed.contains(name))
    }
}

impl std::fmt::Debug for StateEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateEntry")
            .field("id", &self.id)
            .field("keyboard_type", &self.keyboard_type)
            .field("label", &self.label)
            .field("commands", &self.commands)
            .finish_non_exhaustive()
    }
}

/// `state_id → StateEntry` for one flow.
#[derive(Debug, Clone, Default)]
pub struct StateRegistry {
    states: HashMap<StateId, StateEntry>,
}

impl StateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: StateEntry) -> Result<(), EngineError> {
        if self.states.contains_key(&entry.id) {
            return Err(EngineError::Config(format!("state {} declared twice", entry.id)));
        }
        self.states.insert(entry.id.clone(), entry);
        Ok(())
    }

    pub fn get(&self, id: &StateId) -> Option<&StateEntry> {
        self.states.get(id)
    }

    pub fn contains(&self, id: &StateId) -> bool {
        self.states.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &StateId> {
        self.states.keys()
    }

    pub fn entries(&self) -> impl Iterator<Item = &StateEntry> {
        self.states.values()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Behaviour implementations available to flows, keyed by state id.
/// Flows bind declared states to these at load time.
#[derive(Clone)]
pub struct Behaviors {
    map: HashMap<StateId, Arc<dyn ConversationState>>,
}

impl Behaviors {
    pub fn empty() -> Self {
        Self { map: HashMap::new() }
    }

    /// The bundled program's behaviours.
    pub fn defaults() -> Self {
        Self { map: default_behaviors() }
    }

    /// Adds a behaviour, replacing any existing one with the same id.
    pub fn insert(&mut self, id: impl Into<StateId>, behavior: Arc<dyn ConversationState>) {
        self.map.insert(id.into(), behavior);
    }

    pub fn get(&self, id: &StateId) -> Option<&Arc<dyn ConversationState>> {
        self.map.get(id)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for Behaviors {
    fn default() -> Self {
        Self::defaults()
    }
}
