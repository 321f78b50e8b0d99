use std::collections::{BTreeMap, HashMap};
use crate::error::EngineError;
use crate::events::Event;
use crate::registry::{StateEntry, StateRegistry};
use crate::transitions::{Target, TransitionTable};
use crate::types::{Mode, StateId};

/// One compiled flow: the registry, table, entry state and commands that
/// apply to a mode (or to the bootstrap phase before a mode is chosen).
#[derive(Debug, Clone)]
pub struct Flow {
    pub scope:    &'static str,
    pub mode:     Option<Mode>,
    pub entry:    StateId,
    pub registry: StateRegistry,
    pub table:    TransitionTable,
    pub commands: BTreeMap<String, StateId>,
}

impl Flow {
    pub fn state(&self, id: &StateId) -> Result<&StateEntry, EngineError> {
        self.registry.get(id).ok_or_else(|| EngineError::UnknownState {
            scope: self.scope,
            state: id.clone(),
        })
    }

    /// Resolves `(from, event)` to the next state id.
    ///
    /// `_previous` falls back to the entry state when nothing was recorded.
    pub fn resolve(
        &self,
        from:     &StateId,
        event:    &Event,
        previous: Option<&StateId>,
    ) -> Result<StateId, EngineError> {
        match self.table.get(from, event) {
            Some(Target::State(id)) => Ok(id.clone()),
            Some(Target::Same)      => Ok(from.clone()),
            Some(Target::Previous)  => Ok(previous.cloned().unwrap_or_else(|| self.entry.clone())),
            None => Err(EngineError::InvalidTransition {
                scope: self.scope,
                from:  from.clone(),
                event: event.clone(),
            }),
        }
    }

    /// Target of a global command issued while resting in `from`; `learn`
    /// defaults to the entry state. `None` when the flow has no such command
    /// or `from` does not accept it.
    pub fn command(&self, from: &StateId, name: &str) -> Option<StateId> {
        if self.registry.get(from).is_some_and(|entry| !entry.allows_command(name)) {
            return None;
        }
        self.commands.get(name).cloned()
            .or_else(|| (name == "learn").then(|| self.entry.clone()))
    }
}

/// All flows of a program.
#[derive(Debug, Clone)]
pub struct FlowSet {
    pub bootstrap:         Flow,
    pub modes:             HashMap<Mode, Flow>,
    pub error_state:       StateId,
    pub mode_select_state: StateId,
}

impl FlowSet {
    /// The flow for a session's mode; `None` selects the bootstrap flow.
    pub fn flow(&self, mode: Option<Mode>) -> Result<&Flow, EngineError> {
        match mode {
            None => Ok(&self.bootstrap),
            Some(m) => self.modes.get(&m).ok_or_else(|| EngineError::UnknownMode(m.to_string())),
        }
    }

    /// States registered in `mode` but in no other flow.
    pub fn exclusive_states(&self, mode: Mode) -> Vec<&StateId> {
        let Some(flow) = self.modes.get(&mode) else {
            return Vec::new();
        };
        flow.registry.ids()
            .filter(|id| {
                !self.bootstrap.registry.contains(id)
                    && self.modes.iter().all(|(m, other)| *m == mode || !other.registry.contains(id))
            })
            .collect()
    }
}
