use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::error::EngineError;
use crate::flow::{Flow, FlowSet};
use crate::registry::{Behaviors, StateEntry, StateRegistry};
use crate::transitions::{Target, TransitionEntry, TransitionTable};
use crate::types::{KeyboardType, Mode, StateId};
use crate::events::Event;

/// Flow file shipped with the crate.
pub const BUNDLED_FLOWS: &str = include_str!("../config/flows.yaml");

/// Runtime limits of the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Maximum number of states entered in one cycle before the chain is
    /// treated as runaway.
    pub max_chain_hops: usize,

    /// Upper bound on one full cycle, persistence included.
    pub cycle_timeout_ms: u64,

    /// Bound applied to each content-generation call made by a state.
    pub collaborator_timeout_ms: u64,
}

impl EngineConfig {
    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_millis(self.cycle_timeout_ms)
    }

    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.collaborator_timeout_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_chain_hops:          8,
            cycle_timeout_ms:        90_000,
            collaborator_timeout_ms: 20_000,
        }
    }
}

/// A state as declared in the flow file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateDecl {
    pub id:       StateId,
    pub keyboard: KeyboardType,
    #[serde(default)]
    pub label:    Option<String>,
    /// Global commands this state accepts. Omitted: every command of the
    /// section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<Vec<String>>,
}

/// One section of the flow file: the bootstrap phase or a mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlowSection {
    pub entry:       StateId,
    #[serde(default)]
    pub states:      Vec<StateDecl>,
    #[serde(default)]
    pub commands:    BTreeMap<String, StateId>,
    pub transitions: Vec<TransitionEntry>,
}

/// Declarative source of every flow, deserialized from YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlowConfig {
    #[serde(default)]
    pub engine:            EngineConfig,
    pub error_state:       StateId,
    pub mode_select_state: StateId,
    /// Merged into the registry of every section.
    #[serde(default)]
    pub common_states:     Vec<StateDecl>,
    pub bootstrap:         FlowSection,
    #[serde(default)]
    pub modes:             BTreeMap<Mode, FlowSection>,
}

impl FlowConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, EngineError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| EngineError::Config(format!("invalid flow file: {}", e)))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_yaml_str(&yaml)
    }

    pub fn bundled() -> Result<Self, EngineError> {
        Self::from_yaml_str(BUNDLED_FLOWS)
    }

    pub fn to_yaml(&self) -> Result<String, EngineError> {
        serde_yaml::to_string(self)
            .map_err(|e| EngineError::Config(format!("cannot serialize flow file: {}", e)))
    }

    /// Validates every section against `behaviors` and compiles the flows.
    /// Any problem prevents startup; all problems found are reported at once.
    pub fn compile(&self, behaviors: &Behaviors) -> Result<FlowSet, EngineError> {
        let known_commands: BTreeSet<&str> = std::iter::once(&self.bootstrap)
            .chain(self.modes.values())
            .flat_map(|section| section.commands.keys().map(String::as_str))
            .chain(std::iter::once("learn"))
            .collect();

        let bootstrap = self.compile_section("bootstrap", None, &self.bootstrap, behaviors, &known_commands)?;

        let mut modes = HashMap::new();
        for (mode, section) in &self.modes {
            let flow = self.compile_section(mode.as_str(), Some(*mode), section, behaviors, &known_commands)?;
            modes.insert(*mode, flow);
        }

        tracing::info!(
            modes = modes.len(),
            bootstrap_states = bootstrap.registry.len(),
            "flow configuration loaded"
        );

        Ok(FlowSet {
            bootstrap,
            modes,
            error_state:       self.error_state.clone(),
            mode_select_state: self.mode_select_state.clone(),
        })
    }

    fn compile_section(
        &self,
        scope:     &'static str,
        mode:      Option<Mode>,
        section:   &FlowSection,
        behaviors: &Behaviors,
        known_commands: &BTreeSet<&str>,
    ) -> Result<Flow, EngineError> {
        let mut problems: Vec<String> = Vec::new();

        // ── Registry ─────────────────────────────────────────
        let mut registry = StateRegistry::new();
        for decl in self.common_states.iter().chain(section.states.iter()) {
            for name in decl.commands.iter().flatten() {
                if !known_commands.contains(name.as_str()) {
                    problems.push(format!("state {} allows unknown command /{}", decl.id, name));
                }
            }
            let Some(behavior) = behaviors.get(&decl.id) else {
                problems.push(format!("state {} has no registered behaviour", decl.id));
                continue;
            };
            let entry = StateEntry {
                id:            decl.id.clone(),
                keyboard_type: decl.keyboard,
                label:         decl.label.clone().unwrap_or_else(|| decl.id.to_string()),
                commands:      decl.commands.as_ref().map(|names| names.iter().cloned().collect()),
                behavior:      behavior.clone(),
            };
            if let Err(e) = registry.register(entry) {
                problems.push(e.to_string());
            }
        }

        for (role, id) in [
            ("entry", &section.entry),
            ("error_state", &self.error_state),
            ("mode_select_state", &self.mode_select_state),
        ] {
            if !registry.contains(id) {
                problems.push(format!("{} {} is not a registered state", role, id));
            }
        }

        // ── Table ────────────────────────────────────────────
        let table = match TransitionTable::from_entries(&section.transitions) {
            Ok(table) => table,
            Err(e) => {
                problems.push(e.to_string());
                TransitionTable::default()
            }
        };

        for entry in &section.transitions {
            if !registry.contains(&entry.from) {
                problems.push(format!("transition source {} is not a registered state", entry.from));
            }
            if let Target::State(to) = &entry.to {
                if !registry.contains(to) {
                    problems.push(format!("transition target {} ({} + {}) is not a registered state", to, entry.from, entry.event));
                }
            }
            if entry.event.is_await() {
                let self_loop = match &entry.to {
                    Target::Same      => true,
                    Target::State(to) => *to == entry.from,
                    Target::Previous  => false,
                };
                if !self_loop {
                    problems.push(format!("rest event {} of {} must map to _same", entry.event, entry.from));
                }
            }
        }

        for (name, target) in &section.commands {
            if !registry.contains(target) {
                problems.push(format!("command /{} targets unregistered state {}", name, target));
            }
        }

        // ── Event vocabulary ─────────────────────────────────
        for entry in registry.entries() {
            for name in entry.behavior.emits() {
                if !table.contains(&entry.id, &Event::new(*name)) {
                    problems.push(format!("state {} emits {} but has no transition for it", entry.id, name));
                }
            }
        }

        if !problems.is_empty() {
            problems.sort();
            return Err(EngineError::Config(format!("[{}] {}", scope, problems.join("; "))));
        }

        Ok(Flow {
            scope,
            mode,
            entry: section.entry.clone(),
            registry,
            table,
            commands: section.commands.clone(),
        })
    }
}
