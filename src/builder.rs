use std::path::Path;
use std::sync::Arc;
use crate::config::{EngineConfig, FlowConfig};
use crate::content::ContentGenerator;
use crate::engine::FlowEngine;
use crate::error::EngineError;
use crate::registry::Behaviors;
use crate::states::ConversationState;
use crate::store::{MemorySessionStore, SessionStore};
use crate::transport::Transport;
use crate::types::StateId;

pub struct EngineBuilder {
    flows:     Option<FlowConfig>,
    behaviors: Behaviors,
    store:     Option<Arc<dyn SessionStore>>,
    transport: Option<Arc<dyn Transport>>,
    content:   Option<Arc<dyn ContentGenerator>>,
    config:    Option<EngineConfig>,
    max_hops:  Option<usize>,
}

impl EngineBuilder {
    /// Starts from the bundled program's behaviours. Without an explicit
    /// flow configuration the bundled flow file is used.
    pub fn new() -> Self {
        Self {
            flows:     None,
            behaviors: Behaviors::defaults(),
            store:     None,
            transport: None,
            content:   None,
            config:    None,
            max_hops:  None,
        }
    }

    pub fn flow_config(mut self, flows: FlowConfig) -> Self {
        self.flows = Some(flows); self
    }

    /// Loads the flow configuration from a YAML file.
    pub fn flow_file(mut self, path: impl AsRef<Path>) -> Result<Self, EngineError> {
        self.flows = Some(FlowConfig::from_path(path)?);
        Ok(self)
    }

    /// Registers a behaviour for `id`, replacing the default one if any.
    ///
    /// # Example
    /// ```no_run
    /// # use std::sync::Arc;
    /// # use coachsm::{EngineBuilder, states::ProgressState};
    /// EngineBuilder::new().state("utility.progress", Arc::new(ProgressState));
    /// ```
    pub fn state(mut self, id: impl Into<StateId>, behavior: Arc<dyn ConversationState>) -> Self {
        self.behaviors.insert(id, behavior);
        self
    }

    /// Replaces the whole behaviour set.
    pub fn behaviors(mut self, behaviors: Behaviors) -> Self {
        self.behaviors = behaviors; self
    }

    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store); self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport); self
    }

    pub fn content(mut self, content: Arc<dyn ContentGenerator>) -> Self {
        self.content = Some(content); self
    }

    /// Overrides the `engine` section of the flow file.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config); self
    }

    pub fn max_chain_hops(mut self, n: usize) -> Self {
        self.max_hops = Some(n); self
    }

    /// Validates the flows against the registered behaviours and builds the
    /// engine. Any configuration problem fails here, before the first update.
    pub fn build(self) -> Result<FlowEngine, EngineError> {
        let transport = self.transport
            .ok_or_else(|| EngineError::BuildError("transport is required".to_string()))?;
        let content = self.content
            .ok_or_else(|| EngineError::BuildError("content generator is required".to_string()))?;

        let flows = match self.flows {
            Some(flows) => flows,
            None => FlowConfig::bundled()?,
        };

        let mut config = self.config.unwrap_or_else(|| flows.engine.clone());
        if let Some(n) = self.max_hops {
            config.max_chain_hops = n;
        }
        if config.max_chain_hops == 0 {
            return Err(EngineError::BuildError("max_chain_hops must be at least 1".to_string()));
        }

        let compiled = flows.compile(&self.behaviors)?;
        let store = self.store.unwrap_or_else(|| Arc::new(MemorySessionStore::new()));

        Ok(FlowEngine::new(compiled, store, transport, content, config))
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
