use thiserror::Error;
use std::time::Duration;
use crate::types::{ChatId, StateId};
use crate::events::Event;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Unknown state: {state} is not registered in the {scope} flow")]
    UnknownState { scope: &'static str, state: StateId },

    #[error("Invalid transition: {from} + {event} not in the {scope} transition table")]
    InvalidTransition { scope: &'static str, from: StateId, event: Event },

    #[error("Transition chain exceeded {0} hops in one cycle")]
    ChainTooLong(usize),

    #[error("No flow configured for mode: {0}")]
    UnknownMode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session store error: {0}")]
    Store(String),

    #[error("Cycle for chat {chat_id} did not finish within {timeout:?}")]
    CycleTimeout { chat_id: ChatId, timeout: Duration },

    #[error("Build error: {0}")]
    BuildError(String),
}

impl EngineError {
    /// Defects discovered while running a cycle. The engine answers these by
    /// routing the chat to the error state instead of failing the process.
    pub fn is_configuration_defect(&self) -> bool {
        matches!(
            self,
            EngineError::UnknownState { .. }
                | EngineError::InvalidTransition { .. }
                | EngineError::ChainTooLong(_)
                | EngineError::UnknownMode(_)
        )
    }
}
