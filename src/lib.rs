pub mod types;
pub mod session;
pub mod events;
pub mod transitions;
pub mod registry;
pub mod flow;
pub mod config;
pub mod keyboard;
pub mod transport;
pub mod turn;
pub mod engine;
pub mod dispatcher;
pub mod trace;
pub mod error;
pub mod builder;
pub mod states;
pub mod content;
pub mod store;

// Convenience re-exports at crate root
pub use builder::EngineBuilder;
pub use engine::{Cycle, FlowEngine};
pub use dispatcher::Dispatcher;
pub use session::{Context, Session};
pub use types::{ChatId, StateId, Mode, KeyboardType, Inbound};
pub use events::Event;
pub use transitions::{Target, TransitionEntry, TransitionTable};
pub use registry::{Behaviors, StateEntry, StateRegistry};
pub use flow::{Flow, FlowSet};
pub use config::{EngineConfig, FlowConfig, FlowSection, StateDecl};
pub use keyboard::{CleanupAction, SendPlan};
pub use transport::{Affordance, InlineButton, MessageRef, OutboundMessage, RecordingTransport, Transport, TransportOp};
pub use turn::Turn;
pub use states::ConversationState;
pub use content::{ContentError, ContentGenerator, ContentKind, ContentRequest, MockContentGenerator, RetryingGenerator};
pub use store::{MemorySessionStore, SessionStore, SqliteSessionStore};
pub use trace::{TraceEntry, TraceKind, Trace};
pub use error::EngineError;
