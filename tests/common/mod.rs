//! Shared fixtures for the integration tests.
//!
//! Everything runs against in-crate doubles: `RecordingTransport`,
//! `MockContentGenerator` and `MemorySessionStore`. No network, no bot API.

#![allow(dead_code)]

use std::sync::Arc;
use coachsm::{
    Affordance, Dispatcher, EngineBuilder, FlowEngine, MemorySessionStore,
    MockContentGenerator, RecordingTransport, TransportOp,
};

pub struct Harness {
    pub engine:     Arc<FlowEngine>,
    pub dispatcher: Dispatcher,
    pub transport:  Arc<RecordingTransport>,
    pub store:      Arc<MemorySessionStore>,
    pub content:    Arc<MockContentGenerator>,
}

/// Bundled flows, bundled behaviours, canned content.
pub fn harness() -> Harness {
    harness_with(EngineBuilder::new(), MockContentGenerator::canned())
}

/// Completes `builder` with the test doubles and builds.
pub fn harness_with(builder: EngineBuilder, content: MockContentGenerator) -> Harness {
    let transport = Arc::new(RecordingTransport::new());
    let store = Arc::new(MemorySessionStore::new());
    let content = Arc::new(content);

    let engine = builder
        .transport(transport.clone())
        .store(store.clone())
        .content(content.clone())
        .build()
        .expect("engine should build");
    let engine = Arc::new(engine);

    Harness {
        dispatcher: Dispatcher::new(engine.clone()),
        engine,
        transport,
        store,
        content,
    }
}

/// True when `op` is an edit attaching inline buttons.
pub fn is_inline_edit(op: &TransportOp) -> bool {
    matches!(op, TransportOp::Edit { affordance: Affordance::Inline(_), .. })
}

/// Number of removal instructions among `ops`.
pub fn removal_count(ops: &[TransportOp]) -> usize {
    ops.iter().filter(|op| op.is_removal()).count()
}
