use std::collections::HashMap;
use std::sync::Arc;
use crate::events::Event;
use crate::turn::Turn;
use crate::types::{Inbound, StateId};
use async_trait::async_trait;

mod mode_select;
mod error;
mod progress;
mod lesson;
mod question;
mod task;
mod topics;
mod digest;

pub use mode_select::ModeSelectState;
pub use error::ErrorState;
pub use progress::ProgressState;
pub use lesson::{LessonState, MARATHON_TOPICS};
pub use question::{QuestionState, MIN_ANSWER_CHARS};
pub use task::TaskState;
pub use topics::{TopicsState, FEED_TOPICS};
pub use digest::DigestState;

/// The contract every state behaviour must fulfill.
///
/// # Implementing a State
///
/// 1. `enter()` renders the state on arrival and MUST return an Event on
///    every path. Return an `await*` event to rest here until the next
///    inbound update, or any other event to move on immediately.
/// 2. `handle()` interprets one inbound update. Input the state does not
///    recognise returns `Event::invalid_input()`, never a guess.
/// 3. Keep per-user data in `turn.context_mut()`, never in `self`.
/// 4. Collaborator failures are data: fall back to degraded content and
///    return a normal event. Never panic.
/// 5. List every event the behaviour can return in `emits()`; loading a
///    flow fails when one of them has no transition.
///
/// Keyboard type and label are declared for each state in the flow file.
#[async_trait]
pub trait ConversationState: Send + Sync {
    async fn enter(&self, turn: &mut Turn<'_>) -> Event;

    async fn handle(&self, turn: &mut Turn<'_>, input: &Inbound) -> Event;

    /// Events this behaviour can return from `enter` or `handle`.
    fn emits(&self) -> &'static [&'static str] {
        &[]
    }
}

/// Behaviours of the bundled program, keyed by state id.
pub fn default_behaviors() -> HashMap<StateId, Arc<dyn ConversationState>> {
    let mut behaviors: HashMap<StateId, Arc<dyn ConversationState>> = HashMap::new();
    behaviors.insert(StateId::mode_select(),       Arc::new(ModeSelectState));
    behaviors.insert(StateId::error(),             Arc::new(ErrorState));
    behaviors.insert(StateId::progress(),          Arc::new(ProgressState));
    behaviors.insert(StateId::marathon_lesson(),   Arc::new(LessonState));
    behaviors.insert(StateId::marathon_question(), Arc::new(QuestionState));
    behaviors.insert(StateId::marathon_task(),     Arc::new(TaskState));
    behaviors.insert(StateId::feed_topics(),       Arc::new(TopicsState));
    behaviors.insert(StateId::feed_digest(),       Arc::new(DigestState));
    behaviors
}
