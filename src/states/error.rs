use crate::states::ConversationState;
use crate::events::Event;
use crate::turn::Turn;
use crate::types::Inbound;
use async_trait::async_trait;

/// Where the engine parks a chat after a configuration defect or a runaway
/// transition chain. Any input restarts the current flow.
pub struct ErrorState;

#[async_trait]
impl ConversationState for ErrorState {
    async fn enter(&self, turn: &mut Turn<'_>) -> Event {
        turn.say("⚠️ Something unexpected went wrong on our side. Send any message to start over.").await;
        Event::await_input()
    }

    async fn handle(&self, _turn: &mut Turn<'_>, _input: &Inbound) -> Event {
        Event::restart()
    }

    fn emits(&self) -> &'static [&'static str] {
        &["await_input", "restart"]
    }
}
