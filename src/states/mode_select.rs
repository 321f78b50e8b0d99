use crate::states::ConversationState;
use crate::events::Event;
use crate::transport::Affordance;
use crate::turn::Turn;
use crate::types::{Inbound, Mode};
use async_trait::async_trait;

/// Mode picker. Choosing a mode is detected by the dispatcher before input
/// ever reaches this state, so anything that arrives here is unrecognised.
pub struct ModeSelectState;

#[async_trait]
impl ConversationState for ModeSelectState {
    async fn enter(&self, turn: &mut Turn<'_>) -> Event {
        let text = if turn.is_reentry() {
            "Please pick one of the options below."
        } else {
            "How would you like to learn?\n\n📚 Marathon: a guided daily program.\n📖 Feed: digests on topics you choose."
        };
        turn.say_with(text, Affordance::reply_column(Mode::ALL.iter().map(|m| m.label()))).await;
        Event::await_choice()
    }

    async fn handle(&self, turn: &mut Turn<'_>, input: &Inbound) -> Event {
        turn.log("UNRECOGNISED_CHOICE", &format!("{:?}", input));
        Event::invalid_input()
    }

    fn emits(&self) -> &'static [&'static str] {
        &["await_choice", "invalid_input"]
    }
}
