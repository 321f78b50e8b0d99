use crate::states::ConversationState;
use crate::events::Event;
use crate::transport::Affordance;
use crate::turn::Turn;
use crate::types::Inbound;
use async_trait::async_trait;

pub const FEED_TOPICS: &[&str] = &[
    "Rust",
    "Systems thinking",
    "Productivity",
    "Leadership",
    "Writing",
];

pub struct TopicsState;

#[async_trait]
impl ConversationState for TopicsState {
    async fn enter(&self, turn: &mut Turn<'_>) -> Event {
        let text = if turn.is_reentry() {
            "Please choose a topic from the keyboard."
        } else {
            "📖 Which topic should your digest cover?"
        };
        turn.say_with(text, Affordance::reply_column(FEED_TOPICS.iter().copied())).await;
        Event::await_topic()
    }

    async fn handle(&self, turn: &mut Turn<'_>, input: &Inbound) -> Event {
        let chosen = input.text().and_then(|text| {
            FEED_TOPICS.iter().find(|topic| topic.eq_ignore_ascii_case(text))
        });
        match chosen {
            Some(topic) => {
                turn.context_mut().set("feed_topic", *topic);
                turn.log("TOPIC_SELECTED", topic);
                Event::topics_selected()
            }
            None => Event::invalid_input(),
        }
    }

    fn emits(&self) -> &'static [&'static str] {
        &["await_topic", "topics_selected", "invalid_input"]
    }
}
