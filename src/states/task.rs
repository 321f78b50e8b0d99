use crate::states::{ConversationState, MARATHON_TOPICS};
use crate::events::Event;
use crate::turn::Turn;
use crate::types::Inbound;
use async_trait::async_trait;

/// Daily practice task. Submitting or skipping moves the marathon to the
/// next topic.
pub struct TaskState;

#[async_trait]
impl ConversationState for TaskState {
    async fn enter(&self, turn: &mut Turn<'_>) -> Event {
        if turn.is_reentry() {
            turn.say("Describe what you did for the practice task, or send \"skip\".").await;
            return Event::await_submission();
        }

        let index = turn.context().get_u64("topic_index").unwrap_or(0);
        let topic = MARATHON_TOPICS.get(index as usize).copied().unwrap_or("today's lesson");
        turn.say(format!(
            "🛠 Practice\n\nApply \"{}\" to one real situation today, then describe what you did and what you noticed.",
            topic
        )).await;
        Event::await_submission()
    }

    async fn handle(&self, turn: &mut Turn<'_>, input: &Inbound) -> Event {
        let Some(text) = input.text().filter(|t| !t.is_empty()) else {
            return Event::invalid_input();
        };

        let ctx = turn.context_mut();
        let event = if text.eq_ignore_ascii_case("skip") {
            ctx.increment("skipped_topics", 1);
            Event::skip()
        } else {
            ctx.increment("completed_topics", 1);
            Event::submitted()
        };
        let next = ctx.increment("topic_index", 1);
        if (next as usize) < MARATHON_TOPICS.len() {
            turn.say("Saved. On to the next topic.").await;
        } else {
            turn.say("Saved. That was the last topic of the marathon! 🎉").await;
        }
        event
    }

    fn emits(&self) -> &'static [&'static str] {
        &["await_submission", "submitted", "skip", "invalid_input"]
    }
}
