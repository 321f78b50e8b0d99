use crate::states::ConversationState;
use crate::content::ContentKind;
use crate::events::Event;
use crate::transport::{Affordance, InlineButton};
use crate::turn::Turn;
use crate::types::Inbound;
use async_trait::async_trait;

/// Marathon curriculum, one topic per day.
pub const MARATHON_TOPICS: &[&str] = &[
    "Attention as a resource",
    "Systems thinking basics",
    "Roles and methods",
    "Working products",
    "Time planning",
    "Notes and the exocortex",
    "Reflection practice",
];

pub struct LessonState;

impl LessonState {
    fn ready_button() -> Affordance {
        Affordance::inline_row(vec![InlineButton::new("✅ Ready", "ready")])
    }
}

#[async_trait]
impl ConversationState for LessonState {
    async fn enter(&self, turn: &mut Turn<'_>) -> Event {
        let index = turn.context().get_u64("topic_index").unwrap_or(0);
        let Some(topic) = MARATHON_TOPICS.get(index as usize) else {
            turn.log("MARATHON_COMPLETE", &index.to_string());
            return Event::marathon_complete();
        };

        if turn.is_reentry() {
            turn.say_with("Tap Ready when you have read the lesson.", Self::ready_button()).await;
            return Event::await_ready();
        }

        // Reuse the lesson already generated for this topic, so redelivered
        // updates and re-renders show the same text.
        let cached = match turn.context().get_u64("lesson_topic") {
            Some(i) if i == index => turn.context().get_str("lesson_text").map(str::to_owned),
            _ => None,
        };
        let body = match cached {
            Some(text) => text,
            None => match turn.generate(ContentKind::Lesson, topic).await {
                Ok(text) => {
                    turn.context_mut().set("lesson_topic", index);
                    turn.context_mut().set("lesson_text", text.clone());
                    text
                }
                Err(_) => format!(
                    "Today's topic is \"{}\". The full lesson is unavailable right now; think about how this topic shows up in your work today.",
                    topic
                ),
            },
        };

        let text = format!("📚 Day {}: {}\n\n{}", index + 1, topic, body);
        turn.say_with(text, Self::ready_button()).await;
        Event::await_ready()
    }

    async fn handle(&self, _turn: &mut Turn<'_>, input: &Inbound) -> Event {
        if input.is("ready") {
            Event::go_to_question()
        } else {
            Event::invalid_input()
        }
    }

    fn emits(&self) -> &'static [&'static str] {
        &["await_ready", "go_to_question", "marathon_complete", "invalid_input"]
    }
}
