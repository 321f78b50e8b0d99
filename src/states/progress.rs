use crate::states::{ConversationState, MARATHON_TOPICS};
use crate::events::Event;
use crate::transport::{Affordance, InlineButton};
use crate::turn::Turn;
use crate::types::{Inbound, Mode};
use async_trait::async_trait;

pub struct ProgressState;

impl ProgressState {
    fn summary(turn: &Turn<'_>) -> String {
        let ctx = turn.context();
        match turn.mode() {
            Some(Mode::Marathon) => {
                let completed = ctx.get_u64("completed_topics").unwrap_or(0);
                let skipped   = ctx.get_u64("skipped_topics").unwrap_or(0);
                format!(
                    "📊 Your progress\n\nMarathon: {} of {} topics completed, {} skipped.",
                    completed, MARATHON_TOPICS.len(), skipped
                )
            }
            Some(Mode::Feed) => {
                let read = ctx.get_u64("digests_read").unwrap_or(0);
                let topic = ctx.get_str("feed_topic").unwrap_or("none yet");
                format!("📊 Your progress\n\nFeed: {} digests read. Current topic: {}.", read, topic)
            }
            None => "📊 Your progress\n\nPick a mode to start tracking progress.".to_string(),
        }
    }
}

#[async_trait]
impl ConversationState for ProgressState {
    async fn enter(&self, turn: &mut Turn<'_>) -> Event {
        let text = if turn.is_reentry() {
            "Use the buttons below to continue.".to_string()
        } else {
            Self::summary(turn)
        };
        let buttons = Affordance::inline_row(vec![
            InlineButton::new("▶️ Continue", "continue"),
            InlineButton::new("↩️ Back", "back"),
        ]);
        turn.say_with(text, buttons).await;
        Event::await_input()
    }

    async fn handle(&self, _turn: &mut Turn<'_>, input: &Inbound) -> Event {
        if input.is("continue") {
            Event::r#continue()
        } else if input.is("back") {
            Event::back()
        } else {
            Event::invalid_input()
        }
    }

    fn emits(&self) -> &'static [&'static str] {
        &["await_input", "continue", "back", "invalid_input"]
    }
}
