use crate::states::{ConversationState, MARATHON_TOPICS};
use crate::content::ContentKind;
use crate::events::Event;
use crate::transport::{Affordance, OutboundMessage};
use crate::turn::Turn;
use crate::types::Inbound;
use async_trait::async_trait;

/// Answers shorter than this are treated as unrecognised input.
pub const MIN_ANSWER_CHARS: usize = 12;

const SKIP: &str = "⏭ Skip";

pub struct QuestionState;

impl QuestionState {
    fn keyboard() -> Affordance {
        Affordance::reply_column([SKIP])
    }

    fn is_skip(input: &Inbound) -> bool {
        input.text().is_some_and(|t| t == SKIP || t.eq_ignore_ascii_case("skip"))
    }
}

#[async_trait]
impl ConversationState for QuestionState {
    async fn enter(&self, turn: &mut Turn<'_>) -> Event {
        if turn.is_reentry() {
            turn.say_with(
                format!("Please answer in a sentence or two (at least {} characters), or tap Skip.", MIN_ANSWER_CHARS),
                Self::keyboard(),
            ).await;
            return Event::await_answer();
        }

        let index = turn.context().get_u64("topic_index").unwrap_or(0);
        let topic = MARATHON_TOPICS.get(index as usize).copied().unwrap_or("today's lesson");

        let cached = match turn.context().get_u64("question_topic") {
            Some(i) if i == index => turn.context().get_str("question_text").map(str::to_owned),
            _ => None,
        };
        let question = match cached {
            Some(text) => text,
            None => match turn.generate(ContentKind::Question, topic).await {
                Ok(text) => {
                    turn.context_mut().set("question_topic", index);
                    turn.context_mut().set("question_text", text.clone());
                    text
                }
                Err(_) => format!("In your own words: what is the main idea of \"{}\"?", topic),
            },
        };

        turn.say_with(format!("💭 Reflection question\n\n{}", question), Self::keyboard()).await;
        Event::await_answer()
    }

    async fn handle(&self, turn: &mut Turn<'_>, input: &Inbound) -> Event {
        if Self::is_skip(input) {
            // Leave no reply keyboard behind on the way out.
            let _ = turn.send(
                OutboundMessage::text("Topic skipped.").with_affordance(Affordance::RemoveReply)
            ).await;
            return Event::skip();
        }

        match input.text() {
            Some(answer) if answer.chars().count() >= MIN_ANSWER_CHARS => {
                let answer = answer.to_string();
                turn.log("ANSWER_RECORDED", &answer);
                turn.context_mut().set("last_answer", answer);
                Event::advance()
            }
            _ => Event::invalid_input(),
        }
    }

    fn emits(&self) -> &'static [&'static str] {
        &["await_answer", "advance", "skip", "invalid_input"]
    }
}
