use crate::states::ConversationState;
use crate::content::ContentKind;
use crate::events::Event;
use crate::transport::{Affordance, InlineButton};
use crate::turn::Turn;
use crate::types::Inbound;
use async_trait::async_trait;

pub struct DigestState;

impl DigestState {
    fn buttons() -> Affordance {
        Affordance::Inline(vec![
            vec![InlineButton::new("➕ More", "more")],
            vec![InlineButton::new("🔄 Change topic", "change_topics")],
        ])
    }

    fn forget_digest(turn: &mut Turn<'_>) {
        let ctx = turn.context_mut();
        ctx.remove("digest_topic");
        ctx.remove("digest_text");
    }
}

#[async_trait]
impl ConversationState for DigestState {
    async fn enter(&self, turn: &mut Turn<'_>) -> Event {
        let Some(topic) = turn.context().get_str("feed_topic").map(str::to_owned) else {
            turn.log("NO_TOPIC", "");
            return Event::no_topic();
        };

        if turn.is_reentry() && turn.context().get_str("digest_topic") == Some(topic.as_str()) {
            turn.say_with("Use the buttons under the digest to continue.", Self::buttons()).await;
            return Event::await_input();
        }

        let cached = match turn.context().get_str("digest_topic") {
            Some(t) if t == topic => turn.context().get_str("digest_text").map(str::to_owned),
            _ => None,
        };
        let body = match cached {
            Some(text) => text,
            None => match turn.generate(ContentKind::Digest, &topic).await {
                Ok(text) => {
                    let ctx = turn.context_mut();
                    ctx.set("digest_topic", topic.clone());
                    ctx.set("digest_text", text.clone());
                    ctx.increment("digests_read", 1);
                    text
                }
                Err(_) => "The digest is unavailable right now. Tap More to try again in a moment.".to_string(),
            },
        };

        turn.say_with(format!("📰 {}\n\n{}", topic, body), Self::buttons()).await;
        Event::await_input()
    }

    async fn handle(&self, turn: &mut Turn<'_>, input: &Inbound) -> Event {
        if input.is("more") {
            Self::forget_digest(turn);
            Event::more()
        } else if input.is("change_topics") {
            Self::forget_digest(turn);
            Event::change_topics()
        } else {
            Event::invalid_input()
        }
    }

    fn emits(&self) -> &'static [&'static str] {
        &["await_input", "more", "change_topics", "no_topic", "invalid_input"]
    }
}
