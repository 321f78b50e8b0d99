//! Dispatcher: bootstrap, mode detection, command shortcuts, per-chat
//! serialization and the cycle timeout.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use futures::future::join_all;
use coachsm::states::{LessonState, QuestionState};
use coachsm::{
    ChatId, ConversationState, EngineBuilder, EngineConfig, EngineError, Event, Inbound,
    MockContentGenerator, Mode, StateId, Turn,
};
use common::{harness, harness_with, is_inline_edit};

// ─────────────────────────────────────────────────────────────────────────────
// Test doubles
// ─────────────────────────────────────────────────────────────────────────────

/// Question state that counts how often `handle` runs.
struct SpyQuestion {
    handled: Arc<AtomicUsize>,
}

#[async_trait]
impl ConversationState for SpyQuestion {
    async fn enter(&self, turn: &mut Turn<'_>) -> Event {
        QuestionState.enter(turn).await
    }

    async fn handle(&self, turn: &mut Turn<'_>, input: &Inbound) -> Event {
        self.handled.fetch_add(1, Ordering::SeqCst);
        QuestionState.handle(turn, input).await
    }

    fn emits(&self) -> &'static [&'static str] {
        QuestionState.emits()
    }
}

/// Lesson state whose `handle` does a slow read-modify-write of the context.
struct SlowCounter;

#[async_trait]
impl ConversationState for SlowCounter {
    async fn enter(&self, turn: &mut Turn<'_>) -> Event {
        LessonState.enter(turn).await
    }

    async fn handle(&self, turn: &mut Turn<'_>, input: &Inbound) -> Event {
        let seen = turn.context().get_u64("ticks").unwrap_or(0);
        let mut log: Vec<String> = turn.context().get("log")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();

        tokio::time::sleep(Duration::from_millis(5)).await;

        log.push(input.text().unwrap_or_default().to_string());
        turn.context_mut().set("ticks", seen + 1);
        turn.context_mut().set("log", serde_json::json!(log));
        Event::invalid_input()
    }

    fn emits(&self) -> &'static [&'static str] {
        LessonState.emits()
    }
}

async fn logged(h: &common::Harness, chat_id: ChatId) -> Vec<String> {
    let stored = h.engine.load(chat_id).await.unwrap().unwrap();
    serde_json::from_value(stored.context.get("log").unwrap().clone()).unwrap()
}

fn select_mode(mode: &str) -> Inbound {
    Inbound::Command { name: "mode".to_string(), args: mode.to_string() }
}

// ─────────────────────────────────────────────────────────────────────────────
// Bootstrap and mode detection
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_new_chat_goes_to_mode_selection() {
    let h = harness();

    let cycle = h.dispatcher.route(1, Inbound::parse("hello")).await.unwrap();

    assert_eq!(cycle.session.mode, None);
    assert_eq!(cycle.state_id(), &StateId::mode_select());
    let texts = h.transport.texts_for(1);
    assert!(texts[0].starts_with("How would you like to learn?"));
}

#[tokio::test]
async fn test_unrecognised_choice_reprompts() {
    let h = harness();
    h.dispatcher.route(2, Inbound::parse("/start")).await.unwrap();

    let cycle = h.dispatcher.route(2, Inbound::parse("something else")).await.unwrap();

    assert_eq!(cycle.session.mode, None);
    assert_eq!(cycle.state_id(), &StateId::mode_select());
    assert!(cycle.trace.events().contains(&"invalid_input"));
    assert_eq!(h.transport.texts_for(2).last().unwrap(), "Please pick one of the options below.");
}

#[tokio::test]
async fn test_mode_button_selects_mode_and_cleans_keyboard() {
    let h = harness();
    h.dispatcher.route(3, Inbound::parse("hi")).await.unwrap();
    h.transport.clear();

    let cycle = h.dispatcher.route(3, Inbound::parse(Mode::Marathon.label())).await.unwrap();

    assert_eq!(cycle.session.mode, Some(Mode::Marathon));
    assert_eq!(cycle.state_id(), &StateId::marathon_lesson());
    // mode selection (reply) → lesson (inline)
    let ops = h.transport.ops_for(3);
    assert_eq!(ops.len(), 2);
    assert!(ops[0].is_removal());
    assert!(is_inline_edit(&ops[1]));
}

#[tokio::test]
async fn test_first_message_naming_a_mode_starts_it() {
    let h = harness();

    let cycle = h.dispatcher.route(4, Inbound::parse("feed")).await.unwrap();

    assert_eq!(cycle.session.mode, Some(Mode::Feed));
    assert_eq!(cycle.state_id(), &StateId::feed_topics());
}

#[tokio::test]
async fn test_mode_must_be_named_as_a_whole_word() {
    let h = harness();
    h.dispatcher.route(11, Inbound::parse("hi")).await.unwrap();

    let cycle = h.dispatcher.route(11, Inbound::parse("I want feedback")).await.unwrap();

    assert_eq!(cycle.session.mode, None);
    assert_eq!(cycle.state_id(), &StateId::mode_select());
    assert!(cycle.trace.events().contains(&"invalid_input"));

    let cycle = h.dispatcher.route(11, Inbound::parse("feed, please")).await.unwrap();
    assert_eq!(cycle.session.mode, Some(Mode::Feed));
}

#[tokio::test]
async fn test_explicit_mode_switch_from_anywhere() {
    let h = harness();
    h.dispatcher.route(5, select_mode("marathon")).await.unwrap();

    let cycle = h.dispatcher.route(5, Inbound::Callback("mode:feed".into())).await.unwrap();

    assert_eq!(cycle.session.mode, Some(Mode::Feed));
    assert_eq!(cycle.state_id(), &StateId::feed_topics());
}

#[tokio::test]
async fn test_mode_name_mid_flow_is_not_a_switch() {
    let h = harness();
    h.dispatcher.route(6, select_mode("feed")).await.unwrap();

    // At the topic picker "marathon" is just unrecognised input.
    let cycle = h.dispatcher.route(6, Inbound::parse("marathon")).await.unwrap();

    assert_eq!(cycle.session.mode, Some(Mode::Feed));
    assert_eq!(cycle.state_id(), &StateId::feed_topics());
}

#[tokio::test]
async fn test_mode_command_then_choice() {
    let h = harness();
    h.dispatcher.route(7, select_mode("feed")).await.unwrap();

    let cycle = h.dispatcher.route(7, Inbound::parse("/mode")).await.unwrap();
    assert_eq!(cycle.state_id(), &StateId::mode_select());
    assert_eq!(cycle.session.mode, Some(Mode::Feed));

    let cycle = h.dispatcher.route(7, Inbound::parse("📚 Marathon")).await.unwrap();
    assert_eq!(cycle.session.mode, Some(Mode::Marathon));
    assert_eq!(cycle.state_id(), &StateId::marathon_lesson());
}

// ─────────────────────────────────────────────────────────────────────────────
// Command shortcuts
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_progress_command_bypasses_handle_and_cleans_keyboard() {
    let handled = Arc::new(AtomicUsize::new(0));
    let spy = SpyQuestion { handled: handled.clone() };
    let h = harness_with(
        EngineBuilder::new().state(StateId::marathon_question(), Arc::new(spy)),
        MockContentGenerator::canned(),
    );

    h.dispatcher.route(8, select_mode("marathon")).await.unwrap();
    let cycle = h.dispatcher.route(8, Inbound::Callback("ready".into())).await.unwrap();
    assert_eq!(cycle.state_id(), &StateId::marathon_question());
    h.transport.clear();

    let cycle = h.dispatcher.route(8, Inbound::parse("/progress")).await.unwrap();

    assert_eq!(handled.load(Ordering::SeqCst), 0);
    assert_eq!(cycle.state_id(), &StateId::progress());
    assert_eq!(cycle.trace.events()[0], "go_to");
    let ops = h.transport.ops_for(8);
    assert_eq!(ops.len(), 2);
    assert!(ops[0].is_removal());
    assert!(is_inline_edit(&ops[1]));

    // Back lands in the question again, which now handles input.
    let cycle = h.dispatcher.route(8, Inbound::Callback("back".into())).await.unwrap();
    assert_eq!(cycle.state_id(), &StateId::marathon_question());
    h.dispatcher.route(8, Inbound::parse("too short")).await.unwrap();
    assert_eq!(handled.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_learn_command_defaults_to_entry() {
    let h = harness();
    h.dispatcher.route(9, select_mode("feed")).await.unwrap();
    h.dispatcher.route(9, Inbound::parse("/progress")).await.unwrap();

    let cycle = h.dispatcher.route(9, Inbound::parse("/learn@coach_bot")).await.unwrap();

    assert_eq!(cycle.state_id(), &StateId::feed_topics());
}

#[tokio::test]
async fn test_state_without_command_in_its_list_handles_it() {
    let h = harness();
    h.dispatcher.route(12, select_mode("feed")).await.unwrap();
    let cycle = h.dispatcher.route(12, Inbound::parse("/mode")).await.unwrap();
    assert_eq!(cycle.state_id(), &StateId::mode_select());

    // Mode selection accepts only /start and /mode.
    let cycle = h.dispatcher.route(12, Inbound::parse("/progress")).await.unwrap();

    assert_eq!(cycle.state_id(), &StateId::mode_select());
    assert!(cycle.trace.events().contains(&"invalid_input"));
    assert!(!cycle.trace.events().contains(&"go_to"));
}

#[tokio::test]
async fn test_unknown_command_goes_to_the_state() {
    let h = harness();
    h.dispatcher.route(10, select_mode("feed")).await.unwrap();

    let cycle = h.dispatcher.route(10, Inbound::parse("/dance")).await.unwrap();

    assert_eq!(cycle.state_id(), &StateId::feed_topics());
    assert!(cycle.trace.events().contains(&"invalid_input"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Concurrency
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_same_chat_updates_are_serialized() {
    let h = harness_with(
        EngineBuilder::new().state(StateId::marathon_lesson(), Arc::new(SlowCounter)),
        MockContentGenerator::canned(),
    );
    h.dispatcher.route(11, select_mode("marathon")).await.unwrap();

    let updates = (0..10).map(|i| h.dispatcher.route(11, Inbound::Text(format!("tick-{}", i))));
    let results = join_all(updates).await;
    assert!(results.iter().all(|r| r.is_ok()));

    let stored = h.engine.load(11).await.unwrap().unwrap();
    assert_eq!(stored.context.get_u64("ticks"), Some(10));
    assert_eq!(h.dispatcher.active_chats(), 0);
}

#[tokio::test]
async fn test_batch_keeps_arrival_order_per_chat() {
    let h = harness_with(
        EngineBuilder::new().state(StateId::marathon_lesson(), Arc::new(SlowCounter)),
        MockContentGenerator::canned(),
    );
    for chat_id in [12, 13] {
        h.dispatcher.route(chat_id, select_mode("marathon")).await.unwrap();
    }

    let mut updates = Vec::new();
    for i in 0..5 {
        updates.push((12, Inbound::Text(format!("a{}", i))));
        updates.push((13, Inbound::Text(format!("b{}", i))));
    }
    let results = h.dispatcher.route_batch(updates).await;

    assert_eq!(results.len(), 10);
    assert_eq!(results[0].as_ref().unwrap().session.chat_id, 12);
    assert_eq!(results[1].as_ref().unwrap().session.chat_id, 13);

    assert_eq!(logged(&h, 12).await, vec!["a0", "a1", "a2", "a3", "a4"]);
    assert_eq!(logged(&h, 13).await, vec!["b0", "b1", "b2", "b3", "b4"]);
}

#[tokio::test(start_paused = true)]
async fn test_cycle_timeout_leaves_session_unchanged() {
    let config = EngineConfig {
        cycle_timeout_ms:        50,
        collaborator_timeout_ms: 10_000,
        ..EngineConfig::default()
    };
    let h = harness_with(
        EngineBuilder::new().config(config),
        MockContentGenerator::canned().with_delay(Duration::from_secs(1)),
    );

    let result = h.dispatcher.route(14, select_mode("marathon")).await;

    match result {
        Err(EngineError::CycleTimeout { chat_id, timeout }) => {
            assert_eq!(chat_id, 14);
            assert_eq!(timeout, Duration::from_millis(50));
        }
        other => panic!("expected CycleTimeout, got {:?}", other.map(|c| c.session)),
    }
    assert!(h.engine.load(14).await.unwrap().is_none());
    assert_eq!(h.dispatcher.active_chats(), 0);
}
