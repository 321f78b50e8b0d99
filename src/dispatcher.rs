use std::collections::BTreeMap;
use std::sync::Arc;
use dashmap::DashMap;
use futures::future::join_all;
use tokio::sync::Mutex;
use crate::engine::{Cycle, FlowEngine};
use crate::error::EngineError;
use crate::types::{ChatId, Inbound, Mode};

/// Single entry point for inbound updates.
///
/// Resolves the acting mode of a chat, applies command shortcuts and hands
/// everything else to the engine. Cycles of one chat run one at a time, in
/// arrival order; different chats run concurrently.
#[derive(Clone)]
pub struct Dispatcher {
    engine: Arc<FlowEngine>,
    locks:  Arc<DashMap<ChatId, Arc<Mutex<()>>>>,
}

impl Dispatcher {
    pub fn new(engine: Arc<FlowEngine>) -> Self {
        Self {
            engine,
            locks: Arc::new(DashMap::new()),
        }
    }

    pub fn engine(&self) -> &Arc<FlowEngine> {
        &self.engine
    }

    /// Chats with a cycle running or queued.
    pub fn active_chats(&self) -> usize {
        self.locks.len()
    }

    /// Routes one update and runs its cycle to completion, persistence
    /// included, under the chat's lock and the cycle timeout.
    pub async fn route(&self, chat_id: ChatId, input: Inbound) -> Result<Cycle, EngineError> {
        let lock = self.locks
            .entry(chat_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;
            let timeout = self.engine.config().cycle_timeout();
            match tokio::time::timeout(timeout, self.route_locked(chat_id, &input)).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::error!(chat_id, ?timeout, "cycle timed out, session left as of record");
                    Err(EngineError::CycleTimeout { chat_id, timeout })
                }
            }
        };

        // Forget the lock once nobody else holds or waits on it.
        drop(lock);
        self.locks.remove_if(&chat_id, |_, lock| Arc::strong_count(lock) == 1);

        if let Err(e) = &result {
            tracing::warn!(chat_id, error = %e, "update not processed");
        }
        result
    }

    /// Routes a batch: chats run concurrently, updates of one chat in order.
    /// Results come back in the order of `updates`.
    pub async fn route_batch(&self, updates: Vec<(ChatId, Inbound)>) -> Vec<Result<Cycle, EngineError>> {
        let total = updates.len();
        let mut queues: BTreeMap<ChatId, Vec<(usize, Inbound)>> = BTreeMap::new();
        for (index, (chat_id, input)) in updates.into_iter().enumerate() {
            queues.entry(chat_id).or_default().push((index, input));
        }

        let runs = queues.into_iter().map(|(chat_id, queue)| async move {
            let mut done = Vec::with_capacity(queue.len());
            for (index, input) in queue {
                done.push((index, self.route(chat_id, input).await));
            }
            done
        });

        let mut slots: Vec<Option<Result<Cycle, EngineError>>> = (0..total).map(|_| None).collect();
        for (index, result) in join_all(runs).await.into_iter().flatten() {
            slots[index] = Some(result);
        }
        slots.into_iter().flatten().collect()
    }

    async fn route_locked(&self, chat_id: ChatId, input: &Inbound) -> Result<Cycle, EngineError> {
        let engine = &self.engine;
        let flows = engine.flows();
        let existing = engine.load(chat_id).await?;

        if let Some(mode) = input.explicit_mode() {
            tracing::info!(chat_id, mode = %mode, "explicit mode selection");
            return match existing {
                Some(session) => engine.switch_mode(session, mode).await,
                None => engine.start(chat_id, Some(mode)).await,
            };
        }

        let named_mode = input.text().and_then(Mode::mentioned_in);

        let Some(session) = existing else {
            // No session yet: either the first message names a mode, or the
            // chat is sent to mode selection.
            return match named_mode {
                Some(mode) => engine.start(chat_id, Some(mode)).await,
                None => engine.start(chat_id, None).await,
            };
        };

        if session.mode.is_none() || session.state_id == flows.mode_select_state {
            if let Some(mode) = named_mode {
                tracing::info!(chat_id, mode = %mode, "mode chosen");
                return engine.switch_mode(session, mode).await;
            }
        }

        if let Inbound::Command { name, .. } = input {
            let target = flows.flow(session.mode).ok()
                .and_then(|flow| flow.command(&session.state_id, name));
            if let Some(target) = target {
                tracing::info!(chat_id, command = %name, target = %target, "command shortcut");
                return engine.go_to(session, target).await;
            }
            tracing::debug!(chat_id, command = %name, state = %session.state_id, "command not available here");
        }

        engine.step(session, input).await
    }
}
