use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;
use crate::config::EngineConfig;
use crate::content::ContentGenerator;
use crate::error::EngineError;
use crate::events::Event;
use crate::flow::FlowSet;
use crate::keyboard::{self, CleanupAction};
use crate::session::Session;
use crate::store::SessionStore;
use crate::trace::{Trace, TraceKind};
use crate::transport::Transport;
use crate::turn::Turn;
use crate::types::{ChatId, Inbound, KeyboardType, Mode, StateId};

/// Result of one completed cycle.
#[derive(Debug)]
pub struct Cycle {
    /// The session as persisted at the end of the cycle.
    pub session: Session,
    /// Everything handled, entered and bypassed during the cycle.
    pub trace:   Trace,
    /// Configuration defect that routed the chat to the error state, if any.
    pub fault:   Option<EngineError>,
}

impl Cycle {
    pub fn state_id(&self) -> &StateId {
        &self.session.state_id
    }

    pub fn is_faulted(&self) -> bool {
        self.fault.is_some()
    }
}

/// What starts a cycle.
enum Action<'i> {
    /// Normal path: current state handles the input, the table picks the target.
    Handle(&'i Inbound),
    /// Command bypass to an explicit target.
    GoTo(StateId),
    /// Move the session into another mode's entry state.
    SwitchMode(Mode),
    /// Enter the entry state of a freshly created session.
    Start,
}

pub struct FlowEngine {
    flows:     FlowSet,
    store:     Arc<dyn SessionStore>,
    transport: Arc<dyn Transport>,
    content:   Arc<dyn ContentGenerator>,
    config:    EngineConfig,
}

impl FlowEngine {
    /// Creates a new engine. Prefer using EngineBuilder for ergonomic construction.
    pub fn new(
        flows:     FlowSet,
        store:     Arc<dyn SessionStore>,
        transport: Arc<dyn Transport>,
        content:   Arc<dyn ContentGenerator>,
        config:    EngineConfig,
    ) -> Self {
        Self { flows, store, transport, content, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn flows(&self) -> &FlowSet {
        &self.flows
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub async fn load(&self, chat_id: ChatId) -> Result<Option<Session>, EngineError> {
        self.store.load(chat_id).await.map_err(EngineError::Store)
    }

    /// Processes one inbound update for `session` and persists the result.
    pub async fn step(&self, session: Session, input: &Inbound) -> Result<Cycle, EngineError> {
        self.drive(session, Action::Handle(input)).await
    }

    /// Direct transition used by command shortcuts. Skips `handle` and the
    /// transition table; keyboard cleanup, `enter` and persistence still run.
    pub async fn go_to(&self, session: Session, target: StateId) -> Result<Cycle, EngineError> {
        self.drive(session, Action::GoTo(target)).await
    }

    /// Moves the session into `mode`, entering that mode's entry state.
    pub async fn switch_mode(&self, session: Session, mode: Mode) -> Result<Cycle, EngineError> {
        self.drive(session, Action::SwitchMode(mode)).await
    }

    /// Creates the session of a new chat and enters the entry state of
    /// `mode` (the bootstrap flow for `None`).
    pub async fn start(&self, chat_id: ChatId, mode: Option<Mode>) -> Result<Cycle, EngineError> {
        let entry = self.flows.flow(mode)?.entry.clone();
        self.drive(Session::new(chat_id, mode, entry), Action::Start).await
    }

    /// Runs one cycle on a working copy of the session and saves it once.
    ///
    /// On `Err` nothing was saved; the stored session stays as of record.
    async fn drive(&self, mut session: Session, action: Action<'_>) -> Result<Cycle, EngineError> {
        let cycle_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "cycle",
            chat_id  = session.chat_id,
            cycle_id = %cycle_id,
        );

        async move {
            let mut trace = Trace::new();

            let outcome = {
                let mut turn = Turn::new(
                    &mut session,
                    self.transport.as_ref(),
                    self.content.as_ref(),
                    &mut trace,
                    self.config.collaborator_timeout(),
                );
                self.run(&mut turn, action).await
            };

            let fault = match outcome {
                Ok(()) => None,
                Err(e) if e.is_configuration_defect() => {
                    self.recover(&mut session, &mut trace, &e).await;
                    Some(e)
                }
                Err(e) => return Err(e),
            };

            session.touch();
            self.store.save(&session).await.map_err(EngineError::Store)?;

            tracing::info!(
                mode          = session.scope(),
                state         = %session.state_id,
                trace_entries = trace.len(),
                "cycle complete"
            );
            Ok(Cycle { session, trace, fault })
        }
        .instrument(span)
        .await
    }

    async fn run(&self, turn: &mut Turn<'_>, action: Action<'_>) -> Result<(), EngineError> {
        let from = turn.state_id().clone();

        match action {
            Action::Handle(input) => {
                let flow = self.flows.flow(turn.mode())?;
                let current = flow.state(&from)?;
                let event = current.behavior.handle(turn, input).await;
                if event.is_invalid_input() {
                    tracing::debug!(state = %from, "input not recognised, re-prompting");
                } else {
                    tracing::debug!(state = %from, event = %event, "state produced event");
                }
                turn.record(TraceKind::Handle, &from, &event, "");

                let to = flow.resolve(&from, &event, turn.session.previous_state.as_ref())?;
                self.settle(turn, Some((from, current.keyboard_type)), to).await
            }

            Action::GoTo(target) => {
                let flow = self.flows.flow(turn.mode())?;
                tracing::info!(from = %from, to = %target, "go_to bypass");
                turn.record(TraceKind::GoTo, &from, &Event::go_to(), target.as_str());
                if target != from {
                    turn.session.previous_state = Some(from.clone());
                }
                // The state being left may no longer exist after a flow change;
                // the bypass still moves the chat out of it.
                let from_type = flow.registry.get(&from).map(|e| e.keyboard_type);
                self.settle(turn, from_type.map(|t| (from, t)), target).await
            }

            Action::SwitchMode(mode) => {
                let from_type = self.flows.flow(turn.mode()).ok()
                    .and_then(|flow| flow.registry.get(&from))
                    .map(|e| e.keyboard_type);
                let target = self.flows.flow(Some(mode))?.entry.clone();
                tracing::info!(from_mode = turn.session.scope(), to_mode = %mode, "mode switch");
                turn.record(TraceKind::SwitchMode, &from, &Event::new("switch_mode"), mode.as_str());

                turn.session.mode = Some(mode);
                turn.session.previous_state = None;
                // Cleanup is decided across the two flows; never a re-entry.
                if let Some(t) = from_type {
                    self.mark_cleanup(turn, t, &target)?;
                }
                self.settle(turn, None, target).await
            }

            Action::Start => self.settle(turn, None, from).await,
        }
    }

    /// Follows `enter` chains until a state rests on an `await*` event.
    async fn settle(
        &self,
        turn:     &mut Turn<'_>,
        mut from: Option<(StateId, KeyboardType)>,
        mut to:   StateId,
    ) -> Result<(), EngineError> {
        let max = self.config.max_chain_hops;

        loop {
            if turn.hops() >= max {
                tracing::error!(state = %to, max_hops = max, "transition chain exceeded bound");
                return Err(EngineError::ChainTooLong(max));
            }

            let flow = self.flows.flow(turn.mode())?;
            let next = flow.state(&to)?;

            let reentry = match &from {
                Some((id, from_type)) => {
                    self.mark_cleanup(turn, *from_type, &to)?;
                    if *id != to {
                        tracing::info!(from = %id, to = %to, "transition");
                    }
                    *id == to
                }
                None => false,
            };

            turn.session.state_id = to.clone();
            turn.begin_hop(reentry);
            let event = next.behavior.enter(turn).await;
            tracing::debug!(state = %to, event = %event, reentry, "state entered");
            turn.record(TraceKind::Enter, &to, &event, "");

            // A rest event still has to be declared for this state.
            if event.is_await() {
                if !flow.table.contains(&to, &event) {
                    tracing::error!(state = %to, event = %event, "rest event missing from transition table");
                    return Err(EngineError::InvalidTransition {
                        scope: flow.scope,
                        from:  to,
                        event,
                    });
                }
                return Ok(());
            }

            let target = flow.resolve(&to, &event, turn.session.previous_state.as_ref())?;
            from = Some((to, next.keyboard_type));
            to = target;
        }
    }

    /// Marks the pending keyboard cleanup when leaving `from_type` for `to`
    /// leaves a stale reply keyboard behind.
    fn mark_cleanup(
        &self,
        turn:      &mut Turn<'_>,
        from_type: KeyboardType,
        to:        &StateId,
    ) -> Result<(), EngineError> {
        let to_type = self.flows.flow(turn.mode())?.state(to)?.keyboard_type;
        if keyboard::decide(from_type, to_type) == CleanupAction::MarkPending {
            tracing::debug!(from = ?from_type, to = ?to_type, "keyboard cleanup pending");
            turn.session.pending_cleanup = true;
        }
        Ok(())
    }

    /// Routes a chat hit by a configuration defect to the error state.
    async fn recover(&self, session: &mut Session, trace: &mut Trace, fault: &EngineError) {
        tracing::error!(
            mode  = session.scope(),
            state = %session.state_id,
            error = %fault,
            "configuration defect, routing chat to the error state"
        );

        // A session whose mode has no flow is sent back to bootstrap.
        let flow = match self.flows.flow(session.mode) {
            Ok(flow) => flow,
            Err(_) => {
                session.mode = None;
                &self.flows.bootstrap
            }
        };

        let error_state = self.flows.error_state.clone();
        let from_type = flow.registry.get(&session.state_id).map(|e| e.keyboard_type);
        let Some(target) = flow.registry.get(&error_state) else {
            // Unreachable after load-time validation.
            session.state_id = error_state;
            return;
        };
        if let Some(from_type) = from_type {
            if keyboard::decide(from_type, target.keyboard_type) == CleanupAction::MarkPending {
                session.pending_cleanup = true;
            }
        }

        session.state_id = error_state.clone();
        session.previous_state = None;

        let mut turn = Turn::new(
            session,
            self.transport.as_ref(),
            self.content.as_ref(),
            trace,
            self.config.collaborator_timeout(),
        );
        turn.begin_hop(false);
        turn.record(TraceKind::Fault, &error_state, &Event::new("fault"), &fault.to_string());
        let event = target.behavior.enter(&mut turn).await;
        turn.record(TraceKind::Enter, &error_state, &event, "");
    }
}
