use serde::{Deserialize, Serialize};

/// A symbolic outcome returned by a state's `enter` or `handle`, used to
/// look up the next state in the active flow's transition table.
///
/// Two naming conventions carry meaning for the engine:
/// - `invalid_input` is reserved for input a state does not recognise.
///   Flows route it back to the same state, which re-prompts.
/// - Events whose name starts with `await` are rest events. Returned from
///   `enter`, they end the cycle with the session resting in that state.
///
/// ```
/// use coachsm::Event;
/// assert!(Event::new("await_answer").is_await());
/// assert!(!Event::new("advance").is_await());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Event(pub String);

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for rest events (`await`, `await_input`, `await_answer`, …).
    pub fn is_await(&self) -> bool {
        self.0.starts_with("await")
    }

    pub fn is_invalid_input(&self) -> bool {
        self.0 == "invalid_input"
    }

    // ── Reserved ────────────────────────────────────────────────────────
    pub fn invalid_input()     -> Self { Self::new("invalid_input") }
    pub fn await_input()       -> Self { Self::new("await_input") }

    /// Marker recorded in the cycle trace for bypass transitions.
    pub fn go_to()             -> Self { Self::new("go_to") }

    // ── Common states ───────────────────────────────────────────────────
    pub fn await_choice()      -> Self { Self::new("await_choice") }
    pub fn restart()           -> Self { Self::new("restart") }
    pub fn r#continue()        -> Self { Self::new("continue") }
    pub fn back()              -> Self { Self::new("back") }

    // ── Marathon ────────────────────────────────────────────────────────
    pub fn await_ready()       -> Self { Self::new("await_ready") }
    pub fn go_to_question()    -> Self { Self::new("go_to_question") }
    pub fn marathon_complete() -> Self { Self::new("marathon_complete") }
    pub fn await_answer()      -> Self { Self::new("await_answer") }
    pub fn advance()           -> Self { Self::new("advance") }
    pub fn skip()              -> Self { Self::new("skip") }
    pub fn await_submission()  -> Self { Self::new("await_submission") }
    pub fn submitted()         -> Self { Self::new("submitted") }

    // ── Feed ────────────────────────────────────────────────────────────
    pub fn await_topic()       -> Self { Self::new("await_topic") }
    pub fn topics_selected()   -> Self { Self::new("topics_selected") }
    pub fn more()              -> Self { Self::new("more") }
    pub fn change_topics()     -> Self { Self::new("change_topics") }
    pub fn no_topic()          -> Self { Self::new("no_topic") }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Event {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
