use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Stable identity of a chat (one session per chat).
pub type ChatId = i64;

/// A named node in a flow's state machine.
///
/// States are identified by their dotted string id. The ids used by the
/// bundled program are exposed as constructors, but any id declared in the
/// flow configuration is valid.
///
/// ```
/// use coachsm::StateId;
/// let notes = StateId::new("utility.notes");
/// assert_eq!(notes.as_str(), "utility.notes");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateId(pub String);

impl StateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    // ── Well-known state ids of the bundled program ─────────────────────
    pub fn mode_select()       -> Self { Self::new("common.mode_select") }
    pub fn error()             -> Self { Self::new("common.error") }
    pub fn progress()          -> Self { Self::new("utility.progress") }
    pub fn marathon_lesson()   -> Self { Self::new("workshop.marathon.lesson") }
    pub fn marathon_question() -> Self { Self::new("workshop.marathon.question") }
    pub fn marathon_task()     -> Self { Self::new("workshop.marathon.task") }
    pub fn feed_topics()       -> Self { Self::new("feed.topics") }
    pub fn feed_digest()       -> Self { Self::new("feed.digest") }
}

impl std::fmt::Display for StateId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StateId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A top-level program variant with its own transition table and entry state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Fixed-length guided program: lesson → question → task, day by day.
    Marathon,
    /// Flexible digest-based track over user-chosen topics.
    Feed,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Marathon, Mode::Feed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Marathon => "marathon",
            Mode::Feed     => "feed",
        }
    }

    /// Button label shown by the mode picker.
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Marathon => "📚 Marathon",
            Mode::Feed     => "📖 Feed",
        }
    }

    /// Finds a mode named as a whole word in free text ("📚 Marathon",
    /// "feed please"). "feedback" names no mode.
    pub fn mentioned_in(text: &str) -> Option<Mode> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .find_map(|word| word.parse().ok())
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "marathon" => Ok(Mode::Marathon),
            "feed"     => Ok(Mode::Feed),
            other      => Err(format!("unknown mode '{}'", other)),
        }
    }
}

/// Which family of input affordance a state renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyboardType {
    /// Per-message buttons attached to one outbound message.
    Inline,
    /// Persistent custom on-screen keyboard.
    Reply,
    /// The state renders no affordance.
    None,
}

/// A raw inbound update, already resolved to its chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Inbound {
    /// Free text typed by the user (including reply-keyboard presses).
    Text(String),
    /// Inline button press carrying its callback data.
    Callback(String),
    /// Global command token, e.g. `/progress` → `{ name: "progress", args: "" }`.
    Command { name: String, args: String },
}

impl Inbound {
    /// Classifies a raw message text. `/cmd@botname args` becomes a command,
    /// everything else stays text.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Some(rest) = trimmed.strip_prefix('/') {
            let (head, args) = match rest.split_once(char::is_whitespace) {
                Some((head, args)) => (head, args.trim()),
                None               => (rest, ""),
            };
            let name = head.split('@').next().unwrap_or(head);
            if !name.is_empty() {
                return Inbound::Command {
                    name: name.to_lowercase(),
                    args: args.to_string(),
                };
            }
        }
        Inbound::Text(trimmed.to_string())
    }

    pub fn command(name: impl Into<String>) -> Self {
        Inbound::Command { name: name.into(), args: String::new() }
    }

    /// Typed text, if this is a text update.
    pub fn text(&self) -> Option<&str> {
        match self {
            Inbound::Text(t) => Some(t.trim()),
            _ => None,
        }
    }

    /// True when the update is the callback `token` or text equal to it
    /// (case-insensitive), so a state accepts both a button press and a
    /// typed answer for the same action.
    pub fn is(&self, token: &str) -> bool {
        match self {
            Inbound::Callback(data) => data == token,
            Inbound::Text(text)     => text.trim().eq_ignore_ascii_case(token),
            Inbound::Command { .. } => false,
        }
    }

    /// Explicit mode-selection input: `/mode <name>` or callback `mode:<name>`.
    pub fn explicit_mode(&self) -> Option<Mode> {
        match self {
            Inbound::Command { name, args } if name == "mode" => args.parse().ok(),
            Inbound::Callback(data) => data.strip_prefix("mode:").and_then(|m| m.parse().ok()),
            _ => None,
        }
    }
}
