use crate::session::{Context, Session};
use crate::types::{ChatId, Mode, StateId};
use async_trait::async_trait;
use std::collections::HashMap;

/// Durable home of sessions.
///
/// `save` must be atomic per chat: a reader never observes a `state_id`
/// without its matching `context`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the session of a chat, `None` for a chat never seen before.
    async fn load(&self, chat_id: ChatId) -> Result<Option<Session>, String>;

    /// Replace the stored session of `session.chat_id`.
    async fn save(&self, session: &Session) -> Result<(), String>;
}

/// A simple in-memory store for tests and short-lived bots.
pub struct MemorySessionStore {
    sessions: std::sync::Mutex<HashMap<ChatId, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: std::sync::Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, chat_id: ChatId) -> Result<Option<Session>, String> {
        let store = self.sessions.lock().map_err(|e| e.to_string())?;
        Ok(store.get(&chat_id).cloned())
    }

    async fn save(&self, session: &Session) -> Result<(), String> {
        let mut store = self.sessions.lock().map_err(|e| e.to_string())?;
        store.insert(session.chat_id, session.clone());
        Ok(())
    }
}

/// A session store backed by a SQLite database, one row per chat.
pub struct SqliteSessionStore {
    path: std::path::PathBuf,
}

impl SqliteSessionStore {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Result<Self, String> {
        let path = path.into();
        let conn = rusqlite::Connection::open(&path).map_err(|e| e.to_string())?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS sessions (
                chat_id         INTEGER PRIMARY KEY,
                mode            TEXT,
                state_id        TEXT NOT NULL,
                previous_state  TEXT,
                context         TEXT NOT NULL,
                pending_cleanup INTEGER NOT NULL DEFAULT 0,
                updated_at      TEXT NOT NULL
            )",
            [],
        ).map_err(|e| e.to_string())?;
        Ok(Self { path })
    }

    fn get_conn(&self) -> Result<rusqlite::Connection, String> {
        rusqlite::Connection::open(&self.path).map_err(|e| e.to_string())
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn load(&self, chat_id: ChatId) -> Result<Option<Session>, String> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT mode, state_id, previous_state, context, pending_cleanup, updated_at
             FROM sessions WHERE chat_id = ?1"
        ).map_err(|e| e.to_string())?;

        let mut rows = stmt.query(rusqlite::params![chat_id]).map_err(|e| e.to_string())?;
        let Some(row) = rows.next().map_err(|e| e.to_string())? else {
            return Ok(None);
        };

        let mode: Option<String>     = row.get(0).map_err(|e| e.to_string())?;
        let state_id: String         = row.get(1).map_err(|e| e.to_string())?;
        let previous: Option<String> = row.get(2).map_err(|e| e.to_string())?;
        let context_json: String     = row.get(3).map_err(|e| e.to_string())?;
        let pending_cleanup: bool    = row.get(4).map_err(|e| e.to_string())?;
        let updated_at: String       = row.get(5).map_err(|e| e.to_string())?;

        let mode = mode.map(|m| m.parse::<Mode>()).transpose()?;
        let context: Context = serde_json::from_str(&context_json).map_err(|e| e.to_string())?;

        Ok(Some(Session {
            chat_id,
            mode,
            state_id:       StateId::new(state_id),
            previous_state: previous.map(StateId::new),
            context,
            pending_cleanup,
            updated_at:     chrono::DateTime::parse_from_rfc3339(&updated_at)
                                .map_err(|e| e.to_string())?.with_timezone(&chrono::Utc),
        }))
    }

    async fn save(&self, session: &Session) -> Result<(), String> {
        let conn = self.get_conn()?;
        let context_json = serde_json::to_string(&session.context).map_err(|e| e.to_string())?;

        // Single upsert: the row changes as a whole or not at all.
        conn.execute(
            "INSERT INTO sessions (chat_id, mode, state_id, previous_state, context, pending_cleanup, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(chat_id) DO UPDATE SET
                mode            = excluded.mode,
                state_id        = excluded.state_id,
                previous_state  = excluded.previous_state,
                context         = excluded.context,
                pending_cleanup = excluded.pending_cleanup,
                updated_at      = excluded.updated_at",
            rusqlite::params![
                session.chat_id,
                session.mode.map(|m| m.as_str()),
                session.state_id.as_str(),
                session.previous_state.as_ref().map(|s| s.as_str()),
                context_json,
                session.pending_cleanup,
                session.updated_at.to_rfc3339(),
            ],
        ).map_err(|e| e.to_string())?;
        Ok(())
    }
}
