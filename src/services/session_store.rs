//! SQLite-backed session persistence.
//!
//! Conversation history is append-only: turns are inserted monotonically and
//! never edited or deleted individually. Idle sessions are archived rather
//! than deleted; appending to an archived session reactivates it. Prompt
//! windowing happens at read time and never truncates what is stored.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

use crate::error::SessionError;
use crate::models::{Role, Session, Turn};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    created_at TEXT NOT NULL,
    last_active_at TEXT NOT NULL,
    archived INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS turns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS turns_session_idx ON turns(session_id, id);
"#;

/// Listing row for `session list`.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub id: String,
    pub created_at: String,
    pub last_active_at: String,
    pub turn_count: u64,
    pub archived: bool,
}

pub struct SessionStore {
    conn: Mutex<Connection>,
}

impl SessionStore {
    pub fn open(path: &Path) -> Result<Self, SessionError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SessionError::Path(format!("{}: {}", parent.display(), e)))?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, SessionError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, SessionError> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "busy_timeout", "5000")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SessionError> {
        self.conn.lock().map_err(|_| SessionError::LockPoisoned)
    }

    /// Fresh random session id.
    pub fn new_session_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Append one turn, creating or reactivating the session as needed.
    pub fn append_turn(&self, session_id: &str, turn: &Turn) -> Result<(), SessionError> {
        let conn = self.lock()?;
        let now = chrono::Utc::now().to_rfc3339();

        conn.execute(
            "INSERT INTO sessions (id, created_at, last_active_at) VALUES (?1, ?2, ?2)
             ON CONFLICT(id) DO UPDATE SET last_active_at = ?2, archived = 0",
            params![session_id, now],
        )?;
        conn.execute(
            "INSERT INTO turns (session_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![session_id, turn.role.to_string(), turn.content, turn.created_at],
        )?;

        Ok(())
    }

    /// Ordered turns of a session. Missing sessions read as empty history so
    /// a first question can open a session implicitly.
    pub fn turns(&self, session_id: &str) -> Result<Vec<Turn>, SessionError> {
        let conn = self.lock()?;
        Self::turns_locked(&conn, session_id)
    }

    fn turns_locked(conn: &Connection, session_id: &str) -> Result<Vec<Turn>, SessionError> {
        let mut stmt = conn.prepare(
            "SELECT role, content, created_at FROM turns WHERE session_id = ?1 ORDER BY id",
        )?;

        let rows = stmt.query_map(params![session_id], |row| {
            let role: String = row.get(0)?;
            let role = role.parse::<Role>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, e.into())
            })?;
            Ok(Turn {
                role,
                content: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;

        let mut turns = Vec::new();
        for row in rows {
            turns.push(row?);
        }
        Ok(turns)
    }

    /// Load a full session or fail with [`SessionError::UnknownSession`].
    pub fn load(&self, session_id: &str) -> Result<Session, SessionError> {
        let conn = self.lock()?;

        let header = conn
            .query_row(
                "SELECT created_at, last_active_at, archived FROM sessions WHERE id = ?1",
                params![session_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, bool>(2)?,
                    ))
                },
            )
            .optional()?
            .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))?;

        let turns = Self::turns_locked(&conn, session_id)?;

        Ok(Session {
            id: session_id.to_string(),
            turns,
            created_at: header.0,
            last_active_at: header.1,
            archived: header.2,
        })
    }

    pub fn list(&self) -> Result<Vec<SessionSummary>, SessionError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT s.id, s.created_at, s.last_active_at, s.archived,
                    (SELECT COUNT(*) FROM turns t WHERE t.session_id = s.id)
             FROM sessions s
             ORDER BY s.last_active_at DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(SessionSummary {
                id: row.get(0)?,
                created_at: row.get(1)?,
                last_active_at: row.get(2)?,
                archived: row.get(3)?,
                turn_count: row.get::<_, i64>(4)? as u64,
            })
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?);
        }
        Ok(summaries)
    }

    pub fn delete(&self, session_id: &str) -> Result<(), SessionError> {
        let conn = self.lock()?;
        let affected = conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id])?;
        if affected == 0 {
            return Err(SessionError::UnknownSession(session_id.to_string()));
        }
        Ok(())
    }

    /// Archive sessions idle longer than `max_idle`. Returns how many.
    pub fn archive_idle(&self, max_idle: Duration) -> Result<usize, SessionError> {
        let conn = self.lock()?;
        let cutoff = (chrono::Utc::now()
            - chrono::Duration::from_std(max_idle).unwrap_or(chrono::Duration::zero()))
        .to_rfc3339();

        let archived = conn.execute(
            "UPDATE sessions SET archived = 1 WHERE archived = 0 AND last_active_at < ?1",
            params![cutoff],
        )?;

        if archived > 0 {
            info!(count = archived, "archived idle sessions");
        }
        Ok(archived)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_load_round_trip() {
        let store = SessionStore::open_in_memory().unwrap();
        let id = SessionStore::new_session_id();

        store.append_turn(&id, &Turn::user("hello")).unwrap();
        store.append_turn(&id, &Turn::assistant("hi there")).unwrap();

        let session = store.load(&id).unwrap();
        assert_eq!(session.turns.len(), 2);
        assert_eq!(session.turns[0].role, Role::User);
        assert_eq!(session.turns[0].content, "hello");
        assert_eq!(session.turns[1].role, Role::Assistant);
        assert!(!session.archived);
    }

    #[test]
    fn history_order_is_append_order() {
        let store = SessionStore::open_in_memory().unwrap();
        for i in 0..5 {
            store
                .append_turn("s1", &Turn::user(format!("msg {}", i)))
                .unwrap();
        }

        let turns = store.turns("s1").unwrap();
        let contents: Vec<&str> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, ["msg 0", "msg 1", "msg 2", "msg 3", "msg 4"]);
    }

    #[test]
    fn missing_session_reads_empty_but_load_fails() {
        let store = SessionStore::open_in_memory().unwrap();
        assert!(store.turns("nope").unwrap().is_empty());
        assert!(matches!(
            store.load("nope"),
            Err(SessionError::UnknownSession(_))
        ));
    }

    #[test]
    fn sessions_are_isolated() {
        let store = SessionStore::open_in_memory().unwrap();
        store.append_turn("a", &Turn::user("for a")).unwrap();
        store.append_turn("b", &Turn::user("for b")).unwrap();

        assert_eq!(store.turns("a").unwrap().len(), 1);
        assert_eq!(store.turns("b").unwrap().len(), 1);
        assert_eq!(store.turns("a").unwrap()[0].content, "for a");
    }

    #[test]
    fn delete_removes_session_and_turns() {
        let store = SessionStore::open_in_memory().unwrap();
        store.append_turn("gone", &Turn::user("x")).unwrap();
        store.delete("gone").unwrap();

        assert!(store.turns("gone").unwrap().is_empty());
        assert!(matches!(
            store.delete("gone"),
            Err(SessionError::UnknownSession(_))
        ));
    }

    #[test]
    fn corrupt_role_column_is_an_error_not_a_user_turn() {
        let store = SessionStore::open_in_memory().unwrap();
        store.append_turn("s", &Turn::assistant("fine")).unwrap();

        {
            let conn = store.conn.lock().unwrap();
            conn.execute("UPDATE turns SET role = 'wizard'", []).unwrap();
        }

        assert!(matches!(
            store.turns("s"),
            Err(SessionError::Database(_))
        ));
    }

    #[test]
    fn archive_then_append_reactivates() {
        let store = SessionStore::open_in_memory().unwrap();
        store.append_turn("idle", &Turn::user("old")).unwrap();

        // Zero idle threshold archives everything active
        let archived = store.archive_idle(Duration::ZERO).unwrap();
        assert_eq!(archived, 1);
        assert!(store.load("idle").unwrap().archived);

        store.append_turn("idle", &Turn::user("back")).unwrap();
        assert!(!store.load("idle").unwrap().archived);
    }

    #[test]
    fn list_counts_turns() {
        let store = SessionStore::open_in_memory().unwrap();
        store.append_turn("s", &Turn::user("one")).unwrap();
        store.append_turn("s", &Turn::assistant("two")).unwrap();

        let summaries = store.list().unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].turn_count, 2);
    }
}
