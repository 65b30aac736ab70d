use rusqlite::{OptionalExtension, Row, params};

use crate::database::Database;
use crate::error::{Error, Result};
use crate::models::{CreateSessionInput, Session, UsageDelta};
use crate::util::{collect_rows, generate_id, now_ms};

pub struct Sessions<'db> {
    pub(crate) db: &'db mut Database,
}

impl Sessions<'_> {
    pub fn create(&mut self, input: CreateSessionInput) -> Result<Session> {
        let now = now_ms();
        let tx = self.db.conn.transaction()?;
        let id = generate_id(&tx, "sess")?;

        tx.execute(
            "INSERT INTO sessions (
                id, parent_id, title, message_count, prompt_tokens, completion_tokens, cost,
                summary_message_id, created_at_ms, updated_at_ms
             ) VALUES (?1, ?2, ?3, 0, 0, 0, 0.0, NULL, ?4, ?4)",
            params![id, input.parent_id, input.title, now],
        )?;

        let session = tx.query_row(
            "SELECT * FROM sessions WHERE id = ?1",
            params![id],
            row_to_session,
        )?;
        tx.commit()?;
        Ok(session)
    }

    pub fn get(&self, session_id: &str) -> Result<Option<Session>> {
        self.db
            .conn
            .query_row(
                "SELECT * FROM sessions WHERE id = ?1",
                params![session_id],
                row_to_session,
            )
            .optional()
            .map_err(Error::from)
    }

    pub fn list(&self, limit: usize) -> Result<Vec<Session>> {
        let mut stmt = self
            .db
            .conn
            .prepare("SELECT * FROM sessions ORDER BY updated_at_ms DESC LIMIT ?1")?;
        let iter = stmt.query_map(params![limit as i64], row_to_session)?;
        collect_rows(iter)
    }

    pub fn set_title_if_missing(&mut self, session_id: &str, title: &str) -> Result<()> {
        let title = title.trim();
        if title.is_empty() {
            return Ok(());
        }
        let now = now_ms();
        self.db.conn.execute(
            "UPDATE sessions
             SET title = ?2, updated_at_ms = ?3
             WHERE id = ?1 AND (title IS NULL OR trim(title) = '')",
            params![session_id, title, now],
        )?;
        Ok(())
    }

    /// Add token/cost deltas to a session's running totals. Called once per
    /// completed generation stream.
    pub fn add_usage(&mut self, session_id: &str, delta: UsageDelta) -> Result<()> {
        let now = now_ms();
        let changed = self.db.conn.execute(
            "UPDATE sessions
             SET prompt_tokens = prompt_tokens + ?2,
                 completion_tokens = completion_tokens + ?3,
                 cost = cost + ?4,
                 updated_at_ms = ?5
             WHERE id = ?1",
            params![
                session_id,
                delta.prompt_tokens,
                delta.completion_tokens,
                delta.cost,
                now
            ],
        )?;
        if changed == 0 {
            return Err(Error::SessionNotFound(session_id.to_string()));
        }
        Ok(())
    }

    pub fn increment_message_count(&mut self, session_id: &str) -> Result<()> {
        let now = now_ms();
        self.db.conn.execute(
            "UPDATE sessions SET message_count = message_count + 1, updated_at_ms = ?2 WHERE id = ?1",
            params![session_id, now],
        )?;
        Ok(())
    }

    pub fn set_summary_message_id(&mut self, session_id: &str, message_id: &str) -> Result<()> {
        let now = now_ms();
        self.db.conn.execute(
            "UPDATE sessions SET summary_message_id = ?2, updated_at_ms = ?3 WHERE id = ?1",
            params![session_id, message_id, now],
        )?;
        Ok(())
    }

    /// Cascades to `messages` and `files` via `ON DELETE CASCADE`.
    pub fn delete(&mut self, session_id: &str) -> Result<()> {
        let changed = self
            .db
            .conn
            .execute("DELETE FROM sessions WHERE id = ?1", params![session_id])?;
        if changed == 0 {
            return Err(Error::SessionNotFound(session_id.to_string()));
        }
        Ok(())
    }
}

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get("id")?,
        parent_id: row.get("parent_id")?,
        title: row.get("title")?,
        message_count: row.get("message_count")?,
        prompt_tokens: row.get("prompt_tokens")?,
        completion_tokens: row.get("completion_tokens")?,
        cost: row.get("cost")?,
        summary_message_id: row.get("summary_message_id")?,
        created_at_ms: row.get("created_at_ms")?,
        updated_at_ms: row.get("updated_at_ms")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    #[test]
    fn create_and_get_round_trips() {
        let mut store = Store::open_in_memory().unwrap();
        let created = store
            .sessions()
            .create(CreateSessionInput {
                parent_id: None,
                title: Some("hello".into()),
            })
            .unwrap();
        let fetched = store.sessions().get(&created.id).unwrap().unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.title.as_deref(), Some("hello"));
        assert_eq!(fetched.message_count, 0);
    }

    #[test]
    fn add_usage_accumulates() {
        let mut store = Store::open_in_memory().unwrap();
        let session = store
            .sessions()
            .create(CreateSessionInput {
                parent_id: None,
                title: None,
            })
            .unwrap();
        store
            .sessions()
            .add_usage(
                &session.id,
                UsageDelta {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    cost: 0.01,
                },
            )
            .unwrap();
        store
            .sessions()
            .add_usage(
                &session.id,
                UsageDelta {
                    prompt_tokens: 3,
                    completion_tokens: 2,
                    cost: 0.002,
                },
            )
            .unwrap();
        let fetched = store.sessions().get(&session.id).unwrap().unwrap();
        assert_eq!(fetched.prompt_tokens, 13);
        assert_eq!(fetched.completion_tokens, 7);
        assert!((fetched.cost - 0.012).abs() < 1e-9);
    }

    #[test]
    fn delete_missing_session_errors() {
        let mut store = Store::open_in_memory().unwrap();
        let err = store.sessions().delete("sess_missing").unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(_)));
    }
}
