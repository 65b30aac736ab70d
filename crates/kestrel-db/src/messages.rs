use rusqlite::{OptionalExtension, Row, params};

use crate::database::Database;
use crate::error::{Error, Result};
use crate::models::{CreateMessageInput, Message, Part, Role};
use crate::util::{collect_rows, generate_id, now_ms};

pub struct Messages<'db> {
    pub(crate) db: &'db mut Database,
}

impl Messages<'_> {
    pub fn create(&mut self, input: CreateMessageInput) -> Result<Message> {
        let now = now_ms();
        let tx = self.db.conn.transaction()?;
        let id = generate_id(&tx, "msg")?;
        let parts_json = serde_json::to_string(&input.parts)?;

        tx.execute(
            "INSERT INTO messages (
                id, session_id, role, parts_json, model, provider, created_at_ms, updated_at_ms
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                id,
                input.session_id,
                input.role.as_str(),
                parts_json,
                input.model,
                input.provider,
                now
            ],
        )?;

        let message = tx.query_row(
            "SELECT rowid, * FROM messages WHERE id = ?1",
            params![id],
            row_to_message,
        )?;
        tx.commit()?;
        Ok(message)
    }

    pub fn get(&self, message_id: &str) -> Result<Option<Message>> {
        self.db
            .conn
            .query_row(
                "SELECT rowid, * FROM messages WHERE id = ?1",
                params![message_id],
                row_to_message,
            )
            .optional()
            .map_err(Error::from)
    }

    pub fn list_for_session(&self, session_id: &str, limit: usize) -> Result<Vec<Message>> {
        let mut stmt = self.db.conn.prepare(
            "SELECT rowid, * FROM messages
             WHERE session_id = ?1
             ORDER BY created_at_ms ASC, rowid ASC
             LIMIT ?2",
        )?;
        let iter = stmt.query_map(params![session_id, limit as i64], row_to_message)?;
        collect_rows(iter)
    }

    /// Appends one streamed part to an in-progress message. Errors if the
    /// message already carries a [`Part::Finish`] — once finished, a
    /// message's parts are immutable.
    pub fn append_part(&mut self, message_id: &str, part: Part) -> Result<Message> {
        let tx = self.db.conn.transaction()?;
        let (parts_json,): (String,) = tx
            .query_row(
                "SELECT parts_json FROM messages WHERE id = ?1",
                params![message_id],
                |row| Ok((row.get(0)?,)),
            )
            .optional()?
            .ok_or_else(|| Error::MessageNotFound(message_id.to_string()))?;

        let mut parts: Vec<Part> = serde_json::from_str(&parts_json)?;
        if parts.iter().any(Part::is_finish) {
            return Err(Error::MessageAlreadyFinished(message_id.to_string()));
        }
        parts.push(part);

        let now = now_ms();
        let updated_json = serde_json::to_string(&parts)?;
        tx.execute(
            "UPDATE messages SET parts_json = ?2, updated_at_ms = ?3 WHERE id = ?1",
            params![message_id, updated_json, now],
        )?;

        let message = tx.query_row(
            "SELECT rowid, * FROM messages WHERE id = ?1",
            params![message_id],
            row_to_message,
        )?;
        tx.commit()?;
        Ok(message)
    }

    /// Replaces the last part in-place, for updating an in-flight streaming
    /// part (e.g. growing `Reasoning::thinking` or `Text::content`) without
    /// appending a new entry.
    pub fn replace_last_part(&mut self, message_id: &str, part: Part) -> Result<Message> {
        let tx = self.db.conn.transaction()?;
        let (parts_json,): (String,) = tx
            .query_row(
                "SELECT parts_json FROM messages WHERE id = ?1",
                params![message_id],
                |row| Ok((row.get(0)?,)),
            )
            .optional()?
            .ok_or_else(|| Error::MessageNotFound(message_id.to_string()))?;

        let mut parts: Vec<Part> = serde_json::from_str(&parts_json)?;
        if parts.iter().rev().skip(1).any(Part::is_finish) {
            return Err(Error::MessageAlreadyFinished(message_id.to_string()));
        }
        if parts.is_empty() {
            parts.push(part);
        } else {
            let last = parts.len() - 1;
            parts[last] = part;
        }

        let now = now_ms();
        let updated_json = serde_json::to_string(&parts)?;
        tx.execute(
            "UPDATE messages SET parts_json = ?2, updated_at_ms = ?3 WHERE id = ?1",
            params![message_id, updated_json, now],
        )?;

        let message = tx.query_row(
            "SELECT rowid, * FROM messages WHERE id = ?1",
            params![message_id],
            row_to_message,
        )?;
        tx.commit()?;
        Ok(message)
    }
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    let role: String = row.get("role")?;
    let parts_json: String = row.get("parts_json")?;
    let parts: Vec<Part> = serde_json::from_str(&parts_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Message {
        id: row.get("id")?,
        session_id: row.get("session_id")?,
        role: Role::parse(&role).unwrap_or(Role::User),
        parts,
        model: row.get("model")?,
        provider: row.get("provider")?,
        created_at_ms: row.get("created_at_ms")?,
        updated_at_ms: row.get("updated_at_ms")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateSessionInput, FinishReason};
    use crate::store::Store;

    fn new_session(store: &mut Store) -> String {
        store
            .sessions()
            .create(CreateSessionInput {
                parent_id: None,
                title: None,
            })
            .unwrap()
            .id
    }

    #[test]
    fn append_part_then_finish_locks_message() {
        let mut store = Store::open_in_memory().unwrap();
        let session_id = new_session(&mut store);
        let created = store
            .messages()
            .create(CreateMessageInput {
                session_id: session_id.clone(),
                role: Role::Assistant,
                parts: vec![],
                model: Some("gpt-5".into()),
                provider: Some("openai".into()),
            })
            .unwrap();

        store
            .messages()
            .append_part(
                &created.id,
                Part::Text {
                    content: "hi".into(),
                },
            )
            .unwrap();

        let finished = store
            .messages()
            .append_part(
                &created.id,
                Part::Finish {
                    reason: FinishReason::EndTurn,
                    time_ms: 0,
                    message: None,
                    details: None,
                },
            )
            .unwrap();
        assert!(finished.is_finished());

        let err = store
            .messages()
            .append_part(
                &created.id,
                Part::Text {
                    content: "too late".into(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::MessageAlreadyFinished(_)));
    }

    #[test]
    fn list_for_session_preserves_insertion_order() {
        let mut store = Store::open_in_memory().unwrap();
        let session_id = new_session(&mut store);
        for i in 0..3 {
            store
                .messages()
                .create(CreateMessageInput {
                    session_id: session_id.clone(),
                    role: Role::User,
                    parts: vec![Part::Text {
                        content: format!("msg {i}"),
                    }],
                    model: None,
                    provider: None,
                })
                .unwrap();
        }
        let messages = store.messages().list_for_session(&session_id, 10).unwrap();
        assert_eq!(messages.len(), 3);
        for (i, message) in messages.iter().enumerate() {
            match &message.parts[0] {
                Part::Text { content } => assert_eq!(content, &format!("msg {i}")),
                _ => panic!("expected text part"),
            }
        }
    }
}
