use rusqlite::{OptionalExtension, Row, params};

use crate::database::Database;
use crate::error::{Error, Result};
use crate::models::File;
use crate::util::{collect_rows, generate_id, now_ms};

pub struct Files<'db> {
    pub(crate) db: &'db mut Database,
}

impl Files<'_> {
    /// Records a snapshot of `path`'s content for `session_id`. If the most
    /// recent recorded version already carries the same `content_hash` this
    /// is a no-op and the existing row is returned; otherwise a new version
    /// is appended.
    pub fn upsert(&mut self, session_id: &str, path: &str, content_hash: &str) -> Result<File> {
        let now = now_ms();
        let tx = self.db.conn.transaction()?;

        let latest = tx
            .query_row(
                "SELECT rowid, * FROM files
                 WHERE session_id = ?1 AND path = ?2
                 ORDER BY version DESC
                 LIMIT 1",
                params![session_id, path],
                row_to_file,
            )
            .optional()?;

        if let Some(latest) = &latest {
            if latest.content_hash == content_hash {
                tx.commit()?;
                return Ok(latest.clone());
            }
        }

        let next_version = latest.map(|f| f.version + 1).unwrap_or(1);
        let id = generate_id(&tx, "file")?;

        tx.execute(
            "INSERT INTO files (
                id, session_id, path, content_hash, version, created_at_ms, updated_at_ms
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![id, session_id, path, content_hash, next_version, now],
        )?;

        let file = tx.query_row(
            "SELECT rowid, * FROM files WHERE id = ?1",
            params![id],
            row_to_file,
        )?;
        tx.commit()?;
        Ok(file)
    }

    pub fn latest_for_path(&self, session_id: &str, path: &str) -> Result<Option<File>> {
        self.db
            .conn
            .query_row(
                "SELECT rowid, * FROM files
                 WHERE session_id = ?1 AND path = ?2
                 ORDER BY version DESC
                 LIMIT 1",
                params![session_id, path],
                row_to_file,
            )
            .optional()
            .map_err(Error::from)
    }

    pub fn list_for_session(&self, session_id: &str) -> Result<Vec<File>> {
        let mut stmt = self.db.conn.prepare(
            "SELECT rowid, * FROM files
             WHERE session_id = ?1
             ORDER BY created_at_ms ASC, rowid ASC",
        )?;
        let iter = stmt.query_map(params![session_id], row_to_file)?;
        collect_rows(iter)
    }
}

fn row_to_file(row: &Row<'_>) -> rusqlite::Result<File> {
    Ok(File {
        id: row.get("id")?,
        session_id: row.get("session_id")?,
        path: row.get("path")?,
        content_hash: row.get("content_hash")?,
        version: row.get("version")?,
        created_at_ms: row.get("created_at_ms")?,
        updated_at_ms: row.get("updated_at_ms")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateSessionInput;
    use crate::store::Store;

    #[test]
    fn upsert_bumps_version_only_on_hash_change() {
        let mut store = Store::open_in_memory().unwrap();
        let session_id = store
            .sessions()
            .create(CreateSessionInput {
                parent_id: None,
                title: None,
            })
            .unwrap()
            .id;

        let v1 = store.files().upsert(&session_id, "src/main.rs", "hash-a").unwrap();
        assert_eq!(v1.version, 1);

        let same = store.files().upsert(&session_id, "src/main.rs", "hash-a").unwrap();
        assert_eq!(same.version, 1);
        assert_eq!(same.id, v1.id);

        let v2 = store.files().upsert(&session_id, "src/main.rs", "hash-b").unwrap();
        assert_eq!(v2.version, 2);

        let history = store.files().list_for_session(&session_id).unwrap();
        assert_eq!(history.len(), 2);
    }
}
