use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::Row;

use crate::error::Result;

pub(crate) fn generate_id(
    tx: &rusqlite::Transaction<'_>,
    prefix: &str,
) -> rusqlite::Result<String> {
    tx.query_row("SELECT lower(hex(randomblob(16)))", [], |row| {
        let suffix: String = row.get(0)?;
        Ok(format!("{prefix}_{suffix}"))
    })
}

pub(crate) fn collect_rows<T, F>(iter: rusqlite::MappedRows<'_, F>) -> Result<Vec<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut rows = Vec::new();
    for row in iter {
        rows.push(row?);
    }
    Ok(rows)
}

pub(crate) fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
