// SPDX-License-Identifier: MIT

//! Row-level operations for `kv_entries`. No validation lives here — the
//! `es-bindings::kv` module enforces key/value/TTL limits before calling in.

use crate::error::StoreResult;
use rusqlite::{params, OptionalExtension};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct KvRow {
    pub key: String,
    pub value: Vec<u8>,
    pub metadata: Option<Value>,
    pub expiration: Option<i64>,
}

pub fn put(
    conn: &rusqlite::Connection,
    namespace: &str,
    key: &str,
    value: &[u8],
    metadata: Option<&Value>,
    expiration: Option<i64>,
) -> StoreResult<()> {
    let metadata_text = metadata.map(|m| m.to_string());
    conn.execute(
        "INSERT INTO kv_entries (namespace, key, value, metadata, expiration)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(namespace, key) DO UPDATE SET
            value = excluded.value,
            metadata = excluded.metadata,
            expiration = excluded.expiration",
        params![namespace, key, value, metadata_text, expiration],
    )?;
    Ok(())
}

fn row_from(key: String, value: Vec<u8>, metadata: Option<String>, expiration: Option<i64>) -> StoreResult<KvRow> {
    let metadata = metadata.map(|m| serde_json::from_str(&m)).transpose()?;
    Ok(KvRow { key, value, metadata, expiration })
}

/// Fetches a single live entry, lazily deleting it first if it has expired.
pub fn get(conn: &rusqlite::Connection, namespace: &str, key: &str, now_secs: i64) -> StoreResult<Option<KvRow>> {
    expire_if_needed(conn, namespace, key, now_secs)?;
    let row = conn
        .query_row(
            "SELECT key, value, metadata, expiration FROM kv_entries WHERE namespace = ?1 AND key = ?2",
            params![namespace, key],
            |r| Ok((r.get::<_, String>(0)?, r.get::<_, Vec<u8>>(1)?, r.get::<_, Option<String>>(2)?, r.get::<_, Option<i64>>(3)?)),
        )
        .optional()?;
    row.map(|(k, v, m, e)| row_from(k, v, m, e)).transpose()
}

fn expire_if_needed(conn: &rusqlite::Connection, namespace: &str, key: &str, now_secs: i64) -> StoreResult<()> {
    conn.execute(
        "DELETE FROM kv_entries WHERE namespace = ?1 AND key = ?2 AND expiration IS NOT NULL AND expiration <= ?3",
        params![namespace, key, now_secs],
    )?;
    Ok(())
}

pub fn delete(conn: &rusqlite::Connection, namespace: &str, key: &str) -> StoreResult<()> {
    conn.execute("DELETE FROM kv_entries WHERE namespace = ?1 AND key = ?2", params![namespace, key])?;
    Ok(())
}

/// Lists keys in lexicographic order starting strictly after `cursor` (if
/// any), matching `prefix` literally, capped at `limit` rows. Also purges
/// any expired rows it encounters along the way. Returns `(rows, more)`
/// where `more` indicates whether additional matching rows remain.
pub fn list(
    conn: &rusqlite::Connection,
    namespace: &str,
    prefix: &str,
    cursor: Option<&str>,
    limit: u32,
    now_secs: i64,
) -> StoreResult<(Vec<KvRow>, bool)> {
    conn.execute(
        "DELETE FROM kv_entries WHERE namespace = ?1 AND expiration IS NOT NULL AND expiration <= ?2",
        params![namespace, now_secs],
    )?;

    let like_pattern = format!("{}%", prefix.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_"));
    let after = cursor.unwrap_or("");

    let mut stmt = conn.prepare(
        "SELECT key, value, metadata, expiration FROM kv_entries
         WHERE namespace = ?1 AND key LIKE ?2 ESCAPE '\\' AND key > ?3
         ORDER BY key ASC LIMIT ?4",
    )?;
    let fetch_limit = limit as i64 + 1;
    let rows = stmt
        .query_map(params![namespace, like_pattern, after, fetch_limit], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, Vec<u8>>(1)?, r.get::<_, Option<String>>(2)?, r.get::<_, Option<i64>>(3)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let more = rows.len() as u32 > limit;
    let rows = rows.into_iter().take(limit as usize).map(|(k, v, m, e)| row_from(k, v, m, e)).collect::<StoreResult<Vec<_>>>()?;
    Ok((rows, more))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;
    use rusqlite::Connection;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn put_then_get_returns_latest_write() {
        let conn = conn();
        put(&conn, "ns", "a", b"1", None, None).unwrap();
        put(&conn, "ns", "a", b"2", None, None).unwrap();
        let row = get(&conn, "ns", "a", 0).unwrap().unwrap();
        assert_eq!(row.value, b"2");
    }

    #[test]
    fn expired_entry_is_invisible_and_removed() {
        let conn = conn();
        put(&conn, "ns", "a", b"1", None, Some(100)).unwrap();
        assert!(get(&conn, "ns", "a", 200).unwrap().is_none());
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM kv_entries", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn list_paginates_with_cursor() {
        let conn = conn();
        put(&conn, "ns", "a", b"1", None, None).unwrap();
        put(&conn, "ns", "b", b"2", None, None).unwrap();
        put(&conn, "ns", "c", b"3", None, None).unwrap();

        let (first, more) = list(&conn, "ns", "", None, 2, 0).unwrap();
        assert_eq!(first.iter().map(|r| r.key.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(more);

        let (second, more) = list(&conn, "ns", "", Some("b"), 2, 0).unwrap();
        assert_eq!(second.iter().map(|r| r.key.as_str()).collect::<Vec<_>>(), vec!["c"]);
        assert!(!more);
    }

    #[test]
    fn prefix_matches_literally_without_wildcard_activation() {
        let conn = conn();
        put(&conn, "ns", "a%b", b"1", None, None).unwrap();
        put(&conn, "ns", "axb", b"2", None, None).unwrap();
        let (rows, _) = list(&conn, "ns", "a%", None, 10, 0).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, "a%b");
    }
}
