// SPDX-License-Identifier: MIT

//! Row-level operations for `cache_entries`.

use crate::error::StoreResult;
use rusqlite::{params, OptionalExtension};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct CacheRow {
    pub status: u16,
    pub headers: Value,
    pub body: Vec<u8>,
    pub expires_at: Option<i64>,
}

#[allow(clippy::too_many_arguments)]
pub fn put(
    conn: &rusqlite::Connection,
    cache_name: &str,
    url: &str,
    status: u16,
    headers: &Value,
    body: &[u8],
    expires_at: Option<i64>,
) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO cache_entries (cache_name, url, status, headers, body, expires_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(cache_name, url) DO UPDATE SET
            status = excluded.status, headers = excluded.headers, body = excluded.body, expires_at = excluded.expires_at",
        params![cache_name, url, status, headers.to_string(), body, expires_at],
    )?;
    Ok(())
}

/// Fetches a live entry, lazily deleting it first if it has expired.
pub fn get(conn: &rusqlite::Connection, cache_name: &str, url: &str, now_secs: i64) -> StoreResult<Option<CacheRow>> {
    conn.execute(
        "DELETE FROM cache_entries WHERE cache_name = ?1 AND url = ?2 AND expires_at IS NOT NULL AND expires_at <= ?3",
        params![cache_name, url, now_secs],
    )?;
    let row = conn
        .query_row(
            "SELECT status, headers, body, expires_at FROM cache_entries WHERE cache_name = ?1 AND url = ?2",
            params![cache_name, url],
            |r| {
                let headers: String = r.get(1)?;
                Ok(CacheRow {
                    status: r.get(0)?,
                    headers: serde_json::from_str(&headers).unwrap_or(Value::Null),
                    body: r.get(2)?,
                    expires_at: r.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

pub fn delete(conn: &rusqlite::Connection, cache_name: &str, url: &str) -> StoreResult<bool> {
    let affected = conn.execute("DELETE FROM cache_entries WHERE cache_name = ?1 AND url = ?2", params![cache_name, url])?;
    Ok(affected > 0)
}

pub struct CacheEntryRow {
    pub url: String,
    pub status: u16,
    pub size: u64,
    pub expires_at: Option<i64>,
}

pub fn list_entries(conn: &rusqlite::Connection, cache_name: &str) -> StoreResult<Vec<CacheEntryRow>> {
    let mut stmt = conn.prepare("SELECT url, status, length(body), expires_at FROM cache_entries WHERE cache_name = ?1 ORDER BY url ASC")?;
    let rows = stmt
        .query_map(params![cache_name], |r| {
            Ok(CacheEntryRow { url: r.get(0)?, status: r.get(1)?, size: r.get::<_, i64>(2)? as u64, expires_at: r.get(3)? })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
