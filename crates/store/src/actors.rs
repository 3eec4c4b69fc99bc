// SPDX-License-Identifier: MIT

//! Row-level operations for Durable Object metadata: `actors`,
//! `actor_storage` (the async KV-style API), and `actor_alarms`.
//!
//! The per-instance SQL database (`ctx.storage.sql`) is a separate on-disk
//! SQLite file opened directly via `DataLayout::actor_db_path` — it is not
//! modeled here.

use crate::error::StoreResult;
use rusqlite::{params, OptionalExtension};
use serde_json::Value;

pub fn register_actor(conn: &rusqlite::Connection, class: &str, id: &str, name: Option<&str>, created_at: i64) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO actors (class, id, name, created_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(class, id) DO NOTHING",
        params![class, id, name, created_at],
    )?;
    Ok(())
}

pub fn actor_name(conn: &rusqlite::Connection, class: &str, id: &str) -> StoreResult<Option<String>> {
    Ok(conn
        .query_row("SELECT name FROM actors WHERE class = ?1 AND id = ?2", params![class, id], |r| r.get(0))
        .optional()?)
}

pub struct ActorRow {
    pub class: String,
    pub id: String,
    pub name: Option<String>,
    pub created_at: i64,
}

/// Lists registered actor instances, optionally narrowed to one class.
pub fn list_actors(conn: &rusqlite::Connection, class: Option<&str>) -> StoreResult<Vec<ActorRow>> {
    let sql = "SELECT class, id, name, created_at FROM actors WHERE ?1 IS NULL OR class = ?1 ORDER BY created_at ASC";
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![class], |r| Ok(ActorRow { class: r.get(0)?, id: r.get(1)?, name: r.get(2)?, created_at: r.get(3)? }))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_actor(conn: &rusqlite::Connection, class: &str, id: &str) -> StoreResult<Option<ActorRow>> {
    Ok(conn
        .query_row(
            "SELECT class, id, name, created_at FROM actors WHERE class = ?1 AND id = ?2",
            params![class, id],
            |r| Ok(ActorRow { class: r.get(0)?, id: r.get(1)?, name: r.get(2)?, created_at: r.get(3)? }),
        )
        .optional()?)
}

// --- storage (ctx.storage KV API) ---

pub fn storage_get(conn: &rusqlite::Connection, class: &str, id: &str, key: &str) -> StoreResult<Option<Value>> {
    let text: Option<String> = conn
        .query_row(
            "SELECT value FROM actor_storage WHERE class = ?1 AND id = ?2 AND key = ?3",
            params![class, id, key],
            |r| r.get(0),
        )
        .optional()?;
    Ok(text.map(|t| serde_json::from_str(&t)).transpose()?)
}

pub fn storage_put(conn: &rusqlite::Connection, class: &str, id: &str, key: &str, value: &Value) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO actor_storage (class, id, key, value) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(class, id, key) DO UPDATE SET value = excluded.value",
        params![class, id, key, value.to_string()],
    )?;
    Ok(())
}

pub fn storage_delete(conn: &rusqlite::Connection, class: &str, id: &str, key: &str) -> StoreResult<bool> {
    let affected = conn.execute(
        "DELETE FROM actor_storage WHERE class = ?1 AND id = ?2 AND key = ?3",
        params![class, id, key],
    )?;
    Ok(affected > 0)
}

pub fn storage_delete_all(conn: &rusqlite::Connection, class: &str, id: &str) -> StoreResult<()> {
    conn.execute("DELETE FROM actor_storage WHERE class = ?1 AND id = ?2", params![class, id])?;
    Ok(())
}

pub struct StorageRow {
    pub key: String,
    pub value: Value,
}

#[derive(Default)]
pub struct ListOpts<'a> {
    pub start: Option<&'a str>,
    pub start_after: Option<&'a str>,
    pub end: Option<&'a str>,
    pub prefix: Option<&'a str>,
    pub reverse: bool,
    pub limit: Option<u32>,
}

pub fn storage_list(conn: &rusqlite::Connection, class: &str, id: &str, opts: &ListOpts) -> StoreResult<Vec<StorageRow>> {
    let mut sql = String::from("SELECT key, value FROM actor_storage WHERE class = ?1 AND id = ?2");
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(class.to_string()), Box::new(id.to_string())];

    if let Some(prefix) = opts.prefix {
        let pattern = format!("{}%", prefix.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_"));
        sql.push_str(&format!(" AND key LIKE ?{} ESCAPE '\\'", args.len() + 1));
        args.push(Box::new(pattern));
    }
    if let Some(start) = opts.start {
        sql.push_str(&format!(" AND key >= ?{}", args.len() + 1));
        args.push(Box::new(start.to_string()));
    }
    if let Some(start_after) = opts.start_after {
        sql.push_str(&format!(" AND key > ?{}", args.len() + 1));
        args.push(Box::new(start_after.to_string()));
    }
    if let Some(end) = opts.end {
        sql.push_str(&format!(" AND key < ?{}", args.len() + 1));
        args.push(Box::new(end.to_string()));
    }
    sql.push_str(if opts.reverse { " ORDER BY key DESC" } else { " ORDER BY key ASC" });
    if let Some(limit) = opts.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::ToSql> = args.iter().map(|b| b.as_ref()).collect();
    let rows = stmt
        .query_map(param_refs.as_slice(), |r| {
            let value_text: String = r.get(1)?;
            Ok((r.get::<_, String>(0)?, value_text))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(key, value_text)| Ok(StorageRow { key, value: serde_json::from_str(&value_text)? }))
        .collect()
}

// --- alarms ---

pub fn get_alarm(conn: &rusqlite::Connection, class: &str, id: &str) -> StoreResult<Option<i64>> {
    Ok(conn
        .query_row("SELECT alarm_time FROM actor_alarms WHERE class = ?1 AND id = ?2", params![class, id], |r| r.get(0))
        .optional()?)
}

pub fn set_alarm(conn: &rusqlite::Connection, class: &str, id: &str, alarm_time: i64) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO actor_alarms (class, id, alarm_time) VALUES (?1, ?2, ?3)
         ON CONFLICT(class, id) DO UPDATE SET alarm_time = excluded.alarm_time",
        params![class, id, alarm_time],
    )?;
    Ok(())
}

pub fn delete_alarm(conn: &rusqlite::Connection, class: &str, id: &str) -> StoreResult<()> {
    conn.execute("DELETE FROM actor_alarms WHERE class = ?1 AND id = ?2", params![class, id])?;
    Ok(())
}

pub struct DueAlarm {
    pub class: String,
    pub id: String,
    pub alarm_time: i64,
}

pub fn due_alarms(conn: &rusqlite::Connection, now: i64) -> StoreResult<Vec<DueAlarm>> {
    let mut stmt = conn.prepare("SELECT class, id, alarm_time FROM actor_alarms WHERE alarm_time <= ?1")?;
    let rows = stmt
        .query_map(params![now], |r| Ok(DueAlarm { class: r.get(0)?, id: r.get(1)?, alarm_time: r.get(2)? }))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Lists every scheduled alarm, due or not (the inspector's full view, as
/// opposed to `due_alarms`, which the scheduler uses to decide what to fire).
pub fn list_alarms(conn: &rusqlite::Connection) -> StoreResult<Vec<DueAlarm>> {
    let mut stmt = conn.prepare("SELECT class, id, alarm_time FROM actor_alarms ORDER BY alarm_time ASC")?;
    let rows = stmt
        .query_map([], |r| Ok(DueAlarm { class: r.get(0)?, id: r.get(1)?, alarm_time: r.get(2)? }))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
