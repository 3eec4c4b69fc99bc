// SPDX-License-Identifier: MIT

//! Row-level operations for `spans` and `span_events`, and the
//! `user_errors` table recording uncaught handler exceptions.

use crate::error::StoreResult;
use rusqlite::params;
use serde_json::Value;

#[allow(clippy::too_many_arguments)]
pub fn start_span(
    conn: &rusqlite::Connection,
    span_id: &str,
    trace_id: &str,
    parent_span_id: Option<&str>,
    name: &str,
    kind: &str,
    start_time: i64,
    attributes: &Value,
) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO spans (span_id, trace_id, parent_span_id, name, kind, status, start_time, attributes)
         VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7)",
        params![span_id, trace_id, parent_span_id, name, kind, start_time, attributes.to_string()],
    )?;
    Ok(())
}

pub fn end_span(conn: &rusqlite::Connection, span_id: &str, status: &str, end_time: i64) -> StoreResult<()> {
    conn.execute(
        "UPDATE spans SET status = ?2, end_time = ?3 WHERE span_id = ?1",
        params![span_id, status, end_time],
    )?;
    Ok(())
}

pub fn add_span_event(conn: &rusqlite::Connection, span_id: &str, name: &str, time: i64, attributes: &Value) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO span_events (span_id, name, time, attributes) VALUES (?1, ?2, ?3, ?4)",
        params![span_id, name, time, attributes.to_string()],
    )?;
    Ok(())
}

pub fn record_user_error(conn: &rusqlite::Connection, id: &str, trace_id: Option<&str>, span_id: Option<&str>, message: &str, now: i64) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO user_errors (id, trace_id, span_id, message, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, trace_id, span_id, message, now],
    )?;
    Ok(())
}

pub struct SpanRow {
    pub span_id: String,
    pub trace_id: String,
    pub parent_span_id: Option<String>,
    pub name: String,
    pub kind: String,
    pub status: String,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub attributes: Value,
}

const SPAN_COLS: &str = "span_id, trace_id, parent_span_id, name, kind, status, start_time, end_time, attributes";

fn span_from_row(r: &rusqlite::Row) -> rusqlite::Result<SpanRow> {
    let attributes: String = r.get(8)?;
    Ok(SpanRow {
        span_id: r.get(0)?,
        trace_id: r.get(1)?,
        parent_span_id: r.get(2)?,
        name: r.get(3)?,
        kind: r.get(4)?,
        status: r.get(5)?,
        start_time: r.get(6)?,
        end_time: r.get(7)?,
        attributes: serde_json::from_str(&attributes).unwrap_or(Value::Null),
    })
}

/// Lists spans, optionally narrowed to one trace, most recently started first.
pub fn list_spans(conn: &rusqlite::Connection, trace_id: Option<&str>) -> StoreResult<Vec<SpanRow>> {
    let sql = format!("SELECT {SPAN_COLS} FROM spans WHERE ?1 IS NULL OR trace_id = ?1 ORDER BY start_time DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![trace_id], span_from_row)?.collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub struct SpanEventRow {
    pub span_id: String,
    pub name: String,
    pub time: i64,
    pub attributes: Value,
}

pub fn list_span_events(conn: &rusqlite::Connection, span_id: &str) -> StoreResult<Vec<SpanEventRow>> {
    let mut stmt = conn.prepare("SELECT span_id, name, time, attributes FROM span_events WHERE span_id = ?1 ORDER BY time ASC")?;
    let rows = stmt
        .query_map(params![span_id], |r| {
            let attributes: String = r.get(3)?;
            Ok(SpanEventRow { span_id: r.get(0)?, name: r.get(1)?, time: r.get(2)?, attributes: serde_json::from_str(&attributes).unwrap_or(Value::Null) })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;
    use rusqlite::Connection;

    #[test]
    fn span_lifecycle_round_trips_status() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        start_span(&conn, "s1", "t1", None, "fetch", "server", 0, &Value::Null).unwrap();
        end_span(&conn, "s1", "error", 10).unwrap();
        let status: String = conn.query_row("SELECT status FROM spans WHERE span_id = 's1'", [], |r| r.get(0)).unwrap();
        assert_eq!(status, "error");
    }
}
