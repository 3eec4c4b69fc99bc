// SPDX-License-Identifier: MIT

//! Row-level operations for `queue_messages`.

use crate::error::StoreResult;
use rusqlite::params;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    Pending,
    Acked,
    Failed,
}

impl MessageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Acked => "acked",
            MessageStatus::Failed => "failed",
        }
    }

    fn from_str(s: &str) -> Self {
        match s {
            "acked" => MessageStatus::Acked,
            "failed" => MessageStatus::Failed,
            _ => MessageStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueueMessageRow {
    pub id: String,
    pub queue: String,
    pub body: Vec<u8>,
    pub content_type: String,
    pub status: MessageStatus,
    /// 1-based delivery count: the first delivery observes `attempts == 1`.
    pub attempts: u32,
    pub visible_at: i64,
    pub created_at: i64,
}

#[allow(clippy::too_many_arguments)]
pub fn enqueue(
    conn: &rusqlite::Connection,
    queue: &str,
    id: &str,
    body: &[u8],
    content_type: &str,
    visible_at: i64,
    created_at: i64,
) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO queue_messages (queue, id, body, content_type, status, attempts, visible_at, created_at)
         VALUES (?1, ?2, ?3, ?4, 'pending', 1, ?5, ?6)",
        params![queue, id, body, content_type, visible_at, created_at],
    )?;
    Ok(())
}

fn from_row(r: &rusqlite::Row) -> rusqlite::Result<QueueMessageRow> {
    let status: String = r.get(4)?;
    Ok(QueueMessageRow {
        id: r.get(0)?,
        queue: r.get(1)?,
        body: r.get(2)?,
        content_type: r.get(3)?,
        status: MessageStatus::from_str(&status),
        attempts: r.get::<_, i64>(5)? as u32,
        visible_at: r.get(6)?,
        created_at: r.get(7)?,
    })
}

const SELECT_COLS: &str = "id, queue, body, content_type, status, attempts, visible_at, created_at";

/// Selects up to `limit` pending, currently-visible messages in FIFO order.
pub fn poll_visible(conn: &rusqlite::Connection, queue: &str, now: i64, limit: u32) -> StoreResult<Vec<QueueMessageRow>> {
    let sql = format!(
        "SELECT {SELECT_COLS} FROM queue_messages
         WHERE queue = ?1 AND status = 'pending' AND visible_at <= ?2
         ORDER BY created_at ASC LIMIT ?3"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![queue, now, limit], from_row)?.collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn ack(conn: &rusqlite::Connection, id: &str, completed_at: i64) -> StoreResult<()> {
    conn.execute(
        "UPDATE queue_messages SET status = 'acked', completed_at = ?2 WHERE id = ?1",
        params![id, completed_at],
    )?;
    Ok(())
}

pub fn retry(conn: &rusqlite::Connection, id: &str, new_visible_at: i64) -> StoreResult<()> {
    conn.execute(
        "UPDATE queue_messages SET attempts = attempts + 1, visible_at = ?2 WHERE id = ?1",
        params![id, new_visible_at],
    )?;
    Ok(())
}

pub fn mark_failed(conn: &rusqlite::Connection, id: &str) -> StoreResult<()> {
    conn.execute("UPDATE queue_messages SET status = 'failed' WHERE id = ?1", params![id])?;
    Ok(())
}

pub fn delete(conn: &rusqlite::Connection, id: &str) -> StoreResult<()> {
    conn.execute("DELETE FROM queue_messages WHERE id = ?1", params![id])?;
    Ok(())
}

pub fn get(conn: &rusqlite::Connection, id: &str) -> StoreResult<Option<QueueMessageRow>> {
    use rusqlite::OptionalExtension;
    let sql = format!("SELECT {SELECT_COLS} FROM queue_messages WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], from_row).optional()?)
}

/// Lists messages in `queue`, most recent first, optionally narrowed to one
/// status. Used by the inspector, which wants the full history rather than
/// just what's currently pollable.
pub fn list_messages(conn: &rusqlite::Connection, queue: &str, status: Option<MessageStatus>) -> StoreResult<Vec<QueueMessageRow>> {
    let sql = format!(
        "SELECT {SELECT_COLS} FROM queue_messages WHERE queue = ?1 AND (?2 IS NULL OR status = ?2) ORDER BY created_at DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![queue, status.map(MessageStatus::as_str)], from_row)?.collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn count_by_status(conn: &rusqlite::Connection, queue: &str, status: MessageStatus) -> StoreResult<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM queue_messages WHERE queue = ?1 AND status = ?2",
        params![queue, status.as_str()],
        |r| r.get(0),
    )?;
    Ok(count as usize)
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
    fn message_not_visible_before_delay_elapses() {
        let conn = conn();
        enqueue(&conn, "q", "m1", b"hi", "text", 100, 0).unwrap();
        assert!(poll_visible(&conn, "q", 50, 10).unwrap().is_empty());
        assert_eq!(poll_visible(&conn, "q", 100, 10).unwrap().len(), 1);
    }

    #[test]
    fn retry_increments_attempts_and_reschedules() {
        let conn = conn();
        enqueue(&conn, "q", "m1", b"hi", "text", 0, 0).unwrap();
        retry(&conn, "m1", 10).unwrap();
        let row = get(&conn, "m1").unwrap().unwrap();
        assert_eq!(row.attempts, 2);
        assert_eq!(row.visible_at, 10);
    }

    #[test]
    fn first_delivery_reports_attempts_one() {
        let conn = conn();
        enqueue(&conn, "q", "m1", b"hi", "text", 0, 0).unwrap();
        let row = get(&conn, "m1").unwrap().unwrap();
        assert_eq!(row.attempts, 1);
    }

    #[test]
    fn count_by_status_reflects_acks_and_failures() {
        let conn = conn();
        enqueue(&conn, "q", "m1", b"hi", "text", 0, 0).unwrap();
        enqueue(&conn, "q", "m2", b"hi", "text", 0, 0).unwrap();
        ack(&conn, "m1", 0).unwrap();
        mark_failed(&conn, "m2").unwrap();
        assert_eq!(count_by_status(&conn, "q", MessageStatus::Acked).unwrap(), 1);
        assert_eq!(count_by_status(&conn, "q", MessageStatus::Failed).unwrap(), 1);
        assert_eq!(count_by_status(&conn, "q", MessageStatus::Pending).unwrap(), 0);
    }
}
