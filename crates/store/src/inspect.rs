// SPDX-License-Identifier: MIT

//! Inspection-only logging for the bindings specified only at their
//! boundary: AI-proxy requests, inbound email, and analytics data points.
//! No binding behavior lives here — just enough schema and write API that
//! the rows exist for the inspector to query.

use crate::error::StoreResult;
use rusqlite::params;
use serde_json::Value;

pub fn log_ai_proxy_request(conn: &rusqlite::Connection, id: &str, model: &str, request: &Value, response: Option<&Value>, status: &str, now: i64) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO ai_proxy_logs (id, created_at, model, request, response, status) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, now, model, request.to_string(), response.map(|r| r.to_string()), status],
    )?;
    Ok(())
}

pub fn log_email_message(conn: &rusqlite::Connection, id: &str, from_addr: &str, to_addr: &str, subject: &str, raw_size: i64, now: i64) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO email_messages (id, created_at, from_addr, to_addr, subject, raw_size) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, now, from_addr, to_addr, subject, raw_size],
    )?;
    Ok(())
}

pub fn log_analytics_data_point(conn: &rusqlite::Connection, id: &str, dataset: &str, blobs: &Value, doubles: &Value, indexes: &Value, now: i64) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO analytics_data_points (id, created_at, dataset, blobs, doubles, indexes) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, now, dataset, blobs.to_string(), doubles.to_string(), indexes.to_string()],
    )?;
    Ok(())
}

pub struct AiProxyLogRow {
    pub id: String,
    pub created_at: i64,
    pub model: String,
    pub status: String,
}

pub fn list_ai_proxy_logs(conn: &rusqlite::Connection) -> StoreResult<Vec<AiProxyLogRow>> {
    let mut stmt = conn.prepare("SELECT id, created_at, model, status FROM ai_proxy_logs ORDER BY created_at DESC")?;
    let rows = stmt
        .query_map([], |r| Ok(AiProxyLogRow { id: r.get(0)?, created_at: r.get(1)?, model: r.get(2)?, status: r.get(3)? }))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub struct EmailMessageRow {
    pub id: String,
    pub created_at: i64,
    pub from_addr: String,
    pub to_addr: String,
    pub subject: String,
    pub raw_size: i64,
}

pub fn list_email_messages(conn: &rusqlite::Connection) -> StoreResult<Vec<EmailMessageRow>> {
    let mut stmt = conn.prepare("SELECT id, created_at, from_addr, to_addr, subject, raw_size FROM email_messages ORDER BY created_at DESC")?;
    let rows = stmt
        .query_map([], |r| {
            Ok(EmailMessageRow { id: r.get(0)?, created_at: r.get(1)?, from_addr: r.get(2)?, to_addr: r.get(3)?, subject: r.get(4)?, raw_size: r.get(5)? })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub struct AnalyticsDataPointRow {
    pub id: String,
    pub created_at: i64,
    pub dataset: String,
    pub blobs: Value,
    pub doubles: Value,
    pub indexes: Value,
}

pub fn list_analytics_data_points(conn: &rusqlite::Connection, dataset: &str) -> StoreResult<Vec<AnalyticsDataPointRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, created_at, dataset, blobs, doubles, indexes FROM analytics_data_points WHERE dataset = ?1 ORDER BY created_at DESC",
    )?;
    let rows = stmt
        .query_map(params![dataset], |r| {
            let blobs: String = r.get(3)?;
            let doubles: String = r.get(4)?;
            let indexes: String = r.get(5)?;
            Ok(AnalyticsDataPointRow {
                id: r.get(0)?,
                created_at: r.get(1)?,
                dataset: r.get(2)?,
                blobs: serde_json::from_str(&blobs).unwrap_or(Value::Null),
                doubles: serde_json::from_str(&doubles).unwrap_or(Value::Null),
                indexes: serde_json::from_str(&indexes).unwrap_or(Value::Null),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
