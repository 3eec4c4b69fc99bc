// SPDX-License-Identifier: MIT

//! Row-level operations for `workflow_instances`, `workflow_steps`, and
//! `workflow_events`.

use crate::error::StoreResult;
use rusqlite::{params, OptionalExtension};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceStatus {
    Queued,
    Running,
    Paused,
    Waiting,
    Errored,
    Terminated,
    Complete,
}

impl InstanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InstanceStatus::Queued => "queued",
            InstanceStatus::Running => "running",
            InstanceStatus::Paused => "paused",
            InstanceStatus::Waiting => "waiting",
            InstanceStatus::Errored => "errored",
            InstanceStatus::Terminated => "terminated",
            InstanceStatus::Complete => "complete",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "running" => InstanceStatus::Running,
            "paused" => InstanceStatus::Paused,
            "waiting" => InstanceStatus::Waiting,
            "errored" => InstanceStatus::Errored,
            "terminated" => InstanceStatus::Terminated,
            "complete" => InstanceStatus::Complete,
            _ => InstanceStatus::Queued,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InstanceRow {
    pub workflow_name: String,
    pub id: String,
    pub status: InstanceStatus,
    pub params: Value,
    pub output: Option<Value>,
    pub error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

pub fn create_instance(conn: &rusqlite::Connection, workflow_name: &str, id: &str, params: &Value, now: i64) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO workflow_instances (workflow_name, id, status, params, created_at, updated_at)
         VALUES (?1, ?2, 'queued', ?3, ?4, ?4)",
        params![workflow_name, id, params.to_string(), now],
    )?;
    Ok(())
}

fn from_row(r: &rusqlite::Row) -> rusqlite::Result<InstanceRow> {
    let status: String = r.get(2)?;
    let params_text: String = r.get(3)?;
    let output_text: Option<String> = r.get(4)?;
    Ok(InstanceRow {
        workflow_name: r.get(0)?,
        id: r.get(1)?,
        status: InstanceStatus::from_str(&status),
        params: serde_json::from_str(&params_text).unwrap_or(Value::Null),
        output: output_text.and_then(|t| serde_json::from_str(&t).ok()),
        error: r.get(5)?,
        created_at: r.get(6)?,
        updated_at: r.get(7)?,
    })
}

const SELECT_COLS: &str = "workflow_name, id, status, params, output, error, created_at, updated_at";

pub fn get_instance(conn: &rusqlite::Connection, id: &str) -> StoreResult<Option<InstanceRow>> {
    let sql = format!("SELECT {SELECT_COLS} FROM workflow_instances WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], from_row).optional()?)
}

pub fn set_status(conn: &rusqlite::Connection, id: &str, status: InstanceStatus, now: i64) -> StoreResult<()> {
    conn.execute(
        "UPDATE workflow_instances SET status = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, status.as_str(), now],
    )?;
    Ok(())
}

pub fn complete_instance(conn: &rusqlite::Connection, id: &str, output: &Value, now: i64) -> StoreResult<()> {
    conn.execute(
        "UPDATE workflow_instances SET status = 'complete', output = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, output.to_string(), now],
    )?;
    Ok(())
}

pub fn error_instance(conn: &rusqlite::Connection, id: &str, error: &str, now: i64) -> StoreResult<()> {
    conn.execute(
        "UPDATE workflow_instances SET status = 'errored', error = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, error, now],
    )?;
    Ok(())
}

/// Lists instances, most recently updated first, optionally narrowed to one
/// workflow.
pub fn list_instances(conn: &rusqlite::Connection, workflow_name: Option<&str>) -> StoreResult<Vec<InstanceRow>> {
    let sql = format!("SELECT {SELECT_COLS} FROM workflow_instances WHERE ?1 IS NULL OR workflow_name = ?1 ORDER BY updated_at DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![workflow_name], from_row)?.collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// --- steps (checkpoints) ---

pub fn get_step_output(conn: &rusqlite::Connection, instance_id: &str, step_name: &str) -> StoreResult<Option<Value>> {
    let text: Option<String> = conn
        .query_row(
            "SELECT output FROM workflow_steps WHERE instance_id = ?1 AND step_name = ?2",
            params![instance_id, step_name],
            |r| r.get(0),
        )
        .optional()?;
    Ok(text.map(|t| serde_json::from_str(&t)).transpose()?)
}

pub fn step_exists(conn: &rusqlite::Connection, instance_id: &str, step_name: &str) -> StoreResult<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM workflow_steps WHERE instance_id = ?1 AND step_name = ?2)",
        params![instance_id, step_name],
        |r| r.get(0),
    )?;
    Ok(exists)
}

pub fn record_step(conn: &rusqlite::Connection, instance_id: &str, step_name: &str, output: &Value, now: i64) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO workflow_steps (instance_id, step_name, output, completed_at) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(instance_id, step_name) DO NOTHING",
        params![instance_id, step_name, output.to_string(), now],
    )?;
    Ok(())
}

pub fn clear_steps(conn: &rusqlite::Connection, instance_id: &str) -> StoreResult<()> {
    conn.execute("DELETE FROM workflow_steps WHERE instance_id = ?1", params![instance_id])?;
    Ok(())
}

pub fn step_count(conn: &rusqlite::Connection, instance_id: &str) -> StoreResult<u32> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM workflow_steps WHERE instance_id = ?1",
        params![instance_id],
        |r| r.get(0),
    )?;
    Ok(count as u32)
}

pub struct StepRow {
    pub step_name: String,
    pub output: Option<Value>,
    pub completed_at: i64,
}

pub fn list_steps(conn: &rusqlite::Connection, instance_id: &str) -> StoreResult<Vec<StepRow>> {
    let mut stmt = conn.prepare("SELECT step_name, output, completed_at FROM workflow_steps WHERE instance_id = ?1 ORDER BY completed_at ASC")?;
    let rows = stmt
        .query_map(params![instance_id], |r| {
            let output_text: Option<String> = r.get(1)?;
            Ok(StepRow { step_name: r.get(0)?, output: output_text.and_then(|t| serde_json::from_str(&t).ok()), completed_at: r.get(2)? })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// --- events (waitForEvent) ---

pub fn record_event(conn: &rusqlite::Connection, id: &str, instance_id: &str, event_type: &str, payload: Option<&Value>, now: i64) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO workflow_events (id, instance_id, event_type, payload, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, instance_id, event_type, payload.map(|p| p.to_string()), now],
    )?;
    Ok(())
}

/// Finds the earliest unconsumed event of `event_type` for this instance at
/// or after `after`. Workflow semantics treat events as consumed once their
/// payload becomes a step's checkpoint, so callers pass the instance's
/// `waitForEvent` step's completed_at as `after` to avoid re-matching.
pub fn find_event(conn: &rusqlite::Connection, instance_id: &str, event_type: &str, after: i64) -> StoreResult<Option<Value>> {
    let text: Option<String> = conn
        .query_row(
            "SELECT payload FROM workflow_events
             WHERE instance_id = ?1 AND event_type = ?2 AND created_at >= ?3
             ORDER BY created_at ASC LIMIT 1",
            params![instance_id, event_type, after],
            |r| r.get(0),
        )
        .optional()?;
    Ok(text.map(|t| serde_json::from_str(&t)).transpose()?)
}

pub struct EventRow {
    pub id: String,
    pub instance_id: String,
    pub event_type: String,
    pub payload: Option<Value>,
    pub created_at: i64,
}

pub fn list_events(conn: &rusqlite::Connection, instance_id: &str) -> StoreResult<Vec<EventRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, instance_id, event_type, payload, created_at FROM workflow_events WHERE instance_id = ?1 ORDER BY created_at ASC",
    )?;
    let rows = stmt
        .query_map(params![instance_id], |r| {
            let payload_text: Option<String> = r.get(3)?;
            Ok(EventRow {
                id: r.get(0)?,
                instance_id: r.get(1)?,
                event_type: r.get(2)?,
                payload: payload_text.and_then(|t| serde_json::from_str(&t).ok()),
                created_at: r.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
