// SPDX-License-Identifier: MIT

//! Row-level operations for object-store metadata (`object_entries`,
//! `object_multipart_uploads`, `object_multipart_parts`). Bodies live on disk
//! under `es_store::layout::DataLayout::object_path`.

use crate::error::StoreResult;
use rusqlite::{params, OptionalExtension};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRow {
    pub bucket: String,
    pub key: String,
    pub size: i64,
    pub etag: String,
    pub version: String,
    pub uploaded: i64,
    pub http_metadata: Value,
    pub custom_metadata: Value,
    pub storage_class: String,
}

#[allow(clippy::too_many_arguments)]
pub fn put(
    conn: &rusqlite::Connection,
    bucket: &str,
    key: &str,
    size: i64,
    etag: &str,
    version: &str,
    uploaded: i64,
    http_metadata: &Value,
    custom_metadata: &Value,
    storage_class: &str,
) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO object_entries (bucket, key, size, etag, version, uploaded, http_metadata, custom_metadata, storage_class)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(bucket, key) DO UPDATE SET
            size = excluded.size, etag = excluded.etag, version = excluded.version,
            uploaded = excluded.uploaded, http_metadata = excluded.http_metadata,
            custom_metadata = excluded.custom_metadata, storage_class = excluded.storage_class",
        params![bucket, key, size, etag, version, uploaded, http_metadata.to_string(), custom_metadata.to_string(), storage_class],
    )?;
    Ok(())
}

fn from_row(r: &rusqlite::Row) -> rusqlite::Result<ObjectRow> {
    let http_metadata: String = r.get(6)?;
    let custom_metadata: String = r.get(7)?;
    Ok(ObjectRow {
        bucket: r.get(0)?,
        key: r.get(1)?,
        size: r.get(2)?,
        etag: r.get(3)?,
        version: r.get(4)?,
        uploaded: r.get(5)?,
        http_metadata: serde_json::from_str(&http_metadata).unwrap_or(Value::Null),
        custom_metadata: serde_json::from_str(&custom_metadata).unwrap_or(Value::Null),
        storage_class: r.get(8)?,
    })
}

const SELECT_COLUMNS: &str =
    "bucket, key, size, etag, version, uploaded, http_metadata, custom_metadata, storage_class";

pub fn head(conn: &rusqlite::Connection, bucket: &str, key: &str) -> StoreResult<Option<ObjectRow>> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM object_entries WHERE bucket = ?1 AND key = ?2");
    Ok(conn.query_row(&sql, params![bucket, key], from_row).optional()?)
}

pub fn delete(conn: &rusqlite::Connection, bucket: &str, key: &str) -> StoreResult<bool> {
    let affected = conn.execute("DELETE FROM object_entries WHERE bucket = ?1 AND key = ?2", params![bucket, key])?;
    Ok(affected > 0)
}

pub struct ListResult {
    pub entries: Vec<ObjectRow>,
    pub more: bool,
}

pub fn list(
    conn: &rusqlite::Connection,
    bucket: &str,
    prefix: &str,
    start_after: Option<&str>,
    limit: u32,
) -> StoreResult<ListResult> {
    let like_pattern = format!("{}%", prefix.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_"));
    let after = start_after.unwrap_or("");
    let sql = format!(
        "SELECT {SELECT_COLUMNS} FROM object_entries
         WHERE bucket = ?1 AND key LIKE ?2 ESCAPE '\\' AND key > ?3
         ORDER BY key ASC LIMIT ?4"
    );
    let mut stmt = conn.prepare(&sql)?;
    let fetch_limit = limit as i64 + 1;
    let rows = stmt.query_map(params![bucket, like_pattern, after, fetch_limit], from_row)?.collect::<Result<Vec<_>, _>>()?;
    let more = rows.len() as u32 > limit;
    Ok(ListResult { entries: rows.into_iter().take(limit as usize).collect(), more })
}

// --- multipart uploads ---

pub fn create_multipart_upload(conn: &rusqlite::Connection, upload_id: &str, bucket: &str, key: &str, created_at: i64) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO object_multipart_uploads (upload_id, bucket, key, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![upload_id, bucket, key, created_at],
    )?;
    Ok(())
}

pub struct UploadRow {
    pub bucket: String,
    pub key: String,
    pub aborted: bool,
    pub completed: bool,
}

pub fn get_upload(conn: &rusqlite::Connection, upload_id: &str) -> StoreResult<Option<UploadRow>> {
    Ok(conn
        .query_row(
            "SELECT bucket, key, aborted, completed FROM object_multipart_uploads WHERE upload_id = ?1",
            params![upload_id],
            |r| Ok(UploadRow { bucket: r.get(0)?, key: r.get(1)?, aborted: r.get::<_, i64>(2)? != 0, completed: r.get::<_, i64>(3)? != 0 }),
        )
        .optional()?)
}

pub fn put_part(conn: &rusqlite::Connection, upload_id: &str, part_number: u32, etag: &str, temp_path: &str, size: i64) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO object_multipart_parts (upload_id, part_number, etag, temp_path, size)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(upload_id, part_number) DO UPDATE SET etag = excluded.etag, temp_path = excluded.temp_path, size = excluded.size",
        params![upload_id, part_number, etag, temp_path, size],
    )?;
    Ok(())
}

pub struct PartRow {
    pub part_number: u32,
    pub etag: String,
    pub temp_path: String,
    pub size: i64,
}

pub fn list_parts(conn: &rusqlite::Connection, upload_id: &str) -> StoreResult<Vec<PartRow>> {
    let mut stmt = conn.prepare(
        "SELECT part_number, etag, temp_path, size FROM object_multipart_parts WHERE upload_id = ?1 ORDER BY part_number ASC",
    )?;
    let rows = stmt
        .query_map(params![upload_id], |r| {
            Ok(PartRow { part_number: r.get::<_, i64>(0)? as u32, etag: r.get(1)?, temp_path: r.get(2)?, size: r.get(3)? })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn mark_upload_completed(conn: &rusqlite::Connection, upload_id: &str) -> StoreResult<()> {
    conn.execute("UPDATE object_multipart_uploads SET completed = 1 WHERE upload_id = ?1", params![upload_id])?;
    Ok(())
}

pub fn mark_upload_aborted(conn: &rusqlite::Connection, upload_id: &str) -> StoreResult<()> {
    conn.execute("UPDATE object_multipart_uploads SET aborted = 1 WHERE upload_id = ?1", params![upload_id])?;
    Ok(())
}

pub fn delete_parts(conn: &rusqlite::Connection, upload_id: &str) -> StoreResult<()> {
    conn.execute("DELETE FROM object_multipart_parts WHERE upload_id = ?1", params![upload_id])?;
    Ok(())
}
