// SPDX-License-Identifier: MIT

//! `ctx.storage.sql`: synchronous cursor API over the per-instance SQLite
//! file (spec §4.8.5). Distinct from `ActorStorage` — this is a real SQL
//! surface, not the key-value `actor_storage` table.

use es_store::error::StoreResult;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension};

pub struct SqlCursor {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
    rows_read: u64,
    rows_written: u64,
}

impl SqlCursor {
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn to_array(&self) -> Vec<Vec<SqlValue>> {
        self.rows.clone()
    }

    pub fn one(&self) -> StoreResult<Option<Vec<SqlValue>>> {
        Ok(self.rows.first().cloned())
    }

    pub fn raw(&self) -> impl Iterator<Item = &Vec<SqlValue>> {
        self.rows.iter()
    }
}

/// One SQLite file per `(class, id)`, opened via `DataLayout::actor_db_path`.
pub struct ActorSqlDatabase {
    conn: Connection,
}

impl ActorSqlDatabase {
    pub fn open(path: &std::path::Path) -> StoreResult<Self> {
        Ok(Self { conn: es_store::open::open_sqlite_file(path)? })
    }

    pub fn exec(&self, query: &str, bindings: &[SqlValue]) -> StoreResult<SqlCursor> {
        let mut stmt = self.conn.prepare(query)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let params: Vec<&dyn rusqlite::ToSql> = bindings.iter().map(|v| v as &dyn rusqlite::ToSql).collect();

        if columns.is_empty() || !query.trim_start().to_ascii_uppercase().starts_with("SELECT") {
            let rows_written = stmt.execute(params.as_slice())? as u64;
            return Ok(SqlCursor { columns, rows: Vec::new(), rows_read: 0, rows_written });
        }

        let rows: Vec<Vec<SqlValue>> = stmt
            .query_map(params.as_slice(), |row| {
                (0..columns.len()).map(|i| row.get::<_, SqlValue>(i)).collect::<Result<Vec<_>, _>>()
            })?
            .collect::<Result<Vec<_>, _>>()?;
        let rows_read = rows.len() as u64;
        Ok(SqlCursor { columns, rows, rows_read, rows_written: 0 })
    }

    pub fn database_size(&self) -> StoreResult<u64> {
        let size: i64 = self.conn.query_row("PRAGMA page_count", [], |r| r.get(0)).optional()?.unwrap_or(0);
        let page_size: i64 = self.conn.query_row("PRAGMA page_size", [], |r| r.get(0)).optional()?.unwrap_or(0);
        Ok((size * page_size).max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn exec_select_reports_rows_read_and_column_names() {
        let dir = tempdir().unwrap();
        let db = ActorSqlDatabase::open(&dir.path().join("actor.sqlite")).unwrap();
        db.exec("CREATE TABLE counters (name TEXT, value INTEGER)", &[]).unwrap();
        db.exec("INSERT INTO counters (name, value) VALUES ('a', 1), ('b', 2)", &[]).unwrap();

        let cursor = db.exec("SELECT name, value FROM counters ORDER BY name", &[]).unwrap();
        assert_eq!(cursor.column_names(), &["name".to_string(), "value".to_string()]);
        assert_eq!(cursor.rows_read(), 2);
        assert_eq!(cursor.to_array().len(), 2);
    }

    #[test]
    fn exec_insert_reports_rows_written() {
        let dir = tempdir().unwrap();
        let db = ActorSqlDatabase::open(&dir.path().join("actor.sqlite")).unwrap();
        db.exec("CREATE TABLE t (v INTEGER)", &[]).unwrap();
        let cursor = db.exec("INSERT INTO t (v) VALUES (1), (2), (3)", &[]).unwrap();
        assert_eq!(cursor.rows_written(), 3);
    }

    #[test]
    fn one_returns_the_first_row() {
        let dir = tempdir().unwrap();
        let db = ActorSqlDatabase::open(&dir.path().join("actor.sqlite")).unwrap();
        db.exec("CREATE TABLE t (v INTEGER)", &[]).unwrap();
        db.exec("INSERT INTO t (v) VALUES (7)", &[]).unwrap();
        let cursor = db.exec("SELECT v FROM t", &[]).unwrap();
        assert_eq!(cursor.one().unwrap(), Some(vec![SqlValue::Integer(7)]));
    }

    #[test]
    fn database_size_is_nonzero_after_writes() {
        let dir = tempdir().unwrap();
        let db = ActorSqlDatabase::open(&dir.path().join("actor.sqlite")).unwrap();
        db.exec("CREATE TABLE t (v INTEGER)", &[]).unwrap();
        assert!(db.database_size().unwrap() > 0);
    }
}
