// SPDX-License-Identifier: MIT

//! Relational-database binding: one `rusqlite` file per logical database
//! under `d1/<name>.sqlite`, with prepared statements, raw multi-statement
//! `exec`, and transactional `batch` (spec §4.4).

use crate::error::{BindingError, BindingResult};
use es_store::Store;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, ToSql};
use std::sync::Arc;

pub type D1Value = SqlValue;

pub fn bool_value(b: bool) -> D1Value {
    D1Value::Integer(if b { 1 } else { 0 })
}

#[derive(Debug, Clone, Default)]
pub struct D1Meta {
    pub duration_ms: f64,
    pub rows_read: u64,
    pub rows_written: u64,
    pub last_row_id: i64,
    pub changes: i64,
    pub changed_db: bool,
    pub size_after: u64,
}

#[derive(Debug, Clone, Default)]
pub struct D1Result {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<D1Value>>,
    pub meta: D1Meta,
}

/// A prepared statement, immutably rebound by `bind`.
#[derive(Clone)]
pub struct Statement<'a> {
    db: &'a D1Database,
    sql: String,
    params: Vec<D1Value>,
}

impl<'a> Statement<'a> {
    /// Returns a new bound statement; the original is left untouched.
    pub fn bind(&self, params: Vec<D1Value>) -> Statement<'a> {
        Statement { db: self.db, sql: self.sql.clone(), params }
    }

    pub async fn first(&self, column: Option<&str>) -> BindingResult<Option<D1Value>> {
        let result = self.db.run_query(&self.sql, self.params.clone()).await?;
        let Some(row) = result.rows.into_iter().next() else { return Ok(None) };
        match column {
            Some(name) => {
                let idx = result
                    .columns
                    .iter()
                    .position(|c| c == name)
                    .ok_or_else(|| BindingError::Validation(format!("no such column: {name}")))?;
                Ok(row.into_iter().nth(idx))
            }
            None => Ok(row.into_iter().next()),
        }
    }

    pub async fn all(&self) -> BindingResult<D1Result> {
        self.db.run_query(&self.sql, self.params.clone()).await
    }

    pub async fn run(&self) -> BindingResult<D1Meta> {
        let result = self.db.run_exec_one(&self.sql, self.params.clone()).await?;
        Ok(result)
    }

    pub async fn raw(&self) -> BindingResult<Vec<Vec<D1Value>>> {
        Ok(self.all().await?.rows)
    }
}

#[derive(Clone)]
pub struct D1Database {
    conn: Arc<parking_lot::Mutex<Connection>>,
    path: std::path::PathBuf,
}

impl D1Database {
    pub async fn open(store: &Store, name: &str) -> BindingResult<Self> {
        let path = store.layout().d1_db_path(name)?;
        let path_for_open = path.clone();
        let conn = tokio::task::spawn_blocking(move || es_store::open::open_sqlite_file(&path_for_open))
            .await?
            .map_err(BindingError::from)?;
        Ok(Self { conn: Arc::new(parking_lot::Mutex::new(conn)), path })
    }

    pub fn prepare<'a>(&'a self, sql: &str) -> Statement<'a> {
        Statement { db: self, sql: sql.to_string(), params: Vec::new() }
    }

    async fn run_query(&self, sql: &str, params: Vec<D1Value>) -> BindingResult<D1Result> {
        let conn = self.conn.clone();
        let path = self.path.clone();
        let sql = sql.to_string();
        tokio::task::spawn_blocking(move || {
            let start = std::time::Instant::now();
            let guard = conn.lock();
            let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
            let mut stmt = guard.prepare(&sql).map_err(BindingError::from_sqlite)?;
            let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
            let column_count = columns.len();
            let rows = stmt
                .query_map(param_refs.as_slice(), move |row| {
                    (0..column_count).map(|i| row.get::<_, D1Value>(i)).collect::<rusqlite::Result<Vec<_>>>()
                })
                .map_err(BindingError::from_sqlite)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(BindingError::from_sqlite)?;
            drop(stmt);
            let rows_read = rows.len() as u64;
            let size_after = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            Ok::<_, BindingError>(D1Result {
                columns,
                rows,
                meta: D1Meta {
                    duration_ms: start.elapsed().as_secs_f64() * 1000.0,
                    rows_read,
                    rows_written: 0,
                    last_row_id: guard.last_insert_rowid(),
                    changes: guard.changes() as i64,
                    changed_db: false,
                    size_after,
                },
            })
        })
        .await?
    }

    async fn run_exec_one(&self, sql: &str, params: Vec<D1Value>) -> BindingResult<D1Meta> {
        let conn = self.conn.clone();
        let path = self.path.clone();
        let sql = sql.to_string();
        tokio::task::spawn_blocking(move || {
            let start = std::time::Instant::now();
            let guard = conn.lock();
            let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
            let affected = guard.execute(&sql, param_refs.as_slice()).map_err(BindingError::from_sqlite)?;
            let size_after = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            Ok::<_, BindingError>(D1Meta {
                duration_ms: start.elapsed().as_secs_f64() * 1000.0,
                rows_read: 0,
                rows_written: affected as u64,
                last_row_id: guard.last_insert_rowid(),
                changes: guard.changes() as i64,
                changed_db: affected > 0,
                size_after,
            })
        })
        .await?
    }

    /// Splits `sql` into individual statements and runs each one, honoring
    /// single-quoted strings, double-quoted identifiers, and `--`/`/* */`
    /// comments.
    pub async fn exec(&self, sql: &str) -> BindingResult<D1Meta> {
        let statements = split_statements(sql);
        let mut total = D1Meta::default();
        let start = std::time::Instant::now();
        for statement in statements {
            if statement.trim().is_empty() {
                continue;
            }
            let meta = self.run_exec_one(&statement, Vec::new()).await?;
            total.rows_written += meta.rows_written;
            total.changes += meta.changes;
            total.changed_db |= meta.changed_db;
            total.last_row_id = meta.last_row_id;
            total.size_after = meta.size_after;
        }
        total.duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        Ok(total)
    }

    /// Runs every statement inside one transaction, rolling back on the
    /// first error.
    pub async fn batch(&self, statements: Vec<(String, Vec<D1Value>)>) -> BindingResult<Vec<D1Meta>> {
        let conn = self.conn.clone();
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            guard.execute_batch("BEGIN").map_err(BindingError::from_sqlite)?;
            let mut results = Vec::with_capacity(statements.len());
            for (sql, params) in statements {
                let start = std::time::Instant::now();
                let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
                match guard.execute(&sql, param_refs.as_slice()) {
                    Ok(affected) => results.push(D1Meta {
                        duration_ms: start.elapsed().as_secs_f64() * 1000.0,
                        rows_read: 0,
                        rows_written: affected as u64,
                        last_row_id: guard.last_insert_rowid(),
                        changes: guard.changes() as i64,
                        changed_db: true,
                        size_after: 0,
                    }),
                    Err(e) => {
                        guard.execute_batch("ROLLBACK").ok();
                        return Err(BindingError::from_sqlite(e));
                    }
                }
            }
            guard.execute_batch("COMMIT").map_err(BindingError::from_sqlite)?;
            let size_after = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            for result in &mut results {
                result.size_after = size_after;
            }
            Ok::<_, BindingError>(results)
        })
        .await?
    }

    pub async fn dump(&self) -> BindingResult<Vec<u8>> {
        tokio::fs::read(&self.path).await.map_err(|e| BindingError::FatalBinding(e.to_string()))
    }
}

impl BindingError {
    fn from_sqlite(e: rusqlite::Error) -> Self {
        BindingError::Store(es_store::error::StoreError::Sqlite(e))
    }
}

/// Splits a multi-statement SQL string on top-level `;` boundaries.
fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut chars = sql.chars().peekable();
    let mut in_single = false;
    let mut in_double = false;

    while let Some(c) = chars.next() {
        if in_single {
            current.push(c);
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    current.push(chars.next().unwrap());
                } else {
                    in_single = false;
                }
            }
            continue;
        }
        if in_double {
            current.push(c);
            if c == '"' {
                in_double = false;
            }
            continue;
        }
        match c {
            '\'' => {
                in_single = true;
                current.push(c);
            }
            '"' => {
                in_double = true;
                current.push(c);
            }
            '-' if chars.peek() == Some(&'-') => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                while let Some(next) = chars.next() {
                    if next == '*' && chars.peek() == Some(&'/') {
                        chars.next();
                        break;
                    }
                }
            }
            ';' => {
                statements.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        statements.push(current);
    }
    statements
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn db() -> (tempfile::TempDir, D1Database) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let db = D1Database::open(&store, "main").await.unwrap();
        db.exec("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT);").await.unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn run_then_first_round_trips_a_row() {
        let (_dir, db) = db().await;
        db.prepare("INSERT INTO t (name) VALUES (?1)").bind(vec![D1Value::Text("alice".into())]).run().await.unwrap();
        let name = db.prepare("SELECT name FROM t WHERE id = 1").all().await.unwrap();
        assert_eq!(name.rows[0][0], D1Value::Text("alice".into()));
    }

    #[tokio::test]
    async fn exec_splits_statements_honoring_comments_and_quotes() {
        let (_dir, db) = db().await;
        let sql = "INSERT INTO t (name) VALUES ('a;b'); -- comment with ; inside\nINSERT INTO t (name) VALUES ('c');";
        let meta = db.exec(sql).await.unwrap();
        assert_eq!(meta.rows_written, 2);
        let all = db.prepare("SELECT COUNT(*) FROM t").all().await.unwrap();
        assert_eq!(all.rows[0][0], D1Value::Integer(2));
    }

    #[tokio::test]
    async fn batch_rolls_back_on_error() {
        let (_dir, db) = db().await;
        let statements = vec![
            ("INSERT INTO t (name) VALUES ('ok')".to_string(), vec![]),
            ("INSERT INTO nonexistent_table VALUES (1)".to_string(), vec![]),
        ];
        let result = db.batch(statements).await;
        assert!(result.is_err());
        let all = db.prepare("SELECT COUNT(*) FROM t").all().await.unwrap();
        assert_eq!(all.rows[0][0], D1Value::Integer(0));
    }

    #[tokio::test]
    async fn boolean_binds_as_integer() {
        let (_dir, db) = db().await;
        db.exec("CREATE TABLE flags (v INTEGER);").await.unwrap();
        db.prepare("INSERT INTO flags (v) VALUES (?1)").bind(vec![bool_value(true)]).run().await.unwrap();
        let all = db.prepare("SELECT v FROM flags").all().await.unwrap();
        assert_eq!(all.rows[0][0], D1Value::Integer(1));
    }
}
