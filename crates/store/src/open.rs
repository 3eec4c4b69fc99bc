// SPDX-License-Identifier: MIT

//! Shared helper for opening the per-D1-database and per-actor SQLite files
//! that live alongside the shared database under the data directory.

use crate::error::StoreResult;
use rusqlite::Connection;
use std::path::Path;

pub fn open_sqlite_file(path: &Path) -> StoreResult<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}
