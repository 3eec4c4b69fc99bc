// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! es-store: the shared embedded database and rooted data-directory layout.
//!
//! One `rusqlite` pool in WAL mode backs every binding; each binding module
//! in `es-bindings` talks to the tables defined here rather than owning its
//! own storage. Per-bucket object bodies, per-D1-database files, and
//! per-actor SQL database files live alongside it under the same root.

pub mod error;
pub mod layout;
pub mod migrations;
pub mod open;

pub mod actors;
pub mod cache;
pub mod inspect;
pub mod kv;
pub mod objects;
pub mod queue;
pub mod spans;
pub mod workflow;

use error::StoreResult;
use layout::DataLayout;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;
use std::sync::Arc;

pub type Pool = r2d2::Pool<SqliteConnectionManager>;
pub type PooledConn = r2d2::PooledConnection<SqliteConnectionManager>;

/// Process-wide handle to the shared database plus the data directory.
///
/// Cloning is cheap — the pool and layout are shared via `Arc`/internal
/// reference counting, matching the single process-wide singleton described
/// for the store (init at first use, torn down at process exit).
#[derive(Clone)]
pub struct Store {
    pool: Pool,
    layout: Arc<DataLayout>,
}

impl Store {
    /// Opens (creating if needed) the shared database under `root` and runs
    /// migrations. Idempotent: safe to call once per process at startup.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let layout = DataLayout::new(root.as_ref().to_path_buf());
        layout.ensure_tree()?;

        let manager = SqliteConnectionManager::file(layout.shared_db_path())
            .with_init(|conn| conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;"));
        let pool = r2d2::Pool::builder().max_size(8).build(manager)?;

        {
            let conn = pool.get()?;
            migrations::run_migrations(&conn)?;
        }

        Ok(Self { pool, layout: Arc::new(layout) })
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    pub fn conn(&self) -> StoreResult<PooledConn> {
        Ok(self.pool.get()?)
    }
}
