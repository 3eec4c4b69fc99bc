// SPDX-License-Identifier: MIT

//! Idempotent schema migrations for the shared database.

use crate::error::StoreResult;
use rusqlite::Connection;

struct Migration {
    version: i64,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        sql: "CREATE TABLE IF NOT EXISTS kv_entries (
            namespace TEXT NOT NULL,
            key TEXT NOT NULL,
            value BLOB NOT NULL,
            metadata TEXT,
            expiration INTEGER,
            PRIMARY KEY (namespace, key)
        );
        CREATE INDEX IF NOT EXISTS idx_kv_entries_ns_key ON kv_entries(namespace, key);",
    },
    Migration {
        version: 2,
        sql: "CREATE TABLE IF NOT EXISTS object_entries (
            bucket TEXT NOT NULL,
            key TEXT NOT NULL,
            size INTEGER NOT NULL,
            etag TEXT NOT NULL,
            version TEXT NOT NULL,
            uploaded INTEGER NOT NULL,
            http_metadata TEXT NOT NULL DEFAULT '{}',
            custom_metadata TEXT NOT NULL DEFAULT '{}',
            storage_class TEXT NOT NULL DEFAULT 'Standard',
            PRIMARY KEY (bucket, key)
        );
        CREATE TABLE IF NOT EXISTS object_multipart_uploads (
            upload_id TEXT PRIMARY KEY,
            bucket TEXT NOT NULL,
            key TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            aborted INTEGER NOT NULL DEFAULT 0,
            completed INTEGER NOT NULL DEFAULT 0
        );
        CREATE TABLE IF NOT EXISTS object_multipart_parts (
            upload_id TEXT NOT NULL,
            part_number INTEGER NOT NULL,
            etag TEXT NOT NULL,
            temp_path TEXT NOT NULL,
            size INTEGER NOT NULL,
            PRIMARY KEY (upload_id, part_number)
        );",
    },
    Migration {
        version: 3,
        sql: "CREATE TABLE IF NOT EXISTS actors (
            class TEXT NOT NULL,
            id TEXT NOT NULL,
            name TEXT,
            created_at INTEGER NOT NULL,
            PRIMARY KEY (class, id)
        );
        CREATE TABLE IF NOT EXISTS actor_storage (
            class TEXT NOT NULL,
            id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (class, id, key)
        );
        CREATE TABLE IF NOT EXISTS actor_alarms (
            class TEXT NOT NULL,
            id TEXT NOT NULL,
            alarm_time INTEGER NOT NULL,
            PRIMARY KEY (class, id)
        );",
    },
    Migration {
        version: 4,
        sql: "CREATE TABLE IF NOT EXISTS queue_messages (
            queue TEXT NOT NULL,
            id TEXT PRIMARY KEY,
            body BLOB NOT NULL,
            content_type TEXT NOT NULL,
            status TEXT NOT NULL,
            attempts INTEGER NOT NULL DEFAULT 0,
            visible_at INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            completed_at INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_queue_messages_poll
            ON queue_messages(queue, status, visible_at);",
    },
    Migration {
        version: 5,
        sql: "CREATE TABLE IF NOT EXISTS workflow_instances (
            workflow_name TEXT NOT NULL,
            id TEXT PRIMARY KEY,
            status TEXT NOT NULL,
            params TEXT NOT NULL,
            output TEXT,
            error TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS workflow_steps (
            instance_id TEXT NOT NULL,
            step_name TEXT NOT NULL,
            output TEXT,
            completed_at INTEGER NOT NULL,
            PRIMARY KEY (instance_id, step_name)
        );
        CREATE TABLE IF NOT EXISTS workflow_events (
            id TEXT PRIMARY KEY,
            instance_id TEXT NOT NULL,
            event_type TEXT NOT NULL,
            payload TEXT,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_workflow_events_instance
            ON workflow_events(instance_id, event_type);",
    },
    Migration {
        version: 6,
        sql: "CREATE TABLE IF NOT EXISTS cache_entries (
            cache_name TEXT NOT NULL,
            url TEXT NOT NULL,
            status INTEGER NOT NULL,
            headers TEXT NOT NULL,
            body BLOB NOT NULL,
            expires_at INTEGER,
            PRIMARY KEY (cache_name, url)
        );",
    },
    Migration {
        version: 7,
        sql: "CREATE TABLE IF NOT EXISTS spans (
            span_id TEXT PRIMARY KEY,
            trace_id TEXT NOT NULL,
            parent_span_id TEXT,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            status TEXT NOT NULL,
            start_time INTEGER NOT NULL,
            end_time INTEGER,
            attributes TEXT NOT NULL DEFAULT '{}'
        );
        CREATE TABLE IF NOT EXISTS span_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            span_id TEXT NOT NULL,
            name TEXT NOT NULL,
            time INTEGER NOT NULL,
            attributes TEXT NOT NULL DEFAULT '{}'
        );
        CREATE INDEX IF NOT EXISTS idx_spans_trace ON spans(trace_id);
        CREATE TABLE IF NOT EXISTS user_errors (
            id TEXT PRIMARY KEY,
            trace_id TEXT,
            span_id TEXT,
            message TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );",
    },
    Migration {
        version: 8,
        sql: "CREATE TABLE IF NOT EXISTS ai_proxy_logs (
            id TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL,
            model TEXT NOT NULL,
            request TEXT NOT NULL,
            response TEXT,
            status TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS email_messages (
            id TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL,
            from_addr TEXT NOT NULL,
            to_addr TEXT NOT NULL,
            subject TEXT NOT NULL,
            raw_size INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS analytics_data_points (
            id TEXT PRIMARY KEY,
            created_at INTEGER NOT NULL,
            dataset TEXT NOT NULL,
            blobs TEXT NOT NULL DEFAULT '[]',
            doubles TEXT NOT NULL DEFAULT '[]',
            indexes TEXT NOT NULL DEFAULT '[]'
        );",
    },
];

/// Applies every migration whose version is not yet recorded, in order.
/// Safe to call on every startup.
pub fn run_migrations(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        );",
    )?;

    for migration in MIGRATIONS {
        let already_applied: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM schema_migrations WHERE version = ?1)",
            [migration.version],
            |row| row.get(0),
        )?;
        if already_applied {
            continue;
        }
        conn.execute_batch(migration.sql)?;
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, strftime('%s','now'))",
            [migration.version],
        )?;
        tracing::info!(version = migration.version, "applied schema migration");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, MIGRATIONS.len() as i64);
    }

    #[test]
    fn kv_table_exists_after_migration() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.execute(
            "INSERT INTO kv_entries (namespace, key, value) VALUES ('ns', 'k', x'01')",
            [],
        )
        .unwrap();
    }
}
