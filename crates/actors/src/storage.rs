// SPDX-License-Identifier: MIT

//! `ctx.storage`: the async KV-style API over `actor_storage` (spec §4.8.4).
//!
//! Writes issued within a single input-gate turn are buffered here and
//! coalesced into one commit when `flush()` runs at the end of the turn
//! (called by `Instance` right after the gate releases).

use crate::error::ActorResult;
use es_store::actors::{self, ListOpts as StoreListOpts};
use es_store::Store;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const MAX_GET_KEYS: usize = 128;

#[derive(Debug, Clone)]
enum PendingOp {
    Put(Value),
    Delete,
    DeleteAll,
}

#[derive(Default)]
struct Pending {
    ops: BTreeMap<String, PendingOp>,
    delete_all: bool,
}

#[derive(Default, Clone)]
pub struct ListOptions {
    pub start: Option<String>,
    pub start_after: Option<String>,
    pub end: Option<String>,
    pub prefix: Option<String>,
    pub reverse: bool,
    pub limit: Option<u32>,
}

/// Async storage handle for one `(class, id)` actor instance.
pub struct ActorStorage {
    store: Store,
    class: String,
    id: String,
    pending: Arc<parking_lot::Mutex<Pending>>,
}

impl ActorStorage {
    pub fn new(store: Store, class: impl Into<String>, id: impl Into<String>) -> Self {
        Self { store, class: class.into(), id: id.into(), pending: Arc::new(parking_lot::Mutex::new(Pending::default())) }
    }

    pub async fn get(&self, key: &str) -> ActorResult<Option<Value>> {
        {
            let pending = self.pending.lock();
            if pending.delete_all {
                if let Some(op) = pending.ops.get(key) {
                    return Ok(match op {
                        PendingOp::Put(v) => Some(v.clone()),
                        PendingOp::Delete | PendingOp::DeleteAll => None,
                    });
                }
                return Ok(None);
            }
            if let Some(op) = pending.ops.get(key) {
                return Ok(match op {
                    PendingOp::Put(v) => Some(v.clone()),
                    PendingOp::Delete | PendingOp::DeleteAll => None,
                });
            }
        }
        let store = self.store.clone();
        let (class, id, key) = (self.class.clone(), self.id.clone(), key.to_string());
        let value = tokio::task::spawn_blocking(move || -> ActorResult<Option<Value>> {
            let conn = store.conn()?;
            Ok(actors::storage_get(&conn, &class, &id, &key)?)
        })
        .await??;
        Ok(value)
    }

    pub async fn get_many(&self, keys: &[String]) -> ActorResult<BTreeMap<String, Value>> {
        if keys.len() > MAX_GET_KEYS {
            return Err(crate::error::ActorError::Validation(format!("get() accepts at most {MAX_GET_KEYS} keys")));
        }
        let mut out = BTreeMap::new();
        for key in keys {
            if let Some(v) = self.get(key).await? {
                out.insert(key.clone(), v);
            }
        }
        Ok(out)
    }

    pub fn put(&self, key: impl Into<String>, value: Value) {
        let mut pending = self.pending.lock();
        pending.ops.insert(key.into(), PendingOp::Put(value));
    }

    pub fn put_many(&self, entries: BTreeMap<String, Value>) {
        let mut pending = self.pending.lock();
        for (k, v) in entries {
            pending.ops.insert(k, PendingOp::Put(v));
        }
    }

    pub fn delete(&self, key: impl Into<String>) {
        let mut pending = self.pending.lock();
        pending.ops.insert(key.into(), PendingOp::Delete);
    }

    pub fn delete_many(&self, keys: &[String]) {
        let mut pending = self.pending.lock();
        for key in keys {
            pending.ops.insert(key.clone(), PendingOp::Delete);
        }
    }

    pub fn delete_all(&self) {
        let mut pending = self.pending.lock();
        pending.ops.clear();
        pending.delete_all = true;
    }

    pub async fn list(&self, opts: ListOptions) -> ActorResult<Vec<(String, Value)>> {
        self.flush().await?;
        let store = self.store.clone();
        let (class, id) = (self.class.clone(), self.id.clone());
        let rows = tokio::task::spawn_blocking(move || -> ActorResult<Vec<(String, Value)>> {
            let conn = store.conn()?;
            let store_opts = StoreListOpts {
                start: opts.start.as_deref(),
                start_after: opts.start_after.as_deref(),
                end: opts.end.as_deref(),
                prefix: opts.prefix.as_deref(),
                reverse: opts.reverse,
                limit: opts.limit,
            };
            let rows = actors::storage_list(&conn, &class, &id, &store_opts)?;
            Ok(rows.into_iter().map(|r| (r.key, r.value)).collect())
        })
        .await??;
        Ok(rows)
    }

    /// Groups operations inside `f` into one coalesced commit regardless of
    /// the surrounding turn, mirroring `storage.transaction(fn)`.
    pub async fn transaction<F, Fut, T>(&self, f: F) -> ActorResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = ActorResult<T>>,
    {
        let result = f().await;
        self.flush().await?;
        result
    }

    /// No-op: there is nothing to flush to a remote replica locally.
    pub async fn sync(&self) -> ActorResult<()> {
        Ok(())
    }

    /// Commits every buffered write in one transaction. Called by `Instance`
    /// at the end of each input-gate turn.
    pub(crate) async fn flush(&self) -> ActorResult<()> {
        let pending = {
            let mut guard = self.pending.lock();
            if guard.ops.is_empty() && !guard.delete_all {
                return Ok(());
            }
            std::mem::take(&mut *guard)
        };
        let store = self.store.clone();
        let (class, id) = (self.class.clone(), self.id.clone());
        tokio::task::spawn_blocking(move || -> ActorResult<()> {
            let mut conn = store.conn()?;
            let tx = conn.transaction()?;
            if pending.delete_all {
                actors::storage_delete_all(&tx, &class, &id)?;
            }
            for (key, op) in pending.ops {
                match op {
                    PendingOp::Put(v) => actors::storage_put(&tx, &class, &id, &key, &v)?,
                    PendingOp::Delete => {
                        actors::storage_delete(&tx, &class, &id, &key)?;
                    }
                    PendingOp::DeleteAll => unreachable!("delete_all is tracked on the Pending struct, not per-key"),
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use es_store::Store;
    use tempfile::tempdir;

    fn store() -> Store {
        let dir = tempdir().unwrap();
        Store::open(dir.path()).unwrap()
    }

    #[tokio::test]
    async fn put_is_visible_before_flush_then_persists() {
        let storage = ActorStorage::new(store(), "Counter", "id1");
        storage.put("count", Value::from(1));
        assert_eq!(storage.get("count").await.unwrap(), Some(Value::from(1)));
        storage.flush().await.unwrap();
        assert_eq!(storage.get("count").await.unwrap(), Some(Value::from(1)));
    }

    #[tokio::test]
    async fn delete_all_then_put_keeps_only_the_new_key() {
        let storage = ActorStorage::new(store(), "Counter", "id1");
        storage.put("a", Value::from(1));
        storage.flush().await.unwrap();
        storage.delete_all();
        storage.put("b", Value::from(2));
        storage.flush().await.unwrap();
        assert_eq!(storage.get("a").await.unwrap(), None);
        assert_eq!(storage.get("b").await.unwrap(), Some(Value::from(2)));
    }

    #[tokio::test]
    async fn get_many_rejects_over_the_key_cap() {
        let storage = ActorStorage::new(store(), "Counter", "id1");
        let keys: Vec<String> = (0..200).map(|i| i.to_string()).collect();
        assert!(storage.get_many(&keys).await.is_err());
    }

    #[tokio::test]
    async fn list_reflects_unflushed_writes() {
        let storage = ActorStorage::new(store(), "Counter", "id1");
        storage.put("a", Value::from(1));
        storage.put("b", Value::from(2));
        let rows = storage.list(ListOptions::default()).await.unwrap();
        assert_eq!(rows.len(), 2);
    }
}
