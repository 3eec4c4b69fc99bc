// SPDX-License-Identifier: MIT

//! KV binding: key→bytes+metadata+expiration, bulk get, prefix listing,
//! cursor pagination (spec §4.2).

use crate::error::{BindingError, BindingResult};
use es_core::Clock;
use es_store::Store;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;
use tokio::io::AsyncRead;

pub const MAX_KEY_SIZE: usize = 512;
pub const MAX_VALUE_SIZE: usize = 25 * 1024 * 1024;
pub const MAX_METADATA_SIZE: usize = 1024;
pub const MIN_TTL_SECONDS: i64 = 60;
pub const MAX_BULK_GET_KEYS: usize = 100;
pub const MAX_LIST_LIMIT: u32 = 1000;

#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    /// Absolute unix-seconds expiration.
    pub expiration: Option<i64>,
    /// Relative TTL in seconds from now.
    pub expiration_ttl: Option<i64>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    pub value_type: ValueType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValueType {
    #[default]
    Text,
    Json,
    ArrayBuffer,
    Stream,
}

pub enum KvValue {
    Text(String),
    Json(Value),
    Bytes(Vec<u8>),
    Stream(Box<dyn AsyncRead + Unpin + Send>),
}

#[derive(Debug, Clone)]
pub struct KvListEntry {
    pub name: String,
    pub expiration: Option<i64>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub prefix: Option<String>,
    pub limit: Option<u32>,
    pub cursor: Option<String>,
}

pub struct ListResult {
    pub keys: Vec<KvListEntry>,
    pub list_complete: bool,
    pub cursor: Option<String>,
}

fn validate_key(key: &str) -> BindingResult<()> {
    if key.is_empty() || key == "." || key == ".." {
        return Err(BindingError::Validation(format!("invalid key: {key:?}")));
    }
    if key.len() > MAX_KEY_SIZE {
        return Err(BindingError::Validation(format!("key exceeds {MAX_KEY_SIZE} bytes")));
    }
    Ok(())
}

fn validate_value(value: &[u8]) -> BindingResult<()> {
    if value.len() > MAX_VALUE_SIZE {
        return Err(BindingError::Validation(format!("value exceeds {MAX_VALUE_SIZE} bytes")));
    }
    Ok(())
}

fn validate_metadata(metadata: &Value) -> BindingResult<()> {
    if metadata.to_string().len() > MAX_METADATA_SIZE {
        return Err(BindingError::Validation(format!("metadata exceeds {MAX_METADATA_SIZE} bytes")));
    }
    Ok(())
}

/// A single KV namespace bound to one `namespace` name in the shared store.
#[derive(Clone)]
pub struct KvNamespace<C: Clock> {
    store: Store,
    namespace: String,
    clock: Arc<C>,
}

impl<C: Clock> KvNamespace<C> {
    pub fn new(store: Store, namespace: impl Into<String>, clock: Arc<C>) -> Self {
        Self { store, namespace: namespace.into(), clock }
    }

    fn resolve_expiration(&self, opts: &PutOptions) -> BindingResult<Option<i64>> {
        let now = self.clock.epoch_seconds() as i64;
        match (opts.expiration, opts.expiration_ttl) {
            (Some(abs), _) => {
                if abs < now + MIN_TTL_SECONDS {
                    return Err(BindingError::Validation(format!(
                        "expiration must be at least {MIN_TTL_SECONDS}s in the future"
                    )));
                }
                Ok(Some(abs))
            }
            (None, Some(ttl)) => {
                if ttl < MIN_TTL_SECONDS {
                    return Err(BindingError::Validation(format!(
                        "expirationTtl must be at least {MIN_TTL_SECONDS}s"
                    )));
                }
                Ok(Some(now + ttl))
            }
            (None, None) => Ok(None),
        }
    }

    pub async fn put(&self, key: &str, value: Vec<u8>, opts: PutOptions) -> BindingResult<()> {
        validate_key(key)?;
        validate_value(&value)?;
        if let Some(metadata) = &opts.metadata {
            validate_metadata(metadata)?;
        }
        let expiration = self.resolve_expiration(&opts)?;
        let store = self.store.clone();
        let namespace = self.namespace.clone();
        let key = key.to_string();
        let metadata = opts.metadata.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            es_store::kv::put(&conn, &namespace, &key, &value, metadata.as_ref(), expiration)?;
            Ok::<_, BindingError>(())
        })
        .await?
    }

    pub async fn get(&self, key: &str, opts: GetOptions) -> BindingResult<Option<KvValue>> {
        let (row, _meta) = self.get_with_metadata_row(key).await?;
        let Some(row) = row else { return Ok(None) };
        to_kv_value(row.value, opts.value_type).map(Some)
    }

    pub async fn get_with_metadata(&self, key: &str, opts: GetOptions) -> BindingResult<Option<(KvValue, Option<Value>)>> {
        let (row, _) = self.get_with_metadata_row(key).await?;
        let Some(row) = row else { return Ok(None) };
        let metadata = row.metadata.clone();
        let value = to_kv_value(row.value, opts.value_type)?;
        Ok(Some((value, metadata)))
    }

    async fn get_with_metadata_row(&self, key: &str) -> BindingResult<(Option<es_store::kv::KvRow>, ())> {
        validate_key(key)?;
        let store = self.store.clone();
        let namespace = self.namespace.clone();
        let key = key.to_string();
        let now = self.clock.epoch_seconds() as i64;
        let row = tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            es_store::kv::get(&conn, &namespace, &key, now).map_err(BindingError::from)
        })
        .await??;
        Ok((row, ()))
    }

    /// Bulk get: rejects stream/byte-array types, caps at `MAX_BULK_GET_KEYS`.
    pub async fn get_bulk(&self, keys: &[String], value_type: ValueType) -> BindingResult<HashMap<String, Option<KvValue>>> {
        if matches!(value_type, ValueType::Stream | ValueType::ArrayBuffer) {
            return Err(BindingError::Validation("bulk get does not support stream/array-buffer types".into()));
        }
        if keys.len() > MAX_BULK_GET_KEYS {
            return Err(BindingError::Validation(format!("bulk get supports at most {MAX_BULK_GET_KEYS} keys")));
        }
        let mut out = HashMap::with_capacity(keys.len());
        for key in keys {
            let value = self.get(key, GetOptions { value_type }).await?;
            out.insert(key.clone(), value);
        }
        Ok(out)
    }

    pub async fn delete(&self, key: &str) -> BindingResult<()> {
        validate_key(key)?;
        let store = self.store.clone();
        let namespace = self.namespace.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            es_store::kv::delete(&conn, &namespace, &key)?;
            Ok::<_, BindingError>(())
        })
        .await?
    }

    pub async fn list(&self, opts: ListOptions) -> BindingResult<ListResult> {
        let limit = opts.limit.unwrap_or(MAX_LIST_LIMIT).min(MAX_LIST_LIMIT);
        let prefix = opts.prefix.unwrap_or_default();
        let store = self.store.clone();
        let namespace = self.namespace.clone();
        let cursor = opts.cursor.clone();
        let now = self.clock.epoch_seconds() as i64;
        let (rows, more) = tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            es_store::kv::list(&conn, &namespace, &prefix, cursor.as_deref(), limit, now).map_err(BindingError::from)
        })
        .await??;

        let next_cursor = rows.last().map(|r| r.key.clone());
        let keys = rows
            .into_iter()
            .map(|r| KvListEntry { name: r.key, expiration: r.expiration, metadata: r.metadata })
            .collect();
        Ok(ListResult { keys, list_complete: !more, cursor: if more { next_cursor } else { None } })
    }
}

fn to_kv_value(bytes: Vec<u8>, value_type: ValueType) -> BindingResult<KvValue> {
    match value_type {
        ValueType::Text => {
            String::from_utf8(bytes).map(KvValue::Text).map_err(|e| BindingError::Validation(e.to_string()))
        }
        ValueType::Json => {
            serde_json::from_slice(&bytes).map(KvValue::Json).map_err(|e| BindingError::Validation(e.to_string()))
        }
        ValueType::ArrayBuffer => Ok(KvValue::Bytes(bytes)),
        ValueType::Stream => Ok(KvValue::Stream(Box::new(Cursor::new(bytes)))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use es_core::FakeClock;

    fn namespace() -> (tempfile::TempDir, KvNamespace<FakeClock>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let clock = Arc::new(FakeClock::new());
        (dir, KvNamespace::new(store, "ns", clock))
    }

    #[tokio::test]
    async fn last_write_wins() {
        let (_dir, kv) = namespace();
        kv.put("a", b"1".to_vec(), PutOptions::default()).await.unwrap();
        kv.put("a", b"2".to_vec(), PutOptions::default()).await.unwrap();
        let KvValue::Text(v) = kv.get("a", GetOptions::default()).await.unwrap().unwrap() else { panic!("expected text") };
        assert_eq!(v, "2");
    }

    #[tokio::test]
    async fn rejects_forbidden_keys() {
        let (_dir, kv) = namespace();
        for bad in ["", ".", ".."] {
            let result = kv.put(bad, b"x".to_vec(), PutOptions::default()).await;
            assert!(matches!(result, Err(BindingError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn list_pagination_matches_spec_scenario() {
        let (_dir, kv) = namespace();
        kv.put("a", b"1".to_vec(), PutOptions::default()).await.unwrap();
        kv.put("b", b"2".to_vec(), PutOptions::default()).await.unwrap();
        kv.put("c", b"3".to_vec(), PutOptions::default()).await.unwrap();

        let first = kv.list(ListOptions { limit: Some(2), ..Default::default() }).await.unwrap();
        assert_eq!(first.keys.iter().map(|k| k.name.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(!first.list_complete);
        assert_eq!(first.cursor.as_deref(), Some("b"));

        let second = kv.list(ListOptions { limit: Some(2), cursor: first.cursor, ..Default::default() }).await.unwrap();
        assert_eq!(second.keys.iter().map(|k| k.name.as_str()).collect::<Vec<_>>(), vec!["c"]);
        assert!(second.list_complete);
    }

    #[tokio::test]
    async fn ttl_below_minimum_is_rejected() {
        let (_dir, kv) = namespace();
        let result = kv.put("a", b"1".to_vec(), PutOptions { expiration_ttl: Some(5), ..Default::default() }).await;
        assert!(matches!(result, Err(BindingError::Validation(_))));
    }

    #[tokio::test]
    async fn bulk_get_rejects_stream_type() {
        let (_dir, kv) = namespace();
        let result = kv.get_bulk(&["a".to_string()], ValueType::Stream).await;
        assert!(matches!(result, Err(BindingError::Validation(_))));
    }
}
