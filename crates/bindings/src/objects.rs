// SPDX-License-Identifier: MIT

//! Object-store binding: buckets backed by filesystem bodies + a metadata
//! row, with conditional requests, byte ranges, and multipart upload
//! (spec §4.3).

use crate::error::{BindingError, BindingResult};
use es_core::{ids, Clock};
use es_store::objects::{ObjectRow, PartRow};
use es_store::Store;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

pub const MAX_KEY_SIZE: usize = 1024;
pub const MAX_CUSTOM_METADATA_SIZE: usize = 2048;
pub const MAX_LIST_LIMIT: u32 = 1000;
pub const MAX_BATCH_DELETE_KEYS: usize = 1000;

#[derive(Debug, Clone, Default)]
pub struct OnlyIf {
    pub etag_matches: Option<String>,
    pub etag_does_not_match: Option<String>,
    pub uploaded_before: Option<i64>,
    pub uploaded_after: Option<i64>,
}

impl OnlyIf {
    fn satisfied_by(&self, row: &ObjectRow) -> bool {
        if let Some(want) = &self.etag_matches {
            if want != "*" && want != &row.etag {
                return false;
            }
        }
        if let Some(avoid) = &self.etag_does_not_match {
            if avoid == "*" || avoid == &row.etag {
                return false;
            }
        }
        if let Some(before) = self.uploaded_before {
            if row.uploaded >= before {
                return false;
            }
        }
        if let Some(after) = self.uploaded_after {
            if row.uploaded <= after {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Range {
    Offset { offset: u64, length: Option<u64> },
    Suffix { suffix: u64 },
}

#[derive(Debug, Clone)]
pub struct ServedRange {
    pub offset: u64,
    pub length: u64,
}

#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    pub http_metadata: Value,
    pub custom_metadata: Value,
    pub storage_class: Option<String>,
    pub only_if: Option<OnlyIf>,
}

#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    pub only_if: Option<OnlyIf>,
    pub range: Option<Range>,
}

pub struct FetchedObject {
    pub metadata: ObjectRow,
    pub body: Option<Vec<u8>>,
    pub served_range: Option<ServedRange>,
}

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub prefix: Option<String>,
    pub delimiter: Option<String>,
    pub cursor: Option<String>,
    pub start_after: Option<String>,
    pub limit: Option<u32>,
}

pub struct ListResult {
    pub objects: Vec<ObjectRow>,
    pub delimited_prefixes: Vec<String>,
    pub truncated: bool,
    pub cursor: Option<String>,
}

fn validate_key(key: &str) -> BindingResult<()> {
    if key.is_empty() || key.len() > MAX_KEY_SIZE {
        return Err(BindingError::Validation(format!("invalid object key: {key:?}")));
    }
    Ok(())
}

fn validate_custom_metadata(metadata: &Value) -> BindingResult<()> {
    if metadata.to_string().len() > MAX_CUSTOM_METADATA_SIZE {
        return Err(BindingError::Validation(format!("custom metadata exceeds {MAX_CUSTOM_METADATA_SIZE} bytes")));
    }
    Ok(())
}

fn content_etag(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    hex::encode(hasher.finalize())
}

#[derive(Clone)]
pub struct Bucket<C: Clock> {
    store: Store,
    name: String,
    clock: Arc<C>,
    max_batch_delete_keys: usize,
}

impl<C: Clock> Bucket<C> {
    pub fn new(store: Store, name: impl Into<String>, clock: Arc<C>) -> Self {
        Self { store, name: name.into(), clock, max_batch_delete_keys: MAX_BATCH_DELETE_KEYS }
    }

    pub fn with_max_batch_delete_keys(mut self, max: usize) -> Self {
        self.max_batch_delete_keys = max;
        self
    }

    pub async fn head(&self, key: &str) -> BindingResult<Option<ObjectRow>> {
        validate_key(key)?;
        let store = self.store.clone();
        let bucket = self.name.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            es_store::objects::head(&conn, &bucket, &key).map_err(BindingError::from)
        })
        .await?
    }

    pub async fn get(&self, key: &str, opts: GetOptions) -> BindingResult<Option<FetchedObject>> {
        let Some(row) = self.head(key).await? else { return Ok(None) };
        if let Some(only_if) = &opts.only_if {
            if !only_if.satisfied_by(&row) {
                return Ok(Some(FetchedObject { metadata: row, body: None, served_range: None }));
            }
        }

        let path = self.store.layout().object_path(&self.name, key)?;
        let mut file = tokio::fs::File::open(&path).await.map_err(|e| BindingError::FatalBinding(e.to_string()))?;
        let mut full = Vec::new();
        file.read_to_end(&mut full).await.map_err(|e| BindingError::FatalBinding(e.to_string()))?;

        let (body, served_range) = match opts.range {
            None => (full, None),
            Some(range) => slice_range(&full, range)?,
        };
        Ok(Some(FetchedObject { metadata: row, body: Some(body), served_range }))
    }

    /// Returns `None` when an `onlyIf` condition fails on put, per spec.
    pub async fn put(&self, key: &str, value: Vec<u8>, opts: PutOptions) -> BindingResult<Option<ObjectRow>> {
        validate_key(key)?;
        validate_custom_metadata(&opts.custom_metadata)?;

        if let Some(only_if) = &opts.only_if {
            if let Some(existing) = self.head(key).await? {
                if !only_if.satisfied_by(&existing) {
                    return Ok(None);
                }
            }
        }

        let etag = content_etag(&value);
        let version = ids::new_entity_id();
        let uploaded = self.clock.epoch_seconds() as i64;
        let storage_class = opts.storage_class.clone().unwrap_or_else(|| "Standard".to_string());

        let path = self.store.layout().object_path(&self.name, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| BindingError::FatalBinding(e.to_string()))?;
        }
        let mut file = tokio::fs::File::create(&path).await.map_err(|e| BindingError::FatalBinding(e.to_string()))?;
        file.write_all(&value).await.map_err(|e| BindingError::FatalBinding(e.to_string()))?;

        let store = self.store.clone();
        let bucket = self.name.clone();
        let key_owned = key.to_string();
        let size = value.len() as i64;
        let http_metadata = opts.http_metadata.clone();
        let custom_metadata = opts.custom_metadata.clone();
        let etag_for_store = etag.clone();
        let version_for_store = version.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            es_store::objects::put(
                &conn, &bucket, &key_owned, size, &etag_for_store, &version_for_store, uploaded,
                &http_metadata, &custom_metadata, &storage_class,
            )?;
            Ok::<_, BindingError>(())
        })
        .await??;

        self.head(key).await?.ok_or_else(|| BindingError::FatalBinding("object vanished after put".into()))
            .map(Some)
    }

    pub async fn delete(&self, key: &str) -> BindingResult<bool> {
        validate_key(key)?;
        // Reject path traversal before touching the store, even if no row
        // for `key` exists — delete of an invalid key is always an error.
        let path = self.store.layout().object_path(&self.name, key)?;
        let store = self.store.clone();
        let bucket = self.name.clone();
        let key_owned = key.to_string();
        let removed = tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            es_store::objects::delete(&conn, &bucket, &key_owned).map_err(BindingError::from)
        })
        .await??;
        if removed {
            let _ = tokio::fs::remove_file(&path).await;
        }
        Ok(removed)
    }

    /// Deletes each of `keys` in order. Validates every key up front —
    /// rejecting on the first path-traversal violation before deleting
    /// anything — and caps the batch at `max_batch_delete_keys`.
    pub async fn delete_many(&self, keys: &[String]) -> BindingResult<Vec<bool>> {
        if keys.len() > self.max_batch_delete_keys {
            return Err(BindingError::Validation(format!(
                "batch delete supports at most {} keys",
                self.max_batch_delete_keys
            )));
        }
        for key in keys {
            validate_key(key)?;
            self.store.layout().object_path(&self.name, key)?;
        }
        let mut removed = Vec::with_capacity(keys.len());
        for key in keys {
            removed.push(self.delete(key).await?);
        }
        Ok(removed)
    }

    pub async fn list(&self, opts: ListOptions) -> BindingResult<ListResult> {
        let limit = opts.limit.unwrap_or(MAX_LIST_LIMIT).min(MAX_LIST_LIMIT);
        let prefix = opts.prefix.unwrap_or_default();
        let start_after = opts.cursor.clone().or(opts.start_after.clone());
        let store = self.store.clone();
        let bucket = self.name.clone();
        let prefix_for_query = prefix.clone();
        let result = tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            es_store::objects::list(&conn, &bucket, &prefix_for_query, start_after.as_deref(), limit).map_err(BindingError::from)
        })
        .await??;

        let next_cursor = result.entries.last().map(|r| r.key.clone());

        let Some(delimiter) = opts.delimiter.filter(|d| !d.is_empty()) else {
            return Ok(ListResult {
                objects: result.entries,
                delimited_prefixes: Vec::new(),
                truncated: result.more,
                cursor: if result.more { next_cursor } else { None },
            });
        };

        let mut objects = Vec::new();
        let mut prefixes = std::collections::BTreeSet::new();
        for entry in result.entries {
            let rest = &entry.key[prefix.len()..];
            if let Some(idx) = rest.find(delimiter.as_str()) {
                let common = format!("{}{}{}", prefix, &rest[..idx], delimiter);
                prefixes.insert(common);
            } else {
                objects.push(entry);
            }
        }
        Ok(ListResult {
            objects,
            delimited_prefixes: prefixes.into_iter().collect(),
            truncated: result.more,
            cursor: if result.more { next_cursor } else { None },
        })
    }

    pub async fn create_multipart_upload(&self, key: &str) -> BindingResult<String> {
        validate_key(key)?;
        let upload_id = ids::new_entity_id();
        let store = self.store.clone();
        let bucket = self.name.clone();
        let key = key.to_string();
        let created_at = self.clock.epoch_seconds() as i64;
        let upload_id_owned = upload_id.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            es_store::objects::create_multipart_upload(&conn, &upload_id_owned, &bucket, &key, created_at)?;
            Ok::<_, BindingError>(())
        })
        .await??;
        Ok(upload_id)
    }

    pub async fn upload_part(&self, upload_id: &str, part_number: u32, value: Vec<u8>) -> BindingResult<(u32, String)> {
        let upload = self.get_live_upload(upload_id).await?;
        let etag = content_etag(&value);
        let temp_path = self.store.layout().root().join("r2").join(".multipart").join(format!("{upload_id}-{part_number}"));
        if let Some(parent) = temp_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| BindingError::FatalBinding(e.to_string()))?;
        }
        tokio::fs::write(&temp_path, &value).await.map_err(|e| BindingError::FatalBinding(e.to_string()))?;

        let store = self.store.clone();
        let upload_id_owned = upload_id.to_string();
        let temp_path_str = temp_path.to_string_lossy().into_owned();
        let etag_owned = etag.clone();
        let size = value.len() as i64;
        tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            es_store::objects::put_part(&conn, &upload_id_owned, part_number, &etag_owned, &temp_path_str, size)?;
            Ok::<_, BindingError>(())
        })
        .await??;
        let _ = upload;
        Ok((part_number, etag))
    }

    pub async fn complete_multipart_upload(&self, upload_id: &str, parts: &[(u32, String)]) -> BindingResult<ObjectRow> {
        let upload = self.get_live_upload(upload_id).await?;
        let stored_parts = self.list_parts(upload_id).await?;
        let by_number: std::collections::HashMap<u32, &PartRow> = stored_parts.iter().map(|p| (p.part_number, p)).collect();

        let mut body = Vec::new();
        for (number, expected_etag) in parts {
            let part = by_number.get(number).ok_or_else(|| BindingError::NotFound(format!("part {number}")))?;
            if &part.etag != expected_etag {
                return Err(BindingError::PreconditionFailed(format!("etag mismatch on part {number}")));
            }
            let chunk = tokio::fs::read(&part.temp_path).await.map_err(|e| BindingError::FatalBinding(e.to_string()))?;
            body.extend_from_slice(&chunk);
        }

        let row = self.put(&upload.key, body, PutOptions::default()).await?
            .ok_or_else(|| BindingError::FatalBinding("multipart completion put was unexpectedly conditional".into()))?;

        let store = self.store.clone();
        let upload_id_owned = upload_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            es_store::objects::mark_upload_completed(&conn, &upload_id_owned)?;
            Ok::<_, BindingError>(())
        })
        .await??;
        self.remove_temp_parts(upload_id, &stored_parts).await;
        Ok(row)
    }

    pub async fn abort_multipart_upload(&self, upload_id: &str) -> BindingResult<()> {
        let _upload = self.get_live_upload(upload_id).await?;
        let parts = self.list_parts(upload_id).await?;
        let store = self.store.clone();
        let upload_id_owned = upload_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            es_store::objects::mark_upload_aborted(&conn, &upload_id_owned)?;
            es_store::objects::delete_parts(&conn, &upload_id_owned)?;
            Ok::<_, BindingError>(())
        })
        .await??;
        self.remove_temp_parts(upload_id, &parts).await;
        Ok(())
    }

    async fn list_parts(&self, upload_id: &str) -> BindingResult<Vec<PartRow>> {
        let store = self.store.clone();
        let upload_id_owned = upload_id.to_string();
        tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            es_store::objects::list_parts(&conn, &upload_id_owned).map_err(BindingError::from)
        })
        .await?
    }

    async fn get_live_upload(&self, upload_id: &str) -> BindingResult<es_store::objects::UploadRow> {
        let store = self.store.clone();
        let upload_id_owned = upload_id.to_string();
        let upload = tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            es_store::objects::get_upload(&conn, &upload_id_owned).map_err(BindingError::from)
        })
        .await??
        .ok_or_else(|| BindingError::NotFound(format!("multipart upload {upload_id}")))?;
        if upload.aborted || upload.completed {
            return Err(BindingError::Validation(format!("multipart upload {upload_id} is no longer active")));
        }
        Ok(upload)
    }

    async fn remove_temp_parts(&self, _upload_id: &str, parts: &[PartRow]) {
        for part in parts {
            let _ = tokio::fs::remove_file(&part.temp_path).await;
        }
    }
}

fn slice_range(full: &[u8], range: Range) -> BindingResult<(Vec<u8>, Option<ServedRange>)> {
    let total = full.len() as u64;
    let (offset, length) = match range {
        Range::Suffix { suffix } => {
            let offset = total.saturating_sub(suffix);
            (offset, total - offset)
        }
        Range::Offset { offset, length } => {
            if offset > total {
                return Err(BindingError::Validation("range offset beyond object size".into()));
            }
            let length = length.unwrap_or(total - offset).min(total - offset);
            (offset, length)
        }
    };
    let start = offset as usize;
    let end = (offset + length) as usize;
    Ok((full[start..end].to_vec(), Some(ServedRange { offset, length })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use es_core::FakeClock;

    fn bucket() -> (tempfile::TempDir, Bucket<FakeClock>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let clock = Arc::new(FakeClock::new());
        (dir, Bucket::new(store, "b", clock))
    }

    #[tokio::test]
    async fn put_then_get_round_trips_body() {
        let (_dir, bucket) = bucket();
        bucket.put("k", b"hello".to_vec(), PutOptions::default()).await.unwrap();
        let fetched = bucket.get("k", GetOptions::default()).await.unwrap().unwrap();
        assert_eq!(fetched.body.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn conditional_put_returns_none_on_mismatch() {
        let (_dir, bucket) = bucket();
        let first = bucket.put("k", b"v1".to_vec(), PutOptions::default()).await.unwrap().unwrap();
        let result = bucket
            .put("k", b"v2".to_vec(), PutOptions { only_if: Some(OnlyIf { etag_matches: Some("nope".into()), ..Default::default() }), ..Default::default() })
            .await
            .unwrap();
        assert!(result.is_none());
        let still = bucket.head("k").await.unwrap().unwrap();
        assert_eq!(still.etag, first.etag);
    }

    #[tokio::test]
    async fn range_get_returns_suffix() {
        let (_dir, bucket) = bucket();
        bucket.put("k", b"0123456789".to_vec(), PutOptions::default()).await.unwrap();
        let fetched = bucket.get("k", GetOptions { range: Some(Range::Suffix { suffix: 3 }), ..Default::default() }).await.unwrap().unwrap();
        assert_eq!(fetched.body.unwrap(), b"789");
    }

    #[tokio::test]
    async fn list_with_delimiter_groups_common_prefixes() {
        let (_dir, bucket) = bucket();
        for k in ["a/1", "a/2", "b"] {
            bucket.put(k, b"x".to_vec(), PutOptions::default()).await.unwrap();
        }
        let result = bucket.list(ListOptions { delimiter: Some("/".to_string()), ..Default::default() }).await.unwrap();
        assert_eq!(result.objects.iter().map(|o| o.key.as_str()).collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(result.delimited_prefixes, vec!["a/".to_string()]);
    }

    #[tokio::test]
    async fn batch_delete_rejects_first_traversal_key_before_deleting_anything() {
        let (_dir, bucket) = bucket();
        bucket.put("ok", b"v".to_vec(), PutOptions::default()).await.unwrap();
        let result = bucket.delete_many(&["../escape".to_string(), "ok".to_string()]).await;
        assert!(matches!(result, Err(BindingError::Store(_))));
        assert!(bucket.head("ok").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn batch_delete_rejects_batches_over_the_configured_cap() {
        let (_dir, bucket) = bucket();
        let bucket = bucket.with_max_batch_delete_keys(3);
        let keys = ["a", "b", "c", "d"].map(String::from);
        let result = bucket.delete_many(&keys).await;
        assert!(matches!(result, Err(BindingError::Validation(_))));
    }

    #[tokio::test]
    async fn batch_delete_removes_every_key() {
        let (_dir, bucket) = bucket();
        for k in ["a", "b"] {
            bucket.put(k, b"v".to_vec(), PutOptions::default()).await.unwrap();
        }
        let removed = bucket.delete_many(&["a".to_string(), "b".to_string(), "c".to_string()]).await.unwrap();
        assert_eq!(removed, vec![true, true, false]);
    }

    #[tokio::test]
    async fn multipart_upload_concatenates_parts_in_order() {
        let (_dir, bucket) = bucket();
        let upload_id = bucket.create_multipart_upload("k").await.unwrap();
        let (_, etag2) = bucket.upload_part(&upload_id, 2, b"world".to_vec()).await.unwrap();
        let (_, etag1) = bucket.upload_part(&upload_id, 1, b"hello".to_vec()).await.unwrap();
        let row = bucket.complete_multipart_upload(&upload_id, &[(1, etag1), (2, etag2)]).await.unwrap();
        assert_eq!(row.size, 10);
        let fetched = bucket.get("k", GetOptions::default()).await.unwrap().unwrap();
        assert_eq!(fetched.body.unwrap(), b"helloworld");
    }

    #[tokio::test]
    async fn operations_on_aborted_upload_fail() {
        let (_dir, bucket) = bucket();
        let upload_id = bucket.create_multipart_upload("k").await.unwrap();
        bucket.abort_multipart_upload(&upload_id).await.unwrap();
        let result = bucket.upload_part(&upload_id, 1, b"x".to_vec()).await;
        assert!(matches!(result, Err(BindingError::Validation(_))));
    }
}
