// SPDX-License-Identifier: MIT

//! HTTP response cache binding: `caches.default` and named caches
//! (spec §4.5).

use crate::error::{BindingError, BindingResult};
use es_core::Clock;
use es_store::Store;
use serde_json::Value;
use std::sync::Arc;

pub const MAX_BODY_SIZE: usize = 512 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct CacheRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct CacheResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct MatchOptions {
    pub ignore_method: bool,
}

fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
}

fn parse_cache_control_ttl(value: &str) -> Option<Result<i64, ()>> {
    for directive in value.split(',').map(str::trim) {
        if directive.eq_ignore_ascii_case("no-store") {
            return Some(Err(()));
        }
    }
    let s_maxage = value.split(',').map(str::trim).find_map(|d| d.strip_prefix("s-maxage="));
    let max_age = value.split(',').map(str::trim).find_map(|d| d.strip_prefix("max-age="));
    s_maxage.or(max_age).and_then(|n| n.parse::<i64>().ok()).map(Ok)
}

fn parse_expires(value: &str) -> Option<i64> {
    chrono::DateTime::parse_from_rfc2822(value).ok().map(|dt| dt.timestamp())
}

fn resolve_expires_at<C: Clock>(clock: &C, headers: &[(String, String)]) -> Result<Option<i64>, ()> {
    let now = clock.epoch_seconds() as i64;
    if let Some(cache_control) = header(headers, "cache-control") {
        match parse_cache_control_ttl(cache_control) {
            Some(Err(())) => return Err(()),
            Some(Ok(ttl)) => return Ok(Some(now + ttl)),
            None => {}
        }
    }
    if let Some(expires) = header(headers, "expires") {
        return Ok(parse_expires(expires));
    }
    Ok(None)
}

#[derive(Clone)]
pub struct Cache<C: Clock> {
    store: Store,
    name: String,
    clock: Arc<C>,
}

impl<C: Clock> Cache<C> {
    pub fn new(store: Store, name: impl Into<String>, clock: Arc<C>) -> Self {
        Self { store, name: name.into(), clock }
    }

    /// Returns `Ok(false)` for a silent skip (Set-Cookie present, no-store),
    /// `Err` for a hard validation failure, `Ok(true)` on success.
    pub async fn put(&self, req: &CacheRequest, resp: CacheResponse) -> BindingResult<bool> {
        if !req.method.eq_ignore_ascii_case("GET") {
            return Err(BindingError::Validation("cache put requires a GET request".into()));
        }
        if resp.status == 206 {
            return Err(BindingError::Validation("cannot cache a 206 Partial Content response".into()));
        }
        if header(&resp.headers, "vary").map(|v| v.trim() == "*").unwrap_or(false) {
            return Err(BindingError::Validation("cannot cache a response with Vary: *".into()));
        }
        if header(&resp.headers, "set-cookie").is_some() {
            return Ok(false);
        }
        if resp.body.len() > MAX_BODY_SIZE {
            return Err(BindingError::Validation(format!("body exceeds {MAX_BODY_SIZE} bytes")));
        }

        let expires_at = match resolve_expires_at(self.clock.as_ref(), &resp.headers) {
            Err(()) => return Ok(false),
            Ok(v) => v,
        };

        let headers_map: std::collections::BTreeMap<String, String> = resp.headers.iter().cloned().collect();
        let headers_json = serde_json::to_value(headers_map).unwrap_or(Value::Null);

        let store = self.store.clone();
        let cache_name = self.name.clone();
        let url = req.url.clone();
        let status = resp.status;
        let body = resp.body;
        tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            es_store::cache::put(&conn, &cache_name, &url, status, &headers_json, &body, expires_at)?;
            Ok::<_, BindingError>(())
        })
        .await??;
        Ok(true)
    }

    pub async fn match_(&self, req: &CacheRequest, opts: MatchOptions) -> BindingResult<Option<CacheResponse>> {
        if !opts.ignore_method && !req.method.eq_ignore_ascii_case("GET") {
            return Ok(None);
        }
        let store = self.store.clone();
        let cache_name = self.name.clone();
        let url = req.url.clone();
        let now = self.clock.epoch_seconds() as i64;
        let row = tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            es_store::cache::get(&conn, &cache_name, &url, now).map_err(BindingError::from)
        })
        .await??;
        let Some(row) = row else { return Ok(None) };

        let mut headers: Vec<(String, String)> = row
            .headers
            .as_object()
            .map(|m| m.iter().map(|(k, v)| (k.clone(), v.as_str().unwrap_or_default().to_string())).collect())
            .unwrap_or_default();
        headers.push(("cf-cache-status".to_string(), "HIT".to_string()));

        Ok(Some(CacheResponse { status: row.status, headers, body: row.body }))
    }

    pub async fn delete(&self, req: &CacheRequest, opts: MatchOptions) -> BindingResult<bool> {
        if !opts.ignore_method && !req.method.eq_ignore_ascii_case("GET") {
            return Ok(false);
        }
        let store = self.store.clone();
        let cache_name = self.name.clone();
        let url = req.url.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.conn()?;
            es_store::cache::delete(&conn, &cache_name, &url).map_err(BindingError::from)
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use es_core::FakeClock;

    fn cache() -> (tempfile::TempDir, Cache<FakeClock>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let clock = Arc::new(FakeClock::new());
        (dir, Cache::new(store, "default", clock))
    }

    fn get_req() -> CacheRequest {
        CacheRequest { method: "GET".into(), url: "http://x/a".into(), headers: vec![] }
    }

    #[tokio::test]
    async fn put_then_match_stamps_hit_header() {
        let (_dir, cache) = cache();
        let resp = CacheResponse { status: 200, headers: vec![], body: b"hi".to_vec() };
        assert!(cache.put(&get_req(), resp).await.unwrap());
        let matched = cache.match_(&get_req(), MatchOptions::default()).await.unwrap().unwrap();
        assert!(header(&matched.headers, "cf-cache-status") == Some("HIT"));
    }

    #[tokio::test]
    async fn set_cookie_response_is_silently_skipped() {
        let (_dir, cache) = cache();
        let resp = CacheResponse { status: 200, headers: vec![("set-cookie".into(), "a=b".into())], body: b"hi".to_vec() };
        assert!(!cache.put(&get_req(), resp).await.unwrap());
        assert!(cache.match_(&get_req(), MatchOptions::default()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn partial_content_status_is_rejected() {
        let (_dir, cache) = cache();
        let resp = CacheResponse { status: 206, headers: vec![], body: b"hi".to_vec() };
        let result = cache.put(&get_req(), resp).await;
        assert!(matches!(result, Err(BindingError::Validation(_))));
    }

    #[tokio::test]
    async fn no_store_is_silently_skipped() {
        let (_dir, cache) = cache();
        let resp = CacheResponse { status: 200, headers: vec![("cache-control".into(), "no-store".into())], body: b"hi".to_vec() };
        assert!(!cache.put(&get_req(), resp).await.unwrap());
    }

    #[tokio::test]
    async fn non_get_match_returns_none_unless_ignored() {
        let (_dir, cache) = cache();
        let resp = CacheResponse { status: 200, headers: vec![], body: b"hi".to_vec() };
        cache.put(&get_req(), resp).await.unwrap();
        let mut post_req = get_req();
        post_req.method = "POST".into();
        assert!(cache.match_(&post_req, MatchOptions::default()).await.unwrap().is_none());
        assert!(cache.match_(&post_req, MatchOptions { ignore_method: true }).await.unwrap().is_some());
    }
}
