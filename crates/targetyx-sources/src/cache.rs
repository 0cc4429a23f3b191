//! Response cache.
//!
//! Responses are keyed by a SHA-256 digest of method, URL and body, and kept
//! for a fixed time-to-live (30 days by default). The SQLite store is shared
//! by every process pointed at the same file; whichever process refreshed a
//! key last wins.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use targetyx_common::{Result, TargetyxError};
use tracing::debug;

use crate::transport::{HttpRequest, HttpResponse};

pub const DEFAULT_EXPIRE_AFTER_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_request(request: &HttpRequest) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(request.method.as_str().as_bytes());
        hasher.update(b"\n");
        hasher.update(request.url.as_bytes());
        hasher.update(b"\n");
        hasher.update(request.body.signature().as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Key/value store for HTTP responses.
pub trait ResponseCache {
    fn get(&self, key: &CacheKey) -> Result<Option<HttpResponse>>;

    fn put(&self, key: &CacheKey, response: &HttpResponse) -> Result<()>;

    /// Serve `key` from the cache, or call `fetch` and store the result when
    /// it has status 200. The flag is `true` on a cache hit.
    fn get_or_fetch(
        &self,
        key: &CacheKey,
        fetch: &mut dyn FnMut() -> Result<HttpResponse>,
    ) -> Result<(HttpResponse, bool)> {
        if let Some(hit) = self.get(key)? {
            return Ok((hit, true));
        }
        let response = fetch()?;
        if response.has_valid_status() {
            self.put(key, &response)?;
        }
        Ok((response, false))
    }
}

// ── SQLite store ─────────────────────────────────────────────────────────────

pub struct SqliteCache {
    conn: Connection,
    path: PathBuf,
    expire_after: Duration,
}

fn cache_err(e: rusqlite::Error) -> TargetyxError {
    TargetyxError::Cache(e.to_string())
}

impl SqliteCache {
    /// `<user cache dir>/targetyx/http_cache.sqlite`
    pub fn default_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("targetyx")
            .join("http_cache.sqlite")
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path())
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_expiry(path, Duration::days(DEFAULT_EXPIRE_AFTER_DAYS))
    }

    pub fn open_with_expiry<P: AsRef<Path>>(path: P, expire_after: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&path).map_err(cache_err)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
            .map_err(cache_err)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS responses (
                cache_key   TEXT PRIMARY KEY,
                status      INTEGER NOT NULL,
                body        BLOB NOT NULL,
                created_at  INTEGER NOT NULL,
                expires_at  INTEGER NOT NULL
            );
            "#,
        )
        .map_err(cache_err)?;
        debug!(path = %path.display(), "Opened response cache");
        Ok(Self { conn, path, expire_after })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> Result<usize> {
        self.conn
            .execute(
                "DELETE FROM responses WHERE expires_at <= ?1",
                params![Utc::now().timestamp()],
            )
            .map_err(cache_err)
    }

    pub fn clear(&self) -> Result<usize> {
        self.conn.execute("DELETE FROM responses", []).map_err(cache_err)
    }

    pub fn len(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM responses", [], |row| row.get(0))
            .map_err(cache_err)?;
        Ok(n as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl ResponseCache for SqliteCache {
    fn get(&self, key: &CacheKey) -> Result<Option<HttpResponse>> {
        let row: Option<(i64, Vec<u8>, i64)> = self
            .conn
            .query_row(
                "SELECT status, body, expires_at FROM responses WHERE cache_key = ?1",
                params![key.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(cache_err)?;

        match row {
            Some((_, _, expires_at)) if expires_at <= Utc::now().timestamp() => {
                self.conn
                    .execute("DELETE FROM responses WHERE cache_key = ?1", params![key.as_str()])
                    .map_err(cache_err)?;
                Ok(None)
            }
            Some((status, body, _)) => Ok(Some(HttpResponse::new(status as u16, body))),
            None => Ok(None),
        }
    }

    fn put(&self, key: &CacheKey, response: &HttpResponse) -> Result<()> {
        let now = Utc::now();
        let expires_at = now.checked_add_signed(self.expire_after).ok_or_else(|| {
            TargetyxError::Cache(format!("expiry of {} overflows the calendar", self.expire_after))
        })?;
        self.conn
            .execute(
                "INSERT INTO responses (cache_key, status, body, created_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(cache_key) DO UPDATE SET
                    status=excluded.status, body=excluded.body,
                    created_at=excluded.created_at, expires_at=excluded.expires_at",
                params![
                    key.as_str(),
                    response.status as i64,
                    response.body,
                    now.timestamp(),
                    expires_at.timestamp()
                ],
            )
            .map_err(cache_err)?;
        Ok(())
    }
}

// ── In-process stores ───────────────────────────────────────────────────────

/// Non-persistent cache, useful for tests and one-shot runs.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RefCell<HashMap<CacheKey, HttpResponse>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl ResponseCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Result<Option<HttpResponse>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn put(&self, key: &CacheKey, response: &HttpResponse) -> Result<()> {
        self.entries.borrow_mut().insert(key.clone(), response.clone());
        Ok(())
    }
}

/// Always misses.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl ResponseCache for NoCache {
    fn get(&self, _key: &CacheKey) -> Result<Option<HttpResponse>> {
        Ok(None)
    }

    fn put(&self, _key: &CacheKey, _response: &HttpResponse) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: serde_json::Value) -> HttpRequest {
        HttpRequest::post_json("https://api.platform.opentargets.org/api/v4/graphql", body)
    }

    #[test]
    fn test_key_depends_on_method_url_and_body() {
        let a = CacheKey::for_request(&request(json!({"ensemblId": "ENSG00000149554"})));
        let b = CacheKey::for_request(&request(json!({"ensemblId": "ENSG00000149554"})));
        let c = CacheKey::for_request(&request(json!({"ensemblId": "ENSG00000141510"})));
        let d = CacheKey::for_request(&HttpRequest::get(
            "https://api.platform.opentargets.org/api/v4/graphql",
        ));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_get_or_fetch_stores_only_success() {
        let cache = MemoryCache::new();
        let key = CacheKey::for_request(&request(json!({})));

        let mut calls = 0;
        let (resp, hit) = cache
            .get_or_fetch(&key, &mut || {
                calls += 1;
                Ok(HttpResponse::new(500, "boom"))
            })
            .unwrap();
        assert_eq!(resp.status, 500);
        assert!(!hit);
        assert!(cache.is_empty());

        let (_, hit) = cache
            .get_or_fetch(&key, &mut || {
                calls += 1;
                Ok(HttpResponse::new(200, "ok"))
            })
            .unwrap();
        assert!(!hit);

        let (resp, hit) = cache
            .get_or_fetch(&key, &mut || {
                calls += 1;
                Ok(HttpResponse::new(200, "fresh"))
            })
            .unwrap();
        assert!(hit);
        assert_eq!(resp.text(), "ok");
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_sqlite_persists_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("http_cache.sqlite");
        let key = CacheKey::for_request(&request(json!({"q": 1})));

        {
            let cache = SqliteCache::open(&path).unwrap();
            cache.put(&key, &HttpResponse::new(200, "payload")).unwrap();
            assert_eq!(cache.len().unwrap(), 1);
        }

        let reopened = SqliteCache::open(&path).unwrap();
        let hit = reopened.get(&key).unwrap().unwrap();
        assert_eq!(hit.status, 200);
        assert_eq!(hit.text(), "payload");

        assert_eq!(reopened.clear().unwrap(), 1);
        assert!(reopened.is_empty().unwrap());
    }

    #[test]
    fn test_sqlite_expired_entries_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache =
            SqliteCache::open_with_expiry(dir.path().join("c.sqlite"), Duration::seconds(-1)).unwrap();
        let key = CacheKey::for_request(&request(json!({"q": 2})));
        cache.put(&key, &HttpResponse::new(200, "stale")).unwrap();

        assert!(cache.get(&key).unwrap().is_none());
        assert_eq!(cache.len().unwrap(), 0);

        cache.put(&key, &HttpResponse::new(200, "stale")).unwrap();
        assert_eq!(cache.purge_expired().unwrap(), 1);
    }

    #[test]
    fn test_sqlite_put_with_unrepresentable_expiry_errors() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SqliteCache::open_with_expiry(dir.path().join("c.sqlite"), Duration::MAX).unwrap();
        let key = CacheKey::for_request(&request(json!({"q": 3})));
        let err = cache.put(&key, &HttpResponse::new(200, "x")).unwrap_err();
        assert!(matches!(err, TargetyxError::Cache(_)));
        assert_eq!(cache.len().unwrap(), 0);
    }

    #[test]
    fn test_no_cache_always_fetches() {
        let key = CacheKey::for_request(&request(json!({})));
        let mut calls = 0;
        for _ in 0..2 {
            let (_, hit) = NoCache
                .get_or_fetch(&key, &mut || {
                    calls += 1;
                    Ok(HttpResponse::new(200, "x"))
                })
                .unwrap();
            assert!(!hit);
        }
        assert_eq!(calls, 2);
    }
}
