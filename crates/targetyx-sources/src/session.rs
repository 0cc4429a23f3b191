use std::rc::Rc;
use std::time::Duration;

use targetyx_common::Result;
use tracing::debug;

use crate::cache::{CacheKey, MemoryCache, NoCache, ResponseCache, SqliteCache};
use crate::transport::{HttpRequest, HttpResponse, MockTransport, SandboxTransport, Transport};

/// Transport with a response cache in front of it. Clients hold it behind
/// an `Rc` so one session serves a whole run.
pub struct CachedSession {
    transport: Box<dyn Transport>,
    cache: Box<dyn ResponseCache>,
}

impl CachedSession {
    pub fn new(transport: Box<dyn Transport>, cache: Box<dyn ResponseCache>) -> Self {
        Self { transport, cache }
    }

    /// Live network with the persistent cache at its default location.
    pub fn live(timeout: Option<Duration>) -> Result<Rc<Self>> {
        Ok(Rc::new(Self::new(
            Box::new(SandboxTransport::new(timeout)?),
            Box::new(SqliteCache::open_default()?),
        )))
    }

    /// Live network without caching.
    pub fn uncached(timeout: Option<Duration>) -> Result<Rc<Self>> {
        Ok(Rc::new(Self::new(
            Box::new(SandboxTransport::new(timeout)?),
            Box::new(NoCache),
        )))
    }

    /// Mocked network with an in-memory cache.
    pub fn mocked(transport: MockTransport) -> Rc<Self> {
        Rc::new(Self::new(Box::new(transport), Box::new(MemoryCache::new())))
    }

    /// Send `request`, serving it from the cache when possible. Cache hits
    /// skip the transport but are otherwise indistinguishable to callers.
    pub fn send(&self, request: &HttpRequest) -> Result<(HttpResponse, bool)> {
        let key = CacheKey::for_request(request);
        let (response, was_cached) = self
            .cache
            .get_or_fetch(&key, &mut || self.transport.execute(request))?;
        if was_cached {
            debug!(url = %request.url, "Served from cache");
        }
        Ok((response, was_cached))
    }

    /// Send `request` directly, skipping the cache.
    pub fn send_uncached(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.transport.execute(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_second_identical_request_is_cached() {
        let mock = MockTransport::new().route("/graphql", HttpResponse::ok_json(&json!({"data": {}})));
        let log = mock.log();
        let session = CachedSession::mocked(mock);
        let req = HttpRequest::post_json("https://pharos-api.ncats.io/graphql", json!({"q": 1}));

        let (_, first) = session.send(&req).unwrap();
        let (_, second) = session.send(&req).unwrap();
        assert!(!first);
        assert!(second);
        assert_eq!(log.count(), 1);

        session.send_uncached(&req).unwrap();
        assert_eq!(log.count(), 2);
    }

    #[test]
    fn test_failed_status_is_not_cached() {
        let mock = MockTransport::new().route("/graphql", HttpResponse::new(502, "bad gateway"));
        let log = mock.log();
        let session = CachedSession::mocked(mock);
        let req = HttpRequest::post_json("https://pharos-api.ncats.io/graphql", json!({"q": 1}));

        session.send(&req).unwrap();
        session.send(&req).unwrap();
        assert_eq!(log.count(), 2);
    }
}
