//! Clients against a mocked transport with the on-disk cache.
//!
//! Live checks run with: cargo test --package targetyx-sources --test test_cached_clients -- --ignored --nocapture

use serde_json::json;
use targetyx_common::RetryConfig;
use targetyx_sources::{
    CachedSession, HttpResponse, MockTransport, OpenTargetsClient, PharosClient, SqliteCache,
};

fn ot_payload() -> HttpResponse {
    HttpResponse::ok_json(&json!({
        "data": {"target": {"id": "ENSG00000149554", "approvedSymbol": "CHEK1", "biotype": "protein_coding"}}
    }))
}

fn no_retry() -> RetryConfig {
    RetryConfig::new(1, 0.0).unwrap()
}

#[test]
fn test_disk_cache_shared_between_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("http_cache.sqlite");

    let first = MockTransport::new().route("opentargets", ot_payload());
    let first_log = first.log();
    let session = std::rc::Rc::new(CachedSession::new(
        Box::new(first),
        Box::new(SqliteCache::open(&cache_path).unwrap()),
    ));
    let target = OpenTargetsClient::new(session)
        .with_retry(no_retry())
        .target_annotation("ENSG00000149554")
        .unwrap();
    assert_eq!(target["approvedSymbol"], "CHEK1");
    assert_eq!(first_log.count(), 1);

    // A later invocation with a broken network is served from disk.
    let second = MockTransport::new().route("opentargets", HttpResponse::new(503, "down"));
    let second_log = second.log();
    let session = std::rc::Rc::new(CachedSession::new(
        Box::new(second),
        Box::new(SqliteCache::open(&cache_path).unwrap()),
    ));
    let cached = OpenTargetsClient::new(session)
        .with_retry(no_retry())
        .target_annotation("ENSG00000149554")
        .unwrap();
    assert_eq!(cached, target);
    assert_eq!(second_log.count(), 0);
}

#[test]
fn test_sources_share_one_session() {
    let mock = MockTransport::new()
        .route("opentargets", ot_payload())
        .route(
            "pharos",
            HttpResponse::ok_json(&json!({"data": {"target": {"sym": "CHEK1", "tdl": "Tchem"}}})),
        );
    let log = mock.log();
    let session = CachedSession::mocked(mock);

    let ot = OpenTargetsClient::new(session.clone()).with_retry(no_retry());
    let pharos = PharosClient::new(session).with_retry(no_retry());

    ot.target_annotation("ENSG00000149554").unwrap();
    pharos.target_annotation("ENSG00000149554").unwrap();
    ot.target_annotation("ENSG00000149554").unwrap();

    assert_eq!(log.count_matching("opentargets"), 1);
    assert_eq!(log.count_matching("pharos"), 1);
}

#[test]
#[ignore] // Requires network access
fn test_live_open_targets_chek1() {
    let session = CachedSession::uncached(None).expect("client");
    let target = OpenTargetsClient::new(session)
        .target_annotation("ENSG00000149554")
        .expect("Open Targets request failed");
    println!("{}", serde_json::to_string_pretty(&target["approvedSymbol"]).unwrap());
    assert_eq!(target["id"], "ENSG00000149554");
}
