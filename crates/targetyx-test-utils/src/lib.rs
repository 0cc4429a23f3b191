//! Shared fixtures for targetyx tests.
//!
//! Payloads are recorded provider responses for CHEK1 (`ENSG00000149554`)
//! and multiple myeloma (`EFO_0001378`), trimmed to the fields the tables use.

use std::rc::Rc;

use serde_json::{json, Value};
use targetyx_common::RetryConfig;
use targetyx_sources::{CachedSession, HttpResponse, MockTransport, RequestLog};

pub use pretty_assertions;
pub use tempfile;

pub const CHEK1: &str = "ENSG00000149554";
pub const MULTIPLE_MYELOMA: &str = "EFO_0001378";

/// Wrong digit count; fails every target validator.
pub const MALFORMED_TARGET: &str = "ENSG0123456791";

fn parse(text: &str) -> Value {
    serde_json::from_str(text).expect("fixture is valid JSON")
}

pub fn ot_target_chek1() -> Value {
    parse(include_str!("../fixtures/ot_target_chek1.json"))
}

pub fn ot_evidence_chek1() -> Value {
    parse(include_str!("../fixtures/ot_evidence_chek1.json"))
}

pub fn pharos_target_chek1() -> Value {
    parse(include_str!("../fixtures/pharos_target_chek1.json"))
}

/// `{"data": {key: payload}}` with status 200.
pub fn graphql_ok(key: &str, payload: Value) -> HttpResponse {
    HttpResponse::ok_json(&json!({ "data": { key: payload } }))
}

/// Retry policy without delay.
pub fn fast_retry(max_tries: u32) -> RetryConfig {
    RetryConfig::new(max_tries, 0.0).expect("valid retry config")
}

/// Transport answering the three annotation queries for CHEK1. Other
/// targets get a null payload, which clients report as empty.
pub fn provider_transport() -> MockTransport {
    MockTransport::new()
        .route_when("opentargets", CHEK1_TARGET_QUERY, graphql_ok("target", ot_target_chek1()))
        .route_when("opentargets", CHEK1_EVIDENCE_QUERY, graphql_ok("disease", ot_evidence_chek1()))
        .route_when("pharos", CHEK1, graphql_ok("target", pharos_target_chek1()))
        .route("opentargets", HttpResponse::ok_json(&json!({"data": {"target": null, "disease": null}})))
        .route("pharos", HttpResponse::ok_json(&json!({"data": {"target": null}})))
}

const CHEK1_TARGET_QUERY: &str = "\"variables\":{\"ensemblId\":\"ENSG00000149554\"}";
const CHEK1_EVIDENCE_QUERY: &str = "\"ensemblIds\":[\"ENSG00000149554\"]";

/// Session over [`provider_transport`] with an in-memory cache, plus the
/// transport's request log.
pub fn provider_session() -> (Rc<CachedSession>, RequestLog) {
    let transport = provider_transport();
    let log = transport.log();
    (CachedSession::mocked(transport), log)
}
