//! Annotation sources consulted for each target.

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;
use targetyx_common::{Result, RetryConfig, TargetyxError};
use targetyx_sources::opentargets::{DEFAULT_DATASOURCE_IDS, DEFAULT_EVIDENCE_SIZE};
use targetyx_sources::{CachedSession, OpenTargetsClient, PharosClient};

use crate::record::SourceName;

/// Produces one source's payload for a (target, disease) pair.
pub trait AnnotationSource {
    fn name(&self) -> SourceName;

    fn fetch(&self, ensembl_id: &str, disease_code: &str) -> Result<Value>;
}

/// Open Targets target, Open Targets disease evidence and Pharos, sharing
/// one session.
pub fn default_sources(session: Rc<CachedSession>, retry: RetryConfig) -> Vec<Box<dyn AnnotationSource>> {
    vec![
        Box::new(OpenTargetsTargetSource::new(
            OpenTargetsClient::new(session.clone()).with_retry(retry),
        )),
        Box::new(OpenTargetsEvidenceSource::new(
            OpenTargetsClient::new(session.clone()).with_retry(retry),
        )),
        Box::new(PharosTargetSource::new(PharosClient::new(session).with_retry(retry))),
    ]
}

// ── Adapters for the provider clients ──────────────────────────────────────

pub struct OpenTargetsTargetSource {
    client: OpenTargetsClient,
}

impl OpenTargetsTargetSource {
    pub fn new(client: OpenTargetsClient) -> Self {
        Self { client }
    }
}

impl AnnotationSource for OpenTargetsTargetSource {
    fn name(&self) -> SourceName {
        SourceName::OpenTargets
    }

    fn fetch(&self, ensembl_id: &str, _disease_code: &str) -> Result<Value> {
        self.client.target_annotation(ensembl_id)
    }
}

pub struct OpenTargetsEvidenceSource {
    client: OpenTargetsClient,
    datasource_ids: Vec<String>,
    size: u32,
}

impl OpenTargetsEvidenceSource {
    pub fn new(client: OpenTargetsClient) -> Self {
        Self {
            client,
            datasource_ids: DEFAULT_DATASOURCE_IDS.iter().map(|s| s.to_string()).collect(),
            size: DEFAULT_EVIDENCE_SIZE,
        }
    }

    pub fn with_datasources(mut self, datasource_ids: Vec<String>) -> Self {
        self.datasource_ids = datasource_ids;
        self
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }
}

impl AnnotationSource for OpenTargetsEvidenceSource {
    fn name(&self) -> SourceName {
        SourceName::OpenTargetsDiseaseEvidence
    }

    fn fetch(&self, ensembl_id: &str, disease_code: &str) -> Result<Value> {
        let ids: Vec<&str> = self.datasource_ids.iter().map(String::as_str).collect();
        self.client
            .target_disease_evidences(disease_code, ensembl_id, &ids, self.size)
    }
}

pub struct PharosTargetSource {
    client: PharosClient,
}

impl PharosTargetSource {
    pub fn new(client: PharosClient) -> Self {
        Self { client }
    }
}

impl AnnotationSource for PharosTargetSource {
    fn name(&self) -> SourceName {
        SourceName::Pharos
    }

    fn fetch(&self, ensembl_id: &str, _disease_code: &str) -> Result<Value> {
        self.client.target_annotation(ensembl_id)
    }
}

// ── Mock Implementation for Testing ────────────────────────────────────────

#[derive(Debug, Clone)]
enum MockReply {
    Payload(Value),
    Empty,
    Shape,
    Status(u16),
}

/// Source answering from a fixed table. Unknown targets get an empty
/// response.
pub struct MockAnnotationSource {
    name: SourceName,
    replies: HashMap<String, MockReply>,
    calls: Rc<Cell<usize>>,
}

impl MockAnnotationSource {
    pub fn new(name: SourceName) -> Self {
        Self {
            name,
            replies: HashMap::new(),
            calls: Rc::new(Cell::new(0)),
        }
    }

    pub fn with(mut self, target: &str, payload: Value) -> Self {
        self.replies.insert(target.to_string(), MockReply::Payload(payload));
        self
    }

    /// Fail `target` with a non-recoverable bad-status error.
    pub fn with_status(mut self, target: &str, status: u16) -> Self {
        self.replies.insert(target.to_string(), MockReply::Status(status));
        self
    }

    pub fn with_empty(mut self, target: &str) -> Self {
        self.replies.insert(target.to_string(), MockReply::Empty);
        self
    }

    /// Answer `target` with a payload missing its expected fields.
    pub fn with_shape(mut self, target: &str) -> Self {
        self.replies.insert(target.to_string(), MockReply::Shape);
        self
    }

    /// Shared call counter; stays valid after the source is boxed.
    pub fn calls(&self) -> Rc<Cell<usize>> {
        self.calls.clone()
    }
}

impl AnnotationSource for MockAnnotationSource {
    fn name(&self) -> SourceName {
        self.name
    }

    fn fetch(&self, ensembl_id: &str, _disease_code: &str) -> Result<Value> {
        self.calls.set(self.calls.get() + 1);
        match self.replies.get(ensembl_id).cloned().unwrap_or(MockReply::Empty) {
            MockReply::Payload(v) => Ok(v),
            MockReply::Empty => Err(TargetyxError::EmptyResponse {
                provider: self.name.key().to_string(),
                input: ensembl_id.to_string(),
            }),
            MockReply::Shape => Err(TargetyxError::ResponseShape(format!(
                "{} payload for {} has an unexpected layout",
                self.name.key(),
                ensembl_id
            ))),
            MockReply::Status(status) => Err(TargetyxError::InvalidStatusCode {
                status,
                body: String::new(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use targetyx_sources::{HttpResponse, MockTransport, RequestBody};

    #[test]
    fn test_default_sources_cover_every_source_name() {
        let session = CachedSession::mocked(MockTransport::new());
        let names: Vec<SourceName> = default_sources(session, RetryConfig::default())
            .iter()
            .map(|s| s.name())
            .collect();
        assert_eq!(names, SourceName::ALL.to_vec());
    }

    #[test]
    fn test_evidence_source_sends_disease_and_datasources() {
        let mock = MockTransport::new().route(
            "opentargets",
            HttpResponse::ok_json(&json!({"data": {"disease": {"id": "EFO_0001378"}}})),
        );
        let log = mock.log();
        let client = OpenTargetsClient::new(CachedSession::mocked(mock))
            .with_retry(RetryConfig::new(1, 0.0).unwrap());
        let source = OpenTargetsEvidenceSource::new(client).with_size(100);

        let payload = source.fetch("ENSG00000149554", "EFO_0001378").unwrap();
        assert_eq!(payload["id"], "EFO_0001378");

        let RequestBody::Json(body) = &log.requests()[0].body else {
            panic!("expected JSON body");
        };
        assert_eq!(body["variables"]["datasourceIds"], json!(["europepmc"]));
        assert_eq!(body["variables"]["size"], 100);
    }

    #[test]
    fn test_mock_source_replies() {
        let mock = MockAnnotationSource::new(SourceName::Pharos)
            .with("ENSG00000149554", json!({"sym": "CHEK1"}))
            .with_status("ENSG00000000001", 500)
            .with_shape("ENSG00000000003");
        let calls = mock.calls();

        let err = mock.fetch("ENSG00000000003", "EFO_0001378").unwrap_err();
        assert!(matches!(err, TargetyxError::ResponseShape(_)));
        assert!(err.is_recoverable_per_target());

        assert!(mock.fetch("ENSG00000149554", "EFO_0001378").is_ok());
        assert!(mock
            .fetch("ENSG00000000002", "EFO_0001378")
            .unwrap_err()
            .is_recoverable_per_target());
        assert!(!mock
            .fetch("ENSG00000000001", "EFO_0001378")
            .unwrap_err()
            .is_recoverable_per_target());
        assert_eq!(calls.get(), 4);
    }
}
