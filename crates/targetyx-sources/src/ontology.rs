//! EBI Ontology Lookup Service: list of known ontology prefixes.

use std::rc::Rc;
use std::time::Duration;

use serde_json::Value;
use targetyx_common::{Result, RetryConfig, Retryer, TargetyxError};
use tracing::{debug, instrument, warn};

use crate::session::CachedSession;
use crate::transport::HttpRequest;

pub const EBI_ONTOLOGY_URL: &str = "https://www.ebi.ac.uk/ols4/api/ontologies?size=1000";

pub struct OntologyClient {
    session: Rc<CachedSession>,
    url: String,
    retry: RetryConfig,
}

impl OntologyClient {
    pub fn new(session: Rc<CachedSession>) -> Self {
        Self {
            session,
            url: EBI_ONTOLOGY_URL.to_string(),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Ontology ids such as `efo`, `mondo` and `ncit`.
    #[instrument(skip(self))]
    pub fn ontology_sources(&self, timeout: Option<Duration>) -> Result<Vec<String>> {
        let request = HttpRequest::get(&self.url).with_timeout(timeout);
        let mut retryer = Retryer::new(self.retry)?;

        retryer.run(|| {
            let (response, _) = self.session.send(&request)?;
            if !response.has_valid_status() {
                warn!(
                    status = response.status,
                    "EBI returned an invalid status code while looking up ontology ids"
                );
            }
            let payload: Value = response.ensure_valid_status()?.json()?;
            let ids = ontology_ids(&payload)?;
            debug!(count = ids.len(), "Found ontology sources");
            Ok(ids)
        })
    }
}

fn ontology_ids(payload: &Value) -> Result<Vec<String>> {
    let ontologies = payload
        .pointer("/_embedded/ontologies")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            TargetyxError::ResponseShape("missing `_embedded.ontologies` in EBI response".to_string())
        })?;

    ontologies
        .iter()
        .map(|o| {
            o.get("ontologyId")
                .and_then(Value::as_str)
                .map(String::from)
                .ok_or_else(|| TargetyxError::ResponseShape("ontology without `ontologyId`".to_string()))
        })
        .collect()
}
