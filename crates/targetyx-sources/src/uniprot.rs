use std::rc::Rc;
use std::time::Duration;

use serde::Deserialize;
use targetyx_common::Result;
use tracing::{instrument, warn};

use crate::session::CachedSession;
use crate::transport::HttpRequest;

pub const UNIPROT_URL: &str = "https://rest.uniprot.org/uniprotkb";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Cross-reference databases that carry the Ensembl gene id.
const ENSEMBL_XREF_DATABASES: &[&str] = &["OpenTargets", "HPA"];

#[derive(Debug, Deserialize)]
struct UniProtEntry {
    #[serde(rename = "uniProtKBCrossReferences", default)]
    cross_references: Vec<CrossReference>,
}

#[derive(Debug, Deserialize)]
struct CrossReference {
    database: String,
    id: String,
}

pub struct UniProtClient {
    session: Rc<CachedSession>,
    base_url: String,
}

impl UniProtClient {
    pub fn new(session: Rc<CachedSession>) -> Self {
        Self { session, base_url: UNIPROT_URL.to_string() }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Ensembl gene id for a UniProt accession such as `O14757`.
    ///
    /// Timeouts and entries without an OpenTargets or HPA cross-reference
    /// are logged and yield `None`; other failures propagate.
    #[instrument(skip(self))]
    pub fn ensembl_from_uniprot(&self, accession: &str, timeout: Option<Duration>) -> Result<Option<String>> {
        let url = format!("{}/{}.json", self.base_url, accession);
        let request = HttpRequest::get(url).with_timeout(timeout);

        let response = match self.session.send(&request) {
            Ok((response, _)) => response,
            Err(e) if e.is_timeout() => {
                warn!("{}: Request timed out", accession);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let entry: UniProtEntry = match response.json() {
            Ok(entry) => entry,
            Err(_) => {
                warn!("{}: No ensembl_id from OpenTargets or HPA", accession);
                return Ok(None);
            }
        };

        let ensembl = entry
            .cross_references
            .into_iter()
            .find(|x| ENSEMBL_XREF_DATABASES.contains(&x.database.as_str()))
            .map(|x| x.id);
        if ensembl.is_none() {
            warn!("{}: No ensembl_id from OpenTargets or HPA", accession);
        }
        Ok(ensembl)
    }
}
