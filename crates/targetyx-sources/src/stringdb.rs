//! STRING-DB protein interaction client.
//!
//! See <https://string-db.org/help/api/> for the semantics of each method.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use targetyx_common::{Result, RetryConfig, Retryer, TargetyxError};
use tracing::{debug, instrument};

use crate::session::CachedSession;
use crate::transport::{HttpRequest, HttpResponse};

pub const STRING_API_URL: &str = "https://version-12-0.string-db.org/api";

/// NCBI taxonomy id for human.
pub const HUMAN_SPECIES: u32 = 9606;
pub const CALLER_IDENTITY: &str = "targetyx";
pub const REQUIRED_SCORE_BOUNDS: (u32, u32) = (0, 1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    #[default]
    Physical,
    Functional,
}

impl NetworkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkType::Physical   => "physical",
            NetworkType::Functional => "functional",
        }
    }
}

impl FromStr for NetworkType {
    type Err = TargetyxError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "physical" => Ok(NetworkType::Physical),
            "functional" => Ok(NetworkType::Functional),
            other => Err(TargetyxError::InvalidQueryParameter(format!(
                "network type must be \"physical\" or \"functional\", got {:?}",
                other
            ))),
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edge style of a rendered network image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkFlavor {
    #[default]
    Evidence,
    Confidence,
    Actions,
}

impl NetworkFlavor {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkFlavor::Evidence   => "evidence",
            NetworkFlavor::Confidence => "confidence",
            NetworkFlavor::Actions    => "actions",
        }
    }
}

impl FromStr for NetworkFlavor {
    type Err = TargetyxError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "evidence" => Ok(NetworkFlavor::Evidence),
            "confidence" => Ok(NetworkFlavor::Confidence),
            "actions" => Ok(NetworkFlavor::Actions),
            other => Err(TargetyxError::InvalidQueryParameter(format!(
                "network flavor must be evidence, confidence or actions, got {:?}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkParams {
    pub network_type: NetworkType,
    pub required_score: u32,
    /// Interaction partners to add to the query set.
    pub limit: u32,
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self {
            network_type: NetworkType::Physical,
            required_score: 400,
            limit: 10,
        }
    }
}

impl NetworkParams {
    pub fn validate(&self) -> Result<()> {
        let (lo, hi) = REQUIRED_SCORE_BOUNDS;
        if !(lo..=hi).contains(&self.required_score) {
            return Err(TargetyxError::InvalidQueryParameter(format!(
                "required_score must be within ({}, {}), got {}",
                lo, hi, self.required_score
            )));
        }
        Ok(())
    }
}

/// One edge as returned by the JSON `network` and `interaction_partners`
/// methods. Scores are combined (`score`) or per channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringInteraction {
    #[serde(rename = "stringId_A")]
    pub string_id_a: String,
    #[serde(rename = "stringId_B")]
    pub string_id_b: String,
    #[serde(rename = "preferredName_A")]
    pub preferred_name_a: String,
    #[serde(rename = "preferredName_B")]
    pub preferred_name_b: String,
    #[serde(rename = "ncbiTaxonId")]
    pub ncbi_taxon_id: u32,
    pub score: f64,
    #[serde(default)]
    pub nscore: f64,
    #[serde(default)]
    pub fscore: f64,
    #[serde(default)]
    pub pscore: f64,
    #[serde(default)]
    pub ascore: f64,
    #[serde(default)]
    pub escore: f64,
    #[serde(default)]
    pub dscore: f64,
    #[serde(default)]
    pub tscore: f64,
}

pub struct StringDbClient {
    session: Rc<CachedSession>,
    base_url: String,
    retry: RetryConfig,
}

impl StringDbClient {
    pub fn new(session: Rc<CachedSession>) -> Self {
        Self {
            session,
            base_url: STRING_API_URL.to_string(),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Top interaction partners of a single gene, protein name or STRING id.
    #[instrument(skip(self))]
    pub fn interactions(&self, gene: &str, params: &NetworkParams) -> Result<Vec<StringInteraction>> {
        if gene.trim().is_empty() {
            return Err(TargetyxError::InvalidQueryParameter("gene must not be empty".to_string()));
        }
        params.validate()?;

        let form = vec![
            ("identifiers".to_string(), gene.to_string()),
            ("species".to_string(), HUMAN_SPECIES.to_string()),
            ("network_type".to_string(), params.network_type.to_string()),
            ("limit".to_string(), params.limit.to_string()),
            ("required_score".to_string(), params.required_score.to_string()),
            ("caller_identity".to_string(), CALLER_IDENTITY.to_string()),
        ];
        let response = self.post("json", "interaction_partners", form)?;
        Ok(response.json()?)
    }

    /// Interaction network among `genes`, extended by `params.limit` nodes.
    #[instrument(skip(self))]
    pub fn network(&self, genes: &[String], params: &NetworkParams) -> Result<Vec<StringInteraction>> {
        let identifiers = join_identifiers(genes)?;
        params.validate()?;

        let form = vec![
            ("identifiers".to_string(), identifiers),
            ("species".to_string(), HUMAN_SPECIES.to_string()),
            ("network_type".to_string(), params.network_type.to_string()),
            ("required_score".to_string(), params.required_score.to_string()),
            ("add_nodes".to_string(), params.limit.to_string()),
            ("caller_identity".to_string(), CALLER_IDENTITY.to_string()),
        ];
        let response = self.post("json", "network", form)?;
        Ok(response.json()?)
    }

    /// PNG rendering of the network among `genes`.
    #[instrument(skip(self))]
    pub fn network_image(
        &self,
        genes: &[String],
        params: &NetworkParams,
        flavor: NetworkFlavor,
    ) -> Result<Vec<u8>> {
        let identifiers = join_identifiers(genes)?;
        params.validate()?;

        let form = vec![
            ("identifiers".to_string(), identifiers),
            ("species".to_string(), HUMAN_SPECIES.to_string()),
            ("network_type".to_string(), params.network_type.to_string()),
            ("network_flavor".to_string(), flavor.as_str().to_string()),
            ("add_color_nodes".to_string(), params.limit.to_string()),
            ("required_score".to_string(), params.required_score.to_string()),
            ("caller_identity".to_string(), CALLER_IDENTITY.to_string()),
        ];
        let response = self.post("highres_image", "network", form)?;
        Ok(response.body)
    }

    fn post(&self, output_format: &str, method: &str, form: Vec<(String, String)>) -> Result<HttpResponse> {
        let url = format!("{}/{}/{}", self.base_url, output_format, method);
        let request = HttpRequest::post_form(url, form);
        let mut retryer = Retryer::new(self.retry)?;

        retryer.run(|| {
            let (response, was_cached) = self.session.send(&request)?;
            debug!(method, was_cached, "STRING response");
            response.ensure_valid_status()
        })
    }
}

/// STRING separates identifiers with a carriage return.
fn join_identifiers(genes: &[String]) -> Result<String> {
    if genes.is_empty() || genes.iter().any(|g| g.trim().is_empty()) {
        return Err(TargetyxError::InvalidQueryParameter(
            "gene list must be non-empty and contain no blank names".to_string(),
        ));
    }
    Ok(genes.join("\r"))
}
