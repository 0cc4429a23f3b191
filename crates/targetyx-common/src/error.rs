use thiserror::Error;

pub type Result<T> = std::result::Result<T, TargetyxError>;

#[derive(Debug, Error)]
pub enum TargetyxError {
    #[error(
        "{0} is an invalid Ensembl gene ID. Please specify an ID with the ENSG prefix \
         followed by 11 digits (see https://www.genecards.org)"
    )]
    InvalidEnsemblId(String),

    #[error(
        "{0} is an invalid disease ID. Please specify an ID with an ontology prefix such \
         as EFO, MONDO, etc. followed by _<digits> (see https://www.ebi.ac.uk/efo/)"
    )]
    InvalidDiseaseId(String),

    #[error("Invalid query parameter: {0}")]
    InvalidQueryParameter(String),

    #[error("Invalid targets: {0}")]
    InvalidTargets(String),

    #[error("Invalid annotation database: {0}")]
    InvalidAnnotationDb(String),

    #[error("Bad status code {status} with response result\n{body}")]
    InvalidStatusCode { status: u16, body: String },

    #[error("{provider} returned an empty response for {input}")]
    EmptyResponse { provider: String, input: String },

    #[error("Unexpected response shape: {0}")]
    ResponseShape(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Network capabilities capped: {0}")]
    Security(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TargetyxError {
    /// Per-target failures the annotation run downgrades to an empty record.
    pub fn is_recoverable_per_target(&self) -> bool {
        matches!(
            self,
            TargetyxError::EmptyResponse { .. } | TargetyxError::ResponseShape(_)
        )
    }

    /// Failures raised before any I/O because an input was malformed.
    pub fn is_input_validation(&self) -> bool {
        matches!(
            self,
            TargetyxError::InvalidEnsemblId(_)
                | TargetyxError::InvalidDiseaseId(_)
                | TargetyxError::InvalidQueryParameter(_)
                | TargetyxError::InvalidTargets(_)
        )
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            TargetyxError::Timeout(_) => true,
            TargetyxError::Http(e) => e.is_timeout(),
            _ => false,
        }
    }
}
