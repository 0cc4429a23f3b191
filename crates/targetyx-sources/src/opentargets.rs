//! Open Targets Platform GraphQL client.
//!
//! Three queries are exposed: target annotation, targets associated with a
//! disease, and target/disease evidence. Field selections follow the
//! platform's GraphQL browser at
//! <https://api.platform.opentargets.org/api/v4/graphql/browser>.

use std::rc::Rc;

use serde_json::{json, Map, Value};
use targetyx_common::ids::{validate_disease_id, validate_ensembl_id};
use targetyx_common::{Result, RetryConfig, TargetyxError};
use tracing::instrument;

use crate::graphql::{self, GraphQlQuery};
use crate::session::CachedSession;

pub const BASE_URL: &str = "https://api.platform.opentargets.org/api/v4/graphql";

/// Inclusive bounds on the evidence page size.
pub const SIZE_BOUNDS: (u32, u32) = (1, 10000);

pub const DEFAULT_EVIDENCE_SIZE: u32 = 10000;
pub const DEFAULT_DATASOURCE_IDS: &[&str] = &["europepmc"];

const PROVIDER: &str = "OpenTargets";

pub const TARGET_ANNOTATION_QUERY: &str = r#"
query target($ensemblId: String!){
    target(ensemblId: $ensemblId){
        id
        approvedSymbol
        biotype
        proteinIds{
            id
            source
        }
        geneOntology{
            aspect
            evidence
            geneProduct
            source
            term{
                id
                name
            }
        }
        targetClass{
            id
            label
            level
        }
        functionDescriptions
        tractability {
            modality
            label
            value
        }
        geneticConstraint {
            constraintType
            exp
            obs
            score
            oe
            oeLower
            oeUpper
        }
        pathways{
            pathway
            topLevelTerm
        }
        expressions{
            tissue{
                label
            }
            rna{
                value
            }
        }
        associatedDiseases{
            rows{
                score
                disease{
                    id
                    name
                }
            }
        }
        isEssential
        depMapEssentiality{
            tissueId
            tissueName
            screens{
                cellLineName
                depmapId
                diseaseCellLineId
                diseaseFromSource
                expression
                geneEffect
                mutation
            }
        }
        chemicalProbes{
            id
            drugId
        }
        knownDrugs{
            rows{
                prefName
                label
                drugType
                disease{
                    id
                    name
                }
            }
        }
        safetyLiabilities {
            event
            eventId
            biosamples {
                cellFormat
                cellLabel
                tissueLabel
                tissueId
            }
            effects {
                dosing
                direction
            }
            studies {
                name
                type
                description
            }
            datasource
            literature
        }
    }
}
"#;

pub const ASSOCIATED_TARGETS_QUERY: &str = r#"
query associatedTargets($efoId: String!) {
  disease(efoId: $efoId) {
    id
    name
    associatedTargets {
      count
      rows {
        target {
          id
          approvedSymbol
        }
        score
      }
    }
  }
}
"#;

pub const TARGET_DISEASE_EVIDENCE_QUERY: &str = r#"
query targetDiseaseEvidence($efoId: String!, $ensemblIds: [String!]!,
                            $datasourceIds: [String!]!, $size: Int!) {
  disease(efoId: $efoId) {
    id
    name
    evidences(datasourceIds: $datasourceIds, ensemblIds: $ensemblIds, size: $size) {
      count
      rows {
        disease {
          id
          name
        }
        target {
          id
          approvedSymbol
        }
        urls {
          url
          niceName
        }
        diseaseFromSource
        literature
        publicationYear
        datasourceId
        datatypeId
        score
        resourceScore
        textMiningSentences {
          section
          text
        }
        significantDriverMethods
        cohortId
        cohortShortName
        cohortDescription
        mutatedSamples {
          functionalConsequence {
            id
            label
          }
          numberSamplesTested
          numberMutatedSamples
        }
      }
    }
  }
}
"#;

pub struct OpenTargetsClient {
    session: Rc<CachedSession>,
    endpoint: String,
    retry: RetryConfig,
}

impl OpenTargetsClient {
    pub fn new(session: Rc<CachedSession>) -> Self {
        Self {
            session,
            endpoint: BASE_URL.to_string(),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn retry(&self) -> RetryConfig {
        self.retry
    }

    /// Annotation for one target, e.g. `ENSG00000149554`.
    #[instrument(skip(self))]
    pub fn target_annotation(&self, ensembl_id: &str) -> Result<Value> {
        validate_ensembl_id(ensembl_id)?;

        let mut variables = Map::new();
        variables.insert("ensemblId".to_string(), json!(ensembl_id));
        let data = self.query(TARGET_ANNOTATION_QUERY, variables)?;
        graphql::extract_object(&data, "target", PROVIDER, ensembl_id)
    }

    /// Targets associated with a disease, e.g. `EFO_0001378`.
    #[instrument(skip(self))]
    pub fn associated_targets(&self, efo_id: &str) -> Result<Value> {
        validate_disease_id(efo_id)?;

        let mut variables = Map::new();
        variables.insert("efoId".to_string(), json!(efo_id));
        let data = self.query(ASSOCIATED_TARGETS_QUERY, variables)?;
        graphql::extract_object(&data, "disease", PROVIDER, efo_id)
    }

    /// Evidence linking `ensembl_id` to `efo_id` from the given datasources.
    /// `size` must lie within [`SIZE_BOUNDS`].
    #[instrument(skip(self))]
    pub fn target_disease_evidences(
        &self,
        efo_id: &str,
        ensembl_id: &str,
        datasource_ids: &[&str],
        size: u32,
    ) -> Result<Value> {
        validate_disease_id(efo_id)?;
        validate_ensembl_id(ensembl_id)?;
        let (min_size, max_size) = SIZE_BOUNDS;
        if !(min_size..=max_size).contains(&size) {
            return Err(TargetyxError::InvalidQueryParameter(format!(
                "size parameter must be within ({}, {}), got {}",
                min_size, max_size, size
            )));
        }

        let mut variables = Map::new();
        variables.insert("efoId".to_string(), json!(efo_id));
        variables.insert("ensemblIds".to_string(), json!([ensembl_id]));
        variables.insert("datasourceIds".to_string(), json!(datasource_ids));
        variables.insert("size".to_string(), json!(size));
        let data = self.query(TARGET_DISEASE_EVIDENCE_QUERY, variables)?;
        graphql::extract_object(&data, "disease", PROVIDER, &format!("({}, {})", efo_id, ensembl_id))
    }

    /// Submit an arbitrary query; returns the `data` member unchanged.
    pub fn query(&self, query: &str, variables: Map<String, Value>) -> Result<Value> {
        graphql::submit(
            &self.session,
            &self.endpoint,
            &GraphQlQuery::new(query, variables),
            self.retry,
        )
    }
}
