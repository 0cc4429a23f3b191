//! Pharos (NCATS IDG) GraphQL client.

use std::rc::Rc;

use serde_json::{json, Map, Value};
use targetyx_common::ids::validate_ensembl_id;
use targetyx_common::{Result, RetryConfig};
use tracing::instrument;

use crate::graphql::{self, GraphQlQuery};
use crate::session::CachedSession;

pub const BASE_URL: &str = "https://pharos-api.ncats.io/graphql";

const PROVIDER: &str = "Pharos";

pub const TARGET_ANNOTATION_QUERY: &str = r#"
query targetDetails($ensemblId: String!){
  target(q:{stringid: $ensemblId}) {
    name
    preferredSymbol
    tdl
    fam
    sym
    description
    novelty
    pantherClasses {
      name
      pcid
    }
    dto {
      name
      dtoid
    }
    gwas {
      gwasid
      pvalue
      snps {
        name
        value
      }
      trait
    }
    gwasAnalytics {
      associations {
        meanRankScore
        diseaseName
        trait
        efoID
      }
    }
    pathways {
      name
      pwid
      targetCounts {
        name
        value
      }
      type
    }
    diseaseCounts {
      name
      value
    }
    diseases {
      name
      associationCount
      directAssociationCount
      mondoID
      datasource_count
      associations {
        disassid
        type
        name
        did
        evidence
        score
        source
      }
    }
    tissueSpecificity {
      name
      value
    }
    gtex {
      log2foldchange
      tissue
      tpm
    }
    ppis {
      nid
      props {
        name
        value
      }
      type
      target {
        preferredSymbol
      }
    }
    tinx {
      novelty
      score
      disease {
        name
        doid
      }
    }
  }
}
"#;

pub struct PharosClient {
    session: Rc<CachedSession>,
    endpoint: String,
    retry: RetryConfig,
}

impl PharosClient {
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

    #[instrument(skip(self))]
    pub fn target_annotation(&self, ensembl_id: &str) -> Result<Value> {
        validate_ensembl_id(ensembl_id)?;

        let mut variables = Map::new();
        variables.insert("ensemblId".to_string(), json!(ensembl_id));
        let data = self.query(TARGET_ANNOTATION_QUERY, variables)?;
        graphql::extract_object(&data, "target", PROVIDER, ensembl_id)
    }

    pub fn query(&self, query: &str, variables: Map<String, Value>) -> Result<Value> {
        graphql::submit(
            &self.session,
            &self.endpoint,
            &GraphQlQuery::new(query, variables),
            self.retry,
        )
    }
}
