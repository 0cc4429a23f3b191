//! GraphQL submission shared by the Open Targets and Pharos clients.

use serde_json::{json, Map, Value};
use targetyx_common::{Result, RetryConfig, Retryer, TargetyxError};
use tracing::debug;

use crate::session::CachedSession;
use crate::transport::HttpRequest;

/// A query template plus its variable bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphQlQuery {
    query: String,
    variables: Map<String, Value>,
}

impl GraphQlQuery {
    pub fn new(query: impl Into<String>, variables: Map<String, Value>) -> Self {
        Self { query: query.into(), variables }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn variables(&self) -> &Map<String, Value> {
        &self.variables
    }

    pub fn to_body(&self) -> Value {
        json!({ "query": self.query, "variables": self.variables })
    }
}

/// POST `query` to `endpoint` under the retry policy and return the
/// response's `data` member (`Null` when absent). A non-200 status is
/// retried and, once retries run out, returned as `InvalidStatusCode`.
pub fn submit(
    session: &CachedSession,
    endpoint: &str,
    query: &GraphQlQuery,
    retry: RetryConfig,
) -> Result<Value> {
    let request = HttpRequest::post_json(endpoint, query.to_body());
    let mut retryer = Retryer::new(retry)?;

    retryer.run(|| {
        let (response, was_cached) = session.send(&request)?;
        let response = response.ensure_valid_status()?;
        debug!(endpoint, was_cached, bytes = response.body.len(), "GraphQL response");
        let mut payload: Value = response.json()?;
        Ok(payload
            .get_mut("data")
            .map(Value::take)
            .unwrap_or(Value::Null))
    })
}

/// Pull `key` out of a `data` object. Null or absent is an empty response
/// for `input`; anything other than an object is a shape error.
pub fn extract_object(data: &Value, key: &str, provider: &str, input: &str) -> Result<Value> {
    match data.get(key) {
        None | Some(Value::Null) => Err(TargetyxError::EmptyResponse {
            provider: provider.to_string(),
            input: input.to_string(),
        }),
        Some(obj @ Value::Object(_)) => Ok(obj.clone()),
        Some(other) => Err(TargetyxError::ResponseShape(format!(
            "{} `{}` for {} is not an object: {}",
            provider,
            key,
            input,
            type_name(other)
        ))),
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
