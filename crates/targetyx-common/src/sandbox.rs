use reqwest::blocking::{Client, ClientBuilder, RequestBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

use crate::error::TargetyxError;

/// Annotation providers the client may talk to.
pub const DEFAULT_ALLOWED_DOMAINS: &[&str] = &[
    "api.platform.opentargets.org", // Open Targets Platform GraphQL
    "pharos-api.ncats.io",          // Pharos GraphQL
    "www.ebi.ac.uk",                // EBI Ontology Lookup Service
    "string-db.org",                // STRING (versioned subdomains included)
    "rest.uniprot.org",             // UniProt REST
];

/// A blocking HTTP client that only allows requests to approved domains.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    /// Client with the default allowlist and no request timeout.
    pub fn new() -> Result<Self, TargetyxError> {
        Self::with_timeout(None)
    }

    pub fn with_timeout(timeout: Option<Duration>) -> Result<Self, TargetyxError> {
        let allowlist = DEFAULT_ALLOWED_DOMAINS
            .iter()
            .map(|d| d.to_string())
            .collect();

        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("targetyx/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// True when the URL's host is an allowlisted domain or a subdomain of one.
    pub fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        self.allowlist.iter().any(|allowed| {
            host == allowed.as_str()
                || host
                    .strip_suffix(allowed.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        })
    }

    pub fn get(&self, url: &str) -> Result<RequestBuilder, TargetyxError> {
        self.request(reqwest::Method::GET, url)
    }

    pub fn post(&self, url: &str) -> Result<RequestBuilder, TargetyxError> {
        self.request(reqwest::Method::POST, url)
    }

    pub fn request(&self, method: reqwest::Method, url: &str) -> Result<RequestBuilder, TargetyxError> {
        if !self.is_allowed(url) {
            return Err(TargetyxError::Security(format!(
                "domain not in allowlist for URL {}",
                url
            )));
        }

        Ok(self.client.request(method, url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_provider_domains() {
        let client = SandboxClient::new().unwrap();
        assert!(client.is_allowed("https://api.platform.opentargets.org/api/v4/graphql"));
        assert!(client.is_allowed("https://pharos-api.ncats.io/graphql"));
        assert!(client.is_allowed("https://version-12-0.string-db.org/api/json/network"));
        assert!(client.is_allowed("https://rest.uniprot.org/uniprotkb/P78508.json"));
    }

    #[test]
    fn test_rejects_unknown_domains() {
        let client = SandboxClient::new().unwrap();
        assert!(!client.is_allowed("https://example.com/graphql"));
        assert!(!client.is_allowed("not a url"));
        assert!(matches!(
            client.post("https://evil-string-db.org/api"),
            Err(TargetyxError::Security(_))
        ));
    }

    #[test]
    fn test_allow_domain_extends_policy() {
        let mut client = SandboxClient::new().unwrap();
        assert!(!client.is_allowed("https://mirror.example.org/graphql"));
        client.allow_domain("mirror.example.org");
        assert!(client.is_allowed("https://mirror.example.org/graphql"));
    }

    #[test]
    fn test_loopback_needs_explicit_opt_in() {
        let mut client = SandboxClient::new().unwrap();
        assert!(!client.is_allowed("http://localhost:8080/graphql"));
        assert!(!client.is_allowed("http://127.0.0.1:8080/graphql"));
        assert!(matches!(
            client.get("http://127.0.0.1:8080/graphql"),
            Err(TargetyxError::Security(_))
        ));

        client.allow_domain("localhost");
        assert!(client.is_allowed("http://localhost:8080/graphql"));
        assert!(!client.is_allowed("http://127.0.0.1:8080/graphql"));
    }
}
