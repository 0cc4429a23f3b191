//! HTTP transport seam.
//!
//! Clients never talk to `reqwest` directly: every request goes through a
//! [`Transport`], so the cache and tests can sit in front of the network.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use targetyx_common::sandbox::SandboxClient;
use targetyx_common::{Result, TargetyxError};
use tracing::debug;

/// Status code every provider must return for a usable response.
pub const VALID_STATUS_CODE: u16 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get  => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
}

impl RequestBody {
    /// Stable textual form of the body, used for cache keys and logging.
    pub fn signature(&self) -> String {
        match self {
            RequestBody::Empty => String::new(),
            RequestBody::Json(value) => value.to_string(),
            RequestBody::Form(pairs) => pairs
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: RequestBody,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            body: RequestBody::Empty,
            timeout: None,
        }
    }

    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            body: RequestBody::Json(body),
            timeout: None,
        }
    }

    pub fn post_form(url: impl Into<String>, pairs: Vec<(String, String)>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            body: RequestBody::Form(pairs),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, body: body.into() }
    }

    /// 200 response with a JSON body.
    pub fn ok_json(body: &Value) -> Self {
        Self::new(VALID_STATUS_CODE, body.to_string())
    }

    pub fn has_valid_status(&self) -> bool {
        self.status == VALID_STATUS_CODE
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Fail with `InvalidStatusCode` unless the status is 200.
    pub fn ensure_valid_status(self) -> Result<Self> {
        if self.has_valid_status() {
            Ok(self)
        } else {
            Err(TargetyxError::InvalidStatusCode {
                status: self.status,
                body: self.text(),
            })
        }
    }
}

/// Executes a single HTTP request.
pub trait Transport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

// ── reqwest-backed transport ─────────────────────────────────────────────────

pub struct SandboxTransport {
    client: SandboxClient,
}

impl SandboxTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        Ok(Self { client: SandboxClient::with_timeout(timeout)? })
    }

    pub fn from_client(client: SandboxClient) -> Self {
        Self { client }
    }
}

impl Transport for SandboxTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let method = match request.method {
            HttpMethod::Get  => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };
        let mut builder = self.client.request(method, &request.url)?;
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(pairs) => builder.form(pairs),
        };
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        debug!(method = request.method.as_str(), url = %request.url, "Sending request");

        let resp = builder.send().map_err(|e| map_send_error(e, &request.url))?;
        let status = resp.status().as_u16();
        let body = resp.bytes().map_err(|e| map_send_error(e, &request.url))?;
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

fn map_send_error(e: reqwest::Error, url: &str) -> TargetyxError {
    if e.is_timeout() {
        TargetyxError::Timeout(url.to_string())
    } else {
        TargetyxError::Http(e)
    }
}

// ── Mock Implementation for Testing ────────────────────────────────────────

/// Shared record of every request a [`MockTransport`] received.
#[derive(Debug, Clone, Default)]
pub struct RequestLog(Rc<RefCell<Vec<HttpRequest>>>);

impl RequestLog {
    pub fn count(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn count_matching(&self, url_fragment: &str) -> usize {
        self.0
            .borrow()
            .iter()
            .filter(|r| r.url.contains(url_fragment))
            .count()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.0.borrow().clone()
    }

    fn push(&self, request: &HttpRequest) {
        self.0.borrow_mut().push(request.clone());
    }
}

type Responder = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse>>;

struct Route {
    url_fragment: String,
    body_fragment: Option<String>,
    responder: Responder,
}

impl Route {
    fn matches(&self, request: &HttpRequest) -> bool {
        request.url.contains(&self.url_fragment)
            && self
                .body_fragment
                .as_ref()
                .map_or(true, |frag| request.body.signature().contains(frag.as_str()))
    }
}

/// In-process transport answering from registered routes. Routes are tried
/// in registration order; unmatched requests get a 404.
#[derive(Default)]
pub struct MockTransport {
    routes: Vec<Route>,
    log: RequestLog,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every request whose URL contains `url_fragment` with `response`.
    pub fn route(self, url_fragment: &str, response: HttpResponse) -> Self {
        self.route_fn(url_fragment, None, move |_| Ok(response.clone()))
    }

    /// Like [`route`](Self::route) but also requires the body to contain `body_fragment`.
    pub fn route_when(self, url_fragment: &str, body_fragment: &str, response: HttpResponse) -> Self {
        self.route_fn(url_fragment, Some(body_fragment), move |_| Ok(response.clone()))
    }

    pub fn route_fn<F>(mut self, url_fragment: &str, body_fragment: Option<&str>, responder: F) -> Self
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse> + 'static,
    {
        self.routes.push(Route {
            url_fragment: url_fragment.to_string(),
            body_fragment: body_fragment.map(String::from),
            responder: Box::new(responder),
        });
        self
    }

    /// Handle on the request log; stays valid after the transport is moved.
    pub fn log(&self) -> RequestLog {
        self.log.clone()
    }
}

impl Transport for MockTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.log.push(request);
        match self.routes.iter().find(|route| route.matches(request)) {
            Some(route) => (route.responder)(request),
            None => Ok(HttpResponse::new(404, format!("no mock route for {}", request.url))),
        }
    }
}
