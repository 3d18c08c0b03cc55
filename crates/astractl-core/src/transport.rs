//! HTTP request execution against the control plane
//!
//! One [`Transport`] is built per invocation and shared by every operation. It
//! owns the connection pool and the per-request deadline; callers describe a
//! request with [`ApiRequest`] and get back the raw status, `Location` header
//! and body for the classifier to judge.

use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_TYPE, LOCATION};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use url::Url;

use crate::error::{CoreError, Result};

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("astractl/", env!("CARGO_PKG_VERSION"));

/// Per-request deadline used when the profile does not set one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Idle connections kept per host
const MAX_IDLE_PER_HOST: usize = 10;

const JSON: &str = "application/json";

/// A request to the control plane, relative to the transport's base URL
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    bearer: Option<String>,
}

impl ApiRequest {
    pub fn new<I, S>(method: Method, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    pub fn get<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::GET, segments)
    }

    pub fn post<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Method::POST, segments)
    }

    /// Append a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append several query parameters
    #[must_use]
    pub fn queries<I>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.query.extend(pairs);
        self
    }

    /// Attach a JSON body
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let encoded = serde_json::to_vec(body).map_err(|e| {
            CoreError::Validation(format!("unable to encode request body: {}", e))
        })?;
        self.body = Some(encoded);
        Ok(self)
    }

    /// Authorize the request with a bearer token
    #[must_use]
    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

/// Method and path only; never the query, body or token
impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} /{}", self.method, self.segments.join("/"))
    }
}

/// The parts of a completed response the core reads
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub location: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            CoreError::UnexpectedResponse(format!(
                "unable to decode response body ({}): '{}'",
                e,
                String::from_utf8_lossy(&self.body)
            ))
        })
    }
}

/// Bounded-deadline HTTP executor bound to one control-plane base URL
#[derive(Debug, Clone)]
pub struct Transport {
    http: reqwest::Client,
    base_url: Url,
}

impl Transport {
    /// Build a transport for `base_url` with a total per-request deadline
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| CoreError::Validation(format!("invalid API URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(CoreError::Validation(format!(
                "invalid API URL '{}': not a base URL",
                base_url
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
            .user_agent(USER_AGENT)
            .build()?;

        debug!(base_url = %base_url, timeout_secs = timeout.as_secs(), "Created transport");
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve request segments and query against the base URL
    pub fn url_for(&self, request: &ApiRequest) -> Result<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                CoreError::Validation(format!("invalid API URL '{}'", self.base_url))
            })?;
            path.pop_if_empty();
            path.extend(request.segments.iter());
        }
        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Execute exactly one request
    pub async fn execute(&self, request: ApiRequest) -> Result<RawResponse> {
        let url = self.url_for(&request)?;
        debug!(method = %request.method, url = %url, "Sending request");

        let mut builder = self
            .http
            .request(request.method.clone(), url.clone())
            .header(ACCEPT, JSON)
            .header(CONTENT_TYPE, JSON);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let started = Instant::now();
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        debug!(
            method = %request.method,
            url = %url,
            status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Received response"
        );
        trace!(body = %String::from_utf8_lossy(&body), "Response body");

        Ok(RawResponse {
            status,
            location,
            body,
        })
    }

    /// Download an absolute URL without control-plane headers.
    ///
    /// Used for pre-signed bundle URLs, which reject extra authorization.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        debug!("Downloading secure bundle");
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_joins_segments() {
        let transport = Transport::new("https://api.example.com", DEFAULT_TIMEOUT).unwrap();
        let request = ApiRequest::get(["v2", "databases", "abc"]);
        assert_eq!(
            transport.url_for(&request).unwrap().as_str(),
            "https://api.example.com/v2/databases/abc"
        );
    }

    #[test]
    fn test_url_for_keeps_base_path_prefix() {
        let transport = Transport::new("http://localhost:8080/proxy/", DEFAULT_TIMEOUT).unwrap();
        let request = ApiRequest::post(["v2", "databases"]);
        assert_eq!(
            transport.url_for(&request).unwrap().as_str(),
            "http://localhost:8080/proxy/v2/databases"
        );
    }

    #[test]
    fn test_url_for_encodes_segments_and_query() {
        let transport = Transport::new("https://api.example.com", DEFAULT_TIMEOUT).unwrap();
        let request = ApiRequest::post(["v2", "databases", "a b", "keyspaces", "ks/1"])
            .query("preparedStateOnly", "true");
        assert_eq!(
            transport.url_for(&request).unwrap().as_str(),
            "https://api.example.com/v2/databases/a%20b/keyspaces/ks%2F1?preparedStateOnly=true"
        );
    }

    #[test]
    fn test_display_omits_query_and_token() {
        let request = ApiRequest::post(["v2", "databases", "db-1", "terminate"])
            .query("preparedStateOnly", "true")
            .bearer("AstraCS:secret");
        assert_eq!(request.to_string(), "POST /v2/databases/db-1/terminate");
    }

    #[test]
    fn test_no_query_string_without_params() {
        let transport = Transport::new("https://api.example.com", DEFAULT_TIMEOUT).unwrap();
        let url = transport.url_for(&ApiRequest::get(["v2"])).unwrap();
        assert_eq!(url.query(), None);
    }

    #[test]
    fn test_invalid_base_url_is_validation_error() {
        let err = Transport::new("not a url", DEFAULT_TIMEOUT).unwrap_err();
        assert!(err.is_validation());

        let err = Transport::new("mailto:ops@example.com", DEFAULT_TIMEOUT).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_raw_response_json_error_is_unexpected_response() {
        let response = RawResponse {
            status: 200,
            location: None,
            body: b"nope".to_vec(),
        };
        let err = response.json::<serde_json::Value>().unwrap_err();
        assert!(matches!(err, CoreError::UnexpectedResponse(_)));
    }
}
