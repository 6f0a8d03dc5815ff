//! Authenticated request dispatch for the incident API.
//!
//! Every operation in this crate shapes a [`RequestEnvelope`] and hands it to
//! a [`Transport`]. The envelope is the whole contract between the operation
//! builders and the wire: verb, endpoint path, extra headers, query
//! parameters, and JSON body. [`HttpTransport`] is the production
//! implementation; tests substitute their own.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Error;

/// Environment variable holding the API token.
const ENV_API_KEY: &str = "ONCALL_API_KEY";

/// Environment variable overriding the API base URL.
const ENV_API_URL: &str = "ONCALL_API_URL";

/// Default API base URL.
const DEFAULT_API_URL: &str = "https://api.pagerduty.com";

/// A fully-shaped request, built fresh per operation and never reused.
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    pub method: Method,
    pub endpoint: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RequestEnvelope {
    /// Create an envelope with no extra headers, query, or body.
    #[must_use]
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Attach the acting-user attribution header.
    ///
    /// The remote API records the `from` email in the incident's audit
    /// trail; every mutating operation carries it.
    #[must_use]
    pub fn from_header(mut self, email: &str) -> Self {
        self.headers.push(("from".to_string(), email.to_string()));
        self
    }

    /// Attach query parameters.
    #[must_use]
    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Authenticated dispatch capability shared by every resource handle.
///
/// This is the single seam between the operation builders and the network.
/// Implementations perform exactly one HTTP call per envelope and return the
/// decoded JSON body; they add no retries and no translation of remote
/// errors.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one authenticated HTTP call and decode the JSON response.
    async fn request(&self, envelope: RequestEnvelope) -> Result<Value, Error>;
}

/// `reqwest`-backed [`Transport`] for the live API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport authenticated with the given API token.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(api_key: &str) -> Result<Self, Error> {
        Self::with_base_url(api_key, DEFAULT_API_URL)
    }

    /// Create a transport against a specific base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConfigured`] if the token is not a valid header
    /// value, or an error if the HTTP client cannot be constructed.
    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self, Error> {
        let mut auth = HeaderValue::from_str(&format!("Token token={api_key}"))
            .map_err(|_| Error::NotConfigured("API key is not a valid header value".to_string()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.pagerduty+json;version=2"),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a transport from `ONCALL_API_KEY` and optional `ONCALL_API_URL`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConfigured`] if `ONCALL_API_KEY` is not set.
    pub fn from_env() -> Result<Self, Error> {
        let api_key = std::env::var(ENV_API_KEY)
            .map_err(|_| Error::NotConfigured(ENV_API_KEY.to_string()))?;

        match std::env::var(ENV_API_URL) {
            Ok(url) => Self::with_base_url(&api_key, &url),
            Err(_) => Self::new(&api_key),
        }
    }

    fn url_for(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, envelope: RequestEnvelope) -> Result<Value, Error> {
        let url = self.url_for(&envelope.endpoint);
        debug!(method = %envelope.method, url = %url, "Dispatching API request");

        let mut request = self.client.request(envelope.method, &url);
        for (name, value) in &envelope.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if !envelope.query.is_empty() {
            request = request.query(&envelope.query);
        }
        if let Some(body) = &envelope.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, "API request failed");
            return Err(Error::Api { status, body });
        }

        Ok(response.json().await?)
    }
}
