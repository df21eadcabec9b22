//! Shared HTTP client, request encoding, and failure classification.

use std::sync::OnceLock;
use std::time::Duration;

use bon::Builder;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use tracing::debug;

use crate::error::{ApiError, TsheetsError};

/// Content type used when a request does not specify one.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Content type of the OAuth2 grant calls.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Client identification sent with every request.
pub const CLIENT_USER_AGENT: &str = concat!("tsheets-rs/", env!("CARGO_PKG_VERSION"));

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .pool_max_idle_per_host(10)
            .build()
            .expect("Failed to build HTTP client")
    })
}

/// Build the authorization header map for a bearer token.
///
/// A token that cannot travel as a header value is a configuration error;
/// the request is never sent without its credentials.
pub fn bearer_headers(access_token: &str) -> Result<HeaderMap, TsheetsError> {
    let mut value = HeaderValue::from_str(&format!("Bearer {access_token}")).map_err(|_| {
        TsheetsError::Configuration("access token is not a valid header value".to_string())
    })?;
    value.set_sensitive(true);
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}

/// A single HTTP exchange to perform.
///
/// # Example
/// ```
/// use reqwest::Method;
/// use tsheets::transport::TransportRequest;
///
/// let request = TransportRequest::builder()
///     .url("https://rest.tsheets.com/api/v1/jobcodes")
///     .method(Method::GET)
///     .query(vec![("active".to_string(), "yes".to_string())])
///     .build();
/// assert!(request.body.is_none());
/// ```
#[derive(Debug, Clone, Builder)]
pub struct TransportRequest {
    #[builder(into)]
    pub url: String,
    pub method: Method,
    #[builder(default)]
    pub query: Vec<(String, String)>,
    #[builder(default)]
    pub headers: HeaderMap,
    #[builder(into)]
    pub content_type: Option<String>,
    #[builder(into)]
    pub body: Option<String>,
}

/// Low-level request executor.
///
/// Cheap to clone: the inner `reqwest::Client` is reference counted.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport {
    /// Transport backed by the process-wide pooled client.
    pub fn new() -> Self {
        Self {
            client: shared_client().clone(),
        }
    }

    /// Transport backed by a caller-configured client (timeouts, proxies, TLS).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Execute a request and return the full response body.
    ///
    /// Any non-2xx response is returned as an [`ApiError`] carrying the status;
    /// failures without a response carry an empty status.
    pub async fn execute(&self, request: TransportRequest) -> Result<String, ApiError> {
        let TransportRequest {
            url,
            method,
            query,
            headers,
            content_type,
            body,
        } = request;

        let content_type = content_type.unwrap_or_else(|| JSON_CONTENT_TYPE.to_string());
        let mut builder = self
            .client
            .request(method.clone(), &url)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .header(CONTENT_TYPE, content_type)
            .headers(headers);
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        if let Some(body) = body.filter(|b| !b.is_empty()) {
            builder = builder.body(body.into_bytes());
        }

        let built = builder
            .build()
            .map_err(|e| ApiError::transport(e.to_string(), &url))?;
        let resolved_url = built.url().to_string();
        debug!(method = %method, url = %resolved_url, "tsheets request");

        let response = self
            .client
            .execute(built)
            .await
            .map_err(|e| classify(&e, &resolved_url))?;
        let status = response.status();
        debug!(status = status.as_u16(), url = %resolved_url, "tsheets response");

        let text = response
            .text()
            .await
            .map_err(|e| classify(&e, &resolved_url))?;
        if !status.is_success() {
            return Err(ApiError::http(status.as_u16(), resolved_url, &text));
        }
        Ok(text)
    }
}

fn classify(error: &reqwest::Error, url: &str) -> ApiError {
    match error.status() {
        Some(status) => ApiError::http(status.as_u16(), url, &error.to_string()),
        None => ApiError::transport(error.to_string(), url),
    }
}
