//! Authenticated request surface of the TSheets API.

pub mod endpoint;

pub use endpoint::{ReportType, ResourceType};

use std::sync::Arc;

use reqwest::{Method, Url};
use serde::Serialize;

use crate::auth::{grant, Token, TokenProvider};
use crate::config::ConnectionInfo;
use crate::error::Result;
use crate::transport::{bearer_headers, HttpTransport, TransportRequest};
use crate::util::RetryPolicy;

/// Request envelope for `add`/`edit`: the items travel under `data`.
#[derive(Serialize)]
struct DataEnvelope<'a, T> {
    data: &'a [T],
}

/// TSheets API client.
///
/// Every call asks the token provider for a token, so a
/// [`ManagedTokenProvider`](crate::auth::ManagedTokenProvider) refreshes
/// transparently. Responses are returned as the raw JSON envelope.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use tsheets::auth::StaticTokenProvider;
/// use tsheets::client::{ApiClient, ResourceType};
/// use tsheets::config::ConnectionInfo;
///
/// # async fn example() -> tsheets::error::Result<()> {
/// let connection = Arc::new(ConnectionInfo::from_env()?);
/// let client = ApiClient::new(connection, Arc::new(StaticTokenProvider::new("token")));
/// let body = client
///     .get(ResourceType::Jobcodes, &[("active", "yes"), ("page", "1")])
///     .await?;
/// println!("{body}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ApiClient {
    connection: Arc<ConnectionInfo>,
    tokens: Arc<dyn TokenProvider>,
    transport: HttpTransport,
    retry: RetryPolicy,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("connection", &self.connection)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(connection: Arc<ConnectionInfo>, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            connection,
            tokens,
            transport: HttpTransport::new(),
            retry: RetryPolicy::none(),
        }
    }

    pub fn with_transport(mut self, transport: HttpTransport) -> Self {
        self.transport = transport;
        self
    }

    /// Replay `get`, `edit`, `delete` and report calls on transient failures.
    /// `add` is always attempted once.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn connection(&self) -> &ConnectionInfo {
        &self.connection
    }

    /// GET a resource list, with `filters` sent as query parameters.
    pub async fn get(&self, resource: ResourceType, filters: &[(&str, &str)]) -> Result<String> {
        let query = filters
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.send(Method::GET, resource.path(), query, None).await
    }

    /// POST new items, wrapped as `{"data": [...]}`.
    pub async fn add<T: Serialize>(&self, resource: ResourceType, items: &[T]) -> Result<String> {
        let body = wrap_items(items)?;
        self.add_raw(resource, &body).await
    }

    /// POST a pre-built request body.
    pub async fn add_raw(&self, resource: ResourceType, body: &str) -> Result<String> {
        self.send(Method::POST, resource.path(), Vec::new(), Some(body))
            .await
    }

    /// PUT updated items, wrapped as `{"data": [...]}`.
    pub async fn edit<T: Serialize>(&self, resource: ResourceType, items: &[T]) -> Result<String> {
        let body = wrap_items(items)?;
        self.edit_raw(resource, &body).await
    }

    /// PUT a pre-built request body.
    pub async fn edit_raw(&self, resource: ResourceType, body: &str) -> Result<String> {
        self.send(Method::PUT, resource.path(), Vec::new(), Some(body))
            .await
    }

    /// DELETE by id. The remote only supports this for
    /// [`ResourceType::Timesheets`]; other resources are not checked here.
    pub async fn delete(&self, resource: ResourceType, ids: &[u64]) -> Result<String> {
        let query = vec![("ids".to_string(), join_ids(ids))];
        self.send(Method::DELETE, resource.path(), query, None).await
    }

    /// POST a report request; the body is passed through unmodified.
    pub async fn get_report(&self, report: ReportType, body: &str) -> Result<String> {
        self.send_read_only(Method::POST, report.path(), Vec::new(), Some(body))
            .await
    }

    /// Consent-page URL for the authorization-code grant.
    pub fn authorization_url(connection: &ConnectionInfo, state: &str) -> Result<Url> {
        grant::authorization_url(connection, state)
    }

    /// Exchange an authorization code for a token (unauthenticated call).
    pub async fn exchange_authorization_code(
        connection: &ConnectionInfo,
        code: &str,
    ) -> Result<Token> {
        grant::exchange_authorization_code(&HttpTransport::new(), connection, code).await
    }

    /// Exchange a refresh token for a new token (unauthenticated call).
    pub async fn exchange_refresh_token(
        connection: &ConnectionInfo,
        refresh_token: &str,
    ) -> Result<Token> {
        grant::exchange_refresh_token(&HttpTransport::new(), connection, refresh_token).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: Vec<(String, String)>,
        body: Option<&str>,
    ) -> Result<String> {
        self.dispatch(method, path, query, body, false).await
    }

    async fn send_read_only(
        &self,
        method: Method,
        path: &str,
        query: Vec<(String, String)>,
        body: Option<&str>,
    ) -> Result<String> {
        self.dispatch(method, path, query, body, true).await
    }

    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        query: Vec<(String, String)>,
        body: Option<&str>,
        read_only: bool,
    ) -> Result<String> {
        let policy = if RetryPolicy::is_replayable(&method, read_only) {
            self.retry
        } else {
            RetryPolicy::none()
        };
        let query = &query;
        policy
            .run(path, move || self.attempt(method.clone(), path, query, body))
            .await
    }

    /// One authorized exchange; a fresh token is asked for on every attempt.
    async fn attempt(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&str>,
    ) -> Result<String> {
        let access_token = self.tokens.access_token().await?;
        let request = TransportRequest::builder()
            .url(self.connection.endpoint(path))
            .method(method)
            .query(query.to_vec())
            .headers(bearer_headers(&access_token)?)
            .maybe_body(body.map(str::to_string))
            .build();
        Ok(self.transport.execute(request).await?)
    }
}

fn wrap_items<T: Serialize>(items: &[T]) -> Result<String> {
    Ok(serde_json::to_string(&DataEnvelope { data: items })?)
}

fn join_ids(ids: &[u64]) -> String {
    ids.iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
