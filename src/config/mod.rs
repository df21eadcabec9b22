//! Connection configuration: remote endpoint and OAuth client credentials.

use std::fmt;

use reqwest::Url;

use crate::error::{Result, TsheetsError};

/// Production API root.
pub const DEFAULT_BASE_URI: &str = "https://rest.tsheets.com/api/v1";

/// Immutable description of the remote endpoint and OAuth client.
///
/// Shared by reference (usually behind an `Arc`) across the API client and
/// token providers.
///
/// # Example
/// ```
/// use tsheets::config::ConnectionInfo;
///
/// let info = ConnectionInfo::new(
///     "https://rest.tsheets.com/api/v1/",
///     "client-id",
///     "https://example.com/callback",
///     "client-secret",
/// )?;
/// assert_eq!(info.base_uri(), "https://rest.tsheets.com/api/v1");
/// # Ok::<(), tsheets::error::TsheetsError>(())
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    base_uri: String,
    client_id: String,
    redirect_uri: String,
    client_secret: String,
}

impl fmt::Debug for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionInfo")
            .field("base_uri", &self.base_uri)
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .field("client_secret", &"..")
            .finish()
    }
}

impl ConnectionInfo {
    /// Build connection info. Trailing slashes on `base_uri` are removed.
    pub fn new(
        base_uri: impl Into<String>,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self> {
        let base_uri = normalize_base_uri(&base_uri.into());
        Url::parse(&base_uri).map_err(|e| {
            TsheetsError::Configuration(format!("invalid base URI {base_uri:?}: {e}"))
        })?;
        Ok(Self {
            base_uri,
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            client_secret: client_secret.into(),
        })
    }

    /// Load from environment variables, reading `.env` first if present.
    ///
    /// `TSHEETS_BASE_URI` is optional; `TSHEETS_CLIENT_ID`,
    /// `TSHEETS_REDIRECT_URI` and `TSHEETS_CLIENT_SECRET` are required.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let base_uri =
            std::env::var("TSHEETS_BASE_URI").unwrap_or_else(|_| DEFAULT_BASE_URI.to_string());
        Self::new(
            base_uri,
            required_env("TSHEETS_CLIENT_ID")?,
            required_env("TSHEETS_REDIRECT_URI")?,
            required_env("TSHEETS_CLIENT_SECRET")?,
        )
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    /// Absolute URL for a path below the API root.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_uri, path.trim_start_matches('/'))
    }
}

fn normalize_base_uri(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn required_env(var: &str) -> Result<String> {
    std::env::var(var)
        .map_err(|_| TsheetsError::Configuration(format!("Environment variable {var} not set")))
}
