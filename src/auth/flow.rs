//! Interactive consent step of the authorization-code grant.
//!
//! The library never drives a browser itself. Callers plug in an
//! [`AuthorizationFlow`] backed by a webview, the system browser plus a local
//! callback listener, or a scripted test double.

use async_trait::async_trait;
use reqwest::Url;

use crate::error::Result;

/// Outcome of showing the consent page to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    /// The redirect carried an authorization code.
    Granted { code: String, state: Option<String> },
    /// The redirect carried an OAuth error (typically `access_denied`).
    Denied {
        error: String,
        description: Option<String>,
    },
    /// The user closed the dialog before any redirect happened.
    Abandoned,
}

/// Capability: given an authorization URL and the redirect-URI prefix, produce
/// an authorization code or a denial.
#[async_trait]
pub trait AuthorizationFlow: Send + Sync {
    async fn authorize(
        &self,
        authorization_url: &str,
        redirect_uri: &str,
    ) -> Result<AuthorizationOutcome>;
}

/// Interpret a navigation target observed by a flow implementation.
///
/// Returns `None` while the user is still on the consent pages, and the
/// outcome once `navigated_url` lands on `redirect_uri`.
pub fn parse_redirect(navigated_url: &str, redirect_uri: &str) -> Option<AuthorizationOutcome> {
    let url = Url::parse(navigated_url).ok()?;
    let expected = Url::parse(redirect_uri).ok()?;
    if !lands_on(&url, &expected) {
        return None;
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;
    let mut description = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            "error_description" => description = Some(value.into_owned()),
            _ => {}
        }
    }

    match (code, error) {
        (_, Some(error)) => Some(AuthorizationOutcome::Denied { error, description }),
        (Some(code), None) => Some(AuthorizationOutcome::Granted { code, state }),
        (None, None) => Some(AuthorizationOutcome::Denied {
            error: "missing_code".to_string(),
            description: Some("redirect carried neither a code nor an error".to_string()),
        }),
    }
}

/// Same origin, and a path equal to or nested under the redirect path.
fn lands_on(url: &Url, redirect: &Url) -> bool {
    if url.scheme() != redirect.scheme()
        || url.host_str() != redirect.host_str()
        || url.port_or_known_default() != redirect.port_or_known_default()
    {
        return false;
    }
    let prefix = redirect.path().trim_end_matches('/');
    let path = url.path();
    path == prefix
        || prefix.is_empty()
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}
