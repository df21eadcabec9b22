//! OAuth2 grant calls: consent-page URL and token exchanges.
//!
//! These are unauthenticated; the client credentials travel in the
//! form-encoded body of `POST {base}/grant`.

use chrono::Utc;
use reqwest::{Method, Url};
use tracing::debug;

use super::token::Token;
use crate::config::ConnectionInfo;
use crate::error::{Result, TsheetsError};
use crate::transport::{HttpTransport, TransportRequest, FORM_CONTENT_TYPE};

const AUTHORIZE_PATH: &str = "authorize";
const GRANT_PATH: &str = "grant";

/// Consent-page URL embedding the client id, redirect URI and anti-forgery
/// `state`, all percent-encoded.
pub fn authorization_url(connection: &ConnectionInfo, state: &str) -> Result<Url> {
    Url::parse_with_params(
        &connection.endpoint(AUTHORIZE_PATH),
        &[
            ("response_type", "code"),
            ("client_id", connection.client_id()),
            ("redirect_uri", connection.redirect_uri()),
            ("state", state),
        ],
    )
    .map_err(|e| TsheetsError::Configuration(format!("invalid authorization URL: {e}")))
}

/// Exchange an authorization code for a token.
pub async fn exchange_authorization_code(
    transport: &HttpTransport,
    connection: &ConnectionInfo,
    code: &str,
) -> Result<Token> {
    let form = [
        ("grant_type", "authorization_code"),
        ("client_id", connection.client_id()),
        ("client_secret", connection.client_secret()),
        ("code", code),
        ("redirect_uri", connection.redirect_uri()),
    ];
    request_token(transport, connection, &form).await
}

/// Exchange a refresh token for a new token.
pub async fn exchange_refresh_token(
    transport: &HttpTransport,
    connection: &ConnectionInfo,
    refresh_token: &str,
) -> Result<Token> {
    let form = [
        ("grant_type", "refresh_token"),
        ("client_id", connection.client_id()),
        ("client_secret", connection.client_secret()),
        ("refresh_token", refresh_token),
    ];
    request_token(transport, connection, &form).await
}

async fn request_token(
    transport: &HttpTransport,
    connection: &ConnectionInfo,
    form: &[(&str, &str)],
) -> Result<Token> {
    let body = serde_urlencoded::to_string(form)
        .map_err(|e| TsheetsError::Configuration(format!("cannot encode grant form: {e}")))?;
    let request = TransportRequest::builder()
        .url(connection.endpoint(GRANT_PATH))
        .method(Method::POST)
        .content_type(FORM_CONTENT_TYPE)
        .body(body)
        .build();
    let raw = transport.execute(request).await?;
    // The remote response carries no issuance time.
    let token = Token::from_json(&raw)?.issued_at(Utc::now());
    debug!(user_id = %token.user_id, expires_in = token.expires_in, "token granted");
    Ok(token)
}
