//! Structured failure produced by the transport layer.

use thiserror::Error;

/// A failed HTTP exchange with the remote API.
///
/// Carries enough context (URL, status, remote message) to log or display
/// without inspecting transport internals. `http_status_code` is empty when
/// the failure never produced an HTTP response (DNS, connect, timeout).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (url: {request_url}, status: {http_status_code:?})")]
pub struct ApiError {
    message: String,
    request_url: String,
    http_status_code: String,
    error_text: String,
    error_code: String,
}

impl ApiError {
    /// Failure that never reached an HTTP response.
    pub fn transport(message: impl Into<String>, request_url: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            request_url: request_url.into(),
            http_status_code: String::new(),
            error_text: String::new(),
            error_code: String::new(),
        }
    }

    /// Non-2xx HTTP response. The body is inspected for a remote error envelope.
    pub fn http(status: u16, request_url: impl Into<String>, body: &str) -> Self {
        let (error_code, error_text) = parse_error_envelope(body);
        Self {
            message: format!("remote server returned HTTP {status}"),
            request_url: request_url.into(),
            http_status_code: status.to_string(),
            error_text,
            error_code,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn request_url(&self) -> &str {
        &self.request_url
    }

    /// HTTP status as a string, empty if not an HTTP-level failure.
    pub fn http_status_code(&self) -> &str {
        &self.http_status_code
    }

    pub fn error_text(&self) -> &str {
        &self.error_text
    }

    pub fn error_code(&self) -> &str {
        &self.error_code
    }

    /// Numeric HTTP status, if the failure carried one.
    pub fn status(&self) -> Option<u16> {
        self.http_status_code.parse().ok()
    }
}

/// Extract `(code, text)` from the two error shapes the service emits:
/// `{"error":{"code":417,"message":"..."}}` for API calls and
/// `{"error":"invalid_grant","error_description":"..."}` for grant calls.
fn parse_error_envelope(body: &str) -> (String, String) {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return (String::new(), body.to_string());
    };
    match value.get("error") {
        Some(serde_json::Value::Object(error)) => {
            let code = match error.get("code") {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(serde_json::Value::Number(n)) => n.to_string(),
                _ => String::new(),
            };
            let text = error
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| body.to_string());
            (code, text)
        }
        Some(serde_json::Value::String(code)) => {
            let text = value
                .get("error_description")
                .and_then(|d| d.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| body.to_string());
            (code.clone(), text)
        }
        _ => (String::new(), body.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_reads_api_envelope() {
        let err = ApiError::http(
            417,
            "https://rest.example.com/api/v1/timesheets",
            r#"{"error":{"code":417,"message":"Expectation Failed"}}"#,
        );
        assert_eq!(err.http_status_code(), "417");
        assert_eq!(err.status(), Some(417));
        assert_eq!(err.error_code(), "417");
        assert_eq!(err.error_text(), "Expectation Failed");
    }

    #[test]
    fn http_error_reads_oauth_envelope() {
        let err = ApiError::http(
            400,
            "https://rest.example.com/api/v1/grant",
            r#"{"error":"invalid_grant","error_description":"code expired"}"#,
        );
        assert_eq!(err.error_code(), "invalid_grant");
        assert_eq!(err.error_text(), "code expired");
    }

    #[test]
    fn http_error_keeps_plain_body() {
        let err = ApiError::http(502, "https://x", "Bad Gateway");
        assert_eq!(err.error_code(), "");
        assert_eq!(err.error_text(), "Bad Gateway");
    }

    #[test]
    fn transport_error_has_empty_status() {
        let err = ApiError::transport("connection refused", "https://x/users");
        assert_eq!(err.http_status_code(), "");
        assert_eq!(err.status(), None);
        assert!(err.to_string().contains("connection refused"));
        assert!(err.to_string().contains("https://x/users"));
    }
}
