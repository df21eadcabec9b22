use chrono::{DateTime, Duration, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;

/// Tokens expiring within this window are refreshed proactively.
pub const STALE_MARGIN_DAYS: i64 = 7;

const ISSUED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// OAuth token issued by the grant endpoint.
///
/// Field names are the remote wire format, except `issued`, which is local
/// bookkeeping: the grant endpoint does not return it, so exchanges stamp it
/// with their completion time.
///
/// # Example
/// ```
/// use tsheets::auth::Token;
///
/// let token = Token::from_json(r#"{
///     "access_token": "abc",
///     "expires_in": 5184000,
///     "token_type": "bearer",
///     "scope": "",
///     "refresh_token": "def",
///     "user_id": "42",
///     "client_url": "acme"
/// }"#)?;
/// assert!(!token.is_stale());
/// # Ok::<(), tsheets::error::TsheetsError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub user_id: String,
    #[serde(default)]
    pub client_url: String,
    #[serde(with = "issued_format", default = "issued_now")]
    pub issued: DateTime<Utc>,
}

impl Token {
    /// Parse the wire format. A missing `issued` field means "issued now".
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Moment the access token stops being accepted.
    pub fn expires_at(&self) -> DateTime<Utc> {
        Duration::try_seconds(self.expires_in)
            .and_then(|lifetime| self.issued.checked_add_signed(lifetime))
            .unwrap_or(if self.expires_in > 0 {
                DateTime::<Utc>::MAX_UTC
            } else {
                DateTime::<Utc>::MIN_UTC
            })
    }

    /// Whether the token expires within [`STALE_MARGIN_DAYS`] of now (UTC).
    pub fn is_stale(&self) -> bool {
        self.is_stale_at(Utc::now())
    }

    pub fn is_stale_at(&self, now: DateTime<Utc>) -> bool {
        if self.expires_in <= 0 {
            return true;
        }
        // A refresh deadline before the start of representable time is already past.
        self.expires_at()
            .checked_sub_signed(Duration::days(STALE_MARGIN_DAYS))
            .map_or(true, |deadline| now >= deadline)
    }

    /// Replace the issuance stamp, truncated to the precision of the wire format.
    pub fn issued_at(mut self, issued: DateTime<Utc>) -> Self {
        self.issued = issued.trunc_subsecs(0);
        self
    }
}

fn issued_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

mod issued_format {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    use super::ISSUED_FORMAT;

    pub fn serialize<S>(issued: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&issued.format(ISSUED_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_issued(&raw).map_err(serde::de::Error::custom)
    }
}

fn parse_issued(raw: &str) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, ISSUED_FORMAT) {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc).trunc_subsecs(0))
        .map_err(|e| format!("invalid issued timestamp {raw:?}: {e}"))
}
