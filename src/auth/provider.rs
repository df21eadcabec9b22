use async_trait::async_trait;

use crate::error::Result;

/// Source of a usable access token for authenticated requests.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Access token to place in the `Authorization: Bearer` header.
    async fn access_token(&self) -> Result<String>;
}

/// Pre-issued token that is handed out as-is and never refreshed.
///
/// # Example
/// ```
/// use tsheets::auth::{StaticTokenProvider, TokenProvider};
///
/// # async fn example() -> tsheets::error::Result<()> {
/// let provider = StaticTokenProvider::new("my-access-token");
/// assert_eq!(provider.access_token().await?, "my-access-token");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct StaticTokenProvider {
    access_token: String,
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider").finish_non_exhaustive()
    }
}

impl StaticTokenProvider {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok(self.access_token.clone())
    }
}
