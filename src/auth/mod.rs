//! OAuth2 tokens, grant calls, and token providers.

pub mod flow;
pub mod grant;
pub mod managed;
pub mod provider;
pub mod store;
pub mod token;

pub use flow::{parse_redirect, AuthorizationFlow, AuthorizationOutcome};
pub use managed::{AuthState, ManagedTokenProvider, TokenChanged};
pub use provider::{StaticTokenProvider, TokenProvider};
pub use store::{FileTokenStore, TokenStore, TokenStoreConfig};
pub use token::Token;
