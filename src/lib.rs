//! TSheets REST API client.
//!
//! Issues authenticated requests for resource CRUD and reports, and manages
//! the OAuth2 access/refresh token lifecycle. Response bodies are returned as
//! raw JSON strings; parsing domain objects is left to the caller.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tsheets::prelude::*;
//!
//! # async fn example(token: Token) -> tsheets::error::Result<()> {
//! let connection = Arc::new(ConnectionInfo::from_env()?);
//! let tokens = Arc::new(ManagedTokenProvider::new(connection.clone()).with_token(token));
//! let client = ApiClient::new(connection, tokens);
//!
//! let me = client.get(ResourceType::CurrentUser, &[]).await?;
//! println!("{me}");
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod prelude;
pub mod transport;
pub mod util;
