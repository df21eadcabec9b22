//! Convenience re-exports for common use.

pub use crate::auth::{
    AuthState, AuthorizationFlow, AuthorizationOutcome, ManagedTokenProvider,
    StaticTokenProvider, Token, TokenChanged, TokenProvider,
};
pub use crate::client::{ApiClient, ReportType, ResourceType};
pub use crate::config::ConnectionInfo;
pub use crate::error::{ApiError, Result, TsheetsError};
