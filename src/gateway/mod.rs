//! Identity gateway: the external identity provider that checks credentials
//! and owns the browser's login session.

pub mod http;

use async_trait::async_trait;

use crate::credentials::CredentialSubmission;
use crate::errors::TransportError;
use crate::outcome::ProviderErrorCode;

pub use http::HttpIdentityGateway;

/// What the identity provider said about one sign-in call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInStatus {
    /// Authenticated; a session now exists.
    Complete,
    /// Credentials were accepted but the provider wants another step
    /// (second factor, verification, ...).
    Incomplete { next_step: String },
    /// A live session already exists for this browser context.
    Conflict,
    /// Credentials were refused.
    Rejected(ProviderErrorCode),
}

impl SignInStatus {
    /// Classify a raw provider error code, separating the "session already
    /// exists" condition from genuine credential rejections.
    pub fn from_provider_error(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "session_exists" | "session-exists" | "session_conflict" => SignInStatus::Conflict,
            _ => SignInStatus::Rejected(ProviderErrorCode::from_provider(raw)),
        }
    }

    /// Classify a provider's success-body status string.
    pub fn from_provider_status(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "complete" => SignInStatus::Complete,
            other => SignInStatus::Incomplete {
                next_step: other.to_string(),
            },
        }
    }
}

/// Abstraction over the identity provider for testability.
/// Real implementation: `HttpIdentityGateway`. Test double: `ScriptedGateway`.
#[async_trait]
pub trait IdentityGateway: Send + Sync {
    async fn sign_in(
        &self,
        submission: &CredentialSubmission,
    ) -> Result<SignInStatus, TransportError>;

    async fn sign_out(&self) -> Result<(), TransportError>;
}
