//! Recovers from the identity provider reporting a stale live session.
//!
//! The stale session is signed out and the original submission is tried once
//! more. The retry is the only one: a second conflict ends the attempt.

use std::sync::Arc;

use crate::credentials::CredentialSubmission;
use crate::events::{ProgressEvent, ProgressPhase, ProgressSink};
use crate::gateway::{IdentityGateway, SignInStatus};
use crate::outcome::ProviderErrorCode;

/// Result of a conflict resolution, in provider terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderResult {
    Complete,
    Rejected(ProviderErrorCode),
}

/// A [`ProviderResult`] plus whether the credentials were actually re-submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub result: ProviderResult,
    pub retried_sign_in: bool,
}

impl Resolution {
    fn before_retry(code: ProviderErrorCode) -> Self {
        Self {
            result: ProviderResult::Rejected(code),
            retried_sign_in: false,
        }
    }

    fn after_retry(result: ProviderResult) -> Self {
        Self {
            result,
            retried_sign_in: true,
        }
    }
}

pub struct SessionConflictResolver {
    gateway: Arc<dyn IdentityGateway>,
    sink: Arc<dyn ProgressSink>,
}

impl SessionConflictResolver {
    pub fn new(gateway: Arc<dyn IdentityGateway>, sink: Arc<dyn ProgressSink>) -> Self {
        Self { gateway, sink }
    }

    /// Sign out the stale session, then re-submit `submission` exactly once.
    pub async fn resolve(&self, submission: &CredentialSubmission) -> ProviderResult {
        self.resolve_detailed(submission).await.result
    }

    /// Like [`Self::resolve`], also reporting whether the retry sign-in was issued.
    pub async fn resolve_detailed(&self, submission: &CredentialSubmission) -> Resolution {
        self.sink.emit(ProgressEvent::new(
            ProgressPhase::ResolvingConflict,
            "Closing a previous session",
        ));

        // The retry must not start until sign-out has fully completed.
        if let Err(e) = self.gateway.sign_out().await {
            tracing::warn!(error = %e, "sign-out of stale session failed");
            return Resolution::before_retry(ProviderErrorCode::SignOutFailed);
        }
        tracing::debug!("stale session signed out, retrying sign-in");

        let result = match self.gateway.sign_in(submission).await {
            Ok(SignInStatus::Complete) => ProviderResult::Complete,
            Ok(SignInStatus::Conflict) => {
                tracing::warn!("session conflict persisted after sign-out");
                ProviderResult::Rejected(ProviderErrorCode::ConflictUnresolved)
            }
            Ok(SignInStatus::Incomplete { next_step }) => {
                tracing::info!(%next_step, "retried sign-in needs another step");
                ProviderResult::Rejected(ProviderErrorCode::SignInIncomplete)
            }
            Ok(SignInStatus::Rejected(code)) => ProviderResult::Rejected(code),
            Err(e) => {
                tracing::warn!(error = %e, "retried sign-in failed");
                ProviderResult::Rejected(ProviderErrorCode::Unknown)
            }
        };
        Resolution::after_retry(result)
    }
}
