use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use super::state::{AttemptState, LoginPhase, Next};
use super::summary::AttemptSummary;
use crate::credentials::CredentialSubmission;
use crate::errors::SubmitError;
use crate::events::{ProgressEvent, ProgressPhase, ProgressSink};
use crate::flow::{FlowProfile, LoginFlow};
use crate::gateway::{IdentityGateway, SignInStatus};
use crate::logging;
use crate::oracle::AuthorizationOracle;
use crate::outcome::{Outcome, ProviderErrorCode};
use crate::resolver::SessionConflictResolver;
use crate::verifier::AuthorizationVerifier;

struct Inner {
    state: AttemptState,
    /// Credentials kept after a non-successful outcome so they can be resubmitted
    retained: Option<Arc<CredentialSubmission>>,
    last_summary: Option<AttemptSummary>,
}

/// Drives one login attempt from credential submission to a terminal [`Outcome`].
///
/// Submissions are accepted only from [`LoginPhase::Idle`]. A provider error or
/// a cancellation returns the instance to idle; every other outcome is final, and
/// a later `submit` is refused with [`SubmitError::AttemptInFlight`]. Separate
/// instances share nothing.
pub struct LoginOrchestrator {
    flow: LoginFlow,
    profile: FlowProfile,
    gateway: Arc<dyn IdentityGateway>,
    resolver: SessionConflictResolver,
    verifier: AuthorizationVerifier,
    sink: Arc<dyn ProgressSink>,
    inner: Mutex<Inner>,
}

impl LoginOrchestrator {
    pub fn new(
        flow: LoginFlow,
        profile: FlowProfile,
        gateway: Arc<dyn IdentityGateway>,
        oracle: Arc<dyn AuthorizationOracle>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        let resolver = SessionConflictResolver::new(Arc::clone(&gateway), Arc::clone(&sink));
        let verifier = AuthorizationVerifier::new(oracle, profile.base_delay_ms);
        Self {
            flow,
            profile,
            gateway,
            resolver,
            verifier,
            sink,
            inner: Mutex::new(Inner {
                state: AttemptState::new(),
                retained: None,
                last_summary: None,
            }),
        }
    }

    pub fn flow(&self) -> LoginFlow {
        self.flow
    }

    pub fn profile(&self) -> &FlowProfile {
        &self.profile
    }

    pub fn phase(&self) -> LoginPhase {
        self.lock().state.phase()
    }

    pub fn attempt_state(&self) -> AttemptState {
        self.lock().state.clone()
    }

    pub fn last_summary(&self) -> Option<AttemptSummary> {
        self.lock().last_summary.clone()
    }

    pub fn has_retained_credentials(&self) -> bool {
        self.lock().retained.is_some()
    }

    /// Forget retained credentials. Refused while an attempt is in flight.
    pub fn discard(&self) -> Result<(), SubmitError> {
        let mut inner = self.lock();
        if inner.state.phase().is_in_flight() {
            return Err(SubmitError::AttemptInFlight);
        }
        inner.retained = None;
        Ok(())
    }

    /// Start a new attempt with freshly entered credentials.
    pub async fn submit(&self, credentials: CredentialSubmission) -> Result<Outcome, SubmitError> {
        self.run(Arc::new(credentials), None).await
    }

    /// Like [`Self::submit`], but `token` can abandon the attempt during a backoff wait.
    pub async fn submit_cancellable(
        &self,
        credentials: CredentialSubmission,
        token: &CancellationToken,
    ) -> Result<Outcome, SubmitError> {
        self.run(Arc::new(credentials), Some(token)).await
    }

    /// Try again with the credentials of the previous, unsuccessful attempt.
    pub async fn resubmit(&self) -> Result<Outcome, SubmitError> {
        let retained = self
            .lock()
            .retained
            .clone()
            .ok_or(SubmitError::NothingToResubmit)?;
        self.run(retained, None).await
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // State is only ever replaced wholesale, so a poisoned value is still consistent.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update<T>(&self, f: impl FnOnce(&mut AttemptState) -> T) -> T {
        f(&mut self.lock().state)
    }

    async fn run(
        &self,
        submission: Arc<CredentialSubmission>,
        token: Option<&CancellationToken>,
    ) -> Result<Outcome, SubmitError> {
        {
            let mut inner = self.lock();
            if inner.state.phase() != LoginPhase::Idle {
                tracing::warn!(phase = %inner.state.phase(), "login not idle, refusing submit");
                return Err(SubmitError::AttemptInFlight);
            }
            inner.state = AttemptState::new();
            inner.state.start();
            inner.retained = Some(Arc::clone(&submission));
        }

        let attempt_id = Uuid::new_v4();
        let started_at = Utc::now();
        let span = logging::attempt_span(&attempt_id, self.flow, &submission.masked_identifier());

        let result = self.drive(&submission, token).instrument(span).await;

        let mut inner = self.lock();
        match &result {
            Ok(outcome) => {
                let summary = AttemptSummary {
                    attempt_id,
                    flow: self.flow,
                    identifier: submission.masked_identifier(),
                    started_at,
                    finished_at: Utc::now(),
                    sign_in_calls: inner.state.sign_in_calls,
                    authorization_checks: inner.state.retry_count,
                    conflict_retried: inner.state.conflict_retried,
                    outcome: outcome.clone(),
                };
                tracing::info!(
                    %attempt_id,
                    outcome = %outcome,
                    sign_in_calls = summary.sign_in_calls,
                    checks = summary.authorization_checks,
                    "login attempt finished"
                );
                match outcome {
                    Outcome::Authorized { .. } => inner.retained = None,
                    Outcome::ProviderError { .. } => inner.state.reset_to_idle(),
                    Outcome::Denied { .. } | Outcome::VerificationExhausted => {}
                }
                inner.last_summary = Some(summary);
            }
            Err(e) => {
                tracing::info!(%attempt_id, reason = %e, "login attempt stopped without an outcome");
                inner.state.abandon();
                inner.retained = None;
            }
        }

        result
    }

    async fn drive(
        &self,
        submission: &CredentialSubmission,
        token: Option<&CancellationToken>,
    ) -> Result<Outcome, SubmitError> {
        self.sink
            .emit(ProgressEvent::new(ProgressPhase::Submitting, "Signing in"));

        let status = match self.gateway.sign_in(submission).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(error = %e, "sign-in call failed");
                SignInStatus::Rejected(ProviderErrorCode::Unknown)
            }
        };
        tracing::debug!(?status, "identity gateway answered");

        let next = match self.update(|s| s.after_sign_in(&status)) {
            Next::ResolveConflict => {
                self.update(AttemptState::begin_resolving);
                let resolution = self.resolver.resolve_detailed(submission).await;
                self.update(|s| s.after_resolution(resolution))
            }
            next => next,
        };

        match next {
            Next::Verify => {}
            Next::Fail(code) => return Ok(Outcome::provider_error(code)),
            // Resolution never asks for another round of conflict handling.
            Next::ResolveConflict => {
                return Ok(Outcome::provider_error(ProviderErrorCode::ConflictUnresolved));
            }
        }

        self.update(AttemptState::begin_verifying);
        self.sink.emit(ProgressEvent::new(
            ProgressPhase::Verifying,
            "Confirming your access",
        ));
        let report = self.verifier.poll(self.profile.max_attempts, token).await?;
        self.update(|s| s.after_verification(&report));

        if let Outcome::Authorized { redirect_target } = &report.outcome {
            self.sink.emit(ProgressEvent::new(
                ProgressPhase::Redirecting,
                format!("Redirecting to {}", redirect_target),
            ));
        }
        Ok(report.outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;
    use crate::oracle::AuthorizationCheck;
    use crate::scripted::{ScriptedGateway, ScriptedOracle, SignInStep, SignOutStep};
    use std::time::Duration;

    struct Harness {
        orchestrator: LoginOrchestrator,
        gateway: Arc<ScriptedGateway>,
        oracle: Arc<ScriptedOracle>,
        sink: Arc<RecordingSink>,
    }

    fn harness(gateway: ScriptedGateway, checks: Vec<AuthorizationCheck>, max_attempts: u32) -> Harness {
        let gateway = Arc::new(gateway);
        let oracle = Arc::new(ScriptedOracle::with_checks(checks));
        let sink = Arc::new(RecordingSink::new());
        let profile = FlowProfile {
            max_attempts,
            base_delay_ms: 100,
            ..FlowProfile::default_for(LoginFlow::Dealer)
        };
        let orchestrator = LoginOrchestrator::new(
            LoginFlow::Dealer,
            profile,
            gateway.clone(),
            oracle.clone(),
            sink.clone(),
        );
        Harness {
            orchestrator,
            gateway,
            oracle,
            sink,
        }
    }

    fn creds() -> CredentialSubmission {
        CredentialSubmission::new("dealer@example.com", "hunter2")
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_then_authorized() {
        let h = harness(
            ScriptedGateway::with_statuses(vec![SignInStatus::Complete]),
            vec![AuthorizationCheck::authorized("dealer", "/dealer/catalog")],
            5,
        );
        let outcome = h.orchestrator.submit(creds()).await.unwrap();
        assert_eq!(outcome, Outcome::authorized("/dealer/catalog"));
        assert_eq!(h.gateway.sign_in_calls(), 1);
        assert_eq!(h.oracle.calls(), 1);
        assert_eq!(h.orchestrator.phase(), LoginPhase::Authorized);
        assert_eq!(
            h.sink.phases(),
            vec![
                ProgressPhase::Submitting,
                ProgressPhase::Verifying,
                ProgressPhase::Redirecting
            ]
        );
        assert!(!h.orchestrator.has_retained_credentials());
    }

    #[tokio::test(start_paused = true)]
    async fn test_conflict_resolved_then_authorized_after_lag() {
        let h = harness(
            ScriptedGateway::with_statuses(vec![SignInStatus::Conflict, SignInStatus::Complete]),
            vec![
                AuthorizationCheck::Indeterminate,
                AuthorizationCheck::Indeterminate,
                AuthorizationCheck::authorized("dealer", "/dealer/catalog"),
            ],
            5,
        );
        let outcome = h.orchestrator.submit(creds()).await.unwrap();
        assert!(outcome.is_authorized());
        assert_eq!(h.gateway.sign_in_calls(), 2);
        assert_eq!(h.gateway.sign_out_calls(), 1);
        assert_eq!(h.oracle.calls(), 3);

        let summary = h.orchestrator.last_summary().unwrap();
        assert_eq!(summary.sign_in_calls, 2);
        assert_eq!(summary.authorization_checks, 3);
        assert!(summary.conflict_retried);
        assert_eq!(
            h.sink.phases(),
            vec![
                ProgressPhase::Submitting,
                ProgressPhase::ResolvingConflict,
                ProgressPhase::Verifying,
                ProgressPhase::Redirecting
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_credentials_reset_to_idle() {
        let h = harness(
            ScriptedGateway::with_statuses(vec![SignInStatus::Rejected(
                ProviderErrorCode::SecretIncorrect,
            )]),
            vec![AuthorizationCheck::authorized("dealer", "/dealer/catalog")],
            5,
        );
        let outcome = h.orchestrator.submit(creds()).await.unwrap();
        assert_eq!(
            outcome,
            Outcome::provider_error(ProviderErrorCode::SecretIncorrect)
        );
        assert_eq!(h.gateway.sign_in_calls(), 1);
        assert_eq!(h.oracle.calls(), 0);
        assert_eq!(h.orchestrator.phase(), LoginPhase::Idle);
        assert!(h.orchestrator.has_retained_credentials());
    }

    #[tokio::test(start_paused = true)]
    async fn test_verification_exhausted() {
        let h = harness(
            ScriptedGateway::with_statuses(vec![SignInStatus::Complete]),
            vec![AuthorizationCheck::Indeterminate],
            5,
        );
        let start = tokio::time::Instant::now();
        let outcome = h.orchestrator.submit(creds()).await.unwrap();
        assert_eq!(outcome, Outcome::VerificationExhausted);
        assert_eq!(h.oracle.calls(), 5);
        assert_eq!(start.elapsed(), Duration::from_millis(100 * (1 + 2 + 3 + 4)));
        assert_eq!(h.orchestrator.phase(), LoginPhase::VerificationExhausted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_conflict_is_provider_error() {
        let h = harness(
            ScriptedGateway::with_statuses(vec![SignInStatus::Conflict]),
            vec![AuthorizationCheck::authorized("dealer", "/dealer/catalog")],
            5,
        );
        let outcome = h.orchestrator.submit(creds()).await.unwrap();
        assert_eq!(
            outcome,
            Outcome::provider_error(ProviderErrorCode::ConflictUnresolved)
        );
        assert_eq!(h.gateway.sign_in_calls(), 2);
        assert_eq!(h.oracle.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_out_failure_is_provider_error() {
        let h = harness(
            ScriptedGateway::new(
                vec![SignInStep::Status(SignInStatus::Conflict)],
                vec![SignOutStep::Fail],
            ),
            vec![],
            5,
        );
        let outcome = h.orchestrator.submit(creds()).await.unwrap();
        assert_eq!(
            outcome,
            Outcome::provider_error(ProviderErrorCode::SignOutFailed)
        );
        assert_eq!(h.gateway.sign_in_calls(), 1);
        assert_eq!(h.orchestrator.last_summary().unwrap().sign_in_calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_in_transport_error_is_unknown_provider_error() {
        let h = harness(
            ScriptedGateway::new(vec![SignInStep::Error], vec![SignOutStep::Ok]),
            vec![],
            5,
        );
        let outcome = h.orchestrator.submit(creds()).await.unwrap();
        assert_eq!(outcome, Outcome::provider_error(ProviderErrorCode::Unknown));
    }

    #[tokio::test(start_paused = true)]
    async fn test_denied_is_final_and_refuses_new_submission() {
        let h = harness(
            ScriptedGateway::with_statuses(vec![SignInStatus::Complete]),
            vec![AuthorizationCheck::denied("pending-approval")],
            5,
        );
        let outcome = h.orchestrator.submit(creds()).await.unwrap();
        assert_eq!(outcome, Outcome::denied("pending-approval"));
        assert_eq!(h.oracle.calls(), 1);
        assert_eq!(h.orchestrator.phase(), LoginPhase::Denied);

        assert_eq!(
            h.orchestrator.submit(creds()).await,
            Err(SubmitError::AttemptInFlight)
        );
        assert_eq!(h.orchestrator.resubmit().await, Err(SubmitError::AttemptInFlight));
        assert_eq!(h.gateway.sign_in_calls(), 1);
        assert_eq!(h.orchestrator.phase(), LoginPhase::Denied);
        assert!(h.orchestrator.has_retained_credentials());
    }

    #[tokio::test(start_paused = true)]
    async fn test_authorized_is_final_and_refuses_new_submission() {
        let h = harness(
            ScriptedGateway::with_statuses(vec![SignInStatus::Complete]),
            vec![AuthorizationCheck::authorized("dealer", "/dealer/catalog")],
            5,
        );
        assert!(h.orchestrator.submit(creds()).await.unwrap().is_authorized());

        assert_eq!(
            h.orchestrator.submit(creds()).await,
            Err(SubmitError::AttemptInFlight)
        );
        assert_eq!(h.gateway.sign_in_calls(), 1);
        assert_eq!(h.oracle.calls(), 1);
        assert_eq!(h.orchestrator.phase(), LoginPhase::Authorized);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_is_final_and_refuses_new_submission() {
        let h = harness(
            ScriptedGateway::with_statuses(vec![SignInStatus::Complete]),
            vec![AuthorizationCheck::Indeterminate],
            2,
        );
        let outcome = h.orchestrator.submit(creds()).await.unwrap();
        assert_eq!(outcome, Outcome::VerificationExhausted);
        assert_eq!(h.orchestrator.resubmit().await, Err(SubmitError::AttemptInFlight));
        assert_eq!(h.gateway.sign_in_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_in_after_resolution_counts_when_retry_is_rejected() {
        let h = harness(
            ScriptedGateway::with_statuses(vec![
                SignInStatus::Conflict,
                SignInStatus::from_provider_error("sign-out-failed"),
            ]),
            vec![],
            5,
        );
        let outcome = h.orchestrator.submit(creds()).await.unwrap();
        assert_eq!(outcome, Outcome::provider_error(ProviderErrorCode::Unknown));
        assert_eq!(h.gateway.sign_in_calls(), 2);
        assert_eq!(h.gateway.sign_out_calls(), 1);

        let summary = h.orchestrator.last_summary().unwrap();
        assert_eq!(summary.sign_in_calls, 2);
        assert!(summary.conflict_retried);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resubmit_after_provider_error_reuses_credentials() {
        let h = harness(
            ScriptedGateway::with_statuses(vec![
                SignInStatus::Rejected(ProviderErrorCode::Unknown),
                SignInStatus::Complete,
            ]),
            vec![AuthorizationCheck::authorized("dealer", "/dealer/catalog")],
            3,
        );
        let first = h.orchestrator.submit(creds()).await.unwrap();
        assert!(matches!(first, Outcome::ProviderError { .. }));

        let second = h.orchestrator.resubmit().await.unwrap();
        assert!(second.is_authorized());
        assert!(!h.orchestrator.has_retained_credentials());
        assert_eq!(
            h.orchestrator.resubmit().await,
            Err(SubmitError::NothingToResubmit)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_submit_is_refused() {
        let h = harness(
            ScriptedGateway::with_statuses(vec![SignInStatus::Complete]),
            vec![
                AuthorizationCheck::Indeterminate,
                AuthorizationCheck::authorized("dealer", "/dealer/catalog"),
            ],
            3,
        );
        let (first, second) = tokio::join!(
            h.orchestrator.submit(creds()),
            h.orchestrator.submit(creds())
        );
        assert!(first.unwrap().is_authorized());
        assert_eq!(second, Err(SubmitError::AttemptInFlight));
        assert_eq!(h.gateway.sign_in_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff_returns_to_idle_and_drops_credentials() {
        let h = harness(
            ScriptedGateway::with_statuses(vec![SignInStatus::Complete]),
            vec![AuthorizationCheck::Indeterminate],
            5,
        );
        let token = CancellationToken::new();
        let canceller = token.clone();
        let (result, _) = tokio::join!(
            h.orchestrator.submit_cancellable(creds(), &token),
            async move {
                tokio::time::sleep(Duration::from_millis(150)).await;
                canceller.cancel();
            }
        );
        assert_eq!(result, Err(SubmitError::Cancelled));
        assert_eq!(h.orchestrator.phase(), LoginPhase::Idle);
        assert!(h.orchestrator.last_summary().is_none());
        assert_eq!(h.oracle.calls(), 2);
        assert!(!h.orchestrator.has_retained_credentials());
        assert_eq!(
            h.orchestrator.resubmit().await,
            Err(SubmitError::NothingToResubmit)
        );

        // Idle again, so fresh credentials are accepted.
        assert_eq!(h.orchestrator.submit(creds()).await, Ok(Outcome::VerificationExhausted));
        assert_eq!(h.gateway.sign_in_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_discard_forgets_credentials_after_provider_error() {
        let h = harness(
            ScriptedGateway::with_statuses(vec![SignInStatus::Rejected(
                ProviderErrorCode::SecretIncorrect,
            )]),
            vec![],
            5,
        );
        h.orchestrator.submit(creds()).await.unwrap();
        assert!(h.orchestrator.has_retained_credentials());
        h.orchestrator.discard().unwrap();
        assert!(!h.orchestrator.has_retained_credentials());
    }
}
