//! Polls the authorization oracle until it gives a definitive answer.
//!
//! A freshly signed-in user may not be visible to the authorization store for
//! a short while. `Indeterminate` answers are retried with linear backoff;
//! `Authorized` and `Denied` end the loop immediately.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::backoff;
use crate::errors::SubmitError;
use crate::oracle::{AuthorizationCheck, AuthorizationOracle};
use crate::outcome::Outcome;

/// What one verification run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    pub outcome: Outcome,
    /// Oracle checks performed
    pub checks: u32,
    /// Total time spent in backoff waits
    pub waited: Duration,
}

pub struct AuthorizationVerifier {
    oracle: Arc<dyn AuthorizationOracle>,
    base_delay_ms: u64,
}

impl AuthorizationVerifier {
    pub fn new(oracle: Arc<dyn AuthorizationOracle>, base_delay_ms: u64) -> Self {
        Self {
            oracle,
            base_delay_ms,
        }
    }

    /// Resolve the caller's authorization in at most `max_attempts` checks.
    pub async fn verify(&self, max_attempts: u32) -> Outcome {
        self.poll(max_attempts, None)
            .await
            .map(|report| report.outcome)
            .unwrap_or(Outcome::VerificationExhausted)
    }

    /// Like [`Self::verify`], but a cancelled `token` interrupts the backoff wait.
    pub async fn verify_cancellable(
        &self,
        max_attempts: u32,
        token: &CancellationToken,
    ) -> Result<Outcome, SubmitError> {
        self.poll(max_attempts, Some(token))
            .await
            .map(|report| report.outcome)
    }

    /// Run the polling loop and report how it went.
    ///
    /// Returns `Err(SubmitError::Cancelled)` only when `token` fires during a wait.
    pub async fn poll(
        &self,
        max_attempts: u32,
        token: Option<&CancellationToken>,
    ) -> Result<VerificationReport, SubmitError> {
        let max_attempts = max_attempts.max(1);
        let mut attempt: u32 = 0;
        let mut waited = Duration::ZERO;

        loop {
            let check = match self.oracle.check().await {
                Ok(check) => check,
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "authorization check failed, treating as indeterminate");
                    AuthorizationCheck::Indeterminate
                }
            };
            let checks = attempt + 1;

            match check {
                AuthorizationCheck::Authorized {
                    role,
                    redirect_target,
                } => {
                    tracing::info!(attempt, %role, %redirect_target, "authorization confirmed");
                    return Ok(VerificationReport {
                        outcome: Outcome::authorized(redirect_target),
                        checks,
                        waited,
                    });
                }
                AuthorizationCheck::Denied { reason_code } => {
                    tracing::info!(attempt, %reason_code, "authorization denied");
                    return Ok(VerificationReport {
                        outcome: Outcome::denied(reason_code),
                        checks,
                        waited,
                    });
                }
                AuthorizationCheck::Indeterminate if attempt < max_attempts - 1 => {
                    let delay = backoff::delay_duration(attempt, self.base_delay_ms);
                    tracing::debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "authorization not yet visible, backing off"
                    );
                    match token {
                        Some(token) => {
                            tokio::select! {
                                _ = token.cancelled() => {
                                    tracing::info!(attempt, "verification cancelled during backoff");
                                    return Err(SubmitError::Cancelled);
                                }
                                _ = tokio::time::sleep(delay) => {}
                            }
                        }
                        None => tokio::time::sleep(delay).await,
                    }
                    waited += delay;
                    attempt += 1;
                }
                AuthorizationCheck::Indeterminate => {
                    tracing::warn!(checks, "authorization still indeterminate, giving up");
                    return Ok(VerificationReport {
                        outcome: Outcome::VerificationExhausted,
                        checks,
                        waited,
                    });
                }
            }
        }
    }
}
