use serde::{Deserialize, Serialize};
use std::fmt;

use crate::gateway::SignInStatus;
use crate::outcome::{Outcome, ProviderErrorCode};
use crate::resolver::{ProviderResult, Resolution};
use crate::verifier::VerificationReport;

/// Position of a login attempt in the reconciliation state machine.
///
/// ```text
/// Idle -> Submitting -> Authenticated | Conflicted | ProviderRejected
/// Conflicted -> Resolving -> Authenticated | ProviderRejected
/// Authenticated -> Verifying -> Authorized | Denied | VerificationExhausted
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginPhase {
    Idle,
    Submitting,
    Conflicted,
    Resolving,
    Authenticated,
    Verifying,
    Authorized,
    Denied,
    ProviderRejected,
    VerificationExhausted,
}

impl LoginPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LoginPhase::Authorized
                | LoginPhase::Denied
                | LoginPhase::ProviderRejected
                | LoginPhase::VerificationExhausted
        )
    }

    /// An attempt is in flight from the moment it leaves `Idle` until it
    /// reaches a terminal phase.
    pub fn is_in_flight(&self) -> bool {
        !matches!(self, LoginPhase::Idle) && !self.is_terminal()
    }

    pub fn can_transition_to(&self, next: LoginPhase) -> bool {
        use LoginPhase::*;
        matches!(
            (self, next),
            (Idle, Submitting)
                | (Submitting, Authenticated | Conflicted | ProviderRejected)
                | (Conflicted, Resolving)
                | (Resolving, Authenticated | ProviderRejected)
                | (Authenticated, Verifying)
                | (Verifying, Authorized | Denied | VerificationExhausted)
                | (ProviderRejected, Idle)
        )
    }
}

impl fmt::Display for LoginPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoginPhase::Idle => "idle",
            LoginPhase::Submitting => "submitting",
            LoginPhase::Conflicted => "conflicted",
            LoginPhase::Resolving => "resolving",
            LoginPhase::Authenticated => "authenticated",
            LoginPhase::Verifying => "verifying",
            LoginPhase::Authorized => "authorized",
            LoginPhase::Denied => "denied",
            LoginPhase::ProviderRejected => "provider_rejected",
            LoginPhase::VerificationExhausted => "verification_exhausted",
        };
        f.write_str(name)
    }
}

/// What the orchestrator should do after a provider answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Verify,
    ResolveConflict,
    Fail(ProviderErrorCode),
}

/// Per-attempt bookkeeping. A fresh value is created for every submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptState {
    phase: LoginPhase,
    /// Authorization checks used so far
    pub retry_count: u32,
    /// Set once the conflict path has been taken
    pub conflict_retried: bool,
    /// Calls made to the identity gateway's sign-in
    pub sign_in_calls: u32,
}

impl Default for AttemptState {
    fn default() -> Self {
        Self::new()
    }
}

impl AttemptState {
    pub fn new() -> Self {
        Self {
            phase: LoginPhase::Idle,
            retry_count: 0,
            conflict_retried: false,
            sign_in_calls: 0,
        }
    }

    pub fn phase(&self) -> LoginPhase {
        self.phase
    }

    fn advance(&mut self, next: LoginPhase) {
        let valid = self.phase.can_transition_to(next);
        if !valid {
            tracing::error!(from = %self.phase, to = %next, "invalid login state transition");
        }
        debug_assert!(valid, "invalid transition {} -> {}", self.phase, next);
        tracing::trace!(from = %self.phase, to = %next, "login state transition");
        self.phase = next;
    }

    /// `Idle -> Submitting`; counts the initial sign-in call.
    pub fn start(&mut self) {
        self.advance(LoginPhase::Submitting);
        self.sign_in_calls += 1;
    }

    pub fn after_sign_in(&mut self, status: &SignInStatus) -> Next {
        match status {
            SignInStatus::Complete => {
                self.advance(LoginPhase::Authenticated);
                Next::Verify
            }
            SignInStatus::Conflict if !self.conflict_retried => {
                self.advance(LoginPhase::Conflicted);
                Next::ResolveConflict
            }
            SignInStatus::Conflict => {
                self.advance(LoginPhase::ProviderRejected);
                Next::Fail(ProviderErrorCode::ConflictUnresolved)
            }
            SignInStatus::Incomplete { .. } => {
                self.advance(LoginPhase::ProviderRejected);
                Next::Fail(ProviderErrorCode::SignInIncomplete)
            }
            SignInStatus::Rejected(code) => {
                self.advance(LoginPhase::ProviderRejected);
                Next::Fail(*code)
            }
        }
    }

    /// `Conflicted -> Resolving`. The conflict path is now spent.
    pub fn begin_resolving(&mut self) {
        self.advance(LoginPhase::Resolving);
        self.conflict_retried = true;
    }

    pub fn after_resolution(&mut self, resolution: Resolution) -> Next {
        if resolution.retried_sign_in {
            self.sign_in_calls += 1;
        }
        match resolution.result {
            ProviderResult::Complete => {
                self.advance(LoginPhase::Authenticated);
                Next::Verify
            }
            ProviderResult::Rejected(code) => {
                self.advance(LoginPhase::ProviderRejected);
                Next::Fail(code)
            }
        }
    }

    pub fn begin_verifying(&mut self) {
        self.advance(LoginPhase::Verifying);
    }

    pub fn after_verification(&mut self, report: &VerificationReport) {
        self.retry_count = report.checks;
        let next = match report.outcome {
            Outcome::Authorized { .. } => LoginPhase::Authorized,
            Outcome::Denied { .. } => LoginPhase::Denied,
            Outcome::VerificationExhausted => LoginPhase::VerificationExhausted,
            Outcome::ProviderError { .. } => LoginPhase::ProviderRejected,
        };
        self.advance(next);
    }

    /// `ProviderRejected -> Idle`, so the same credentials can be tried again.
    pub fn reset_to_idle(&mut self) {
        self.advance(LoginPhase::Idle);
    }

    /// Drop an interrupted attempt back to `Idle` from wherever it stopped.
    pub fn abandon(&mut self) {
        tracing::debug!(from = %self.phase, "login attempt abandoned");
        self.phase = LoginPhase::Idle;
    }
}
