//! Terminal outcomes of a login attempt and the provider error taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of provider failures the UI layer is allowed to see.
///
/// Raw identity-provider codes are translated into this set exactly once, by
/// [`ProviderErrorCode::from_provider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderErrorCode {
    IdentifierNotFound,
    SecretIncorrect,
    IdentifierUnverified,
    SignInIncomplete,
    SignOutFailed,
    ConflictUnresolved,
    Unknown,
}

/// User-facing grouping of [`ProviderErrorCode`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
    BadCredential,
    AccountNeedsVerification,
    SignOutFailed,
    Unknown,
}

impl ProviderErrorCode {
    /// Translate a raw identity-provider error code.
    ///
    /// Accepts both the provider's native codes and the kebab-case names of the
    /// credential codes. Codes the reconciler assigns itself are never taken from
    /// the provider, so anything else becomes `Unknown`.
    pub fn from_provider(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "form_identifier_not_found" | "identifier_not_found" | "identifier-not-found"
            | "user_not_found" => ProviderErrorCode::IdentifierNotFound,
            "form_password_incorrect" | "password_incorrect" | "invalid_password"
            | "secret-incorrect" => ProviderErrorCode::SecretIncorrect,
            "form_identifier_not_verified" | "identifier_not_verified" | "email_not_verified"
            | "identifier-unverified" => ProviderErrorCode::IdentifierUnverified,
            _ => ProviderErrorCode::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderErrorCode::IdentifierNotFound => "identifier-not-found",
            ProviderErrorCode::SecretIncorrect => "secret-incorrect",
            ProviderErrorCode::IdentifierUnverified => "identifier-unverified",
            ProviderErrorCode::SignInIncomplete => "sign-in-incomplete",
            ProviderErrorCode::SignOutFailed => "sign-out-failed",
            ProviderErrorCode::ConflictUnresolved => "conflict-unresolved",
            ProviderErrorCode::Unknown => "unknown",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ProviderErrorCode::IdentifierNotFound | ProviderErrorCode::SecretIncorrect => {
                ErrorCategory::BadCredential
            }
            ProviderErrorCode::IdentifierUnverified | ProviderErrorCode::SignInIncomplete => {
                ErrorCategory::AccountNeedsVerification
            }
            ProviderErrorCode::SignOutFailed | ProviderErrorCode::ConflictUnresolved => {
                ErrorCategory::SignOutFailed
            }
            ProviderErrorCode::Unknown => ErrorCategory::Unknown,
        }
    }
}

impl fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::BadCredential => "bad-credential",
            ErrorCategory::AccountNeedsVerification => "account-needs-verification",
            ErrorCategory::SignOutFailed => "sign-out-failed",
            ErrorCategory::Unknown => "unknown",
        }
    }
}

/// The single terminal result of one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Authorized { redirect_target: String },
    Denied { reason_code: String },
    ProviderError { error_code: ProviderErrorCode },
    VerificationExhausted,
}

impl Outcome {
    pub fn authorized(redirect_target: impl Into<String>) -> Self {
        Outcome::Authorized {
            redirect_target: redirect_target.into(),
        }
    }

    pub fn denied(reason_code: impl Into<String>) -> Self {
        Outcome::Denied {
            reason_code: reason_code.into(),
        }
    }

    pub fn provider_error(error_code: ProviderErrorCode) -> Self {
        Outcome::ProviderError { error_code }
    }

    pub fn is_authorized(&self) -> bool {
        matches!(self, Outcome::Authorized { .. })
    }

    /// Whether trying again could change the answer.
    ///
    /// `Denied` is a stable negative; `VerificationExhausted` means the true
    /// state is unknown.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Outcome::VerificationExhausted | Outcome::ProviderError { .. }
        )
    }

    /// Message shown to the person signing in.
    pub fn user_message(&self) -> String {
        match self {
            Outcome::Authorized { redirect_target } => format!("Signed in, continuing to {}", redirect_target),
            Outcome::Denied { .. } => "You do not have access.".to_string(),
            Outcome::VerificationExhausted => {
                "We could not confirm your access yet. Please try again.".to_string()
            }
            Outcome::ProviderError { error_code } => match error_code.category() {
                ErrorCategory::BadCredential => "Incorrect identifier or password.".to_string(),
                ErrorCategory::AccountNeedsVerification => {
                    "Your account needs to be verified before you can sign in.".to_string()
                }
                ErrorCategory::SignOutFailed => {
                    "A previous session could not be closed. Please try again.".to_string()
                }
                ErrorCategory::Unknown => "Sign-in failed. Please try again.".to_string(),
            },
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Authorized { redirect_target } => write!(f, "authorized ({})", redirect_target),
            Outcome::Denied { reason_code } => write!(f, "denied ({})", reason_code),
            Outcome::ProviderError { error_code } => write!(f, "provider error ({})", error_code),
            Outcome::VerificationExhausted => write!(f, "verification exhausted"),
        }
    }
}
