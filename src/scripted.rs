//! In-memory collaborators that replay a fixed script of responses.
//!
//! Used by `signin-reconciler simulate` to rehearse a login against a known
//! sequence of provider and store answers, and by the test suites. Each
//! collaborator counts its calls. Once a script runs out, its last step
//! repeats.
//!
//! Step syntax:
//!
//! | Collaborator | Steps                                                         |
//! |--------------|---------------------------------------------------------------|
//! | sign-in      | `complete`, `incomplete`, `conflict`, `reject:<code>`, `error` |
//! | sign-out     | `ok`, `fail`                                                  |
//! | check        | `authorized:<role>:<target>`, `denied:<reason>`, `indeterminate`, `error` |

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::credentials::CredentialSubmission;
use crate::errors::{ConfigError, TransportError};
use crate::gateway::{IdentityGateway, SignInStatus};
use crate::oracle::{AuthorizationCheck, AuthorizationOracle};
use crate::outcome::ProviderErrorCode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInStep {
    Status(SignInStatus),
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutStep {
    Ok,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStep {
    Check(AuthorizationCheck),
    Error,
}

fn invalid(key: &str, message: String) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        message,
    }
}

impl std::str::FromStr for SignInStep {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.split_once(':') {
            Some(("reject", code)) => Ok(SignInStep::Status(SignInStatus::Rejected(
                ProviderErrorCode::from_provider(code),
            ))),
            _ => match s {
                "complete" => Ok(SignInStep::Status(SignInStatus::Complete)),
                "incomplete" => Ok(SignInStep::Status(SignInStatus::Incomplete {
                    next_step: "needs_second_factor".to_string(),
                })),
                "conflict" => Ok(SignInStep::Status(SignInStatus::Conflict)),
                "error" => Ok(SignInStep::Error),
                other => Err(invalid(
                    "sign-in",
                    format!(
                        "unknown step '{}'. Valid: complete, incomplete, conflict, reject:<code>, error",
                        other
                    ),
                )),
            },
        }
    }
}

impl std::str::FromStr for SignOutStep {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ok" => Ok(SignOutStep::Ok),
            "fail" => Ok(SignOutStep::Fail),
            other => Err(invalid(
                "sign-out",
                format!("unknown step '{}'. Valid: ok, fail", other),
            )),
        }
    }
}

impl std::str::FromStr for CheckStep {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut parts = s.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("authorized"), Some(role), Some(target)) => {
                Ok(CheckStep::Check(AuthorizationCheck::authorized(role, target)))
            }
            (Some("denied"), Some(reason), None) => {
                Ok(CheckStep::Check(AuthorizationCheck::denied(reason)))
            }
            (Some("indeterminate"), None, None) => {
                Ok(CheckStep::Check(AuthorizationCheck::Indeterminate))
            }
            (Some("error"), None, None) => Ok(CheckStep::Error),
            _ => Err(invalid(
                "check",
                format!(
                    "unknown step '{}'. Valid: authorized:<role>:<target>, denied:<reason>, indeterminate, error",
                    s
                ),
            )),
        }
    }
}

/// Parse a comma-separated list of steps.
pub fn parse_script<T>(script: &str) -> Result<Vec<T>, ConfigError>
where
    T: std::str::FromStr<Err = ConfigError>,
{
    script
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(str::parse)
        .collect()
}

/// Pop the next step, repeating the final one forever.
fn next_step<T: Clone>(queue: &Mutex<VecDeque<T>>) -> Option<T> {
    let mut queue = queue.lock().ok()?;
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

pub struct ScriptedGateway {
    sign_ins: Mutex<VecDeque<SignInStep>>,
    sign_outs: Mutex<VecDeque<SignOutStep>>,
    sign_in_calls: AtomicU32,
    sign_out_calls: AtomicU32,
}

impl ScriptedGateway {
    pub fn new(sign_ins: Vec<SignInStep>, sign_outs: Vec<SignOutStep>) -> Self {
        Self {
            sign_ins: Mutex::new(sign_ins.into()),
            sign_outs: Mutex::new(sign_outs.into()),
            sign_in_calls: AtomicU32::new(0),
            sign_out_calls: AtomicU32::new(0),
        }
    }

    /// Gateway answering sign-in with `statuses` in order and always signing out cleanly.
    pub fn with_statuses(statuses: Vec<SignInStatus>) -> Self {
        Self::new(
            statuses.into_iter().map(SignInStep::Status).collect(),
            vec![SignOutStep::Ok],
        )
    }

    pub fn sign_in_calls(&self) -> u32 {
        self.sign_in_calls.load(Ordering::SeqCst)
    }

    pub fn sign_out_calls(&self) -> u32 {
        self.sign_out_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityGateway for ScriptedGateway {
    async fn sign_in(
        &self,
        _submission: &CredentialSubmission,
    ) -> Result<SignInStatus, TransportError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        match next_step(&self.sign_ins) {
            Some(SignInStep::Status(status)) => Ok(status),
            Some(SignInStep::Error) => Err(TransportError::Unavailable(
                "scripted sign-in failure".to_string(),
            )),
            None => Err(TransportError::Unavailable(
                "sign-in script is empty".to_string(),
            )),
        }
    }

    async fn sign_out(&self) -> Result<(), TransportError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        match next_step(&self.sign_outs) {
            Some(SignOutStep::Ok) => Ok(()),
            Some(SignOutStep::Fail) => Err(TransportError::Unavailable(
                "scripted sign-out failure".to_string(),
            )),
            None => Err(TransportError::Unavailable(
                "sign-out script is empty".to_string(),
            )),
        }
    }
}

pub struct ScriptedOracle {
    checks: Mutex<VecDeque<CheckStep>>,
    calls: AtomicU32,
}

impl ScriptedOracle {
    pub fn new(checks: Vec<CheckStep>) -> Self {
        Self {
            checks: Mutex::new(checks.into()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn with_checks(checks: Vec<AuthorizationCheck>) -> Self {
        Self::new(checks.into_iter().map(CheckStep::Check).collect())
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthorizationOracle for ScriptedOracle {
    async fn check(&self) -> Result<AuthorizationCheck, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match next_step(&self.checks) {
            Some(CheckStep::Check(check)) => Ok(check),
            Some(CheckStep::Error) => Err(TransportError::Unavailable(
                "scripted check failure".to_string(),
            )),
            None => Err(TransportError::Unavailable(
                "check script is empty".to_string(),
            )),
        }
    }
}
