//! Authorization oracle: the application's own record of roles and
//! approval status, which may lag behind a fresh sign-in.

pub mod http;

use async_trait::async_trait;

use crate::errors::TransportError;

pub use http::HttpAuthorizationOracle;

/// Answer from one authorization check.
///
/// `Indeterminate` and `Denied` must stay distinct: the first means the store
/// has not caught up with the identity provider yet, the second is a recorded
/// negative decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationCheck {
    Authorized {
        role: String,
        redirect_target: String,
    },
    Denied {
        reason_code: String,
    },
    Indeterminate,
}

impl AuthorizationCheck {
    pub fn authorized(role: impl Into<String>, redirect_target: impl Into<String>) -> Self {
        AuthorizationCheck::Authorized {
            role: role.into(),
            redirect_target: redirect_target.into(),
        }
    }

    pub fn denied(reason_code: impl Into<String>) -> Self {
        AuthorizationCheck::Denied {
            reason_code: reason_code.into(),
        }
    }
}

/// Abstraction over the authorization store for testability.
/// Real implementation: `HttpAuthorizationOracle`. Test double: `ScriptedOracle`.
#[async_trait]
pub trait AuthorizationOracle: Send + Sync {
    async fn check(&self) -> Result<AuthorizationCheck, TransportError>;
}
