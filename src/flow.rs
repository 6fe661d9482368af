//! The two sign-in flows the storefront exposes and their verification budgets.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginFlow {
    Admin,
    Dealer,
}

impl LoginFlow {
    pub const ALL: [LoginFlow; 2] = [LoginFlow::Admin, LoginFlow::Dealer];

    pub fn as_str(&self) -> &'static str {
        match self {
            LoginFlow::Admin => "admin",
            LoginFlow::Dealer => "dealer",
        }
    }
}

impl fmt::Display for LoginFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LoginFlow {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(LoginFlow::Admin),
            "dealer" => Ok(LoginFlow::Dealer),
            other => Err(ConfigError::UnknownFlow(other.to_string())),
        }
    }
}

/// Verification budget and routing for one flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowProfile {
    /// Maximum authorization checks before giving up
    pub max_attempts: u32,
    /// Base of the linear backoff between checks, in milliseconds
    pub base_delay_ms: u64,
    /// Role the authorization store must report; `None` accepts any role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_role: Option<String>,
    /// Where to send the user when the store does not name a target
    pub redirect_target: String,
}

impl FlowProfile {
    pub fn default_for(flow: LoginFlow) -> Self {
        match flow {
            LoginFlow::Admin => Self {
                max_attempts: 5,
                base_delay_ms: 300,
                required_role: Some("admin".to_string()),
                redirect_target: "/admin/dashboard".to_string(),
            },
            LoginFlow::Dealer => Self {
                max_attempts: 3,
                base_delay_ms: 500,
                required_role: Some("dealer".to_string()),
                redirect_target: "/dealer/catalog".to_string(),
            },
        }
    }

    /// Problems with this profile, prefixed with `name` for display.
    pub fn validate(&self, name: &str) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.max_attempts == 0 {
            warnings.push(format!(
                "flows.{}.max_attempts must be at least 1 (got 0)",
                name
            ));
        }
        if self.base_delay_ms == 0 {
            warnings.push(format!(
                "flows.{}.base_delay_ms is 0: checks will be retried without waiting",
                name
            ));
        }
        if !self.redirect_target.starts_with('/') {
            warnings.push(format!(
                "flows.{}.redirect_target '{}' should be an absolute path",
                name, self.redirect_target
            ));
        }
        warnings
    }
}
