use async_trait::async_trait;
use serde::Deserialize;

use super::{AuthorizationCheck, AuthorizationOracle};
use crate::errors::TransportError;
use crate::flow::FlowProfile;
use crate::transport::{decode_error, join_url, request_error};

#[derive(Debug, Deserialize)]
struct StatusBody {
    role: String,
    status: String,
    #[serde(default)]
    redirect_target: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DenialBody {
    #[serde(default)]
    reason: Option<String>,
}

/// Authorization oracle reached over HTTP.
///
/// Response mapping for `GET {base_url}{path}`:
///
/// | Response                                   | Check                         |
/// |--------------------------------------------|-------------------------------|
/// | 200, `status = "approved"`, expected role  | `Authorized`                  |
/// | 200, `status = "approved"`, other role     | `Denied("role-mismatch")`     |
/// | 200, any other `status`                    | `Denied(status)`              |
/// | 401 / 404                                  | `Indeterminate`               |
/// | 403                                        | `Denied(reason or forbidden)` |
/// | anything else                              | transport error               |
pub struct HttpAuthorizationOracle {
    client: reqwest::Client,
    endpoint: String,
    required_role: Option<String>,
    default_target: String,
}

impl HttpAuthorizationOracle {
    pub fn new(client: reqwest::Client, base_url: &str, path: &str, flow: &FlowProfile) -> Self {
        Self {
            client,
            endpoint: join_url(base_url, path),
            required_role: flow.required_role.clone(),
            default_target: flow.redirect_target.clone(),
        }
    }

    fn classify(&self, body: StatusBody) -> AuthorizationCheck {
        if !body.status.eq_ignore_ascii_case("approved") {
            return AuthorizationCheck::denied(body.status.to_ascii_lowercase());
        }
        if let Some(required) = &self.required_role
            && !body.role.eq_ignore_ascii_case(required)
        {
            return AuthorizationCheck::denied("role-mismatch");
        }
        let target = body
            .redirect_target
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| self.default_target.clone());
        AuthorizationCheck::authorized(body.role, target)
    }
}

#[async_trait]
impl AuthorizationOracle for HttpAuthorizationOracle {
    async fn check(&self) -> Result<AuthorizationCheck, TransportError> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| request_error(&self.endpoint, e))?;

        match response.status().as_u16() {
            200 => {
                let body: StatusBody = response
                    .json()
                    .await
                    .map_err(|e| decode_error(&self.endpoint, e))?;
                Ok(self.classify(body))
            }
            401 | 404 => Ok(AuthorizationCheck::Indeterminate),
            403 => {
                let body = response.json::<DenialBody>().await.unwrap_or_default();
                Ok(AuthorizationCheck::denied(
                    body.reason.unwrap_or_else(|| "forbidden".to_string()),
                ))
            }
            status => Err(TransportError::UnexpectedStatus {
                endpoint: self.endpoint.clone(),
                status,
            }),
        }
    }
}
