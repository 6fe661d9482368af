use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{IdentityGateway, SignInStatus};
use crate::credentials::CredentialSubmission;
use crate::errors::TransportError;
use crate::outcome::ProviderErrorCode;
use crate::transport::{decode_error, join_url, request_error};

#[derive(Serialize)]
struct SignInRequest<'a> {
    identifier: &'a str,
    secret: &'a str,
}

#[derive(Deserialize)]
struct SignInResponse {
    status: String,
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    errors: Vec<ProviderErrorEntry>,
}

#[derive(Deserialize)]
struct ProviderErrorEntry {
    code: String,
}

/// Identity gateway reached over HTTP.
///
/// Endpoints, relative to `base_url`:
/// - `POST /sign-in`: JSON `{identifier, secret}`; 2xx body `{"status": ...}`,
///   4xx body `{"errors": [{"code": ...}]}`
/// - `POST /sign-out`: any 2xx is success
pub struct HttpIdentityGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIdentityGateway {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn classify_rejection(status: u16, body: Option<ProviderErrorBody>) -> SignInStatus {
        let first_code = body.and_then(|b| b.errors.into_iter().next()).map(|e| e.code);
        match first_code {
            Some(code) => SignInStatus::from_provider_error(&code),
            // A bare 409 is the provider's way of saying the session exists.
            None if status == 409 => SignInStatus::Conflict,
            None => SignInStatus::Rejected(ProviderErrorCode::Unknown),
        }
    }
}

#[async_trait]
impl IdentityGateway for HttpIdentityGateway {
    async fn sign_in(
        &self,
        submission: &CredentialSubmission,
    ) -> Result<SignInStatus, TransportError> {
        let endpoint = join_url(&self.base_url, "sign-in");
        let response = self
            .client
            .post(&endpoint)
            .json(&SignInRequest {
                identifier: submission.identifier(),
                secret: submission.secret(),
            })
            .send()
            .await
            .map_err(|e| request_error(&endpoint, e))?;

        let status = response.status();
        if status.is_success() {
            let body: SignInResponse = response
                .json()
                .await
                .map_err(|e| decode_error(&endpoint, e))?;
            return Ok(SignInStatus::from_provider_status(&body.status));
        }

        if status.is_client_error() {
            let body = response.json::<ProviderErrorBody>().await.ok();
            return Ok(Self::classify_rejection(status.as_u16(), body));
        }

        Err(TransportError::UnexpectedStatus {
            endpoint,
            status: status.as_u16(),
        })
    }

    async fn sign_out(&self) -> Result<(), TransportError> {
        let endpoint = join_url(&self.base_url, "sign-out");
        let response = self
            .client
            .post(&endpoint)
            .send()
            .await
            .map_err(|e| request_error(&endpoint, e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(TransportError::UnexpectedStatus {
                endpoint,
                status: response.status().as_u16(),
            })
        }
    }
}
