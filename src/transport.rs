//! Shared HTTP plumbing for the collaborator adapters.

use std::time::Duration;

use crate::errors::TransportError;

/// Build a client that keeps cookies between calls.
///
/// The identity gateway and the authorization oracle must share one client:
/// the session cookie set by sign-in is what the oracle authenticates.
pub fn session_client(timeout: Duration) -> Result<reqwest::Client, TransportError> {
    reqwest::Client::builder()
        .cookie_store(true)
        .timeout(timeout)
        .build()
        .map_err(|e| TransportError::Unavailable(format!("Failed to build HTTP client: {}", e)))
}

/// Join a base URL and a path without doubling or dropping the slash.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

pub(crate) fn request_error(endpoint: &str, err: reqwest::Error) -> TransportError {
    TransportError::Request {
        endpoint: endpoint.to_string(),
        message: err.to_string(),
    }
}

pub(crate) fn decode_error(endpoint: &str, err: reqwest::Error) -> TransportError {
    TransportError::Decode {
        endpoint: endpoint.to_string(),
        message: err.to_string(),
    }
}
