//! Typed error hierarchy for the sign-in reconciler.
//!
//! Three enums cover the three places something can go wrong:
//! - `TransportError`: a collaborator call never produced a documented answer
//! - `SubmitError`: a submission was refused before or during an attempt
//! - `ConfigError`: configuration could not be read or is unusable
//!
//! None of these is a login *outcome*. Outcomes are ordinary values
//! (`crate::outcome::Outcome`) and never travel through `Err`.

use thiserror::Error;

/// Failures talking to the identity gateway or the authorization oracle.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request to {endpoint} failed: {message}")]
    Request { endpoint: String, message: String },

    #[error("Unexpected HTTP status {status} from {endpoint}")]
    UnexpectedStatus { endpoint: String, status: u16 },

    #[error("Failed to decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),
}

/// Reasons a call to `LoginOrchestrator::submit` did not produce an outcome.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("This login has already started")]
    AttemptInFlight,

    #[error("No retained credentials to resubmit")]
    NothingToResubmit,

    #[error("Login attempt was cancelled")]
    Cancelled,
}

/// Errors loading or validating `reconciler.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config file at {path}: {source}")]
    Write {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },

    #[error("Unknown login flow '{0}'")]
    UnknownFlow(String),
}
