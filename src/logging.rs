//! Tracing setup and span constructors.
//!
//! Logs go to stderr so that `--json` output on stdout stays machine-readable.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::errors::ConfigError;
use crate::flow::LoginFlow;

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON structured logs, one object per line.
    Json,
    /// Human-readable multi-line logs.
    #[default]
    Pretty,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Json => write!(f, "json"),
            LogFormat::Pretty => write!(f, "pretty"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(ConfigError::Invalid {
                key: "logging.format".to_string(),
                message: format!("'{}' is not one of: json, pretty", other),
            }),
        }
    }
}

/// Install the global subscriber. Later calls are no-ops.
///
/// `RUST_LOG` wins over `default_filter`, which wins over `info`.
pub fn init_logging(format: LogFormat, default_filter: Option<&str>) {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .ok()
            .or_else(|| default_filter.and_then(|f| EnvFilter::try_new(f).ok()))
            .unwrap_or_else(|| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_fmt::layer().json().with_writer(std::io::stderr))
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_fmt::layer().pretty().with_writer(std::io::stderr))
                    .init();
            }
        }
    });
}

/// Span wrapping one login attempt. `identifier` must already be masked.
#[must_use]
pub fn attempt_span(attempt_id: &uuid::Uuid, flow: LoginFlow, identifier: &str) -> Span {
    tracing::info_span!(
        "login_attempt",
        attempt_id = %attempt_id,
        flow = %flow,
        identifier = identifier,
    )
}
