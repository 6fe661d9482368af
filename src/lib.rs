pub mod backoff;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod events;
pub mod flow;
pub mod gateway;
pub mod logging;
pub mod oracle;
pub mod orchestrator;
pub mod outcome;
pub mod resolver;
pub mod scripted;
pub mod transport;
pub mod ui;
pub mod verifier;

pub use credentials::CredentialSubmission;
pub use errors::{ConfigError, SubmitError, TransportError};
pub use events::{ProgressEvent, ProgressPhase, ProgressSink};
pub use flow::{FlowProfile, LoginFlow};
pub use gateway::IdentityGateway;
pub use oracle::AuthorizationOracle;
pub use orchestrator::LoginOrchestrator;
pub use outcome::Outcome;
