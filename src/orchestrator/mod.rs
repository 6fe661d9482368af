pub mod login;
pub mod state;
pub mod summary;

pub use login::LoginOrchestrator;
pub use state::{AttemptState, LoginPhase};
pub use summary::AttemptSummary;
