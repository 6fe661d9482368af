use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::flow::LoginFlow;
use crate::outcome::Outcome;

/// Record of one finished attempt. Contains no credential material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptSummary {
    pub attempt_id: Uuid,
    pub flow: LoginFlow,
    pub identifier: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sign_in_calls: u32,
    pub authorization_checks: u32,
    pub conflict_retried: bool,
    pub outcome: Outcome,
}

impl AttemptSummary {
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
