// src/models/session.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Submitted answers: stringified question id -> selected option index.
pub type AnswerMap = BTreeMap<String, usize>;

/// Lifecycle of a session. Only `InProgress -> Completed | TimedOut` is allowed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    TimedOut,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionStatus::InProgress)
    }
}

/// One candidate's timed attempt at a test.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,

    pub test_config_id: String,

    /// Authoritative start time; the client deadline is derived from it.
    pub started_at: DateTime<Utc>,

    /// Empty until the session is finalized.
    pub answers: AnswerMap,

    pub status: SessionStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// DTO for submitting a test attempt.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTestRequest {
    #[validate(length(min = 1, max = 100))]
    pub session_id: String,

    /// Key: question id as a string. Value: selected option index.
    pub answers: AnswerMap,

    #[serde(default)]
    pub timed_out: bool,
}

/// Query parameters selecting a test from the catalog.
#[derive(Debug, Default, Deserialize)]
pub struct TestSelector {
    pub test: Option<String>,
}
