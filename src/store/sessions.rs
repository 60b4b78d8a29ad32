// src/store/sessions.rs

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        result::TestResult,
        session::{AnswerMap, Session, SessionStatus},
    },
    services::grading,
    store::answer_keys::AnswerKeyStore,
    utils::clock::Clock,
};

/// In-memory session registry. Sessions live for the lifetime of the process.
#[derive(Debug)]
pub struct SessionManager {
    answer_keys: Arc<AnswerKeyStore>,
    sessions: RwLock<HashMap<String, Session>>,
    clock: Clock,
}

impl SessionManager {
    pub fn new(answer_keys: Arc<AnswerKeyStore>) -> Self {
        Self::with_clock(answer_keys, Clock::System)
    }

    pub fn with_clock(answer_keys: Arc<AnswerKeyStore>, clock: Clock) -> Self {
        Self {
            answer_keys,
            sessions: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub fn answer_keys(&self) -> &Arc<AnswerKeyStore> {
        &self.answer_keys
    }

    /// Starts a new attempt at `test_id`.
    pub async fn create_session(&self, test_id: &str) -> Result<Session, AppError> {
        // Resolve first so unknown tests never allocate a session.
        let test = self.answer_keys.full_test(test_id)?;

        let session = Session {
            id: Uuid::new_v4().to_string(),
            test_config_id: test.id.clone(),
            started_at: self.clock.now(),
            answers: AnswerMap::new(),
            status: SessionStatus::InProgress,
            completed_at: None,
        };

        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());

        tracing::info!(session_id = %session.id, test_id = %session.test_config_id, "Session started");
        Ok(session)
    }

    pub async fn get_session(&self, id: &str) -> Result<Session, AppError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))
    }

    /// Grades and closes a session.
    ///
    /// The status check, grading and the terminal write all happen under one
    /// write lock, so concurrent calls for the same session yield exactly one
    /// result and `InvalidState` for the rest.
    pub async fn finalize(
        &self,
        id: &str,
        answers: AnswerMap,
        timed_out: bool,
    ) -> Result<TestResult, AppError> {
        let mut sessions = self.sessions.write().await;

        let session = sessions
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

        if session.status.is_terminal() {
            tracing::warn!(session_id = %id, "Rejected submission for finalized session");
            return Err(AppError::InvalidState("Test already submitted".to_string()));
        }

        let test = self.answer_keys.full_test(&session.test_config_id).map_err(|e| {
            AppError::InternalServerError(format!(
                "Session {} references missing test: {}",
                id, e
            ))
        })?;

        grading::validate_submission(&test, &answers)?;

        let completed_at = self.clock.now();
        let result = grading::grade(&test, id, &answers, timed_out, completed_at);

        session.answers = answers;
        session.status = result.status.into();
        session.completed_at = Some(completed_at);

        tracing::info!(
            session_id = %id,
            score = result.score,
            correct = result.correct_answers,
            total = result.total_questions,
            status = ?result.status,
            "Session finalized"
        );
        Ok(result)
    }

    /// Recomputes the result of a finalized session from its stored answers.
    pub async fn result(&self, id: &str) -> Result<TestResult, AppError> {
        let session = self.get_session(id).await?;

        let completed_at = match (session.status, session.completed_at) {
            (SessionStatus::InProgress, _) => {
                return Err(AppError::InvalidState("Test not yet submitted".to_string()));
            }
            (_, Some(at)) => at,
            (_, None) => {
                return Err(AppError::InternalServerError(format!(
                    "Session {} is terminal without a completion time",
                    id
                )));
            }
        };

        let test = self.answer_keys.full_test(&session.test_config_id)?;
        Ok(grading::grade(
            &test,
            &session.id,
            &session.answers,
            session.status == SessionStatus::TimedOut,
            completed_at,
        ))
    }
}
