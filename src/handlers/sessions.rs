// src/handlers/sessions.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    handlers::test_config::selection_error,
    models::session::{SubmitTestRequest, TestSelector},
    store::sessions::SessionManager,
};

/// Starts a new timed attempt at the default test (or `?test=<id>`).
pub async fn create_session(
    State(sessions): State<Arc<SessionManager>>,
    Query(selector): Query<TestSelector>,
) -> Result<impl IntoResponse, AppError> {
    let explicit = selector.test.is_some();
    let test_id = selector
        .test
        .unwrap_or_else(|| sessions.answer_keys().default_test_id().to_string());

    let session = sessions
        .create_session(&test_id)
        .await
        .map_err(|e| selection_error(explicit, e))?;

    Ok(Json(session))
}

/// Retrieves a session by ID.
pub async fn get_session(
    State(sessions): State<Arc<SessionManager>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let session = sessions.get_session(&id).await?;
    Ok(Json(session))
}

/// Returns the graded result of a finalized session.
pub async fn get_result(
    State(sessions): State<Arc<SessionManager>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let result = sessions.result(&id).await?;
    Ok(Json(result))
}

/// Submits a session's answers and returns the score breakdown.
///
/// * 400 if the body does not match the schema or addresses unknown options.
/// * 404 if the session does not exist.
/// * 400 if the session was already submitted.
pub async fn submit_session(
    State(sessions): State<Arc<SessionManager>>,
    payload: Result<Json<SubmitTestRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload.inspect_err(|e| {
        tracing::warn!("Rejected malformed submission: {}", e.body_text());
    })?;

    req.validate()?;

    let result = sessions
        .finalize(&req.session_id, req.answers, req.timed_out)
        .await?;

    Ok(Json(result))
}
