// src/handlers/test_config.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde_json::json;

use crate::{error::AppError, models::session::TestSelector, store::answer_keys::AnswerKeyStore};

/// Maps a lookup failure on the *configured* test to a server error.
///
/// An unknown id the client asked for is its own mistake (404); a default
/// that does not resolve is a deployment problem (500).
pub(crate) fn selection_error(explicit: bool, err: AppError) -> AppError {
    match err {
        AppError::NotFound(msg) if !explicit => {
            AppError::InternalServerError(format!("Configured test unavailable: {}", msg))
        }
        other => other,
    }
}

/// Returns the public view of a test (no answer key).
///
/// Serves the default test unless `?test=<id>` names another catalog entry.
pub async fn get_test_config(
    State(answer_keys): State<Arc<AnswerKeyStore>>,
    Query(selector): Query<TestSelector>,
) -> Result<impl IntoResponse, AppError> {
    let test = answer_keys
        .public_test(selector.test.as_deref())
        .map_err(|e| selection_error(selector.test.is_some(), e))?;

    Ok(Json(test))
}

/// Lists the catalog.
pub async fn list_tests(State(answer_keys): State<Arc<AnswerKeyStore>>) -> impl IntoResponse {
    Json(answer_keys.list_tests())
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_error_mapping() {
        let implicit = selection_error(false, AppError::NotFound("x".into()));
        assert!(matches!(implicit, AppError::InternalServerError(_)));

        let explicit = selection_error(true, AppError::NotFound("x".into()));
        assert!(matches!(explicit, AppError::NotFound(_)));
    }
}
