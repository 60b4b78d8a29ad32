// src/client/api.rs

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, de::DeserializeOwned};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        question::PublicTestDefinition,
        result::TestResult,
        session::{Session, SubmitTestRequest},
    },
    store::sessions::SessionManager,
};

/// Failures seen by the test-taking client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Unknown test or session. Offer a way back to the start; do not retry.
    NotFound(String),
    /// The session is already finalized. Not a transient failure.
    AlreadySubmitted(String),
    /// The request was rejected as malformed.
    Validation(String),
    /// Network or server failure; the user may retry.
    Transient(String),
}

impl ClientError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Transient(_))
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::NotFound(msg) => write!(f, "not found: {}", msg),
            ClientError::AlreadySubmitted(msg) => write!(f, "already submitted: {}", msg),
            ClientError::Validation(msg) => write!(f, "invalid request: {}", msg),
            ClientError::Transient(msg) => write!(f, "temporary failure: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<AppError> for ClientError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::NotFound(msg) => ClientError::NotFound(msg),
            AppError::InvalidState(msg) => ClientError::AlreadySubmitted(msg),
            AppError::BadRequest(msg) => ClientError::Validation(msg),
            AppError::InternalServerError(msg) => ClientError::Transient(msg),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transient(err.to_string())
    }
}

/// The operations a test-taking client needs from the assessment backend.
#[async_trait]
pub trait AssessmentApi: Send + Sync {
    /// Public view of a test; `None` selects the default test.
    async fn fetch_test(&self, test_id: Option<&str>) -> Result<PublicTestDefinition, ClientError>;

    async fn start_session(&self, test_id: Option<&str>) -> Result<Session, ClientError>;

    async fn submit(&self, submission: &SubmitTestRequest) -> Result<TestResult, ClientError>;
}

/// Talks to the HTTP surface exposed by [`crate::routes::create_router`].
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    code: Option<String>,
}

/// Upper bound for a single request; expiry surfaces as [`ClientError::Transient`].
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> reqwest::Result<Self> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.json::<ErrorBody>().await.ok();
        let message = body
            .as_ref()
            .map(|b| b.error.clone())
            .unwrap_or_else(|| status.to_string());
        let code = body.and_then(|b| b.code);

        Err(match status {
            StatusCode::NOT_FOUND => ClientError::NotFound(message),
            StatusCode::BAD_REQUEST if code.as_deref() == Some("INVALID_STATE") => {
                ClientError::AlreadySubmitted(message)
            }
            StatusCode::BAD_REQUEST => ClientError::Validation(message),
            _ => ClientError::Transient(message),
        })
    }
}

#[async_trait]
impl AssessmentApi for HttpApi {
    async fn fetch_test(&self, test_id: Option<&str>) -> Result<PublicTestDefinition, ClientError> {
        let mut request = self.client.get(self.url("/api/test-config"));
        if let Some(id) = test_id {
            request = request.query(&[("test", id)]);
        }
        Self::decode(request.send().await?).await
    }

    async fn start_session(&self, test_id: Option<&str>) -> Result<Session, ClientError> {
        let mut request = self.client.post(self.url("/api/sessions"));
        if let Some(id) = test_id {
            request = request.query(&[("test", id)]);
        }
        Self::decode(request.send().await?).await
    }

    async fn submit(&self, submission: &SubmitTestRequest) -> Result<TestResult, ClientError> {
        let response = self
            .client
            .post(self.url("/api/sessions/submit"))
            .json(submission)
            .send()
            .await?;
        Self::decode(response).await
    }
}

/// Runs sessions and grading in-process, for deployments without a server.
#[derive(Debug, Clone)]
pub struct LocalApi {
    sessions: Arc<SessionManager>,
}

impl LocalApi {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl AssessmentApi for LocalApi {
    async fn fetch_test(&self, test_id: Option<&str>) -> Result<PublicTestDefinition, ClientError> {
        Ok(self.sessions.answer_keys().public_test(test_id)?)
    }

    async fn start_session(&self, test_id: Option<&str>) -> Result<Session, ClientError> {
        let test_id = test_id.unwrap_or(self.sessions.answer_keys().default_test_id());
        Ok(self.sessions.create_session(test_id).await?)
    }

    async fn submit(&self, submission: &SubmitTestRequest) -> Result<TestResult, ClientError> {
        submission.validate().map_err(AppError::from)?;
        Ok(self
            .sessions
            .finalize(
                &submission.session_id,
                submission.answers.clone(),
                submission.timed_out,
            )
            .await?)
    }
}
