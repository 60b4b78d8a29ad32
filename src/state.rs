// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    store::{answer_keys::AnswerKeyStore, sessions::SessionManager},
    utils::clock::Clock,
};

/// Process-wide state handed to every handler. Owns the catalog and the
/// session registry; nothing lives in globals.
#[derive(Clone)]
pub struct AppState {
    pub answer_keys: Arc<AnswerKeyStore>,
    pub sessions: Arc<SessionManager>,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config, answer_keys: AnswerKeyStore) -> Self {
        Self::with_clock(config, answer_keys, Clock::System)
    }

    pub fn with_clock(config: Config, answer_keys: AnswerKeyStore, clock: Clock) -> Self {
        let answer_keys = Arc::new(answer_keys);
        let sessions = Arc::new(SessionManager::with_clock(Arc::clone(&answer_keys), clock));
        Self {
            answer_keys,
            sessions,
            config,
        }
    }
}

impl FromRef<AppState> for Arc<AnswerKeyStore> {
    fn from_ref(state: &AppState) -> Self {
        state.answer_keys.clone()
    }
}

impl FromRef<AppState> for Arc<SessionManager> {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}
