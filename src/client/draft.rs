// src/client/draft.rs

use std::sync::Arc;

use crate::models::session::{AnswerMap, SubmitTestRequest};

/// Answers picked so far. Local only: nothing is sent until `commit`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerDraft {
    answers: AnswerMap,
}

impl AnswerDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects `option` for a question, replacing any earlier pick.
    pub fn select(&mut self, question_id: u32, option: usize) {
        self.answers.insert(question_id.to_string(), option);
    }

    pub fn clear(&mut self, question_id: u32) -> Option<usize> {
        self.answers.remove(&question_id.to_string())
    }

    pub fn selected(&self, question_id: u32) -> Option<usize> {
        self.answers.get(&question_id.to_string()).copied()
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn progress_percent(&self, total_questions: usize) -> f64 {
        if total_questions == 0 {
            return 0.0;
        }
        self.answered_count() as f64 / total_questions as f64 * 100.0
    }

    /// Freezes the current answers for submission.
    pub fn commit(&self) -> AnswerSnapshot {
        AnswerSnapshot(Arc::new(self.answers.clone()))
    }
}

/// Immutable copy of a draft, handed to the grader as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSnapshot(Arc<AnswerMap>);

impl AnswerSnapshot {
    pub fn answers(&self) -> &AnswerMap {
        &self.0
    }

    pub fn to_request(&self, session_id: &str, timed_out: bool) -> SubmitTestRequest {
        SubmitTestRequest {
            session_id: session_id.to_string(),
            answers: (*self.0).clone(),
            timed_out,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_replaces_previous_pick() {
        let mut draft = AnswerDraft::new();
        draft.select(3, 1);
        draft.select(3, 2);

        assert_eq!(draft.selected(3), Some(2));
        assert_eq!(draft.answered_count(), 1);
        assert_eq!(draft.clear(3), Some(2));
        assert_eq!(draft.selected(3), None);
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_edits() {
        let mut draft = AnswerDraft::new();
        draft.select(1, 0);
        let snapshot = draft.commit();

        draft.select(2, 1);
        assert_eq!(snapshot.answers().len(), 1);

        let req = snapshot.to_request("s-1", true);
        assert_eq!(req.session_id, "s-1");
        assert!(req.timed_out);
        assert_eq!(req.answers.get("1"), Some(&0));
    }

    #[test]
    fn test_progress_percent() {
        let mut draft = AnswerDraft::new();
        assert_eq!(draft.progress_percent(0), 0.0);
        draft.select(1, 0);
        draft.select(2, 0);
        assert_eq!(draft.progress_percent(4), 50.0);
    }
}
