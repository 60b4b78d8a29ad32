// src/models/result.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::session::SessionStatus;

/// Terminal status of a graded attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinalStatus {
    Completed,
    TimedOut,
}

impl FinalStatus {
    pub fn from_timed_out(timed_out: bool) -> Self {
        if timed_out {
            FinalStatus::TimedOut
        } else {
            FinalStatus::Completed
        }
    }
}

impl From<FinalStatus> for SessionStatus {
    fn from(status: FinalStatus) -> Self {
        match status {
            FinalStatus::Completed => SessionStatus::Completed,
            FinalStatus::TimedOut => SessionStatus::TimedOut,
        }
    }
}

/// Per-question grading outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerDetail {
    pub question_id: u32,
    /// `None` (JSON `null`) when the question was left unanswered.
    pub selected_option_index: Option<usize>,
    pub correct_option_index: usize,
    pub is_correct: bool,
}

/// The graded outcome of a finalized session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub session_id: String,
    pub total_questions: usize,
    pub correct_answers: usize,
    /// Percentage 0-100, rounded half up.
    pub score: u32,
    /// One entry per question, in test order.
    pub answers: Vec<AnswerDetail>,
    pub completed_at: DateTime<Utc>,
    pub status: FinalStatus,
}

impl TestResult {
    pub fn grade(&self) -> ScoreGrade {
        ScoreGrade::from_score(self.score)
    }
}

/// Qualitative band for a score, as shown on the results screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreGrade {
    Excellent,
    VeryGood,
    Good,
    Satisfactory,
    NeedsImprovement,
    Insufficient,
}

impl ScoreGrade {
    pub fn from_score(score: u32) -> Self {
        match score {
            90.. => ScoreGrade::Excellent,
            80..=89 => ScoreGrade::VeryGood,
            70..=79 => ScoreGrade::Good,
            60..=69 => ScoreGrade::Satisfactory,
            50..=59 => ScoreGrade::NeedsImprovement,
            _ => ScoreGrade::Insufficient,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScoreGrade::Excellent => "Excellent",
            ScoreGrade::VeryGood => "Very Good",
            ScoreGrade::Good => "Good",
            ScoreGrade::Satisfactory => "Satisfactory",
            ScoreGrade::NeedsImprovement => "Needs Improvement",
            ScoreGrade::Insufficient => "Insufficient",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            ScoreGrade::Excellent => "Outstanding performance!",
            ScoreGrade::VeryGood => "Great job!",
            ScoreGrade::Good => "Well done!",
            ScoreGrade::Satisfactory => "You passed!",
            ScoreGrade::NeedsImprovement => "Keep practicing!",
            ScoreGrade::Insufficient => "Review the material and try again.",
        }
    }

    /// Satisfactory and above count as a pass.
    pub fn passed(self) -> bool {
        matches!(
            self,
            ScoreGrade::Excellent | ScoreGrade::VeryGood | ScoreGrade::Good | ScoreGrade::Satisfactory
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_band_boundaries() {
        assert_eq!(ScoreGrade::from_score(100), ScoreGrade::Excellent);
        assert_eq!(ScoreGrade::from_score(90), ScoreGrade::Excellent);
        assert_eq!(ScoreGrade::from_score(89), ScoreGrade::VeryGood);
        assert_eq!(ScoreGrade::from_score(70), ScoreGrade::Good);
        assert_eq!(ScoreGrade::from_score(60), ScoreGrade::Satisfactory);
        assert_eq!(ScoreGrade::from_score(59), ScoreGrade::NeedsImprovement);
        assert_eq!(ScoreGrade::from_score(49), ScoreGrade::Insufficient);
        assert_eq!(ScoreGrade::from_score(0), ScoreGrade::Insufficient);
    }

    #[test]
    fn test_pass_threshold() {
        assert!(ScoreGrade::from_score(60).passed());
        assert!(!ScoreGrade::from_score(59).passed());
    }

    #[test]
    fn test_final_status_maps_to_session_status() {
        assert_eq!(SessionStatus::from(FinalStatus::from_timed_out(true)), SessionStatus::TimedOut);
        assert_eq!(SessionStatus::from(FinalStatus::from_timed_out(false)), SessionStatus::Completed);
    }
}
