// src/services/grading.rs

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        question::TestDefinition,
        result::{AnswerDetail, FinalStatus, TestResult},
        session::AnswerMap,
    },
};

/// Rounded percentage, 0.5 rounding up. Integer-only so results are reproducible.
pub fn score_percentage(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((correct * 100 + total / 2) / total) as u32
}

/// Checks a submission against the test it targets.
///
/// Every key must be the id of one of the test's questions and every index
/// must address one of that question's options.
pub fn validate_submission(test: &TestDefinition, answers: &AnswerMap) -> Result<(), AppError> {
    let known: HashSet<String> = test.questions.iter().map(|q| q.id.to_string()).collect();

    for (key, &selected) in answers {
        if !known.contains(key) {
            return Err(AppError::BadRequest(format!(
                "Unknown question id '{}'",
                key
            )));
        }

        // Known keys are canonical ids, so the parse cannot fail here.
        let question = key
            .parse::<u32>()
            .ok()
            .and_then(|id| test.question(id))
            .ok_or_else(|| AppError::BadRequest(format!("Unknown question id '{}'", key)))?;

        if selected >= question.options.len() {
            return Err(AppError::BadRequest(format!(
                "Option index {} is out of range for question {}",
                selected, question.id
            )));
        }
    }

    Ok(())
}

/// Grades a submission.
///
/// Pure: the same inputs always produce the same result. Questions are visited
/// in test order; a question missing from `answers` is unanswered and counts
/// as incorrect. Whether the attempt timed out is decided by the caller.
pub fn grade(
    test: &TestDefinition,
    session_id: &str,
    answers: &AnswerMap,
    timed_out: bool,
    completed_at: DateTime<Utc>,
) -> TestResult {
    let details: Vec<AnswerDetail> = test
        .questions
        .iter()
        .map(|question| {
            let selected = answers.get(&question.id.to_string()).copied();
            AnswerDetail {
                question_id: question.id,
                selected_option_index: selected,
                correct_option_index: question.correct_option_index,
                is_correct: selected == Some(question.correct_option_index),
            }
        })
        .collect();

    let correct_answers = details.iter().filter(|d| d.is_correct).count();
    let total_questions = details.len();

    TestResult {
        session_id: session_id.to_string(),
        total_questions,
        correct_answers,
        score: score_percentage(correct_answers, total_questions),
        answers: details,
        completed_at,
        status: FinalStatus::from_timed_out(timed_out),
    }
}
