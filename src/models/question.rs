// src/models/question.rs

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// A single multiple-choice question, including its answer key.
///
/// Deliberately not `Serialize`: the only wire representation is
/// [`PublicQuestion`], which has no field for the correct option.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Unique positive identifier within its test.
    pub id: u32,

    /// The prompt shown to the candidate.
    pub text: String,

    /// Ordered answer options (at least two).
    pub options: Vec<String>,

    /// 0-based index into `options`.
    pub correct_option_index: usize,
}

/// DTO for sending a question to the client (excludes the answer key).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicQuestion {
    pub id: u32,
    pub text: String,
    pub options: Vec<String>,
}

/// An immutable assessment: questions plus timing configuration.
#[derive(Debug, Clone, Deserialize, Validate, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = validate_definition))]
pub struct TestDefinition {
    #[validate(length(min = 1, max = 100))]
    pub id: String,

    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(max = 2000))]
    pub description: String,

    /// Time allowed for one attempt, in minutes.
    #[validate(range(min = 1, max = 1440))]
    pub duration_minutes: u32,

    pub questions: Vec<Question>,
}

/// Public projection of a [`TestDefinition`], safe to send before submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicTestDefinition {
    pub id: String,
    pub title: String,
    pub description: String,
    pub duration_minutes: u32,
    pub questions: Vec<PublicQuestion>,
}

/// Catalog listing entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TestSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub duration_minutes: u32,
    pub question_count: usize,
}

impl TestDefinition {
    pub fn public_view(&self) -> PublicTestDefinition {
        PublicTestDefinition {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            duration_minutes: self.duration_minutes,
            questions: self
                .questions
                .iter()
                .map(|q| PublicQuestion {
                    id: q.id,
                    text: q.text.clone(),
                    options: q.options.clone(),
                })
                .collect(),
        }
    }

    pub fn summary(&self) -> TestSummary {
        TestSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            duration_minutes: self.duration_minutes,
            question_count: self.questions.len(),
        }
    }

    pub fn question(&self, id: u32) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}

// Struct-level so `Question` never needs `Serialize` for error params.
fn validate_definition(def: &TestDefinition) -> Result<(), validator::ValidationError> {
    validate_questions(&def.questions)
}

/// Validates the question list as a whole: non-empty, unique positive ids,
/// at least two options each, and an in-range correct index.
fn validate_questions(questions: &[Question]) -> Result<(), validator::ValidationError> {
    if questions.is_empty() {
        return Err(validator::ValidationError::new("questions_cannot_be_empty"));
    }

    let mut seen = HashSet::new();
    for q in questions {
        if q.id == 0 {
            return Err(validator::ValidationError::new("question_id_must_be_positive"));
        }
        if !seen.insert(q.id) {
            return Err(validator::ValidationError::new("duplicate_question_id"));
        }
        if q.text.trim().is_empty() {
            return Err(validator::ValidationError::new("question_text_cannot_be_empty"));
        }
        if q.options.len() < 2 {
            return Err(validator::ValidationError::new("too_few_options"));
        }
        if q.correct_option_index >= q.options.len() {
            return Err(validator::ValidationError::new("correct_option_out_of_range"));
        }
    }
    Ok(())
}
