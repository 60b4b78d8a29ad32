// src/client/mod.rs

//! Test-taking side of an attempt.
//!
//! A [`coordinator::SubmissionCoordinator`] is created from a session, keeps
//! the candidate's answers in a local [`draft::AnswerDraft`], and counts down
//! to a [`timer::Deadline`] fixed at session start. Whether the user submits
//! or the deadline passes, the [`latch::SubmitLatch`] lets exactly one
//! submission through to the backend ([`api::AssessmentApi`]), which is either
//! the HTTP service or the in-process store.

pub mod api;
pub mod coordinator;
pub mod draft;
pub mod latch;
pub mod timer;
