// src/client/coordinator.rs

use std::{sync::Arc, sync::OnceLock, time::Duration};

use chrono::{DateTime, Utc};
use tokio::{
    sync::{Mutex, watch},
    task::{JoinError, JoinHandle},
    time::MissedTickBehavior,
};

use crate::{
    client::{
        api::{AssessmentApi, ClientError},
        draft::AnswerDraft,
        latch::{LatchState, SubmitLatch},
        timer::{Deadline, TimeWarning, format_remaining},
    },
    models::{question::PublicTestDefinition, result::TestResult, session::Session},
    utils::clock::Clock,
};

/// Where the attempt is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Answers can still change; the countdown is live.
    Running,
    /// A submission is in flight.
    Submitting,
    /// Graded, or rejected in a way that must not be retried.
    Done,
}

impl From<LatchState> for Phase {
    fn from(state: LatchState) -> Self {
        match state {
            LatchState::Idle => Phase::Running,
            LatchState::Dispatching => Phase::Submitting,
            LatchState::Done => Phase::Done,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Submitted(TestResult),
    /// Another trigger already owns the submission.
    Suppressed,
}

/// Snapshot published on every countdown tick.
#[derive(Debug, Clone, PartialEq)]
pub struct CountdownState {
    pub remaining_secs: u64,
    pub display: String,
    pub warning: TimeWarning,
    pub time_progress_percent: f64,
    pub phase: Phase,
    pub timeout_due: bool,
}

/// Drives one attempt: holds the draft, watches the deadline and makes sure
/// exactly one submission (manual or timeout) reaches the grader.
pub struct SubmissionCoordinator {
    api: Arc<dyn AssessmentApi>,
    test: PublicTestDefinition,
    session_id: String,
    deadline: Deadline,
    latch: SubmitLatch,
    draft: Mutex<AnswerDraft>,
    result: OnceLock<TestResult>,
}

impl SubmissionCoordinator {
    pub fn new(
        api: Arc<dyn AssessmentApi>,
        test: PublicTestDefinition,
        session: &Session,
    ) -> Result<Self, ClientError> {
        if session.test_config_id != test.id {
            return Err(ClientError::Validation(format!(
                "Session {} belongs to test '{}', not '{}'",
                session.id, session.test_config_id, test.id
            )));
        }
        if session.status.is_terminal() {
            return Err(ClientError::AlreadySubmitted(format!(
                "Session {} is already finalized",
                session.id
            )));
        }

        Ok(Self {
            deadline: Deadline::new(session.started_at, test.duration_minutes),
            session_id: session.id.clone(),
            api,
            test,
            latch: SubmitLatch::new(),
            draft: Mutex::new(AnswerDraft::new()),
            result: OnceLock::new(),
        })
    }

    /// Fetches the test, opens a session for it and returns a coordinator
    /// counting down from the server's start time.
    pub async fn start(
        api: Arc<dyn AssessmentApi>,
        test_id: Option<&str>,
    ) -> Result<Self, ClientError> {
        let test = api.fetch_test(test_id).await?;
        let session = api.start_session(Some(&test.id)).await?;
        tracing::info!(session_id = %session.id, test_id = %test.id, "Attempt started");
        Self::new(api, test, &session)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn test(&self) -> &PublicTestDefinition {
        &self.test
    }

    pub fn deadline(&self) -> &Deadline {
        &self.deadline
    }

    pub fn phase(&self) -> Phase {
        self.latch.state().into()
    }

    /// The graded result, once a submission has succeeded.
    pub fn result(&self) -> Option<&TestResult> {
        self.result.get()
    }

    /// Records an answer in the local draft.
    ///
    /// Rejected once a submission has started, and for questions or options
    /// that are not part of the test.
    pub async fn select_answer(&self, question_id: u32, option: usize) -> Result<(), ClientError> {
        let question = self
            .test
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or_else(|| ClientError::Validation(format!("Unknown question {}", question_id)))?;
        if option >= question.options.len() {
            return Err(ClientError::Validation(format!(
                "Option {} is out of range for question {}",
                option, question_id
            )));
        }

        // Phase is checked under the draft lock; dispatch snapshots under the
        // same lock after taking the latch.
        let mut draft = self.draft.lock().await;
        if self.phase() != Phase::Running {
            return Err(ClientError::AlreadySubmitted(
                "Answers are locked once the test is submitted".to_string(),
            ));
        }
        draft.select(question_id, option);
        Ok(())
    }

    pub async fn draft(&self) -> AnswerDraft {
        self.draft.lock().await.clone()
    }

    /// Current countdown state at `now`.
    pub fn tick(&self, now: DateTime<Utc>) -> CountdownState {
        let remaining_secs = self.deadline.remaining_secs(now);
        let phase = self.phase();
        CountdownState {
            remaining_secs,
            display: format_remaining(remaining_secs),
            warning: TimeWarning::from_remaining(remaining_secs),
            time_progress_percent: self.deadline.time_progress_percent(now),
            phase,
            timeout_due: phase == Phase::Running && self.deadline.is_expired(now),
        }
    }

    /// Dispatches the timeout submission if the deadline has passed.
    ///
    /// Returns `None` when nothing was due.
    pub async fn on_tick(&self, now: DateTime<Utc>) -> Option<Result<SubmitOutcome, ClientError>> {
        if !self.tick(now).timeout_due {
            return None;
        }
        tracing::info!(session_id = %self.session_id, "Time is up, submitting");
        Some(self.dispatch(true).await)
    }

    /// User-initiated submission.
    pub async fn submit_now(&self) -> Result<SubmitOutcome, ClientError> {
        self.dispatch(false).await
    }

    async fn dispatch(&self, timed_out: bool) -> Result<SubmitOutcome, ClientError> {
        // Released on drop if the request is abandoned.
        let Some(in_flight) = self.latch.acquire() else {
            tracing::debug!(session_id = %self.session_id, timed_out, "Submission suppressed");
            return Ok(SubmitOutcome::Suppressed);
        };

        let snapshot = self.draft.lock().await.commit();
        let request = snapshot.to_request(&self.session_id, timed_out);

        match self.api.submit(&request).await {
            Ok(result) => {
                let result = self.result.get_or_init(|| result).clone();
                in_flight.complete();
                Ok(SubmitOutcome::Submitted(result))
            }
            Err(e) if e.is_retryable() => {
                tracing::warn!(session_id = %self.session_id, "Submission failed, retry allowed: {}", e);
                drop(in_flight);
                Err(e)
            }
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, "Submission rejected: {}", e);
                in_flight.complete();
                Err(e)
            }
        }
    }
}

/// Owns the countdown task. Dropping or cancelling the handle stops the task,
/// so a leftover tick can never submit.
pub struct CountdownHandle {
    task: JoinHandle<()>,
    updates: watch::Receiver<CountdownState>,
}

impl CountdownHandle {
    pub fn updates(&self) -> watch::Receiver<CountdownState> {
        self.updates.clone()
    }

    pub fn cancel(self) {
        self.task.abort();
    }

    /// Waits for the countdown to finish on its own (the attempt reached `Done`).
    pub async fn join(mut self) -> Result<(), JoinError> {
        (&mut self.task).await
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Starts ticking every `period`. A timeout dispatch that fails transiently is
/// retried on the following tick; the task ends once the attempt is `Done`.
pub fn spawn_countdown(
    coordinator: Arc<SubmissionCoordinator>,
    period: Duration,
    clock: Clock,
) -> CountdownHandle {
    let (tx, rx) = watch::channel(coordinator.tick(clock.now()));

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            let now = clock.now();

            match coordinator.on_tick(now).await {
                Some(Ok(SubmitOutcome::Submitted(result))) => {
                    tracing::info!(
                        session_id = %result.session_id,
                        score = result.score,
                        "Timed out attempt graded"
                    );
                }
                Some(Err(e)) => {
                    tracing::warn!(session_id = %coordinator.session_id(), "Timeout submission failed: {}", e);
                }
                Some(Ok(SubmitOutcome::Suppressed)) | None => {}
            }

            let state = coordinator.tick(now);
            let done = state.phase == Phase::Done;
            tx.send_replace(state);
            if done {
                break;
            }
        }
    });

    CountdownHandle { task, updates: rx }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client::api::LocalApi,
        config::DEFAULT_TEST_ID,
        models::{result::FinalStatus, session::SubmitTestRequest},
        store::{answer_keys::AnswerKeyStore, sessions::SessionManager},
    };
    use async_trait::async_trait;
    use chrono::{TimeDelta, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
    }

    /// Wraps the in-process API, counting submissions and optionally adding
    /// latency or failing the first few calls.
    struct ScriptedApi {
        inner: LocalApi,
        submits: AtomicUsize,
        latency: Duration,
        failures_left: AtomicUsize,
    }

    impl ScriptedApi {
        fn new(started_at: DateTime<Utc>) -> Self {
            let keys = Arc::new(AnswerKeyStore::builtin(DEFAULT_TEST_ID).unwrap());
            let sessions = Arc::new(SessionManager::with_clock(keys, Clock::fixed(started_at)));
            Self {
                inner: LocalApi::new(sessions),
                submits: AtomicUsize::new(0),
                latency: Duration::ZERO,
                failures_left: AtomicUsize::new(0),
            }
        }

        fn with_latency(mut self, latency: Duration) -> Self {
            self.latency = latency;
            self
        }

        fn failing(self, times: usize) -> Self {
            self.failures_left.store(times, Ordering::SeqCst);
            self
        }

        fn submits(&self) -> usize {
            self.submits.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AssessmentApi for ScriptedApi {
        async fn fetch_test(
            &self,
            test_id: Option<&str>,
        ) -> Result<PublicTestDefinition, ClientError> {
            self.inner.fetch_test(test_id).await
        }

        async fn start_session(&self, test_id: Option<&str>) -> Result<Session, ClientError> {
            self.inner.start_session(test_id).await
        }

        async fn submit(&self, submission: &SubmitTestRequest) -> Result<TestResult, ClientError> {
            self.submits.fetch_add(1, Ordering::SeqCst);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            let failing = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(ClientError::Transient("connection reset".into()));
            }
            self.inner.submit(submission).await
        }
    }

    async fn start(api: Arc<ScriptedApi>) -> SubmissionCoordinator {
        SubmissionCoordinator::start(api, None).await.unwrap()
    }

    #[tokio::test]
    async fn test_deadline_comes_from_session_start() {
        let api = Arc::new(ScriptedApi::new(t0()));
        let coordinator = start(api).await;

        assert_eq!(coordinator.deadline().ends_at(), t0() + TimeDelta::minutes(5));
        assert_eq!(coordinator.phase(), Phase::Running);

        let state = coordinator.tick(t0() + TimeDelta::seconds(61));
        assert_eq!(state.display, "03:59");
        assert_eq!(state.warning, TimeWarning::Low);
        assert!(!state.timeout_due);
    }

    #[tokio::test]
    async fn test_timeout_dispatches_once() {
        let api = Arc::new(ScriptedApi::new(t0()));
        let coordinator = start(Arc::clone(&api)).await;
        coordinator.select_answer(1, 2).await.unwrap();

        assert!(coordinator.on_tick(t0() + TimeDelta::seconds(299)).await.is_none());

        let outcome = coordinator
            .on_tick(t0() + TimeDelta::minutes(5))
            .await
            .expect("timeout due")
            .unwrap();
        let SubmitOutcome::Submitted(result) = outcome else {
            panic!("expected a submission");
        };
        assert_eq!(result.status, FinalStatus::TimedOut);
        assert_eq!(result.correct_answers, 1);

        assert!(coordinator.on_tick(t0() + TimeDelta::minutes(6)).await.is_none());
        assert_eq!(api.submits(), 1);
        assert_eq!(coordinator.phase(), Phase::Done);
        assert_eq!(coordinator.result(), Some(&result));
    }

    #[tokio::test]
    async fn test_manual_and_timeout_race_single_dispatch() {
        let api = Arc::new(ScriptedApi::new(t0()).with_latency(Duration::from_millis(50)));
        let coordinator = start(Arc::clone(&api)).await;

        let (manual, timeout) = tokio::join!(
            coordinator.submit_now(),
            coordinator.on_tick(t0() + TimeDelta::minutes(5)),
        );

        let outcomes = [manual.unwrap(), timeout.unwrap_or(Ok(SubmitOutcome::Suppressed)).unwrap()];
        let submitted = outcomes
            .iter()
            .filter(|o| matches!(o, SubmitOutcome::Submitted(_)))
            .count();

        assert_eq!(submitted, 1);
        assert_eq!(api.submits(), 1);
        assert_eq!(coordinator.phase(), Phase::Done);
    }

    #[tokio::test]
    async fn test_answers_locked_after_submit() {
        let api = Arc::new(ScriptedApi::new(t0()));
        let coordinator = start(api).await;

        coordinator.submit_now().await.unwrap();
        assert!(matches!(
            coordinator.select_answer(1, 0).await,
            Err(ClientError::AlreadySubmitted(_))
        ));
        assert!(matches!(
            coordinator.submit_now().await,
            Ok(SubmitOutcome::Suppressed)
        ));
    }

    #[tokio::test]
    async fn test_select_answer_validates_against_test() {
        let api = Arc::new(ScriptedApi::new(t0()));
        let coordinator = start(api).await;

        assert!(matches!(
            coordinator.select_answer(99, 0).await,
            Err(ClientError::Validation(_))
        ));
        assert!(matches!(
            coordinator.select_answer(1, 4).await,
            Err(ClientError::Validation(_))
        ));
        coordinator.select_answer(1, 3).await.unwrap();
        assert_eq!(coordinator.draft().await.selected(1), Some(3));
    }

    #[tokio::test]
    async fn test_transient_failure_releases_latch() {
        let api = Arc::new(ScriptedApi::new(t0()).failing(1));
        let coordinator = start(Arc::clone(&api)).await;

        let first = coordinator.submit_now().await;
        assert!(matches!(first, Err(ClientError::Transient(_))));
        assert_eq!(coordinator.phase(), Phase::Running);

        let second = coordinator.submit_now().await.unwrap();
        assert!(matches!(second, SubmitOutcome::Submitted(_)));
        assert_eq!(api.submits(), 2);
        assert_eq!(coordinator.phase(), Phase::Done);
    }

    #[tokio::test]
    async fn test_rejects_session_of_other_test() {
        let api: Arc<dyn AssessmentApi> = Arc::new(ScriptedApi::new(t0()));
        let test = api.fetch_test(Some("corporate-finance")).await.unwrap();
        let session = api.start_session(None).await.unwrap();

        assert!(matches!(
            SubmissionCoordinator::new(api, test, &session),
            Err(ClientError::Validation(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_submits_expired_attempt() {
        // Session opened long before the countdown starts: first tick is past the deadline.
        let started = Utc::now() - TimeDelta::minutes(10);
        let api = Arc::new(ScriptedApi::new(started));
        let coordinator = Arc::new(start(Arc::clone(&api)).await);

        let handle = spawn_countdown(
            Arc::clone(&coordinator),
            Duration::from_millis(10),
            Clock::System,
        );
        let updates = handle.updates();

        tokio::time::timeout(Duration::from_secs(5), handle.join())
            .await
            .expect("countdown should finish")
            .unwrap();

        assert_eq!(api.submits(), 1);
        assert_eq!(coordinator.result().unwrap().status, FinalStatus::TimedOut);
        assert_eq!(updates.borrow().phase, Phase::Done);
        assert_eq!(updates.borrow().display, "00:00");
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_stops_after_manual_submit() {
        let api = Arc::new(ScriptedApi::new(Utc::now()));
        let coordinator = Arc::new(start(Arc::clone(&api)).await);

        let handle = spawn_countdown(
            Arc::clone(&coordinator),
            Duration::from_millis(10),
            Clock::System,
        );
        coordinator.submit_now().await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle.join())
            .await
            .expect("countdown should stop once done")
            .unwrap();
        assert_eq!(api.submits(), 1);
        assert_eq!(coordinator.result().unwrap().status, FinalStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_countdown_never_submits() {
        let started = Utc::now() - TimeDelta::minutes(10);
        let api = Arc::new(ScriptedApi::new(started));
        let coordinator = Arc::new(start(Arc::clone(&api)).await);

        // First tick of an interval is immediate; cancel before the runtime polls the task.
        let handle = spawn_countdown(
            Arc::clone(&coordinator),
            Duration::from_millis(10),
            Clock::System,
        );
        handle.cancel();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(api.submits(), 0);
        assert_eq!(coordinator.phase(), Phase::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_submit_can_be_retried() {
        let api = Arc::new(ScriptedApi::new(t0()).with_latency(Duration::from_millis(200)));
        let coordinator = start(Arc::clone(&api)).await;
        coordinator.select_answer(1, 2).await.unwrap();

        // Caller stops waiting before the backend answers.
        let abandoned = tokio::time::timeout(Duration::from_millis(20), coordinator.submit_now()).await;
        assert!(abandoned.is_err());
        assert_eq!(coordinator.phase(), Phase::Running);
        assert!(coordinator.result().is_none());

        let outcome = coordinator
            .on_tick(t0() + TimeDelta::minutes(5))
            .await
            .expect("timeout still due")
            .unwrap();
        let SubmitOutcome::Submitted(result) = outcome else {
            panic!("expected the timeout to submit");
        };
        assert_eq!(result.status, FinalStatus::TimedOut);
        assert_eq!(result.correct_answers, 1);
        assert_eq!(api.submits(), 2);
        assert_eq!(coordinator.phase(), Phase::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_countdown_mid_submit_releases_latch() {
        let started = Utc::now() - TimeDelta::minutes(10);
        let api = Arc::new(ScriptedApi::new(started).with_latency(Duration::from_millis(200)));
        let coordinator = Arc::new(start(Arc::clone(&api)).await);

        let handle = spawn_countdown(
            Arc::clone(&coordinator),
            Duration::from_millis(10),
            Clock::System,
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(api.submits(), 1);
        assert_eq!(coordinator.phase(), Phase::Submitting);

        handle.cancel();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(coordinator.phase(), Phase::Running);
        assert!(coordinator.result().is_none());

        let outcome = coordinator.submit_now().await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Submitted(_)));
        assert_eq!(coordinator.phase(), Phase::Done);
    }
}
