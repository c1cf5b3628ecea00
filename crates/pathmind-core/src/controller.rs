//! Async driver for a [`TestSession`].
//!
//! One spawned task owns the session. It loads the questions, ticks the
//! countdown, serializes learner commands, and runs at most one submission
//! at a time. The tick, the commands, and the in-flight submission are
//! multiplexed with `tokio::select!`, so a timeout racing a manual submit is
//! resolved by whichever reaches the state machine first.
//!
//! Dropping the [`SessionHandle`] aborts the task, which stops the ticker on
//! every exit path.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, OptionFuture};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::error::SessionError;
use crate::model::{OptionId, SubmitRequest, TestId, TestResult, UserId, DEFAULT_TIME_LIMIT_SECS};
use crate::session::{SessionSnapshot, SessionState, SubmitTrigger, TestSession, TickOutcome};
use crate::traits::AssessmentBackend;

/// Configuration for a session task.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Countdown budget in seconds.
    pub time_limit_secs: u64,
    /// Length of one countdown step. One second outside of tests.
    pub tick_interval: Duration,
    /// Capacity of the command queue.
    pub command_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            time_limit_secs: DEFAULT_TIME_LIMIT_SECS,
            tick_interval: Duration::from_secs(1),
            command_buffer: 16,
        }
    }
}

/// Where to go once a session completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultsView {
    pub test_id: TestId,
}

impl ResultsView {
    /// Route of the results view, keyed by test.
    pub fn route(&self) -> String {
        format!("/adaptive-tests/{}/results", self.test_id)
    }
}

/// How a session task ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Answers were scored; navigate to `view`.
    Submitted {
        result: TestResult,
        view: ResultsView,
    },
    /// Questions could not be loaded.
    Errored(String),
    /// The session was abandoned before submission.
    Cancelled,
}

type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

enum Command {
    Next(Reply<bool>),
    Previous(Reply<bool>),
    Answer(OptionId, Reply<()>),
    ToggleExplanation(Reply<bool>),
    Submit(Reply<()>),
}

/// Spawns session tasks.
pub struct SessionController;

impl SessionController {
    /// Start a session for `user_id` on `test_id`. Must be called inside a tokio runtime.
    pub fn start(
        backend: Arc<dyn AssessmentBackend>,
        config: SessionConfig,
        test_id: TestId,
        user_id: UserId,
    ) -> SessionHandle {
        let session = TestSession::new(test_id, user_id, config.time_limit_secs);
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer.max(1));
        let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot());

        let task = tokio::spawn(run_session(
            session,
            backend,
            config,
            command_rx,
            snapshot_tx,
        ));

        SessionHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
            task: Some(task),
        }
    }
}

/// Learner-facing handle to a running session.
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
    task: Option<JoinHandle<SessionOutcome>>,
}

impl SessionHandle {
    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)?
    }

    /// Go to the next question; `Ok(false)` at the last one.
    pub async fn next(&self) -> Result<bool, SessionError> {
        self.request(Command::Next).await
    }

    /// Go to the previous question; `Ok(false)` at the first one.
    pub async fn previous(&self) -> Result<bool, SessionError> {
        self.request(Command::Previous).await
    }

    /// Answer the current question.
    pub async fn answer(&self, option: impl Into<OptionId>) -> Result<(), SessionError> {
        let option = option.into();
        self.request(|reply| Command::Answer(option, reply)).await
    }

    pub async fn toggle_explanation(&self) -> Result<bool, SessionError> {
        self.request(Command::ToggleExplanation).await
    }

    /// Start submitting. Returns once the submission is in flight; the
    /// outcome arrives through snapshots and [`SessionHandle::finished`].
    pub async fn submit(&self) -> Result<(), SessionError> {
        self.request(Command::Submit).await
    }

    /// Latest published state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until a snapshot satisfies `predicate`.
    pub async fn wait_until(
        &self,
        predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> Result<SessionSnapshot, SessionError> {
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(predicate)
            .await
            .map_err(|_| SessionError::Closed)?;
        Ok(snapshot.clone())
    }

    /// Wait for the session task to end.
    pub async fn finished(mut self) -> SessionOutcome {
        match self.task.take() {
            Some(task) => task.await.unwrap_or(SessionOutcome::Cancelled),
            None => SessionOutcome::Cancelled,
        }
    }

    /// Abandon the session.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

fn submission(
    backend: Arc<dyn AssessmentBackend>,
    request: SubmitRequest,
) -> BoxFuture<'static, anyhow::Result<TestResult>> {
    async move { backend.submit(&request).await }.boxed()
}

async fn run_session(
    mut session: TestSession,
    backend: Arc<dyn AssessmentBackend>,
    config: SessionConfig,
    mut commands: mpsc::Receiver<Command>,
    snapshots: watch::Sender<SessionSnapshot>,
) -> SessionOutcome {
    let test_id = session.test_id();
    let fetched = backend.fetch_questions(test_id).await;
    let loaded = session.load(fetched);
    snapshots.send_replace(session.snapshot());
    if loaded != Ok(SessionState::Active) {
        let message = session
            .last_error()
            .unwrap_or("failed to load questions")
            .to_string();
        return SessionOutcome::Errored(message);
    }

    let period = config.tick_interval;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut in_flight: Option<BoxFuture<'static, anyhow::Result<TestResult>>> = None;

    loop {
        tokio::select! {
            Some(outcome) = OptionFuture::from(in_flight.as_mut()), if in_flight.is_some() => {
                in_flight = None;
                match outcome {
                    Ok(result) => {
                        if session.submission_succeeded(result.clone()).is_ok() {
                            snapshots.send_replace(session.snapshot());
                            return SessionOutcome::Submitted {
                                result,
                                view: ResultsView { test_id },
                            };
                        }
                    }
                    Err(e) => {
                        let _ = session.submission_failed(format!("failed to submit answers: {e}"));
                    }
                }
                snapshots.send_replace(session.snapshot());
            }
            _ = ticker.tick() => {
                match session.tick() {
                    TickOutcome::Expired(request) => {
                        in_flight = Some(submission(Arc::clone(&backend), request));
                    }
                    TickOutcome::Counting(_) => {}
                    TickOutcome::Idle => continue,
                }
                snapshots.send_replace(session.snapshot());
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    tracing::debug!(session = %session.id(), "all handles dropped");
                    return SessionOutcome::Cancelled;
                };
                match command {
                    Command::Next(reply) => {
                        let _ = reply.send(session.next());
                    }
                    Command::Previous(reply) => {
                        let _ = reply.send(session.previous());
                    }
                    Command::Answer(option, reply) => {
                        let _ = reply.send(session.answer(option));
                    }
                    Command::ToggleExplanation(reply) => {
                        let _ = reply.send(session.toggle_explanation());
                    }
                    Command::Submit(reply) => {
                        match session.begin_submit(SubmitTrigger::User) {
                            Ok(request) => {
                                in_flight = Some(submission(Arc::clone(&backend), request));
                                let _ = reply.send(Ok(()));
                            }
                            Err(e) => {
                                let _ = reply.send(Err(e));
                            }
                        }
                    }
                }
                snapshots.send_replace(session.snapshot());
            }
        }
    }
}
