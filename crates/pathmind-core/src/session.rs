//! The test-taking state machine.
//!
//! `TestSession` is pure and synchronous: it owns the question list, the
//! current position, the answers, and the countdown, and decides which
//! transitions are legal. The async driver in [`crate::controller`] feeds it
//! ticks, user commands, and backend outcomes.
//!
//! ```text
//! Loading ──questions──▶ Active ──timeout / submit──▶ Submitting ──ok──▶ Submitted
//!    │                     ▲                              │
//!    └──error / empty──▶ Errored                          └──failure──┘
//! ```

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use crate::error::SessionError;
use crate::model::{
    AnswerMap, OptionId, Question, SubmitRequest, TestId, TestResult, UserId,
};

/// Lifecycle state of a test session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Loading,
    Active,
    Submitting,
    Submitted,
    Errored,
}

impl SessionState {
    /// No transition leaves a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Submitted | SessionState::Errored)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Loading => write!(f, "loading"),
            SessionState::Active => write!(f, "active"),
            SessionState::Submitting => write!(f, "submitting"),
            SessionState::Submitted => write!(f, "submitted"),
            SessionState::Errored => write!(f, "errored"),
        }
    }
}

/// What caused a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    /// Explicit learner action on the last question.
    User,
    /// The countdown reached zero.
    Timeout,
}

/// Result of one timer tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// The session is not counting down (not active, or already expired).
    Idle,
    /// One second elapsed; this many remain.
    Counting(u64),
    /// The countdown just reached zero and the session moved to `Submitting`.
    Expired(SubmitRequest),
}

/// Point-in-time view of a session for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub test_id: TestId,
    pub state: SessionState,
    /// Zero-based index of the current question.
    pub index: usize,
    pub total: usize,
    pub question: Option<Question>,
    /// The stored answer for the current question.
    pub selected: Option<OptionId>,
    pub answered: usize,
    pub remaining_secs: u64,
    pub show_explanation: bool,
    pub last_error: Option<String>,
    pub result: Option<TestResult>,
}

impl SessionSnapshot {
    pub fn is_last_question(&self) -> bool {
        self.total > 0 && self.index + 1 == self.total
    }
}

/// One learner's attempt at a single test.
#[derive(Debug)]
pub struct TestSession {
    id: Uuid,
    test_id: TestId,
    user_id: UserId,
    state: SessionState,
    questions: Vec<Question>,
    index: usize,
    answers: AnswerMap,
    time_limit_secs: u64,
    remaining_secs: u64,
    show_explanation: bool,
    last_error: Option<String>,
    result: Option<TestResult>,
}

impl TestSession {
    /// Create a session in `Loading`. A zero time limit is treated as one second.
    pub fn new(test_id: TestId, user_id: UserId, time_limit_secs: u64) -> Self {
        let time_limit_secs = time_limit_secs.max(1);
        Self {
            id: Uuid::new_v4(),
            test_id,
            user_id,
            state: SessionState::Loading,
            questions: Vec::new(),
            index: 0,
            answers: AnswerMap::new(),
            time_limit_secs,
            remaining_secs: time_limit_secs,
            show_explanation: false,
            last_error: None,
            result: None,
        }
    }

    /// Apply the outcome of the question fetch.
    ///
    /// A non-empty list activates the session; a fetch error or an empty list
    /// moves it to `Errored`.
    pub fn load(&mut self, fetched: anyhow::Result<Vec<Question>>) -> Result<SessionState, SessionError> {
        if self.state != SessionState::Loading {
            return Err(SessionError::AlreadyLoaded);
        }
        match fetched {
            Ok(questions) if !questions.is_empty() => {
                tracing::info!(
                    session = %self.id,
                    test_id = %self.test_id,
                    questions = questions.len(),
                    "session active"
                );
                self.questions = questions;
                self.state = SessionState::Active;
            }
            Ok(_) => {
                tracing::warn!(test_id = %self.test_id, "test has no questions");
                self.last_error = Some("no questions available for this test".to_string());
                self.state = SessionState::Errored;
            }
            Err(e) => {
                tracing::warn!(test_id = %self.test_id, "failed to load questions: {e:#}");
                self.last_error = Some(format!("failed to load questions: {e}"));
                self.state = SessionState::Errored;
            }
        }
        Ok(self.state)
    }

    fn require_active(&self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Active => Ok(()),
            other => Err(SessionError::NotActive(other)),
        }
    }

    /// Move to the next question. Returns whether the index changed.
    pub fn next(&mut self) -> Result<bool, SessionError> {
        self.require_active()?;
        if self.index + 1 < self.questions.len() {
            self.index += 1;
            self.show_explanation = false;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Move to the previous question. Returns whether the index changed.
    pub fn previous(&mut self) -> Result<bool, SessionError> {
        self.require_active()?;
        if self.index > 0 {
            self.index -= 1;
            self.show_explanation = false;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Set or overwrite the answer for the current question.
    pub fn answer(&mut self, option: OptionId) -> Result<(), SessionError> {
        self.require_active()?;
        let question = &self.questions[self.index];
        if question.option(&option).is_none() {
            return Err(SessionError::UnknownOption {
                question: question.id.to_string(),
                option: option.to_string(),
            });
        }
        self.answers.insert(question.id.clone(), option);
        Ok(())
    }

    /// Show or hide the explanation of the current question. Returns the new visibility.
    pub fn toggle_explanation(&mut self) -> Result<bool, SessionError> {
        self.require_active()?;
        self.show_explanation = !self.show_explanation;
        Ok(self.show_explanation)
    }

    /// Advance the countdown by one second.
    ///
    /// Only an active session counts down. Reaching zero starts the timeout
    /// submission exactly once; a session that returns to `Active` after a
    /// failed timeout submission stays at zero and must be submitted by hand.
    pub fn tick(&mut self) -> TickOutcome {
        if self.state != SessionState::Active || self.remaining_secs == 0 {
            return TickOutcome::Idle;
        }
        self.remaining_secs -= 1;
        if self.remaining_secs > 0 {
            return TickOutcome::Counting(self.remaining_secs);
        }
        tracing::info!(session = %self.id, "time is up, submitting");
        match self.begin_submit(SubmitTrigger::Timeout) {
            Ok(request) => TickOutcome::Expired(request),
            Err(_) => TickOutcome::Idle,
        }
    }

    /// Enter `Submitting` and build the request to send.
    ///
    /// Only an active session can start a submission, so a second trigger
    /// arriving while one is in flight (or after success) is rejected.
    pub fn begin_submit(&mut self, trigger: SubmitTrigger) -> Result<SubmitRequest, SessionError> {
        match self.state {
            SessionState::Active => {}
            SessionState::Submitting => return Err(SessionError::SubmissionInProgress),
            SessionState::Submitted => return Err(SessionError::AlreadySubmitted),
            other => return Err(SessionError::NotActive(other)),
        }
        // An expired session may be resubmitted from any question.
        if trigger == SubmitTrigger::User && !self.is_last_question() && self.remaining_secs > 0 {
            return Err(SessionError::NotOnLastQuestion {
                current: self.index + 1,
                total: self.questions.len(),
            });
        }

        self.state = SessionState::Submitting;
        self.last_error = None;
        tracing::info!(
            session = %self.id,
            ?trigger,
            answered = self.answers.len(),
            total = self.questions.len(),
            "submitting answers"
        );

        Ok(SubmitRequest {
            test_id: self.test_id,
            user_id: self.user_id,
            answers: self.answers.clone(),
            time_spent_secs: Some(self.elapsed_secs()),
        })
    }

    /// The backend accepted the submission.
    pub fn submission_succeeded(&mut self, result: TestResult) -> Result<(), SessionError> {
        if self.state != SessionState::Submitting {
            return Err(SessionError::NotActive(self.state));
        }
        tracing::info!(session = %self.id, score = result.score, "submission accepted");
        self.result = Some(result);
        self.state = SessionState::Submitted;
        Ok(())
    }

    /// The submission failed; return to `Active` with the answers intact.
    pub fn submission_failed(&mut self, message: impl Into<String>) -> Result<(), SessionError> {
        if self.state != SessionState::Submitting {
            return Err(SessionError::NotActive(self.state));
        }
        let message = message.into();
        tracing::warn!(session = %self.id, "submission failed: {message}");
        self.last_error = Some(message);
        self.state = SessionState::Active;
        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn test_id(&self) -> TestId {
        self.test_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.index)
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.time_limit_secs - self.remaining_secs
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn result(&self) -> Option<&TestResult> {
        self.result.as_ref()
    }

    pub fn is_last_question(&self) -> bool {
        !self.questions.is_empty() && self.index + 1 == self.questions.len()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let question = self.current_question().cloned();
        let selected = question
            .as_ref()
            .and_then(|q| self.answers.get(&q.id))
            .cloned();
        SessionSnapshot {
            session_id: self.id,
            test_id: self.test_id,
            state: self.state,
            index: self.index,
            total: self.questions.len(),
            question,
            selected,
            answered: self.answers.len(),
            remaining_secs: self.remaining_secs,
            show_explanation: self.show_explanation,
            last_error: self.last_error.clone(),
            result: self.result.clone(),
        }
    }
}
