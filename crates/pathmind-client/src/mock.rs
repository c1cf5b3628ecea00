//! In-memory backend for tests, demos, and offline use.
//!
//! Serves question banks, scores submissions locally, and keeps results and
//! enrollments per user. Failures can be injected to exercise error paths.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use pathmind_core::bank::{load_bank_directory, parse_bank, parse_bank_str, QuestionBank};
use pathmind_core::model::{
    Activity, ActivityKind, CompletedTest, Enrollment, LearningPath, LearningPathDetail,
    NodeStatus, PathId, PathNode, Question, SubmitRequest, TestId, TestResult, TestSummary,
    UserId, UserProgress,
};
use pathmind_core::scoring::score_submission;
use pathmind_core::traits::AssessmentBackend;

use crate::error::BackendError;

const BUNDLED_BANKS: &[(&str, &str)] = &[
    ("python.toml", include_str!("../fixtures/python.toml")),
    ("web.toml", include_str!("../fixtures/web.toml")),
    ("data_science.toml", include_str!("../fixtures/data_science.toml")),
];

/// At most this many entries in the activity feed and the recommendations.
const FEED_LIMIT: usize = 5;

/// Parse the banks shipped with the crate.
pub fn bundled_banks() -> Result<Vec<QuestionBank>> {
    BUNDLED_BANKS
        .iter()
        .map(|(name, content)| parse_bank_str(content, &PathBuf::from(name)))
        .collect()
}

fn content_step(id: u64, title: &str, description: &str) -> PathNode {
    PathNode {
        id,
        title: title.into(),
        description: description.into(),
        kind: "content".into(),
        status: NodeStatus::NotStarted,
        test_id: None,
    }
}

fn test_step(id: u64, title: &str, test_id: TestId) -> PathNode {
    PathNode {
        id,
        title: title.into(),
        description: format!("Take test {test_id} to complete this step"),
        kind: "test".into(),
        status: NodeStatus::NotStarted,
        test_id: Some(test_id),
    }
}

fn bundled_path(
    id: u64,
    title: &str,
    description: &str,
    estimated_time: &str,
    tags: &[&str],
    nodes: Vec<PathNode>,
) -> LearningPathDetail {
    LearningPathDetail {
        path: LearningPath {
            id: PathId(id),
            title: title.into(),
            description: description.into(),
            difficulty: Some("beginner".into()),
            estimated_time: Some(estimated_time.into()),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            total_steps: nodes.len() as u32,
            enrolled: false,
        },
        completed_steps: 0,
        progress: 0,
        nodes,
    }
}

/// Learning paths served alongside the bundled banks. Their test steps point
/// at the bundled tests.
pub fn bundled_learning_paths() -> Vec<LearningPathDetail> {
    vec![
        bundled_path(
            1,
            "Python programming basics",
            "From variables and types to functions and modules",
            "20 hours",
            &["python", "programming"],
            vec![
                content_step(1, "Variables and types", "Names, numbers, strings and lists"),
                test_step(2, "Python fundamentals check", TestId(1)),
                content_step(3, "Functions and modules", "def, imports and the standard library"),
            ],
        ),
        bundled_path(
            2,
            "Intro to web development",
            "HTML structure, CSS styling and how browsers talk HTTP",
            "30 hours",
            &["web", "html", "css"],
            vec![
                content_step(1, "HTML structure", "Elements, attributes and documents"),
                content_step(2, "Styling with CSS", "Selectors, the box model and layout"),
                test_step(3, "Web development concepts check", TestId(2)),
            ],
        ),
        bundled_path(
            3,
            "Data science primer",
            "Tables, summaries and a first look at models",
            "25 hours",
            &["data", "python"],
            vec![
                content_step(1, "Working with tables", "Loading and cleaning tabular data"),
                test_step(2, "Data science basics check", TestId(3)),
            ],
        ),
    ]
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A stored submission result.
#[derive(Clone)]
struct StoredResult {
    result: TestResult,
    completed_at: DateTime<Utc>,
}

/// An assessment backend held entirely in memory.
///
/// A path's test step counts as completed once the user has a stored result
/// for its test. Content steps are never completed here.
pub struct MockBackend {
    banks: BTreeMap<TestId, QuestionBank>,
    paths: Vec<LearningPathDetail>,
    results: Mutex<HashMap<(TestId, UserId), StoredResult>>,
    enrollments: Mutex<HashMap<(UserId, PathId), Enrollment>>,
    fail_question_loads: AtomicBool,
    failing_submissions: AtomicU32,
    submit_delay: Option<Duration>,
    fetch_count: AtomicU32,
    submit_count: AtomicU32,
    last_submission: Mutex<Option<SubmitRequest>>,
}

impl MockBackend {
    /// Create a backend serving the given banks and learning paths.
    pub fn new(banks: Vec<QuestionBank>, paths: Vec<LearningPathDetail>) -> Self {
        Self {
            banks: banks.into_iter().map(|b| (b.summary.id, b)).collect(),
            paths,
            results: Mutex::new(HashMap::new()),
            enrollments: Mutex::new(HashMap::new()),
            fail_question_loads: AtomicBool::new(false),
            failing_submissions: AtomicU32::new(0),
            submit_delay: None,
            fetch_count: AtomicU32::new(0),
            submit_count: AtomicU32::new(0),
            last_submission: Mutex::new(None),
        }
    }

    /// A backend serving the bundled banks and learning paths.
    pub fn bundled() -> Result<Self> {
        Ok(Self::new(bundled_banks()?, bundled_learning_paths()))
    }

    /// A backend serving banks from a `.toml` file or a directory of them.
    pub fn from_bank_path(path: &Path) -> Result<Self> {
        let banks = if path.is_dir() {
            load_bank_directory(path)?
        } else {
            vec![parse_bank(path)?]
        };
        tracing::debug!(count = banks.len(), path = %path.display(), "loaded question banks");
        Ok(Self::new(banks, bundled_learning_paths()))
    }

    /// Delay every submission, to observe the in-flight state.
    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = Some(delay);
        self
    }

    /// Make question loads fail until switched off again.
    pub fn fail_question_loads(&self, fail: bool) {
        self.fail_question_loads.store(fail, Ordering::Relaxed);
    }

    /// Make the next `n` submissions fail.
    pub fn fail_next_submissions(&self, n: u32) {
        self.failing_submissions.store(n, Ordering::Relaxed);
    }

    /// Number of question fetches received.
    pub fn fetch_count(&self) -> u32 {
        self.fetch_count.load(Ordering::Relaxed)
    }

    /// Number of submissions received, failed ones included.
    pub fn submit_count(&self) -> u32 {
        self.submit_count.load(Ordering::Relaxed)
    }

    /// The most recent submission received.
    pub fn last_submission(&self) -> Option<SubmitRequest> {
        lock(&self.last_submission).clone()
    }

    fn bank(&self, test_id: TestId) -> Result<&QuestionBank, BackendError> {
        self.banks
            .get(&test_id)
            .ok_or_else(|| BackendError::NotFound(format!("test {test_id}")))
    }

    fn take_submission_failure(&self) -> bool {
        self.failing_submissions
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
    }

    fn path(&self, path_id: PathId) -> Result<&LearningPathDetail, BackendError> {
        self.paths
            .iter()
            .find(|p| p.path.id == path_id)
            .ok_or_else(|| BackendError::NotFound(format!("learning path {path_id}")))
    }

    fn is_enrolled(&self, user_id: UserId, path_id: PathId) -> bool {
        lock(&self.enrollments).contains_key(&(user_id, path_id))
    }

    /// `template` with step statuses and progress filled in for `user_id`.
    fn path_for_user(&self, template: &LearningPathDetail, user_id: UserId) -> LearningPathDetail {
        let results = lock(&self.results);
        let nodes: Vec<PathNode> = template
            .nodes
            .iter()
            .map(|node| {
                let done = node
                    .test_id
                    .is_some_and(|test_id| results.contains_key(&(test_id, user_id)));
                PathNode {
                    status: if done {
                        NodeStatus::Completed
                    } else {
                        node.status
                    },
                    ..node.clone()
                }
            })
            .collect();
        drop(results);

        let completed_steps = nodes
            .iter()
            .filter(|n| n.status == NodeStatus::Completed)
            .count() as u32;
        let total = nodes.len() as u32;
        let progress = if total == 0 {
            0
        } else {
            (completed_steps * 100 + total / 2) / total
        };

        LearningPathDetail {
            path: LearningPath {
                enrolled: self.is_enrolled(user_id, template.path.id),
                ..template.path.clone()
            },
            completed_steps,
            progress,
            nodes,
        }
    }

    fn completed_for(&self, user_id: UserId) -> Vec<CompletedTest> {
        let results = lock(&self.results);
        let mut completed: Vec<CompletedTest> = results
            .iter()
            .filter(|((_, user), _)| *user == user_id)
            .filter_map(|((test_id, _), stored)| {
                let summary = &self.banks.get(test_id)?.summary;
                Some(CompletedTest {
                    id: *test_id,
                    title: summary.title.clone(),
                    description: summary.description.clone(),
                    tags: summary.tags.clone(),
                    score: stored.result.score,
                    completed_at: Some(stored.completed_at),
                })
            })
            .collect();
        completed.sort_by(|a, b| b.completed_at.cmp(&a.completed_at).then(a.id.cmp(&b.id)));
        completed
    }
}

#[async_trait]
impl AssessmentBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_tests(&self) -> Result<Vec<TestSummary>> {
        Ok(self.banks.values().map(|b| b.summary.clone()).collect())
    }

    async fn test_details(&self, test_id: TestId) -> Result<TestSummary> {
        Ok(self.bank(test_id)?.summary.clone())
    }

    async fn fetch_questions(&self, test_id: TestId) -> Result<Vec<Question>> {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);
        if self.fail_question_loads.load(Ordering::Relaxed) {
            return Err(BackendError::Simulated("question service unavailable".into()).into());
        }
        Ok(self.bank(test_id)?.questions.clone())
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<TestResult> {
        self.submit_count.fetch_add(1, Ordering::Relaxed);
        *lock(&self.last_submission) = Some(request.clone());

        if let Some(delay) = self.submit_delay {
            tokio::time::sleep(delay).await;
        }
        if self.take_submission_failure() {
            return Err(BackendError::Simulated("submission rejected".into()).into());
        }

        let bank = self.bank(request.test_id)?;
        let result = score_submission(&bank.questions, &bank.key, request);
        lock(&self.results).insert(
            (request.test_id, request.user_id),
            StoredResult {
                result: result.clone(),
                completed_at: Utc::now(),
            },
        );
        Ok(result)
    }

    async fn fetch_results(&self, test_id: TestId, user_id: UserId) -> Result<TestResult> {
        self.bank(test_id)?;
        lock(&self.results)
            .get(&(test_id, user_id))
            .map(|stored| stored.result.clone())
            .ok_or_else(|| {
                BackendError::NotFound(format!("results of test {test_id} for user {user_id}"))
                    .into()
            })
    }

    async fn completed_tests(&self, user_id: UserId) -> Result<Vec<CompletedTest>> {
        Ok(self.completed_for(user_id))
    }

    async fn list_learning_paths(&self, user_id: UserId) -> Result<Vec<LearningPath>> {
        Ok(self
            .paths
            .iter()
            .map(|p| LearningPath {
                enrolled: self.is_enrolled(user_id, p.path.id),
                ..p.path.clone()
            })
            .collect())
    }

    async fn learning_path(&self, user_id: UserId, path_id: PathId) -> Result<LearningPathDetail> {
        let template = self.path(path_id)?;
        Ok(self.path_for_user(template, user_id))
    }

    /// Paths the user has not joined yet, in catalogue order.
    async fn recommended_paths(&self, user_id: UserId) -> Result<Vec<LearningPath>> {
        Ok(self
            .paths
            .iter()
            .filter(|p| !self.is_enrolled(user_id, p.path.id))
            .take(FEED_LIMIT)
            .map(|p| p.path.clone())
            .collect())
    }

    async fn enroll(&self, user_id: UserId, path_id: PathId) -> Result<Enrollment> {
        let template = self.path(path_id)?;
        let progress = f64::from(self.path_for_user(template, user_id).progress) / 100.0;
        let enrollment = lock(&self.enrollments)
            .entry((user_id, path_id))
            .or_insert_with(|| Enrollment {
                user_id,
                path_id,
                enrolled_at: Utc::now(),
                progress,
            })
            .clone();
        Ok(enrollment)
    }

    async fn user_progress(&self, user_id: UserId) -> Result<UserProgress> {
        let enrolled: Vec<(Enrollment, LearningPathDetail)> = {
            let enrollments = lock(&self.enrollments);
            enrollments
                .values()
                .filter(|e| e.user_id == user_id)
                .cloned()
                .collect::<Vec<_>>()
        }
        .into_iter()
        .filter_map(|e| {
            let detail = self.path_for_user(self.path(e.path_id).ok()?, user_id);
            Some((e, detail))
        })
        .collect();
        let completed = self.completed_for(user_id);

        let completed_paths = enrolled.iter().filter(|(_, d)| d.progress >= 100).count() as u32;
        let overall_progress = match enrolled.len() as u32 {
            0 => 0,
            n => (enrolled.iter().map(|(_, d)| d.progress).sum::<u32>() + n / 2) / n,
        };

        let mut feed: Vec<(DateTime<Utc>, Activity)> = completed
            .iter()
            .map(|t| {
                let at = t.completed_at.unwrap_or_default();
                let activity = Activity {
                    kind: ActivityKind::Test,
                    title: t.title.clone(),
                    date: at.format("%Y-%m-%d").to_string(),
                    score: Some(t.score),
                    progress: None,
                };
                (at, activity)
            })
            .chain(enrolled.iter().map(|(e, d)| {
                let activity = Activity {
                    kind: ActivityKind::Path,
                    title: d.path.title.clone(),
                    date: e.enrolled_at.format("%Y-%m-%d").to_string(),
                    score: None,
                    progress: Some(d.progress),
                };
                (e.enrolled_at, activity)
            }))
            .collect();
        feed.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(UserProgress {
            learning_style: None,
            overall_progress,
            completed_paths,
            active_paths: enrolled.len() as u32 - completed_paths,
            completed_tests: completed.len() as u32,
            recent_activities: feed
                .into_iter()
                .take(FEED_LIMIT)
                .map(|(_, activity)| activity)
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathmind_core::model::{AnswerMap, OptionId, QuestionId};

    fn request(test_id: u64, user_id: u64, answers: &[(&str, &str)]) -> SubmitRequest {
        SubmitRequest {
            test_id: TestId(test_id),
            user_id: UserId(user_id),
            answers: answers
                .iter()
                .map(|(q, o)| (QuestionId::new(*q), OptionId::new(*o)))
                .collect::<AnswerMap>(),
            time_spent_secs: Some(120),
        }
    }

    #[test]
    fn bundled_banks_are_valid() {
        let banks = bundled_banks().unwrap();
        assert_eq!(banks.len(), 3);
        for bank in &banks {
            let warnings = pathmind_core::bank::validate_bank(bank);
            assert!(warnings.is_empty(), "{}: {warnings:?}", bank.summary.title);
        }
    }

    #[tokio::test]
    async fn lists_tests_in_id_order() {
        let backend = MockBackend::bundled().unwrap();
        let tests = backend.list_tests().await.unwrap();
        let ids: Vec<_> = tests.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![TestId(1), TestId(2), TestId(3)]);
        assert_eq!(tests[0].question_count, 5);
        assert_eq!(tests[1].time_limit_secs, 2700);
    }

    #[tokio::test]
    async fn submit_scores_and_stores_per_user() {
        let backend = MockBackend::bundled().unwrap();
        let result = backend
            .submit(&request(1, 7, &[("1", "b"), ("2", "c"), ("3", "a")]))
            .await
            .unwrap();
        assert_eq!(result.correct_answers, 2);
        assert_eq!(result.total_questions, 5);
        assert_eq!(result.score, 40);
        assert_eq!(backend.submit_count(), 1);
        assert_eq!(backend.last_submission().unwrap().user_id, UserId(7));

        let stored = backend.fetch_results(TestId(1), UserId(7)).await.unwrap();
        assert_eq!(stored, result);

        let other_user = backend.fetch_results(TestId(1), UserId(8)).await.unwrap_err();
        assert!(matches!(
            other_user.downcast_ref::<BackendError>(),
            Some(BackendError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn injected_submission_failures_run_out() {
        let backend = MockBackend::bundled().unwrap();
        backend.fail_next_submissions(2);
        assert!(backend.submit(&request(2, 1, &[])).await.is_err());
        assert!(backend.submit(&request(2, 1, &[])).await.is_err());
        assert!(backend.submit(&request(2, 1, &[])).await.is_ok());
        assert_eq!(backend.submit_count(), 3);
    }

    #[tokio::test]
    async fn question_load_failures() {
        let backend = MockBackend::bundled().unwrap();
        backend.fail_question_loads(true);
        assert!(backend.fetch_questions(TestId(1)).await.is_err());
        backend.fail_question_loads(false);
        assert_eq!(backend.fetch_questions(TestId(1)).await.unwrap().len(), 5);
        assert_eq!(backend.fetch_count(), 2);

        let missing = backend.fetch_questions(TestId(99)).await.unwrap_err();
        assert!(missing
            .downcast_ref::<BackendError>()
            .is_some_and(BackendError::is_permanent));
    }

    #[tokio::test]
    async fn enrollment_is_per_user_and_idempotent() {
        let backend = MockBackend::bundled().unwrap();
        let first = backend.enroll(UserId(1), PathId(2)).await.unwrap();
        let again = backend.enroll(UserId(1), PathId(2)).await.unwrap();
        assert_eq!(first.enrolled_at, again.enrolled_at);

        let mine = backend.list_learning_paths(UserId(1)).await.unwrap();
        assert!(!mine[0].enrolled);
        assert!(mine[1].enrolled);
        let theirs = backend.list_learning_paths(UserId(2)).await.unwrap();
        assert!(theirs.iter().all(|p| !p.enrolled));

        assert!(backend.enroll(UserId(1), PathId(9)).await.is_err());
    }

    #[tokio::test]
    async fn completed_tests_follow_submissions() {
        let backend = MockBackend::bundled().unwrap();
        assert!(backend.completed_tests(UserId(7)).await.unwrap().is_empty());

        backend.submit(&request(2, 7, &[("1", "b")])).await.unwrap();
        backend.submit(&request(1, 8, &[])).await.unwrap();

        let completed = backend.completed_tests(UserId(7)).await.unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, TestId(2));
        assert_eq!(completed[0].title, "Web development concepts");
        assert_eq!(completed[0].score, 33);
        assert!(completed[0].completed_at.is_some());
    }

    #[tokio::test]
    async fn path_detail_tracks_test_steps() {
        let backend = MockBackend::bundled().unwrap();
        let before = backend.learning_path(UserId(7), PathId(1)).await.unwrap();
        assert_eq!(before.path.total_steps, 3);
        assert_eq!(before.completed_steps, 0);
        assert!(!before.path.enrolled);

        backend.enroll(UserId(7), PathId(1)).await.unwrap();
        backend.submit(&request(1, 7, &[("1", "b")])).await.unwrap();

        let after = backend.learning_path(UserId(7), PathId(1)).await.unwrap();
        assert!(after.path.enrolled);
        assert_eq!(after.completed_steps, 1);
        assert_eq!(after.progress, 33);
        assert_eq!(after.nodes[1].status, NodeStatus::Completed);
        assert_eq!(after.nodes[0].status, NodeStatus::NotStarted);

        let other = backend.learning_path(UserId(8), PathId(1)).await.unwrap();
        assert_eq!(other.completed_steps, 0);

        let missing = backend.learning_path(UserId(7), PathId(9)).await.unwrap_err();
        assert!(matches!(
            missing.downcast_ref::<BackendError>(),
            Some(BackendError::NotFound(m)) if m == "learning path 9"
        ));
    }

    #[tokio::test]
    async fn progress_and_recommendations() {
        let backend = MockBackend::bundled().unwrap();
        let fresh = backend.user_progress(UserId(5)).await.unwrap();
        assert_eq!(fresh, UserProgress::default());
        assert_eq!(backend.recommended_paths(UserId(5)).await.unwrap().len(), 3);

        backend.submit(&request(3, 5, &[("1", "c"), ("2", "a")])).await.unwrap();
        let enrollment = backend.enroll(UserId(5), PathId(3)).await.unwrap();
        assert_eq!(enrollment.progress, 0.5);
        backend.enroll(UserId(5), PathId(1)).await.unwrap();

        let progress = backend.user_progress(UserId(5)).await.unwrap();
        assert_eq!(progress.completed_tests, 1);
        assert_eq!(progress.active_paths, 2);
        assert_eq!(progress.completed_paths, 0);
        assert_eq!(progress.overall_progress, 25);
        assert_eq!(progress.recent_activities.len(), 3);
        let test_activity = progress
            .recent_activities
            .iter()
            .find(|a| a.kind == ActivityKind::Test)
            .unwrap();
        assert_eq!(test_activity.title, "Data science basics");
        assert_eq!(test_activity.score, Some(100));

        let recommended = backend.recommended_paths(UserId(5)).await.unwrap();
        let ids: Vec<_> = recommended.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![PathId(2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn submit_delay_holds_the_result() {
        let backend = MockBackend::bundled()
            .unwrap()
            .with_submit_delay(Duration::from_secs(5));
        let started = tokio::time::Instant::now();
        backend.submit(&request(3, 1, &[])).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(5));
        assert!(backend.fetch_results(TestId(3), UserId(1)).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn session_refuses_second_submit_while_delayed() {
        use pathmind_core::controller::{SessionConfig, SessionController, SessionOutcome};
        use pathmind_core::session::SessionState;
        use std::sync::Arc;

        let backend = Arc::new(
            MockBackend::bundled()
                .unwrap()
                .with_submit_delay(Duration::from_secs(3)),
        );
        let handle = SessionController::start(
            backend.clone(),
            SessionConfig {
                time_limit_secs: 60,
                ..SessionConfig::default()
            },
            TestId(3),
            UserId(2),
        );
        handle
            .wait_until(|s| s.state == SessionState::Active)
            .await
            .unwrap();
        handle.answer("c").await.unwrap();
        assert!(handle.next().await.unwrap());
        handle.submit().await.unwrap();
        handle
            .wait_until(|s| s.state == SessionState::Submitting)
            .await
            .unwrap();
        assert!(handle.submit().await.is_err());

        let SessionOutcome::Submitted { result, .. } = handle.finished().await else {
            panic!("expected a scored submission");
        };
        assert_eq!(result.correct_answers, 1);
        assert_eq!(backend.submit_count(), 1);
    }

    #[tokio::test]
    async fn loads_banks_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("one.toml"),
            "[test]\nid = 10\ntitle = \"Custom\"\n\n[[questions]]\nid = \"q1\"\ntext = \"Pick\"\ncorrect_option = \"a\"\noptions = [{ id = \"a\", text = \"A\" }, { id = \"b\", text = \"B\" }]\n",
        )
        .unwrap();
        let backend = MockBackend::from_bank_path(dir.path()).unwrap();
        let tests = backend.list_tests().await.unwrap();
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].id, TestId(10));
    }
}
