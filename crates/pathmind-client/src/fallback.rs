//! Offline fallback: serve a call from a local backend when the primary fails.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;

use pathmind_core::error::BackendError;
use pathmind_core::model::{
    CompletedTest, Enrollment, LearningPath, LearningPathDetail, PathId, Question, SubmitRequest,
    TestId, TestResult, TestSummary, UserId, UserProgress,
};
use pathmind_core::traits::AssessmentBackend;

/// Wraps a primary backend with an offline one.
///
/// Every call goes to the primary first. On failure the error is logged and
/// the same call is served by the offline backend; if that fails too, the
/// primary's error is returned. Permanent errors (rejected credentials,
/// unknown resources, no common API version) are returned as they are.
pub struct FallbackBackend {
    primary: Arc<dyn AssessmentBackend>,
    offline: Arc<dyn AssessmentBackend>,
}

impl FallbackBackend {
    pub fn new(primary: Arc<dyn AssessmentBackend>, offline: Arc<dyn AssessmentBackend>) -> Self {
        Self { primary, offline }
    }

    async fn with_fallback<'a, T, P, O>(&'a self, operation: &str, primary: P, offline: O) -> Result<T>
    where
        P: Future<Output = Result<T>> + Send + 'a,
        O: FnOnce(&'a dyn AssessmentBackend) -> BoxFuture<'a, Result<T>>,
    {
        let err = match primary.await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if err
            .downcast_ref::<BackendError>()
            .is_some_and(BackendError::is_permanent)
        {
            return Err(err);
        }
        tracing::warn!(
            backend = self.primary.name(),
            operation,
            error = %format!("{err:#}"),
            "primary backend failed, using offline data"
        );
        match offline(self.offline.as_ref()).await {
            Ok(value) => Ok(value),
            Err(offline_err) => {
                tracing::warn!(error = %format!("{offline_err:#}"), "offline backend failed too");
                Err(err)
            }
        }
    }
}

#[async_trait]
impl AssessmentBackend for FallbackBackend {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn list_tests(&self) -> Result<Vec<TestSummary>> {
        self.with_fallback("list_tests", self.primary.list_tests(), |b| b.list_tests())
            .await
    }

    async fn test_details(&self, test_id: TestId) -> Result<TestSummary> {
        self.with_fallback("test_details", self.primary.test_details(test_id), move |b| {
            b.test_details(test_id)
        })
        .await
    }

    async fn fetch_questions(&self, test_id: TestId) -> Result<Vec<Question>> {
        self.with_fallback(
            "fetch_questions",
            self.primary.fetch_questions(test_id),
            move |b| b.fetch_questions(test_id),
        )
        .await
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<TestResult> {
        self.with_fallback("submit", self.primary.submit(request), |b| b.submit(request))
            .await
    }

    async fn fetch_results(&self, test_id: TestId, user_id: UserId) -> Result<TestResult> {
        self.with_fallback(
            "fetch_results",
            self.primary.fetch_results(test_id, user_id),
            move |b| b.fetch_results(test_id, user_id),
        )
        .await
    }

    async fn completed_tests(&self, user_id: UserId) -> Result<Vec<CompletedTest>> {
        self.with_fallback(
            "completed_tests",
            self.primary.completed_tests(user_id),
            move |b| b.completed_tests(user_id),
        )
        .await
    }

    async fn list_learning_paths(&self, user_id: UserId) -> Result<Vec<LearningPath>> {
        self.with_fallback(
            "list_learning_paths",
            self.primary.list_learning_paths(user_id),
            move |b| b.list_learning_paths(user_id),
        )
        .await
    }

    async fn learning_path(&self, user_id: UserId, path_id: PathId) -> Result<LearningPathDetail> {
        self.with_fallback(
            "learning_path",
            self.primary.learning_path(user_id, path_id),
            move |b| b.learning_path(user_id, path_id),
        )
        .await
    }

    async fn recommended_paths(&self, user_id: UserId) -> Result<Vec<LearningPath>> {
        self.with_fallback(
            "recommended_paths",
            self.primary.recommended_paths(user_id),
            move |b| b.recommended_paths(user_id),
        )
        .await
    }

    async fn enroll(&self, user_id: UserId, path_id: PathId) -> Result<Enrollment> {
        self.with_fallback(
            "enroll",
            self.primary.enroll(user_id, path_id),
            move |b| b.enroll(user_id, path_id),
        )
        .await
    }

    async fn user_progress(&self, user_id: UserId) -> Result<UserProgress> {
        self.with_fallback(
            "user_progress",
            self.primary.user_progress(user_id),
            move |b| b.user_progress(user_id),
        )
        .await
    }
}
