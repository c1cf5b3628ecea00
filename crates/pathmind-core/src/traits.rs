//! The collaborator seam: everything the session and CLI need from a backend.
//!
//! Implemented by `pathmind-client` for the HTTP API, the in-memory mock, and
//! the offline fallback wrapper.

use async_trait::async_trait;

use crate::model::{
    CompletedTest, Enrollment, LearningPath, LearningPathDetail, PathId, Question, SubmitRequest,
    TestId, TestResult, TestSummary, UserId, UserProgress,
};

/// Trait for backends that serve adaptive tests and score submissions.
///
/// Implementations raise [`crate::error::BackendError`] wrapped in `anyhow`.
/// Callers that only need "did it work" can ignore the classification.
#[async_trait]
pub trait AssessmentBackend: Send + Sync {
    /// Human-readable backend name (e.g. "http").
    fn name(&self) -> &str;

    /// All tests available to take.
    async fn list_tests(&self) -> anyhow::Result<Vec<TestSummary>>;

    /// Details of a single test.
    async fn test_details(&self, test_id: TestId) -> anyhow::Result<TestSummary>;

    /// Questions for a test, in presentation order.
    async fn fetch_questions(&self, test_id: TestId) -> anyhow::Result<Vec<Question>>;

    /// Score a submission.
    async fn submit(&self, request: &SubmitRequest) -> anyhow::Result<TestResult>;

    /// The stored result of a user's latest submission for a test.
    async fn fetch_results(&self, test_id: TestId, user_id: UserId) -> anyhow::Result<TestResult>;

    /// Tests the user has submitted, newest first.
    async fn completed_tests(&self, user_id: UserId) -> anyhow::Result<Vec<CompletedTest>>;

    /// Learning paths, flagged with the user's enrollment status.
    async fn list_learning_paths(&self, user_id: UserId) -> anyhow::Result<Vec<LearningPath>>;

    /// One learning path with its steps and the user's progress through them.
    async fn learning_path(
        &self,
        user_id: UserId,
        path_id: PathId,
    ) -> anyhow::Result<LearningPathDetail>;

    /// Paths suggested for the user.
    async fn recommended_paths(&self, user_id: UserId) -> anyhow::Result<Vec<LearningPath>>;

    /// Enroll a user in a learning path.
    async fn enroll(&self, user_id: UserId, path_id: PathId) -> anyhow::Result<Enrollment>;

    /// Dashboard summary for the user.
    async fn user_progress(&self, user_id: UserId) -> anyhow::Result<UserProgress>;
}
