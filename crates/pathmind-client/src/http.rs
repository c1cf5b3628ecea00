//! HTTP backend for the PathMind API.
//!
//! One base URL, one endpoint per operation. The API version is negotiated
//! once per backend via `GET {base}/api/versions` and cached.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::instrument;

use pathmind_core::model::{
    CompletedTest, Enrollment, LearningPath, LearningPathDetail, PathId, Question, SubmitRequest,
    TestId, TestResult, TestSummary, UserId, UserProgress,
};
use pathmind_core::traits::AssessmentBackend;

use crate::error::{from_status, from_transport, BackendError};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// API versions this client speaks, most preferred first.
pub const SUPPORTED_VERSIONS: &[&str] = &["v2", "v1"];

/// Backend speaking the PathMind REST API.
pub struct HttpBackend {
    base_url: String,
    token: Option<String>,
    timeout_secs: u64,
    client: reqwest::Client,
    version: OnceCell<String>,
}

impl HttpBackend {
    pub fn new(base_url: &str, token: Option<String>, timeout_secs: u64) -> anyhow::Result<Self> {
        let base = if base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            base_url
        };
        let timeout_secs = if timeout_secs == 0 {
            DEFAULT_TIMEOUT_SECS
        } else {
            timeout_secs
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url: base.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
            timeout_secs,
            client,
            version: OnceCell::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The negotiated API version, fetching it on first use.
    pub async fn api_version(&self) -> Result<&str, BackendError> {
        self.version
            .get_or_try_init(|| self.negotiate_version())
            .await
            .map(String::as_str)
    }

    async fn negotiate_version(&self) -> Result<String, BackendError> {
        let url = format!("{}/api/versions", self.base_url);
        let body: VersionsResponse = self.send(self.client.get(url), "API versions").await?;

        let chosen = SUPPORTED_VERSIONS
            .iter()
            .find(|v| body.versions.iter().any(|o| o == *v))
            .map(|v| v.to_string());

        match chosen {
            Some(version) => {
                tracing::debug!(%version, offered = ?body.versions, "negotiated API version");
                Ok(version)
            }
            None => Err(BackendError::UnsupportedVersion {
                offered: body.versions,
                supported: SUPPORTED_VERSIONS.iter().map(|v| v.to_string()).collect(),
            }),
        }
    }

    async fn endpoint(&self, path: &str) -> Result<String, BackendError> {
        let version = self.api_version().await?;
        Ok(format!("{}/api/{}/{}", self.base_url, version, path))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<T, BackendError> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| from_transport(e, &self.base_url, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(from_status(status, body, what));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| from_transport(e, &self.base_url, self.timeout_secs))?;
        if bytes.is_empty() {
            return Err(BackendError::InvalidResponse(format!("empty body for {what}")));
        }
        serde_json::from_slice(&bytes)
            .map_err(|e| BackendError::InvalidResponse(format!("{what}: {e}")))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T, BackendError> {
        let url = self.endpoint(path).await?;
        self.send(self.client.get(url), what).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        what: &str,
    ) -> Result<T, BackendError> {
        let url = self.endpoint(path).await?;
        self.send(self.client.post(url).json(body), what).await
    }
}

#[derive(Deserialize)]
struct VersionsResponse {
    #[serde(default)]
    versions: Vec<String>,
}

/// List endpoints answer either with a bare array or an object holding it.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(alias = "tests", alias = "questions", alias = "paths")]
        items: Vec<T>,
    },
}

impl<T> ListBody<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            ListBody::Bare(items) | ListBody::Wrapped { items } => items,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnrollBody {
    user_id: UserId,
}

#[async_trait]
impl AssessmentBackend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self))]
    async fn list_tests(&self) -> anyhow::Result<Vec<TestSummary>> {
        let body: ListBody<TestSummary> = self.get("assessment/tests", "tests").await?;
        Ok(body.into_vec())
    }

    #[instrument(skip(self))]
    async fn test_details(&self, test_id: TestId) -> anyhow::Result<TestSummary> {
        let what = format!("test {test_id}");
        Ok(self
            .get(&format!("assessment/tests/{test_id}"), &what)
            .await?)
    }

    #[instrument(skip(self))]
    async fn fetch_questions(&self, test_id: TestId) -> anyhow::Result<Vec<Question>> {
        let what = format!("questions for test {test_id}");
        let body: ListBody<Question> = self
            .get(&format!("assessment/tests/{test_id}/questions"), &what)
            .await?;
        Ok(body.into_vec())
    }

    #[instrument(skip(self, request), fields(test_id = %request.test_id, answered = request.answers.len()))]
    async fn submit(&self, request: &SubmitRequest) -> anyhow::Result<TestResult> {
        let what = format!("test {}", request.test_id);
        Ok(self
            .post(
                &format!("assessment/tests/{}/submit", request.test_id),
                request,
                &what,
            )
            .await?)
    }

    #[instrument(skip(self))]
    async fn fetch_results(&self, test_id: TestId, user_id: UserId) -> anyhow::Result<TestResult> {
        let what = format!("results of test {test_id} for user {user_id}");
        Ok(self
            .get(
                &format!("assessment/tests/{test_id}/results?user_id={user_id}"),
                &what,
            )
            .await?)
    }

    #[instrument(skip(self))]
    async fn completed_tests(&self, user_id: UserId) -> anyhow::Result<Vec<CompletedTest>> {
        let what = format!("completed tests for user {user_id}");
        let body: ListBody<CompletedTest> = self
            .get(&format!("assessment/users/{user_id}/tests"), &what)
            .await?;
        Ok(body.into_vec())
    }

    #[instrument(skip(self))]
    async fn list_learning_paths(&self, user_id: UserId) -> anyhow::Result<Vec<LearningPath>> {
        let body: ListBody<LearningPath> = self
            .get(&format!("learning/paths?user_id={user_id}"), "learning paths")
            .await?;
        Ok(body.into_vec())
    }

    #[instrument(skip(self))]
    async fn learning_path(
        &self,
        user_id: UserId,
        path_id: PathId,
    ) -> anyhow::Result<LearningPathDetail> {
        let what = format!("learning path {path_id}");
        Ok(self
            .get(&format!("learning/paths/{path_id}?user_id={user_id}"), &what)
            .await?)
    }

    #[instrument(skip(self))]
    async fn recommended_paths(&self, user_id: UserId) -> anyhow::Result<Vec<LearningPath>> {
        let body: ListBody<LearningPath> = self
            .get(
                &format!("learning/paths/recommended?user_id={user_id}"),
                "recommended paths",
            )
            .await?;
        Ok(body.into_vec())
    }

    #[instrument(skip(self))]
    async fn enroll(&self, user_id: UserId, path_id: PathId) -> anyhow::Result<Enrollment> {
        let what = format!("learning path {path_id}");
        Ok(self
            .post(
                &format!("learning/paths/{path_id}/enroll"),
                &EnrollBody { user_id },
                &what,
            )
            .await?)
    }

    #[instrument(skip(self))]
    async fn user_progress(&self, user_id: UserId) -> anyhow::Result<UserProgress> {
        let what = format!("progress of user {user_id}");
        Ok(self
            .get(&format!("assessment/progress/{user_id}"), &what)
            .await?)
    }
}
