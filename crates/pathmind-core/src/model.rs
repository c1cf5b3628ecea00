//! Core data model types for PathMind.
//!
//! These mirror the JSON contract spoken with the assessment backend:
//! questions going out to the learner, answers coming back, and the scored
//! result. Field names are camelCase on the wire.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map($name)
                    .map_err(|_| format!("invalid {}: '{}'", stringify!($name), s))
            }
        }
    };
}

numeric_id!(
    /// Identifier of an adaptive test.
    TestId
);
numeric_id!(
    /// Identity of the learner taking a test. Always supplied by the caller.
    UserId
);
numeric_id!(
    /// Identifier of a learning path.
    PathId
);

/// Backends disagree on whether ids are JSON numbers or strings.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Str(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Int(n) => n.to_string(),
        Raw::Str(s) => s,
    })
}

/// Identifier of a question within a test.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct QuestionId(String);

/// Identifier (or value) of an answer option within a question.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct OptionId(String);

impl<'de> Deserialize<'de> for QuestionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        string_or_number(deserializer).map(QuestionId)
    }
}

impl<'de> Deserialize<'de> for OptionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        string_or_number(deserializer).map(OptionId)
    }
}

impl QuestionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl OptionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QuestionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<&str> for OptionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One selectable answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    #[serde(alias = "value")]
    pub id: OptionId,
    #[serde(alias = "label")]
    pub text: String,
}

/// A single multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    /// Options in display order.
    pub options: Vec<QuestionOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Question {
    /// Look up an option by id.
    pub fn option(&self, id: &OptionId) -> Option<&QuestionOption> {
        self.options.iter().find(|o| &o.id == id)
    }
}

/// Selected option per answered question. Unanswered questions are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerMap(BTreeMap<QuestionId, OptionId>);

impl AnswerMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, question: &QuestionId) -> Option<&OptionId> {
        self.0.get(question)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QuestionId, &OptionId)> {
        self.0.iter()
    }

    /// Set or overwrite an answer. The session checks membership first.
    pub(crate) fn insert(&mut self, question: QuestionId, option: OptionId) {
        self.0.insert(question, option);
    }
}

impl FromIterator<(QuestionId, OptionId)> for AnswerMap {
    fn from_iter<I: IntoIterator<Item = (QuestionId, OptionId)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Listing entry for an available adaptive test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSummary {
    pub id: TestId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub difficulty: String,
    /// Time budget for one attempt.
    #[serde(default = "default_time_limit")]
    pub time_limit_secs: u64,
    #[serde(default)]
    pub question_count: usize,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
}

/// Narrows a test listing by free text and difficulty.
///
/// Both criteria are case-insensitive; an absent criterion matches everything.
#[derive(Debug, Clone, Default)]
pub struct TestFilter {
    pub search: Option<String>,
    pub difficulty: Option<String>,
}

impl TestFilter {
    pub fn new(search: Option<String>, difficulty: Option<String>) -> Self {
        let normalize = |s: Option<String>| {
            s.map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty() && s != "all")
        };
        Self {
            search: normalize(search),
            difficulty: normalize(difficulty),
        }
    }

    /// Search hits the title, the description or any tag.
    fn matches_text(&self, title: &str, description: &str, tags: &[String]) -> bool {
        let Some(needle) = &self.search else {
            return true;
        };
        title.to_lowercase().contains(needle)
            || description.to_lowercase().contains(needle)
            || tags.iter().any(|t| t.to_lowercase().contains(needle))
    }

    pub fn matches(&self, test: &TestSummary) -> bool {
        let difficulty_ok = self
            .difficulty
            .as_ref()
            .is_none_or(|d| test.difficulty.to_lowercase() == *d);
        difficulty_ok && self.matches_text(&test.title, &test.description, &test.tags)
    }

    /// Completed tests carry no difficulty, so only the search applies.
    pub fn matches_completed(&self, test: &CompletedTest) -> bool {
        self.matches_text(&test.title, &test.description, &test.tags)
    }
}

/// A test the user has submitted, with the latest score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedTest {
    pub id: TestId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Default time budget: thirty minutes.
pub const DEFAULT_TIME_LIMIT_SECS: u64 = 1800;

fn default_time_limit() -> u64 {
    DEFAULT_TIME_LIMIT_SECS
}

/// Answers sent to the backend for scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub test_id: TestId,
    pub user_id: UserId,
    pub answers: AnswerMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent_secs: Option<u64>,
}

/// Scored outcome of a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    /// Percentage in `0..=100`.
    pub score: u32,
    pub correct_answers: u32,
    pub total_questions: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent: Option<String>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub question_analysis: Vec<QuestionAnalysis>,
}

impl TestResult {
    pub fn band(&self) -> ScoreBand {
        ScoreBand::for_score(self.score)
    }
}

/// Per-question correctness breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionAnalysis {
    pub id: QuestionId,
    pub correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

/// Coarse grading of a score percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Strong,
    Passing,
    NeedsWork,
}

impl ScoreBand {
    pub fn for_score(score: u32) -> Self {
        if score >= 80 {
            ScoreBand::Strong
        } else if score >= 60 {
            ScoreBand::Passing
        } else {
            ScoreBand::NeedsWork
        }
    }
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreBand::Strong => write!(f, "strong"),
            ScoreBand::Passing => write!(f, "passing"),
            ScoreBand::NeedsWork => write!(f, "needs work"),
        }
    }
}

/// A curated sequence of learning content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPath {
    pub id: PathId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub total_steps: u32,
    /// Whether the requesting user is enrolled.
    #[serde(default)]
    pub enrolled: bool,
}

/// Where a learner stands on one step of a path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeStatus::NotStarted => write!(f, "not started"),
            NodeStatus::InProgress => write!(f, "in progress"),
            NodeStatus::Completed => write!(f, "completed"),
        }
    }
}

/// One step of a learning path: a piece of content or a test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathNode {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// `content` or `test`.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub status: NodeStatus,
    /// The test to take for a `test` step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<TestId>,
}

/// A learning path with the requesting user's progress through its steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPathDetail {
    #[serde(flatten)]
    pub path: LearningPath,
    #[serde(default)]
    pub completed_steps: u32,
    /// Percentage in `0..=100`.
    #[serde(default)]
    pub progress: u32,
    #[serde(default)]
    pub nodes: Vec<PathNode>,
}

/// A user's enrollment in a learning path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub user_id: UserId,
    pub path_id: PathId,
    pub enrolled_at: DateTime<Utc>,
    /// Completion in `0.0..=1.0`.
    #[serde(default)]
    pub progress: f64,
}

/// Dashboard summary of a learner's activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    /// Absent until the learner has taken the learning-style assessment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_style: Option<String>,
    /// Mean progress over enrolled paths, in percent.
    #[serde(default)]
    pub overall_progress: u32,
    #[serde(default)]
    pub completed_paths: u32,
    #[serde(default)]
    pub active_paths: u32,
    #[serde(default)]
    pub completed_tests: u32,
    /// Newest first.
    #[serde(default)]
    pub recent_activities: Vec<Activity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Test,
    Path,
    Assessment,
    #[serde(other)]
    Other,
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityKind::Test => write!(f, "test"),
            ActivityKind::Path => write!(f, "path"),
            ActivityKind::Assessment => write!(f, "assessment"),
            ActivityKind::Other => write!(f, "other"),
        }
    }
}

/// An entry in the recent-activity feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub title: String,
    /// Display date, e.g. `2026-01-05`.
    #[serde(default)]
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u32>,
}

/// Render seconds as `MM:SS`. Minutes are not wrapped at the hour.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_accepts_numeric_ids_and_label_aliases() {
        let json = r#"{
            "id": 7,
            "text": "Which keyword defines a function in Python?",
            "options": [
                {"value": "a", "label": "function"},
                {"id": "b", "text": "def"}
            ]
        }"#;
        let q: Question = serde_json::from_str(json).unwrap();
        assert_eq!(q.id, QuestionId::new("7"));
        assert_eq!(q.options[0].id, OptionId::new("a"));
        assert_eq!(q.options[0].text, "function");
        assert!(q.explanation.is_none());
        assert!(q.option(&OptionId::new("b")).is_some());
        assert!(q.option(&OptionId::new("z")).is_none());
    }

    #[test]
    fn submit_request_wire_shape() {
        let request = SubmitRequest {
            test_id: TestId(1),
            user_id: UserId(42),
            answers: [(QuestionId::new("1"), OptionId::new("b"))]
                .into_iter()
                .collect(),
            time_spent_secs: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"testId": 1, "userId": 42, "answers": {"1": "b"}})
        );
    }

    #[test]
    fn result_optional_fields_default() {
        let json = r#"{"score": 67, "correctAnswers": 2, "totalQuestions": 3}"#;
        let result: TestResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.score, 67);
        assert!(result.time_spent.is_none());
        assert!(result.strengths.is_empty());
        assert!(result.question_analysis.is_empty());
        assert_eq!(result.band(), ScoreBand::Passing);
    }

    #[test]
    fn score_bands() {
        assert_eq!(ScoreBand::for_score(100), ScoreBand::Strong);
        assert_eq!(ScoreBand::for_score(80), ScoreBand::Strong);
        assert_eq!(ScoreBand::for_score(79), ScoreBand::Passing);
        assert_eq!(ScoreBand::for_score(60), ScoreBand::Passing);
        assert_eq!(ScoreBand::for_score(59), ScoreBand::NeedsWork);
    }

    #[test]
    fn clock_formatting() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(1800), "30:00");
        assert_eq!(format_clock(1104), "18:24");
        assert_eq!(format_clock(3661), "61:01");
    }

    fn summary(title: &str, difficulty: &str, tags: &[&str]) -> TestSummary {
        TestSummary {
            id: TestId(1),
            title: title.into(),
            description: "Checks the basics".into(),
            difficulty: difficulty.into(),
            time_limit_secs: DEFAULT_TIME_LIMIT_SECS,
            question_count: 5,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            instructions: vec![],
        }
    }

    #[test]
    fn test_filter_matches_text_and_difficulty() {
        let python = summary("Python fundamentals", "Beginner", &["python"]);
        let web = summary("Web development concepts", "intermediate", &["HTML", "css"]);

        let all = TestFilter::new(None, Some("all".into()));
        assert!(all.matches(&python) && all.matches(&web));

        let by_tag = TestFilter::new(Some("html".into()), None);
        assert!(!by_tag.matches(&python));
        assert!(by_tag.matches(&web));

        let by_level = TestFilter::new(Some(" PYTHON ".into()), Some("beginner".into()));
        assert!(by_level.matches(&python));
        let wrong_level = TestFilter::new(Some("python".into()), Some("advanced".into()));
        assert!(!wrong_level.matches(&python));

        let by_description = TestFilter::new(Some("basics".into()), None);
        assert!(by_description.matches(&web));
    }

    #[test]
    fn completed_filter_ignores_difficulty() {
        let done = CompletedTest {
            id: TestId(2),
            title: "Web development concepts".into(),
            description: String::new(),
            tags: vec!["html".into()],
            score: 67,
            completed_at: None,
        };
        assert!(TestFilter::new(None, Some("advanced".into())).matches_completed(&done));
        assert!(!TestFilter::new(Some("python".into()), None).matches_completed(&done));
    }

    #[test]
    fn path_detail_flattens_path_fields() {
        let json = r#"{
            "id": 1, "title": "Python programming basics", "totalSteps": 3, "enrolled": true,
            "completedSteps": 1, "progress": 33,
            "nodes": [
                {"id": 1, "title": "Variables and types", "type": "content", "status": "completed"},
                {"id": 2, "title": "Fundamentals check", "type": "test", "testId": 1}
            ]
        }"#;
        let detail: LearningPathDetail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.path.id, PathId(1));
        assert!(detail.path.enrolled);
        assert_eq!(detail.progress, 33);
        assert_eq!(detail.nodes[0].status, NodeStatus::Completed);
        assert_eq!(detail.nodes[1].status, NodeStatus::NotStarted);
        assert_eq!(detail.nodes[1].test_id, Some(TestId(1)));
    }

    #[test]
    fn progress_tolerates_unknown_activity_kinds() {
        let json = r#"{
            "overallProgress": 40, "completedTests": 2,
            "recentActivities": [
                {"type": "test", "title": "Python fundamentals", "date": "2026-01-05", "score": 80},
                {"type": "video", "title": "Intro clip"}
            ]
        }"#;
        let progress: UserProgress = serde_json::from_str(json).unwrap();
        assert!(progress.learning_style.is_none());
        assert_eq!(progress.recent_activities[0].kind, ActivityKind::Test);
        assert_eq!(progress.recent_activities[1].kind, ActivityKind::Other);
        assert_eq!(progress.active_paths, 0);
    }

    #[test]
    fn numeric_id_parse() {
        assert_eq!("12".parse::<TestId>().unwrap(), TestId(12));
        assert!("abc".parse::<UserId>().is_err());
    }
}
