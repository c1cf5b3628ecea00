//! The results view: a scored attempt with JSON persistence and text rendering.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{TestId, TestResult, TestSummary, UserId};

/// A scored attempt, ready to display or archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    pub test_id: TestId,
    /// Title of the test, when its details could be fetched.
    #[serde(default)]
    pub test_title: Option<String>,
    pub user_id: UserId,
    pub result: TestResult,
}

impl ResultsReport {
    pub fn new(
        test_id: TestId,
        summary: Option<&TestSummary>,
        user_id: UserId,
        result: TestResult,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            test_id,
            test_title: summary.map(|s| s.title.clone()),
            user_id,
            result,
        }
    }

    fn heading(&self) -> String {
        match &self.test_title {
            Some(title) => format!("{title} (test {})", self.test_id),
            None => format!("Test {}", self.test_id),
        }
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: ResultsReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Plain-text rendering for the terminal.
    pub fn to_text(&self) -> String {
        let r = &self.result;
        let mut out = String::new();
        let _ = writeln!(out, "Results: {}", self.heading());
        let _ = writeln!(out, "Score: {}% ({})", r.score, r.band());
        let _ = writeln!(
            out,
            "{} / {} correct | time spent {}",
            r.correct_answers,
            r.total_questions,
            r.time_spent.as_deref().unwrap_or("not recorded")
        );
        for (label, items) in [
            ("Strengths", &r.strengths),
            ("Weaknesses", &r.weaknesses),
            ("Recommendations", &r.recommendations),
        ] {
            if items.is_empty() {
                continue;
            }
            let _ = writeln!(out, "{label}:");
            for item in items {
                let _ = writeln!(out, "  - {item}");
            }
        }
        if !r.question_analysis.is_empty() {
            let _ = writeln!(out, "Questions:");
            for q in &r.question_analysis {
                let mark = if q.correct { "correct" } else { "wrong" };
                let _ = write!(out, "  {}: {mark}", q.id);
                if let Some(topic) = &q.topic {
                    let _ = write!(out, " [{topic}]");
                }
                out.push('\n');
            }
        }
        out
    }

    /// Markdown rendering.
    pub fn to_markdown(&self) -> String {
        let r = &self.result;
        let mut md = String::new();

        md.push_str(&format!("## {}\n\n", self.heading()));
        md.push_str(&format!(
            "**Score:** {}% ({}), {} of {} correct, time spent {}\n\n",
            r.score,
            r.band(),
            r.correct_answers,
            r.total_questions,
            r.time_spent.as_deref().unwrap_or("not recorded")
        ));

        for (label, items) in [
            ("Strengths", &r.strengths),
            ("Weaknesses", &r.weaknesses),
            ("Recommendations", &r.recommendations),
        ] {
            if items.is_empty() {
                continue;
            }
            md.push_str(&format!("### {label}\n\n"));
            for item in items {
                md.push_str(&format!("- {item}\n"));
            }
            md.push('\n');
        }

        if !r.question_analysis.is_empty() {
            md.push_str("### Question analysis\n\n");
            md.push_str("| Question | Result | Topic | Difficulty |\n");
            md.push_str("|----------|--------|-------|------------|\n");
            for q in &r.question_analysis {
                md.push_str(&format!(
                    "| {} | {} | {} | {} |\n",
                    q.id,
                    if q.correct { "correct" } else { "wrong" },
                    q.topic.as_deref().unwrap_or("-"),
                    q.difficulty.as_deref().unwrap_or("-"),
                ));
            }
        }

        md
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QuestionAnalysis, QuestionId};

    fn make_report() -> ResultsReport {
        let result = TestResult {
            score: 67,
            correct_answers: 2,
            total_questions: 3,
            time_spent: Some("18:24".into()),
            strengths: vec!["Syntax".into()],
            weaknesses: vec!["Functions".into()],
            recommendations: vec!["Review Functions".into()],
            question_analysis: vec![
                QuestionAnalysis {
                    id: QuestionId::new("1"),
                    correct: true,
                    topic: Some("Syntax".into()),
                    difficulty: Some("easy".into()),
                },
                QuestionAnalysis {
                    id: QuestionId::new("2"),
                    correct: false,
                    topic: None,
                    difficulty: None,
                },
            ],
        };
        ResultsReport {
            id: Uuid::nil(),
            created_at: Utc::now(),
            test_id: TestId(1),
            test_title: Some("Python Fundamentals".into()),
            user_id: UserId(1),
            result,
        }
    }

    #[test]
    fn json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.json");
        let report = make_report();
        report.save_json(&path).unwrap();
        let loaded = ResultsReport::load_json(&path).unwrap();
        assert_eq!(loaded.result, report.result);
        assert_eq!(loaded.test_title.as_deref(), Some("Python Fundamentals"));
    }

    #[test]
    fn text_output() {
        let text = make_report().to_text();
        assert!(text.contains("Results: Python Fundamentals (test 1)"));
        assert!(text.contains("Score: 67% (passing)"));
        assert!(text.contains("2 / 3 correct | time spent 18:24"));
        assert!(text.contains("  - Functions"));
        assert!(text.contains("  1: correct [Syntax]"));
        assert!(text.contains("  2: wrong"));
    }

    #[test]
    fn markdown_output() {
        let md = make_report().to_markdown();
        assert!(md.contains("## Python Fundamentals (test 1)"));
        assert!(md.contains("### Weaknesses"));
        assert!(md.contains("| 1 | correct | Syntax | easy |"));
        assert!(md.contains("| 2 | wrong | - | - |"));
    }

    #[test]
    fn missing_title_and_time() {
        let mut report = make_report();
        report.test_title = None;
        report.result.time_spent = None;
        let text = report.to_text();
        assert!(text.starts_with("Results: Test 1"));
        assert!(text.contains("time spent not recorded"));
    }
}
