//! TOML question bank parser.
//!
//! Loads adaptive tests (summary, questions, answer key) from TOML files and
//! directories, and validates them. Banks back the mock and offline backends.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{
    OptionId, Question, QuestionId, QuestionOption, TestId, TestSummary, DEFAULT_TIME_LIMIT_SECS,
};
use crate::scoring::{AnswerKey, KeyEntry};

/// A test with its questions and grading key.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    pub summary: TestSummary,
    pub questions: Vec<Question>,
    pub key: AnswerKey,
}

impl QuestionBank {
    /// Questions that have an entry in the answer key.
    pub fn keyed_questions(&self) -> usize {
        self.questions
            .iter()
            .filter(|q| self.key.get(&q.id).is_some())
            .count()
    }

    /// Distinct topics named by the answer key, sorted.
    pub fn topics(&self) -> BTreeSet<&str> {
        self.questions
            .iter()
            .filter_map(|q| self.key.get(&q.id)?.topic.as_deref())
            .collect()
    }
}

/// Intermediate TOML structure for parsing bank files.
#[derive(Debug, Deserialize)]
struct TomlBankFile {
    test: TomlTestHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlTestHeader {
    id: u64,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    difficulty: String,
    #[serde(default = "default_time_limit")]
    time_limit_secs: u64,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    instructions: Vec<String>,
}

fn default_time_limit() -> u64 {
    DEFAULT_TIME_LIMIT_SECS
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: QuestionId,
    text: String,
    #[serde(default)]
    options: Vec<QuestionOption>,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    correct_option: Option<OptionId>,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    difficulty: Option<String>,
}

/// Parse a single TOML file into a `QuestionBank`.
pub fn parse_bank(path: &Path) -> Result<QuestionBank> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question bank: {}", path.display()))?;

    parse_bank_str(&content, path)
}

/// Parse a TOML string into a `QuestionBank` (useful for testing).
pub fn parse_bank_str(content: &str, source_path: &Path) -> Result<QuestionBank> {
    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    // answers and the key are both addressed by question id
    let mut seen_ids = HashSet::new();
    if let Some(dup) = parsed.questions.iter().find(|q| !seen_ids.insert(&q.id)) {
        anyhow::bail!(
            "duplicate question ID '{}' in {}",
            dup.id,
            source_path.display()
        );
    }

    let mut key = AnswerKey::new();
    let questions: Vec<Question> = parsed
        .questions
        .into_iter()
        .map(|q| {
            if let Some(correct_option) = q.correct_option {
                key.insert(
                    q.id.clone(),
                    KeyEntry {
                        correct_option,
                        topic: q.topic,
                        difficulty: q.difficulty,
                    },
                );
            }
            Question {
                id: q.id,
                text: q.text,
                options: q.options,
                explanation: q.explanation,
            }
        })
        .collect();

    let header = parsed.test;
    Ok(QuestionBank {
        summary: TestSummary {
            id: TestId(header.id),
            title: header.title,
            description: header.description,
            difficulty: header.difficulty,
            time_limit_secs: header.time_limit_secs,
            question_count: questions.len(),
            tags: header.tags,
            instructions: header.instructions,
        },
        questions,
        key,
    })
}

/// Recursively load all `.toml` banks from a directory.
pub fn load_bank_directory(dir: &Path) -> Result<Vec<QuestionBank>> {
    let mut banks = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            banks.extend(load_bank_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_bank(&path) {
                Ok(bank) => banks.push(bank),
                Err(e) => {
                    tracing::warn!("skipping {}: {}", path.display(), e);
                }
            }
        }
    }

    banks.sort_by_key(|b| b.summary.id);
    Ok(banks)
}

/// A warning from bank validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

impl ValidationWarning {
    fn for_question(id: &QuestionId, message: impl Into<String>) -> Self {
        Self {
            question_id: Some(id.to_string()),
            message: message.into(),
        }
    }
}

/// Validate a bank for common authoring mistakes.
pub fn validate_bank(bank: &QuestionBank) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if bank.questions.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "test has no questions and cannot be taken".into(),
        });
    }

    if bank.summary.time_limit_secs == 0 {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "time_limit_secs is 0".into(),
        });
    }

    for question in &bank.questions {
        if question.options.len() < 2 {
            warnings.push(ValidationWarning::for_question(
                &question.id,
                format!("only {} option(s); need at least 2", question.options.len()),
            ));
        }

        let mut seen_options = HashSet::new();
        for option in &question.options {
            if !seen_options.insert(&option.id) {
                warnings.push(ValidationWarning::for_question(
                    &question.id,
                    format!("duplicate option ID: {}", option.id),
                ));
            }
        }

        match bank.key.get(&question.id) {
            None => warnings.push(ValidationWarning::for_question(
                &question.id,
                "no correct_option; the question can never be scored correct",
            )),
            Some(entry) if question.option(&entry.correct_option).is_none() => {
                warnings.push(ValidationWarning::for_question(
                    &question.id,
                    format!(
                        "correct_option '{}' is not one of the options",
                        entry.correct_option
                    ),
                ))
            }
            Some(_) => {}
        }

        if question.explanation.is_none() {
            warnings.push(ValidationWarning::for_question(
                &question.id,
                "no explanation provided",
            ));
        }
    }

    warnings
}
