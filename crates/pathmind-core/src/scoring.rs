//! Local scoring against an answer key.
//!
//! The real backend scores submissions server-side; this module gives the
//! mock and offline backends the same result shape.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::model::{
    format_clock, OptionId, Question, QuestionAnalysis, QuestionId, SubmitRequest, TestResult,
};

/// Grading data for one question. Never sent to the learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEntry {
    pub correct_option: OptionId,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

/// Correct options keyed by question.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerKey {
    entries: HashMap<QuestionId, KeyEntry>,
}

impl AnswerKey {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, question: QuestionId, entry: KeyEntry) {
        self.entries.insert(question, entry);
    }

    pub fn get(&self, question: &QuestionId) -> Option<&KeyEntry> {
        self.entries.get(question)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

const GENERAL_TOPIC: &str = "General";

/// Score a submission.
///
/// Every question in `questions` counts toward the total; unanswered ones
/// are wrong. Answers for unknown questions are ignored. A topic is a
/// strength when all of its questions are correct and a weakness otherwise.
pub fn score_submission(
    questions: &[Question],
    key: &AnswerKey,
    request: &SubmitRequest,
) -> TestResult {
    let mut correct_answers = 0u32;
    let mut analysis = Vec::with_capacity(questions.len());
    // topic -> (correct, total)
    let mut topics: BTreeMap<String, (u32, u32)> = BTreeMap::new();

    for question in questions {
        let entry = key.get(&question.id);
        let correct = match (entry, request.answers.get(&question.id)) {
            (Some(entry), Some(chosen)) => &entry.correct_option == chosen,
            _ => false,
        };
        if correct {
            correct_answers += 1;
        }

        let topic = entry.and_then(|e| e.topic.clone());
        let tally = topics
            .entry(topic.clone().unwrap_or_else(|| GENERAL_TOPIC.to_string()))
            .or_insert((0, 0));
        tally.1 += 1;
        if correct {
            tally.0 += 1;
        }

        analysis.push(QuestionAnalysis {
            id: question.id.clone(),
            correct,
            topic,
            difficulty: entry.and_then(|e| e.difficulty.clone()),
        });
    }

    let total_questions = questions.len() as u32;
    let score = if total_questions == 0 {
        0
    } else {
        ((f64::from(correct_answers) * 100.0) / f64::from(total_questions)).round() as u32
    };

    let mut strengths = Vec::new();
    let mut weaknesses = Vec::new();
    for (topic, (correct, total)) in &topics {
        if correct == total {
            strengths.push(topic.clone());
        } else {
            weaknesses.push(topic.clone());
        }
    }

    TestResult {
        score,
        correct_answers,
        total_questions,
        time_spent: request.time_spent_secs.map(format_clock),
        recommendations: recommendations_for(&weaknesses),
        strengths,
        weaknesses,
        question_analysis: analysis,
    }
}

fn recommendations_for(weaknesses: &[String]) -> Vec<String> {
    if weaknesses.is_empty() {
        return vec!["Move on to a harder test or the next step of your learning path".to_string()];
    }
    weaknesses
        .iter()
        .map(|t| format!("Review {t} and retake the related practice questions"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerMap, QuestionOption, TestId, UserId};

    fn question(id: &str) -> Question {
        Question {
            id: QuestionId::new(id),
            text: String::new(),
            options: ["a", "b", "c"]
                .iter()
                .map(|o| QuestionOption {
                    id: OptionId::new(*o),
                    text: o.to_string(),
                })
                .collect(),
            explanation: None,
        }
    }

    fn key(entries: &[(&str, &str, &str)]) -> AnswerKey {
        let mut key = AnswerKey::new();
        for (q, correct, topic) in entries {
            key.insert(
                QuestionId::new(*q),
                KeyEntry {
                    correct_option: OptionId::new(*correct),
                    topic: Some(topic.to_string()),
                    difficulty: None,
                },
            );
        }
        key
    }

    fn request(answers: &[(&str, &str)], time_spent_secs: Option<u64>) -> SubmitRequest {
        SubmitRequest {
            test_id: TestId(1),
            user_id: UserId(1),
            answers: answers
                .iter()
                .map(|(q, o)| (QuestionId::new(*q), OptionId::new(*o)))
                .collect::<AnswerMap>(),
            time_spent_secs,
        }
    }

    #[test]
    fn partial_submission() {
        let questions = vec![question("1"), question("2"), question("3")];
        let key = key(&[
            ("1", "b", "Syntax"),
            ("2", "c", "Data types"),
            ("3", "c", "Functions"),
        ]);
        let result = score_submission(&questions, &key, &request(&[("1", "b"), ("2", "a")], Some(1104)));

        assert_eq!(result.correct_answers, 1);
        assert_eq!(result.total_questions, 3);
        assert_eq!(result.score, 33);
        assert_eq!(result.time_spent.as_deref(), Some("18:24"));
        assert_eq!(result.strengths, vec!["Syntax"]);
        assert_eq!(result.weaknesses, vec!["Data types", "Functions"]);
        assert_eq!(result.recommendations.len(), 2);
        assert!(!result.question_analysis[2].correct);
    }

    #[test]
    fn empty_submission_scores_zero() {
        let questions = vec![question("1"), question("2")];
        let key = key(&[("1", "a", "Syntax"), ("2", "b", "Syntax")]);
        let result = score_submission(&questions, &key, &request(&[], None));
        assert_eq!(result.score, 0);
        assert!(result.strengths.is_empty());
        assert_eq!(result.weaknesses, vec!["Syntax"]);
        assert!(result.time_spent.is_none());
    }

    #[test]
    fn rounding_and_perfect_score() {
        let questions = vec![question("1"), question("2"), question("3")];
        let key = key(&[("1", "a", "A"), ("2", "a", "A"), ("3", "a", "B")]);
        let two_of_three = score_submission(&questions, &key, &request(&[("1", "a"), ("2", "a")], None));
        assert_eq!(two_of_three.score, 67);

        let all = score_submission(
            &questions,
            &key,
            &request(&[("1", "a"), ("2", "a"), ("3", "a")], None),
        );
        assert_eq!(all.score, 100);
        assert!(all.weaknesses.is_empty());
        assert_eq!(all.recommendations.len(), 1);
    }

    #[test]
    fn unknown_answers_ignored() {
        let questions = vec![question("1")];
        let key = key(&[("1", "a", "A")]);
        let result = score_submission(&questions, &key, &request(&[("99", "a")], None));
        assert_eq!(result.total_questions, 1);
        assert_eq!(result.correct_answers, 0);
    }
}
