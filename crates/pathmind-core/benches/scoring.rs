use criterion::{black_box, criterion_group, criterion_main, Criterion};

use pathmind_core::model::{
    AnswerMap, OptionId, Question, QuestionId, QuestionOption, SubmitRequest, TestId, UserId,
};
use pathmind_core::scoring::{score_submission, AnswerKey, KeyEntry};

const TOPICS: [&str; 4] = ["Syntax", "Data types", "Functions", "Errors"];

fn make_bank(count: usize) -> (Vec<Question>, AnswerKey) {
    let mut key = AnswerKey::new();
    let questions = (0..count)
        .map(|i| {
            let id = QuestionId::new(i.to_string());
            key.insert(
                id.clone(),
                KeyEntry {
                    correct_option: OptionId::new("b"),
                    topic: Some(TOPICS[i % TOPICS.len()].to_string()),
                    difficulty: None,
                },
            );
            Question {
                id,
                text: format!("Question {i}"),
                options: ["a", "b", "c", "d"]
                    .iter()
                    .map(|o| QuestionOption {
                        id: OptionId::new(*o),
                        text: o.to_string(),
                    })
                    .collect(),
                explanation: None,
            }
        })
        .collect();
    (questions, key)
}

fn make_request(questions: &[Question], every: usize) -> SubmitRequest {
    SubmitRequest {
        test_id: TestId(1),
        user_id: UserId(1),
        answers: questions
            .iter()
            .step_by(every)
            .map(|q| (q.id.clone(), OptionId::new("b")))
            .collect::<AnswerMap>(),
        time_spent_secs: Some(600),
    }
}

fn bench_score_submission(c: &mut Criterion) {
    let mut group = c.benchmark_group("score_submission");

    for count in [15, 100, 1000] {
        let (questions, key) = make_bank(count);

        let all = make_request(&questions, 1);
        group.bench_function(format!("all_answered/{count}"), |b| {
            b.iter(|| score_submission(black_box(&questions), black_box(&key), black_box(&all)))
        });

        let partial = make_request(&questions, 3);
        group.bench_function(format!("partial/{count}"), |b| {
            b.iter(|| {
                score_submission(black_box(&questions), black_box(&key), black_box(&partial))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_score_submission);
criterion_main!(benches);
