use criterion::{black_box, criterion_group, criterion_main, Criterion};

use quizclock_core::analytics::{analyze, recommend, score, RecommendationInput, Tally};
use quizclock_core::model::{Difficulty, Mode, Question, SessionConfig};
use quizclock_core::session::{Phase, SessionState};

const SUBJECTS: [&str; 6] = ["Türkçe", "Matematik", "Fen", "İnkılap Tarihi", "Din", "İngilizce"];

fn make_bank(n: usize) -> Vec<Question> {
    (0..n)
        .map(|i| Question {
            id: format!("q{i}"),
            text: format!("Question {i}"),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_answer: i % 4,
            subject: SUBJECTS[i % SUBJECTS.len()].into(),
            achievement_tag: format!("T.{}", i % 17),
            difficulty: Difficulty::ALL[i % 3],
        })
        .collect()
}

fn make_state(n: usize) -> SessionState {
    let mut state = SessionState::new(n, 900);
    state.phase = Phase::Completed;
    for i in 0..n {
        // Roughly two thirds answered correctly, some skipped.
        if i % 7 == 6 {
            continue;
        }
        let option = if i % 3 == 0 { (i + 1) % 4 } else { i % 4 };
        state.answers.insert(i, option);
        state.question_elapsed_seconds.insert(i, (i % 90) as u32);
    }
    state
}

fn bench_analyze(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze");
    let config = SessionConfig::new(Mode::Exam, Difficulty::Medium);

    for n in [20, 90, 500] {
        let bank = make_bank(n);
        let state = make_state(n);
        group.bench_function(format!("questions={n}"), |b| {
            b.iter(|| analyze(black_box(&state), black_box(&config), black_box(&bank)))
        });
    }

    group.finish();
}

fn bench_rules(c: &mut Criterion) {
    let mut group = c.benchmark_group("rules");

    group.bench_function("score", |b| {
        b.iter(|| score(black_box(61), black_box(90)))
    });

    let weak = [
        ("Matematik", Tally { correct: 5, total: 15 }),
        ("Fen", Tally { correct: 8, total: 15 }),
    ];
    group.bench_function("recommend", |b| {
        b.iter(|| {
            recommend(black_box(&RecommendationInput {
                score: 64,
                total_time_seconds: 2700,
                total_questions: 90,
                hints_used_count: 30,
                weak_subjects: &weak,
            }))
        })
    });

    group.finish();
}

criterion_group!(benches, bench_analyze, bench_rules);
criterion_main!(benches);
