//! Post-session analytics.
//!
//! [`analyze`] turns a completed session into an [`AnalysisReport`]: score,
//! per-subject / per-difficulty / per-achievement tallies, strength and
//! weakness classification, and a rule-based recommendation list.
//!
//! Everything here is a pure function of its inputs. All threshold checks use
//! integer arithmetic so results never depend on float rounding.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::model::{Difficulty, Mode, Question, SessionConfig};
use crate::session::{Phase, SessionState};

/// Subjects below this accuracy (percent, exclusive) are weak.
pub const WEAK_ACCURACY_PERCENT: usize = 70;
/// Subjects at or above this accuracy (percent) are strong.
pub const STRONG_ACCURACY_PERCENT: usize = 80;
/// Score at or above which the result is excellent.
pub const EXCELLENT_SCORE: u8 = 90;
/// Score at or above which the result is good.
pub const GOOD_SCORE: u8 = 70;
/// Average seconds per question above which pacing is too slow.
pub const SLOW_PACE_SECONDS: u64 = 120;
/// Average seconds per question below which pacing is too fast.
pub const FAST_PACE_SECONDS: u64 = 60;
/// Share of questions (percent, exclusive) with hints that signals over-reliance.
pub const HINT_RELIANCE_PERCENT: usize = 30;

/// Correct/total counter for one aggregation bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub correct: usize,
    pub total: usize,
}

impl Tally {
    fn record(&mut self, correct: bool) {
        self.total += 1;
        if correct {
            self.correct += 1;
        }
    }

    /// Accuracy in `[0, 1]`; an empty tally reads as 0.
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }

    /// Accuracy strictly below [`WEAK_ACCURACY_PERCENT`].
    pub fn is_weak(&self) -> bool {
        self.correct * 100 < self.total * WEAK_ACCURACY_PERCENT
    }

    /// Accuracy at or above [`STRONG_ACCURACY_PERCENT`].
    pub fn is_strong(&self) -> bool {
        self.total > 0 && self.correct * 100 >= self.total * STRONG_ACCURACY_PERCENT
    }
}

/// How the candidate did on one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub index: usize,
    pub question_id: String,
    pub subject: String,
    pub difficulty: Difficulty,
    pub selected: Option<usize>,
    pub correct: bool,
    /// Seconds before the first answer; 0 if never answered.
    pub elapsed_seconds: u32,
    pub hint_used: bool,
}

/// The analysis of one completed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub mode: Mode,
    pub difficulty: Difficulty,
    /// `round(100 × correct / total)`.
    pub score: u8,
    pub correct_count: usize,
    pub answered_count: usize,
    pub total_questions: usize,
    pub total_time_seconds: u32,
    pub average_time_per_question_seconds: f64,
    pub subject_performance: BTreeMap<String, Tally>,
    pub difficulty_performance: BTreeMap<Difficulty, Tally>,
    pub achievement_performance: BTreeMap<String, Tally>,
    /// Subjects below 70% accuracy, in order of first appearance.
    pub weak_subjects: Vec<String>,
    /// Subjects at or above 80% accuracy, in order of first appearance.
    pub strong_subjects: Vec<String>,
    pub hints_used_count: usize,
    pub recommendations: Vec<String>,
    pub questions: Vec<QuestionOutcome>,
    #[serde(default)]
    pub started_at_epoch_millis: Option<i64>,
    #[serde(default)]
    pub completed_at_epoch_millis: Option<i64>,
}

impl AnalysisReport {
    /// Accuracy of `subject`, if it appeared in the session.
    pub fn subject_accuracy(&self, subject: &str) -> Option<f64> {
        self.subject_performance.get(subject).map(Tally::accuracy)
    }
}

/// Analyse a completed session.
///
/// # Errors
///
/// Returns an invalid-input error if the session has not completed, if
/// `questions` is not the sequence the session was built with, or if the
/// recorded state refers to questions or options that do not exist.
pub fn analyze(
    state: &SessionState,
    config: &SessionConfig,
    questions: &[Question],
) -> Result<AnalysisReport, SessionError> {
    check_input(state, config, questions)?;
    Ok(build_report(state, config, questions))
}

fn check_input(
    state: &SessionState,
    config: &SessionConfig,
    questions: &[Question],
) -> Result<(), SessionError> {
    if state.phase != Phase::Completed {
        return Err(SessionError::NotCompleted(state.phase));
    }
    if questions.len() != state.question_count {
        return Err(SessionError::QuestionCountMismatch {
            expected: state.question_count,
            actual: questions.len(),
        });
    }
    if questions.is_empty() {
        return Err(SessionError::InconsistentState(
            "session has no questions".into(),
        ));
    }

    let count = questions.len();
    for (&index, &option) in &state.answers {
        let question = questions.get(index).ok_or_else(|| {
            SessionError::InconsistentState(format!("answer for unknown question {index}"))
        })?;
        if option >= question.options.len() {
            return Err(SessionError::InconsistentState(format!(
                "question {index} answered with option {option} of {}",
                question.options.len()
            )));
        }
    }
    if let Some(index) = state
        .question_elapsed_seconds
        .keys()
        .chain(state.hints_used.iter())
        .find(|&&i| i >= count)
    {
        return Err(SessionError::InconsistentState(format!(
            "timing or hint recorded for unknown question {index}"
        )));
    }
    if !state.hints_used.is_empty() && !config.mode.allows_hints() {
        return Err(SessionError::InconsistentState(format!(
            "hints recorded in {} mode",
            config.mode
        )));
    }
    if state.remaining_seconds > config.nominal_duration_seconds() {
        return Err(SessionError::InconsistentState(format!(
            "{} seconds remaining exceeds the {} second countdown",
            state.remaining_seconds,
            config.nominal_duration_seconds()
        )));
    }
    Ok(())
}

/// Build the report without validating the input. The controller only calls
/// this on state it produced itself.
pub(crate) fn build_report(
    state: &SessionState,
    config: &SessionConfig,
    questions: &[Question],
) -> AnalysisReport {
    let total_questions = questions.len();
    let mut subject_order: Vec<&str> = Vec::new();
    let mut subjects: HashMap<&str, Tally> = HashMap::new();
    let mut difficulty_performance: BTreeMap<Difficulty, Tally> = BTreeMap::new();
    let mut achievement_performance: BTreeMap<String, Tally> = BTreeMap::new();
    let mut outcomes = Vec::with_capacity(total_questions);

    for (index, question) in questions.iter().enumerate() {
        let selected = state.answers.get(&index).copied();
        let correct = selected.is_some_and(|option| question.is_correct(option));

        subjects
            .entry(question.subject.as_str())
            .or_insert_with(|| {
                subject_order.push(question.subject.as_str());
                Tally::default()
            })
            .record(correct);
        difficulty_performance
            .entry(question.difficulty)
            .or_default()
            .record(correct);
        if !question.achievement_tag.is_empty() {
            achievement_performance
                .entry(question.achievement_tag.clone())
                .or_default()
                .record(correct);
        }

        outcomes.push(QuestionOutcome {
            index,
            question_id: question.id.clone(),
            subject: question.subject.clone(),
            difficulty: question.difficulty,
            selected,
            correct,
            elapsed_seconds: state
                .question_elapsed_seconds
                .get(&index)
                .copied()
                .unwrap_or(0),
            hint_used: state.hints_used.contains(&index),
        });
    }

    let correct_count = outcomes.iter().filter(|o| o.correct).count();
    let score = score(correct_count, total_questions);
    let total_time_seconds = state.consumed_seconds(config.nominal_duration_seconds());
    let hints_used_count = state.hints_used.len();

    let weak: Vec<(&str, Tally)> = subject_order
        .iter()
        .map(|s| (*s, subjects[s]))
        .filter(|(_, t)| t.is_weak())
        .collect();
    let strong_subjects = subject_order
        .iter()
        .filter(|s| subjects[*s].is_strong())
        .map(|s| s.to_string())
        .collect();

    let recommendations = recommend(&RecommendationInput {
        score,
        total_time_seconds,
        total_questions,
        hints_used_count,
        weak_subjects: &weak,
    });

    AnalysisReport {
        mode: config.mode,
        difficulty: config.difficulty,
        score,
        correct_count,
        answered_count: state.answers.len(),
        total_questions,
        total_time_seconds,
        average_time_per_question_seconds: f64::from(total_time_seconds)
            / total_questions.max(1) as f64,
        subject_performance: subjects
            .into_iter()
            .map(|(s, t)| (s.to_string(), t))
            .collect(),
        difficulty_performance,
        achievement_performance,
        weak_subjects: weak.iter().map(|(s, _)| s.to_string()).collect(),
        strong_subjects,
        hints_used_count,
        recommendations,
        questions: outcomes,
        started_at_epoch_millis: state.started_at_epoch_millis,
        completed_at_epoch_millis: state.completed_at_epoch_millis,
    }
}

/// `round(100 × correct / total)`, rounding halves up. Zero questions score 0.
pub fn score(correct: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let correct = correct.min(total);
    ((200 * correct + total) / (2 * total)) as u8
}

// ---------------------------------------------------------------------------
// Recommendations
// ---------------------------------------------------------------------------

/// Everything the recommendation rules look at.
#[derive(Debug, Clone, Copy)]
pub struct RecommendationInput<'a> {
    pub score: u8,
    pub total_time_seconds: u32,
    pub total_questions: usize,
    pub hints_used_count: usize,
    /// Weak subjects with their tallies, in report order.
    pub weak_subjects: &'a [(&'a str, Tally)],
}

/// Apply the recommendation rules in their fixed order:
///
/// 1. one message for the score bracket
/// 2. at most one pacing message
/// 3. one message if hints were used on more than 30% of questions
/// 4. one message per weak subject
pub fn recommend(input: &RecommendationInput<'_>) -> Vec<String> {
    let mut out = Vec::new();

    out.push(if input.score >= EXCELLENT_SCORE {
        format!(
            "Excellent result ({}/100). You are ready to move on to more advanced material.",
            input.score
        )
    } else if input.score >= GOOD_SCORE {
        format!(
            "Good result ({}/100). Reinforce the topics you missed to close the remaining gaps.",
            input.score
        )
    } else {
        format!(
            "Score {}/100. Revisit the fundamentals before taking another full test.",
            input.score
        )
    });

    let questions = input.total_questions.max(1) as u64;
    let time = u64::from(input.total_time_seconds);
    let average = time / questions;
    if time > SLOW_PACE_SECONDS * questions {
        out.push(format!(
            "Your pacing is too slow (about {average}s per question). Practise under time pressure."
        ));
    } else if time < FAST_PACE_SECONDS * questions {
        out.push(format!(
            "You are moving too fast (about {average}s per question). Slow down and read each question carefully."
        ));
    }

    if input.hints_used_count * 100 > input.total_questions * HINT_RELIANCE_PERCENT {
        out.push(format!(
            "You relied on hints for {} of {} questions. Try answering on your own first.",
            input.hints_used_count, input.total_questions
        ));
    }

    for (subject, tally) in input.weak_subjects {
        out.push(format!(
            "Focus on {subject}: {} of {} correct ({:.0}%).",
            tally.correct,
            tally.total,
            tally.accuracy() * 100.0
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(id: &str, correct: usize, subject: &str, difficulty: Difficulty) -> Question {
        Question {
            id: id.into(),
            text: String::new(),
            options: vec!["A".into(), "B".into(), "C".into()],
            correct_answer: correct,
            subject: subject.into(),
            achievement_tag: format!("{subject}-tag"),
            difficulty,
        }
    }

    fn completed(
        questions: &[Question],
        answers: &[(usize, usize)],
        remaining_seconds: u32,
    ) -> SessionState {
        let mut state = SessionState::new(questions.len(), remaining_seconds);
        state.phase = Phase::Completed;
        state.answers = answers.iter().copied().collect();
        state
    }

    fn exam() -> SessionConfig {
        SessionConfig::new(Mode::Exam, Difficulty::Medium)
    }

    #[test]
    fn score_rounds_half_up() {
        assert_eq!(score(2, 3), 67);
        assert_eq!(score(1, 3), 33);
        assert_eq!(score(1, 8), 13);
        assert_eq!(score(0, 5), 0);
        assert_eq!(score(5, 5), 100);
        assert_eq!(score(0, 0), 0);
    }

    #[test]
    fn unanswered_questions_count_as_incorrect() {
        let questions = vec![
            q("a", 1, "Fen", Difficulty::Easy),
            q("b", 1, "Fen", Difficulty::Easy),
            q("c", 0, "Fen", Difficulty::Easy),
        ];
        let state = completed(&questions, &[(0, 1), (1, 0), (2, 0)], 3000);
        let report = analyze(&state, &exam(), &questions).unwrap();
        assert_eq!(report.correct_count, 2);
        assert_eq!(report.score, 67);

        let state = completed(&questions, &[(0, 1)], 3000);
        let report = analyze(&state, &exam(), &questions).unwrap();
        assert_eq!(report.correct_count, 1);
        assert_eq!(report.answered_count, 1);
        assert!(!report.questions[2].correct);
        assert_eq!(report.questions[2].selected, None);
        assert_eq!(report.questions[2].elapsed_seconds, 0);
    }

    #[test]
    fn aggregates_by_question_tags() {
        let questions = vec![
            q("a", 0, "Fen", Difficulty::Easy),
            q("b", 0, "Matematik", Difficulty::Hard),
            q("c", 0, "Fen", Difficulty::Hard),
        ];
        let state = completed(&questions, &[(0, 0), (1, 0), (2, 1)], 3000);
        let config = SessionConfig::new(Mode::Exam, Difficulty::Easy);
        let report = analyze(&state, &config, &questions).unwrap();

        assert_eq!(report.subject_performance["Fen"], Tally { correct: 1, total: 2 });
        assert_eq!(
            report.subject_performance["Matematik"],
            Tally { correct: 1, total: 1 }
        );
        assert_eq!(
            report.difficulty_performance[&Difficulty::Hard],
            Tally { correct: 1, total: 2 }
        );
        assert!(!report.difficulty_performance.contains_key(&Difficulty::Medium));
        assert_eq!(
            report.achievement_performance["Fen-tag"],
            Tally { correct: 1, total: 2 }
        );
        assert_eq!(report.difficulty, Difficulty::Easy);
    }

    #[test]
    fn weak_subject_gets_exactly_one_recommendation() {
        let mut questions: Vec<Question> = (0..4)
            .map(|i| q(&format!("m{i}"), 2, "Matematik", Difficulty::Medium))
            .collect();
        questions.extend((0..4).map(|i| q(&format!("t{i}"), 1, "Türkçe", Difficulty::Medium)));
        let answers = [(0, 2), (1, 0), (2, 0), (3, 1), (4, 1), (5, 1), (6, 1), (7, 1)];
        let state = completed(&questions, &answers, 3600 - 8 * 90);
        let report = analyze(&state, &exam(), &questions).unwrap();

        assert_eq!(report.weak_subjects, vec!["Matematik"]);
        assert_eq!(report.strong_subjects, vec!["Türkçe"]);
        let naming: Vec<&String> = report
            .recommendations
            .iter()
            .filter(|r| r.contains("Matematik"))
            .collect();
        assert_eq!(naming.len(), 1);
        assert!(naming[0].contains("1 of 4"));
    }

    #[test]
    fn classification_boundaries() {
        assert!(Tally { correct: 6, total: 10 }.is_weak());
        assert!(!Tally { correct: 7, total: 10 }.is_weak());
        assert!(!Tally { correct: 7, total: 10 }.is_strong());
        assert!(Tally { correct: 8, total: 10 }.is_strong());
        assert!(Tally { correct: 4, total: 5 }.is_strong());
        assert!(!Tally::default().is_strong());
    }

    #[test]
    fn weak_and_strong_subjects_are_disjoint_and_ordered() {
        let questions = vec![
            q("a", 0, "Tarih", Difficulty::Easy),
            q("b", 0, "Fen", Difficulty::Easy),
            q("c", 0, "Coğrafya", Difficulty::Easy),
            q("d", 0, "Biyoloji", Difficulty::Easy),
            q("e", 0, "Fen", Difficulty::Easy),
        ];
        let state = completed(&questions, &[(0, 1), (1, 0), (3, 0), (4, 0)], 3000);
        let report = analyze(&state, &exam(), &questions).unwrap();
        assert_eq!(report.weak_subjects, vec!["Tarih", "Coğrafya"]);
        assert_eq!(report.strong_subjects, vec!["Fen", "Biyoloji"]);
        assert!(report
            .weak_subjects
            .iter()
            .all(|s| !report.strong_subjects.contains(s)));
    }

    #[test]
    fn recommendation_rules_in_order() {
        let weak = [("Fizik", Tally { correct: 0, total: 2 })];
        let recs = recommend(&RecommendationInput {
            score: 40,
            total_time_seconds: 1500,
            total_questions: 10,
            hints_used_count: 4,
            weak_subjects: &weak,
        });
        assert_eq!(recs.len(), 4);
        assert!(recs[0].contains("fundamentals"));
        assert!(recs[1].contains("too slow"));
        assert!(recs[2].contains("hints for 4 of 10"));
        assert!(recs[3].contains("Fizik"));
    }

    #[test]
    fn score_brackets() {
        let rec = |score| {
            recommend(&RecommendationInput {
                score,
                total_time_seconds: 900,
                total_questions: 10,
                hints_used_count: 3,
                weak_subjects: &[],
            })
        };
        assert!(rec(90)[0].starts_with("Excellent"));
        assert!(rec(89)[0].starts_with("Good"));
        assert!(rec(70)[0].starts_with("Good"));
        assert!(rec(69)[0].starts_with("Score 69"));
        // 90s per question and exactly 30% hints: no pacing or hint message.
        assert_eq!(rec(100).len(), 1);
    }

    #[test]
    fn pacing_messages_are_exclusive() {
        let rec = |total_time_seconds| {
            recommend(&RecommendationInput {
                score: 75,
                total_time_seconds,
                total_questions: 2,
                hints_used_count: 0,
                weak_subjects: &[],
            })
        };
        assert!(rec(100)[1].contains("too fast"));
        assert_eq!(rec(120).len(), 1);
        assert_eq!(rec(240).len(), 1);
        assert!(rec(241)[1].contains("too slow"));
    }

    #[test]
    fn timing_derives_from_countdown() {
        let questions: Vec<Question> = (0..10)
            .map(|i| q(&i.to_string(), 0, "Fen", Difficulty::Medium))
            .collect();
        let mut state = completed(&questions, &[(0, 0), (1, 0)], 0);
        state.question_elapsed_seconds.insert(0, 40);
        let report = analyze(&state, &exam(), &questions).unwrap();
        assert_eq!(report.total_time_seconds, 3600);
        assert!((report.average_time_per_question_seconds - 360.0).abs() < f64::EPSILON);
        assert_eq!(report.questions[0].elapsed_seconds, 40);
        assert!(report.recommendations.iter().any(|r| r.contains("too slow")));
    }

    #[test]
    fn rejects_invalid_input() {
        let questions = vec![q("a", 0, "Fen", Difficulty::Easy)];
        let mut state = completed(&questions, &[], 10);

        state.phase = Phase::Running;
        assert_eq!(
            analyze(&state, &exam(), &questions),
            Err(SessionError::NotCompleted(Phase::Running))
        );
        state.phase = Phase::Completed;

        let two = vec![questions[0].clone(), questions[0].clone()];
        assert_eq!(
            analyze(&state, &exam(), &two),
            Err(SessionError::QuestionCountMismatch {
                expected: 1,
                actual: 2
            })
        );

        let mut bad = state.clone();
        bad.answers.insert(0, 7);
        assert!(matches!(
            analyze(&bad, &exam(), &questions),
            Err(SessionError::InconsistentState(_))
        ));

        let mut hinted = state.clone();
        hinted.hints_used.insert(0);
        assert!(analyze(&hinted, &exam(), &questions).is_err());
        let practice = SessionConfig::new(Mode::Practice, Difficulty::Easy);
        assert!(analyze(&hinted, &practice, &questions).is_ok());

        let mut overtime = state;
        overtime.remaining_seconds = 5000;
        assert!(analyze(&overtime, &exam(), &questions).is_err());
    }

    #[test]
    fn analysis_is_idempotent() {
        let questions = vec![
            q("a", 0, "Fen", Difficulty::Easy),
            q("b", 1, "Tarih", Difficulty::Hard),
        ];
        let mut state = completed(&questions, &[(0, 0)], 1700);
        state.hints_used.insert(1);
        let config = SessionConfig::new(Mode::Practice, Difficulty::Easy);
        let first = analyze(&state, &config, &questions).unwrap();
        let second = analyze(&state, &config, &questions).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(first.hints_used_count, 1);
        assert!(first.questions[1].hint_used);
    }
}
