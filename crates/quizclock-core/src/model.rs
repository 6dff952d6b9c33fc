//! Core data model types for quizclock.
//!
//! Questions arrive from an external bank as an ordered, immutable sequence;
//! the session configuration is chosen by the caller before the clock starts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SessionError;

/// A single multiple-choice question from the bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier within the bank.
    pub id: String,
    /// The question text shown to the candidate.
    pub text: String,
    /// Answer options, in display order.
    pub options: Vec<String>,
    /// 0-based index of the correct option.
    pub correct_answer: usize,
    /// Subject tag used for per-subject aggregation.
    pub subject: String,
    /// Curriculum topic label, distinct from the subject.
    #[serde(default)]
    pub achievement_tag: String,
    /// Difficulty tag of this question.
    #[serde(default)]
    pub difficulty: Difficulty,
}

impl Question {
    /// Returns `true` if `option` is the correct answer.
    pub fn is_correct(&self, option: usize) -> bool {
        option == self.correct_answer
    }

    /// Check the structural rules every question must satisfy.
    ///
    /// `index` is the question's position in its sequence and only feeds the error.
    pub fn validate(&self, index: usize) -> Result<(), SessionError> {
        let invalid = |reason: String| SessionError::InvalidQuestion {
            index,
            id: self.id.clone(),
            reason,
        };
        if self.options.len() < 2 {
            return Err(invalid(format!(
                "needs at least 2 options, has {}",
                self.options.len()
            )));
        }
        if self.correct_answer >= self.options.len() {
            return Err(invalid(format!(
                "correct answer {} is not one of its {} options",
                self.correct_answer,
                self.options.len()
            )));
        }
        Ok(())
    }
}

/// Validate a whole question sequence before a session is built on it.
pub fn validate_questions(questions: &[Question]) -> Result<(), SessionError> {
    if questions.is_empty() {
        return Err(SessionError::EmptyQuestionBank);
    }
    questions
        .iter()
        .enumerate()
        .try_for_each(|(index, q)| q.validate(index))
}

/// A named, ordered collection of questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionBank {
    /// Unique identifier for this bank.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Questions in the order they are served.
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// Question and session difficulty levels.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// All levels, easiest first.
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(SessionError::UnknownDifficulty(other.to_string())),
        }
    }
}

/// Session mode.
///
/// `Adaptive` only changes the nominal duration; questions are always served
/// in bank order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Reveals correctness after each answer and allows hints.
    #[default]
    Practice,
    /// No reveal, no hints.
    Exam,
    Adaptive,
}

impl Mode {
    /// Countdown length for a session in this mode.
    pub fn nominal_duration_seconds(self) -> u32 {
        match self {
            Mode::Practice => 1800,
            Mode::Exam => 3600,
            Mode::Adaptive => 2400,
        }
    }

    /// Whether answers reveal their correctness immediately.
    pub fn reveals_answers(self) -> bool {
        matches!(self, Mode::Practice)
    }

    /// Whether hints may be requested.
    pub fn allows_hints(self) -> bool {
        matches!(self, Mode::Practice)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Practice => write!(f, "practice"),
            Mode::Exam => write!(f, "exam"),
            Mode::Adaptive => write!(f, "adaptive"),
        }
    }
}

impl FromStr for Mode {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "practice" => Ok(Mode::Practice),
            "exam" => Ok(Mode::Exam),
            "adaptive" => Ok(Mode::Adaptive),
            other => Err(SessionError::UnknownMode(other.to_string())),
        }
    }
}

/// Session settings chosen during setup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub mode: Mode,
    /// Display hint only; questions keep their own difficulty tags.
    #[serde(default)]
    pub difficulty: Difficulty,
}

impl SessionConfig {
    pub fn new(mode: Mode, difficulty: Difficulty) -> Self {
        Self { mode, difficulty }
    }

    /// Countdown length derived from the mode.
    pub fn nominal_duration_seconds(&self) -> u32 {
        self.mode.nominal_duration_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(options: usize, correct: usize) -> Question {
        Question {
            id: "q1".into(),
            text: "2 + 2?".into(),
            options: (0..options).map(|i| i.to_string()).collect(),
            correct_answer: correct,
            subject: "Matematik".into(),
            achievement_tag: "M.4.1".into(),
            difficulty: Difficulty::Easy,
        }
    }

    #[test]
    fn mode_durations() {
        assert_eq!(Mode::Practice.nominal_duration_seconds(), 1800);
        assert_eq!(Mode::Exam.nominal_duration_seconds(), 3600);
        assert_eq!(Mode::Adaptive.nominal_duration_seconds(), 2400);
        assert!(Mode::Practice.allows_hints());
        assert!(!Mode::Exam.allows_hints());
        assert!(!Mode::Adaptive.reveals_answers());
    }

    #[test]
    fn mode_and_difficulty_parse() {
        assert_eq!("Exam".parse::<Mode>().unwrap(), Mode::Exam);
        assert_eq!(" adaptive ".parse::<Mode>().unwrap(), Mode::Adaptive);
        assert_eq!("HARD".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        let err = "quiz".parse::<Mode>().unwrap_err();
        assert!(err.is_configuration());
        assert!("extreme".parse::<Difficulty>().unwrap_err().is_configuration());
        assert_eq!(Mode::Adaptive.to_string(), "adaptive");
        assert_eq!(Difficulty::Medium.to_string(), "medium");
    }

    #[test]
    fn question_validation() {
        assert!(question(4, 3).validate(0).is_ok());
        assert!(matches!(
            question(1, 0).validate(2),
            Err(SessionError::InvalidQuestion { index: 2, .. })
        ));
        assert!(question(3, 3).validate(0).is_err());
        assert_eq!(
            validate_questions(&[]),
            Err(SessionError::EmptyQuestionBank)
        );
    }

    #[test]
    fn question_serde_defaults() {
        let json = r#"{"id":"a","text":"t","options":["x","y"],"correct_answer":1,"subject":"Fen"}"#;
        let q: Question = serde_json::from_str(json).unwrap();
        assert_eq!(q.difficulty, Difficulty::Medium);
        assert!(q.achievement_tag.is_empty());
        assert!(q.is_correct(1));
    }
}
