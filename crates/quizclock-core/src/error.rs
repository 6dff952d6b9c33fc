//! Session and analytics error types.
//!
//! Every failure the core can signal is a [`SessionError`]. Callers that only
//! care about the broad category (configuration problem, misuse of the state
//! machine, bad analytics input) can match on [`SessionError::kind`] instead of
//! the individual variants.

use std::fmt;

use thiserror::Error;

use crate::model::Mode;
use crate::session::{Operation, Phase};

/// Broad classification of a [`SessionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The session cannot be set up with the given inputs.
    Configuration,
    /// An operation was attempted outside the phase or mode that permits it.
    InvalidState,
    /// An argument or analytics input is out of range or inconsistent.
    ///
    /// Also covers out-of-range question and option indices passed to session operations.
    InvalidInput,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Configuration => write!(f, "configuration"),
            ErrorKind::InvalidState => write!(f, "invalid state"),
            ErrorKind::InvalidInput => write!(f, "invalid input"),
        }
    }
}

/// Errors raised by the session controller and the analytics engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The question sequence handed to a new session was empty.
    #[error("question bank is empty")]
    EmptyQuestionBank,

    /// A question in the bank is malformed.
    #[error("question {index} ({id}) is invalid: {reason}")]
    InvalidQuestion {
        index: usize,
        id: String,
        reason: String,
    },

    /// A mode name could not be parsed.
    #[error("unknown mode: {0}")]
    UnknownMode(String),

    /// A difficulty name could not be parsed.
    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),

    /// The operation is not permitted in the session's current phase.
    #[error("cannot {operation} while the session is {phase}")]
    WrongPhase { operation: Operation, phase: Phase },

    /// The operation is not available in the session's mode.
    #[error("cannot {operation} in {mode} mode")]
    NotAvailableInMode { operation: Operation, mode: Mode },

    /// A navigation target outside `[0, question_count)`.
    #[error("question index {index} out of range (session has {count} questions)")]
    QuestionOutOfRange { index: usize, count: usize },

    /// An option index outside the active question's options.
    #[error("option {option} out of range (question has {count} options)")]
    OptionOutOfRange { option: usize, count: usize },

    /// Analytics requested for a session that has not completed.
    #[error("session is {0}, analytics require a completed session")]
    NotCompleted(Phase),

    /// The question sequence does not match the session it is analysed with.
    #[error("session recorded {expected} questions but {actual} were supplied")]
    QuestionCountMismatch { expected: usize, actual: usize },

    /// The frozen session state is internally inconsistent.
    #[error("inconsistent session state: {0}")]
    InconsistentState(String),
}

impl SessionError {
    /// Returns the broad category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::EmptyQuestionBank
            | SessionError::InvalidQuestion { .. }
            | SessionError::UnknownMode(_)
            | SessionError::UnknownDifficulty(_) => ErrorKind::Configuration,
            SessionError::WrongPhase { .. } | SessionError::NotAvailableInMode { .. } => {
                ErrorKind::InvalidState
            }
            SessionError::QuestionOutOfRange { .. }
            | SessionError::OptionOutOfRange { .. }
            | SessionError::NotCompleted(_)
            | SessionError::QuestionCountMismatch { .. }
            | SessionError::InconsistentState(_) => ErrorKind::InvalidInput,
        }
    }

    /// Returns `true` if this error signals misuse of the state machine.
    ///
    /// Such errors leave the session untouched, so the caller may carry on.
    pub fn is_invalid_state(&self) -> bool {
        self.kind() == ErrorKind::InvalidState
    }

    /// Returns `true` if the session can never start with the inputs that caused this error.
    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_variants() {
        assert_eq!(SessionError::EmptyQuestionBank.kind(), ErrorKind::Configuration);
        assert!(SessionError::WrongPhase {
            operation: Operation::SelectAnswer,
            phase: Phase::Paused,
        }
        .is_invalid_state());
        assert!(SessionError::NotAvailableInMode {
            operation: Operation::UseHint,
            mode: Mode::Exam,
        }
        .is_invalid_state());
        assert_eq!(
            SessionError::NotCompleted(Phase::Running).kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            SessionError::OptionOutOfRange { option: 4, count: 4 }.kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            SessionError::QuestionOutOfRange { index: 9, count: 3 }.kind(),
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn messages_name_operation_and_phase() {
        let err = SessionError::WrongPhase {
            operation: Operation::SelectAnswer,
            phase: Phase::Paused,
        };
        assert_eq!(
            err.to_string(),
            "cannot select an answer while the session is paused"
        );
        let err = SessionError::NotAvailableInMode {
            operation: Operation::UseHint,
            mode: Mode::Exam,
        };
        assert_eq!(err.to_string(), "cannot use a hint in exam mode");
    }
}
