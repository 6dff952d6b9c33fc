//! The timed session state machine.
//!
//! A [`SessionController`] walks through four phases:
//!
//! ```text
//! Setup --start--> Running <--toggle_pause--> Paused
//!                     |
//!                     +--submit / countdown hits 0--> Completed
//! ```
//!
//! Every operation is defined for every phase; operations outside their phase
//! fail with [`SessionError::WrongPhase`] and leave the session untouched.
//! `Completed` is terminal, [`SessionController::reset`] builds a new session.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::activity::{emit, ActivityEvent, ActivitySink, NoopSink};
use crate::analytics::{build_report, AnalysisReport};
use crate::clock::Clock;
use crate::error::SessionError;
use crate::model::{validate_questions, Difficulty, Mode, Question, SessionConfig};

// ---------------------------------------------------------------------------
// Phases and operations
// ---------------------------------------------------------------------------

/// State-machine phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Setup,
    Running,
    Paused,
    Completed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Setup => write!(f, "in setup"),
            Phase::Running => write!(f, "running"),
            Phase::Paused => write!(f, "paused"),
            Phase::Completed => write!(f, "completed"),
        }
    }
}

/// Mutating operations, named in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    SetMode,
    SetDifficulty,
    Start,
    SelectAnswer,
    UseHint,
    Navigate,
    TogglePause,
    Submit,
    Reset,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::SetMode => write!(f, "change the mode"),
            Operation::SetDifficulty => write!(f, "change the difficulty"),
            Operation::Start => write!(f, "start"),
            Operation::SelectAnswer => write!(f, "select an answer"),
            Operation::UseHint => write!(f, "use a hint"),
            Operation::Navigate => write!(f, "navigate"),
            Operation::TogglePause => write!(f, "toggle pause"),
            Operation::Submit => write!(f, "submit"),
            Operation::Reset => write!(f, "reset"),
        }
    }
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Raw interaction data accumulated by a session.
///
/// Only the controller writes it. Once the phase is `Completed` it is frozen
/// and serves as analytics input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub phase: Phase,
    /// Number of questions the session was built with.
    pub question_count: usize,
    pub current_index: usize,
    /// Question index → selected option. Absent means unanswered.
    #[serde(default)]
    pub answers: BTreeMap<usize, usize>,
    /// Question index → seconds spent before the first answer.
    #[serde(default)]
    pub question_elapsed_seconds: BTreeMap<usize, u32>,
    /// Questions for which a hint was requested.
    #[serde(default)]
    pub hints_used: BTreeSet<usize>,
    pub remaining_seconds: u32,
    #[serde(default)]
    pub started_at_epoch_millis: Option<i64>,
    #[serde(default)]
    pub completed_at_epoch_millis: Option<i64>,
}

impl SessionState {
    /// Fresh state at `Setup` for a session of `question_count` questions.
    pub fn new(question_count: usize, remaining_seconds: u32) -> Self {
        Self {
            phase: Phase::Setup,
            question_count,
            current_index: 0,
            answers: BTreeMap::new(),
            question_elapsed_seconds: BTreeMap::new(),
            hints_used: BTreeSet::new(),
            remaining_seconds,
            started_at_epoch_millis: None,
            completed_at_epoch_millis: None,
        }
    }

    pub fn is_answered(&self, index: usize) -> bool {
        self.answers.contains_key(&index)
    }

    /// Seconds on the countdown consumed so far out of `duration_seconds`.
    pub fn consumed_seconds(&self, duration_seconds: u32) -> u32 {
        duration_seconds.saturating_sub(self.remaining_seconds)
    }
}

// ---------------------------------------------------------------------------
// Operation outcomes and views
// ---------------------------------------------------------------------------

/// Result of [`SessionController::select_answer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AnswerOutcome {
    /// First selection on this question; it is now authoritative.
    Recorded {
        elapsed_seconds: u32,
        /// Correctness, only revealed in modes that reveal answers.
        correct: Option<bool>,
    },
    /// The question already had an answer; the new selection was ignored.
    AlreadyAnswered { selected: usize },
}

/// Result of [`SessionController::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The session was not running; the tick was discarded.
    Ignored,
    /// One second elapsed.
    Counted { remaining_seconds: u32 },
    /// The countdown ran out and the session was submitted.
    Expired,
}

/// Presentation snapshot of the active question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionView {
    pub index: usize,
    pub total: usize,
    pub question: Question,
    pub selected: Option<usize>,
    /// Correctness of the selection, once revealed (practice mode only).
    pub correct: Option<bool>,
    /// Hint text, while the hint is showing.
    pub hint: Option<String>,
    pub remaining_seconds: u32,
    pub answered_count: usize,
    pub phase: Phase,
    pub mode: Mode,
}

/// Answered/unanswered overview, e.g. for a confirm-before-submit prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub total: usize,
    pub answered: usize,
    pub unanswered: Vec<usize>,
    pub hints_used: usize,
    pub remaining_seconds: u32,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Owns one session: its configuration, its state and its countdown.
pub struct SessionController {
    questions: Arc<[Question]>,
    config: SessionConfig,
    state: SessionState,
    sink: Arc<dyn ActivitySink>,
    clock: Clock,
    /// Countdown seconds consumed when the current question became active.
    activated_at: u32,
    revealed: bool,
    hint_visible: bool,
    timed_out: bool,
    report: Option<AnalysisReport>,
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("questions", &self.questions.len())
            .finish_non_exhaustive()
    }
}

impl SessionController {
    /// Build a session at `Setup` over `questions`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the sequence is empty or any question
    /// is malformed.
    pub fn new(
        questions: impl Into<Arc<[Question]>>,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let questions = questions.into();
        validate_questions(&questions)?;
        let state = SessionState::new(questions.len(), config.nominal_duration_seconds());
        Ok(Self {
            questions,
            config,
            state,
            sink: Arc::new(NoopSink),
            clock: Clock::default(),
            activated_at: 0,
            revealed: false,
            hint_visible: false,
            timed_out: false,
            report: None,
        })
    }

    /// Route activity events to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn ActivitySink>) -> Self {
        self.sink = sink;
        self
    }

    /// Take timestamps from `clock`.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn questions(&self) -> &Arc<[Question]> {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.state.current_index
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.state.current_index]
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.state.remaining_seconds
    }

    /// The analysis report, once the session has completed.
    pub fn report(&self) -> Option<&AnalysisReport> {
        self.report.as_ref()
    }

    /// `true` if the countdown, not the candidate, ended the session.
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    // -- Setup --------------------------------------------------------------

    pub fn set_mode(&mut self, mode: Mode) -> Result<(), SessionError> {
        self.require(Operation::SetMode, Phase::Setup)?;
        self.config.mode = mode;
        self.state.remaining_seconds = mode.nominal_duration_seconds();
        Ok(())
    }

    pub fn set_difficulty(&mut self, difficulty: Difficulty) -> Result<(), SessionError> {
        self.require(Operation::SetDifficulty, Phase::Setup)?;
        self.config.difficulty = difficulty;
        Ok(())
    }

    /// Start the countdown on the first question.
    pub fn start(&mut self) -> Result<(), SessionError> {
        self.require(Operation::Start, Phase::Setup)?;
        let duration = self.config.nominal_duration_seconds();
        self.state.phase = Phase::Running;
        self.state.started_at_epoch_millis = Some(self.clock.now_millis());
        self.state.remaining_seconds = duration;
        self.state.current_index = 0;
        self.activated_at = 0;
        tracing::info!(
            mode = %self.config.mode,
            questions = self.questions.len(),
            duration_seconds = duration,
            "session started"
        );
        emit(
            &self.sink,
            ActivityEvent::SessionStarted {
                mode: self.config.mode,
                question_count: self.questions.len(),
                duration_seconds: duration,
            },
        );
        Ok(())
    }

    // -- Clock ----------------------------------------------------------------

    /// Advance the countdown by one second.
    ///
    /// Ticks outside `Running` are discarded. The tick that brings the
    /// countdown to zero submits the session.
    pub fn tick(&mut self) -> TickOutcome {
        if self.state.phase != Phase::Running {
            tracing::debug!(phase = ?self.state.phase, "discarding tick");
            return TickOutcome::Ignored;
        }
        self.state.remaining_seconds = self.state.remaining_seconds.saturating_sub(1);
        if self.state.remaining_seconds == 0 {
            tracing::info!("countdown expired, submitting");
            self.complete(true);
            return TickOutcome::Expired;
        }
        TickOutcome::Counted {
            remaining_seconds: self.state.remaining_seconds,
        }
    }

    /// Pause a running session or resume a paused one. Returns the new phase.
    pub fn toggle_pause(&mut self) -> Result<Phase, SessionError> {
        let remaining_seconds = self.state.remaining_seconds;
        match self.state.phase {
            Phase::Running => {
                self.state.phase = Phase::Paused;
                emit(&self.sink, ActivityEvent::Paused { remaining_seconds });
            }
            Phase::Paused => {
                self.state.phase = Phase::Running;
                emit(&self.sink, ActivityEvent::Resumed { remaining_seconds });
            }
            phase => {
                return Err(SessionError::WrongPhase {
                    operation: Operation::TogglePause,
                    phase,
                })
            }
        }
        tracing::debug!(phase = ?self.state.phase, remaining_seconds, "pause toggled");
        Ok(self.state.phase)
    }

    // -- Answering ------------------------------------------------------------

    /// Select `option` for the active question.
    ///
    /// Only the first selection on a question counts.
    pub fn select_answer(&mut self, option: usize) -> Result<AnswerOutcome, SessionError> {
        self.require(Operation::SelectAnswer, Phase::Running)?;
        let index = self.state.current_index;
        let question = &self.questions[index];
        if option >= question.options.len() {
            return Err(SessionError::OptionOutOfRange {
                option,
                count: question.options.len(),
            });
        }
        if let Some(&selected) = self.state.answers.get(&index) {
            return Ok(AnswerOutcome::AlreadyAnswered { selected });
        }

        let elapsed_seconds = self
            .state
            .consumed_seconds(self.config.nominal_duration_seconds())
            .saturating_sub(self.activated_at);
        self.state.answers.insert(index, option);
        self.state
            .question_elapsed_seconds
            .entry(index)
            .or_insert(elapsed_seconds);

        let reveals = self.config.mode.reveals_answers();
        self.revealed = reveals;
        let correct = reveals.then(|| question.is_correct(option));
        emit(
            &self.sink,
            ActivityEvent::QuestionAnswered {
                index,
                question_id: question.id.clone(),
                option,
                elapsed_seconds,
            },
        );
        Ok(AnswerOutcome::Recorded {
            elapsed_seconds,
            correct,
        })
    }

    /// Request a hint for the active question and return its text.
    ///
    /// Hints are only available in practice mode. Asking twice for the same
    /// question counts once.
    pub fn use_hint(&mut self) -> Result<String, SessionError> {
        self.require(Operation::UseHint, Phase::Running)?;
        if !self.config.mode.allows_hints() {
            return Err(SessionError::NotAvailableInMode {
                operation: Operation::UseHint,
                mode: self.config.mode,
            });
        }
        let index = self.state.current_index;
        let question = &self.questions[index];
        if self.state.hints_used.insert(index) {
            emit(
                &self.sink,
                ActivityEvent::HintUsed {
                    index,
                    question_id: question.id.clone(),
                },
            );
        }
        self.hint_visible = true;
        Ok(hint_text(question))
    }

    // -- Navigation -------------------------------------------------------------

    /// Move to the next question. Stays put on the last one.
    pub fn next(&mut self) -> Result<usize, SessionError> {
        self.require(Operation::Navigate, Phase::Running)?;
        let last = self.questions.len() - 1;
        self.activate((self.state.current_index + 1).min(last));
        Ok(self.state.current_index)
    }

    /// Move to the previous question. Stays put on the first one.
    pub fn previous(&mut self) -> Result<usize, SessionError> {
        self.require(Operation::Navigate, Phase::Running)?;
        self.activate(self.state.current_index.saturating_sub(1));
        Ok(self.state.current_index)
    }

    /// Move to question `index`, answered or not.
    pub fn jump_to(&mut self, index: usize) -> Result<usize, SessionError> {
        self.require(Operation::Navigate, Phase::Running)?;
        if index >= self.questions.len() {
            return Err(SessionError::QuestionOutOfRange {
                index,
                count: self.questions.len(),
            });
        }
        self.activate(index);
        Ok(index)
    }

    fn activate(&mut self, index: usize) {
        let from = self.state.current_index;
        if index == from {
            return;
        }
        self.state.current_index = index;
        self.activated_at = self
            .state
            .consumed_seconds(self.config.nominal_duration_seconds());
        self.revealed = false;
        self.hint_visible = false;
        emit(&self.sink, ActivityEvent::Navigated { from, to: index });
    }

    // -- Completion -------------------------------------------------------------

    /// Finish the session and return its analysis.
    pub fn submit(&mut self) -> Result<AnalysisReport, SessionError> {
        self.require(Operation::Submit, Phase::Running)?;
        Ok(self.complete(false).clone())
    }

    fn complete(&mut self, timed_out: bool) -> &AnalysisReport {
        self.state.phase = Phase::Completed;
        self.state.completed_at_epoch_millis = Some(self.clock.now_millis());
        self.timed_out = timed_out;
        self.revealed = false;
        self.hint_visible = false;

        let report = build_report(&self.state, &self.config, &self.questions);
        tracing::info!(
            score = report.score,
            correct = report.correct_count,
            total = report.total_questions,
            timed_out,
            "session completed"
        );
        emit(
            &self.sink,
            ActivityEvent::SessionCompleted {
                score: report.score,
                correct_count: report.correct_count,
                total_questions: report.total_questions,
                timed_out,
            },
        );
        self.report.insert(report)
    }

    /// Discard a completed session and start over at `Setup` with the same
    /// questions, sink, clock and configuration.
    ///
    /// Outside `Completed` the controller is handed back untouched with the error.
    #[allow(clippy::result_large_err)]
    pub fn reset(self) -> Result<SessionController, (SessionController, SessionError)> {
        if let Err(e) = self.require(Operation::Reset, Phase::Completed) {
            return Err((self, e));
        }
        tracing::debug!("resetting session");
        let state = SessionState::new(
            self.questions.len(),
            self.config.nominal_duration_seconds(),
        );
        Ok(SessionController {
            questions: self.questions,
            config: self.config,
            state,
            sink: self.sink,
            clock: self.clock,
            activated_at: 0,
            revealed: false,
            hint_visible: false,
            timed_out: false,
            report: None,
        })
    }

    // -- Views --------------------------------------------------------------------

    /// Snapshot of the active question for display.
    pub fn view(&self) -> QuestionView {
        let index = self.state.current_index;
        let question = &self.questions[index];
        let selected = self.state.answers.get(&index).copied();
        QuestionView {
            index,
            total: self.questions.len(),
            question: question.clone(),
            selected,
            correct: selected
                .filter(|_| self.revealed)
                .map(|option| question.is_correct(option)),
            hint: self.hint_visible.then(|| hint_text(question)),
            remaining_seconds: self.state.remaining_seconds,
            answered_count: self.state.answers.len(),
            phase: self.state.phase,
            mode: self.config.mode,
        }
    }

    pub fn progress(&self) -> Progress {
        Progress {
            total: self.questions.len(),
            answered: self.state.answers.len(),
            unanswered: (0..self.questions.len())
                .filter(|i| !self.state.is_answered(*i))
                .collect(),
            hints_used: self.state.hints_used.len(),
            remaining_seconds: self.state.remaining_seconds,
        }
    }

    fn require(&self, operation: Operation, phase: Phase) -> Result<(), SessionError> {
        if self.state.phase == phase {
            Ok(())
        } else {
            Err(SessionError::WrongPhase {
                operation,
                phase: self.state.phase,
            })
        }
    }
}

fn hint_text(question: &Question) -> String {
    if question.achievement_tag.is_empty() {
        format!("Think about what you know of {}.", question.subject)
    } else {
        format!(
            "This question covers {} ({}).",
            question.achievement_tag, question.subject
        )
    }
}
