//! Async driver that feeds a [`SessionController`] its clock ticks.
//!
//! One task owns the controller. Ticks from a `tokio` interval and commands
//! from any number of [`SessionHandle`]s are serialised onto that task, so the
//! controller never sees concurrent access. The interval only exists while the
//! session is running; pausing drops it and resuming arms a fresh one.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval};

use crate::analytics::AnalysisReport;
use crate::error::SessionError;
use crate::model::{Difficulty, Mode};
use crate::session::{AnswerOutcome, Phase, Progress, QuestionView, SessionController};

/// Countdown resolution.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

const COMMAND_BUFFER: usize = 32;

/// Errors returned through a [`SessionHandle`].
#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The driver task has finished, usually because the session completed.
    #[error("session driver has stopped")]
    Stopped,
}

type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

enum Command {
    SetMode(Mode, Reply<()>),
    SetDifficulty(Difficulty, Reply<()>),
    Start(Reply<()>),
    SelectAnswer(usize, Reply<AnswerOutcome>),
    UseHint(Reply<String>),
    Next(Reply<usize>),
    Previous(Reply<usize>),
    JumpTo(usize, Reply<usize>),
    TogglePause(Reply<Phase>),
    Submit(Reply<AnalysisReport>),
    View(Reply<QuestionView>),
    Progress(Reply<Progress>),
}

/// Cloneable handle for issuing commands to a driven session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
}

impl SessionHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, DriverError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .await
            .map_err(|_| DriverError::Stopped)?;
        Ok(rx.await.map_err(|_| DriverError::Stopped)??)
    }

    pub async fn set_mode(&self, mode: Mode) -> Result<(), DriverError> {
        self.request(|tx| Command::SetMode(mode, tx)).await
    }

    pub async fn set_difficulty(&self, difficulty: Difficulty) -> Result<(), DriverError> {
        self.request(|tx| Command::SetDifficulty(difficulty, tx))
            .await
    }

    pub async fn start(&self) -> Result<(), DriverError> {
        self.request(Command::Start).await
    }

    pub async fn select_answer(&self, option: usize) -> Result<AnswerOutcome, DriverError> {
        self.request(|tx| Command::SelectAnswer(option, tx)).await
    }

    pub async fn use_hint(&self) -> Result<String, DriverError> {
        self.request(Command::UseHint).await
    }

    pub async fn next(&self) -> Result<usize, DriverError> {
        self.request(Command::Next).await
    }

    pub async fn previous(&self) -> Result<usize, DriverError> {
        self.request(Command::Previous).await
    }

    pub async fn jump_to(&self, index: usize) -> Result<usize, DriverError> {
        self.request(|tx| Command::JumpTo(index, tx)).await
    }

    pub async fn toggle_pause(&self) -> Result<Phase, DriverError> {
        self.request(Command::TogglePause).await
    }

    pub async fn submit(&self) -> Result<AnalysisReport, DriverError> {
        self.request(Command::Submit).await
    }

    pub async fn view(&self) -> Result<QuestionView, DriverError> {
        self.request(Command::View).await
    }

    pub async fn progress(&self) -> Result<Progress, DriverError> {
        self.request(Command::Progress).await
    }
}

/// Move `controller` onto its own task, ticking once per [`TICK_PERIOD`].
///
/// The join handle resolves to the controller once the session completes,
/// or once every handle is dropped while the session cannot progress on its
/// own (not running). A running session with no handles left keeps counting
/// down until the countdown submits it.
pub fn spawn_session(controller: SessionController) -> (SessionHandle, JoinHandle<SessionController>) {
    spawn_session_with_period(controller, TICK_PERIOD)
}

/// Like [`spawn_session`] with a custom tick period.
pub fn spawn_session_with_period(
    controller: SessionController,
    period: Duration,
) -> (SessionHandle, JoinHandle<SessionController>) {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let task = tokio::spawn(drive(controller, rx, period));
    (SessionHandle { commands: tx }, task)
}

async fn drive(
    mut controller: SessionController,
    mut commands: mpsc::Receiver<Command>,
    period: Duration,
) -> SessionController {
    let mut ticker: Option<Interval> = None;
    let mut handles_open = true;

    loop {
        match controller.phase() {
            Phase::Completed => break,
            Phase::Running => {
                if ticker.is_none() {
                    ticker = Some(tokio::time::interval_at(Instant::now() + period, period));
                }
            }
            Phase::Setup | Phase::Paused => {
                ticker = None;
                if !handles_open {
                    tracing::warn!(phase = ?controller.phase(), "all session handles dropped, abandoning session");
                    break;
                }
            }
        }

        tokio::select! {
            biased;

            _ = next_tick(&mut ticker) => {
                controller.tick();
            }
            command = commands.recv(), if handles_open => match command {
                Some(command) => apply(&mut controller, command),
                None => handles_open = false,
            },
        }
    }

    controller
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn apply(controller: &mut SessionController, command: Command) {
    // A dropped reply receiver only means the caller stopped waiting.
    match command {
        Command::SetMode(mode, tx) => {
            let _ = tx.send(controller.set_mode(mode));
        }
        Command::SetDifficulty(difficulty, tx) => {
            let _ = tx.send(controller.set_difficulty(difficulty));
        }
        Command::Start(tx) => {
            let _ = tx.send(controller.start());
        }
        Command::SelectAnswer(option, tx) => {
            let _ = tx.send(controller.select_answer(option));
        }
        Command::UseHint(tx) => {
            let _ = tx.send(controller.use_hint());
        }
        Command::Next(tx) => {
            let _ = tx.send(controller.next());
        }
        Command::Previous(tx) => {
            let _ = tx.send(controller.previous());
        }
        Command::JumpTo(index, tx) => {
            let _ = tx.send(controller.jump_to(index));
        }
        Command::TogglePause(tx) => {
            let _ = tx.send(controller.toggle_pause());
        }
        Command::Submit(tx) => {
            let _ = tx.send(controller.submit());
        }
        Command::View(tx) => {
            let _ = tx.send(Ok(controller.view()));
        }
        Command::Progress(tx) => {
            let _ = tx.send(Ok(controller.progress()));
        }
    }
}
