//! quizclock-core — Timed assessment sessions and their analytics.
//!
//! A [`session::SessionController`] runs one attempt at a fixed question
//! sequence through `Setup → Running ⇄ Paused → Completed`. On completion
//! [`analytics::analyze`] turns the frozen state into an
//! [`analytics::AnalysisReport`]. The [`driver`] module puts a controller on
//! its own `tokio` task and feeds it one-second ticks.

pub mod activity;
pub mod analytics;
pub mod clock;
pub mod driver;
pub mod error;
pub mod model;
pub mod parser;
pub mod report;
pub mod session;

pub use analytics::{analyze, AnalysisReport};
pub use error::{ErrorKind, SessionError};
pub use model::{Difficulty, Mode, Question, QuestionBank, SessionConfig};
pub use session::{Phase, SessionController, SessionState};
