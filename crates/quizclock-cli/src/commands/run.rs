//! The `quizclock run` command: an interactive timed session on the terminal.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use quizclock_core::activity::{ActivitySink, JsonLinesSink, TracingSink};
use quizclock_core::analytics::AnalysisReport;
use quizclock_core::driver::{spawn_session, DriverError, SessionHandle};
use quizclock_core::error::SessionError;
use quizclock_core::model::{Difficulty, Mode, SessionConfig};
use quizclock_core::report::{format_duration, SessionSnapshot};
use quizclock_core::session::{AnswerOutcome, Phase, QuestionView, SessionController};
use quizclock_report::html::write_html_report;

use crate::config::{load_config_from, parse_formats, ReportFormat};

use super::{load_questions, render_summary};

const HELP: &str = "\
Commands:
  <number>   select that option (1-based)
  n / p      next / previous question
  j <N>      jump to question N
  h          show a hint (practice mode)
  pause      pause or resume the countdown
  status     show progress
  submit     finish the session
  help       show this help";

/// Arguments of `quizclock run`.
pub struct RunArgs {
    pub questions: PathBuf,
    pub mode: Option<String>,
    pub difficulty: Option<String>,
    pub output: Option<PathBuf>,
    pub format: Option<String>,
    pub config: Option<PathBuf>,
    pub activity_log: Option<PathBuf>,
}

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Select(usize),
    Next,
    Previous,
    Jump(usize),
    Hint,
    Pause,
    Status,
    Submit,
    Help,
    Empty,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    let mut parts = line.split_whitespace();
    let head = parts.next().unwrap_or_default().to_lowercase();
    let arg = parts.next();

    match (head.as_str(), arg) {
        ("", _) => Input::Empty,
        ("n" | "next", None) => Input::Next,
        ("p" | "prev" | "previous", None) => Input::Previous,
        ("j" | "jump", Some(n)) => match n.parse::<usize>() {
            Ok(n) if n >= 1 => Input::Jump(n - 1),
            _ => Input::Unknown(line.to_string()),
        },
        ("h" | "hint", None) => Input::Hint,
        ("pause" | "resume", None) => Input::Pause,
        ("s" | "status", None) => Input::Status,
        ("submit", None) => Input::Submit,
        ("help" | "?", None) => Input::Help,
        (n, None) => match n.parse::<usize>() {
            Ok(n) if n >= 1 => Input::Select(n - 1),
            _ => Input::Unknown(line.to_string()),
        },
        _ => Input::Unknown(line.to_string()),
    }
}

pub async fn execute(args: RunArgs) -> Result<()> {
    let config = load_config_from(args.config.as_deref())?;

    let mode: Mode = match &args.mode {
        Some(m) => m.parse()?,
        None => config.default_mode,
    };
    let difficulty: Difficulty = match &args.difficulty {
        Some(d) => d.parse()?,
        None => config.default_difficulty,
    };
    let formats = parse_formats(args.format.as_deref().unwrap_or(&config.report_format))?;
    let output = args.output.unwrap_or(config.output_dir);

    let (bank_id, questions) = load_questions(&args.questions)?;

    let sink: Arc<dyn ActivitySink> = match args.activity_log.or(config.activity_log) {
        Some(path) => Arc::new(JsonLinesSink::open(&path)?),
        None => Arc::new(TracingSink),
    };

    let controller =
        SessionController::new(questions, SessionConfig::new(mode, difficulty))?.with_sink(sink);
    println!(
        "quizclock v{} — {} questions, {} mode, {} to go. Type 'help' for commands.",
        env!("CARGO_PKG_VERSION"),
        controller.questions().len(),
        mode,
        format_duration(controller.config().nominal_duration_seconds()),
    );

    let (handle, mut task) = spawn_session(controller);
    handle.start().await?;
    print_view(&handle.view().await?);

    let mut lines = spawn_input_reader();
    let mut confirm_submit = false;

    let controller = loop {
        tokio::select! {
            finished = &mut task => {
                println!("\nTime is up. The session was submitted automatically.");
                break finished.context("session task failed")?;
            }
            line = lines.recv() => {
                let input = match line.transpose().context("failed to read input")? {
                    Some(line) => parse_input(&line),
                    // End of input submits without asking.
                    None => {
                        finish(&handle).await?;
                        break task.await.context("session task failed")?;
                    }
                };

                if input == Input::Submit {
                    let progress = match handle.progress().await {
                        Ok(progress) => progress,
                        Err(DriverError::Stopped) => break task.await.context("session task failed")?,
                        Err(e) => return Err(e.into()),
                    };
                    if !confirm_submit && !progress.unanswered.is_empty() {
                        let numbers: Vec<String> =
                            progress.unanswered.iter().map(|i| (i + 1).to_string()).collect();
                        println!(
                            "You have {} unanswered question(s): {}. Type 'submit' again to finish.",
                            progress.unanswered.len(),
                            numbers.join(", ")
                        );
                        confirm_submit = true;
                        continue;
                    }
                    match finish(&handle).await {
                        Ok(()) => break task.await.context("session task failed")?,
                        Err(e) => println!("{e}"),
                    }
                    continue;
                }
                confirm_submit = false;

                match handle_input(&handle, input).await {
                    Ok(()) => {}
                    Err(DriverError::Session(SessionError::OptionOutOfRange { count, .. })) => {
                        println!("Choose an option between 1 and {count}.")
                    }
                    Err(DriverError::Session(SessionError::QuestionOutOfRange { count, .. })) => {
                        println!("Choose a question between 1 and {count}.")
                    }
                    Err(DriverError::Session(e)) => println!("{e}"),
                    Err(DriverError::Stopped) => {
                        break task.await.context("session task failed")?;
                    }
                }
            }
        }
    };

    let report = controller
        .report()
        .cloned()
        .context("session ended without a report")?;
    println!("\n{}", render_summary(&report));

    let snapshot = SessionSnapshot::capture(&controller, bank_id);
    save_outputs(&report, &snapshot, &output, &formats)?;

    Ok(())
}

/// Read stdin lines on a plain thread; the channel closes at end of input.
fn spawn_input_reader() -> mpsc::Receiver<std::io::Result<String>> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Submit, resuming first if the session is paused.
async fn finish(handle: &SessionHandle) -> Result<(), DriverError> {
    let result = async {
        if handle.view().await?.phase == Phase::Paused {
            handle.toggle_pause().await?;
        }
        handle.submit().await
    }
    .await;

    match result {
        Ok(_) | Err(DriverError::Stopped) => Ok(()),
        Err(e) => Err(e),
    }
}

async fn handle_input(handle: &SessionHandle, input: Input) -> Result<(), DriverError> {
    match input {
        Input::Select(option) => match handle.select_answer(option).await? {
            AnswerOutcome::Recorded {
                correct: Some(true),
                ..
            } => println!("Correct!"),
            AnswerOutcome::Recorded {
                correct: Some(false),
                ..
            } => {
                let view = handle.view().await?;
                println!(
                    "Incorrect. The answer is {}.",
                    view.question.correct_answer + 1
                );
            }
            AnswerOutcome::Recorded { correct: None, .. } => println!("Answer recorded."),
            AnswerOutcome::AlreadyAnswered { selected } => {
                println!("Already answered with option {}.", selected + 1)
            }
        },
        Input::Next => {
            handle.next().await?;
            print_view(&handle.view().await?);
        }
        Input::Previous => {
            handle.previous().await?;
            print_view(&handle.view().await?);
        }
        Input::Jump(index) => {
            handle.jump_to(index).await?;
            print_view(&handle.view().await?);
        }
        Input::Hint => println!("Hint: {}", handle.use_hint().await?),
        Input::Pause => match handle.toggle_pause().await? {
            Phase::Paused => println!("Paused. Type 'pause' again to resume."),
            _ => {
                println!("Resumed.");
                print_view(&handle.view().await?);
            }
        },
        Input::Status => {
            let progress = handle.progress().await?;
            println!(
                "{}/{} answered, {} hint(s), {} left",
                progress.answered,
                progress.total,
                progress.hints_used,
                format_duration(progress.remaining_seconds)
            );
        }
        Input::Help => println!("{HELP}"),
        Input::Empty => print_view(&handle.view().await?),
        Input::Unknown(line) => println!("Unknown command: '{line}'. Type 'help' for commands."),
        Input::Submit => {}
    }
    Ok(())
}

fn print_view(view: &QuestionView) {
    println!(
        "\n[{}/{}] {} | {} left | {} answered",
        view.index + 1,
        view.total,
        view.question.subject,
        format_duration(view.remaining_seconds),
        view.answered_count
    );
    println!("{}", view.question.text);
    for (i, option) in view.question.options.iter().enumerate() {
        let marker = if view.selected == Some(i) { " <" } else { "" };
        println!("  {}) {}{}", i + 1, option, marker);
    }
    if let Some(hint) = &view.hint {
        println!("Hint: {hint}");
    }
}

fn save_outputs(
    report: &AnalysisReport,
    snapshot: &SessionSnapshot,
    output: &Path,
    formats: &[ReportFormat],
) -> Result<()> {
    std::fs::create_dir_all(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    let timestamp = snapshot.created_at.format("%Y-%m-%dT%H%M%S");

    for format in formats {
        let path = output.join(format!("report-{timestamp}.{}", format.extension()));
        match format {
            ReportFormat::Json => report.save_json(&path)?,
            ReportFormat::Html => write_html_report(report, &path)?,
            ReportFormat::Markdown => std::fs::write(&path, report.to_markdown())
                .with_context(|| format!("failed to write {}", path.display()))?,
        }
        eprintln!("Report saved to: {}", path.display());
    }

    let path = output.join(format!("session-{timestamp}.json"));
    snapshot.save_json(&path)?;
    eprintln!("Session saved to: {}", path.display());
    Ok(())
}
