//! quizclock CLI — timed assessment sessions on the terminal.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "quizclock", version, about = "Timed assessment sessions with analytics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a timed session interactively
    Run {
        /// Path to a .toml question bank or a directory of banks
        #[arg(long)]
        questions: PathBuf,

        /// Session mode: practice, exam, adaptive
        #[arg(long)]
        mode: Option<String>,

        /// Difficulty label: easy, medium, hard
        #[arg(long)]
        difficulty: Option<String>,

        /// Output directory
        #[arg(long)]
        output: Option<PathBuf>,

        /// Report format: json, html, markdown, all
        #[arg(long)]
        format: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Append activity events to this JSON-lines file
        #[arg(long)]
        activity_log: Option<PathBuf>,
    },

    /// Re-analyse a saved session
    Analyze {
        /// Question bank the session ran on
        #[arg(long)]
        questions: PathBuf,

        /// Saved session snapshot JSON
        #[arg(long)]
        session: PathBuf,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Compare two session reports
    Compare {
        /// Baseline report JSON
        #[arg(long)]
        baseline: PathBuf,

        /// Current report JSON
        #[arg(long)]
        current: PathBuf,

        /// Subject accuracy change treated as noise
        #[arg(long, default_value = "0.05")]
        threshold: f64,

        /// Exit code 1 if the score or any subject declined
        #[arg(long)]
        fail_on_decline: bool,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Validate question bank TOML files
    Validate {
        /// Path to a question bank file or directory
        #[arg(long)]
        questions: PathBuf,
    },

    /// Create starter config and example question bank
    Init,
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("quizclock=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            questions,
            mode,
            difficulty,
            output,
            format,
            config,
            activity_log,
        } => {
            commands::run::execute(commands::run::RunArgs {
                questions,
                mode,
                difficulty,
                output,
                format,
                config,
                activity_log,
            })
            .await
        }
        Commands::Analyze {
            questions,
            session,
            format,
        } => commands::analyze::execute(questions, session, format),
        Commands::Compare {
            baseline,
            current,
            threshold,
            fail_on_decline,
            format,
        } => commands::compare::execute(baseline, current, threshold, fail_on_decline, format),
        Commands::Validate { questions } => commands::validate::execute(questions),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
